// config.rs - Command line arguments and the resolved server configuration

use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::time::Duration;

use clap::Parser;
use maze_engine::Dimensions;

use crate::admission::{DEFAULT_MAX_CLIENTS, DEFAULT_MAX_PER_ADDRESS};
use crate::session::{SessionSettings, DEFAULT_READ_TIMEOUT};

pub const DEFAULT_PORT: u16 = 50000;

/// CLI
#[derive(Parser, Debug)]
#[command(author, version, about = "Multi-level labyrinth server", long_about = None)]
pub struct Args {
    /// Address to listen on
    #[arg(long, default_value_t = IpAddr::V4(Ipv4Addr::UNSPECIFIED))]
    pub bind: IpAddr,

    /// TCP port; falls back to $PORT, then 50000
    #[arg(short, long)]
    pub port: Option<u16>,

    /// Concurrent sessions across all clients
    #[arg(long, default_value_t = DEFAULT_MAX_CLIENTS)]
    pub max_clients: usize,

    /// Concurrent sessions from one source address
    #[arg(long, default_value_t = DEFAULT_MAX_PER_ADDRESS)]
    pub max_per_address: usize,

    /// Seconds of client inactivity before a session is dropped
    #[arg(long, default_value_t = DEFAULT_READ_TIMEOUT.as_secs())]
    pub timeout_secs: u64,

    /// Generate one maze of the given size, print it and exit
    #[arg(long, value_name = "WxHxD", value_parser = parse_dimensions)]
    pub dump: Option<Dimensions>,

    /// Fixed generator seed
    #[arg(long)]
    pub seed: Option<u64>,
}

/// Parses `<W>x<H>x<D>` and validates it like the configuration commands do.
pub fn parse_dimensions(s: &str) -> Result<Dimensions, String> {
    let parts: Vec<&str> = s.trim().split(['x', 'X']).collect();
    let [w, h, d] = parts[..] else {
        return Err(format!("expected <W>x<H>x<D>, got '{}'", s));
    };
    let axis = |v: &str| v.parse::<u64>().map_err(|e| format!("'{}': {}", v, e));

    Dimensions::new(axis(w)?, axis(h)?, axis(d)?).map_err(|e| e.to_string())
}

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub bind: SocketAddr,
    pub max_clients: usize,
    pub max_per_address: usize,
    pub session: SessionSettings,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: SocketAddr::new(IpAddr::V4(Ipv4Addr::UNSPECIFIED), DEFAULT_PORT),
            max_clients: DEFAULT_MAX_CLIENTS,
            max_per_address: DEFAULT_MAX_PER_ADDRESS,
            session: SessionSettings::default(),
        }
    }
}

impl Args {
    pub fn server_config(&self) -> ServerConfig {
        let port = self
            .port
            .or_else(|| std::env::var("PORT").ok().and_then(|p| p.parse().ok()))
            .unwrap_or(DEFAULT_PORT);

        ServerConfig {
            bind: SocketAddr::new(self.bind, port),
            max_clients: self.max_clients,
            max_per_address: self.max_per_address,
            session: SessionSettings {
                read_timeout: Duration::from_secs(self.timeout_secs),
                seed: self.seed,
                ..SessionSettings::default()
            },
        }
    }
}
