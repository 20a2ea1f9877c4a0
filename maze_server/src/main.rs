// main.rs - Labyrinth server entry point: TCP service or one-off maze dump

use std::io::Write;
use std::ops::ControlFlow;

use anyhow::{Context, Result};
use clap::Parser;
use log::info;
use maze_engine::{generate_maze, DensitySweep, Dimensions};
use maze_server::{server, Args};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let args = Args::parse();
    info!("Starting with {args:?}");

    if let Some(dims) = args.dump {
        return dump(dims, args.seed);
    }

    let config = args.server_config();
    server::serve(config, async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            log::error!("Failed to listen for ctrl-c: {}", e);
            std::future::pending::<()>().await;
        }
    })
    .await
}

/// Generates one maze and writes every level plus a JSON summary to stdout.
fn dump(dims: Dimensions, seed: Option<u64>) -> Result<()> {
    let seed = seed.unwrap_or_else(|| rand::rng().random());
    info!("Dumping {} maze with seed {}", dims, seed);

    let mut rng = StdRng::seed_from_u64(seed);
    let maze = generate_maze(dims, &DensitySweep::default(), &mut rng, |p| {
        log::debug!("sweep pass {} step {}/{}: best {}", p.pass, p.step, p.total, p.best_score);
        ControlFlow::Continue(())
    })
    .with_context(|| format!("Failed to generate {} maze", dims))?;

    let stdout = std::io::stdout();
    let mut out = stdout.lock();
    for d in 0..dims.depth() {
        writeln!(out, "Level {}:", d)?;
        write!(out, "{}", maze.render_level(d))?;
        writeln!(out)?;
    }
    let summary = serde_json::to_string_pretty(&maze.summary()).context("Failed to encode summary")?;
    writeln!(out, "{}", summary)?;
    out.flush()?;
    Ok(())
}
