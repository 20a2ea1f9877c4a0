// lag.rs - In-memory transport with injected latency
//
// `lag_pipe` stands in for a TCP connection: both ends implement the same
// async read/write traits as a socket, and every chunk crossing the pipe is
// held back by a fixed delay. `OfflineLabyrinth` runs a full session over it.

use std::time::Duration;

use tokio::io::{
    AsyncBufReadExt, AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt, BufReader, DuplexStream,
};
use tokio::task::JoinHandle;
use uuid::Uuid;

use crate::error::{Result, SessionError};
use crate::session::{Session, SessionSettings};
use crate::shutdown::{self, ShutdownTrigger};

const PIPE_CAPACITY: usize = 64 * 1024;
const CHUNK: usize = 4096;

/// Returns `(client_end, server_end)`. Must be called inside a tokio runtime;
/// the relay tasks end when either side is dropped.
pub fn lag_pipe(lag: Duration) -> (DuplexStream, DuplexStream) {
    let (client, client_relay) = tokio::io::duplex(PIPE_CAPACITY);
    let (server_relay, server) = tokio::io::duplex(PIPE_CAPACITY);

    let (client_rx, client_tx) = tokio::io::split(client_relay);
    let (server_rx, server_tx) = tokio::io::split(server_relay);

    tokio::spawn(relay(client_rx, server_tx, lag));
    tokio::spawn(relay(server_rx, client_tx, lag));

    (client, server)
}

async fn relay<R, W>(mut from: R, mut to: W, lag: Duration)
where
    R: AsyncRead + Unpin,
    W: AsyncWrite + Unpin,
{
    let mut buf = vec![0u8; CHUNK];
    loop {
        let n = match from.read(&mut buf).await {
            Ok(0) | Err(_) => break,
            Ok(n) => n,
        };
        if !lag.is_zero() {
            tokio::time::sleep(lag).await;
        }
        if to.write_all(&buf[..n]).await.is_err() {
            return;
        }
    }
    let _ = to.shutdown().await;
}

/// A session served over a [`lag_pipe`], driven through its client end.
///
/// Dropping the labyrinth drops its shutdown trigger, which ends the session.
pub struct OfflineLabyrinth {
    client: BufReader<DuplexStream>,
    session: JoinHandle<Result<Duration>>,
    trigger: ShutdownTrigger,
}

impl OfflineLabyrinth {
    pub fn start(lag: Duration, settings: SessionSettings) -> Self {
        let (client, server) = lag_pipe(lag);
        let (trigger, shutdown) = shutdown::channel();

        let (server_rx, server_tx) = tokio::io::split(server);
        let mut session = Session::new(
            Uuid::new_v4(),
            BufReader::new(server_rx),
            server_tx,
            shutdown,
            settings,
        );

        Self {
            client: BufReader::new(client),
            session: tokio::spawn(async move { session.run().await }),
            trigger,
        }
    }

    pub async fn send(&mut self, line: &str) -> std::io::Result<()> {
        self.client.write_all(line.as_bytes()).await?;
        self.client.write_all(b"\r\n").await?;
        self.client.flush().await
    }

    /// Next line from the server without its terminator; `None` once the
    /// server closed the stream.
    pub async fn recv(&mut self) -> std::io::Result<Option<String>> {
        let mut line = String::new();
        if self.client.read_line(&mut line).await? == 0 {
            return Ok(None);
        }
        Ok(Some(line.trim_end_matches(['\r', '\n']).to_string()))
    }

    /// Reads lines up to and including the first one starting with `prefix`.
    pub async fn recv_until(&mut self, prefix: &str) -> std::io::Result<Vec<String>> {
        let mut lines = Vec::new();
        while let Some(line) = self.recv().await? {
            let done = line.starts_with(prefix);
            lines.push(line);
            if done {
                break;
            }
        }
        Ok(lines)
    }

    /// Asks the session to stop, as a server shutdown would.
    pub fn shutdown(&self) {
        self.trigger.trigger();
    }

    /// Shuts the session down and returns its outcome. A session that
    /// already ended reports how it ended.
    pub async fn finish(self) -> Result<Duration> {
        let Self {
            client,
            session,
            trigger,
        } = self;
        drop(trigger);
        drop(client);
        session.await.map_err(SessionError::Task)?
    }
}
