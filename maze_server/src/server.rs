// server.rs - TCP accept loop
//
// One task per admitted connection. On shutdown the loop stops accepting,
// signals every session and waits for them to wind down.

use std::future::Future;
use std::net::SocketAddr;

use anyhow::{Context, Result};
use tokio::io::{AsyncWriteExt, BufReader, BufWriter};
use tokio::net::{TcpListener, TcpStream};
use tokio::task::JoinSet;
use uuid::Uuid;

use crate::admission::{Admission, AdmissionGuard, Rejection};
use crate::config::ServerConfig;
use crate::protocol;
use crate::session::{Session, SessionSettings};
use crate::shutdown::{self, Shutdown};

pub async fn serve(config: ServerConfig, signal: impl Future<Output = ()>) -> Result<()> {
    let listener = TcpListener::bind(config.bind)
        .await
        .with_context(|| format!("Failed to bind {}", config.bind))?;
    log::info!(
        "Labyrinth server listening on {} (max {} clients, {} per address)",
        listener.local_addr().context("Listener has no local address")?,
        config.max_clients,
        config.max_per_address
    );
    run(listener, config, signal).await
}

/// Accepts connections on `listener` until `signal` resolves.
pub async fn run(
    listener: TcpListener,
    config: ServerConfig,
    signal: impl Future<Output = ()>,
) -> Result<()> {
    let admission = Admission::new(config.max_clients, config.max_per_address);
    let (trigger, _) = shutdown::channel();
    let mut sessions = JoinSet::new();
    tokio::pin!(signal);

    loop {
        tokio::select! {
            _ = &mut signal => {
                log::info!("Shutdown requested, {} sessions active", admission.active());
                break;
            }
            accepted = listener.accept() => {
                let (stream, peer) = match accepted {
                    Ok(conn) => conn,
                    Err(e) => {
                        log::warn!("Accept failed: {}", e);
                        continue;
                    }
                };
                if let Err(e) = stream.set_nodelay(true) {
                    log::debug!("set_nodelay failed for {}: {}", peer, e);
                }

                match admission.try_admit(peer.ip()) {
                    Ok(guard) => {
                        sessions.spawn(handle_session(
                            stream,
                            peer,
                            guard,
                            trigger.subscribe(),
                            config.session.clone(),
                        ));
                    }
                    Err(rejection) => {
                        log::warn!("Rejected {}: {}", peer, rejection);
                        sessions.spawn(reject(stream, rejection));
                    }
                }
            }
            Some(joined) = sessions.join_next(), if !sessions.is_empty() => {
                if let Err(e) = joined {
                    log::error!("Connection task failed: {}", e);
                }
            }
        }
    }

    trigger.trigger();
    while let Some(joined) = sessions.join_next().await {
        if let Err(e) = joined {
            log::error!("Connection task failed: {}", e);
        }
    }
    log::info!("Server stopped");
    Ok(())
}

async fn handle_session(
    stream: TcpStream,
    peer: SocketAddr,
    guard: AdmissionGuard,
    shutdown: Shutdown,
    settings: SessionSettings,
) {
    let id = Uuid::new_v4();
    log::info!("[{}] Connection from {}", id, peer);

    let (rx, tx) = stream.into_split();
    let mut session = Session::new(id, BufReader::new(rx), BufWriter::new(tx), shutdown, settings);

    match session.run().await {
        Ok(_) => log::info!("[{}] Session complete", id),
        Err(e) if e.is_benign() => {
            log::info!("[{}] Session ended while {}: {}", id, session.state(), e)
        }
        Err(e) => log::error!("[{}] Session failed while {}: {}", id, session.state(), e),
    }
    drop(guard);
}

async fn reject(stream: TcpStream, rejection: Rejection) {
    let mut writer = BufWriter::new(stream);
    let mut text = String::new();
    for line in protocol::policy_violation(&rejection.to_string()) {
        text.push_str(&line.to_string());
        text.push_str("\r\n");
    }
    let sent = async {
        writer.write_all(text.as_bytes()).await?;
        writer.shutdown().await
    };
    if let Err(e) = sent.await {
        log::debug!("Could not notify rejected client: {}", e);
    }
}
