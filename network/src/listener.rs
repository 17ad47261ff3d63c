//! Inbound TCP listener.

use std::net::SocketAddr;
use std::sync::Arc;

use tokio::net::TcpListener;
use tokio::sync::watch;

use crate::connection::spawn_connection;
use crate::{NetworkError, PeerEvents};

/// A bound listener that accepts peers until shutdown.
pub struct TcpListenerTask {
    listener: TcpListener,
}

impl TcpListenerTask {
    /// Bind to `addr` ("ip:port"; port 0 picks a free port).
    pub async fn bind(addr: &str) -> Result<Self, NetworkError> {
        let listener = TcpListener::bind(addr).await?;
        Ok(Self { listener })
    }

    pub fn local_addr(&self) -> Result<SocketAddr, NetworkError> {
        Ok(self.listener.local_addr()?)
    }

    /// Accept connections and spawn a task for each until the `shutdown`
    /// flag is set or its sender goes away.
    pub async fn run(self, events: Arc<dyn PeerEvents>, mut shutdown: watch::Receiver<bool>) {
        if let Ok(addr) = self.listener.local_addr() {
            tracing::info!(%addr, "P2P listener started");
        }
        loop {
            tokio::select! {
                biased;
                _ = stopped(&mut shutdown) => {
                    tracing::info!("P2P listener shutting down");
                    break;
                }
                accepted = self.listener.accept() => match accepted {
                    Ok((stream, remote)) => {
                        tracing::debug!(%remote, "accepted inbound connection");
                        spawn_connection(stream, remote, Arc::clone(&events));
                    }
                    Err(e) => {
                        tracing::warn!(error = %e, "failed to accept connection");
                    }
                },
            }
        }
    }
}

async fn stopped(shutdown: &mut watch::Receiver<bool>) {
    let _ = shutdown.wait_for(|stopping| *stopping).await;
}
