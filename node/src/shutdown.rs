//! Stop signal shared by the consumer task, the P2P listener and the daemon.
//!
//! The signal is a `watch` flag rather than an event, so a task that
//! subscribes after shutdown was requested still stops.

use std::sync::Arc;

use tokio::signal;
use tokio::sync::watch;

/// Clones share one flag. Tasks holding a receiver wait with [`stopped`].
#[derive(Clone)]
pub struct ShutdownController {
    tx: Arc<watch::Sender<bool>>,
}

impl ShutdownController {
    pub fn new() -> Self {
        let (tx, _) = watch::channel(false);
        Self { tx: Arc::new(tx) }
    }

    pub fn subscribe(&self) -> watch::Receiver<bool> {
        self.tx.subscribe()
    }

    /// Request shutdown. Idempotent.
    pub fn shutdown(&self) {
        self.tx.send_replace(true);
    }

    pub fn is_shutdown(&self) -> bool {
        *self.tx.borrow()
    }

    /// Block until SIGINT, SIGTERM or a programmatic [`shutdown`](Self::shutdown),
    /// then make sure the flag is set.
    pub async fn wait_for_signal(&self) {
        let mut requested = self.subscribe();
        tokio::select! {
            _ = signal::ctrl_c() => tracing::info!("received SIGINT"),
            _ = terminate() => tracing::info!("received SIGTERM"),
            _ = stopped(&mut requested) => {}
        }
        self.shutdown();
    }
}

/// Resolve once the flag is set, or once every controller is gone.
pub async fn stopped(rx: &mut watch::Receiver<bool>) {
    let _ = rx.wait_for(|stopping| *stopping).await;
}

#[cfg(unix)]
async fn terminate() {
    match signal::unix::signal(signal::unix::SignalKind::terminate()) {
        Ok(mut stream) => {
            stream.recv().await;
        }
        Err(e) => {
            tracing::warn!(error = %e, "SIGTERM handler unavailable");
            std::future::pending::<()>().await;
        }
    }
}

#[cfg(not(unix))]
async fn terminate() {
    std::future::pending::<()>().await;
}

impl Default for ShutdownController {
    fn default() -> Self {
        Self::new()
    }
}
