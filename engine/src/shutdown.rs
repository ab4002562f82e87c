//! Stopping the Agora daemon.
//!
//! The HTTP API, the standings fan-out socket and the lifecycle re-check loop
//! all stop on one signal. It fires on SIGINT or SIGTERM, or when either
//! server exits on its own, so a port that fails to bind does not leave the
//! other half of the daemon serving.

use std::future::Future;
use tokio::signal;
use tokio::sync::broadcast;
use tracing::{info, warn};

/// The re-check loop holds a [`subscribe`](Self::subscribe) receiver; each
/// server gets a [`signalled`](Self::signalled) future for axum's graceful
/// shutdown. Take both before triggering, since a receiver created after
/// [`shutdown`](Self::shutdown) never fires.
pub struct ShutdownController {
    tx: broadcast::Sender<()>,
}

impl ShutdownController {
    pub fn new() -> Self {
        let (tx, _) = broadcast::channel(1);
        Self { tx }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<()> {
        self.tx.subscribe()
    }

    /// A future that resolves once shutdown is triggered.
    pub fn signalled(&self) -> impl Future<Output = ()> + Send + 'static {
        let mut rx = self.subscribe();
        async move {
            let _ = rx.recv().await;
        }
    }

    /// Trigger shutdown programmatically.
    pub fn shutdown(&self) {
        let _ = self.tx.send(());
    }

    /// Wait for SIGTERM or SIGINT, then trigger shutdown.
    pub async fn wait_for_signal(&self) {
        #[cfg(unix)]
        let terminate = async {
            match signal::unix::signal(signal::unix::SignalKind::terminate()) {
                Ok(mut sigterm) => {
                    sigterm.recv().await;
                }
                Err(e) => {
                    warn!("failed to install SIGTERM handler: {e}");
                    std::future::pending::<()>().await;
                }
            }
        };

        #[cfg(not(unix))]
        let terminate = std::future::pending::<()>();

        tokio::select! {
            _ = signal::ctrl_c() => { info!("received SIGINT, shutting down"); }
            _ = terminate => { info!("received SIGTERM, shutting down"); }
        }

        self.shutdown();
    }
}

impl Default for ShutdownController {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn programmatic_shutdown_notifies_subscribers() {
        let controller = ShutdownController::new();
        let mut rx1 = controller.subscribe();
        let mut rx2 = controller.subscribe();
        controller.shutdown();
        assert!(rx1.recv().await.is_ok());
        assert!(rx2.recv().await.is_ok());
    }

    #[tokio::test]
    async fn one_server_exiting_stops_the_other() {
        let controller = ShutdownController::new();
        let (api_stop, socket_stop) = (controller.signalled(), controller.signalled());
        let mut recheck = controller.subscribe();

        let (api, socket) = tokio::join!(
            async {
                // Bind failure: returns immediately.
                controller.shutdown();
                "api exited"
            },
            async {
                socket_stop.await;
                "socket drained"
            },
        );
        assert_eq!((api, socket), ("api exited", "socket drained"));
        api_stop.await;
        assert!(recheck.recv().await.is_ok());
    }

    #[tokio::test]
    async fn signalled_future_resolves_on_shutdown() {
        let controller = ShutdownController::new();
        let done = tokio::spawn(controller.signalled());
        controller.shutdown();
        done.await.unwrap();
    }
}
