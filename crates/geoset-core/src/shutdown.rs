//! Shutdown coordination for geoset runs.
//!
//! SIGINT/SIGTERM flip a `watch` flag that every pipeline stage can observe:
//! the admission wait loop and the chunk loop return [`Error::Cancelled`]
//! when it is set. In-flight items are abandoned; no queue row is touched,
//! because rows are only added after a successful write.

use tokio::sync::watch;

use crate::{Error, Result};

/// Owner side of the shutdown flag.
#[derive(Debug)]
pub struct ShutdownCoordinator {
    shutdown_tx: watch::Sender<bool>,
}

/// Cheap, cloneable observer of the shutdown flag.
#[derive(Debug, Clone)]
pub struct ShutdownToken {
    shutdown_rx: watch::Receiver<bool>,
}

impl ShutdownCoordinator {
    pub fn new() -> Self {
        let (shutdown_tx, _) = watch::channel(false);
        Self { shutdown_tx }
    }

    /// Get a token for observing shutdown in async loops.
    pub fn token(&self) -> ShutdownToken {
        ShutdownToken {
            shutdown_rx: self.shutdown_tx.subscribe(),
        }
    }

    /// Request shutdown. Idempotent.
    pub fn shutdown(&self) {
        if !*self.shutdown_tx.borrow() {
            tracing::info!("Initiating shutdown, abandoning in-flight items");
        }
        self.shutdown_tx.send_replace(true);
    }

    pub fn is_shutting_down(&self) -> bool {
        *self.shutdown_tx.borrow()
    }

    /// Spawn a task that requests shutdown on SIGINT or SIGTERM.
    ///
    /// Must be called from within a tokio runtime.
    pub fn listen_for_signals(&self) -> Result<()> {
        let tx = self.shutdown_tx.clone();

        #[cfg(unix)]
        {
            use tokio::signal::unix::{signal, SignalKind};

            let mut sigint = signal(SignalKind::interrupt())
                .map_err(|e| Error::io(format!("Failed to setup SIGINT: {e}")))?;
            let mut sigterm = signal(SignalKind::terminate())
                .map_err(|e| Error::io(format!("Failed to setup SIGTERM: {e}")))?;

            tokio::spawn(async move {
                tokio::select! {
                    _ = sigint.recv() => tracing::info!("Received SIGINT"),
                    _ = sigterm.recv() => tracing::info!("Received SIGTERM"),
                }
                tx.send_replace(true);
            });
        }

        #[cfg(not(unix))]
        {
            tokio::spawn(async move {
                if tokio::signal::ctrl_c().await.is_ok() {
                    tracing::info!("Received Ctrl-C");
                    tx.send_replace(true);
                }
            });
        }

        Ok(())
    }
}

impl Default for ShutdownCoordinator {
    fn default() -> Self {
        Self::new()
    }
}

impl ShutdownToken {
    /// A token that is never cancelled.
    pub fn never() -> Self {
        let (tx, shutdown_rx) = watch::channel(false);
        // Dropping the sender leaves the value at `false` forever.
        drop(tx);
        Self { shutdown_rx }
    }

    pub fn is_cancelled(&self) -> bool {
        *self.shutdown_rx.borrow()
    }

    /// Fail with [`Error::Cancelled`] if shutdown was requested.
    pub fn check(&self, context: &str) -> Result<()> {
        if self.is_cancelled() {
            Err(Error::cancelled(context.to_string()))
        } else {
            Ok(())
        }
    }

    /// Resolve once shutdown is requested. Pends forever if it never is.
    pub async fn cancelled(&mut self) {
        let sender_gone = self.shutdown_rx.wait_for(|flag| *flag).await.is_err();
        if sender_gone {
            std::future::pending::<()>().await;
        }
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;

    #[tokio::test]
    async fn test_token_starts_not_cancelled() {
        let coordinator = ShutdownCoordinator::new();
        let token = coordinator.token();
        assert!(!coordinator.is_shutting_down());
        assert!(!token.is_cancelled());
        assert!(token.check("run").is_ok());
    }

    #[tokio::test]
    async fn test_shutdown_reaches_existing_tokens() {
        let coordinator = ShutdownCoordinator::new();
        let mut token = coordinator.token();

        coordinator.shutdown();
        coordinator.shutdown();

        let waited = tokio::time::timeout(Duration::from_secs(1), token.cancelled()).await;
        assert!(waited.is_ok());
        assert!(matches!(token.check("run"), Err(Error::Cancelled(_))));
    }

    #[tokio::test]
    async fn test_never_token_stays_pending() {
        let mut token = ShutdownToken::never();
        let waited = tokio::time::timeout(Duration::from_millis(50), token.cancelled()).await;
        assert!(waited.is_err());
        assert!(!token.is_cancelled());
    }
}
