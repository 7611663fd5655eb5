//! Background loop turning scheduler signals into expiration calls.

use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::mpsc;

use crate::domain::events::ExpirationSignal;
use crate::error::LifecycleError;

/// Receiver side of scheduler firings.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ExpirationHandler: Send + Sync {
    /// Handles one firing. Must tolerate repeated and stale signals.
    async fn handle_expiration(&self, signal: ExpirationSignal) -> Result<(), LifecycleError>;
}

/// Drains `rx` until every sender is gone.
///
/// Each signal runs on its own task so that entries expire independently;
/// ordering per code is enforced by the handler, not here.
pub async fn run_expiration_worker<H>(mut rx: mpsc::Receiver<ExpirationSignal>, handler: Arc<H>)
where
    H: ExpirationHandler + ?Sized + 'static,
{
    tracing::debug!("Expiration worker started");

    while let Some(signal) = rx.recv().await {
        let handler = Arc::clone(&handler);
        tokio::spawn(async move {
            let code = signal.code.clone();
            if let Err(e) = handler.handle_expiration(signal).await {
                tracing::warn!(code = %code, error = %e, "Expiration callback failed");
            }
        });
    }

    tracing::debug!("Expiration worker stopped");
}
