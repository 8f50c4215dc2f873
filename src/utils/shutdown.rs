use std::future::Future;
use std::io;

use tracing::{error, info};

/// Resolves once `signal` fires. A signal listener that cannot be installed
/// also ends the wait, after logging why.
pub async fn wait_for<F>(signal: F)
where
    F: Future<Output = io::Result<()>>,
{
    match signal.await {
        Ok(()) => info!("shutdown signal received, shutting down gracefully"),
        Err(err) => error!("failed to listen for the shutdown signal, shutting down: {}", err),
    }
}

/// Ctrl-C.
pub async fn ctrl_c() {
    wait_for(tokio::signal::ctrl_c()).await
}
