//! OS signal handling.
//!
//! SIGINT (Ctrl+C) and SIGTERM both resolve the shutdown future; the
//! supervisor then cancels every listener.

use tokio::signal;

/// Resolves when the process is asked to stop.
pub async fn shutdown_signal() {
    tokio::select! {
        result = signal::ctrl_c() => {
            if let Err(e) = result {
                tracing::warn!(error = %e, "Could not listen for Ctrl+C");
                std::future::pending::<()>().await;
            }
            tracing::info!("Received SIGINT, shutting down");
        }
        _ = terminate() => {
            tracing::info!("Received SIGTERM, shutting down");
        }
    }
}

#[cfg(unix)]
async fn terminate() {
    use tokio::signal::unix::{signal, SignalKind};

    match signal(SignalKind::terminate()) {
        Ok(mut sigterm) => {
            sigterm.recv().await;
        }
        Err(e) => {
            tracing::warn!(error = %e, "Could not register SIGTERM handler");
            std::future::pending::<()>().await;
        }
    }
}

#[cfg(not(unix))]
async fn terminate() {
    std::future::pending::<()>().await;
}
