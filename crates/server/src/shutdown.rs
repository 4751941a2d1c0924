// crates/server/src/shutdown.rs
use std::sync::Arc;

use jobcast_jobs::JobRegistry;

/// Wait for SIGINT (Ctrl-C) or SIGTERM, then cancel every live job.
///
/// Cancelled jobs end their streams, so open progress responses finish and
/// the server can drain.
pub async fn shutdown_signal(registry: Arc<JobRegistry>) {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to install Ctrl-C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {
            tracing::info!("Received SIGINT (Ctrl-C), starting graceful shutdown");
        }
        () = terminate => {
            tracing::info!("Received SIGTERM, starting graceful shutdown");
        }
    }

    let cancelled = registry.cancel_all();
    tracing::info!(cancelled, "Cancelled live jobs");
}
