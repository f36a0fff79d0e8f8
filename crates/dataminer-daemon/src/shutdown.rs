//! Graceful shutdown coordinator.
//!
//! Split out from `main.rs` so the shutdown budget is testable without
//! delivering a real `SIGTERM` — tests call [`graceful_shutdown`]
//! directly instead.

use std::time::Duration;

use tokio::sync::Notify;

use crate::state::ExchangeRuntime;
use crate::wiring::shutdown_exchanges;

/// Total budget allotted to the whole shutdown sequence.
pub const SHUTDOWN_BUDGET: Duration = Duration::from_secs(30);

/// Stops every scheduler (waiting up to `budget`), then every exchange's
/// pairs cache / IP pools, then notifies stream clients to stop.
pub async fn graceful_shutdown(
    exchanges: &[ExchangeRuntime],
    ws_shutdown: &Notify,
    budget: Duration,
) {
    tracing::info!("shutdown initiated, budget={:?}", budget);
    shutdown_exchanges(exchanges, budget).await;
    ws_shutdown.notify_waiters();
    tracing::info!("shutdown complete");
}

/// Waits for either `SIGINT` or `SIGTERM` (on unix) / Ctrl-C (elsewhere).
pub async fn wait_for_shutdown_signal() {
    let ctrl_c = async {
        let _ = tokio::signal::ctrl_c().await;
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(err) => {
                tracing::warn!(error = %err, "failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => tracing::info!("received SIGINT"),
        _ = terminate => tracing::info!("received SIGTERM"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[tokio::test]
    async fn graceful_shutdown_with_no_exchanges_completes_immediately() {
        let shutdown = Arc::new(Notify::new());
        let deadline = tokio::time::timeout(
            Duration::from_secs(1),
            graceful_shutdown(&[], &shutdown, Duration::from_millis(100)),
        )
        .await;
        assert!(deadline.is_ok());
    }
}
