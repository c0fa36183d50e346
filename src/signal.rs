//! Ctrl-C and SIGTERM handling.

use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;

/// Cancels a token when the process is asked to stop.
///
/// The negotiator checks the token before building each payment, so a signal
/// received mid-negotiation stops it without sending another paid request.
pub struct SigDown {
    task_tracker: TaskTracker,
    cancellation_token: CancellationToken,
}

impl SigDown {
    /// Starts listening for signals. Must be called within a tokio runtime.
    pub fn try_new() -> Result<Self, std::io::Error> {
        #[cfg(unix)]
        let mut sigterm =
            tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())?;
        let token = CancellationToken::new();
        let inner = token.clone();
        let task_tracker = TaskTracker::new();
        task_tracker.spawn(async move {
            #[cfg(unix)]
            let terminate = async move {
                sigterm.recv().await;
            };
            #[cfg(not(unix))]
            let terminate = std::future::pending::<()>();
            tokio::select! {
                _ = tokio::signal::ctrl_c() => {
                    tracing::info!("Interrupted, cancelling negotiation");
                }
                _ = terminate => {
                    tracing::info!("Terminated, cancelling negotiation");
                }
                _ = inner.cancelled() => return,
            }
            inner.cancel();
        });
        task_tracker.close();
        Ok(Self {
            task_tracker,
            cancellation_token: token,
        })
    }

    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancellation_token.clone()
    }

    /// Stops listening and waits for the listener task to exit.
    pub async fn shutdown(self) {
        self.cancellation_token.cancel();
        self.task_tracker.wait().await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_shutdown_stops_listener() {
        let sig_down = SigDown::try_new().unwrap();
        let token = sig_down.cancellation_token();
        assert!(!token.is_cancelled());
        sig_down.shutdown().await;
        assert!(token.is_cancelled());
    }
}
