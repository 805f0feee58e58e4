//! Stop signal for the HTTP listener and the bounded drain that follows it.

use std::time::Duration;

use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

/// Tells the listener to stop accepting connections.
#[derive(Debug, Default)]
pub struct ShutdownSignal {
    token: CancellationToken,
}

impl ShutdownSignal {
    /// Create an untriggered signal.
    pub fn new() -> Self {
        Self::default()
    }

    /// Token the listener waits on.
    pub fn token(&self) -> CancellationToken {
        self.token.clone()
    }

    /// Stop accepting. Idempotent.
    pub fn trigger(&self) {
        self.token.cancel();
    }

    /// Whether the signal has fired.
    pub fn is_triggered(&self) -> bool {
        self.token.is_cancelled()
    }
}

/// How a drain ended.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DrainOutcome {
    /// The listener finished every in-flight request.
    Drained,
    /// The grace period ran out and the listener was aborted.
    Abandoned,
}

/// Fire `signal`, then give the listener task `grace` to finish in-flight
/// requests before aborting it.
pub async fn drain(
    signal: &ShutdownSignal,
    mut listener: JoinHandle<()>,
    grace: Duration,
) -> DrainOutcome {
    signal.trigger();
    info!(grace_secs = grace.as_secs(), "draining in-flight requests");

    match tokio::time::timeout(grace, &mut listener).await {
        Ok(Ok(())) => DrainOutcome::Drained,
        Ok(Err(e)) => {
            error!(error = %e, "HTTP listener task failed");
            DrainOutcome::Drained
        }
        Err(_) => {
            warn!("drain timed out after {grace:?}, aborting remaining requests");
            listener.abort();
            DrainOutcome::Abandoned
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn trigger_is_idempotent() {
        let signal = ShutdownSignal::new();
        let token = signal.token();
        assert!(!signal.is_triggered());
        signal.trigger();
        signal.trigger();
        assert!(token.is_cancelled());
        assert!(signal.is_triggered());
    }

    #[tokio::test]
    async fn listener_that_honors_the_token_drains() {
        let signal = ShutdownSignal::new();
        let token = signal.token();
        let listener = tokio::spawn(async move { token.cancelled().await });

        let outcome = drain(&signal, listener, Duration::from_secs(5)).await;
        assert_eq!(outcome, DrainOutcome::Drained);
    }

    #[tokio::test(start_paused = true)]
    async fn stuck_listener_is_abandoned_after_grace() {
        let signal = ShutdownSignal::new();
        let listener = tokio::spawn(async {
            tokio::time::sleep(Duration::from_secs(300)).await;
        });

        let outcome = drain(&signal, listener, Duration::from_millis(100)).await;
        assert_eq!(outcome, DrainOutcome::Abandoned);
        assert!(signal.is_triggered());
    }
}
