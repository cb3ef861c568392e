//! Run-scoped cooperative cancellation.
//!
//! A `CancelToken` is cloned into every suspension point of a run (the
//! service call and the backoff sleep race against it). Dropping the
//! handle without cancelling leaves the token inert.

use tokio::sync::watch;

/// Sender half; owned by whoever may abort the run.
#[derive(Debug)]
pub struct CancelHandle {
    tx: watch::Sender<bool>,
}

impl CancelHandle {
    /// Signal cancellation. Idempotent.
    pub fn cancel(&self) {
        let _ = self.tx.send(true);
    }
}

/// Receiver half; observed at every suspension point.
#[derive(Debug, Clone)]
pub struct CancelToken {
    rx: watch::Receiver<bool>,
}

impl CancelToken {
    /// A token that can never fire (no handle exists).
    pub fn inert() -> Self {
        let (_, token) = cancel_pair();
        token
    }

    /// Whether cancellation has been requested.
    pub fn is_cancelled(&self) -> bool {
        *self.rx.borrow()
    }

    /// Resolve when cancellation is requested; pend forever otherwise.
    pub async fn cancelled(&self) {
        let mut rx = self.rx.clone();
        if rx.wait_for(|cancelled| *cancelled).await.is_err() {
            // Handle dropped without cancelling; nothing can fire anymore.
            std::future::pending::<()>().await;
        }
    }
}

/// Create a connected handle/token pair for one run.
pub fn cancel_pair() -> (CancelHandle, CancelToken) {
    let (tx, rx) = watch::channel(false);
    (CancelHandle { tx }, CancelToken { rx })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn test_cancel_fires_waiters() {
        let (handle, token) = cancel_pair();
        assert!(!token.is_cancelled());

        let waiter = tokio::spawn({
            let token = token.clone();
            async move { token.cancelled().await }
        });
        handle.cancel();

        tokio::time::timeout(Duration::from_secs(1), waiter)
            .await
            .expect("waiter should resolve after cancel")
            .unwrap();
        assert!(token.is_cancelled());
    }

    #[test]
    fn test_inert_token_never_reports_cancelled() {
        let token = CancelToken::inert();
        assert!(!token.is_cancelled());
    }
}
