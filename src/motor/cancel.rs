// Cancellation for scheduled motions
//
// A `CancelToken` is checked by the async move/turn at every suspension point
// (once per ramp step). `MotionTask` bundles a spawned motion with its token.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use tokio::sync::Notify;
use tokio::task::JoinHandle;

use super::error::Result;

/// How a scheduled motion ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MotionOutcome {
    /// Ran its full duration (and stopped the tracks if asked to)
    Completed,
    /// Aborted at a suspension point; tracks keep their last applied speeds
    Cancelled,
}

#[derive(Debug, Default)]
struct CancelInner {
    cancelled: AtomicBool,
    notify: Notify,
}

/// Cloneable cancellation flag that can also be awaited
#[derive(Debug, Clone, Default)]
pub struct CancelToken {
    inner: Arc<CancelInner>,
}

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.inner.cancelled.store(true, Ordering::SeqCst);
        self.inner.notify.notify_waiters();
    }

    pub fn is_cancelled(&self) -> bool {
        self.inner.cancelled.load(Ordering::SeqCst)
    }

    /// Resolves once `cancel()` has been called
    pub async fn cancelled(&self) {
        loop {
            let notified = self.inner.notify.notified();
            tokio::pin!(notified);
            // Register before checking the flag so a concurrent cancel is not missed
            notified.as_mut().enable();
            if self.is_cancelled() {
                return;
            }
            notified.await;
        }
    }
}

/// Handle to a motion running on the tokio runtime
#[derive(Debug)]
pub struct MotionTask {
    token: CancelToken,
    handle: JoinHandle<Result<MotionOutcome>>,
}

impl MotionTask {
    pub(crate) fn new(token: CancelToken, handle: JoinHandle<Result<MotionOutcome>>) -> Self {
        Self { token, handle }
    }

    /// Request cancellation; observed at the motion's next suspension point
    pub fn cancel(&self) {
        self.token.cancel();
    }

    pub fn token(&self) -> &CancelToken {
        &self.token
    }

    pub fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }

    /// Wait for the motion to end
    pub async fn join(self) -> Result<MotionOutcome> {
        match self.handle.await {
            Ok(result) => result,
            Err(e) if e.is_panic() => std::panic::resume_unwind(e.into_panic()),
            // Task aborted by the runtime shutting down
            Err(_) => Ok(MotionOutcome::Cancelled),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn test_cancelled_resolves_after_cancel() {
        let token = CancelToken::new();
        let waiter = token.clone();
        let handle = tokio::spawn(async move { waiter.cancelled().await });
        tokio::task::yield_now().await;
        assert!(!token.is_cancelled());
        token.cancel();
        tokio::time::timeout(Duration::from_secs(1), handle)
            .await
            .expect("waiter should wake")
            .unwrap();
    }

    #[tokio::test]
    async fn test_cancel_before_wait() {
        let token = CancelToken::new();
        token.cancel();
        token.cancelled().await;
        assert!(token.is_cancelled());
    }
}
