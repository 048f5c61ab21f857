//! Trailing-edge debounce timer.

use std::future::Future;
use std::time::Duration;

use tokio::task::JoinHandle;

/// A single-slot debounce timer.
///
/// Holding exactly one pending task at a time is what guarantees the engine
/// never has two remote upserts in flight for the same identity: scheduling
/// cancels whatever was pending, so only the action current at the moment
/// the timer fires ever runs (last-write-wins).
#[derive(Debug, Default)]
pub struct Debouncer {
    pending: Option<JoinHandle<()>>,
}

impl Debouncer {
    /// Create an idle debouncer.
    #[must_use]
    pub const fn new() -> Self {
        Self { pending: None }
    }

    /// Cancel any pending action and schedule `action` to run after `delay`.
    ///
    /// Must be called from within a tokio runtime.
    pub fn schedule<F>(&mut self, delay: Duration, action: F)
    where
        F: Future<Output = ()> + Send + 'static,
    {
        self.cancel();
        self.pending = Some(tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            action.await;
        }));
    }

    /// Cancel the pending action without running it.
    pub fn cancel(&mut self) {
        if let Some(handle) = self.pending.take() {
            handle.abort();
        }
    }
}

impl Drop for Debouncer {
    fn drop(&mut self) {
        self.cancel();
    }
}
