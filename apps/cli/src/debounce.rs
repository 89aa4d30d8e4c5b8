//! Debounce combinators for the tokio runtime.
//!
//! A call made less than `wait` after the previous one cancels the pending call and
//! restarts the timer, so only the last call of a burst runs. This is not a throttle:
//! there is no maximum wait, and a steady stream of calls postpones execution forever.
//! Once the timer has fired the target runs to completion even if new calls arrive.

use std::future::Future;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;

/// Pending timer shared by a wrapper and its clones.
#[derive(Default)]
struct Slot {
    pending: Mutex<Option<JoinHandle<()>>>,
}

impl Slot {
    /// Abort the pending timer, if any, and install `next` in its place.
    fn replace(&self, next: Option<JoinHandle<()>>) {
        let mut pending = self.pending.lock().unwrap_or_else(|e| e.into_inner());
        if let Some(previous) = pending.take() {
            if !previous.is_finished() {
                tracing::debug!("Debounced call superseded");
            }
            previous.abort();
        }
        *pending = next;
    }
}

/// Fire-and-forget debounced wrapper around a synchronous function.
pub struct Debounced<F> {
    target: Arc<F>,
    wait: Duration,
    slot: Arc<Slot>,
}

impl<F> Clone for Debounced<F> {
    fn clone(&self) -> Self {
        Self {
            target: Arc::clone(&self.target),
            wait: self.wait,
            slot: Arc::clone(&self.slot),
        }
    }
}

/// Wrap `target` so bursts of calls collapse into the last one.
pub fn debounce<F>(target: F, wait: Duration) -> Debounced<F> {
    Debounced {
        target: Arc::new(target),
        wait,
        slot: Arc::new(Slot::default()),
    }
}

impl<F> Debounced<F> {
    pub fn wait(&self) -> Duration {
        self.wait
    }

    /// Schedule `target(args)` after the wait, replacing any pending call.
    ///
    /// Must be called from within a tokio runtime.
    pub fn call<A>(&self, args: A)
    where
        F: Fn(A) + Send + Sync + 'static,
        A: Send + 'static,
    {
        let target = Arc::clone(&self.target);
        let wait = self.wait;
        let timer = tokio::spawn(async move {
            tokio::time::sleep(wait).await;
            // No await point past the timer: an abort can no longer interrupt the call.
            target(args);
        });
        self.slot.replace(Some(timer));
    }

    /// Drop the pending call without running it.
    pub fn cancel(&self) {
        self.slot.replace(None);
    }
}

/// Debounced wrapper around an async function whose outcome is handed back to the
/// caller that triggered it.
pub struct DebouncedAsync<F> {
    target: Arc<F>,
    wait: Duration,
    slot: Arc<Slot>,
}

impl<F> Clone for DebouncedAsync<F> {
    fn clone(&self) -> Self {
        Self {
            target: Arc::clone(&self.target),
            wait: self.wait,
            slot: Arc::clone(&self.slot),
        }
    }
}

/// Wrap an async `target` so bursts of calls collapse into the last one.
pub fn debounce_async<F>(target: F, wait: Duration) -> DebouncedAsync<F> {
    DebouncedAsync {
        target: Arc::new(target),
        wait,
        slot: Arc::new(Slot::default()),
    }
}

impl<F> DebouncedAsync<F> {
    pub fn wait(&self) -> Duration {
        self.wait
    }

    /// Schedule `target(args)` after the wait, replacing any pending call.
    ///
    /// The returned future resolves to `Some(outcome)` for the call that ran and to
    /// `None` for a call that was superseded or cancelled. Errors of the target are part
    /// of its outcome. Must be called from within a tokio runtime.
    pub fn call<A, Fut>(&self, args: A) -> impl Future<Output = Option<Fut::Output>>
    where
        F: Fn(A) -> Fut + Send + Sync + 'static,
        A: Send + 'static,
        Fut: Future + Send + 'static,
        Fut::Output: Send + 'static,
    {
        let (tx, rx) = oneshot::channel();
        let target = Arc::clone(&self.target);
        let wait = self.wait;

        let timer = tokio::spawn(async move {
            tokio::time::sleep(wait).await;
            let run = target(args);
            // Detach so a later abort of the timer cannot cancel the running call.
            tokio::spawn(async move {
                let outcome = run.await;
                let _ = tx.send(outcome);
            });
        });
        self.slot.replace(Some(timer));

        async move { rx.await.ok() }
    }

    /// Drop the pending call without running it. Its caller sees `None`.
    pub fn cancel(&self) {
        self.slot.replace(None);
    }
}
