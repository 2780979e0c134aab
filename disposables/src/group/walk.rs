//! Reverse-order release walks over a claimed registry snapshot.

use futures::future::{self, BoxFuture, FutureExt};
use futures::ready;
use std::future::Future;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};
use tracing::{debug, trace, warn};

use super::TeardownMode;
use crate::disposable::{poll_now, AsyncDispose, Dispose, Resource};
use crate::errors::{DisposeError, Result};

type Signal = BoxFuture<'static, Result<()>>;

/// Keeps the first failure of a walk and logs the ones after it.
struct Failures {
    group: Arc<str>,
    first: Option<DisposeError>,
}

impl Failures {
    fn new(group: Arc<str>) -> Self {
        Self { group, first: None }
    }

    fn record(&mut self, outcome: Result<()>) {
        let Err(err) = outcome else {
            return;
        };

        if self.first.is_some() {
            warn!(group = %self.group, error = %err, "Resource release failed");
        } else {
            debug!(group = %self.group, error = %err, "First resource release failure");
            self.first = Some(err);
        }
    }

    fn finish(self) -> Result<()> {
        self.first.map_or(Ok(()), Err)
    }
}

fn invoke_sync(index: usize, name: &str, disposable: &Arc<dyn Dispose>) -> Result<()> {
    match catch_unwind(AssertUnwindSafe(|| disposable.dispose())) {
        Ok(Ok(())) => Ok(()),
        Ok(Err(source)) => Err(DisposeError::release(index, name, source)),
        Err(payload) => Err(DisposeError::panicked(index, name, payload.as_ref())),
    }
}

fn start_async(index: usize, name: &str, disposable: &Arc<dyn AsyncDispose>) -> Signal {
    let name = name.to_string();
    match catch_unwind(AssertUnwindSafe(|| disposable.dispose_async())) {
        Ok(signal) => AssertUnwindSafe(signal)
            .catch_unwind()
            .map(move |outcome| match outcome {
                Ok(Ok(())) => Ok(()),
                Ok(Err(source)) => Err(DisposeError::release(index, name, source)),
                Err(payload) => Err(DisposeError::panicked(index, name, payload.as_ref())),
            })
            .boxed(),
        Err(payload) => future::ready(Err(DisposeError::panicked(index, name, payload.as_ref())))
            .boxed(),
    }
}

/// Releases `items` last-to-first using their immediate release.
///
/// Item failures do not stop the walk; the first one is returned. An async-only item
/// is skipped under [`TeardownMode::Lenient`] and stops the walk under
/// [`TeardownMode::Strict`]. The stop reports `UnsupportedSyncTeardown` unless an item
/// released before it already failed, in which case that failure is returned.
pub(crate) fn release_sync(items: &[Resource], mode: TeardownMode, group: Arc<str>) -> Result<()> {
    let mut failures = Failures::new(group);

    for (index, item) in items.iter().enumerate().rev() {
        if let Some(disposable) = item.as_dispose() {
            trace!(group = %failures.group, index, resource = item.name(), "Releasing resource");
            failures.record(invoke_sync(index, item.name(), disposable));
            continue;
        }

        match mode {
            TeardownMode::Strict => {
                warn!(
                    group = %failures.group,
                    index,
                    resource = item.name(),
                    "Strict teardown stopped at a resource that only supports async release"
                );
                return Err(failures.first.take().unwrap_or_else(|| {
                    DisposeError::UnsupportedSyncTeardown {
                        index,
                        name: item.name().to_string(),
                    }
                }));
            }
            TeardownMode::Lenient => {
                debug!(
                    group = %failures.group,
                    index,
                    resource = item.name(),
                    "Skipping async-only resource during sync teardown"
                );
            }
        }
    }

    failures.finish()
}

/// State of a suspending walk: the snapshot, how far down it has got, and the first
/// failure so far.
pub(crate) struct AsyncWalk {
    items: Vec<Resource>,
    remaining: usize,
    failures: Failures,
}

impl AsyncWalk {
    pub(crate) fn new(items: Vec<Resource>, group: Arc<str>) -> Self {
        Self {
            remaining: items.len(),
            items,
            failures: Failures::new(group),
        }
    }

    /// Runs the walk until it finishes or an item's release does not complete
    /// synchronously.
    pub(crate) fn start(mut self) -> Teardown {
        while let Some(index) = self.next_index() {
            let Some(mut signal) = self.release(index) else {
                continue;
            };

            match poll_now(&mut signal) {
                Poll::Ready(outcome) => self.failures.record(outcome),
                Poll::Pending => {
                    debug!(
                        group = %self.failures.group,
                        index,
                        "Teardown suspended on pending release"
                    );
                    return Teardown::suspended(self.resume(signal).boxed());
                }
            }
        }

        Teardown::ready(self.failures.finish())
    }

    async fn resume(mut self, signal: Signal) -> Result<()> {
        let outcome = signal.await;
        self.failures.record(outcome);

        while let Some(index) = self.next_index() {
            if let Some(signal) = self.release(index) {
                let outcome = signal.await;
                self.failures.record(outcome);
            }
        }

        debug!(group = %self.failures.group, "Suspended teardown finished");
        self.failures.finish()
    }

    fn next_index(&mut self) -> Option<usize> {
        self.remaining = self.remaining.checked_sub(1)?;
        Some(self.remaining)
    }

    /// Starts releasing the item at `index`. Returns its signal when the item is
    /// released asynchronously; synchronous releases are recorded on the spot.
    fn release(&mut self, index: usize) -> Option<Signal> {
        let item = &self.items[index];
        trace!(group = %self.failures.group, index, resource = item.name(), "Releasing resource");

        if let Some(disposable) = item.as_async_dispose() {
            return Some(start_async(index, item.name(), disposable));
        }
        if let Some(disposable) = item.as_dispose() {
            self.failures.record(invoke_sync(index, item.name(), disposable));
        }
        None
    }
}

enum TeardownState {
    Complete(Option<Result<()>>),
    Suspended(Signal),
}

/// Completion signal of a suspending group teardown.
///
/// When no release suspended, the teardown has already finished by the time
/// `teardown_async` returns and [`Teardown::is_complete`] is true. Otherwise awaiting it
/// drives the remaining releases in reverse registration order.
///
/// Dropping a suspended `Teardown` abandons the releases that have not run yet; the
/// group stays torn down.
#[must_use = "a suspended teardown only releases the remaining resources when awaited"]
pub struct Teardown {
    state: TeardownState,
}

impl Teardown {
    pub(crate) fn ready(result: Result<()>) -> Self {
        Self {
            state: TeardownState::Complete(Some(result)),
        }
    }

    fn suspended(signal: Signal) -> Self {
        Self {
            state: TeardownState::Suspended(signal),
        }
    }

    /// Returns true if the teardown has finished.
    #[must_use]
    pub const fn is_complete(&self) -> bool {
        matches!(self.state, TeardownState::Complete(_))
    }
}

impl Future for Teardown {
    type Output = Result<()>;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        let this = &mut *self;
        match &mut this.state {
            // Polling again after completion reports success, like a repeat teardown.
            TeardownState::Complete(result) => Poll::Ready(result.take().unwrap_or(Ok(()))),
            TeardownState::Suspended(signal) => {
                let result = ready!(signal.as_mut().poll(cx));
                this.state = TeardownState::Complete(None);
                Poll::Ready(result)
            }
        }
    }
}

impl std::fmt::Debug for Teardown {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Teardown")
            .field("complete", &self.is_complete())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::disposable::{create, create_async, try_create};
    use crate::testing::ReleaseLog;
    use pretty_assertions::assert_eq;

    fn group() -> Arc<str> {
        Arc::from("walk-test")
    }

    #[test]
    fn test_sync_walk_reverse_order() {
        let log = ReleaseLog::new();
        let items: Vec<_> = (0..4)
            .map(|i| {
                let log = log.clone();
                create(move || log.push(i))
            })
            .collect();

        release_sync(&items, TeardownMode::Lenient, group()).unwrap();
        assert_eq!(log.entries(), vec![3, 2, 1, 0]);
    }

    #[test]
    fn test_sync_walk_returns_first_failure_and_continues() {
        let log = ReleaseLog::new();
        let log0 = log.clone();
        let items = vec![
            create(move || log0.push(0)),
            try_create(|| Err::<(), _>(anyhow::anyhow!("second"))),
            try_create(|| Err::<(), _>(anyhow::anyhow!("first"))),
        ];

        let err = release_sync(&items, TeardownMode::Lenient, group()).unwrap_err();
        assert_eq!(err.index(), Some(2));
        assert_eq!(log.entries(), vec![0]);
    }

    #[test]
    fn test_sync_walk_catches_panics() {
        let log = ReleaseLog::new();
        let log0 = log.clone();
        let items = vec![create(move || log0.push(0)), create(|| panic!("release exploded"))];

        let err = release_sync(&items, TeardownMode::Strict, group()).unwrap_err();
        match err {
            DisposeError::Panicked { index, message, .. } => {
                assert_eq!(index, 1);
                assert_eq!(message, "release exploded");
            }
            other => panic!("unexpected error: {other}"),
        }
        assert_eq!(log.entries(), vec![0]);
    }

    #[test]
    fn test_strict_stop_returns_earlier_failure() {
        let items = vec![
            create_async(|| async {}),
            try_create(|| Err::<(), _>(anyhow::anyhow!("stuck"))),
        ];

        let err = release_sync(&items, TeardownMode::Strict, group()).unwrap_err();
        assert!(matches!(err, DisposeError::Release { index: 1, .. }));

        let items = vec![create_async(|| async {}), create(|| {})];
        let err = release_sync(&items, TeardownMode::Strict, group()).unwrap_err();
        assert!(matches!(err, DisposeError::UnsupportedSyncTeardown { index: 0, .. }));
    }

    #[test]
    fn test_failures_keep_only_the_first() {
        let mut failures = Failures::new(group());
        failures.record(Ok(()));
        failures.record(Err(DisposeError::invalid_argument("first")));
        failures.record(Err(DisposeError::AlreadyTornDown));

        match failures.finish() {
            Err(DisposeError::InvalidArgument(message)) => assert_eq!(message, "first"),
            other => panic!("unexpected outcome: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_async_walk_all_ready_completes_synchronously() {
        let log = ReleaseLog::new();
        let log0 = log.clone();
        let log1 = log.clone();
        let items = vec![
            create(move || log0.push(0)),
            create_async(move || async move { log1.push(1) }),
        ];

        let teardown = AsyncWalk::new(items, group()).start();
        assert!(teardown.is_complete());
        assert_eq!(log.entries(), vec![1, 0]);
        teardown.await.unwrap();
    }

    async fn explode_after_yield() {
        tokio::task::yield_now().await;
        panic!("async release exploded");
    }

    #[tokio::test]
    async fn test_async_walk_panic_in_signal_is_reported() {
        let items = vec![create_async(explode_after_yield)];

        let err = AsyncWalk::new(items, group()).start().await.unwrap_err();
        assert!(matches!(err, DisposeError::Panicked { index: 0, .. }));
    }

    #[tokio::test]
    async fn test_teardown_polled_after_completion_is_ok() {
        let mut teardown = Teardown::ready(Err(DisposeError::AlreadyTornDown));
        assert!((&mut teardown).await.is_err());
        assert!((&mut teardown).await.is_ok());
    }
}
