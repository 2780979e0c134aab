//! Disposables backed by a one-shot closure.

use crossbeam::atomic::AtomicCell;
use futures::future::{self, FutureExt};
use std::future::Future;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::task::Poll;

use super::traits::poll_now;
use super::{AsyncDispose, Dispose, IntoReleaseResult, ReleaseFuture, Resource};

type Action = Box<dyn FnOnce() -> anyhow::Result<()> + Send>;
type AsyncAction = Box<dyn FnOnce() -> ReleaseFuture + Send>;

/// One-shot slot for a boxed closure.
///
/// The closure is boxed a second time so the slot holds a thin pointer; `AtomicCell`
/// then claims it with a single atomic swap instead of a lock.
struct Claim<T> {
    slot: AtomicCell<Option<Box<T>>>,
    claimed: AtomicBool,
}

impl<T> Claim<T> {
    fn new(value: T) -> Self {
        Self {
            slot: AtomicCell::new(Some(Box::new(value))),
            claimed: AtomicBool::new(false),
        }
    }

    /// Takes the value; only the first caller gets it.
    fn take(&self) -> Option<T> {
        let value = self.slot.take()?;
        self.claimed.store(true, Ordering::Release);
        Some(*value)
    }

    fn is_claimed(&self) -> bool {
        self.claimed.load(Ordering::Acquire)
    }
}

/// Runs a closure the first time it is disposed.
///
/// The closure is claimed with a single atomic swap, so it runs at most once even when
/// several threads dispose concurrently. Later calls are no-ops that return `Ok(())`.
pub struct ActionDisposable {
    action: Claim<Action>,
}

impl ActionDisposable {
    /// Creates a disposable that runs `action` on first disposal.
    pub fn new<F, R>(action: F) -> Self
    where
        F: FnOnce() -> R + Send + 'static,
        R: IntoReleaseResult,
    {
        let action: Action = Box::new(move || action().into_release_result());
        Self {
            action: Claim::new(action),
        }
    }

    /// Returns true once the action has been claimed.
    #[must_use]
    pub fn is_disposed(&self) -> bool {
        self.action.is_claimed()
    }
}

impl Dispose for ActionDisposable {
    fn dispose(&self) -> anyhow::Result<()> {
        self.action.take().map_or(Ok(()), |action| action())
    }
}

impl std::fmt::Debug for ActionDisposable {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ActionDisposable")
            .field("disposed", &self.is_disposed())
            .finish()
    }
}

/// Runs an asynchronous operation the first time it is disposed.
///
/// The operation is started when `dispose_async` is called and polled once on the
/// spot. If it is already finished the returned signal is ready and carries its
/// outcome; otherwise the returned signal is the operation itself. The operation's
/// future is driven to completion exactly once and never polled after it finishes.
pub struct AsyncActionDisposable {
    operation: Claim<AsyncAction>,
}

impl AsyncActionDisposable {
    /// Creates a disposable that starts `operation` on first disposal.
    pub fn new<F, Fut>(operation: F) -> Self
    where
        F: FnOnce() -> Fut + Send + 'static,
        Fut: Future + Send + 'static,
        Fut::Output: IntoReleaseResult,
    {
        let operation: AsyncAction =
            Box::new(move || operation().map(IntoReleaseResult::into_release_result).boxed());
        Self {
            operation: Claim::new(operation),
        }
    }

    /// Returns true once the operation has been claimed.
    #[must_use]
    pub fn is_disposed(&self) -> bool {
        self.operation.is_claimed()
    }
}

impl AsyncDispose for AsyncActionDisposable {
    fn dispose_async(&self) -> ReleaseFuture {
        let Some(operation) = self.operation.take() else {
            return future::ok(()).boxed();
        };

        let mut signal = operation();
        match poll_now(&mut signal) {
            Poll::Ready(result) => future::ready(result).boxed(),
            Poll::Pending => signal,
        }
    }
}

impl std::fmt::Debug for AsyncActionDisposable {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AsyncActionDisposable")
            .field("disposed", &self.is_disposed())
            .finish()
    }
}

/// Wraps a closure as a resource with an immediate release.
pub fn create<F>(action: F) -> Resource
where
    F: FnOnce() + Send + 'static,
{
    Resource::from_dispose(Arc::new(ActionDisposable::new(action)))
}

/// Wraps a fallible closure as a resource with an immediate release.
pub fn try_create<F, E>(action: F) -> Resource
where
    F: FnOnce() -> Result<(), E> + Send + 'static,
    E: Into<anyhow::Error>,
{
    Resource::from_dispose(Arc::new(ActionDisposable::new(action)))
}

/// Wraps an asynchronous operation as a resource with a suspending release.
///
/// The future may resolve to `()` or to a `Result<(), E>`.
pub fn create_async<F, Fut>(operation: F) -> Resource
where
    F: FnOnce() -> Fut + Send + 'static,
    Fut: Future + Send + 'static,
    Fut::Output: IntoReleaseResult,
{
    Resource::from_async(Arc::new(AsyncActionDisposable::new(operation)))
}
