//! Release capability traits.

use futures::future::BoxFuture;
use futures::task::noop_waker_ref;
use std::future::Future;
use std::pin::Pin;
use std::task::{Context, Poll};

/// The completion signal produced by a suspending release.
pub type ReleaseFuture = BoxFuture<'static, anyhow::Result<()>>;

/// A resource that can be released without suspending.
///
/// Implementations should be idempotent: the group never calls `dispose` more than
/// once, but callers holding their own handle might.
pub trait Dispose: Send + Sync {
    /// Releases the resource, running to completion before returning.
    fn dispose(&self) -> anyhow::Result<()>;
}

/// A resource whose release may need to suspend.
///
/// The returned future is `'static` so it can outlive the borrow of `self`; this is
/// what lets a group keep walking after a release suspends.
pub trait AsyncDispose: Send + Sync {
    /// Starts releasing the resource and returns its completion signal.
    fn dispose_async(&self) -> ReleaseFuture;
}

/// Conversion from the value a release closure returns into a release outcome.
///
/// Lets closures return either `()` or any `Result<(), E>` whose error converts into
/// [`anyhow::Error`].
pub trait IntoReleaseResult {
    /// Converts into a release outcome.
    fn into_release_result(self) -> anyhow::Result<()>;
}

impl IntoReleaseResult for () {
    fn into_release_result(self) -> anyhow::Result<()> {
        Ok(())
    }
}

impl<E> IntoReleaseResult for Result<(), E>
where
    E: Into<anyhow::Error>,
{
    fn into_release_result(self) -> anyhow::Result<()> {
        self.map_err(Into::into)
    }
}

/// Polls a future once without a task context.
///
/// Used to find out whether a completion signal has already finished so the caller can
/// carry on without suspending. Any waker registered here is replaced on the next real
/// poll.
pub(crate) fn poll_now<F>(fut: &mut F) -> Poll<F::Output>
where
    F: Future + Unpin + ?Sized,
{
    let mut cx = Context::from_waker(noop_waker_ref());
    Pin::new(fut).poll(&mut cx)
}
