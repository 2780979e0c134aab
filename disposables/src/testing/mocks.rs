//! Mock resources for testing.

use futures::future::{self, BoxFuture, FutureExt};
use futures::ready;
use std::future::Future;
use std::pin::Pin;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::task::{Context, Poll};

use super::{Gate, ReleaseLog};
use crate::disposable::{AsyncDispose, Dispose, ReleaseFuture, Resource};

/// What a [`RecordingDisposable`] does when released.
#[derive(Debug, Clone, Default)]
pub enum ReleaseBehavior {
    /// Release succeeds.
    #[default]
    Succeed,
    /// Release returns an error with this message.
    Fail(String),
    /// Release panics with this message.
    Panic(String),
}

impl ReleaseBehavior {
    fn outcome(&self) -> anyhow::Result<()> {
        match self {
            Self::Succeed => Ok(()),
            Self::Fail(message) => Err(anyhow::anyhow!("{message}")),
            Self::Panic(message) => panic!("{message}"),
        }
    }
}

/// A resource that records each release into a shared [`ReleaseLog`].
///
/// Its label is pushed to the log when a release happens; for a gated async release
/// that is after the gate opens.
#[derive(Debug)]
pub struct RecordingDisposable {
    label: String,
    log: ReleaseLog<String>,
    behavior: ReleaseBehavior,
    gate: Option<Gate>,
    sync_calls: AtomicUsize,
    async_calls: AtomicUsize,
}

impl RecordingDisposable {
    /// Creates a recording resource that succeeds immediately.
    #[must_use]
    pub fn new(label: impl Into<String>, log: &ReleaseLog<String>) -> Self {
        Self {
            label: label.into(),
            log: log.clone(),
            behavior: ReleaseBehavior::Succeed,
            gate: None,
            sync_calls: AtomicUsize::new(0),
            async_calls: AtomicUsize::new(0),
        }
    }

    /// Sets what the release does.
    #[must_use]
    pub fn with_behavior(mut self, behavior: ReleaseBehavior) -> Self {
        self.behavior = behavior;
        self
    }

    /// Makes async releases stay pending until `gate` opens.
    #[must_use]
    pub fn gated(mut self, gate: &Gate) -> Self {
        self.gate = Some(gate.clone());
        self
    }

    /// Returns the label.
    #[must_use]
    pub fn label(&self) -> &str {
        &self.label
    }

    /// Returns how often the immediate release was invoked.
    #[must_use]
    pub fn sync_calls(&self) -> usize {
        self.sync_calls.load(Ordering::SeqCst)
    }

    /// Returns how often the suspending release was invoked.
    #[must_use]
    pub fn async_calls(&self) -> usize {
        self.async_calls.load(Ordering::SeqCst)
    }

    /// Returns the total number of release invocations.
    #[must_use]
    pub fn total_calls(&self) -> usize {
        self.sync_calls() + self.async_calls()
    }

    /// Wraps the resource with only its immediate release exposed.
    #[must_use]
    pub fn sync_resource(self: &Arc<Self>) -> Resource {
        Resource::from_dispose(self.clone()).with_name(self.label.clone())
    }

    /// Wraps the resource with only its suspending release exposed.
    #[must_use]
    pub fn async_resource(self: &Arc<Self>) -> Resource {
        Resource::from_async(self.clone()).with_name(self.label.clone())
    }

    /// Wraps the resource with both releases exposed.
    #[must_use]
    pub fn dual_resource(self: &Arc<Self>) -> Resource {
        Resource::from_dual(self.clone()).with_name(self.label.clone())
    }
}

impl Dispose for RecordingDisposable {
    fn dispose(&self) -> anyhow::Result<()> {
        self.sync_calls.fetch_add(1, Ordering::SeqCst);
        self.log.push(self.label.clone());
        self.behavior.outcome()
    }
}

impl AsyncDispose for RecordingDisposable {
    fn dispose_async(&self) -> ReleaseFuture {
        self.async_calls.fetch_add(1, Ordering::SeqCst);

        let Some(gate) = self.gate.clone() else {
            self.log.push(self.label.clone());
            return future::ready(self.behavior.outcome()).boxed();
        };

        let log = self.log.clone();
        let label = self.label.clone();
        let behavior = self.behavior.clone();
        async move {
            gate.wait().await;
            log.push(label);
            behavior.outcome()
        }
        .boxed()
    }
}

/// A completion signal that counts how often its outcome is observed.
///
/// Panics if polled again after it has completed, which is how a test catches a
/// signal being consumed twice.
pub struct CountingSignal {
    wait: Option<BoxFuture<'static, ()>>,
    finished: bool,
    observations: Arc<AtomicUsize>,
}

impl CountingSignal {
    /// Creates a signal that is already finished.
    #[must_use]
    pub fn ready() -> Self {
        Self {
            wait: None,
            finished: false,
            observations: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Creates a signal that finishes once `gate` opens.
    #[must_use]
    pub fn gated(gate: Gate) -> Self {
        Self {
            wait: Some(async move { gate.wait().await }.boxed()),
            finished: false,
            observations: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Returns the shared observation counter.
    #[must_use]
    pub fn observations(&self) -> Arc<AtomicUsize> {
        self.observations.clone()
    }
}

impl Future for CountingSignal {
    type Output = anyhow::Result<()>;

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        let this = self.get_mut();
        assert!(!this.finished, "completion signal polled after it finished");

        if let Some(wait) = this.wait.as_mut() {
            ready!(wait.as_mut().poll(cx));
            this.wait = None;
        }

        this.finished = true;
        this.observations.fetch_add(1, Ordering::SeqCst);
        Poll::Ready(Ok(()))
    }
}

impl std::fmt::Debug for CountingSignal {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CountingSignal")
            .field("finished", &self.finished)
            .field("observations", &self.observations.load(Ordering::SeqCst))
            .finish()
    }
}
