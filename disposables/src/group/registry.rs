//! The disposable group: an ordered registry torn down exactly once.

use futures::FutureExt;
use parking_lot::Mutex;
use std::future::Future;
use std::sync::Arc;
use tracing::{debug, warn};

use super::walk::{release_sync, AsyncWalk, Teardown};
use super::{GroupConfig, TeardownMode};
use crate::disposable::{self, AsyncDispose, Dispose, IntoReleaseResult, ReleaseFuture, Resource};
use crate::errors::{DisposeError, Result};

enum GroupState {
    Open(Vec<Resource>),
    TornDown,
}

/// A thread-safe, ordered collection of resources released together.
///
/// Resources are released in reverse registration order, each at most once, by the
/// first of [`teardown`](Self::teardown) or [`teardown_async`](Self::teardown_async).
/// After that the group is inert: further teardowns are no-ops and `add` fails with
/// [`DisposeError::AlreadyTornDown`].
///
/// The registry lock is held only to register a resource or to claim the registry for
/// teardown; releases run outside it.
pub struct DisposableGroup {
    config: GroupConfig,
    state: Mutex<GroupState>,
}

impl DisposableGroup {
    /// Creates an empty lenient group.
    #[must_use]
    pub fn new() -> Self {
        Self::with_config(GroupConfig::default())
    }

    /// Creates an empty group with the given teardown mode.
    #[must_use]
    pub fn with_mode(mode: TeardownMode) -> Self {
        Self::with_config(GroupConfig::default().with_mode(mode))
    }

    /// Creates an empty group from a config.
    #[must_use]
    pub fn with_config(config: GroupConfig) -> Self {
        Self {
            config,
            state: Mutex::new(GroupState::Open(Vec::new())),
        }
    }

    /// Returns the group's config.
    #[must_use]
    pub const fn config(&self) -> &GroupConfig {
        &self.config
    }

    /// Returns the teardown mode.
    #[must_use]
    pub const fn mode(&self) -> TeardownMode {
        self.config.mode
    }

    /// Registers a resource.
    ///
    /// Fails with [`DisposeError::AlreadyTornDown`] once teardown has started; the
    /// resource is not registered in that case.
    pub fn add(&self, resource: Resource) -> Result<()> {
        let mut state = self.state.lock();
        match &mut *state {
            GroupState::Open(items) => {
                items.push(resource);
                Ok(())
            }
            GroupState::TornDown => Err(DisposeError::AlreadyTornDown),
        }
    }

    /// Registers a closure to run on teardown.
    pub fn add_fn<F>(&self, action: F) -> Result<()>
    where
        F: FnOnce() + Send + 'static,
    {
        self.add(disposable::create(action))
    }

    /// Registers an async operation to run on teardown.
    ///
    /// The resource only supports asynchronous release; see [`TeardownMode`] for how a
    /// synchronous teardown treats it.
    pub fn add_async_fn<F, Fut>(&self, operation: F) -> Result<()>
    where
        F: FnOnce() -> Fut + Send + 'static,
        Fut: Future + Send + 'static,
        Fut::Output: IntoReleaseResult,
    {
        self.add(disposable::create_async(operation))
    }

    /// Returns the number of registered resources. Zero once torn down.
    #[must_use]
    pub fn len(&self) -> usize {
        match &*self.state.lock() {
            GroupState::Open(items) => items.len(),
            GroupState::TornDown => 0,
        }
    }

    /// Returns true if no resources are registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Returns true once teardown has started.
    #[must_use]
    pub fn is_torn_down(&self) -> bool {
        matches!(*self.state.lock(), GroupState::TornDown)
    }

    /// Returns the registered resources in registration order.
    ///
    /// The returned vector is a copy; changing the group afterwards does not affect it.
    #[must_use]
    pub fn snapshot(&self) -> Vec<Resource> {
        match &*self.state.lock() {
            GroupState::Open(items) => items.clone(),
            GroupState::TornDown => Vec::new(),
        }
    }

    /// Iterates over a snapshot of the registered resources in registration order.
    pub fn iter(&self) -> std::vec::IntoIter<Resource> {
        self.snapshot().into_iter()
    }

    /// Tears the group down without suspending.
    ///
    /// Resources are released last-to-first through their immediate release. A failing
    /// release does not stop the walk; the first failure is returned. Resources that
    /// only support asynchronous release are skipped under [`TeardownMode::Lenient`];
    /// under [`TeardownMode::Strict`] the walk stops there, leaving that resource and
    /// every earlier one unreleased. The stop reports
    /// [`DisposeError::UnsupportedSyncTeardown`] unless a release before it already
    /// failed; the first failure is returned either way.
    ///
    /// Returns `Ok(())` without doing anything if the group was already torn down.
    pub fn teardown(&self) -> Result<()> {
        let Some(items) = self.begin_teardown() else {
            return Ok(());
        };
        if items.is_empty() {
            return Ok(());
        }

        debug!(
            group = self.config.label(),
            items = items.len(),
            mode = %self.config.mode,
            "Tearing down disposable group"
        );
        let result = release_sync(&items, self.config.mode, self.label());
        debug!(group = self.config.label(), ok = result.is_ok(), "Disposable group torn down");
        result
    }

    /// Tears the group down, suspending on releases that do not finish synchronously.
    ///
    /// Resources are released last-to-first, preferring their suspending release.
    /// Everything up to the first release that is still pending runs before this
    /// returns; awaiting the returned [`Teardown`] releases the rest, one at a time and
    /// still in reverse order. Every resource is attempted and the first failure is
    /// the result.
    ///
    /// The returned teardown is already complete if the group was torn down before.
    pub fn teardown_async(&self) -> Teardown {
        let Some(items) = self.begin_teardown() else {
            return Teardown::ready(Ok(()));
        };
        if items.is_empty() {
            return Teardown::ready(Ok(()));
        }

        debug!(
            group = self.config.label(),
            items = items.len(),
            "Tearing down disposable group asynchronously"
        );
        AsyncWalk::new(items, self.label()).start()
    }

    /// Wraps the group as a resource so it can be nested in another group.
    #[must_use]
    pub fn into_resource(self) -> Resource {
        let name = self.config.label().to_string();
        Resource::from_dual(Arc::new(self)).with_name(name)
    }

    /// Flips the group to torn down and hands over the registry.
    fn begin_teardown(&self) -> Option<Vec<Resource>> {
        let mut state = self.state.lock();
        match std::mem::replace(&mut *state, GroupState::TornDown) {
            GroupState::Open(items) => Some(items),
            GroupState::TornDown => None,
        }
    }

    fn label(&self) -> Arc<str> {
        Arc::from(self.config.label())
    }
}

impl Default for DisposableGroup {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for DisposableGroup {
    fn drop(&mut self) {
        if !self.config.teardown_on_drop {
            return;
        }

        if let Err(err) = self.teardown() {
            warn!(
                group = self.config.label(),
                error = %err,
                "Teardown on drop failed"
            );
        }
    }
}

impl Dispose for DisposableGroup {
    fn dispose(&self) -> anyhow::Result<()> {
        self.teardown().map_err(Into::into)
    }
}

impl AsyncDispose for DisposableGroup {
    fn dispose_async(&self) -> ReleaseFuture {
        self.teardown_async().map(|result| result.map_err(Into::into)).boxed()
    }
}

impl<'a> IntoIterator for &'a DisposableGroup {
    type Item = Resource;
    type IntoIter = std::vec::IntoIter<Resource>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

impl std::fmt::Debug for DisposableGroup {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DisposableGroup")
            .field("name", &self.config.name)
            .field("mode", &self.config.mode)
            .field("len", &self.len())
            .field("torn_down", &self.is_torn_down())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::ReleaseLog;
    use pretty_assertions::assert_eq;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn test_group_creation() {
        let group = DisposableGroup::new();
        assert!(group.is_empty());
        assert!(!group.is_torn_down());
        assert_eq!(group.mode(), TeardownMode::Lenient);
    }

    #[test]
    fn test_add_after_teardown_fails() {
        let group = DisposableGroup::new();
        group.teardown().unwrap();

        let err = group.add_fn(|| {}).unwrap_err();
        assert!(matches!(err, DisposeError::AlreadyTornDown));
        assert!(group.is_empty());
    }

    #[test]
    fn test_teardown_reverse_order() {
        let group = DisposableGroup::new();
        let log = ReleaseLog::new();
        for name in ["first", "second", "third"] {
            let log = log.clone();
            group.add_fn(move || log.push(name)).unwrap();
        }

        group.teardown().unwrap();
        assert_eq!(log.entries(), vec!["third", "second", "first"]);
    }

    #[test]
    fn test_second_teardown_is_noop() {
        let group = DisposableGroup::new();
        let counter = Arc::new(AtomicUsize::new(0));
        let counter_clone = counter.clone();
        group
            .add_fn(move || {
                counter_clone.fetch_add(1, Ordering::SeqCst);
            })
            .unwrap();

        group.teardown().unwrap();
        group.teardown().unwrap();
        assert_eq!(counter.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_empty_group_teardown() {
        let group = DisposableGroup::with_mode(TeardownMode::Strict);
        assert!(group.teardown().is_ok());
        assert!(group.is_torn_down());
    }

    #[tokio::test]
    async fn test_empty_group_teardown_async() {
        let group = DisposableGroup::new();
        let teardown = group.teardown_async();
        assert!(teardown.is_complete());
        assert!(teardown.await.is_ok());
        assert!(group.is_torn_down());
    }

    #[test]
    fn test_snapshot_is_registration_order() {
        let group = DisposableGroup::new();
        group.add(disposable::create(|| {}).with_name("a")).unwrap();
        group.add(disposable::create_async(|| async {}).with_name("b")).unwrap();

        let names: Vec<_> = group.iter().map(|r| r.name().to_string()).collect();
        assert_eq!(names, vec!["a", "b"]);

        let names: Vec<_> = (&group).into_iter().map(|r| r.supports_async()).collect();
        assert_eq!(names, vec![false, true]);

        group.teardown().unwrap();
        assert!(group.snapshot().is_empty());
    }

    #[test]
    fn test_failed_teardown_still_torn_down() {
        let group = DisposableGroup::new();
        group
            .add(disposable::try_create(|| Err::<(), _>(anyhow::anyhow!("nope"))))
            .unwrap();

        assert!(group.teardown().is_err());
        assert!(group.is_torn_down());
        assert!(group.teardown().is_ok());
    }

    #[test]
    fn test_drop_tears_down() {
        let log = ReleaseLog::new();
        {
            let group = DisposableGroup::new();
            let log = log.clone();
            group.add_fn(move || log.push(1)).unwrap();
        }
        assert_eq!(log.entries(), vec![1]);
    }

    #[test]
    fn test_drop_without_teardown_on_drop() {
        let log = ReleaseLog::new();
        {
            let group =
                DisposableGroup::with_config(GroupConfig::new().with_teardown_on_drop(false));
            let log = log.clone();
            group.add_fn(move || log.push(1)).unwrap();
        }
        assert!(log.entries().is_empty());
    }

    #[test]
    fn test_debug_output() {
        let group = DisposableGroup::with_config(GroupConfig::new().with_name("db"));
        group.add_fn(|| {}).unwrap();
        let debug = format!("{group:?}");
        assert!(debug.contains("\"db\""));
        assert!(debug.contains("len: 1"));
    }
}
