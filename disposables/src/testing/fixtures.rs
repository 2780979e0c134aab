//! Shared test fixtures.

use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Once};
use tokio::sync::Notify;
use tracing_subscriber::EnvFilter;

/// An ordered, shareable record of releases.
#[derive(Debug)]
pub struct ReleaseLog<T> {
    entries: Arc<Mutex<Vec<T>>>,
}

impl<T> ReleaseLog<T> {
    /// Creates an empty log.
    #[must_use]
    pub fn new() -> Self {
        Self {
            entries: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Appends an entry.
    pub fn push(&self, entry: T) {
        self.entries.lock().push(entry);
    }

    /// Returns the number of entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    /// Returns true if nothing has been recorded.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.lock().is_empty()
    }
}

impl<T: Clone> ReleaseLog<T> {
    /// Returns a copy of the recorded entries.
    #[must_use]
    pub fn entries(&self) -> Vec<T> {
        self.entries.lock().clone()
    }
}

impl<T> Clone for ReleaseLog<T> {
    fn clone(&self) -> Self {
        Self {
            entries: self.entries.clone(),
        }
    }
}

impl<T> Default for ReleaseLog<T> {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Debug, Default)]
struct GateInner {
    open: AtomicBool,
    notify: Notify,
}

/// A one-way latch that async releases can wait on.
///
/// Keeps a release pending until the test opens the gate.
#[derive(Debug, Clone, Default)]
pub struct Gate {
    inner: Arc<GateInner>,
}

impl Gate {
    /// Creates a closed gate.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Opens the gate and wakes every waiter.
    pub fn open(&self) {
        self.inner.open.store(true, Ordering::SeqCst);
        self.inner.notify.notify_waiters();
    }

    /// Returns true once the gate is open.
    #[must_use]
    pub fn is_open(&self) -> bool {
        self.inner.open.load(Ordering::SeqCst)
    }

    /// Waits until the gate is open.
    pub async fn wait(&self) {
        loop {
            // Register before checking so an open() in between is not missed
            let notified = self.inner.notify.notified();
            if self.is_open() {
                return;
            }
            notified.await;
        }
    }
}

/// Installs a fmt subscriber filtered by `RUST_LOG` (default `warn`), once per process.
pub fn init_test_logging() {
    static INIT: Once = Once::new();
    INIT.call_once(|| {
        let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
        let _ = tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_test_writer()
            .try_init();
    });
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_log_clones_share_entries() {
        let log = ReleaseLog::new();
        let other = log.clone();
        log.push(1);
        other.push(2);
        assert_eq!(log.entries(), vec![1, 2]);
        assert_eq!(other.len(), 2);
    }

    #[tokio::test]
    async fn test_gate_releases_waiter() {
        let gate = Gate::new();
        let waiter = tokio::spawn({
            let gate = gate.clone();
            async move { gate.wait().await }
        });

        tokio::task::yield_now().await;
        assert!(!waiter.is_finished());

        gate.open();
        waiter.await.unwrap();
        assert!(gate.is_open());
    }

    #[tokio::test]
    async fn test_open_gate_does_not_block() {
        let gate = Gate::new();
        gate.open();
        gate.wait().await;
    }
}
