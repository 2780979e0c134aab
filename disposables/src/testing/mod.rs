//! Testing utilities for code that uses disposables.
//!
//! This module provides:
//! - `ReleaseLog` for recording release order
//! - `RecordingDisposable`, a configurable resource that records its releases
//! - `Gate` and `CountingSignal` for controlling when async releases complete
//! - `init_test_logging` to see tracing output in tests

mod fixtures;
mod mocks;

pub use fixtures::{init_test_logging, Gate, ReleaseLog};
pub use mocks::{CountingSignal, RecordingDisposable, ReleaseBehavior};
