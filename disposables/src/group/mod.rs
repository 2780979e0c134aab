//! Disposable groups.
//!
//! This module provides:
//! - `DisposableGroup`, an ordered registry of resources torn down exactly once
//! - `Teardown`, the completion signal of a suspending teardown
//! - `GroupConfig` and `TeardownMode` for group policy
//! - `scope`/`scope_async` helpers that tear a group down when a body finishes

mod config;
mod registry;
mod scope;
mod walk;

pub use config::{GroupConfig, TeardownMode};
pub use registry::DisposableGroup;
pub use scope::{scope, scope_async};
pub use walk::Teardown;
