//! Disposable capability objects.
//!
//! This module provides:
//! - `Dispose` and `AsyncDispose`, the two release capabilities
//! - `Resource`, a shared handle exposing one or both capabilities
//! - Closure adapters (`create`, `try_create`, `create_async`) that release at most once

mod action;
mod resource;
mod traits;

pub use action::{create, create_async, try_create, ActionDisposable, AsyncActionDisposable};
pub use resource::Resource;
pub use traits::{AsyncDispose, Dispose, IntoReleaseResult, ReleaseFuture};

pub(crate) use traits::poll_now;
