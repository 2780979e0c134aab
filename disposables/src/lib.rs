//! # Disposables
//!
//! Deterministic, composable resource release.
//!
//! Disposables provides:
//!
//! - **Release capabilities**: `Dispose` for releases that never suspend and
//!   `AsyncDispose` for releases that may
//! - **Closure adapters**: wrap a cleanup closure or async operation so it runs at
//!   most once, even under concurrent disposal
//! - **Disposable groups**: a thread-safe registry torn down exactly once, in reverse
//!   registration order, through a synchronous or a suspending entry point
//!
//! ## Quick Start
//!
//! ```rust
//! use disposables::prelude::*;
//!
//! # fn main() -> Result<(), DisposeError> {
//! let group = DisposableGroup::with_mode(TeardownMode::Strict);
//!
//! group.add_fn(|| println!("closing file"))?;
//! group.add(disposables::disposable::create(|| println!("dropping subscription")))?;
//!
//! // Prints "dropping subscription" then "closing file"
//! group.teardown()?;
//! # Ok(())
//! # }
//! ```

#![forbid(unsafe_code)]
#![warn(
    clippy::all,
    clippy::pedantic,
    missing_docs,
    rust_2018_idioms
)]
#![allow(
    clippy::module_name_repetitions,
    clippy::must_use_candidate,
    clippy::missing_errors_doc,
    clippy::missing_panics_doc
)]

pub mod disposable;
pub mod errors;
pub mod group;
pub mod testing;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::disposable::{
        create, create_async, try_create, AsyncDispose, Dispose, ReleaseFuture, Resource,
    };
    pub use crate::errors::DisposeError;
    pub use crate::group::{
        scope, scope_async, DisposableGroup, GroupConfig, Teardown, TeardownMode,
    };
}
