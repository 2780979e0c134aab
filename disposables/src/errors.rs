//! Error types for disposables and disposable groups.
//!
//! Registration errors (`InvalidArgument`, `AlreadyTornDown`) are caller bugs and are
//! surfaced immediately. Teardown errors carry the registration index and diagnostic
//! name of the resource that failed.

use std::any::Any;
use thiserror::Error;

/// The main error type for disposal operations.
#[derive(Debug, Error)]
pub enum DisposeError {
    /// A required argument was missing or malformed.
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// The group has already been torn down and accepts no more resources.
    #[error("Disposable group has already been torn down")]
    AlreadyTornDown,

    /// A resource only supports asynchronous release but a synchronous teardown was
    /// requested on a strict group.
    #[error(
        "'{name}' at position {index} only supports asynchronous release; use teardown_async to dispose it"
    )]
    UnsupportedSyncTeardown {
        /// Registration position of the resource.
        index: usize,
        /// Diagnostic name of the resource.
        name: String,
    },

    /// A resource's release operation returned an error.
    #[error("Release of '{name}' at position {index} failed: {source}")]
    Release {
        /// Registration position of the resource.
        index: usize,
        /// Diagnostic name of the resource.
        name: String,
        /// The underlying failure.
        #[source]
        source: anyhow::Error,
    },

    /// A resource's release operation panicked.
    #[error("Release of '{name}' at position {index} panicked: {message}")]
    Panicked {
        /// Registration position of the resource.
        index: usize,
        /// Diagnostic name of the resource.
        name: String,
        /// The panic payload, when it was a string.
        message: String,
    },
}

impl DisposeError {
    /// Creates an invalid argument error.
    pub fn invalid_argument(message: impl Into<String>) -> Self {
        Self::InvalidArgument(message.into())
    }

    /// Wraps an item-level release failure.
    pub fn release(index: usize, name: impl Into<String>, source: anyhow::Error) -> Self {
        Self::Release {
            index,
            name: name.into(),
            source,
        }
    }

    /// Wraps a panic payload caught while releasing an item.
    pub fn panicked(index: usize, name: impl Into<String>, payload: &(dyn Any + Send)) -> Self {
        Self::Panicked {
            index,
            name: name.into(),
            message: panic_message(payload),
        }
    }

    /// Returns the registration index of the item this error refers to, if any.
    #[must_use]
    pub const fn index(&self) -> Option<usize> {
        match self {
            Self::UnsupportedSyncTeardown { index, .. }
            | Self::Release { index, .. }
            | Self::Panicked { index, .. } => Some(*index),
            Self::InvalidArgument(_) | Self::AlreadyTornDown => None,
        }
    }

    /// Returns true if this error was raised by an item's own release operation.
    #[must_use]
    pub const fn is_item_failure(&self) -> bool {
        matches!(self, Self::Release { .. } | Self::Panicked { .. })
    }
}

/// Result type for disposal operations.
pub type Result<T, E = DisposeError> = std::result::Result<T, E>;

/// Extracts a readable message from a panic payload.
pub(crate) fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "<non-string panic payload>".to_string()
    }
}
