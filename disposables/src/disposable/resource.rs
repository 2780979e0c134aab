//! The capability handle registered into disposable groups.

use std::borrow::Cow;
use std::sync::Arc;

use super::{AsyncDispose, Dispose};
use crate::errors::{DisposeError, Result};

const ANONYMOUS: &str = "<anonymous>";

/// A shared handle to something that can be released.
///
/// A resource exposes an immediate release, a suspending release, or both. Which one a
/// group invokes depends on the teardown entry point: `teardown` prefers
/// [`Dispose`], `teardown_async` prefers [`AsyncDispose`].
///
/// Cloning a resource clones the handle, not the underlying object.
#[derive(Clone)]
pub struct Resource {
    name: Cow<'static, str>,
    sync: Option<Arc<dyn Dispose>>,
    asynchronous: Option<Arc<dyn AsyncDispose>>,
}

impl Resource {
    /// Creates a resource with only an immediate release.
    pub fn from_dispose<D>(disposable: Arc<D>) -> Self
    where
        D: Dispose + 'static,
    {
        Self {
            name: Cow::Borrowed(std::any::type_name::<D>()),
            sync: Some(disposable),
            asynchronous: None,
        }
    }

    /// Creates a resource with only a suspending release.
    pub fn from_async<D>(disposable: Arc<D>) -> Self
    where
        D: AsyncDispose + 'static,
    {
        Self {
            name: Cow::Borrowed(std::any::type_name::<D>()),
            sync: None,
            asynchronous: Some(disposable),
        }
    }

    /// Creates a resource exposing both release operations of one object.
    pub fn from_dual<D>(disposable: Arc<D>) -> Self
    where
        D: Dispose + AsyncDispose + 'static,
    {
        Self {
            name: Cow::Borrowed(std::any::type_name::<D>()),
            sync: Some(disposable.clone()),
            asynchronous: Some(disposable),
        }
    }

    /// Creates a resource from optional capabilities.
    ///
    /// Fails with [`DisposeError::InvalidArgument`] when neither is present.
    pub fn from_parts(
        sync: Option<Arc<dyn Dispose>>,
        asynchronous: Option<Arc<dyn AsyncDispose>>,
    ) -> Result<Self> {
        if sync.is_none() && asynchronous.is_none() {
            return Err(DisposeError::invalid_argument(
                "resource must expose at least one release operation",
            ));
        }

        Ok(Self {
            name: Cow::Borrowed(ANONYMOUS),
            sync,
            asynchronous,
        })
    }

    /// Sets the diagnostic name used in logs and errors.
    #[must_use]
    pub fn with_name(mut self, name: impl Into<Cow<'static, str>>) -> Self {
        self.name = name.into();
        self
    }

    /// Returns the diagnostic name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the immediate release capability, if present.
    #[must_use]
    pub fn as_dispose(&self) -> Option<&Arc<dyn Dispose>> {
        self.sync.as_ref()
    }

    /// Returns the suspending release capability, if present.
    #[must_use]
    pub fn as_async_dispose(&self) -> Option<&Arc<dyn AsyncDispose>> {
        self.asynchronous.as_ref()
    }

    /// Returns true if the resource can be released without suspending.
    #[must_use]
    pub const fn supports_sync(&self) -> bool {
        self.sync.is_some()
    }

    /// Returns true if the resource exposes a suspending release.
    #[must_use]
    pub const fn supports_async(&self) -> bool {
        self.asynchronous.is_some()
    }
}

impl std::fmt::Debug for Resource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Resource")
            .field("name", &self.name)
            .field("sync", &self.supports_sync())
            .field("async", &self.supports_async())
            .finish()
    }
}
