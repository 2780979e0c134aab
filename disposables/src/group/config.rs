//! Group configuration.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::errors::DisposeError;

/// Policy for resources that only support asynchronous release when a synchronous
/// teardown is requested.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TeardownMode {
    /// Fail with `UnsupportedSyncTeardown` and stop the walk.
    Strict,
    /// Skip the resource without releasing it.
    #[default]
    Lenient,
}

impl TeardownMode {
    /// Returns the lowercase name of the mode.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Strict => "strict",
            Self::Lenient => "lenient",
        }
    }
}

impl fmt::Display for TeardownMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TeardownMode {
    type Err = DisposeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "strict" => Ok(Self::Strict),
            "lenient" => Ok(Self::Lenient),
            other => Err(DisposeError::invalid_argument(format!(
                "unknown teardown mode '{other}', expected 'strict' or 'lenient'"
            ))),
        }
    }
}

/// Configuration for a disposable group.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GroupConfig {
    /// Name used in log output.
    pub name: Option<String>,
    /// Handling of async-only resources during synchronous teardown.
    pub mode: TeardownMode,
    /// Run the synchronous teardown when a group that was never torn down is dropped.
    pub teardown_on_drop: bool,
}

impl Default for GroupConfig {
    fn default() -> Self {
        Self {
            name: None,
            mode: TeardownMode::Lenient,
            teardown_on_drop: true,
        }
    }
}

impl GroupConfig {
    /// Creates a new config with default settings.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the group name.
    #[must_use]
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Sets the teardown mode.
    #[must_use]
    pub const fn with_mode(mut self, mode: TeardownMode) -> Self {
        self.mode = mode;
        self
    }

    /// Sets whether dropping an open group tears it down.
    #[must_use]
    pub const fn with_teardown_on_drop(mut self, enabled: bool) -> Self {
        self.teardown_on_drop = enabled;
        self
    }

    /// Returns the name used in log output.
    #[must_use]
    pub fn label(&self) -> &str {
        self.name.as_deref().unwrap_or("<unnamed>")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_default_mode_is_lenient() {
        let config = GroupConfig::default();
        assert_eq!(config.mode, TeardownMode::Lenient);
        assert!(config.teardown_on_drop);
        assert_eq!(config.label(), "<unnamed>");
    }

    #[test]
    fn test_builder() {
        let config = GroupConfig::new()
            .with_name("http-server")
            .with_mode(TeardownMode::Strict)
            .with_teardown_on_drop(false);

        assert_eq!(config.label(), "http-server");
        assert_eq!(config.mode, TeardownMode::Strict);
        assert!(!config.teardown_on_drop);
    }

    #[test]
    fn test_mode_from_str() {
        assert_eq!("strict".parse::<TeardownMode>().unwrap(), TeardownMode::Strict);
        assert_eq!(" Lenient ".parse::<TeardownMode>().unwrap(), TeardownMode::Lenient);

        let err = "eager".parse::<TeardownMode>().unwrap_err();
        assert!(matches!(err, DisposeError::InvalidArgument(_)));
        assert!(err.to_string().contains("eager"));
    }

    #[test]
    fn test_config_from_json_with_defaults() {
        let config: GroupConfig = serde_json::from_str(r#"{"mode": "strict"}"#).unwrap();
        assert_eq!(config.mode, TeardownMode::Strict);
        assert_eq!(config.name, None);
        assert!(config.teardown_on_drop);
    }

    #[test]
    fn test_mode_serializes_lowercase() {
        let json = serde_json::to_string(&TeardownMode::Lenient).unwrap();
        assert_eq!(json, r#""lenient""#);
        assert_eq!(TeardownMode::Strict.to_string(), "strict");
    }
}
