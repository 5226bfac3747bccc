#![forbid(unsafe_code)]

//! Runtime configuration.
//!
//! [`NativaConfig`] groups the tunables of the dispatch path and the
//! navigation manager together with logging settings, so a host can load
//! them from a file at startup (feature `config`).
//!
//! ```toml
//! [navigation]
//! verify_native_stack = true
//! in_place_edits = true
//!
//! [dispatch]
//! max_reentrant_passes = 8
//!
//! [logging]
//! filter = "info,nativa_runtime=debug"
//! ```
//!
//! # Defaults
//!
//! `NativaConfig::default()` reproduces the behavior of handlers and
//! managers built without a config.

#[cfg(feature = "config")]
use std::path::Path;

use nativa_core::logging::LoggingConfig;
#[cfg(feature = "config")]
use serde::{Deserialize, Serialize};

/// Upper bound accepted for [`DispatchPolicy::max_reentrant_passes`].
pub const MAX_REENTRANT_PASSES_LIMIT: usize = 1024;

/// Top-level runtime configuration.
#[derive(Debug, Clone, Default, PartialEq)]
#[cfg_attr(feature = "config", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "config", serde(default))]
pub struct NativaConfig {
    pub navigation: NavigationPolicy,
    pub dispatch: DispatchPolicy,
    pub logging: LoggingConfig,
}

/// Navigation manager tunables.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "config", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "config", serde(default))]
pub struct NavigationPolicy {
    /// Compare the native stack with the logical one after every settle and
    /// repair drift with a non-animated replace.
    pub verify_native_stack: bool,
    /// Plan an insertion or removal below an unchanged top page as a single
    /// in-place `Insert`/`Remove` instead of pop-then-push.
    pub in_place_edits: bool,
}

impl Default for NavigationPolicy {
    fn default() -> Self {
        Self {
            verify_native_stack: true,
            in_place_edits: false,
        }
    }
}

/// Handler dispatch tunables.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "config", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "config", serde(default))]
pub struct DispatchPolicy {
    /// Passes over re-entrant notifications before the rest are dropped.
    pub max_reentrant_passes: usize,
    /// Collapse repeated names within one re-entrant pass.
    pub dedupe_reentrant: bool,
}

impl Default for DispatchPolicy {
    fn default() -> Self {
        Self {
            max_reentrant_passes: 16,
            dedupe_reentrant: true,
        }
    }
}

impl NativaConfig {
    /// Load from a TOML string.
    #[cfg(feature = "config")]
    pub fn from_toml_str(s: &str) -> Result<Self, ConfigError> {
        toml::from_str(s).map_err(ConfigError::Toml)
    }

    /// Load from a TOML file on disk.
    #[cfg(feature = "config")]
    pub fn from_toml_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path.as_ref()).map_err(ConfigError::Io)?;
        Self::from_toml_str(&content)
    }

    /// Load from a JSON string.
    #[cfg(feature = "config")]
    pub fn from_json_str(s: &str) -> Result<Self, ConfigError> {
        serde_json::from_str(s).map_err(ConfigError::Json)
    }

    /// Load from a JSON file on disk.
    #[cfg(feature = "config")]
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path.as_ref()).map_err(ConfigError::Io)?;
        Self::from_json_str(&content)
    }

    /// Serialize to TOML.
    #[cfg(feature = "config")]
    pub fn to_toml_string(&self) -> Result<String, ConfigError> {
        toml::to_string(self).map_err(|e| ConfigError::Invalid(vec![e.to_string()]))
    }

    /// Validation messages; an empty list means the config is valid.
    #[must_use]
    pub fn validate(&self) -> Vec<String> {
        let mut errors = Vec::new();

        if self.dispatch.max_reentrant_passes == 0 {
            errors.push("dispatch.max_reentrant_passes must be > 0".into());
        }
        if self.dispatch.max_reentrant_passes > MAX_REENTRANT_PASSES_LIMIT {
            errors.push(format!(
                "dispatch.max_reentrant_passes must be <= {MAX_REENTRANT_PASSES_LIMIT}, got {}",
                self.dispatch.max_reentrant_passes
            ));
        }

        errors.extend(self.logging.validate());
        errors
    }

    /// `self` if valid, otherwise every validation message.
    pub fn validated(self) -> Result<Self, ConfigError> {
        let errors = self.validate();
        if errors.is_empty() {
            Ok(self)
        } else {
            Err(ConfigError::Invalid(errors))
        }
    }
}

/// Errors that can occur when loading a configuration.
#[derive(Debug)]
pub enum ConfigError {
    /// I/O error reading a file.
    Io(std::io::Error),
    /// TOML parse error.
    #[cfg(feature = "config")]
    Toml(toml::de::Error),
    /// JSON parse error.
    #[cfg(feature = "config")]
    Json(serde_json::Error),
    /// Validation errors.
    Invalid(Vec<String>),
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Io(e) => write!(f, "I/O error: {e}"),
            #[cfg(feature = "config")]
            Self::Toml(e) => write!(f, "TOML parse error: {e}"),
            #[cfg(feature = "config")]
            Self::Json(e) => write!(f, "JSON parse error: {e}"),
            Self::Invalid(errors) => write!(f, "invalid configuration: {}", errors.join("; ")),
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Io(e) => Some(e),
            #[cfg(feature = "config")]
            Self::Toml(e) => Some(e),
            #[cfg(feature = "config")]
            Self::Json(e) => Some(e),
            Self::Invalid(_) => None,
        }
    }
}
