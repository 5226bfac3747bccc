#![forbid(unsafe_code)]

//! Logging configuration and tracing re-exports.
//!
//! Every crate logs through `tracing`. Libraries never install a subscriber
//! themselves; applications call [`init`] (feature `subscriber`) once at
//! startup, or install their own.
//!
//! The `NATIVA_LOG` environment variable overrides [`LoggingConfig::filter`].

pub use tracing::{debug, debug_span, error, error_span, info, info_span, trace, trace_span, warn, warn_span};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Environment variable that overrides the configured filter.
pub const FILTER_ENV: &str = "NATIVA_LOG";

/// Logging settings.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct LoggingConfig {
    /// `EnvFilter` directive string, e.g. `"info,nativa_runtime=debug"`.
    pub filter: String,
    /// Emit JSON lines instead of human-readable output.
    pub json: bool,
    /// Include the event target (module path).
    pub with_target: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            filter: "info".to_owned(),
            json: false,
            with_target: true,
        }
    }
}

impl LoggingConfig {
    /// Validation messages; empty when valid.
    #[must_use]
    pub fn validate(&self) -> Vec<String> {
        let mut errors = Vec::new();
        if self.filter.trim().is_empty() {
            errors.push("logging.filter must not be empty".into());
        }
        errors
    }
}

/// Text of a caught panic payload, for log fields and failure reports.
#[must_use]
pub fn panic_message(payload: &(dyn std::any::Any + Send)) -> &str {
    if let Some(s) = payload.downcast_ref::<&'static str>() {
        s
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.as_str()
    } else {
        "non-string panic payload"
    }
}

/// Failure to install the global subscriber.
#[cfg(feature = "subscriber")]
#[derive(Debug)]
pub enum LoggingInitError {
    /// The filter directive did not parse.
    Filter(String),
    /// A global subscriber was already installed.
    AlreadyInstalled(String),
}

#[cfg(feature = "subscriber")]
impl std::fmt::Display for LoggingInitError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Filter(msg) => write!(f, "invalid log filter: {msg}"),
            Self::AlreadyInstalled(msg) => write!(f, "subscriber already installed: {msg}"),
        }
    }
}

#[cfg(feature = "subscriber")]
impl std::error::Error for LoggingInitError {}

/// Install a global `tracing-subscriber` fmt subscriber.
#[cfg(feature = "subscriber")]
pub fn init(config: &LoggingConfig) -> Result<(), LoggingInitError> {
    use tracing_subscriber::EnvFilter;

    let filter = match EnvFilter::try_from_env(FILTER_ENV) {
        Ok(filter) => filter,
        Err(_) => EnvFilter::try_new(&config.filter)
            .map_err(|e| LoggingInitError::Filter(e.to_string()))?,
    };

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(config.with_target);

    let result = if config.json {
        builder.json().try_init()
    } else {
        builder.try_init()
    };
    result.map_err(|e| LoggingInitError::AlreadyInstalled(e.to_string()))?;

    tracing::debug!(filter = %config.filter, json = config.json, "logging initialized");
    Ok(())
}
