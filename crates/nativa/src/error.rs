#![forbid(unsafe_code)]

//! Unified error model and failure dispositions.
//!
//! Each subsystem keeps its own typed error; [`Error`] wraps them so host
//! code can propagate with `?` and still decide what to do.
//!
//! # Dispositions
//!
//! | Source | Disposition |
//! |--------|-------------|
//! | configuration, lifecycle misuse | [`Disposition::FailFast`] |
//! | platform feature or native widget unavailable | [`Disposition::FallBackHandler`] |
//! | invalid navigation request | [`Disposition::RejectRequest`] |
//! | single mapping or rejected peer call | [`Disposition::IsolateEntry`] |
//! | font alias lookup | [`Disposition::TreatAsUnresolved`] |
//!
//! None of the dispositions except `FailFast` stop the UI: the element
//! tree stays usable and later changes dispatch normally.

use std::fmt;

use nativa_backend::PeerError;
use nativa_runtime::{ApplyFailure, ConfigError, HandlerError, NavigationError};
use tracing::{error, warn};

/// Top-level error type for Nativa hosts.
#[derive(Debug)]
pub enum Error {
    /// Handler lifecycle or platform-view creation failure.
    Handler(HandlerError),
    /// Navigation request or reconciliation failure.
    Navigation(NavigationError),
    /// A native peer operation failed outside a handler.
    Peer(PeerError),
    /// A single property mapping failed.
    Apply(ApplyFailure),
    /// Configuration could not be loaded or is invalid.
    Config(ConfigError),
    /// Logging could not be initialized.
    #[cfg(feature = "subscriber")]
    Logging(nativa_core::logging::LoggingInitError),
    /// A font alias could not be resolved.
    Font { alias: String, reason: String },
}

/// Standard result type for Nativa APIs.
pub type Result<T> = std::result::Result<T, Error>;

/// What the host should do when an error surfaces.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Disposition {
    /// Stop startup or abort the operation; the setup is wrong.
    FailFast,
    /// Use a fallback handler or skip the control on this platform.
    FallBackHandler,
    /// Report the request as failed and keep the current state.
    RejectRequest,
    /// Skip the failing entry and keep applying the rest.
    IsolateEntry,
    /// Use the platform default font.
    TreatAsUnresolved,
}

fn peer_disposition(err: &PeerError) -> Disposition {
    match err {
        PeerError::Unavailable(_) => Disposition::FallBackHandler,
        PeerError::Rejected { .. } => Disposition::IsolateEntry,
        PeerError::InvalidStack(_) => Disposition::RejectRequest,
    }
}

impl Error {
    /// The disposition for this error.
    #[must_use]
    pub fn disposition(&self) -> Disposition {
        match self {
            Self::Handler(HandlerError::NotImplemented { .. }) => Disposition::FallBackHandler,
            Self::Handler(HandlerError::Peer(e)) => peer_disposition(e),
            Self::Handler(
                HandlerError::MissingPlatformContext { .. }
                | HandlerError::PeerAlreadyCreated { .. }
                | HandlerError::AlreadyConnected { .. }
                | HandlerError::MissingCapability { .. },
            ) => Disposition::FailFast,

            Self::Navigation(NavigationError::Peer(PeerError::Unavailable(_))) => {
                Disposition::FallBackHandler
            }
            Self::Navigation(_) => Disposition::RejectRequest,

            Self::Peer(e) => peer_disposition(e),
            Self::Apply(_) => Disposition::IsolateEntry,
            Self::Config(_) => Disposition::FailFast,
            #[cfg(feature = "subscriber")]
            Self::Logging(_) => Disposition::FailFast,
            Self::Font { .. } => Disposition::TreatAsUnresolved,
        }
    }

    /// Error type label for tracing fields.
    #[must_use]
    pub fn error_type(&self) -> &'static str {
        match self {
            Self::Handler(_) => "handler",
            Self::Navigation(_) => "navigation",
            Self::Peer(_) => "peer",
            Self::Apply(_) => "apply",
            Self::Config(_) => "config",
            #[cfg(feature = "subscriber")]
            Self::Logging(_) => "logging",
            Self::Font { .. } => "font",
        }
    }

    /// Whether the UI keeps running after this error.
    #[must_use]
    pub fn is_recoverable(&self) -> bool {
        self.disposition() != Disposition::FailFast
    }

    /// Log the error at `error` when it is fatal, `warn` otherwise.
    pub fn report(&self) {
        let disposition = self.disposition();
        if disposition == Disposition::FailFast {
            error!(error_type = self.error_type(), %disposition, error = %self, "nativa error");
        } else {
            warn!(error_type = self.error_type(), %disposition, error = %self, "nativa error");
        }
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Handler(err) => write!(f, "{err}"),
            Self::Navigation(err) => write!(f, "{err}"),
            Self::Peer(err) => write!(f, "{err}"),
            Self::Apply(err) => write!(f, "{err}"),
            Self::Config(err) => write!(f, "{err}"),
            #[cfg(feature = "subscriber")]
            Self::Logging(err) => write!(f, "{err}"),
            Self::Font { alias, reason } => write!(f, "font alias '{alias}' unresolved: {reason}"),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Handler(err) => Some(err),
            Self::Navigation(err) => Some(err),
            Self::Peer(err) => Some(err),
            Self::Apply(err) => Some(err),
            Self::Config(err) => Some(err),
            #[cfg(feature = "subscriber")]
            Self::Logging(err) => Some(err),
            Self::Font { .. } => None,
        }
    }
}

impl fmt::Display for Disposition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::FailFast => write!(f, "fail_fast"),
            Self::FallBackHandler => write!(f, "fall_back_handler"),
            Self::RejectRequest => write!(f, "reject_request"),
            Self::IsolateEntry => write!(f, "isolate_entry"),
            Self::TreatAsUnresolved => write!(f, "treat_as_unresolved"),
        }
    }
}

// ── From conversions ────────────────────────────────────────────────────

impl From<HandlerError> for Error {
    fn from(err: HandlerError) -> Self {
        Self::Handler(err)
    }
}

impl From<NavigationError> for Error {
    fn from(err: NavigationError) -> Self {
        Self::Navigation(err)
    }
}

impl From<PeerError> for Error {
    fn from(err: PeerError) -> Self {
        Self::Peer(err)
    }
}

impl From<ApplyFailure> for Error {
    fn from(err: ApplyFailure) -> Self {
        Self::Apply(err)
    }
}

impl From<ConfigError> for Error {
    fn from(err: ConfigError) -> Self {
        Self::Config(err)
    }
}

#[cfg(feature = "subscriber")]
impl From<nativa_core::logging::LoggingInitError> for Error {
    fn from(err: nativa_core::logging::LoggingInitError) -> Self {
        Self::Logging(err)
    }
}

#[cfg(test)]
mod tests {
    use std::error::Error as StdError;

    use nativa_core::Capability;
    use nativa_runtime::ApplyFailureCause;

    use super::*;

    #[test]
    fn configuration_fails_fast() {
        let err = Error::from(ConfigError::Invalid(vec!["bad".into()]));
        assert_eq!(err.disposition(), Disposition::FailFast);
        assert!(!err.is_recoverable());
        assert_eq!(err.error_type(), "config");
    }

    #[test]
    fn unavailable_platform_falls_back() {
        let err = Error::from(HandlerError::NotImplemented {
            kind: "stack_navigation",
            reason: "unified navigation unsupported".into(),
        });
        assert_eq!(err.disposition(), Disposition::FallBackHandler);

        let err = Error::from(NavigationError::Peer(PeerError::Unavailable("navigation controller")));
        assert_eq!(err.disposition(), Disposition::FallBackHandler);
    }

    #[test]
    fn lifecycle_misuse_fails_fast() {
        let err = Error::from(HandlerError::MissingCapability {
            kind: "progress",
            capability: Capability::PROGRESS,
        });
        assert_eq!(err.disposition(), Disposition::FailFast);
    }

    #[test]
    fn invalid_navigation_rejects_request() {
        for nav in [
            NavigationError::EmptyStack,
            NavigationError::PopBelowRoot,
            NavigationError::MissingArgument("NavigationRequest"),
            NavigationError::Peer(PeerError::InvalidStack("duplicate page".into())),
        ] {
            assert_eq!(Error::from(nav).disposition(), Disposition::RejectRequest);
        }
    }

    #[test]
    fn apply_failures_are_isolated() {
        let failure = ApplyFailure {
            key: "progress".into(),
            cause: ApplyFailureCause::Panicked("boom".into()),
        };
        let err = Error::from(failure);
        assert_eq!(err.disposition(), Disposition::IsolateEntry);
        assert!(err.to_string().contains("progress"));
        assert!(StdError::source(&err).is_some());

        let err = Error::from(PeerError::Rejected {
            operation: "set_text",
            reason: "detached".into(),
        });
        assert_eq!(err.disposition(), Disposition::IsolateEntry);
    }

    #[test]
    fn font_is_unresolved() {
        let err = Error::Font {
            alias: "Body".into(),
            reason: "resolver panicked".into(),
        };
        assert_eq!(err.disposition(), Disposition::TreatAsUnresolved);
        assert!(err.is_recoverable());
        assert!(StdError::source(&err).is_none());
        assert_eq!(err.to_string(), "font alias 'Body' unresolved: resolver panicked");
    }

    #[test]
    fn disposition_labels() {
        assert_eq!(Disposition::FailFast.to_string(), "fail_fast");
        assert_eq!(Disposition::TreatAsUnresolved.to_string(), "treat_as_unresolved");
    }
}
