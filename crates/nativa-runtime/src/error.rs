#![forbid(unsafe_code)]

//! Error types for handlers and navigation.
//!
//! Handler errors are configuration mistakes and surface synchronously to
//! whoever builds the handler. Navigation errors reject a single request;
//! the manager state is unchanged (or resynchronized from the native stack
//! for [`NavigationError::Peer`]).

use std::fmt;

use nativa_backend::PeerError;
use nativa_core::{Capability, ElementId};

/// Handler construction and binding failures.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HandlerError {
    /// The handler was built without a [`PlatformContext`](nativa_backend::PlatformContext).
    MissingPlatformContext { kind: &'static str },
    /// `create_platform_view` was called twice on the same handler.
    PeerAlreadyCreated { kind: &'static str },
    /// `connect` was called while an element is still bound.
    AlreadyConnected { kind: &'static str },
    /// The element does not implement the capability the handler maps.
    MissingCapability {
        kind: &'static str,
        capability: Capability,
    },
    /// The handler kind cannot run on this platform configuration.
    NotImplemented { kind: &'static str, reason: String },
    /// The peer factory failed.
    Peer(PeerError),
}

impl fmt::Display for HandlerError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MissingPlatformContext { kind } => {
                write!(f, "{kind} handler has no platform context")
            }
            Self::PeerAlreadyCreated { kind } => {
                write!(f, "{kind} handler already created its platform view")
            }
            Self::AlreadyConnected { kind } => {
                write!(f, "{kind} handler is already connected; disconnect first")
            }
            Self::MissingCapability { kind, capability } => {
                write!(f, "{kind} handler requires an element with capability `{capability}`")
            }
            Self::NotImplemented { kind, reason } => {
                write!(f, "{kind} handler not implemented for this configuration: {reason}")
            }
            Self::Peer(e) => write!(f, "platform view creation failed: {e}"),
        }
    }
}

impl std::error::Error for HandlerError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Peer(e) => Some(e),
            _ => None,
        }
    }
}

impl From<PeerError> for HandlerError {
    fn from(e: PeerError) -> Self {
        Self::Peer(e)
    }
}

/// A rejected or failed navigation request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NavigationError {
    /// The requested stack has no pages.
    EmptyStack,
    /// The requested stack contains the same page twice.
    DuplicatePage(ElementId),
    /// A pop would remove the root page.
    PopBelowRoot,
    /// The referenced page is not on the stack.
    PageNotFound(ElementId),
    /// A navigation command was invoked without its argument.
    MissingArgument(&'static str),
    /// The native controller failed; the logical stack was resynchronized.
    Peer(PeerError),
}

impl fmt::Display for NavigationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::EmptyStack => f.write_str("navigation stack must contain at least one page"),
            Self::DuplicatePage(id) => write!(f, "page {id} appears more than once"),
            Self::PopBelowRoot => f.write_str("cannot pop the root page"),
            Self::PageNotFound(id) => write!(f, "page {id} is not on the navigation stack"),
            Self::MissingArgument(what) => write!(f, "missing argument: {what}"),
            Self::Peer(e) => write!(f, "native navigation failed: {e}"),
        }
    }
}

impl std::error::Error for NavigationError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Peer(e) => Some(e),
            _ => None,
        }
    }
}

impl From<PeerError> for NavigationError {
    fn from(e: PeerError) -> Self {
        Self::Peer(e)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::error::Error as _;

    #[test]
    fn missing_capability_names_both() {
        let err = HandlerError::MissingCapability {
            kind: "progress",
            capability: Capability::PROGRESS,
        };
        let msg = err.to_string();
        assert!(msg.contains("progress handler"));
        assert!(msg.contains("`progress`"));
    }

    #[test]
    fn peer_errors_chain_source() {
        let err = NavigationError::from(PeerError::Unavailable("window"));
        assert!(err.source().is_some());
        assert!(NavigationError::PopBelowRoot.source().is_none());
    }
}
