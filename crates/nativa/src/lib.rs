#![forbid(unsafe_code)]

//! Nativa public facade crate.
//!
//! Re-exports the element model, the backend peer traits and the runtime
//! handlers, and offers a prelude for host code. Errors from every layer
//! convert into [`Error`], whose [`Error::disposition`] tells the host how
//! to react.
//!
//! # Example
//!
//! ```
//! use std::sync::Arc;
//!
//! use nativa::prelude::*;
//! use nativa::headless::{HeadlessProgressBar, headless_context};
//!
//! let kind = Arc::new(handlers::progress_kind(|_| Ok(HeadlessProgressBar::default())));
//! let handler = ViewHandler::new(kind, Some(headless_context()));
//! let element = Element::builder("ProgressBar")
//!     .capability(Capability::PROGRESS)
//!     .property(names::PROGRESS, 0.5)
//!     .build();
//! handler.mount(element.clone())?;
//!
//! element.set(names::PROGRESS, 0.75);
//! assert_eq!(handler.with_peer(|bar| bar.progress), Some(0.75));
//! # Ok::<(), nativa::Error>(())
//! ```

pub mod error;

pub use error::{Disposition, Error, Result};

// --- Core re-exports -------------------------------------------------------

pub use nativa_core::batch::BatchScope;
pub use nativa_core::logging::LoggingConfig;
pub use nativa_core::property::names;
pub use nativa_core::{
    Capability, CapabilitySet, Color, Element, ElementBuilder, ElementId, EntryView,
    ProgressView, PropertyValue, Subscription,
};

// --- Backend re-exports ----------------------------------------------------

pub use nativa_backend::{
    EntryPeer, NavigationPeer, OsVersion, PageId, PeerError, PeerResult, Platform,
    PlatformContext, PlatformFeatures, PlatformView, ProgressPeer, StackOp, TransitionId,
    TransitionStatus,
};

// --- Runtime re-exports ----------------------------------------------------

pub use nativa_runtime::{
    ApplyFailure, ApplyReport, CommandCompletion, CommandMapper, CommandOutcome, DispatchPolicy,
    HandlerError, HandlerKind, NativaConfig, NavigateOutcome, NavigationCompleted,
    NavigationError, NavigationEvent, NavigationPolicy, NavigationRequest, PropertyMapper,
    StackNavigationHandler, StackNavigationManager, ViewHandler,
};

pub use nativa_backend as backend;
pub use nativa_core as core;
#[cfg(feature = "headless")]
pub use nativa_headless as headless;
pub use nativa_runtime as runtime;
pub use nativa_runtime::handlers;

// --- Process-wide helpers --------------------------------------------------

/// Resolve a font alias through the process-wide resolver.
///
/// Returns [`Error::Font`] when no resolver is installed or the alias is
/// unknown; its disposition is [`Disposition::TreatAsUnresolved`].
pub fn resolve_font(alias: &str) -> Result<String> {
    if let Some(font) = nativa_core::font::resolve(alias) {
        return Ok(font);
    }
    let reason = if nativa_core::font::global().has_resolver() {
        "alias not recognized"
    } else {
        "no resolver installed"
    };
    Err(Error::Font {
        alias: alias.to_owned(),
        reason: reason.to_owned(),
    })
}

/// Validate `config` and install the logging subscriber it describes.
#[cfg(feature = "subscriber")]
pub fn init(config: &NativaConfig) -> Result<()> {
    let errors = config.validate();
    if !errors.is_empty() {
        return Err(Error::Config(nativa_runtime::ConfigError::Invalid(errors)));
    }
    nativa_core::logging::init(&config.logging)?;
    Ok(())
}

// --- Prelude --------------------------------------------------------------

pub mod prelude {
    pub use crate::{
        BatchScope, Capability, Color, CommandCompletion, CommandOutcome, Disposition, Element,
        Error, HandlerKind, NativaConfig, NavigationRequest, PlatformContext, PlatformView,
        PropertyMapper, PropertyValue, Result, StackNavigationHandler, ViewHandler,
    };

    pub use crate::{backend, core, handlers, names, runtime};
}
