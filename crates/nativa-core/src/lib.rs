#![forbid(unsafe_code)]

//! Core: the element model and the process-wide slots shared by handlers.
//!
//! # Role in Nativa
//! `nativa-core` is the upward boundary. It owns the cross-platform element
//! ("virtual view") representation: a bag of typed properties, a capability
//! set, and a change-notification stream that handlers subscribe to.
//!
//! # Primary responsibilities
//! - **Element**: identity, properties, capabilities, change notifications.
//! - **Batch**: coalescing of change notifications inside a [`batch::BatchScope`].
//! - **Capability views**: typed read access for update functions.
//! - **Font aliases**: the single process-wide resolver slot.
//!
//! # How it fits in the system
//! The runtime (`nativa-runtime`) binds elements to native peers defined by
//! `nativa-backend`. Nothing in this crate knows about native widgets.

pub mod batch;
pub mod capability;
pub mod element;
pub mod font;
pub mod logging;
pub mod property;

pub use capability::{Capability, CapabilitySet, EntryView, ProgressView};
pub use element::{Element, ElementBuilder, ElementId, Subscription};
pub use property::{Color, PropertyValue};

// Re-export tracing macros at crate root for ergonomic use.
pub use logging::{debug, debug_span, error, info, info_span, trace, warn, warn_span};
