#![forbid(unsafe_code)]

//! Handler kinds for the built-in controls.
//!
//! Each kind declares only its own entries and merges them onto the
//! [`view`] mapper.

pub mod entry;
pub mod progress;
pub mod view;

pub use entry::{FOCUS, entry_commands, entry_kind, entry_mapper};
pub use progress::{progress_kind, progress_mapper};
pub use view::{view_kind, view_mapper};
