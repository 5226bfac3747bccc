#![forbid(unsafe_code)]

//! Nativa Runtime
//!
//! This crate binds cross-platform elements to native peers and keeps
//! navigation stacks in sync with native controllers.
//!
//! # Key Components
//!
//! - [`PropertyMapper`] - Property name → update function table
//! - [`CommandMapper`] - Command name → command function table
//! - [`ViewHandler`] - One element ↔ peer binding and its dispatch path
//! - [`HandlerKind`] - Shared descriptor of a handler type
//! - [`StackNavigationManager`] - Navigation reconciliation state machine
//! - [`NativaConfig`] - Dispatch, navigation and logging tunables
//!
//! # Role in Nativa
//! `nativa-runtime` is the middle layer. It consumes element change
//! notifications from `nativa-core` and drives the peer traits of
//! `nativa-backend`.
//!
//! # How it fits in the system
//! Handler kinds are built once per control type (see [`handlers`] and
//! [`navigation::stack_navigation_kind`]) and shared by every handler of
//! that type. Platforms supply only peer factories.

pub mod command;
pub mod config;
pub mod error;
pub mod handler;
pub mod handlers;
pub mod mapper;
pub mod navigation;

pub use command::{CommandCompletion, CommandFn, CommandMapper, CommandOutcome, CompletionReceiver};
pub use config::{ConfigError, DispatchPolicy, NativaConfig, NavigationPolicy};
pub use error::{HandlerError, NavigationError};
pub use handler::{HandlerKind, PeerFactory, ViewHandler};
pub use mapper::{ApplyFailure, ApplyFailureCause, ApplyReport, PropertyMapper, UpdateFn};
pub use navigation::{
    NavigateOutcome, NavigationCompleted, NavigationEvent, NavigationHost, NavigationPhase,
    NavigationRequest, StackNavigationHandler, StackNavigationManager,
};
