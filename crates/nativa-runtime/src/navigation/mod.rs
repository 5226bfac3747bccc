#![forbid(unsafe_code)]

//! Navigation stack reconciliation.
//!
//! - [`plan`]: diff two stacks into native operations.
//! - [`manager`]: the Idle/Reconciling state machine driving a native controller.
//! - [`handler`]: the `stack_navigation` handler kind.

pub mod handler;
pub mod manager;
pub mod plan;

pub use handler::{NavigationHost, REQUEST_NAVIGATION, StackNavigationHandler, stack_navigation_kind};
pub use manager::{
    NavigateOutcome, NavigationCompleted, NavigationEvent, NavigationPhase, NavigationRequest,
    StackNavigationManager,
};
pub use plan::{PlanKind, PlannedStep, TransitionPlan, common_prefix_len, plan_transition};
