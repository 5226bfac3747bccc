#![forbid(unsafe_code)]

//! Stack navigation manager: reconciles a logical page stack with a native
//! navigation controller.
//!
//! # State Machine
//!
//! ```text
//!            navigate_to                  all steps finished
//!   Idle ───────────────► Reconciling ─────────────────────► Idle
//!                          │    ▲                              │
//!        step pending      │    │ transition_completed(id)     │ queued request
//!                          ▼    │                              ▼
//!                     (awaiting id)                      Reconciling
//! ```
//!
//! Only one transition is in flight. A request arriving while reconciling
//! is queued; a later request replaces the queued one ("last request
//! wins"). When the in-flight request settles, the queued request starts
//! and no completion is emitted for the request it superseded.
//!
//! # Invariants
//!
//! 1. After a completed reconciliation the logical stack equals the native
//!    stack, page for page.
//! 2. `NavigationCompleted` is emitted once per settled, non-superseded
//!    request, including requests for the stack already displayed.
//! 3. Invalid requests (empty, duplicate pages) leave the state unchanged.
//!
//! # Failure Modes
//!
//! - **Native controller error**: the in-flight request is aborted, the
//!   logical stack is rebuilt from the native stack, the error is returned,
//!   and a queued request still starts.
//! - **Unknown transition id**: ignored with a `debug` log.
//! - **Native stack drift** (verification on): logged at `warn` and repaired
//!   with a non-animated `Replace`.

use std::collections::VecDeque;
use std::fmt;

use nativa_backend::{NavigationPeer, PageId, StackOp, TransitionId, TransitionStatus};
use nativa_core::Element;
use tracing::{debug, info, info_span, warn};
use web_time::Instant;

use crate::config::NavigationPolicy;
use crate::error::NavigationError;
use crate::navigation::plan::{PlanKind, PlannedStep, plan_transition};

/// A request to make the stack equal `target_stack` (root first).
#[derive(Debug, Clone, PartialEq)]
pub struct NavigationRequest {
    pub target_stack: Vec<Element>,
    pub animated: bool,
}

impl NavigationRequest {
    #[must_use]
    pub fn new(target_stack: Vec<Element>, animated: bool) -> Self {
        Self {
            target_stack,
            animated,
        }
    }

    #[must_use]
    pub fn page_ids(&self) -> Vec<PageId> {
        self.target_stack.iter().map(Element::id).collect()
    }

    fn validate(&self) -> Result<(), NavigationError> {
        if self.target_stack.is_empty() {
            return Err(NavigationError::EmptyStack);
        }
        for (i, page) in self.target_stack.iter().enumerate() {
            if self.target_stack[..i].iter().any(|p| p.id() == page.id()) {
                return Err(NavigationError::DuplicatePage(page.id()));
            }
        }
        Ok(())
    }
}

/// Emitted when a request settles.
#[derive(Debug, Clone, PartialEq)]
pub struct NavigationCompleted {
    pub resulting_stack: Vec<Element>,
}

/// Notifications for the logical layer, in emission order.
#[derive(Debug, Clone, PartialEq)]
pub enum NavigationEvent {
    /// The top page is about to be covered or removed.
    Disappearing(Element),
    /// A page became the top page.
    Appearing(Element),
    Completed(NavigationCompleted),
}

/// What a navigation call did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NavigateOutcome {
    /// The request settled synchronously; a completion was emitted.
    Completed,
    /// A native transition is running; call `transition_completed(id)` when it ends.
    Pending(TransitionId),
    /// Another request is in flight; this one runs after it (unless superseded).
    Queued,
    /// The transition id did not match the running transition.
    Ignored,
}

/// Observable manager phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NavigationPhase {
    Idle,
    Reconciling,
}

struct InFlight {
    request: NavigationRequest,
    kind: PlanKind,
    steps: VecDeque<PlannedStep>,
    awaiting: Option<TransitionId>,
    previous_top: Option<Element>,
    started: Instant,
}

/// Reconciles a logical page stack with a [`NavigationPeer`].
pub struct StackNavigationManager {
    policy: NavigationPolicy,
    animations: bool,
    current: Vec<Element>,
    in_flight: Option<InFlight>,
    queued: Option<NavigationRequest>,
    events: Vec<NavigationEvent>,
}

impl StackNavigationManager {
    #[must_use]
    pub fn new(policy: NavigationPolicy) -> Self {
        Self {
            policy,
            animations: true,
            current: Vec::new(),
            in_flight: None,
            queued: None,
            events: Vec::new(),
        }
    }

    /// Disable animation for every request (platforms without animated transitions).
    #[must_use]
    pub fn with_animations(mut self, enabled: bool) -> Self {
        self.animations = enabled;
        self
    }

    #[must_use]
    pub fn policy(&self) -> &NavigationPolicy {
        &self.policy
    }

    /// The settled logical stack, root first.
    #[must_use]
    pub fn current_stack(&self) -> &[Element] {
        &self.current
    }

    #[must_use]
    pub fn phase(&self) -> NavigationPhase {
        if self.in_flight.is_some() {
            NavigationPhase::Reconciling
        } else {
            NavigationPhase::Idle
        }
    }

    #[must_use]
    pub fn queued_request(&self) -> Option<&NavigationRequest> {
        self.queued.as_ref()
    }

    /// The native transition the manager is waiting for.
    #[must_use]
    pub fn pending_transition(&self) -> Option<TransitionId> {
        self.in_flight.as_ref().and_then(|f| f.awaiting)
    }

    /// The stack the manager ends at if no further requests arrive.
    #[must_use]
    pub fn effective_target(&self) -> &[Element] {
        if let Some(queued) = &self.queued {
            &queued.target_stack
        } else if let Some(in_flight) = &self.in_flight {
            &in_flight.request.target_stack
        } else {
            &self.current
        }
    }

    /// Take every event emitted since the last drain.
    pub fn drain_events(&mut self) -> Vec<NavigationEvent> {
        std::mem::take(&mut self.events)
    }

    /// Make the stack equal `request.target_stack`.
    pub fn navigate_to<N: NavigationPeer + ?Sized>(
        &mut self,
        request: NavigationRequest,
        peer: &mut N,
    ) -> Result<NavigateOutcome, NavigationError> {
        request.validate()?;
        if self.in_flight.is_some() {
            if let Some(superseded) = self.queued.replace(request) {
                warn!(
                    pages = superseded.target_stack.len(),
                    "queued navigation request superseded"
                );
            } else {
                debug!("navigation request queued behind in-flight transition");
            }
            return Ok(NavigateOutcome::Queued);
        }
        self.start(request, peer)
    }

    /// Report that the native transition `id` finished.
    pub fn transition_completed<N: NavigationPeer + ?Sized>(
        &mut self,
        id: TransitionId,
        peer: &mut N,
    ) -> Result<NavigateOutcome, NavigationError> {
        match &mut self.in_flight {
            Some(in_flight) if in_flight.awaiting == Some(id) => {
                in_flight.awaiting = None;
                self.run(peer)
            }
            _ => {
                debug!(transition = %id, "completion for unknown transition ignored");
                Ok(NavigateOutcome::Ignored)
            }
        }
    }

    /// Push `page` onto the effective target.
    pub fn push<N: NavigationPeer + ?Sized>(
        &mut self,
        page: Element,
        animated: bool,
        peer: &mut N,
    ) -> Result<NavigateOutcome, NavigationError> {
        let mut target = self.effective_target().to_vec();
        target.push(page);
        self.navigate_to(NavigationRequest::new(target, animated), peer)
    }

    /// Pop the top page of the effective target.
    pub fn pop<N: NavigationPeer + ?Sized>(
        &mut self,
        animated: bool,
        peer: &mut N,
    ) -> Result<NavigateOutcome, NavigationError> {
        let mut target = self.effective_target().to_vec();
        if target.len() <= 1 {
            return Err(NavigationError::PopBelowRoot);
        }
        target.pop();
        self.navigate_to(NavigationRequest::new(target, animated), peer)
    }

    /// Pop every page above the root of the effective target.
    pub fn pop_to_root<N: NavigationPeer + ?Sized>(
        &mut self,
        animated: bool,
        peer: &mut N,
    ) -> Result<NavigateOutcome, NavigationError> {
        let root = self
            .effective_target()
            .first()
            .cloned()
            .ok_or(NavigationError::EmptyStack)?;
        self.navigate_to(NavigationRequest::new(vec![root], animated), peer)
    }

    /// Insert `page` directly below `before`.
    pub fn insert_page_before<N: NavigationPeer + ?Sized>(
        &mut self,
        page: Element,
        before: &Element,
        peer: &mut N,
    ) -> Result<NavigateOutcome, NavigationError> {
        let mut target = self.effective_target().to_vec();
        let index = target
            .iter()
            .position(|p| p.id() == before.id())
            .ok_or(NavigationError::PageNotFound(before.id()))?;
        target.insert(index, page);
        self.navigate_to(NavigationRequest::new(target, false), peer)
    }

    /// Remove `page` from the effective target.
    pub fn remove_page<N: NavigationPeer + ?Sized>(
        &mut self,
        page: &Element,
        peer: &mut N,
    ) -> Result<NavigateOutcome, NavigationError> {
        let mut target = self.effective_target().to_vec();
        let index = target
            .iter()
            .position(|p| p.id() == page.id())
            .ok_or(NavigationError::PageNotFound(page.id()))?;
        if target.len() == 1 {
            return Err(NavigationError::PopBelowRoot);
        }
        target.remove(index);
        self.navigate_to(NavigationRequest::new(target, false), peer)
    }

    fn start<N: NavigationPeer + ?Sized>(
        &mut self,
        request: NavigationRequest,
        peer: &mut N,
    ) -> Result<NavigateOutcome, NavigationError> {
        let current_ids: Vec<PageId> = self.current.iter().map(Element::id).collect();
        let target_ids = request.page_ids();
        let animated = request.animated && self.animations;
        let plan = plan_transition(&current_ids, &target_ids, animated, &self.policy);

        debug!(
            from = current_ids.len(),
            to = target_ids.len(),
            plan = ?plan.kind,
            steps = plan.steps.len(),
            "navigation planned"
        );

        let previous_top = self.current.last().cloned();
        if let Some(old_top) = &previous_top {
            if request.target_stack.last().map(Element::id) != Some(old_top.id()) {
                self.events.push(NavigationEvent::Disappearing(old_top.clone()));
            }
        }

        self.in_flight = Some(InFlight {
            request,
            kind: plan.kind,
            steps: plan.steps.into(),
            awaiting: None,
            previous_top,
            started: Instant::now(),
        });
        self.run(peer)
    }

    fn run<N: NavigationPeer + ?Sized>(
        &mut self,
        peer: &mut N,
    ) -> Result<NavigateOutcome, NavigationError> {
        loop {
            let Some(in_flight) = self.in_flight.as_mut() else {
                return Ok(NavigateOutcome::Completed);
            };
            let Some(step) = in_flight.steps.pop_front() else {
                return self.settle(peer);
            };
            let _span = info_span!("navigation.step", op = step.op.name(), animated = step.animated)
                .entered();
            match peer.perform(&step.op, step.animated) {
                Ok(TransitionStatus::Finished) => {}
                Ok(TransitionStatus::Pending(id)) => {
                    in_flight.awaiting = Some(id);
                    debug!(transition = %id, "awaiting native transition");
                    return Ok(NavigateOutcome::Pending(id));
                }
                Err(e) => return self.fail(NavigationError::Peer(e), peer),
            }
        }
    }

    fn settle<N: NavigationPeer + ?Sized>(
        &mut self,
        peer: &mut N,
    ) -> Result<NavigateOutcome, NavigationError> {
        let Some(in_flight) = self.in_flight.take() else {
            return Ok(NavigateOutcome::Completed);
        };
        self.current = in_flight.request.target_stack;
        info!(
            pages = self.current.len(),
            plan = ?in_flight.kind,
            elapsed_us = in_flight.started.elapsed().as_micros() as u64,
            "navigation settled"
        );
        self.emit_appearing(in_flight.previous_top.as_ref());
        if self.policy.verify_native_stack {
            self.verify(peer);
        }

        if let Some(next) = self.queued.take() {
            debug!("starting queued navigation request");
            return self.start(next, peer);
        }
        self.events.push(NavigationEvent::Completed(NavigationCompleted {
            resulting_stack: self.current.clone(),
        }));
        Ok(NavigateOutcome::Completed)
    }

    fn fail<N: NavigationPeer + ?Sized>(
        &mut self,
        error: NavigationError,
        peer: &mut N,
    ) -> Result<NavigateOutcome, NavigationError> {
        let Some(in_flight) = self.in_flight.take() else {
            return Err(error);
        };
        let known: Vec<Element> = self
            .current
            .iter()
            .chain(&in_flight.request.target_stack)
            .cloned()
            .collect();
        let mut resynced = Vec::with_capacity(peer.native_stack().len());
        for id in peer.native_stack() {
            match known.iter().find(|p| p.id() == *id) {
                Some(page) => resynced.push(page.clone()),
                None => warn!(page = %id, "native stack holds an unknown page; dropping"),
            }
        }
        warn!(
            error = %error,
            pages = resynced.len(),
            "navigation failed; logical stack resynchronized from native stack"
        );
        self.current = resynced;
        self.emit_appearing(in_flight.previous_top.as_ref());

        if let Some(next) = self.queued.take() {
            if let Err(queued_error) = self.start(next, peer) {
                warn!(error = %queued_error, "queued navigation request failed");
            }
        }
        Err(error)
    }

    fn emit_appearing(&mut self, previous_top: Option<&Element>) {
        if let Some(top) = self.current.last() {
            if previous_top.map(Element::id) != Some(top.id()) {
                self.events.push(NavigationEvent::Appearing(top.clone()));
            }
        }
    }

    fn verify<N: NavigationPeer + ?Sized>(&mut self, peer: &mut N) {
        let logical: Vec<PageId> = self.current.iter().map(Element::id).collect();
        if peer.native_stack() == logical.as_slice() {
            return;
        }
        warn!(
            logical = logical.len(),
            native = peer.native_stack().len(),
            "native stack drifted from logical stack; replacing"
        );
        match peer.perform(&StackOp::Replace(logical), false) {
            Ok(TransitionStatus::Finished) => {}
            Ok(TransitionStatus::Pending(id)) => {
                debug!(transition = %id, "repair replace reported a pending transition");
            }
            Err(e) => warn!(error = %e, "native stack repair failed"),
        }
    }
}

impl Default for StackNavigationManager {
    fn default() -> Self {
        Self::new(NavigationPolicy::default())
    }
}

impl fmt::Debug for StackNavigationManager {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StackNavigationManager")
            .field("phase", &self.phase())
            .field("current", &self.current.len())
            .field("queued", &self.queued.is_some())
            .field("pending_transition", &self.pending_transition())
            .field("events", &self.events.len())
            .finish()
    }
}
