#![forbid(unsafe_code)]

//! The stack navigation handler kind.
//!
//! The peer of a navigation handler is a [`NavigationHost`]: the native
//! controller plus the [`StackNavigationManager`] that drives it. Requests
//! arrive through the `request_navigation` command (argument:
//! [`NavigationRequest`]) or through [`StackNavigationHandler`], which also
//! forwards manager events to a listener.

use std::any::Any;
use std::cell::{Cell, RefCell};
use std::collections::VecDeque;
use std::fmt;
use std::sync::Arc;

use nativa_backend::{
    NavigationPeer, PeerError, PeerResult, PlatformContext, PlatformFeatures, PlatformView,
    TransitionId,
};
use nativa_core::{Capability, Color, Element};
use tracing::debug;

use crate::command::{CommandCompletion, CommandMapper};
use crate::config::NavigationPolicy;
use crate::error::{HandlerError, NavigationError};
use crate::handler::{HandlerKind, ViewHandler};
use crate::handlers::view::view_mapper;
use crate::mapper::ApplyReport;
use crate::navigation::manager::{
    NavigateOutcome, NavigationEvent, NavigationRequest, StackNavigationManager,
};

/// Command that takes a [`NavigationRequest`] argument.
pub const REQUEST_NAVIGATION: &str = "request_navigation";

/// Native controller plus the manager reconciling it.
#[derive(Debug)]
pub struct NavigationHost<N> {
    pub controller: N,
    pub manager: StackNavigationManager,
}

impl<N: NavigationPeer> NavigationHost<N> {
    #[must_use]
    pub fn new(controller: N, manager: StackNavigationManager) -> Self {
        Self {
            controller,
            manager,
        }
    }

    pub fn navigate_to(
        &mut self,
        request: NavigationRequest,
    ) -> Result<NavigateOutcome, NavigationError> {
        self.manager.navigate_to(request, &mut self.controller)
    }

    pub fn transition_completed(
        &mut self,
        id: TransitionId,
    ) -> Result<NavigateOutcome, NavigationError> {
        self.manager.transition_completed(id, &mut self.controller)
    }
}

impl<N: NavigationPeer> PlatformView for NavigationHost<N> {
    fn set_opacity(&mut self, opacity: f64) -> PeerResult<()> {
        self.controller.set_opacity(opacity)
    }

    fn set_visible(&mut self, visible: bool) -> PeerResult<()> {
        self.controller.set_visible(visible)
    }

    fn set_background(&mut self, color: Option<Color>) -> PeerResult<()> {
        self.controller.set_background(color)
    }

    fn release(&mut self) {
        self.controller.release();
    }
}

fn request_navigation<N: NavigationPeer>(
    host: &mut NavigationHost<N>,
    _element: &Element,
    arg: Option<&dyn Any>,
    completion: Option<CommandCompletion>,
) {
    let result = match arg.and_then(|a| a.downcast_ref::<NavigationRequest>()) {
        Some(request) => host.navigate_to(request.clone()),
        None => Err(NavigationError::MissingArgument("NavigationRequest")),
    };
    let Some(token) = completion else {
        return;
    };
    match result {
        Ok(_) => token.complete(),
        Err(e) => token.fail(e.to_string()),
    }
}

/// The `stack_navigation` handler kind.
///
/// Requires [`Capability::STACK_NAVIGATION`] on the element and
/// [`PlatformFeatures::UNIFIED_NAVIGATION`] on the platform. Transitions
/// animate only where [`PlatformFeatures::ANIMATED_TRANSITIONS`] is present.
pub fn stack_navigation_kind<N: NavigationPeer>(
    policy: NavigationPolicy,
    factory: impl Fn(&PlatformContext) -> Result<N, HandlerError> + Send + Sync + 'static,
) -> HandlerKind<NavigationHost<N>> {
    HandlerKind::new("stack_navigation", Capability::STACK_NAVIGATION, move |ctx| {
        let controller = factory(ctx)?;
        let manager = StackNavigationManager::new(policy)
            .with_animations(ctx.supports(PlatformFeatures::ANIMATED_TRANSITIONS));
        Ok(NavigationHost::new(controller, manager))
    })
    .requiring(PlatformFeatures::UNIFIED_NAVIGATION)
    .with_mapper(view_mapper())
    .with_commands(CommandMapper::new().with(REQUEST_NAVIGATION, request_navigation::<N>))
}

type Listener = Box<dyn FnMut(NavigationEvent)>;

/// A navigation handler that forwards manager events to a listener.
pub struct StackNavigationHandler<N: NavigationPeer> {
    handler: ViewHandler<NavigationHost<N>>,
    listener: RefCell<Option<Listener>>,
    backlog: RefCell<VecDeque<NavigationEvent>>,
    delivering: Cell<bool>,
}

/// Clears the delivering flag even if the listener panics.
struct Delivering<'a>(&'a Cell<bool>);

impl Drop for Delivering<'_> {
    fn drop(&mut self) {
        self.0.set(false);
    }
}

impl<N: NavigationPeer> StackNavigationHandler<N> {
    pub fn new(kind: Arc<HandlerKind<NavigationHost<N>>>, context: Option<PlatformContext>) -> Self {
        Self {
            handler: ViewHandler::new(kind, context),
            listener: RefCell::new(None),
            backlog: RefCell::new(VecDeque::new()),
            delivering: Cell::new(false),
        }
    }

    /// Receive lifecycle and completion events.
    pub fn set_listener(&self, listener: impl FnMut(NavigationEvent) + 'static) {
        *self.listener.borrow_mut() = Some(Box::new(listener));
    }

    #[must_use]
    pub fn handler(&self) -> &ViewHandler<NavigationHost<N>> {
        &self.handler
    }

    pub fn mount(&self, element: Element) -> Result<ApplyReport, HandlerError> {
        self.handler.mount(element)
    }

    pub fn disconnect(&self) -> Option<(Element, NavigationHost<N>)> {
        self.handler.disconnect()
    }

    pub fn request_navigation(
        &self,
        request: NavigationRequest,
    ) -> Result<NavigateOutcome, NavigationError> {
        let result = self
            .handler
            .with_peer_mut(|host, _| host.navigate_to(request))
            .unwrap_or(Err(NavigationError::Peer(PeerError::Unavailable(
                "navigation controller",
            ))));
        self.forward_events();
        result
    }

    /// Deliver a native transition completion.
    pub fn transition_completed(&self, id: TransitionId) -> Result<NavigateOutcome, NavigationError> {
        let result = self
            .handler
            .with_peer_mut(|host, _| host.transition_completed(id))
            .unwrap_or(Ok(NavigateOutcome::Ignored));
        self.forward_events();
        result
    }

    /// Invoke a command on the underlying handler and forward resulting events.
    pub fn invoke(
        &self,
        command: &str,
        arg: Option<&dyn Any>,
        completion: Option<CommandCompletion>,
    ) -> bool {
        let handled = self.handler.invoke(command, arg, completion);
        self.forward_events();
        handled
    }

    /// Run `f` with the native controller.
    pub fn with_controller_mut<R>(&self, f: impl FnOnce(&mut N) -> R) -> Option<R> {
        self.handler.with_peer_mut(|host, _| f(&mut host.controller))
    }

    /// The manager's settled logical stack.
    #[must_use]
    pub fn current_stack(&self) -> Vec<Element> {
        self.handler
            .with_peer(|host| host.manager.current_stack().to_vec())
            .unwrap_or_default()
    }

    fn forward_events(&self) {
        let events = self
            .handler
            .with_peer_mut(|host, _| host.manager.drain_events())
            .unwrap_or_default();
        self.backlog.borrow_mut().extend(events);
        // A listener that navigates again lands here; the outer call delivers.
        if self.delivering.replace(true) {
            return;
        }
        let _delivering = Delivering(&self.delivering);
        loop {
            let next = self.backlog.borrow_mut().pop_front();
            let Some(event) = next else {
                return;
            };
            let taken = self.listener.borrow_mut().take();
            let Some(mut listener) = taken else {
                let dropped = 1 + self.backlog.borrow_mut().drain(..).count();
                debug!(dropped, "navigation events without listener");
                return;
            };
            listener(event);
            let mut slot = self.listener.borrow_mut();
            if slot.is_none() {
                *slot = Some(listener);
            }
        }
    }
}

impl<N: NavigationPeer> fmt::Debug for StackNavigationHandler<N> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StackNavigationHandler")
            .field("handler", &self.handler)
            .field("has_listener", &self.listener.borrow().is_some())
            .finish()
    }
}
