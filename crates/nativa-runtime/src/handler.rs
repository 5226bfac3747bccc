#![forbid(unsafe_code)]

//! Handlers: bind one element to one native peer.
//!
//! # Design
//!
//! A [`HandlerKind`] is the shared, read-mostly descriptor of a handler
//! type: name, required capability, peer factory, property mapper and
//! command mapper. Kinds are built once and shared through an `Arc`.
//!
//! A [`ViewHandler`] is one live binding. Its lifecycle is
//!
//! ```text
//! new ─► create_platform_view ─► connect ─► (dispatch | invoke)* ─► disconnect
//! ```
//!
//! `connect` subscribes to the element's change notifications; the
//! subscription holds only a weak reference to the handler, so a dropped
//! handler never receives notifications.
//!
//! # Invariants
//!
//! 1. At most one element and one peer are bound at a time.
//! 2. No mapper entry runs outside `[connect, disconnect)`.
//! 3. After `connect` returns, every mapped property has been applied once.
//! 4. Notifications raised while an update function runs are queued and
//!    drained afterwards, bounded by [`DispatchPolicy::max_reentrant_passes`].
//!
//! # Failure Modes
//!
//! - **Update function fails or panics**: logged at `warn`; the handler
//!   stays connected.
//! - **Re-entrant limit reached**: remaining names are dropped with a `warn`.
//! - **`with_peer_mut` closure panics**: queued names are discarded and
//!   later changes dispatch normally.

use std::any::Any;
use std::cell::{Cell, RefCell};
use std::collections::VecDeque;
use std::fmt;
use std::rc::{Rc, Weak};
use std::sync::Arc;

use nativa_backend::{PlatformContext, PlatformFeatures, PlatformView};
use nativa_core::{Capability, Element, Subscription};
use tracing::{debug, info, trace, warn};

use crate::command::{CommandCompletion, CommandMapper, CommandOutcome};
use crate::config::DispatchPolicy;
use crate::error::HandlerError;
use crate::mapper::{ApplyReport, PropertyMapper};

/// Creates a native peer for a platform context.
pub type PeerFactory<P> = Arc<dyn Fn(&PlatformContext) -> Result<P, HandlerError> + Send + Sync>;

/// Shared descriptor of a handler type.
pub struct HandlerKind<P> {
    name: &'static str,
    required: Capability,
    required_features: PlatformFeatures,
    factory: PeerFactory<P>,
    mapper: PropertyMapper<P>,
    commands: CommandMapper<P>,
}

impl<P> HandlerKind<P> {
    pub fn new(
        name: &'static str,
        required: Capability,
        factory: impl Fn(&PlatformContext) -> Result<P, HandlerError> + Send + Sync + 'static,
    ) -> Self {
        Self {
            name,
            required,
            required_features: PlatformFeatures::empty(),
            factory: Arc::new(factory),
            mapper: PropertyMapper::new(),
            commands: CommandMapper::new(),
        }
    }

    #[must_use]
    pub fn with_mapper(mut self, mapper: PropertyMapper<P>) -> Self {
        self.mapper = mapper;
        self
    }

    #[must_use]
    pub fn with_commands(mut self, commands: CommandMapper<P>) -> Self {
        self.commands = commands;
        self
    }

    /// Platform features the kind needs; peer creation fails without them.
    #[must_use]
    pub fn requiring(mut self, features: PlatformFeatures) -> Self {
        self.required_features |= features;
        self
    }

    #[must_use]
    pub fn name(&self) -> &'static str {
        self.name
    }

    #[must_use]
    pub fn required_capability(&self) -> Capability {
        self.required
    }

    #[must_use]
    pub fn mapper(&self) -> &PropertyMapper<P> {
        &self.mapper
    }

    #[must_use]
    pub fn commands(&self) -> &CommandMapper<P> {
        &self.commands
    }

    fn create_peer(&self, context: &PlatformContext) -> Result<P, HandlerError> {
        if !context.supports(self.required_features) {
            let missing = self.required_features.difference(context.features());
            return Err(HandlerError::NotImplemented {
                kind: self.name,
                reason: format!(
                    "{} {} lacks {missing:?}",
                    context.platform(),
                    context.os_version()
                ),
            });
        }
        (self.factory)(context)
    }
}

impl<P> fmt::Debug for HandlerKind<P> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HandlerKind")
            .field("name", &self.name)
            .field("required", &self.required)
            .field("required_features", &self.required_features)
            .field("mapper", &self.mapper)
            .field("commands", &self.commands)
            .finish_non_exhaustive()
    }
}

struct Binding<P> {
    element: Element,
    peer: P,
}

struct HandlerInner<P> {
    kind: Arc<HandlerKind<P>>,
    context: Option<PlatformContext>,
    policy: Cell<DispatchPolicy>,
    peer_created: Cell<bool>,
    binding: RefCell<Option<Binding<P>>>,
    subscription: RefCell<Option<Subscription>>,
    pending: RefCell<VecDeque<String>>,
    dispatching: Cell<bool>,
}

/// A live element ↔ peer binding.
pub struct ViewHandler<P: PlatformView> {
    inner: Rc<HandlerInner<P>>,
}

impl<P: PlatformView> ViewHandler<P> {
    /// A handler of `kind`. `context` is required to create platform views.
    pub fn new(kind: Arc<HandlerKind<P>>, context: Option<PlatformContext>) -> Self {
        Self {
            inner: Rc::new(HandlerInner {
                kind,
                context,
                policy: Cell::new(DispatchPolicy::default()),
                peer_created: Cell::new(false),
                binding: RefCell::new(None),
                subscription: RefCell::new(None),
                pending: RefCell::new(VecDeque::new()),
                dispatching: Cell::new(false),
            }),
        }
    }

    /// Replace the dispatch policy.
    #[must_use]
    pub fn with_policy(self, policy: DispatchPolicy) -> Self {
        self.inner.policy.set(policy);
        self
    }

    #[must_use]
    pub fn kind(&self) -> &Arc<HandlerKind<P>> {
        &self.inner.kind
    }

    #[must_use]
    pub fn context(&self) -> Option<&PlatformContext> {
        self.inner.context.as_ref()
    }

    /// Allocate the native peer. Callable once per handler.
    pub fn create_platform_view(&self) -> Result<P, HandlerError> {
        let kind = &self.inner.kind;
        let context = self
            .inner
            .context
            .as_ref()
            .ok_or(HandlerError::MissingPlatformContext { kind: kind.name })?;
        if self.inner.peer_created.get() {
            return Err(HandlerError::PeerAlreadyCreated { kind: kind.name });
        }
        let peer = kind.create_peer(context)?;
        self.inner.peer_created.set(true);
        debug!(kind = kind.name, platform = %context.platform(), "platform view created");
        Ok(peer)
    }

    /// Bind `element` and `peer`, subscribe to changes, and apply every mapped property.
    pub fn connect(&self, element: Element, peer: P) -> Result<ApplyReport, HandlerError> {
        let kind = &self.inner.kind;
        if self.inner.binding.borrow().is_some() {
            return Err(HandlerError::AlreadyConnected { kind: kind.name });
        }
        if !element.has_capability(kind.required) {
            return Err(HandlerError::MissingCapability {
                kind: kind.name,
                capability: kind.required,
            });
        }

        let weak: Weak<HandlerInner<P>> = Rc::downgrade(&self.inner);
        let subscription = element.subscribe(move |name| {
            if let Some(inner) = weak.upgrade() {
                inner.dispatch(name);
            }
        });
        let element_id = element.id();
        *self.inner.binding.borrow_mut() = Some(Binding { element, peer });
        *self.inner.subscription.borrow_mut() = Some(subscription);

        let report = self.inner.apply_all();
        info!(
            kind = kind.name,
            element = %element_id,
            applied = report.applied.len(),
            failed = report.failures.len(),
            "handler connected"
        );
        Ok(report)
    }

    /// `create_platform_view` followed by `connect`.
    ///
    /// A handler creates its peer once; rebinding after `disconnect` goes
    /// through `connect` with the returned peer.
    pub fn mount(&self, element: Element) -> Result<ApplyReport, HandlerError> {
        let kind = &self.inner.kind;
        if self.is_connected() {
            return Err(HandlerError::AlreadyConnected { kind: kind.name });
        }
        if !element.has_capability(kind.required) {
            return Err(HandlerError::MissingCapability {
                kind: kind.name,
                capability: kind.required,
            });
        }
        let peer = self.create_platform_view()?;
        self.connect(element, peer)
    }

    /// Unbind, returning the element and the released peer.
    ///
    /// Returns `None` when nothing was bound.
    pub fn disconnect(&self) -> Option<(Element, P)> {
        self.inner.subscription.borrow_mut().take();
        self.inner.pending.borrow_mut().clear();
        let Binding { element, mut peer } = self.inner.binding.borrow_mut().take()?;
        peer.release();
        info!(kind = self.inner.kind.name, element = %element.id(), "handler disconnected");
        Some((element, peer))
    }

    #[must_use]
    pub fn is_connected(&self) -> bool {
        self.inner.binding.borrow().is_some()
    }

    /// The bound element.
    #[must_use]
    pub fn element(&self) -> Option<Element> {
        self.inner
            .binding
            .borrow()
            .as_ref()
            .map(|b| b.element.clone())
    }

    /// Apply the mapper entry for `name`. No-op when disconnected.
    pub fn dispatch_property_changed(&self, name: &str) {
        self.inner.dispatch(name);
    }

    /// Apply several mapper entries, each at most once.
    pub fn update_properties<'a>(&self, names: impl IntoIterator<Item = &'a str>) {
        let mut seen: Vec<&str> = Vec::new();
        for name in names {
            if !seen.contains(&name) {
                seen.push(name);
                self.inner.dispatch(name);
            }
        }
    }

    /// Route a command to the bound peer. Returns whether a command ran.
    ///
    /// When disconnected the completion resolves `NotHandled`.
    pub fn invoke(
        &self,
        command: &str,
        arg: Option<&dyn Any>,
        completion: Option<CommandCompletion>,
    ) -> bool {
        let kind = &self.inner.kind;
        let Ok(mut binding) = self.inner.binding.try_borrow_mut() else {
            warn!(kind = kind.name, command, "command invoked during dispatch; rejected");
            if let Some(token) = completion {
                token.resolve(CommandOutcome::Failed("handler busy".into()));
            }
            return false;
        };
        let Some(Binding { element, peer }) = binding.as_mut() else {
            debug!(kind = kind.name, command, "command on disconnected handler ignored");
            if let Some(token) = completion {
                token.resolve(CommandOutcome::NotHandled);
            }
            return false;
        };
        let element = element.clone();
        let scope = self.inner.scope();
        let handled = kind.commands.invoke(peer, &element, command, arg, completion);
        drop(binding);
        drop(scope);
        handled
    }

    /// Run `f` with the bound peer.
    pub fn with_peer<R>(&self, f: impl FnOnce(&P) -> R) -> Option<R> {
        self.with_peer_mut(|peer, _| f(peer))
    }

    /// Run `f` with the bound peer, mutably.
    ///
    /// Property changes made by `f` are dispatched after it returns.
    pub fn with_peer_mut<R>(&self, f: impl FnOnce(&mut P, &Element) -> R) -> Option<R> {
        let mut binding = self.inner.binding.try_borrow_mut().ok()?;
        let bound = binding.as_mut()?;
        let scope = self.inner.scope();
        let result = f(&mut bound.peer, &bound.element);
        drop(binding);
        drop(scope);
        Some(result)
    }
}

impl<P: PlatformView> HandlerInner<P> {
    /// Mark dispatch as running until the returned scope drops.
    fn scope(&self) -> DispatchScope<'_, P> {
        DispatchScope {
            inner: self,
            nested: self.dispatching.replace(true),
        }
    }

    fn dispatch(&self, name: &str) {
        if self.dispatching.get() {
            trace!(kind = self.kind.name, property = name, "re-entrant change queued");
            self.pending.borrow_mut().push_back(name.to_owned());
            return;
        }
        let _scope = self.scope();
        self.apply_one(name);
    }

    fn apply_all(&self) -> ApplyReport {
        // Declared first so the binding borrow ends before the scope drains.
        let _scope = self.scope();
        let mut binding = self.binding.borrow_mut();
        match binding.as_mut() {
            Some(Binding { element, peer }) => self.kind.mapper.apply_all(peer, element),
            None => ApplyReport::default(),
        }
    }

    fn apply_one(&self, name: &str) {
        let mut binding = self.binding.borrow_mut();
        let Some(Binding { element, peer }) = binding.as_mut() else {
            trace!(kind = self.kind.name, property = name, "dispatch while disconnected ignored");
            return;
        };
        match self.kind.mapper.apply(peer, element, name) {
            None => trace!(kind = self.kind.name, property = name, "no mapping"),
            Some(Ok(())) => {
                debug!(kind = self.kind.name, element = %element.id(), property = name, "property applied");
            }
            Some(Err(failure)) => warn!(
                kind = self.kind.name,
                element = %element.id(),
                property = name,
                error = %failure.message(),
                "property mapping failed"
            ),
        }
    }

    fn drain_pending(&self) {
        let policy = self.policy.get();
        for _ in 0..policy.max_reentrant_passes {
            let mut pass: Vec<String> = self.pending.borrow_mut().drain(..).collect();
            if pass.is_empty() {
                return;
            }
            if policy.dedupe_reentrant {
                let mut seen = Vec::with_capacity(pass.len());
                pass.retain(|name| {
                    if seen.contains(name) {
                        false
                    } else {
                        seen.push(name.clone());
                        true
                    }
                });
            }
            for name in &pass {
                self.apply_one(name);
            }
        }
        let dropped = {
            let mut pending = self.pending.borrow_mut();
            let n = pending.len();
            pending.clear();
            n
        };
        if dropped > 0 {
            warn!(
                kind = self.kind.name,
                dropped,
                passes = policy.max_reentrant_passes,
                "re-entrant dispatch limit reached"
            );
        }
    }
}

/// Dispatch-in-progress marker. The outermost scope drains queued changes
/// on drop; when unwinding it discards them instead.
struct DispatchScope<'a, P: PlatformView> {
    inner: &'a HandlerInner<P>,
    nested: bool,
}

impl<P: PlatformView> Drop for DispatchScope<'_, P> {
    fn drop(&mut self) {
        if self.nested {
            return;
        }
        if std::thread::panicking() {
            self.inner.pending.borrow_mut().clear();
        } else {
            self.inner.drain_pending();
        }
        self.inner.dispatching.set(false);
    }
}

impl<P: PlatformView> Drop for ViewHandler<P> {
    fn drop(&mut self) {
        if self.is_connected() {
            self.disconnect();
        }
    }
}

impl<P: PlatformView> fmt::Debug for ViewHandler<P> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ViewHandler")
            .field("kind", &self.inner.kind.name)
            .field("connected", &self.is_connected())
            .field("peer_created", &self.inner.peer_created.get())
            .finish()
    }
}
