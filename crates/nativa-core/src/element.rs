#![forbid(unsafe_code)]

//! Elements: the cross-platform, declarative representation of a control.
//!
//! # Design
//!
//! An [`Element`] is a cheap, clonable handle to shared state
//! (`Rc<..>` + `RefCell`). Cloning the handle does not clone the element:
//! both handles share identity, properties, and subscribers.
//!
//! When a property value changes (determined by `PartialEq`), every live
//! subscriber is notified with the property name, in registration order.
//! Inside a [`BatchScope`](crate::batch::BatchScope) notifications are
//! deferred and coalesced per (subscriber, property).
//!
//! # Invariants
//!
//! 1. `id()` never changes and is unique within the process.
//! 2. `set(name, v)` where `v == current` is a no-op.
//! 3. `version()` increments by exactly 1 on each value-changing mutation.
//! 4. Dead subscribers (dropped [`Subscription`] guards) are pruned lazily.
//!
//! # Failure Modes
//!
//! - **Re-entrant set**: setting a property from a subscriber callback is
//!   allowed; the borrow is released before callbacks run.

use std::cell::RefCell;
use std::fmt;
use std::rc::{Rc, Weak};
use std::sync::atomic::{AtomicU64, Ordering};

use ahash::AHashMap;
use tracing::trace;

use crate::batch::{self, NotifyKey};
use crate::capability::{Capability, CapabilitySet};
use crate::property::PropertyValue;

/// Global counter for element identities.
static ELEMENT_COUNTER: AtomicU64 = AtomicU64::new(1);

/// Process-unique identity of an element.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ElementId(u64);

impl ElementId {
    fn next() -> Self {
        Self(ELEMENT_COUNTER.fetch_add(1, Ordering::Relaxed))
    }

    /// Get the raw ID value.
    #[must_use]
    pub const fn raw(self) -> u64 {
        self.0
    }
}

impl fmt::Display for ElementId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

type CallbackRc = Rc<dyn Fn(&str)>;
type CallbackWeak = Weak<dyn Fn(&str)>;

struct ElementState {
    properties: AHashMap<String, PropertyValue>,
    version: u64,
    subscribers: Vec<CallbackWeak>,
}

struct ElementInner {
    id: ElementId,
    type_name: String,
    capabilities: CapabilitySet,
    state: RefCell<ElementState>,
}

/// A shared handle to a cross-platform element.
#[derive(Clone)]
pub struct Element {
    inner: Rc<ElementInner>,
}

impl Element {
    /// Start building an element of the given type name.
    #[must_use]
    pub fn builder(type_name: impl Into<String>) -> ElementBuilder {
        ElementBuilder {
            type_name: type_name.into(),
            capabilities: CapabilitySet::new(),
            properties: AHashMap::new(),
        }
    }

    #[must_use]
    pub fn id(&self) -> ElementId {
        self.inner.id
    }

    #[must_use]
    pub fn type_name(&self) -> &str {
        &self.inner.type_name
    }

    #[must_use]
    pub fn capabilities(&self) -> &CapabilitySet {
        &self.inner.capabilities
    }

    #[must_use]
    pub fn has_capability(&self, capability: Capability) -> bool {
        self.inner.capabilities.contains(capability)
    }

    /// Whether two handles refer to the same element.
    #[must_use]
    pub fn same(&self, other: &Element) -> bool {
        Rc::ptr_eq(&self.inner, &other.inner)
    }

    /// Current value of a property, or `None` if it was never set.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<PropertyValue> {
        self.inner.state.borrow().properties.get(name).cloned()
    }

    /// Names of every property that has been set, sorted.
    #[must_use]
    pub fn property_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self
            .inner
            .state
            .borrow()
            .properties
            .keys()
            .cloned()
            .collect();
        names.sort();
        names
    }

    /// Set a property. Subscribers are notified only if the value changed.
    pub fn set(&self, name: &str, value: impl Into<PropertyValue>) {
        let value = value.into();
        {
            let mut state = self.inner.state.borrow_mut();
            if state.properties.get(name) == Some(&value) {
                return;
            }
            state.properties.insert(name.to_owned(), value);
            state.version += 1;
        }
        self.notify(name);
    }

    /// Notify subscribers that `name` changed without changing its value.
    ///
    /// Used when a property is derived from state outside the element.
    pub fn invalidate(&self, name: &str) {
        self.notify(name);
    }

    #[must_use]
    pub fn version(&self) -> u64 {
        self.inner.state.borrow().version
    }

    /// Subscribe to property changes. The callback receives the property name.
    ///
    /// Dropping the returned guard unsubscribes.
    pub fn subscribe(&self, callback: impl Fn(&str) + 'static) -> Subscription {
        let strong: CallbackRc = Rc::new(callback);
        let weak = Rc::downgrade(&strong);
        self.inner.state.borrow_mut().subscribers.push(weak);
        Subscription {
            _guard: Box::new(strong),
        }
    }

    /// Number of registered subscribers, including dead ones not yet pruned.
    #[must_use]
    pub fn subscriber_count(&self) -> usize {
        self.inner.state.borrow().subscribers.len()
    }

    fn notify(&self, name: &str) {
        let callbacks: Vec<CallbackRc> = {
            let mut state = self.inner.state.borrow_mut();
            state.subscribers.retain(|w| w.strong_count() > 0);
            state.subscribers.iter().filter_map(Weak::upgrade).collect()
        };

        if callbacks.is_empty() {
            return;
        }

        trace!(
            element = %self.inner.id,
            property = name,
            subscribers = callbacks.len(),
            "element property changed"
        );

        if batch::is_batching() {
            for cb in callbacks {
                let key = NotifyKey {
                    subscriber: Rc::as_ptr(&cb) as *const () as usize,
                    property: name.to_owned(),
                };
                let property = name.to_owned();
                batch::defer_or_run_keyed(key, move || cb(&property));
            }
            return;
        }

        for cb in &callbacks {
            cb(name);
        }
    }
}

impl PartialEq for Element {
    fn eq(&self, other: &Self) -> bool {
        self.same(other)
    }
}

impl Eq for Element {}

impl fmt::Debug for Element {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.inner.state.borrow();
        f.debug_struct("Element")
            .field("id", &self.inner.id)
            .field("type_name", &self.inner.type_name)
            .field("version", &state.version)
            .field("properties", &state.properties.len())
            .field("subscriber_count", &state.subscribers.len())
            .finish()
    }
}

/// Builder for [`Element`].
#[derive(Debug)]
pub struct ElementBuilder {
    type_name: String,
    capabilities: CapabilitySet,
    properties: AHashMap<String, PropertyValue>,
}

impl ElementBuilder {
    #[must_use]
    pub fn capability(mut self, capability: Capability) -> Self {
        self.capabilities.insert(capability);
        self
    }

    /// Initial property value; does not count as a change.
    #[must_use]
    pub fn property(mut self, name: &str, value: impl Into<PropertyValue>) -> Self {
        self.properties.insert(name.to_owned(), value.into());
        self
    }

    #[must_use]
    pub fn build(self) -> Element {
        Element {
            inner: Rc::new(ElementInner {
                id: ElementId::next(),
                type_name: self.type_name,
                capabilities: self.capabilities,
                state: RefCell::new(ElementState {
                    properties: self.properties,
                    version: 0,
                    subscribers: Vec::new(),
                }),
            }),
        }
    }
}

/// RAII guard for a change subscriber.
///
/// Dropping the `Subscription` makes the callback unreachable: the strong
/// `Rc` goes away, so the element's weak entry fails to upgrade.
pub struct Subscription {
    _guard: Box<dyn std::any::Any>,
}

impl fmt::Debug for Subscription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subscription").finish_non_exhaustive()
    }
}
