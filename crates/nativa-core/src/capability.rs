#![forbid(unsafe_code)]

//! Capability sets and typed capability views.
//!
//! A capability names an interface an element implements (`progress`,
//! `entry`, `stack_navigation`, ...). Update functions read element state
//! through a typed view, which only exists when the capability is present.

use std::collections::BTreeSet;
use std::fmt;

use crate::element::Element;
use crate::property::{Color, names};

/// Name of an interface an element implements.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Capability(&'static str);

impl Capability {
    /// Every element is a view.
    pub const VIEW: Self = Self("view");
    pub const PROGRESS: Self = Self("progress");
    pub const ENTRY: Self = Self("entry");
    pub const STACK_NAVIGATION: Self = Self("stack_navigation");
    /// Pages hosted by a navigation stack.
    pub const PAGE: Self = Self("page");

    /// Define an application-specific capability.
    #[must_use]
    pub const fn new(name: &'static str) -> Self {
        Self(name)
    }

    #[must_use]
    pub const fn name(self) -> &'static str {
        self.0
    }
}

impl fmt::Display for Capability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.0)
    }
}

/// The set of capabilities an element implements. Always contains [`Capability::VIEW`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CapabilitySet {
    set: BTreeSet<Capability>,
}

impl CapabilitySet {
    #[must_use]
    pub fn new() -> Self {
        let mut set = BTreeSet::new();
        set.insert(Capability::VIEW);
        Self { set }
    }

    pub fn insert(&mut self, capability: Capability) -> bool {
        self.set.insert(capability)
    }

    #[must_use]
    pub fn contains(&self, capability: Capability) -> bool {
        self.set.contains(&capability)
    }

    pub fn iter(&self) -> impl Iterator<Item = Capability> + '_ {
        self.set.iter().copied()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.set.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.set.is_empty()
    }
}

impl Default for CapabilitySet {
    fn default() -> Self {
        Self::new()
    }
}

impl FromIterator<Capability> for CapabilitySet {
    fn from_iter<I: IntoIterator<Item = Capability>>(iter: I) -> Self {
        let mut set = Self::new();
        for capability in iter {
            set.insert(capability);
        }
        set
    }
}

/// Read access to an element implementing [`Capability::PROGRESS`].
#[derive(Debug, Clone, Copy)]
pub struct ProgressView<'a> {
    element: &'a Element,
}

impl<'a> ProgressView<'a> {
    /// Returns `None` if the element is not a progress element.
    #[must_use]
    pub fn of(element: &'a Element) -> Option<Self> {
        element
            .has_capability(Capability::PROGRESS)
            .then_some(Self { element })
    }

    /// Progress in `[0, 1]`. Out-of-range and non-finite values clamp; unset is 0.
    #[must_use]
    pub fn progress(&self) -> f64 {
        let raw = self
            .element
            .get(names::PROGRESS)
            .and_then(|v| v.as_f64())
            .unwrap_or(0.0);
        if raw.is_nan() { 0.0 } else { raw.clamp(0.0, 1.0) }
    }

    #[must_use]
    pub fn progress_color(&self) -> Option<Color> {
        self.element
            .get(names::PROGRESS_COLOR)
            .and_then(|v| v.as_color())
    }
}

/// Read access to an element implementing [`Capability::ENTRY`].
#[derive(Debug, Clone, Copy)]
pub struct EntryView<'a> {
    element: &'a Element,
}

impl<'a> EntryView<'a> {
    #[must_use]
    pub fn of(element: &'a Element) -> Option<Self> {
        element
            .has_capability(Capability::ENTRY)
            .then_some(Self { element })
    }

    #[must_use]
    pub fn text(&self) -> String {
        self.text_property(names::TEXT)
    }

    #[must_use]
    pub fn placeholder(&self) -> String {
        self.text_property(names::PLACEHOLDER)
    }

    #[must_use]
    pub fn placeholder_color(&self) -> Option<Color> {
        self.element
            .get(names::PLACEHOLDER_COLOR)
            .and_then(|v| v.as_color())
    }

    /// Maximum length; negative or unset means unlimited.
    #[must_use]
    pub fn max_length(&self) -> Option<usize> {
        self.element
            .get(names::MAX_LENGTH)
            .and_then(|v| v.as_int())
            .and_then(|n| usize::try_from(n).ok())
    }

    fn text_property(&self, name: &str) -> String {
        self.element
            .get(name)
            .and_then(|v| v.as_text().map(str::to_owned))
            .unwrap_or_default()
    }
}
