#![forbid(unsafe_code)]

//! Property mapper: property name → update function.
//!
//! A mapper is an ordered table. Handler kinds build theirs by merging a
//! base mapper (e.g. the view mapper) with their own entries; an override
//! replaces the base entry in place, so the base key order is kept and
//! [`PropertyMapper::apply_all`] runs entries in a predictable order.
//!
//! # Invariants
//!
//! 1. Keys are unique and case-sensitive.
//! 2. `merge(base, overrides).get(k)` is the override if present, else the
//!    base entry, else `None`.
//! 3. `apply_all` invokes every entry exactly once, in table order.
//!
//! # Failure Modes
//!
//! - **Peer error**: recorded as an [`ApplyFailure`] for that key.
//! - **Panic in an update function**: caught and recorded the same way.
//!   Later entries still run.

use std::fmt;
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::Arc;

use nativa_backend::{PeerError, PeerResult};
use nativa_core::Element;
use nativa_core::logging::panic_message;
use tracing::{trace, warn};

/// An update function: pushes one property of `element` onto the peer.
pub type UpdateFn<P> = Arc<dyn Fn(&mut P, &Element) -> PeerResult<()> + Send + Sync>;

/// Why an update function failed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ApplyFailureCause {
    Peer(PeerError),
    Panicked(String),
}

/// A single mapper entry that did not complete.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApplyFailure {
    pub key: String,
    pub cause: ApplyFailureCause,
}

impl ApplyFailure {
    #[must_use]
    pub fn message(&self) -> String {
        match &self.cause {
            ApplyFailureCause::Peer(e) => e.to_string(),
            ApplyFailureCause::Panicked(msg) => format!("update function panicked: {msg}"),
        }
    }
}

impl fmt::Display for ApplyFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "mapping `{}` failed: {}", self.key, self.message())
    }
}

impl std::error::Error for ApplyFailure {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match &self.cause {
            ApplyFailureCause::Peer(e) => Some(e),
            ApplyFailureCause::Panicked(_) => None,
        }
    }
}

/// Outcome of [`PropertyMapper::apply_all`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ApplyReport {
    /// Keys applied successfully, in order.
    pub applied: Vec<String>,
    pub failures: Vec<ApplyFailure>,
}

impl ApplyReport {
    #[must_use]
    pub fn is_clean(&self) -> bool {
        self.failures.is_empty()
    }

    /// Number of entries that ran.
    #[must_use]
    pub fn len(&self) -> usize {
        self.applied.len() + self.failures.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    #[must_use]
    pub fn failed(&self, key: &str) -> bool {
        self.failures.iter().any(|f| f.key == key)
    }
}

/// Ordered mapping from property name to update function.
pub struct PropertyMapper<P> {
    entries: Vec<(String, UpdateFn<P>)>,
}

impl<P> PropertyMapper<P> {
    #[must_use]
    pub fn new() -> Self {
        Self {
            entries: Vec::new(),
        }
    }

    /// Builder form of [`set`](Self::set).
    #[must_use]
    pub fn with(
        mut self,
        key: &str,
        f: impl Fn(&mut P, &Element) -> PeerResult<()> + Send + Sync + 'static,
    ) -> Self {
        self.set(key, f);
        self
    }

    /// Register `f` for `key`, replacing an existing entry in place.
    pub fn set(
        &mut self,
        key: &str,
        f: impl Fn(&mut P, &Element) -> PeerResult<()> + Send + Sync + 'static,
    ) {
        self.insert(key, Arc::new(f));
    }

    fn insert(&mut self, key: &str, f: UpdateFn<P>) {
        match self.entries.iter_mut().find(|(k, _)| k == key) {
            Some(slot) => slot.1 = f,
            None => self.entries.push((key.to_owned(), f)),
        }
    }

    /// Combine a base mapper with overrides. Overridden keys keep their base position.
    #[must_use]
    pub fn merge(base: &Self, overrides: &Self) -> Self {
        let mut merged = base.clone();
        merged.extend(overrides);
        merged
    }

    /// Apply every entry of `other` on top of `self`.
    pub fn extend(&mut self, other: &Self) {
        for (key, f) in &other.entries {
            self.insert(key, Arc::clone(f));
        }
    }

    /// Run `f` after the existing entry for `key` (or alone if there is none).
    pub fn append_to(
        &mut self,
        key: &str,
        f: impl Fn(&mut P, &Element) -> PeerResult<()> + Send + Sync + 'static,
    ) where
        P: 'static,
    {
        match self.get(key).cloned() {
            Some(previous) => self.set(key, move |peer, element| {
                previous(peer, element)?;
                f(peer, element)
            }),
            None => self.set(key, f),
        }
    }

    /// Run `f` before the existing entry for `key` (or alone if there is none).
    pub fn prepend_to(
        &mut self,
        key: &str,
        f: impl Fn(&mut P, &Element) -> PeerResult<()> + Send + Sync + 'static,
    ) where
        P: 'static,
    {
        match self.get(key).cloned() {
            Some(previous) => self.set(key, move |peer, element| {
                f(peer, element)?;
                previous(peer, element)
            }),
            None => self.set(key, f),
        }
    }

    /// Replace the entry for `key` with `f`, which receives the previous entry.
    pub fn modify(
        &mut self,
        key: &str,
        f: impl Fn(&mut P, &Element, Option<&UpdateFn<P>>) -> PeerResult<()>
        + Send
        + Sync
        + 'static,
    ) where
        P: 'static,
    {
        let previous = self.get(key).cloned();
        self.set(key, move |peer, element| f(peer, element, previous.as_ref()));
    }

    #[must_use]
    pub fn get(&self, key: &str) -> Option<&UpdateFn<P>> {
        self.entries.iter().find(|(k, _)| k == key).map(|(_, f)| f)
    }

    #[must_use]
    pub fn contains(&self, key: &str) -> bool {
        self.get(key).is_some()
    }

    /// Keys in table order.
    pub fn keys(&self) -> impl Iterator<Item = &str> + '_ {
        self.entries.iter().map(|(k, _)| k.as_str())
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Run the entry for `key`. Returns `None` when no entry exists.
    pub fn apply(&self, peer: &mut P, element: &Element, key: &str) -> Option<Result<(), ApplyFailure>> {
        let f = self.get(key)?;
        Some(run_entry(key, f, peer, element))
    }

    /// Run every entry once, in order, isolating failures.
    pub fn apply_all(&self, peer: &mut P, element: &Element) -> ApplyReport {
        let mut report = ApplyReport::default();
        for (key, f) in &self.entries {
            match run_entry(key, f, peer, element) {
                Ok(()) => report.applied.push(key.clone()),
                Err(failure) => {
                    warn!(
                        element = %element.id(),
                        key = key.as_str(),
                        error = %failure.message(),
                        "property mapping failed; continuing"
                    );
                    report.failures.push(failure);
                }
            }
        }
        trace!(
            element = %element.id(),
            applied = report.applied.len(),
            failed = report.failures.len(),
            "apply_all finished"
        );
        report
    }
}

fn run_entry<P>(key: &str, f: &UpdateFn<P>, peer: &mut P, element: &Element) -> Result<(), ApplyFailure> {
    match catch_unwind(AssertUnwindSafe(|| f(peer, element))) {
        Ok(Ok(())) => Ok(()),
        Ok(Err(e)) => Err(ApplyFailure {
            key: key.to_owned(),
            cause: ApplyFailureCause::Peer(e),
        }),
        Err(payload) => Err(ApplyFailure {
            key: key.to_owned(),
            cause: ApplyFailureCause::Panicked(panic_message(payload.as_ref()).to_owned()),
        }),
    }
}

impl<P> Clone for PropertyMapper<P> {
    fn clone(&self) -> Self {
        Self {
            entries: self.entries.clone(),
        }
    }
}

impl<P> Default for PropertyMapper<P> {
    fn default() -> Self {
        Self::new()
    }
}

impl<P> fmt::Debug for PropertyMapper<P> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.keys()).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Default)]
    struct Log(Vec<String>);

    fn push(tag: &'static str) -> impl Fn(&mut Log, &Element) -> PeerResult<()> + Send + Sync {
        move |log: &mut Log, _: &Element| {
            log.0.push(tag.to_owned());
            Ok(())
        }
    }

    fn element() -> Element {
        Element::builder("View").build()
    }

    #[test]
    fn merge_overrides_in_base_position() {
        let base = PropertyMapper::new()
            .with("a", push("base-a"))
            .with("b", push("base-b"))
            .with("c", push("base-c"));
        let overrides = PropertyMapper::new()
            .with("b", push("over-b"))
            .with("d", push("over-d"));
        let merged = PropertyMapper::merge(&base, &overrides);

        assert_eq!(merged.keys().collect::<Vec<_>>(), ["a", "b", "c", "d"]);
        let mut log = Log::default();
        merged.apply_all(&mut log, &element());
        assert_eq!(log.0, ["base-a", "over-b", "base-c", "over-d"]);
        // The base is untouched.
        let mut log = Log::default();
        base.apply(&mut log, &element(), "b");
        assert_eq!(log.0, ["base-b"]);
    }

    #[test]
    fn absent_key_is_noop() {
        let mapper = PropertyMapper::new().with("Opacity", push("x"));
        let mut log = Log::default();
        assert!(mapper.apply(&mut log, &element(), "opacity").is_none());
        assert!(log.0.is_empty());
    }

    #[test]
    fn append_and_prepend_order() {
        let mut mapper = PropertyMapper::new().with("k", push("orig"));
        mapper.append_to("k", push("after"));
        mapper.prepend_to("k", push("before"));
        mapper.append_to("fresh", push("only"));

        let mut log = Log::default();
        mapper.apply_all(&mut log, &element());
        assert_eq!(log.0, ["before", "orig", "after", "only"]);
        assert_eq!(mapper.len(), 2);
    }

    #[test]
    fn modify_can_wrap_previous() {
        let mut mapper = PropertyMapper::new().with("k", push("inner"));
        mapper.modify("k", |log: &mut Log, el, previous| {
            log.0.push("outer".into());
            match previous {
                Some(f) => f(log, el),
                None => Ok(()),
            }
        });
        let mut log = Log::default();
        mapper.apply(&mut log, &element(), "k").unwrap().unwrap();
        assert_eq!(log.0, ["outer", "inner"]);
    }

    #[test]
    fn failures_are_isolated() {
        let mapper = PropertyMapper::new()
            .with("a", push("a"))
            .with("b", |_: &mut Log, _: &Element| {
                Err(PeerError::Rejected {
                    operation: "set_b",
                    reason: "nope".into(),
                })
            })
            .with("c", |_: &mut Log, _: &Element| panic!("boom"))
            .with("d", push("d"));

        let mut log = Log::default();
        let report = mapper.apply_all(&mut log, &element());
        assert_eq!(log.0, ["a", "d"]);
        assert_eq!(report.applied, ["a", "d"]);
        assert_eq!(report.failures.len(), 2);
        assert!(report.failed("b"));
        assert!(matches!(
            &report.failures[1].cause,
            ApplyFailureCause::Panicked(msg) if msg == "boom"
        ));
        assert_eq!(report.len(), 4);
    }
}
