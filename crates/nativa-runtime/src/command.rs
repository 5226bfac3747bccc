#![forbid(unsafe_code)]

//! Command mapper: one-shot imperative actions routed to the native peer.
//!
//! Commands differ from properties: they carry an optional argument, are
//! never replayed on connect, and may report an outcome through a
//! [`CommandCompletion`] token.
//!
//! # Failure Modes
//!
//! - **Unknown command**: no-op; the token resolves [`CommandOutcome::NotHandled`].
//! - **Token dropped unresolved**: resolves `NotHandled`, or `Failed` when
//!   dropped while unwinding from a panicking command.

use std::any::Any;
use std::cell::RefCell;
use std::fmt;
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::rc::Rc;
use std::sync::Arc;

use nativa_core::Element;
use nativa_core::logging::panic_message;
use tracing::{debug, warn};


/// How a command ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CommandOutcome {
    Completed,
    NotHandled,
    Failed(String),
}

/// One-shot completion token for a command invocation.
pub struct CommandCompletion {
    resolve: Option<Box<dyn FnOnce(CommandOutcome)>>,
}

impl CommandCompletion {
    /// Token that calls `f` exactly once with the outcome.
    pub fn new(f: impl FnOnce(CommandOutcome) + 'static) -> Self {
        Self {
            resolve: Some(Box::new(f)),
        }
    }

    /// Token plus a receiver that stores the outcome.
    #[must_use]
    pub fn channel() -> (Self, CompletionReceiver) {
        let slot = Rc::new(RefCell::new(None));
        let writer = Rc::clone(&slot);
        let token = Self::new(move |outcome| *writer.borrow_mut() = Some(outcome));
        (token, CompletionReceiver { slot })
    }

    pub fn resolve(mut self, outcome: CommandOutcome) {
        self.fire(outcome);
    }

    pub fn complete(self) {
        self.resolve(CommandOutcome::Completed);
    }

    pub fn fail(self, message: impl Into<String>) {
        self.resolve(CommandOutcome::Failed(message.into()));
    }

    fn fire(&mut self, outcome: CommandOutcome) {
        if let Some(f) = self.resolve.take() {
            f(outcome);
        }
    }
}

impl Drop for CommandCompletion {
    fn drop(&mut self) {
        let outcome = if std::thread::panicking() {
            CommandOutcome::Failed("command panicked".into())
        } else {
            CommandOutcome::NotHandled
        };
        self.fire(outcome);
    }
}

impl fmt::Debug for CommandCompletion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CommandCompletion")
            .field("resolved", &self.resolve.is_none())
            .finish()
    }
}

/// Receives the outcome of a [`CommandCompletion::channel`] token.
#[derive(Debug, Clone)]
pub struct CompletionReceiver {
    slot: Rc<RefCell<Option<CommandOutcome>>>,
}

impl CompletionReceiver {
    /// The outcome, once the token was resolved.
    #[must_use]
    pub fn outcome(&self) -> Option<CommandOutcome> {
        self.slot.borrow().clone()
    }
}

/// A command function.
pub type CommandFn<P> =
    Arc<dyn Fn(&mut P, &Element, Option<&dyn Any>, Option<CommandCompletion>) + Send + Sync>;

/// Mapping from command name to command function.
pub struct CommandMapper<P> {
    entries: Vec<(String, CommandFn<P>)>,
}

impl<P> CommandMapper<P> {
    #[must_use]
    pub fn new() -> Self {
        Self {
            entries: Vec::new(),
        }
    }

    #[must_use]
    pub fn with(
        mut self,
        name: &str,
        f: impl Fn(&mut P, &Element, Option<&dyn Any>, Option<CommandCompletion>)
        + Send
        + Sync
        + 'static,
    ) -> Self {
        self.set(name, f);
        self
    }

    /// Register `f` for `name`, replacing an existing entry in place.
    pub fn set(
        &mut self,
        name: &str,
        f: impl Fn(&mut P, &Element, Option<&dyn Any>, Option<CommandCompletion>)
        + Send
        + Sync
        + 'static,
    ) {
        let f: CommandFn<P> = Arc::new(f);
        match self.entries.iter_mut().find(|(k, _)| k == name) {
            Some(slot) => slot.1 = f,
            None => self.entries.push((name.to_owned(), f)),
        }
    }

    /// Combine base commands with overrides.
    #[must_use]
    pub fn merge(base: &Self, overrides: &Self) -> Self {
        let mut merged = base.clone();
        for (name, f) in &overrides.entries {
            match merged.entries.iter_mut().find(|(k, _)| k == name) {
                Some(slot) => slot.1 = Arc::clone(f),
                None => merged.entries.push((name.clone(), Arc::clone(f))),
            }
        }
        merged
    }

    #[must_use]
    pub fn get(&self, name: &str) -> Option<&CommandFn<P>> {
        self.entries.iter().find(|(k, _)| k == name).map(|(_, f)| f)
    }

    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    pub fn names(&self) -> impl Iterator<Item = &str> + '_ {
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

    /// Run the command `name`. Returns whether a command was found.
    ///
    /// A panicking command is caught and logged; its token resolves `Failed`.
    pub fn invoke(
        &self,
        peer: &mut P,
        element: &Element,
        name: &str,
        arg: Option<&dyn Any>,
        completion: Option<CommandCompletion>,
    ) -> bool {
        let Some(f) = self.get(name) else {
            debug!(element = %element.id(), command = name, "unknown command ignored");
            if let Some(token) = completion {
                token.resolve(CommandOutcome::NotHandled);
            }
            return false;
        };
        debug!(element = %element.id(), command = name, "invoking command");
        if let Err(payload) = catch_unwind(AssertUnwindSafe(|| f(peer, element, arg, completion))) {
            warn!(
                element = %element.id(),
                command = name,
                reason = panic_message(payload.as_ref()),
                "command panicked"
            );
        }
        true
    }
}

impl<P> Clone for CommandMapper<P> {
    fn clone(&self) -> Self {
        Self {
            entries: self.entries.clone(),
        }
    }
}

impl<P> Default for CommandMapper<P> {
    fn default() -> Self {
        Self::new()
    }
}

impl<P> fmt::Debug for CommandMapper<P> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.names()).finish()
    }
}
