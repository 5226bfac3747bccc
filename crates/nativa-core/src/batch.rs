#![forbid(unsafe_code)]

//! Batch coalescing for element change notifications.
//!
//! Setting several properties in a row normally dispatches one mapper entry
//! per change. Inside a [`BatchScope`] notifications are deferred until the
//! outermost scope exits, and each (subscriber, property) pair fires at most
//! once.
//!
//! # Usage
//!
//! ```
//! use nativa_core::batch::BatchScope;
//! use nativa_core::{Capability, Element};
//!
//! let bar = Element::builder("ProgressBar")
//!     .capability(Capability::PROGRESS)
//!     .build();
//! {
//!     let _batch = BatchScope::new();
//!     bar.set("progress", 0.25); // deferred
//!     bar.set("progress", 0.75); // coalesced with the first set
//! } // subscribers see "progress" once, reading 0.75
//! ```
//!
//! # Invariants
//!
//! 1. Nested batches are supported: only the outermost scope flushes.
//! 2. Within a batch, `Element::get()` returns the latest value (values are
//!    stored immediately, only notifications are deferred).
//! 3. Flush calls deferred callbacks in the order they were first enqueued.
//!
//! # Failure Modes
//!
//! - **Callback panics during flush**: remaining callbacks are still called.
//!   The first panic is re-raised after all callbacks have been attempted.

use std::cell::RefCell;
use tracing::{debug, debug_span};
use web_time::Instant;

/// A deferred notification.
type DeferredNotify = Box<dyn FnOnce()>;

/// Coalescing key: one subscriber callback observing one property.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct NotifyKey {
    pub subscriber: usize,
    pub property: String,
}

struct DeferredEntry {
    key: NotifyKey,
    notify: DeferredNotify,
}

struct BatchContext {
    /// Nesting depth. Only flush when this reaches 0.
    depth: u32,
    deferred: Vec<DeferredEntry>,
    /// Raw notifications received, before coalescing.
    notifications: u64,
}

thread_local! {
    static BATCH_CTX: RefCell<Option<BatchContext>> = const { RefCell::new(None) };
}

/// Returns true if a batch is currently active on this thread.
pub fn is_batching() -> bool {
    BATCH_CTX.with(|ctx| ctx.borrow().is_some())
}

/// Enqueue a notification keyed by `key`.
///
/// If the key is already queued in the current batch, the queued callback is
/// replaced (latest wins) while keeping its original position. Outside a
/// batch `f` runs immediately and this returns `false`.
pub fn defer_or_run_keyed(key: NotifyKey, f: impl FnOnce() + 'static) -> bool {
    BATCH_CTX.with(|ctx| {
        let mut guard = ctx.borrow_mut();
        if let Some(ref mut batch) = *guard {
            batch.notifications = batch.notifications.saturating_add(1);
            if let Some(entry) = batch
                .deferred
                .iter_mut()
                .find(|entry| entry.key == key)
            {
                entry.notify = Box::new(f);
            } else {
                batch.deferred.push(DeferredEntry {
                    key,
                    notify: Box::new(f),
                });
            }
            true
        } else {
            drop(guard);
            f();
            false
        }
    })
}

/// Runs the deferred notifications of a finished batch.
///
/// The batch context is already cleared, so notifications raised by these
/// callbacks fire immediately instead of being queued into a dead batch.
fn flush(batch: BatchContext) {
    let BatchContext {
        notifications,
        deferred,
        ..
    } = batch;
    if deferred.is_empty() {
        return;
    }

    let dispatched = deferred.len() as u64;
    let start = Instant::now();
    let _span = debug_span!("batch.flush", notifications, dispatched).entered();

    let mut first_panic: Option<Box<dyn std::any::Any + Send>> = None;
    for entry in deferred {
        let result = std::panic::catch_unwind(std::panic::AssertUnwindSafe(entry.notify));
        if let Err(payload) = result
            && first_panic.is_none()
        {
            first_panic = Some(payload);
        }
    }

    debug!(
        duration_us = start.elapsed().as_micros() as u64,
        notifications, dispatched, "batch flushed"
    );

    if let Some(payload) = first_panic {
        std::panic::resume_unwind(payload);
    }
}

/// RAII guard that begins a batch scope.
///
/// While a `BatchScope` is alive, element change notifications are deferred.
/// When the outermost scope drops, all deferred notifications fire.
pub struct BatchScope {
    is_root: bool,
}

impl BatchScope {
    /// Begin a new batch scope, or nest inside the active one.
    #[must_use]
    pub fn new() -> Self {
        let is_root = BATCH_CTX.with(|ctx| {
            let mut guard = ctx.borrow_mut();
            match *guard {
                Some(ref mut batch) => {
                    batch.depth += 1;
                    false
                }
                None => {
                    *guard = Some(BatchContext {
                        depth: 1,
                        deferred: Vec::new(),
                        notifications: 0,
                    });
                    true
                }
            }
        });
        Self { is_root }
    }

    /// Number of deferred notifications queued in the current batch.
    #[must_use]
    pub fn pending_count(&self) -> usize {
        BATCH_CTX.with(|ctx| ctx.borrow().as_ref().map_or(0, |b| b.deferred.len()))
    }

    /// Whether this scope is the outermost one.
    #[must_use]
    pub fn is_root(&self) -> bool {
        self.is_root
    }
}

impl Default for BatchScope {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for BatchScope {
    fn drop(&mut self) {
        let finished = BATCH_CTX.with(|ctx| {
            let mut guard = ctx.borrow_mut();
            let done = match *guard {
                Some(ref mut batch) => {
                    batch.depth -= 1;
                    batch.depth == 0
                }
                None => false,
            };
            if done { guard.take() } else { None }
        });

        if let Some(batch) = finished {
            flush(batch);
        }
    }
}

impl std::fmt::Debug for BatchScope {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BatchScope")
            .field("is_root", &self.is_root)
            .field("pending", &self.pending_count())
            .finish()
    }
}
