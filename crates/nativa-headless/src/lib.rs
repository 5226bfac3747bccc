#![forbid(unsafe_code)]
#![doc = "Headless backend for Nativa."]
#![doc = ""]
#![doc = "Every `nativa-backend` peer trait implemented in memory. Peers record the"]
#![doc = "operations they receive so tests can assert what a handler did, and can be"]
#![doc = "told to reject specific operations to exercise failure paths."]

use std::collections::BTreeSet;

use nativa_backend::{
    EntryPeer, NavigationPeer, OsVersion, PageId, PeerError, PeerResult, Platform,
    PlatformContext, PlatformView, ProgressPeer, StackOp, TransitionId, TransitionStatus,
};
use nativa_core::Color;
use tracing::trace;

/// Context for the headless platform; every feature is available.
#[must_use]
pub fn headless_context() -> PlatformContext {
    PlatformContext::new(Platform::Headless, OsVersion::new(1, 0))
}

// ── Journal ──────────────────────────────────────────────────────────────

/// Operation log shared by every headless peer.
#[derive(Debug, Default, Clone)]
pub struct Journal {
    calls: Vec<&'static str>,
    rejected: BTreeSet<&'static str>,
}

impl Journal {
    fn record(&mut self, operation: &'static str) -> PeerResult<()> {
        if self.rejected.contains(operation) {
            trace!(operation, "headless peer rejecting operation");
            return Err(PeerError::Rejected {
                operation,
                reason: "rejected by headless peer".into(),
            });
        }
        self.calls.push(operation);
        Ok(())
    }

    /// Operations accepted so far, in order.
    #[must_use]
    pub fn calls(&self) -> &[&'static str] {
        &self.calls
    }

    pub fn clear(&mut self) {
        self.calls.clear();
    }
}

// ── View ─────────────────────────────────────────────────────────────────

/// A headless native view.
#[derive(Debug, Clone)]
pub struct HeadlessView {
    pub opacity: f64,
    pub visible: bool,
    pub background: Option<Color>,
    pub released: bool,
    journal: Journal,
}

impl HeadlessView {
    #[must_use]
    pub fn new() -> Self {
        Self {
            opacity: 1.0,
            visible: true,
            background: None,
            released: false,
            journal: Journal::default(),
        }
    }

    /// Make every future `operation` (e.g. `"set_opacity"`) fail.
    #[must_use]
    pub fn rejecting(mut self, operation: &'static str) -> Self {
        self.journal.rejected.insert(operation);
        self
    }

    #[must_use]
    pub fn journal(&self) -> &Journal {
        &self.journal
    }

    pub fn journal_mut(&mut self) -> &mut Journal {
        &mut self.journal
    }
}

impl Default for HeadlessView {
    fn default() -> Self {
        Self::new()
    }
}

impl PlatformView for HeadlessView {
    fn set_opacity(&mut self, opacity: f64) -> PeerResult<()> {
        self.journal.record("set_opacity")?;
        self.opacity = opacity;
        Ok(())
    }

    fn set_visible(&mut self, visible: bool) -> PeerResult<()> {
        self.journal.record("set_visible")?;
        self.visible = visible;
        Ok(())
    }

    fn set_background(&mut self, color: Option<Color>) -> PeerResult<()> {
        self.journal.record("set_background")?;
        self.background = color;
        Ok(())
    }

    fn release(&mut self) {
        self.released = true;
    }
}

/// Forward `PlatformView` to an embedded `view: HeadlessView`.
macro_rules! delegate_view {
    ($ty:ty) => {
        impl $ty {
            /// Make every future `operation` fail.
            #[must_use]
            pub fn rejecting(mut self, operation: &'static str) -> Self {
                self.view = self.view.rejecting(operation);
                self
            }
        }

        impl PlatformView for $ty {
            fn set_opacity(&mut self, opacity: f64) -> PeerResult<()> {
                self.view.set_opacity(opacity)
            }

            fn set_visible(&mut self, visible: bool) -> PeerResult<()> {
                self.view.set_visible(visible)
            }

            fn set_background(&mut self, color: Option<Color>) -> PeerResult<()> {
                self.view.set_background(color)
            }

            fn release(&mut self) {
                self.view.release();
            }
        }
    };
}

// ── Progress ─────────────────────────────────────────────────────────────

/// A headless progress bar.
#[derive(Debug, Clone, Default)]
pub struct HeadlessProgressBar {
    pub view: HeadlessView,
    pub progress: f64,
    pub tint: Option<Color>,
}

delegate_view!(HeadlessProgressBar);

impl ProgressPeer for HeadlessProgressBar {
    fn set_progress(&mut self, progress: f64) -> PeerResult<()> {
        self.view.journal.record("set_progress")?;
        self.progress = progress;
        Ok(())
    }

    fn set_progress_tint(&mut self, color: Option<Color>) -> PeerResult<()> {
        self.view.journal.record("set_progress_tint")?;
        self.tint = color;
        Ok(())
    }
}

// ── Entry ────────────────────────────────────────────────────────────────

/// A headless text entry.
#[derive(Debug, Clone, Default)]
pub struct HeadlessEntry {
    pub view: HeadlessView,
    pub text: String,
    pub placeholder: String,
    pub placeholder_color: Option<Color>,
    pub max_length: Option<usize>,
    pub focused: bool,
}

delegate_view!(HeadlessEntry);

impl EntryPeer for HeadlessEntry {
    fn set_text(&mut self, text: &str) -> PeerResult<()> {
        self.view.journal.record("set_text")?;
        // Native entries truncate to their max length.
        self.text = match self.max_length {
            Some(max) => text.chars().take(max).collect(),
            None => text.to_owned(),
        };
        Ok(())
    }

    fn set_placeholder(&mut self, placeholder: &str) -> PeerResult<()> {
        self.view.journal.record("set_placeholder")?;
        placeholder.clone_into(&mut self.placeholder);
        Ok(())
    }

    fn set_placeholder_color(&mut self, color: Option<Color>) -> PeerResult<()> {
        self.view.journal.record("set_placeholder_color")?;
        self.placeholder_color = color;
        Ok(())
    }

    fn set_max_length(&mut self, max_length: Option<usize>) -> PeerResult<()> {
        self.view.journal.record("set_max_length")?;
        self.max_length = max_length;
        if let Some(max) = max_length {
            if self.text.chars().count() > max {
                self.text = self.text.chars().take(max).collect();
            }
        }
        Ok(())
    }

    fn focus(&mut self) -> PeerResult<bool> {
        self.view.journal.record("focus")?;
        if !self.view.visible {
            return Ok(false);
        }
        self.focused = true;
        Ok(true)
    }
}

// ── Navigation ───────────────────────────────────────────────────────────

/// A headless navigation controller.
///
/// Operations mutate the stack immediately. With
/// [`deferring_transitions`](Self::deferring_transitions), animated
/// operations report [`TransitionStatus::Pending`] until
/// [`finish_transition`](Self::finish_transition) is called; while a
/// transition is pending every further operation is rejected, as native
/// controllers do.
#[derive(Debug, Clone, Default)]
pub struct HeadlessNavigationController {
    pub view: HeadlessView,
    stack: Vec<PageId>,
    performed: Vec<(StackOp, bool)>,
    defer_animated: bool,
    pending: Option<TransitionId>,
    next_transition: u64,
}

delegate_view!(HeadlessNavigationController);

impl HeadlessNavigationController {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Animated operations stay pending until [`finish_transition`](Self::finish_transition).
    #[must_use]
    pub fn deferring_transitions(mut self) -> Self {
        self.defer_animated = true;
        self
    }

    /// Every operation performed so far with its animation flag.
    #[must_use]
    pub fn performed(&self) -> &[(StackOp, bool)] {
        &self.performed
    }

    /// Forget the performed-operation log.
    pub fn clear_performed(&mut self) {
        self.performed.clear();
    }

    #[must_use]
    pub fn pending_transition(&self) -> Option<TransitionId> {
        self.pending
    }

    /// Complete the pending transition, returning its id.
    pub fn finish_transition(&mut self) -> Option<TransitionId> {
        self.pending.take()
    }

    /// Replace the native stack behind the handler's back (e.g. a system back gesture).
    pub fn force_stack(&mut self, pages: Vec<PageId>) {
        self.stack = pages;
    }
}

impl NavigationPeer for HeadlessNavigationController {
    fn native_stack(&self) -> &[PageId] {
        &self.stack
    }

    fn perform(&mut self, op: &StackOp, animated: bool) -> PeerResult<TransitionStatus> {
        if let Some(pending) = self.pending {
            return Err(PeerError::Rejected {
                operation: op.name(),
                reason: format!("transition {pending} still running"),
            });
        }
        self.view.journal.record(op.name())?;
        op.apply_to(&mut self.stack)?;
        self.performed.push((op.clone(), animated));

        if animated && self.defer_animated {
            self.next_transition += 1;
            let id = TransitionId(self.next_transition);
            self.pending = Some(id);
            trace!(op = op.name(), transition = %id, "headless transition started");
            return Ok(TransitionStatus::Pending(id));
        }
        Ok(TransitionStatus::Finished)
    }
}
