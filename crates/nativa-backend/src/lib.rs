#![forbid(unsafe_code)]
#![doc = "Native peer traits for Nativa: the boundary between handlers and platform widgets."]
#![doc = ""]
#![doc = "This crate defines the operations update functions may perform on a native peer."]
#![doc = "Each platform (Android, iOS/macOS, Windows, headless) implements the same traits;"]
#![doc = "which implementation is linked is decided at build time, not through inheritance."]

use core::fmt;

use bitflags::bitflags;
use nativa_core::{Color, ElementId};

/// Identity of a page on a navigation stack.
pub type PageId = ElementId;

// ── Platform ───────────────────────────────────────────────────────────────

/// Target platform family.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Platform {
    Android,
    Ios,
    MacCatalyst,
    Windows,
    /// In-memory backend; no native toolkit.
    Headless,
}

impl Platform {
    /// The platform this binary was built for.
    #[must_use]
    pub const fn current() -> Self {
        if cfg!(target_os = "android") {
            Self::Android
        } else if cfg!(target_os = "ios") {
            Self::Ios
        } else if cfg!(target_os = "macos") {
            Self::MacCatalyst
        } else if cfg!(target_os = "windows") {
            Self::Windows
        } else {
            Self::Headless
        }
    }

    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Android => "android",
            Self::Ios => "ios",
            Self::MacCatalyst => "maccatalyst",
            Self::Windows => "windows",
            Self::Headless => "headless",
        }
    }

    /// Features available on this platform at the given OS version.
    #[must_use]
    pub fn default_features(self, os: OsVersion) -> PlatformFeatures {
        match self {
            Self::Android if os.major >= 5 => PlatformFeatures::all(),
            Self::Android => PlatformFeatures::ANIMATED_TRANSITIONS,
            Self::Ios | Self::MacCatalyst if os.major >= 13 => PlatformFeatures::all(),
            Self::Ios | Self::MacCatalyst => PlatformFeatures::ANIMATED_TRANSITIONS,
            Self::Windows if os.major >= 10 => PlatformFeatures::UNIFIED_NAVIGATION,
            Self::Windows => PlatformFeatures::empty(),
            Self::Headless => PlatformFeatures::all(),
        }
    }
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Operating system version (major.minor).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct OsVersion {
    pub major: u32,
    pub minor: u32,
}

impl OsVersion {
    #[must_use]
    pub const fn new(major: u32, minor: u32) -> Self {
        Self { major, minor }
    }
}

impl fmt::Display for OsVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.major, self.minor)
    }
}

bitflags! {
    /// Optional platform features handlers may require.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct PlatformFeatures: u32 {
        /// The platform navigation controller can be driven by the stack manager.
        const UNIFIED_NAVIGATION = 1 << 0;
        /// Native push/pop transitions can be animated.
        const ANIMATED_TRANSITIONS = 1 << 1;
    }
}

/// Platform resources a handler needs to allocate native peers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlatformContext {
    platform: Platform,
    os_version: OsVersion,
    features: PlatformFeatures,
}

impl PlatformContext {
    /// Context with the platform's default features for `os_version`.
    #[must_use]
    pub fn new(platform: Platform, os_version: OsVersion) -> Self {
        Self {
            platform,
            os_version,
            features: platform.default_features(os_version),
        }
    }

    /// Override the feature set.
    #[must_use]
    pub fn with_features(mut self, features: PlatformFeatures) -> Self {
        self.features = features;
        self
    }

    #[must_use]
    pub fn without(mut self, features: PlatformFeatures) -> Self {
        self.features.remove(features);
        self
    }

    #[must_use]
    pub fn platform(&self) -> Platform {
        self.platform
    }

    #[must_use]
    pub fn os_version(&self) -> OsVersion {
        self.os_version
    }

    #[must_use]
    pub fn features(&self) -> PlatformFeatures {
        self.features
    }

    #[must_use]
    pub fn supports(&self, features: PlatformFeatures) -> bool {
        self.features.contains(features)
    }
}

// ── Errors ─────────────────────────────────────────────────────────────────

/// Failures reported by a native peer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PeerError {
    /// Platform resource missing (window, context, controller).
    Unavailable(&'static str),
    /// The platform refused the operation.
    Rejected {
        operation: &'static str,
        reason: String,
    },
    /// A stack operation does not apply to the current native stack.
    InvalidStack(String),
}

impl fmt::Display for PeerError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Unavailable(what) => write!(f, "platform resource unavailable: {what}"),
            Self::Rejected { operation, reason } => {
                write!(f, "native {operation} rejected: {reason}")
            }
            Self::InvalidStack(msg) => write!(f, "invalid stack operation: {msg}"),
        }
    }
}

impl std::error::Error for PeerError {}

pub type PeerResult<T> = Result<T, PeerError>;

// ── Peer traits ────────────────────────────────────────────────────────────

/// Operations every native view supports.
pub trait PlatformView: fmt::Debug + 'static {
    fn set_opacity(&mut self, opacity: f64) -> PeerResult<()>;

    fn set_visible(&mut self, visible: bool) -> PeerResult<()>;

    /// `None` restores the platform default.
    fn set_background(&mut self, color: Option<Color>) -> PeerResult<()>;

    /// Called once when the peer is detached from its handler.
    fn release(&mut self) {}
}

/// A native progress indicator.
pub trait ProgressPeer: PlatformView {
    /// `progress` is already clamped to `[0, 1]`.
    fn set_progress(&mut self, progress: f64) -> PeerResult<()>;

    fn set_progress_tint(&mut self, color: Option<Color>) -> PeerResult<()>;
}

/// A native single-line text input.
pub trait EntryPeer: PlatformView {
    fn set_text(&mut self, text: &str) -> PeerResult<()>;

    fn set_placeholder(&mut self, placeholder: &str) -> PeerResult<()>;

    fn set_placeholder_color(&mut self, color: Option<Color>) -> PeerResult<()>;

    fn set_max_length(&mut self, max_length: Option<usize>) -> PeerResult<()>;

    /// Request keyboard focus. Returns whether focus was taken.
    fn focus(&mut self) -> PeerResult<bool>;
}

// ── Navigation ─────────────────────────────────────────────────────────────

/// One imperative operation on a native navigation stack.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StackOp {
    Push(PageId),
    Pop,
    /// Pop until `depth` pages remain (`depth == 1` is pop-to-root).
    PopTo { depth: usize },
    /// Insert `page` before the page at `index`.
    Insert { index: usize, page: PageId },
    Remove { index: usize },
    /// Replace the whole stack.
    Replace(Vec<PageId>),
}

impl StackOp {
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::Push(_) => "push",
            Self::Pop => "pop",
            Self::PopTo { .. } => "pop_to",
            Self::Insert { .. } => "insert",
            Self::Remove { .. } => "remove",
            Self::Replace(_) => "replace",
        }
    }

    /// Apply the operation to a stack of page ids.
    ///
    /// Backends use this to keep their bookkeeping consistent; the stack is
    /// left untouched on error.
    pub fn apply_to(&self, stack: &mut Vec<PageId>) -> PeerResult<()> {
        match self {
            Self::Push(page) => {
                if stack.contains(page) {
                    return Err(PeerError::InvalidStack(format!("{page} is already on the stack")));
                }
                stack.push(*page);
            }
            Self::Pop => {
                if stack.len() <= 1 {
                    return Err(PeerError::InvalidStack("cannot pop the root page".into()));
                }
                stack.pop();
            }
            Self::PopTo { depth } => {
                if *depth == 0 || *depth > stack.len() {
                    return Err(PeerError::InvalidStack(format!(
                        "cannot pop to depth {depth} of {}",
                        stack.len()
                    )));
                }
                stack.truncate(*depth);
            }
            Self::Insert { index, page } => {
                if *index >= stack.len() {
                    return Err(PeerError::InvalidStack(format!(
                        "insert index {index} out of range for {}",
                        stack.len()
                    )));
                }
                if stack.contains(page) {
                    return Err(PeerError::InvalidStack(format!("{page} is already on the stack")));
                }
                stack.insert(*index, *page);
            }
            Self::Remove { index } => {
                if *index >= stack.len() || stack.len() <= 1 {
                    return Err(PeerError::InvalidStack(format!(
                        "cannot remove index {index} of {}",
                        stack.len()
                    )));
                }
                stack.remove(*index);
            }
            Self::Replace(pages) => {
                if pages.is_empty() {
                    return Err(PeerError::InvalidStack("replacement stack is empty".into()));
                }
                for (i, page) in pages.iter().enumerate() {
                    if pages[..i].contains(page) {
                        return Err(PeerError::InvalidStack(format!("{page} appears twice")));
                    }
                }
                stack.clone_from(pages);
            }
        }
        Ok(())
    }
}

/// Identifies an animated native transition until it completes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TransitionId(pub u64);

impl fmt::Display for TransitionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "t{}", self.0)
    }
}

/// Result of starting a native stack operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransitionStatus {
    /// The operation finished synchronously.
    Finished,
    /// The operation is animating; completion arrives later as an event
    /// carrying this id.
    Pending(TransitionId),
}

/// A native navigation controller.
///
/// The native stack is mutated when an operation starts; animated operations
/// report [`TransitionStatus::Pending`] and the platform later reports the
/// completion through the owning handler.
pub trait NavigationPeer: PlatformView {
    /// Current native stack, root first.
    fn native_stack(&self) -> &[PageId];

    fn perform(&mut self, op: &StackOp, animated: bool) -> PeerResult<TransitionStatus>;
}
