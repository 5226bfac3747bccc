#![forbid(unsafe_code)]

//! Process-wide font alias resolution.
//!
//! Font registration usually happens during app startup, possibly on a
//! different thread than the first font lookup. The resolver therefore lives
//! in a single slot read and replaced atomically: readers never lock, and a
//! resolver published by any thread is visible to every subsequent
//! [`resolve`].
//!
//! | Operation | Cost |
//! |-----------|------|
//! | `resolve` | wait-free load + resolver call |
//! | `set_resolver` | one `Arc` allocation + atomic swap |
//!
//! # Failure Modes
//!
//! - **No resolver**: `resolve` returns `None`.
//! - **Resolver panics**: the panic is caught, logged at `warn`, and the
//!   lookup returns `None`. Font resolution never interrupts rendering.
//!
//! # Example
//!
//! ```
//! use nativa_core::font::FontAliasSlot;
//!
//! let slot = FontAliasSlot::new();
//! assert_eq!(slot.resolve("Body"), None);
//!
//! slot.set_resolver(|name| (name == "Body").then(|| "Inter-Regular".to_owned()));
//! assert_eq!(slot.resolve("Body").as_deref(), Some("Inter-Regular"));
//! ```

use std::fmt;
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::Arc;

use arc_swap::ArcSwapOption;
use tracing::{trace, warn};

use crate::logging::panic_message;

/// Maps a font alias to a platform-specific font identifier.
pub type ResolverFn = dyn Fn(&str) -> Option<String> + Send + Sync;

// `ArcSwapOption` needs a sized pointee.
struct Resolver(Box<ResolverFn>);

/// A slot holding at most one font alias resolver.
pub struct FontAliasSlot {
    resolver: ArcSwapOption<Resolver>,
}

impl FontAliasSlot {
    /// Create an empty slot.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            resolver: ArcSwapOption::const_empty(),
        }
    }

    /// Publish a resolver, replacing any previous one.
    pub fn set_resolver(&self, resolver: impl Fn(&str) -> Option<String> + Send + Sync + 'static) {
        self.resolver
            .store(Some(Arc::new(Resolver(Box::new(resolver)))));
    }

    /// Remove the resolver. Returns whether one was installed.
    pub fn clear_resolver(&self) -> bool {
        self.resolver.swap(None).is_some()
    }

    #[must_use]
    pub fn has_resolver(&self) -> bool {
        self.resolver.load().is_some()
    }

    /// Resolve a font alias. Never panics.
    #[must_use]
    pub fn resolve(&self, name: &str) -> Option<String> {
        let resolver = self.resolver.load_full()?;
        match catch_unwind(AssertUnwindSafe(|| (resolver.0)(name))) {
            Ok(resolved) => {
                trace!(alias = name, resolved = ?resolved, "font alias resolved");
                resolved
            }
            Err(payload) => {
                warn!(
                    alias = name,
                    reason = panic_message(payload.as_ref()),
                    "font alias resolver failed; treating as unresolved"
                );
                None
            }
        }
    }
}

impl Default for FontAliasSlot {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for FontAliasSlot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FontAliasSlot")
            .field("has_resolver", &self.has_resolver())
            .finish()
    }
}

static GLOBAL: FontAliasSlot = FontAliasSlot::new();

/// Publish the process-wide font alias resolver.
pub fn set_resolver(resolver: impl Fn(&str) -> Option<String> + Send + Sync + 'static) {
    GLOBAL.set_resolver(resolver);
}

/// Remove the process-wide resolver.
pub fn clear_resolver() -> bool {
    GLOBAL.clear_resolver()
}

/// Resolve a font alias through the process-wide resolver.
#[must_use]
pub fn resolve(name: &str) -> Option<String> {
    GLOBAL.resolve(name)
}

/// The process-wide slot.
#[must_use]
pub fn global() -> &'static FontAliasSlot {
    &GLOBAL
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;
    use std::thread;

    #[test]
    fn empty_slot_resolves_nothing() {
        let slot = FontAliasSlot::new();
        assert!(!slot.has_resolver());
        assert_eq!(slot.resolve("Foo"), None);
    }

    #[test]
    fn resolver_result_is_returned() {
        let slot = FontAliasSlot::new();
        slot.set_resolver(|name| Some(format!("{name}-Platform")));
        assert_eq!(slot.resolve("Foo").as_deref(), Some("Foo-Platform"));
    }

    #[test]
    fn replacing_resolver_takes_effect() {
        let slot = FontAliasSlot::new();
        slot.set_resolver(|_| Some("first".into()));
        slot.set_resolver(|_| Some("second".into()));
        assert_eq!(slot.resolve("x").as_deref(), Some("second"));
    }

    #[test]
    fn panicking_resolver_is_unresolved() {
        let slot = FontAliasSlot::new();
        slot.set_resolver(|name| {
            if name == "Broken" {
                panic!("font table missing");
            }
            Some(name.to_owned())
        });
        assert_eq!(slot.resolve("Broken"), None);
        // The slot keeps working after a failure.
        assert_eq!(slot.resolve("Ok").as_deref(), Some("Ok"));
    }

    #[test]
    fn clear_removes_resolver() {
        let slot = FontAliasSlot::new();
        assert!(!slot.clear_resolver());
        slot.set_resolver(|_| Some("x".into()));
        assert!(slot.clear_resolver());
        assert_eq!(slot.resolve("x"), None);
    }

    #[test]
    fn resolver_published_from_another_thread_is_visible() {
        let slot = Arc::new(FontAliasSlot::new());
        let writer = Arc::clone(&slot);
        thread::spawn(move || writer.set_resolver(|_| Some("Roboto".into())))
            .join()
            .unwrap();
        assert_eq!(slot.resolve("Body").as_deref(), Some("Roboto"));
    }

    #[test]
    #[serial]
    fn global_slot_lifecycle() {
        clear_resolver();
        assert_eq!(resolve("Foo"), None);
        set_resolver(|name| (name == "Foo").then(|| "Foo-Bold".to_owned()));
        assert_eq!(resolve("Foo").as_deref(), Some("Foo-Bold"));
        assert_eq!(resolve("Bar"), None);
        assert!(global().has_resolver());
        assert!(clear_resolver());
    }
}
