#![forbid(unsafe_code)]

//! Text entry handler kind: the view mapper plus text properties and a
//! `focus` command.

use std::any::Any;

use nativa_backend::{EntryPeer, PlatformContext};
use nativa_core::property::names;
use nativa_core::{Capability, Element, EntryView};

use crate::command::{CommandCompletion, CommandMapper, CommandOutcome};
use crate::error::HandlerError;
use crate::handler::HandlerKind;
use crate::handlers::view::view_mapper;
use crate::mapper::PropertyMapper;

/// Command requesting keyboard focus.
pub const FOCUS: &str = "focus";

#[must_use]
pub fn entry_mapper<P: EntryPeer>() -> PropertyMapper<P> {
    let own = PropertyMapper::new()
        // Max length first so a long text is truncated on initial apply.
        .with(names::MAX_LENGTH, |peer: &mut P, element: &Element| {
            peer.set_max_length(EntryView::of(element).and_then(|v| v.max_length()))
        })
        .with(names::TEXT, |peer: &mut P, element: &Element| {
            let text = EntryView::of(element).map(|v| v.text()).unwrap_or_default();
            peer.set_text(&text)
        })
        .with(names::PLACEHOLDER, |peer: &mut P, element: &Element| {
            let placeholder = EntryView::of(element)
                .map(|v| v.placeholder())
                .unwrap_or_default();
            peer.set_placeholder(&placeholder)
        })
        .with(names::PLACEHOLDER_COLOR, |peer: &mut P, element: &Element| {
            peer.set_placeholder_color(EntryView::of(element).and_then(|v| v.placeholder_color()))
        });
    PropertyMapper::merge(&view_mapper(), &own)
}

fn focus<P: EntryPeer>(
    peer: &mut P,
    _element: &Element,
    _arg: Option<&dyn Any>,
    completion: Option<CommandCompletion>,
) {
    let outcome = match peer.focus() {
        Ok(true) => CommandOutcome::Completed,
        Ok(false) => CommandOutcome::NotHandled,
        Err(e) => CommandOutcome::Failed(e.to_string()),
    };
    if let Some(token) = completion {
        token.resolve(outcome);
    }
}

#[must_use]
pub fn entry_commands<P: EntryPeer>() -> CommandMapper<P> {
    CommandMapper::new().with(FOCUS, focus::<P>)
}

/// Requires [`Capability::ENTRY`].
pub fn entry_kind<P: EntryPeer>(
    factory: impl Fn(&PlatformContext) -> Result<P, HandlerError> + Send + Sync + 'static,
) -> HandlerKind<P> {
    HandlerKind::new("entry", Capability::ENTRY, factory)
        .with_mapper(entry_mapper())
        .with_commands(entry_commands())
}

#[cfg(test)]
mod tests {
    use super::*;
    use nativa_headless::HeadlessEntry;

    #[test]
    fn long_text_is_truncated_on_first_apply() {
        let entry = Element::builder("Entry")
            .capability(Capability::ENTRY)
            .property(names::TEXT, "abcdefgh")
            .property(names::MAX_LENGTH, 3_i64)
            .property(names::PLACEHOLDER, "name")
            .build();
        let mut peer = HeadlessEntry::default();
        assert!(entry_mapper().apply_all(&mut peer, &entry).is_clean());
        assert_eq!(peer.text, "abc");
        assert_eq!(peer.placeholder, "name");
    }

    #[test]
    fn focus_reports_outcome() {
        let entry = Element::builder("Entry").capability(Capability::ENTRY).build();
        let commands = entry_commands::<HeadlessEntry>();
        let mut peer = HeadlessEntry::default();

        let (token, rx) = CommandCompletion::channel();
        commands.invoke(&mut peer, &entry, FOCUS, None, Some(token));
        assert_eq!(rx.outcome(), Some(CommandOutcome::Completed));

        let mut hidden = HeadlessEntry::default();
        hidden.view.visible = false;
        let (token, rx) = CommandCompletion::channel();
        commands.invoke(&mut hidden, &entry, FOCUS, None, Some(token));
        assert_eq!(rx.outcome(), Some(CommandOutcome::NotHandled));
    }
}
