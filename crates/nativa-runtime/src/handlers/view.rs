#![forbid(unsafe_code)]

//! Base mapper shared by every handler kind.

use nativa_backend::{PlatformContext, PlatformView};
use nativa_core::property::names;
use nativa_core::{Capability, Element};

use crate::error::HandlerError;
use crate::handler::HandlerKind;
use crate::mapper::PropertyMapper;

/// `opacity`, `is_visible` and `background`.
///
/// Unset properties restore the platform default (opaque, visible, no
/// background).
#[must_use]
pub fn view_mapper<P: PlatformView>() -> PropertyMapper<P> {
    PropertyMapper::new()
        .with(names::OPACITY, |peer: &mut P, element: &Element| {
            let opacity = element
                .get(names::OPACITY)
                .and_then(|v| v.as_f64())
                .unwrap_or(1.0);
            let opacity = if opacity.is_nan() { 1.0 } else { opacity.clamp(0.0, 1.0) };
            peer.set_opacity(opacity)
        })
        .with(names::IS_VISIBLE, |peer: &mut P, element: &Element| {
            let visible = element
                .get(names::IS_VISIBLE)
                .and_then(|v| v.as_bool())
                .unwrap_or(true);
            peer.set_visible(visible)
        })
        .with(names::BACKGROUND, |peer: &mut P, element: &Element| {
            peer.set_background(element.get(names::BACKGROUND).and_then(|v| v.as_color()))
        })
}

/// A plain view kind.
pub fn view_kind<P: PlatformView>(
    factory: impl Fn(&PlatformContext) -> Result<P, HandlerError>
    + Send
    + Sync
    + 'static,
) -> HandlerKind<P> {
    HandlerKind::new("view", Capability::VIEW, factory).with_mapper(view_mapper())
}
