#![forbid(unsafe_code)]

//! Progress bar handler kind: the view mapper plus `progress` and
//! `progress_color`.

use nativa_backend::{PlatformContext, ProgressPeer};
use nativa_core::property::names;
use nativa_core::{Capability, Element, ProgressView};

use crate::error::HandlerError;
use crate::handler::HandlerKind;
use crate::handlers::view::view_mapper;
use crate::mapper::PropertyMapper;

#[must_use]
pub fn progress_mapper<P: ProgressPeer>() -> PropertyMapper<P> {
    let own = PropertyMapper::new()
        .with(names::PROGRESS, |peer: &mut P, element: &Element| {
            match ProgressView::of(element) {
                Some(view) => peer.set_progress(view.progress()),
                None => Ok(()),
            }
        })
        .with(names::PROGRESS_COLOR, |peer: &mut P, element: &Element| {
            let tint = ProgressView::of(element).and_then(|view| view.progress_color());
            peer.set_progress_tint(tint)
        });
    PropertyMapper::merge(&view_mapper(), &own)
}

/// Requires [`Capability::PROGRESS`].
pub fn progress_kind<P: ProgressPeer>(
    factory: impl Fn(&PlatformContext) -> Result<P, HandlerError> + Send + Sync + 'static,
) -> HandlerKind<P> {
    HandlerKind::new("progress", Capability::PROGRESS, factory).with_mapper(progress_mapper())
}
