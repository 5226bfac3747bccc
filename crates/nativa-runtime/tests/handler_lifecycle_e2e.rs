//! End-to-end handler lifecycle against headless peers.
//!
//! create → connect → property changes → commands → disconnect, plus the
//! re-entrant and batched dispatch paths and the navigation handler kind.

use std::cell::RefCell;
use std::rc::Rc;
use std::sync::Arc;

use nativa_backend::{NavigationPeer, OsVersion, Platform, PlatformContext, PlatformFeatures};
use nativa_core::batch::BatchScope;
use nativa_core::property::names;
use nativa_core::{Capability, Element};
use nativa_headless::{
    HeadlessEntry, HeadlessNavigationController, HeadlessProgressBar, headless_context,
};
use nativa_runtime::handlers::{FOCUS, entry_kind, progress_kind};
use nativa_runtime::navigation::{
    NavigationEvent, NavigationRequest, REQUEST_NAVIGATION, StackNavigationHandler,
    stack_navigation_kind,
};
use nativa_runtime::{
    CommandCompletion, CommandOutcome, DispatchPolicy, HandlerError, HandlerKind,
    NavigationPolicy, PropertyMapper, ViewHandler,
};

fn progress_element() -> Element {
    Element::builder("ProgressBar")
        .capability(Capability::PROGRESS)
        .property(names::PROGRESS, 0.25)
        .build()
}

fn progress_handler() -> ViewHandler<HeadlessProgressBar> {
    let kind = Arc::new(progress_kind(|_| Ok(HeadlessProgressBar::default())));
    ViewHandler::new(kind, Some(headless_context()))
}

fn journal(handler: &ViewHandler<HeadlessProgressBar>) -> Vec<&'static str> {
    handler
        .with_peer(|peer| peer.view.journal().calls().to_vec())
        .unwrap_or_default()
}

#[test]
fn connect_applies_every_mapping() {
    let handler = progress_handler();
    let report = handler.mount(progress_element()).unwrap();
    assert!(report.is_clean());
    assert_eq!(report.len(), 5);
    assert_eq!(handler.with_peer(|p| p.progress), Some(0.25));
    assert_eq!(
        journal(&handler),
        ["set_opacity", "set_visible", "set_background", "set_progress", "set_progress_tint"]
    );
}

#[test]
fn property_change_dispatches_single_entry() {
    let handler = progress_handler();
    let element = progress_element();
    handler.mount(element.clone()).unwrap();
    handler.with_peer_mut(|p, _| p.view.journal_mut().clear());

    element.set(names::PROGRESS, 0.75);
    assert_eq!(handler.with_peer(|p| p.progress), Some(0.75));
    assert_eq!(journal(&handler), ["set_progress"]);

    // Unmapped and case-mismatched names are ignored.
    element.set("Progress", 0.1);
    element.set("unmapped", true);
    assert_eq!(journal(&handler), ["set_progress"]);
}

#[test]
fn lifecycle_errors() {
    let handler = progress_handler();
    let label = Element::builder("Label").build();
    assert!(matches!(
        handler.mount(label),
        Err(HandlerError::MissingCapability { capability, .. }) if capability == Capability::PROGRESS
    ));

    let peer = handler.create_platform_view().unwrap();
    assert!(matches!(
        handler.create_platform_view(),
        Err(HandlerError::PeerAlreadyCreated { .. })
    ));
    handler.connect(progress_element(), peer).unwrap();
    assert!(matches!(
        handler.connect(progress_element(), HeadlessProgressBar::default()),
        Err(HandlerError::AlreadyConnected { .. })
    ));

    let orphan = ViewHandler::new(Arc::clone(handler.kind()), None);
    assert!(matches!(
        orphan.create_platform_view(),
        Err(HandlerError::MissingPlatformContext { .. })
    ));
}

#[test]
fn disconnect_stops_dispatch_and_releases_peer() {
    let handler = progress_handler();
    let element = progress_element();
    handler.mount(element.clone()).unwrap();

    let (returned, peer) = handler.disconnect().unwrap();
    assert!(returned.same(&element));
    assert!(peer.view.released);
    assert!(handler.disconnect().is_none());

    element.set(names::PROGRESS, 0.9);
    assert_eq!(peer.progress, 0.25);
    handler.dispatch_property_changed(names::PROGRESS);
    assert!(!handler.is_connected());

    // Rebinding goes through connect with the returned peer.
    handler.connect(element, peer).unwrap();
    assert_eq!(handler.with_peer(|p| p.progress), Some(0.9));
}

#[test]
fn dropped_handler_ignores_notifications() {
    let element = progress_element();
    {
        let handler = progress_handler();
        handler.mount(element.clone()).unwrap();
    }
    element.set(names::PROGRESS, 0.5);
    assert_eq!(element.subscriber_count(), 0);
}

#[test]
fn failing_entry_is_isolated() {
    let kind = Arc::new(progress_kind(|_| {
        Ok(HeadlessProgressBar::default().rejecting("set_background"))
    }));
    let handler = ViewHandler::new(kind, Some(headless_context()));
    let report = handler.mount(progress_element()).unwrap();
    assert!(report.failed("background"));
    assert_eq!(report.applied.len(), 4);
    assert_eq!(handler.with_peer(|p| p.progress), Some(0.25));
}

#[test]
fn batch_dispatches_each_property_once() {
    let handler = progress_handler();
    let element = progress_element();
    handler.mount(element.clone()).unwrap();
    handler.with_peer_mut(|p, _| p.view.journal_mut().clear());
    {
        let _batch = BatchScope::new();
        element.set(names::PROGRESS, 0.3);
        element.set(names::OPACITY, 0.5);
        element.set(names::PROGRESS, 0.6);
        assert!(journal(&handler).is_empty());
    }
    assert_eq!(journal(&handler), ["set_progress", "set_opacity"]);
    assert_eq!(handler.with_peer(|p| p.progress), Some(0.6));
}

#[test]
fn reentrant_changes_are_drained_after_update() {
    // Applying `progress` mirrors it into `opacity` on the element.
    let mapper = PropertyMapper::new()
        .with(names::PROGRESS, |peer: &mut HeadlessProgressBar, el: &Element| {
            let value = el.get(names::PROGRESS).and_then(|v| v.as_f64()).unwrap_or(0.0);
            peer.progress = value;
            el.set(names::OPACITY, value);
            Ok(())
        })
        .with(names::OPACITY, |peer: &mut HeadlessProgressBar, el: &Element| {
            peer.view.opacity = el.get(names::OPACITY).and_then(|v| v.as_f64()).unwrap_or(1.0);
            Ok(())
        });
    let kind = Arc::new(
        HandlerKind::new("mirror", Capability::PROGRESS, |_| Ok(HeadlessProgressBar::default()))
            .with_mapper(mapper),
    );
    let handler = ViewHandler::new(kind, Some(headless_context()));
    let element = progress_element();
    handler.mount(element.clone()).unwrap();

    element.set(names::PROGRESS, 0.4);
    assert_eq!(handler.with_peer(|p| (p.progress, p.view.opacity)), Some((0.4, 0.4)));
}

#[test]
fn reentrant_loop_is_bounded() {
    // Every apply bumps a counter property, which dispatches again.
    let mapper = PropertyMapper::new().with("tick", |_: &mut HeadlessProgressBar, el: &Element| {
        let n = el.get("tick").and_then(|v| v.as_int()).unwrap_or(0);
        el.set("tick", n + 1);
        Ok(())
    });
    let kind = Arc::new(
        HandlerKind::new("ticker", Capability::VIEW, |_| Ok(HeadlessProgressBar::default()))
            .with_mapper(mapper),
    );
    let handler = ViewHandler::new(kind, Some(headless_context())).with_policy(DispatchPolicy {
        max_reentrant_passes: 3,
        ..DispatchPolicy::default()
    });
    let element = Element::builder("View").property("tick", 0_i64).build();
    handler.mount(element.clone()).unwrap();

    // apply_all once, then three re-entrant passes; the fourth change is dropped.
    assert_eq!(element.get("tick").and_then(|v| v.as_int()), Some(4));
}

#[test]
fn entry_focus_command() {
    let kind = Arc::new(entry_kind(|_| Ok(HeadlessEntry::default())));
    let handler = ViewHandler::new(kind, Some(headless_context()));
    let entry = Element::builder("Entry").capability(Capability::ENTRY).build();

    let (token, rx) = CommandCompletion::channel();
    assert!(!handler.invoke(FOCUS, None, Some(token)));
    assert_eq!(rx.outcome(), Some(CommandOutcome::NotHandled));

    handler.mount(entry).unwrap();
    let (token, rx) = CommandCompletion::channel();
    assert!(handler.invoke(FOCUS, None, Some(token)));
    assert_eq!(rx.outcome(), Some(CommandOutcome::Completed));
    assert_eq!(handler.with_peer(|p| p.focused), Some(true));
}

#[test]
fn navigation_kind_requires_unified_navigation() {
    let kind = Arc::new(stack_navigation_kind(NavigationPolicy::default(), |_| {
        Ok(HeadlessNavigationController::new())
    }));
    let old_ios = PlatformContext::new(Platform::Ios, OsVersion::new(12, 0));
    let handler = StackNavigationHandler::new(Arc::clone(&kind), Some(old_ios));
    let element = Element::builder("NavigationPage")
        .capability(Capability::STACK_NAVIGATION)
        .build();
    assert!(matches!(
        handler.mount(element),
        Err(HandlerError::NotImplemented { kind: "stack_navigation", .. })
    ));
}

#[test]
fn navigation_handler_forwards_events() {
    let kind = Arc::new(stack_navigation_kind(NavigationPolicy::default(), |_| {
        Ok(HeadlessNavigationController::new().deferring_transitions())
    }));
    let handler = StackNavigationHandler::new(kind, Some(headless_context()));
    let events = Rc::new(RefCell::new(Vec::new()));
    let sink = Rc::clone(&events);
    handler.set_listener(move |event| sink.borrow_mut().push(event));

    let element = Element::builder("NavigationPage")
        .capability(Capability::STACK_NAVIGATION)
        .build();
    handler.mount(element).unwrap();

    let root = Element::builder("Page").build();
    let detail = Element::builder("Page").build();

    // Through the command path.
    let request = NavigationRequest::new(vec![root.clone()], false);
    let (token, rx) = CommandCompletion::channel();
    assert!(handler.invoke(REQUEST_NAVIGATION, Some(&request), Some(token)));
    assert_eq!(rx.outcome(), Some(CommandOutcome::Completed));

    // Missing argument fails the command.
    let (token, rx) = CommandCompletion::channel();
    handler.invoke(REQUEST_NAVIGATION, None, Some(token));
    assert!(matches!(rx.outcome(), Some(CommandOutcome::Failed(msg)) if msg.contains("NavigationRequest")));

    // Through the direct path, with a pending transition.
    let request = NavigationRequest::new(vec![root.clone(), detail.clone()], true);
    let nativa_runtime::NavigateOutcome::Pending(id) = handler.request_navigation(request).unwrap()
    else {
        panic!("expected pending push");
    };
    handler.with_controller_mut(|nav| nav.finish_transition());
    handler.transition_completed(id).unwrap();

    assert_eq!(handler.current_stack(), vec![root.clone(), detail.clone()]);
    assert_eq!(
        handler.with_controller_mut(|nav| nav.native_stack().to_vec()),
        Some(vec![root.id(), detail.id()])
    );
    let events = events.borrow();
    let completions = events
        .iter()
        .filter(|e| matches!(e, NavigationEvent::Completed(_)))
        .count();
    assert_eq!(completions, 2);
    assert!(events.contains(&NavigationEvent::Disappearing(root.clone())));
    assert!(events.contains(&NavigationEvent::Appearing(detail)));
}

#[test]
fn headless_context_matches_platform_table() {
    let ctx = headless_context();
    assert!(ctx.supports(PlatformFeatures::UNIFIED_NAVIGATION | PlatformFeatures::ANIMATED_TRANSITIONS));
}

#[test]
fn panicking_peer_closure_does_not_stall_dispatch() {
    let handler = progress_handler();
    let element = progress_element();
    handler.mount(element.clone()).unwrap();

    let caught = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
        handler.with_peer_mut(|_, el| {
            el.set(names::PROGRESS, 0.5);
            if el.get(names::PROGRESS).is_some() {
                panic!("host closure failed");
            }
        })
    }));
    assert!(caught.is_err());
    // The change raised inside the panicking closure is discarded.
    assert_eq!(handler.with_peer(|p| p.progress), Some(0.25));

    element.set(names::PROGRESS, 0.9);
    assert_eq!(handler.with_peer(|p| p.progress), Some(0.9));
}

#[test]
fn listener_that_navigates_again_sees_every_event() {
    let kind = Arc::new(stack_navigation_kind(NavigationPolicy::default(), |_| {
        Ok(HeadlessNavigationController::new())
    }));
    let handler = Rc::new(StackNavigationHandler::new(kind, Some(headless_context())));
    let root = Element::builder("Page").build();
    let detail = Element::builder("Page").build();

    let seen = Rc::new(RefCell::new(Vec::new()));
    let sink = Rc::clone(&seen);
    let weak = Rc::downgrade(&handler);
    let follow_up = vec![root.clone(), detail.clone()];
    let mut navigated = false;
    handler.set_listener(move |event| {
        let completed = matches!(event, NavigationEvent::Completed(_));
        sink.borrow_mut().push(event);
        if completed && !navigated {
            navigated = true;
            if let Some(handler) = weak.upgrade() {
                handler
                    .request_navigation(NavigationRequest::new(follow_up.clone(), false))
                    .unwrap();
            }
        }
    });

    let page = Element::builder("NavigationPage")
        .capability(Capability::STACK_NAVIGATION)
        .build();
    handler.mount(page).unwrap();
    handler
        .request_navigation(NavigationRequest::new(vec![root.clone()], false))
        .unwrap();

    assert_eq!(handler.current_stack(), vec![root.clone(), detail.clone()]);
    let seen = seen.borrow();
    let completed: Vec<usize> = seen
        .iter()
        .filter_map(|e| match e {
            NavigationEvent::Completed(c) => Some(c.resulting_stack.len()),
            _ => None,
        })
        .collect();
    assert_eq!(completed, [1, 2]);
    assert!(seen.contains(&NavigationEvent::Disappearing(root)));
    assert!(seen.contains(&NavigationEvent::Appearing(detail)));
}
