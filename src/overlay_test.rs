use std::cell::RefCell;
use std::rc::{Rc, Weak};

use super::*;
use crate::config::{ComponentRef, OverlayCallback};
use crate::geometry::{PositionSet, PositionValue, Rect};
use crate::headless::HeadlessDom;
use crate::render::TagFactory;

type Controller = Rc<RefCell<OverlayController<HeadlessDom, TagFactory>>>;

struct Fixture {
    dom: HeadlessDom,
    mount: NodeId,
    wrapper: NodeId,
    host: NodeId,
    inner: NodeId,
    controller: Controller,
}

/// `section > wrapper > host > inner`, host box `{100, 50, 300, 200}`.
fn fixture_with(factory: TagFactory, options: OverlayOptions) -> Fixture {
    let dom = HeadlessDom::new();
    let mount = dom.create_root("section");
    let wrapper = dom.create_element(mount, "div").unwrap();
    let host = dom.create_element(wrapper, "div").unwrap();
    let inner = dom.create_element(host, "button").unwrap();
    dom.set_offset_box(host, Rect::new(100.0, 50.0, 300.0, 200.0));
    let controller = OverlayController::attach(&dom, wrapper, factory, options).unwrap();
    Fixture { dom, mount, wrapper, host, inner, controller }
}

fn fixture() -> Fixture {
    fixture_with(TagFactory::new(), OverlayOptions::default())
}

impl Fixture {
    fn send(&self, target: NodeId, detail: OverlayEventDetail) -> DomEvent {
        let mut event = DomEvent::overlay(detail);
        self.dom.dispatch(target, &mut event);
        event
    }

    fn ids(&self) -> Vec<String> {
        self.controller.borrow().registry().ids().into_iter().map(str::to_string).collect()
    }

    fn node(&self, id: &str) -> NodeId {
        self.controller.borrow().overlay_node(id).unwrap()
    }

    fn style(&self, node: NodeId, property: &str) -> Option<String> {
        self.dom.inline_style(node, property)
    }

    fn geometry(&self, node: NodeId) -> [Option<String>; 4] {
        ["top", "left", "width", "height"].map(|p| self.style(node, p))
    }
}

fn corner_position() -> PositionSet {
    PositionSet {
        bottom: Some("10px".into()),
        right: Some("20%".into()),
        width: Some("50%".into()),
        height: Some("50px".into()),
        ..PositionSet::default()
    }
}

fn text(value: &str) -> Option<String> {
    Some(value.to_string())
}

// =============================================================
// CREATE
// =============================================================

#[test]
fn create_positions_overlay_against_host() {
    let f = fixture();
    let event = f.send(f.inner, OverlayEventDetail::create("app-dialog").with_position(corner_position()));

    assert!(event.default_prevented());
    assert!(event.propagation_stopped());

    let ids = f.ids();
    assert_eq!(ids.len(), 1);
    let node = f.node(&ids[0]);
    assert_eq!(f.dom.parent(node), Some(f.mount));
    assert_eq!(f.geometry(node), [text("240px"), text("140px"), text("150px"), text("50px")]);
    assert_eq!(f.style(node, "position"), text("absolute"));
    assert_eq!(f.style(node, "z-index"), text("2"));
    assert_eq!(f.style(node, "background-color"), text("rgba(0,0,0,0.75)"));
}

#[test]
fn create_assigns_generated_id() {
    let f = fixture();
    f.send(f.inner, OverlayEventDetail::create("app-dialog"));
    f.send(f.inner, OverlayEventDetail::create("app-dialog"));
    let ids = f.ids();
    assert_eq!(ids.len(), 2);
    assert_ne!(ids[0], ids[1]);
    for id in &ids {
        assert_eq!(id.len(), 8);
        assert!(id.bytes().all(|b| b.is_ascii_digit() || b.is_ascii_lowercase()));
    }
}

#[test]
fn create_keeps_provided_id_and_rejects_duplicate() {
    let f = fixture();
    f.send(f.inner, OverlayEventDetail::create("app-dialog").with_id("main"));
    f.send(f.inner, OverlayEventDetail::create("app-toast").with_id("main"));
    assert_eq!(f.ids(), vec!["main".to_string()]);
    assert_eq!(f.dom.children(f.mount).len(), 2);
}

#[test]
fn create_without_position_covers_host() {
    let f = fixture();
    f.send(f.inner, OverlayEventDetail::create("app-dialog").with_id("x"));
    assert_eq!(f.geometry(f.node("x")), [text("100px"), text("50px"), text("300px"), text("200px")]);
}

#[test]
fn create_with_classes_skips_backdrop() {
    let f = fixture();
    f.send(f.inner, OverlayEventDetail::create("app-dialog").with_id("x").with_classes(["dim", "card"]));
    let node = f.node("x");
    assert_eq!(f.style(node, "background-color"), None);
    assert_eq!(f.dom.classes(node), vec!["dim".to_string(), "card".to_string()]);
}

#[test]
fn create_without_component_is_rejected() {
    let f = fixture();
    f.send(f.inner, OverlayEventDetail::action("create"));
    assert!(f.ids().is_empty());
}

#[test]
fn create_with_unknown_component_leaves_no_trace() {
    let f = fixture_with(TagFactory::with_components(["app-toast"]), OverlayOptions::default());
    f.send(f.inner, OverlayEventDetail::create("app-dialog"));
    assert!(f.ids().is_empty());
    assert_eq!(f.dom.children(f.mount), vec![f.wrapper]);
}

#[test]
fn z_index_follows_host_or_config() {
    let f = fixture();
    f.dom.set_style(f.host, "z-index", "5");
    f.send(f.inner, OverlayEventDetail::create("a").with_id("auto"));
    f.send(f.inner, OverlayEventDetail::create("b").with_id("fixed").with_z_index(40));
    assert_eq!(f.style(f.node("auto"), "z-index"), text("6"));
    assert_eq!(f.style(f.node("fixed"), "z-index"), text("40"));
}

#[test]
fn z_index_saturates_at_host_maximum() {
    let f = fixture();
    f.dom.set_style(f.host, "z-index", &i64::MAX.to_string());
    f.send(f.inner, OverlayEventDetail::create("a").with_id("top"));
    assert_eq!(f.style(f.node("top"), "z-index"), Some(i64::MAX.to_string()));
}

#[test]
fn window_overlay_writes_styles_verbatim() {
    let f = fixture();
    let position = PositionSet {
        top: Some("10vh".into()),
        bottom: Some("5px".into()),
        left: Some(PositionValue::Number(20.0)),
        width: Some("50vw".into()),
        height: Some(PositionValue::Number(300.0)),
        ..PositionSet::default()
    };
    f.send(f.inner, OverlayEventDetail::create("app-modal").with_id("w").anchored_to_window().with_position(position));

    let node = f.node("w");
    assert_eq!(f.style(node, "position"), text("fixed"));
    assert_eq!(f.geometry(node), [text("10vh"), text("20px"), text("50vw"), text("300px")]);
    assert_eq!(f.style(node, "bottom"), None);
}

// =============================================================
// UPDATE
// =============================================================

#[test]
fn update_with_same_position_yields_same_box() {
    let f = fixture();
    f.send(f.inner, OverlayEventDetail::create("app-dialog").with_id("x").with_position(corner_position()));
    let node = f.node("x");
    let before = f.geometry(node);

    f.send(f.inner, OverlayEventDetail::update("x").with_position(corner_position()));
    assert_eq!(f.node("x"), node);
    assert_eq!(f.geometry(node), before);
}

#[test]
fn update_keeps_handle_and_component_and_restyles() {
    let f = fixture();
    f.send(f.inner, OverlayEventDetail::create("app-dialog").with_id("x"));
    let node = f.node("x");

    f.dom.set_offset_box(f.host, Rect::new(0.0, 0.0, 100.0, 100.0));
    let position = PositionSet { top: Some("center".into()), height: Some("20px".into()), ..PositionSet::default() };
    f.send(f.inner, OverlayEventDetail::update("x").with_position(position).with_classes(["lit"]));

    let controller = f.controller.borrow();
    let record = controller.registry().get("x").unwrap();
    assert_eq!(record.config.component, Some(ComponentRef::new("app-dialog")));
    assert_eq!(record.handle.root(), node);
    drop(controller);

    assert_eq!(f.style(node, "top"), text("40px"));
    assert_eq!(f.style(node, "background-color"), None);
    assert_eq!(f.dom.classes(node), vec!["lit".to_string()]);
}

#[test]
fn update_of_unknown_or_missing_id_is_noop() {
    let f = fixture();
    f.send(f.inner, OverlayEventDetail::create("app-dialog").with_id("x"));
    let before = f.geometry(f.node("x"));
    let shifted = PositionSet { top: Some("1px".into()), ..PositionSet::default() };

    f.send(f.inner, OverlayEventDetail::update("ghost").with_position(shifted.clone()));
    f.send(f.inner, OverlayEventDetail::action("UPDATE").with_position(shifted));
    assert_eq!(f.ids(), vec!["x".to_string()]);
    assert_eq!(f.geometry(f.node("x")), before);
}

// =============================================================
// DELETE
// =============================================================

#[test]
fn delete_destroys_subtree_and_listener() {
    let f = fixture();
    f.send(f.inner, OverlayEventDetail::create("app-dialog").with_id("x"));
    let node = f.node("x");
    assert_eq!(f.dom.listener_count(EventTarget::Node(node), OVERLAY_EVENT), 1);

    f.send(f.inner, OverlayEventDetail::delete("x"));
    assert!(f.ids().is_empty());
    assert!(!f.dom.contains(node));
    assert_eq!(f.dom.listener_count(EventTarget::Node(node), OVERLAY_EVENT), 0);
}

#[test]
fn delete_of_unknown_id_is_noop() {
    let f = fixture();
    f.send(f.inner, OverlayEventDetail::create("app-dialog").with_id("x"));
    f.send(f.inner, OverlayEventDetail::delete("ghost"));
    assert_eq!(f.ids(), vec!["x".to_string()]);
}

#[test]
fn events_from_inside_overlay_are_handled_once() {
    let f = fixture();
    f.send(f.inner, OverlayEventDetail::create("app-dialog").with_id("x"));
    let content = f.controller.borrow().registry().get("x").unwrap().handle.content();

    let event = f.send(content, OverlayEventDetail::create("app-toast").with_id("nested"));
    assert!(event.propagation_stopped());
    assert_eq!(f.ids(), vec!["x".to_string(), "nested".to_string()]);

    f.send(content, OverlayEventDetail::delete("x"));
    assert_eq!(f.ids(), vec!["nested".to_string()]);
}

// =============================================================
// Filtering and propagation
// =============================================================

#[test]
fn event_without_action_is_ignored_but_prevented() {
    let f = fixture();
    let mut detail = OverlayEventDetail::create("app-dialog");
    detail.action = None;
    let event = f.send(f.inner, detail);
    assert!(event.default_prevented());
    assert!(!event.propagation_stopped());
    assert!(f.ids().is_empty());
}

#[test]
fn subject_filter_matches_pattern() {
    let f = fixture_with(TagFactory::new(), OverlayOptions::default().with_subject("^dialog"));

    let accepted = f.send(f.inner, OverlayEventDetail::create("a").with_subject("dialog-main"));
    let other = f.send(f.inner, OverlayEventDetail::create("b").with_subject("toast"));
    let missing = f.send(f.inner, OverlayEventDetail::create("c"));

    assert_eq!(f.ids().len(), 1);
    assert!(accepted.propagation_stopped());
    assert!(!other.propagation_stopped());
    assert!(!missing.propagation_stopped());
}

#[test]
fn invalid_subject_pattern_fails_attach() {
    let dom = HeadlessDom::new();
    let wrapper = dom.create_root("div");
    let result = OverlayController::attach(&dom, wrapper, TagFactory::new(), OverlayOptions::default().with_subject("("));
    assert!(matches!(result, Err(OverlayError::InvalidSubject(_))));
    assert_eq!(dom.total_listeners(), 0);
}

/// `mount > outer wrapper > outer host > inner wrapper > inner host > leaf`.
fn stacked() -> (HeadlessDom, NodeId, Controller, Controller) {
    let dom = HeadlessDom::new();
    let mount = dom.create_root("section");
    let outer_wrapper = dom.create_element(mount, "div").unwrap();
    let outer_host = dom.create_element(outer_wrapper, "div").unwrap();
    let inner_wrapper = dom.create_element(outer_host, "div").unwrap();
    let inner_host = dom.create_element(inner_wrapper, "div").unwrap();
    let leaf = dom.create_element(inner_host, "span").unwrap();
    let outer = OverlayController::attach(&dom, outer_wrapper, TagFactory::new(), OverlayOptions::default()).unwrap();
    let inner = OverlayController::attach(&dom, inner_wrapper, TagFactory::new(), OverlayOptions::default()).unwrap();
    (dom, leaf, outer, inner)
}

#[test]
fn multilayer_event_reaches_stacked_hosts() {
    let (dom, leaf, outer, inner) = stacked();
    let mut event = DomEvent::overlay(OverlayEventDetail::create("app-dim").multilayer());
    dom.dispatch(leaf, &mut event);
    assert!(!event.propagation_stopped());
    assert_eq!(inner.borrow().registry().len(), 1);
    assert_eq!(outer.borrow().registry().len(), 1);
}

#[test]
fn single_layer_event_stops_at_nearest_host() {
    let (dom, leaf, outer, inner) = stacked();
    let mut event = DomEvent::overlay(OverlayEventDetail::create("app-dim"));
    dom.dispatch(leaf, &mut event);
    assert_eq!(inner.borrow().registry().len(), 1);
    assert_eq!(outer.borrow().registry().len(), 0);
}

// =============================================================
// Window resize
// =============================================================

#[test]
fn window_resize_realigns_without_restyling() {
    let f = fixture();
    let position = PositionSet { left: Some("10%".into()), width: Some("100px".into()), ..PositionSet::default() };
    f.send(f.inner, OverlayEventDetail::create("app-dialog").with_id("x").with_position(position));
    let node = f.node("x");
    f.dom.set_style(node, "opacity", "0.5");

    f.dom.set_offset_box(f.host, Rect::new(10.0, 0.0, 1000.0, 50.0));
    f.dom.dispatch_window(&mut DomEvent::window_resize());

    assert_eq!(f.geometry(node), [text("10px"), text("100px"), text("100px"), text("50px")]);
    assert_eq!(f.style(node, "opacity"), text("0.5"));
    assert_eq!(f.style(node, "background-color"), text("rgba(0,0,0,0.75)"));
}

// =============================================================
// Callbacks
// =============================================================

struct Recorder {
    seen: RefCell<Vec<Option<String>>>,
}

impl OverlayCallback for Recorder {
    fn overlay_handler_callback(&self, config: &OverlayConfig) {
        self.seen.borrow_mut().push(config.id.clone());
    }
}

#[test]
fn create_runs_component_hook_and_caller_callback() {
    let hooked = Rc::new(RefCell::new(Vec::new()));
    let sink = hooked.clone();
    let factory = TagFactory::new().with_hook("app-dialog", move |config: &OverlayConfig| {
        sink.borrow_mut().push(config.id.clone());
    });
    let f = fixture_with(factory, OverlayOptions::default());
    let recorder = Rc::new(Recorder { seen: RefCell::new(Vec::new()) });

    f.send(f.inner, OverlayEventDetail::create("app-dialog").with_id("x").with_caller(recorder.clone()));
    f.send(f.inner, OverlayEventDetail::update("x").with_caller(recorder.clone()));

    assert_eq!(*hooked.borrow(), vec![Some("x".to_string())]);
    assert_eq!(*recorder.seen.borrow(), vec![Some("x".to_string())]);
}

struct OrderLog(Rc<RefCell<Vec<&'static str>>>);

impl OverlayCallback for OrderLog {
    fn overlay_handler_callback(&self, _config: &OverlayConfig) {
        self.0.borrow_mut().push("caller");
    }
}

#[test]
fn caller_callback_runs_before_component_hook() {
    let log = Rc::new(RefCell::new(Vec::new()));
    let sink = log.clone();
    let factory = TagFactory::new().with_hook("app-dialog", move |_: &OverlayConfig| sink.borrow_mut().push("hook"));
    let f = fixture_with(factory, OverlayOptions::default());

    f.send(f.inner, OverlayEventDetail::create("app-dialog").with_caller(Rc::new(OrderLog(log.clone()))));
    assert_eq!(*log.borrow(), vec!["caller", "hook"]);
}

/// `section > wrapper > host > inner` on a shared dom so hooks can dispatch.
fn shared_fixture(
    factory_for: impl FnOnce(Weak<HeadlessDom>, NodeId) -> TagFactory,
) -> (Rc<HeadlessDom>, NodeId, Controller) {
    let dom = Rc::new(HeadlessDom::new());
    let mount = dom.create_root("section");
    let wrapper = dom.create_element(mount, "div").unwrap();
    let host = dom.create_element(wrapper, "div").unwrap();
    let inner = dom.create_element(host, "button").unwrap();
    dom.set_offset_box(host, Rect::new(100.0, 50.0, 300.0, 200.0));
    let factory = factory_for(Rc::downgrade(&dom), wrapper);
    let controller = OverlayController::attach(&*dom, wrapper, factory, OverlayOptions::default()).unwrap();
    (dom, inner, controller)
}

#[test]
fn hook_can_update_its_own_overlay() {
    let (dom, inner, controller) = shared_fixture(|echo, wrapper| {
        TagFactory::new().with_hook("app-dialog", move |config: &OverlayConfig| {
            let (Some(dom), Some(id)) = (echo.upgrade(), config.id.clone()) else {
                return;
            };
            let narrow = PositionSet { width: Some("50px".into()), ..PositionSet::default() };
            dom.dispatch(wrapper, &mut DomEvent::overlay(OverlayEventDetail::update(id).with_position(narrow)));
        })
    });

    dom.dispatch(inner, &mut DomEvent::overlay(OverlayEventDetail::create("app-dialog").with_id("self")));

    let controller = controller.borrow();
    let node = controller.overlay_node("self").unwrap();
    assert_eq!(dom.inline_style(node, "width"), text("50px"));
    assert_eq!(controller.registry().get("self").unwrap().config.position.width, Some("50px".into()));
}

#[test]
fn hook_can_delete_its_own_overlay() {
    let (dom, inner, controller) = shared_fixture(|echo, wrapper| {
        TagFactory::new().with_hook("app-toast", move |config: &OverlayConfig| {
            if let (Some(dom), Some(id)) = (echo.upgrade(), config.id.clone()) {
                dom.dispatch(wrapper, &mut DomEvent::overlay(OverlayEventDetail::delete(id)));
            }
        })
    });

    dom.dispatch(inner, &mut DomEvent::overlay(OverlayEventDetail::create("app-toast")));
    assert!(controller.borrow().registry().is_empty());
}

// =============================================================
// Teardown
// =============================================================

#[test]
fn detach_destroys_overlays_and_unbinds() {
    let f = fixture();
    f.send(f.inner, OverlayEventDetail::create("a").with_id("a"));
    f.send(f.inner, OverlayEventDetail::create("b").with_id("b"));
    let nodes = [f.node("a"), f.node("b")];

    f.controller.borrow_mut().detach(&f.dom);

    assert!(f.controller.borrow().registry().is_empty());
    assert!(nodes.iter().all(|n| !f.dom.contains(*n)));
    assert_eq!(f.dom.total_listeners(), 0);

    let event = f.send(f.inner, OverlayEventDetail::create("c"));
    assert!(!event.default_prevented());
    assert!(f.controller.borrow().registry().is_empty());
}

#[test]
fn dropped_controller_ignores_events() {
    let f = fixture();
    let Fixture { dom, mount, inner, controller, .. } = f;
    drop(controller);
    let mut event = DomEvent::overlay(OverlayEventDetail::create("app-dialog"));
    dom.dispatch(inner, &mut event);
    assert!(!event.default_prevented());
    assert_eq!(dom.children(mount).len(), 1);
}
