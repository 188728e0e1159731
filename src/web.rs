//! Browser host: [`Dom`] over `web-sys`.
//!
//! Page elements enter the crate through [`WebDom::adopt`], which hands out a
//! stable [`NodeId`] per element. Listeners are wrapped in JS closures that
//! translate the browser event into a [`DomEvent`], run the Rust listener, and
//! copy `preventDefault` / `stopPropagation` back onto the browser event.
//!
//! `overlayEvent` details arrive as plain JS objects. They are serialized with
//! `JSON.stringify` and validated by [`OverlayEventDetail::from_json`]; a JS
//! callback function does not survive that trip.

use std::cell::{Cell, RefCell};
use std::collections::HashMap;
use std::rc::{Rc, Weak};

use tracing::warn;
use wasm_bindgen::{JsCast, JsValue, closure::Closure};
use web_sys::{CustomEvent, Element, HtmlElement, MouseEvent};

use crate::config::OverlayEventDetail;
use crate::consts::OVERLAY_EVENT;
use crate::dom::{Dom, DomEvent, EventPayload, EventTarget, Listener, ListenerId, NodeId, PointerKind};
use crate::geometry::{Point, Rect};

type JsListener = Closure<dyn Fn(web_sys::Event)>;

struct Binding {
    node: Option<NodeId>,
    target: web_sys::EventTarget,
    event: String,
    closure: JsListener,
}

struct Inner {
    window: web_sys::Window,
    document: web_sys::Document,
    nodes: RefCell<HashMap<NodeId, Element>>,
    bindings: RefCell<HashMap<ListenerId, Binding>>,
    next_node: Cell<u64>,
    next_listener: Cell<u64>,
}

impl Drop for Inner {
    fn drop(&mut self) {
        for binding in self.bindings.get_mut().values() {
            WebDom::detach_binding(binding);
        }
    }
}

/// Handle to the page's document. Clones share the node and listener tables.
#[derive(Clone)]
pub struct WebDom {
    inner: Rc<Inner>,
}

impl WebDom {
    /// `None` outside a browser window.
    #[must_use]
    pub fn new() -> Option<Self> {
        let window = web_sys::window()?;
        let document = window.document()?;
        Some(Self {
            inner: Rc::new(Inner {
                window,
                document,
                nodes: RefCell::new(HashMap::new()),
                bindings: RefCell::new(HashMap::new()),
                next_node: Cell::new(0),
                next_listener: Cell::new(0),
            }),
        })
    }

    /// Id for `element`, reusing the existing one if it was adopted before.
    pub fn adopt(&self, element: Element) -> NodeId {
        let mut nodes = self.inner.nodes.borrow_mut();
        if let Some((id, _)) = nodes.iter().find(|(_, known)| **known == element) {
            return *id;
        }
        let id = NodeId(self.inner.next_node.get());
        self.inner.next_node.set(id.0 + 1);
        nodes.insert(id, element);
        id
    }

    /// Adopt the element with `id` attribute `dom_id`.
    #[must_use]
    pub fn adopt_by_id(&self, dom_id: &str) -> Option<NodeId> {
        let element = self.inner.document.get_element_by_id(dom_id)?;
        Some(self.adopt(element))
    }

    /// The browser element behind `node`.
    #[must_use]
    pub fn element(&self, node: NodeId) -> Option<Element> {
        self.inner.nodes.borrow().get(&node).cloned()
    }

    fn html(&self, node: NodeId) -> Option<HtmlElement> {
        let element = self.element(node)?;
        element.dyn_ref::<HtmlElement>().cloned()
    }

    fn js_target(&self, target: EventTarget) -> Option<web_sys::EventTarget> {
        match target {
            EventTarget::Window => Some(self.inner.window.clone().into()),
            EventTarget::Node(node) => self.element(node).map(Into::into),
        }
    }

    fn detach_binding(binding: &Binding) {
        let callback = binding.closure.as_ref().unchecked_ref();
        if let Err(error) = binding.target.remove_event_listener_with_callback(&binding.event, callback) {
            warn!(event = %binding.event, ?error, "removeEventListener failed");
        }
    }
}

impl Dom for WebDom {
    fn create_element(&self, parent: NodeId, tag: &str) -> Option<NodeId> {
        let parent = self.element(parent)?;
        let element = match self.inner.document.create_element(tag) {
            Ok(element) => element,
            Err(error) => {
                warn!(tag, ?error, "createElement failed");
                return None;
            }
        };
        if let Err(error) = parent.append_child(&element) {
            warn!(tag, ?error, "appendChild failed");
            return None;
        }
        Some(self.adopt(element))
    }

    fn remove(&self, node: NodeId) {
        let Some(element) = self.element(node) else {
            return;
        };
        element.remove();

        let mut gone = Vec::new();
        self.inner.nodes.borrow_mut().retain(|id, known| {
            let known: &web_sys::Node = known;
            let inside = element.contains(Some(known));
            if inside {
                gone.push(*id);
            }
            !inside
        });
        let mut bindings = self.inner.bindings.borrow_mut();
        bindings.retain(|_, binding| {
            let orphaned = binding.node.is_some_and(|id| gone.contains(&id));
            if orphaned {
                Self::detach_binding(binding);
            }
            !orphaned
        });
    }

    fn parent(&self, node: NodeId) -> Option<NodeId> {
        let parent = self.element(node)?.parent_element()?;
        Some(self.adopt(parent))
    }

    fn first_child(&self, node: NodeId) -> Option<NodeId> {
        let child = self.element(node)?.first_element_child()?;
        Some(self.adopt(child))
    }

    fn tag_name(&self, node: NodeId) -> String {
        self.element(node).map(|e| e.tag_name().to_ascii_uppercase()).unwrap_or_default()
    }

    fn set_style(&self, node: NodeId, property: &str, value: &str) {
        let Some(html) = self.html(node) else {
            return;
        };
        if let Err(error) = html.style().set_property(property, value) {
            warn!(node = node.0, property, ?error, "style write failed");
        }
    }

    fn set_attribute(&self, node: NodeId, name: &str, value: &str) {
        let Some(element) = self.element(node) else {
            return;
        };
        if let Err(error) = element.set_attribute(name, value) {
            warn!(node = node.0, name, ?error, "setAttribute failed");
        }
    }

    fn add_class(&self, node: NodeId, class: &str) {
        let Some(element) = self.element(node) else {
            return;
        };
        if let Err(error) = element.class_list().add_1(class) {
            warn!(node = node.0, class, ?error, "classList.add failed");
        }
    }

    fn inline_style(&self, node: NodeId, property: &str) -> Option<String> {
        let value = self.html(node)?.style().get_property_value(property);
        match value {
            Ok(value) if !value.is_empty() => Some(value),
            Ok(_) => None,
            Err(error) => {
                warn!(node = node.0, property, ?error, "inline style read failed");
                None
            }
        }
    }

    fn computed_style(&self, node: NodeId, property: &str) -> Option<String> {
        let element = self.element(node)?;
        let style = match self.inner.window.get_computed_style(&element) {
            Ok(style) => style?,
            Err(error) => {
                warn!(node = node.0, ?error, "getComputedStyle failed");
                return None;
            }
        };
        match style.get_property_value(property) {
            Ok(value) if !value.is_empty() => Some(value),
            Ok(_) => None,
            Err(error) => {
                warn!(node = node.0, property, ?error, "computed style read failed");
                None
            }
        }
    }

    fn bounding_rect(&self, node: NodeId) -> Rect {
        let Some(element) = self.element(node) else {
            return Rect::default();
        };
        let rect = element.get_bounding_client_rect();
        Rect::new(rect.top(), rect.left(), rect.width(), rect.height())
    }

    fn offset_box(&self, node: NodeId) -> Rect {
        let Some(html) = self.html(node) else {
            return Rect::default();
        };
        Rect::new(
            f64::from(html.offset_top()),
            f64::from(html.offset_left()),
            f64::from(html.offset_width()),
            f64::from(html.offset_height()),
        )
    }

    fn listen(&self, target: EventTarget, event: &str, listener: Listener<Self>) -> ListenerId {
        let id = ListenerId(self.inner.next_listener.get());
        self.inner.next_listener.set(id.0 + 1);

        let Some(js_target) = self.js_target(target) else {
            warn!(?target, event, "listener target is not an adopted element");
            return id;
        };

        let weak: Weak<Inner> = Rc::downgrade(&self.inner);
        let closure: JsListener = Closure::wrap(Box::new(move |raw: web_sys::Event| {
            let Some(inner) = weak.upgrade() else {
                return;
            };
            let dom = WebDom { inner };
            let mut event = translate(&raw);
            listener(&dom, &mut event);
            if event.default_prevented() {
                raw.prevent_default();
            }
            if event.propagation_stopped() {
                raw.stop_propagation();
            }
        }) as Box<dyn Fn(web_sys::Event)>);

        if let Err(error) = js_target.add_event_listener_with_callback(event, closure.as_ref().unchecked_ref()) {
            warn!(?target, event, ?error, "addEventListener failed");
            return id;
        }

        let node = match target {
            EventTarget::Node(node) => Some(node),
            EventTarget::Window => None,
        };
        self.inner
            .bindings
            .borrow_mut()
            .insert(id, Binding { node, target: js_target, event: event.to_string(), closure });
        id
    }

    fn unlisten(&self, id: ListenerId) {
        let binding = self.inner.bindings.borrow_mut().remove(&id);
        if let Some(binding) = binding {
            Self::detach_binding(&binding);
        }
    }
}

/// Browser event to host-neutral event.
fn translate(raw: &web_sys::Event) -> DomEvent {
    let name = raw.type_();
    let payload = if let Some(kind) = PointerKind::from_event_name(&name) {
        match raw.dyn_ref::<MouseEvent>() {
            Some(mouse) => EventPayload::Pointer {
                kind,
                at: Point::new(f64::from(mouse.client_x()), f64::from(mouse.client_y())),
            },
            None => EventPayload::None,
        }
    } else if name == OVERLAY_EVENT {
        raw.dyn_ref::<CustomEvent>().map_or(EventPayload::None, |custom| overlay_payload(&custom.detail()))
    } else {
        EventPayload::None
    };
    DomEvent::new(name, raw.bubbles(), payload)
}

fn overlay_payload(detail: &JsValue) -> EventPayload {
    if detail.is_undefined() || detail.is_null() {
        return EventPayload::None;
    }
    let json = match js_sys::JSON::stringify(detail) {
        Ok(json) => json.as_string().unwrap_or_default(),
        Err(error) => {
            warn!(?error, "overlay detail is not serializable");
            return EventPayload::None;
        }
    };
    let value: serde_json::Value = match serde_json::from_str(&json) {
        Ok(value) => value,
        Err(error) => {
            warn!(%error, "overlay detail is not valid JSON");
            return EventPayload::None;
        }
    };
    match OverlayEventDetail::from_json(&value) {
        Ok(detail) => EventPayload::Overlay(Box::new(detail)),
        Err(error) => {
            warn!(%error, "overlay detail rejected");
            EventPayload::None
        }
    }
}
