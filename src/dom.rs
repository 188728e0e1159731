//! Host capabilities: the DOM-like surface the controllers drive.
//!
//! Controllers never own nodes. They address them through [`NodeId`] handles
//! and ask the host to read geometry, write styles, and deliver events. The
//! trait takes `&self` everywhere because the node tree is a shared resource:
//! listeners run while other parts of the tree are being written.
//!
//! Two implementations ship with the crate: [`crate::headless::HeadlessDom`]
//! for tests and non-browser embedding, and `web::WebDom` (feature `web`).

#[cfg(test)]
#[path = "dom_test.rs"]
mod dom_test;

use std::rc::Rc;

use crate::config::OverlayEventDetail;
use crate::geometry::{Point, Rect};

/// Opaque handle for a node owned by the host.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(pub u64);

/// Where a listener is attached.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventTarget {
    Node(NodeId),
    Window,
}

/// Disposer token returned by [`Dom::listen`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ListenerId(pub u64);

/// Mouse event kinds the resize controller reacts to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PointerKind {
    Move,
    Enter,
    Leave,
    Down,
    Up,
}

impl PointerKind {
    /// Every kind, in listener-binding order.
    pub const ALL: [Self; 5] = [Self::Move, Self::Up, Self::Down, Self::Enter, Self::Leave];

    /// DOM event name.
    #[must_use]
    pub fn event_name(self) -> &'static str {
        match self {
            Self::Move => "mousemove",
            Self::Enter => "mouseenter",
            Self::Leave => "mouseleave",
            Self::Down => "mousedown",
            Self::Up => "mouseup",
        }
    }

    /// Parse a DOM event name.
    #[must_use]
    pub fn from_event_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|kind| kind.event_name() == name)
    }

    /// Enter and leave do not bubble.
    #[must_use]
    pub fn bubbles(self) -> bool {
        !matches!(self, Self::Enter | Self::Leave)
    }
}

/// Data carried by an event.
#[derive(Debug, Clone)]
pub enum EventPayload {
    None,
    /// Pointer position in viewport coordinates.
    Pointer { kind: PointerKind, at: Point },
    /// Detail of an `overlayEvent`.
    Overlay(Box<OverlayEventDetail>),
}

/// An event in flight.
#[derive(Debug, Clone)]
pub struct DomEvent {
    pub name: String,
    pub bubbles: bool,
    pub payload: EventPayload,
    propagation_stopped: bool,
    default_prevented: bool,
}

impl DomEvent {
    #[must_use]
    pub fn new(name: impl Into<String>, bubbles: bool, payload: EventPayload) -> Self {
        Self { name: name.into(), bubbles, payload, propagation_stopped: false, default_prevented: false }
    }

    /// A bubbling `overlayEvent` carrying `detail`.
    #[must_use]
    pub fn overlay(detail: OverlayEventDetail) -> Self {
        Self::new(crate::consts::OVERLAY_EVENT, true, EventPayload::Overlay(Box::new(detail)))
    }

    /// A mouse event at `at`.
    #[must_use]
    pub fn pointer(kind: PointerKind, at: Point) -> Self {
        Self::new(kind.event_name(), kind.bubbles(), EventPayload::Pointer { kind, at })
    }

    /// A window `resize` event.
    #[must_use]
    pub fn window_resize() -> Self {
        Self::new(crate::consts::RESIZE_EVENT, false, EventPayload::None)
    }

    pub fn stop_propagation(&mut self) {
        self.propagation_stopped = true;
    }

    pub fn prevent_default(&mut self) {
        self.default_prevented = true;
    }

    #[must_use]
    pub fn propagation_stopped(&self) -> bool {
        self.propagation_stopped
    }

    #[must_use]
    pub fn default_prevented(&self) -> bool {
        self.default_prevented
    }

    /// Overlay detail, if this is an `overlayEvent`.
    #[must_use]
    pub fn overlay_detail(&self) -> Option<&OverlayEventDetail> {
        match &self.payload {
            EventPayload::Overlay(detail) => Some(detail),
            _ => None,
        }
    }

    /// Pointer kind and position, if this is a mouse event.
    #[must_use]
    pub fn pointer_at(&self) -> Option<(PointerKind, Point)> {
        match self.payload {
            EventPayload::Pointer { kind, at } => Some((kind, at)),
            _ => None,
        }
    }
}

/// Callback invoked by the host when a listened-for event fires.
pub type Listener<D> = Rc<dyn Fn(&D, &mut DomEvent)>;

/// The node-tree operations consumed by the controllers.
pub trait Dom: Sized {
    // --- Structure ---

    /// Create an element with `tag` and append it to `parent`.
    ///
    /// `None` if the parent is gone or the host refuses the tag.
    fn create_element(&self, parent: NodeId, tag: &str) -> Option<NodeId>;

    /// Detach a node and its subtree.
    fn remove(&self, node: NodeId);

    fn parent(&self, node: NodeId) -> Option<NodeId>;

    fn first_child(&self, node: NodeId) -> Option<NodeId>;

    /// Upper-case tag name, e.g. `DIV`.
    fn tag_name(&self, node: NodeId) -> String;

    // --- Mutation ---

    fn set_style(&self, node: NodeId, property: &str, value: &str);

    /// Setting `style` or `class` replaces the whole inline style or class list.
    fn set_attribute(&self, node: NodeId, name: &str, value: &str);

    fn add_class(&self, node: NodeId, class: &str);

    // --- Geometry and style queries ---

    /// Inline style value, if set.
    fn inline_style(&self, node: NodeId, property: &str) -> Option<String>;

    /// Computed style value, if the host can resolve it.
    fn computed_style(&self, node: NodeId, property: &str) -> Option<String>;

    /// Border box in viewport coordinates.
    fn bounding_rect(&self, node: NodeId) -> Rect;

    /// Border box relative to the offset parent.
    fn offset_box(&self, node: NodeId) -> Rect;

    // --- Events ---

    fn listen(&self, target: EventTarget, event: &str, listener: Listener<Self>) -> ListenerId;

    fn unlisten(&self, id: ListenerId);
}
