//! In-memory node tree implementing [`Dom`].
//!
//! DESIGN
//! ======
//! There is no layout engine here. Geometry is whatever the embedder sets with
//! `set_bounding_rect` / `set_offset_box` / `set_computed_style`; the tree only
//! stores structure, inline styles, attributes, classes, and listeners.
//!
//! Dispatch follows the browser model closely enough for the controllers:
//! listeners on the target run first, then each ancestor in turn, then the
//! window, stopping after the current node once propagation is stopped.
//! Non-bubbling events only reach the target. Listeners are cloned out of the
//! registry before they run, so a listener may freely listen, unlisten, create,
//! or remove nodes.

#[cfg(test)]
#[path = "headless_test.rs"]
mod headless_test;

use std::cell::{Cell, RefCell};
use std::collections::BTreeMap;

use crate::dom::{Dom, DomEvent, EventTarget, Listener, ListenerId, NodeId};
use crate::geometry::Rect;

#[derive(Debug, Default)]
struct Node {
    tag: String,
    parent: Option<NodeId>,
    children: Vec<NodeId>,
    styles: BTreeMap<String, String>,
    attributes: BTreeMap<String, String>,
    classes: Vec<String>,
    computed: BTreeMap<String, String>,
    bounding: Rect,
    offset: Rect,
}

struct Registration {
    id: ListenerId,
    target: EventTarget,
    event: String,
    listener: Listener<HeadlessDom>,
}

/// A detached, single-threaded node tree.
#[derive(Default)]
pub struct HeadlessDom {
    nodes: RefCell<BTreeMap<NodeId, Node>>,
    listeners: RefCell<Vec<Registration>>,
    next_node: Cell<u64>,
    next_listener: Cell<u64>,
}

impl HeadlessDom {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a parentless element.
    pub fn create_root(&self, tag: &str) -> NodeId {
        let id = self.allocate();
        self.nodes.borrow_mut().insert(id, Node { tag: tag.to_uppercase(), ..Node::default() });
        id
    }

    fn allocate(&self) -> NodeId {
        let id = NodeId(self.next_node.get());
        self.next_node.set(id.0 + 1);
        id
    }

    fn with_node<R>(&self, node: NodeId, read: impl FnOnce(&Node) -> R) -> Option<R> {
        self.nodes.borrow().get(&node).map(read)
    }

    fn with_node_mut(&self, node: NodeId, write: impl FnOnce(&mut Node)) {
        if let Some(n) = self.nodes.borrow_mut().get_mut(&node) {
            write(n);
        }
    }

    // --- Geometry setup ---

    pub fn set_bounding_rect(&self, node: NodeId, rect: Rect) {
        self.with_node_mut(node, |n| n.bounding = rect);
    }

    pub fn set_offset_box(&self, node: NodeId, rect: Rect) {
        self.with_node_mut(node, |n| n.offset = rect);
    }

    pub fn set_computed_style(&self, node: NodeId, property: &str, value: &str) {
        self.with_node_mut(node, |n| {
            n.computed.insert(property.to_string(), value.to_string());
        });
    }

    // --- Inspection ---

    #[must_use]
    pub fn contains(&self, node: NodeId) -> bool {
        self.nodes.borrow().contains_key(&node)
    }

    #[must_use]
    pub fn children(&self, node: NodeId) -> Vec<NodeId> {
        self.with_node(node, |n| n.children.clone()).unwrap_or_default()
    }

    #[must_use]
    pub fn classes(&self, node: NodeId) -> Vec<String> {
        self.with_node(node, |n| n.classes.clone()).unwrap_or_default()
    }

    #[must_use]
    pub fn attribute(&self, node: NodeId, name: &str) -> Option<String> {
        self.with_node(node, |n| n.attributes.get(name).cloned()).flatten()
    }

    /// Number of live listeners on `target` for `event`.
    #[must_use]
    pub fn listener_count(&self, target: EventTarget, event: &str) -> usize {
        self.listeners
            .borrow()
            .iter()
            .filter(|r| r.target == target && r.event == event)
            .count()
    }

    /// Number of live listeners overall.
    #[must_use]
    pub fn total_listeners(&self) -> usize {
        self.listeners.borrow().len()
    }

    // --- Dispatch ---

    /// Dispatch `event` at `target`, bubbling through ancestors and the window.
    pub fn dispatch(&self, target: NodeId, event: &mut DomEvent) {
        let mut current = Some(target);
        while let Some(node) = current {
            self.run_listeners(EventTarget::Node(node), event);
            if event.propagation_stopped() || !event.bubbles {
                return;
            }
            current = self.parent(node);
        }
        self.run_listeners(EventTarget::Window, event);
    }

    /// Dispatch `event` directly on the window.
    pub fn dispatch_window(&self, event: &mut DomEvent) {
        self.run_listeners(EventTarget::Window, event);
    }

    fn run_listeners(&self, target: EventTarget, event: &mut DomEvent) {
        let matching: Vec<Listener<Self>> = self
            .listeners
            .borrow()
            .iter()
            .filter(|r| r.target == target && r.event == event.name)
            .map(|r| r.listener.clone())
            .collect();
        for listener in matching {
            listener(self, event);
        }
    }
}

impl Dom for HeadlessDom {
    fn create_element(&self, parent: NodeId, tag: &str) -> Option<NodeId> {
        let mut nodes = self.nodes.borrow_mut();
        let parent_node = nodes.get_mut(&parent)?;
        let id = self.allocate();
        parent_node.children.push(id);
        nodes.insert(id, Node { tag: tag.to_uppercase(), parent: Some(parent), ..Node::default() });
        Some(id)
    }

    fn remove(&self, node: NodeId) {
        let mut removed = Vec::new();
        {
            let mut nodes = self.nodes.borrow_mut();
            let parent = nodes.get(&node).and_then(|n| n.parent);
            if let Some(parent_node) = parent.and_then(|p| nodes.get_mut(&p)) {
                parent_node.children.retain(|child| *child != node);
            }
            let mut stack = vec![node];
            while let Some(next) = stack.pop() {
                if let Some(n) = nodes.remove(&next) {
                    stack.extend(n.children);
                    removed.push(next);
                }
            }
        }
        self.listeners
            .borrow_mut()
            .retain(|r| !matches!(r.target, EventTarget::Node(n) if removed.contains(&n)));
    }

    fn parent(&self, node: NodeId) -> Option<NodeId> {
        self.with_node(node, |n| n.parent).flatten()
    }

    fn first_child(&self, node: NodeId) -> Option<NodeId> {
        self.with_node(node, |n| n.children.first().copied()).flatten()
    }

    fn tag_name(&self, node: NodeId) -> String {
        self.with_node(node, |n| n.tag.clone()).unwrap_or_default()
    }

    fn set_style(&self, node: NodeId, property: &str, value: &str) {
        self.with_node_mut(node, |n| {
            n.styles.insert(property.to_string(), value.to_string());
        });
    }

    fn set_attribute(&self, node: NodeId, name: &str, value: &str) {
        self.with_node_mut(node, |n| match name {
            "style" => {
                n.styles = value
                    .split(';')
                    .filter_map(|decl| decl.split_once(':'))
                    .map(|(prop, val)| (prop.trim().to_string(), val.trim().to_string()))
                    .collect();
            }
            "class" => {
                n.classes = value.split_whitespace().map(str::to_string).collect();
            }
            _ => {
                n.attributes.insert(name.to_string(), value.to_string());
            }
        });
    }

    fn add_class(&self, node: NodeId, class: &str) {
        self.with_node_mut(node, |n| {
            if !n.classes.iter().any(|c| c == class) {
                n.classes.push(class.to_string());
            }
        });
    }

    fn inline_style(&self, node: NodeId, property: &str) -> Option<String> {
        self.with_node(node, |n| n.styles.get(property).cloned()).flatten()
    }

    /// Inline styles win over the values set with `set_computed_style`.
    fn computed_style(&self, node: NodeId, property: &str) -> Option<String> {
        self.with_node(node, |n| {
            n.styles
                .get(property)
                .or_else(|| n.computed.get(property))
                .cloned()
        })
        .flatten()
    }

    fn bounding_rect(&self, node: NodeId) -> Rect {
        self.with_node(node, |n| n.bounding).unwrap_or_default()
    }

    fn offset_box(&self, node: NodeId) -> Rect {
        self.with_node(node, |n| n.offset).unwrap_or_default()
    }

    fn listen(&self, target: EventTarget, event: &str, listener: Listener<Self>) -> ListenerId {
        let id = ListenerId(self.next_listener.get());
        self.next_listener.set(id.0 + 1);
        self.listeners
            .borrow_mut()
            .push(Registration { id, target, event: event.to_string(), listener });
        id
    }

    fn unlisten(&self, id: ListenerId) {
        self.listeners.borrow_mut().retain(|r| r.id != id);
    }
}
