//! Resize controller: makes one element resizable by dragging its edges.
//!
//! DESIGN
//! ======
//! The element listens for `mousemove`, `mouseup`, `mousedown`, `mouseenter`,
//! and `mouseleave`; these drive the idle and hover states. Once a drag starts
//! the element can lose the pointer, so the drag itself runs off window
//! `mousemove` / `mouseup`. A window `resize` recaptures geometry.
//!
//! Geometry is captured, not tracked: the element box, the container box, and
//! the element's own offsets are read on attach, on `mouseenter`, at the start
//! of every drag, on release, and on window resize. Drag math uses only that
//! snapshot, so a drag frame never reads layout.
//!
//! Observers see every state change and every drag frame, including frames
//! whose styles the constraints rejected. Events are queued while a handler
//! runs and delivered after the controller borrow is released, so an observer
//! may query the controller, unsubscribe, or dispatch further events.

#[cfg(test)]
#[path = "resizable_test.rs"]
mod resizable_test;

use std::cell::RefCell;
use std::rc::{Rc, Weak};

use tracing::{debug, info, warn};

use crate::consts::{CONTAINER_TAGS, RESIZE_EVENT};
use crate::dom::{Dom, DomEvent, EventTarget, Listener, ListenerId, NodeId, PointerKind};
use crate::geometry::Point;
use crate::resize::{
    Border, Capture, ResizableConfig, ResizeEvent, ResizeMachine, ResizeState, Step, drag, hit_test,
};
use crate::settings::ResizeSettings;

/// Position modes an element may have and still be resized.
const RESIZABLE_POSITIONS: [&str; 3] = ["static", "relative", "absolute"];

type Observer = Rc<RefCell<dyn FnMut(&ResizeEvent)>>;

/// Token returned by [`ResizeController::subscribe`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ObserverId(u64);

/// Events from one handler run and the observers to hand them to.
struct Delivery {
    events: Vec<ResizeEvent>,
    observers: Vec<Observer>,
}

impl Delivery {
    fn run(self) {
        for event in &self.events {
            for observer in &self.observers {
                match observer.try_borrow_mut() {
                    Ok(mut observer) => (*observer)(event),
                    Err(_) => warn!(?event, "resize observer busy; skipping nested delivery"),
                }
            }
        }
    }
}

/// Resize state for one element.
pub struct ResizeController {
    node: NodeId,
    config: ResizableConfig,
    settings: ResizeSettings,
    machine: ResizeMachine,
    capture: Capture,
    position: String,
    container: Option<NodeId>,
    observers: Vec<(ObserverId, Observer)>,
    next_observer: u64,
    pending: Vec<ResizeEvent>,
    listeners: Vec<ListenerId>,
}

impl ResizeController {
    /// Make `node` resizable. `None` options mean right and bottom edges in
    /// pixels, contained by the parent.
    ///
    /// Returns `None` if the element's position mode is not `static`,
    /// `relative` or `absolute`.
    pub fn attach<D: Dom + 'static>(
        dom: &D,
        node: NodeId,
        config: Option<ResizableConfig>,
        settings: ResizeSettings,
    ) -> Option<Rc<RefCell<Self>>> {
        let mut controller = Self {
            node,
            config: config.unwrap_or_default(),
            settings,
            machine: ResizeMachine::new(),
            capture: Capture::default(),
            position: String::new(),
            container: find_container(dom, node),
            observers: Vec::new(),
            next_observer: 0,
            pending: Vec::new(),
            listeners: Vec::new(),
        };
        controller.recapture(dom);
        if !RESIZABLE_POSITIONS.contains(&controller.position.as_str()) {
            info!(node = node.0, position = %controller.position, "element position is not resizable");
            return None;
        }

        dom.set_style(node, "border", &controller.settings.idle_border);
        let controller = Rc::new(RefCell::new(controller));
        let weak = Rc::downgrade(&controller);

        let mut listeners = Vec::new();
        for kind in PointerKind::ALL {
            let listener = Self::bind(weak.clone(), Self::on_element_event::<D>);
            listeners.push(dom.listen(EventTarget::Node(node), kind.event_name(), listener));
        }
        for kind in [PointerKind::Move, PointerKind::Up] {
            let listener = Self::bind(weak.clone(), Self::on_window_pointer::<D>);
            listeners.push(dom.listen(EventTarget::Window, kind.event_name(), listener));
        }
        listeners.push(dom.listen(EventTarget::Window, RESIZE_EVENT, Self::bind(weak, Self::on_window_resize::<D>)));
        controller.borrow_mut().listeners = listeners;

        info!(node = node.0, "resizable attached");
        Some(controller)
    }

    fn bind<D: Dom + 'static>(this: Weak<RefCell<Self>>, handler: fn(&mut Self, &D, &mut DomEvent)) -> Listener<D> {
        Rc::new(move |dom: &D, event: &mut DomEvent| {
            let Some(controller) = this.upgrade() else {
                return;
            };
            let delivery = match controller.try_borrow_mut() {
                Ok(mut controller) => {
                    handler(&mut controller, dom, event);
                    controller.take_delivery()
                }
                Err(_) => {
                    warn!(event = %event.name, "resize controller busy; dropping reentrant event");
                    return;
                }
            };
            if let Some(delivery) = delivery {
                delivery.run();
            }
        })
    }

    // --- Queries ---

    #[must_use]
    pub fn node(&self) -> NodeId {
        self.node
    }

    #[must_use]
    pub fn state(&self) -> ResizeState {
        self.machine.state()
    }

    #[must_use]
    pub fn border(&self) -> Border {
        self.machine.border()
    }

    #[must_use]
    pub fn config(&self) -> &ResizableConfig {
        &self.config
    }

    /// The last geometry snapshot.
    #[must_use]
    pub fn captured(&self) -> Capture {
        self.capture
    }

    /// Position mode read at the last capture.
    #[must_use]
    pub fn position(&self) -> &str {
        &self.position
    }

    // --- Observers ---

    /// Receive every state change and drag frame, after the handler that
    /// produced them has finished.
    pub fn subscribe(&mut self, observer: impl FnMut(&ResizeEvent) + 'static) -> ObserverId {
        let id = ObserverId(self.next_observer);
        self.next_observer += 1;
        let observer: Observer = Rc::new(RefCell::new(observer));
        self.observers.push((id, observer));
        id
    }

    pub fn unsubscribe(&mut self, id: ObserverId) {
        self.observers.retain(|(observer, _)| *observer != id);
    }

    fn emit(&mut self, event: ResizeEvent) {
        self.pending.push(event);
    }

    fn take_delivery(&mut self) -> Option<Delivery> {
        if self.pending.is_empty() {
            return None;
        }
        Some(Delivery {
            events: std::mem::take(&mut self.pending),
            observers: self.observers.iter().map(|(_, observer)| Rc::clone(observer)).collect(),
        })
    }

    // --- Geometry ---

    /// Re-read position mode, element box, container box, and offsets.
    fn recapture<D: Dom>(&mut self, dom: &D) {
        let node = self.node;
        let mut position = dom
            .inline_style(node, "position")
            .filter(|p| !p.is_empty())
            .or_else(|| dom.computed_style(node, "position"))
            .unwrap_or_default();
        if position == "static" {
            dom.set_style(node, "position", "relative");
            position = "relative".to_string();
        }

        let (top, left) = if position == "relative" {
            (
                css_int(dom.computed_style(node, "top").as_deref()),
                css_int(dom.computed_style(node, "left").as_deref()),
            )
        } else {
            let offset = dom.offset_box(node);
            (offset.top, offset.left)
        };

        self.capture = Capture {
            rect: dom.bounding_rect(node),
            parent: self.container.map(|container| dom.bounding_rect(container)),
            top,
            left,
        };
        self.position = position;
    }

    fn hit(&self, at: Point) -> Border {
        hit_test(self.capture.rect, at, &self.config, self.settings.border_tolerance_px)
    }

    // --- Event handling ---

    fn on_element_event<D: Dom>(&mut self, dom: &D, event: &mut DomEvent) {
        let Some((kind, at)) = event.pointer_at() else {
            return;
        };
        event.prevent_default();
        if kind == PointerKind::Enter {
            self.recapture(dom);
        }
        let hit = self.hit(at);
        if let Some(step) = self.machine.element_event(kind, hit) {
            self.apply_step(dom, step);
        }
    }

    fn on_window_pointer<D: Dom>(&mut self, dom: &D, event: &mut DomEvent) {
        if self.machine.state() != ResizeState::Resizing {
            return;
        }
        let Some((kind, at)) = event.pointer_at() else {
            return;
        };
        event.prevent_default();
        event.stop_propagation();

        match kind {
            PointerKind::Move => {
                let border = self.machine.border();
                let outcome = drag(&self.config, &self.capture, border, at, self.settings.snap_round_up_fraction);
                if outcome.styles.is_empty() {
                    debug!(node = self.node.0, ?border, w = outcome.frame.w, h = outcome.frame.h, "resize frame rejected");
                }
                for (property, value) in &outcome.styles {
                    dom.set_style(self.node, property, value);
                }
                self.emit(ResizeEvent::Resized(outcome.frame));
            }
            PointerKind::Up => {
                self.recapture(dom);
                let hit = self.hit(at);
                if let Some(step) = self.machine.release(hit) {
                    self.apply_step(dom, step);
                }
            }
            _ => {}
        }
    }

    fn on_window_resize<D: Dom>(&mut self, dom: &D, _event: &mut DomEvent) {
        self.recapture(dom);
    }

    fn apply_step<D: Dom>(&mut self, dom: &D, step: Step) {
        if step.to == ResizeState::Resizing {
            self.recapture(dom);
        }
        if let Some(property) = step.border.style_property() {
            dom.set_style(self.node, property, step.to.border_style(&self.settings));
            dom.set_style(self.node, "cursor", step.to.cursor());
        }
        debug!(node = self.node.0, from = ?step.from, to = ?step.to, border = ?step.border, "resize state changed");
        self.emit(ResizeEvent::StateChanged(step.to));
    }

    /// Unbind every listener. The element keeps its current styles.
    pub fn detach<D: Dom>(&mut self, dom: &D) {
        for listener in self.listeners.drain(..) {
            dom.unlisten(listener);
        }
        info!(node = self.node.0, "resizable detached");
    }
}

/// Nearest ancestor whose tag bounds a resizable element.
fn find_container<D: Dom>(dom: &D, node: NodeId) -> Option<NodeId> {
    let mut current = dom.parent(node);
    while let Some(candidate) = current {
        let tag = dom.tag_name(candidate);
        if CONTAINER_TAGS.contains(&tag.as_str()) {
            return Some(candidate);
        }
        current = dom.parent(candidate);
    }
    None
}

/// Leading integer of a style value (`"20px"` is 20). Anything else is 0.
fn css_int(raw: Option<&str>) -> f64 {
    let Some(raw) = raw else {
        return 0.0;
    };
    let raw = raw.trim();
    let digits_start = usize::from(raw.starts_with(['-', '+']));
    let digits_end = raw[digits_start..]
        .find(|c: char| !c.is_ascii_digit())
        .map_or(raw.len(), |i| digits_start + i);
    match raw[..digits_end].parse::<f64>() {
        Ok(value) => value,
        Err(_) => 0.0,
    }
}
