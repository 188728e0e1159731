//! Overlay controller: turns `overlayEvent`s into positioned overlay subtrees.
//!
//! DESIGN
//! ======
//! A controller is attached to a wrapper node. The wrapper's first child is
//! the host whose box overlays are aligned against, and overlays are mounted
//! under the wrapper's parent so they sit next to the host rather than inside
//! it. That placement keeps an event dispatched from inside an overlay from
//! reaching the wrapper listener a second time on its way up.
//!
//! The controller lives in `Rc<RefCell<_>>`. Every listener it binds holds a
//! `Weak` back-reference, so dropping the last strong handle disables the
//! listeners even before `detach` runs. An event that arrives while the
//! controller is already borrowed is dropped with a warning.
//!
//! Handling is a single synchronous pass per event:
//!
//! 1. Ignore events without a detail or an action.
//! 2. Ignore events whose subject does not match the controller's filter.
//! 3. Stop propagation unless the detail is `multilayer`.
//! 4. Run CREATE, UPDATE, or DELETE against the registry.
//!
//! A CREATE registers the overlay before anyone hears about it. The caller's
//! callback and then the component's config hook run after the controller
//! borrow is released, so either may dispatch further overlay events,
//! including ones naming the overlay just created.

#[cfg(test)]
#[path = "overlay_test.rs"]
mod overlay_test;

use std::cell::RefCell;
use std::rc::{Rc, Weak};

use regex::Regex;
use tracing::{debug, info, warn};

use crate::config::{CallerRef, DetailError, OverlayAction, OverlayConfig, OverlayEventDetail};
use crate::consts::{OVERLAY_EVENT, RESIZE_EVENT};
use crate::dom::{Dom, DomEvent, EventTarget, Listener, ListenerId, NodeId};
use crate::geometry::{px, resolve_box, window_styles};
use crate::registry::{OverlayRecord, OverlayRegistry};
use crate::render::{ConfigHook, RenderError, RenderFactory, RenderHandle};
use crate::settings::OverlaySettings;

#[derive(Debug, thiserror::Error)]
pub enum OverlayError {
    #[error("invalid subject pattern: {0}")]
    InvalidSubject(#[from] regex::Error),
    #[error(transparent)]
    Detail(#[from] DetailError),
    #[error(transparent)]
    Render(#[from] RenderError),
}

/// Attach-time options.
#[derive(Debug, Clone, Default)]
pub struct OverlayOptions {
    /// Pattern an event's `subject` must match for this controller to take it.
    pub subject: Option<String>,
    pub settings: OverlaySettings,
}

impl OverlayOptions {
    #[must_use]
    pub fn with_subject(mut self, subject: impl Into<String>) -> Self {
        self.subject = Some(subject.into());
        self
    }
}

/// Callbacks to run once the controller borrow is released.
struct CreateNotice {
    caller: Option<CallerRef>,
    hook: Option<ConfigHook>,
    config: OverlayConfig,
}

impl CreateNotice {
    fn deliver(self) {
        if let Some(caller) = self.caller {
            caller.0.overlay_handler_callback(&self.config);
        }
        if let Some(hook) = self.hook {
            hook(&self.config);
        }
    }
}

type Handler<C, D> = fn(&mut C, &D, &mut DomEvent) -> Option<CreateNotice>;

/// Owns the overlays of one wrapper node.
pub struct OverlayController<D, F>
where
    D: Dom + 'static,
    F: RenderFactory<D> + 'static,
{
    wrapper: NodeId,
    factory: F,
    registry: OverlayRegistry<F::Handle>,
    subject: Option<Regex>,
    settings: OverlaySettings,
    listeners: Vec<ListenerId>,
    this: Weak<RefCell<Self>>,
}

impl<D, F> OverlayController<D, F>
where
    D: Dom + 'static,
    F: RenderFactory<D> + 'static,
{
    /// Bind a controller to `wrapper`: `overlayEvent` on the wrapper and
    /// `resize` on the window.
    ///
    /// # Errors
    ///
    /// Returns `InvalidSubject` if the subject filter is not a valid pattern.
    pub fn attach(dom: &D, wrapper: NodeId, factory: F, options: OverlayOptions) -> Result<Rc<RefCell<Self>>, OverlayError> {
        let subject = options.subject.as_deref().map(Regex::new).transpose()?;
        let controller = Rc::new_cyclic(|this| {
            RefCell::new(Self {
                wrapper,
                factory,
                registry: OverlayRegistry::new(),
                subject,
                settings: options.settings,
                listeners: Vec::new(),
                this: this.clone(),
            })
        });

        let weak = Rc::downgrade(&controller);
        let listeners = vec![
            dom.listen(EventTarget::Node(wrapper), OVERLAY_EVENT, Self::bind(weak.clone(), Self::handle_event)),
            dom.listen(EventTarget::Window, RESIZE_EVENT, Self::bind(weak, Self::on_window_resize)),
        ];
        controller.borrow_mut().listeners = listeners;

        info!(wrapper = wrapper.0, subject = ?options.subject, "overlay host attached");
        Ok(controller)
    }

    /// Wrap a handler in a listener that upgrades the weak reference and
    /// guards against reentrant dispatch.
    fn bind(this: Weak<RefCell<Self>>, handler: Handler<Self, D>) -> Listener<D> {
        Rc::new(move |dom: &D, event: &mut DomEvent| {
            let Some(controller) = this.upgrade() else {
                return;
            };
            let notice = match controller.try_borrow_mut() {
                Ok(mut controller) => handler(&mut controller, dom, event),
                Err(_) => {
                    warn!(event = %event.name, "overlay controller busy; dropping reentrant event");
                    return;
                }
            };
            if let Some(notice) = notice {
                notice.deliver();
            }
        })
    }

    // --- Queries ---

    #[must_use]
    pub fn wrapper(&self) -> NodeId {
        self.wrapper
    }

    /// Node whose box overlays are aligned against.
    pub fn host(&self, dom: &D) -> NodeId {
        dom.first_child(self.wrapper).unwrap_or(self.wrapper)
    }

    /// Node overlays are created under.
    pub fn mount(&self, dom: &D) -> NodeId {
        dom.parent(self.wrapper).unwrap_or(self.wrapper)
    }

    #[must_use]
    pub fn registry(&self) -> &OverlayRegistry<F::Handle> {
        &self.registry
    }

    /// Backing node of overlay `id`.
    #[must_use]
    pub fn overlay_node(&self, id: &str) -> Option<NodeId> {
        self.registry.get(id).map(|record| record.handle.root())
    }

    // --- Event handling ---

    fn handle_event(&mut self, dom: &D, event: &mut DomEvent) -> Option<CreateNotice> {
        event.prevent_default();
        let Some(detail) = event.overlay_detail().cloned() else {
            debug!(wrapper = self.wrapper.0, "overlay event without a valid detail ignored");
            return None;
        };
        if detail.action.is_none() {
            debug!(wrapper = self.wrapper.0, "overlay event without action ignored");
            return None;
        }
        if !self.accepts_subject(detail.config.subject.as_deref()) {
            debug!(wrapper = self.wrapper.0, subject = ?detail.config.subject, "overlay event for another subject ignored");
            return None;
        }
        if !detail.config.multilayer {
            event.stop_propagation();
        }

        match self.apply(dom, detail) {
            Ok(notice) => notice,
            Err(error) => {
                warn!(wrapper = self.wrapper.0, %error, "overlay event rejected");
                None
            }
        }
    }

    fn on_window_resize(&mut self, dom: &D, _event: &mut DomEvent) -> Option<CreateNotice> {
        self.realign(dom);
        None
    }

    fn accepts_subject(&self, subject: Option<&str>) -> bool {
        match &self.subject {
            None => true,
            Some(filter) => subject.is_some_and(|s| filter.is_match(s)),
        }
    }

    fn apply(&mut self, dom: &D, detail: OverlayEventDetail) -> Result<Option<CreateNotice>, OverlayError> {
        match detail.parsed_action()? {
            OverlayAction::Create => self.create(dom, detail.config),
            OverlayAction::Update => {
                let id = detail.require_id(OverlayAction::Update)?.to_string();
                self.update(dom, &id, detail.config);
                Ok(None)
            }
            OverlayAction::Delete => {
                self.delete(dom, detail.require_id(OverlayAction::Delete)?);
                Ok(None)
            }
        }
    }

    fn create(&mut self, dom: &D, mut config: OverlayConfig) -> Result<Option<CreateNotice>, OverlayError> {
        let component = config.component.clone().ok_or(DetailError::MissingComponent)?;
        let id = match config.id.take() {
            Some(id) if self.registry.contains(&id) => return Err(DetailError::DuplicateId(id).into()),
            Some(id) => id,
            None => self.registry.generate_id(),
        };
        config.id = Some(id.clone());

        let host = self.host(dom);
        let mount = self.mount(dom);
        let handle = self.factory.create(dom, &component, mount)?;
        let node = handle.root();
        apply_styles(dom, &self.settings, node, host, &config);
        align(dom, node, host, &config);
        let listener = dom.listen(EventTarget::Node(node), OVERLAY_EVENT, Self::bind(self.this.clone(), Self::handle_event));

        let notice = CreateNotice { caller: config.caller.clone(), hook: handle.config_hook(), config: config.clone() };
        let record = OverlayRecord { id: id.clone(), config, host, handle, listener: Some(listener) };
        if let Some(rejected) = self.registry.insert(record) {
            dom.unlisten(listener);
            rejected.handle.destroy(dom);
            return Err(DetailError::DuplicateId(id).into());
        }

        info!(%id, component = component.name(), node = node.0, count = self.registry.len(), "overlay created");
        Ok((notice.caller.is_some() || notice.hook.is_some()).then_some(notice))
    }

    fn update(&mut self, dom: &D, id: &str, mut config: OverlayConfig) {
        let Some(existing) = self.registry.get(id) else {
            debug!(%id, "update for unknown overlay ignored");
            return;
        };
        if config.component.is_none() {
            config.component = existing.config.component.clone();
        }
        config.id = Some(id.to_string());
        self.registry.replace_config(id, config);

        let host = self.host(dom);
        if let Some(record) = self.registry.get_mut(id) {
            record.host = host;
            let node = record.handle.root();
            apply_styles(dom, &self.settings, node, host, &record.config);
            align(dom, node, host, &record.config);
            debug!(%id, node = node.0, "overlay updated");
        }
    }

    fn delete(&mut self, dom: &D, id: &str) {
        let Some(record) = self.registry.remove(id) else {
            debug!(%id, "delete for unknown overlay ignored");
            return;
        };
        if let Some(listener) = record.listener {
            dom.unlisten(listener);
        }
        record.handle.destroy(dom);
        info!(%id, remaining = self.registry.len(), "overlay deleted");
    }

    /// Re-run alignment for every overlay against the live host box.
    pub fn realign(&mut self, dom: &D) {
        let host = self.host(dom);
        for record in self.registry.iter() {
            align(dom, record.handle.root(), host, &record.config);
        }
        debug!(wrapper = self.wrapper.0, count = self.registry.len(), "overlays realigned");
    }

    /// Destroy every overlay and unbind every listener.
    pub fn detach(&mut self, dom: &D) {
        for listener in self.listeners.drain(..) {
            dom.unlisten(listener);
        }
        let mut destroyed = 0usize;
        for record in self.registry.drain() {
            if let Some(listener) = record.listener {
                dom.unlisten(listener);
            }
            record.handle.destroy(dom);
            destroyed += 1;
        }
        info!(wrapper = self.wrapper.0, destroyed, "overlay host detached");
    }
}

/// Reset the backing node, then apply z-index, positioning, and the backdrop
/// or caller classes.
fn apply_styles<D: Dom>(dom: &D, settings: &OverlaySettings, node: NodeId, host: NodeId, config: &OverlayConfig) {
    dom.set_attribute(node, "class", "");
    dom.set_attribute(node, "style", "");

    let z_index = config
        .z_index
        .unwrap_or_else(|| host_z_index(dom, host, settings.default_host_z_index).saturating_add(1));
    dom.set_style(node, "z-index", &z_index.to_string());
    dom.set_style(node, "position", if config.window { "fixed" } else { "absolute" });

    match &config.classes {
        Some(classes) => {
            for class in classes {
                dom.add_class(node, class);
            }
        }
        None => dom.set_style(node, "background-color", &settings.backdrop),
    }
}

fn host_z_index<D: Dom>(dom: &D, host: NodeId, fallback: i64) -> i64 {
    match dom.inline_style(host, "z-index").map(|z| z.trim().parse::<i64>()) {
        Some(Ok(z)) => z,
        _ => fallback,
    }
}

/// Write the overlay's geometry.
fn align<D: Dom>(dom: &D, node: NodeId, host: NodeId, config: &OverlayConfig) {
    if config.window {
        for (property, value) in window_styles(&config.position) {
            dom.set_style(node, property, &value);
        }
        return;
    }
    let target = resolve_box(&config.position, dom.offset_box(host));
    dom.set_style(node, "top", &px(target.top));
    dom.set_style(node, "left", &px(target.left));
    dom.set_style(node, "width", &px(target.width));
    dom.set_style(node, "height", &px(target.height));
}
