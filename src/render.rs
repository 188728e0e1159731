//! Render-handle capability: how an overlay's component gets a DOM subtree.
//!
//! The overlay controller does not know how components are instantiated. It
//! asks a [`RenderFactory`] for a handle, mounts nothing itself, and later
//! tells the handle to destroy its subtree. [`TagFactory`] is the stock
//! factory: each component becomes a custom element (`<app-dialog>`) inside a
//! `div` backing node that the controller positions.

#[cfg(test)]
#[path = "render_test.rs"]
mod render_test;

use std::collections::{BTreeSet, HashMap};
use std::rc::Rc;

use crate::config::{ComponentRef, OverlayConfig};
use crate::dom::{Dom, NodeId};

#[derive(Debug, thiserror::Error)]
pub enum RenderError {
    #[error("unknown component: {0}")]
    UnknownComponent(String),
    #[error("host refused to create an element for {0}")]
    Host(String),
}

/// Creates isolated render subtrees for components.
pub trait RenderFactory<D: Dom> {
    type Handle: RenderHandle<D>;

    /// Materialize `component` under `parent`.
    ///
    /// # Errors
    ///
    /// Returns a [`RenderError`] when the component cannot be rendered.
    fn create(&mut self, dom: &D, component: &ComponentRef, parent: NodeId) -> Result<Self::Handle, RenderError>;
}

/// A live render subtree owned by an overlay record.
pub trait RenderHandle<D: Dom> {
    /// The backing node the controller styles and positions.
    fn root(&self) -> NodeId;

    /// Hook the hosted component runs with its overlay's config. The
    /// controller calls it once, after the overlay is registered and the
    /// controller is free to take further events.
    fn config_hook(&self) -> Option<ConfigHook> {
        None
    }

    /// Tear the subtree down.
    fn destroy(self, dom: &D);
}

/// Per-component hook handed out by [`RenderHandle::config_hook`].
pub type ConfigHook = Rc<dyn Fn(&OverlayConfig)>;

/// Renders components as custom element tags.
#[derive(Default)]
pub struct TagFactory {
    allowed: Option<BTreeSet<String>>,
    hooks: HashMap<String, ConfigHook>,
}

impl TagFactory {
    /// A factory that accepts any component name.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// A factory that only renders the listed components.
    #[must_use]
    pub fn with_components<I, S>(components: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self { allowed: Some(components.into_iter().map(Into::into).collect()), hooks: HashMap::new() }
    }

    /// Register the hook a component runs when its overlay is created.
    #[must_use]
    pub fn with_hook(mut self, component: impl Into<String>, hook: impl Fn(&OverlayConfig) + 'static) -> Self {
        self.hooks.insert(component.into(), Rc::new(hook));
        self
    }

    fn accepts(&self, name: &str) -> bool {
        !name.is_empty() && self.allowed.as_ref().is_none_or(|allowed| allowed.contains(name))
    }
}

impl<D: Dom> RenderFactory<D> for TagFactory {
    type Handle = SubtreeHandle;

    fn create(&mut self, dom: &D, component: &ComponentRef, parent: NodeId) -> Result<SubtreeHandle, RenderError> {
        let name = component.name();
        if !self.accepts(name) {
            return Err(RenderError::UnknownComponent(name.to_string()));
        }
        let host_err = || RenderError::Host(name.to_string());
        let root = dom.create_element(parent, "div").ok_or_else(host_err)?;
        let Some(content) = dom.create_element(root, name) else {
            dom.remove(root);
            return Err(host_err());
        };
        Ok(SubtreeHandle { root, content, hook: self.hooks.get(name).cloned() })
    }
}

/// Handle produced by [`TagFactory`].
pub struct SubtreeHandle {
    root: NodeId,
    content: NodeId,
    hook: Option<ConfigHook>,
}

impl SubtreeHandle {
    /// The backing `div`.
    #[must_use]
    pub fn root(&self) -> NodeId {
        self.root
    }

    /// The component element inside the backing node.
    #[must_use]
    pub fn content(&self) -> NodeId {
        self.content
    }
}

impl<D: Dom> RenderHandle<D> for SubtreeHandle {
    fn root(&self) -> NodeId {
        SubtreeHandle::root(self)
    }

    fn config_hook(&self) -> Option<ConfigHook> {
        self.hook.clone()
    }

    fn destroy(self, dom: &D) {
        dom.remove(self.root);
    }
}
