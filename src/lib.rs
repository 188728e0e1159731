//! Overlay positioning and interactive element resizing for DOM-rendered UIs.
//!
//! Two independent controllers sit on top of a small host abstraction
//! ([`dom::Dom`]). The overlay controller listens for bubbling `overlayEvent`s
//! under a wrapper node, keeps a registry of live overlays, renders each one
//! through a caller-supplied factory, and positions it against the host box.
//! The resize controller turns one element into a drag-resizable box with a
//! three-state pointer machine.
//!
//! The crate compiles to WebAssembly with the `web` feature, which adds a
//! `web-sys` host. Without it, [`headless::HeadlessDom`] provides an in-memory
//! tree used by the tests and by non-browser embedders.
//!
//! ## Module layout
//!
//! | Module | Role |
//! |--------|------|
//! | [`overlay`] | Event-driven overlay orchestration ([`overlay::OverlayController`]) |
//! | [`registry`] | Ordered store of live overlay records and id generation |
//! | [`config`] | Overlay event detail, overlay config, and their validation |
//! | [`geometry`] | Position specs and box resolution (pure) |
//! | [`render`] | Render factory and handle traits, plus a tag-based factory |
//! | [`resizable`] | Per-element resize controller ([`resizable::ResizeController`]) |
//! | [`resize`] | Resize state machine, hit testing, and drag math (pure) |
//! | [`dom`] | Host capabilities, node handles, and events |
//! | [`headless`] | In-memory [`dom::Dom`] implementation |
//! | `web` | Browser [`dom::Dom`] implementation (feature `web`) |
//! | [`settings`] | Runtime tunables with environment overrides |
//! | [`consts`] | Event names, default styles, and tolerances |

pub mod config;
pub mod consts;
pub mod dom;
pub mod geometry;
pub mod headless;
pub mod overlay;
pub mod registry;
pub mod render;
pub mod resizable;
pub mod resize;
pub mod settings;
#[cfg(feature = "web")]
pub mod web;
