//! Resize model: states, borders, options, and the pure math behind a drag.
//!
//! This module has no DOM access. [`ResizeMachine`] holds the state and the
//! selected border and turns pointer input into [`Step`]s; [`hit_test`] finds
//! the border under the pointer; [`drag`] turns a pointer position during a
//! drag into the candidate geometry and the style declarations that survive
//! the configured constraints. `crate::resizable` wires these to a live node.

#[cfg(test)]
#[path = "resize_test.rs"]
mod resize_test;

use serde::{Deserialize, Serialize};

use crate::dom::PointerKind;
use crate::geometry::{Point, Rect, px};
use crate::settings::ResizeSettings;

// =============================================================================
// STATE
// =============================================================================

/// Interaction state of a resizable element.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ResizeState {
    /// Idle, watching for the pointer to approach an active edge.
    #[default]
    Resizable,
    /// Pointer is over an active edge.
    Selected,
    /// Edge is being dragged.
    Resizing,
}

impl ResizeState {
    /// Cursor shown on entering this state.
    #[must_use]
    pub fn cursor(self) -> &'static str {
        match self {
            Self::Resizable => "auto",
            Self::Selected => "grab",
            Self::Resizing => "grabbing",
        }
    }

    /// Border style drawn on the selected edge on entering this state.
    #[must_use]
    pub fn border_style(self, settings: &ResizeSettings) -> &str {
        match self {
            Self::Resizable => &settings.idle_border,
            Self::Selected => &settings.selected_border,
            Self::Resizing => &settings.resizing_border,
        }
    }
}

/// Edge of the element under interaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Border {
    Top,
    Left,
    Right,
    Bottom,
    #[default]
    None,
}

impl Border {
    /// Style property for this edge's border.
    #[must_use]
    pub fn style_property(self) -> Option<&'static str> {
        match self {
            Self::Top => Some("border-top"),
            Self::Left => Some("border-left"),
            Self::Right => Some("border-right"),
            Self::Bottom => Some("border-bottom"),
            Self::None => None,
        }
    }
}

// =============================================================================
// OPTIONS
// =============================================================================

/// Unit an active edge writes its new geometry in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EdgeUnit {
    #[serde(rename = "px")]
    Px,
    #[serde(rename = "%")]
    Percent,
}

impl EdgeUnit {
    /// Style value for `value` pixels. Percentages need the parent extent.
    #[must_use]
    pub fn css(self, value: f64, parent_extent: Option<f64>) -> Option<String> {
        match self {
            Self::Px => Some(px(value)),
            Self::Percent => parent_extent
                .filter(|extent| *extent > 0.0)
                .map(|extent| format!("{}%", value * 100.0 / extent)),
        }
    }
}

/// Per-element resize options. Edges left `None` are not resizable.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResizableConfig {
    #[serde(default)]
    pub top: Option<EdgeUnit>,
    #[serde(default)]
    pub left: Option<EdgeUnit>,
    #[serde(default)]
    pub right: Option<EdgeUnit>,
    #[serde(default)]
    pub bottom: Option<EdgeUnit>,
    /// Snap granularity for right-edge drags.
    #[serde(default)]
    pub width_delta_px: Option<f64>,
    /// Snap granularity for bottom-edge drags.
    #[serde(default)]
    pub height_delta_px: Option<f64>,
    #[serde(default)]
    pub max_width_px: Option<f64>,
    #[serde(default)]
    pub max_height_px: Option<f64>,
    /// Max width as a percentage of the parent width.
    #[serde(default)]
    pub max_width_ratio: Option<f64>,
    /// Max height as a percentage of the parent height.
    #[serde(default)]
    pub max_height_ratio: Option<f64>,
    /// Keep the pointer inside the parent horizontally while dragging.
    #[serde(default)]
    pub parent_width_limit: bool,
    /// Keep the pointer inside the parent vertically while dragging.
    #[serde(default)]
    pub parent_height_limit: bool,
}

/// Right and bottom edges in pixels, contained by the parent.
impl Default for ResizableConfig {
    fn default() -> Self {
        Self {
            top: None,
            left: None,
            right: Some(EdgeUnit::Px),
            bottom: Some(EdgeUnit::Px),
            width_delta_px: None,
            height_delta_px: None,
            max_width_px: None,
            max_height_px: None,
            max_width_ratio: None,
            max_height_ratio: None,
            parent_width_limit: true,
            parent_height_limit: true,
        }
    }
}

impl ResizableConfig {
    /// Parse options from JSON.
    ///
    /// # Errors
    ///
    /// Returns the deserialization error if the value does not match.
    pub fn from_json(value: &serde_json::Value) -> Result<Self, serde_json::Error> {
        Self::deserialize(value)
    }

    /// Unit of `border`, or `None` if that edge is not active.
    #[must_use]
    pub fn unit(&self, border: Border) -> Option<EdgeUnit> {
        match border {
            Border::Top => self.top,
            Border::Left => self.left,
            Border::Right => self.right,
            Border::Bottom => self.bottom,
            Border::None => None,
        }
    }
}

// =============================================================================
// STATE MACHINE
// =============================================================================

/// A state change and the edge whose border it restyles.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Step {
    pub from: ResizeState,
    pub to: ResizeState,
    /// Edge selected when the step was taken; `None` means no style change.
    pub border: Border,
}

/// State plus selected border. `border` is `None` whenever `state` is
/// `Resizable`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ResizeMachine {
    state: ResizeState,
    border: Border,
}

impl ResizeMachine {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn state(&self) -> ResizeState {
        self.state
    }

    #[must_use]
    pub fn border(&self) -> Border {
        self.border
    }

    /// Feed an element-scoped pointer event. `hit` is the border under the
    /// pointer. Returns the step taken, if any.
    pub fn element_event(&mut self, kind: PointerKind, hit: Border) -> Option<Step> {
        match (self.state, kind) {
            (ResizeState::Resizable, PointerKind::Move | PointerKind::Enter | PointerKind::Leave) => {
                if hit == Border::None {
                    return None;
                }
                self.border = hit;
                Some(self.change(ResizeState::Selected))
            }
            (ResizeState::Selected, PointerKind::Leave) => Some(self.change(ResizeState::Resizable)),
            (ResizeState::Selected, PointerKind::Move | PointerKind::Enter) if hit != self.border => {
                Some(self.change(ResizeState::Resizable))
            }
            (ResizeState::Selected, PointerKind::Down) => Some(self.change(ResizeState::Resizing)),
            _ => None,
        }
    }

    /// Feed a window-scoped pointer release. Only meaningful while resizing.
    pub fn release(&mut self, hit: Border) -> Option<Step> {
        if self.state != ResizeState::Resizing {
            return None;
        }
        let next = if hit == self.border { ResizeState::Selected } else { ResizeState::Resizable };
        Some(self.change(next))
    }

    fn change(&mut self, to: ResizeState) -> Step {
        let step = Step { from: self.state, to, border: self.border };
        self.state = to;
        if to == ResizeState::Resizable {
            self.border = Border::None;
        }
        step
    }
}

// =============================================================================
// GEOMETRY
// =============================================================================

/// Geometry snapshot taken by the controller and used until the next capture.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Capture {
    /// Element border box in viewport coordinates.
    pub rect: Rect,
    /// Container ancestor box, if the element has one.
    pub parent: Option<Rect>,
    /// Element's own top offset as written in its style.
    pub top: f64,
    /// Element's own left offset as written in its style.
    pub left: f64,
}

/// Geometry emitted to observers on every drag frame.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ResizeFrame {
    pub x: f64,
    pub y: f64,
    pub w: f64,
    pub h: f64,
}

/// What observers of a resizable element receive.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ResizeEvent {
    StateChanged(ResizeState),
    Resized(ResizeFrame),
}

/// Result of one drag frame.
#[derive(Debug, Clone, PartialEq)]
pub struct DragOutcome {
    /// Candidate geometry, emitted whether or not the styles were accepted.
    pub frame: ResizeFrame,
    /// Style declarations to write; empty when the constraints reject the frame.
    pub styles: Vec<(&'static str, String)>,
}

/// Which active border the pointer is on. Priority: top, left, right, bottom.
#[must_use]
pub fn hit_test(rect: Rect, at: Point, config: &ResizableConfig, tolerance: f64) -> Border {
    let near = |edge: f64, pointer: f64| (edge - pointer).abs() <= tolerance;
    if config.top.is_some() && near(rect.top, at.y) {
        Border::Top
    } else if config.left.is_some() && near(rect.left, at.x) {
        Border::Left
    } else if config.right.is_some() && near(rect.right(), at.x) {
        Border::Right
    } else if config.bottom.is_some() && near(rect.bottom(), at.y) {
        Border::Bottom
    } else {
        Border::None
    }
}

/// Snap `value` to a multiple of `delta`, rounding up only when the remainder
/// exceeds `round_up_fraction` of the delta.
#[must_use]
pub fn adjust_extent(value: f64, delta: Option<f64>, round_up_fraction: f64) -> f64 {
    match delta {
        Some(delta) if delta > 0.0 => {
            let remainder = value % delta;
            if remainder > delta * round_up_fraction {
                value - remainder + delta
            } else {
                value - remainder
            }
        }
        _ => value,
    }
}

#[derive(Debug, Clone, Copy)]
enum Axis {
    Horizontal,
    Vertical,
}

impl Axis {
    fn extent(self, rect: Rect) -> f64 {
        match self {
            Self::Horizontal => rect.width,
            Self::Vertical => rect.height,
        }
    }

    fn spans(self, rect: Rect, at: Point) -> bool {
        match self {
            Self::Horizontal => rect.spans_x(at.x),
            Self::Vertical => rect.spans_y(at.y),
        }
    }
}

/// Size limit in the edge's unit, plus parent containment of the pointer.
fn within_limits(config: &ResizableConfig, capture: &Capture, axis: Axis, unit: EdgeUnit, size: f64, at: Point) -> bool {
    let (max_px, max_ratio, parent_limit) = match axis {
        Axis::Horizontal => (config.max_width_px, config.max_width_ratio, config.parent_width_limit),
        Axis::Vertical => (config.max_height_px, config.max_height_ratio, config.parent_height_limit),
    };
    let size_ok = match unit {
        EdgeUnit::Px => max_px.is_none_or(|max| size <= max),
        EdgeUnit::Percent => match (max_ratio, capture.parent.map(|p| axis.extent(p))) {
            (Some(max), Some(extent)) if extent > 0.0 => size * 100.0 / extent <= max,
            _ => true,
        },
    };
    let contained = !parent_limit || capture.parent.is_none_or(|parent| axis.spans(parent, at));
    size_ok && contained
}

/// Compute one drag frame for `border` with the pointer at `at`.
///
/// Near edges (top, left) move the offset with the pointer and shrink or grow
/// the size so the far edge stays put. Far edges (right, bottom) size from the
/// element origin and snap to the configured delta.
#[must_use]
pub fn drag(config: &ResizableConfig, capture: &Capture, border: Border, at: Point, round_up_fraction: f64) -> DragOutcome {
    let rect = capture.rect;
    let mut frame = ResizeFrame { x: rect.left, y: rect.top, w: rect.width, h: rect.height };
    let mut styles = Vec::new();
    let Some(unit) = config.unit(border) else {
        return DragOutcome { frame, styles };
    };
    let parent_width = capture.parent.map(|p| p.width);
    let parent_height = capture.parent.map(|p| p.height);

    let mut write = |property: &'static str, value: f64, parent_extent: Option<f64>| {
        if let Some(css) = unit.css(value, parent_extent) {
            styles.push((property, css));
        }
    };

    match border {
        Border::Top => {
            let moved = at.y - rect.top;
            frame.y = capture.top + moved;
            frame.h = rect.height - moved;
            if within_limits(config, capture, Axis::Vertical, unit, frame.h, at) {
                write("top", frame.y, parent_height);
                write("height", frame.h, parent_height);
            }
        }
        Border::Left => {
            let moved = at.x - rect.left;
            frame.x = capture.left + moved;
            frame.w = rect.width - moved;
            if within_limits(config, capture, Axis::Horizontal, unit, frame.w, at) {
                write("left", frame.x, parent_width);
                write("width", frame.w, parent_width);
            }
        }
        Border::Right => {
            frame.w = adjust_extent(at.x - rect.left, config.width_delta_px, round_up_fraction);
            if within_limits(config, capture, Axis::Horizontal, unit, frame.w, at) {
                write("width", frame.w, parent_width);
            }
        }
        Border::Bottom => {
            frame.h = adjust_extent(at.y - rect.top, config.height_delta_px, round_up_fraction);
            if within_limits(config, capture, Axis::Vertical, unit, frame.h, at) {
                write("height", frame.h, parent_height);
            }
        }
        Border::None => {}
    }

    DragOutcome { frame, styles }
}
