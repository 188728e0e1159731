//! Geometry resolution: position specs, boxes, and the formulas that place an
//! overlay against its host.
//!
//! Everything here is pure. Callers hand in the host box they measured and get
//! back pixel offsets and sizes; nothing touches the DOM.
//!
//! A position spec is one of:
//!
//! | Form | Example | Meaning |
//! |------|---------|---------|
//! | pixels | `"10px"` | absolute length |
//! | percent | `"50%"` | fraction of the host extent |
//! | margin | `"10px, 5px"` | offset plus an extra pixel margin (offsets only) |
//! | center | `"center"` | centered on the host axis (offsets only) |
//! | number | `12` or `"12"` | already-resolved pixels |
//!
//! Anything else falls back to the host value rather than failing.

#[cfg(test)]
#[path = "geometry_test.rs"]
mod geometry_test;

use serde::{Deserialize, Serialize};

/// A point in viewport (client) coordinates.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    #[must_use]
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

/// An axis-aligned box in pixels.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Rect {
    pub top: f64,
    pub left: f64,
    pub width: f64,
    pub height: f64,
}

impl Rect {
    #[must_use]
    pub fn new(top: f64, left: f64, width: f64, height: f64) -> Self {
        Self { top, left, width, height }
    }

    /// Far horizontal edge.
    #[must_use]
    pub fn right(&self) -> f64 {
        self.left + self.width
    }

    /// Far vertical edge.
    #[must_use]
    pub fn bottom(&self) -> f64 {
        self.top + self.height
    }

    /// Whether `x` lies within the horizontal span, edges included.
    #[must_use]
    pub fn spans_x(&self, x: f64) -> bool {
        self.left <= x && x <= self.right()
    }

    /// Whether `y` lies within the vertical span, edges included.
    #[must_use]
    pub fn spans_y(&self, y: f64) -> bool {
        self.top <= y && y <= self.bottom()
    }
}

// =============================================================================
// POSITION SPEC
// =============================================================================

/// Unit of a length spec.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Unit {
    Px,
    Percent,
}

/// A parsed position spec.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PositionSpec {
    /// Centered on the host axis.
    Center,
    /// A length with an optional trailing pixel margin.
    Length { value: f64, unit: Unit, margin: f64 },
}

impl PositionSpec {
    /// Parse an offset spec: `center`, `<n>px`, `<n>%`, optionally followed by
    /// `, <m>px`. Values may be negative.
    #[must_use]
    pub fn parse_offset(raw: &str) -> Option<Self> {
        if raw == "center" {
            return Some(Self::Center);
        }
        let (head, tail) = match raw.split_once(',') {
            Some((head, tail)) => (head.trim_end_matches(' '), Some(tail.trim_start_matches(' '))),
            None => (raw, None),
        };
        let (value, unit) = parse_length(head, true)?;
        let margin = match tail {
            Some(tail) => parse_number(tail.strip_suffix("px")?, true)?,
            None => 0.0,
        };
        Some(Self::Length { value, unit, margin })
    }

    /// Parse a size spec: a non-negative `<n>px` or `<n>%`.
    #[must_use]
    pub fn parse_size(raw: &str) -> Option<Self> {
        let (value, unit) = parse_length(raw, false)?;
        Some(Self::Length { value, unit, margin: 0.0 })
    }
}

fn parse_length(raw: &str, signed: bool) -> Option<(f64, Unit)> {
    if let Some(number) = raw.strip_suffix("px") {
        return Some((parse_number(number, signed)?, Unit::Px));
    }
    let number = raw.strip_suffix('%')?;
    Some((parse_number(number, signed)?, Unit::Percent))
}

/// Strict decimal: optional `-`, digits, optional `.` and more digits.
fn parse_number(raw: &str, signed: bool) -> Option<f64> {
    let digits = match raw.strip_prefix('-') {
        Some(rest) if signed => rest,
        Some(_) => return None,
        None => raw,
    };
    let (int, frac) = match digits.split_once('.') {
        Some((int, frac)) => (int, Some(frac)),
        None => (digits, None),
    };
    let all_digits = |s: &str| !s.is_empty() && s.bytes().all(|b| b.is_ascii_digit());
    if !all_digits(int) || frac.is_some_and(|f| !all_digits(f)) {
        return None;
    }
    match raw.parse::<f64>() {
        Ok(n) => Some(n),
        Err(_) => None,
    }
}

// =============================================================================
// RESOLUTION
// =============================================================================

/// Resolve a size spec against the container extent.
///
/// Unmatched specs pass the container size through unchanged.
#[must_use]
pub fn resolve_size(spec: &str, container: f64) -> f64 {
    match PositionSpec::parse_size(spec) {
        Some(PositionSpec::Length { value, unit: Unit::Px, .. }) => value,
        Some(PositionSpec::Length { value, unit: Unit::Percent, .. }) => container * value / 100.0,
        _ => container,
    }
}

/// Resolve an offset spec along one axis.
///
/// `extent` is the already-resolved overlay size on this axis. `inverted`
/// anchors from the far edge (used for `bottom` and `right`). Unmatched specs
/// return `host_offset`.
#[must_use]
pub fn resolve_offset(spec: &str, extent: f64, host_offset: f64, host_extent: f64, inverted: bool) -> f64 {
    let Some(parsed) = PositionSpec::parse_offset(spec) else {
        return host_offset;
    };
    match parsed {
        PositionSpec::Center => host_offset + (host_extent - extent) / 2.0,
        PositionSpec::Length { value, unit, margin } => {
            let distance = match unit {
                Unit::Px => value,
                Unit::Percent => host_extent * value / 100.0,
            };
            if inverted {
                host_offset + host_extent - extent - distance - margin
            } else {
                host_offset + distance + margin
            }
        }
    }
}

// =============================================================================
// POSITION VALUES
// =============================================================================

/// A single position field as supplied by the caller.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PositionValue {
    /// Already-resolved pixels.
    Number(f64),
    /// A spec string, or a numeric string treated as pixels.
    Text(String),
}

impl PositionValue {
    /// The numeric value, if this is a number or a string that reads as one.
    #[must_use]
    pub fn as_number(&self) -> Option<f64> {
        match self {
            Self::Number(n) => Some(*n),
            Self::Text(text) => {
                let trimmed = text.trim();
                if trimmed.is_empty() {
                    return None;
                }
                match trimmed.parse::<f64>() {
                    Ok(n) if n.is_finite() => Some(n),
                    _ => None,
                }
            }
        }
    }

    /// Resolve as a size against the host extent.
    #[must_use]
    pub fn size(&self, host_extent: f64) -> f64 {
        match (self.as_number(), self) {
            (Some(n), _) => n,
            (None, Self::Text(spec)) => resolve_size(spec, host_extent),
            (None, Self::Number(_)) => host_extent,
        }
    }

    /// Resolve as an offset; numbers behave like a `px` spec with no margin.
    #[must_use]
    pub fn offset(&self, extent: f64, host_offset: f64, host_extent: f64, inverted: bool) -> f64 {
        match (self.as_number(), self) {
            (Some(n), _) if inverted => host_offset + host_extent - extent - n,
            (Some(n), _) => host_offset + n,
            (None, Self::Text(spec)) => resolve_offset(spec, extent, host_offset, host_extent, inverted),
            (None, Self::Number(_)) => host_offset,
        }
    }

    /// CSS value for window-anchored overlays: numbers get `px`, text is verbatim.
    #[must_use]
    pub fn css(&self) -> String {
        match (self.as_number(), self) {
            (Some(n), _) => format!("{n}px"),
            (None, Self::Text(text)) => text.clone(),
            (None, Self::Number(n)) => format!("{n}px"),
        }
    }
}

impl From<f64> for PositionValue {
    fn from(value: f64) -> Self {
        Self::Number(value)
    }
}

impl From<&str> for PositionValue {
    fn from(value: &str) -> Self {
        Self::Text(value.to_string())
    }
}

/// The optional placement fields of an overlay.
///
/// `top` wins over `bottom` and `left` wins over `right` when both are given.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PositionSet {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub top: Option<PositionValue>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bottom: Option<PositionValue>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub left: Option<PositionValue>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub right: Option<PositionValue>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub width: Option<PositionValue>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub height: Option<PositionValue>,
}

/// Resolve a full overlay box against the host box.
///
/// Sizes are resolved first since the far-edge and center formulas need them.
/// Fields that are absent keep the host's value.
#[must_use]
pub fn resolve_box(position: &PositionSet, host: Rect) -> Rect {
    let width = position.width.as_ref().map_or(host.width, |w| w.size(host.width));
    let height = position.height.as_ref().map_or(host.height, |h| h.size(host.height));

    let top = match (&position.top, &position.bottom) {
        (Some(top), _) => top.offset(height, host.top, host.height, false),
        (None, Some(bottom)) => bottom.offset(height, host.top, host.height, true),
        (None, None) => host.top,
    };
    let left = match (&position.left, &position.right) {
        (Some(left), _) => left.offset(width, host.left, host.width, false),
        (None, Some(right)) => right.offset(width, host.left, host.width, true),
        (None, None) => host.left,
    };

    Rect { top, left, width, height }
}

/// Style declarations for a window-anchored overlay.
///
/// Only present fields are emitted; no box math is involved.
#[must_use]
pub fn window_styles(position: &PositionSet) -> Vec<(&'static str, String)> {
    let mut styles = Vec::new();
    match (&position.top, &position.bottom) {
        (Some(top), _) => styles.push(("top", top.css())),
        (None, Some(bottom)) => styles.push(("bottom", bottom.css())),
        (None, None) => {}
    }
    match (&position.left, &position.right) {
        (Some(left), _) => styles.push(("left", left.css())),
        (None, Some(right)) => styles.push(("right", right.css())),
        (None, None) => {}
    }
    if let Some(width) = &position.width {
        styles.push(("width", width.css()));
    }
    if let Some(height) = &position.height {
        styles.push(("height", height.css()));
    }
    styles
}

/// Format a pixel length for a style declaration.
#[must_use]
pub fn px(value: f64) -> String {
    format!("{value}px")
}
