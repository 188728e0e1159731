//! Runtime tunables for the overlay and resize controllers.
//!
//! DESIGN
//! ======
//! Every knob has a compiled-in default from [`crate::consts`]. Hosts that want
//! different behavior either build the struct directly or call `from_env()`,
//! which overrides individual fields from environment variables and silently
//! keeps the default for anything unset or unparseable.

#[cfg(test)]
#[path = "settings_test.rs"]
mod settings_test;

use crate::consts::{
    BORDER_TOLERANCE_PX, DEFAULT_BACKDROP, DEFAULT_HOST_Z_INDEX, IDLE_BORDER, RESIZING_BORDER, SELECTED_BORDER,
    SNAP_ROUND_UP_FRACTION,
};

// =============================================================================
// OVERLAY SETTINGS
// =============================================================================

/// Styling defaults applied by the overlay controller.
#[derive(Debug, Clone, PartialEq)]
pub struct OverlaySettings {
    /// Background painted when an overlay has no classes.
    pub backdrop: String,
    /// Z-index assumed for a host without an inline z-index.
    pub default_host_z_index: i64,
}

impl Default for OverlaySettings {
    fn default() -> Self {
        Self { backdrop: DEFAULT_BACKDROP.to_string(), default_host_z_index: DEFAULT_HOST_Z_INDEX }
    }
}

impl OverlaySettings {
    /// Defaults overridden by `OVERLAY_BACKDROP` and `OVERLAY_DEFAULT_Z_INDEX`.
    #[must_use]
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            backdrop: std::env::var("OVERLAY_BACKDROP").unwrap_or(defaults.backdrop),
            default_host_z_index: env_parse("OVERLAY_DEFAULT_Z_INDEX", defaults.default_host_z_index),
        }
    }
}

// =============================================================================
// RESIZE SETTINGS
// =============================================================================

/// Hit-testing, snapping, and border styles used by the resize controller.
#[derive(Debug, Clone, PartialEq)]
pub struct ResizeSettings {
    /// Distance in pixels from an edge that still counts as touching it.
    pub border_tolerance_px: f64,
    /// Snap remainder fraction above which sizes round up instead of down.
    pub snap_round_up_fraction: f64,
    /// Border of an idle element and of an edge returning to idle.
    pub idle_border: String,
    /// Border of a hovered edge.
    pub selected_border: String,
    /// Border of the edge being dragged.
    pub resizing_border: String,
}

impl Default for ResizeSettings {
    fn default() -> Self {
        Self {
            border_tolerance_px: BORDER_TOLERANCE_PX,
            snap_round_up_fraction: SNAP_ROUND_UP_FRACTION,
            idle_border: IDLE_BORDER.to_string(),
            selected_border: SELECTED_BORDER.to_string(),
            resizing_border: RESIZING_BORDER.to_string(),
        }
    }
}

impl ResizeSettings {
    /// Defaults overridden by `RESIZE_BORDER_TOLERANCE_PX` and `RESIZE_SNAP_ROUND_UP`.
    #[must_use]
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            border_tolerance_px: env_parse("RESIZE_BORDER_TOLERANCE_PX", defaults.border_tolerance_px),
            snap_round_up_fraction: env_parse("RESIZE_SNAP_ROUND_UP", defaults.snap_round_up_fraction),
            ..defaults
        }
    }
}

fn env_parse<T>(key: &str, default: T) -> T
where
    T: std::str::FromStr + Copy,
{
    match std::env::var(key) {
        Ok(raw) => raw.trim().parse::<T>().unwrap_or(default),
        Err(_) => default,
    }
}
