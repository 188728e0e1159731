//! Shared constants for the overlay and resize layers.

// ── Events ──────────────────────────────────────────────────────

/// Name of the custom event that carries overlay commands.
pub const OVERLAY_EVENT: &str = "overlayEvent";

/// Window event fired when the viewport changes size.
pub const RESIZE_EVENT: &str = "resize";

// ── Overlays ────────────────────────────────────────────────────

/// Length of generated overlay ids.
pub const OVERLAY_ID_LEN: usize = 8;

/// Alphabet for generated overlay ids.
pub const OVERLAY_ID_ALPHABET: &[u8] = b"0123456789abcdefghijklmnopqrstuvwxyz";

/// Dim layer painted behind an overlay that brings no classes of its own.
pub const DEFAULT_BACKDROP: &str = "rgba(0,0,0,0.75)";

/// Z-index assumed for a host without an inline z-index.
pub const DEFAULT_HOST_Z_INDEX: i64 = 1;

// ── Resizing ────────────────────────────────────────────────────

/// Distance in pixels from an edge that still counts as touching it.
pub const BORDER_TOLERANCE_PX: f64 = 10.0;

/// Snap remainder, as a fraction of the delta, above which sizes round up.
pub const SNAP_ROUND_UP_FRACTION: f64 = 0.8;

/// Border drawn on an idle resizable element.
pub const IDLE_BORDER: &str = "1px orange solid";

/// Border drawn on a hovered edge.
pub const SELECTED_BORDER: &str = "5px blue solid";

/// Border drawn on the edge being dragged.
pub const RESIZING_BORDER: &str = "5px red dashed";

/// Ancestor tags that bound a resizable element.
pub const CONTAINER_TAGS: [&str; 3] = ["DIV", "SECTION", "ARTICLE"];
