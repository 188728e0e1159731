//! Overlay event schema: the payload of an `overlayEvent` and the config it
//! carries.
//!
//! The detail arrives either built in Rust (with the builder methods below) or
//! as JSON from the page, in which case [`OverlayEventDetail::from_json`]
//! validates it once at the boundary. Controllers only ever see the typed form.

#[cfg(test)]
#[path = "config_test.rs"]
mod config_test;

use std::fmt;
use std::rc::Rc;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::geometry::PositionSet;

// =============================================================================
// ERRORS
// =============================================================================

#[derive(Debug, thiserror::Error)]
pub enum DetailError {
    #[error("malformed overlay detail: {0}")]
    Malformed(#[from] serde_json::Error),
    #[error("overlay detail has no action")]
    MissingAction,
    #[error("unknown overlay action: {0}")]
    UnknownAction(String),
    #[error("overlay create needs a component")]
    MissingComponent,
    #[error("overlay {0} needs an id")]
    MissingId(OverlayAction),
    #[error("overlay id already registered: {0}")]
    DuplicateId(String),
}

// =============================================================================
// ACTION
// =============================================================================

/// Command carried by an overlay event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OverlayAction {
    Create,
    Update,
    Delete,
}

impl FromStr for OverlayAction {
    type Err = DetailError;

    /// Case-insensitive.
    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        match raw.to_uppercase().as_str() {
            "CREATE" => Ok(Self::Create),
            "UPDATE" => Ok(Self::Update),
            "DELETE" => Ok(Self::Delete),
            _ => Err(DetailError::UnknownAction(raw.to_string())),
        }
    }
}

impl fmt::Display for OverlayAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Create => "CREATE",
            Self::Update => "UPDATE",
            Self::Delete => "DELETE",
        };
        f.write_str(name)
    }
}

// =============================================================================
// CONFIG
// =============================================================================

/// Names the component an overlay hosts. The render factory resolves it.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ComponentRef(pub String);

impl ComponentRef {
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.0
    }
}

/// Hook on the code that requested an overlay, called once it is rendered.
pub trait OverlayCallback {
    fn overlay_handler_callback(&self, config: &OverlayConfig);
}

/// Shared reference to the requester's [`OverlayCallback`].
#[derive(Clone)]
pub struct CallerRef(pub Rc<dyn OverlayCallback>);

impl fmt::Debug for CallerRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("CallerRef")
    }
}

/// Caller-supplied description of one overlay.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OverlayConfig {
    /// Registry key; assigned on create when absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub component: Option<ComponentRef>,
    /// Fixed to the window instead of positioned against the host.
    #[serde(default)]
    pub window: bool,
    #[serde(default)]
    pub position: PositionSet,
    /// Classes that replace the default backdrop.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub classes: Option<Vec<String>>,
    /// Integer, integral float, or numeric string; anything else is unset.
    #[serde(default, skip_serializing_if = "Option::is_none", deserialize_with = "lenient_z_index")]
    pub z_index: Option<i64>,
    /// Routing key matched against a controller's subject filter.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subject: Option<String>,
    /// Keep bubbling after being handled so stacked hosts see the event too.
    #[serde(default)]
    pub multilayer: bool,
    #[serde(skip)]
    pub caller: Option<CallerRef>,
}

fn lenient_z_index<'de, D: serde::Deserializer<'de>>(deserializer: D) -> Result<Option<i64>, D::Error> {
    let raw = Option::<serde_json::Value>::deserialize(deserializer)?;
    Ok(raw.as_ref().and_then(z_index_from_value))
}

fn z_index_from_value(value: &serde_json::Value) -> Option<i64> {
    match value {
        serde_json::Value::Number(number) => number.as_i64().or_else(|| integral(number.as_f64()?)),
        serde_json::Value::String(text) => {
            let text = text.trim();
            match text.parse::<i64>() {
                Ok(z) => Some(z),
                Err(_) => match text.parse::<f64>() {
                    Ok(float) => integral(float),
                    Err(_) => None,
                },
            }
        }
        _ => None,
    }
}

/// `2.0` is 2; fractions and out-of-range values are rejected.
#[allow(clippy::cast_possible_truncation)]
fn integral(value: f64) -> Option<i64> {
    const LIMIT: f64 = 9_007_199_254_740_992.0;
    (value.fract() == 0.0 && value.abs() <= LIMIT).then_some(value as i64)
}

// =============================================================================
// EVENT DETAIL
// =============================================================================

/// Payload of an `overlayEvent`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct OverlayEventDetail {
    /// Raw action string; parsed with [`OverlayEventDetail::parsed_action`].
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub action: Option<String>,
    #[serde(flatten)]
    pub config: OverlayConfig,
}

impl OverlayEventDetail {
    /// Validate a JSON detail object.
    ///
    /// # Errors
    ///
    /// Returns `Malformed` if the value does not match the schema.
    pub fn from_json(value: &serde_json::Value) -> Result<Self, DetailError> {
        Ok(Self::deserialize(value)?)
    }

    /// Detail with only an action set.
    #[must_use]
    pub fn action(action: impl Into<String>) -> Self {
        Self { action: Some(action.into()), config: OverlayConfig::default() }
    }

    /// CREATE for `component`.
    #[must_use]
    pub fn create(component: impl Into<String>) -> Self {
        let mut detail = Self::action("CREATE");
        detail.config.component = Some(ComponentRef::new(component));
        detail
    }

    /// UPDATE of overlay `id`.
    #[must_use]
    pub fn update(id: impl Into<String>) -> Self {
        Self::action("UPDATE").with_id(id)
    }

    /// DELETE of overlay `id`.
    #[must_use]
    pub fn delete(id: impl Into<String>) -> Self {
        Self::action("DELETE").with_id(id)
    }

    #[must_use]
    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.config.id = Some(id.into());
        self
    }

    #[must_use]
    pub fn with_position(mut self, position: PositionSet) -> Self {
        self.config.position = position;
        self
    }

    #[must_use]
    pub fn with_classes<I, S>(mut self, classes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.config.classes = Some(classes.into_iter().map(Into::into).collect());
        self
    }

    #[must_use]
    pub fn with_z_index(mut self, z_index: i64) -> Self {
        self.config.z_index = Some(z_index);
        self
    }

    #[must_use]
    pub fn with_subject(mut self, subject: impl Into<String>) -> Self {
        self.config.subject = Some(subject.into());
        self
    }

    #[must_use]
    pub fn with_caller(mut self, caller: Rc<dyn OverlayCallback>) -> Self {
        self.config.caller = Some(CallerRef(caller));
        self
    }

    #[must_use]
    pub fn anchored_to_window(mut self) -> Self {
        self.config.window = true;
        self
    }

    #[must_use]
    pub fn multilayer(mut self) -> Self {
        self.config.multilayer = true;
        self
    }

    /// The action, upper-cased and checked.
    ///
    /// # Errors
    ///
    /// Returns `MissingAction` or `UnknownAction`.
    pub fn parsed_action(&self) -> Result<OverlayAction, DetailError> {
        self.action.as_deref().ok_or(DetailError::MissingAction)?.parse()
    }

    /// The target id, required for UPDATE and DELETE.
    ///
    /// # Errors
    ///
    /// Returns `MissingId` if the detail names no overlay.
    pub fn require_id(&self, action: OverlayAction) -> Result<&str, DetailError> {
        self.config.id.as_deref().ok_or(DetailError::MissingId(action))
    }
}
