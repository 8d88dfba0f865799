//! Feedback evaluation against the state store
//!
//! Boolean feedbacks light up when the stored value matches the expected
//! one. Name and color parameters instead hand their stored text back so the
//! control can show it.

use super::catalog::{Catalog, ParamType};
use super::coordinate::{ChannelAliases, CommandOptions};
use super::store::StateStore;
use serde::{Deserialize, Serialize};

/// A feedback registered by the UI layer
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeedbackRequest {
    /// Unique ID
    pub id: String,
    /// Normalized key of the catalog entry
    pub key: String,
    /// Coordinate and expected value
    pub options: CommandOptions,
}

impl FeedbackRequest {
    /// Create a request with a fresh ID
    pub fn new(key: &str, options: CommandOptions) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            key: key.to_string(),
            options,
        }
    }
}

/// Result of evaluating a feedback
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FeedbackState {
    /// No match, or nothing known yet
    Off,
    /// Stored value equals the expected value
    On,
    /// Stored text of a name parameter
    Text(String),
    /// Stored color of a color parameter, as sent by the console
    Color(String),
}

/// Evaluate one feedback
pub fn evaluate(
    catalog: &Catalog,
    store: &StateStore,
    aliases: &ChannelAliases,
    request: &FeedbackRequest,
) -> FeedbackState {
    let Some(entry) = catalog.get(&request.key) else {
        return FeedbackState::Off;
    };
    let options = &request.options;
    let Some(x) = aliases.resolve_x(options.x) else {
        return FeedbackState::Off;
    };
    let y = options.y.unwrap_or(1);

    // Scene numbers are stored as the value of the single X slot
    let (x, expected) = match (&entry.param_type, &options.value) {
        (ParamType::Scene, _) => (1, Some(x.to_string())),
        (_, Some(value)) => (x, Some(value.to_string())),
        (_, None) => (x, options.x.map(|raw| raw.to_string())),
    };

    if !store.has_channel(&request.key, x) {
        return FeedbackState::Off;
    }

    let Some(stored) = store.query(&request.key, x, y) else {
        return FeedbackState::Off;
    };

    if expected.as_deref() == Some(stored.to_string().as_str()) {
        FeedbackState::On
    } else if catalog.is_color_command(&request.key) {
        FeedbackState::Color(stored.to_string())
    } else if catalog.is_name_command(&request.key) {
        FeedbackState::Text(stored.to_string())
    } else {
        FeedbackState::Off
    }
}
