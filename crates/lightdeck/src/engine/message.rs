//! Outbound message types.
//!
//! Split by consumer:
//! - `ServiceCall`: light commands for the external control service
//! - `Notification`: one-way UI requests for the host dashboard

use serde::Deserialize;
use serde::Serialize;

use crate::color::Rgb;

/// Addressee of a service call: one entity, or a batch of group members.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Target {
    Entity(String),
    Entities(Vec<String>),
}

impl Target {
    pub fn ids(&self) -> Vec<&str> {
        match self {
            Target::Entity(id) => vec![id.as_str()],
            Target::Entities(ids) => ids.iter().map(String::as_str).collect(),
        }
    }

    pub fn is_empty(&self) -> bool {
        match self {
            Target::Entity(id) => id.is_empty(),
            Target::Entities(ids) => ids.is_empty(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, strum::Display, strum::AsRefStr)]
#[strum(serialize_all = "snake_case")]
pub enum ServiceAction {
    TurnOn,
    TurnOff,
}

/// A `light.*` service request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "service", rename_all = "snake_case")]
pub enum ServiceCall {
    TurnOn {
        entity_id: Target,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        brightness_pct: Option<u8>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        rgb_color: Option<Rgb>,
    },
    TurnOff {
        entity_id: Target,
    },
}

impl ServiceCall {
    /// Plain on/off toggle without brightness or colour.
    pub fn toggle(entity_id: Target, currently_on: bool) -> Self {
        if currently_on {
            ServiceCall::TurnOff { entity_id }
        } else {
            ServiceCall::TurnOn {
                entity_id,
                brightness_pct: None,
                rgb_color: None,
            }
        }
    }

    pub fn domain(&self) -> &'static str {
        "light"
    }

    pub fn action(&self) -> ServiceAction {
        match self {
            ServiceCall::TurnOn { .. } => ServiceAction::TurnOn,
            ServiceCall::TurnOff { .. } => ServiceAction::TurnOff,
        }
    }

    pub fn target(&self) -> &Target {
        match self {
            ServiceCall::TurnOn { entity_id, .. } | ServiceCall::TurnOff { entity_id } => entity_id,
        }
    }
}

/// UI requests for the host dashboard.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Notification {
    /// Open the host's details dialog for an entity.
    ShowDetails { entity_id: String },
}
