use std::collections::HashMap;

use serde::Deserialize;
use serde::Serialize;

use crate::color::Rgb;

/// One entity as reported by the dashboard's state push.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct EntityState {
    /// `"on"`, `"off"`, a numeric string for sensors, or anything else
    /// (`"unavailable"`, `"unknown"`, ...).
    pub state: String,

    #[serde(default)]
    pub attributes: Attributes,
}

/// The subset of entity attributes the card reads. Unknown keys are ignored.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Attributes {
    /// Raw device brightness on the 0-255 scale.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub brightness: Option<f64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rgb_color: Option<Rgb>,

    /// Member entity ids, reported by group entities.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub entity_id: Option<Vec<String>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub friendly_name: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub icon: Option<String>,
}

/// Full state snapshot pushed by the host, keyed by entity id.
///
/// Snapshots are never mutated by the card; each push replaces the previous
/// one wholesale.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct StateSnapshot {
    entities: HashMap<String, EntityState>,
}

/// Light view derived from an [`EntityState`] on every push.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LightEntity {
    pub on: bool,

    /// 0 when off, otherwise the device brightness normalised to 0-100.
    pub brightness_pct: u8,

    /// Present only while the light is on and reports a colour.
    pub color: Option<Rgb>,
}

impl EntityState {
    pub fn new(state: impl Into<String>) -> Self {
        Self {
            state: state.into(),
            attributes: Attributes::default(),
        }
    }

    pub fn with_brightness(mut self, brightness: u8) -> Self {
        self.attributes.brightness = Some(brightness as f64);
        self
    }

    pub fn with_rgb(mut self, rgb: Rgb) -> Self {
        self.attributes.rgb_color = Some(rgb);
        self
    }

    pub fn with_members<I, S>(mut self, members: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.attributes.entity_id = Some(members.into_iter().map(Into::into).collect());
        self
    }

    pub fn with_friendly_name(mut self, name: impl Into<String>) -> Self {
        self.attributes.friendly_name = Some(name.into());
        self
    }

    pub fn is_on(&self) -> bool {
        self.state == "on"
    }

    /// Member ids reported by a group entity, empty for plain lights.
    pub fn members(&self) -> &[String] {
        self.attributes.entity_id.as_deref().unwrap_or_default()
    }

    /// The state parsed as a finite number, for sensor entities.
    pub fn numeric(&self) -> Option<f64> {
        self.state.trim().parse::<f64>().ok().filter(|v| v.is_finite())
    }
}

impl StateSnapshot {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style insert, mostly for tests and scripted sessions.
    pub fn with(mut self, entity_id: impl Into<String>, state: EntityState) -> Self {
        self.entities.insert(entity_id.into(), state);
        self
    }

    pub fn insert(&mut self, entity_id: impl Into<String>, state: EntityState) {
        self.entities.insert(entity_id.into(), state);
    }

    pub fn get(&self, entity_id: &str) -> Option<&EntityState> {
        self.entities.get(entity_id)
    }

    pub fn contains(&self, entity_id: &str) -> bool {
        self.entities.contains_key(entity_id)
    }

    pub fn light(&self, entity_id: &str) -> Option<LightEntity> {
        self.get(entity_id).map(LightEntity::from_state)
    }

    pub fn len(&self) -> usize {
        self.entities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }
}

impl FromIterator<(String, EntityState)> for StateSnapshot {
    fn from_iter<T: IntoIterator<Item = (String, EntityState)>>(iter: T) -> Self {
        Self {
            entities: iter.into_iter().collect(),
        }
    }
}

impl LightEntity {
    pub fn from_state(state: &EntityState) -> Self {
        let on = state.is_on();
        let brightness_pct = match (on, state.attributes.brightness) {
            (false, _) => 0,
            (true, Some(raw)) => brightness_to_pct(raw.round().clamp(0.0, 255.0) as u8),
            // Lights without dimming support report no brightness while on
            (true, None) => 100,
        };

        Self {
            on,
            brightness_pct,
            color: if on { state.attributes.rgb_color } else { None },
        }
    }
}

/// Normalise a 0-255 device brightness to a rounded 0-100 percentage.
///
/// Equivalent to `round(raw / 2.55)`; done in integers so it is exact.
pub fn brightness_to_pct(raw: u8) -> u8 {
    ((raw as u32 * 200 + 255) / 510) as u8
}
