//! Pointer gesture state machine.
//!
//! Each control is either idle (no session) or dragging (one session).
//! Movement only ever produces previews; the single commit happens on
//! release or cancel, so one gesture costs at most one service call.

use std::collections::HashMap;

use serde::Deserialize;
use serde::Serialize;

use super::message::ServiceCall;
use super::message::Target;
use super::tree::ControlKey;
use crate::color::Rgb;

/// Horizontal travel below which a press and release count as a tap.
pub const TAP_SLOP_PX: f64 = 4.0;

/// Horizontal extent of a control's track, in host pixels.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TrackBounds {
    pub left: f64,
    pub width: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct DragSession {
    /// Only the gesture controller writes this.
    pub preview_pct: u8,

    /// Colour carried into the commit so it is not reset.
    pub committed_rgb: Option<Rgb>,

    /// Whether the light was on when the gesture began.
    pub was_on: bool,

    bounds: TrackBounds,
    origin_x: f64,
    last_x: f64,
    moved: bool,
}

/// The single outcome of a finished drag.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Commit {
    pub percent: u8,
    pub was_on: bool,
    pub rgb: Option<Rgb>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GestureEffect {
    /// Update the displayed percent only.
    Preview { percent: u8 },
    Commit(Commit),
    /// Press and release without meaningful movement.
    Tap,
    /// Event arrived for a control in the wrong state.
    Ignored,
}

/// All live drag sessions, keyed by control.
#[derive(Debug, Clone, Default)]
pub struct DragSessions {
    sessions: HashMap<ControlKey, DragSession>,
}

impl TrackBounds {
    /// Percent under pointer `x`, clamped to `[0, 100]`. Positions outside the
    /// track are valid since the pointer is captured for the whole gesture.
    pub fn percent_at(&self, x: f64) -> u8 {
        if self.width.is_nan() || self.width <= 0.0 || !x.is_finite() {
            return 0;
        }
        ((x - self.left) / self.width * 100.0).round().clamp(0.0, 100.0) as u8
    }
}

impl Commit {
    /// The service request for this commit, if any.
    ///
    /// A positive percent turns on at that brightness, keeping the colour of
    /// a single light. A batch only changes brightness, since its members
    /// may each have their own colour. Zero turns off, but only when the
    /// light was on to begin with.
    pub fn to_call(&self, target: Target) -> Option<ServiceCall> {
        if target.is_empty() {
            return None;
        }
        if self.percent > 0 {
            let rgb_color = match target {
                Target::Entity(_) => self.rgb,
                Target::Entities(_) => None,
            };
            Some(ServiceCall::TurnOn {
                entity_id: target,
                brightness_pct: Some(self.percent),
                rgb_color,
            })
        } else if self.was_on {
            Some(ServiceCall::TurnOff { entity_id: target })
        } else {
            None
        }
    }
}

impl DragSessions {
    /// Idle -> Dragging. The first preview comes from the press position.
    pub fn begin(
        &mut self,
        key: ControlKey,
        bounds: TrackBounds,
        x: f64,
        was_on: bool,
        rgb: Option<Rgb>,
    ) -> GestureEffect {
        if self.sessions.contains_key(&key) {
            return GestureEffect::Ignored;
        }

        let percent = bounds.percent_at(x);
        self.sessions.insert(
            key,
            DragSession {
                preview_pct: percent,
                committed_rgb: rgb,
                was_on,
                bounds,
                origin_x: x,
                last_x: x,
                moved: false,
            },
        );
        GestureEffect::Preview { percent }
    }

    pub fn move_to(&mut self, key: &ControlKey, x: f64) -> GestureEffect {
        let Some(session) = self.sessions.get_mut(key) else {
            return GestureEffect::Ignored;
        };

        session.last_x = x;
        if (x - session.origin_x).abs() > TAP_SLOP_PX {
            session.moved = true;
        }
        session.preview_pct = session.bounds.percent_at(x);
        GestureEffect::Preview {
            percent: session.preview_pct,
        }
    }

    /// Dragging -> Idle, at release position `x`.
    pub fn end(&mut self, key: &ControlKey, x: f64) -> GestureEffect {
        let Some(session) = self.sessions.remove(key) else {
            return GestureEffect::Ignored;
        };

        if !session.moved && (x - session.origin_x).abs() <= TAP_SLOP_PX {
            return GestureEffect::Tap;
        }

        GestureEffect::Commit(Commit {
            percent: session.bounds.percent_at(x),
            was_on: session.was_on,
            rgb: session.committed_rgb,
        })
    }

    /// Interrupted gesture: resolved exactly like a release at the last
    /// known pointer position.
    pub fn cancel(&mut self, key: &ControlKey) -> GestureEffect {
        match self.sessions.get(key).map(|s| s.last_x) {
            Some(x) => self.end(key, x),
            None => GestureEffect::Ignored,
        }
    }

    pub fn is_active(&self, key: &ControlKey) -> bool {
        self.sessions.contains_key(key)
    }

    pub fn get(&self, key: &ControlKey) -> Option<&DragSession> {
        self.sessions.get(key)
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }
}
