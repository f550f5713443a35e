//! Per-control change detection and derived visuals.

use serde::Serialize;
use tracing::debug;

use super::context::CardContext;
use super::state::LightEntity;
use super::state::StateSnapshot;
use super::tree::ControlKey;
use crate::color::Contrast;
use crate::color::Rgb;
use crate::config::ThemeConfig;

pub const FILL_ALPHA_ON: f64 = 0.40;
pub const FILL_ALPHA_OFF: f64 = 0.25;

/// HSL lightness added to the display colour for the icon.
pub const ICON_LIGHTEN: f64 = 60.0;

/// HSL lightness added to the background for the "off" fill.
pub const OFF_LIGHTEN: f64 = 5.0;

pub const LUX_PLACEHOLDER: &str = "-- lx";

/// The minimal observable state of a control. A repaint happens only when
/// this changes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RenderSignature {
    pub on: bool,
    pub brightness_pct: u8,
    pub display: Rgb,
}

/// Everything the host needs to paint one row.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ControlVisual {
    /// False until the entity has appeared in a state push.
    pub available: bool,
    pub on: bool,
    pub percent: u8,
    pub display: Rgb,
    pub fill_alpha: f64,
    pub icon_tint: Rgb,
    pub contrast: Contrast,
}

/// Background stops for a row: darker shade, the colour itself, lighter tail.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Gradient {
    pub dark: String,
    pub start: String,
    pub end: String,
}

/// Fill colours derived once from the theme.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Palette {
    pub off: Rgb,
    pub on: Rgb,
}

/// Outcome of reconciling one control against a snapshot.
#[derive(Debug, Clone, PartialEq)]
pub enum Reconciled {
    /// Entity not in the snapshot; the control keeps whatever it showed.
    Absent,
    /// A drag owns the displayed value.
    Suppressed,
    Unchanged,
    Repainted(ControlVisual),
}

impl Palette {
    pub fn from_theme(theme: &ThemeConfig) -> Self {
        Self {
            off: theme.background.lighten(OFF_LIGHTEN),
            on: theme.on_color,
        }
    }

    pub fn display_color(&self, light: &LightEntity) -> Rgb {
        match (light.on, light.color) {
            (true, Some(rgb)) => rgb,
            (true, None) => self.on,
            (false, _) => self.off,
        }
    }
}

impl RenderSignature {
    pub fn of(light: &LightEntity, palette: &Palette) -> Self {
        Self {
            on: light.on,
            brightness_pct: light.brightness_pct,
            display: palette.display_color(light),
        }
    }

    pub fn visual(&self) -> ControlVisual {
        ControlVisual {
            available: true,
            on: self.on,
            percent: self.brightness_pct,
            display: self.display,
            fill_alpha: if self.on { FILL_ALPHA_ON } else { FILL_ALPHA_OFF },
            icon_tint: self.display.lighten(ICON_LIGHTEN),
            contrast: self.display.contrast(),
        }
    }
}

impl ControlVisual {
    /// What an entity that has never been seen looks like.
    pub fn neutral(palette: &Palette) -> Self {
        Self {
            available: false,
            ..RenderSignature {
                on: false,
                brightness_pct: 0,
                display: palette.off,
            }
            .visual()
        }
    }

    /// CSS fill at the control's opacity.
    pub fn fill_css(&self) -> String {
        self.display.rgba(self.fill_alpha)
    }

    pub fn gradient(&self) -> Gradient {
        Gradient {
            dark: self.display.shade(-40).rgba(0.3),
            start: self.display.rgba(0.7),
            end: self.display.shade(50).rgba(0.1),
        }
    }
}

/// Combined view of the lights behind a header that has no entity of its
/// own. `None` until at least one member is known.
///
/// On when any member is on; brightness is the rounded mean over the members
/// that are on; colour is the first reported colour among them.
pub fn aggregate<I>(lights: I) -> Option<LightEntity>
where
    I: IntoIterator<Item = LightEntity>,
{
    let mut seen = false;
    let mut lit = 0u32;
    let mut total = 0u32;
    let mut color = None;

    for light in lights {
        seen = true;
        if light.on {
            lit += 1;
            total += light.brightness_pct as u32;
            color = color.or(light.color);
        }
    }

    seen.then(|| LightEntity {
        on: lit > 0,
        brightness_pct: if lit == 0 { 0 } else { ((total + lit / 2) / lit) as u8 },
        color,
    })
}

/// Bring one control in line with `light`.
///
/// A repaint is skipped iff the signature equals the cached one and no drag
/// is active. While a drag is active the cached signature is dropped so the
/// first push after the gesture repaints unconditionally.
pub fn reconcile(
    ctx: &mut CardContext,
    key: &ControlKey,
    light: Option<LightEntity>,
    palette: &Palette,
) -> Reconciled {
    let Some(light) = light else {
        debug!(control = %key, "not in snapshot, leaving as is");
        return Reconciled::Absent;
    };

    if ctx.drags.is_active(key) {
        debug!(control = %key, "drag active, suppressing external state");
        ctx.signatures.remove(key);
        return Reconciled::Suppressed;
    }

    let signature = RenderSignature::of(&light, palette);
    if ctx.signatures.get(key) == Some(&signature) {
        return Reconciled::Unchanged;
    }

    let visual = signature.visual();
    debug!(control = %key, on = light.on, percent = light.brightness_pct, "repainted");
    ctx.signatures.insert(key.clone(), signature);
    ctx.pending.remove(key);
    ctx.visuals.insert(key.clone(), visual.clone());
    Reconciled::Repainted(visual)
}

/// Lux reading rounded to a whole number, or a placeholder.
pub fn format_lux(snapshot: &StateSnapshot, sensor_id: &str) -> String {
    snapshot
        .get(sensor_id)
        .and_then(|s| s.numeric())
        .map(|v| format!("{} lx", v.round() as i64))
        .unwrap_or_else(|| LUX_PLACEHOLDER.to_string())
}
