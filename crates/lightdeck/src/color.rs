//! Colour conversion and contrast helpers.
//!
//! Everything here is pure: no state, no allocation beyond the string
//! formatters at the presentation boundary.

use std::fmt;
use std::str::FromStr;

use serde::Deserialize;
use serde::Serialize;

/// Relative luminance above which dark text is used on top of a fill.
pub const CONTRAST_THRESHOLD: f64 = 0.5;

/// 8-bit RGB colour. Serialises as `[r, g, b]`, the shape used by
/// `rgb_color` attributes and service calls.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(from = "[u8; 3]", into = "[u8; 3]")]
pub struct Rgb {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

/// HSL colour: hue in `[0, 360)`, saturation and lightness in `[0, 100]`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Hsl {
    pub h: f64,
    pub s: f64,
    pub l: f64,
}

/// Text/icon colour that stays legible on top of a fill.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, strum::Display)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum Contrast {
    Black,
    White,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ColorError {
    #[error("invalid hex colour '{0}': expected #rgb or #rrggbb")]
    InvalidHex(String),
}

impl Rgb {
    pub const BLACK: Rgb = Rgb::new(0, 0, 0);
    pub const WHITE: Rgb = Rgb::new(255, 255, 255);

    pub const fn new(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }

    /// Parse `#rrggbb`, `rrggbb`, `#rgb` or `rgb`.
    pub fn from_hex(hex: &str) -> Result<Self, ColorError> {
        let digits = hex.trim().trim_start_matches('#');
        let invalid = || ColorError::InvalidHex(hex.to_string());

        if !digits.chars().all(|c| c.is_ascii_hexdigit()) {
            return Err(invalid());
        }

        let expanded: String = match digits.len() {
            3 => digits.chars().flat_map(|c| [c, c]).collect(),
            6 => digits.to_string(),
            _ => return Err(invalid()),
        };

        let channel = |i: usize| u8::from_str_radix(&expanded[i..i + 2], 16).map_err(|_| invalid());
        Ok(Self::new(channel(0)?, channel(2)?, channel(4)?))
    }

    /// Lower-case `#rrggbb`.
    pub fn to_hex(self) -> String {
        format!("#{:02x}{:02x}{:02x}", self.r, self.g, self.b)
    }

    pub fn to_hsl(self) -> Hsl {
        let r = self.r as f64 / 255.0;
        let g = self.g as f64 / 255.0;
        let b = self.b as f64 / 255.0;

        let max = r.max(g).max(b);
        let min = r.min(g).min(b);
        let l = (max + min) / 2.0;

        if max == min {
            return Hsl {
                h: 0.0,
                s: 0.0,
                l: l * 100.0,
            };
        }

        let d = max - min;
        let s = if l > 0.5 {
            d / (2.0 - max - min)
        } else {
            d / (max + min)
        };
        let h = if max == r {
            (g - b) / d + if g < b { 6.0 } else { 0.0 }
        } else if max == g {
            (b - r) / d + 2.0
        } else {
            (r - g) / d + 4.0
        };

        Hsl {
            h: (h * 60.0) % 360.0,
            s: s * 100.0,
            l: l * 100.0,
        }
    }

    /// Multiply each channel by `(100 + pct) / 100`, clamped to `[0, 255]`.
    /// Negative percentages darken.
    pub fn shade(self, pct: i32) -> Self {
        let scale = |c: u8| {
            let v = (c as f64 * (100 + pct) as f64 / 100.0).round();
            v.clamp(0.0, 255.0) as u8
        };
        Self::new(scale(self.r), scale(self.g), scale(self.b))
    }

    /// Raise HSL lightness by `amount` lightness units, keeping hue.
    pub fn lighten(self, amount: f64) -> Self {
        let mut hsl = self.to_hsl();
        hsl.l = (hsl.l + amount).clamp(0.0, 100.0);
        hsl.to_rgb()
    }

    /// Perceived luminance `0.299R + 0.587G + 0.114B`, normalised to `[0, 1]`.
    pub fn luminance(self) -> f64 {
        (0.299 * self.r as f64 + 0.587 * self.g as f64 + 0.114 * self.b as f64) / 255.0
    }

    pub fn contrast(self) -> Contrast {
        if self.luminance() > CONTRAST_THRESHOLD {
            Contrast::Black
        } else {
            Contrast::White
        }
    }

    /// CSS `rgba(r,g,b,a)` string.
    pub fn rgba(self, alpha: f64) -> String {
        format!("rgba({},{},{},{})", self.r, self.g, self.b, alpha)
    }
}

impl Hsl {
    pub fn to_rgb(self) -> Rgb {
        let s = self.s.clamp(0.0, 100.0) / 100.0;
        let l = self.l.clamp(0.0, 100.0) / 100.0;

        if s == 0.0 {
            let v = (l * 255.0).round() as u8;
            return Rgb::new(v, v, v);
        }

        let q = if l < 0.5 { l * (1.0 + s) } else { l + s - l * s };
        let p = 2.0 * l - q;
        let h = self.h.rem_euclid(360.0) / 360.0;

        let channel = |t: f64| (hue_to_channel(p, q, t) * 255.0).round().clamp(0.0, 255.0) as u8;
        Rgb::new(
            channel(h + 1.0 / 3.0),
            channel(h),
            channel(h - 1.0 / 3.0),
        )
    }
}

fn hue_to_channel(p: f64, q: f64, t: f64) -> f64 {
    let t = t.rem_euclid(1.0);
    if t < 1.0 / 6.0 {
        p + (q - p) * 6.0 * t
    } else if t < 1.0 / 2.0 {
        q
    } else if t < 2.0 / 3.0 {
        p + (q - p) * (2.0 / 3.0 - t) * 6.0
    } else {
        p
    }
}

impl Contrast {
    pub fn rgb(self) -> Rgb {
        match self {
            Contrast::Black => Rgb::BLACK,
            Contrast::White => Rgb::WHITE,
        }
    }
}

impl From<[u8; 3]> for Rgb {
    fn from([r, g, b]: [u8; 3]) -> Self {
        Self::new(r, g, b)
    }
}

impl From<Rgb> for [u8; 3] {
    fn from(c: Rgb) -> Self {
        [c.r, c.g, c.b]
    }
}

impl FromStr for Rgb {
    type Err = ColorError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_hex(s)
    }
}

impl fmt::Display for Rgb {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hex_round_trip() {
        for (r, g, b) in [(0, 0, 0), (255, 255, 255), (1, 128, 254), (16, 15, 160)] {
            let c = Rgb::new(r, g, b);
            assert_eq!(Rgb::from_hex(&c.to_hex()).unwrap(), c);
        }
    }

    #[test]
    fn test_hex_round_trip_every_channel_value() {
        for v in 0..=255u8 {
            let c = Rgb::new(v, 255 - v, v / 2);
            assert_eq!(Rgb::from_hex(&c.to_hex()).unwrap(), c);
        }
    }

    #[test]
    fn test_short_hex() {
        assert_eq!(Rgb::from_hex("#555").unwrap(), Rgb::new(0x55, 0x55, 0x55));
        assert_eq!(Rgb::from_hex("fa0").unwrap(), Rgb::new(0xff, 0xaa, 0x00));
    }

    #[test]
    fn test_invalid_hex() {
        assert!(Rgb::from_hex("#12345").is_err());
        assert!(Rgb::from_hex("#gg0000").is_err());
        assert!(Rgb::from_hex("").is_err());
        assert_eq!(
            "nope".parse::<Rgb>().unwrap_err(),
            ColorError::InvalidHex("nope".to_string())
        );
    }

    #[test]
    fn test_hsl_primaries() {
        let red = Rgb::new(255, 0, 0).to_hsl();
        assert_eq!((red.h, red.s, red.l), (0.0, 100.0, 50.0));

        let blue = Rgb::new(0, 0, 255).to_hsl();
        assert_eq!(blue.h, 240.0);

        let grey = Rgb::new(128, 128, 128).to_hsl();
        assert_eq!(grey.s, 0.0);
    }

    #[test]
    fn test_hsl_round_trip() {
        for c in [
            Rgb::new(255, 0, 0),
            Rgb::new(12, 200, 99),
            Rgb::new(255, 193, 77),
            Rgb::new(28, 28, 28),
            Rgb::new(250, 5, 130),
        ] {
            assert_eq!(c.to_hsl().to_rgb(), c, "round trip of {}", c);
        }
    }

    #[test]
    fn test_hue_stays_below_360() {
        let hsl = Rgb::new(255, 0, 1).to_hsl();
        assert!(hsl.h >= 0.0 && hsl.h < 360.0);
    }

    #[test]
    fn test_shade() {
        assert_eq!(Rgb::new(100, 200, 50).shade(50), Rgb::new(150, 255, 75));
        assert_eq!(Rgb::new(100, 200, 50).shade(-40), Rgb::new(60, 120, 30));
        assert_eq!(Rgb::new(10, 10, 10).shade(-200), Rgb::BLACK);
    }

    #[test]
    fn test_lighten_clamps() {
        assert_eq!(Rgb::new(200, 200, 200).lighten(60.0), Rgb::WHITE);
        assert_eq!(Rgb::BLACK.lighten(0.0), Rgb::BLACK);
        let lighter = Rgb::new(0, 0, 0).lighten(5.0);
        assert_eq!(lighter, Rgb::new(13, 13, 13));
    }

    #[test]
    fn test_contrast() {
        assert_eq!(Rgb::WHITE.contrast(), Contrast::Black);
        assert_eq!(Rgb::BLACK.contrast(), Contrast::White);
        assert_eq!(Rgb::new(255, 255, 0).contrast(), Contrast::Black);
        assert_eq!(Rgb::new(0, 0, 255).contrast(), Contrast::White);
    }

    #[test]
    fn test_rgba() {
        assert_eq!(Rgb::new(1, 2, 3).rgba(0.4), "rgba(1,2,3,0.4)");
        assert_eq!(Rgb::new(1, 2, 3).rgba(1.0), "rgba(1,2,3,1)");
    }

    #[test]
    fn test_serde_as_array() {
        let c: Rgb = serde_json::from_str("[255, 128, 0]").unwrap();
        assert_eq!(c, Rgb::new(255, 128, 0));
        assert_eq!(serde_json::to_string(&c).unwrap(), "[255,128,0]");
    }
}
