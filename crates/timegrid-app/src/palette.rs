//! Deterministic per-client card colors.

use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use timegrid_core::Task;

/// A color literal that is not `#rrggbb`.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid color {0:?}, expected #rrggbb")]
pub struct InvalidColor(pub String);

/// 24-bit sRGB color, written as `#rrggbb`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Rgb {
    /// Red channel.
    pub r: u8,
    /// Green channel.
    pub g: u8,
    /// Blue channel.
    pub b: u8,
}

impl Rgb {
    /// Color from its channels.
    #[must_use]
    pub const fn new(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }

    /// Relative luminance in `0.0..=1.0` (WCAG definition).
    #[must_use]
    pub fn luminance(self) -> f32 {
        fn linear(channel: u8) -> f32 {
            let c = f32::from(channel) / 255.0;
            if c <= 0.039_28 {
                c / 12.92
            } else {
                ((c + 0.055) / 1.055).powf(2.4)
            }
        }
        0.0722f32.mul_add(
            linear(self.b),
            0.2126f32.mul_add(linear(self.r), 0.7152 * linear(self.g)),
        )
    }

    /// Scale every channel towards black by `amount` (`0.0` keeps the color).
    #[must_use]
    pub fn darken(self, amount: f32) -> Self {
        let keep = 1.0 - amount.clamp(0.0, 1.0);
        Self {
            r: channel(f32::from(self.r) / 255.0 * keep),
            g: channel(f32::from(self.g) / 255.0 * keep),
            b: channel(f32::from(self.b) / 255.0 * keep),
        }
    }
}

impl fmt::Display for Rgb {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{:02x}{:02x}{:02x}", self.r, self.g, self.b)
    }
}

impl FromStr for Rgb {
    type Err = InvalidColor;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || InvalidColor(s.to_owned());
        let hex = s.trim().strip_prefix('#').ok_or_else(invalid)?;
        if hex.len() != 6 || !hex.bytes().all(|b| b.is_ascii_hexdigit()) {
            return Err(invalid());
        }
        let part = |range: std::ops::Range<usize>| {
            hex.get(range)
                .and_then(|pair| u8::from_str_radix(pair, 16).ok())
                .ok_or_else(invalid)
        };
        Ok(Self {
            r: part(0..2)?,
            g: part(2..4)?,
            b: part(4..6)?,
        })
    }
}

impl TryFrom<String> for Rgb {
    type Error = InvalidColor;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<Rgb> for String {
    fn from(value: Rgb) -> Self {
        value.to_string()
    }
}

/// Colors of one task card.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CardColors {
    /// Card fill.
    pub background: Rgb,
    /// Card outline.
    pub border: Rgb,
    /// Label color, chosen for contrast against the fill.
    pub text: Rgb,
}

/// Colors for cards without a client (non-billable work).
pub const NEUTRAL: CardColors = CardColors {
    background: Rgb::new(0xee, 0xee, 0xee),
    border: Rgb::new(0x9e, 0x9e, 0x9e),
    text: Rgb::new(0x21, 0x21, 0x21),
};

const DARK_TEXT: Rgb = Rgb::new(0x21, 0x21, 0x21);
const LIGHT_TEXT: Rgb = Rgb::new(0xff, 0xff, 0xff);
const BORDER_DARKEN: f32 = 0.35;

/// Color source consumed by renderers.
pub trait ColorPort {
    /// Colors for a client. Must be deterministic.
    fn color_for(&self, client: &str) -> CardColors;

    /// Colors for a task card: by client for billable work, neutral otherwise.
    fn colors_for_task(&self, task: &Task) -> CardColors {
        task.client().map_or(NEUTRAL, |client| self.color_for(client))
    }
}

/// Hash-derived pastel palette with per-client overrides.
///
/// Client names are trimmed and lowercased before hashing and override lookup,
/// so `" Acme"` and `"acme"` share a color.
#[derive(Debug, Clone, Default)]
pub struct HashedPalette {
    overrides: HashMap<String, Rgb>,
}

impl HashedPalette {
    /// Palette without overrides.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Palette with background overrides keyed by client name.
    #[must_use]
    pub fn with_overrides<I, S>(overrides: I) -> Self
    where
        I: IntoIterator<Item = (S, Rgb)>,
        S: AsRef<str>,
    {
        Self {
            overrides: overrides
                .into_iter()
                .map(|(client, color)| (normalize(client.as_ref()), color))
                .collect(),
        }
    }

    fn background(&self, key: &str) -> Rgb {
        if let Some(color) = self.overrides.get(key) {
            return *color;
        }
        let hue = f32::from(u16::try_from(fnv1a(key) % 360).unwrap_or(0));
        hsl(hue, 0.65, 0.88)
    }
}

impl ColorPort for HashedPalette {
    fn color_for(&self, client: &str) -> CardColors {
        let background = self.background(&normalize(client));
        let text = if background.luminance() > 0.4 {
            DARK_TEXT
        } else {
            LIGHT_TEXT
        };
        CardColors {
            background,
            border: background.darken(BORDER_DARKEN),
            text,
        }
    }
}

fn normalize(client: &str) -> String {
    client.trim().to_lowercase()
}

fn fnv1a(text: &str) -> u32 {
    text.bytes().fold(0x811c_9dc5, |hash, byte| {
        (hash ^ u32::from(byte)).wrapping_mul(0x0100_0193)
    })
}

/// HSL (hue in degrees, saturation and lightness in `0.0..=1.0`) to RGB.
fn hsl(hue: f32, saturation: f32, lightness: f32) -> Rgb {
    let chroma = (1.0 - 2.0f32.mul_add(lightness, -1.0).abs()) * saturation;
    let sector = hue.rem_euclid(360.0) / 60.0;
    let x = chroma * (1.0 - (sector.rem_euclid(2.0) - 1.0).abs());
    let (r, g, b) = match sector {
        s if s < 1.0 => (chroma, x, 0.0),
        s if s < 2.0 => (x, chroma, 0.0),
        s if s < 3.0 => (0.0, chroma, x),
        s if s < 4.0 => (0.0, x, chroma),
        s if s < 5.0 => (x, 0.0, chroma),
        _ => (chroma, 0.0, x),
    };
    let m = lightness - chroma / 2.0;
    Rgb {
        r: channel(r + m),
        g: channel(g + m),
        b: channel(b + m),
    }
}

#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn channel(value: f32) -> u8 {
    (value.clamp(0.0, 1.0) * 255.0).round() as u8
}

#[cfg(test)]
#[allow(clippy::expect_used)]
mod tests {
    use super::*;
    use time::macros::{date, time};
    use timegrid_core::TaskKind;

    #[test]
    fn rgb_parses_and_prints_hex() {
        let color: Rgb = "#FFe0b2".parse().expect("valid color");
        assert_eq!(color, Rgb::new(0xff, 0xe0, 0xb2));
        assert_eq!(color.to_string(), "#ffe0b2");
        assert!("ffe0b2".parse::<Rgb>().is_err());
        assert!("#ffe0b".parse::<Rgb>().is_err());
        assert!("#ffe0bz".parse::<Rgb>().is_err());
    }

    #[test]
    fn hashed_colors_are_deterministic_and_normalized() {
        let palette = HashedPalette::new();
        let first = palette.color_for("Acme");
        assert_eq!(first, palette.color_for("  acme "));
        assert_eq!(first, HashedPalette::new().color_for("ACME"));
        assert_ne!(first.background, palette.color_for("Globex").background);
    }

    #[test]
    fn hashed_backgrounds_are_pale_with_readable_text() {
        let palette = HashedPalette::new();
        for client in ["Acme", "Globex", "Initech", "Umbrella", "Stark"] {
            let colors = palette.color_for(client);
            assert!(colors.background.luminance() > 0.6, "{client} is too dark");
            assert!(colors.border.luminance() < colors.background.luminance());
            assert_eq!(colors.text, DARK_TEXT);
        }
    }

    #[test]
    fn overrides_replace_the_background() {
        let palette = HashedPalette::with_overrides([("ACME ", Rgb::new(0x10, 0x20, 0x30))]);
        let colors = palette.color_for("acme");
        assert_eq!(colors.background, Rgb::new(0x10, 0x20, 0x30));
        assert_eq!(colors.text, LIGHT_TEXT);
        assert_eq!(colors.border, Rgb::new(0x10, 0x20, 0x30).darken(BORDER_DARKEN));
    }

    #[test]
    fn tasks_without_client_use_neutral_colors() {
        let palette = HashedPalette::new();
        let admin = Task::new(
            date!(2025 - 01 - 06),
            time!(9:00),
            time!(10:00),
            TaskKind::non_billable("Admin"),
        );
        assert_eq!(palette.colors_for_task(&admin), NEUTRAL);
    }

    #[test]
    fn hsl_primary_hues() {
        assert_eq!(hsl(0.0, 1.0, 0.5), Rgb::new(255, 0, 0));
        assert_eq!(hsl(120.0, 1.0, 0.5), Rgb::new(0, 255, 0));
        assert_eq!(hsl(240.0, 1.0, 0.5), Rgb::new(0, 0, 255));
    }
}
