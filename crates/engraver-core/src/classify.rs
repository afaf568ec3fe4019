//! Pixel classification for engraving.
//!
//! Every opaque pixel of a captured design becomes either pure white (the
//! surface is left untouched: land, text, icons, roads) or pure black (the
//! laser removes material: water, deep recesses).
//!
//! ## Rules
//!
//! Plain luminance thresholding misreads a few semantic regions of a map, so
//! three refinement rules run first, in this order. The first one that
//! matches decides the pixel:
//!
//! 1. **Glyph** - near-pure light or near-pure dark pixels above a low
//!    luminance floor are white, which keeps anti-aliased text edges intact.
//! 2. **Water** - pixels with a distinct blue cast, or dark pixels where blue
//!    dominates, are black regardless of luminance.
//! 3. **Road** - near-gray pixels above the road floor are white.
//!
//! Otherwise the primary rule applies: `luminance > threshold` is white.
//!
//! The numeric defaults were calibrated against typical basemap palettes and
//! are exposed through [`ClassifierConfig`] for recalibration.

use serde::{Deserialize, Serialize};

use crate::config::ConfigError;
use crate::luminance::luminance;

/// Terminal tone of a classified pixel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Tone {
    /// Engraved (material removed).
    Black,
    /// Untouched surface.
    White,
}

impl Tone {
    /// The RGB triple this tone is written as.
    #[inline]
    pub const fn rgb(self) -> [u8; 3] {
        match self {
            Tone::Black => [0, 0, 0],
            Tone::White => [255, 255, 255],
        }
    }

    /// The single channel value this tone is written as.
    #[inline]
    pub const fn level(self) -> u8 {
        match self {
            Tone::Black => 0,
            Tone::White => 255,
        }
    }
}

/// Which rule decided a pixel's tone.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rule {
    /// Near-pure light or dark text and icon pixels, forced white.
    Glyph,
    /// Blue-dominant pixels, forced black.
    Water,
    /// Light low-saturation grays, forced white.
    Road,
    /// The primary threshold on luminance.
    Luminance,
}

/// Tunable thresholds for [`classify`].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClassifierConfig {
    /// Primary luminance threshold; strictly brighter pixels become white.
    pub threshold: f32,
    /// All channels above this make a pixel "near-pure light".
    pub glyph_light: u8,
    /// All channels below this make a pixel "near-pure dark".
    pub glyph_dark: u8,
    /// Minimum luminance for the glyph rule to force white.
    pub glyph_floor: f32,
    /// How far blue must exceed both red and green to count as water.
    pub water_margin: u8,
    /// Below this luminance, any blue-dominant pixel counts as water.
    pub water_dark_luminance: f32,
    /// Maximum channel spread (max - min) for a pixel to count as gray.
    pub road_spread: u8,
    /// Minimum luminance for a gray pixel to count as road.
    pub road_floor: f32,
}

impl Default for ClassifierConfig {
    fn default() -> Self {
        Self {
            threshold: 128.0,
            glyph_light: 200,
            glyph_dark: 50,
            glyph_floor: 40.0,
            water_margin: 20,
            water_dark_luminance: 100.0,
            road_spread: 20,
            road_floor: 100.0,
        }
    }
}

impl ClassifierConfig {
    /// Check that pure black and pure white classify as themselves.
    ///
    /// Luminance thresholds must be finite and lie in `[0, 255)`, and
    /// `glyph_light` must be below 255. Outside those ranges a converted
    /// raster is no longer stable under a second conversion.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let white = luminance(255, 255, 255);
        let levels = [
            ("threshold", self.threshold),
            ("glyph_floor", self.glyph_floor),
            ("road_floor", self.road_floor),
            ("water_dark_luminance", self.water_dark_luminance),
        ];
        for (field, value) in levels {
            if !(value.is_finite() && value >= 0.0 && value < white) {
                return Err(ConfigError::InvalidClassifier {
                    field,
                    value: value.to_string(),
                });
            }
        }
        if self.glyph_light == u8::MAX {
            return Err(ConfigError::InvalidClassifier {
                field: "glyph_light",
                value: self.glyph_light.to_string(),
            });
        }
        Ok(())
    }
}

/// Classify an RGB color, reporting the rule that decided it.
pub fn classify_with_rule(r: u8, g: u8, b: u8, config: &ClassifierConfig) -> (Tone, Rule) {
    let lum = luminance(r, g, b);

    let all_light = r > config.glyph_light && g > config.glyph_light && b > config.glyph_light;
    let all_dark = r < config.glyph_dark && g < config.glyph_dark && b < config.glyph_dark;
    if (all_light || all_dark) && lum > config.glyph_floor {
        return (Tone::White, Rule::Glyph);
    }

    let margin = config.water_margin as u16;
    let blue_cast = b as u16 > r as u16 + margin && b as u16 > g as u16 + margin;
    let dark_blue = lum < config.water_dark_luminance && b > r && b > g;
    if blue_cast || dark_blue {
        return (Tone::Black, Rule::Water);
    }

    let spread = r.max(g).max(b) - r.min(g).min(b);
    if spread <= config.road_spread && lum > config.road_floor {
        return (Tone::White, Rule::Road);
    }

    if lum > config.threshold {
        (Tone::White, Rule::Luminance)
    } else {
        (Tone::Black, Rule::Luminance)
    }
}

/// Classify an RGB color as black or white.
#[inline]
pub fn classify(r: u8, g: u8, b: u8, config: &ClassifierConfig) -> Tone {
    classify_with_rule(r, g, b, config).0
}

/// Classify one RGBA pixel.
///
/// Fully transparent pixels are returned unchanged so the encoder can flatten
/// them against its background later. Alpha is never modified.
#[inline]
pub fn classify_pixel(pixel: [u8; 4], config: &ClassifierConfig) -> [u8; 4] {
    let [r, g, b, a] = pixel;
    if a == 0 {
        return pixel;
    }
    let [v, _, _] = classify(r, g, b, config).rgb();
    [v, v, v, a]
}
