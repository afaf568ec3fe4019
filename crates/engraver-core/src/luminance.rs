//! Luminance calculation using ITU-R BT.601 coefficients.
//!
//! The pixel classifier compares this value against its thresholds, so every
//! brightness decision in the pipeline goes through these functions.

/// ITU-R BT.601 coefficient for the red channel.
pub const LUMINANCE_R: f32 = 0.299;

/// ITU-R BT.601 coefficient for the green channel.
pub const LUMINANCE_G: f32 = 0.587;

/// ITU-R BT.601 coefficient for the blue channel.
pub const LUMINANCE_B: f32 = 0.114;

/// Perceived brightness of an sRGB color, unrounded, in 0.0 to 255.0.
#[inline]
pub fn luminance(r: u8, g: u8, b: u8) -> f32 {
    LUMINANCE_R * r as f32 + LUMINANCE_G * g as f32 + LUMINANCE_B * b as f32
}
