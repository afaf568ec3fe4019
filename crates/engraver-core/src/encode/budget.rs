//! Size-constrained quality search.
//!
//! Manufacturing accepts files within a megabyte window. Starting near maximum
//! quality, each attempt encodes the raster, measures it, and moves quality
//! multiplicatively toward the window:
//!
//! ```text
//! size > max  ->  quality *= 0.8
//! size < min  ->  quality  = min(quality * 1.2, 1.0)
//! ```
//!
//! The search stops on the first in-budget encode, after `max_attempts`, or
//! when the next quality would leave (0.1, 1.0] or repeat the current one.
//! Running out of attempts is not an error: the candidate closest to the
//! window is returned with `converged == false`. Candidates equally far from
//! the window are ranked by distance to `target`.

use serde::{Deserialize, Serialize};

use super::{EncodeError, QualityEncoder};
use crate::raster::RasterBuffer;

/// Quality of the first attempt.
pub const INITIAL_QUALITY: f32 = 0.95;
/// Exclusive lower bound of usable quality.
pub const MIN_QUALITY: f32 = 0.1;
/// Inclusive upper bound of quality.
pub const MAX_QUALITY: f32 = 1.0;
/// Multiplier applied when a candidate is too large.
pub const SHRINK_FACTOR: f32 = 0.8;
/// Multiplier applied when a candidate is too small.
pub const GROW_FACTOR: f32 = 1.2;

const BYTES_PER_MEGABYTE: f64 = 1024.0 * 1024.0;

/// Convert a byte count to megabytes (1 MB = 1024 * 1024 bytes).
#[inline]
pub fn bytes_to_megabytes(len: usize) -> f64 {
    len as f64 / BYTES_PER_MEGABYTE
}

/// Acceptable output size window, in megabytes.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SizeBudget {
    pub min: f64,
    /// Preferred size; breaks ties between candidates outside the window.
    pub target: f64,
    pub max: f64,
}

impl Default for SizeBudget {
    fn default() -> Self {
        Self {
            min: 8.0,
            target: 15.0,
            max: 30.0,
        }
    }
}

impl SizeBudget {
    pub fn new(min: f64, target: f64, max: f64) -> Self {
        Self { min, target, max }
    }

    /// Whether a size in megabytes lies inside `[min, max]`.
    #[inline]
    pub fn contains(&self, megabytes: f64) -> bool {
        megabytes >= self.min && megabytes <= self.max
    }

    /// Distance in megabytes from the window; zero inside it.
    pub fn distance(&self, megabytes: f64) -> f64 {
        if megabytes < self.min {
            self.min - megabytes
        } else if megabytes > self.max {
            megabytes - self.max
        } else {
            0.0
        }
    }

    /// Distance in megabytes from `target`.
    #[inline]
    pub fn target_gap(&self, megabytes: f64) -> f64 {
        (megabytes - self.target).abs()
    }

    /// True when `min <= target <= max` and all bounds are finite and non-negative.
    pub fn is_ordered(&self) -> bool {
        [self.min, self.target, self.max]
            .iter()
            .all(|v| v.is_finite() && *v >= 0.0)
            && self.min <= self.target
            && self.target <= self.max
    }
}

/// Result of a quality search.
#[derive(Debug, Clone, PartialEq)]
pub struct EncodeOutcome {
    /// Encoded file content.
    pub bytes: Vec<u8>,
    /// Quality the bytes were encoded at.
    pub quality: f32,
    /// Number of encode attempts made.
    pub attempts: u32,
    /// Whether the size landed inside the budget.
    pub converged: bool,
}

impl EncodeOutcome {
    pub fn size_in_megabytes(&self) -> f64 {
        bytes_to_megabytes(self.bytes.len())
    }
}

/// Search for an encode whose size lies within `budget`.
///
/// # Arguments
///
/// * `encoder` - Encode-at-quality primitive
/// * `raster` - Monochrome raster to encode (read only)
/// * `budget` - Acceptable size window in megabytes
/// * `max_attempts` - Upper bound on encode calls (at least one is always made)
///
/// # Errors
///
/// Only errors from the encoder itself are returned. Failing to reach the
/// budget yields `Ok` with `converged == false`.
pub fn encode_within_budget<E>(
    encoder: &E,
    raster: &RasterBuffer,
    budget: &SizeBudget,
    max_attempts: u32,
) -> Result<EncodeOutcome, EncodeError>
where
    E: QualityEncoder + ?Sized,
{
    let max_attempts = max_attempts.max(1);
    let mut quality = INITIAL_QUALITY;
    let mut attempts = 0;
    // (candidate, distance from window, distance from target)
    let mut best: Option<(EncodeOutcome, f64, f64)> = None;

    while attempts < max_attempts {
        attempts += 1;
        let bytes = encoder.encode(raster, quality)?;
        let size = bytes_to_megabytes(bytes.len());
        log::debug!(
            "encode attempt {}/{}: quality {:.3} -> {:.2}MB (budget {:.1}-{:.1}MB)",
            attempts,
            max_attempts,
            quality,
            size,
            budget.min,
            budget.max
        );

        if budget.contains(size) {
            return Ok(EncodeOutcome {
                bytes,
                quality,
                attempts,
                converged: true,
            });
        }

        let distance = budget.distance(size);
        let gap = budget.target_gap(size);
        let closer = best
            .as_ref()
            .map_or(true, |(_, d, g)| distance < *d || (distance == *d && gap <= *g));
        if closer {
            let candidate = EncodeOutcome {
                bytes,
                quality,
                attempts,
                converged: false,
            };
            best = Some((candidate, distance, gap));
        }

        let next = if size > budget.max {
            quality * SHRINK_FACTOR
        } else {
            (quality * GROW_FACTOR).min(MAX_QUALITY)
        };
        if next <= MIN_QUALITY || (next - quality).abs() < f32::EPSILON {
            break;
        }
        quality = next;
    }

    // max_attempts >= 1 guarantees at least one candidate
    let (mut outcome, distance, _) = best.ok_or_else(|| {
        EncodeError::EncodingFailed("quality search made no attempts".to_string())
    })?;
    outcome.attempts = attempts;
    log::warn!(
        "size budget not met after {} attempts: {:.2}MB is {:.2}MB outside {:.1}-{:.1}MB",
        outcome.attempts,
        outcome.size_in_megabytes(),
        distance,
        budget.min,
        budget.max
    );
    Ok(outcome)
}
