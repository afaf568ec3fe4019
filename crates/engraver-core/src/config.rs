//! Export configuration.
//!
//! [`ExportConfig`] carries the tunables that stay fixed across exports of one
//! storefront: print resolution, file-size window, classifier thresholds, the
//! capture timeout and the encoder's attempt cap. Every field has a default,
//! so a partial JSON object is a valid configuration.

use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::capture::ResampleFilter;
use crate::classify::{ClassifierConfig, Tone};
use crate::encode::SizeBudget;
use crate::export::ExportRequest;

/// Lowest print resolution accepted.
pub const MIN_DPI: u32 = 72;
/// Highest print resolution accepted.
pub const MAX_DPI: u32 = 1200;

/// Error types for configuration loading and validation.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to parse export config: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("Target DPI {0} is outside 72-1200")]
    DpiOutOfRange(u32),

    #[error("Size budget must satisfy 0 <= min <= target <= max, got {min}/{target}/{max} MB")]
    InvalidBudget { min: f64, target: f64, max: f64 },

    #[error("Classifier {field} must lie in 0-255, got {value}")]
    InvalidClassifier { field: &'static str, value: String },

    #[error("max_attempts must be at least 1")]
    NoAttempts,

    #[error("capture_timeout_ms must be greater than zero")]
    ZeroTimeout,
}

/// Tunables for the export pipeline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExportConfig {
    /// Print resolution of the output.
    pub target_dpi: u32,
    /// Accepted output size window, in megabytes.
    pub size_budget: SizeBudget,
    pub classifier: ClassifierConfig,
    /// How long to wait for the surface to finish rendering.
    pub capture_timeout_ms: u64,
    /// Cap on encode attempts in the quality search.
    pub max_attempts: u32,
    /// Filter for rescaling captured layers.
    pub resample: ResampleFilter,
    /// Tone that transparent regions print as.
    pub background: Tone,
}

impl Default for ExportConfig {
    fn default() -> Self {
        Self {
            target_dpi: 300,
            size_budget: SizeBudget::default(),
            classifier: ClassifierConfig::default(),
            capture_timeout_ms: 30_000,
            max_attempts: 10,
            resample: ResampleFilter::default(),
            background: Tone::White,
        }
    }
}

impl ExportConfig {
    /// Parse a (possibly partial) JSON configuration and validate it.
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(MIN_DPI..=MAX_DPI).contains(&self.target_dpi) {
            return Err(ConfigError::DpiOutOfRange(self.target_dpi));
        }
        let budget = self.size_budget;
        if !budget.is_ordered() {
            return Err(ConfigError::InvalidBudget {
                min: budget.min,
                target: budget.target,
                max: budget.max,
            });
        }
        self.classifier.validate()?;
        if self.max_attempts == 0 {
            return Err(ConfigError::NoAttempts);
        }
        if self.capture_timeout_ms == 0 {
            return Err(ConfigError::ZeroTimeout);
        }
        Ok(())
    }

    pub fn capture_timeout(&self) -> Duration {
        Duration::from_millis(self.capture_timeout_ms)
    }

    /// Build a request at this configuration's resolution and size budget.
    pub fn request(
        &self,
        order_identifier: Option<String>,
        requested_at: DateTime<Utc>,
    ) -> ExportRequest {
        ExportRequest {
            target_dpi: self.target_dpi,
            size_budget: self.size_budget,
            order_identifier,
            requested_at,
            product: None,
        }
    }
}
