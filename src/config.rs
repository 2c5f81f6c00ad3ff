use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{LocResult, LocalizationError};

// ─── Configuration ───────────────────────────────────────────────────────────

/// Range smoothing / differentiation policy.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SmoothingConfig {
    /// Trailing window cap once `early_sample_count` samples exist
    pub window_cap: usize,
    /// Value-estimate window cap while fewer than `early_sample_count` samples exist
    pub early_value_window_cap: usize,
    pub early_sample_count: usize,
    /// Local polynomial degree
    pub poly_order: usize,
}

impl Default for SmoothingConfig {
    fn default() -> Self {
        Self {
            window_cap: 20,
            early_value_window_cap: 50,
            early_sample_count: 3,
            poly_order: 1,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LocalizerConfig {
    // ── Sampling ──
    pub dt: f64,
    pub noisy: bool,

    // ── Localization trigger ──
    pub warm_up_steps: usize,
    pub similarity_threshold: f64,

    // ── Resolver ──
    pub trailing_window: usize,

    // ── Candidate generation ──
    /// Speeds at or below this leave the heading undefined
    pub min_speed: f64,

    pub smoothing: SmoothingConfig,
}

impl Default for LocalizerConfig {
    fn default() -> Self {
        Self {
            dt: 0.1,
            noisy: false,
            warm_up_steps: 20,
            similarity_threshold: 0.97,
            trailing_window: 5,
            min_speed: 1e-9,
            smoothing: SmoothingConfig::default(),
        }
    }
}

impl LocalizerConfig {
    pub fn validate(&self) -> LocResult<()> {
        if !(self.dt.is_finite() && self.dt > 0.0) {
            return Err(invalid(format!("dt must be positive, got {}", self.dt)));
        }
        if !(-1.0..=1.0).contains(&self.similarity_threshold) {
            return Err(invalid(format!(
                "similarity_threshold must lie in [-1, 1], got {}",
                self.similarity_threshold
            )));
        }
        if self.trailing_window == 0 {
            return Err(invalid("trailing_window must be at least 1".to_string()));
        }
        if !(self.min_speed.is_finite() && self.min_speed >= 0.0) {
            return Err(invalid(format!(
                "min_speed must be non-negative, got {}",
                self.min_speed
            )));
        }
        if self.smoothing.window_cap < 2 {
            return Err(invalid(format!(
                "smoothing.window_cap must be at least 2, got {}",
                self.smoothing.window_cap
            )));
        }
        if self.smoothing.early_value_window_cap == 0 {
            return Err(invalid(
                "smoothing.early_value_window_cap must be at least 1".to_string(),
            ));
        }
        if self.smoothing.poly_order == 0 {
            return Err(invalid(
                "smoothing.poly_order must be at least 1 to estimate a rate".to_string(),
            ));
        }
        Ok(())
    }

    /// Parse and validate a JSON config. Missing fields take their defaults.
    pub fn from_json_str(text: &str) -> LocResult<Self> {
        let config: LocalizerConfig = serde_json::from_str(text)
            .map_err(|e| invalid(format!("failed to parse config: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_path(path: impl AsRef<Path>) -> LocResult<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)
            .map_err(|e| invalid(format!("failed to read {}: {}", path.display(), e)))?;
        Self::from_json_str(&text)
    }
}

fn invalid(reason: String) -> LocalizationError {
    LocalizationError::InvalidConfig(reason)
}
