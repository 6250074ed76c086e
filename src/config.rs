use crate::error::{NetworkError, Result};
use crate::global_variables::{
    DEFAULT_BASE_GREEN_SECS, DEFAULT_CONGESTION_THRESHOLD, DEFAULT_EMERGENCY_GREEN_SECS,
    DEFAULT_SIGNAL_SCALE_FACTOR, DEFAULT_WEIGHT_DIVISOR,
};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Tunables for congestion classification and signal timing.
/// Missing fields in a JSON document fall back to the defaults.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// A road is congested once its vehicle count exceeds this value.
    pub congestion_threshold: u32,
    /// `adjust_weight_for_congestion` adds `count / weight_divisor`.
    pub weight_divisor: u32,
    /// Green duration for intersections without a signal-timing record.
    pub base_green_secs: u32,
    /// Green duration grows by one second per `signal_scale_factor` vehicles.
    pub signal_scale_factor: u32,
    /// Green duration pinned while an emergency override is active.
    pub emergency_green_secs: u32,
    /// Apply `adjust_weight_for_congestion` after every tracked traversal.
    pub adjust_weights_on_traversal: bool,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            congestion_threshold: DEFAULT_CONGESTION_THRESHOLD,
            weight_divisor: DEFAULT_WEIGHT_DIVISOR,
            base_green_secs: DEFAULT_BASE_GREEN_SECS,
            signal_scale_factor: DEFAULT_SIGNAL_SCALE_FACTOR,
            emergency_green_secs: DEFAULT_EMERGENCY_GREEN_SECS,
            adjust_weights_on_traversal: false,
        }
    }
}

impl EngineConfig {
    pub fn from_json_str(json: &str) -> Result<Self> {
        let config: EngineConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let json = std::fs::read_to_string(path)?;
        Self::from_json_str(&json)
    }

    /// Both divisors feed integer divisions.
    pub fn validate(&self) -> Result<()> {
        if self.weight_divisor == 0 {
            return Err(NetworkError::InvalidConfig(
                "weight_divisor must be greater than zero".to_string(),
            ));
        }
        if self.signal_scale_factor == 0 {
            return Err(NetworkError::InvalidConfig(
                "signal_scale_factor must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }
}
