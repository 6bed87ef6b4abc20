use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::distance::DistanceConfig;
use crate::error::{TrackerError, TrackerResult};
use crate::filters::FilterConfig;
use crate::smoothing::SmoothingConfig;
use crate::step_validator::StepValidatorConfig;

/// All tunables for one walking session. Fixed for the session's lifetime.
///
/// Every section is `#[serde(default)]`, so a JSON document only needs the
/// fields it overrides:
///
/// ```
/// use walk_tracker_rs::config::TrackerConfig;
///
/// let cfg = TrackerConfig::from_json_str(r#"{ "filter": { "max_speed_ms": 12.0 } }"#).unwrap();
/// assert_eq!(cfg.filter.max_speed_ms, 12.0);
/// assert_eq!(cfg.filter.max_accuracy_m, 50.0);
/// ```
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrackerConfig {
    pub filter: FilterConfig,
    pub steps: StepValidatorConfig,
    pub distance: DistanceConfig,
    pub smoothing: SmoothingConfig,
    pub session: SessionConfig,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    /// Accepted fixes younger than this feed each step validation (ms).
    pub step_window_ms: i64,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            step_window_ms: 30_000,
        }
    }
}

impl TrackerConfig {
    pub fn from_json_str(json: &str) -> TrackerResult<Self> {
        let config: Self =
            serde_json::from_str(json).map_err(|e| TrackerError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn load(path: impl AsRef<Path>) -> TrackerResult<Self> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path)
            .map_err(|e| TrackerError::Config(format!("{}: {e}", path.display())))?;
        Self::from_json_str(&json)
    }

    pub fn validate(&self) -> TrackerResult<()> {
        let positive = [
            ("filter.max_accuracy_m", f64::from(self.filter.max_accuracy_m)),
            ("filter.max_speed_ms", self.filter.max_speed_ms),
            ("distance.default_step_length_m", self.distance.default_step_length_m),
            ("distance.min_elapsed_secs", self.distance.min_elapsed_secs),
        ];
        for (name, value) in positive {
            if !(value.is_finite() && value > 0.0) {
                return Err(TrackerError::Config(format!("{name} must be positive, got {value}")));
            }
        }

        let weights = [
            ("distance.stride_ema_retain", self.distance.stride_ema_retain),
            ("distance.gps_blend_weight", self.distance.gps_blend_weight),
            ("distance.recent_speed_weight", self.distance.recent_speed_weight),
        ];
        for (name, value) in weights {
            if !(0.0..=1.0).contains(&value) {
                return Err(TrackerError::Config(format!("{name} must be in [0, 1], got {value}")));
            }
        }

        if !(self.filter.process_noise.is_finite() && self.filter.process_noise >= 0.0) {
            return Err(TrackerError::Config(format!(
                "filter.process_noise must be non-negative, got {}",
                self.filter.process_noise
            )));
        }
        if self.smoothing.segments_per_interval == 0 {
            return Err(TrackerError::Config(
                "smoothing.segments_per_interval must be at least 1".into(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_match_documented_constants() {
        let cfg = TrackerConfig::default();
        assert_eq!(cfg.filter.max_accuracy_m, 50.0);
        assert_eq!(cfg.filter.process_noise, 3.0);
        assert_eq!(cfg.filter.max_speed_ms, 30.0);
        assert_eq!(cfg.distance.min_segment_m, 5.0);
        assert_eq!(cfg.distance.default_step_length_m, 0.7);
        assert_eq!(cfg.smoothing.simplify_tolerance_m, 5.0);
        assert_eq!(cfg.smoothing.segments_per_interval, 8);
        assert!(cfg.validate().is_ok());
    }

    #[test]
    fn test_partial_json_overrides_only_named_fields() {
        let cfg = TrackerConfig::from_json_str(
            r#"{ "steps": { "vehicle_speed_threshold": 9.5 }, "smoothing": { "segments_per_interval": 4 } }"#,
        )
        .unwrap();
        assert_eq!(cfg.steps.vehicle_speed_threshold, 9.5);
        assert_eq!(cfg.steps.shake_accel_threshold, 20.0);
        assert_eq!(cfg.smoothing.segments_per_interval, 4);
        assert_eq!(cfg.distance, DistanceConfig::default());
    }

    #[test]
    fn test_malformed_json_is_config_error() {
        let err = TrackerConfig::from_json_str("{ filter: ").unwrap_err();
        assert!(matches!(err, TrackerError::Config(_)));
    }

    #[test]
    fn test_invalid_values_rejected() {
        assert!(TrackerConfig::from_json_str(r#"{ "filter": { "max_speed_ms": 0.0 } }"#).is_err());
        assert!(
            TrackerConfig::from_json_str(r#"{ "distance": { "gps_blend_weight": 1.5 } }"#).is_err()
        );
        assert!(
            TrackerConfig::from_json_str(r#"{ "smoothing": { "segments_per_interval": 0 } }"#)
                .is_err()
        );
    }

    #[test]
    fn test_missing_file_is_config_error() {
        let err = TrackerConfig::load("/nonexistent/walk_tracker.json").unwrap_err();
        assert!(matches!(err, TrackerError::Config(msg) if msg.contains("walk_tracker.json")));
    }
}
