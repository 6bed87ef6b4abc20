//! GPS + pedometer distance fusion with an online stride-length estimate.

use serde::{Deserialize, Serialize};

use crate::geodesy::fix_distance;
use crate::types::GeoFix;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DistanceConfig {
    /// Consecutive-fix segments shorter than this are treated as jitter (m).
    pub min_segment_m: f64,
    /// Stride used before any calibration (m/step).
    pub default_step_length_m: f64,
    /// Weight kept by the previous stride estimate in the EMA.
    pub stride_ema_retain: f64,
    /// A fix at or under this accuracy makes the GPS track trusted (m).
    pub trusted_accuracy_m: f32,
    /// Relative GPS/step disagreement still considered agreement.
    pub agreement_tolerance: f64,
    /// GPS share of the blended figure when the two disagree.
    pub gps_blend_weight: f64,
    /// Minimum accepted GPS points before fusing.
    pub min_fusion_points: usize,
    /// Weight of the most recent segment in the 3-point speed average.
    pub recent_speed_weight: f64,
    /// Elapsed-time floor for speed segments (s).
    pub min_elapsed_secs: f64,
}

impl Default for DistanceConfig {
    fn default() -> Self {
        Self {
            min_segment_m: 5.0,
            default_step_length_m: 0.7,
            stride_ema_retain: 0.7,
            trusted_accuracy_m: 20.0,
            agreement_tolerance: 0.2,
            gps_blend_weight: 0.7,
            min_fusion_points: 3,
            recent_speed_weight: 0.7,
            min_elapsed_secs: 0.1,
        }
    }
}

/// Learned meters-per-step for the current session.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct StrideCalibration {
    pub average_step_length: Option<f64>,
}

impl StrideCalibration {
    pub fn update(&mut self, sample: f64, retain: f64) -> f64 {
        let average = self
            .average_step_length
            .map_or(sample, |avg| avg * retain + sample * (1.0 - retain));
        self.average_step_length = Some(average);
        average
    }
}

/// Path length over `locations`, skipping segments shorter than `min_segment_m`.
pub fn jitter_filtered_distance(locations: &[GeoFix], min_segment_m: f64) -> f64 {
    locations
        .windows(2)
        .map(|pair| fix_distance(&pair[0], &pair[1]))
        .filter(|d| d.is_finite() && *d >= min_segment_m)
        .sum()
}

#[derive(Clone, Debug)]
pub struct HybridDistanceEstimator {
    config: DistanceConfig,
    initial_step_count: i32,
    calibration: StrideCalibration,
}

impl HybridDistanceEstimator {
    pub fn new(config: DistanceConfig, initial_step_count: i32) -> Self {
        Self {
            config,
            initial_step_count,
            calibration: StrideCalibration::default(),
        }
    }

    pub fn initial_step_count(&self) -> i32 {
        self.initial_step_count
    }

    pub fn calibration(&self) -> &StrideCalibration {
        &self.calibration
    }

    pub fn stride_length(&self) -> f64 {
        self.calibration
            .average_step_length
            .unwrap_or(self.config.default_step_length_m)
    }

    /// Start a new session: new step baseline, calibration forgotten.
    pub fn reset(&mut self, initial_step_count: i32) {
        self.initial_step_count = initial_step_count;
        self.calibration = StrideCalibration::default();
    }

    /// Steps since the session baseline. A pedometer that went backwards
    /// (sensor restart) counts as zero rather than negative.
    pub fn steps_taken(&self, step_count: i32) -> i32 {
        step_count.saturating_sub(self.initial_step_count).max(0)
    }

    pub fn gps_distance(&self, locations: &[GeoFix]) -> f64 {
        jitter_filtered_distance(locations, self.config.min_segment_m)
    }

    /// Fused distance in meters over the whole accepted-fix list.
    ///
    /// Recomputed from scratch each call; the stride estimate is refreshed
    /// from the same data as a side effect.
    pub fn total_distance(&mut self, locations: &[GeoFix], step_count: i32) -> f32 {
        let cfg = &self.config;
        let gps_distance = self.gps_distance(locations);
        let steps_taken = self.steps_taken(step_count);
        let step_distance = steps_taken as f64 * self.stride_length();

        if locations.len() < cfg.min_fusion_points {
            return step_distance as f32;
        }

        if steps_taken > 0 && gps_distance > 0.0 {
            let sample = gps_distance / steps_taken as f64;
            let average = self.calibration.update(sample, cfg.stride_ema_retain);
            log::debug!("stride: sample {sample:.3} m, average {average:.3} m");
        }

        let trusted = locations
            .last()
            .and_then(|fix| fix.accuracy)
            .is_some_and(|acc| acc > 0.0 && acc <= cfg.trusted_accuracy_m);

        let fused = if trusted && gps_distance > 0.0 {
            let disagreement = (gps_distance - step_distance).abs() / gps_distance;
            if disagreement <= cfg.agreement_tolerance {
                gps_distance
            } else {
                cfg.gps_blend_weight * gps_distance + (1.0 - cfg.gps_blend_weight) * step_distance
            }
        } else if !trusted
            && self.calibration.average_step_length.is_some()
            && step_distance > 0.0
        {
            step_distance
        } else {
            gps_distance
        };

        fused as f32
    }

    /// Recent ground speed in m/s from the last three fixes.
    pub fn speed(&self, locations: &[GeoFix]) -> f32 {
        let cfg = &self.config;
        let segment_speed = |a: &GeoFix, b: &GeoFix| {
            let elapsed_ms = b.timestamp.saturating_sub(a.timestamp);
            let elapsed = (elapsed_ms as f64 / 1000.0).max(cfg.min_elapsed_secs);
            fix_distance(a, b) / elapsed
        };

        let speed = match locations {
            [] | [_] => 0.0,
            [a, b] => segment_speed(a, b),
            [.., a, b, c] => {
                let older = segment_speed(a, b);
                let recent = segment_speed(b, c);
                cfg.recent_speed_weight * recent + (1.0 - cfg.recent_speed_weight) * older
            }
        };
        speed as f32
    }
}

impl Default for HybridDistanceEstimator {
    fn default() -> Self {
        Self::new(DistanceConfig::default(), 0)
    }
}
