use crate::error::{TrackerError, TrackerResult};
use crate::filters::accuracy_gate::AccuracyGate;
use crate::filters::kalman::RecursiveNoiseFilter;
use crate::filters::speed_gate::{log_decision, PlausibilityGate, SpeedDecision};
use crate::filters::FilterConfig;
use crate::types::GeoFix;

/// Per-fix result with the reason a fix was dropped or held.
#[derive(Clone, Debug, PartialEq)]
pub enum ChainOutcome {
    Passed {
        point: (f64, f64),
        decision: SpeedDecision,
    },
    RejectedAccuracy {
        accuracy: Option<f32>,
    },
    RejectedNumeric(TrackerError),
}

impl ChainOutcome {
    pub fn point(&self) -> Option<(f64, f64)> {
        match self {
            ChainOutcome::Passed { point, .. } => Some(*point),
            _ => None,
        }
    }
}

/// Accuracy gate → recursive noise filter → plausibility gate, in that
/// order, for one walking session.
///
/// Not shared across threads: one chain per
/// active session, fed from a single event context. `reset` once at the
/// start of each session.
#[derive(Clone, Debug)]
pub struct LiveFilterChain {
    accuracy_gate: AccuracyGate,
    noise_filter: RecursiveNoiseFilter,
    speed_gate: PlausibilityGate,
}

impl LiveFilterChain {
    pub fn new(config: &FilterConfig) -> Self {
        Self {
            accuracy_gate: AccuracyGate::new(config.max_accuracy_m),
            noise_filter: RecursiveNoiseFilter::new(config.process_noise),
            speed_gate: PlausibilityGate::new(config.max_speed_ms),
        }
    }

    pub fn filter(
        &mut self,
        lat: f64,
        lon: f64,
        accuracy: Option<f32>,
        timestamp: i64,
    ) -> Option<(f64, f64)> {
        self.filter_detailed(lat, lon, accuracy, timestamp).point()
    }

    pub fn filter_fix(&mut self, fix: &GeoFix) -> Option<(f64, f64)> {
        self.filter(fix.latitude, fix.longitude, fix.accuracy, fix.timestamp)
    }

    pub fn filter_detailed(
        &mut self,
        lat: f64,
        lon: f64,
        accuracy: Option<f32>,
        timestamp: i64,
    ) -> ChainOutcome {
        let Some((lat, lon)) = self.accuracy_gate.filter_raw(lat, lon, accuracy) else {
            log::debug!("chain: dropped fix with accuracy {accuracy:?}");
            return ChainOutcome::RejectedAccuracy { accuracy };
        };
        // accepts() guarantees a positive, finite radius here
        let accuracy_m = accuracy.map(f64::from).unwrap_or_default();

        match self.run_stateful(lat, lon, accuracy_m, timestamp) {
            Ok((point, decision)) => {
                log_decision(&decision);
                ChainOutcome::Passed { point, decision }
            }
            Err(err) => {
                log::warn!("chain: dropped fix at {timestamp}: {err}");
                ChainOutcome::RejectedNumeric(err)
            }
        }
    }

    /// Both stateful stages are evaluated before either is committed, so a
    /// fault in the second stage cannot leave the first half-updated.
    fn run_stateful(
        &mut self,
        lat: f64,
        lon: f64,
        accuracy_m: f64,
        timestamp: i64,
    ) -> TrackerResult<((f64, f64), SpeedDecision)> {
        if !GeoFix::new(lat, lon, None, timestamp).is_valid() {
            return Err(TrackerError::NumericFault(format!(
                "coordinate out of range ({lat}, {lon})"
            )));
        }

        let ((est_lat, est_lon), kalman_next) =
            self.noise_filter.propose(lat, lon, accuracy_m, timestamp)?;
        let (point, gate_next, decision) = self.speed_gate.propose(est_lat, est_lon, timestamp)?;

        self.noise_filter.commit(kalman_next);
        self.speed_gate.commit(gate_next);
        Ok((point, decision))
    }

    pub fn reset(&mut self) {
        self.noise_filter.reset();
        self.speed_gate.reset();
    }

    pub fn noise_filter(&self) -> &RecursiveNoiseFilter {
        &self.noise_filter
    }

    pub fn speed_gate(&self) -> &PlausibilityGate {
        &self.speed_gate
    }
}

impl Default for LiveFilterChain {
    fn default() -> Self {
        Self::new(&FilterConfig::default())
    }
}
