use serde::{Deserialize, Serialize};

use crate::error::{ensure_finite, TrackerResult};
use crate::filters::kalman::elapsed_ms;
use crate::geodesy::haversine_distance;

#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct SpeedGateState {
    pub last_point: Option<(f64, f64)>,
    pub last_ts: i64,
}

/// What the gate did with a point.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum SpeedDecision {
    /// First point of the session.
    Initialized,
    Accepted { speed_ms: f64 },
    /// Implied speed too high; the previous point is returned instead.
    Clamped { speed_ms: f64 },
    /// Elapsed time was zero or negative; the point passes unchecked and
    /// the anchor stays on the last verified point.
    TimestampError { dt_ms: i64 },
}

/// Rejects fixes that imply a physically impossible speed relative to the
/// last accepted point. Always yields a coordinate.
#[derive(Clone, Debug)]
pub struct PlausibilityGate {
    max_speed_ms: f64,
    state: SpeedGateState,
}

impl PlausibilityGate {
    pub fn new(max_speed_ms: f64) -> Self {
        Self {
            max_speed_ms,
            state: SpeedGateState::default(),
        }
    }

    pub fn state(&self) -> &SpeedGateState {
        &self.state
    }

    /// Decide on a point without mutating the gate.
    pub fn propose(
        &self,
        lat: f64,
        lon: f64,
        timestamp: i64,
    ) -> TrackerResult<((f64, f64), SpeedGateState, SpeedDecision)> {
        ensure_finite("speed gate input", &[lat, lon])?;

        let accepted = SpeedGateState {
            last_point: Some((lat, lon)),
            last_ts: timestamp,
        };

        let Some((prev_lat, prev_lon)) = self.state.last_point else {
            return Ok(((lat, lon), accepted, SpeedDecision::Initialized));
        };

        let dt_ms = elapsed_ms(self.state.last_ts, timestamp)?;
        if dt_ms <= 0 {
            return Ok(((lat, lon), self.state, SpeedDecision::TimestampError { dt_ms }));
        }

        let distance = haversine_distance(prev_lat, prev_lon, lat, lon);
        let speed_ms = distance / (dt_ms as f64 / 1000.0);
        ensure_finite("implied speed", &[speed_ms])?;

        if speed_ms > self.max_speed_ms {
            Ok(((prev_lat, prev_lon), self.state, SpeedDecision::Clamped { speed_ms }))
        } else {
            Ok(((lat, lon), accepted, SpeedDecision::Accepted { speed_ms }))
        }
    }

    pub fn commit(&mut self, state: SpeedGateState) {
        self.state = state;
    }

    pub fn filter(&mut self, lat: f64, lon: f64, timestamp: i64) -> (f64, f64) {
        match self.propose(lat, lon, timestamp) {
            Ok((point, next, decision)) => {
                log_decision(&decision);
                self.commit(next);
                point
            }
            Err(err) => {
                log::warn!("speed gate: {err}");
                self.state.last_point.unwrap_or((lat, lon))
            }
        }
    }

    pub fn reset(&mut self) {
        self.state = SpeedGateState::default();
    }
}

impl Default for PlausibilityGate {
    fn default() -> Self {
        Self::new(30.0)
    }
}

pub(crate) fn log_decision(decision: &SpeedDecision) {
    match decision {
        SpeedDecision::Clamped { speed_ms } => {
            log::debug!("speed gate: implied {speed_ms:.1} m/s, holding last point");
        }
        SpeedDecision::TimestampError { dt_ms } => {
            log::warn!("speed gate: non-positive elapsed time ({dt_ms} ms), passing fix through");
        }
        SpeedDecision::Initialized | SpeedDecision::Accepted { .. } => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // ~11.1 m per 0.0001° of latitude
    const STEP: f64 = 0.0001;

    #[test]
    fn test_first_point_passes() {
        let mut gate = PlausibilityGate::default();
        assert_eq!(gate.filter(10.0, 20.0, 0), (10.0, 20.0));
        assert_eq!(gate.state().last_point, Some((10.0, 20.0)));
    }

    #[test]
    fn test_walking_speed_accepted() {
        let mut gate = PlausibilityGate::default();
        gate.filter(10.0, 20.0, 0);
        let next = (10.0 + STEP, 20.0);
        assert_eq!(gate.filter(next.0, next.1, 1_000), next);
        assert_eq!(gate.state().last_ts, 1_000);
    }

    #[test]
    fn test_implausible_speed_returns_previous_point_exactly() {
        let mut gate = PlausibilityGate::default();
        gate.filter(10.0, 20.0, 0);
        // ~111 m in one second
        let out = gate.filter(10.0 + 10.0 * STEP, 20.0, 1_000);
        assert_eq!(out, (10.0, 20.0));
        assert_eq!(gate.state().last_ts, 0);

        let (_, _, decision) = gate.propose(10.0 + 10.0 * STEP, 20.0, 1_000).unwrap();
        assert!(matches!(decision, SpeedDecision::Clamped { speed_ms } if speed_ms > 30.0));
    }

    #[test]
    fn test_clamped_track_recovers_once_time_catches_up() {
        let mut gate = PlausibilityGate::default();
        gate.filter(10.0, 20.0, 0);
        let far = (10.0 + 10.0 * STEP, 20.0);
        assert_eq!(gate.filter(far.0, far.1, 1_000), (10.0, 20.0));
        // same point 10 s after the anchor is ~11 m/s
        assert_eq!(gate.filter(far.0, far.1, 10_000), far);
    }

    #[test]
    fn test_non_positive_elapsed_passes_through() {
        let mut gate = PlausibilityGate::default();
        gate.filter(10.0, 20.0, 5_000);
        let far = (11.0, 20.0);
        assert_eq!(gate.filter(far.0, far.1, 5_000), far);
        assert_eq!(gate.filter(far.0, far.1, 4_000), far);
        assert_eq!(gate.state().last_point, Some((10.0, 20.0)));
    }

    #[test]
    fn test_elapsed_overflow_is_numeric_fault() {
        let mut gate = PlausibilityGate::default();
        gate.filter(10.0, 20.0, i64::MAX);
        assert!(gate.propose(10.0, 20.0, i64::MIN).is_err());
        // plain filter holds the anchor instead
        assert_eq!(gate.filter(11.0, 20.0, i64::MIN), (10.0, 20.0));
        assert_eq!(gate.state().last_ts, i64::MAX);
    }

    #[test]
    fn test_reset_clears_anchor() {
        let mut gate = PlausibilityGate::default();
        gate.filter(10.0, 20.0, 0);
        gate.reset();
        assert_eq!(*gate.state(), SpeedGateState::default());
        assert_eq!(gate.filter(50.0, 60.0, 1), (50.0, 60.0));
    }
}
