use serde::{Deserialize, Serialize};

use crate::error::{ensure_finite, TrackerError, TrackerResult};

/// Recursive filter state. `variance` is in m² and stays at +∞ until the
/// first fix of the session arrives.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct KalmanState {
    pub variance: f64,
    pub last_lat: f64,
    pub last_lon: f64,
    pub last_ts: i64,
}

impl KalmanState {
    pub fn is_initialized(&self) -> bool {
        self.variance.is_finite()
    }

    pub fn estimate(&self) -> Option<(f64, f64)> {
        self.is_initialized().then_some((self.last_lat, self.last_lon))
    }
}

impl Default for KalmanState {
    fn default() -> Self {
        Self {
            variance: f64::INFINITY,
            last_lat: 0.0,
            last_lon: 0.0,
            last_ts: 0,
        }
    }
}

/// Scalar Kalman smoother over latitude and longitude sharing one variance.
///
/// Never rejects a fix: every call returns an estimate. One instance per
/// walking session.
#[derive(Clone, Debug)]
pub struct RecursiveNoiseFilter {
    process_noise: f64,
    state: KalmanState,
}

impl RecursiveNoiseFilter {
    pub fn new(process_noise: f64) -> Self {
        Self {
            process_noise,
            state: KalmanState::default(),
        }
    }

    pub fn state(&self) -> &KalmanState {
        &self.state
    }

    /// Compute the next estimate and state without touching `self`.
    pub fn propose(
        &self,
        lat: f64,
        lon: f64,
        accuracy: f64,
        timestamp: i64,
    ) -> TrackerResult<((f64, f64), KalmanState)> {
        ensure_finite("kalman input", &[lat, lon, accuracy])?;
        let measurement_var = accuracy * accuracy;

        if !self.state.is_initialized() {
            let next = KalmanState {
                variance: measurement_var,
                last_lat: lat,
                last_lon: lon,
                last_ts: timestamp,
            };
            ensure_finite("kalman variance", &[next.variance])?;
            return Ok(((lat, lon), next));
        }

        let mut variance = self.state.variance;

        // Time update
        let dt_ms = elapsed_ms(self.state.last_ts, timestamp)?;
        if dt_ms > 0 {
            let dt_secs = dt_ms as f64 / 1000.0;
            variance += dt_secs * self.process_noise * self.process_noise;
        } else {
            log::warn!(
                "kalman: non-positive elapsed time ({dt_ms} ms), skipping time update"
            );
        }

        // Measurement update
        let gain = variance / (variance + measurement_var);
        let est_lat = self.state.last_lat + gain * (lat - self.state.last_lat);
        let est_lon = self.state.last_lon + gain * (lon - self.state.last_lon);
        variance *= 1.0 - gain;

        ensure_finite("kalman estimate", &[est_lat, est_lon, variance, gain])?;

        let next = KalmanState {
            variance,
            last_lat: est_lat,
            last_lon: est_lon,
            last_ts: timestamp,
        };
        Ok(((est_lat, est_lon), next))
    }

    pub fn commit(&mut self, state: KalmanState) {
        self.state = state;
    }

    /// Filter one fix. A numeric fault leaves the state untouched and
    /// returns the previous estimate (or the input before initialization).
    pub fn filter(&mut self, lat: f64, lon: f64, accuracy: f64, timestamp: i64) -> (f64, f64) {
        match self.propose(lat, lon, accuracy, timestamp) {
            Ok((estimate, next)) => {
                self.commit(next);
                estimate
            }
            Err(err) => {
                log::warn!("kalman: {err}");
                self.state.estimate().unwrap_or((lat, lon))
            }
        }
    }

    pub fn reset(&mut self) {
        self.state = KalmanState::default();
    }
}

/// `to - from` in ms; overflow is a numeric fault, not a wrapped interval.
pub(crate) fn elapsed_ms(from: i64, to: i64) -> TrackerResult<i64> {
    to.checked_sub(from).ok_or_else(|| {
        TrackerError::NumericFault(format!("elapsed time overflow ({from} -> {to})"))
    })
}

impl Default for RecursiveNoiseFilter {
    fn default() -> Self {
        Self::new(3.0)
    }
}
