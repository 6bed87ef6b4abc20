//! Live per-fix filtering: accuracy gate → recursive noise filter → speed gate.
//!
//! The recursive and speed stages keep their state in plain owned structs
//! (`KalmanState`, `SpeedGateState`) so a step can be computed on a copy and
//! committed only when the whole chain produced finite numbers.

pub mod accuracy_gate;
pub mod chain;
pub mod kalman;
pub mod speed_gate;

pub use accuracy_gate::AccuracyGate;
pub use chain::{ChainOutcome, LiveFilterChain};
pub use kalman::{KalmanState, RecursiveNoiseFilter};
pub use speed_gate::{PlausibilityGate, SpeedDecision, SpeedGateState};

use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FilterConfig {
    /// Fixes with a reported radius above this are dropped (meters).
    pub max_accuracy_m: f32,
    /// Expected GPS jitter growth, meters per √s.
    pub process_noise: f64,
    /// Implied speeds above this freeze the track at the last good point (m/s).
    pub max_speed_ms: f64,
}

impl Default for FilterConfig {
    fn default() -> Self {
        Self {
            max_accuracy_m: 50.0,
            process_noise: 3.0,
            max_speed_ms: 30.0,
        }
    }
}
