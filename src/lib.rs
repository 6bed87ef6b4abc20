// walk_tracker_rs: sensor-fusion core for a walking tracker
//
// Everything in this crate is independent of:
//   - the platform location / activity / pedometer services
//   - persistence, maps, UI
//
// Raw fixes and pedometer ticks go in; a filtered live track, validated
// step counts, a fused distance and a smoothed route come out. That keeps
// it testable against recorded walks (see the `replay` binary).

pub mod config;
pub mod distance;
pub mod error;
pub mod filters;
pub mod geodesy;
pub mod session;
pub mod smoothing;
pub mod step_validator;
pub mod types;

pub use config::TrackerConfig;
pub use distance::HybridDistanceEstimator;
pub use error::{TrackerError, TrackerResult};
pub use filters::{AccuracyGate, LiveFilterChain, PlausibilityGate, RecursiveNoiseFilter};
pub use session::{SessionState, SessionSummary, StepTick, WalkSession};
pub use smoothing::RouteSmoother;
pub use step_validator::StepMotionValidator;
pub use types::{
    ActivityType, GeoFix, MovementState, RejectionReason, SmoothedRoute, StepValidationInput,
    StepValidationResult,
};
