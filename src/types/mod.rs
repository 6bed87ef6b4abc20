pub mod activity;
pub mod linalg;

pub use activity::{ActivityType, MovementState};
pub use linalg::*;

use serde::{Deserialize, Serialize};

/// One raw location reading from the platform location service.
///
/// `timestamp` is in milliseconds and strictly increases within a session.
/// `accuracy` is the reported 1-sigma radius in meters; `None` means the
/// platform did not report one.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct GeoFix {
    pub latitude: f64,
    pub longitude: f64,
    #[serde(default)]
    pub accuracy: Option<f32>,
    pub timestamp: i64,
}

impl GeoFix {
    pub fn new(latitude: f64, longitude: f64, accuracy: Option<f32>, timestamp: i64) -> Self {
        Self {
            latitude,
            longitude,
            accuracy,
            timestamp,
        }
    }

    pub fn coordinate(&self) -> (f64, f64) {
        (self.latitude, self.longitude)
    }

    /// Finite and inside the WGS84 lat/lon ranges.
    pub fn is_valid(&self) -> bool {
        self.latitude.is_finite()
            && self.longitude.is_finite()
            && (-90.0..=90.0).contains(&self.latitude)
            && (-180.0..=180.0).contains(&self.longitude)
    }
}

/// Snapshot assembled once per pedometer tick.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct StepValidationInput {
    pub step_delta: i32,
    pub activity_type: Option<ActivityType>,
    pub movement_state: Option<MovementState>,
    /// GPS displacement across `locations`, meters.
    pub gps_distance: f32,
    /// m/s
    pub gps_speed: f32,
    /// Accelerometer magnitude, m/s².
    pub acceleration: f32,
    pub locations: Vec<GeoFix>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RejectionReason {
    InvalidActivityType,
    InvalidMovementState,
    PhoneShake,
    VehicleMovement,
    StationaryWalking,
}

impl RejectionReason {
    pub const ALL: [RejectionReason; 5] = [
        RejectionReason::InvalidActivityType,
        RejectionReason::InvalidMovementState,
        RejectionReason::PhoneShake,
        RejectionReason::VehicleMovement,
        RejectionReason::StationaryWalking,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            RejectionReason::InvalidActivityType => "invalid_activity_type",
            RejectionReason::InvalidMovementState => "invalid_movement_state",
            RejectionReason::PhoneShake => "phone_shake",
            RejectionReason::VehicleMovement => "vehicle_movement",
            RejectionReason::StationaryWalking => "stationary_walking",
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum StepValidationResult {
    Accepted { step_delta: i32 },
    Rejected(RejectionReason),
}

impl StepValidationResult {
    pub fn is_accepted(&self) -> bool {
        matches!(self, StepValidationResult::Accepted { .. })
    }

    /// Steps to credit: the delta when accepted, zero otherwise.
    pub fn accepted_steps(&self) -> i32 {
        match self {
            StepValidationResult::Accepted { step_delta } => *step_delta,
            StepValidationResult::Rejected(_) => 0,
        }
    }
}

/// Presentation route produced at session end.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct SmoothedRoute {
    pub latitudes: Vec<f64>,
    pub longitudes: Vec<f64>,
}

impl SmoothedRoute {
    pub fn len(&self) -> usize {
        self.latitudes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.latitudes.is_empty()
    }

    pub fn points(&self) -> impl Iterator<Item = (f64, f64)> + '_ {
        self.latitudes
            .iter()
            .copied()
            .zip(self.longitudes.iter().copied())
    }

    pub fn first(&self) -> Option<(f64, f64)> {
        self.points().next()
    }

    pub fn last(&self) -> Option<(f64, f64)> {
        match (self.latitudes.last(), self.longitudes.last()) {
            (Some(&lat), Some(&lon)) => Some((lat, lon)),
            _ => None,
        }
    }
}
