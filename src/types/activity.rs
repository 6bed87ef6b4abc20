use serde::{Deserialize, Serialize};

/// Activity reported by the platform activity-recognition service.
///
/// Parsed from the platform label with an explicit match; anything not
/// listed becomes [`ActivityType::Unknown`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum ActivityType {
    Walking,
    Running,
    OnFoot,
    Still,
    InVehicle,
    OnBicycle,
    Tilting,
    Unknown,
}

impl ActivityType {
    pub fn from_label(label: &str) -> Self {
        match label.trim().to_ascii_lowercase().as_str() {
            "walking" => ActivityType::Walking,
            "running" => ActivityType::Running,
            "on_foot" | "onfoot" => ActivityType::OnFoot,
            "still" => ActivityType::Still,
            "in_vehicle" | "invehicle" | "automotive" => ActivityType::InVehicle,
            "on_bicycle" | "onbicycle" | "cycling" => ActivityType::OnBicycle,
            "tilting" => ActivityType::Tilting,
            _ => ActivityType::Unknown,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            ActivityType::Walking => "WALKING",
            ActivityType::Running => "RUNNING",
            ActivityType::OnFoot => "ON_FOOT",
            ActivityType::Still => "STILL",
            ActivityType::InVehicle => "IN_VEHICLE",
            ActivityType::OnBicycle => "ON_BICYCLE",
            ActivityType::Tilting => "TILTING",
            ActivityType::Unknown => "UNKNOWN",
        }
    }

    /// Unknown gets the benefit of the doubt; the other gates still apply.
    pub fn is_walking_compatible(&self) -> bool {
        match self {
            ActivityType::Walking
            | ActivityType::Running
            | ActivityType::OnFoot
            | ActivityType::Unknown => true,
            ActivityType::Still
            | ActivityType::InVehicle
            | ActivityType::OnBicycle
            | ActivityType::Tilting => false,
        }
    }
}

impl From<&str> for ActivityType {
    fn from(label: &str) -> Self {
        Self::from_label(label)
    }
}

impl From<String> for ActivityType {
    fn from(label: String) -> Self {
        Self::from_label(&label)
    }
}

impl From<ActivityType> for String {
    fn from(activity: ActivityType) -> Self {
        activity.label().to_string()
    }
}

/// Coarse movement state derived by the surrounding app from motion sensors.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum MovementState {
    Walking,
    Running,
    Stationary,
    Unknown,
}

impl MovementState {
    pub fn from_label(label: &str) -> Self {
        match label.trim().to_ascii_lowercase().as_str() {
            "walking" => MovementState::Walking,
            "running" => MovementState::Running,
            "stationary" | "still" | "idle" => MovementState::Stationary,
            _ => MovementState::Unknown,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            MovementState::Walking => "WALKING",
            MovementState::Running => "RUNNING",
            MovementState::Stationary => "STATIONARY",
            MovementState::Unknown => "UNKNOWN",
        }
    }

    pub fn is_walking_compatible(&self) -> bool {
        match self {
            MovementState::Walking | MovementState::Running | MovementState::Unknown => true,
            MovementState::Stationary => false,
        }
    }
}

impl From<&str> for MovementState {
    fn from(label: &str) -> Self {
        Self::from_label(label)
    }
}

impl From<String> for MovementState {
    fn from(label: String) -> Self {
        Self::from_label(&label)
    }
}

impl From<MovementState> for String {
    fn from(state: MovementState) -> Self {
        state.label().to_string()
    }
}
