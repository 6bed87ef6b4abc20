//! Pedometer delta validation.
//!
//! Decides whether a batch of steps reported by the platform pedometer came
//! from genuine walking. Pure function of a [`StepValidationInput`] snapshot:
//! rules are checked in a fixed order and the first match wins.
//!
//! 1. activity recognition says the user is not on foot
//! 2. movement state says the user is stationary
//! 3. strong acceleration while GPS shows the phone has not moved (shaking)
//! 4. GPS speed only a vehicle reaches
//! 5. steps keep arriving over a long window with no GPS displacement

use serde::{Deserialize, Serialize};

use crate::types::{RejectionReason, StepValidationInput, StepValidationResult};

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StepValidatorConfig {
    /// Accelerometer magnitude treated as shaking (m/s²).
    pub shake_accel_threshold: f32,
    /// GPS displacement under which a shake is "in place" (m).
    pub shake_max_distance_m: f32,
    /// Faster than any walker or runner (m/s).
    pub vehicle_speed_threshold: f32,
    /// Displacement under which the user counts as not having moved (m).
    pub stationary_max_distance_m: f32,
    /// Minimum span of the location window before stationary walking is judged (ms).
    pub stationary_min_window_ms: i64,
}

impl Default for StepValidatorConfig {
    fn default() -> Self {
        Self {
            shake_accel_threshold: 20.0,
            shake_max_distance_m: 2.0,
            vehicle_speed_threshold: 7.0,
            stationary_max_distance_m: 3.0,
            stationary_min_window_ms: 30_000,
        }
    }
}

#[derive(Clone, Debug, Default)]
pub struct StepMotionValidator {
    config: StepValidatorConfig,
}

impl StepMotionValidator {
    pub fn new(config: StepValidatorConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &StepValidatorConfig {
        &self.config
    }

    pub fn evaluate(&self, input: &StepValidationInput) -> StepValidationResult {
        match self.rejection(input) {
            Some(reason) => StepValidationResult::Rejected(reason),
            None => StepValidationResult::Accepted {
                step_delta: input.step_delta,
            },
        }
    }

    fn rejection(&self, input: &StepValidationInput) -> Option<RejectionReason> {
        let cfg = &self.config;

        if input
            .activity_type
            .is_some_and(|activity| !activity.is_walking_compatible())
        {
            return Some(RejectionReason::InvalidActivityType);
        }

        if input
            .movement_state
            .is_some_and(|state| !state.is_walking_compatible())
        {
            return Some(RejectionReason::InvalidMovementState);
        }

        if input.acceleration > cfg.shake_accel_threshold
            && input.gps_distance < cfg.shake_max_distance_m
        {
            return Some(RejectionReason::PhoneShake);
        }

        if input.gps_speed > cfg.vehicle_speed_threshold {
            return Some(RejectionReason::VehicleMovement);
        }

        if input.step_delta > 0
            && input.gps_distance < cfg.stationary_max_distance_m
            && self.window_span_ms(input) >= cfg.stationary_min_window_ms
        {
            return Some(RejectionReason::StationaryWalking);
        }

        None
    }

    fn window_span_ms(&self, input: &StepValidationInput) -> i64 {
        match (input.locations.first(), input.locations.last()) {
            (Some(first), Some(last)) => last.timestamp.saturating_sub(first.timestamp),
            _ => 0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{ActivityType, GeoFix, MovementState};

    fn walking_input() -> StepValidationInput {
        StepValidationInput {
            step_delta: 12,
            activity_type: Some(ActivityType::Walking),
            movement_state: Some(MovementState::Walking),
            gps_distance: 9.0,
            gps_speed: 1.4,
            acceleration: 11.0,
            locations: (0..8)
                .map(|i| GeoFix::new(37.5 + i as f64 * 1e-5, 127.0, Some(5.0), i * 5_000))
                .collect(),
        }
    }

    fn eval(input: &StepValidationInput) -> StepValidationResult {
        StepMotionValidator::default().evaluate(input)
    }

    #[test]
    fn test_normal_walk_accepted() {
        assert_eq!(
            eval(&walking_input()),
            StepValidationResult::Accepted { step_delta: 12 }
        );
    }

    #[test]
    fn test_missing_recognition_is_not_rejected() {
        let mut input = walking_input();
        input.activity_type = None;
        input.movement_state = None;
        assert!(eval(&input).is_accepted());
    }

    #[test]
    fn test_invalid_activity_type() {
        for activity in [
            ActivityType::Still,
            ActivityType::InVehicle,
            ActivityType::OnBicycle,
            ActivityType::Tilting,
        ] {
            let mut input = walking_input();
            input.activity_type = Some(activity);
            assert_eq!(
                eval(&input),
                StepValidationResult::Rejected(RejectionReason::InvalidActivityType)
            );
        }
    }

    #[test]
    fn test_invalid_movement_state() {
        let mut input = walking_input();
        input.movement_state = Some(MovementState::Stationary);
        assert_eq!(
            eval(&input),
            StepValidationResult::Rejected(RejectionReason::InvalidMovementState)
        );
    }

    #[test]
    fn test_phone_shake() {
        let mut input = walking_input();
        input.acceleration = 28.0;
        input.gps_distance = 0.5;
        assert_eq!(
            eval(&input),
            StepValidationResult::Rejected(RejectionReason::PhoneShake)
        );

        // same acceleration while actually moving is just a vigorous stride
        input.gps_distance = 9.0;
        assert!(eval(&input).is_accepted());
    }

    #[test]
    fn test_vehicle_movement() {
        let mut input = walking_input();
        input.gps_speed = 15.0;
        assert_eq!(
            eval(&input),
            StepValidationResult::Rejected(RejectionReason::VehicleMovement)
        );
    }

    #[test]
    fn test_stationary_walking_needs_long_window() {
        let mut input = walking_input();
        input.gps_distance = 0.4;
        // window spans 35 s
        assert_eq!(
            eval(&input),
            StepValidationResult::Rejected(RejectionReason::StationaryWalking)
        );

        input.locations.truncate(3); // 10 s
        assert!(eval(&input).is_accepted());

        input.locations.clear();
        assert!(eval(&input).is_accepted());
    }

    #[test]
    fn test_window_span_with_extreme_timestamps() {
        let mut input = walking_input();
        input.gps_distance = 0.4;
        input.locations[0].timestamp = i64::MIN;
        input.locations[7].timestamp = i64::MAX;
        // span saturates at i64::MAX, well past the stationary window
        assert_eq!(
            eval(&input),
            StepValidationResult::Rejected(RejectionReason::StationaryWalking)
        );

        input.locations.swap(0, 7);
        assert!(eval(&input).is_accepted());
    }

    #[test]
    fn test_precedence_first_match_wins() {
        let mut input = walking_input();
        input.activity_type = Some(ActivityType::InVehicle);
        input.movement_state = Some(MovementState::Stationary);
        input.acceleration = 30.0;
        input.gps_distance = 0.0;
        input.gps_speed = 20.0;
        assert_eq!(
            eval(&input),
            StepValidationResult::Rejected(RejectionReason::InvalidActivityType)
        );

        input.activity_type = Some(ActivityType::Walking);
        assert_eq!(
            eval(&input),
            StepValidationResult::Rejected(RejectionReason::InvalidMovementState)
        );

        input.movement_state = Some(MovementState::Walking);
        assert_eq!(
            eval(&input),
            StepValidationResult::Rejected(RejectionReason::PhoneShake)
        );

        input.acceleration = 10.0;
        assert_eq!(
            eval(&input),
            StepValidationResult::Rejected(RejectionReason::VehicleMovement)
        );
    }

    #[test]
    fn test_exactly_one_outcome_and_deterministic() {
        let validator = StepMotionValidator::default();
        let activities = [None, Some(ActivityType::Walking), Some(ActivityType::Still)];
        let states = [None, Some(MovementState::Running), Some(MovementState::Stationary)];
        for activity in activities {
            for state in states {
                for (accel, dist, speed) in [(5.0, 0.0, 0.0), (25.0, 1.0, 2.0), (9.0, 50.0, 12.0)] {
                    let mut input = walking_input();
                    input.activity_type = activity;
                    input.movement_state = state;
                    input.acceleration = accel;
                    input.gps_distance = dist;
                    input.gps_speed = speed;
                    let first = validator.evaluate(&input);
                    assert_eq!(first, validator.evaluate(&input));
                    match first {
                        StepValidationResult::Accepted { step_delta } => {
                            assert_eq!(step_delta, input.step_delta)
                        }
                        StepValidationResult::Rejected(reason) => {
                            assert!(RejectionReason::ALL.contains(&reason))
                        }
                    }
                }
            }
        }
    }
}
