//! One walking session: wires the live filter chain, step validation,
//! distance fusion and end-of-walk smoothing around the accepted-fix buffer.
//!
//! A `WalkSession` is owned by whatever single context delivers location and
//! pedometer events. Create a new one per walk; nothing carries over.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::config::TrackerConfig;
use crate::distance::HybridDistanceEstimator;
use crate::error::{TrackerError, TrackerResult};
use crate::filters::{ChainOutcome, LiveFilterChain, SpeedDecision};
use crate::geodesy::fix_distance;
use crate::smoothing::RouteSmoother;
use crate::step_validator::StepMotionValidator;
use crate::types::{
    ActivityType, GeoFix, MovementState, RejectionReason, SmoothedRoute, StepValidationInput,
    StepValidationResult,
};

/// Session state machine states
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SessionState {
    /// Created, not yet started
    Idle,
    Tracking,
    /// Events are ignored until resumed
    Paused,
    Finished,
}

/// Pedometer reading plus the context sampled alongside it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StepTick {
    pub timestamp: i64,
    /// Cumulative count as reported by the step-counter sensor.
    pub cumulative_steps: i32,
    #[serde(default)]
    pub activity_type: Option<ActivityType>,
    #[serde(default)]
    pub movement_state: Option<MovementState>,
    /// Accelerometer magnitude, m/s².
    #[serde(default)]
    pub acceleration: f32,
}

/// Accepted fixes and credited steps for the active session.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct WalkSessionBuffer {
    fixes: Vec<GeoFix>,
    /// Pedometer baseline plus every accepted delta.
    step_count: i32,
    initial_step_count: i32,
}

impl WalkSessionBuffer {
    pub fn new(initial_step_count: i32) -> Self {
        Self {
            fixes: Vec::new(),
            step_count: initial_step_count,
            initial_step_count,
        }
    }

    /// Insert keeping the buffer ordered by timestamp. A fix stamped at or
    /// before an already-buffered one lands after its equal-time neighbours.
    pub fn push(&mut self, fix: GeoFix) {
        let at = self.fixes.partition_point(|f| f.timestamp <= fix.timestamp);
        self.fixes.insert(at, fix);
    }

    pub fn credit_steps(&mut self, delta: i32) {
        self.step_count = self.step_count.saturating_add(delta);
    }

    pub fn fixes(&self) -> &[GeoFix] {
        &self.fixes
    }

    pub fn step_count(&self) -> i32 {
        self.step_count
    }

    pub fn initial_step_count(&self) -> i32 {
        self.initial_step_count
    }

    pub fn steps_taken(&self) -> i32 {
        self.step_count - self.initial_step_count
    }

    /// Fixes with `timestamp >= since`.
    pub fn fixes_since(&self, since: i64) -> &[GeoFix] {
        let start = self.fixes.partition_point(|f| f.timestamp < since);
        &self.fixes[start..]
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StepRejectionCounts {
    pub invalid_activity_type: u32,
    pub invalid_movement_state: u32,
    pub phone_shake: u32,
    pub vehicle_movement: u32,
    pub stationary_walking: u32,
}

impl StepRejectionCounts {
    fn record(&mut self, reason: RejectionReason) {
        let slot = match reason {
            RejectionReason::InvalidActivityType => &mut self.invalid_activity_type,
            RejectionReason::InvalidMovementState => &mut self.invalid_movement_state,
            RejectionReason::PhoneShake => &mut self.phone_shake,
            RejectionReason::VehicleMovement => &mut self.vehicle_movement,
            RejectionReason::StationaryWalking => &mut self.stationary_walking,
        };
        *slot += 1;
    }

    pub fn get(&self, reason: RejectionReason) -> u32 {
        match reason {
            RejectionReason::InvalidActivityType => self.invalid_activity_type,
            RejectionReason::InvalidMovementState => self.invalid_movement_state,
            RejectionReason::PhoneShake => self.phone_shake,
            RejectionReason::VehicleMovement => self.vehicle_movement,
            RejectionReason::StationaryWalking => self.stationary_walking,
        }
    }

    pub fn total(&self) -> u32 {
        RejectionReason::ALL.iter().map(|r| self.get(*r)).sum()
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionStats {
    pub fixes_received: u32,
    pub fixes_accepted: u32,
    pub fixes_rejected_accuracy: u32,
    pub fixes_rejected_numeric: u32,
    /// Accepted but held at the previous point by the speed gate.
    pub fixes_clamped: u32,
    pub timestamp_errors: u32,
    pub step_ticks: u32,
    pub step_ticks_accepted: u32,
    pub step_rejections: StepRejectionCounts,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionSummary {
    pub session_id: String,
    pub started_at: Option<String>,
    pub route: SmoothedRoute,
    pub raw_point_count: usize,
    pub distance_m: f32,
    pub steps: i32,
    pub average_step_length: Option<f64>,
    pub stats: SessionStats,
}

pub struct WalkSession {
    session_id: String,
    started_at: Option<DateTime<Utc>>,
    state: SessionState,
    config: TrackerConfig,
    chain: LiveFilterChain,
    validator: StepMotionValidator,
    estimator: HybridDistanceEstimator,
    smoother: RouteSmoother,
    buffer: WalkSessionBuffer,
    last_cumulative_steps: i32,
    stats: SessionStats,
}

impl WalkSession {
    /// Create new session in Idle state
    pub fn new(config: TrackerConfig) -> Self {
        let session_id = format!("walk_{}", Utc::now().timestamp_millis());
        Self {
            session_id,
            started_at: None,
            state: SessionState::Idle,
            chain: LiveFilterChain::new(&config.filter),
            validator: StepMotionValidator::new(config.steps.clone()),
            estimator: HybridDistanceEstimator::new(config.distance.clone(), 0),
            smoother: RouteSmoother::new(config.smoothing.clone()),
            buffer: WalkSessionBuffer::default(),
            last_cumulative_steps: 0,
            stats: SessionStats::default(),
            config,
        }
    }

    /// Idle → Tracking. The only place the filter chain is reset.
    pub fn start(&mut self, initial_step_count: i32) -> TrackerResult<()> {
        match self.state {
            SessionState::Idle => {}
            SessionState::Tracking | SessionState::Paused => {
                return Err(TrackerError::AlreadyRunning)
            }
            SessionState::Finished => {
                return Err(TrackerError::InvalidState(
                    "session already finished".to_string(),
                ))
            }
        }

        self.chain.reset();
        self.estimator.reset(initial_step_count);
        self.buffer = WalkSessionBuffer::new(initial_step_count);
        self.last_cumulative_steps = initial_step_count;
        self.stats = SessionStats::default();
        self.started_at = Some(Utc::now());
        self.state = SessionState::Tracking;
        log::info!("{}: tracking from step count {initial_step_count}", self.session_id);
        Ok(())
    }

    /// Tracking → Paused
    pub fn pause(&mut self) -> TrackerResult<()> {
        match self.state {
            SessionState::Tracking => {
                self.state = SessionState::Paused;
                Ok(())
            }
            SessionState::Paused => Err(TrackerError::InvalidState("Already paused".to_string())),
            SessionState::Idle => Err(TrackerError::NotRunning),
            SessionState::Finished => {
                Err(TrackerError::InvalidState("session already finished".to_string()))
            }
        }
    }

    /// Paused → Tracking, keeping all filter state
    pub fn resume(&mut self) -> TrackerResult<()> {
        match self.state {
            SessionState::Paused => {
                self.state = SessionState::Tracking;
                Ok(())
            }
            SessionState::Tracking => Err(TrackerError::AlreadyRunning),
            SessionState::Idle => Err(TrackerError::NotRunning),
            SessionState::Finished => {
                Err(TrackerError::InvalidState("session already finished".to_string()))
            }
        }
    }

    /// Feed one raw fix. `None` means the fix was discarded (or the
    /// session is not tracking); otherwise the filtered coordinate, which
    /// has also been appended to the buffer.
    pub fn on_location(&mut self, fix: &GeoFix) -> Option<(f64, f64)> {
        if self.state != SessionState::Tracking {
            return None;
        }
        self.stats.fixes_received += 1;

        let outcome =
            self.chain
                .filter_detailed(fix.latitude, fix.longitude, fix.accuracy, fix.timestamp);
        match outcome {
            ChainOutcome::Passed { point, decision } => {
                match decision {
                    SpeedDecision::Clamped { .. } => self.stats.fixes_clamped += 1,
                    SpeedDecision::TimestampError { .. } => self.stats.timestamp_errors += 1,
                    SpeedDecision::Initialized | SpeedDecision::Accepted { .. } => {}
                }
                self.stats.fixes_accepted += 1;
                self.buffer
                    .push(GeoFix::new(point.0, point.1, fix.accuracy, fix.timestamp));
                Some(point)
            }
            ChainOutcome::RejectedAccuracy { .. } => {
                self.stats.fixes_rejected_accuracy += 1;
                None
            }
            ChainOutcome::RejectedNumeric(_) => {
                self.stats.fixes_rejected_numeric += 1;
                None
            }
        }
    }

    /// Validate the steps reported since the previous tick and credit them
    /// when accepted.
    ///
    /// Returns `None` unless tracking. The baseline still advances in that
    /// case, so steps taken while paused are never credited later.
    pub fn on_step_tick(&mut self, tick: &StepTick) -> Option<StepValidationResult> {
        let mut step_delta = tick.cumulative_steps.saturating_sub(self.last_cumulative_steps);
        if step_delta < 0 {
            log::warn!(
                "{}: pedometer went backwards ({} -> {}), re-basing",
                self.session_id,
                self.last_cumulative_steps,
                tick.cumulative_steps
            );
            step_delta = 0;
        }
        self.last_cumulative_steps = tick.cumulative_steps;

        if self.state != SessionState::Tracking {
            return None;
        }

        let input = self.validation_input(tick, step_delta);
        let result = self.validator.evaluate(&input);

        self.stats.step_ticks += 1;
        match result {
            StepValidationResult::Accepted { step_delta } => {
                self.stats.step_ticks_accepted += 1;
                self.buffer.credit_steps(step_delta);
            }
            StepValidationResult::Rejected(reason) => {
                log::debug!("{}: rejected {step_delta} steps: {}", self.session_id, reason.as_str());
                self.stats.step_rejections.record(reason);
            }
        }
        Some(result)
    }

    fn validation_input(&self, tick: &StepTick, step_delta: i32) -> StepValidationInput {
        let window = self
            .buffer
            .fixes_since(tick.timestamp.saturating_sub(self.config.session.step_window_ms));
        // net displacement: walking moves it, standing-still jitter does not
        let gps_distance = match (window.first(), window.last()) {
            (Some(first), Some(last)) => fix_distance(first, last) as f32,
            _ => 0.0,
        };

        StepValidationInput {
            step_delta,
            activity_type: tick.activity_type,
            movement_state: tick.movement_state,
            gps_distance,
            gps_speed: self.estimator.speed(self.buffer.fixes()),
            acceleration: tick.acceleration,
            locations: window.to_vec(),
        }
    }

    pub fn total_distance(&mut self) -> f32 {
        self.estimator
            .total_distance(self.buffer.fixes(), self.buffer.step_count())
    }

    pub fn speed(&self) -> f32 {
        self.estimator.speed(self.buffer.fixes())
    }

    /// Tracking|Paused → Finished, smoothing the buffered route once.
    pub fn finish(&mut self) -> TrackerResult<SessionSummary> {
        match self.state {
            SessionState::Tracking | SessionState::Paused => {}
            SessionState::Idle => return Err(TrackerError::NotRunning),
            SessionState::Finished => {
                return Err(TrackerError::InvalidState(
                    "session already finished".to_string(),
                ))
            }
        }

        let distance_m = self.total_distance();
        let route = self.smoother.smooth_route(self.buffer.fixes());
        self.state = SessionState::Finished;
        log::info!(
            "{}: finished, {:.1} m, {} steps, {} -> {} route points",
            self.session_id,
            distance_m,
            self.buffer.steps_taken(),
            self.buffer.fixes().len(),
            route.len()
        );

        Ok(SessionSummary {
            session_id: self.session_id.clone(),
            started_at: self.started_at.map(|t| t.to_rfc3339()),
            route,
            raw_point_count: self.buffer.fixes().len(),
            distance_m,
            steps: self.buffer.steps_taken(),
            average_step_length: self.estimator.calibration().average_step_length,
            stats: self.stats,
        })
    }

    pub fn session_id(&self) -> &str {
        &self.session_id
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn is_tracking(&self) -> bool {
        self.state == SessionState::Tracking
    }

    pub fn buffer(&self) -> &WalkSessionBuffer {
        &self.buffer
    }

    pub fn stats(&self) -> &SessionStats {
        &self.stats
    }

    pub fn config(&self) -> &TrackerConfig {
        &self.config
    }
}

impl Default for WalkSession {
    fn default() -> Self {
        Self::new(TrackerConfig::default())
    }
}
