use thiserror::Error;

/// Walk tracker error types
#[derive(Error, Debug, Clone, PartialEq)]
pub enum TrackerError {
    #[error("Session already running")]
    AlreadyRunning,

    #[error("Session not running")]
    NotRunning,

    #[error("Invalid session state: {0}")]
    InvalidState(String),

    #[error("Invalid parameters: {0}")]
    InvalidParameters(String),

    /// NaN or infinite value inside a filter or the smoother. Never leaves
    /// the per-fix surface; callers see a rejected fix or the raw route.
    #[error("Numeric fault: {0}")]
    NumericFault(String),

    #[error("Configuration error: {0}")]
    Config(String),
}

pub type TrackerResult<T> = Result<T, TrackerError>;

/// Returns `NumericFault` naming `what` unless every value is finite.
pub(crate) fn ensure_finite(what: &str, values: &[f64]) -> TrackerResult<()> {
    if values.iter().all(|v| v.is_finite()) {
        Ok(())
    } else {
        Err(TrackerError::NumericFault(format!("non-finite {what}")))
    }
}
