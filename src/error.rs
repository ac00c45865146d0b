use thiserror::Error;

/// Raised while building the interval tree. A tree that fails any of these
/// checks never reaches a [`crate::models::Workout`].
#[derive(Debug, Clone, Error, PartialEq)]
pub enum ValidationError {
    #[error("missing timing: at least two of start/end/duration are required (got {0})")]
    MissingTiming(&'static str),

    #[error("inconsistent timing: duration {duration} != end {end} - start {start}")]
    InconsistentTiming { start: f64, end: f64, duration: f64 },

    #[error("negative duration {0}")]
    NegativeDuration(f64),

    #[error("{field}: range must declare min or max")]
    EmptyRange { field: &'static str },

    #[error("{field}: bound {value} must not be negative")]
    NegativeBound { field: &'static str, value: f64 },

    #[error("{field}: min {min} is greater than max {max}")]
    MinAboveMax { field: &'static str, min: f64, max: f64 },

    #[error("repeat must be a positive integer")]
    InvalidRepeat,

    #[error("child {index} starts at {actual}, expected {expected} (end of previous child)")]
    BrokenChain {
        index: usize,
        expected: f64,
        actual: f64,
    },

    #[error("segment declares {field} {declared}, but its children add up to {derived}")]
    SegmentTiming {
        field: &'static str,
        declared: f64,
        derived: f64,
    },

    #[error("invalid workout definition: {0}")]
    Parse(String),
}

pub type ValidationResult<T> = Result<T, ValidationError>;
