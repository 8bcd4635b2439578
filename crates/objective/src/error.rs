use crate::schedule::RegularizationTerm;

/// Errors surfaced by objective construction and evaluation.
///
/// Numerical-domain problems (non-positive rates, underflowing prior
/// variance) are deliberately absent: they show up as NaN/inf in the
/// returned loss tensors and are left to the training loop to detect.
#[derive(Debug, thiserror::Error)]
pub enum ObjectiveError {
    /// `min_weight` is greater than `max_weight` for a scheduled term.
    #[error("{term} schedule: min_weight {min} exceeds max_weight {max}")]
    InvalidWeightBounds {
        term: RegularizationTerm,
        min: f64,
        max: f64,
    },

    /// A schedule must ramp over at least one step.
    #[error("{term} schedule: schedule_duration must be positive")]
    InvalidScheduleDuration { term: RegularizationTerm },

    /// A configured weight is NaN or infinite.
    #[error("{term} schedule: {field} must be finite, got {value}")]
    NonFiniteWeight {
        term: RegularizationTerm,
        field: &'static str,
        value: f64,
    },

    /// Time-bin width must be finite and strictly positive.
    #[error("time-bin width dt must be finite and positive, got {0}")]
    InvalidTimeBin(f64),

    /// Two tensors that must agree in shape do not.
    #[error("shape mismatch for {what}: expected {expected:?}, got {actual:?}")]
    ShapeMismatch {
        what: &'static str,
        expected: Vec<usize>,
        actual: Vec<usize>,
    },
}
