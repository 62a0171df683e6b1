//! Errors for abundance estimation, model selection and the bootstrap.
//!
//! Detection-layer input errors are wrapped unchanged through
//! `From<DetectionError>`, so callers can `?` through fits inside the
//! drivers. Resample failures are *not* errors; only the case where a caller
//! insists on an interval that could not be formed is escalated here.
use crate::detection::errors::DetectionError;

pub type AbundanceResult<T> = Result<T, AbundanceError>;

#[derive(Debug, Clone, PartialEq)]
pub enum AbundanceError {
    /// Structural input error from the detection layer.
    Detection(DetectionError),

    // ---- Estimation inputs ----
    /// Study area must be finite and > 0.
    InvalidArea { value: f64 },

    // ---- Bootstrap configuration ----
    /// Confidence level must lie strictly between 0 and 1.
    InvalidConfidenceLevel { value: f64 },

    /// At least one resample is required.
    InvalidResamples { value: usize },

    /// Minimum success fraction must lie in [0, 1].
    InvalidMinSuccessFraction { value: f64 },

    /// Worker pool could not be created.
    PoolBuild { text: String },

    // ---- Selection ----
    /// The candidate grid is empty.
    EmptyGrid,

    /// No candidate converged cleanly with a valid scale.
    NoValidCandidate { candidates: usize },

    // ---- Escalated bootstrap outcome ----
    /// Every resample failed, so no interval exists.
    NoSuccessfulResamples { requested: usize, failed: usize },
}

impl std::error::Error for AbundanceError {}

impl From<DetectionError> for AbundanceError {
    fn from(err: DetectionError) -> Self {
        AbundanceError::Detection(err)
    }
}

impl std::fmt::Display for AbundanceError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AbundanceError::Detection(err) => write!(f, "{err}"),
            AbundanceError::InvalidArea { value } => {
                write!(f, "Study area {value} must be finite and > 0")
            }
            AbundanceError::InvalidConfidenceLevel { value } => {
                write!(f, "Confidence level {value} must lie in (0, 1)")
            }
            AbundanceError::InvalidResamples { value } => {
                write!(f, "Number of bootstrap resamples must be >= 1, got {value}")
            }
            AbundanceError::InvalidMinSuccessFraction { value } => {
                write!(f, "Minimum success fraction {value} must lie in [0, 1]")
            }
            AbundanceError::PoolBuild { text } => write!(f, "Could not build worker pool: {text}"),
            AbundanceError::EmptyGrid => write!(f, "Model selection grid is empty"),
            AbundanceError::NoValidCandidate { candidates } => write!(
                f,
                "None of the {candidates} candidate models converged with a valid scale"
            ),
            AbundanceError::NoSuccessfulResamples { requested, failed } => write!(
                f,
                "All bootstrap resamples failed ({failed} of {requested}); no interval available"
            ),
        }
    }
}
