//! Error type for post-estimation inference.
//!
//! `InferenceError` covers failures when turning the observed information at
//! `θ̂` into a covariance matrix: the Hessian could not be evaluated, or the
//! information is not positive definite. The fitter treats every variant as
//! "covariance unavailable" rather than a fatal error.
use crate::optimization::errors::OptError;

#[derive(Debug, Clone, PartialEq)]
pub enum InferenceError {
    // ---- Observed information ----
    /// Finite-difference Hessian of the cost failed.
    Hessian(OptError),

    /// Information matrix is not square or does not match `θ̂`.
    DimensionMismatch {
        expected: usize,
        found: (usize, usize),
    },

    // ---- Inversion ----
    /// Smallest eigenvalue at or below the relative singularity threshold.
    SingularInformation {
        min_eigenvalue: f64,
        max_eigenvalue: f64,
    },

    /// No parameters to invert.
    EmptyInformation,
}

pub type InferenceResult<T> = Result<T, InferenceError>;

impl std::error::Error for InferenceError {}

impl From<OptError> for InferenceError {
    fn from(err: OptError) -> Self {
        InferenceError::Hessian(err)
    }
}

impl std::fmt::Display for InferenceError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            InferenceError::Hessian(err) => {
                write!(f, "Inference Error: observed information unavailable ({err})")
            }
            InferenceError::DimensionMismatch { expected, found } => write!(
                f,
                "Inference Error: information matrix is {found:?}, expected ({expected}, {expected})"
            ),
            InferenceError::SingularInformation { min_eigenvalue, max_eigenvalue } => write!(
                f,
                "Inference Error: singular information (eigenvalues in [{min_eigenvalue:e}, {max_eigenvalue:e}])"
            ),
            InferenceError::EmptyInformation => {
                write!(f, "Inference Error: empty information matrix")
            }
        }
    }
}
