//! Unified error surface for the optimizer layer.
//!
//! `OptError` collects configuration mistakes (tolerances, solver choice),
//! numerical failures (non-finite costs, gradients, Hessians), backend errors
//! raised by `argmin`, and likelihood-evaluation failures forwarded from the
//! detection layer. Everything that crosses the optimizer boundary is an
//! `OptResult<T>`.
use argmin::core::{ArgminError, Error};

use crate::detection::errors::DetectionError;

pub type OptResult<T> = Result<T, OptError>;

#[derive(Debug, Clone, PartialEq)]
pub enum OptError {
    // ---- Gradient ----
    /// No analytic gradient; callers fall back to finite differences.
    GradientNotImplemented,
    GradientDimMismatch { expected: usize, found: usize },
    InvalidGradient { index: usize, value: f64, reason: &'static str },

    // ---- Solver configuration ----
    InvalidTolGrad { tol: f64, reason: &'static str },
    InvalidTolCost { tol: f64, reason: &'static str },
    InvalidMaxIter { max_iter: usize, reason: &'static str },
    /// Neither a gradient nor a cost tolerance was set.
    NoTolerancesProvided,
    InvalidSolver { name: String, reason: &'static str },
    InvalidLBFGSMem { mem: usize, reason: &'static str },
    /// Nelder–Mead simplex offset; finite and > 0.
    InvalidSimplexStep { step: f64 },

    // ---- Evaluation ----
    /// The negated log-likelihood was NaN or infinite.
    NonFiniteCost { value: f64 },
    InvalidThetaHat { index: usize, value: f64, reason: &'static str },
    /// The solver finished without a best parameter vector.
    MissingThetaHat,
    HessianDimMismatch { expected: usize, found: (usize, usize) },
    InvalidHessian { row: usize, col: usize, value: f64 },

    // ---- argmin ----
    InvalidParameter { text: String },
    NotImplemented { text: String },
    NotInitialized { text: String },
    ConditionViolated { text: String },
    CheckPointNotFound { text: String },
    PotentialBug { text: String },
    ImpossibleError { text: String },
    /// Any other error surfaced by the argmin executor.
    BackendError { text: String },

    // ---- Detection likelihood ----
    ThetaLengthMismatch { expected: usize, actual: usize },
    InvalidThetaInput { index: usize, value: f64 },
    /// The strip holds no detections.
    EmptyLikelihoodData,
    Likelihood { text: String },

    UnknownError,
}

impl std::error::Error for OptError {}

impl std::fmt::Display for OptError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OptError::GradientNotImplemented => write!(f, "No analytic gradient available"),
            OptError::GradientDimMismatch { expected, found } => {
                write!(f, "Gradient has {found} entries, expected {expected}")
            }
            OptError::InvalidGradient { index, value, reason } => {
                write!(f, "Gradient entry {index} = {value}: {reason}")
            }
            OptError::InvalidTolGrad { tol, reason } => {
                write!(f, "Gradient tolerance {tol} rejected: {reason}")
            }
            OptError::InvalidTolCost { tol, reason } => {
                write!(f, "Cost tolerance {tol} rejected: {reason}")
            }
            OptError::InvalidMaxIter { max_iter, reason } => {
                write!(f, "Iteration cap {max_iter} rejected: {reason}")
            }
            OptError::NoTolerancesProvided => {
                write!(f, "Set at least one of tol_grad, tol_cost or max_iter")
            }
            OptError::InvalidSolver { name, reason } => write!(f, "Solver '{name}': {reason}"),
            OptError::InvalidLBFGSMem { mem, reason } => {
                write!(f, "L-BFGS memory {mem} rejected: {reason}")
            }
            OptError::InvalidSimplexStep { step } => {
                write!(f, "Simplex step {step} must be finite and > 0")
            }
            OptError::NonFiniteCost { value } => write!(f, "Cost evaluated to {value}"),
            OptError::InvalidThetaHat { index, value, reason } => {
                write!(f, "Estimate {index} = {value}: {reason}")
            }
            OptError::MissingThetaHat => write!(f, "Solver returned no parameter estimate"),
            OptError::HessianDimMismatch { expected, found } => {
                write!(f, "Hessian is {found:?}, expected ({expected}, {expected})")
            }
            OptError::InvalidHessian { row, col, value } => {
                write!(f, "Hessian entry ({row}, {col}) = {value} is not finite")
            }
            OptError::InvalidParameter { text } => write!(f, "argmin invalid parameter: {text}"),
            OptError::NotImplemented { text } => write!(f, "argmin not implemented: {text}"),
            OptError::NotInitialized { text } => write!(f, "argmin not initialized: {text}"),
            OptError::ConditionViolated { text } => write!(f, "argmin condition violated: {text}"),
            OptError::CheckPointNotFound { text } => write!(f, "argmin checkpoint missing: {text}"),
            OptError::PotentialBug { text } => write!(f, "argmin potential bug: {text}"),
            OptError::ImpossibleError { text } => write!(f, "argmin impossible error: {text}"),
            OptError::BackendError { text } => write!(f, "Optimizer backend: {text}"),
            OptError::ThetaLengthMismatch { expected, actual } => {
                write!(f, "Parameter vector has length {actual}, model expects {expected}")
            }
            OptError::InvalidThetaInput { index, value } => {
                write!(f, "Parameter {index} = {value} is not finite")
            }
            OptError::EmptyLikelihoodData => {
                write!(f, "No detections inside the truncation strip")
            }
            OptError::Likelihood { text } => write!(f, "Likelihood evaluation failed: {text}"),
            OptError::UnknownError => write!(f, "Unrecognised optimizer error"),
        }
    }
}

impl From<Error> for OptError {
    fn from(original_err: Error) -> Self {
        // Errors raised by our own cost function travel through argmin as
        // boxed `OptError`s; recover them before trying argmin's own enum.
        let original_err = match original_err.downcast::<OptError>() {
            Ok(opt_err) => return opt_err,
            Err(err) => err,
        };
        match original_err.downcast() {
            Ok(argmin_err) => match argmin_err {
                ArgminError::InvalidParameter { text } => OptError::InvalidParameter { text },
                ArgminError::NotImplemented { text } => OptError::NotImplemented { text },
                ArgminError::NotInitialized { text } => OptError::NotInitialized { text },
                ArgminError::ConditionViolated { text } => OptError::ConditionViolated { text },
                ArgminError::CheckpointNotFound { text } => OptError::CheckPointNotFound { text },
                ArgminError::PotentialBug { text } => OptError::PotentialBug { text },
                ArgminError::ImpossibleError { text } => OptError::ImpossibleError { text },
                _ => OptError::UnknownError,
            },
            Err(err) => OptError::BackendError { text: err.to_string() },
        }
    }
}

impl From<DetectionError> for OptError {
    fn from(err: DetectionError) -> Self {
        match err {
            DetectionError::StartLengthMismatch { expected, actual } => {
                OptError::ThetaLengthMismatch { expected, actual }
            }
            DetectionError::NonFiniteStart { index, value } => {
                OptError::InvalidThetaInput { index, value }
            }
            DetectionError::NoDetectionsInStrip { .. } => OptError::EmptyLikelihoodData,
            other => OptError::Likelihood { text: other.to_string() },
        }
    }
}
