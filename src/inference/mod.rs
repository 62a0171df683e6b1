//! inference — covariance and standard errors for fitted detection functions.
//!
//! Purpose
//! -------
//! Post-estimation uncertainty in the unconstrained parameter space `θ`:
//! the observed information at `θ̂`, its inverse, and standard errors.
//!
//! Conventions
//! -----------
//! - Everything lives in optimizer space; mapping to natural parameters
//!   (scales, shapes) is the model layer's concern.
//! - Failures are reported as [`InferenceError`]; the fitter records them
//!   as a singular covariance instead of propagating them.

pub mod errors;
pub mod hessian;

pub use self::errors::{InferenceError, InferenceResult};
pub use self::hessian::{calc_covariance, covariance_from_information, standard_errors};

pub mod prelude {
    pub use super::errors::{InferenceError, InferenceResult};
    pub use super::hessian::{calc_covariance, standard_errors};
}
