//! models — fitting and fitted detection functions.
//!
//! Purpose
//! -------
//! Wire the detection core into the generic optimizer: the likelihood of
//! truncated distances ([`DetectionLikelihood`]), the fitting entry point
//! ([`fit_detection_function`]) and the immutable fitted model
//! ([`DetectionFunctionModel`]).
//!
//! Key behaviors
//! -------------
//! - Fitting validates structure up front and records numerical trouble as
//!   a [`ConvergenceCode`] on the returned model.
//! - Covariance comes from the observed information (see `inference`).
//! - Models serialize with serde and rebuild curves on demand.
//!
//! Invariants & assumptions
//! ------------------------
//! - θ layout follows `detection::core::params::ParamLayout`.
//! - A fitted model never changes; refitting produces a new value.
pub mod detection_function;
pub mod fit;
pub mod likelihood;

pub use self::detection_function::{
    Coefficient, ConvergenceCode, DetectionFunctionModel, FitStatus,
};
pub use self::fit::{build_fit_data, fit_detection_function};
pub use self::likelihood::{DEGENERATE_LOGLIK, DetectionLikelihood, FitData};
