//! numerical_stability — guarded transforms and shared tolerances.
//!
//! Purpose
//! -------
//! Keep overflow-prone maps (softplus, exp, logistic, log) and the small
//! tolerances used across the crate in one place, so the likelihood,
//! fitter and inference layers agree on the same guards.
//!
//! Invariants & assumptions
//! ------------------------
//! - Inputs are finite `f64` unless stated otherwise; shape and domain
//!   validation happens in the detection layer.
//! - No logging, I/O or global state: safe inside inner integration loops.
//!
//! Downstream usage
//! ----------------
//! - `detection::core::params` maps θ onto scales and shapes.
//! - `detection::core::likelihoods` uses [`safe_logistic`] for the uniform
//!   knee and [`safe_ln`] for log-density contributions.
//! - `inference::hessian` uses [`EIGEN_EPS`] to flag singular information.

pub mod transformations;

pub use self::transformations::{
    DENSITY_FLOOR, EIGEN_EPS, EXP_CLAMP, GENERAL_TOL, safe_exp, safe_ln, safe_logistic,
    safe_softplus, safe_softplus_inv,
};

pub mod prelude {
    pub use super::transformations::{
        EIGEN_EPS, GENERAL_TOL, safe_exp, safe_ln, safe_logistic, safe_softplus,
        safe_softplus_inv,
    };
}
