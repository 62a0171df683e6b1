//! loglik_optimizer — argmin-backed maximum-likelihood optimizer.
//!
//! Purpose
//! -------
//! Maximize a log-likelihood `ℓ(θ)` over an unconstrained parameter vector.
//! The detection-function fitter implements [`LogLikelihood`] and calls
//! [`maximize`]; everything argmin-specific stays in this module.
//!
//! Key behaviors
//! -------------
//! - [`adapter::ArgMinAdapter`] turns `ℓ` into the cost `c(θ) = -ℓ(θ)` and
//!   finite-differences it when no analytic gradient exists.
//! - [`maximize`] runs L-BFGS (More–Thuente or Hager–Zhang) or Nelder–Mead,
//!   optionally falling back to Nelder–Mead when L-BFGS errors out or stops
//!   abnormally.
//! - [`finite_diff::cost_hessian`] provides the observed-information
//!   Hessian through `finitediff`.
//! - [`OptimOutcome`] separates genuine convergence from an iteration cap
//!   via [`Termination`].
//!
//! Invariants & assumptions
//! ------------------------
//! - Constrained → unconstrained mapping happens in the model layer; this
//!   module only sees `Theta`.
//! - Likelihood implementations report invalid inputs as [`OptError`]
//!   values, never panics.
//!
//! Downstream usage
//! ----------------
//! - `detection::models::fit` implements [`LogLikelihood`] for the
//!   detection-function likelihood and maps [`OptimOutcome`] onto a
//!   convergence code.
//!
//! Testing notes
//! -------------
//! - Submodule tests cover sign conventions ([`adapter`]), builders,
//!   finite differences, validation, option parsing and an end-to-end
//!   toy maximization for every solver ([`api`]).
//!
//! [`OptError`]: crate::optimization::errors::OptError

pub mod adapter;
pub mod api;
pub mod builders;
pub mod finite_diff;
pub mod run;
pub mod traits;
pub mod types;
pub mod validation;

pub use self::api::maximize;
pub use self::traits::{
    LogLikelihood, MLEOptions, OptimOutcome, SolverKind, Termination, Tolerances,
};
pub use self::types::{Cost, DEFAULT_LBFGS_MEM, FnEvalMap, Grad, Hessian, Theta};

pub mod prelude {
    pub use super::api::maximize;
    pub use super::traits::{LogLikelihood, MLEOptions, OptimOutcome, SolverKind, Tolerances};
    pub use super::types::{Cost, Grad, Theta};
}
