//! optimization — MLE stack, numerical helpers and unified error surface.
//!
//! Purpose
//! -------
//! Everything the detection-function fitter needs to turn a likelihood into
//! estimates: an argmin-backed maximizer ([`loglik_optimizer`]), guarded
//! parameter transforms ([`numerical_stability`]) and one error enum
//! ([`errors::OptError`]) for configuration, numerical and backend failures.
//!
//! Conventions
//! -----------
//! - Solvers maximize `ℓ(θ)` by minimizing `c(θ) = -ℓ(θ)`; outcomes are
//!   reported in terms of `ℓ`.
//! - `θ` is unconstrained; the model layer owns the mapping to natural
//!   parameters.
//! - Public entry points return `OptResult<T>`; raw argmin errors never
//!   escape.
//! - The only logging here is a `debug!` when a solver fallback happens.

pub mod errors;
pub mod loglik_optimizer;
pub mod numerical_stability;

pub mod prelude {
    pub use super::errors::{OptError, OptResult};
    pub use super::loglik_optimizer::prelude::*;
    pub use super::numerical_stability::prelude::*;
}
