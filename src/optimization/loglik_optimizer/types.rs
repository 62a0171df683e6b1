//! loglik_optimizer::types — numeric aliases and solver wiring.
//!
//! Purpose
//! -------
//! Keep the `ndarray`/Argmin generic plumbing in one place so that the
//! detection-function fitter can talk about `Theta`, `Grad`, `Hessian` and
//! `Cost` without spelling out backend types.
//!
//! Invariants & assumptions
//! ------------------------
//! - Every vector and matrix is an `ndarray` container over `f64`.
//! - `Cost` is the negated log-likelihood; the sign flip lives in the adapter.
//! - The L-BFGS aliases use Argmin's `(Param, Gradient, Float)` form and the
//!   Nelder–Mead alias uses `(Param, Float)`, as of argmin 0.10.
use argmin::solver::{
    linesearch::{HagerZhangLineSearch, MoreThuenteLineSearch},
    neldermead::NelderMead,
    quasinewton::LBFGS,
};
use ndarray::{Array1, Array2};
use std::collections::HashMap;

/// Unconstrained parameter vector `θ` of a detection function.
pub type Theta = Array1<f64>;

/// Gradient vector, same shape as [`Theta`].
pub type Grad = Array1<f64>;

/// Dense `n × n` Hessian for `n = Theta.len()`.
pub type Hessian = Array2<f64>;

/// Scalar objective, the cost `c(θ) = -ℓ(θ)`.
pub type Cost = f64;

/// Function-evaluation counters as reported by argmin (`"cost_count"`, ...).
pub type FnEvalMap = HashMap<String, u64>;

/// Default L-BFGS history size.
pub const DEFAULT_LBFGS_MEM: usize = 7;

/// Default offset used to span the initial Nelder–Mead simplex around `θ₀`.
pub const DEFAULT_SIMPLEX_STEP: f64 = 0.5;

pub type HagerZhangLS = HagerZhangLineSearch<Theta, Grad, Cost>;
pub type MoreThuenteLS = MoreThuenteLineSearch<Theta, Grad, Cost>;

/// L-BFGS with Hager–Zhang line search.
pub type LbfgsHagerZhang = LBFGS<HagerZhangLS, Theta, Grad, Cost>;

/// L-BFGS with More–Thuente line search.
pub type LbfgsMoreThuente = LBFGS<MoreThuenteLS, Theta, Grad, Cost>;

/// Derivative-free simplex solver.
pub type NelderMeadSolver = NelderMead<Theta, Cost>;
