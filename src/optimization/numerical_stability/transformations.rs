//! Numerical stability utilities.
//!
//! Guarded versions of the nonlinear maps used to move detection-function
//! parameters between the unconstrained optimizer space and their natural
//! domain, plus the tolerances shared by the likelihood and inference code.
//!
//! # Provided items
//! - [`safe_softplus`] / [`safe_softplus_inv`]: ℝ ↔ (0, ∞) for shape
//!   parameters (hazard-rate power, uniform knee, gamma shape offset).
//! - [`safe_exp`]: `exp` with the argument clamped, for log-link scales.
//! - [`safe_logistic`]: `1 / (1 + exp(-x))` without overflow.
//! - [`safe_ln`]: `ln` floored at [`DENSITY_FLOOR`].

/// Smallest eigenvalue (relative to the largest, floored at 1) accepted
/// as positive when inverting an information matrix.
pub const EIGEN_EPS: f64 = 1e-10;

/// Relative slack used in boundary comparisons (e.g. ESW ≤ strip width).
pub const GENERAL_TOL: f64 = 1e-6;

/// Floor applied to densities before taking logs.
pub const DENSITY_FLOOR: f64 = 1e-300;

/// Largest magnitude passed to `exp` by [`safe_exp`].
pub const EXP_CLAMP: f64 = 700.0;

/// Numerically stable softplus: `ln(1 + exp(x))`.
///
/// For `x > 20`, `softplus(x) = x` to machine precision; otherwise
/// `ln1p(exp(x))`.
pub fn safe_softplus(x: f64) -> f64 {
    if x > 20.0 { x } else { x.exp().ln_1p() }
}

/// Inverse softplus on `(0, ∞)`: `t = ln(exp(x) - 1)`.
///
/// Mirrors the cutoff in [`safe_softplus`]. `x` must be finite and `> 0`.
pub fn safe_softplus_inv(x: f64) -> f64 {
    if x > 20.0 { x } else { x.exp_m1().ln() }
}

/// `exp(x)` with `x` clamped to `[-EXP_CLAMP, EXP_CLAMP]`.
pub fn safe_exp(x: f64) -> f64 {
    x.clamp(-EXP_CLAMP, EXP_CLAMP).exp()
}

/// Logistic function `1 / (1 + exp(-x))` evaluated on the branch that
/// cannot overflow.
pub fn safe_logistic(x: f64) -> f64 {
    if x >= 0.0 {
        1.0 / (1.0 + (-x).exp())
    } else {
        let e = x.exp();
        e / (1.0 + e)
    }
}

/// `ln(max(x, DENSITY_FLOOR))`; NaN maps to `ln(DENSITY_FLOOR)`.
pub fn safe_ln(x: f64) -> f64 {
    if x.is_nan() || x < DENSITY_FLOOR { DENSITY_FLOOR.ln() } else { x.ln() }
}
