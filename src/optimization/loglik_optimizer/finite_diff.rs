//! loglik_optimizer::finite_diff — finite-difference gradient and Hessian helpers.
//!
//! Purpose
//! -------
//! Derivatives of the detection-function likelihood are never available in
//! closed form once series expansions and covariates enter, so the fitter
//! relies on finite differences twice: gradients for L-BFGS and the
//! observed-information Hessian at `θ̂`.
//!
//! Key behaviors
//! -------------
//! - [`run_fd_diff`]: forward-difference gradient with error capture, used
//!   by the adapter and by [`cost_hessian`].
//! - [`compute_hessian`]: `finitediff` central Hessian of a gradient
//!   function, with a forward-difference retry.
//! - [`cost_hessian`]: Hessian of a fallible scalar cost, built from
//!   [`compute_hessian`] over the [`run_fd_diff`] gradient in rescaled
//!   coordinates.
//! - [`symmetrize_hess`]: in-place `(H + Hᵀ)/2`.
//!
//! Invariants & assumptions
//! ------------------------
//! - Differences are taken in the unconstrained `Theta` space.
//! - `finitediff` perturbs by `√ε`; [`cost_hessian`] rescales each
//!   coordinate so that perturbation becomes `rel_step · max(|θ_i|, 1)`.
//!   Summed log-likelihoods are large, and a `√ε` step would drown the
//!   second differences in rounding noise.
//! - Returned gradients and Hessians always pass [`validate_grad`] /
//!   [`validate_hessian`].
//!
//! Testing notes
//! -------------
//! - Unit tests check the Hessian of known quadratics and a smooth
//!   non-quadratic, plus error propagation from the objective.
use crate::optimization::{
    errors::{OptError, OptResult},
    loglik_optimizer::{
        Grad, Theta,
        types::Hessian,
        validation::{validate_grad, validate_hessian},
    },
};
use argmin::core::Error;
use finitediff::FiniteDiff;
use std::cell::RefCell;

/// Default relative step for [`cost_hessian`].
pub const FD_HESSIAN_STEP: f64 = 1e-4;

/// Forward-difference gradient of `func` at `theta`, with error capture.
///
/// Parameters
/// ----------
/// - `theta`: evaluation point; its length is the gradient dimension.
/// - `func`: objective wrapped so that any evaluation error is written into
///   `closure_err` and `NaN` is returned instead.
/// - `closure_err`: shared error slot, cleared on entry.
///
/// Errors
/// ------
/// - The first error captured in `closure_err`, converted into `OptError`.
/// - `GradientDimMismatch` / `InvalidGradient` from [`validate_grad`].
pub fn run_fd_diff<G: Fn(&Theta) -> f64>(
    theta: &Theta, func: &G, closure_err: &RefCell<Option<Error>>,
) -> OptResult<Grad> {
    closure_err.replace(None);
    let fd_grad = theta.forward_diff(func);
    if let Some(err) = closure_err.take() {
        return Err(err.into());
    }
    validate_grad(&fd_grad, theta.len())?;
    Ok(fd_grad)
}

/// Hessian from a gradient function via `finitediff`.
///
/// Tries `central_hessian` first; if that result has the wrong shape or a
/// non-finite entry, retries with `forward_hessian`. The accepted matrix is
/// symmetrized.
///
/// Errors
/// ------
/// - `HessianDimMismatch` / `InvalidHessian` when the forward retry fails
///   validation as well.
pub fn compute_hessian<G: Fn(&Theta) -> Grad>(grad: &G, theta: &Theta) -> OptResult<Hessian> {
    let dim = theta.len();
    let mut hess = theta.central_hessian(grad);
    if validate_hessian(&hess, dim).is_err() {
        hess = theta.forward_hessian(grad);
        validate_hessian(&hess, dim)?;
    }
    symmetrize_hess(&mut hess);
    Ok(hess)
}

/// Hessian of a fallible scalar cost at `theta`.
///
/// Parameters
/// ----------
/// - `cost`: objective `θ ↦ c(θ)`; its errors abort the computation.
/// - `theta`: evaluation point.
/// - `rel_step`: relative step; coordinate `i` is perturbed by
///   `h_i = rel_step · max(|θ_i|, 1)`.
///
/// The cost is evaluated in coordinates `z` with `θ = theta + s ⊙ z` and
/// `s_i = h_i / √ε`, differentiated there with [`run_fd_diff`] and
/// [`compute_hessian`], and mapped back by `H_ij = H^z_ij / (s_i s_j)`.
///
/// Errors
/// ------
/// - The first error returned by `cost`.
/// - `InvalidHessian` when an entry is not finite.
pub fn cost_hessian<F>(cost: &F, theta: &Theta, rel_step: f64) -> OptResult<Hessian>
where
    F: Fn(&Theta) -> OptResult<f64>,
{
    let dim = theta.len();
    let scale = theta.mapv(|t| rel_step * t.abs().max(1.0) / f64::EPSILON.sqrt());
    let cost_err: RefCell<Option<Error>> = RefCell::new(None);
    let grad_err: RefCell<Option<OptError>> = RefCell::new(None);

    let scaled_cost = |z: &Theta| -> f64 {
        match cost(&(theta + &(z * &scale))) {
            Ok(value) => value,
            Err(err) => {
                cost_err.borrow_mut().get_or_insert_with(|| err.into());
                f64::NAN
            }
        }
    };
    let scaled_grad = |z: &Theta| -> Grad {
        match run_fd_diff(z, &scaled_cost, &cost_err) {
            Ok(g) => g,
            Err(err) => {
                grad_err.borrow_mut().get_or_insert(err);
                Grad::from_elem(dim, f64::NAN)
            }
        }
    };

    let hess_z = compute_hessian(&scaled_grad, &Theta::zeros(dim));
    if let Some(err) = grad_err.take() {
        return Err(err);
    }
    let mut hess = hess_z?;
    for ((i, j), value) in hess.indexed_iter_mut() {
        *value /= scale[i] * scale[j];
    }
    Ok(hess)
}

/// Replace `hess` with `(hess + hessᵀ) / 2` in place.
pub fn symmetrize_hess(hess: &mut Hessian) {
    let n = hess.nrows();
    for i in 0..n {
        for j in (i + 1)..n {
            let avg = 0.5 * (hess[[i, j]] + hess[[j, i]]);
            hess[[i, j]] = avg;
            hess[[j, i]] = avg;
        }
    }
}
