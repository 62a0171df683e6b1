//! inference::hessian — covariance of `θ̂` from the observed information.
//!
//! Purpose
//! -------
//! Turn the Hessian of the negative log-likelihood at `θ̂` into a covariance
//! matrix and standard errors, or report that the information is singular.
//!
//! Key behaviors
//! -------------
//! - [`observed_information`] differentiates the cost `c(θ) = -ℓ(θ)` twice
//!   with `finitediff`: a central Hessian over the forward-difference
//!   gradient of the cost.
//! - [`covariance_from_information`] inverts the information through a
//!   symmetric eigendecomposition `J = Q Λ Qᵀ`, returning `Q Λ⁻¹ Qᵀ`.
//! - [`standard_errors`] takes square roots of the covariance diagonal.
//!
//! Invariants & assumptions
//! ------------------------
//! - The information is on the **summed** log-likelihood scale, so its
//!   inverse is directly the asymptotic covariance of `θ̂`.
//! - `J` counts as singular when `λ_min ≤ EIGEN_EPS · max(λ_max, 1)`; a
//!   non-positive eigenvalue (saddle or boundary solution) is singular too.
//!   No pseudoinverse is formed in that case.
//!
//! Downstream usage
//! ----------------
//! - `detection::models::fit` calls [`calc_covariance`] after the solver
//!   and stores `None` plus `ConvergenceCode::SingularCovariance` on error.
use crate::{
    inference::errors::{InferenceError, InferenceResult},
    optimization::{
        errors::OptResult,
        loglik_optimizer::{
            Hessian, Theta,
            finite_diff::{FD_HESSIAN_STEP, cost_hessian},
        },
        numerical_stability::transformations::EIGEN_EPS,
    },
};
use nalgebra::DMatrix;
use ndarray::{Array1, Array2};

/// calc_covariance — covariance of `θ̂` from a cost function.
///
/// Parameters
/// ----------
/// - `cost`: `θ ↦ -ℓ(θ)`, smooth around `theta_hat`.
/// - `theta_hat`: the maximizer.
///
/// Returns
/// -------
/// `(information, covariance)` where `information` is the Hessian of the
/// cost and `covariance` its inverse.
///
/// Errors
/// ------
/// - [`InferenceError::Hessian`] if any cost evaluation fails.
/// - [`InferenceError::SingularInformation`] if `J` is not safely positive
///   definite.
pub fn calc_covariance<F>(cost: &F, theta_hat: &Theta) -> InferenceResult<(Hessian, Array2<f64>)>
where
    F: Fn(&Theta) -> OptResult<f64>,
{
    let info = observed_information(cost, theta_hat)?;
    let cov = covariance_from_information(&info)?;
    Ok((info, cov))
}

/// Observed information `J(θ̂) = ∇²c(θ̂)` by finite differences.
pub fn observed_information<F>(cost: &F, theta_hat: &Theta) -> InferenceResult<Hessian>
where
    F: Fn(&Theta) -> OptResult<f64>,
{
    Ok(cost_hessian(cost, theta_hat, FD_HESSIAN_STEP)?)
}

/// Invert a symmetric positive-definite information matrix.
///
/// Errors
/// ------
/// - [`InferenceError::EmptyInformation`] for a `0 × 0` input.
/// - [`InferenceError::DimensionMismatch`] for a non-square input.
/// - [`InferenceError::SingularInformation`] when the smallest eigenvalue
///   is at or below `EIGEN_EPS · max(λ_max, 1)`.
pub fn covariance_from_information(info: &Hessian) -> InferenceResult<Array2<f64>> {
    let n = info.nrows();
    if n == 0 {
        return Err(InferenceError::EmptyInformation);
    }
    if info.ncols() != n {
        return Err(InferenceError::DimensionMismatch {
            expected: n,
            found: (info.nrows(), info.ncols()),
        });
    }

    let dm = DMatrix::<f64>::from_fn(n, n, |i, j| info[[i, j]]);
    let eigen = dm.symmetric_eigen();
    let min_eigenvalue = eigen.eigenvalues.iter().copied().fold(f64::INFINITY, f64::min);
    let max_eigenvalue = eigen.eigenvalues.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    if !min_eigenvalue.is_finite() || min_eigenvalue <= EIGEN_EPS * max_eigenvalue.max(1.0) {
        return Err(InferenceError::SingularInformation { min_eigenvalue, max_eigenvalue });
    }

    let q = &eigen.eigenvectors;
    let mut cov = Array2::<f64>::zeros((n, n));
    for (k, &lambda) in eigen.eigenvalues.iter().enumerate() {
        for i in 0..n {
            let w = q[(i, k)] / lambda;
            for j in 0..n {
                cov[[i, j]] += w * q[(j, k)];
            }
        }
    }
    Ok(cov)
}

/// Square roots of the covariance diagonal (negative rounding noise is
/// clamped to zero).
pub fn standard_errors(cov: &Array2<f64>) -> Array1<f64> {
    cov.diag().mapv(|v| v.max(0.0).sqrt())
}
