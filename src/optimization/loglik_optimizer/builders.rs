//! loglik_optimizer::builders — solver construction helpers.
//!
//! Purpose
//! -------
//! Hide argmin's generic wiring behind small builders that apply the
//! crate-level [`MLEOptions`] (tolerances, memory, simplex size).
//!
//! Key behaviors
//! -------------
//! - L-BFGS with Hager–Zhang or More–Thuente line search, tolerances applied
//!   by the shared [`configure_lbfgs`].
//! - Nelder–Mead with an axis-aligned initial simplex around `θ₀` and
//!   `tol_cost` as the simplex standard-deviation tolerance.
//!
//! Conventions
//! -----------
//! - Builders never set `θ₀` on the executor state or `max_iters`; the
//!   runner does that.
//! - argmin configuration errors surface as [`OptError`] through
//!   `From<argmin::core::Error>`.
//!
//! [`OptError`]: crate::optimization::errors::OptError
use argmin::solver::quasinewton::LBFGS;

use crate::optimization::{
    errors::OptResult,
    loglik_optimizer::{
        traits::MLEOptions,
        types::{
            Cost, DEFAULT_LBFGS_MEM, Grad, HagerZhangLS, LbfgsHagerZhang, LbfgsMoreThuente,
            MoreThuenteLS, NelderMeadSolver, Theta,
        },
    },
};

/// L-BFGS with Hager–Zhang line search.
///
/// Errors
/// ------
/// - `OptError` when argmin rejects a tolerance.
pub fn build_optimizer_hager_zhang(opts: &MLEOptions) -> OptResult<LbfgsHagerZhang> {
    let mem = opts.lbfgs_mem.unwrap_or(DEFAULT_LBFGS_MEM);
    configure_lbfgs(LbfgsHagerZhang::new(HagerZhangLS::new(), mem), opts)
}

/// L-BFGS with More–Thuente line search.
///
/// Errors
/// ------
/// - `OptError` when argmin rejects a tolerance.
pub fn build_optimizer_more_thuente(opts: &MLEOptions) -> OptResult<LbfgsMoreThuente> {
    let mem = opts.lbfgs_mem.unwrap_or(DEFAULT_LBFGS_MEM);
    configure_lbfgs(LbfgsMoreThuente::new(MoreThuenteLS::new(), mem), opts)
}

/// Apply optional gradient and cost-change tolerances to an L-BFGS solver.
///
/// A `None` tolerance leaves argmin's default in place.
pub fn configure_lbfgs<L>(
    mut solver: LBFGS<L, Theta, Grad, Cost>, opts: &MLEOptions,
) -> OptResult<LBFGS<L, Theta, Grad, Cost>> {
    if let Some(g) = opts.tols.tol_grad {
        solver = solver.with_tolerance_grad(g)?;
    }
    if let Some(c) = opts.tols.tol_cost {
        solver = solver.with_tolerance_cost(c)?;
    }
    Ok(solver)
}

/// Nelder–Mead around `theta0`.
///
/// Parameters
/// ----------
/// - `theta0`: first simplex vertex.
/// - `opts`: `simplex_step` spans the other `n` vertices as
///   `θ₀ + step · max(|θ₀ᵢ|, 1) · eᵢ`; `tols.tol_cost` (if any) becomes the
///   standard-deviation tolerance.
///
/// Errors
/// ------
/// - `OptError` when argmin rejects the tolerance.
pub fn build_nelder_mead(theta0: &Theta, opts: &MLEOptions) -> OptResult<NelderMeadSolver> {
    let mut vertices = Vec::with_capacity(theta0.len() + 1);
    vertices.push(theta0.clone());
    for i in 0..theta0.len() {
        let mut vertex = theta0.clone();
        vertex[i] += opts.simplex_step * theta0[i].abs().max(1.0);
        vertices.push(vertex);
    }
    let mut solver = NelderMeadSolver::new(vertices);
    if let Some(c) = opts.tols.tol_cost {
        solver = solver.with_sd_tolerance(c)?;
    }
    Ok(solver)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::optimization::loglik_optimizer::traits::{SolverKind, Tolerances};
    use ndarray::array;

    // -------------------------------------------------------------------------
    // Scope
    // -----
    // Builders accept valid options with explicit or default memory and
    // with absent tolerances. Executor behavior is covered in `api`.
    // -------------------------------------------------------------------------

    #[test]
    // Purpose
    // -------
    // Both L-BFGS builders succeed with default and explicit memory.
    fn lbfgs_builders_accept_default_and_explicit_memory() {
        // Arrange
        let tols = Tolerances::new(Some(1e-6), Some(1e-8), Some(50)).expect("valid tolerances");
        let default_mem =
            MLEOptions::new(tols, SolverKind::HagerZhang, None, 0.5).expect("valid options");
        let explicit_mem =
            MLEOptions::new(tols, SolverKind::MoreThuente, Some(11), 0.5).expect("valid options");

        // Act / Assert
        assert!(build_optimizer_hager_zhang(&default_mem).is_ok());
        assert!(build_optimizer_more_thuente(&explicit_mem).is_ok());
    }

    #[test]
    // Purpose
    // -------
    // `configure_lbfgs` works when both tolerances are `None`.
    fn configure_lbfgs_respects_absent_tolerances() {
        let raw = LBFGS::new(MoreThuenteLS::new(), DEFAULT_LBFGS_MEM);
        let tols = Tolerances::new(None, None, Some(50)).expect("valid tolerances");
        let opts = MLEOptions::new(tols, SolverKind::MoreThuente, None, 0.5).expect("valid options");
        assert!(configure_lbfgs(raw, &opts).is_ok());
    }

    #[test]
    // Purpose
    // -------
    // The Nelder–Mead builder accepts a two-parameter start and the
    // configured standard-deviation tolerance.
    fn nelder_mead_builder_accepts_start_and_tolerance() {
        let opts = MLEOptions::new(Tolerances::default(), SolverKind::NelderMead, None, 0.25)
            .expect("valid options");
        assert!(build_nelder_mead(&array![1.5, -0.3], &opts).is_ok());
    }
}
