//! Public surface of the likelihood optimizer.
//!
//! - [`LogLikelihood`]: implemented by the detection-function likelihood.
//! - [`MLEOptions`] and [`Tolerances`]: optimizer configuration.
//! - [`SolverKind`]: L-BFGS with a chosen line search, or Nelder–Mead.
//! - [`Termination`] and [`OptimOutcome`]: normalized result of [`maximize`].
//!
//! Convention: we *maximize* `ℓ(θ)` by minimizing `c(θ) = -ℓ(θ)`. An analytic
//! gradient, when provided, is `∇ℓ(θ)`; the adapter flips the sign.
//!
//! [`maximize`]: crate::optimization::loglik_optimizer::maximize
use crate::optimization::{
    errors::{OptError, OptResult},
    loglik_optimizer::{
        Cost, FnEvalMap, Grad, Theta,
        types::DEFAULT_SIMPLEX_STEP,
        validation::{
            validate_theta_hat, validate_value, verify_simplex_step, verify_tol_cost,
            verify_tol_grad,
        },
    },
};
use argmin::core::{TerminationReason, TerminationStatus};
use argmin_math::ArgminL2Norm;
use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// Log-likelihood interface consumed by [`maximize`].
///
/// - `value` evaluates `ℓ(θ)`; invalid inputs are reported as `OptError`.
/// - `check` rejects structurally invalid `θ`/data pairs once, before the
///   solver starts.
/// - `grad` is optional; finite differences of the cost are used otherwise.
///
/// [`maximize`]: crate::optimization::loglik_optimizer::maximize
pub trait LogLikelihood {
    type Data: 'static;

    fn value(&self, theta: &Theta, data: &Self::Data) -> OptResult<Cost>;
    fn check(&self, theta: &Theta, data: &Self::Data) -> OptResult<()>;

    fn grad(&self, _theta: &Theta, _data: &Self::Data) -> OptResult<Grad> {
        Err(OptError::GradientNotImplemented)
    }
}

/// Solver used to maximize the likelihood.
///
/// Parsing is case-insensitive: `"MoreThuente"`, `"HagerZhang"`,
/// `"NelderMead"`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SolverKind {
    /// L-BFGS with More–Thuente line search.
    MoreThuente,
    /// L-BFGS with Hager–Zhang line search.
    HagerZhang,
    /// Derivative-free Nelder–Mead simplex.
    NelderMead,
}

impl SolverKind {
    pub fn uses_gradient(&self) -> bool {
        !matches!(self, SolverKind::NelderMead)
    }
}

impl FromStr for SolverKind {
    type Err = OptError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "morethuente" => Ok(SolverKind::MoreThuente),
            "hagerzhang" => Ok(SolverKind::HagerZhang),
            "neldermead" => Ok(SolverKind::NelderMead),
            _ => Err(OptError::InvalidSolver {
                name: s.to_string(),
                reason: "Valid options are case insensitive 'MoreThuente', 'HagerZhang' or 'NelderMead'.",
            }),
        }
    }
}

/// Optimizer-level configuration.
///
/// Fields:
/// - `tols`: tolerances and iteration cap.
/// - `solver`: which solver runs first.
/// - `fallback`: when the first solver errors out (e.g. a failed line
///   search), retry once from `θ₀` with Nelder–Mead.
/// - `verbose`: attaches the slog observer (behind `obs_slog`).
/// - `lbfgs_mem`: L-BFGS history size, `None` for [`DEFAULT_LBFGS_MEM`].
/// - `simplex_step`: offset spanning the initial Nelder–Mead simplex.
///
/// Default: `tol_grad = 1e-6`, `tol_cost = 1e-10`, `max_iter = 500`,
/// More–Thuente, fallback on, quiet, default memory, step 0.5.
///
/// [`DEFAULT_LBFGS_MEM`]: crate::optimization::loglik_optimizer::DEFAULT_LBFGS_MEM
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MLEOptions {
    pub tols: Tolerances,
    pub solver: SolverKind,
    pub fallback: bool,
    pub verbose: bool,
    pub lbfgs_mem: Option<usize>,
    pub simplex_step: f64,
}

impl MLEOptions {
    /// Build validated optimizer options.
    ///
    /// # Errors
    /// - [`OptError::InvalidLBFGSMem`] when `lbfgs_mem == Some(0)`.
    /// - [`OptError::InvalidSimplexStep`] when `simplex_step` is not finite
    ///   and positive.
    pub fn new(
        tols: Tolerances, solver: SolverKind, lbfgs_mem: Option<usize>, simplex_step: f64,
    ) -> OptResult<Self> {
        if let Some(m) = lbfgs_mem {
            if m == 0 {
                return Err(OptError::InvalidLBFGSMem {
                    mem: m,
                    reason: "L-BFGS memory must be greater than zero.",
                });
            }
        }
        verify_simplex_step(simplex_step)?;
        Ok(Self { tols, solver, fallback: true, verbose: false, lbfgs_mem, simplex_step })
    }

    pub fn with_fallback(mut self, fallback: bool) -> Self {
        self.fallback = fallback;
        self
    }

    pub fn with_verbose(mut self, verbose: bool) -> Self {
        self.verbose = verbose;
        self
    }
}

impl Default for MLEOptions {
    fn default() -> Self {
        Self {
            tols: Tolerances::default(),
            solver: SolverKind::MoreThuente,
            fallback: true,
            verbose: false,
            lbfgs_mem: None,
            simplex_step: DEFAULT_SIMPLEX_STEP,
        }
    }
}

/// Numerical tolerances and iteration limits.
///
/// At least one field must be `Some` (see [`Tolerances::new`]). For
/// Nelder–Mead, `tol_cost` is used as the standard-deviation tolerance of
/// the simplex costs.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Tolerances {
    pub tol_grad: Option<f64>,
    pub tol_cost: Option<f64>,
    pub max_iter: Option<usize>,
}

impl Tolerances {
    /// Construct validated tolerances.
    ///
    /// # Errors
    /// - [`OptError::NoTolerancesProvided`] if all three are `None`.
    /// - [`OptError::InvalidTolGrad`] / [`OptError::InvalidTolCost`] for
    ///   non-finite or non-positive tolerances.
    /// - [`OptError::InvalidMaxIter`] if `max_iter == 0`.
    pub fn new(
        tol_grad: Option<f64>, tol_cost: Option<f64>, max_iter: Option<usize>,
    ) -> OptResult<Self> {
        if tol_grad.is_none() && tol_cost.is_none() && max_iter.is_none() {
            return Err(OptError::NoTolerancesProvided);
        }
        verify_tol_cost(tol_cost)?;
        verify_tol_grad(tol_grad)?;
        if let Some(max_iter) = max_iter {
            if max_iter == 0 {
                return Err(OptError::InvalidMaxIter {
                    max_iter,
                    reason: "Maximum iterations must be greater than zero.",
                });
            }
        }
        Ok(Self { tol_grad, tol_cost, max_iter })
    }
}

impl Default for Tolerances {
    fn default() -> Self {
        Self { tol_grad: Some(1e-6), tol_cost: Some(1e-10), max_iter: Some(500) }
    }
}

/// Why the solver stopped.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Termination {
    /// Gradient, cost-change or target-cost criterion met.
    Converged,
    /// Iteration cap reached before any convergence criterion.
    MaxIterations,
    /// Solver never reported a termination status.
    NotTerminated,
    /// Any other stop (interrupt, timeout, solver-specific exit).
    Stopped(String),
}

impl From<&TerminationStatus> for Termination {
    fn from(status: &TerminationStatus) -> Self {
        match status {
            TerminationStatus::NotTerminated => Termination::NotTerminated,
            TerminationStatus::Terminated(reason) => match reason {
                TerminationReason::SolverConverged | TerminationReason::TargetCostReached => {
                    Termination::Converged
                }
                TerminationReason::MaxItersReached => Termination::MaxIterations,
                other => Termination::Stopped(format!("{other:?}")),
            },
        }
    }
}

/// Canonical result returned by `maximize`.
///
/// - `theta_hat`: best parameter vector found.
/// - `value`: best **log-likelihood** `ℓ(θ̂)` (not the cost).
/// - `termination`: mapped stop reason; `converged` is `true` only for
///   [`Termination::Converged`].
/// - `status`: human-readable stop reason.
/// - `solver`: the solver that produced `theta_hat` (differs from the
///   requested one after a fallback).
/// - `iterations`, `fn_evals`: argmin counters.
/// - `grad_norm`: norm of the last gradient, `None` for Nelder–Mead.
#[derive(Debug, Clone, PartialEq)]
pub struct OptimOutcome {
    pub theta_hat: Theta,
    pub value: f64,
    pub converged: bool,
    pub termination: Termination,
    pub status: String,
    pub solver: SolverKind,
    pub iterations: usize,
    pub fn_evals: FnEvalMap,
    pub grad_norm: Option<f64>,
}

impl OptimOutcome {
    /// Build a validated [`OptimOutcome`] from raw solver state.
    ///
    /// # Errors
    /// Propagates validation errors for `theta_hat` (missing or non-finite)
    /// and `value` (non-finite).
    pub fn new(
        theta_hat_opt: Option<Theta>, value: f64, status: &TerminationStatus, solver: SolverKind,
        iterations: u64, fn_evals: FnEvalMap, grad: Option<Grad>,
    ) -> OptResult<Self> {
        let theta_hat = validate_theta_hat(theta_hat_opt)?;
        validate_value(value)?;
        let termination = Termination::from(status);
        let converged = termination == Termination::Converged;
        let status = match status {
            TerminationStatus::NotTerminated => "Not terminated".to_string(),
            TerminationStatus::Terminated(reason) => format!("{reason:?}"),
        };
        Ok(Self {
            theta_hat,
            value,
            converged,
            termination,
            status,
            solver,
            iterations: iterations as usize,
            fn_evals,
            grad_norm: grad.map(|g| g.l2_norm()),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    // -------------------------------------------------------------------------
    // Scope
    // -----
    // Option validation, solver-name parsing and the mapping from argmin
    // termination statuses onto `Termination`.
    // -------------------------------------------------------------------------

    #[test]
    // Purpose
    // -------
    // Solver names parse case-insensitively and unknown names are rejected.
    fn solver_kind_parses_names_case_insensitively() {
        assert_eq!("neldermead".parse::<SolverKind>(), Ok(SolverKind::NelderMead));
        assert_eq!("HAGERZHANG".parse::<SolverKind>(), Ok(SolverKind::HagerZhang));
        assert!(matches!("bfgs".parse::<SolverKind>(), Err(OptError::InvalidSolver { .. })));
    }

    #[test]
    // Purpose
    // -------
    // `Tolerances::new` rejects the all-`None` configuration and a zero cap.
    fn tolerances_reject_empty_and_zero_cap() {
        assert_eq!(Tolerances::new(None, None, None), Err(OptError::NoTolerancesProvided));
        assert!(matches!(
            Tolerances::new(Some(1e-6), None, Some(0)),
            Err(OptError::InvalidMaxIter { .. })
        ));
    }

    #[test]
    // Purpose
    // -------
    // `MLEOptions::new` rejects a zero L-BFGS memory and a non-positive
    // simplex step.
    fn mle_options_validate_memory_and_simplex_step() {
        let tols = Tolerances::default();
        assert!(matches!(
            MLEOptions::new(tols, SolverKind::MoreThuente, Some(0), 0.5),
            Err(OptError::InvalidLBFGSMem { .. })
        ));
        assert!(matches!(
            MLEOptions::new(tols, SolverKind::NelderMead, None, 0.0),
            Err(OptError::InvalidSimplexStep { .. })
        ));
    }

    #[test]
    // Purpose
    // -------
    // Defaults keep the Nelder–Mead fallback on and the observer off; the
    // builders flip each flag without touching the rest.
    fn mle_options_builders_set_flags() {
        let base = MLEOptions::default();
        assert!(base.fallback && !base.verbose);

        let opts = base.clone().with_verbose(true).with_fallback(false);

        assert!(opts.verbose && !opts.fallback);
        assert_eq!(opts.solver, base.solver);
        assert_eq!(opts.lbfgs_mem, base.lbfgs_mem);
    }

    #[test]
    // Purpose
    // -------
    // Only convergence-type reasons count as converged; the iteration cap
    // maps to `MaxIterations`.
    //
    // Given
    // -----
    // - Three argmin statuses: solver converged, max iters, not terminated.
    //
    // Expect
    // ------
    // - `converged` is true only for the first.
    fn outcome_maps_termination_reasons() {
        // Arrange
        let theta = array![0.1, 0.2];
        let converged = TerminationStatus::Terminated(TerminationReason::SolverConverged);
        let capped = TerminationStatus::Terminated(TerminationReason::MaxItersReached);

        // Act
        let a = OptimOutcome::new(
            Some(theta.clone()),
            -1.0,
            &converged,
            SolverKind::MoreThuente,
            3,
            FnEvalMap::new(),
            None,
        )
        .expect("valid outcome");
        let b = OptimOutcome::new(
            Some(theta.clone()),
            -1.0,
            &capped,
            SolverKind::MoreThuente,
            3,
            FnEvalMap::new(),
            None,
        )
        .expect("valid outcome");
        let c = OptimOutcome::new(
            Some(theta),
            -1.0,
            &TerminationStatus::NotTerminated,
            SolverKind::NelderMead,
            0,
            FnEvalMap::new(),
            None,
        )
        .expect("valid outcome");

        // Assert
        assert!(a.converged);
        assert_eq!(b.termination, Termination::MaxIterations);
        assert!(!b.converged);
        assert_eq!(c.termination, Termination::NotTerminated);
    }

    #[test]
    // Purpose
    // -------
    // Non-finite estimates are rejected when building an outcome.
    fn outcome_rejects_non_finite_theta() {
        let status = TerminationStatus::Terminated(TerminationReason::SolverConverged);
        let res = OptimOutcome::new(
            Some(array![f64::NAN]),
            0.0,
            &status,
            SolverKind::HagerZhang,
            1,
            FnEvalMap::new(),
            None,
        );
        assert!(matches!(res, Err(OptError::InvalidThetaHat { index: 0, .. })));
    }
}
