//! High-level entry point for maximizing a [`LogLikelihood`].
//!
//! Picks the solver named in [`MLEOptions::solver`], wraps the model in an
//! [`ArgMinAdapter`] (which minimizes `-ℓ(θ)`), and, when enabled, retries a
//! gradient-based run that errored or stopped abnormally once with
//! Nelder–Mead from the same start.
use tracing::debug;

use crate::optimization::{
    errors::OptResult,
    loglik_optimizer::{
        OptimOutcome, Theta,
        adapter::ArgMinAdapter,
        builders::{build_nelder_mead, build_optimizer_hager_zhang, build_optimizer_more_thuente},
        run::{run_derivative_free, run_lbfgs},
        traits::{LogLikelihood, MLEOptions, SolverKind, Termination},
    },
};

/// Maximize `ℓ(θ)` from `theta0`.
///
/// # Behavior
/// - Validates the start with `f.check(theta0, data)`.
/// - Runs the configured solver.
/// - If that solver is L-BFGS and `opts.fallback` is set, a run that
///   returns `Err` or stops without converging or hitting the iteration cap
///   (e.g. a line search that finds no descent direction) is repeated from
///   `theta0` with Nelder–Mead. The better of the two outcomes is kept;
///   the outcome's `solver` field records which one produced `θ̂`.
///
/// # Errors
/// - Any error from `f.check`.
/// - Solver construction or runtime errors (after the fallback, if any,
///   also failed; the fallback's error is returned).
///
/// # Example
/// ```
/// use distance_sampling::optimization::errors::OptResult;
/// use distance_sampling::optimization::loglik_optimizer::{
///     LogLikelihood, MLEOptions, Theta, maximize,
/// };
/// use ndarray::array;
///
/// struct Quadratic;
/// impl LogLikelihood for Quadratic {
///     type Data = ();
///     fn value(&self, theta: &Theta, _: &()) -> OptResult<f64> {
///         Ok(-(theta[0] - 2.0).powi(2))
///     }
///     fn check(&self, _: &Theta, _: &()) -> OptResult<()> {
///         Ok(())
///     }
/// }
///
/// let out = maximize(&Quadratic, array![0.0], &(), &MLEOptions::default())?;
/// assert!((out.theta_hat[0] - 2.0).abs() < 1e-4);
/// # Ok::<(), distance_sampling::optimization::errors::OptError>(())
/// ```
pub fn maximize<F: LogLikelihood>(
    f: &F, theta0: Theta, data: &F::Data, opts: &MLEOptions,
) -> OptResult<OptimOutcome> {
    f.check(&theta0, data)?;
    let first = run_solver(f, theta0.clone(), data, opts, opts.solver);
    if !(opts.fallback && opts.solver.uses_gradient()) {
        return first;
    }
    match first {
        Ok(out) if !stopped_abnormally(&out) => Ok(out),
        Ok(out) => {
            debug!(solver = ?opts.solver, status = %out.status, "gradient solver stopped early, retrying with Nelder-Mead");
            match run_solver(f, theta0, data, opts, SolverKind::NelderMead) {
                Ok(retry) => Ok(better_outcome(out, retry)),
                Err(err) => {
                    debug!(error = %err, "Nelder-Mead retry failed");
                    Ok(out)
                }
            }
        }
        Err(err) => {
            debug!(solver = ?opts.solver, error = %err, "gradient solver failed, retrying with Nelder-Mead");
            run_solver(f, theta0, data, opts, SolverKind::NelderMead)
        }
    }
}

fn stopped_abnormally(out: &OptimOutcome) -> bool {
    !matches!(out.termination, Termination::Converged | Termination::MaxIterations)
}

/// Converged beats capped beats anything else; ties go to the higher `ℓ`,
/// then to `first`.
fn better_outcome(first: OptimOutcome, second: OptimOutcome) -> OptimOutcome {
    let rank = |o: &OptimOutcome| match o.termination {
        Termination::Converged => 0,
        Termination::MaxIterations => 1,
        _ => 2,
    };
    match rank(&first).cmp(&rank(&second)) {
        std::cmp::Ordering::Less => first,
        std::cmp::Ordering::Greater => second,
        std::cmp::Ordering::Equal if second.value > first.value => second,
        std::cmp::Ordering::Equal => first,
    }
}

fn run_solver<F: LogLikelihood>(
    f: &F, theta0: Theta, data: &F::Data, opts: &MLEOptions, kind: SolverKind,
) -> OptResult<OptimOutcome> {
    let problem = ArgMinAdapter::new(f, data);
    match kind {
        SolverKind::MoreThuente => {
            let solver = build_optimizer_more_thuente(opts)?;
            run_lbfgs(theta0, opts, problem, solver, kind)
        }
        SolverKind::HagerZhang => {
            let solver = build_optimizer_hager_zhang(opts)?;
            run_lbfgs(theta0, opts, problem, solver, kind)
        }
        SolverKind::NelderMead => {
            let solver = build_nelder_mead(&theta0, opts)?;
            run_derivative_free(opts, problem, solver)
        }
    }
}
