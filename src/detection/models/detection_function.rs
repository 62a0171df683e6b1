//! Fitted detection-function model.
//!
//! Purpose
//! -------
//! [`DetectionFunctionModel`] is the immutable result of a fit: the estimate
//! `θ̂` with its covariance, the maximised log-likelihood and information
//! criteria, a convergence code, and everything needed to rebuild detection
//! curves (and so ESW / EDR) without refitting.
//!
//! Key behaviors
//! -------------
//! - Information criteria: `AIC = 2k - 2ℓ`, `AICc = AIC + 2k(k+1)/(n-k-1)`
//!   (`+∞` when `n - k - 1 ≤ 0`), `BIC = k ln n - 2ℓ`.
//! - [`DetectionFunctionModel::curve_for_row`] and
//!   [`DetectionFunctionModel::curve_for_covariates`] rebuild a
//!   [`DetectionCurve`] for a fitted observation or an arbitrary covariate
//!   row.
//! - [`ConvergenceCode`] records numerical trouble; fits never fail with
//!   `Err` for optimizer reasons.
//!
//! Invariants & assumptions
//! ------------------------
//! - `theta`, `coef_names` and (when present) `covariance` share the θ
//!   layout of [`ParamLayout`].
//! - `design`, `linear_predictor` and `distances` have one row per in-strip
//!   detection, in the order of the survey's detection table.
//!
//! Downstream usage
//! ----------------
//! - `abundance::effective_width` reads curves from the model;
//!   `abundance::selection` ranks models by `aic`/`aicc`/`bic` and
//!   `is_rankable`; `abundance::bootstrap` keeps resamples whose model
//!   `is_usable`.
use crate::{
    detection::{
        core::{
            curve::DetectionCurve,
            data::{Covariates, SurveyType},
            integration::SimpsonGrid,
            params::{ModelSpec, ParamLayout},
            truncation::Truncation,
        },
        errors::DetectionResult,
    },
    inference::standard_errors,
    optimization::{loglik_optimizer::SolverKind, numerical_stability::transformations::safe_exp},
};
use ndarray::{Array1, Array2};
use serde::{Deserialize, Serialize};

/// Outcome of the numerical fit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ConvergenceCode {
    /// Converged with a positive-definite information matrix.
    Success,
    /// Iteration cap reached.
    MaxIterations,
    /// The optimizer stopped abnormally or could not run.
    OptimizerFailure,
    /// Converged onto the edge of the admissible parameter region.
    BoundaryHit,
    /// Converged but the information matrix is singular.
    SingularCovariance,
}

impl ConvergenceCode {
    pub fn code(&self) -> i32 {
        match self {
            ConvergenceCode::Success => 0,
            ConvergenceCode::MaxIterations => 1,
            ConvergenceCode::OptimizerFailure => 2,
            ConvergenceCode::BoundaryHit => 3,
            ConvergenceCode::SingularCovariance => -1,
        }
    }

    pub fn description(&self) -> &'static str {
        match self {
            ConvergenceCode::Success => "converged",
            ConvergenceCode::MaxIterations => "iteration limit reached",
            ConvergenceCode::OptimizerFailure => "optimizer failure",
            ConvergenceCode::BoundaryHit => "parameter estimate on a boundary",
            ConvergenceCode::SingularCovariance => "converged, singular covariance",
        }
    }
}

impl std::fmt::Display for ConvergenceCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} ({})", self.code(), self.description())
    }
}

/// Summary status of a result.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FitStatus {
    Success,
    Partial,
    Failure,
}

/// One row of the coefficient table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Coefficient {
    pub name: String,
    pub estimate: f64,
    pub std_error: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DetectionFunctionModel {
    pub(crate) spec: ModelSpec,
    pub(crate) survey: SurveyType,
    pub(crate) truncation: Truncation,
    pub(crate) covariate_names: Vec<String>,
    pub(crate) theta: Array1<f64>,
    pub(crate) coef_names: Vec<String>,
    pub(crate) covariance: Option<Array2<f64>>,
    pub(crate) loglik: f64,
    pub(crate) n: usize,
    pub(crate) convergence: ConvergenceCode,
    pub(crate) message: String,
    pub(crate) scale_valid: bool,
    pub(crate) scale_point: Option<f64>,
    pub(crate) g_at_scale: f64,
    pub(crate) integration_points: usize,
    pub(crate) design: Array2<f64>,
    pub(crate) linear_predictor: Array1<f64>,
    pub(crate) distances: Array1<f64>,
    pub(crate) iterations: usize,
    pub(crate) solver: Option<SolverKind>,
}

impl DetectionFunctionModel {
    pub fn spec(&self) -> ModelSpec {
        self.spec
    }

    pub fn survey(&self) -> SurveyType {
        self.survey
    }

    pub fn truncation(&self) -> Truncation {
        self.truncation
    }

    pub fn covariate_names(&self) -> &[String] {
        &self.covariate_names
    }

    pub fn has_covariates(&self) -> bool {
        !self.covariate_names.is_empty()
    }

    pub fn theta(&self) -> &Array1<f64> {
        &self.theta
    }

    pub fn coef_names(&self) -> &[String] {
        &self.coef_names
    }

    pub fn covariance(&self) -> Option<&Array2<f64>> {
        self.covariance.as_ref()
    }

    pub fn loglik(&self) -> f64 {
        self.loglik
    }

    /// Number of in-strip detections the model was fitted to.
    pub fn n(&self) -> usize {
        self.n
    }

    pub fn convergence(&self) -> ConvergenceCode {
        self.convergence
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn scale_valid(&self) -> bool {
        self.scale_valid
    }

    /// Fixed scaling distance, `None` when scaled at the key's mode.
    pub fn scale_point(&self) -> Option<f64> {
        self.scale_point
    }

    pub fn g_at_scale(&self) -> f64 {
        self.g_at_scale
    }

    pub fn design(&self) -> &Array2<f64> {
        &self.design
    }

    pub fn linear_predictor(&self) -> &Array1<f64> {
        &self.linear_predictor
    }

    pub fn distances(&self) -> &Array1<f64> {
        &self.distances
    }

    pub fn iterations(&self) -> usize {
        self.iterations
    }

    /// Solver that produced `θ̂`, `None` if none ran to completion.
    pub fn solver(&self) -> Option<SolverKind> {
        self.solver
    }

    pub fn layout(&self) -> ParamLayout {
        ParamLayout::new(&self.spec, self.covariate_names.len())
    }

    pub fn n_params(&self) -> usize {
        self.theta.len()
    }

    pub fn aic(&self) -> f64 {
        2.0 * self.n_params() as f64 - 2.0 * self.loglik
    }

    pub fn aicc(&self) -> f64 {
        let k = self.n_params() as f64;
        let denom = self.n as f64 - k - 1.0;
        if denom <= 0.0 {
            return f64::INFINITY;
        }
        self.aic() + 2.0 * k * (k + 1.0) / denom
    }

    pub fn bic(&self) -> f64 {
        self.n_params() as f64 * (self.n as f64).ln() - 2.0 * self.loglik
    }

    /// Standard errors of `θ̂`, `None` when the covariance is singular.
    pub fn standard_errors(&self) -> Option<Array1<f64>> {
        self.covariance.as_ref().map(standard_errors)
    }

    pub fn coefficients(&self) -> Vec<Coefficient> {
        let se = self.standard_errors();
        self.coef_names
            .iter()
            .enumerate()
            .map(|(i, name)| Coefficient {
                name: name.clone(),
                estimate: self.theta[i],
                std_error: se.as_ref().map(|s| s[i]),
            })
            .collect()
    }

    /// Scale at the intercept (all covariates zero).
    pub fn sigma(&self) -> f64 {
        safe_exp(self.theta[0])
    }

    /// Natural shape parameter (`k` or `r`), if the family has one.
    pub fn shape(&self) -> Option<f64> {
        self.layout().shape_index().map(|i| self.spec.family().natural_shape(self.theta[i]))
    }

    pub fn expansion_coefficients(&self) -> Vec<f64> {
        self.layout().adj(&self.theta)
    }

    /// Quadrature grid used at fit time.
    pub fn grid(&self) -> DetectionResult<SimpsonGrid> {
        SimpsonGrid::new(self.truncation.lo(), self.truncation.hi(), self.integration_points)
    }

    fn curve_for_eta(&self, eta: f64) -> DetectionCurve {
        DetectionCurve::new(
            self.spec.family(),
            self.spec.series(),
            safe_exp(eta),
            self.shape(),
            self.expansion_coefficients(),
            self.truncation,
            self.survey,
            self.scale_point,
            self.g_at_scale,
        )
    }

    /// Curve with all covariates at zero; the only curve of a covariate-free
    /// model.
    pub fn baseline_curve(&self) -> DetectionCurve {
        self.curve_for_eta(self.theta[0])
    }

    /// Curve of fitted detection `i`, `None` when out of range.
    pub fn curve_for_row(&self, i: usize) -> Option<DetectionCurve> {
        self.linear_predictor.get(i).map(|&eta| self.curve_for_eta(eta))
    }

    /// Curve for a named covariate row; `None` if a model covariate is
    /// missing from `row`.
    pub fn curve_for_covariates(&self, row: &Covariates) -> Option<DetectionCurve> {
        let mut eta = self.theta[0];
        for (j, name) in self.covariate_names.iter().enumerate() {
            eta += self.theta[1 + j] * row.get(name)?;
        }
        Some(self.curve_for_eta(eta))
    }

    pub fn status(&self) -> FitStatus {
        match self.convergence {
            ConvergenceCode::Success if self.scale_valid => FitStatus::Success,
            ConvergenceCode::OptimizerFailure => FitStatus::Failure,
            _ => FitStatus::Partial,
        }
    }

    /// Usable for abundance: converged (possibly with a singular
    /// covariance) and with a valid scale.
    pub fn is_usable(&self) -> bool {
        matches!(self.convergence, ConvergenceCode::Success | ConvergenceCode::SingularCovariance)
            && self.scale_valid
    }

    /// Eligible for model selection: fully converged with a valid scale.
    pub fn is_rankable(&self) -> bool {
        self.convergence == ConvergenceCode::Success && self.scale_valid
    }
}
