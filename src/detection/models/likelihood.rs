//! Log-likelihood of truncated distance data under a detection function.
//!
//! Purpose
//! -------
//! Implement [`LogLikelihood`] for a detection-function specification so the
//! generic optimizer can maximize it in θ-space.
//!
//! Key behaviors
//! -------------
//! - For each in-strip distance `x_i` with linear predictor `η_i`, the scale
//!   is `σ_i = exp(η_i)` and the contribution is
//!   `ln g(x_i) - ln ∫ g` (line) or `ln x_i + ln g(x_i) - ln ∫ x g` (point).
//! - Without covariates every observation shares one curve, so the strip
//!   integral is computed once per evaluation.
//! - Expansion terms that drive `g` negative are penalised by
//!   `penalty · n · ∫ min(g, 0)² / (hi - lo)`; `g(x_i) ≤ 0` is floored
//!   before the log.
//!
//! Invariants & assumptions
//! ------------------------
//! - `FitData.design` has one row per distance and `1 + n_covariates`
//!   columns with a leading column of ones.
//! - A degenerate curve (non-positive normaliser or integral) evaluates to
//!   [`DEGENERATE_LOGLIK`] instead of an error, so solvers can step away.
//! - On point transects a distance of exactly zero contributes no `ln x`
//!   term; it is constant in θ.
use crate::{
    detection::core::{
        curve::DetectionCurve, data::SurveyType, integration::SimpsonGrid, params::ModelSpec,
        params::ParamLayout, truncation::Truncation,
    },
    optimization::{
        errors::{OptError, OptResult},
        loglik_optimizer::{LogLikelihood, Theta, validation::validate_theta_input},
        numerical_stability::transformations::{safe_exp, safe_ln},
    },
};
use ndarray::{Array1, Array2};

/// Log-likelihood reported for parameter points with no valid curve.
pub const DEGENERATE_LOGLIK: f64 = -1.0e12;

/// Distances and design matrix the likelihood is evaluated on.
#[derive(Debug, Clone, PartialEq)]
pub struct FitData {
    pub distances: Array1<f64>,
    pub design: Array2<f64>,
}

#[derive(Debug, Clone)]
pub struct DetectionLikelihood {
    spec: ModelSpec,
    layout: ParamLayout,
    truncation: Truncation,
    survey: SurveyType,
    grid: SimpsonGrid,
    scale_point: Option<f64>,
    g_at_scale: f64,
    penalty: f64,
}

impl DetectionLikelihood {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        spec: ModelSpec, layout: ParamLayout, truncation: Truncation, survey: SurveyType,
        grid: SimpsonGrid, scale_point: Option<f64>, g_at_scale: f64, penalty: f64,
    ) -> Self {
        Self { spec, layout, truncation, survey, grid, scale_point, g_at_scale, penalty }
    }

    pub fn layout(&self) -> &ParamLayout {
        &self.layout
    }

    /// Curve for linear predictor `eta` at parameters `theta`.
    pub fn curve(&self, theta: &Theta, eta: f64) -> DetectionCurve {
        let shape = self.layout.shape_index().map(|i| self.spec.family().natural_shape(theta[i]));
        DetectionCurve::new(
            self.spec.family(),
            self.spec.series(),
            safe_exp(eta),
            shape,
            self.layout.adj(theta),
            self.truncation,
            self.survey,
            self.scale_point,
            self.g_at_scale,
        )
    }

    /// `(Σ ln g(x_i) - n ln ∫g - penalty)` for observations sharing a curve.
    fn shared_curve_loglik<'a>(
        &self, curve: &DetectionCurve, distances: impl Iterator<Item = &'a f64>, n: f64,
    ) -> Option<f64> {
        let integral = curve.integral(&self.grid);
        if !(integral.is_finite() && integral > 0.0) {
            return None;
        }
        let mut ll: f64 = distances.map(|&x| safe_ln(curve.relative(x))).sum();
        ll -= n * integral.ln();
        if self.penalty > 0.0 {
            ll -= self.penalty * n * curve.negative_mass(&self.grid) / self.truncation.width();
        }
        Some(ll)
    }
}

impl LogLikelihood for DetectionLikelihood {
    type Data = FitData;

    fn value(&self, theta: &Theta, data: &FitData) -> OptResult<f64> {
        let eta = data.design.dot(&self.layout.beta(theta));
        let mut ll = if self.layout.n_covariates() == 0 {
            let curve = self.curve(theta, eta[0]);
            let n = data.distances.len() as f64;
            match self.shared_curve_loglik(&curve, data.distances.iter(), n) {
                Some(ll) => ll,
                None => return Ok(DEGENERATE_LOGLIK),
            }
        } else {
            let mut acc = 0.0;
            for (x, &e) in data.distances.iter().zip(eta.iter()) {
                let curve = self.curve(theta, e);
                match self.shared_curve_loglik(&curve, std::iter::once(x), 1.0) {
                    Some(ll) => acc += ll,
                    None => return Ok(DEGENERATE_LOGLIK),
                }
            }
            acc
        };
        if self.survey == SurveyType::Point {
            ll += data.distances.iter().filter(|&&x| x > 0.0).map(|x| x.ln()).sum::<f64>();
        }
        if ll.is_finite() { Ok(ll) } else { Ok(DEGENERATE_LOGLIK) }
    }

    fn check(&self, theta: &Theta, data: &FitData) -> OptResult<()> {
        if data.distances.is_empty() {
            return Err(OptError::EmptyLikelihoodData);
        }
        if data.design.nrows() != data.distances.len()
            || data.design.ncols() != self.layout.n_beta()
        {
            return Err(OptError::Likelihood {
                text: format!(
                    "design matrix is {}x{}, expected {}x{}",
                    data.design.nrows(),
                    data.design.ncols(),
                    data.distances.len(),
                    self.layout.n_beta()
                ),
            });
        }
        validate_theta_input(theta, self.layout.len())
    }
}
