//! Fit options — configuration for detection-function estimation.
//!
//! Purpose
//! -------
//! Collect every knob of a detection-function fit in one validated value:
//! optimizer settings, covariates in the scale, start vector, quadrature
//! resolution, the scaling convention and the expansion penalty.
//!
//! Key behaviors
//! -------------
//! - [`FitOptions::default`] gives a covariate-free fit with More–Thuente
//!   L-BFGS, 201 Simpson points, scaling at the key's mode with `g(x_scl) = 1`
//!   and a unit penalty on negative expansion mass.
//! - `with_*` builders validate their argument and return `Err` rather than
//!   storing an unusable value.
//!
//! Invariants & assumptions
//! ------------------------
//! - Checks that need the strip (`x_scl ≤ hi`) or the model (start length)
//!   are done by the fitter, not here.
//!
//! Conventions
//! -----------
//! - `quiet` only changes the level at which non-fatal fit problems are
//!   logged (`debug!` instead of `warn!`); it never hides errors.
use crate::{
    detection::{
        core::integration::DEFAULT_INTEGRATION_POINTS,
        errors::{DetectionError, DetectionResult},
    },
    optimization::loglik_optimizer::MLEOptions,
};
use ndarray::Array1;
use serde::{Deserialize, Serialize};

/// Weight of the negative-mass penalty when none is given.
pub const DEFAULT_PENALTY: f64 = 1.0;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FitOptions {
    pub mle: MLEOptions,
    /// Covariates entering the log scale, in coefficient order.
    pub covariates: Vec<String>,
    /// Start vector in θ-space; automatic when `None`.
    pub start: Option<Array1<f64>>,
    pub integration_points: usize,
    /// Scaling distance; `None` scales at the key's mode.
    pub scale_point: Option<f64>,
    /// Detection probability at the scaling distance.
    pub g_at_scale: f64,
    pub penalty: f64,
    pub quiet: bool,
}

impl Default for FitOptions {
    fn default() -> Self {
        Self {
            mle: MLEOptions::default(),
            covariates: Vec::new(),
            start: None,
            integration_points: DEFAULT_INTEGRATION_POINTS,
            scale_point: None,
            g_at_scale: 1.0,
            penalty: DEFAULT_PENALTY,
            quiet: false,
        }
    }
}

impl FitOptions {
    pub fn with_mle(mut self, mle: MLEOptions) -> Self {
        self.mle = mle;
        self
    }

    /// Covariates for the scale; names must be distinct.
    pub fn with_covariates<S: Into<String>>(
        mut self, names: impl IntoIterator<Item = S>,
    ) -> DetectionResult<Self> {
        let names: Vec<String> = names.into_iter().map(Into::into).collect();
        for (i, name) in names.iter().enumerate() {
            if names[..i].contains(name) {
                return Err(DetectionError::DuplicateCovariate { name: name.clone() });
            }
        }
        self.covariates = names;
        Ok(self)
    }

    /// Explicit start vector; entries must be finite.
    pub fn with_start(mut self, start: Array1<f64>) -> DetectionResult<Self> {
        if let Some((index, &value)) = start.iter().enumerate().find(|(_, v)| !v.is_finite()) {
            return Err(DetectionError::NonFiniteStart { index, value });
        }
        self.start = Some(start);
        Ok(self)
    }

    pub fn with_integration_points(mut self, points: usize) -> DetectionResult<Self> {
        if points < 3 || points % 2 == 0 {
            return Err(DetectionError::InvalidIntegrationPoints { points });
        }
        self.integration_points = points;
        Ok(self)
    }

    /// Scale at distance `x_scl` with `g(x_scl) = g_at_scale`.
    pub fn with_scaling(mut self, x_scl: Option<f64>, g_at_scale: f64) -> DetectionResult<Self> {
        if let Some(x) = x_scl {
            if !x.is_finite() || x < 0.0 {
                return Err(DetectionError::InvalidScalePoint { x_scl: x, hi: f64::NAN });
            }
        }
        if !(g_at_scale > 0.0 && g_at_scale <= 1.0) {
            return Err(DetectionError::InvalidGAtScale { value: g_at_scale });
        }
        self.scale_point = x_scl;
        self.g_at_scale = g_at_scale;
        Ok(self)
    }

    pub fn with_penalty(mut self, penalty: f64) -> DetectionResult<Self> {
        if !penalty.is_finite() || penalty < 0.0 {
            return Err(DetectionError::InvalidPenalty { value: penalty });
        }
        self.penalty = penalty;
        Ok(self)
    }

    pub fn with_quiet(mut self, quiet: bool) -> Self {
        self.quiet = quiet;
        self
    }
}
