//! Key functions of the detection-function families.
//!
//! Purpose
//! -------
//! Define the closed set of parametric key functions `key(x; σ, shape)` a
//! detection function is built on, together with the maps between their
//! natural shape parameters and the unconstrained optimizer space.
//!
//! Key behaviors
//! -------------
//! - [`LikelihoodFamily::key`] evaluates the unnormalised key at a distance.
//! - [`LikelihoodFamily::closed_form_integral`] integrates the key over a
//!   strip analytically where a closed form exists (half-normal and negative
//!   exponential), for both line (`∫ key`) and point (`∫ x·key`) designs.
//! - [`LikelihoodFamily::natural_shape`] / [`LikelihoodFamily::shape_to_theta`]
//!   move the shape parameter between `ℝ` and its constrained domain.
//!
//! Invariants & assumptions
//! ------------------------
//! - Scales `σ` are strictly positive; callers map them through `exp`.
//! - Hazard-rate and uniform shapes are `> 0` (softplus); the gamma shape is
//!   `> 1` (one plus softplus), so the gamma mode `(r - 1)σ` is interior.
//! - Keys are evaluated for `x ≥ 0` only.
//!
//! Conventions
//! -----------
//! - The uniform family is the smooth "logistic knee" form
//!   `1 / (1 + exp(k (x/σ - 1)))`: flat near zero, dropping around `σ`.
//! - The gamma key is normalised so its maximum (at the mode) equals one.
use crate::{
    detection::{core::data::SurveyType, errors::DetectionError},
    optimization::numerical_stability::transformations::{
        safe_logistic, safe_softplus, safe_softplus_inv,
    },
};
use serde::{Deserialize, Serialize};
use statrs::function::erf::erf;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum LikelihoodFamily {
    HalfNormal,
    HazardRate,
    Uniform,
    NegativeExponential,
    Gamma,
}

impl LikelihoodFamily {
    pub const ALL: [LikelihoodFamily; 5] = [
        LikelihoodFamily::HalfNormal,
        LikelihoodFamily::HazardRate,
        LikelihoodFamily::Uniform,
        LikelihoodFamily::NegativeExponential,
        LikelihoodFamily::Gamma,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            LikelihoodFamily::HalfNormal => "halfnorm",
            LikelihoodFamily::HazardRate => "hazrate",
            LikelihoodFamily::Uniform => "uniform",
            LikelihoodFamily::NegativeExponential => "negexp",
            LikelihoodFamily::Gamma => "gamma",
        }
    }

    /// Number of shape parameters beyond the scale.
    pub fn n_shape(&self) -> usize {
        match self {
            LikelihoodFamily::HalfNormal | LikelihoodFamily::NegativeExponential => 0,
            LikelihoodFamily::HazardRate | LikelihoodFamily::Uniform | LikelihoodFamily::Gamma => 1,
        }
    }

    /// Coefficient label of the shape parameter.
    pub fn shape_name(&self) -> Option<&'static str> {
        match self {
            LikelihoodFamily::HazardRate | LikelihoodFamily::Uniform => Some("k"),
            LikelihoodFamily::Gamma => Some("r"),
            _ => None,
        }
    }

    pub fn supports_expansions(&self) -> bool {
        !matches!(self, LikelihoodFamily::Gamma)
    }

    /// Shape value used when no start vector is supplied.
    pub fn default_shape(&self) -> Option<f64> {
        match self {
            LikelihoodFamily::HazardRate => Some(2.0),
            LikelihoodFamily::Uniform => Some(5.0),
            LikelihoodFamily::Gamma => Some(2.0),
            _ => None,
        }
    }

    /// Unconstrained `θ_shape` → natural shape.
    pub fn natural_shape(&self, t: f64) -> f64 {
        match self {
            LikelihoodFamily::Gamma => 1.0 + safe_softplus(t),
            _ => safe_softplus(t),
        }
    }

    /// Natural shape → unconstrained `θ_shape`. Inverse of
    /// [`LikelihoodFamily::natural_shape`] on its range.
    pub fn shape_to_theta(&self, shape: f64) -> f64 {
        match self {
            LikelihoodFamily::Gamma => safe_softplus_inv(shape - 1.0),
            _ => safe_softplus_inv(shape),
        }
    }

    /// Distance at which the key peaks: `(r - 1)σ` for gamma, 0 otherwise.
    pub fn mode(&self, sigma: f64, shape: Option<f64>) -> f64 {
        match (self, shape) {
            (LikelihoodFamily::Gamma, Some(r)) => (r - 1.0) * sigma,
            _ => 0.0,
        }
    }

    /// Unnormalised key at distance `x`.
    ///
    /// `shape` is ignored by one-parameter families and must be `Some` for
    /// the others; a missing shape evaluates to NaN.
    pub fn key(&self, x: f64, sigma: f64, shape: Option<f64>) -> f64 {
        match self {
            LikelihoodFamily::HalfNormal => (-(x * x) / (2.0 * sigma * sigma)).exp(),
            LikelihoodFamily::NegativeExponential => (-x / sigma).exp(),
            LikelihoodFamily::HazardRate => match shape {
                Some(_) if x <= 0.0 => 1.0,
                Some(k) => -(-(x / sigma).powf(-k)).exp_m1(),
                None => f64::NAN,
            },
            LikelihoodFamily::Uniform => match shape {
                Some(k) => safe_logistic(-k * (x / sigma - 1.0)),
                None => f64::NAN,
            },
            LikelihoodFamily::Gamma => match shape {
                Some(_) if x <= 0.0 => 0.0,
                Some(r) => {
                    let m = (r - 1.0) * sigma;
                    ((r - 1.0) * (x / m).ln() - (x - m) / sigma).exp()
                }
                None => f64::NAN,
            },
        }
    }

    /// Analytic `∫_lo^hi key(x) dx` (line) or `∫_lo^hi x·key(x) dx` (point).
    ///
    /// Returns `None` for families integrated numerically.
    pub fn closed_form_integral(
        &self, survey: SurveyType, lo: f64, hi: f64, sigma: f64,
    ) -> Option<f64> {
        match (self, survey) {
            (LikelihoodFamily::HalfNormal, SurveyType::Line) => {
                let s = sigma * std::f64::consts::SQRT_2;
                Some(sigma * (std::f64::consts::PI / 2.0).sqrt() * (erf(hi / s) - erf(lo / s)))
            }
            (LikelihoodFamily::HalfNormal, SurveyType::Point) => {
                let v = 2.0 * sigma * sigma;
                Some(sigma * sigma * ((-(lo * lo) / v).exp() - (-(hi * hi) / v).exp()))
            }
            (LikelihoodFamily::NegativeExponential, SurveyType::Line) => {
                Some(sigma * ((-lo / sigma).exp() - (-hi / sigma).exp()))
            }
            (LikelihoodFamily::NegativeExponential, SurveyType::Point) => Some(
                sigma * (lo + sigma) * (-lo / sigma).exp()
                    - sigma * (hi + sigma) * (-hi / sigma).exp(),
            ),
            _ => None,
        }
    }
}

impl std::fmt::Display for LikelihoodFamily {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for LikelihoodFamily {
    type Err = DetectionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "halfnorm" | "half-normal" | "halfnormal" | "hn" => Ok(LikelihoodFamily::HalfNormal),
            "hazrate" | "hazard-rate" | "hazardrate" | "hr" => Ok(LikelihoodFamily::HazardRate),
            "uniform" | "unif" => Ok(LikelihoodFamily::Uniform),
            "negexp" | "negative-exponential" | "ne" => Ok(LikelihoodFamily::NegativeExponential),
            "gamma" => Ok(LikelihoodFamily::Gamma),
            _ => Err(DetectionError::UnknownFamily { name: s.to_string() }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    // -------------------------------------------------------------------------
    // Scope
    // -----
    // - Key shapes at reference points (value at zero, monotonicity, mode).
    // - Closed-form strip integrals against Simpson quadrature.
    // - Shape parameter maps and name parsing.
    // -------------------------------------------------------------------------

    fn simpson<F: Fn(f64) -> f64>(f: F, lo: f64, hi: f64) -> f64 {
        let n = 2000;
        let h = (hi - lo) / n as f64;
        let mut acc = f(lo) + f(hi);
        for i in 1..n {
            let w = if i % 2 == 1 { 4.0 } else { 2.0 };
            acc += w * f(lo + i as f64 * h);
        }
        acc * h / 3.0
    }

    #[test]
    // Purpose
    // -------
    // Monotone keys equal one at zero and decrease with distance.
    fn monotone_keys_start_at_one_and_decrease() {
        for fam in [
            LikelihoodFamily::HalfNormal,
            LikelihoodFamily::HazardRate,
            LikelihoodFamily::NegativeExponential,
        ] {
            let shape = fam.default_shape();
            assert_relative_eq!(fam.key(0.0, 10.0, shape), 1.0, epsilon = 1e-12);
            let mut prev = 1.0;
            for i in 1..50 {
                let g = fam.key(i as f64, 10.0, shape);
                assert!(g <= prev + 1e-12, "{fam} not monotone at {i}");
                prev = g;
            }
        }
    }

    #[test]
    // Purpose
    // -------
    // The gamma key peaks at (r - 1)σ with value one and is zero at x = 0.
    fn gamma_key_peaks_at_mode() {
        let fam = LikelihoodFamily::Gamma;
        let (sigma, r) = (4.0, 3.0);
        let m = fam.mode(sigma, Some(r));
        assert_eq!(m, 8.0);
        assert_relative_eq!(fam.key(m, sigma, Some(r)), 1.0, epsilon = 1e-12);
        assert!(fam.key(m - 1.0, sigma, Some(r)) < 1.0);
        assert!(fam.key(m + 1.0, sigma, Some(r)) < 1.0);
        assert_eq!(fam.key(0.0, sigma, Some(r)), 0.0);
    }

    #[test]
    // Purpose
    // -------
    // Closed-form strip integrals agree with quadrature on both designs,
    // including a left-truncated strip.
    //
    // Given
    // -----
    // - σ = 7, strips [0, 20] and [2, 20].
    //
    // Expect
    // ------
    // - Agreement to 1e-8 relative.
    fn closed_form_integrals_match_quadrature() {
        let sigma = 7.0;
        for fam in [LikelihoodFamily::HalfNormal, LikelihoodFamily::NegativeExponential] {
            for (lo, hi) in [(0.0, 20.0), (2.0, 20.0)] {
                let line = fam.closed_form_integral(SurveyType::Line, lo, hi, sigma).expect("closed form");
                let point =
                    fam.closed_form_integral(SurveyType::Point, lo, hi, sigma).expect("closed form");
                let line_num = simpson(|x| fam.key(x, sigma, None), lo, hi);
                let point_num = simpson(|x| x * fam.key(x, sigma, None), lo, hi);
                assert_relative_eq!(line, line_num, max_relative = 1e-8);
                assert_relative_eq!(point, point_num, max_relative = 1e-8);
            }
        }
        assert!(LikelihoodFamily::HazardRate
            .closed_form_integral(SurveyType::Line, 0.0, 1.0, 1.0)
            .is_none());
    }

    #[test]
    fn shape_maps_round_trip_and_respect_domains() {
        for fam in [LikelihoodFamily::HazardRate, LikelihoodFamily::Uniform, LikelihoodFamily::Gamma] {
            let shape = fam.default_shape().expect("has shape");
            assert_relative_eq!(fam.natural_shape(fam.shape_to_theta(shape)), shape, epsilon = 1e-10);
        }
        assert!(LikelihoodFamily::Gamma.natural_shape(-50.0) > 1.0);
        assert!(LikelihoodFamily::HazardRate.natural_shape(-50.0) > 0.0);
    }

    #[test]
    fn family_names_parse_and_display() {
        for fam in LikelihoodFamily::ALL {
            assert_eq!(fam.name().parse::<LikelihoodFamily>(), Ok(fam));
        }
        assert_eq!("HN".parse::<LikelihoodFamily>(), Ok(LikelihoodFamily::HalfNormal));
        assert!(matches!(
            "logistic".parse::<LikelihoodFamily>(),
            Err(DetectionError::UnknownFamily { .. })
        ));
        assert!(!LikelihoodFamily::Gamma.supports_expansions());
        assert_eq!(LikelihoodFamily::Gamma.shape_name(), Some("r"));
    }
}
