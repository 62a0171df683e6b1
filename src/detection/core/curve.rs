//! A detection function evaluated at fixed parameters.
//!
//! Purpose
//! -------
//! [`DetectionCurve`] binds a family, its scale and shape, any expansion
//! coefficients, the strip and the scaling convention into one object that
//! answers the questions the rest of the crate asks of a detection function:
//! detection probability at a distance, the strip integral, the normalised
//! distance density and the effective strip width or detection radius.
//!
//! Key behaviors
//! -------------
//! - `relative(x) = key(x)·s(x) / (key(x_scl)·s(x_scl))`, where `s` is the
//!   series adjustment; it equals one at `x_scl` by construction.
//! - `probability(x) = g0 · relative(x)`, clipped to `[0, 1]`.
//! - `integral` is `∫ relative⁺` (lines) or `∫ x·relative⁺` (points) over the
//!   strip, analytic for key-only half-normal and negative-exponential
//!   curves, Simpson otherwise.
//! - ESW = `g0 ∫ relative`; EDR = `√(2 g0 ∫ x·relative)`.
//!
//! Invariants & assumptions
//! ------------------------
//! - One curve corresponds to one covariate row (one scale `σ`).
//! - When the normaliser `key(x_scl)·s(x_scl)` is not finite and positive
//!   the curve is degenerate; its integral is NaN and callers must treat it
//!   as an invalid parameter point.
//! - Series terms use `u = x / hi`.
use crate::detection::core::{
    data::SurveyType, expansions::SeriesKind, integration::SimpsonGrid,
    likelihoods::LikelihoodFamily, truncation::Truncation,
};

#[derive(Debug, Clone, PartialEq)]
pub struct DetectionCurve {
    family: LikelihoodFamily,
    series: SeriesKind,
    sigma: f64,
    shape: Option<f64>,
    adj: Vec<f64>,
    truncation: Truncation,
    survey: SurveyType,
    x_scl: f64,
    g0: f64,
    norm: f64,
}

impl DetectionCurve {
    /// Assemble a curve.
    ///
    /// `x_scl = None` scales at the key's mode (zero for every family but
    /// gamma), clamped into the strip.
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        family: LikelihoodFamily, series: SeriesKind, sigma: f64, shape: Option<f64>, adj: Vec<f64>,
        truncation: Truncation, survey: SurveyType, x_scl: Option<f64>, g0: f64,
    ) -> Self {
        let x_scl = x_scl.unwrap_or_else(|| family.mode(sigma, shape).clamp(0.0, truncation.hi()));
        let mut curve =
            Self { family, series, sigma, shape, adj, truncation, survey, x_scl, g0, norm: 1.0 };
        curve.norm = curve.unscaled(x_scl);
        curve
    }

    pub fn family(&self) -> LikelihoodFamily {
        self.family
    }

    pub fn sigma(&self) -> f64 {
        self.sigma
    }

    pub fn shape(&self) -> Option<f64> {
        self.shape
    }

    pub fn x_scl(&self) -> f64 {
        self.x_scl
    }

    pub fn g0(&self) -> f64 {
        self.g0
    }

    pub fn survey(&self) -> SurveyType {
        self.survey
    }

    pub fn is_degenerate(&self) -> bool {
        !(self.norm.is_finite() && self.norm > 0.0)
    }

    fn unscaled(&self, x: f64) -> f64 {
        let key = self.family.key(x, self.sigma, self.shape);
        key * self.series.adjustment(&self.adj, x / self.truncation.hi())
    }

    /// Detection function relative to `g(x_scl) = 1`. Can be negative when
    /// expansion terms overshoot.
    pub fn relative(&self, x: f64) -> f64 {
        self.unscaled(x) / self.norm
    }

    /// Detection probability `g(x)` in `[0, 1]`.
    pub fn probability(&self, x: f64) -> f64 {
        let g = self.g0 * self.relative(x);
        if g.is_nan() { 0.0 } else { g.clamp(0.0, 1.0) }
    }

    /// `∫ relative⁺` (line) or `∫ x·relative⁺` (point) over the strip.
    pub fn integral(&self, grid: &SimpsonGrid) -> f64 {
        if self.is_degenerate() {
            return f64::NAN;
        }
        if self.adj.is_empty() {
            let (lo, hi) = (self.truncation.lo(), self.truncation.hi());
            if let Some(raw) = self.family.closed_form_integral(self.survey, lo, hi, self.sigma) {
                return raw / self.norm;
            }
        }
        match self.survey {
            SurveyType::Line => grid.integrate(|x| self.relative(x).max(0.0)),
            SurveyType::Point => grid.integrate(|x| x * self.relative(x).max(0.0)),
        }
    }

    /// `∫ min(relative, 0)²` over the strip: how far expansion terms push the
    /// curve below zero.
    pub fn negative_mass(&self, grid: &SimpsonGrid) -> f64 {
        if self.adj.is_empty() {
            return 0.0;
        }
        grid.integrate(|x| {
            let g = self.relative(x).min(0.0);
            g * g
        })
    }

    /// Normalised distance density on the strip: `g / ∫g` (line) or
    /// `x g / ∫x g` (point). Zero outside the strip.
    pub fn density(&self, x: f64, grid: &SimpsonGrid) -> f64 {
        if !self.truncation.contains(x) {
            return 0.0;
        }
        let integral = self.integral(grid);
        let g = self.relative(x).max(0.0);
        match self.survey {
            SurveyType::Line => g / integral,
            SurveyType::Point => x * g / integral,
        }
    }

    /// Effective strip half-width (line) or effective detection radius
    /// (point).
    pub fn effective_width(&self, grid: &SimpsonGrid) -> f64 {
        let integral = self.integral(grid);
        match self.survey {
            SurveyType::Line => self.g0 * integral,
            SurveyType::Point => (2.0 * self.g0 * integral).sqrt(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::detection::core::integration::DEFAULT_INTEGRATION_POINTS;
    use approx::assert_relative_eq;

    // -------------------------------------------------------------------------
    // Scope
    // -----
    // - Scaling: g(x_scl) = g0, probabilities clipped to [0, 1].
    // - ESW / EDR against analytic values.
    // - Density integrates to one; closed form and quadrature agree.
    // -------------------------------------------------------------------------

    fn strip(hi: f64) -> Truncation {
        Truncation::new(0.0, hi).expect("valid strip")
    }

    fn grid(w: &Truncation) -> SimpsonGrid {
        SimpsonGrid::new(w.lo(), w.hi(), DEFAULT_INTEGRATION_POINTS).expect("valid grid")
    }

    #[test]
    // Purpose
    // -------
    // A half-normal curve with a wide strip has ESW ≈ σ√(π/2).
    //
    // Given
    // -----
    // - σ = 10, w = [0, 100] (truncation negligible).
    //
    // Expect
    // ------
    // - ESW = 10·√(π/2) to 1e-9; EDR² = 2σ² for the point analogue.
    fn half_normal_effective_widths_match_analytic() {
        // Arrange
        let w = strip(100.0);
        let g = grid(&w);
        let line = DetectionCurve::new(
            LikelihoodFamily::HalfNormal, SeriesKind::Cosine, 10.0, None, vec![], w,
            SurveyType::Line, None, 1.0,
        );
        let point = DetectionCurve::new(
            LikelihoodFamily::HalfNormal, SeriesKind::Cosine, 10.0, None, vec![], w,
            SurveyType::Point, None, 1.0,
        );

        // Act / Assert
        assert_relative_eq!(
            line.effective_width(&g),
            10.0 * (std::f64::consts::PI / 2.0).sqrt(),
            max_relative = 1e-9
        );
        assert_relative_eq!(point.effective_width(&g).powi(2), 200.0, max_relative = 1e-9);
        assert_eq!(line.probability(0.0), 1.0);
    }

    #[test]
    // Purpose
    // -------
    // g0 < 1 scales probabilities and ESW linearly.
    fn g0_scales_probability_and_width() {
        let w = strip(30.0);
        let g = grid(&w);
        let full = DetectionCurve::new(
            LikelihoodFamily::NegativeExponential, SeriesKind::Cosine, 8.0, None, vec![], w,
            SurveyType::Line, None, 1.0,
        );
        let partial = DetectionCurve::new(
            LikelihoodFamily::NegativeExponential, SeriesKind::Cosine, 8.0, None, vec![], w,
            SurveyType::Line, None, 0.8,
        );
        assert_relative_eq!(partial.probability(0.0), 0.8, epsilon = 1e-12);
        assert_relative_eq!(partial.effective_width(&g), 0.8 * full.effective_width(&g), epsilon = 1e-12);
    }

    #[test]
    // Purpose
    // -------
    // The distance density integrates to one on both designs, with and
    // without expansion terms.
    fn density_integrates_to_one() {
        let w = Truncation::new(1.0, 25.0).expect("valid strip");
        let g = grid(&w);
        for survey in [SurveyType::Line, SurveyType::Point] {
            for adj in [vec![], vec![0.3]] {
                let curve = DetectionCurve::new(
                    LikelihoodFamily::HazardRate, SeriesKind::Cosine, 9.0, Some(3.0), adj, w,
                    survey, None, 1.0,
                );
                let total = g.integrate(|x| curve.density(x, &g));
                assert_relative_eq!(total, 1.0, max_relative = 1e-9);
            }
        }
    }

    #[test]
    // Purpose
    // -------
    // Gamma curves scale at their mode by default.
    fn gamma_curve_scales_at_mode() {
        let w = strip(50.0);
        let curve = DetectionCurve::new(
            LikelihoodFamily::Gamma, SeriesKind::Cosine, 5.0, Some(2.5), vec![], w,
            SurveyType::Line, None, 1.0,
        );
        assert_relative_eq!(curve.x_scl(), 7.5, epsilon = 1e-12);
        assert_relative_eq!(curve.probability(7.5), 1.0, epsilon = 1e-12);
        assert!(curve.probability(0.0) < 1e-12);
    }

    #[test]
    // Purpose
    // -------
    // Large expansion coefficients push the curve below zero; the excess is
    // measured and probabilities stay clipped.
    fn overshooting_expansion_reports_negative_mass() {
        let w = strip(10.0);
        let g = grid(&w);
        let curve = DetectionCurve::new(
            LikelihoodFamily::HalfNormal, SeriesKind::Cosine, 20.0, None, vec![1.5], w,
            SurveyType::Line, None, 1.0,
        );
        assert!(curve.negative_mass(&g) > 0.0);
        assert_eq!(curve.probability(10.0), 0.0);
    }
}
