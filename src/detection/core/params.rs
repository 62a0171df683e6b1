//! Model specification and the layout of the optimizer vector `θ`.
//!
//! Purpose
//! -------
//! Pin down which detection function is being fitted ([`ModelSpec`]) and how
//! its parameters are packed into the unconstrained vector the optimizer
//! works on ([`ParamLayout`]).
//!
//! Conventions
//! -----------
//! - `θ = [β₀, β₁..β_c, θ_shape?, a₁..a_m]`, where `β` are log-link scale
//!   coefficients (intercept plus one per covariate), `θ_shape` is present
//!   for two-parameter families and `a_j` are expansion coefficients.
//! - Coefficient names are `"(Intercept)"`, the covariate names, `"k"` or
//!   `"r"`, then `"a1"`..`"a5"`.
use crate::detection::{
    core::{
        expansions::{MAX_EXPANSIONS, SeriesKind},
        likelihoods::LikelihoodFamily,
    },
    errors::{DetectionError, DetectionResult},
};
use ndarray::{Array1, ArrayView1, s};
use serde::{Deserialize, Serialize};
use std::ops::Range;

/// Family, series and number of expansion terms.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ModelSpec {
    family: LikelihoodFamily,
    series: SeriesKind,
    expansions: usize,
}

impl ModelSpec {
    /// Validated specification.
    ///
    /// Errors
    /// ------
    /// - `InvalidExpansions` when `expansions > MAX_EXPANSIONS`.
    /// - `ExpansionsNotSupported` for gamma with `expansions > 0`.
    pub fn new(
        family: LikelihoodFamily, series: SeriesKind, expansions: usize,
    ) -> DetectionResult<Self> {
        if expansions > MAX_EXPANSIONS {
            return Err(DetectionError::InvalidExpansions {
                requested: expansions,
                max: MAX_EXPANSIONS,
            });
        }
        if expansions > 0 && !family.supports_expansions() {
            return Err(DetectionError::ExpansionsNotSupported { family: family.name() });
        }
        Ok(Self { family, series, expansions })
    }

    /// Key function without expansion terms.
    pub fn key_only(family: LikelihoodFamily) -> Self {
        Self { family, series: SeriesKind::Cosine, expansions: 0 }
    }

    pub fn family(&self) -> LikelihoodFamily {
        self.family
    }

    pub fn series(&self) -> SeriesKind {
        self.series
    }

    pub fn expansions(&self) -> usize {
        self.expansions
    }

    /// Short label such as `"hazrate+cosine(2)"` or `"halfnorm"`.
    pub fn label(&self) -> String {
        match self.expansions {
            0 => self.family.name().to_string(),
            m => format!("{}+{}({m})", self.family, self.series),
        }
    }
}

impl std::fmt::Display for ModelSpec {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.label())
    }
}

/// Positions of the parameter blocks inside `θ`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParamLayout {
    n_beta: usize,
    n_shape: usize,
    n_adj: usize,
}

impl ParamLayout {
    pub fn new(spec: &ModelSpec, n_covariates: usize) -> Self {
        Self { n_beta: 1 + n_covariates, n_shape: spec.family().n_shape(), n_adj: spec.expansions() }
    }

    pub fn len(&self) -> usize {
        self.n_beta + self.n_shape + self.n_adj
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn n_beta(&self) -> usize {
        self.n_beta
    }

    pub fn n_covariates(&self) -> usize {
        self.n_beta - 1
    }

    pub fn n_adj(&self) -> usize {
        self.n_adj
    }

    pub fn beta_range(&self) -> Range<usize> {
        0..self.n_beta
    }

    /// Index of `θ_shape`, if the family has one.
    pub fn shape_index(&self) -> Option<usize> {
        (self.n_shape == 1).then_some(self.n_beta)
    }

    pub fn adj_range(&self) -> Range<usize> {
        let start = self.n_beta + self.n_shape;
        start..start + self.n_adj
    }

    pub fn beta<'a>(&self, theta: &'a Array1<f64>) -> ArrayView1<'a, f64> {
        theta.slice(s![self.beta_range()])
    }

    pub fn adj(&self, theta: &Array1<f64>) -> Vec<f64> {
        theta.slice(s![self.adj_range()]).to_vec()
    }

    /// Coefficient labels aligned with `θ`.
    pub fn names(&self, family: LikelihoodFamily, covariates: &[String]) -> Vec<String> {
        let mut names = Vec::with_capacity(self.len());
        names.push("(Intercept)".to_string());
        names.extend(covariates.iter().cloned());
        if let Some(shape) = family.shape_name() {
            names.push(shape.to_string());
        }
        names.extend((1..=self.n_adj).map(|j| format!("a{j}")));
        names
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    // Purpose
    // -------
    // Invalid expansion requests are rejected before any fitting.
    fn model_spec_validates_expansions() {
        assert_eq!(
            ModelSpec::new(LikelihoodFamily::HalfNormal, SeriesKind::Cosine, 6),
            Err(DetectionError::InvalidExpansions { requested: 6, max: MAX_EXPANSIONS })
        );
        assert_eq!(
            ModelSpec::new(LikelihoodFamily::Gamma, SeriesKind::Hermite, 1),
            Err(DetectionError::ExpansionsNotSupported { family: "gamma" })
        );
        assert!(ModelSpec::new(LikelihoodFamily::Gamma, SeriesKind::Hermite, 0).is_ok());
    }

    #[test]
    // Purpose
    // -------
    // Blocks of θ and their labels line up.
    //
    // Given
    // -----
    // - Hazard-rate with two cosine terms and one covariate "obs".
    //
    // Expect
    // ------
    // - θ length 5: [(Intercept), obs, k, a1, a2].
    fn param_layout_places_blocks_in_order() {
        // Arrange
        let spec = ModelSpec::new(LikelihoodFamily::HazardRate, SeriesKind::Cosine, 2)
            .expect("valid spec");

        // Act
        let layout = ParamLayout::new(&spec, 1);
        let names = layout.names(spec.family(), &["obs".to_string()]);

        // Assert
        assert_eq!(layout.len(), 5);
        assert_eq!(layout.beta_range(), 0..2);
        assert_eq!(layout.shape_index(), Some(2));
        assert_eq!(layout.adj_range(), 3..5);
        assert_eq!(names, vec!["(Intercept)", "obs", "k", "a1", "a2"]);
        assert_eq!(spec.label(), "hazrate+cosine(2)");
    }

    #[test]
    fn key_only_layout_has_no_shape_or_adjustments() {
        let layout = ParamLayout::new(&ModelSpec::key_only(LikelihoodFamily::HalfNormal), 0);
        assert_eq!(layout.len(), 1);
        assert_eq!(layout.shape_index(), None);
        assert!(layout.adj_range().is_empty());
    }
}
