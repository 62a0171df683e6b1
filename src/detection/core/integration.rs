//! Composite Simpson quadrature on a fixed grid.
//!
//! Nodes and weights are built once per fit and reused for every likelihood
//! evaluation, so integrating a detection function costs one pass over the
//! grid.
use crate::detection::errors::{DetectionError, DetectionResult};

/// Default number of grid points.
pub const DEFAULT_INTEGRATION_POINTS: usize = 201;

#[derive(Debug, Clone, PartialEq)]
pub struct SimpsonGrid {
    nodes: Vec<f64>,
    weights: Vec<f64>,
}

impl SimpsonGrid {
    /// `points` equally spaced nodes on `[lo, hi]`; `points` must be odd
    /// and at least 3.
    pub fn new(lo: f64, hi: f64, points: usize) -> DetectionResult<Self> {
        if points < 3 || points % 2 == 0 {
            return Err(DetectionError::InvalidIntegrationPoints { points });
        }
        if !(lo.is_finite() && hi.is_finite() && hi > lo) {
            return Err(DetectionError::InvalidTruncation {
                lo,
                hi,
                reason: "integration bounds must be finite with hi > lo",
            });
        }
        let h = (hi - lo) / (points - 1) as f64;
        let nodes = (0..points).map(|i| lo + i as f64 * h).collect();
        let weights = (0..points)
            .map(|i| {
                let w = if i == 0 || i == points - 1 {
                    1.0
                } else if i % 2 == 1 {
                    4.0
                } else {
                    2.0
                };
                w * h / 3.0
            })
            .collect();
        Ok(Self { nodes, weights })
    }

    pub fn nodes(&self) -> &[f64] {
        &self.nodes
    }

    pub fn integrate<F: Fn(f64) -> f64>(&self, f: F) -> f64 {
        self.nodes.iter().zip(&self.weights).map(|(&x, &w)| w * f(x)).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn simpson_is_exact_for_cubics() {
        let grid = SimpsonGrid::new(1.0, 3.0, 5).expect("valid grid");
        // ∫_1^3 x³ dx = (81 - 1) / 4
        assert_relative_eq!(grid.integrate(|x| x.powi(3)), 20.0, epsilon = 1e-12);
    }

    #[test]
    fn default_grid_integrates_smooth_functions_accurately() {
        let grid = SimpsonGrid::new(0.0, 10.0, DEFAULT_INTEGRATION_POINTS).expect("valid grid");
        let exact = 5.0 * (1.0 - (-2.0f64).exp());
        assert_relative_eq!(grid.integrate(|x| (-x / 5.0).exp()), exact, max_relative = 1e-9);
    }

    #[test]
    fn even_or_tiny_point_counts_are_rejected() {
        assert_eq!(
            SimpsonGrid::new(0.0, 1.0, 200),
            Err(DetectionError::InvalidIntegrationPoints { points: 200 })
        );
        assert!(SimpsonGrid::new(0.0, 1.0, 1).is_err());
    }
}
