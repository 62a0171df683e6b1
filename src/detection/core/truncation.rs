//! Truncation strip `[lo, hi]`.
//!
//! Distances outside the strip are discarded before any statistic is
//! computed. Both ends are inclusive. `lo > 0` gives left truncation, which
//! is common on point transects where the immediate vicinity is disturbed.
use crate::detection::{
    core::data::SurveyData,
    errors::{DetectionError, DetectionResult},
};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Truncation {
    lo: f64,
    hi: f64,
}

impl Truncation {
    /// Build a strip with `0 ≤ lo < hi < ∞`.
    pub fn new(lo: f64, hi: f64) -> DetectionResult<Self> {
        if !lo.is_finite() || !hi.is_finite() {
            return Err(DetectionError::InvalidTruncation { lo, hi, reason: "bounds must be finite" });
        }
        if lo < 0.0 {
            return Err(DetectionError::InvalidTruncation { lo, hi, reason: "lo must be >= 0" });
        }
        if hi <= lo {
            return Err(DetectionError::InvalidTruncation { lo, hi, reason: "hi must exceed lo" });
        }
        Ok(Self { lo, hi })
    }

    /// Strip from optional bounds; `lo` defaults to 0, `hi` to the largest
    /// observed distance.
    pub fn from_data(data: &SurveyData, lo: Option<f64>, hi: Option<f64>) -> DetectionResult<Self> {
        Self::new(lo.unwrap_or(0.0), hi.unwrap_or_else(|| data.max_distance()))
    }

    pub fn lo(&self) -> f64 {
        self.lo
    }

    pub fn hi(&self) -> f64 {
        self.hi
    }

    /// `hi - lo`.
    pub fn width(&self) -> f64 {
        self.hi - self.lo
    }

    /// `hi² - lo²`, the annulus factor for point transects.
    pub fn squared_width(&self) -> f64 {
        self.hi * self.hi - self.lo * self.lo
    }

    pub fn contains(&self, x: f64) -> bool {
        x >= self.lo && x <= self.hi
    }
}
