//! Effective strip width (lines) and effective detection radius (points).
//!
//! Purpose
//! -------
//! Derive ESW / EDR from a fitted detection function, either as one scalar
//! (no covariates) or per covariate row, and convert widths into detection
//! probabilities over the strip.
//!
//! Key behaviors
//! -------------
//! - Line: `ESW = g0 ∫_lo^hi g(x) dx`, probability `ESW / (hi - lo)`.
//! - Point: `EDR = √(2 g0 ∫_lo^hi x g(x) dx)`, probability
//!   `EDR² / (hi² - lo²)`.
//! - Results are recomputed from the model each call; the same model always
//!   gives the same widths.
use crate::{
    abundance::errors::AbundanceResult,
    detection::{
        core::{
            data::{Covariates, SurveyType},
            truncation::Truncation,
        },
        errors::DetectionError,
        models::DetectionFunctionModel,
    },
};
use ndarray::Array1;
use serde::{Deserialize, Serialize};

/// ESW / EDR of a model: one value, or one per row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum EffectiveWidth {
    Scalar(f64),
    PerRow(Array1<f64>),
}

impl EffectiveWidth {
    /// Width for row `i` (the scalar for every row).
    pub fn get(&self, i: usize) -> Option<f64> {
        match self {
            EffectiveWidth::Scalar(w) => Some(*w),
            EffectiveWidth::PerRow(ws) => ws.get(i).copied(),
        }
    }

    /// Arithmetic mean of the widths.
    pub fn mean(&self) -> f64 {
        match self {
            EffectiveWidth::Scalar(w) => *w,
            EffectiveWidth::PerRow(ws) => ws.mean().unwrap_or(f64::NAN),
        }
    }
}

/// Detection probability over the strip implied by an ESW / EDR.
pub fn detection_probability(width: f64, survey: SurveyType, truncation: &Truncation) -> f64 {
    match survey {
        SurveyType::Line => width / truncation.width(),
        SurveyType::Point => width * width / truncation.squared_width(),
    }
}

/// ESW / EDR of `model`: scalar without covariates, otherwise one value per
/// fitted detection.
pub fn effective_width(model: &DetectionFunctionModel) -> AbundanceResult<EffectiveWidth> {
    let grid = model.grid()?;
    if !model.has_covariates() {
        return Ok(EffectiveWidth::Scalar(model.baseline_curve().effective_width(&grid)));
    }
    let widths = (0..model.n())
        .filter_map(|i| model.curve_for_row(i))
        .map(|c| c.effective_width(&grid))
        .collect::<Array1<f64>>();
    Ok(EffectiveWidth::PerRow(widths))
}

/// ESW / EDR for arbitrary covariate rows.
///
/// Errors
/// ------
/// - `MissingCovariate` (index = row position) when a row lacks a model
///   covariate.
pub fn effective_width_for_rows(
    model: &DetectionFunctionModel, rows: &[Covariates],
) -> AbundanceResult<Array1<f64>> {
    let grid = model.grid()?;
    rows.iter()
        .enumerate()
        .map(|(index, row)| -> AbundanceResult<f64> {
            let curve = model.curve_for_covariates(row).ok_or_else(|| {
                let name = model
                    .covariate_names()
                    .iter()
                    .find(|n| !row.contains_key(*n))
                    .cloned()
                    .unwrap_or_default();
                DetectionError::MissingCovariate { index, name }
            })?;
            Ok(curve.effective_width(&grid))
        })
        .collect()
}
