//! Model selection over a family × series × expansion grid.
//!
//! Purpose
//! -------
//! Fit every candidate detection function in a grid, tabulate its fit
//! statistics and pick the best by information criterion.
//!
//! Key behaviors
//! -------------
//! - [`CandidateGrid::candidates`] enumerates specifications in a fixed
//!   order: family-major, expansion order 0 once per family, then every
//!   series for each order `1..=max_expansions`. Gamma only appears at 0.
//! - [`SweepMode::Exhaustive`] fits all candidates on a rayon pool;
//!   [`SweepMode::StopOnFirstFailure`] fits in grid order and stops after the
//!   first candidate that is not rankable.
//! - The table is sorted by `(criterion, n_params, grid order)`; candidates
//!   that did not converge cleanly or have an invalid scale rank last with a
//!   criterion of `+∞`.
//!
//! Invariants & assumptions
//! ------------------------
//! - Structural input errors (bad truncation, missing covariates) abort the
//!   sweep; the first such error in grid order is returned.
//! - A cancelled sweep returns the candidates completed so far, sorted, with
//!   `cancelled = true`.
use crate::{
    abundance::{
        effective_width::{EffectiveWidth, effective_width},
        errors::{AbundanceError, AbundanceResult},
    },
    detection::{
        core::{
            data::SurveyData, expansions::SeriesKind, likelihoods::LikelihoodFamily,
            options::FitOptions, params::ModelSpec, truncation::Truncation,
        },
        errors::DetectionResult,
        models::{ConvergenceCode, DetectionFunctionModel, fit_detection_function},
    },
    utils::{CancelToken, build_pool},
};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Criterion {
    Aic,
    #[default]
    Aicc,
    Bic,
}

impl Criterion {
    pub fn value(&self, model: &DetectionFunctionModel) -> f64 {
        match self {
            Criterion::Aic => model.aic(),
            Criterion::Aicc => model.aicc(),
            Criterion::Bic => model.bic(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CandidateGrid {
    pub families: Vec<LikelihoodFamily>,
    pub series: Vec<SeriesKind>,
    pub max_expansions: usize,
}

impl Default for CandidateGrid {
    fn default() -> Self {
        Self {
            families: LikelihoodFamily::ALL.to_vec(),
            series: SeriesKind::ALL.to_vec(),
            max_expansions: 2,
        }
    }
}

impl CandidateGrid {
    /// Specifications in grid order.
    ///
    /// Errors
    /// ------
    /// - `InvalidExpansions` when `max_expansions` exceeds the cap.
    pub fn candidates(&self) -> DetectionResult<Vec<ModelSpec>> {
        let mut out = Vec::new();
        for &family in &self.families {
            out.push(ModelSpec::key_only(family));
            if !family.supports_expansions() {
                continue;
            }
            for m in 1..=self.max_expansions {
                for &series in &self.series {
                    out.push(ModelSpec::new(family, series, m)?);
                }
            }
        }
        Ok(out)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum SweepMode {
    #[default]
    Exhaustive,
    StopOnFirstFailure,
}

#[derive(Debug, Clone, Default)]
pub struct SelectionOptions {
    pub criterion: Criterion,
    pub mode: SweepMode,
    pub fit: FitOptions,
    /// Worker threads for exhaustive sweeps; `None` uses every core.
    pub n_threads: Option<usize>,
    pub cancel: Option<CancelToken>,
}

/// One row of the selection table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CandidateResult {
    /// Position in grid order.
    pub order: usize,
    pub spec: ModelSpec,
    pub n_params: usize,
    pub loglik: f64,
    pub aic: f64,
    pub aicc: f64,
    pub bic: f64,
    pub convergence: ConvergenceCode,
    /// Mean ESW / EDR.
    pub effective_width: f64,
    pub scale_valid: bool,
    /// Ranking value; `+∞` when the candidate is not rankable.
    pub criterion_value: f64,
    pub model: DetectionFunctionModel,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SelectionResult {
    pub criterion: Criterion,
    /// Sorted best first.
    pub table: Vec<CandidateResult>,
    /// Index into `table` of the selected model.
    pub best: Option<usize>,
    pub requested: usize,
    pub completed: usize,
    pub cancelled: bool,
}

impl SelectionResult {
    pub fn best_candidate(&self) -> Option<&CandidateResult> {
        self.best.map(|i| &self.table[i])
    }

    /// Selected model, or `NoValidCandidate` when nothing is rankable.
    pub fn require_best(&self) -> AbundanceResult<&DetectionFunctionModel> {
        self.best_candidate()
            .map(|c| &c.model)
            .ok_or(AbundanceError::NoValidCandidate { candidates: self.completed })
    }
}

fn evaluate(
    order: usize, spec: ModelSpec, data: &SurveyData, truncation: &Truncation,
    options: &SelectionOptions,
) -> DetectionResult<CandidateResult> {
    let model = fit_detection_function(data, &spec, truncation, &options.fit)?;
    let width = match effective_width(&model) {
        Ok(EffectiveWidth::Scalar(w)) => w,
        Ok(per_row) => per_row.mean(),
        Err(_) => f64::NAN,
    };
    let criterion_value =
        if model.is_rankable() { options.criterion.value(&model) } else { f64::INFINITY };
    if !model.is_rankable() {
        debug!(model = %spec, code = %model.convergence(), "candidate excluded from ranking");
    }
    Ok(CandidateResult {
        order,
        spec,
        n_params: model.n_params(),
        loglik: model.loglik(),
        aic: model.aic(),
        aicc: model.aicc(),
        bic: model.bic(),
        convergence: model.convergence(),
        effective_width: width,
        scale_valid: model.scale_valid(),
        criterion_value,
        model,
    })
}

/// select_model — fit every candidate and rank by information criterion.
///
/// Errors
/// ------
/// - `EmptyGrid` when the grid yields no candidates.
/// - `PoolBuild` when the worker pool cannot be created.
/// - The first structural fit error in grid order.
pub fn select_model(
    data: &SurveyData, truncation: &Truncation, grid: &CandidateGrid, options: &SelectionOptions,
) -> AbundanceResult<SelectionResult> {
    let specs = grid.candidates()?;
    if specs.is_empty() {
        return Err(AbundanceError::EmptyGrid);
    }
    let requested = specs.len();
    let is_cancelled = || options.cancel.as_ref().is_some_and(CancelToken::is_cancelled);

    let mut table = Vec::with_capacity(requested);
    let mut cancelled = false;
    match options.mode {
        SweepMode::StopOnFirstFailure => {
            for (order, spec) in specs.into_iter().enumerate() {
                if is_cancelled() {
                    cancelled = true;
                    break;
                }
                let row = evaluate(order, spec, data, truncation, options)?;
                let stop = !row.model.is_rankable();
                table.push(row);
                if stop {
                    break;
                }
            }
        }
        SweepMode::Exhaustive => {
            let pool = build_pool(options.n_threads)
                .map_err(|e| AbundanceError::PoolBuild { text: e.to_string() })?;
            let rows: Vec<Option<DetectionResult<CandidateResult>>> = pool.install(|| {
                specs
                    .into_par_iter()
                    .enumerate()
                    .map(|(order, spec)| {
                        if is_cancelled() {
                            return None;
                        }
                        Some(evaluate(order, spec, data, truncation, options))
                    })
                    .collect()
            });
            for row in rows {
                match row {
                    Some(result) => table.push(result?),
                    None => cancelled = true,
                }
            }
        }
    }

    table.sort_by(|a, b| {
        a.criterion_value
            .total_cmp(&b.criterion_value)
            .then(a.n_params.cmp(&b.n_params))
            .then(a.order.cmp(&b.order))
    });
    let best = table.first().filter(|c| c.criterion_value.is_finite()).map(|_| 0);
    if let Some(top) = table.first().filter(|_| best.is_some()) {
        info!(
            model = %top.spec, criterion = ?options.criterion, value = top.criterion_value,
            "model selected"
        );
    }
    let completed = table.len();
    Ok(SelectionResult { criterion: options.criterion, table, best, requested, completed, cancelled })
}

/// Convenience: grid of key-only models for the given families.
pub fn key_only_grid(families: &[LikelihoodFamily]) -> CandidateGrid {
    CandidateGrid { families: families.to_vec(), series: vec![SeriesKind::Cosine], max_expansions: 0 }
}
