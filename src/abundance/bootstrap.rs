//! Non-parametric bootstrap over sites.
//!
//! Purpose
//! -------
//! Quantify the uncertainty of an abundance estimate by resampling sites
//! (transects or points) with replacement, refitting the detection function
//! on each replicate and recomputing abundance.
//!
//! Key behaviors
//! -------------
//! - Each replicate draws as many sites as the survey has; a site's
//!   detections travel with it, and repeated sites are relabelled so they
//!   stay distinct (see `SurveyData::resample`).
//! - Replicate `i` draws from a ChaCha stream seeded with `(seed, i)`, so
//!   results do not depend on thread count or scheduling.
//! - A replicate succeeds when the refit is usable (converged, possibly with
//!   a singular covariance, and with a valid scale) and abundance can be
//!   computed. Everything else is a counted failure.
//! - The interval is the type-7 percentile interval of successful
//!   estimates. With no successes there is no interval: the status is
//!   [`BootstrapStatus::NoInterval`] and `interval` is `None`.
//!
//! Invariants & assumptions
//! ------------------------
//! - `succeeded + failed + skipped == requested`; skipped replicates come
//!   only from cancellation and are not failures.
//! - Fewer successes than `min_success_fraction · requested` mark the
//!   summary [`BootstrapStatus::Partial`] and log a warning.
use crate::{
    abundance::{
        errors::{AbundanceError, AbundanceResult},
        estimator::{AbundanceEstimate, AbundanceOptions, EstimateMode, estimate_abundance},
    },
    detection::{
        core::{
            data::SurveyData, options::FitOptions, params::ModelSpec, truncation::Truncation,
        },
        models::{DetectionFunctionModel, fit_detection_function},
    },
    utils::{CancelToken, build_pool, quantile_type7},
};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaChaRng;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

#[derive(Debug, Clone)]
pub struct BootstrapOptions {
    pub resamples: usize,
    pub conf_level: f64,
    pub seed: u64,
    pub min_success_fraction: f64,
    /// Worker threads; `None` uses every core.
    pub n_threads: Option<usize>,
    pub cancel: Option<CancelToken>,
}

impl Default for BootstrapOptions {
    fn default() -> Self {
        Self {
            resamples: 200,
            conf_level: 0.95,
            seed: 0,
            min_success_fraction: 0.5,
            n_threads: None,
            cancel: None,
        }
    }
}

impl BootstrapOptions {
    /// Validated options with default success threshold and threading.
    pub fn new(resamples: usize, conf_level: f64, seed: u64) -> AbundanceResult<Self> {
        let opts = Self { resamples, conf_level, seed, ..Self::default() };
        opts.validate()?;
        Ok(opts)
    }

    pub fn with_min_success_fraction(mut self, fraction: f64) -> AbundanceResult<Self> {
        self.min_success_fraction = fraction;
        self.validate()?;
        Ok(self)
    }

    pub fn with_threads(mut self, n_threads: Option<usize>) -> Self {
        self.n_threads = n_threads;
        self
    }

    pub fn with_cancel(mut self, token: CancelToken) -> Self {
        self.cancel = Some(token);
        self
    }

    pub fn validate(&self) -> AbundanceResult<()> {
        if self.resamples == 0 {
            return Err(AbundanceError::InvalidResamples { value: self.resamples });
        }
        if !(self.conf_level > 0.0 && self.conf_level < 1.0) {
            return Err(AbundanceError::InvalidConfidenceLevel { value: self.conf_level });
        }
        if !(0.0..=1.0).contains(&self.min_success_fraction) {
            return Err(AbundanceError::InvalidMinSuccessFraction {
                value: self.min_success_fraction,
            });
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BootstrapStatus {
    Complete,
    /// Interval formed from fewer successes than requested by
    /// `min_success_fraction`.
    Partial,
    /// No successful replicate.
    NoInterval,
    /// Cancelled before all replicates ran; interval from those that did.
    Cancelled,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BootstrapSummary {
    pub requested: usize,
    pub succeeded: usize,
    pub failed: usize,
    /// Replicates not run because of cancellation.
    pub skipped: usize,
    pub conf_level: f64,
    pub interval: Option<(f64, f64)>,
    pub mean: Option<f64>,
    pub std_error: Option<f64>,
    pub cv: Option<f64>,
    /// Successful abundance estimates in replicate order.
    pub estimates: Vec<f64>,
    pub seed: u64,
    pub status: BootstrapStatus,
}

impl BootstrapSummary {
    /// Replicates that ran; below `requested` only after cancellation.
    pub fn completed(&self) -> usize {
        self.succeeded + self.failed
    }

    /// Interval, or `NoSuccessfulResamples` when none could be formed.
    pub fn require_interval(&self) -> AbundanceResult<(f64, f64)> {
        self.interval.ok_or(AbundanceError::NoSuccessfulResamples {
            requested: self.requested,
            failed: self.failed,
        })
    }

    pub fn narrative(&self) -> String {
        let counts = format!(
            "{} of {} resamples succeeded, {} failed",
            self.succeeded, self.requested, self.failed
        );
        match (self.status, self.interval) {
            (BootstrapStatus::NoInterval, _) | (_, None) => {
                format!("bootstrap produced no interval ({counts})")
            }
            (status, Some((lo, hi))) => {
                let tag = match status {
                    BootstrapStatus::Partial => " [partial]",
                    BootstrapStatus::Cancelled => " [cancelled]",
                    _ => "",
                };
                format!("{:.0}% CI [{lo:.3}, {hi:.3}]{tag} ({counts})", self.conf_level * 100.0)
            }
        }
    }
}

enum Replicate {
    Success(f64),
    Failed,
    Skipped,
}

/// Site picks of replicate `index`.
pub fn resample_picks(seed: u64, index: u64, n_sites: usize) -> Vec<usize> {
    let mut rng = ChaChaRng::seed_from_u64(seed);
    rng.set_stream(index);
    (0..n_sites).map(|_| rng.random_range(0..n_sites)).collect()
}

#[allow(clippy::too_many_arguments)]
fn run_replicate(
    index: usize, data: &SurveyData, spec: &ModelSpec, truncation: &Truncation, area: f64,
    fit_options: &FitOptions, estimate_options: &AbundanceOptions, options: &BootstrapOptions,
) -> Replicate {
    if options.cancel.as_ref().is_some_and(CancelToken::is_cancelled) {
        return Replicate::Skipped;
    }
    let picks = resample_picks(options.seed, index as u64, data.n_sites());
    let replicate = data.resample(&picks);
    let model = match fit_detection_function(&replicate, spec, truncation, fit_options) {
        Ok(model) => model,
        Err(err) => {
            debug!(replicate = index, error = %err, "bootstrap refit rejected");
            return Replicate::Failed;
        }
    };
    if !model.is_usable() {
        debug!(replicate = index, code = %model.convergence(), "bootstrap refit not usable");
        return Replicate::Failed;
    }
    match estimate_abundance(&model, &replicate, area, estimate_options) {
        Ok(est) if est.abundance.is_finite() => Replicate::Success(est.abundance),
        Ok(_) => Replicate::Failed,
        Err(err) => {
            debug!(replicate = index, error = %err, "bootstrap estimate failed");
            Replicate::Failed
        }
    }
}

/// run_bootstrap — percentile interval for abundance by resampling sites.
///
/// Errors
/// ------
/// - `InvalidResamples`, `InvalidConfidenceLevel`,
///   `InvalidMinSuccessFraction` for bad options.
/// - `InvalidArea` for a non-finite or non-positive area.
/// - `PoolBuild` when the worker pool cannot be created.
///
/// Replicate failures are counted in the summary, never returned.
pub fn run_bootstrap(
    data: &SurveyData, spec: &ModelSpec, truncation: &Truncation, area: f64,
    fit_options: &FitOptions, abundance_options: &AbundanceOptions, options: &BootstrapOptions,
) -> AbundanceResult<BootstrapSummary> {
    options.validate()?;
    if !area.is_finite() || area <= 0.0 {
        return Err(AbundanceError::InvalidArea { value: area });
    }
    let fit_options = fit_options.clone().with_quiet(true);
    let estimate_options = AbundanceOptions { mode: EstimateMode::Population, ..*abundance_options };
    let pool = build_pool(options.n_threads)
        .map_err(|e| AbundanceError::PoolBuild { text: e.to_string() })?;

    let replicates: Vec<Replicate> = pool.install(|| {
        (0..options.resamples)
            .into_par_iter()
            .map(|i| {
                run_replicate(
                    i, data, spec, truncation, area, &fit_options, &estimate_options, options,
                )
            })
            .collect()
    });

    let mut estimates = Vec::new();
    let (mut failed, mut skipped) = (0, 0);
    for rep in replicates {
        match rep {
            Replicate::Success(n) => estimates.push(n),
            Replicate::Failed => failed += 1,
            Replicate::Skipped => skipped += 1,
        }
    }
    let summary = summarize(estimates, failed, skipped, options);
    match summary.status {
        BootstrapStatus::NoInterval => {
            warn!(requested = summary.requested, failed, "no bootstrap resample succeeded")
        }
        BootstrapStatus::Partial => warn!(
            succeeded = summary.succeeded,
            requested = summary.requested,
            failed,
            "bootstrap interval based on few successful resamples"
        ),
        _ => info!(
            succeeded = summary.succeeded,
            failed,
            skipped,
            "bootstrap finished"
        ),
    }
    Ok(summary)
}

fn summarize(
    estimates: Vec<f64>, failed: usize, skipped: usize, options: &BootstrapOptions,
) -> BootstrapSummary {
    let succeeded = estimates.len();
    let mean = (succeeded > 0).then(|| estimates.iter().sum::<f64>() / succeeded as f64);
    let std_error = match mean {
        Some(m) if succeeded > 1 => Some(
            (estimates.iter().map(|x| (x - m).powi(2)).sum::<f64>() / (succeeded - 1) as f64)
                .sqrt(),
        ),
        _ => None,
    };
    let cv = match (mean, std_error) {
        (Some(m), Some(se)) if m != 0.0 => Some(se / m),
        _ => None,
    };
    let interval = (succeeded > 0).then(|| {
        let mut sorted = estimates.clone();
        sorted.sort_by(f64::total_cmp);
        let alpha = (1.0 - options.conf_level) / 2.0;
        (quantile_type7(&sorted, alpha), quantile_type7(&sorted, 1.0 - alpha))
    });
    let status = if succeeded == 0 {
        BootstrapStatus::NoInterval
    } else if skipped > 0 {
        BootstrapStatus::Cancelled
    } else if (succeeded as f64) < options.min_success_fraction * options.resamples as f64 {
        BootstrapStatus::Partial
    } else {
        BootstrapStatus::Complete
    };
    BootstrapSummary {
        requested: options.resamples,
        succeeded,
        failed,
        skipped,
        conf_level: options.conf_level,
        interval,
        mean,
        std_error,
        cv,
        estimates,
        seed: options.seed,
        status,
    }
}

/// Fit on the full data, estimate abundance and attach a bootstrap summary.
pub fn estimate_with_bootstrap(
    data: &SurveyData, spec: &ModelSpec, truncation: &Truncation, area: f64,
    fit_options: &FitOptions, abundance_options: &AbundanceOptions, options: &BootstrapOptions,
) -> AbundanceResult<(DetectionFunctionModel, AbundanceEstimate)> {
    let model = fit_detection_function(data, spec, truncation, fit_options)?;
    let mut estimate = estimate_abundance(&model, data, area, abundance_options)?;
    estimate.bootstrap = Some(run_bootstrap(
        data,
        spec,
        truncation,
        area,
        fit_options,
        abundance_options,
        options,
    )?);
    Ok((model, estimate))
}
