//! Integration tests for the distance sampling pipeline.
//!
//! Purpose
//! -------
//! - Validate the end-to-end path from validated survey data, through
//!   detection-function fitting, to ESW/EDR, abundance, model selection and
//!   the site bootstrap.
//! - Check the survey-level identities that tie the code paths together
//!   (textbook formula vs Horvitz–Thompson, per-site vs population).
//!
//! Coverage
//! --------
//! - `detection`: fitting half-normal and hazard-rate keys on line and point
//!   designs, truncation filtering, determinism of refits.
//! - `abundance::effective_width`: monotonicity of the width in the upper
//!   truncation bound.
//! - `abundance::estimator`: line and point expansion formulas, per-site
//!   aggregation.
//! - `abundance::selection`: full grid sweep and exclusion of
//!   non-converged candidates.
//! - `abundance::bootstrap`: forced failure of every resample.
//!
//! Exclusions
//! ----------
//! - Low-level key, expansion and quadrature behavior; covered by unit tests.
use approx::assert_relative_eq;
use distance_sampling::{
    abundance::{
        AbundanceError, AbundanceOptions, BootstrapOptions, BootstrapStatus, CandidateGrid,
        EffectiveWidth, Effort, EstimateMode, SelectionOptions, effective_width,
        estimate_abundance, estimate_with_bootstrap, run_bootstrap, select_model,
    },
    detection::{
        ConvergenceCode, DetectionCurve, DetectionFunctionModel, DetectionRecord, FitOptions,
        LikelihoodFamily, ModelSpec, SeriesKind, Site, SurveyData, SurveyType, Truncation,
        core::SimpsonGrid, fit_detection_function,
    },
    optimization::loglik_optimizer::{MLEOptions, SolverKind, Tolerances},
};
use std::f64::consts::PI;

/// Half-normal quantile `σ √2 erf⁻¹(p)`, by bisection.
fn half_normal_quantile(p: f64, sigma: f64) -> f64 {
    let (mut lo, mut hi) = (0.0, 6.0);
    for _ in 0..80 {
        let mid = 0.5 * (lo + hi);
        if statrs::function::erf::erf(mid) < p {
            lo = mid;
        } else {
            hi = mid;
        }
    }
    sigma * std::f64::consts::SQRT_2 * 0.5 * (lo + hi)
}

/// `n` evenly spaced half-normal quantiles with scale `sigma`, with group
/// sizes cycling through 1..=3.
fn half_normal_distances(n: usize, sigma: f64) -> Vec<(f64, u32)> {
    (0..n)
        .map(|i| {
            let p = (i as f64 + 0.5) / n as f64;
            (half_normal_quantile(p, sigma), 1 + (i % 3) as u32)
        })
        .collect()
}

/// Scenario A data: 100 detections on one line of length 1000.
fn single_line_survey() -> SurveyData {
    let dets = half_normal_distances(100, 50.0)
        .into_iter()
        .map(|(x, s)| DetectionRecord::new(x, s, "T1"))
        .collect();
    SurveyData::new(dets, vec![Site::line("T1", 1000.0)], SurveyType::Line)
        .expect("valid line survey")
}

/// The same distances spread over `k` lines of differing length, plus one
/// line without detections.
fn multi_line_survey(k: usize) -> SurveyData {
    let dets = half_normal_distances(100, 50.0)
        .into_iter()
        .enumerate()
        .map(|(i, (x, s))| DetectionRecord::new(x, s, format!("T{}", i % k)))
        .collect();
    let mut sites: Vec<Site> =
        (0..k).map(|s| Site::line(format!("T{s}"), 150.0 + 40.0 * s as f64)).collect();
    sites.push(Site::line("empty", 200.0));
    SurveyData::new(dets, sites, SurveyType::Line).expect("valid line survey")
}

/// Scenario B data: the same distances recorded at four points.
fn point_survey() -> SurveyData {
    let dets = half_normal_distances(100, 50.0)
        .into_iter()
        .enumerate()
        .map(|(i, (x, s))| DetectionRecord::new(x, s, format!("P{}", i % 4)))
        .collect();
    let sites = (0..4).map(|k| Site::point(format!("P{k}"))).collect();
    SurveyData::new(dets, sites, SurveyType::Point).expect("valid point survey")
}

fn strip() -> Truncation {
    Truncation::new(0.0, 150.0).expect("valid strip")
}

fn quiet() -> FitOptions {
    FitOptions::default().with_quiet(true)
}

fn fit_half_normal(data: &SurveyData) -> DetectionFunctionModel {
    fit_detection_function(data, &ModelSpec::key_only(LikelihoodFamily::HalfNormal), &strip(), &quiet())
        .expect("structurally valid fit")
}

/// Options whose single Nelder–Mead iteration can never converge.
fn crippled_fit() -> FitOptions {
    let tols = Tolerances::new(None, Some(1e-12), Some(1)).expect("tolerances");
    let mle = MLEOptions::new(tols, SolverKind::NelderMead, None, 0.5).expect("mle options");
    quiet().with_mle(mle)
}

#[test]
// Purpose
// -------
// Scenario A: a half-normal key fitted to a single line gives a converged
// model, one positive scalar ESW within the strip and a finite abundance.
//
// Given
// -----
// - 100 detections, w = [0, 150], one transect of length 1000, area 10000.
//
// Expect
// ------
// - Convergence code 0, scalar ESW in (0, 150], abundance finite and > 0.
fn scenario_a_half_normal_line_transect() {
    // Arrange
    let data = single_line_survey();

    // Act
    let model = fit_half_normal(&data);
    let esw = effective_width(&model).expect("width");
    let est = estimate_abundance(&model, &data, 10_000.0, &AbundanceOptions::default())
        .expect("estimate");

    // Assert
    assert_eq!(model.convergence(), ConvergenceCode::Success);
    assert_eq!(model.convergence().code(), 0);
    assert!(model.scale_valid());
    let EffectiveWidth::Scalar(w) = esw else { panic!("expected a scalar ESW") };
    assert!(w > 0.0 && w <= 150.0, "ESW = {w}");
    assert!(est.abundance.is_finite() && est.abundance > 0.0);
    assert_eq!(est.n_detections, 100);
    assert_eq!(est.effort, Effort::TotalLength(1000.0));
}

#[test]
// Purpose
// -------
// Scenario B: on a point design the expansion uses π·EDR² per point.
//
// Given
// -----
// - The scenario A distances at four points, area 10000.
//
// Expect
// ------
// - N = Σ s × A / (π EDR² K) and the effort is reported as points.
fn scenario_b_point_transect_uses_edr_area() {
    // Arrange
    let data = point_survey();
    let area = 10_000.0;

    // Act
    let model = fit_half_normal(&data);
    let est = estimate_abundance(&model, &data, area, &AbundanceOptions::default())
        .expect("estimate");

    // Assert
    assert_eq!(model.survey(), SurveyType::Point);
    let EffectiveWidth::Scalar(edr) = est.effective_width else { panic!("expected scalar EDR") };
    assert!(edr > 0.0 && edr <= 150.0);
    let individuals = est.individuals as f64;
    let expected = individuals * area / (PI * edr * edr * 4.0);
    assert_relative_eq!(est.abundance, expected, max_relative = 1e-10);
    assert_eq!(est.effort, Effort::Points(4));
}

#[test]
// Purpose
// -------
// Scenario C: the full grid sweep picks the lowest AICc among converged,
// scale-valid candidates and never a non-converged one.
//
// Given
// -----
// - Five families × three series × expansion orders 0..=3.
//
// Expect
// ------
// - The selected row has code 0 and a valid scale.
// - Its AICc is not above that of any other rankable row.
// - Every non-rankable row carries an infinite ranking value.
fn scenario_c_grid_selects_lowest_valid_aicc() {
    // Arrange
    let data = single_line_survey();
    let grid = CandidateGrid {
        families: LikelihoodFamily::ALL.to_vec(),
        series: SeriesKind::ALL.to_vec(),
        max_expansions: 3,
    };
    let options = SelectionOptions { fit: quiet(), ..SelectionOptions::default() };

    // Act
    let result = select_model(&data, &strip(), &grid, &options).expect("sweep");

    // Assert
    assert_eq!(result.requested, 5 + 4 * 3 * 3);
    assert_eq!(result.completed, result.requested);
    let best = result.best_candidate().expect("at least one valid candidate");
    assert_eq!(best.convergence, ConvergenceCode::Success);
    assert!(best.scale_valid);
    assert!(best.effective_width <= 150.0 * (1.0 + 1e-6));
    for row in &result.table {
        if row.convergence == ConvergenceCode::Success && row.scale_valid {
            assert!(best.aicc <= row.aicc, "{} beats the selected {}", row.spec, best.spec);
        } else {
            assert!(row.criterion_value.is_infinite());
        }
    }
}

#[test]
// Purpose
// -------
// A sweep where no candidate can converge selects nothing.
fn grid_never_selects_unconverged_candidates() {
    let data = single_line_survey();
    let grid = CandidateGrid { max_expansions: 1, ..CandidateGrid::default() };
    let options = SelectionOptions { fit: crippled_fit(), ..SelectionOptions::default() };

    let result = select_model(&data, &strip(), &grid, &options).expect("sweep");

    assert!(result.best.is_none());
    assert!(result.table.iter().all(|row| row.convergence != ConvergenceCode::Success));
    assert!(matches!(result.require_best(), Err(AbundanceError::NoValidCandidate { .. })));
}

#[test]
// Purpose
// -------
// Without covariates the Horvitz–Thompson sum equals the textbook line
// formula `mean size × n × A / (2 ESW L)`.
fn line_horvitz_thompson_matches_textbook_formula() {
    // Arrange
    let data = multi_line_survey(3);
    let area = 5.0e5;

    // Act
    let model = fit_half_normal(&data);
    let est = estimate_abundance(&model, &data, area, &AbundanceOptions::default())
        .expect("estimate");

    // Assert
    let EffectiveWidth::Scalar(esw) = est.effective_width else { panic!("expected scalar ESW") };
    let length = data.total_length().expect("line survey");
    let textbook = est.mean_group_size * est.n_detections as f64 * area / (2.0 * esw * length);
    assert_relative_eq!(est.abundance, textbook, max_relative = 1e-10);
}

#[test]
// Purpose
// -------
// Per-site abundances summed over the total sampled area reproduce the
// population estimate; the empty line contributes zero.
fn per_site_sum_matches_population_estimate() {
    // Arrange
    let data = multi_line_survey(4);
    let area = 2.0e5;
    let model = fit_half_normal(&data);
    let per_site = AbundanceOptions { mode: EstimateMode::PerSite, ..AbundanceOptions::default() };

    // Act
    let population = estimate_abundance(&model, &data, area, &AbundanceOptions::default())
        .expect("population estimate");
    let by_site = estimate_abundance(&model, &data, area, &per_site).expect("per-site estimate");

    // Assert
    let sites = by_site.sites.as_ref().expect("per-site table");
    assert_eq!(sites.len(), 5);
    let empty = sites.iter().find(|s| s.site_id == "empty").expect("empty site listed");
    assert_eq!(empty.abundance, 0.0);
    let total: f64 = sites.iter().map(|s| s.abundance).sum();
    let sampled: f64 = sites.iter().map(|s| s.sampled_area).sum();
    assert_relative_eq!(total / sampled * area, population.abundance, max_relative = 1e-10);
}

#[test]
// Purpose
// -------
// For fixed parameters, widening the strip never shrinks the ESW or EDR.
fn effective_width_is_monotone_in_upper_bound() {
    for survey in [SurveyType::Line, SurveyType::Point] {
        let mut previous = 0.0;
        for hi in [20.0, 50.0, 80.0, 120.0, 200.0] {
            let w = Truncation::new(0.0, hi).expect("valid strip");
            let grid = SimpsonGrid::new(0.0, hi, 201).expect("grid");
            let curve = DetectionCurve::new(
                LikelihoodFamily::HazardRate,
                SeriesKind::Cosine,
                40.0,
                Some(3.0),
                Vec::new(),
                w,
                survey,
                None,
                1.0,
            );
            let width = curve.effective_width(&grid);
            assert!(width >= previous - 1e-12, "{survey}: width fell at hi = {hi}");
            previous = width;
        }
    }
}

#[test]
// Purpose
// -------
// Refitting the same data and specification reproduces the log-likelihood
// and the estimate exactly.
fn refits_are_deterministic() {
    let data = multi_line_survey(3);
    let spec = ModelSpec::new(LikelihoodFamily::HazardRate, SeriesKind::Cosine, 1).expect("spec");

    let first = fit_detection_function(&data, &spec, &strip(), &quiet()).expect("fit");
    let second = fit_detection_function(&data, &spec, &strip(), &quiet()).expect("fit");

    assert_eq!(first.loglik(), second.loglik());
    assert_eq!(first.theta(), second.theta());
    assert_eq!(first.convergence(), second.convergence());
}

#[test]
// Purpose
// -------
// Detections outside the strip are excluded from n, group-size totals and
// the likelihood.
//
// Given
// -----
// - Scenario A data with w = [10, 100].
//
// Expect
// ------
// - Every fitted distance lies in [10, 100] and the counts match a manual
//   filter of the raw table.
fn truncation_filters_counts_and_likelihood() {
    // Arrange
    let data = single_line_survey();
    let w = Truncation::new(10.0, 100.0).expect("valid strip");
    let inside: Vec<&DetectionRecord> =
        data.detections().iter().filter(|d| (10.0..=100.0).contains(&d.distance)).collect();

    // Act
    let model = fit_detection_function(
        &data,
        &ModelSpec::key_only(LikelihoodFamily::HalfNormal),
        &w,
        &quiet(),
    )
    .expect("fit");
    let est = estimate_abundance(&model, &data, 1.0e4, &AbundanceOptions::default())
        .expect("estimate");

    // Assert
    assert_eq!(model.n(), inside.len());
    assert!(model.distances().iter().all(|&x| (10.0..=100.0).contains(&x)));
    assert_eq!(est.n_detections, inside.len());
    let individuals: u64 = inside.iter().map(|d| u64::from(d.group_size)).sum();
    assert_eq!(est.individuals, individuals);
}

#[test]
// Purpose
// -------
// When every resample is forced to fail, the bootstrap reports "no
// interval" rather than a zero-width interval.
//
// Given
// -----
// - Fit options capped at one Nelder–Mead iteration, 12 resamples.
//
// Expect
// ------
// - Status `NoInterval`, `interval == None`, 12 failures, and
//   `require_interval` escalates to `NoSuccessfulResamples`.
fn bootstrap_with_all_failures_reports_no_interval() {
    // Arrange
    let data = multi_line_survey(4);
    let options = BootstrapOptions::new(12, 0.95, 11).expect("bootstrap options");

    // Act
    let summary = run_bootstrap(
        &data,
        &ModelSpec::key_only(LikelihoodFamily::HalfNormal),
        &strip(),
        1.0e5,
        &crippled_fit(),
        &AbundanceOptions::default(),
        &options,
    )
    .expect("bootstrap runs");

    // Assert
    assert_eq!(summary.status, BootstrapStatus::NoInterval);
    assert_eq!(summary.interval, None);
    assert_eq!((summary.succeeded, summary.failed), (0, 12));
    assert!(matches!(
        summary.require_interval(),
        Err(AbundanceError::NoSuccessfulResamples { requested: 12, failed: 12 })
    ));
    assert!(summary.narrative().contains("no interval"));
}

#[test]
// Purpose
// -------
// A healthy bootstrap brackets a positive abundance and is attached to the
// estimate.
fn bootstrap_interval_attached_to_estimate() {
    let data = multi_line_survey(5);
    let options = BootstrapOptions::new(30, 0.9, 2024).expect("bootstrap options");

    let (model, est) = estimate_with_bootstrap(
        &data,
        &ModelSpec::key_only(LikelihoodFamily::HalfNormal),
        &strip(),
        1.0e5,
        &quiet(),
        &AbundanceOptions::default(),
        &options,
    )
    .expect("estimate with bootstrap");

    assert!(model.is_usable());
    let boot = est.bootstrap.as_ref().expect("bootstrap summary attached");
    assert_eq!(boot.completed(), 30);
    let (lo, hi) = boot.require_interval().expect("interval");
    assert!(0.0 < lo && lo <= hi);
    assert!(est.narrative().contains("CI"));
}

#[test]
// Purpose
// -------
// A persisted model recomputes the same ESW and abundance without refitting.
fn serialized_model_recomputes_estimates() {
    // Arrange
    let data = single_line_survey();
    let model = fit_half_normal(&data);
    let before = estimate_abundance(&model, &data, 1.0e4, &AbundanceOptions::default())
        .expect("estimate");

    // Act
    let json = serde_json::to_string(&model).expect("serialize model");
    let restored: DetectionFunctionModel = serde_json::from_str(&json).expect("deserialize model");
    let after = estimate_abundance(&restored, &data, 1.0e4, &AbundanceOptions::default())
        .expect("estimate from restored model");

    // Assert
    assert_eq!(restored.spec(), model.spec());
    assert_eq!(restored.convergence(), model.convergence());
    assert_relative_eq!(after.abundance, before.abundance, max_relative = 1e-12);
    assert_relative_eq!(after.average_width, before.average_width, max_relative = 1e-12);
}
