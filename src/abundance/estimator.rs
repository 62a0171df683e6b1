//! Horvitz–Thompson abundance and density from a fitted detection function.
//!
//! Purpose
//! -------
//! Scale detections up to the study area: each in-strip detection of group
//! size `s_i` with detection probability `p_i` stands for `s_i / p_i`
//! individuals in the sampled area, and the sampled area is a known fraction
//! of the study area.
//!
//! Key behaviors
//! -------------
//! - Sampled area: `2 (hi - lo) Σ L` for lines, `K π (hi² - lo²)` for `K`
//!   points.
//! - [`Estimator::PerObservation`]: `N = Σ s_i / p_i · A / a`.
//! - [`Estimator::RatioOfSums`]: `N = Σ s_i / p̄ · A / a`, `p̄` the mean of
//!   the `p_i`.
//! - [`EstimateMode::PerSite`] additionally reports abundance, density,
//!   detection probability and effective area for every site, including
//!   sites without detections; the site totals reproduce the population
//!   estimate.
//!
//! Invariants & assumptions
//! ------------------------
//! - The model and the data share a survey type; detections outside the
//!   model's strip are ignored.
//! - With covariates, `p_i` comes from each detection's own covariate row
//!   (detection value first, site value second).
//! - No detections in the strip gives `N = 0`, not an error.
use crate::{
    abundance::{
        bootstrap::{BootstrapStatus, BootstrapSummary},
        effective_width::{EffectiveWidth, detection_probability},
        errors::{AbundanceError, AbundanceResult},
    },
    detection::{
        core::data::{Covariates, SurveyData, SurveyType},
        errors::DetectionError,
        models::{ConvergenceCode, DetectionFunctionModel, FitStatus},
    },
};
use ndarray::Array1;
use serde::{Deserialize, Serialize};
use std::f64::consts::PI;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum EstimateMode {
    #[default]
    Population,
    PerSite,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Estimator {
    /// Horvitz–Thompson: each detection weighted by its own `1 / p_i`.
    #[default]
    PerObservation,
    /// Total individuals divided by the mean detection probability.
    RatioOfSums,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct AbundanceOptions {
    pub mode: EstimateMode,
    pub estimator: Estimator,
}

/// Survey effort.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum Effort {
    TotalLength(f64),
    Points(usize),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SiteEstimate {
    pub site_id: String,
    pub n_detections: usize,
    pub individuals: u64,
    pub detection_probability: f64,
    /// ESW (line) or EDR (point) at this site.
    pub effective_width: f64,
    pub sampled_area: f64,
    pub effective_area: f64,
    pub abundance: f64,
    /// Individuals per unit sampled area.
    pub density: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AbundanceEstimate {
    pub abundance: f64,
    pub density: f64,
    pub n_detections: usize,
    pub individuals: u64,
    pub mean_group_size: f64,
    pub effort: Effort,
    pub n_sites: usize,
    pub area: f64,
    pub sampled_area: f64,
    /// Aligned with in-strip detections, in detection-table order.
    pub detection_probabilities: Array1<f64>,
    /// Scalar without covariates; per detection (population mode) or per
    /// site (per-site mode) otherwise.
    pub effective_width: EffectiveWidth,
    pub average_width: f64,
    pub sites: Option<Vec<SiteEstimate>>,
    pub bootstrap: Option<BootstrapSummary>,
    pub convergence: ConvergenceCode,
    pub model_status: FitStatus,
}

impl AbundanceEstimate {
    pub fn status(&self) -> FitStatus {
        let boot = self.bootstrap.as_ref().map(|b| b.status);
        match (self.model_status, boot) {
            (FitStatus::Failure, _) => FitStatus::Failure,
            (FitStatus::Partial, _) => FitStatus::Partial,
            (FitStatus::Success, None | Some(BootstrapStatus::Complete)) => FitStatus::Success,
            (FitStatus::Success, Some(_)) => FitStatus::Partial,
        }
    }

    /// Short narrative of the estimate and its reliability.
    pub fn narrative(&self) -> String {
        let mut text = format!(
            "N = {:.3} (D = {:.6}) from {} detections; model {}",
            self.abundance, self.density, self.n_detections, self.convergence
        );
        if let Some(boot) = &self.bootstrap {
            text.push_str("; ");
            text.push_str(&boot.narrative());
        }
        text
    }
}

/// Sampled area of one site.
pub fn site_sampled_area(survey: SurveyType, length: Option<f64>, lo: f64, hi: f64) -> f64 {
    match survey {
        SurveyType::Line => 2.0 * (hi - lo) * length.unwrap_or(0.0),
        SurveyType::Point => PI * (hi * hi - lo * lo),
    }
}

struct DetectionWeights {
    /// Index into the data's detection table.
    index: Vec<usize>,
    p: Array1<f64>,
    widths: Array1<f64>,
}

/// `p_i` and ESW/EDR for each in-strip detection of `data`.
fn detection_weights(
    model: &DetectionFunctionModel, data: &SurveyData,
) -> AbundanceResult<DetectionWeights> {
    let w = model.truncation();
    let grid = model.grid()?;
    let baseline = (!model.has_covariates()).then(|| model.baseline_curve().effective_width(&grid));

    let mut index = Vec::new();
    let mut widths = Vec::new();
    for (i, det) in data.detections().iter().enumerate() {
        if !w.contains(det.distance) {
            continue;
        }
        let width = match baseline {
            Some(esw) => esw,
            None => {
                let mut row = Covariates::new();
                for name in model.covariate_names() {
                    let value = data.covariate_value(det, name).ok_or_else(|| {
                        DetectionError::MissingCovariate { index: i, name: name.clone() }
                    })?;
                    row.insert(name.clone(), value);
                }
                match model.curve_for_covariates(&row) {
                    Some(curve) => curve.effective_width(&grid),
                    None => f64::NAN,
                }
            }
        };
        index.push(i);
        widths.push(width);
    }
    let widths = Array1::from(widths);
    let p = widths.mapv(|width| detection_probability(width, model.survey(), &w));
    Ok(DetectionWeights { index, p, widths })
}

/// estimate_abundance — abundance and density over a study area.
///
/// Errors
/// ------
/// - `InvalidArea` for a non-finite or non-positive `area`.
/// - `SurveyTypeMismatch` when the model was fitted to the other design.
/// - `MissingCovariate` when a detection lacks a model covariate.
/// - `MissingSiteCovariate` (per-site mode) when a site without detections
///   lacks a model covariate.
pub fn estimate_abundance(
    model: &DetectionFunctionModel, data: &SurveyData, area: f64, options: &AbundanceOptions,
) -> AbundanceResult<AbundanceEstimate> {
    if !area.is_finite() || area <= 0.0 {
        return Err(AbundanceError::InvalidArea { value: area });
    }
    if model.survey() != data.survey() {
        return Err(DetectionError::SurveyTypeMismatch {
            model: model.survey().name(),
            data: data.survey().name(),
        }
        .into());
    }

    let w = model.truncation();
    let (lo, hi) = (w.lo(), w.hi());
    let weights = detection_weights(model, data)?;
    let dets = data.detections();
    let sizes: Vec<f64> = weights.index.iter().map(|&i| dets[i].group_size as f64).collect();
    let individuals: u64 = weights.index.iter().map(|&i| u64::from(dets[i].group_size)).sum();
    let n_detections = weights.index.len();
    let p_bar = weights.p.mean().unwrap_or(f64::NAN);

    // Expected individuals in the sampled area represented by detection i.
    let expanded = |k: usize| -> f64 {
        match options.estimator {
            Estimator::PerObservation => sizes[k] / weights.p[k],
            Estimator::RatioOfSums => sizes[k] / p_bar,
        }
    };

    let sampled_area: f64 = data
        .sites()
        .iter()
        .map(|s| site_sampled_area(data.survey(), s.length, lo, hi))
        .sum();
    let in_area: f64 = (0..n_detections).map(expanded).sum();
    let abundance = if n_detections == 0 { 0.0 } else { in_area * area / sampled_area };

    let grid = model.grid()?;
    let baseline_width = model.baseline_curve().effective_width(&grid);

    let (sites, effective_width) = match options.mode {
        EstimateMode::Population => {
            let ew = if model.has_covariates() {
                EffectiveWidth::PerRow(weights.widths.clone())
            } else {
                EffectiveWidth::Scalar(baseline_width)
            };
            (None, ew)
        }
        EstimateMode::PerSite => {
            let mut per_site: Vec<Vec<usize>> = vec![Vec::new(); data.n_sites()];
            for (k, &i) in weights.index.iter().enumerate() {
                if let Some(pos) = data.site_position(&dets[i].site_id) {
                    per_site[pos].push(k);
                }
            }
            let mut out = Vec::with_capacity(data.n_sites());
            for (site, members) in data.sites().iter().zip(&per_site) {
                let width = if !model.has_covariates() {
                    baseline_width
                } else if let Some(curve) = model.curve_for_covariates(&site.covariates) {
                    curve.effective_width(&grid)
                } else if !members.is_empty() {
                    let mean_p =
                        members.iter().map(|&k| weights.p[k]).sum::<f64>() / members.len() as f64;
                    match data.survey() {
                        SurveyType::Line => mean_p * w.width(),
                        SurveyType::Point => (mean_p * w.squared_width()).sqrt(),
                    }
                } else {
                    let name = model
                        .covariate_names()
                        .iter()
                        .find(|n| !site.covariates.contains_key(*n))
                        .cloned()
                        .unwrap_or_default();
                    return Err(
                        DetectionError::MissingSiteCovariate { site_id: site.id.clone(), name }.into()
                    );
                };
                let p_site = detection_probability(width, data.survey(), &w);
                let site_area = site_sampled_area(data.survey(), site.length, lo, hi);
                let site_abundance = members.iter().fold(0.0, |acc, &k| acc + expanded(k));
                out.push(SiteEstimate {
                    site_id: site.id.clone(),
                    n_detections: members.len(),
                    individuals: members.iter().map(|&k| u64::from(dets[weights.index[k]].group_size)).sum(),
                    detection_probability: p_site,
                    effective_width: width,
                    sampled_area: site_area,
                    effective_area: p_site * site_area,
                    abundance: site_abundance,
                    density: site_abundance / site_area,
                });
            }
            let ew = if model.has_covariates() {
                EffectiveWidth::PerRow(out.iter().map(|s| s.effective_width).collect())
            } else {
                EffectiveWidth::Scalar(baseline_width)
            };
            (Some(out), ew)
        }
    };

    let average_width = match &effective_width {
        EffectiveWidth::PerRow(ws) if ws.is_empty() => baseline_width,
        other => other.mean(),
    };
    let effort = match data.survey() {
        SurveyType::Line => Effort::TotalLength(data.total_length().unwrap_or(0.0)),
        SurveyType::Point => Effort::Points(data.n_sites()),
    };

    Ok(AbundanceEstimate {
        abundance,
        density: abundance / area,
        n_detections,
        individuals,
        mean_group_size: if n_detections == 0 { 0.0 } else { individuals as f64 / n_detections as f64 },
        effort,
        n_sites: data.n_sites(),
        area,
        sampled_area,
        detection_probabilities: weights.p,
        effective_width,
        average_width,
        sites,
        bootstrap: None,
        convergence: model.convergence(),
        model_status: model.status(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::detection::core::{
        data::{DetectionRecord, Site},
        likelihoods::LikelihoodFamily,
        options::FitOptions,
        params::ModelSpec,
        truncation::Truncation,
    };
    use crate::detection::models::fit_detection_function;
    use approx::assert_relative_eq;

    // -------------------------------------------------------------------------
    // Scope
    // -----
    // - Population estimate equals the textbook line / point formulas without
    //   covariates.
    // - Per-site totals reproduce the population estimate; empty sites are
    //   reported with zero abundance.
    // - Input errors: area, survey mismatch, missing site covariates.
    // -------------------------------------------------------------------------

    fn line_data() -> SurveyData {
        let mut dets = Vec::new();
        for i in 0..30 {
            let site = if i % 3 == 0 { "B" } else { "A" };
            dets.push(DetectionRecord::new((i as f64 * 0.61) % 14.0, 1 + (i % 3) as u32, site));
        }
        let sites = vec![Site::line("A", 400.0), Site::line("B", 250.0), Site::line("C", 100.0)];
        SurveyData::new(dets, sites, SurveyType::Line).expect("valid survey")
    }

    fn fit(data: &SurveyData, hi: f64) -> DetectionFunctionModel {
        let w = Truncation::new(0.0, hi).expect("valid strip");
        fit_detection_function(
            data,
            &ModelSpec::key_only(LikelihoodFamily::HalfNormal),
            &w,
            &FitOptions::default().with_quiet(true),
        )
        .expect("fit")
    }

    #[test]
    // Purpose
    // -------
    // Without covariates, HT reduces to N = Σs · A / (2 ESW L).
    //
    // Given
    // -----
    // - 30 detections on three lines totalling 750, area 1e6.
    //
    // Expect
    // ------
    // - abundance = individuals · A / (2 · ESW · 750) to 1e-9.
    fn line_population_estimate_matches_textbook_formula() {
        // Arrange
        let data = line_data();
        let model = fit(&data, 15.0);
        let area = 1.0e6;

        // Act
        let est = estimate_abundance(&model, &data, area, &AbundanceOptions::default())
            .expect("estimate");

        // Assert
        let EffectiveWidth::Scalar(esw) = est.effective_width else { panic!("scalar width") };
        let expected = est.individuals as f64 * area / (2.0 * esw * 750.0);
        assert_relative_eq!(est.abundance, expected, max_relative = 1e-9);
        assert_relative_eq!(est.density, expected / area, max_relative = 1e-9);
        assert_eq!(est.effort, Effort::TotalLength(750.0));
        assert_eq!(est.n_detections, 30);
    }

    #[test]
    // Purpose
    // -------
    // Per-site abundances add up to the population estimate and the empty
    // site appears with zero abundance.
    fn per_site_totals_reproduce_population_estimate() {
        let data = line_data();
        let model = fit(&data, 15.0);
        let area = 5.0e5;
        let pop = estimate_abundance(&model, &data, area, &AbundanceOptions::default())
            .expect("population");
        let options = AbundanceOptions { mode: EstimateMode::PerSite, ..AbundanceOptions::default() };
        let per_site = estimate_abundance(&model, &data, area, &options).expect("per site");
        let sites = per_site.sites.as_ref().expect("site table");

        let total: f64 = sites.iter().map(|s| s.abundance).sum();
        let sampled: f64 = sites.iter().map(|s| s.sampled_area).sum();
        assert_relative_eq!(total / sampled * area, pop.abundance, max_relative = 1e-12);
        assert_relative_eq!(per_site.abundance, pop.abundance, max_relative = 1e-12);
        let empty = sites.iter().find(|s| s.site_id == "C").expect("site C");
        assert_eq!((empty.n_detections, empty.abundance), (0, 0.0));
        assert!(empty.abundance.is_sign_positive() && empty.density.is_sign_positive());
        assert_relative_eq!(empty.sampled_area, 2.0 * 15.0 * 100.0);
    }

    #[test]
    // Purpose
    // -------
    // Point transects use K π w² as sampled area: N = Σs · A / (π EDR² K).
    fn point_population_estimate_matches_textbook_formula() {
        let dets = (0..25)
            .map(|i| DetectionRecord::new((i as f64 * 1.3) % 20.0, 1, if i % 2 == 0 { "P1" } else { "P2" }))
            .collect();
        let sites = vec![Site::point("P1"), Site::point("P2"), Site::point("P3"), Site::point("P4")];
        let data = SurveyData::new(dets, sites, SurveyType::Point).expect("valid survey");
        let model = fit(&data, 25.0);
        let est = estimate_abundance(&model, &data, 1.0e4, &AbundanceOptions::default())
            .expect("estimate");
        let EffectiveWidth::Scalar(edr) = est.effective_width else { panic!("scalar width") };
        let expected = 25.0 * 1.0e4 / (PI * edr * edr * 4.0);
        assert_relative_eq!(est.abundance, expected, max_relative = 1e-9);
        assert_eq!(est.effort, Effort::Points(4));
    }

    #[test]
    fn ratio_of_sums_equals_per_observation_without_covariates() {
        let data = line_data();
        let model = fit(&data, 15.0);
        let ht = estimate_abundance(&model, &data, 1.0e6, &AbundanceOptions::default())
            .expect("ht");
        let ratio = estimate_abundance(
            &model,
            &data,
            1.0e6,
            &AbundanceOptions { estimator: Estimator::RatioOfSums, ..AbundanceOptions::default() },
        )
        .expect("ratio");
        assert_relative_eq!(ht.abundance, ratio.abundance, max_relative = 1e-12);
    }

    #[test]
    fn invalid_inputs_are_rejected() {
        let data = line_data();
        let model = fit(&data, 15.0);
        assert_eq!(
            estimate_abundance(&model, &data, 0.0, &AbundanceOptions::default()),
            Err(AbundanceError::InvalidArea { value: 0.0 })
        );
        let points = SurveyData::new(vec![], vec![Site::point("P")], SurveyType::Point)
            .expect("valid survey");
        assert!(matches!(
            estimate_abundance(&model, &points, 1.0, &AbundanceOptions::default()),
            Err(AbundanceError::Detection(DetectionError::SurveyTypeMismatch { .. }))
        ));
    }

    #[test]
    // Purpose
    // -------
    // A site with no detections and no value for a model covariate cannot
    // be given a detection probability.
    fn per_site_mode_requires_site_covariates_for_empty_sites() {
        let dets = (0..20)
            .map(|i| DetectionRecord::new((i as f64 * 0.7) % 10.0, 1, "A").with_covariate("obs", (i % 2) as f64))
            .collect();
        let sites = vec![Site::line("A", 100.0), Site::line("Z", 50.0)];
        let data = SurveyData::new(dets, sites, SurveyType::Line).expect("valid survey");
        let w = Truncation::new(0.0, 12.0).expect("valid strip");
        let options = FitOptions::default().with_quiet(true).with_covariates(["obs"]).expect("names");
        let model = fit_detection_function(
            &data,
            &ModelSpec::key_only(LikelihoodFamily::HalfNormal),
            &w,
            &options,
        )
        .expect("fit");
        let per_site = AbundanceOptions { mode: EstimateMode::PerSite, ..AbundanceOptions::default() };
        assert_eq!(
            estimate_abundance(&model, &data, 1.0e4, &per_site),
            Err(AbundanceError::Detection(DetectionError::MissingSiteCovariate {
                site_id: "Z".into(),
                name: "obs".into()
            }))
        );
        assert!(estimate_abundance(&model, &data, 1.0e4, &AbundanceOptions::default()).is_ok());
    }

    #[test]
    // Purpose
    // -------
    // With a scale covariate, per-site HT totals still add up, and an empty
    // site takes its detection probability from its own covariate row.
    //
    // Given
    // -----
    // - Two habitats (hab = 0 narrow, hab = 1 wide) with 30 detections each.
    // - Site "E" with hab = 0.5 and no detections.
    //
    // Expect
    // ------
    // - N = Σ s_i/p_i · A / Σ sampled area, in both modes.
    // - Site "E" has abundance +0 and p = ESW(hab = 0.5) / w.
    fn covariate_per_site_estimate_uses_site_rows() {
        // Arrange
        let mut dets = Vec::new();
        for i in 0..30 {
            dets.push(DetectionRecord::new((i as f64 * 0.61) % 12.0, 1, "A"));
            dets.push(DetectionRecord::new((i as f64 * 0.83) % 25.0, 1, "B"));
        }
        let sites = vec![
            Site::line("A", 300.0).with_covariate("hab", 0.0),
            Site::line("B", 300.0).with_covariate("hab", 1.0),
            Site::line("E", 200.0).with_covariate("hab", 0.5),
        ];
        let data = SurveyData::new(dets, sites, SurveyType::Line).expect("valid survey");
        let w = Truncation::new(0.0, 30.0).expect("valid strip");
        let options = FitOptions::default().with_quiet(true).with_covariates(["hab"]).expect("names");
        let model = fit_detection_function(
            &data,
            &ModelSpec::key_only(LikelihoodFamily::HalfNormal),
            &w,
            &options,
        )
        .expect("fit");
        let area = 1.0e6;

        // Act
        let pop = estimate_abundance(&model, &data, area, &AbundanceOptions::default())
            .expect("population");
        let per_site = estimate_abundance(
            &model,
            &data,
            area,
            &AbundanceOptions { mode: EstimateMode::PerSite, ..AbundanceOptions::default() },
        )
        .expect("per site");

        // Assert
        let sampled = 2.0 * 30.0 * 800.0;
        let ht: f64 = pop.detection_probabilities.iter().map(|p| 1.0 / p).sum();
        assert_relative_eq!(pop.abundance, ht * area / sampled, max_relative = 1e-12);
        assert_relative_eq!(per_site.abundance, pop.abundance, max_relative = 1e-12);

        let sites = per_site.sites.as_ref().expect("site table");
        let total: f64 = sites.iter().map(|s| s.abundance).sum();
        assert_relative_eq!(total * area / sampled, pop.abundance, max_relative = 1e-12);

        let empty = sites.iter().find(|s| s.site_id == "E").expect("site E");
        assert_eq!(empty.n_detections, 0);
        assert_eq!(empty.abundance, 0.0);
        assert!(empty.abundance.is_sign_positive());
        let row: Covariates = [("hab".to_string(), 0.5)].into_iter().collect();
        let esw = model
            .curve_for_covariates(&row)
            .expect("hab present")
            .effective_width(&model.grid().expect("grid"));
        assert_relative_eq!(empty.detection_probability, esw / 30.0, max_relative = 1e-12);
        assert_relative_eq!(empty.effective_width, esw, max_relative = 1e-12);
    }
}
