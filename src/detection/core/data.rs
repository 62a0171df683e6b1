//! Survey data containers for distance sampling.
//!
//! Purpose
//! -------
//! Hold the detection table and the site table of a line- or point-transect
//! survey in a validated form, so that fitting, abundance estimation and
//! bootstrap resampling can rely on consistent foreign keys and sane values.
//!
//! Key behaviors
//! -------------
//! - [`SurveyData::new`] checks every detection (finite, non-negative
//!   distance; group size ≥ 1; known site) and every site (unique id; a
//!   positive length on line transects; finite covariates).
//! - [`SurveyData::covariate_value`] resolves a named covariate for a
//!   detection, looking at the detection itself first and at its site second.
//! - [`SurveyData::resample`] builds a bootstrap replicate from site picks,
//!   relabelling repeated sites so each copy stays a distinct site.
//!
//! Invariants & assumptions
//! ------------------------
//! - Every detection's `site_id` resolves to exactly one site.
//! - Sites without detections are kept; they count in effort totals.
//! - Truncation is *not* applied here; it is a property of the analysis.
//!
//! Testing notes
//! -------------
//! - Unit tests cover each validation failure, covariate lookup order, and
//!   the relabelling behavior of `resample`.
use crate::detection::errors::{DetectionError, DetectionResult};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};

/// Named covariate values.
pub type Covariates = BTreeMap<String, f64>;

/// Survey design.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SurveyType {
    /// Perpendicular distances from a line of known length.
    Line,
    /// Radial distances from a point.
    Point,
}

impl SurveyType {
    pub fn name(&self) -> &'static str {
        match self {
            SurveyType::Line => "line",
            SurveyType::Point => "point",
        }
    }
}

impl std::fmt::Display for SurveyType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// One detected group.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DetectionRecord {
    /// Perpendicular (line) or radial (point) distance.
    pub distance: f64,
    pub group_size: u32,
    pub site_id: String,
    /// Detection-level covariates; take precedence over site covariates.
    pub covariates: Covariates,
}

impl DetectionRecord {
    pub fn new(distance: f64, group_size: u32, site_id: impl Into<String>) -> Self {
        Self { distance, group_size, site_id: site_id.into(), covariates: Covariates::new() }
    }

    pub fn with_covariate(mut self, name: impl Into<String>, value: f64) -> Self {
        self.covariates.insert(name.into(), value);
        self
    }
}

/// A transect (line designs) or point.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Site {
    pub id: String,
    /// Transect length; required and > 0 for line designs, ignored for points.
    pub length: Option<f64>,
    pub covariates: Covariates,
}

impl Site {
    pub fn line(id: impl Into<String>, length: f64) -> Self {
        Self { id: id.into(), length: Some(length), covariates: Covariates::new() }
    }

    pub fn point(id: impl Into<String>) -> Self {
        Self { id: id.into(), length: None, covariates: Covariates::new() }
    }

    pub fn with_covariate(mut self, name: impl Into<String>, value: f64) -> Self {
        self.covariates.insert(name.into(), value);
        self
    }
}

/// Validated detection and site tables for one survey.
#[derive(Debug, Clone, PartialEq)]
pub struct SurveyData {
    detections: Vec<DetectionRecord>,
    sites: Vec<Site>,
    survey: SurveyType,
    site_index: HashMap<String, usize>,
}

impl SurveyData {
    /// Validate and bundle a survey.
    ///
    /// Errors
    /// ------
    /// - `EmptySites`, `DuplicateSite`, `MissingTransectLength`,
    ///   `InvalidTransectLength` for the site table.
    /// - `NonFiniteDistance`, `NegativeDistance`, `InvalidGroupSize`,
    ///   `UnknownSite` for detections (first offender reported).
    /// - `NonFiniteCovariate` for any covariate value on either table.
    pub fn new(
        detections: Vec<DetectionRecord>, sites: Vec<Site>, survey: SurveyType,
    ) -> DetectionResult<Self> {
        if sites.is_empty() {
            return Err(DetectionError::EmptySites);
        }
        let mut site_index = HashMap::with_capacity(sites.len());
        for (pos, site) in sites.iter().enumerate() {
            if site_index.insert(site.id.clone(), pos).is_some() {
                return Err(DetectionError::DuplicateSite { site_id: site.id.clone() });
            }
            if survey == SurveyType::Line {
                match site.length {
                    None => {
                        return Err(DetectionError::MissingTransectLength {
                            site_id: site.id.clone(),
                        });
                    }
                    Some(len) if !len.is_finite() || len <= 0.0 => {
                        return Err(DetectionError::InvalidTransectLength {
                            site_id: site.id.clone(),
                            value: len,
                        });
                    }
                    Some(_) => {}
                }
            }
            check_covariates(&site.covariates)?;
        }

        for (index, det) in detections.iter().enumerate() {
            if !det.distance.is_finite() {
                return Err(DetectionError::NonFiniteDistance { index, value: det.distance });
            }
            if det.distance < 0.0 {
                return Err(DetectionError::NegativeDistance { index, value: det.distance });
            }
            if det.group_size == 0 {
                return Err(DetectionError::InvalidGroupSize { index });
            }
            if !site_index.contains_key(&det.site_id) {
                return Err(DetectionError::UnknownSite { index, site_id: det.site_id.clone() });
            }
            check_covariates(&det.covariates)?;
        }

        Ok(Self { detections, sites, survey, site_index })
    }

    pub fn detections(&self) -> &[DetectionRecord] {
        &self.detections
    }

    pub fn sites(&self) -> &[Site] {
        &self.sites
    }

    pub fn survey(&self) -> SurveyType {
        self.survey
    }

    pub fn n_sites(&self) -> usize {
        self.sites.len()
    }

    /// Position of a site in [`SurveyData::sites`].
    pub fn site_position(&self, site_id: &str) -> Option<usize> {
        self.site_index.get(site_id).copied()
    }

    pub fn site(&self, site_id: &str) -> Option<&Site> {
        self.site_position(site_id).map(|pos| &self.sites[pos])
    }

    /// Largest observed distance, `0.0` without detections.
    pub fn max_distance(&self) -> f64 {
        self.detections.iter().map(|d| d.distance).fold(0.0, f64::max)
    }

    /// Sum of transect lengths (line designs), `None` for points.
    pub fn total_length(&self) -> Option<f64> {
        match self.survey {
            SurveyType::Line => Some(self.sites.iter().filter_map(|s| s.length).sum()),
            SurveyType::Point => None,
        }
    }

    /// Value of `name` for `det`: the detection's own value if present,
    /// otherwise its site's.
    pub fn covariate_value(&self, det: &DetectionRecord, name: &str) -> Option<f64> {
        det.covariates
            .get(name)
            .copied()
            .or_else(|| self.site(&det.site_id).and_then(|s| s.covariates.get(name).copied()))
    }

    /// Bootstrap replicate built from site positions.
    ///
    /// Each pick contributes a copy of the site and all of its detections.
    /// A site picked `k > 1` times appears as `id`, `id#2`, ..., `id#k`, and
    /// its detections follow their copy, so resampled sites stay distinct.
    /// A suffix that would clash with an existing site id is skipped.
    /// Positions are assumed to be `< n_sites()`.
    pub fn resample(&self, picks: &[usize]) -> SurveyData {
        let mut by_site: Vec<Vec<&DetectionRecord>> = vec![Vec::new(); self.sites.len()];
        for det in &self.detections {
            if let Some(pos) = self.site_position(&det.site_id) {
                by_site[pos].push(det);
            }
        }

        let mut seen = vec![0usize; self.sites.len()];
        let mut sites = Vec::with_capacity(picks.len());
        let mut detections = Vec::new();
        let mut site_index = HashMap::with_capacity(picks.len());
        for &pos in picks {
            seen[pos] += 1;
            let original = &self.sites[pos];
            let id = if seen[pos] == 1 {
                original.id.clone()
            } else {
                loop {
                    let candidate = format!("{}#{}", original.id, seen[pos]);
                    if !self.site_index.contains_key(&candidate) && !site_index.contains_key(&candidate) {
                        break candidate;
                    }
                    seen[pos] += 1;
                }
            };
            site_index.insert(id.clone(), sites.len());
            for det in &by_site[pos] {
                detections.push(DetectionRecord { site_id: id.clone(), ..(*det).clone() });
            }
            sites.push(Site { id, ..original.clone() });
        }

        SurveyData { detections, sites, survey: self.survey, site_index }
    }
}

fn check_covariates(covariates: &Covariates) -> DetectionResult<()> {
    match covariates.iter().find(|(_, v)| !v.is_finite()) {
        Some((name, &value)) => Err(DetectionError::NonFiniteCovariate { name: name.clone(), value }),
        None => Ok(()),
    }
}
