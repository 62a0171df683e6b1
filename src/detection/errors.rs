//! Errors for the detection-function layer (survey data, truncation, model
//! specification and fit options).
//!
//! Every variant here is a structural input problem and aborts the call that
//! raised it. Numerical trouble during a fit (non-convergence, boundary
//! solutions, singular information, invalid scale) is never an error; it is
//! recorded on the fitted model through its convergence code.
//!
//! ## Conventions
//! - **Indices are 0-based** and refer to the slice passed by the caller.
//! - Site identifiers are echoed back verbatim.

/// Result alias for detection-layer operations.
pub type DetectionResult<T> = Result<T, DetectionError>;

#[derive(Debug, Clone, PartialEq)]
pub enum DetectionError {
    // ---- Detection records ----
    /// Distance is NaN or ±∞.
    NonFiniteDistance { index: usize, value: f64 },

    /// Distance is negative.
    NegativeDistance { index: usize, value: f64 },

    /// Group size must be at least one.
    InvalidGroupSize { index: usize },

    /// Detection references a site that is not in the site table.
    UnknownSite { index: usize, site_id: String },

    /// Covariate value is NaN or ±∞.
    NonFiniteCovariate { name: String, value: f64 },

    // ---- Site table ----
    /// No sites were supplied.
    EmptySites,

    /// Two sites share an identifier.
    DuplicateSite { site_id: String },

    /// Line-transect site without a length.
    MissingTransectLength { site_id: String },

    /// Transect length must be finite and > 0.
    InvalidTransectLength { site_id: String, value: f64 },

    // ---- Truncation ----
    /// Truncation bounds must satisfy 0 ≤ lo < hi < ∞.
    InvalidTruncation { lo: f64, hi: f64, reason: &'static str },

    /// No detection falls inside [lo, hi].
    NoDetectionsInStrip { lo: f64, hi: f64 },

    // ---- Model specification ----
    /// Unknown likelihood family name.
    UnknownFamily { name: String },

    /// Unknown series name.
    UnknownSeries { name: String },

    /// Expansion order above the supported maximum.
    InvalidExpansions { requested: usize, max: usize },

    /// Family does not accept series expansions.
    ExpansionsNotSupported { family: &'static str },

    // ---- Covariates ----
    /// Detection has no value for a model covariate, neither on itself nor
    /// on its site.
    MissingCovariate { index: usize, name: String },

    /// Site lacks a model covariate needed to compute its own detection
    /// probability.
    MissingSiteCovariate { site_id: String, name: String },

    /// Covariate name listed twice in the fit options.
    DuplicateCovariate { name: String },

    // ---- Fit options ----
    /// Starting vector does not match the parameter layout.
    StartLengthMismatch { expected: usize, actual: usize },

    /// Starting vector has a non-finite entry.
    NonFiniteStart { index: usize, value: f64 },

    /// Scaling distance must be finite and inside [0, hi].
    InvalidScalePoint { x_scl: f64, hi: f64 },

    /// g(x_scl) must lie in (0, 1].
    InvalidGAtScale { value: f64 },

    /// Integration grid needs an odd number of points ≥ 3.
    InvalidIntegrationPoints { points: usize },

    /// Penalty weight must be finite and ≥ 0.
    InvalidPenalty { value: f64 },

    /// Optimizer settings were rejected.
    InvalidOptimizerOptions { text: String },

    // ---- Model / data consistency ----
    /// Model was fitted for a different survey type than the data.
    SurveyTypeMismatch { model: &'static str, data: &'static str },
}

impl std::error::Error for DetectionError {}

impl std::fmt::Display for DetectionError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            // ---- Detection records ----
            DetectionError::NonFiniteDistance { index, value } => {
                write!(f, "Detection {index}: distance {value} is not finite")
            }
            DetectionError::NegativeDistance { index, value } => {
                write!(f, "Detection {index}: distance {value} is negative")
            }
            DetectionError::InvalidGroupSize { index } => {
                write!(f, "Detection {index}: group size must be at least 1")
            }
            DetectionError::UnknownSite { index, site_id } => {
                write!(f, "Detection {index}: unknown site '{site_id}'")
            }
            DetectionError::NonFiniteCovariate { name, value } => {
                write!(f, "Covariate '{name}' has non-finite value {value}")
            }

            // ---- Site table ----
            DetectionError::EmptySites => write!(f, "Site table is empty"),
            DetectionError::DuplicateSite { site_id } => {
                write!(f, "Site '{site_id}' appears more than once")
            }
            DetectionError::MissingTransectLength { site_id } => {
                write!(f, "Line-transect site '{site_id}' has no length")
            }
            DetectionError::InvalidTransectLength { site_id, value } => {
                write!(f, "Site '{site_id}': transect length {value} must be finite and > 0")
            }

            // ---- Truncation ----
            DetectionError::InvalidTruncation { lo, hi, reason } => {
                write!(f, "Invalid truncation [{lo}, {hi}]: {reason}")
            }
            DetectionError::NoDetectionsInStrip { lo, hi } => {
                write!(f, "No detections inside the truncation strip [{lo}, {hi}]")
            }

            // ---- Model specification ----
            DetectionError::UnknownFamily { name } => {
                write!(
                    f,
                    "Unknown likelihood '{name}' (expected halfnorm, hazrate, uniform, negexp or gamma)"
                )
            }
            DetectionError::UnknownSeries { name } => {
                write!(f, "Unknown series '{name}' (expected cosine, hermite or simple)")
            }
            DetectionError::InvalidExpansions { requested, max } => {
                write!(f, "Expansion order {requested} exceeds the maximum of {max}")
            }
            DetectionError::ExpansionsNotSupported { family } => {
                write!(f, "The {family} likelihood does not accept series expansions")
            }

            // ---- Covariates ----
            DetectionError::MissingCovariate { index, name } => {
                write!(f, "Detection {index}: covariate '{name}' missing on detection and site")
            }
            DetectionError::MissingSiteCovariate { site_id, name } => {
                write!(f, "Site '{site_id}': covariate '{name}' is required but missing")
            }
            DetectionError::DuplicateCovariate { name } => {
                write!(f, "Covariate '{name}' listed more than once")
            }

            // ---- Fit options ----
            DetectionError::StartLengthMismatch { expected, actual } => {
                write!(f, "Starting vector has length {actual}, expected {expected}")
            }
            DetectionError::NonFiniteStart { index, value } => {
                write!(f, "Starting value at index {index} is not finite: {value}")
            }
            DetectionError::InvalidScalePoint { x_scl, hi } => {
                write!(f, "Scaling distance {x_scl} must be finite and within [0, {hi}]")
            }
            DetectionError::InvalidGAtScale { value } => {
                write!(f, "g(x_scl) = {value} must lie in (0, 1]")
            }
            DetectionError::InvalidIntegrationPoints { points } => {
                write!(f, "Integration grid needs an odd number of points >= 3, got {points}")
            }
            DetectionError::InvalidPenalty { value } => {
                write!(f, "Penalty weight {value} must be finite and >= 0")
            }
            DetectionError::InvalidOptimizerOptions { text } => {
                write!(f, "Invalid optimizer options: {text}")
            }

            // ---- Model / data consistency ----
            DetectionError::SurveyTypeMismatch { model, data } => {
                write!(f, "Model was fitted to {model} data but {data} data were supplied")
            }
        }
    }
}
