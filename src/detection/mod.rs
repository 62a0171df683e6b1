//! detection — distance data, detection functions and their fitting.
//!
//! Purpose
//! -------
//! Provide the detection-function layer of the crate: validated line- and
//! point-transect survey data, the five parametric key families with
//! optional series expansions, and maximum-likelihood fitting that yields a
//! [`DetectionFunctionModel`]. The `abundance` layer builds on this.
//!
//! Key behaviors
//! -------------
//! - [`core`] holds data containers, key functions, expansions, quadrature
//!   and fit options.
//! - [`models`] holds the likelihood, the fitter and the fitted model.
//! - [`errors`] defines [`DetectionError`] for structural input problems.
//!
//! Conventions
//! -----------
//! - Distances are perpendicular (line) or radial (point) and share the unit
//!   of the truncation bounds.
//! - Optimization happens in unconstrained θ-space; scales use a log link.
//! - The layer logs through `tracing` and never installs a subscriber.
pub mod core;
pub mod errors;
pub mod models;

pub use self::core::{
    Covariates, DetectionCurve, DetectionRecord, FitOptions, LikelihoodFamily, MAX_EXPANSIONS,
    ModelSpec, SeriesKind, Site, SurveyData, SurveyType, Truncation,
};
pub use self::errors::{DetectionError, DetectionResult};
pub use self::models::{
    ConvergenceCode, DetectionFunctionModel, FitStatus, fit_detection_function,
};

pub mod prelude {
    pub use super::core::{
        DetectionRecord, FitOptions, LikelihoodFamily, ModelSpec, SeriesKind, Site, SurveyData,
        SurveyType, Truncation,
    };
    pub use super::errors::{DetectionError, DetectionResult};
    pub use super::models::{ConvergenceCode, DetectionFunctionModel, fit_detection_function};
}
