//! core — survey data, key functions, expansions and quadrature.
//!
//! Purpose
//! -------
//! Collect the building blocks of a detection function: validated survey
//! tables, the truncation strip, the parametric key families, series
//! expansions, the θ layout, Simpson quadrature, fit options and the
//! [`DetectionCurve`] that ties them together at fixed parameters. The model
//! layer in `detection::models` fits these to data.
//!
//! Key behaviors
//! -------------
//! - [`SurveyData`] and [`Truncation`] validate inputs once, up front.
//! - [`LikelihoodFamily`] and [`SeriesKind`] are closed enums; every family
//!   and series is handled by exhaustive matching.
//! - [`DetectionCurve`] answers `g(x)`, the strip integral, the distance
//!   density and ESW / EDR for one covariate row.
//!
//! Invariants & assumptions
//! ------------------------
//! - Scales use a log link, shapes a softplus link; see
//!   [`LikelihoodFamily::natural_shape`].
//! - Expansion terms are evaluated at `u = x / hi`.
//!
//! Testing notes
//! -------------
//! - Each submodule carries unit tests against closed forms; fitting
//!   behavior is tested in `detection::models` and `tests/`.
pub mod curve;
pub mod data;
pub mod expansions;
pub mod integration;
pub mod likelihoods;
pub mod options;
pub mod params;
pub mod truncation;

pub use self::curve::DetectionCurve;
pub use self::data::{Covariates, DetectionRecord, Site, SurveyData, SurveyType};
pub use self::expansions::{MAX_EXPANSIONS, SeriesKind};
pub use self::integration::{DEFAULT_INTEGRATION_POINTS, SimpsonGrid};
pub use self::likelihoods::LikelihoodFamily;
pub use self::options::FitOptions;
pub use self::params::{ModelSpec, ParamLayout};
pub use self::truncation::Truncation;
