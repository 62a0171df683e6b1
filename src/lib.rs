//! distance_sampling — detection functions and abundance estimation for line
//! and point transect surveys.
//!
//! Purpose
//! -------
//! Estimate wildlife abundance and density from distance sampling data:
//! fit parametric detection functions by maximum likelihood, derive the
//! effective strip width (lines) or effective detection radius (points),
//! expand counts over the study area, select among candidate models and
//! bootstrap over sites for confidence intervals.
//!
//! Key behaviors
//! -------------
//! - [`detection`] validates survey data and fits half-normal, hazard-rate,
//!   uniform, negative-exponential and gamma keys, optionally with cosine,
//!   Hermite or simple-polynomial adjustments and scale covariates.
//! - [`abundance`] computes ESW/EDR, Horvitz–Thompson abundance, model
//!   selection by AIC/AICc/BIC and percentile bootstrap intervals.
//! - [`optimization`] wraps argmin (L-BFGS, Nelder–Mead) behind a
//!   log-likelihood trait; [`inference`] turns the observed information into
//!   a covariance matrix.
//! - [`utils`] holds the shared thread-pool, cancellation and quantile
//!   helpers.
//!
//! Invariants & assumptions
//! ------------------------
//! - Structural input problems are returned as errors; optimizer trouble,
//!   invalid scales and resample failures are recorded on the results.
//! - Fitted models are immutable and serializable; derived quantities are
//!   recomputed deterministically from them.
//!
//! Conventions
//! -----------
//! - Logging goes through `tracing`; the crate never installs a subscriber.
//! - Each module exposes a `prelude` with its everyday types.
//!
//! Testing notes
//! -------------
//! - Unit tests sit beside the code; survey-level scenarios live in
//!   `tests/integration_distance_pipeline.rs`.

pub mod abundance;
pub mod detection;
pub mod inference;
pub mod optimization;
pub mod utils;

pub mod prelude {
    pub use crate::abundance::prelude::*;
    pub use crate::detection::prelude::*;
}
