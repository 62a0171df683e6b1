//! abundance — effective width, abundance estimation, model selection and
//! the site bootstrap.
//!
//! Purpose
//! -------
//! Turn fitted detection functions into population or per-site abundance and
//! density estimates, choose among candidate detection functions by an
//! information criterion, and attach percentile bootstrap intervals.
//!
//! Key behaviors
//! -------------
//! - [`effective_width`] derives ESW (lines) or EDR (points) from a model.
//! - [`estimator`] applies the Horvitz–Thompson expansion over the sampled
//!   area, for the whole population or per site.
//! - [`selection`] sweeps a family × series × order grid in parallel and
//!   ranks the candidates.
//! - [`bootstrap`] resamples sites with replacement, refits and recomputes
//!   abundance on independent ChaCha streams.
//!
//! Invariants & assumptions
//! ------------------------
//! - Models come from [`crate::detection`] and are never mutated here.
//! - Parallel work runs on a dedicated rayon pool; results never depend on
//!   the thread count.
//! - Per-fit and per-resample failures are recorded in the outputs rather
//!   than returned as errors.
//!
//! Testing notes
//! -------------
//! - Unit tests live next to each submodule; end-to-end scenarios are under
//!   `tests/`.
pub mod bootstrap;
pub mod effective_width;
pub mod errors;
pub mod estimator;
pub mod selection;

pub use self::bootstrap::{
    BootstrapOptions, BootstrapStatus, BootstrapSummary, estimate_with_bootstrap, run_bootstrap,
};
pub use self::effective_width::{
    EffectiveWidth, detection_probability, effective_width, effective_width_for_rows,
};
pub use self::errors::{AbundanceError, AbundanceResult};
pub use self::estimator::{
    AbundanceEstimate, AbundanceOptions, Effort, EstimateMode, Estimator, SiteEstimate,
    estimate_abundance,
};
pub use self::selection::{
    CandidateGrid, CandidateResult, Criterion, SelectionOptions, SelectionResult, SweepMode,
    key_only_grid, select_model,
};

pub mod prelude {
    pub use super::bootstrap::{BootstrapOptions, BootstrapStatus, run_bootstrap};
    pub use super::effective_width::{EffectiveWidth, effective_width};
    pub use super::errors::{AbundanceError, AbundanceResult};
    pub use super::estimator::{
        AbundanceEstimate, AbundanceOptions, EstimateMode, Estimator, estimate_abundance,
    };
    pub use super::selection::{
        CandidateGrid, Criterion, SelectionOptions, SweepMode, select_model,
    };
}
