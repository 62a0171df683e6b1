//! Maximum-likelihood fitting of detection functions.
//!
//! Purpose
//! -------
//! [`fit_detection_function`] turns survey data, a model specification and a
//! truncation strip into a [`DetectionFunctionModel`].
//!
//! Key behaviors
//! -------------
//! 1. Validate options against the strip and keep only in-strip detections.
//! 2. Build the design matrix `[1, covariates…]`, looking up each covariate
//!    on the detection first and its site second.
//! 3. Start from `options.start` or a moment-based guess.
//! 4. Maximize with [`maximize`]; an optimizer error is recorded as
//!    [`ConvergenceCode::OptimizerFailure`] with `θ̂ = θ₀`.
//! 5. Classify boundary solutions, compute the covariance from the observed
//!    information and check that ESW / EDR fits inside the strip.
//!
//! Invariants & assumptions
//! ------------------------
//! - Only structural input problems are returned as `Err`; numerical trouble
//!   is a convergence code on an `Ok` model.
//! - Fits are deterministic: same inputs, same `θ̂`.
use crate::{
    detection::{
        core::{
            data::{SurveyData, SurveyType},
            integration::SimpsonGrid,
            likelihoods::LikelihoodFamily,
            options::FitOptions,
            params::{ModelSpec, ParamLayout},
            truncation::Truncation,
        },
        errors::{DetectionError, DetectionResult},
        models::{
            detection_function::{ConvergenceCode, DetectionFunctionModel},
            likelihood::{DetectionLikelihood, FitData},
        },
    },
    inference::calc_covariance,
    optimization::{
        errors::OptResult,
        loglik_optimizer::{
            LogLikelihood, Termination, Theta, maximize,
            validation::{verify_simplex_step, verify_tol_cost, verify_tol_grad},
        },
        numerical_stability::transformations::GENERAL_TOL,
    },
};
use ndarray::{Array1, Array2};
use tracing::{debug, info, warn};

/// `|θ_shape|` beyond which the shape is treated as sitting on a boundary.
pub const SHAPE_BOUNDARY: f64 = 25.0;

/// Admissible scale range relative to the strip width.
const SCALE_BOUNDS: (f64, f64) = (1e-4, 1e4);

/// fit_detection_function — fit a detection function by maximum likelihood.
///
/// Parameters
/// ----------
/// - `data`: validated survey; detections outside `truncation` are ignored.
/// - `spec`: family, series and number of expansion terms.
/// - `truncation`: analysis strip.
/// - `options`: optimizer, covariates, start, quadrature and scaling.
///
/// Errors
/// ------
/// - `NoDetectionsInStrip` when no detection falls inside the strip.
/// - `MissingCovariate` when a detection has no value for a model covariate.
/// - `StartLengthMismatch` / `NonFiniteStart` for a bad start vector.
/// - `InvalidScalePoint`, `InvalidGAtScale`, `InvalidIntegrationPoints`,
///   `InvalidPenalty`, `InvalidOptimizerOptions` for bad options.
pub fn fit_detection_function(
    data: &SurveyData, spec: &ModelSpec, truncation: &Truncation, options: &FitOptions,
) -> DetectionResult<DetectionFunctionModel> {
    validate_options(spec, truncation, options)?;
    let grid = SimpsonGrid::new(truncation.lo(), truncation.hi(), options.integration_points)?;

    let fit_data = build_fit_data(data, truncation, &options.covariates)?;
    let n = fit_data.distances.len();
    let layout = ParamLayout::new(spec, options.covariates.len());
    let theta0 = match &options.start {
        Some(start) => {
            if start.len() != layout.len() {
                return Err(DetectionError::StartLengthMismatch {
                    expected: layout.len(),
                    actual: start.len(),
                });
            }
            start.clone()
        }
        None => default_start(spec, &layout, truncation, data.survey(), &fit_data.distances),
    };

    let lik = DetectionLikelihood::new(
        *spec,
        layout,
        *truncation,
        data.survey(),
        grid.clone(),
        options.scale_point,
        options.g_at_scale,
        options.penalty,
    );

    let (theta_hat, loglik, mut convergence, mut message, iterations, solver) =
        match maximize(&lik, theta0.clone(), &fit_data, &options.mle) {
            Ok(out) => {
                let code = match out.termination {
                    Termination::Converged => ConvergenceCode::Success,
                    Termination::MaxIterations => ConvergenceCode::MaxIterations,
                    _ => ConvergenceCode::OptimizerFailure,
                };
                (out.theta_hat, out.value, code, out.status, out.iterations, Some(out.solver))
            }
            Err(err) => {
                let ll = lik.value(&theta0, &fit_data).unwrap_or(f64::NEG_INFINITY);
                (theta0, ll, ConvergenceCode::OptimizerFailure, err.to_string(), 0, None)
            }
        };

    if convergence == ConvergenceCode::Success
        && on_boundary(&layout, &theta_hat, &fit_data.design, truncation)
    {
        convergence = ConvergenceCode::BoundaryHit;
        message = format!("{message}; parameter estimate on a boundary");
    }

    let covariance = if convergence == ConvergenceCode::OptimizerFailure {
        None
    } else {
        let cost = |theta: &Theta| -> OptResult<f64> { Ok(-lik.value(theta, &fit_data)?) };
        match calc_covariance(&cost, &theta_hat) {
            Ok((_, cov)) => Some(cov),
            Err(err) => {
                debug!(model = %spec, error = %err, "covariance unavailable");
                if convergence == ConvergenceCode::Success {
                    convergence = ConvergenceCode::SingularCovariance;
                }
                None
            }
        }
    };

    let linear_predictor = fit_data.design.dot(&layout.beta(&theta_hat));
    let mut model = DetectionFunctionModel {
        spec: *spec,
        survey: data.survey(),
        truncation: *truncation,
        covariate_names: options.covariates.clone(),
        coef_names: layout.names(spec.family(), &options.covariates),
        theta: theta_hat,
        covariance,
        loglik,
        n,
        convergence,
        message,
        scale_valid: true,
        scale_point: options.scale_point,
        g_at_scale: options.g_at_scale,
        integration_points: options.integration_points,
        design: fit_data.design,
        linear_predictor,
        distances: fit_data.distances,
        iterations,
        solver,
    };
    model.scale_valid = scale_is_valid(&model, &grid);

    if model.convergence == ConvergenceCode::Success && model.scale_valid {
        info!(model = %spec, n, loglik = model.loglik, aicc = model.aicc(), "detection function fitted");
    } else if options.quiet {
        debug!(
            model = %spec, code = %model.convergence, scale_valid = model.scale_valid,
            "detection function fit not clean"
        );
    } else {
        warn!(
            model = %spec, code = %model.convergence, scale_valid = model.scale_valid,
            "detection function fit not clean"
        );
    }
    Ok(model)
}

fn validate_options(
    spec: &ModelSpec, truncation: &Truncation, options: &FitOptions,
) -> DetectionResult<()> {
    if let Some(x) = options.scale_point {
        let gamma_at_zero = spec.family() == LikelihoodFamily::Gamma && x <= 0.0;
        if !x.is_finite() || x < 0.0 || x > truncation.hi() || gamma_at_zero {
            return Err(DetectionError::InvalidScalePoint { x_scl: x, hi: truncation.hi() });
        }
    }
    if !(options.g_at_scale > 0.0 && options.g_at_scale <= 1.0) {
        return Err(DetectionError::InvalidGAtScale { value: options.g_at_scale });
    }
    if !options.penalty.is_finite() || options.penalty < 0.0 {
        return Err(DetectionError::InvalidPenalty { value: options.penalty });
    }
    for (i, name) in options.covariates.iter().enumerate() {
        if options.covariates[..i].contains(name) {
            return Err(DetectionError::DuplicateCovariate { name: name.clone() });
        }
    }
    if let Some(start) = &options.start {
        if let Some((index, &value)) = start.iter().enumerate().find(|(_, v)| !v.is_finite()) {
            return Err(DetectionError::NonFiniteStart { index, value });
        }
    }
    let mle = &options.mle;
    verify_tol_grad(mle.tols.tol_grad)
        .and_then(|_| verify_tol_cost(mle.tols.tol_cost))
        .and_then(|_| verify_simplex_step(mle.simplex_step))
        .map_err(|e| DetectionError::InvalidOptimizerOptions { text: e.to_string() })?;
    if mle.tols.max_iter == Some(0) || mle.lbfgs_mem == Some(0) {
        return Err(DetectionError::InvalidOptimizerOptions {
            text: "max_iter and lbfgs_mem must be positive".to_string(),
        });
    }
    Ok(())
}

/// In-strip distances and their design matrix, in detection-table order.
pub fn build_fit_data(
    data: &SurveyData, truncation: &Truncation, covariates: &[String],
) -> DetectionResult<FitData> {
    let kept: Vec<usize> = data
        .detections()
        .iter()
        .enumerate()
        .filter(|(_, d)| truncation.contains(d.distance))
        .map(|(i, _)| i)
        .collect();
    if kept.is_empty() {
        return Err(DetectionError::NoDetectionsInStrip { lo: truncation.lo(), hi: truncation.hi() });
    }

    let mut design = Array2::<f64>::zeros((kept.len(), 1 + covariates.len()));
    let mut distances = Array1::<f64>::zeros(kept.len());
    for (row, &index) in kept.iter().enumerate() {
        let det = &data.detections()[index];
        distances[row] = det.distance;
        design[[row, 0]] = 1.0;
        for (j, name) in covariates.iter().enumerate() {
            design[[row, 1 + j]] = data
                .covariate_value(det, name)
                .ok_or_else(|| DetectionError::MissingCovariate { index, name: name.clone() })?;
        }
    }
    Ok(FitData { distances, design })
}

fn default_start(
    spec: &ModelSpec, layout: &ParamLayout, truncation: &Truncation, survey: SurveyType,
    distances: &Array1<f64>,
) -> Theta {
    let family = spec.family();
    let n = distances.len() as f64;
    let mean = distances.sum() / n;
    let mean_sq = distances.iter().map(|x| x * x).sum::<f64>() / n;
    let rms = match survey {
        SurveyType::Line => mean_sq.sqrt(),
        SurveyType::Point => (mean_sq / 2.0).sqrt(),
    };
    let raw = match family {
        LikelihoodFamily::Uniform => 0.8 * truncation.hi(),
        LikelihoodFamily::Gamma => mean / 2.0,
        _ => rms,
    };
    let sigma0 = raw.clamp(truncation.width() / 100.0, 2.0 * truncation.hi());

    let mut theta = Theta::zeros(layout.len());
    theta[0] = sigma0.ln();
    if let (Some(i), Some(shape)) = (layout.shape_index(), family.default_shape()) {
        theta[i] = family.shape_to_theta(shape);
    }
    theta
}

fn on_boundary(
    layout: &ParamLayout, theta: &Theta, design: &Array2<f64>, truncation: &Truncation,
) -> bool {
    if let Some(i) = layout.shape_index() {
        if theta[i].abs() > SHAPE_BOUNDARY {
            return true;
        }
    }
    let (lo, hi) = (SCALE_BOUNDS.0 * truncation.width(), SCALE_BOUNDS.1 * truncation.width());
    design.dot(&layout.beta(theta)).iter().any(|&eta| {
        let sigma = eta.exp();
        !(sigma >= lo && sigma <= hi)
    })
}

/// ESW ≤ hi - lo (line) or EDR ≤ √(hi² - lo²) (point), per fitted row.
fn scale_is_valid(model: &DetectionFunctionModel, grid: &SimpsonGrid) -> bool {
    let w = model.truncation();
    let limit = match model.survey() {
        SurveyType::Line => w.width(),
        SurveyType::Point => w.squared_width().sqrt(),
    } * (1.0 + GENERAL_TOL);
    let within = |width: f64| width.is_finite() && width > 0.0 && width <= limit;
    if model.has_covariates() {
        (0..model.n()).filter_map(|i| model.curve_for_row(i)).all(|c| within(c.effective_width(grid)))
    } else {
        within(model.baseline_curve().effective_width(grid))
    }
}
