use crate::error::AnalysisError;
use crate::models::FittedModel;
use crate::models::GrowthParams;
use crate::models::ModelKind;
use crate::models::fit_all;
use crate::readings::ReadingsTable;

/// BIC improvement a richer model must show over a simpler one to win.
const BIC_EVIDENCE: f64 = 2.0;

/// Per-strain output of the fitting routine. Immutable once produced.
#[derive(Debug, Clone, Copy)]
pub struct FitSummary {
  pub model: &'static str,
  pub rss: f64,
  pub aic: f64,
  pub bic: f64,
  /// Number of candidate models the selected model beats by BIC.
  pub benchmark: f64,
  pub params: GrowthParams,
  pub max_growth_rate: f64,
  pub lag: f64,
  pub has_lag: bool,
  pub has_nu: bool,
}

/// Two-strain density trajectory from a competition run.
#[derive(Debug, Clone, Default)]
pub struct Trajectory {
  pub time: Vec<f64>,
  pub assay: Vec<f64>,
  pub reference: Vec<f64>,
}

/// The analysis capability the orchestrator depends on.
///
/// The pipeline only ever talks to this trait, so the numeric machinery can
/// be swapped for a test double.
pub trait Analyzer {
  /// Fit the growth-model family to one strain's readings and summarize the
  /// winning model.
  fn fit(&self, readings: &ReadingsTable) -> Result<FitSummary, AnalysisError>;

  /// Simulate the assay strain competing against the reference strain over
  /// `hours` hours, starting from the fitted initial densities.
  fn compete(
    &self,
    assay: &FitSummary,
    reference: &FitSummary,
    hours: f64,
  ) -> Result<Trajectory, AnalysisError>;
}

/// Default analyzer: least-squares fits plus an RK4 competition simulation.
#[derive(Debug, Default)]
pub struct LeastSquaresAnalyzer;

impl Analyzer for LeastSquaresAnalyzer {
  fn fit(&self, readings: &ReadingsTable) -> Result<FitSummary, AnalysisError> {
    let strain = readings
      .rows
      .first()
      .map(|r| r.strain.as_str())
      .unwrap_or("?");
    let times: Vec<f64> = readings.rows.iter().map(|r| r.time).collect();
    let ods: Vec<f64> = readings.rows.iter().map(|r| r.od).collect();

    let candidates = fit_all(strain, &times, &ods)?;
    Ok(summarize(&candidates, readings.max_time()))
  }

  fn compete(
    &self,
    assay: &FitSummary,
    reference: &FitSummary,
    hours: f64,
  ) -> Result<Trajectory, AnalysisError> {
    simulate_competition(&assay.params, &reference.params, hours)
  }
}

/// Picks the winning candidate and derives the summary traits.
pub fn summarize(candidates: &[FittedModel], horizon: f64) -> FitSummary {
  let best = select_best(candidates);
  let beaten = candidates
    .iter()
    .filter(|c| c.bic > best.bic && c.kind != best.kind)
    .count();

  let bic_of = |kind: ModelKind| candidates.iter().find(|c| c.kind == kind).map(|c| c.bic);
  let logistic_bic = bic_of(ModelKind::Logistic).unwrap_or(f64::INFINITY);
  let richards_bic = bic_of(ModelKind::Richards).unwrap_or(f64::INFINITY);
  let baranyi_bic = bic_of(ModelKind::BaranyiRoberts).unwrap_or(f64::INFINITY);

  let has_nu = richards_bic + BIC_EVIDENCE < logistic_bic
    || baranyi_bic + BIC_EVIDENCE < logistic_bic;
  let has_lag = baranyi_bic + BIC_EVIDENCE < logistic_bic.min(richards_bic);

  let (max_growth_rate, lag) = growth_traits(&best.params, horizon);

  FitSummary {
    model: best.kind.name(),
    rss: best.rss,
    aic: best.aic,
    bic: best.bic,
    benchmark: beaten as f64,
    params: best.params,
    max_growth_rate,
    lag,
    has_lag,
    has_nu,
  }
}

/// Walks the candidates simplest-first; a richer model only replaces the
/// incumbent when its BIC is better by `BIC_EVIDENCE`.
fn select_best(candidates: &[FittedModel]) -> FittedModel {
  let mut best = candidates[0];
  for candidate in &candidates[1..] {
    if candidate.bic + BIC_EVIDENCE < best.bic {
      best = *candidate;
    }
  }
  best
}

/// Maximum slope of the fitted curve, and the lag time from the tangent at
/// the point of maximum growth (floored at zero).
fn growth_traits(params: &GrowthParams, horizon: f64) -> (f64, f64) {
  const STEPS: usize = 400;
  let horizon = if horizon > 0.0 { horizon } else { 24.0 };
  let dt = horizon / STEPS as f64;
  let h = dt * 0.5;

  let mut max_slope = 0.0f64;
  let mut t_star = 0.0f64;
  for i in 0..=STEPS {
    let t = i as f64 * dt;
    let lo = (t - h).max(0.0);
    let hi = t + h;
    let slope = (params.predict(hi) - params.predict(lo)) / (hi - lo);
    if slope > max_slope {
      max_slope = slope;
      t_star = t;
    }
  }

  if max_slope <= 0.0 {
    return (0.0, 0.0);
  }

  let y_star = params.predict(t_star);
  let lag = (t_star - (y_star - params.y0) / max_slope).clamp(0.0, t_star);
  (max_slope, lag)
}

/// Two-strain competition: both strains share the resource bracket
/// `(1 - (y_a + y_r) / K_i)`, each growing with its own rate, curvature and
/// lag adjustment. Integrated with fixed-step RK4.
pub fn simulate_competition(
  assay: &GrowthParams,
  reference: &GrowthParams,
  hours: f64,
) -> Result<Trajectory, AnalysisError> {
  if !(hours > 0.0) || assay.y0 <= 0.0 || reference.y0 <= 0.0 {
    return Err(AnalysisError::BadCompetition);
  }

  const STEPS: usize = 600;
  let dt = hours / STEPS as f64;

  let deriv = |t: f64, ya: f64, yr: f64| -> (f64, f64) {
    let total = ya + yr;
    let growth = |p: &GrowthParams, y: f64| {
      let bracket = (1.0 - total / p.k).max(0.0).powf(p.nu);
      p.r * p.lag_alpha(t) * y * bracket
    };
    (growth(assay, ya), growth(reference, yr))
  };

  let mut trajectory = Trajectory::default();
  let mut ya = assay.y0;
  let mut yr = reference.y0;
  trajectory.time.push(0.0);
  trajectory.assay.push(ya);
  trajectory.reference.push(yr);

  for i in 0..STEPS {
    let t = i as f64 * dt;
    let (k1a, k1r) = deriv(t, ya, yr);
    let (k2a, k2r) = deriv(t + dt / 2.0, ya + dt / 2.0 * k1a, yr + dt / 2.0 * k1r);
    let (k3a, k3r) = deriv(t + dt / 2.0, ya + dt / 2.0 * k2a, yr + dt / 2.0 * k2r);
    let (k4a, k4r) = deriv(t + dt, ya + dt * k3a, yr + dt * k3r);

    ya += dt / 6.0 * (k1a + 2.0 * k2a + 2.0 * k3a + k4a);
    yr += dt / 6.0 * (k1r + 2.0 * k2r + 2.0 * k3r + k4r);

    trajectory.time.push(t + dt);
    trajectory.assay.push(ya.max(0.0));
    trajectory.reference.push(yr.max(0.0));
  }

  Ok(trajectory)
}

/// Long-term relative fitness: the ratio of realized log-growth of the assay
/// strain to that of the reference strain over the competition.
pub fn fitness_ltee(trajectory: &Trajectory) -> f64 {
  let (Some(&a0), Some(&a1)) = (trajectory.assay.first(), trajectory.assay.last()) else {
    return f64::NAN;
  };
  let (Some(&r0), Some(&r1)) = (trajectory.reference.first(), trajectory.reference.last()) else {
    return f64::NAN;
  };

  if a0 <= 0.0 || a1 <= 0.0 || r0 <= 0.0 || r1 <= 0.0 {
    return f64::NAN;
  }
  let denominator = (r1 / r0).ln();
  if denominator.abs() < 1e-12 {
    return f64::NAN;
  }
  (a1 / a0).ln() / denominator
}
