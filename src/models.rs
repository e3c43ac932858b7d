use crate::error::AnalysisError;

/// The nested growth-model family.
///
/// Logistic is Richards with `nu = 1`; Richards is Baranyi-Roberts without
/// the lag adjustment (`q0`, `v`).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModelKind {
  Logistic,
  Richards,
  BaranyiRoberts,
}

impl ModelKind {
  pub fn name(&self) -> &'static str {
    match self {
      ModelKind::Logistic => "logistic",
      ModelKind::Richards => "richards",
      ModelKind::BaranyiRoberts => "baranyi-roberts",
    }
  }

  /// Number of free parameters fitted for this model.
  pub fn n_params(&self) -> usize {
    match self {
      ModelKind::Logistic => 3,
      ModelKind::Richards => 4,
      ModelKind::BaranyiRoberts => 6,
    }
  }
}

/// Growth-curve parameters.
///
/// `nu = 1`, `q0 = 0` and `v = 0` encode the absent higher-order terms, so
/// `predict` works uniformly for every model kind.
#[derive(Debug, Clone, Copy)]
pub struct GrowthParams {
  /// Initial population density.
  pub y0: f64,
  /// Carrying capacity.
  pub k: f64,
  /// Intrinsic growth rate (per hour).
  pub r: f64,
  /// Richards curvature; 1 gives the logistic curve.
  pub nu: f64,
  /// Initial physiological state (lag); 0 disables the lag term.
  pub q0: f64,
  /// Lag adjustment rate; 0 disables the lag term.
  pub v: f64,
}

impl GrowthParams {
  /// Lag-adjusted time `A(t)`; identity when the lag term is disabled.
  pub fn adjusted_time(&self, t: f64) -> f64 {
    if self.q0 > 0.0 && self.v > 0.0 {
      t + (((-self.v * t).exp() + self.q0) / (1.0 + self.q0)).ln() / self.v
    } else {
      t
    }
  }

  /// Population density at time `t` under the Baranyi-Roberts form.
  pub fn predict(&self, t: f64) -> f64 {
    let a = self.adjusted_time(t);
    let ratio = (self.k / self.y0).powf(self.nu) - 1.0;
    self.k / (1.0 + ratio * (-self.r * self.nu * a).exp()).powf(1.0 / self.nu)
  }

  /// Lag-phase growth-rate multiplier `alpha(t)` in `[0, 1]`.
  pub fn lag_alpha(&self, t: f64) -> f64 {
    if self.q0 > 0.0 && self.v > 0.0 {
      self.q0 / (self.q0 + (-self.v * t).exp())
    } else {
      1.0
    }
  }
}

/// One fitted candidate model with its goodness-of-fit statistics.
#[derive(Debug, Clone, Copy)]
pub struct FittedModel {
  pub kind: ModelKind,
  pub params: GrowthParams,
  pub rss: f64,
  pub aic: f64,
  pub bic: f64,
}

// Residual floor for the information criteria: keeps near-perfect fits from
// turning meaningless sub-epsilon RSS differences into huge BIC gaps.
const RSS_FLOOR: f64 = 1e-10;

fn information_criteria(rss: f64, n: usize, k: usize) -> (f64, f64) {
  let n_f = n as f64;
  let base = n_f * (rss.max(RSS_FLOOR) / n_f).ln();
  let aic = base + 2.0 * k as f64;
  let bic = base + (k as f64) * n_f.ln();
  (aic, bic)
}

/// Fits every candidate model that the data can support, simplest first.
pub fn fit_all(
  strain: &str,
  times: &[f64],
  ods: &[f64],
) -> Result<Vec<FittedModel>, AnalysisError> {
  let n = times.len();
  if n < ModelKind::Logistic.n_params() + 1 {
    return Err(AnalysisError::TooFewPoints {
      strain: strain.to_string(),
      n,
    });
  }

  let od_max = ods.iter().copied().fold(f64::NEG_INFINITY, f64::max);
  let od_min = ods.iter().copied().fold(f64::INFINITY, f64::min);
  if od_max <= 0.0 || od_max - od_min < 1e-9 {
    return Err(AnalysisError::Degenerate {
      strain: strain.to_string(),
    });
  }

  let init = initial_guess(times, ods);

  let logistic = fit_one(ModelKind::Logistic, times, ods, init);

  let mut fits = vec![logistic];

  if n > ModelKind::Richards.n_params() {
    let seed = GrowthParams {
      nu: 1.0,
      ..fits[0].params
    };
    fits.push(fit_one(ModelKind::Richards, times, ods, seed));
  }

  if n > ModelKind::BaranyiRoberts.n_params() {
    let last = fits[fits.len() - 1].params;
    let seed = GrowthParams {
      q0: 1.0,
      v: last.r.max(0.1),
      ..last
    };
    fits.push(fit_one(ModelKind::BaranyiRoberts, times, ods, seed));
  }

  Ok(fits)
}

/// Fits one model kind by Nelder-Mead over log-transformed parameters.
pub fn fit_one(kind: ModelKind, times: &[f64], ods: &[f64], init: GrowthParams) -> FittedModel {
  let theta0 = encode(kind, &init);
  let objective = |theta: &[f64]| {
    let params = decode(kind, theta);
    sum_of_squares(&params, times, ods)
  };

  let best = nelder_mead(objective, &theta0, 0.25, 400 * theta0.len());
  let params = decode(kind, &best);
  let rss = sum_of_squares(&params, times, ods);
  let (aic, bic) = information_criteria(rss, times.len(), kind.n_params());

  FittedModel {
    kind,
    params,
    rss,
    aic,
    bic,
  }
}

fn sum_of_squares(params: &GrowthParams, times: &[f64], ods: &[f64]) -> f64 {
  let mut sse = 0.0;
  for (&t, &od) in times.iter().zip(ods) {
    let predicted = params.predict(t);
    if !predicted.is_finite() {
      return f64::INFINITY;
    }
    let residual = predicted - od;
    sse += residual * residual;
  }
  sse
}

/// Data-driven starting point: `y0` from the earliest readings, `K` from the
/// plateau, `r` from the steepest log-slope between consecutive time points.
fn initial_guess(times: &[f64], ods: &[f64]) -> GrowthParams {
  let t_min = times.iter().copied().fold(f64::INFINITY, f64::min);
  let od_max = ods.iter().copied().fold(f64::NEG_INFINITY, f64::max);

  let early: Vec<f64> = times
    .iter()
    .zip(ods)
    .filter(|&(&t, _)| t == t_min)
    .map(|(_, &od)| od)
    .collect();
  let y0 = (early.iter().sum::<f64>() / early.len().max(1) as f64).max(1e-6);

  let k = od_max.max(y0 * 2.0);

  // Mean OD per time point, sorted by time.
  let mut by_time: Vec<(f64, f64, usize)> = Vec::new();
  for (&t, &od) in times.iter().zip(ods) {
    match by_time.iter_mut().find(|(bt, _, _)| *bt == t) {
      Some((_, sum, count)) => {
        *sum += od;
        *count += 1;
      }
      None => by_time.push((t, od, 1)),
    }
  }
  by_time.sort_by(|a, b| a.0.total_cmp(&b.0));

  let mut r = 0.0f64;
  for pair in by_time.windows(2) {
    let (t1, sum1, n1) = pair[0];
    let (t2, sum2, n2) = pair[1];
    let (m1, m2) = (sum1 / n1 as f64, sum2 / n2 as f64);
    if m1 > 1e-9 && m2 > 1e-9 && t2 > t1 {
      r = r.max(((m2 / m1).ln()) / (t2 - t1));
    }
  }
  let r = r.clamp(0.05, 10.0);

  GrowthParams {
    y0: y0.min(k * 0.9),
    k,
    r,
    nu: 1.0,
    q0: 0.0,
    v: 0.0,
  }
}

fn encode(kind: ModelKind, params: &GrowthParams) -> Vec<f64> {
  let mut theta = vec![params.y0.ln(), params.k.ln(), params.r.ln()];
  if kind != ModelKind::Logistic {
    theta.push(params.nu.max(1e-3).ln());
  }
  if kind == ModelKind::BaranyiRoberts {
    theta.push(params.q0.max(1e-6).ln());
    theta.push(params.v.max(1e-6).ln());
  }
  theta
}

fn decode(kind: ModelKind, theta: &[f64]) -> GrowthParams {
  GrowthParams {
    y0: theta[0].exp(),
    k: theta[1].exp(),
    r: theta[2].exp(),
    nu: if kind == ModelKind::Logistic {
      1.0
    } else {
      theta[3].exp()
    },
    q0: if kind == ModelKind::BaranyiRoberts {
      theta[4].exp()
    } else {
      0.0
    },
    v: if kind == ModelKind::BaranyiRoberts {
      theta[5].exp()
    } else {
      0.0
    },
  }
}

/// Plain Nelder-Mead downhill simplex. Deterministic: the initial simplex is
/// built from fixed per-coordinate steps, no restarts.
fn nelder_mead<F: Fn(&[f64]) -> f64>(
  f: F,
  x0: &[f64],
  step: f64,
  max_iter: usize,
) -> Vec<f64> {
  const ALPHA: f64 = 1.0; // reflection
  const GAMMA: f64 = 2.0; // expansion
  const RHO: f64 = 0.5; // contraction
  const SIGMA: f64 = 0.5; // shrink
  const TOL: f64 = 1e-12;

  let dim = x0.len();
  let mut simplex: Vec<(Vec<f64>, f64)> = Vec::with_capacity(dim + 1);
  simplex.push((x0.to_vec(), f(x0)));
  for i in 0..dim {
    let mut x = x0.to_vec();
    x[i] += step;
    let fx = f(&x);
    simplex.push((x, fx));
  }

  for _ in 0..max_iter {
    simplex.sort_by(|a, b| a.1.total_cmp(&b.1));
    let best = simplex[0].1;
    let worst = simplex[dim].1;
    if (worst - best).abs() <= TOL * (best.abs() + TOL) {
      break;
    }

    // Centroid of all points but the worst.
    let mut centroid = vec![0.0; dim];
    for (x, _) in simplex.iter().take(dim) {
      for (c, xi) in centroid.iter_mut().zip(x) {
        *c += xi / dim as f64;
      }
    }

    let worst_x = simplex[dim].0.clone();
    let reflect: Vec<f64> = centroid
      .iter()
      .zip(&worst_x)
      .map(|(c, w)| c + ALPHA * (c - w))
      .collect();
    let f_reflect = f(&reflect);

    if f_reflect < simplex[0].1 {
      let expand: Vec<f64> = centroid
        .iter()
        .zip(&worst_x)
        .map(|(c, w)| c + GAMMA * ALPHA * (c - w))
        .collect();
      let f_expand = f(&expand);
      simplex[dim] = if f_expand < f_reflect {
        (expand, f_expand)
      } else {
        (reflect, f_reflect)
      };
      continue;
    }

    if f_reflect < simplex[dim - 1].1 {
      simplex[dim] = (reflect, f_reflect);
      continue;
    }

    let contract: Vec<f64> = centroid
      .iter()
      .zip(&worst_x)
      .map(|(c, w)| c + RHO * (w - c))
      .collect();
    let f_contract = f(&contract);
    if f_contract < simplex[dim].1 {
      simplex[dim] = (contract, f_contract);
      continue;
    }

    // Shrink toward the best vertex.
    let best_x = simplex[0].0.clone();
    for (x, fx) in simplex.iter_mut().skip(1) {
      for (xi, bi) in x.iter_mut().zip(&best_x) {
        *xi = bi + SIGMA * (*xi - bi);
      }
      *fx = f(x);
    }
  }

  simplex.sort_by(|a, b| a.1.total_cmp(&b.1));
  simplex[0].0.clone()
}

#[cfg(test)]
mod tests {
  use super::*;

  fn logistic_params(y0: f64, k: f64, r: f64) -> GrowthParams {
    GrowthParams {
      y0,
      k,
      r,
      nu: 1.0,
      q0: 0.0,
      v: 0.0,
    }
  }

  #[test]
  fn logistic_curve_starts_at_y0_and_saturates_at_k() {
    let params = logistic_params(0.02, 1.0, 0.8);
    assert!((params.predict(0.0) - 0.02).abs() < 1e-12);
    assert!((params.predict(100.0) - 1.0).abs() < 1e-6);

    let mut previous = 0.0;
    for i in 0..50 {
      let y = params.predict(i as f64);
      assert!(y >= previous);
      previous = y;
    }
  }

  #[test]
  fn richards_with_unit_nu_matches_logistic() {
    let logistic = logistic_params(0.05, 0.9, 0.6);
    let richards = GrowthParams { nu: 1.0, ..logistic };
    for i in 0..30 {
      let t = i as f64 * 0.5;
      assert!((logistic.predict(t) - richards.predict(t)).abs() < 1e-12);
    }
  }

  #[test]
  fn lag_term_delays_growth() {
    let no_lag = logistic_params(0.02, 1.0, 0.8);
    let lagged = GrowthParams {
      q0: 0.05,
      v: 0.5,
      ..no_lag
    };
    // Midway through growth the lagged curve must be behind.
    assert!(lagged.predict(5.0) < no_lag.predict(5.0));
    // Both reach the same carrying capacity.
    assert!((lagged.predict(200.0) - no_lag.predict(200.0)).abs() < 1e-6);
  }

  // Deterministic stand-in for measurement noise, so the candidate models
  // differ by a real residual rather than by floating-point dust.
  fn jitter(i: usize) -> f64 {
    (i as f64 * 0.7).sin() * 0.005
  }

  #[test]
  fn fit_recovers_logistic_parameters() {
    let truth = logistic_params(0.02, 1.0, 0.8);
    let times: Vec<f64> = (0..=24).map(|t| t as f64).collect();
    let ods: Vec<f64> = times
      .iter()
      .enumerate()
      .map(|(i, &t)| truth.predict(t) + jitter(i))
      .collect();

    let fits = fit_all("1", &times, &ods).unwrap();
    let logistic = fits
      .iter()
      .find(|f| f.kind == ModelKind::Logistic)
      .unwrap();

    assert!(logistic.rss < 1e-2, "rss = {}", logistic.rss);
    assert!((logistic.params.k - 1.0).abs() / 1.0 < 0.05);
    assert!((logistic.params.r - 0.8).abs() / 0.8 < 0.15);
    assert!((logistic.params.y0 - 0.02).abs() / 0.02 < 0.25);
  }

  #[test]
  fn initial_guess_averages_the_earliest_readings() {
    let times = vec![0.0, 0.0, 1.0, 2.0];
    let ods = vec![0.02, 0.04, 0.1, 0.3];
    let guess = initial_guess(&times, &ods);
    assert!((guess.y0 - 0.03).abs() < 1e-12);
    assert_eq!(guess.k, 0.3);
  }

  #[test]
  fn too_few_points_is_rejected() {
    let err = fit_all("1", &[0.0, 1.0], &[0.1, 0.2]).unwrap_err();
    assert!(matches!(err, AnalysisError::TooFewPoints { .. }));
  }

  #[test]
  fn flat_signal_is_rejected() {
    let times: Vec<f64> = (0..10).map(|t| t as f64).collect();
    let ods = vec![0.0; 10];
    let err = fit_all("1", &times, &ods).unwrap_err();
    assert!(matches!(err, AnalysisError::Degenerate { .. }));
  }
}
