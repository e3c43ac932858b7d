// Copyright 2025 the platefit developers
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.
use crate::analysis::FitSummary;
use serde::Serialize;

/// Output column names in order, for writing a header when a run produces no
/// records. Must stay in sync with the `ResultRecord` fields.
pub const OUTPUT_HEADER: [&str; 19] = [
  "folder",
  "filename",
  "strain",
  "model",
  "RSS",
  "bic",
  "aic",
  "benchmark",
  "y0",
  "K",
  "r",
  "nu",
  "q0",
  "v",
  "max_growth_rate",
  "lag",
  "has_lag",
  "has_nu",
  "w",
];

/// One row of the final output table: one record per (file, strain) pair.
///
/// This struct is the "contract" for the output CSV; field order is column
/// order and serde renames preserve the established header names.
#[derive(Debug, Clone, Serialize)]
pub struct ResultRecord {
  pub folder: String,
  pub filename: String,
  pub strain: String,
  pub model: String,

  #[serde(rename = "RSS")]
  pub rss: f64,
  pub bic: f64,
  pub aic: f64,
  pub benchmark: f64,

  pub y0: f64,
  #[serde(rename = "K")]
  pub k: f64,
  pub r: f64,
  pub nu: f64,
  pub q0: f64,
  pub v: f64,

  pub max_growth_rate: f64,
  pub lag: f64,
  pub has_lag: bool,
  pub has_nu: bool,

  /// Relative fitness: 1 for the reference strain, competition-derived for
  /// the others, empty when the file has no reference fit.
  pub w: Option<f64>,
}

impl ResultRecord {
  pub fn new(
    folder: String,
    filename: String,
    strain: String,
    summary: &FitSummary,
    w: Option<f64>,
  ) -> Self {
    ResultRecord {
      folder,
      filename,
      strain,
      model: summary.model.to_string(),
      rss: summary.rss,
      bic: summary.bic,
      aic: summary.aic,
      benchmark: summary.benchmark,
      y0: summary.params.y0,
      k: summary.params.k,
      r: summary.params.r,
      nu: summary.params.nu,
      q0: summary.params.q0,
      v: summary.params.v,
      max_growth_rate: summary.max_growth_rate,
      lag: summary.lag,
      has_lag: summary.has_lag,
      has_nu: summary.has_nu,
      w,
    }
  }
}
