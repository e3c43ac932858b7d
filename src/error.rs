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
use std::path::PathBuf;
use thiserror::Error;

/// Top-level error enum for the platefit library.
#[derive(Error, Debug)]
pub enum PlatefitError {
  #[error("Invalid configuration")]
  Config(#[from] ConfigError),

  #[error("Plate layout error")]
  Plate(#[from] PlateError),

  #[error("Data file discovery failed")]
  Discover(#[from] DiscoverError),

  #[error("Failed to read data file")]
  Readings(#[from] ReadingsError),

  #[error("Growth-curve analysis failed")]
  Analysis(#[from] AnalysisError),

  #[error("Pipeline error")]
  Pipeline(#[from] PipelineError),

  #[error("I/O error: {0}")]
  Io(#[from] std::io::Error),
}

/// Errors from command-line argument validation (src/config.rs).
#[derive(Error, Debug)]
pub enum ConfigError {
  #[error("Blank strain and reference strain are both '{strain}'; they must differ")]
  BlankRefCollision { strain: String },

  #[error("--max_time must be a positive number of hours, got {hours}")]
  BadMaxTime { hours: f64 },
}

/// Errors related to plate-layout loading (src/plate.rs).
#[derive(Error, Debug)]
pub enum PlateError {
  #[error("Can't find plate file: {path} (searched working directory and bundled templates)")]
  NotFound { path: PathBuf },

  #[error("Parser error, probably not a CSV file: {path}")]
  Csv {
    path: String,
    #[source]
    source: csv::Error,
  },

  #[error("Plate file {path} is missing a '{column}' column")]
  MissingColumn { path: String, column: &'static str },

  #[error("Plate file {path} contains no wells")]
  Empty { path: String },

  #[error("Failed to read plate file: {path}")]
  Read {
    path: PathBuf,
    #[source]
    source: std::io::Error,
  },
}

/// Errors related to data-file discovery (src/discover.rs).
#[derive(Error, Debug)]
pub enum DiscoverError {
  #[error("Invalid glob pattern '{pattern}'")]
  Pattern {
    pattern: String,
    #[source]
    source: glob::PatternError,
  },

  #[error("Failed to list directory {path}")]
  ReadDir {
    path: PathBuf,
    #[source]
    source: std::io::Error,
  },

  #[error("No data files found in {path}")]
  NoDataFiles { path: String },
}

/// Errors related to data-file parsing (src/readings.rs).
#[derive(Error, Debug)]
pub enum ReadingsError {
  #[error("Failed to open data file: {path}")]
  Open {
    path: PathBuf,
    #[source]
    source: std::io::Error,
  },

  #[error("Parser error, probably not a {ext} file: {path}: {detail}")]
  Parse {
    path: String,
    ext: String,
    detail: String,
  },

  #[error("Data file {path} has no readings for any well on the plate")]
  NoPlateWells { path: String },
}

/// Errors from model fitting and competition (src/models.rs, src/analysis.rs).
#[derive(Error, Debug)]
pub enum AnalysisError {
  #[error("Not enough data to fit a growth model ({n} readings for strain '{strain}')")]
  TooFewPoints { strain: String, n: usize },

  #[error("Optical density for strain '{strain}' is flat or non-positive; cannot fit")]
  Degenerate { strain: String },

  #[error("Competition requires positive initial densities and a positive horizon")]
  BadCompetition,
}

/// Errors from the orchestration layer (src/pipeline.rs).
#[derive(Error, Debug)]
pub enum PipelineError {
  #[error("Plate layout rejected; aborting")]
  Declined,

  #[error("Failed to read confirmation from stdin")]
  Prompt(#[source] std::io::Error),

  #[error("Failed to write output to {path}")]
  WriteOutput {
    path: PathBuf,
    #[source]
    source: std::io::Error,
  },

  #[error("Failed to serialize output row")]
  Serialize(#[from] csv::Error),
}
