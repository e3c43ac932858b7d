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

//! # Platefit
//!
//! `platefit` reads microplate growth-curve data files, fits population-growth
//! models to every strain on the plate, and computes the relative fitness of
//! each strain against a reference strain.
//!
//! This crate contains the main library logic for the `platefit` CLI, but its
//! core modules (`readings`, `models`, `analysis`) could be used independently.
//!
//! ## Core Modules
//!
//! * [`plate`]: Resolves and loads plate-layout files, either from disk or
//!   from the templates bundled into the binary.
//! * [`discover`]: Enumerates candidate data files from a directory or glob
//!   pattern and filters them by recognized extension.
//! * [`readings`]: Parses data files into a long-form readings table and
//!   applies blank-strain background correction.
//! * [`models`]: The growth-model family (logistic, Richards,
//!   Baranyi-Roberts) and least-squares fitting.
//! * [`analysis`]: The [`analysis::Analyzer`] capability trait, fit
//!   summaries, strain-vs-strain competition, and the fitness formula.
//! * [`pipeline`]: Drives the per-file, per-strain batch loop and aggregates
//!   the output table.
//! * [`cli`]: Defines the `clap`-based command-line interface.
//! * [`record`]: Defines the shared output-row struct.
//! * [`error`]: Defines the custom error types for the library.
//! * [`logging`]: Provides the `setup_tracing` utility.

pub mod analysis;
pub mod cli;
pub mod config;
pub mod discover;
pub mod error;
pub mod logging;
pub mod models;
pub mod pipeline;
pub mod plate;
pub mod plot;
pub mod readings;
pub mod record;
