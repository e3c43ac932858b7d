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
use anyhow::Result;
use clap::Parser;
use platefit::analysis::LeastSquaresAnalyzer;
use platefit::cli::Cli;
use platefit::cli::Commands::Analyse;
use platefit::cli::Commands::Plate;
use platefit::config::AnalyseConfig;
use platefit::config::Settings;
use platefit::logging::setup_tracing;
use platefit::pipeline::run_analyse;
use platefit::pipeline::run_plate;

fn main() -> Result<()> {
  let Cli { toggles, command } = Cli::parse();
  let settings = Settings::from(&toggles);
  let _guard = setup_tracing(settings.verbose)?;

  let main_span = tracing::info_span!("platefit");
  let _enter = main_span.enter();

  match command {
    Plate(plate_args) => {
      run_plate(&plate_args)?;
    }
    Analyse(analyse_args) => {
      tracing::info!("Starting growth-curve analysis...");

      let config = AnalyseConfig::try_from(analyse_args)?;
      run_analyse(&config, &settings, &LeastSquaresAnalyzer)?;

      tracing::info!("Analysis complete.");
    }
  }

  Ok(())
}
