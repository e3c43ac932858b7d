use crate::cli::AnalyseArgs;
use crate::cli::ToggleArgs;
use crate::error::ConfigError;
use std::path::PathBuf;

/// Process-wide toggles, set once at startup and read-only afterwards.
///
/// Every component receives these explicitly; nothing in the pipeline keeps
/// mutable global state.
#[derive(Debug, Clone, Copy)]
pub struct Settings {
  pub verbose: bool,
  pub plot: bool,
  pub prompt: bool,
}

impl From<&ToggleArgs> for Settings {
  fn from(toggles: &ToggleArgs) -> Self {
    Settings {
      verbose: toggles.verbose && !toggles.no_verbose,
      plot: !toggles.no_plot,
      prompt: toggles.prompt && !toggles.no_prompt,
    }
  }
}

/// Fully validated configuration for the `analyse` subcommand.
#[derive(Debug, Clone)]
pub struct AnalyseConfig {
  pub path: String,
  pub plate_folder: PathBuf,
  pub plate_file: String,
  pub output_file: Option<PathBuf>,
  pub blank_strain: String,
  pub ref_strain: String,
  /// Omit readings after this many hours; `None` means no truncation.
  pub max_time: Option<f64>,
}

impl TryFrom<AnalyseArgs> for AnalyseConfig {
  type Error = ConfigError;

  fn try_from(
    AnalyseArgs {
      path,
      plate_folder,
      plate_file,
      output_file,
      blank_strain,
      ref_strain,
      max_time,
    }: AnalyseArgs,
  ) -> Result<Self, Self::Error> {
    if blank_strain == ref_strain {
      return Err(ConfigError::BlankRefCollision { strain: blank_strain });
    }

    if let Some(hours) = max_time {
      if !hours.is_finite() || hours <= 0.0 {
        return Err(ConfigError::BadMaxTime { hours });
      }
    }

    Ok(AnalyseConfig {
      path,
      plate_folder,
      plate_file,
      output_file,
      blank_strain,
      ref_strain,
      max_time,
    })
  }
}
