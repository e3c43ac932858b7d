use clap::ArgAction;
use clap::Args;
use clap::Parser;
use clap::Subcommand;
use std::path::PathBuf;

#[derive(Debug, Parser)]
#[command(version, about = "Growth-curve analysis for microplate reader data")]
pub struct Cli {
  #[command(flatten)]
  pub toggles: ToggleArgs,

  #[command(subcommand)]
  pub command: Commands,
}

/// Process-wide toggles, resolved once into a `Settings` at startup.
///
/// Each toggle is a `--x` / `--no-x` pair; the `--no-x` form wins when both
/// are given.
#[derive(Debug, Args)]
pub struct ToggleArgs {
  /// Print progress and informational messages.
  #[arg(long, global = true, action = ArgAction::SetTrue)]
  pub verbose: bool,

  #[arg(long = "no-verbose", global = true, action = ArgAction::SetTrue)]
  pub no_verbose: bool,

  /// Render PNG plot artifacts next to each data file (default: on).
  #[arg(long, global = true, action = ArgAction::SetTrue)]
  pub plot: bool,

  #[arg(long = "no-plot", global = true, action = ArgAction::SetTrue)]
  pub no_plot: bool,

  /// Ask for confirmation of the plate layout before analysing.
  #[arg(long, global = true, action = ArgAction::SetTrue)]
  pub prompt: bool,

  #[arg(long = "no-prompt", global = true, action = ArgAction::SetTrue)]
  pub no_prompt: bool,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
  /// Read a plate layout and re-emit it as CSV.
  ///
  /// Default is to dump the plate file to the standard output.
  Plate(PlateArgs),

  /// Analyse growth curves in all data files in folder PATH or matching the
  /// pattern PATH, outputting estimated growth traits and fitness per strain.
  Analyse(AnalyseArgs),
}

#[derive(Debug, Args)]
pub struct PlateArgs {
  /// Plate templates folder.
  #[arg(long = "plate_folder", default_value = "plate_templates")]
  pub plate_folder: PathBuf,

  /// Plate template CSV file name.
  #[arg(long = "plate_file", default_value = "checkerboard.csv")]
  pub plate_file: String,

  /// Output CSV file path; standard output when omitted.
  #[arg(short = 'o', long = "output_file")]
  pub output_file: Option<PathBuf>,
}

#[derive(Debug, Args)]
pub struct AnalyseArgs {
  /// Data folder or glob pattern.
  pub path: String,

  /// Plate templates folder.
  #[arg(long = "plate_folder", default_value = "plate_templates")]
  pub plate_folder: PathBuf,

  /// Plate template CSV file name.
  #[arg(long = "plate_file", default_value = "checkerboard.csv")]
  pub plate_file: String,

  /// Output CSV file path; standard output when omitted.
  #[arg(short = 'o', long = "output_file")]
  pub output_file: Option<PathBuf>,

  /// Blank strain for background calibration.
  #[arg(long = "blank_strain", default_value = "0")]
  pub blank_strain: String,

  /// Reference strain for competitions.
  #[arg(long = "ref_strain", default_value = "1")]
  pub ref_strain: String,

  /// Omit data after this many hours.
  #[arg(long = "max_time")]
  pub max_time: Option<f64>,
}
