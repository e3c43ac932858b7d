use crate::analysis::Analyzer;
use crate::analysis::FitSummary;
use crate::analysis::fitness_ltee;
use crate::cli::PlateArgs;
use crate::config::AnalyseConfig;
use crate::config::Settings;
use crate::discover::discover;
use crate::error::PipelineError;
use crate::error::PlatefitError;
use crate::plate::Plate;
use crate::plate::find_plate_file;
use crate::plate::load_plate;
use crate::plot;
use crate::readings;
use crate::record::ResultRecord;
use indicatif::ProgressBar;
use indicatif::ProgressStyle;
use std::ffi::OsStr;
use std::io;
use std::io::BufRead;
use std::io::Write;
use std::path::Path;

/// The `plate` subcommand: read a plate layout, re-emit it as CSV.
pub fn run_plate(args: &PlateArgs) -> Result<(), PlatefitError> {
  let source = find_plate_file(&args.plate_folder, &args.plate_file)?;
  tracing::info!(plate = %source.describe(), "Using plate template");

  let plate = load_plate(&source)?;

  match &args.output_file {
    Some(path) => {
      let file = std::fs::File::create(path).map_err(|e| PipelineError::WriteOutput {
        path: path.clone(),
        source: e,
      })?;
      plate.write_csv(file).map_err(PipelineError::Serialize)?;
      tracing::info!(output = %path.display(), "Wrote output");
    }
    None => {
      let stdout = io::stdout();
      plate
        .write_csv(stdout.lock())
        .map_err(PipelineError::Serialize)?;
    }
  }

  Ok(())
}

/// The `analyse` subcommand: the full batch pipeline over a folder or glob.
pub fn run_analyse(
  config: &AnalyseConfig,
  settings: &Settings,
  analyzer: &dyn Analyzer,
) -> Result<(), PlatefitError> {
  let source = find_plate_file(&config.plate_folder, &config.plate_file)?;

  tracing::info!(path = %config.path, "Processing data files");
  tracing::info!(plate = %source.describe(), "Using plate template");
  tracing::info!(
    blank = %config.blank_strain,
    reference = %config.ref_strain,
    "Strain roles"
  );
  if let Some(hours) = config.max_time {
    tracing::info!("Omitting data after {hours:.2} hours");
  }

  let plate = load_plate(&source)?;

  if settings.prompt {
    confirm_plate(&plate)?;
  }

  let files = discover(&config.path, &readings::recognized_extensions())?;

  let bar = file_progress(files.len(), "Processing files");
  let mut records = Vec::new();
  for file in &files {
    bar.set_message(
      file
        .file_name()
        .and_then(OsStr::to_str)
        .unwrap_or_default()
        .to_string(),
    );
    records.extend(process_file(file, &plate, config, settings, analyzer)?);
    bar.inc(1);
  }
  bar.finish_and_clear();

  match &config.output_file {
    Some(path) => {
      let file = std::fs::File::create(path).map_err(|e| PipelineError::WriteOutput {
        path: path.clone(),
        source: e,
      })?;
      write_records(&records, file)?;
      tracing::info!(output = %path.display(), "Wrote output");
    }
    None => {
      let stdout = io::stdout();
      write_records(&records, stdout.lock())?;
    }
  }

  Ok(())
}

/// Processes one data file into result records, in reference-first strain
/// order. Plot rendering is a best-effort side channel and never fails the
/// quantitative pipeline.
fn process_file(
  path: &Path,
  plate: &Plate,
  config: &AnalyseConfig,
  settings: &Settings,
  analyzer: &dyn Analyzer,
) -> Result<Vec<ResultRecord>, PlatefitError> {
  let Some(mut table) = readings::parse_file(path, plate, config.max_time)? else {
    return Ok(Vec::new());
  };

  readings::correct_background(&mut table, &config.blank_strain);

  let stem = path
    .file_stem()
    .and_then(OsStr::to_str)
    .unwrap_or("data")
    .to_string();
  let folder = path
    .parent()
    .map(|p| p.display().to_string())
    .unwrap_or_default();

  if settings.plot {
    render_plot(path, &format!("{stem}_wells.png"), |out| {
      plot::plot_wells(&table, out)
    });
    render_plot(path, &format!("{stem}_strains.png"), |out| {
      plot::plot_strains(&table, out)
    });
  }

  let strains = readings::ordered_strains(&table, &config.blank_strain, &config.ref_strain);
  let horizon = table.max_time();

  let bar = file_progress(strains.len(), "Fitting strain growth curves");
  let mut reference_fit: Option<FitSummary> = None;
  let mut records = Vec::new();

  for strain in &strains {
    bar.set_message(strain.clone());

    let subset = table.subset(strain);
    let summary = analyzer.fit(&subset)?;

    if settings.plot {
      render_plot(path, &format!("{stem}_strain_{strain}.png"), |out| {
        plot::plot_fit(&subset, &summary, out)
      });
    }

    let w = if *strain == config.ref_strain {
      reference_fit = Some(summary);
      Some(1.0)
    } else if let Some(reference) = &reference_fit {
      let trajectory = analyzer.compete(&summary, reference, horizon)?;
      if settings.plot {
        let name = format!("{stem}_{strain}_vs_{}.png", config.ref_strain);
        let colors = (plate.color_of(strain), plate.color_of(&config.ref_strain));
        render_plot(path, &name, |out| {
          plot::plot_competition(&trajectory, colors, out)
        });
      }
      Some(fitness_ltee(&trajectory))
    } else {
      None
    };

    records.push(ResultRecord::new(
      folder.clone(),
      stem.clone(),
      strain.clone(),
      &summary,
      w,
    ));
    bar.inc(1);
  }
  bar.finish_and_clear();

  Ok(records)
}

fn render_plot(data_path: &Path, file_name: &str, draw: impl FnOnce(&Path) -> anyhow::Result<()>) {
  let out = data_path.with_file_name(file_name);
  match draw(&out) {
    Ok(()) => tracing::info!(plot = %out.display(), "Wrote plot"),
    Err(e) => tracing::warn!(plot = %out.display(), error = %e, "Plot rendering failed; continuing"),
  }
}

fn file_progress(len: usize, label: &str) -> ProgressBar {
  let bar = ProgressBar::new(len as u64);
  bar.set_style(
    ProgressStyle::with_template("{prefix}: {bar:40.green} {pos}/{len} {msg}")
      .unwrap_or_else(|_| ProgressStyle::default_bar()),
  );
  bar.set_prefix(label.to_string());
  bar
}

/// Blocks for a yes/no answer on stdin; anything but yes declines.
fn confirm_plate(plate: &Plate) -> Result<(), PipelineError> {
  let strains = plate.strains();
  eprintln!("Plate with {} strains: {}", strains.len(), strains.join(", "));
  eprint!("Is this the plate you wanted? [y/N] ");
  io::stderr().flush().map_err(PipelineError::Prompt)?;

  let mut line = String::new();
  io::stdin()
    .lock()
    .read_line(&mut line)
    .map_err(PipelineError::Prompt)?;

  match line.trim().to_ascii_lowercase().as_str() {
    "y" | "yes" => Ok(()),
    _ => Err(PipelineError::Declined),
  }
}

fn write_records<W: Write>(records: &[ResultRecord], writer: W) -> Result<(), PipelineError> {
  let mut out = csv::Writer::from_writer(writer);
  // Serializing writes the header before the first row; with no rows the
  // table still needs one.
  if records.is_empty() {
    out
      .write_record(crate::record::OUTPUT_HEADER)
      .map_err(PipelineError::Serialize)?;
  }
  for record in records {
    out.serialize(record).map_err(PipelineError::Serialize)?;
  }
  out
    .flush()
    .map_err(|e| PipelineError::Serialize(csv::Error::from(e)))?;
  Ok(())
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::record::OUTPUT_HEADER;

  #[test]
  fn empty_record_set_still_writes_a_header() {
    let mut buffer = Vec::new();
    write_records(&[], &mut buffer).unwrap();

    let out = String::from_utf8(buffer).unwrap();
    assert_eq!(out.trim_end(), OUTPUT_HEADER.join(","));
  }
}
