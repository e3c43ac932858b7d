use crate::error::ReadingsError;
use crate::plate::Plate;
use std::collections::HashSet;
use std::fs::File;
use std::path::Path;

/// One background-corrected (or raw) optical-density measurement.
#[derive(Debug, Clone)]
pub struct Reading {
  pub well: String,
  pub strain: String,
  /// Elapsed time in hours.
  pub time: f64,
  pub od: f64,
  pub color: Option<String>,
}

/// Long-form readings for one data file.
#[derive(Debug, Clone, Default)]
pub struct ReadingsTable {
  pub rows: Vec<Reading>,
}

impl ReadingsTable {
  pub fn is_empty(&self) -> bool {
    self.rows.is_empty()
  }

  /// Unique strain labels in first-seen order.
  pub fn strains(&self) -> Vec<String> {
    let mut seen = Vec::new();
    for row in &self.rows {
      if !seen.iter().any(|s| s == &row.strain) {
        seen.push(row.strain.clone());
      }
    }
    seen
  }

  pub fn min_time(&self) -> f64 {
    self.rows.iter().map(|r| r.time).fold(f64::INFINITY, f64::min)
  }

  pub fn max_time(&self) -> f64 {
    self
      .rows
      .iter()
      .map(|r| r.time)
      .fold(f64::NEG_INFINITY, f64::max)
  }

  /// Rows belonging to one strain, in file order.
  pub fn subset(&self, strain: &str) -> ReadingsTable {
    ReadingsTable {
      rows: self.rows.iter().filter(|r| r.strain == strain).cloned().collect(),
    }
  }
}

type Handler = fn(&Path, &Plate, Option<f64>) -> Result<ReadingsTable, ReadingsError>;

/// Fixed mapping from lowercase file extension to parser.
///
/// `csv`: long-form reader export with `Well,Time,OD` columns.
/// `tsv`: wide plate-reader export, `Time` column plus one column per well.
const HANDLERS: &[(&str, Handler)] = &[("csv", parse_long_csv), ("tsv", parse_wide_tsv)];

/// Extensions with a registered handler, for file discovery.
pub fn recognized_extensions() -> Vec<&'static str> {
  HANDLERS.iter().map(|(ext, _)| *ext).collect()
}

fn handler_for(path: &Path) -> Option<Handler> {
  let ext = path.extension()?.to_str()?.to_ascii_lowercase();
  HANDLERS
    .iter()
    .find(|(key, _)| *key == ext)
    .map(|(_, handler)| *handler)
}

/// Dispatches a data file to its format handler.
///
/// Returns `Ok(None)` for unrecognized extensions, which are skipped with an
/// informational message rather than failing the run. Readings beyond
/// `max_time` hours are dropped when a finite limit is given.
pub fn parse_file(
  path: &Path,
  plate: &Plate,
  max_time: Option<f64>,
) -> Result<Option<ReadingsTable>, ReadingsError> {
  let Some(handler) = handler_for(path) else {
    tracing::info!(file = %path.display(), "No handler found for file; skipping");
    return Ok(None);
  };

  let table = handler(path, plate, max_time)?;
  if table.is_empty() {
    return Err(ReadingsError::NoPlateWells {
      path: path.display().to_string(),
    });
  }
  Ok(Some(table))
}

/// Subtracts the blank-strain baseline from every reading.
///
/// The baseline is the mean OD of blank-strain wells at the earliest observed
/// time. Corrected values are clamped at zero. A missing blank strain logs a
/// warning and leaves the table untouched.
pub fn correct_background(table: &mut ReadingsTable, blank_strain: &str) {
  if table.is_empty() {
    return;
  }

  if !table.rows.iter().any(|r| r.strain == blank_strain) {
    tracing::warn!(strain = blank_strain, "Blank strain doesn't exist; skipping background correction");
    return;
  }

  let t_min = table.min_time();
  let baseline: Vec<f64> = table
    .rows
    .iter()
    .filter(|r| r.strain == blank_strain && r.time == t_min)
    .map(|r| r.od)
    .collect();

  if baseline.is_empty() {
    tracing::warn!(
      strain = blank_strain,
      "Blank strain has no reading at the earliest time point; skipping background correction"
    );
    return;
  }

  let background = baseline.iter().sum::<f64>() / baseline.len() as f64;
  for row in &mut table.rows {
    row.od = (row.od - background).max(0.0);
  }
}

/// Orders strains for the fit loop: the blank strain is excluded and the
/// reference strain moved to the front when present. A missing reference
/// strain logs a warning; every remaining strain is then fitted without a
/// fitness value.
pub fn ordered_strains(table: &ReadingsTable, blank_strain: &str, ref_strain: &str) -> Vec<String> {
  let mut strains = table.strains();
  strains.retain(|s| s != blank_strain);

  if let Some(pos) = strains.iter().position(|s| s == ref_strain) {
    let reference = strains.remove(pos);
    strains.insert(0, reference);
  } else {
    tracing::warn!(strain = ref_strain, "Reference strain doesn't exist; fitness won't be computed");
  }

  strains
}

fn open_reader(path: &Path, delimiter: u8) -> Result<csv::Reader<File>, ReadingsError> {
  let file = File::open(path).map_err(|e| ReadingsError::Open {
    path: path.to_path_buf(),
    source: e,
  })?;
  Ok(
    csv::ReaderBuilder::new()
      .delimiter(delimiter)
      .trim(csv::Trim::All)
      .flexible(true)
      .from_reader(file),
  )
}

fn parse_error(path: &Path, ext: &str, detail: impl Into<String>) -> ReadingsError {
  ReadingsError::Parse {
    path: path.display().to_string(),
    ext: ext.to_string(),
    detail: detail.into(),
  }
}

fn keep_time(time: f64, max_time: Option<f64>) -> bool {
  max_time.is_none_or(|limit| time <= limit)
}

/// Long-form reader export: one `Well,Time,OD` row per measurement.
fn parse_long_csv(
  path: &Path,
  plate: &Plate,
  max_time: Option<f64>,
) -> Result<ReadingsTable, ReadingsError> {
  let mut reader = open_reader(path, b',')?;

  let headers = reader
    .headers()
    .map_err(|e| parse_error(path, "csv", e.to_string()))?
    .clone();
  let column = |name: &str| headers.iter().position(|h| h.eq_ignore_ascii_case(name));

  let well_col = column("well").ok_or_else(|| parse_error(path, "csv", "missing 'Well' column"))?;
  let time_col = column("time").ok_or_else(|| parse_error(path, "csv", "missing 'Time' column"))?;
  let od_col = column("od").ok_or_else(|| parse_error(path, "csv", "missing 'OD' column"))?;

  let well_map = plate.well_map();
  let mut unknown_wells: HashSet<String> = HashSet::new();
  let mut rows = Vec::new();

  for (line, record) in reader.records().enumerate() {
    let record = record.map_err(|e| parse_error(path, "csv", e.to_string()))?;
    let field = |idx: usize| record.get(idx).unwrap_or("");

    let well = field(well_col);
    if well.is_empty() {
      continue;
    }

    let time: f64 = field(time_col)
      .parse()
      .map_err(|_| parse_error(path, "csv", format!("bad time value on data row {}", line + 1)))?;
    let od: f64 = field(od_col)
      .parse()
      .map_err(|_| parse_error(path, "csv", format!("bad OD value on data row {}", line + 1)))?;

    if !keep_time(time, max_time) {
      continue;
    }

    let Some((strain, color)) = well_map.get(well) else {
      if unknown_wells.insert(well.to_string()) {
        tracing::warn!(well, "Well not on the plate; ignoring its readings");
      }
      continue;
    };

    rows.push(Reading {
      well: well.to_string(),
      strain: strain.to_string(),
      time,
      od,
      color: color.map(str::to_string),
    });
  }

  Ok(ReadingsTable { rows })
}

/// Wide plate-reader export: tab-delimited, a `Time` column followed by one
/// column per well. Empty cells are skipped.
fn parse_wide_tsv(
  path: &Path,
  plate: &Plate,
  max_time: Option<f64>,
) -> Result<ReadingsTable, ReadingsError> {
  let mut reader = open_reader(path, b'\t')?;

  let headers = reader
    .headers()
    .map_err(|e| parse_error(path, "tsv", e.to_string()))?
    .clone();

  match headers.get(0) {
    Some(first) if first.eq_ignore_ascii_case("time") => {}
    _ => return Err(parse_error(path, "tsv", "first column must be 'Time'")),
  }
  let wells: Vec<String> = headers.iter().skip(1).map(str::to_string).collect();
  if wells.is_empty() {
    return Err(parse_error(path, "tsv", "no well columns"));
  }

  let well_map = plate.well_map();
  let mut unknown_wells: HashSet<String> = HashSet::new();
  let mut rows = Vec::new();

  for (line, record) in reader.records().enumerate() {
    let record = record.map_err(|e| parse_error(path, "tsv", e.to_string()))?;

    let time: f64 = record
      .get(0)
      .unwrap_or("")
      .parse()
      .map_err(|_| parse_error(path, "tsv", format!("bad time value on data row {}", line + 1)))?;
    if !keep_time(time, max_time) {
      continue;
    }

    for (idx, well) in wells.iter().enumerate() {
      let cell = record.get(idx + 1).unwrap_or("").trim();
      if cell.is_empty() {
        continue;
      }
      let od: f64 = cell.parse().map_err(|_| {
        parse_error(
          path,
          "tsv",
          format!("bad OD value for well {} on data row {}", well, line + 1),
        )
      })?;

      let Some((strain, color)) = well_map.get(well.as_str()) else {
        if unknown_wells.insert(well.clone()) {
          tracing::warn!(well = well.as_str(), "Well not on the plate; ignoring its readings");
        }
        continue;
      };

      rows.push(Reading {
        well: well.clone(),
        strain: strain.to_string(),
        time,
        od,
        color: color.map(str::to_string),
      });
    }
  }

  Ok(ReadingsTable { rows })
}
