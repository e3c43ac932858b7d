use crate::error::PlateError;
use std::collections::HashMap;
use std::fs::File;
use std::io::Read;
use std::io::Write;
use std::path::Path;
use std::path::PathBuf;

/// Folder name under which templates are bundled into the binary.
pub const DEFAULT_TEMPLATE_FOLDER: &str = "plate_templates";

/// Plate templates compiled into the binary, keyed by file name.
///
/// These stand in for an installed data directory: when the requested plate
/// file does not exist on disk under the default template folder, the lookup
/// falls back to this table.
const BUNDLED_TEMPLATES: &[(&str, &str)] = &[
  (
    "checkerboard.csv",
    include_str!("../plate_templates/checkerboard.csv"),
  ),
  (
    "uniform.csv",
    include_str!("../plate_templates/uniform.csv"),
  ),
];

/// A resolved plate-file location: a real path or a bundled template.
#[derive(Debug, Clone)]
pub enum PlateSource {
  Disk(PathBuf),
  Bundled { name: &'static str, contents: &'static str },
}

impl PlateSource {
  /// Human-readable location, used in log messages.
  pub fn describe(&self) -> String {
    match self {
      PlateSource::Disk(path) => path.display().to_string(),
      PlateSource::Bundled { name, .. } => format!("bundled template '{name}'"),
    }
  }
}

/// One well of the plate layout.
#[derive(Debug, Clone)]
pub struct PlateWell {
  pub well: String,
  pub strain: String,
  pub color: Option<String>,
}

/// The plate layout: a read-only mapping of wells to strain identities.
#[derive(Debug, Clone, Default)]
pub struct Plate {
  pub wells: Vec<PlateWell>,
}

impl Plate {
  /// Unique strain labels in first-seen order.
  pub fn strains(&self) -> Vec<&str> {
    let mut seen = Vec::new();
    for well in &self.wells {
      if !seen.contains(&well.strain.as_str()) {
        seen.push(well.strain.as_str());
      }
    }
    seen
  }

  /// Well id -> (strain, color) lookup for joining readings to the layout.
  pub fn well_map(&self) -> HashMap<&str, (&str, Option<&str>)> {
    self
      .wells
      .iter()
      .map(|w| (w.well.as_str(), (w.strain.as_str(), w.color.as_deref())))
      .collect()
  }

  /// First non-empty color recorded for a strain, if any.
  pub fn color_of(&self, strain: &str) -> Option<&str> {
    self
      .wells
      .iter()
      .filter(|w| w.strain == strain)
      .find_map(|w| w.color.as_deref())
  }

  /// Re-serialize the layout as `Well,Strain,Color` CSV.
  pub fn write_csv<W: Write>(&self, writer: W) -> Result<(), csv::Error> {
    let mut out = csv::Writer::from_writer(writer);
    out.write_record(["Well", "Strain", "Color"])?;
    for well in &self.wells {
      out.write_record([
        well.well.as_str(),
        well.strain.as_str(),
        well.color.as_deref().unwrap_or(""),
      ])?;
    }
    out.flush()?;
    Ok(())
  }
}

/// Finds a plate file, either relative to the working directory or among the
/// templates bundled into the binary.
pub fn find_plate_file(folder: &Path, file: &str) -> Result<PlateSource, PlateError> {
  let path = folder.join(file);
  if path.exists() {
    return Ok(PlateSource::Disk(path));
  }

  if folder == Path::new(DEFAULT_TEMPLATE_FOLDER) {
    if let Some((name, contents)) = BUNDLED_TEMPLATES.iter().copied().find(|(name, _)| *name == file) {
      return Ok(PlateSource::Bundled { name, contents });
    }
  }

  Err(PlateError::NotFound { path })
}

/// Loads a plate layout from a CSV source.
///
/// Accepted schemas: a `Well` column, or `Row` + `Col` columns from which the
/// well id is derived (`A` + `1` -> `A1`). `Strain` is required and `Color`
/// optional; header matching is case-insensitive.
pub fn load_plate(source: &PlateSource) -> Result<Plate, PlateError> {
  match source {
    PlateSource::Disk(path) => {
      let file = File::open(path).map_err(|e| PlateError::Read {
        path: path.clone(),
        source: e,
      })?;
      parse_plate_csv(file, &path.display().to_string())
    }
    PlateSource::Bundled { name, contents } => parse_plate_csv(contents.as_bytes(), name),
  }
}

fn parse_plate_csv<R: Read>(reader: R, path: &str) -> Result<Plate, PlateError> {
  let mut csv_reader = csv::ReaderBuilder::new()
    .trim(csv::Trim::All)
    .from_reader(reader);

  let headers = csv_reader
    .headers()
    .map_err(|e| PlateError::Csv {
      path: path.to_string(),
      source: e,
    })?
    .clone();

  let column = |name: &str| -> Option<usize> {
    headers.iter().position(|h| h.eq_ignore_ascii_case(name))
  };

  let strain_col = column("strain").ok_or(PlateError::MissingColumn {
    path: path.to_string(),
    column: "Strain",
  })?;
  let well_col = column("well");
  let row_col = column("row");
  let col_col = column("col");
  let color_col = column("color");

  if well_col.is_none() && (row_col.is_none() || col_col.is_none()) {
    return Err(PlateError::MissingColumn {
      path: path.to_string(),
      column: "Well (or Row and Col)",
    });
  }

  let mut wells = Vec::new();
  for record in csv_reader.records() {
    let record = record.map_err(|e| PlateError::Csv {
      path: path.to_string(),
      source: e,
    })?;

    let field = |idx: usize| record.get(idx).unwrap_or("").trim();

    let well = match well_col {
      Some(idx) => field(idx).to_string(),
      // Checked above: row_col and col_col are both present here.
      None => format!("{}{}", field(row_col.unwrap_or(0)), field(col_col.unwrap_or(0))),
    };
    if well.is_empty() {
      continue;
    }

    let strain = field(strain_col).to_string();
    let color = color_col
      .map(|idx| field(idx).to_string())
      .filter(|c| !c.is_empty());

    wells.push(PlateWell { well, strain, color });
  }

  if wells.is_empty() {
    return Err(PlateError::Empty {
      path: path.to_string(),
    });
  }

  Ok(Plate { wells })
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn default_checkerboard_resolves_and_loads() {
    let source = find_plate_file(Path::new(DEFAULT_TEMPLATE_FOLDER), "checkerboard.csv").unwrap();

    let plate = load_plate(&source).unwrap();
    assert_eq!(plate.wells.len(), 96);

    let mut strains = plate.strains();
    strains.sort_unstable();
    assert_eq!(strains, vec!["0", "1", "2"]);
  }

  #[test]
  fn bundled_templates_parse_to_full_plates() {
    for (name, contents) in BUNDLED_TEMPLATES.iter().copied() {
      let plate = parse_plate_csv(contents.as_bytes(), name).unwrap();
      assert_eq!(plate.wells.len(), 96, "{name}");
    }
  }

  #[test]
  fn unknown_plate_file_is_not_found() {
    let err = find_plate_file(Path::new(DEFAULT_TEMPLATE_FOLDER), "no-such.csv").unwrap_err();
    assert!(matches!(err, PlateError::NotFound { .. }));
  }

  #[test]
  fn parses_well_column_schema() {
    let csv = "Well,Strain,Color\nA1,0,\nA2,1,#4c72b0\n";
    let plate = parse_plate_csv(csv.as_bytes(), "inline").unwrap();
    assert_eq!(plate.wells.len(), 2);
    assert_eq!(plate.wells[1].well, "A2");
    assert_eq!(plate.color_of("1"), Some("#4c72b0"));
    assert_eq!(plate.color_of("0"), None);
  }

  #[test]
  fn derives_well_from_row_and_col() {
    let csv = "Row,Col,Strain\nB,7,2\n";
    let plate = parse_plate_csv(csv.as_bytes(), "inline").unwrap();
    assert_eq!(plate.wells[0].well, "B7");
    assert_eq!(plate.wells[0].strain, "2");
  }

  #[test]
  fn missing_strain_column_is_an_error() {
    let csv = "Well,Color\nA1,red\n";
    let err = parse_plate_csv(csv.as_bytes(), "inline").unwrap_err();
    assert!(matches!(err, PlateError::MissingColumn { column: "Strain", .. }));
  }

  #[test]
  fn roundtrip_preserves_rows_and_strains() {
    let csv = "Row,Col,Strain,Color\nA,1,0,\nA,2,1,red\nA,3,2,blue\n";
    let plate = parse_plate_csv(csv.as_bytes(), "inline").unwrap();

    let mut buffer = Vec::new();
    plate.write_csv(&mut buffer).unwrap();

    let reread = parse_plate_csv(buffer.as_slice(), "roundtrip").unwrap();
    assert_eq!(reread.wells.len(), plate.wells.len());
    assert_eq!(reread.strains(), plate.strains());
  }
}
