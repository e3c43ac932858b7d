use crate::analysis::FitSummary;
use crate::analysis::Trajectory;
use crate::readings::ReadingsTable;
use anyhow::Result;
use plotters::chart::ChartContext;
use plotters::coord::Shift;
use plotters::coord::cartesian::Cartesian2d;
use plotters::coord::types::RangedCoordf64;
use plotters::prelude::*;
use std::path::Path;

// All plots are text-free (bitmap backend without font features), fixed-size
// PNG artifacts written next to the input data file.
const PLOT_SIZE: (u32, u32) = (800, 600);

/// One line per well, raw OD over time.
pub fn plot_wells(readings: &ReadingsTable, output: &Path) -> Result<()> {
  let mut wells: Vec<&str> = Vec::new();
  for row in &readings.rows {
    if !wells.contains(&row.well.as_str()) {
      wells.push(&row.well);
    }
  }

  let root = BitMapBackend::new(output, PLOT_SIZE).into_drawing_area();
  root.fill(&WHITE)?;
  let mut chart = chart_for(&root, readings)?;

  for (idx, well) in wells.iter().enumerate() {
    let series: Vec<(f64, f64)> = readings
      .rows
      .iter()
      .filter(|r| r.well == *well)
      .map(|r| (r.time, r.od))
      .collect();
    chart.draw_series(LineSeries::new(series, Palette99::pick(idx)))?;
  }

  root.present()?;
  Ok(())
}

/// Mean OD per strain over time.
pub fn plot_strains(readings: &ReadingsTable, output: &Path) -> Result<()> {
  let root = BitMapBackend::new(output, PLOT_SIZE).into_drawing_area();
  root.fill(&WHITE)?;
  let mut chart = chart_for(&root, readings)?;

  for (idx, strain) in readings.strains().iter().enumerate() {
    let subset = readings.subset(strain);
    let color = subset
      .rows
      .iter()
      .find_map(|r| r.color.as_deref().and_then(parse_color))
      .unwrap_or_else(|| Palette99::pick(idx).to_rgba());
    chart.draw_series(LineSeries::new(mean_by_time(&subset), color))?;
  }

  root.present()?;
  Ok(())
}

/// Observed points for one strain plus its fitted curve.
pub fn plot_fit(readings: &ReadingsTable, summary: &FitSummary, output: &Path) -> Result<()> {
  let root = BitMapBackend::new(output, PLOT_SIZE).into_drawing_area();
  root.fill(&WHITE)?;
  let mut chart = chart_for(&root, readings)?;

  chart.draw_series(
    readings
      .rows
      .iter()
      .map(|r| Circle::new((r.time, r.od), 2, BLUE.filled())),
  )?;

  let t_max = readings.max_time();
  let fitted: Vec<(f64, f64)> = (0..=200)
    .map(|i| {
      let t = t_max * i as f64 / 200.0;
      (t, summary.params.predict(t))
    })
    .collect();
  chart.draw_series(LineSeries::new(fitted, RED.stroke_width(2)))?;

  root.present()?;
  Ok(())
}

/// Competition trajectory: assay strain vs reference strain, colored by the
/// plate's group colors when present.
pub fn plot_competition(
  trajectory: &Trajectory,
  colors: (Option<&str>, Option<&str>),
  output: &Path,
) -> Result<()> {
  let root = BitMapBackend::new(output, PLOT_SIZE).into_drawing_area();
  root.fill(&WHITE)?;

  let t_max = trajectory.time.last().copied().unwrap_or(1.0);
  let y_max = trajectory
    .assay
    .iter()
    .chain(&trajectory.reference)
    .copied()
    .fold(f64::MIN_POSITIVE, f64::max);

  let mut chart = ChartBuilder::on(&root)
    .margin(10)
    .build_cartesian_2d(0.0..t_max.max(1e-9), 0.0..y_max * 1.05)?;

  let assay_color = colors.0.and_then(parse_color).unwrap_or(BLUE.to_rgba());
  let reference_color = colors.1.and_then(parse_color).unwrap_or(RED.to_rgba());

  let pairs = |values: &[f64]| -> Vec<(f64, f64)> {
    trajectory.time.iter().copied().zip(values.iter().copied()).collect()
  };
  chart.draw_series(LineSeries::new(pairs(&trajectory.assay), assay_color.stroke_width(2)))?;
  chart.draw_series(LineSeries::new(
    pairs(&trajectory.reference),
    reference_color.stroke_width(2),
  ))?;

  root.present()?;
  Ok(())
}

fn chart_for<'a, DB: DrawingBackend>(
  root: &'a DrawingArea<DB, Shift>,
  readings: &ReadingsTable,
) -> Result<ChartContext<'a, DB, Cartesian2d<RangedCoordf64, RangedCoordf64>>>
where
  DB::ErrorType: 'static,
{
  let t_max = readings.max_time().max(1e-9);
  let od_max = readings
    .rows
    .iter()
    .map(|r| r.od)
    .fold(f64::MIN_POSITIVE, f64::max);

  Ok(
    ChartBuilder::on(root)
      .margin(10)
      .build_cartesian_2d(0.0..t_max, 0.0..od_max * 1.05)?,
  )
}

fn mean_by_time(readings: &ReadingsTable) -> Vec<(f64, f64)> {
  let mut by_time: Vec<(f64, f64, usize)> = Vec::new();
  for row in &readings.rows {
    match by_time.iter_mut().find(|(t, _, _)| *t == row.time) {
      Some((_, sum, count)) => {
        *sum += row.od;
        *count += 1;
      }
      None => by_time.push((row.time, row.od, 1)),
    }
  }
  by_time.sort_by(|a, b| a.0.total_cmp(&b.0));
  by_time
    .into_iter()
    .map(|(t, sum, count)| (t, sum / count as f64))
    .collect()
}

/// Maps a plate color cell to an RGB color: `#rrggbb` hex or a small set of
/// named colors.
fn parse_color(value: &str) -> Option<RGBAColor> {
  let value = value.trim();
  if let Some(hex) = value.strip_prefix('#') {
    // Cells come straight from the plate file; slicing a multi-byte
    // character would panic.
    if hex.len() != 6 || !hex.is_ascii() {
      return None;
    }
    let r = u8::from_str_radix(&hex[0..2], 16).ok()?;
    let g = u8::from_str_radix(&hex[2..4], 16).ok()?;
    let b = u8::from_str_radix(&hex[4..6], 16).ok()?;
    return Some(RGBColor(r, g, b).to_rgba());
  }

  let named = match value.to_ascii_lowercase().as_str() {
    "red" => RED,
    "green" => GREEN,
    "blue" => BLUE,
    "black" => BLACK,
    "yellow" => YELLOW,
    "magenta" => MAGENTA,
    "cyan" => CYAN,
    "white" => WHITE,
    _ => return None,
  };
  Some(named.to_rgba())
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::readings::Reading;

  fn sample_readings() -> ReadingsTable {
    ReadingsTable {
      rows: (0..10)
        .map(|t| Reading {
          well: "A1".to_string(),
          strain: "1".to_string(),
          time: t as f64,
          od: 0.1 * t as f64,
          color: Some("#4c72b0".to_string()),
        })
        .collect(),
    }
  }

  #[test]
  fn wells_plot_writes_a_png() {
    let dir = tempfile::tempdir().unwrap();
    let out = dir.path().join("wells.png");
    plot_wells(&sample_readings(), &out).unwrap();
    assert!(out.exists());
  }

  #[test]
  fn color_parsing_accepts_hex_and_names() {
    assert_eq!(parse_color("#ff0000"), Some(RED.to_rgba()));
    assert_eq!(parse_color("Red"), Some(RED.to_rgba()));
    assert_eq!(parse_color("#zzz"), None);
    // Six bytes but not six ASCII hex digits.
    assert_eq!(parse_color("#€€"), None);
    assert_eq!(parse_color("chartreuse-ish"), None);
  }

  #[test]
  fn mean_by_time_averages_replicate_wells() {
    let mut readings = sample_readings();
    readings.rows.push(Reading {
      well: "A2".to_string(),
      strain: "1".to_string(),
      time: 0.0,
      od: 0.2,
      color: None,
    });
    let means = mean_by_time(&readings);
    assert_eq!(means[0], (0.0, 0.1));
  }
}
