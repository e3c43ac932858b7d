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
use assert_cmd::Command;
use assert_cmd::cargo;
use predicates::prelude::*;
use std::fs;
use std::path::Path;
use tempfile::tempdir;

fn platefit() -> Command {
  let mut cmd = Command::new(cargo::cargo_bin!("platefit"));
  cmd.env("CLICOLOR", "0");
  cmd
}

fn logistic(t: f64, y0: f64, k: f64, r: f64) -> f64 {
  k / (1.0 + (k / y0 - 1.0) * (-r * t).exp())
}

/// Plate with blank strain 0, reference strain 1 and competitor strain 2,
/// two replicate wells each.
fn write_test_plate(path: &Path) {
  fs::write(
    path,
    "Well,Strain,Color\n\
     A1,0,\n\
     B1,0,\n\
     A2,1,#4c72b0\n\
     B2,1,#4c72b0\n\
     A3,2,#c44e52\n\
     B3,2,#c44e52\n",
  )
  .unwrap();
}

/// Long-form data file: constant blank baseline 0.05, logistic growth plus
/// baseline for strains 1 and 2 (strain 2 grows faster).
fn write_test_data(path: &Path) {
  let mut data = String::from("Well,Time,OD\n");
  for step in 0..=12 {
    let t = step as f64 * 2.0;
    for well in ["A1", "B1"] {
      data.push_str(&format!("{well},{t},0.05\n"));
    }
    for well in ["A2", "B2"] {
      data.push_str(&format!("{well},{t},{}\n", logistic(t, 0.02, 1.0, 0.8) + 0.05));
    }
    for well in ["A3", "B3"] {
      data.push_str(&format!("{well},{t},{}\n", logistic(t, 0.02, 1.0, 1.2) + 0.05));
    }
  }
  fs::write(path, data).unwrap();
}

fn read_output_rows(path: &Path) -> (String, Vec<Vec<String>>) {
  let contents = fs::read_to_string(path).unwrap();
  let mut lines = contents.lines();
  let header = lines.next().unwrap().to_string();
  let rows = lines
    .map(|line| line.split(',').map(str::to_string).collect())
    .collect();
  (header, rows)
}

#[test]
fn plate_dumps_bundled_template_to_stdout() {
  platefit()
    .arg("plate")
    .assert()
    .success()
    .stdout(predicate::str::starts_with("Well,Strain,Color"))
    .stdout(predicate::str::contains("A1,"))
    .stdout(predicate::str::contains("H12,"));
}

#[test]
fn plate_falls_back_to_bundled_template_outside_the_package() {
  // No plate_templates folder in the working directory, so the template
  // compiled into the binary must answer.
  let temp = tempdir().unwrap();
  platefit()
    .current_dir(temp.path())
    .arg("plate")
    .assert()
    .success()
    .stdout(predicate::str::starts_with("Well,Strain,Color"))
    .stdout(predicate::str::contains("H12,"));
}

#[test]
fn plate_roundtrip_preserves_strains_and_row_count() {
  let temp = tempdir().unwrap();
  let plate_path = temp.path().join("layout.csv");
  write_test_plate(&plate_path);
  let out_path = temp.path().join("replayed.csv");

  platefit()
    .arg("plate")
    .arg("--plate_folder")
    .arg(temp.path())
    .arg("--plate_file")
    .arg("layout.csv")
    .arg("-o")
    .arg(&out_path)
    .assert()
    .success();

  let (header, rows) = read_output_rows(&out_path);
  assert_eq!(header, "Well,Strain,Color");
  assert_eq!(rows.len(), 6);

  let mut strains: Vec<&str> = rows.iter().map(|r| r[1].as_str()).collect();
  strains.sort_unstable();
  strains.dedup();
  assert_eq!(strains, vec!["0", "1", "2"]);
}

#[test]
fn missing_plate_file_fails_with_a_hint() {
  platefit()
    .arg("plate")
    .arg("--plate_file")
    .arg("no-such-layout.csv")
    .assert()
    .failure()
    .stderr(predicate::str::contains("Can't find plate file"));
}

#[test]
fn analyse_without_matching_data_files_fails() {
  let temp = tempdir().unwrap();
  fs::write(temp.path().join("notes.txt"), "not a data file").unwrap();
  let out_path = temp.path().join("results.csv");

  platefit()
    .arg("analyse")
    .arg(temp.path())
    .arg("-o")
    .arg(&out_path)
    .arg("--no-plot")
    .arg("--no-prompt")
    .assert()
    .failure()
    .stderr(predicate::str::contains("No data files found"));

  assert!(!out_path.exists());
}

#[test]
fn analyse_rejects_matching_blank_and_reference_strains() {
  let temp = tempdir().unwrap();

  platefit()
    .arg("analyse")
    .arg(temp.path())
    .arg("--blank_strain")
    .arg("1")
    .arg("--ref_strain")
    .arg("1")
    .assert()
    .failure()
    .stderr(predicate::str::contains("must differ"));
}

#[test]
fn analyse_declined_confirmation_aborts() {
  let temp = tempdir().unwrap();
  write_test_plate(&temp.path().join("layout.csv"));
  write_test_data(&temp.path().join("growth.csv"));

  platefit()
    .arg("analyse")
    .arg(temp.path())
    .arg("--plate_folder")
    .arg(temp.path())
    .arg("--plate_file")
    .arg("layout.csv")
    .arg("--prompt")
    .arg("--no-plot")
    .write_stdin("n\n")
    .assert()
    .failure()
    .stderr(predicate::str::contains("aborting"));
}

#[test]
fn analyse_end_to_end_computes_fitness_against_the_reference() {
  let temp = tempdir().unwrap();
  let data_dir = temp.path().join("data");
  fs::create_dir(&data_dir).unwrap();
  write_test_plate(&temp.path().join("layout.csv"));
  write_test_data(&data_dir.join("growth.csv"));
  let out_path = temp.path().join("results.csv");

  platefit()
    .arg("analyse")
    .arg(&data_dir)
    .arg("--plate_folder")
    .arg(temp.path())
    .arg("--plate_file")
    .arg("layout.csv")
    .arg("-o")
    .arg(&out_path)
    .arg("--no-plot")
    .arg("--no-prompt")
    .assert()
    .success();

  let (header, rows) = read_output_rows(&out_path);
  assert_eq!(
    header,
    "folder,filename,strain,model,RSS,bic,aic,benchmark,y0,K,r,nu,q0,v,max_growth_rate,lag,has_lag,has_nu,w"
  );

  // Blank strain 0 is excluded; the reference strain comes first.
  assert_eq!(rows.len(), 2);
  assert_eq!(rows[0][2], "1");
  assert_eq!(rows[1][2], "2");

  let w_reference: f64 = rows[0][18].parse().unwrap();
  assert_eq!(w_reference, 1.0);

  // Strain 2 grows faster than the reference, so it wins the competition.
  let w_competitor: f64 = rows[1][18].parse().unwrap();
  assert!(w_competitor.is_finite());
  assert!(w_competitor > 1.0, "w = {w_competitor}");

  // Fitted carrying capacity should be close to the simulated one.
  let k_reference: f64 = rows[0][9].parse().unwrap();
  assert!((k_reference - 1.0).abs() < 0.1, "K = {k_reference}");

  // --no-plot must not leave any artifacts behind.
  assert!(!data_dir.join("growth_wells.png").exists());
}

#[test]
fn analyse_missing_reference_leaves_fitness_unset() {
  let temp = tempdir().unwrap();
  let data_dir = temp.path().join("data");
  fs::create_dir(&data_dir).unwrap();
  write_test_plate(&temp.path().join("layout.csv"));
  write_test_data(&data_dir.join("growth.csv"));
  let out_path = temp.path().join("results.csv");

  platefit()
    .arg("analyse")
    .arg(&data_dir)
    .arg("--plate_folder")
    .arg(temp.path())
    .arg("--plate_file")
    .arg("layout.csv")
    .arg("-o")
    .arg(&out_path)
    .arg("--ref_strain")
    .arg("9")
    .arg("--no-plot")
    .arg("--no-prompt")
    .assert()
    .success();

  let (_, rows) = read_output_rows(&out_path);
  assert_eq!(rows.len(), 2);
  for row in &rows {
    assert_eq!(row[18], "", "no reference strain, so no fitness value");
  }
}

#[test]
fn analyse_writes_plot_artifacts_when_plotting_is_enabled() {
  let temp = tempdir().unwrap();
  let data_dir = temp.path().join("data");
  fs::create_dir(&data_dir).unwrap();
  write_test_plate(&temp.path().join("layout.csv"));
  write_test_data(&data_dir.join("growth.csv"));
  let out_path = temp.path().join("results.csv");

  platefit()
    .arg("analyse")
    .arg(&data_dir)
    .arg("--plate_folder")
    .arg(temp.path())
    .arg("--plate_file")
    .arg("layout.csv")
    .arg("-o")
    .arg(&out_path)
    .arg("--no-prompt")
    .assert()
    .success();

  for artifact in [
    "growth_wells.png",
    "growth_strains.png",
    "growth_strain_1.png",
    "growth_strain_2.png",
    "growth_2_vs_1.png",
  ] {
    assert!(data_dir.join(artifact).exists(), "missing {artifact}");
  }
}

#[test]
fn analyse_accepts_a_glob_pattern() {
  let temp = tempdir().unwrap();
  write_test_plate(&temp.path().join("layout.csv"));
  write_test_data(&temp.path().join("growth.csv"));
  let out_path = temp.path().join("results.csv");

  let pattern = temp.path().join("growth*.csv");
  platefit()
    .arg("analyse")
    .arg(pattern.to_str().unwrap())
    .arg("--plate_folder")
    .arg(temp.path())
    .arg("--plate_file")
    .arg("layout.csv")
    .arg("-o")
    .arg(&out_path)
    .arg("--no-plot")
    .arg("--no-prompt")
    .assert()
    .success();

  let (_, rows) = read_output_rows(&out_path);
  assert_eq!(rows.len(), 2);
}
