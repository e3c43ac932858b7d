use crate::error::DiscoverError;
use std::path::Path;
use std::path::PathBuf;

/// Enumerates candidate data files and filters them by recognized extension.
///
/// A directory is listed directly; anything else is expanded as a glob
/// pattern. The surviving paths are sorted so output row order does not
/// depend on filesystem enumeration order.
pub fn discover(path: &str, recognized: &[&str]) -> Result<Vec<PathBuf>, DiscoverError> {
  let candidates = if Path::new(path).is_dir() {
    list_directory(Path::new(path))?
  } else {
    expand_pattern(path)?
  };

  let mut files: Vec<PathBuf> = candidates
    .into_iter()
    .filter(|p| p.is_file() && has_recognized_extension(p, recognized))
    .collect();
  files.sort();

  if files.is_empty() {
    return Err(DiscoverError::NoDataFiles {
      path: path.to_string(),
    });
  }

  Ok(files)
}

fn list_directory(dir: &Path) -> Result<Vec<PathBuf>, DiscoverError> {
  let entries = std::fs::read_dir(dir).map_err(|e| DiscoverError::ReadDir {
    path: dir.to_path_buf(),
    source: e,
  })?;

  let mut paths = Vec::new();
  for entry in entries {
    let entry = entry.map_err(|e| DiscoverError::ReadDir {
      path: dir.to_path_buf(),
      source: e,
    })?;
    paths.push(entry.path());
  }
  Ok(paths)
}

fn expand_pattern(pattern: &str) -> Result<Vec<PathBuf>, DiscoverError> {
  let matches = glob::glob(pattern).map_err(|e| DiscoverError::Pattern {
    pattern: pattern.to_string(),
    source: e,
  })?;

  // Unreadable matches are skipped rather than failing the whole run.
  Ok(
    matches
      .filter_map(|entry| match entry {
        Ok(path) => Some(path),
        Err(e) => {
          tracing::warn!(error = %e, "Skipping unreadable glob match");
          None
        }
      })
      .collect(),
  )
}

fn has_recognized_extension(path: &Path, recognized: &[&str]) -> bool {
  path
    .extension()
    .and_then(|ext| ext.to_str())
    .map(|ext| {
      let ext = ext.to_ascii_lowercase();
      recognized.iter().any(|r| *r == ext)
    })
    .unwrap_or(false)
}

#[cfg(test)]
mod tests {
  use super::*;
  use std::fs;

  const RECOGNIZED: &[&str] = &["csv", "tsv"];

  #[test]
  fn directory_listing_keeps_only_recognized_extensions() {
    let dir = tempfile::tempdir().unwrap();
    fs::write(dir.path().join("a.csv"), "x").unwrap();
    fs::write(dir.path().join("b.TSV"), "x").unwrap();
    fs::write(dir.path().join("notes.txt"), "x").unwrap();
    fs::write(dir.path().join("noext"), "x").unwrap();
    fs::create_dir(dir.path().join("sub.csv")).unwrap();

    let files = discover(dir.path().to_str().unwrap(), RECOGNIZED).unwrap();
    let names: Vec<_> = files
      .iter()
      .map(|p| p.file_name().unwrap().to_str().unwrap())
      .collect();
    assert_eq!(names, vec!["a.csv", "b.TSV"]);
  }

  #[test]
  fn glob_pattern_expands_and_sorts() {
    let dir = tempfile::tempdir().unwrap();
    fs::write(dir.path().join("z.csv"), "x").unwrap();
    fs::write(dir.path().join("a.csv"), "x").unwrap();

    let pattern = dir.path().join("*.csv");
    let files = discover(pattern.to_str().unwrap(), RECOGNIZED).unwrap();
    assert_eq!(files.len(), 2);
    assert!(files[0].ends_with("a.csv"));
    assert!(files[1].ends_with("z.csv"));
  }

  #[test]
  fn empty_match_is_an_error() {
    let dir = tempfile::tempdir().unwrap();
    fs::write(dir.path().join("notes.txt"), "x").unwrap();

    let err = discover(dir.path().to_str().unwrap(), RECOGNIZED).unwrap_err();
    assert!(matches!(err, DiscoverError::NoDataFiles { .. }));
  }
}
