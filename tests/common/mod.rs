#![allow(dead_code)]

use std::fs::File;
use std::io::Write;
use std::path::{Path, PathBuf};

use pathway_extract::sheet::{Cell, SourceSheet};
use tempfile::{TempDir, tempdir};

/// Header of the `Database` layout: metadata in A..H, years from column I.
pub const HEADER: &[&str] = &[
    "Model", "Scenario", "Sheet", "Region", "Flow", "Unit", "Table", "Sector", "2020", "2021",
];

/// Returns the absolute path to a fixture under `tests/data`.
pub fn fixture_path(name: &str) -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("tests")
        .join("data")
        .join(name)
}

/// Builds an in-memory sheet, classifying each field the way a CSV export is.
pub fn sheet(rows: &[&[&str]]) -> SourceSheet {
    SourceSheet::new(
        "Database",
        rows.iter()
            .map(|row| row.iter().map(|value| Cell::from_text(value)).collect())
            .collect(),
    )
}

/// Data row in the `Database` layout with the given metadata and year values.
pub fn data_row<'a>(
    scenario: &'a str,
    region: &'a str,
    metric: &'a str,
    unit: &'a str,
    sector: &'a str,
    values: &[&'a str],
) -> Vec<&'a str> {
    let mut row = vec!["ETP", scenario, "", region, metric, unit, "", sector];
    row.extend_from_slice(values);
    row
}

/// Scratch directory helper that cleans up files automatically on drop.
pub struct TestWorkspace {
    temp_dir: TempDir,
}

impl TestWorkspace {
    /// Creates a fresh scratch directory for the current test case.
    pub fn new() -> Self {
        Self {
            temp_dir: tempdir().expect("temp dir"),
        }
    }

    /// Returns the root path for all files owned by this workspace.
    pub fn path(&self) -> &Path {
        self.temp_dir.path()
    }

    /// Writes `contents` into a file under the workspace and returns the path.
    pub fn write(&self, name: &str, contents: &str) -> PathBuf {
        let path = self.temp_dir.path().join(name);
        let mut file = File::create(&path).expect("create temp file");
        file.write_all(contents.as_bytes())
            .expect("write temp file contents");
        path
    }

    /// Writes `rows` as a comma-separated sheet export.
    pub fn write_sheet(&self, name: &str, rows: &[&[&str]]) -> PathBuf {
        let contents = rows
            .iter()
            .map(|row| row.join(","))
            .collect::<Vec<_>>()
            .join("\n");
        self.write(name, &format!("{contents}\n"))
    }
}
