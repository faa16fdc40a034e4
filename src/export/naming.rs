//! Artifact paths and the names derived from table names.
//!
//! Every artifact path carries the run timestamp, and no writer ever replaces
//! an existing artifact.

use std::fs;
use std::path::{Path, PathBuf};

use crate::config::{CSV_DIR_PREFIX, MAX_SHEET_NAME_CHARS};
use crate::error_handling::ExportError;

use super::types::ExportBundle;

/// `<dir>/<name>_<timestamp>.json`
pub fn json_path(output_dir: &Path, bundle: &ExportBundle) -> PathBuf {
    output_dir.join(format!("{}_{}.json", bundle.name, bundle.timestamp))
}

/// `<dir>/csv_<timestamp>`
pub fn csv_dir_path(output_dir: &Path, bundle: &ExportBundle) -> PathBuf {
    output_dir.join(format!("{}{}", CSV_DIR_PREFIX, bundle.timestamp))
}

/// `<dir>/<name>_<timestamp>.xlsx`
pub fn workbook_path(output_dir: &Path, bundle: &ExportBundle) -> PathBuf {
    output_dir.join(format!("{}_{}.xlsx", bundle.name, bundle.timestamp))
}

/// Sheet name for a table: the first 31 characters of its name.
///
/// Two tables sharing a 31-character prefix get the same sheet name.
pub fn sheet_name(table: &str) -> String {
    table.chars().take(MAX_SHEET_NAME_CHARS).collect()
}

/// CSV file name for a table, with characters file systems reject replaced by `_`.
pub fn csv_file_name(table: &str) -> String {
    let stem: String = table
        .chars()
        .map(|c| match c {
            '/' | '\\' | ':' | '*' | '?' | '"' | '<' | '>' | '|' => '_',
            c if c.is_control() => '_',
            c => c,
        })
        .collect();
    format!("{}.csv", stem)
}

/// Creates the output directory (and parents) if absent.
pub fn ensure_output_dir(output_dir: &Path) -> Result<(), ExportError> {
    fs::create_dir_all(output_dir).map_err(|e| ExportError::write(output_dir, e))
}

/// Refuses to reuse a path that already exists.
pub fn ensure_absent(path: &Path) -> Result<(), ExportError> {
    if path.exists() {
        return Err(ExportError::write(
            path,
            "already exists; artifacts are never overwritten",
        ));
    }
    Ok(())
}
