//! CSV export functionality.
//!
//! Writes one CSV file per table into a timestamped directory, plus an index
//! file listing every table. All type information is lost: every value is
//! written as text, NULL as the empty field.

use std::collections::{HashMap, HashSet};
use std::fs::{self, File, OpenOptions};
use std::path::{Path, PathBuf};

use csv::Writer;
use log::{error, info, warn};

use crate::config::CSV_INDEX_FILE;
use crate::error_handling::ExportError;
use crate::storage::{CellValue, Row, TableDescriptor};

use super::naming::{csv_dir_path, csv_file_name, ensure_absent, ensure_output_dir};
use super::types::ExportBundle;

const INDEX_HEADER: [&str; 4] = ["table_name", "row_count", "columns", "csv_file"];

/// Writes one table: header of column names, then every row.
fn write_table_csv(path: &Path, table: &TableDescriptor, rows: &[Row]) -> Result<(), ExportError> {
    let mut writer = create_writer(path)?;

    writer
        .write_record(table.column_names())
        .map_err(|e| ExportError::write(path, e))?;
    for row in rows {
        writer
            .write_record(row.values().map(CellValue::to_text))
            .map_err(|e| ExportError::write(path, e))?;
    }

    writer.flush().map_err(|e| ExportError::write(path, e))
}

/// Opens a CSV writer on a file that must not exist yet.
fn create_writer(path: &Path) -> Result<Writer<File>, ExportError> {
    let file = OpenOptions::new()
        .write(true)
        .create_new(true)
        .open(path)
        .map_err(|e| ExportError::write(path, e))?;
    Ok(Writer::from_writer(file))
}

/// Assigns each readable table its own file name.
///
/// Sanitizing can map different tables to one name (`a/b` and `a_b`), and
/// file systems may compare names case-insensitively, so later tables get a
/// numeric suffix (`a_b_2.csv`). The index file name is reserved.
fn assign_csv_files(bundle: &ExportBundle) -> HashMap<&str, String> {
    let mut used: HashSet<String> = HashSet::new();
    used.insert(CSV_INDEX_FILE.to_lowercase());

    let mut files = HashMap::new();
    for (snapshot, _) in bundle.readable_tables() {
        let base = csv_file_name(snapshot.name());
        let mut file = base.clone();
        let mut n = 2;
        while !used.insert(file.to_lowercase()) {
            let stem = base.strip_suffix(".csv").unwrap_or(&base);
            file = format!("{}_{}.csv", stem, n);
            n += 1;
        }
        if file != base {
            warn!(
                "{}: file name {} already taken, writing {}",
                snapshot.name(),
                base,
                file
            );
        }
        files.insert(snapshot.name(), file);
    }
    files
}

/// Writes the index: one line per described table.
///
/// `csv_file` is empty for tables whose file was not written.
fn write_index_csv(
    path: &Path,
    bundle: &ExportBundle,
    written: &HashMap<&str, String>,
) -> Result<(), ExportError> {
    let mut writer = create_writer(path)?;

    writer
        .write_record(INDEX_HEADER)
        .map_err(|e| ExportError::write(path, e))?;
    for snapshot in &bundle.tables {
        let name = snapshot.name();
        let csv_file = written.get(name).cloned().unwrap_or_default();
        writer
            .write_record([
                name.to_string(),
                snapshot.descriptor.row_count.to_string(),
                snapshot.descriptor.columns.len().to_string(),
                csv_file,
            ])
            .map_err(|e| ExportError::write(path, e))?;
    }

    writer.flush().map_err(|e| ExportError::write(path, e))
}

/// Exports every readable table to its own CSV file.
///
/// # Returns
///
/// The directory holding the files (`<output_dir>/csv_<timestamp>`).
///
/// # Errors
///
/// Returns `ExportError::Write` if the directory or the index file cannot be
/// written. A failure on one table's file is logged and that table is skipped.
pub fn export_flat_files(bundle: &ExportBundle, output_dir: &Path) -> Result<PathBuf, ExportError> {
    info!("Exporting to CSV...");
    ensure_output_dir(output_dir)?;
    let dir = csv_dir_path(output_dir, bundle);
    ensure_absent(&dir)?;
    fs::create_dir(&dir).map_err(|e| ExportError::write(&dir, e))?;

    let mut files = assign_csv_files(bundle);
    for (snapshot, rows) in bundle.readable_tables() {
        let Some(file) = files.get(snapshot.name()).cloned() else {
            continue;
        };
        let path = dir.join(&file);
        match write_table_csv(&path, &snapshot.descriptor, rows) {
            Ok(()) => info!("{}: {} rows written to {}", snapshot.name(), rows.len(), file),
            Err(e) => {
                error!("Skipping CSV for {}: {}", snapshot.name(), e);
                files.remove(snapshot.name());
            }
        }
    }

    let index_path = dir.join(CSV_INDEX_FILE);
    write_index_csv(&index_path, bundle, &files)?;

    info!("CSVs exported in: {}", dir.display());
    info!("Index file: {}", index_path.display());
    Ok(dir)
}
