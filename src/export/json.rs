//! Structured document export.
//!
//! Writes one UTF-8 JSON file holding the whole bundle:
//!
//! ```json
//! {
//!   "export_info": { "timestamp": "...", "total_tables": 2, "format": "complete_json_export", ... },
//!   "schema": { "<table>": { "columns": [...], "row_count": 3 } },
//!   "data": { "<table>": [ { "<column>": <value>, ... } ] }
//! }
//! ```
//!
//! Values with no native JSON type (dates, numerics, bytes) are written as text.

use std::fs::OpenOptions;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use log::info;
use serde::ser::{SerializeMap, Serializer};
use serde::Serialize;

use crate::config::JSON_FORMAT_TAG;
use crate::error_handling::ExportError;

use super::naming::{ensure_output_dir, json_path};
use super::types::ExportBundle;

#[derive(Serialize)]
struct ExportInfo<'a> {
    timestamp: &'a str,
    total_tables: usize,
    format: &'static str,
    total_records: usize,
    skipped_tables: Vec<&'a str>,
}

/// Table name → descriptor, for every described table.
struct SchemaSection<'a>(&'a ExportBundle);

impl Serialize for SchemaSection<'_> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.0.tables.len()))?;
        for snapshot in &self.0.tables {
            map.serialize_entry(snapshot.name(), &snapshot.descriptor)?;
        }
        map.end()
    }
}

/// Table name → rows, for every table read successfully.
struct DataSection<'a>(&'a ExportBundle);

impl Serialize for DataSection<'_> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(None)?;
        for (snapshot, rows) in self.0.readable_tables() {
            map.serialize_entry(snapshot.name(), rows)?;
        }
        map.end()
    }
}

#[derive(Serialize)]
struct StructuredDocument<'a> {
    export_info: ExportInfo<'a>,
    schema: SchemaSection<'a>,
    data: DataSection<'a>,
}

impl<'a> StructuredDocument<'a> {
    fn new(bundle: &'a ExportBundle) -> Self {
        Self {
            export_info: ExportInfo {
                timestamp: &bundle.timestamp,
                total_tables: bundle.listed_tables,
                format: JSON_FORMAT_TAG,
                total_records: bundle.total_rows(),
                skipped_tables: bundle.skipped_tables(),
            },
            schema: SchemaSection(bundle),
            data: DataSection(bundle),
        }
    }
}

/// Exports the bundle to a single pretty-printed JSON document.
///
/// # Returns
///
/// The path of the written file (`<output_dir>/<name>_<timestamp>.json`).
///
/// # Errors
///
/// Returns `ExportError::Write` if the output directory cannot be created, the
/// file already exists, or writing fails.
pub fn export_structured_document(
    bundle: &ExportBundle,
    output_dir: &Path,
) -> Result<PathBuf, ExportError> {
    info!("Exporting to JSON...");
    ensure_output_dir(output_dir)?;
    let path = json_path(output_dir, bundle);

    let file = OpenOptions::new()
        .write(true)
        .create_new(true)
        .open(&path)
        .map_err(|e| ExportError::write(&path, e))?;
    let mut writer = BufWriter::new(file);

    // to_writer_pretty indents by two spaces and leaves non-ASCII unescaped
    serde_json::to_writer_pretty(&mut writer, &StructuredDocument::new(bundle))
        .map_err(|e| ExportError::write(&path, e))?;
    writer.flush().map_err(|e| ExportError::write(&path, e))?;

    info!("JSON exported: {}", path.display());
    info!("Total records: {}", bundle.total_rows());
    Ok(path)
}
