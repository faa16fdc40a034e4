//! Artifact writers.
//!
//! This module renders one [`ExportBundle`] three ways:
//! - JSON: a single structured document with schema and data
//! - CSV: one flat file per table plus an index file
//! - XLSX: one workbook with an index sheet and one sheet per table

mod csv;
mod json;
mod naming;
mod types;
mod xlsx;

use std::path::Path;

use crate::error_handling::ExportError;

pub use self::csv::export_flat_files;
pub use json::export_structured_document;
pub use naming::{csv_file_name, sheet_name};
pub use types::{ArtifactPaths, ExportBundle, TableFailure, TableSnapshot};
pub use xlsx::{export_workbook, plan_workbook, IndexLine, WorkbookPlan};

/// Writes the JSON document, the CSV directory and the workbook, in that order.
///
/// # Errors
///
/// Stops at the first artifact that cannot be written; artifacts already on
/// disk are left in place.
pub fn write_artifacts(bundle: &ExportBundle, output_dir: &Path) -> Result<ArtifactPaths, ExportError> {
    let json_file = export_structured_document(bundle, output_dir)?;
    let csv_dir = export_flat_files(bundle, output_dir)?;
    let workbook_file = export_workbook(bundle, output_dir)?;

    Ok(ArtifactPaths {
        json_file,
        csv_dir,
        workbook_file,
    })
}
