//! Workbook export functionality.
//!
//! One workbook per run: the index sheet first, then one sheet per table named
//! after the table truncated to the 31-character sheet-name limit. Values are
//! coerced to the closest cell type:
//! - NULL → empty cell
//! - booleans → boolean cells
//! - integers within ±2^53 and finite floats → number cells
//! - everything else → string cells, cut at the 32,767-character cell limit

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use log::{error, info, warn};
use rust_xlsxwriter::{Format, Workbook, Worksheet, XlsxError};

use crate::config::{
    INDEX_SHEET_NAME, MAX_CELL_CHARS, MAX_EXACT_NUMBER, MAX_SHEET_COLUMNS, MAX_SHEET_ROWS,
};
use crate::error_handling::ExportError;
use crate::storage::{CellValue, Row};

use super::naming::{ensure_absent, ensure_output_dir, sheet_name, workbook_path};
use super::types::{ExportBundle, TableSnapshot};

const INDEX_HEADER: [&str; 4] = ["table", "row_count", "columns", "sheet"];

/// One line of the index sheet.
#[derive(Debug, Clone, PartialEq)]
pub struct IndexLine {
    pub table: String,
    pub row_count: i64,
    pub columns: usize,
    /// Truncated sheet name recorded for the table
    pub sheet: String,
}

/// A table sheet to build.
#[derive(Debug)]
pub struct PlannedSheet<'a> {
    pub sheet: String,
    pub snapshot: &'a TableSnapshot,
    pub rows: &'a [Row],
}

/// Sheet layout of the workbook, decided before anything is written.
#[derive(Debug, Default)]
pub struct WorkbookPlan<'a> {
    /// Index lines, one per described table
    pub index: Vec<IndexLine>,
    /// Table sheets, in table order
    pub sheets: Vec<PlannedSheet<'a>>,
    /// Tables dropped because their truncated name was already taken
    pub collisions: Vec<String>,
}

/// Lays out the workbook for `bundle`.
///
/// Sheet names are compared case-insensitively, as spreadsheet applications do.
/// A table whose truncated name is already used keeps its index line but gets
/// no sheet.
pub fn plan_workbook(bundle: &ExportBundle) -> WorkbookPlan<'_> {
    let mut plan = WorkbookPlan::default();
    let mut used: HashSet<String> = HashSet::new();
    used.insert(INDEX_SHEET_NAME.to_lowercase());

    for snapshot in &bundle.tables {
        let sheet = sheet_name(snapshot.name());
        plan.index.push(IndexLine {
            table: snapshot.name().to_string(),
            row_count: snapshot.descriptor.row_count,
            columns: snapshot.descriptor.columns.len(),
            sheet: sheet.clone(),
        });

        let Some(rows) = snapshot.rows() else {
            continue;
        };
        if !used.insert(sheet.to_lowercase()) {
            plan.collisions.push(snapshot.name().to_string());
            continue;
        }
        plan.sheets.push(PlannedSheet {
            sheet,
            snapshot,
            rows,
        });
    }
    plan
}

/// Cuts text to the cell limit. Returns whether anything was cut.
fn clamp_cell_text(text: String) -> (String, bool) {
    match text.char_indices().nth(MAX_CELL_CHARS) {
        Some((cut, _)) => (text[..cut].to_string(), true),
        None => (text, false),
    }
}

/// Writes one value; returns whether its text had to be truncated.
fn write_cell(
    worksheet: &mut Worksheet,
    row: u32,
    col: u16,
    value: &CellValue,
) -> Result<bool, XlsxError> {
    match value {
        CellValue::Null => {}
        CellValue::Bool(b) => {
            worksheet.write_boolean(row, col, *b)?;
        }
        CellValue::Integer(i) if i.unsigned_abs() <= MAX_EXACT_NUMBER => {
            worksheet.write_number(row, col, *i as f64)?;
        }
        CellValue::Float(f) if f.is_finite() => {
            worksheet.write_number(row, col, *f)?;
        }
        other => {
            let (text, truncated) = clamp_cell_text(other.to_text());
            worksheet.write_string(row, col, text)?;
            return Ok(truncated);
        }
    }
    Ok(false)
}

fn build_index_sheet(plan: &WorkbookPlan<'_>, header: &Format) -> Result<Worksheet, XlsxError> {
    let mut worksheet = Worksheet::new();
    worksheet.set_name(INDEX_SHEET_NAME)?;

    for (col, title) in INDEX_HEADER.iter().enumerate() {
        worksheet.write_string_with_format(0, col as u16, *title, header)?;
    }
    for (line, row) in plan.index.iter().zip(1u32..) {
        worksheet.write_string(row, 0, line.table.as_str())?;
        worksheet.write_number(row, 1, line.row_count as f64)?;
        worksheet.write_number(row, 2, line.columns as f64)?;
        worksheet.write_string(row, 3, line.sheet.as_str())?;
    }
    Ok(worksheet)
}

fn build_table_sheet(
    planned: &PlannedSheet<'_>,
    header: &Format,
    workbook: &Path,
) -> Result<Worksheet, ExportError> {
    let descriptor = &planned.snapshot.descriptor;
    let sheet_error = |cause: &dyn std::fmt::Display| {
        ExportError::write(
            workbook,
            format!("sheet '{}' of table {}: {}", planned.sheet, descriptor.name, cause),
        )
    };

    if planned.rows.len() + 1 > MAX_SHEET_ROWS {
        return Err(sheet_error(&format!(
            "{} rows exceed the {} row sheet limit",
            planned.rows.len(),
            MAX_SHEET_ROWS - 1
        )));
    }
    if descriptor.columns.len() > MAX_SHEET_COLUMNS {
        return Err(sheet_error(&format!(
            "{} columns exceed the {} column sheet limit",
            descriptor.columns.len(),
            MAX_SHEET_COLUMNS
        )));
    }

    let mut worksheet = Worksheet::new();
    worksheet
        .set_name(planned.sheet.as_str())
        .map_err(|e| sheet_error(&e))?;

    for (col, column) in descriptor.columns.iter().enumerate() {
        worksheet
            .write_string_with_format(0, col as u16, column.name.as_str(), header)
            .map_err(|e| sheet_error(&e))?;
    }

    let mut truncated_cells = 0usize;
    for (row, data_row) in (1u32..).zip(planned.rows) {
        for (col, value) in data_row.values().enumerate() {
            if write_cell(&mut worksheet, row, col as u16, value).map_err(|e| sheet_error(&e))? {
                truncated_cells += 1;
            }
        }
    }
    if truncated_cells > 0 {
        warn!(
            "{}: {} cells truncated to {} characters",
            descriptor.name, truncated_cells, MAX_CELL_CHARS
        );
    }

    Ok(worksheet)
}

/// Exports the bundle to one multi-sheet workbook.
///
/// # Returns
///
/// The path of the written workbook (`<output_dir>/<name>_<timestamp>.xlsx`).
///
/// # Errors
///
/// Returns `ExportError::Write` if the workbook cannot be saved. A table whose
/// sheet cannot be built is logged and left out.
pub fn export_workbook(bundle: &ExportBundle, output_dir: &Path) -> Result<PathBuf, ExportError> {
    info!("Exporting to XLSX...");
    ensure_output_dir(output_dir)?;
    let path = workbook_path(output_dir, bundle);
    ensure_absent(&path)?;

    let plan = plan_workbook(bundle);
    for table in &plan.collisions {
        warn!(
            "Skipping sheet for {}: sheet name '{}' already used",
            table,
            sheet_name(table)
        );
    }

    let header = Format::new().set_bold();
    let mut workbook = Workbook::new();

    let index = build_index_sheet(&plan, &header).map_err(|e| ExportError::write(&path, e))?;
    workbook.push_worksheet(index);

    for planned in &plan.sheets {
        match build_table_sheet(planned, &header, &path) {
            Ok(worksheet) => {
                workbook.push_worksheet(worksheet);
                info!("{}: {} rows written", planned.snapshot.name(), planned.rows.len());
            }
            Err(e) => error!("Skipping sheet for {}: {}", planned.snapshot.name(), e),
        }
    }

    workbook
        .save(&path)
        .map_err(|e| ExportError::write(&path, e))?;

    info!("XLSX exported: {}", path.display());
    Ok(path)
}
