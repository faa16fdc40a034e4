//! Configuration constants.
//!
//! This module defines the constants used throughout the exporter: defaults,
//! artifact naming, and the format limits imposed by the output sinks.

/// Default directory for all export artifacts (created if absent).
pub const DEFAULT_OUTPUT_DIR: &str = "./exports";

/// Default PostgreSQL schema to enumerate tables from.
pub const DEFAULT_SCHEMA: &str = "public";

/// Bundle name used when the connection URL does not carry a database name.
pub const DEFAULT_BUNDLE_NAME: &str = "database";

/// Timestamp format used to qualify every artifact path (local time).
pub const TIMESTAMP_FORMAT: &str = "%Y%m%d_%H%M%S";

/// Value of `export_info.format` in the structured document.
pub const JSON_FORMAT_TAG: &str = "complete_json_export";

/// Name of the per-directory CSV index file. The `00_` prefix sorts it first.
pub const CSV_INDEX_FILE: &str = "00_INDEX_TABLES.csv";

/// Prefix of the timestamped CSV directory.
pub const CSV_DIR_PREFIX: &str = "csv_";

/// Name of the workbook index sheet. Always the first sheet.
pub const INDEX_SHEET_NAME: &str = "00_INDEX";

// Spreadsheet format limits
/// Maximum sheet-name length, in characters.
pub const MAX_SHEET_NAME_CHARS: usize = 31;
/// Maximum number of characters in one cell.
pub const MAX_CELL_CHARS: usize = 32_767;
/// Maximum number of rows in one worksheet (header included).
pub const MAX_SHEET_ROWS: usize = 1_048_576;
/// Maximum number of columns in one worksheet.
pub const MAX_SHEET_COLUMNS: usize = 16_384;
/// Largest integer magnitude a spreadsheet number cell holds exactly (2^53).
pub const MAX_EXACT_NUMBER: u64 = 9_007_199_254_740_992;
