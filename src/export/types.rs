//! Export types: the in-memory bundle shared by every artifact writer.

use std::path::PathBuf;

use crate::error_handling::ExportError;
use crate::storage::{Row, TableDescriptor};

/// One table as read during the run.
#[derive(Debug, Clone)]
pub struct TableSnapshot {
    /// Schema metadata and `count(*)`
    pub descriptor: TableDescriptor,
    /// Every row, or `None` when the read failed
    pub rows: Option<Vec<Row>>,
}

impl TableSnapshot {
    pub fn name(&self) -> &str {
        &self.descriptor.name
    }

    /// Rows to write, if the table was read successfully.
    pub fn rows(&self) -> Option<&[Row]> {
        self.rows.as_deref()
    }
}

/// A table that could not be described or read.
#[derive(Debug, Clone, PartialEq)]
pub struct TableFailure {
    pub table: String,
    pub error: String,
}

/// Everything read in one run, named and timestamped.
///
/// Built once by the exporter, then only borrowed by the writers, so every
/// artifact renders the same dataset.
#[derive(Debug, Clone)]
pub struct ExportBundle {
    /// Bundle name (database name), first part of every artifact file name
    pub name: String,
    /// Local time of the run, `%Y%m%d_%H%M%S`
    pub timestamp: String,
    /// Number of tables the catalog listed
    pub listed_tables: usize,
    /// Described tables, in listing order
    pub tables: Vec<TableSnapshot>,
    /// Tables whose describe or read failed
    pub failures: Vec<TableFailure>,
}

impl ExportBundle {
    pub fn new(name: impl Into<String>, timestamp: impl Into<String>, listed_tables: usize) -> Self {
        Self {
            name: name.into(),
            timestamp: timestamp.into(),
            listed_tables,
            tables: Vec::with_capacity(listed_tables),
            failures: Vec::new(),
        }
    }

    pub fn record_failure(&mut self, table: &str, error: &ExportError) {
        self.failures.push(TableFailure {
            table: table.to_string(),
            error: error.to_string(),
        });
    }

    /// Snapshots whose rows were read.
    pub fn readable_tables(&self) -> impl Iterator<Item = (&TableSnapshot, &[Row])> {
        self.tables
            .iter()
            .filter_map(|snapshot| snapshot.rows().map(|rows| (snapshot, rows)))
    }

    /// Rows held across all readable tables.
    pub fn total_rows(&self) -> usize {
        self.readable_tables().map(|(_, rows)| rows.len()).sum()
    }

    /// Names of the tables that contribute no data.
    pub fn skipped_tables(&self) -> Vec<&str> {
        self.failures.iter().map(|f| f.table.as_str()).collect()
    }
}

/// Where the three artifacts of a run were written.
#[derive(Debug, Clone)]
pub struct ArtifactPaths {
    /// Structured JSON document
    pub json_file: PathBuf,
    /// Directory of per-table CSV files
    pub csv_dir: PathBuf,
    /// Multi-sheet workbook
    pub workbook_file: PathBuf,
}
