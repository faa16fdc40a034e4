//! Error type definitions.

use std::path::{Path, PathBuf};

use log::SetLoggerError;
use thiserror::Error;

/// Error types for initialization failures.
#[derive(Error, Debug)]
#[allow(clippy::enum_variant_names)] // All variants end with "Error" by convention
pub enum InitializationError {
    /// Error initializing the logger.
    #[error("Logger initialization error: {0}")]
    LoggerError(#[from] SetLoggerError),
}

/// Error types for an export run.
///
/// Propagation rules:
/// - `Connectivity` is fatal: no table can be listed, the run aborts.
/// - `Query` is per table: logged, the table is skipped, the run continues.
/// - `Write` is fatal for a whole artifact and per table inside an artifact.
#[derive(Error, Debug)]
pub enum ExportError {
    /// The database cannot be reached, authenticated, or enumerated.
    #[error("Connectivity error: {0}")]
    Connectivity(String),

    /// A describe or read query failed for one table.
    #[error("Query error on table '{table}': {source}")]
    Query {
        /// Table the query ran against
        table: String,
        /// Underlying driver error
        #[source]
        source: sqlx::Error,
    },

    /// An artifact (or one table's part of it) could not be written.
    #[error("Write error for {}: {message}", .path.display())]
    Write {
        /// File or directory being written
        path: PathBuf,
        /// What went wrong
        message: String,
    },
}

impl ExportError {
    /// Wraps a driver error raised while querying `table`.
    pub fn query(table: &str, source: sqlx::Error) -> Self {
        Self::Query {
            table: table.to_string(),
            source,
        }
    }

    /// Builds a write error for `path` from any displayable cause.
    pub fn write(path: &Path, cause: impl std::fmt::Display) -> Self {
        Self::Write {
            path: path.to_path_buf(),
            message: cause.to_string(),
        }
    }

    /// Whether the error aborts the whole run.
    pub fn is_fatal(&self) -> bool {
        !matches!(self, Self::Query { .. })
    }
}
