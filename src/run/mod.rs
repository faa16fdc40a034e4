//! The export run: connect, read every table once, write the artifacts,
//! release the connection.

use std::path::{Path, PathBuf};
use std::time::Instant;

use chrono::Local;
use log::{error, info, warn};

use crate::config::{Config, TIMESTAMP_FORMAT};
use crate::error_handling::ExportError;
use crate::export::{write_artifacts, ArtifactPaths, ExportBundle, TableSnapshot};
use crate::storage::{bundle_name, connect, TableSource};

/// Results of an export run.
#[derive(Debug, Clone)]
pub struct ExportReport {
    /// Bundle name (database name)
    pub name: String,
    /// Timestamp qualifying every artifact path
    pub timestamp: String,
    /// Tables listed by the catalog
    pub tables_listed: usize,
    /// Tables whose data reached the artifacts
    pub tables_exported: usize,
    /// Tables left out because their describe or read failed
    pub skipped_tables: Vec<String>,
    /// Rows written per artifact
    pub total_rows: usize,
    /// Structured JSON document
    pub json_file: PathBuf,
    /// Directory of CSV files
    pub csv_dir: PathBuf,
    /// Workbook
    pub workbook_file: PathBuf,
    /// Elapsed time in seconds
    pub elapsed_seconds: f64,
}

impl ExportReport {
    fn new(bundle: &ExportBundle, artifacts: ArtifactPaths, started: Instant) -> Self {
        Self {
            name: bundle.name.clone(),
            timestamp: bundle.timestamp.clone(),
            tables_listed: bundle.listed_tables,
            tables_exported: bundle.readable_tables().count(),
            skipped_tables: bundle
                .skipped_tables()
                .into_iter()
                .map(str::to_string)
                .collect(),
            total_rows: bundle.total_rows(),
            json_file: artifacts.json_file,
            csv_dir: artifacts.csv_dir,
            workbook_file: artifacts.workbook_file,
            elapsed_seconds: started.elapsed().as_secs_f64(),
        }
    }
}

/// Reads every base table of `source` into one bundle.
///
/// Tables are described first (logging each row count), then read one at a
/// time. A table that fails to describe or read is logged and recorded in
/// `bundle.failures`; it is never retried.
///
/// # Errors
///
/// Fails only when the table list cannot be read or the connection is gone
/// (`ExportError::Connectivity`).
pub async fn collect_bundle(
    source: &mut dyn TableSource,
    name: &str,
    timestamp: &str,
) -> Result<ExportBundle, ExportError> {
    let tables = source.list_tables().await?;
    info!("Tables found: {}", tables.len());

    let mut bundle = ExportBundle::new(name, timestamp, tables.len());

    let mut descriptors = Vec::with_capacity(tables.len());
    for table in &tables {
        match source.describe_table(table).await {
            Ok(descriptor) => {
                info!("  • {}: {} rows", table, descriptor.row_count);
                descriptors.push(descriptor);
            }
            Err(e) if e.is_fatal() => return Err(e),
            Err(e) => {
                error!("Skipping {}: {}", table, e);
                bundle.record_failure(table, &e);
            }
        }
    }

    for descriptor in descriptors {
        info!("Reading table: {}", descriptor.name);
        let rows = match source.fetch_table(&descriptor).await {
            Ok(rows) => {
                info!("{}: {} rows read", descriptor.name, rows.len());
                Some(rows)
            }
            Err(e) if e.is_fatal() => return Err(e),
            Err(e) => {
                error!("Error reading {}: {}", descriptor.name, e);
                bundle.record_failure(&descriptor.name, &e);
                None
            }
        };
        bundle.tables.push(TableSnapshot { descriptor, rows });
    }

    Ok(bundle)
}

/// Builds the bundle from `source` and writes the three artifacts.
///
/// The source is left open; closing it is the caller's job.
pub async fn export_from_source(
    source: &mut dyn TableSource,
    name: &str,
    timestamp: &str,
    output_dir: &Path,
) -> Result<(ExportBundle, ArtifactPaths), ExportError> {
    let bundle = collect_bundle(source, name, timestamp).await?;
    let artifacts = write_artifacts(&bundle, output_dir)?;
    Ok((bundle, artifacts))
}

/// Runs a complete export with the provided configuration.
///
/// Opens one connection, exports every table, and closes the connection on
/// every exit path once it was opened.
///
/// # Errors
///
/// - `ExportError::Connectivity` if the database cannot be reached or listed
/// - `ExportError::Write` if an artifact cannot be written
///
/// Per-table failures do not fail the run; they are listed in
/// [`ExportReport::skipped_tables`].
///
/// # Example
///
/// ```no_run
/// use table_exporter::{export_all, Config};
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let config = Config {
///     database_url: std::env::var("DATABASE_URL")?,
///     ..Default::default()
/// };
/// let report = export_all(&config).await?;
/// println!("{} rows exported", report.total_rows);
/// # Ok(())
/// # }
/// ```
pub async fn export_all(config: &Config) -> Result<ExportReport, ExportError> {
    let started = Instant::now();
    let timestamp = Local::now().format(TIMESTAMP_FORMAT).to_string();
    let name = bundle_name(&config.database_url);
    info!("Starting full database export");
    info!("Timestamp: {}", timestamp);

    let mut source = connect(&config.database_url, &config.schema).await?;

    let outcome = export_from_source(source.as_mut(), &name, &timestamp, &config.output_dir).await;

    match source.close().await {
        Ok(()) => info!("Connection closed"),
        Err(e) => warn!("Failed to close connection cleanly: {}", e),
    }

    let (bundle, artifacts) = outcome?;
    let report = ExportReport::new(&bundle, artifacts, started);
    if !report.skipped_tables.is_empty() {
        warn!(
            "{} table(s) skipped: {}",
            report.skipped_tables.len(),
            report.skipped_tables.join(", ")
        );
    }
    Ok(report)
}
