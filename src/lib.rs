//! table_exporter library: full-database backups as JSON, CSV and XLSX.
//!
//! One run connects to a database, reads every base table fully into memory
//! once, and writes three artifacts from that same snapshot:
//! - `<db>_<timestamp>.json`: export metadata, schema and data of every table
//! - `csv_<timestamp>/`: one CSV per table plus `00_INDEX_TABLES.csv`
//! - `<db>_<timestamp>.xlsx`: a `00_INDEX` sheet plus one sheet per table
//!
//! # Example
//!
//! ```no_run
//! use table_exporter::{export_all, Config};
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let config = Config {
//!     database_url: "sqlite:./shop.db".to_string(),
//!     ..Default::default()
//! };
//!
//! let report = export_all(&config).await?;
//! println!("Exported {} tables ({} rows)", report.tables_exported, report.total_rows);
//! # Ok(())
//! # }
//! ```
//!
//! # Requirements
//!
//! This library requires a Tokio runtime. Everything runs sequentially on one
//! connection, so a current-thread runtime is enough.

pub mod config;
pub mod error_handling;
pub mod export;
pub mod initialization;
mod run;
pub mod storage;

// Re-export public API
pub use config::{Config, LogFormat, LogLevel};
pub use error_handling::ExportError;
pub use run::{collect_bundle, export_all, export_from_source, ExportReport};
