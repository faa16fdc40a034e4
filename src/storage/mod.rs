//! Source database access.
//!
//! The exporter only ever talks to a [`TableSource`]: enumerate base tables,
//! describe one, read one fully, close. Backends are picked from the URL scheme:
//! - `postgres://` / `postgresql://` → [`PostgresSource`]
//! - `sqlite:` → [`SqliteSource`]

mod models;
mod postgres;
mod sqlite;

use async_trait::async_trait;
use log::info;
use url::Url;

use crate::config::DEFAULT_BUNDLE_NAME;
use crate::error_handling::ExportError;

pub use models::{hex_bytes, CellValue, ColumnDescriptor, Row, TableDescriptor};
pub use postgres::{ColumnKind, PostgresSource};
pub use sqlite::SqliteSource;

/// Read-only view of a database, one table at a time.
///
/// Implementations hold exactly one connection; every call runs on it in
/// sequence.
#[async_trait]
pub trait TableSource: Send {
    /// Base tables of the exported schema, alphabetically ordered.
    ///
    /// Fails with [`ExportError::Connectivity`] when the catalog cannot be read.
    async fn list_tables(&mut self) -> Result<Vec<String>, ExportError>;

    /// Columns in declaration order plus `count(*)` over the whole table.
    ///
    /// Fails with [`ExportError::Query`] if the table does not exist or either
    /// query fails.
    async fn describe_table(&mut self, name: &str) -> Result<TableDescriptor, ExportError>;

    /// Every row of the table, materialized in memory.
    ///
    /// Fails with [`ExportError::Query`] on any read failure.
    async fn fetch_table(&mut self, table: &TableDescriptor) -> Result<Vec<Row>, ExportError>;

    /// Releases the connection. Later calls fail with a connectivity error.
    async fn close(&mut self) -> Result<(), ExportError>;
}

/// Opens a connection to the database named by `url`.
///
/// `schema` selects the PostgreSQL schema to export; SQLite always exports `main`.
pub async fn connect(url: &str, schema: &str) -> Result<Box<dyn TableSource>, ExportError> {
    info!("Connecting to {}", redact_url(url));
    let source: Box<dyn TableSource> = if url.starts_with("postgres://")
        || url.starts_with("postgresql://")
    {
        Box::new(PostgresSource::connect(url, schema).await?)
    } else if url.starts_with("sqlite:") {
        Box::new(SqliteSource::connect(url).await?)
    } else {
        return Err(ExportError::Connectivity(format!(
            "unsupported connection string scheme: {}",
            redact_url(url)
        )));
    };
    info!("Connected");
    Ok(source)
}

/// Quotes an identifier for interpolation into SQL (`"a""b"` for `a"b`).
pub fn quote_ident(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

/// Connection string safe for logs: scheme, host and path only.
///
/// Credentials and query parameters never appear in the result.
pub fn redact_url(url: &str) -> String {
    if let Some(path) = url.strip_prefix("sqlite:") {
        // sqlite URLs carry no credentials, only options after '?'
        let path = path.split('?').next().unwrap_or_default();
        return format!("sqlite:{}", path);
    }
    match Url::parse(url) {
        Ok(parsed) => {
            let host = parsed.host_str().unwrap_or_default();
            let port = parsed.port().map(|p| format!(":{}", p)).unwrap_or_default();
            format!("{}://{}{}{}", parsed.scheme(), host, port, parsed.path())
        }
        Err(_) => "<unparseable connection string>".to_string(),
    }
}

/// Name of the export bundle: the database name carried by the URL.
///
/// `postgresql://u:p@host/shop?sslmode=require` → `shop`,
/// `sqlite:./data/shop.db` → `shop`.
pub fn bundle_name(url: &str) -> String {
    let name = if let Some(path) = url.strip_prefix("sqlite:") {
        let path = path.split('?').next().unwrap_or_default();
        let file = path.rsplit(|c| c == '/' || c == '\\').next().unwrap_or_default();
        let stem = file.split('.').next().unwrap_or_default();
        // sqlite::memory: leaves ":memory:" segments behind
        if stem.contains(':') {
            String::new()
        } else {
            stem.to_string()
        }
    } else {
        Url::parse(url)
            .ok()
            .and_then(|parsed| {
                parsed
                    .path_segments()
                    .and_then(|mut segments| segments.next().map(str::to_string))
            })
            .unwrap_or_default()
    };

    if name.is_empty() {
        DEFAULT_BUNDLE_NAME.to_string()
    } else {
        name
    }
}
