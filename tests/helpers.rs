// Shared test helpers for database setup and artifact inspection.
//
// Every test builds its own SQLite file inside a TempDir so runs never share state.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use calamine::{open_workbook, Data, Range, Reader, Xlsx};
use serde_json::Value;
use sqlx::{Connection, SqliteConnection};

use table_exporter::storage::{Row, SqliteSource, TableDescriptor, TableSource};
use table_exporter::ExportError;

/// Name of the long table used to exercise sheet-name truncation.
#[allow(dead_code)]
pub const LONG_TABLE: &str = "inscripciones_historicas_de_concursos_regionales";

/// Schema and rows of the standard test database (7 rows over 4 tables).
const SEED_SQL: &str = "
    CREATE TABLE animals (
        id INTEGER PRIMARY KEY,
        name TEXT NOT NULL,
        breed TEXT,
        weight REAL,
        photo BLOB,
        registered_at TEXT DEFAULT CURRENT_TIMESTAMP
    );
    INSERT INTO animals (name, breed, weight, photo, registered_at)
        VALUES ('Lucero', 'Brahman', 512.5, x'cafe', '2024-03-01 10:00:00');
    INSERT INTO animals (name, breed, weight, photo, registered_at)
        VALUES ('Niña', NULL, NULL, NULL, '2024-03-02 11:30:00');
    INSERT INTO animals (name, breed, weight, photo, registered_at)
        VALUES ('Toro \"Rey\", el grande', 'Gyr', 890.0, NULL, '2024-03-03 09:15:00');

    CREATE TABLE contests (id INTEGER PRIMARY KEY, title TEXT, prize INTEGER);
    INSERT INTO contests (title, prize) VALUES ('Feria de Mayo', 5000);
    INSERT INTO contests (title, prize) VALUES ('Expo Ganadera', 9007199254740993);

    CREATE TABLE empty_table (id INTEGER, note TEXT);

    CREATE TABLE inscripciones_historicas_de_concursos_regionales (id INTEGER, animal_id INTEGER);
    INSERT INTO inscripciones_historicas_de_concursos_regionales VALUES (1, 1);
    INSERT INTO inscripciones_historicas_de_concursos_regionales VALUES (2, 2);
";

/// Creates `source.db` in `dir`, optionally seeded, and returns its connection URL.
#[allow(dead_code)]
pub async fn create_test_database(dir: &Path, seeded: bool) -> String {
    create_database_with(dir, if seeded { SEED_SQL } else { "" }).await
}

/// Creates `source.db` in `dir` running `sql` on it, and returns its connection URL.
#[allow(dead_code)]
pub async fn create_database_with(dir: &Path, sql: &str) -> String {
    let db_path = dir.join("source.db");
    let mut conn = SqliteConnection::connect(&format!("sqlite:{}?mode=rwc", db_path.display()))
        .await
        .expect("Failed to create test database");
    if !sql.trim().is_empty() {
        sqlx::raw_sql(sql)
            .execute(&mut conn)
            .await
            .expect("Failed to seed test database");
    }
    conn.close().await.expect("Failed to close seeding connection");
    format!("sqlite:{}", db_path.display())
}

/// Opens a source on a database created by [`create_test_database`].
#[allow(dead_code)]
pub async fn open_source(url: &str) -> SqliteSource {
    SqliteSource::connect(url)
        .await
        .expect("Failed to open test database")
}

/// Which operation a [`FailingSource`] breaks.
#[allow(dead_code)]
#[derive(Clone, Copy)]
pub enum FailOn {
    Describe,
    Fetch,
}

/// Wraps a source and fails one operation for one table, like a table the
/// exporting role has no permission on.
#[allow(dead_code)]
pub struct FailingSource {
    pub inner: SqliteSource,
    pub table: String,
    pub fail_on: FailOn,
}

fn permission_denied(table: &str) -> ExportError {
    ExportError::query(
        table,
        sqlx::Error::Protocol(format!("permission denied for table {}", table)),
    )
}

#[async_trait]
impl TableSource for FailingSource {
    async fn list_tables(&mut self) -> Result<Vec<String>, ExportError> {
        self.inner.list_tables().await
    }

    async fn describe_table(&mut self, name: &str) -> Result<TableDescriptor, ExportError> {
        if matches!(self.fail_on, FailOn::Describe) && name == self.table {
            return Err(permission_denied(name));
        }
        self.inner.describe_table(name).await
    }

    async fn fetch_table(&mut self, table: &TableDescriptor) -> Result<Vec<Row>, ExportError> {
        if matches!(self.fail_on, FailOn::Fetch) && table.name == self.table {
            return Err(permission_denied(&table.name));
        }
        self.inner.fetch_table(table).await
    }

    async fn close(&mut self) -> Result<(), ExportError> {
        self.inner.close().await
    }
}

/// Parses the structured document at `path`.
#[allow(dead_code)]
pub fn read_json(path: &Path) -> Value {
    let text = std::fs::read_to_string(path).expect("Failed to read JSON artifact");
    serde_json::from_str(&text).expect("JSON artifact is not valid JSON")
}

/// Data records (header excluded) of a CSV file.
#[allow(dead_code)]
pub fn read_csv_records(path: &Path) -> Vec<Vec<String>> {
    let mut reader = csv::Reader::from_path(path).expect("Failed to open CSV artifact");
    reader
        .records()
        .map(|record| {
            record
                .expect("Malformed CSV record")
                .iter()
                .map(str::to_string)
                .collect()
        })
        .collect()
}

/// Sheets of a workbook, in workbook order.
#[allow(dead_code)]
pub fn read_workbook(path: &Path) -> Vec<(String, Range<Data>)> {
    let mut workbook: Xlsx<_> = open_workbook(path).expect("Failed to open workbook");
    workbook
        .sheet_names()
        .into_iter()
        .map(|name| {
            let range = workbook
                .worksheet_range(&name)
                .expect("Failed to read worksheet");
            (name, range)
        })
        .collect()
}

/// Numeric cell value, whichever number type the reader picked.
#[allow(dead_code)]
pub fn cell_number(cell: Option<&Data>) -> Option<f64> {
    match cell {
        Some(Data::Float(f)) => Some(*f),
        Some(Data::Int(i)) => Some(*i as f64),
        _ => None,
    }
}

/// File names inside `dir`, sorted.
#[allow(dead_code)]
pub fn list_dir(dir: &Path) -> Vec<String> {
    let mut names: Vec<String> = std::fs::read_dir(dir)
        .expect("Failed to read directory")
        .map(|entry| {
            entry
                .expect("Failed to read directory entry")
                .file_name()
                .to_string_lossy()
                .to_string()
        })
        .collect();
    names.sort();
    names
}

/// Output directory under `dir` (not created; the exporter creates it).
#[allow(dead_code)]
pub fn output_dir(dir: &Path) -> PathBuf {
    dir.join("exports")
}
