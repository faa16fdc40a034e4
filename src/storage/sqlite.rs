//! SQLite backend.
//!
//! Values are decoded by their storage class, which SQLite tracks per value
//! rather than per column.

use async_trait::async_trait;
use sqlx::sqlite::{SqliteConnection, SqliteRow};
use sqlx::{Column, Connection, Row as _, TypeInfo, ValueRef};

use super::models::{CellValue, ColumnDescriptor, Row, TableDescriptor};
use super::{quote_ident, TableSource};
use crate::error_handling::ExportError;

const LIST_TABLES_SQL: &str = "SELECT name FROM sqlite_master
     WHERE type = 'table' AND name NOT LIKE 'sqlite\\_%' ESCAPE '\\'
     ORDER BY name";

const DESCRIBE_COLUMNS_SQL: &str = "SELECT name, type, \"notnull\", dflt_value
     FROM pragma_table_info(?1)
     ORDER BY cid";

/// A single SQLite connection.
pub struct SqliteSource {
    conn: Option<SqliteConnection>,
}

impl SqliteSource {
    /// Opens `url` (`sqlite:path/to/file.db`, `sqlite::memory:`).
    pub async fn connect(url: &str) -> Result<Self, ExportError> {
        let conn = SqliteConnection::connect(url)
            .await
            .map_err(|e| ExportError::Connectivity(e.to_string()))?;
        Ok(Self::from_connection(conn))
    }

    /// Wraps an already open connection.
    pub fn from_connection(conn: SqliteConnection) -> Self {
        Self { conn: Some(conn) }
    }
}

fn open(conn: &mut Option<SqliteConnection>) -> Result<&mut SqliteConnection, ExportError> {
    conn.as_mut()
        .ok_or_else(|| ExportError::Connectivity("connection already closed".to_string()))
}

fn decode_column_descriptor(row: &SqliteRow) -> Result<ColumnDescriptor, sqlx::Error> {
    let not_null: i64 = row.try_get("notnull")?;
    Ok(ColumnDescriptor {
        name: row.try_get("name")?,
        data_type: row.try_get("type")?,
        nullable: not_null == 0,
        default: row.try_get("dflt_value")?,
    })
}

fn decode_value(row: &SqliteRow, index: usize) -> Result<CellValue, sqlx::Error> {
    let raw = row.try_get_raw(index)?;
    if raw.is_null() {
        return Ok(CellValue::Null);
    }
    let storage_class = raw.type_info().name().to_string();
    let value = match storage_class.as_str() {
        "INTEGER" => CellValue::Integer(row.try_get_unchecked(index)?),
        "REAL" => CellValue::Float(row.try_get_unchecked(index)?),
        "BLOB" => CellValue::Bytes(row.try_get_unchecked(index)?),
        _ => CellValue::Text(row.try_get_unchecked(index)?),
    };
    Ok(value)
}

fn decode_row(row: &SqliteRow) -> Result<Row, sqlx::Error> {
    let mut out = Row::with_capacity(row.len());
    for (index, column) in row.columns().iter().enumerate() {
        out.push(column.name(), decode_value(row, index)?);
    }
    Ok(out)
}

#[async_trait]
impl TableSource for SqliteSource {
    async fn list_tables(&mut self) -> Result<Vec<String>, ExportError> {
        let conn = open(&mut self.conn)?;
        sqlx::query_scalar::<_, String>(LIST_TABLES_SQL)
            .fetch_all(&mut *conn)
            .await
            .map_err(|e| ExportError::Connectivity(e.to_string()))
    }

    async fn describe_table(&mut self, name: &str) -> Result<TableDescriptor, ExportError> {
        let conn = open(&mut self.conn)?;

        let columns = sqlx::query(DESCRIBE_COLUMNS_SQL)
            .bind(name)
            .fetch_all(&mut *conn)
            .await
            .and_then(|rows| {
                rows.iter()
                    .map(decode_column_descriptor)
                    .collect::<Result<Vec<_>, _>>()
            })
            .map_err(|e| ExportError::query(name, e))?;

        // pragma_table_info yields nothing for unknown tables; the count reports it
        let count_sql = format!("SELECT COUNT(*) FROM {}", quote_ident(name));
        let row_count: i64 = sqlx::query_scalar(&count_sql)
            .fetch_one(&mut *conn)
            .await
            .map_err(|e| ExportError::query(name, e))?;

        Ok(TableDescriptor {
            name: name.to_string(),
            columns,
            row_count,
        })
    }

    async fn fetch_table(&mut self, table: &TableDescriptor) -> Result<Vec<Row>, ExportError> {
        let conn = open(&mut self.conn)?;
        let sql = format!("SELECT * FROM {}", quote_ident(&table.name));

        let rows = sqlx::query(&sql)
            .fetch_all(&mut *conn)
            .await
            .map_err(|e| ExportError::query(&table.name, e))?;

        rows.iter()
            .map(decode_row)
            .collect::<Result<Vec<_>, _>>()
            .map_err(|e| ExportError::query(&table.name, e))
    }

    async fn close(&mut self) -> Result<(), ExportError> {
        if let Some(conn) = self.conn.take() {
            conn.close()
                .await
                .map_err(|e| ExportError::Connectivity(e.to_string()))?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn seeded_source() -> SqliteSource {
        let mut conn = SqliteConnection::connect("sqlite::memory:")
            .await
            .expect("Failed to open in-memory database");
        sqlx::raw_sql(
            "CREATE TABLE animals (
                id INTEGER PRIMARY KEY,
                name TEXT NOT NULL DEFAULT 'sin nombre',
                weight REAL,
                photo BLOB
            );
            CREATE TABLE contests (id INTEGER, title TEXT);
            INSERT INTO animals (name, weight, photo) VALUES ('Lucero', 512.5, x'cafe');
            INSERT INTO animals (name, weight, photo) VALUES ('Niña', NULL, NULL);",
        )
        .execute(&mut conn)
        .await
        .expect("Failed to seed database");
        SqliteSource::from_connection(conn)
    }

    #[tokio::test]
    async fn test_list_tables_is_alphabetical() {
        let mut source = seeded_source().await;
        let tables = source.list_tables().await.expect("list tables");
        assert_eq!(tables, vec!["animals".to_string(), "contests".to_string()]);
    }

    #[tokio::test]
    async fn test_describe_table() {
        let mut source = seeded_source().await;
        let descriptor = source.describe_table("animals").await.expect("describe");

        assert_eq!(descriptor.row_count, 2);
        assert_eq!(
            descriptor.column_names(),
            vec!["id", "name", "weight", "photo"]
        );
        let name = &descriptor.columns[1];
        assert_eq!(name.data_type, "TEXT");
        assert!(!name.nullable);
        assert_eq!(name.default.as_deref(), Some("'sin nombre'"));
        assert!(descriptor.columns[2].nullable);
    }

    #[tokio::test]
    async fn test_describe_unknown_table_is_query_error() {
        let mut source = seeded_source().await;
        let err = source
            .describe_table("missing")
            .await
            .expect_err("unknown table must fail");
        assert!(matches!(err, ExportError::Query { ref table, .. } if table == "missing"));
    }

    #[tokio::test]
    async fn test_fetch_table_decodes_storage_classes() {
        let mut source = seeded_source().await;
        let descriptor = source.describe_table("animals").await.expect("describe");
        let rows = source.fetch_table(&descriptor).await.expect("fetch");

        assert_eq!(rows.len(), 2);
        assert!(rows.iter().all(|row| row.len() == descriptor.columns.len()));
        assert_eq!(rows[0].get("id"), Some(&CellValue::Integer(1)));
        assert_eq!(rows[0].get("weight"), Some(&CellValue::Float(512.5)));
        assert_eq!(
            rows[0].get("photo"),
            Some(&CellValue::Bytes(vec![0xca, 0xfe]))
        );
        assert_eq!(rows[1].get("name"), Some(&CellValue::Text("Niña".into())));
        assert_eq!(rows[1].get("weight"), Some(&CellValue::Null));
    }

    #[tokio::test]
    async fn test_calls_after_close_fail() {
        let mut source = seeded_source().await;
        source.close().await.expect("close");
        source.close().await.expect("second close is a no-op");
        let err = source.list_tables().await.expect_err("closed");
        assert!(matches!(err, ExportError::Connectivity(_)));
    }
}
