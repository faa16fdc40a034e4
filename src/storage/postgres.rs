//! PostgreSQL backend.
//!
//! Reads the `information_schema` catalog of one schema. Booleans, integers and
//! floats are decoded natively; every other column is projected as `::text` so
//! the server renders dates, numerics, uuids, arrays and enums itself and no
//! precision is lost on the way out.

use async_trait::async_trait;
use log::debug;
use serde_json::Value;
use sqlx::postgres::{PgConnection, PgRow};
use sqlx::{Connection, Row as _};

use super::models::{CellValue, ColumnDescriptor, Row, TableDescriptor};
use super::{quote_ident, TableSource};
use crate::error_handling::ExportError;

const LIST_TABLES_SQL: &str = "SELECT table_name::text
     FROM information_schema.tables
     WHERE table_schema = $1 AND table_type = 'BASE TABLE'
     ORDER BY table_name";

const DESCRIBE_COLUMNS_SQL: &str = "SELECT column_name::text AS name,
            data_type::text AS data_type,
            is_nullable::text AS is_nullable,
            column_default::text AS column_default
     FROM information_schema.columns
     WHERE table_schema = $1 AND table_name = $2
     ORDER BY ordinal_position";

/// How a column is read, derived from its `information_schema` data type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnKind {
    Bool,
    Int2,
    Int4,
    Int8,
    Float4,
    Float8,
    /// `json`/`jsonb`: read as text, embedded as parsed JSON
    Json,
    /// Everything else, read as the server's text rendering
    Text,
}

impl ColumnKind {
    pub fn from_data_type(data_type: &str) -> Self {
        match data_type {
            "boolean" => ColumnKind::Bool,
            "smallint" => ColumnKind::Int2,
            "integer" => ColumnKind::Int4,
            "bigint" => ColumnKind::Int8,
            "real" => ColumnKind::Float4,
            "double precision" => ColumnKind::Float8,
            "json" | "jsonb" => ColumnKind::Json,
            _ => ColumnKind::Text,
        }
    }

    fn is_native(self) -> bool {
        !matches!(self, ColumnKind::Json | ColumnKind::Text)
    }
}

/// Builds the full-table read for `table`, one projection per described column.
pub(crate) fn select_statement(schema: &str, table: &TableDescriptor) -> String {
    let projection = table
        .columns
        .iter()
        .map(|column| {
            let quoted = quote_ident(&column.name);
            if ColumnKind::from_data_type(&column.data_type).is_native() {
                quoted
            } else {
                format!("{quoted}::text AS {quoted}")
            }
        })
        .collect::<Vec<_>>()
        .join(", ");

    format!(
        "SELECT {} FROM {}.{}",
        projection,
        quote_ident(schema),
        quote_ident(&table.name)
    )
}

/// A single PostgreSQL connection scoped to one schema.
pub struct PostgresSource {
    conn: Option<PgConnection>,
    schema: String,
}

impl PostgresSource {
    /// Connects with the given URL. TLS is negotiated per the URL's `sslmode`.
    pub async fn connect(url: &str, schema: &str) -> Result<Self, ExportError> {
        let conn = PgConnection::connect(url)
            .await
            .map_err(|e| ExportError::Connectivity(e.to_string()))?;
        Ok(Self {
            conn: Some(conn),
            schema: schema.to_string(),
        })
    }
}

fn open(conn: &mut Option<PgConnection>) -> Result<&mut PgConnection, ExportError> {
    conn.as_mut()
        .ok_or_else(|| ExportError::Connectivity("connection already closed".to_string()))
}

fn decode_column_descriptor(row: &PgRow) -> Result<ColumnDescriptor, sqlx::Error> {
    let is_nullable: String = row.try_get("is_nullable")?;
    Ok(ColumnDescriptor {
        name: row.try_get("name")?,
        data_type: row.try_get("data_type")?,
        nullable: is_nullable == "YES",
        default: row.try_get("column_default")?,
    })
}

/// `real` values widened through their shortest text form (0.1f32 stays 0.1).
fn widen_f32(value: f32) -> f64 {
    value.to_string().parse().unwrap_or(f64::from(value))
}

fn decode_row(row: &PgRow, table: &TableDescriptor) -> Result<Row, sqlx::Error> {
    let mut out = Row::with_capacity(table.columns.len());
    for (index, column) in table.columns.iter().enumerate() {
        let value = match ColumnKind::from_data_type(&column.data_type) {
            ColumnKind::Bool => row.try_get::<Option<bool>, _>(index)?.map(CellValue::Bool),
            ColumnKind::Int2 => row
                .try_get::<Option<i16>, _>(index)?
                .map(|v| CellValue::Integer(v.into())),
            ColumnKind::Int4 => row
                .try_get::<Option<i32>, _>(index)?
                .map(|v| CellValue::Integer(v.into())),
            ColumnKind::Int8 => row.try_get::<Option<i64>, _>(index)?.map(CellValue::Integer),
            ColumnKind::Float4 => row
                .try_get::<Option<f32>, _>(index)?
                .map(|v| CellValue::Float(widen_f32(v))),
            ColumnKind::Float8 => row.try_get::<Option<f64>, _>(index)?.map(CellValue::Float),
            ColumnKind::Json => row.try_get::<Option<String>, _>(index)?.map(|text| {
                serde_json::from_str::<Value>(&text)
                    .map(CellValue::Json)
                    .unwrap_or(CellValue::Text(text))
            }),
            ColumnKind::Text => row.try_get::<Option<String>, _>(index)?.map(CellValue::Text),
        };
        out.push(column.name.clone(), value.unwrap_or(CellValue::Null));
    }
    Ok(out)
}

#[async_trait]
impl TableSource for PostgresSource {
    async fn list_tables(&mut self) -> Result<Vec<String>, ExportError> {
        let conn = open(&mut self.conn)?;
        sqlx::query_scalar::<_, String>(LIST_TABLES_SQL)
            .bind(&self.schema)
            .fetch_all(&mut *conn)
            .await
            .map_err(|e| ExportError::Connectivity(e.to_string()))
    }

    async fn describe_table(&mut self, name: &str) -> Result<TableDescriptor, ExportError> {
        let conn = open(&mut self.conn)?;

        let columns = sqlx::query(DESCRIBE_COLUMNS_SQL)
            .bind(&self.schema)
            .bind(name)
            .fetch_all(&mut *conn)
            .await
            .and_then(|rows| {
                rows.iter()
                    .map(decode_column_descriptor)
                    .collect::<Result<Vec<_>, _>>()
            })
            .map_err(|e| ExportError::query(name, e))?;

        let count_sql = format!(
            "SELECT COUNT(*) FROM {}.{}",
            quote_ident(&self.schema),
            quote_ident(name)
        );
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
        let sql = select_statement(&self.schema, table);
        debug!("{}", sql);

        let rows = sqlx::query(&sql)
            .fetch_all(&mut *conn)
            .await
            .map_err(|e| ExportError::query(&table.name, e))?;

        rows.iter()
            .map(|row| decode_row(row, table))
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

    fn column(name: &str, data_type: &str) -> ColumnDescriptor {
        ColumnDescriptor {
            name: name.to_string(),
            data_type: data_type.to_string(),
            nullable: true,
            default: None,
        }
    }

    #[test]
    fn test_column_kind_from_data_type() {
        assert_eq!(ColumnKind::from_data_type("boolean"), ColumnKind::Bool);
        assert_eq!(ColumnKind::from_data_type("smallint"), ColumnKind::Int2);
        assert_eq!(ColumnKind::from_data_type("integer"), ColumnKind::Int4);
        assert_eq!(ColumnKind::from_data_type("bigint"), ColumnKind::Int8);
        assert_eq!(ColumnKind::from_data_type("real"), ColumnKind::Float4);
        assert_eq!(
            ColumnKind::from_data_type("double precision"),
            ColumnKind::Float8
        );
        assert_eq!(ColumnKind::from_data_type("jsonb"), ColumnKind::Json);
        for text_like in [
            "numeric",
            "timestamp with time zone",
            "date",
            "uuid",
            "bytea",
            "ARRAY",
            "USER-DEFINED",
            "character varying",
        ] {
            assert_eq!(ColumnKind::from_data_type(text_like), ColumnKind::Text);
        }
    }

    #[test]
    fn test_select_statement_casts_non_primitive_columns() {
        let table = TableDescriptor {
            name: "Ganado".to_string(),
            columns: vec![
                column("id", "integer"),
                column("price", "numeric"),
                column("meta", "jsonb"),
                column("active", "boolean"),
            ],
            row_count: 0,
        };
        assert_eq!(
            select_statement("public", &table),
            "SELECT \"id\", \"price\"::text AS \"price\", \"meta\"::text AS \"meta\", \
             \"active\" FROM \"public\".\"Ganado\""
        );
    }

    #[test]
    fn test_select_statement_without_columns() {
        let table = TableDescriptor {
            name: "empty".to_string(),
            columns: Vec::new(),
            row_count: 0,
        };
        assert_eq!(
            select_statement("public", &table),
            "SELECT  FROM \"public\".\"empty\""
        );
    }

    #[test]
    fn test_widen_f32_keeps_short_decimal_form() {
        assert_eq!(widen_f32(0.1), 0.1);
        assert_eq!(widen_f32(-2.5), -2.5);
    }
}
