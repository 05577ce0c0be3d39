//! PostgreSQL sink.
//!
//! The whole replacement runs in one transaction (drop, create, insert,
//! commit). If any statement fails the transaction is rolled back when it is
//! dropped, so the previous table survives a failed run.

use std::borrow::Cow;

use pg_escape::quote_identifier;
use secrecy::ExposeSecret;
use serde_json::Value;
use tokio_postgres::types::ToSql;
use tokio_postgres::{Client, Config, NoTls};

use super::TableSink;
use crate::config::SinkConfig;
use crate::error::{SinkError, SinkResult};
use crate::logs::{log_error, log_info, log_success};
use crate::models::{columns, Table};
use crate::transform::operations::as_text;

/// Postgres caps bind parameters per statement at 65535.
const MAX_PARAMS: usize = 65_535;

/// Upper bound on rows per INSERT statement.
const MAX_BATCH_ROWS: usize = 1_000;

/// SQL type of a destination column, inferred from its cells.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnType {
    BigInt,
    Double,
    Text,
}

impl ColumnType {
    pub fn sql(&self) -> &'static str {
        match self {
            ColumnType::BigInt => "BIGINT",
            ColumnType::Double => "DOUBLE PRECISION",
            ColumnType::Text => "TEXT",
        }
    }

    /// Pick a type from the non-null cells: all integers → BIGINT, all
    /// numbers → DOUBLE PRECISION, anything else (or nothing) → TEXT.
    pub fn infer<'a>(cells: impl Iterator<Item = &'a Value>) -> Self {
        Self::from_cells(cells).unwrap_or(ColumnType::Text)
    }

    /// Type of a known output column, used when its cells say nothing.
    pub fn declared(name: &str) -> Option<Self> {
        match name {
            columns::ID | columns::YEAR | columns::MAX_PLAYERS => Some(ColumnType::BigInt),
            columns::AVG_PLAYERS | columns::MONTHLY_CHANGE | columns::PRICE_CENTS => Some(ColumnType::Double),
            _ => None,
        }
    }

    /// `None` when every cell is null.
    fn from_cells<'a>(cells: impl Iterator<Item = &'a Value>) -> Option<Self> {
        let mut seen = false;
        let mut all_int = true;
        for cell in cells {
            match cell {
                Value::Null => continue,
                Value::Number(n) => {
                    seen = true;
                    all_int &= n.is_i64();
                }
                _ => return Some(ColumnType::Text),
            }
        }
        match (seen, all_int) {
            (false, _) => None,
            (true, true) => Some(ColumnType::BigInt),
            (true, false) => Some(ColumnType::Double),
        }
    }

    /// Bind parameter for one cell.
    fn param(&self, cell: &Value) -> Result<Box<dyn ToSql + Sync>, String> {
        match (self, cell) {
            (ColumnType::BigInt, Value::Null) => Ok(Box::new(None::<i64>)),
            (ColumnType::Double, Value::Null) => Ok(Box::new(None::<f64>)),
            (ColumnType::Text, Value::Null) => Ok(Box::new(None::<String>)),
            (ColumnType::BigInt, Value::Number(n)) => n
                .as_i64()
                .map(|v| Box::new(Some(v)) as Box<dyn ToSql + Sync>)
                .ok_or_else(|| format!("{} is not a BIGINT", n)),
            (ColumnType::Double, Value::Number(n)) => n
                .as_f64()
                .map(|v| Box::new(Some(v)) as Box<dyn ToSql + Sync>)
                .ok_or_else(|| format!("{} is not a DOUBLE PRECISION", n)),
            (ColumnType::Text, other) => Ok(Box::new(Some(as_text(other)))),
            (ty, other) => Err(format!("cannot bind {} as {}", other, ty.sql())),
        }
    }
}

/// Column types for every column of `table`.
///
/// `id` is always BIGINT. Other columns follow their cells, falling back to
/// [`ColumnType::declared`] and then TEXT when every cell is null (or there
/// are no rows).
pub fn infer_column_types(table: &Table) -> Vec<ColumnType> {
    table
        .columns()
        .iter()
        .enumerate()
        .map(|(idx, name)| {
            if name == columns::ID {
                return ColumnType::BigInt;
            }
            ColumnType::from_cells(table.rows().iter().map(|row| &row[idx]))
                .or_else(|| ColumnType::declared(name))
                .unwrap_or(ColumnType::Text)
        })
        .collect()
}

/// `CREATE TABLE` statement for the given layout.
pub fn create_table_sql(table_name: &str, columns: &[String], types: &[ColumnType]) -> String {
    let defs: Vec<String> = columns
        .iter()
        .zip(types)
        .map(|(c, t)| format!("{} {}", quote_identifier(c), t.sql()))
        .collect();
    format!("CREATE TABLE {} ({})", quote_identifier(table_name), defs.join(", "))
}

/// Multi-row `INSERT` with numbered placeholders.
pub fn insert_sql(table_name: &str, columns: &[String], rows: usize) -> String {
    let cols: Vec<Cow<'_, str>> = columns.iter().map(|c| quote_identifier(c)).collect();
    let width = columns.len();
    let values: Vec<String> = (0..rows)
        .map(|r| {
            let placeholders: Vec<String> = (1..=width).map(|c| format!("${}", r * width + c)).collect();
            format!("({})", placeholders.join(", "))
        })
        .collect();

    format!(
        "INSERT INTO {} ({}) VALUES {}",
        quote_identifier(table_name),
        cols.join(", "),
        values.join(", ")
    )
}

/// Rows per INSERT for a table of `width` columns.
pub fn batch_rows(width: usize) -> usize {
    (MAX_PARAMS / width.max(1)).clamp(1, MAX_BATCH_ROWS)
}

/// A connected Postgres client.
pub struct PostgresSink {
    client: Client,
    target: String,
}

impl PostgresSink {
    /// Connect without TLS. Missing credentials surface here as
    /// [`SinkError::Connection`].
    pub async fn connect(config: &SinkConfig) -> SinkResult<Self> {
        let target = config.target();

        let mut pg = Config::new();
        pg.host(&config.host)
            .port(config.port)
            .dbname(&config.database)
            .application_name("steamload");
        if let Some(user) = &config.user {
            pg.user(user);
        }
        if let Some(secret) = &config.secret {
            pg.password(secret.expose_secret());
        }

        let (client, connection) = pg.connect(NoTls).await.map_err(|source| SinkError::Connection {
            target: target.clone(),
            source,
        })?;

        // The client ends the connection when dropped
        tokio::spawn(async move {
            if let Err(err) = connection.await {
                log_error(format!("Postgres connection error: {}", err));
            }
        });

        log_info(format!("Connected to {}", target));
        Ok(Self { client, target })
    }
}

impl TableSink for PostgresSink {
    async fn replace_table(&mut self, table_name: &str, table: &Table) -> SinkResult<u64> {
        let types = infer_column_types(table);
        let columns = table.columns();

        let tx = self
            .client
            .transaction()
            .await
            .map_err(|e| SinkError::write(table_name, e))?;

        tx.batch_execute(&format!("DROP TABLE IF EXISTS {}", quote_identifier(table_name)))
            .await
            .map_err(|e| SinkError::write(table_name, e))?;
        tx.batch_execute(&create_table_sql(table_name, columns, &types))
            .await
            .map_err(|e| SinkError::write(table_name, e))?;

        let mut written = 0u64;
        for chunk in table.rows().chunks(batch_rows(columns.len())) {
            let mut params: Vec<Box<dyn ToSql + Sync>> = Vec::with_capacity(chunk.len() * columns.len());
            for row in chunk {
                for (cell, ty) in row.iter().zip(&types) {
                    params.push(ty.param(cell).map_err(|e| SinkError::write(table_name, e))?);
                }
            }
            let refs: Vec<&(dyn ToSql + Sync)> = params.iter().map(|p| p.as_ref()).collect();

            written += tx
                .execute(&insert_sql(table_name, columns, chunk.len()), &refs)
                .await
                .map_err(|e| SinkError::write(table_name, e))?;
        }

        tx.commit().await.map_err(|e| SinkError::write(table_name, e))?;
        log_success(format!("Replaced {} on {} ({} rows)", table_name, self.target, written));
        Ok(written)
    }
}
