//! Destination stores.
//!
//! - [`postgres`] - PostgreSQL via `tokio-postgres`
//! - [`MemorySink`] - in-memory store for dry runs and tests
//!
//! A sink replaces the whole destination table on every write: no append, no
//! upsert, no schema migration.

pub mod postgres;

use std::collections::HashMap;

use crate::error::SinkResult;
use crate::models::Table;

pub use postgres::{ColumnType, PostgresSink};

/// A store that can replace a named table with new contents.
#[allow(async_fn_in_trait)]
pub trait TableSink {
    /// Drop any existing `table_name` and write `table` in its place.
    ///
    /// Returns the number of rows written.
    async fn replace_table(&mut self, table_name: &str, table: &Table) -> SinkResult<u64>;
}

/// Keeps replaced tables in memory.
#[derive(Debug, Default)]
pub struct MemorySink {
    tables: HashMap<String, Table>,
    writes: usize,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Current contents of a table.
    pub fn table(&self, name: &str) -> Option<&Table> {
        self.tables.get(name)
    }

    /// Number of successful `replace_table` calls.
    pub fn writes(&self) -> usize {
        self.writes
    }
}

impl TableSink for MemorySink {
    async fn replace_table(&mut self, table_name: &str, table: &Table) -> SinkResult<u64> {
        self.tables.insert(table_name.to_string(), table.clone());
        self.writes += 1;
        Ok(table.len() as u64)
    }
}
