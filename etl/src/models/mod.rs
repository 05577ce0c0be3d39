//! Domain models for the Steamload pipeline.
//!
//! - [`Table`] - column-ordered in-memory table shared by every stage
//! - [`columns`] - canonical column names of the sources and the merged output
//!
//! Cells are [`serde_json::Value`] scalars; `Value::Null` is the null marker.
//! Every stage takes a `Table` by value and returns a new one, so ownership
//! moves linearly through the pipeline.

use serde::Serialize;
use serde_json::{Map, Value};

use crate::error::{TransformError, TransformResult};

// =============================================================================
// Column names
// =============================================================================

/// Column names used across the pipeline.
pub mod columns {
    // Raw tabular (SteamCharts.csv) headers.
    pub const RAW_GAME_NAME: &str = "gamename";
    pub const RAW_YEAR: &str = "year";
    pub const RAW_MONTH: &str = "month";
    pub const RAW_AVG: &str = "avg";
    pub const RAW_GAIN: &str = "gain";
    pub const RAW_PEAK: &str = "peak";
    pub const RAW_AVG_PEAK_PERC: &str = "avg_peak_perc";

    // Raw structured (steam-reviews.json) fields, after flattening.
    pub const RAW_NAME: &str = "name";
    pub const RAW_DEVELOPER: &str = "developer";
    pub const RAW_PRICE: &str = "price";
    pub const RAW_DESCRIPTION: &str = "full_desc.desc";

    // Canonical names.
    pub const ID: &str = "id";
    pub const GAME: &str = "game";
    pub const YEAR: &str = "year";
    pub const MONTH: &str = "month";
    pub const AVG_PLAYERS: &str = "avg_players";
    pub const MONTHLY_CHANGE: &str = "monthly_change";
    pub const MAX_PLAYERS: &str = "max_players";
    pub const AVG_MAX_PERCENT: &str = "avg_max_percent";
    pub const DEVELOPER: &str = "developer";
    pub const PRICE_CENTS: &str = "price_cents";
    pub const DESCRIPTION: &str = "description";

    /// Raw headers the tabular source must provide.
    pub const TABULAR_RAW: [&str; 7] = [
        RAW_GAME_NAME,
        RAW_YEAR,
        RAW_MONTH,
        RAW_AVG,
        RAW_GAIN,
        RAW_PEAK,
        RAW_AVG_PEAK_PERC,
    ];

    /// Flattened fields the structured source must provide.
    pub const STRUCTURED_RAW: [&str; 4] = [RAW_NAME, RAW_DEVELOPER, RAW_PRICE, RAW_DESCRIPTION];

    /// Column layout of the merged table written to the sink.
    pub const MERGED: [&str; 11] = [
        ID,
        GAME,
        YEAR,
        MONTH,
        AVG_PLAYERS,
        MONTHLY_CHANGE,
        MAX_PLAYERS,
        AVG_MAX_PERCENT,
        DEVELOPER,
        PRICE_CENTS,
        DESCRIPTION,
    ];
}

// =============================================================================
// Table
// =============================================================================

/// One row of cells, aligned with [`Table::columns`].
pub type Row = Vec<Value>;

/// An ordered set of named columns and rows of cells.
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct Table {
    columns: Vec<String>,
    rows: Vec<Row>,
}

impl Table {
    /// Create an empty table with the given columns.
    pub fn new(columns: Vec<String>) -> Self {
        Self {
            columns,
            rows: Vec::new(),
        }
    }

    /// Build a table from rows. Short rows are padded with nulls and long
    /// rows are truncated to the column count.
    pub fn from_rows(columns: Vec<String>, rows: Vec<Row>) -> Self {
        let mut table = Self::new(columns);
        for row in rows {
            table.push_row(row);
        }
        table
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn rows(&self) -> &[Row] {
        &self.rows
    }

    /// Number of rows.
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Append a row, padding or truncating it to the table width.
    pub fn push_row(&mut self, mut row: Row) {
        row.resize(self.columns.len(), Value::Null);
        self.rows.push(row);
    }

    /// Position of a column, if present.
    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == name)
    }

    /// Position of a column, or [`TransformError::MissingColumn`].
    pub fn require_column(&self, name: &str) -> TransformResult<usize> {
        self.column_index(name)
            .ok_or_else(|| TransformError::MissingColumn(name.to_string()))
    }

    /// Cells of one column, top to bottom.
    pub fn column_values<'a>(&'a self, name: &str) -> Option<impl Iterator<Item = &'a Value> + 'a> {
        let idx = self.column_index(name)?;
        Some(self.rows.iter().map(move |row| &row[idx]))
    }

    /// Cell at `row`, `column`.
    pub fn get(&self, row: usize, column: &str) -> Option<&Value> {
        let idx = self.column_index(column)?;
        self.rows.get(row).map(|r| &r[idx])
    }

    /// Rename columns using `(from, to)` pairs. Unmapped columns keep their name.
    pub fn rename_columns(mut self, mapping: &[(&str, &str)]) -> Self {
        for column in self.columns.iter_mut() {
            if let Some((_, to)) = mapping.iter().find(|(from, _)| *from == column.as_str()) {
                *column = (*to).to_string();
            }
        }
        self
    }

    /// Keep only `names`, in that order.
    pub fn project(self, names: &[&str]) -> TransformResult<Self> {
        let indices = names
            .iter()
            .map(|name| self.require_column(name))
            .collect::<TransformResult<Vec<_>>>()?;

        let rows = self
            .rows
            .into_iter()
            .map(|row| indices.iter().map(|&i| row[i].clone()).collect())
            .collect();

        Ok(Self {
            columns: names.iter().map(|n| n.to_string()).collect(),
            rows,
        })
    }

    /// Replace every cell of `name` with `f(row_index, cell)`.
    pub fn map_column<F>(mut self, name: &str, mut f: F) -> TransformResult<Self>
    where
        F: FnMut(usize, &Value) -> TransformResult<Value>,
    {
        let idx = self.require_column(name)?;
        for (row_idx, row) in self.rows.iter_mut().enumerate() {
            row[idx] = f(row_idx, &row[idx])?;
        }
        Ok(self)
    }

    /// Keep only rows whose `name` cell satisfies `keep`.
    pub fn retain_by<F>(mut self, name: &str, mut keep: F) -> TransformResult<Self>
    where
        F: FnMut(&Value) -> bool,
    {
        let idx = self.require_column(name)?;
        self.rows.retain(|row| keep(&row[idx]));
        Ok(self)
    }

    /// Insert a column at `index`, one value per row.
    pub fn insert_column(&mut self, index: usize, name: &str, values: Vec<Value>) {
        debug_assert_eq!(values.len(), self.rows.len());
        self.columns.insert(index, name.to_string());
        for (row, value) in self.rows.iter_mut().zip(values) {
            row.insert(index, value);
        }
    }

    /// Consume the table into its columns and rows.
    pub fn into_parts(self) -> (Vec<String>, Vec<Row>) {
        (self.columns, self.rows)
    }

    /// Render rows as JSON objects, keys in column order.
    pub fn to_records(&self) -> Vec<Value> {
        self.rows
            .iter()
            .map(|row| {
                let obj: Map<String, Value> = self
                    .columns
                    .iter()
                    .cloned()
                    .zip(row.iter().cloned())
                    .collect();
                Value::Object(obj)
            })
            .collect()
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn sample() -> Table {
        Table::from_rows(
            vec!["a".into(), "b".into(), "c".into()],
            vec![
                vec![json!(1), json!("x"), Value::Null],
                vec![json!(2), json!("y")],
            ],
        )
    }

    #[test]
    fn test_from_rows_pads_short_rows() {
        let table = sample();
        assert_eq!(table.len(), 2);
        assert_eq!(table.rows()[1], vec![json!(2), json!("y"), Value::Null]);
    }

    #[test]
    fn test_rename_keeps_unmapped() {
        let table = sample().rename_columns(&[("a", "alpha"), ("zzz", "ignored")]);
        assert_eq!(table.columns(), &["alpha", "b", "c"]);
    }

    #[test]
    fn test_project_reorders() {
        let table = sample().project(&["c", "a"]).unwrap();
        assert_eq!(table.columns(), &["c", "a"]);
        assert_eq!(table.rows()[0], vec![Value::Null, json!(1)]);
    }

    #[test]
    fn test_project_missing_column() {
        let err = sample().project(&["a", "nope"]).unwrap_err();
        assert!(matches!(err, TransformError::MissingColumn(c) if c == "nope"));
    }

    #[test]
    fn test_retain_by() {
        let table = sample().retain_by("b", |v| *v == "y").unwrap();
        assert_eq!(table.len(), 1);
        assert_eq!(table.get(0, "a"), Some(&json!(2)));
    }

    #[test]
    fn test_insert_column_front() {
        let mut table = sample();
        table.insert_column(0, "id", vec![json!(0), json!(1)]);
        assert_eq!(table.columns()[0], "id");
        assert_eq!(table.get(1, "id"), Some(&json!(1)));
        assert_eq!(table.get(1, "b"), Some(&json!("y")));
    }

    #[test]
    fn test_to_records_preserves_column_order() {
        let records = sample().to_records();
        let keys: Vec<&String> = records[0].as_object().unwrap().keys().collect();
        assert_eq!(keys, vec!["a", "b", "c"]);
    }
}
