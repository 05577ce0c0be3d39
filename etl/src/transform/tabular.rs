//! Tabular source normalization.

use serde_json::json;

use super::operations::{apply_all, Operation};
use crate::error::{TransformError, TransformResult};
use crate::models::{columns, Table};

/// Raw header → canonical column name.
pub const TABULAR_RENAMES: [(&str, &str); 7] = [
    (columns::RAW_GAME_NAME, columns::GAME),
    (columns::RAW_YEAR, columns::YEAR),
    (columns::RAW_MONTH, columns::MONTH),
    (columns::RAW_AVG, columns::AVG_PLAYERS),
    (columns::RAW_GAIN, columns::MONTHLY_CHANGE),
    (columns::RAW_PEAK, columns::MAX_PLAYERS),
    (columns::RAW_AVG_PEAK_PERC, columns::AVG_MAX_PERCENT),
];

/// Rename to canonical columns and zero-fill `monthly_change`.
///
/// No rows are dropped; every other column keeps its source values,
/// nulls included.
pub fn normalize_tabular(table: Table) -> TransformResult<Table> {
    let table = table.rename_columns(&TABULAR_RENAMES);

    let ops = [Operation::FillNull { value: json!(0) }];
    table.map_column(columns::MONTHLY_CHANGE, |row, value| {
        apply_all(&ops, value).map_err(|e| TransformError::Cleaning {
            column: columns::MONTHLY_CHANGE.to_string(),
            row,
            operation: e.operation,
            value: e.value,
        })
    })
}
