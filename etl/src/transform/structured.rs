//! Structured source normalization.
//!
//! Steps run in a fixed order: project, price, developer filter, name filter
//! and clean-up, text coercion, description prefix, rename. Each step takes
//! the table by value and hands a new one to the next.

use clap::ValueEnum;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use super::operations::{apply_all, contains_ascii_letter, Operation, OperationError};
use crate::error::{TransformError, TransformResult};
use crate::models::{columns, Table};

/// Boilerplate every store description starts with.
pub const DESCRIPTION_PREFIX: &str = "About this game ";

/// Characters removed from the start of every description.
pub const DESCRIPTION_PREFIX_LEN: usize = 16;

/// Substrings removed from game names.
pub const NAME_STRIP_TOKENS: [&str; 3] = ["™", "®", "仁王"];

/// Placeholder for null developers and names. It contains ASCII letters, so
/// such rows pass the letter filter.
pub const NULL_TEXT: &str = "None";

/// Raw field → canonical column name.
pub const STRUCTURED_RENAMES: [(&str, &str); 4] = [
    (columns::RAW_NAME, columns::GAME),
    (columns::RAW_DEVELOPER, columns::DEVELOPER),
    (columns::RAW_PRICE, columns::PRICE_CENTS),
    (columns::RAW_DESCRIPTION, columns::DESCRIPTION),
];

/// How the description prefix is treated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "kebab-case")]
pub enum PrefixPolicy {
    /// Drop the first 16 characters, whatever they are.
    #[default]
    Strip,
    /// Strip, and count descriptions that do not start with the prefix.
    Warn,
    /// Fail on a non-empty description that does not start with the prefix.
    Strict,
}

/// Normalized structured table plus what was filtered on the way.
#[derive(Debug, Clone)]
pub struct StructuredOutcome {
    pub table: Table,
    /// Rows dropped because `developer` had no ASCII letter.
    pub dropped_developer: usize,
    /// Rows dropped because `name` had no ASCII letter.
    pub dropped_name: usize,
    /// Non-empty descriptions not starting with [`DESCRIPTION_PREFIX`].
    pub prefix_mismatches: usize,
}

/// Clean the structured source.
///
/// Every surviving row has a `game` and a `developer` containing at least one
/// ASCII letter, a numeric `price_cents` and a text `description`.
pub fn normalize_structured(table: Table, prefix: PrefixPolicy) -> TransformResult<StructuredOutcome> {
    let table = table.project(&columns::STRUCTURED_RAW)?;
    let table = clean_price(table)?;

    let before = table.len();
    let table = fill_and_require_letter(table, columns::RAW_DEVELOPER)?;
    let dropped_developer = before - table.len();

    let before = table.len();
    let table = fill_and_require_letter(table, columns::RAW_NAME)?;
    let dropped_name = before - table.len();
    let table = clean_name(table)?;

    let table = coerce_text(table, &[columns::RAW_NAME, columns::RAW_DEVELOPER, columns::RAW_DESCRIPTION])?;
    let (table, prefix_mismatches) = strip_description_prefix(table, prefix)?;

    Ok(StructuredOutcome {
        table: table.rename_columns(&STRUCTURED_RENAMES),
        dropped_developer,
        dropped_name,
        prefix_mismatches,
    })
}

/// null → 0, `"free"` → 0, then numeric.
fn clean_price(table: Table) -> TransformResult<Table> {
    let ops = [
        Operation::FillNull { value: json!(0) },
        Operation::ReplaceLiteral { from: "free".to_string(), value: json!(0) },
        Operation::ToNumber,
    ];
    table.map_column(columns::RAW_PRICE, |row, value| {
        apply_all(&ops, value).map_err(|e| TransformError::NonNumericPrice { row, value: e.value })
    })
}

/// null → `"None"`, then keep rows with an ASCII letter.
fn fill_and_require_letter(table: Table, column: &str) -> TransformResult<Table> {
    let ops = [Operation::FillNull { value: json!(NULL_TEXT) }];
    table
        .map_column(column, |row, value| {
            apply_all(&ops, value).map_err(|e| cleaning_error(column, row, e))
        })?
        .retain_by(column, contains_ascii_letter)
}

fn clean_name(table: Table) -> TransformResult<Table> {
    let ops = [Operation::StripSubstrings {
        values: NAME_STRIP_TOKENS.iter().map(|t| t.to_string()).collect(),
    }];
    table.map_column(columns::RAW_NAME, |row, value| {
        apply_all(&ops, value).map_err(|e| cleaning_error(columns::RAW_NAME, row, e))
    })
}

fn coerce_text(mut table: Table, names: &[&str]) -> TransformResult<Table> {
    let ops = [Operation::ToText];
    for name in names {
        table = table.map_column(name, |row, value| {
            apply_all(&ops, value).map_err(|e| cleaning_error(name, row, e))
        })?;
    }
    Ok(table)
}

fn strip_description_prefix(table: Table, policy: PrefixPolicy) -> TransformResult<(Table, usize)> {
    let ops = [Operation::Substring { start: DESCRIPTION_PREFIX_LEN }];
    let mut mismatches = 0;

    let table = table.map_column(columns::RAW_DESCRIPTION, |row, value| {
        if policy != PrefixPolicy::Strip && !has_expected_prefix(value) {
            if policy == PrefixPolicy::Strict {
                return Err(TransformError::DescriptionPrefix {
                    row,
                    expected: DESCRIPTION_PREFIX.to_string(),
                });
            }
            mismatches += 1;
        }
        apply_all(&ops, value).map_err(|e| cleaning_error(columns::RAW_DESCRIPTION, row, e))
    })?;

    Ok((table, mismatches))
}

/// Empty descriptions are not counted as mismatches.
fn has_expected_prefix(value: &Value) -> bool {
    match value {
        Value::String(s) => s.is_empty() || s.starts_with(DESCRIPTION_PREFIX),
        _ => true,
    }
}

fn cleaning_error(column: &str, row: usize, err: OperationError) -> TransformError {
    TransformError::Cleaning {
        column: column.to_string(),
        row,
        operation: err.operation,
        value: err.value,
    }
}
