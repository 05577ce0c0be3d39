//! Inner join of the normalized sources and surrogate id assignment.
//!
//! Output order follows the left (tabular) table; for each left row the
//! matching right rows appear in right-table order. Keys match on exact,
//! case-sensitive equality; null keys never match.

use std::collections::HashMap;

use clap::ValueEnum;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{TransformError, TransformResult};
use crate::models::{columns, Table};

/// What to do when a key appears more than once on the right side.
///
/// The tabular side holds one row per game and month, so repeated keys there
/// are expected and never subject to this policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "kebab-case")]
pub enum DuplicateKeyPolicy {
    /// Emit one row per matching pair.
    #[default]
    CrossProduct,
    /// Only the first right row with a given key takes part in the join.
    FirstMatch,
    /// Fail when a key that joins occurs more than once on the right.
    Error,
}

/// Hashable form of a join key. Strings and non-strings never collide.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
enum JoinKey {
    Text(String),
    Other(String),
}

impl JoinKey {
    fn of(value: &Value) -> Option<Self> {
        match value {
            Value::Null => None,
            Value::String(s) => Some(JoinKey::Text(s.clone())),
            other => Some(JoinKey::Other(other.to_string())),
        }
    }

    fn display(&self) -> &str {
        match self {
            JoinKey::Text(s) | JoinKey::Other(s) => s,
        }
    }
}

/// Inner-join `left` and `right` on `key`.
///
/// Columns are the left columns followed by the right columns without the
/// key. Other clashing names get `_x` (left) and `_y` (right) suffixes.
pub fn inner_join(left: Table, right: Table, key: &str, policy: DuplicateKeyPolicy) -> TransformResult<Table> {
    let left_key = left.require_column(key)?;
    let right_key = right.require_column(key)?;

    let mut index: HashMap<JoinKey, Vec<usize>> = HashMap::new();
    for (idx, row) in right.rows().iter().enumerate() {
        if let Some(k) = JoinKey::of(&row[right_key]) {
            let matches = index.entry(k).or_default();
            if policy != DuplicateKeyPolicy::FirstMatch || matches.is_empty() {
                matches.push(idx);
            }
        }
    }

    let columns = joined_columns(left.columns(), right.columns(), right_key);
    let (_, left_rows) = left.into_parts();
    let (_, right_rows) = right.into_parts();

    let mut joined = Table::new(columns);
    for left_row in left_rows {
        let Some(k) = JoinKey::of(&left_row[left_key]) else {
            continue;
        };
        let Some(matches) = index.get(&k) else {
            continue;
        };
        if policy == DuplicateKeyPolicy::Error && matches.len() > 1 {
            return Err(TransformError::DuplicateKey(k.display().to_string()));
        }

        for &r in matches {
            let mut row = left_row.clone();
            row.extend(
                right_rows[r]
                    .iter()
                    .enumerate()
                    .filter(|(i, _)| *i != right_key)
                    .map(|(_, v)| v.clone()),
            );
            joined.push_row(row);
        }
    }

    Ok(joined)
}

/// Prepend a dense zero-based `id` column in current row order.
pub fn assign_ids(mut table: Table) -> Table {
    let ids = (0..table.len()).map(|i| Value::from(i as u64)).collect();
    table.insert_column(0, columns::ID, ids);
    table
}

/// Join the normalized sources on `game` and number the result.
pub fn merge(tabular: Table, structured: Table, policy: DuplicateKeyPolicy) -> TransformResult<Table> {
    let joined = inner_join(tabular, structured, columns::GAME, policy)?;
    Ok(assign_ids(joined))
}

fn joined_columns(left: &[String], right: &[String], right_key: usize) -> Vec<String> {
    let right_rest: Vec<&String> = right
        .iter()
        .enumerate()
        .filter(|(i, _)| *i != right_key)
        .map(|(_, c)| c)
        .collect();

    let mut out: Vec<String> = left
        .iter()
        .map(|c| {
            if right_rest.contains(&c) {
                format!("{}_x", c)
            } else {
                c.clone()
            }
        })
        .collect();

    out.extend(right_rest.iter().map(|c| {
        if left.contains(c) {
            format!("{}_y", c)
        } else {
            (*c).clone()
        }
    }));
    out
}
