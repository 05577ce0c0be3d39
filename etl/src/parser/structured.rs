//! JSON record reader.
//!
//! A top-level array yields one record per element, a top-level object yields
//! a single record. [`flatten_records`] turns records into a [`Table`], nested
//! objects becoming dotted column names (`full_desc.desc`).

use std::collections::HashMap;
use std::path::Path;

use serde_json::{Map, Value};

use super::{ParsedSource, SourceInfo};
use crate::error::{SourceError, SourceResult};
use crate::models::Table;

const UTF8_BOM: &str = "\u{feff}";

/// Raw JSON records, before flattening.
#[derive(Debug, Clone)]
pub struct RawRecords {
    pub records: Vec<Value>,
    pub info: SourceInfo,
}

impl RawRecords {
    /// Flatten into a table, keeping the metadata.
    pub fn into_parsed(self) -> ParsedSource {
        let table = flatten_records(&self.records);
        let info = SourceInfo {
            headers: table.columns().to_vec(),
            ..self.info
        };
        ParsedSource { table, info }
    }
}

/// Read a JSON file from disk.
pub fn read_structured<P: AsRef<Path>>(path: P) -> SourceResult<RawRecords> {
    let path = path.as_ref();
    let content = std::fs::read_to_string(path).map_err(|source| SourceError::Io {
        path: path.to_path_buf(),
        source,
    })?;

    let mut raw = parse_structured_str(&content)?;
    raw.info.path = Some(path.to_path_buf());
    Ok(raw)
}

/// Parse a JSON document into records.
pub fn parse_structured_str(content: &str) -> SourceResult<RawRecords> {
    let content = content.strip_prefix(UTF8_BOM).unwrap_or(content);
    if content.trim().is_empty() {
        return Err(SourceError::Empty);
    }

    let document: Value = serde_json::from_str(content)?;
    let records = match document {
        Value::Array(items) => {
            if let Some(bad) = items.iter().find(|item| !item.is_object()) {
                return Err(SourceError::UnsupportedShape(format!(
                    "array containing {}",
                    type_name(bad)
                )));
            }
            items
        }
        Value::Object(_) => vec![document],
        other => return Err(SourceError::UnsupportedShape(type_name(&other).to_string())),
    };

    let info = SourceInfo {
        path: None,
        encoding: "utf-8".to_string(),
        delimiter: None,
        headers: Vec::new(),
        row_count: records.len(),
    };

    Ok(RawRecords { records, info })
}

/// Flatten object records into a table.
///
/// Columns appear in first-seen order across all records; keys missing from
/// a record are null. Arrays are kept as cell values. Non-object records
/// contribute an all-null row.
pub fn flatten_records(records: &[Value]) -> Table {
    let mut columns: Vec<String> = Vec::new();
    let mut positions: HashMap<String, usize> = HashMap::new();
    let mut sparse_rows: Vec<Vec<(usize, Value)>> = Vec::with_capacity(records.len());

    for record in records {
        let mut pairs = Vec::new();
        if let Value::Object(obj) = record {
            flatten_object("", obj, &mut pairs);
        }

        let cells = pairs
            .into_iter()
            .map(|(key, value)| {
                let idx = *positions.entry(key.clone()).or_insert_with(|| {
                    columns.push(key);
                    columns.len() - 1
                });
                (idx, value)
            })
            .collect();
        sparse_rows.push(cells);
    }

    let width = columns.len();
    let mut table = Table::new(columns);
    for cells in sparse_rows {
        let mut row = vec![Value::Null; width];
        for (idx, value) in cells {
            row[idx] = value;
        }
        table.push_row(row);
    }
    table
}

fn flatten_object(prefix: &str, obj: &Map<String, Value>, out: &mut Vec<(String, Value)>) {
    for (key, value) in obj {
        let name = if prefix.is_empty() {
            key.clone()
        } else {
            format!("{}.{}", prefix, key)
        };

        match value {
            Value::Object(nested) => flatten_object(&name, nested, out),
            _ => out.push((name, value.clone())),
        }
    }
}

fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
