//! Cell-level cleaning operations.
//!
//! Operations are applied to one cell at a time. A column's cleaning rule is
//! an ordered list of operations run left to right (see [`apply_all`]).

use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::{Number, Value};

static ASCII_LETTER: Lazy<Regex> = Lazy::new(|| Regex::new("[A-Za-z]").expect("valid regex"));

/// A value an operation could not handle.
#[derive(Debug, Clone, PartialEq)]
pub struct OperationError {
    pub operation: &'static str,
    pub value: String,
}

/// Available cleaning operations
#[derive(Debug, Clone, PartialEq)]
pub enum Operation {
    /// Replace null with a fixed value
    FillNull { value: Value },

    /// Replace a cell equal to `from` (exact, case-sensitive) with `value`
    ReplaceLiteral { from: String, value: Value },

    /// Coerce to a number; integers stay integers
    ToNumber,

    /// Render as text; null becomes the empty string
    ToText,

    /// Remove every occurrence of each substring, one after the other
    StripSubstrings { values: Vec<String> },

    /// Drop the first `start` characters
    Substring { start: usize },
}

impl Operation {
    /// Apply this operation to a value
    pub fn apply(&self, value: &Value) -> Result<Value, OperationError> {
        match self {
            Operation::FillNull { value: fill } => Ok(self.apply_fill_null(value, fill)),
            Operation::ReplaceLiteral { from, value: replacement } => {
                Ok(self.apply_replace_literal(value, from, replacement))
            }
            Operation::ToNumber => self.apply_to_number(value),
            Operation::ToText => Ok(Value::String(as_text(value))),
            Operation::StripSubstrings { values } => Ok(self.apply_strip(value, values)),
            Operation::Substring { start } => Ok(self.apply_substring(value, *start)),
        }
    }

    fn name(&self) -> &'static str {
        match self {
            Operation::FillNull { .. } => "fill_null",
            Operation::ReplaceLiteral { .. } => "replace_literal",
            Operation::ToNumber => "to_number",
            Operation::ToText => "to_text",
            Operation::StripSubstrings { .. } => "strip_substrings",
            Operation::Substring { .. } => "substring",
        }
    }

    fn apply_fill_null(&self, value: &Value, fill: &Value) -> Value {
        if value.is_null() {
            fill.clone()
        } else {
            value.clone()
        }
    }

    fn apply_replace_literal(&self, value: &Value, from: &str, replacement: &Value) -> Value {
        match value {
            Value::String(s) if s == from => replacement.clone(),
            _ => value.clone(),
        }
    }

    fn apply_to_number(&self, value: &Value) -> Result<Value, OperationError> {
        match value {
            Value::Number(_) => Ok(value.clone()),
            Value::String(s) => parse_number(s).ok_or_else(|| self.error(value)),
            _ => Err(self.error(value)),
        }
    }

    fn apply_strip(&self, value: &Value, needles: &[String]) -> Value {
        match value {
            Value::String(s) => {
                let mut out = s.clone();
                for needle in needles.iter().filter(|n| !n.is_empty()) {
                    out = out.replace(needle.as_str(), "");
                }
                Value::String(out)
            }
            _ => value.clone(),
        }
    }

    fn apply_substring(&self, value: &Value, start: usize) -> Value {
        match value {
            Value::String(s) => Value::String(s.chars().skip(start).collect()),
            _ => value.clone(),
        }
    }

    fn error(&self, value: &Value) -> OperationError {
        OperationError {
            operation: self.name(),
            value: as_text(value),
        }
    }
}

/// Run `ops` in order, feeding each result into the next.
pub fn apply_all(ops: &[Operation], value: &Value) -> Result<Value, OperationError> {
    let mut current = value.clone();
    for op in ops {
        current = op.apply(&current)?;
    }
    Ok(current)
}

/// True when the cell's text contains at least one ASCII letter.
pub fn contains_ascii_letter(value: &Value) -> bool {
    match value {
        Value::Null => false,
        _ => ASCII_LETTER.is_match(&as_text(value)),
    }
}

/// Text form of a cell. Strings are returned as is, null as `""`, other
/// values in their JSON form.
pub fn as_text(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        Value::Number(n) => n.to_string(),
        Value::Bool(b) => b.to_string(),
        other => other.to_string(),
    }
}

/// Parse a trimmed numeric literal, integer first.
pub fn parse_number(raw: &str) -> Option<Value> {
    let s = raw.trim();
    if s.is_empty() {
        return None;
    }
    if let Ok(i) = s.parse::<i64>() {
        return Some(Value::Number(i.into()));
    }
    s.parse::<f64>()
        .ok()
        .and_then(Number::from_f64)
        .map(Value::Number)
}
