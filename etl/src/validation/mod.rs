//! Schema checks at the source boundary.
//!
//! Each source has an explicit schema, checked once right after reading so
//! that a missing or mistyped field fails early with a clear error instead of
//! surfacing halfway through cleaning.
//!
//! # Checks
//!
//! ## Tabular source
//! - Raw headers `gamename, year, month, avg, gain, peak, avg_peak_perc`
//!
//! ## Structured source
//! - Flattened columns `name, developer, price, full_desc.desc`
//! - Per-record field types, using the embedded JSON Schema
//!   `schemas/steam-review-record.json` (draft 7)
//!
//! # Example
//!
//! ```rust,ignore
//! use serde_json::json;
//! use steamload::validation::validate_structured_record;
//!
//! assert!(validate_structured_record(&json!({ "price": "9.99" })).is_ok());
//! assert!(validate_structured_record(&json!({ "price": [1, 2] })).is_err());
//! ```

use jsonschema::Validator;
use once_cell::sync::Lazy;
use serde_json::Value;

use crate::error::{TransformError, TransformResult};
use crate::models::{columns, Table};

static STRUCTURED_RECORD_SCHEMA: Lazy<Value> = Lazy::new(|| {
    serde_json::from_str(include_str!("../../schemas/steam-review-record.json"))
        .expect("Invalid embedded schema")
});

static STRUCTURED_RECORD_VALIDATOR: Lazy<Result<Validator, String>> = Lazy::new(|| {
    jsonschema::draft7::new(&STRUCTURED_RECORD_SCHEMA).map_err(|e| format!("Invalid schema: {}", e))
});

/// Validate one raw structured record.
///
/// # Returns
/// * `Ok(())` if valid
/// * `Err(Vec<String>)` with one message per violation
pub fn validate_structured_record(record: &Value) -> Result<(), Vec<String>> {
    let validator = STRUCTURED_RECORD_VALIDATOR
        .as_ref()
        .map_err(|e| vec![e.clone()])?;

    let errors: Vec<String> = validator
        .iter_errors(record)
        .map(|e| e.to_string())
        .collect();

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

/// Check every raw structured record; the first offending record fails the run.
pub fn check_structured_records(records: &[Value]) -> TransformResult<()> {
    for (idx, record) in records.iter().enumerate() {
        validate_structured_record(record)
            .map_err(|errors| TransformError::TypeMismatch { record: idx, errors })?;
    }
    Ok(())
}

/// Fail with [`TransformError::MissingColumn`] on the first absent column.
pub fn require_columns(table: &Table, names: &[&str]) -> TransformResult<()> {
    for name in names {
        table.require_column(name)?;
    }
    Ok(())
}

/// Boundary check for the tabular source.
pub fn check_tabular(table: &Table) -> TransformResult<()> {
    require_columns(table, &columns::TABULAR_RAW)
}

/// Boundary check for the flattened structured source.
pub fn check_structured_columns(table: &Table) -> TransformResult<()> {
    require_columns(table, &columns::STRUCTURED_RAW)
}
