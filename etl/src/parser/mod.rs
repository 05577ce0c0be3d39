//! Source readers.
//!
//! - [`tabular`] - delimited file with encoding and delimiter auto-detection
//! - [`structured`] - JSON records flattened into dotted column names
//!
//! Readers do not validate content; see [`crate::validation`] for the
//! boundary checks run right after reading.

pub mod structured;
pub mod tabular;

use std::path::PathBuf;

use serde::Serialize;

use crate::models::Table;

pub use structured::{flatten_records, parse_structured_str, read_structured, RawRecords};
pub use tabular::{
    decode_content, detect_delimiter, detect_encoding, infer_column, is_null_marker,
    parse_tabular_bytes, read_tabular,
};

/// Metadata about a source file, reported in the run summary.
#[derive(Debug, Clone, Serialize)]
pub struct SourceInfo {
    pub path: Option<PathBuf>,
    pub encoding: String,
    pub delimiter: Option<char>,
    pub headers: Vec<String>,
    pub row_count: usize,
}

/// A decoded source and its metadata.
#[derive(Debug, Clone)]
pub struct ParsedSource {
    pub table: Table,
    pub info: SourceInfo,
}
