//! Transformation module.
//!
//! - Operations: single-cell cleaning steps
//! - Tabular / Structured: per-source normalization
//! - Merge: inner join on `game` and id assignment
//! - Pipeline: extract, transform, load

pub mod merge;
pub mod operations;
pub mod pipeline;
pub mod structured;
pub mod tabular;

pub use merge::{assign_ids, inner_join, merge, DuplicateKeyPolicy};
pub use operations::{Operation, OperationError};
pub use pipeline::*;
pub use structured::{normalize_structured, PrefixPolicy, StructuredOutcome};
pub use tabular::normalize_tabular;
