//! # Steamload - SteamCharts and Steam store ETL
//!
//! Steamload reads monthly player statistics (CSV) and store records (JSON),
//! cleans both, inner-joins them on the game name and replaces a PostgreSQL
//! table with the result.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────┐     ┌─────────────┐
//! │  CSV File   │────▶│  Tabular    │──┐
//! │ (auto-enc)  │     │  normalize  │  │   ┌─────────────┐     ┌─────────────┐
//! └─────────────┘     └─────────────┘  ├──▶│ Inner join  │────▶│  Postgres   │
//! ┌─────────────┐     ┌─────────────┐  │   │  + ids      │     │  (replace)  │
//! │  JSON File  │────▶│ Structured  │──┘   └─────────────┘     └─────────────┘
//! │ (flattened) │     │  normalize  │
//! └─────────────┘     └─────────────┘
//! ```
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use steamload::{run, MemorySink, PipelineConfig};
//!
//! #[tokio::main(flavor = "current_thread")]
//! async fn main() {
//!     let mut sink = MemorySink::new();
//!     let report = run(&PipelineConfig::default(), &mut sink).await.unwrap();
//!     println!("{}", report.summary());
//! }
//! ```
//!
//! ## Modules
//!
//! - [`error`] - Hierarchical error types
//! - [`models`] - Column names and the in-memory [`Table`]
//! - [`parser`] - CSV and JSON readers
//! - [`validation`] - Boundary schema checks
//! - [`transform`] - Normalization, merge and pipeline
//! - [`sink`] - Destination stores
//! - [`config`] - Connection target
//! - [`logs`] - Progress logging

// Core modules
pub mod error;
pub mod models;

// Ambient
pub mod config;
pub mod logs;

// Reading
pub mod parser;
pub mod validation;

// Transformation
pub mod transform;

// Loading
pub mod sink;

// =============================================================================
// Re-exports - Error types
// =============================================================================

pub use error::{ConfigError, PipelineError, SinkError, SourceError, TransformError};

// =============================================================================
// Re-exports - Models
// =============================================================================

pub use models::{columns, Row, Table};

// =============================================================================
// Re-exports - Configuration
// =============================================================================

pub use config::SinkConfig;

// =============================================================================
// Re-exports - Parsing
// =============================================================================

pub use parser::{read_structured, read_tabular, ParsedSource, SourceInfo};

// =============================================================================
// Re-exports - Transformation
// =============================================================================

pub use transform::{
    merge, normalize_structured, normalize_tabular, DuplicateKeyPolicy, PrefixPolicy,
};

// =============================================================================
// Re-exports - Pipeline
// =============================================================================

pub use transform::pipeline::{
    prepare, run, transform_sources, PipelineConfig, PipelineReport, TransformOptions,
    TransformReport,
};

// =============================================================================
// Re-exports - Sinks
// =============================================================================

pub use sink::{MemorySink, PostgresSink, TableSink};
