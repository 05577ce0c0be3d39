//! High-level pipeline API: extract, transform, load.
//!
//! # Example
//!
//! ```rust,ignore
//! use steamload::sink::PostgresSink;
//! use steamload::transform::pipeline::{run, PipelineConfig};
//!
//! #[tokio::main(flavor = "current_thread")]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = PipelineConfig::default();
//!     let mut sink = PostgresSink::connect(&config.sink).await?;
//!     let report = run(&config, &mut sink).await?;
//!     println!("{}", report.summary());
//!     Ok(())
//! }
//! ```

use std::path::{Path, PathBuf};

use serde::Serialize;

use super::merge::{merge, DuplicateKeyPolicy};
use super::structured::{normalize_structured, PrefixPolicy};
use super::tabular::normalize_tabular;
use crate::config::SinkConfig;
use crate::error::{PipelineResult, TransformResult};
use crate::logs::{log_info, log_info_indent, log_success, log_warning_indent};
use crate::models::Table;
use crate::parser::{read_structured, read_tabular, ParsedSource, SourceInfo};
use crate::sink::TableSink;
use crate::validation::{check_structured_columns, check_structured_records, check_tabular};

/// Default location of the tabular source.
pub const DEFAULT_TABULAR_PATH: &str = "./Resources/SteamCharts.csv";

/// Default location of the structured source.
pub const DEFAULT_STRUCTURED_PATH: &str = "./Resources/steam-reviews.json";

/// Knobs for the transform stage.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct TransformOptions {
    pub duplicate_keys: DuplicateKeyPolicy,
    pub description_prefix: PrefixPolicy,
    /// Tabular delimiter; auto-detected when `None`.
    pub delimiter: Option<char>,
}

/// Everything one run needs.
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    pub tabular_path: PathBuf,
    pub structured_path: PathBuf,
    pub sink: SinkConfig,
    pub options: TransformOptions,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            tabular_path: PathBuf::from(DEFAULT_TABULAR_PATH),
            structured_path: PathBuf::from(DEFAULT_STRUCTURED_PATH),
            sink: SinkConfig::default(),
            options: TransformOptions::default(),
        }
    }
}

/// Row counts of the transform stage.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct TransformReport {
    pub tabular_rows: usize,
    pub structured_rows: usize,
    pub structured_kept: usize,
    pub dropped_developer: usize,
    pub dropped_name: usize,
    pub prefix_mismatches: usize,
    pub merged_rows: usize,
}

/// Merged table plus the counts that produced it.
#[derive(Debug, Clone)]
pub struct TransformOutput {
    pub table: Table,
    pub report: TransformReport,
}

/// Sources read and transformed, ready to load.
#[derive(Debug, Clone)]
pub struct Prepared {
    pub tabular: SourceInfo,
    pub structured: SourceInfo,
    pub output: TransformOutput,
}

/// Summary of a complete run.
#[derive(Debug, Clone, Serialize)]
pub struct PipelineReport {
    pub tabular: SourceInfo,
    pub structured: SourceInfo,
    pub transform: TransformReport,
    pub table_name: String,
    pub written_rows: u64,
}

impl PipelineReport {
    /// Final line printed on success.
    pub fn summary(&self) -> String {
        format!("Complete! Total rows = {}", self.transform.merged_rows)
    }
}

/// Read the tabular source and check its columns.
pub fn extract_tabular(path: &Path, delimiter: Option<char>) -> PipelineResult<ParsedSource> {
    log_info("Converting csv data...");
    let parsed = read_tabular(path, delimiter)?;
    check_tabular(&parsed.table)?;

    log_info_indent(
        format!(
            "{} rows, encoding {}, delimiter '{}'",
            parsed.info.row_count,
            parsed.info.encoding,
            parsed.info.delimiter.map(format_delimiter).unwrap_or_default()
        ),
        1,
    );
    Ok(parsed)
}

/// Read the structured source, check raw record types, then flatten.
pub fn extract_structured(path: &Path) -> PipelineResult<ParsedSource> {
    log_info("Converting json data...");
    let raw = read_structured(path)?;
    check_structured_records(&raw.records)?;

    let parsed = raw.into_parsed();
    check_structured_columns(&parsed.table)?;

    log_info_indent(format!("{} records", parsed.info.row_count), 1);
    Ok(parsed)
}

/// Normalize both sources and merge them. No I/O.
pub fn transform_sources(tabular: Table, structured: Table, options: &TransformOptions) -> TransformResult<TransformOutput> {
    log_info("Transforming and merging data...");

    let tabular_rows = tabular.len();
    let structured_rows = structured.len();

    let tabular = normalize_tabular(tabular)?;
    let outcome = normalize_structured(structured, options.description_prefix)?;

    if outcome.dropped_developer > 0 || outcome.dropped_name > 0 {
        log_info_indent(
            format!(
                "Dropped {} rows without a developer, {} without a name",
                outcome.dropped_developer, outcome.dropped_name
            ),
            1,
        );
    }
    if outcome.prefix_mismatches > 0 {
        log_warning_indent(
            format!("{} descriptions did not start with the expected prefix", outcome.prefix_mismatches),
            1,
        );
    }

    let structured_kept = outcome.table.len();
    let table = merge(tabular, outcome.table, options.duplicate_keys)?;
    log_success(format!("Merged {} rows", table.len()));

    Ok(TransformOutput {
        report: TransformReport {
            tabular_rows,
            structured_rows,
            structured_kept,
            dropped_developer: outcome.dropped_developer,
            dropped_name: outcome.dropped_name,
            prefix_mismatches: outcome.prefix_mismatches,
            merged_rows: table.len(),
        },
        table,
    })
}

/// Extract and transform, without touching the sink.
pub fn prepare(config: &PipelineConfig) -> PipelineResult<Prepared> {
    let tabular = extract_tabular(&config.tabular_path, config.options.delimiter)?;
    let structured = extract_structured(&config.structured_path)?;
    let output = transform_sources(tabular.table, structured.table, &config.options)?;

    Ok(Prepared {
        tabular: tabular.info,
        structured: structured.info,
        output,
    })
}

/// Replace the destination table with the prepared result.
pub async fn load<S: TableSink>(prepared: Prepared, table_name: &str, sink: &mut S) -> PipelineResult<PipelineReport> {
    log_info("Loading data...");
    let written_rows = sink.replace_table(table_name, &prepared.output.table).await?;

    Ok(PipelineReport {
        tabular: prepared.tabular,
        structured: prepared.structured,
        transform: prepared.output.report,
        table_name: table_name.to_string(),
        written_rows,
    })
}

/// Run the whole ETL against `sink`.
pub async fn run<S: TableSink>(config: &PipelineConfig, sink: &mut S) -> PipelineResult<PipelineReport> {
    let prepared = prepare(config)?;
    load(prepared, &config.sink.table_name, sink).await
}

fn format_delimiter(d: char) -> String {
    match d {
        '\t' => "TAB".to_string(),
        c => c.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{PipelineError, SourceError, TransformError};
    use crate::models::columns;
    use crate::sink::MemorySink;
    use serde_json::{json, Value};
    use std::fs;
    use tempfile::TempDir;

    const CSV: &str = "gamename,year,month,avg,gain,peak,avg_peak_perc\n\
        Dota 2,2021,February,415000.5,,700000,59.2%\n\
        Dota 2,2021,January,420000.0,-4999.5,720000,58.3%\n\
        Half-Life,2021,February,120.3,5.1,300,40.1%\n\
        Unknown Game,2021,February,1.0,0,2,50%\n";

    fn reviews() -> Value {
        json!([
            {"name": "Dota 2", "developer": "Valve", "price": "free",
             "full_desc": {"sort": "x", "desc": "About this game Every day, millions"}},
            {"name": "Half-Life™", "developer": "Valve", "price": "9.99",
             "full_desc": {"desc": "About this game Gordon"}},
            {"name": "Ghost", "developer": "123", "price": null,
             "full_desc": {"desc": "About this game Boo"}},
            {"name": "仁王", "developer": "Koei", "price": 49.99,
             "full_desc": {"desc": ""}}
        ])
    }

    fn fixture(csv: &str, json: &Value) -> (TempDir, PipelineConfig) {
        let dir = TempDir::new().unwrap();
        let tabular_path = dir.path().join("SteamCharts.csv");
        let structured_path = dir.path().join("steam-reviews.json");
        fs::write(&tabular_path, csv).unwrap();
        fs::write(&structured_path, serde_json::to_string(json).unwrap()).unwrap();

        let config = PipelineConfig {
            tabular_path,
            structured_path,
            ..PipelineConfig::default()
        };
        (dir, config)
    }

    #[test]
    fn test_default_paths() {
        let config = PipelineConfig::default();
        assert_eq!(config.tabular_path, PathBuf::from("./Resources/SteamCharts.csv"));
        assert_eq!(config.structured_path, PathBuf::from("./Resources/steam-reviews.json"));
        assert_eq!(config.sink.table_name, "game_data");
    }

    #[tokio::test]
    async fn test_run_end_to_end() {
        let (_dir, config) = fixture(CSV, &reviews());
        let mut sink = MemorySink::new();

        let report = run(&config, &mut sink).await.unwrap();
        let table = sink.table("game_data").unwrap();

        assert_eq!(table.columns(), &columns::MERGED);
        assert_eq!(table.len(), 3);
        assert_eq!(report.written_rows, 3);
        assert_eq!(report.transform.tabular_rows, 4);
        assert_eq!(report.transform.structured_rows, 4);
        assert_eq!(report.transform.dropped_developer, 1);
        assert_eq!(report.transform.dropped_name, 1);
        assert_eq!(report.summary(), "Complete! Total rows = 3");

        let games: Vec<&Value> = table.column_values("game").unwrap().collect();
        assert_eq!(games, vec![&json!("Dota 2"), &json!("Dota 2"), &json!("Half-Life")]);

        assert_eq!(table.get(0, "monthly_change"), Some(&json!(0)));
        assert_eq!(table.get(0, "price_cents"), Some(&json!(0)));
        assert_eq!(table.get(2, "price_cents"), Some(&json!(9.99)));
        assert_eq!(table.get(2, "description"), Some(&json!("Gordon")));

        let ids: Vec<&Value> = table.column_values("id").unwrap().collect();
        assert_eq!(ids, vec![&json!(0), &json!(1), &json!(2)]);
    }

    #[tokio::test]
    async fn test_rerun_replaces_with_identical_table() {
        let (_dir, config) = fixture(CSV, &reviews());
        let mut sink = MemorySink::new();

        run(&config, &mut sink).await.unwrap();
        let first = sink.table("game_data").cloned().unwrap();
        run(&config, &mut sink).await.unwrap();

        assert_eq!(sink.table("game_data"), Some(&first));
        assert_eq!(sink.writes(), 2);
    }

    #[tokio::test]
    async fn test_custom_table_name() {
        let (_dir, mut config) = fixture(CSV, &reviews());
        config.sink.table_name = "games_v2".into();
        let mut sink = MemorySink::new();

        let report = run(&config, &mut sink).await.unwrap();
        assert_eq!(report.table_name, "games_v2");
        assert!(sink.table("games_v2").is_some());
        assert!(sink.table("game_data").is_none());
    }

    #[tokio::test]
    async fn test_missing_file_is_source_error() {
        let (_dir, mut config) = fixture(CSV, &reviews());
        config.tabular_path = PathBuf::from("/nonexistent/SteamCharts.csv");
        let mut sink = MemorySink::new();

        let err = run(&config, &mut sink).await.unwrap_err();
        assert!(matches!(err, PipelineError::Source(SourceError::Io { .. })));
        assert_eq!(sink.writes(), 0);
    }

    #[tokio::test]
    async fn test_missing_column_fails_before_write() {
        let csv = "gamename,year,month,avg,peak,avg_peak_perc\nDota 2,2021,May,1,2,3%\n";
        let (_dir, config) = fixture(csv, &reviews());
        let mut sink = MemorySink::new();

        let err = run(&config, &mut sink).await.unwrap_err();
        assert!(matches!(err, PipelineError::Transform(TransformError::MissingColumn(c)) if c == "gain"));
        assert_eq!(sink.writes(), 0);
    }

    #[tokio::test]
    async fn test_bad_record_type_rejected() {
        let json = json!([{"name": "Dota 2", "developer": "Valve", "price": ["9.99"], "full_desc": {"desc": ""}}]);
        let (_dir, config) = fixture(CSV, &json);
        let mut sink = MemorySink::new();

        let err = run(&config, &mut sink).await.unwrap_err();
        assert!(matches!(err, PipelineError::Transform(TransformError::TypeMismatch { record: 0, .. })));
    }

    #[test]
    fn test_transform_sources_duplicate_policy() {
        let (_dir, config) = fixture(CSV, &reviews());
        let tabular = extract_tabular(&config.tabular_path, None).unwrap();

        let json = json!([
            {"name": "Half-Life", "developer": "Valve", "price": "9.99", "full_desc": {"desc": ""}},
            {"name": "Half-Life", "developer": "Sierra", "price": "9.99", "full_desc": {"desc": ""}}
        ]);
        let (_dir2, config2) = fixture(CSV, &json);
        let structured = extract_structured(&config2.structured_path).unwrap();

        let options = TransformOptions {
            duplicate_keys: DuplicateKeyPolicy::Error,
            ..TransformOptions::default()
        };
        let err = transform_sources(tabular.table.clone(), structured.table.clone(), &options).unwrap_err();
        assert!(matches!(err, TransformError::DuplicateKey(k) if k == "Half-Life"));

        let out = transform_sources(tabular.table, structured.table, &TransformOptions::default()).unwrap();
        assert_eq!(out.report.merged_rows, 2);
    }

    #[test]
    fn test_strict_prefix_policy() {
        let json = json!([
            {"name": "Half-Life", "developer": "Valve", "price": "9.99", "full_desc": {"desc": "Gordon Freeman is back"}}
        ]);
        let (_dir, mut config) = fixture(CSV, &json);
        config.options.description_prefix = PrefixPolicy::Strict;

        let err = prepare(&config).unwrap_err();
        assert!(matches!(err, PipelineError::Transform(TransformError::DescriptionPrefix { row: 0, .. })));

        config.options.description_prefix = PrefixPolicy::Warn;
        let prepared = prepare(&config).unwrap();
        assert_eq!(prepared.output.report.prefix_mismatches, 1);
    }

    #[test]
    fn test_semicolon_delimiter_detected() {
        let csv = CSV.replace(',', ";");
        let (_dir, config) = fixture(&csv, &reviews());
        let prepared = prepare(&config).unwrap();
        assert_eq!(prepared.tabular.delimiter, Some(';'));
        assert_eq!(prepared.output.report.merged_rows, 3);
    }
}
