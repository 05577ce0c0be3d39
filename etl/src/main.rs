//! Steamload CLI - load SteamCharts and Steam store data into Postgres
//!
//! # Main Command
//!
//! ```bash
//! steamload run                               # Full ETL with default paths
//! steamload run --dry-run -o merged.json      # Transform only, dump result
//! ```
//!
//! # Debug Commands
//!
//! ```bash
//! steamload parse-csv SteamCharts.csv         # Decode CSV to JSON
//! steamload parse-json steam-reviews.json     # Flatten JSON records
//! steamload transform --csv A.csv --json B.json
//! ```

use std::fs;
use std::path::{Path, PathBuf};

use clap::{Args, Parser, Subcommand};
use serde_json::Value;
use steamload::logs::LOG_BROADCASTER;
use steamload::transform::pipeline::{
    extract_structured, extract_tabular, load, prepare, DEFAULT_STRUCTURED_PATH,
    DEFAULT_TABULAR_PATH,
};
use steamload::{
    read_structured, read_tabular, transform_sources, DuplicateKeyPolicy, MemorySink,
    PipelineConfig, PostgresSink, PrefixPolicy, SinkConfig, Table, TransformOptions,
};

type CliResult = Result<(), Box<dyn std::error::Error>>;

#[derive(Parser)]
#[command(name = "steamload")]
#[command(about = "Merge SteamCharts statistics with Steam store records into Postgres", long_about = None)]
struct Cli {
    /// Do not print progress messages
    #[arg(short, long, global = true)]
    quiet: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Full pipeline: read, transform, replace the destination table
    Run {
        #[command(flatten)]
        sources: SourceArgs,

        #[command(flatten)]
        transform: TransformArgs,

        /// Database host
        #[arg(long)]
        host: Option<String>,

        /// Database port
        #[arg(long)]
        port: Option<u16>,

        /// Database name
        #[arg(long)]
        database: Option<String>,

        /// Destination table
        #[arg(long)]
        table: Option<String>,

        /// Write to memory instead of Postgres
        #[arg(long)]
        dry_run: bool,

        /// Dump the merged table as JSON (only with --dry-run)
        #[arg(short, long, requires = "dry_run")]
        output: Option<PathBuf>,
    },

    /// Parse a CSV file and output JSON
    ParseCsv {
        /// Input CSV file
        input: PathBuf,

        /// CSV delimiter (auto-detect if not specified)
        #[arg(short, long)]
        delimiter: Option<char>,

        /// Output file (default: stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Parse and flatten a JSON file and output JSON
    ParseJson {
        /// Input JSON file
        input: PathBuf,

        /// Output file (default: stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Transform both sources and output the merged records, without loading
    Transform {
        #[command(flatten)]
        sources: SourceArgs,

        #[command(flatten)]
        transform: TransformArgs,

        /// Output file (default: stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

#[derive(Args)]
struct SourceArgs {
    /// SteamCharts CSV file
    #[arg(long, default_value = DEFAULT_TABULAR_PATH)]
    csv: PathBuf,

    /// Steam store JSON file
    #[arg(long, default_value = DEFAULT_STRUCTURED_PATH)]
    json: PathBuf,
}

#[derive(Args)]
struct TransformArgs {
    /// Handling of repeated game names in the JSON source
    #[arg(long, value_enum, default_value_t = DuplicateKeyPolicy::CrossProduct)]
    duplicate_keys: DuplicateKeyPolicy,

    /// Handling of the "About this game " description prefix
    #[arg(long, value_enum, default_value_t = PrefixPolicy::Strip)]
    description_prefix: PrefixPolicy,

    /// CSV delimiter (auto-detect if not specified)
    #[arg(short, long)]
    delimiter: Option<char>,
}

impl TransformArgs {
    fn options(&self) -> TransformOptions {
        TransformOptions {
            duplicate_keys: self.duplicate_keys,
            description_prefix: self.description_prefix,
            delimiter: self.delimiter,
        }
    }
}

#[tokio::main(flavor = "current_thread")]
async fn main() {
    // Load .env file (if present)
    dotenvy::dotenv().ok();

    let cli = Cli::parse();
    LOG_BROADCASTER.set_quiet(cli.quiet);

    let result = match cli.command {
        Commands::Run {
            sources,
            transform,
            host,
            port,
            database,
            table,
            dry_run,
            output,
        } => {
            let target = SinkTarget { host, port, database, table };
            cmd_run(sources, &transform, target, dry_run, output.as_deref()).await
        }

        Commands::ParseCsv {
            input,
            delimiter,
            output,
        } => cmd_parse_csv(&input, delimiter, output.as_deref()),

        Commands::ParseJson { input, output } => cmd_parse_json(&input, output.as_deref()),

        Commands::Transform {
            sources,
            transform,
            output,
        } => cmd_transform(&sources, &transform, output.as_deref()),
    };

    if let Err(e) = result {
        eprintln!("error: {}", e);
        std::process::exit(1);
    }
}

/// Connection flags; each one overrides the environment.
struct SinkTarget {
    host: Option<String>,
    port: Option<u16>,
    database: Option<String>,
    table: Option<String>,
}

impl SinkTarget {
    fn resolve(self) -> Result<SinkConfig, Box<dyn std::error::Error>> {
        let mut config = SinkConfig::from_env()?;
        if let Some(host) = self.host {
            config.host = host;
        }
        if let Some(port) = self.port {
            config.port = port;
        }
        if let Some(database) = self.database {
            config.database = database;
        }
        if let Some(table) = self.table {
            config.table_name = table;
        }
        config.validate()?;
        Ok(config)
    }
}

async fn cmd_run(
    sources: SourceArgs,
    transform: &TransformArgs,
    target: SinkTarget,
    dry_run: bool,
    output: Option<&Path>,
) -> CliResult {
    let config = PipelineConfig {
        tabular_path: sources.csv,
        structured_path: sources.json,
        sink: target.resolve()?,
        options: transform.options(),
    };

    let prepared = prepare(&config)?;

    let report = if dry_run {
        let mut sink = MemorySink::new();
        let report = load(prepared, &config.sink.table_name, &mut sink).await?;
        if let Some(path) = output {
            if let Some(table) = sink.table(&config.sink.table_name) {
                write_output(&records_json(table)?, Some(path))?;
            }
        }
        report
    } else {
        // Connect only once the data is ready
        let mut sink = PostgresSink::connect(&config.sink).await?;
        load(prepared, &config.sink.table_name, &mut sink).await?
    };

    println!("{}", report.summary());
    Ok(())
}

fn cmd_parse_csv(input: &Path, delimiter: Option<char>, output: Option<&Path>) -> CliResult {
    eprintln!("Parsing CSV: {}", input.display());

    let parsed = read_tabular(input, delimiter)?;
    eprintln!("   Encoding: {}", parsed.info.encoding);
    if let Some(d) = parsed.info.delimiter {
        eprintln!(
            "   Delimiter: '{}'{}",
            format_delimiter(d),
            if delimiter.is_none() { " (auto-detected)" } else { "" }
        );
    }
    eprintln!("   Columns: {}", parsed.info.headers.join(", "));
    eprintln!("Parsed {} records", parsed.info.row_count);

    write_output(&records_json(&parsed.table)?, output)
}

fn cmd_parse_json(input: &Path, output: Option<&Path>) -> CliResult {
    eprintln!("Parsing JSON: {}", input.display());

    let parsed = read_structured(input)?.into_parsed();
    eprintln!("   Columns: {}", parsed.info.headers.join(", "));
    eprintln!("Parsed {} records", parsed.info.row_count);

    write_output(&records_json(&parsed.table)?, output)
}

fn cmd_transform(sources: &SourceArgs, transform: &TransformArgs, output: Option<&Path>) -> CliResult {
    let options = transform.options();
    let tabular = extract_tabular(&sources.csv, options.delimiter)?;
    let structured = extract_structured(&sources.json)?;

    let merged = transform_sources(tabular.table, structured.table, &options)?;
    eprintln!(
        "{} merged rows ({} developer drops, {} name drops)",
        merged.report.merged_rows, merged.report.dropped_developer, merged.report.dropped_name
    );

    write_output(&records_json(&merged.table)?, output)
}

fn records_json(table: &Table) -> Result<String, serde_json::Error> {
    serde_json::to_string_pretty(&Value::Array(table.to_records()))
}

fn format_delimiter(d: char) -> String {
    match d {
        '\t' => "\\t".to_string(),
        c => c.to_string(),
    }
}

fn write_output(content: &str, path: Option<&Path>) -> CliResult {
    match path {
        Some(p) => {
            fs::write(p, content)?;
            eprintln!("Output written to: {}", p.display());
        }
        None => {
            println!("{}", content);
        }
    }
    Ok(())
}
