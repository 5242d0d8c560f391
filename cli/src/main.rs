//! logsql CLI
//!
//! Runs a SQL-like query over log files parsed with a regex schema.
//!
//! # Usage
//!
//! ```bash
//! logsql --help
//! logsql --schema app.yaml app.log "SELECT * WHERE level = 'error' LIMIT 20"
//! logsql --schema app.yaml logs/ --format json "SELECT timestamp, message ORDER BY timestamp DESC"
//! ```

#![deny(unsafe_code)]

mod ingest;
mod output;
mod schema;

use anyhow::{Context, Result};
use clap::Parser;
use engine::config::{CaseSensitivity, ComparisonConfig};
use engine::query::{parse_query, Executor};
use output::OutputFormat;
use schema::Schema;
use std::io::Write;
use std::path::PathBuf;
use tracing::debug;

/// logsql - query log files with SQL-like syntax
#[derive(Parser, Debug)]
#[command(name = "logsql")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Log file, or directory of log files
    path: PathBuf,

    /// Query to run, e.g. "SELECT * WHERE level = 'error'"
    query: String,

    /// Schema file describing how lines are split into columns (YAML, or JSON with a
    /// .json extension)
    #[arg(short, long, env = "LOGSQL_SCHEMA")]
    schema: PathBuf,

    /// Output format
    #[arg(short, long, env = "LOGSQL_FORMAT", value_enum, default_value_t = OutputFormat::Table)]
    format: OutputFormat,

    /// Compare strings case-insensitively
    #[arg(short, long, env = "LOGSQL_IGNORE_CASE")]
    ignore_case: bool,
}

impl Cli {
    fn comparison_config(&self) -> ComparisonConfig {
        if self.ignore_case {
            ComparisonConfig::new(CaseSensitivity::Insensitive)
        } else {
            ComparisonConfig::default()
        }
    }
}

fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    run(&cli, &mut std::io::stdout().lock())
}

fn run<W: Write>(cli: &Cli, out: &mut W) -> Result<()> {
    let query = parse_query(&cli.query).context("Invalid query")?;

    let schema = Schema::load(&cli.schema)
        .with_context(|| format!("Invalid schema {}", cli.schema.display()))?;
    if let (Some(source), Some(table)) = (query.from.as_deref(), schema.table()) {
        if source != table {
            tracing::warn!(source, table, "FROM names a different table than the schema");
        }
    }

    let rows = ingest::load_rows(&schema, &cli.path)?;
    debug!(rows = rows.len(), "Running query");

    let result = Executor::new(query, schema.column_names())
        .with_config(cli.comparison_config())
        .execute(rows)
        .context("Query failed")?;

    let columns = result.columns().to_vec();
    let total_count = result.total_count();
    let rows: Vec<_> = result.collect();

    output::write_results(out, cli.format, &columns, &rows, total_count)?;
    out.flush()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    const SCHEMA: &str = r#"{
        "regex": "^(?P<timestamp>\\d{2}:\\d{2}:\\d{2}) (?P<level>[A-Z]+) (?P<message>.*)$",
        "table": "app",
        "columns": [
            { "name": "timestamp" },
            { "name": "level" },
            { "name": "message", "multiline": true }
        ]
    }"#;

    const LOG: &str = "\
10:00:00 INFO service started
10:00:05 ERROR request failed
  at handler
10:00:09 WARN slow response
";

    fn run_cli(args: &[&str]) -> Result<String> {
        let dir = tempfile::tempdir()?;
        let schema = dir.path().join("schema.json");
        let log = dir.path().join("app.log");
        fs::write(&schema, SCHEMA)?;
        fs::write(&log, LOG)?;

        let mut argv = vec![
            "logsql".to_string(),
            "--schema".to_string(),
            schema.display().to_string(),
            log.display().to_string(),
        ];
        argv.extend(args.iter().map(ToString::to_string));

        let cli = Cli::try_parse_from(argv)?;
        let mut out = Vec::new();
        run(&cli, &mut out)?;
        Ok(String::from_utf8(out)?)
    }

    #[test]
    fn test_cli_parse() {
        let cli = Cli::try_parse_from(["logsql", "--schema", "s.json", "app.log", "SELECT *"]);
        assert!(cli.is_ok());
        let cli = cli.unwrap();
        assert_eq!(cli.format, OutputFormat::Table);
        assert!(!cli.ignore_case);
        assert_eq!(cli.comparison_config(), ComparisonConfig::default());
    }

    #[test]
    fn test_cli_parse_options() {
        let cli = Cli::try_parse_from([
            "logsql",
            "-s",
            "s.json",
            "--format",
            "csv",
            "--ignore-case",
            "logs/",
            "SELECT *",
        ])
        .unwrap();
        assert_eq!(cli.format, OutputFormat::Csv);
        assert!(!cli.comparison_config().is_case_sensitive());
    }

    #[test]
    fn test_cli_requires_query() {
        let cli = Cli::try_parse_from(["logsql", "--schema", "s.json", "app.log"]);
        assert!(cli.is_err());
    }

    #[test]
    fn test_run_table() {
        let output = run_cli(&["SELECT timestamp, level WHERE level != 'INFO'"]).unwrap();
        assert!(output.contains("timestamp"));
        assert!(output.contains("10:00:05"));
        assert!(output.contains("WARN"));
        assert!(!output.contains("10:00:00"));
        assert!(output.ends_with("(2 rows)\n"));
    }

    #[test]
    fn test_run_json_with_multiline() {
        let output = run_cli(&["--format", "json", "SELECT message WHERE level = 'ERROR'"])
            .unwrap();
        let parsed: serde_json::Value = serde_json::from_str(&output).unwrap();
        assert_eq!(
            parsed,
            serde_json::json!([{ "message": "request failed\n  at handler" }])
        );
    }

    #[test]
    fn test_run_ignore_case() {
        let output = run_cli(&[
            "--ignore-case",
            "--format",
            "csv",
            "SELECT timestamp WHERE level = 'warn'",
        ])
        .unwrap();
        assert_eq!(output, "timestamp\n10:00:09\n");
    }

    #[test]
    fn test_run_yaml_schema() {
        let dir = tempfile::tempdir().unwrap();
        let schema = dir.path().join("schema.yaml");
        fs::write(
            &schema,
            r"
regex: '^(?P<timestamp>\d{2}:\d{2}:\d{2}) (?P<level>[A-Z]+) (?P<message>.*)$'
filename: '\.log$'
columns:
  - name: timestamp
  - name: level
  - name: message
    type: string
    multiline: true
",
        )
        .unwrap();
        fs::write(dir.path().join("app.log"), LOG).unwrap();
        fs::write(dir.path().join("notes.txt"), "10:00:01 ERROR ignored\n").unwrap();

        let cli = Cli::try_parse_from([
            "logsql".to_string(),
            "--schema".to_string(),
            schema.display().to_string(),
            "--format".to_string(),
            "csv".to_string(),
            dir.path().display().to_string(),
            "SELECT timestamp WHERE level = 'ERROR'".to_string(),
        ])
        .unwrap();
        let mut out = Vec::new();
        run(&cli, &mut out).unwrap();
        assert_eq!(String::from_utf8(out).unwrap(), "timestamp\n10:00:05\n");
    }

    #[test]
    fn test_run_invalid_query() {
        let err = run_cli(&["SELECT * WHERE"]).unwrap_err();
        assert!(format!("{err:#}").contains("Invalid query"));
    }
}
