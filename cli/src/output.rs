//! Result rendering for the terminal.

use anyhow::Result;
use comfy_table::{presets, ContentArrangement, Table};
use engine::models::Value;
use engine::query::OutputRow;
use std::io::Write;

/// How query results are printed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, clap::ValueEnum)]
pub enum OutputFormat {
    /// Bordered table with a row count.
    #[default]
    Table,
    /// A JSON array of objects.
    Json,
    /// Comma-separated values with a header line.
    Csv,
}

/// Writes `rows` in the given format.
///
/// `total_count` is the number of rows that matched before paging; the table format
/// reports it when paging dropped some of them.
///
/// # Errors
///
/// Returns an error if writing to `out` fails.
pub fn write_results<W: Write>(
    out: &mut W,
    format: OutputFormat,
    columns: &[String],
    rows: &[OutputRow],
    total_count: usize,
) -> Result<()> {
    match format {
        OutputFormat::Table => write_table(out, columns, rows, total_count),
        OutputFormat::Json => write_json(out, rows),
        OutputFormat::Csv => write_csv(out, columns, rows),
    }
}

fn write_table<W: Write>(
    out: &mut W,
    columns: &[String],
    rows: &[OutputRow],
    total_count: usize,
) -> Result<()> {
    if !columns.is_empty() {
        writeln!(out, "{}", create_table(columns, rows))?;
    }

    if total_count == rows.len() {
        let noun = if rows.len() == 1 { "row" } else { "rows" };
        writeln!(out, "({} {noun})", rows.len())?;
    } else {
        writeln!(out, "({} of {total_count} rows)", rows.len())?;
    }
    Ok(())
}

fn create_table(columns: &[String], rows: &[OutputRow]) -> Table {
    let mut table = Table::new();
    table
        .load_preset(presets::UTF8_FULL)
        .set_content_arrangement(ContentArrangement::Disabled)
        .set_header(columns.to_vec());

    for row in rows {
        table.add_row(row.values().map(table_cell).collect::<Vec<_>>());
    }
    table
}

// Keeps one output line per row.
fn table_cell(value: &Value) -> String {
    value
        .to_string()
        .replace('\r', "\\r")
        .replace('\n', "\\n")
        .replace('\t', "\\t")
}

fn write_json<W: Write>(out: &mut W, rows: &[OutputRow]) -> Result<()> {
    serde_json::to_writer_pretty(&mut *out, rows)?;
    writeln!(out)?;
    Ok(())
}

fn write_csv<W: Write>(out: &mut W, columns: &[String], rows: &[OutputRow]) -> Result<()> {
    let mut writer = csv::Writer::from_writer(out);
    writer.write_record(columns)?;

    for row in rows {
        writer.write_record(row.values().map(ToString::to_string))?;
    }
    writer.flush()?;
    Ok(())
}
