//! Turning log files into rows.

use crate::schema::{CompiledSchema, SchemaError};
use anyhow::{bail, Context, Result};
use engine::models::Row;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// Builds rows from log lines, one schema match at a time.
///
/// A line that matches the schema regex starts a new row. A line that does not is
/// appended to the current row's multiline column, or dropped when the schema has no
/// multiline column or no row has started yet.
///
/// Captured values of typed columns are checked against their declared type.
#[derive(Debug)]
pub struct RowReader<'a> {
    schema: &'a CompiledSchema,
    current: Option<Row>,
    line: usize,
    dropped: usize,
}

impl<'a> RowReader<'a> {
    /// Creates a reader for the given schema.
    #[must_use]
    pub fn new(schema: &'a CompiledSchema) -> Self {
        Self {
            schema,
            current: None,
            line: 0,
            dropped: 0,
        }
    }

    /// Feeds one line. Returns the previous row once a new one starts.
    ///
    /// # Errors
    ///
    /// Returns [`SchemaError::TypeMismatch`] if a captured value does not parse as
    /// its column type.
    pub fn push_line(&mut self, line: &str) -> Result<Option<Row>, SchemaError> {
        self.line += 1;

        if let Some(captures) = self.schema.regex().captures(line) {
            let mut row = Row::new();
            for column in self.schema.columns() {
                let Some(value) = captures.name(&column.name) else {
                    continue;
                };
                if !column.column_type.accepts(value.as_str()) {
                    return Err(SchemaError::TypeMismatch {
                        line: self.line,
                        column: column.name.clone(),
                        column_type: column.column_type,
                        value: value.as_str().to_string(),
                    });
                }
                row.insert(column.name.as_str(), value.as_str());
            }
            return Ok(self.current.replace(row));
        }

        match (self.current.as_mut(), self.schema.multiline_column()) {
            (Some(row), Some(column)) => row.push_line(column, line),
            _ => self.dropped += 1,
        }
        Ok(None)
    }

    /// Number of lines dropped so far.
    #[must_use]
    pub fn dropped(&self) -> usize {
        self.dropped
    }

    /// Ends the input and returns the last row, if any.
    #[must_use]
    pub fn finish(self) -> Option<Row> {
        self.current
    }

    /// Reads every line of `text`.
    ///
    /// # Errors
    ///
    /// See [`RowReader::push_line`].
    pub fn read_str(mut self, text: &str) -> Result<Vec<Row>, SchemaError> {
        let mut rows = Vec::new();
        for line in text.lines() {
            rows.extend(self.push_line(line)?);
        }
        if self.dropped() > 0 {
            debug!(dropped = self.dropped(), "Dropped lines not matching the schema");
        }
        rows.extend(self.finish());
        Ok(rows)
    }
}

/// Loads rows from a file, or from every regular file in a directory.
///
/// Directory entries are read in name order and are not searched recursively; when
/// the schema has a `filename` pattern, only entries whose name matches are read.
/// Each file is read on its own, so continuation lines never cross file boundaries.
/// Files that are not valid UTF-8 are skipped with a warning.
///
/// # Errors
///
/// Returns an error if the path does not exist, a file cannot be read, or a value
/// does not match its column type.
pub fn load_rows(schema: &CompiledSchema, path: &Path) -> Result<Vec<Row>> {
    let files = input_files(schema, path)?;

    let mut rows = Vec::new();
    for file in &files {
        let bytes =
            fs::read(file).with_context(|| format!("Failed to read {}", file.display()))?;

        let Ok(text) = String::from_utf8(bytes) else {
            warn!(file = %file.display(), "Skipping file that is not valid UTF-8");
            continue;
        };

        let file_rows = RowReader::new(schema)
            .read_str(&text)
            .with_context(|| format!("Failed to parse {}", file.display()))?;
        debug!(file = %file.display(), rows = file_rows.len(), "Loaded file");
        rows.extend(file_rows);
    }

    debug!(files = files.len(), rows = rows.len(), "Loaded input");
    Ok(rows)
}

fn input_files(schema: &CompiledSchema, path: &Path) -> Result<Vec<PathBuf>> {
    if path.is_file() {
        return Ok(vec![path.to_path_buf()]);
    }

    if !path.is_dir() {
        bail!("Path does not exist: {}", path.display());
    }

    let mut files = Vec::new();
    for entry in
        fs::read_dir(path).with_context(|| format!("Failed to list {}", path.display()))?
    {
        let file_path = entry?.path();
        if !file_path.is_file() {
            continue;
        }

        let accepted = file_path
            .file_name()
            .is_some_and(|name| schema.accepts_file_name(&name.to_string_lossy()));
        if accepted {
            files.push(file_path);
        } else {
            debug!(file = %file_path.display(), "Skipping file not matching the filename pattern");
        }
    }
    files.sort();
    Ok(files)
}
