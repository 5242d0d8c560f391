//! Log schema definitions.
//!
//! A schema is a YAML (or JSON) document naming a regular expression and the columns
//! taken from its named capture groups:
//!
//! ```yaml
//! regex: '^(?P<timestamp>\S+ \S+) (?P<level>\w+) (?P<message>.*)$'
//! table: app
//! filename: '\.log$'
//! columns:
//!   - name: timestamp
//!     type: datetime
//!   - name: level
//!   - name: message
//!     multiline: true
//! ```
//!
//! Column types default to `string`. Typed columns are checked as lines are read;
//! the engine still compares their text.

use chrono::{DateTime, FixedOffset, NaiveDateTime};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use thiserror::Error;
use validator::Validate;

/// Errors that can occur while loading or compiling a schema.
#[derive(Debug, Error)]
pub enum SchemaError {
    /// The schema file could not be read.
    #[error("Failed to read schema file {path}: {source}")]
    Io {
        /// The schema file.
        path: PathBuf,
        /// The underlying error.
        source: std::io::Error,
    },

    /// The schema is not valid JSON or has the wrong shape.
    #[error("Schema failed to parse: {0}")]
    Json(#[from] serde_json::Error),

    /// The schema is not valid YAML or has the wrong shape.
    #[error("Schema failed to parse: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// A field failed validation.
    #[error("Validation failed: {0}")]
    ValidationError(#[from] validator::ValidationErrors),

    /// The regex does not compile.
    #[error("Invalid schema regex: {0}")]
    InvalidRegex(#[from] regex::Error),

    /// Some columns have no named capture group.
    #[error("All columns must correspond to named capture groups. Missing: {0:?}")]
    MissingColumns(Vec<String>),

    /// More than one column is marked multiline.
    #[error("There can only be one multiline column. Multiline columns: {0:?}")]
    TooManyMultilineColumns(Vec<String>),

    /// A non-string column is marked multiline.
    #[error("Column '{column}' is a '{column_type}' so it cannot be multiline. Only strings can be multiline.")]
    InvalidMultilineType {
        /// The column name.
        column: String,
        /// Its declared type.
        column_type: ColumnType,
    },

    /// A captured value does not parse as its column type.
    #[error("Line {line}: column '{column}' expects {column_type}, got {value:?}")]
    TypeMismatch {
        /// One-based line number within the file.
        line: usize,
        /// The column name.
        column: String,
        /// Its declared type.
        column_type: ColumnType,
        /// The captured text.
        value: String,
    },
}

/// The declared type of a column.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum ColumnType {
    /// Any text.
    #[default]
    #[serde(alias = "string")]
    String,
    /// 32-bit signed integer.
    #[serde(alias = "i32")]
    Int32,
    /// 64-bit signed integer.
    #[serde(alias = "i64")]
    Int64,
    /// `true` or `false`.
    #[serde(alias = "bool")]
    Bool,
    /// 32-bit float.
    #[serde(alias = "float")]
    Float,
    /// 64-bit float.
    #[serde(alias = "double")]
    Double,
    /// RFC 3339 timestamp, or `YYYY-MM-DD HH:MM:SS` with optional fraction.
    #[serde(alias = "datetime")]
    DateTime,
}

impl ColumnType {
    /// Returns `true` if `text` is a valid value of this type.
    #[must_use]
    pub fn accepts(self, text: &str) -> bool {
        match self {
            Self::String => true,
            Self::Int32 => text.parse::<i32>().is_ok(),
            Self::Int64 => text.parse::<i64>().is_ok(),
            Self::Bool => text.parse::<bool>().is_ok(),
            Self::Float => text.parse::<f32>().is_ok(),
            Self::Double => text.parse::<f64>().is_ok(),
            Self::DateTime => {
                text.parse::<DateTime<FixedOffset>>().is_ok()
                    || NaiveDateTime::parse_from_str(text, "%Y-%m-%d %H:%M:%S%.f").is_ok()
                    || NaiveDateTime::parse_from_str(text, "%Y-%m-%dT%H:%M:%S%.f").is_ok()
            }
        }
    }
}

impl fmt::Display for ColumnType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::String => "string",
            Self::Int32 => "i32",
            Self::Int64 => "i64",
            Self::Bool => "bool",
            Self::Float => "float",
            Self::Double => "double",
            Self::DateTime => "datetime",
        };
        write!(f, "{name}")
    }
}

/// One column of a schema.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Validate)]
pub struct ColumnSpec {
    /// Column name; must match a named capture group.
    #[validate(length(min = 1, message = "Column name cannot be empty"))]
    pub name: String,

    /// Declared type; captured text is checked against it.
    #[serde(rename = "type", default)]
    pub column_type: ColumnType,

    /// Whether lines that do not match the regex continue this column.
    #[serde(default)]
    pub multiline: bool,
}

#[cfg(test)]
impl ColumnSpec {
    /// Creates a single-line column.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            column_type: ColumnType::String,
            multiline: false,
        }
    }

    /// Creates a multiline string column.
    #[must_use]
    pub fn multiline(name: impl Into<String>) -> Self {
        Self {
            multiline: true,
            ..Self::new(name)
        }
    }

    /// Sets the column type.
    #[must_use]
    pub fn with_type(mut self, column_type: ColumnType) -> Self {
        self.column_type = column_type;
        self
    }
}

/// A log schema as written in a schema file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Validate)]
pub struct Schema {
    /// Regex with one named capture group per column.
    #[validate(length(min = 1, message = "Schema regex cannot be empty"))]
    pub regex: String,

    /// Optional table name, informational only.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub table: Option<String>,

    /// Optional regex; only directory entries whose file name matches are read.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub filename: Option<String>,

    /// Columns in output order.
    #[validate(length(min = 1, message = "Schema needs at least one column"), nested)]
    pub columns: Vec<ColumnSpec>,
}

impl Schema {
    /// Reads and compiles a schema file.
    ///
    /// Files ending in `.json` are read as JSON, anything else as YAML.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or the schema is invalid.
    pub fn load(path: &Path) -> Result<CompiledSchema, SchemaError> {
        let text = std::fs::read_to_string(path).map_err(|source| SchemaError::Io {
            path: path.to_path_buf(),
            source,
        })?;

        let is_json = path
            .extension()
            .is_some_and(|ext| ext.eq_ignore_ascii_case("json"));
        let schema = if is_json {
            Self::from_json(&text)?
        } else {
            Self::from_yaml(&text)?
        };
        schema.compile()
    }

    /// Parses a schema from YAML without compiling it.
    ///
    /// # Errors
    ///
    /// Returns an error if the text is not a schema document.
    pub fn from_yaml(text: &str) -> Result<Self, SchemaError> {
        Ok(serde_yaml::from_str(text)?)
    }

    /// Parses a schema from JSON without compiling it.
    ///
    /// # Errors
    ///
    /// Returns an error if the text is not a schema document.
    pub fn from_json(text: &str) -> Result<Self, SchemaError> {
        Ok(serde_json::from_str(text)?)
    }

    /// Validates the schema and compiles its regex.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - A field fails validation (empty regex, no columns, empty column name)
    /// - A regex does not compile
    /// - A column has no matching named capture group
    /// - More than one column is multiline, or a multiline column is not a string
    pub fn compile(self) -> Result<CompiledSchema, SchemaError> {
        self.validate()?;
        let regex = Regex::new(&self.regex)?;
        let filename = self.filename.as_deref().map(Regex::new).transpose()?;

        let missing: Vec<String> = self
            .columns
            .iter()
            .filter(|c| !regex.capture_names().flatten().any(|name| name == c.name))
            .map(|c| c.name.clone())
            .collect();
        if !missing.is_empty() {
            return Err(SchemaError::MissingColumns(missing));
        }

        let multiline: Vec<String> = self
            .columns
            .iter()
            .filter(|c| c.multiline)
            .map(|c| c.name.clone())
            .collect();
        if multiline.len() > 1 {
            return Err(SchemaError::TooManyMultilineColumns(multiline));
        }

        if let Some(column) = self
            .columns
            .iter()
            .find(|c| c.multiline && c.column_type != ColumnType::String)
        {
            return Err(SchemaError::InvalidMultilineType {
                column: column.name.clone(),
                column_type: column.column_type,
            });
        }

        Ok(CompiledSchema {
            regex,
            filename,
            multiline_column: multiline.into_iter().next(),
            schema: self,
        })
    }
}

/// A validated schema with its regex compiled.
#[derive(Debug, Clone)]
pub struct CompiledSchema {
    schema: Schema,
    regex: Regex,
    filename: Option<Regex>,
    multiline_column: Option<String>,
}

impl CompiledSchema {
    /// The compiled regex.
    #[must_use]
    pub fn regex(&self) -> &Regex {
        &self.regex
    }

    /// The multiline column, if the schema declares one.
    #[must_use]
    pub fn multiline_column(&self) -> Option<&str> {
        self.multiline_column.as_deref()
    }

    /// The table name, if the schema declares one.
    #[must_use]
    pub fn table(&self) -> Option<&str> {
        self.schema.table.as_deref()
    }

    /// Column names in declaration order.
    pub fn column_names(&self) -> impl Iterator<Item = &str> {
        self.schema.columns.iter().map(|c| c.name.as_str())
    }

    /// Columns in declaration order.
    #[must_use]
    pub fn columns(&self) -> &[ColumnSpec] {
        &self.schema.columns
    }

    /// Returns `true` if a file with this name should be read from a directory.
    #[must_use]
    pub fn accepts_file_name(&self, name: &str) -> bool {
        self.filename.as_ref().is_none_or(|regex| regex.is_match(name))
    }
}
