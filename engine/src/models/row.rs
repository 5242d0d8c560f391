//! Row model.
//!
//! A [`Row`] is one logical record handed to the engine by the ingestion layer. Each
//! field holds one or more raw text lines; a field captured across several lines (a
//! stack trace attached to a message, for instance) is read back as a single value
//! with its lines joined by `\n`.

use super::value::Value;

#[derive(Debug, Clone, PartialEq, Eq)]
struct Field {
    name: String,
    lines: Vec<String>,
}

/// One logical record: an ordered mapping from column name to text lines.
///
/// Column names are case-sensitive. Fields keep their insertion order, which is the
/// order the ingestion layer declared them in.
///
/// # Example
///
/// ```
/// use engine::models::{Row, Value};
///
/// let row = Row::new()
///     .with_field("level", "error")
///     .with_lines("message", ["failed", "  at main"]);
///
/// assert_eq!(row.get("level"), Value::from("error"));
/// assert_eq!(row.get("message"), Value::from("failed\n  at main"));
/// assert_eq!(row.get("service"), Value::Missing);
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Row {
    fields: Vec<Field>,
}

impl Row {
    /// Creates an empty row.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets a single-line field, replacing any previous value.
    #[must_use]
    pub fn with_field(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.insert(name, value);
        self
    }

    /// Sets a field from several lines, replacing any previous value.
    #[must_use]
    pub fn with_lines<I, S>(mut self, name: impl Into<String>, lines: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let name = name.into();
        let lines = lines.into_iter().map(Into::into).collect();
        match self.field_mut(&name) {
            Some(field) => field.lines = lines,
            None => self.fields.push(Field { name, lines }),
        }
        self
    }

    /// Sets a single-line field, replacing any previous value.
    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<String>) {
        let name = name.into();
        let lines = vec![value.into()];
        match self.field_mut(&name) {
            Some(field) => field.lines = lines,
            None => self.fields.push(Field { name, lines }),
        }
    }

    /// Appends a continuation line to a field, creating the field if needed.
    pub fn push_line(&mut self, name: &str, line: impl Into<String>) {
        match self.field_mut(name) {
            Some(field) => field.lines.push(line.into()),
            None => self.fields.push(Field {
                name: name.to_string(),
                lines: vec![line.into()],
            }),
        }
    }

    /// Reads a column.
    ///
    /// Returns [`Value::Missing`] if the row has no such field. Multi-line fields are
    /// combined into one string on every call; the row itself is never modified.
    #[must_use]
    pub fn get(&self, column: &str) -> Value {
        match self.field(column) {
            Some(field) => Value::String(field.lines.join("\n")),
            None => Value::Missing,
        }
    }

    /// Returns the raw lines captured for a column.
    #[must_use]
    pub fn lines(&self, column: &str) -> Option<&[String]> {
        self.field(column).map(|f| f.lines.as_slice())
    }

    /// Returns `true` if the row has a field with this name.
    #[must_use]
    pub fn contains(&self, column: &str) -> bool {
        self.field(column).is_some()
    }

    /// Iterates over column names in insertion order.
    pub fn column_names(&self) -> impl Iterator<Item = &str> {
        self.fields.iter().map(|f| f.name.as_str())
    }

    /// Iterates over `(column, value)` pairs in insertion order.
    pub fn fields(&self) -> impl Iterator<Item = (&str, Value)> {
        self.fields
            .iter()
            .map(|f| (f.name.as_str(), Value::String(f.lines.join("\n"))))
    }

    /// Number of fields in the row.
    #[must_use]
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    /// Returns `true` if the row has no fields.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    // Rows carry a handful of fields, a linear scan beats hashing here.
    fn field(&self, name: &str) -> Option<&Field> {
        self.fields.iter().find(|f| f.name == name)
    }

    fn field_mut(&mut self, name: &str) -> Option<&mut Field> {
        self.fields.iter_mut().find(|f| f.name == name)
    }
}

impl<K, V> FromIterator<(K, V)> for Row
where
    K: Into<String>,
    V: Into<String>,
{
    fn from_iter<T: IntoIterator<Item = (K, V)>>(iter: T) -> Self {
        let mut row = Row::new();
        for (name, value) in iter {
            row.insert(name, value);
        }
        row
    }
}
