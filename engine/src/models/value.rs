//! Runtime values produced while evaluating a query.

use serde::{Deserialize, Serialize};

/// A value read from a row or produced by a literal.
///
/// Column text is always carried as [`Value::String`]; whether it takes part in a
/// numeric comparison is decided at comparison time (see [`Value::as_number`]).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Value {
    /// Text value (column text or a string literal).
    String(String),
    /// Numeric literal.
    Number(f64),
    /// The referenced column is not present in the row.
    Missing,
}

impl Value {
    /// Returns `true` if the value is [`Value::Missing`].
    #[must_use]
    pub fn is_missing(&self) -> bool {
        matches!(self, Self::Missing)
    }

    /// Returns the numeric interpretation of the value, if it has one.
    ///
    /// Strings count as numeric when their whole text parses as a finite number.
    ///
    /// # Example
    ///
    /// ```
    /// use engine::models::Value;
    ///
    /// assert_eq!(Value::String("42".into()).as_number(), Some(42.0));
    /// assert_eq!(Value::String("4x2".into()).as_number(), None);
    /// assert_eq!(Value::Missing.as_number(), None);
    /// ```
    #[must_use]
    pub fn as_number(&self) -> Option<f64> {
        match self {
            Self::String(s) => parse_number(s),
            Self::Number(n) => Some(*n),
            Self::Missing => None,
        }
    }

    /// Returns the string slice if this is a [`Value::String`].
    #[must_use]
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::String(s) => Some(s),
            _ => None,
        }
    }
}

impl std::fmt::Display for Value {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::String(s) => write!(f, "{s}"),
            Self::Number(n) => write!(f, "{n}"),
            Self::Missing => Ok(()),
        }
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Self::String(value.to_string())
    }
}

impl From<String> for Value {
    fn from(value: String) -> Self {
        Self::String(value)
    }
}

impl From<f64> for Value {
    fn from(value: f64) -> Self {
        Self::Number(value)
    }
}

/// Parses text as a finite number. `NaN` and infinities are not numeric.
pub(crate) fn parse_number(text: &str) -> Option<f64> {
    text.parse::<f64>().ok().filter(|n| n.is_finite())
}
