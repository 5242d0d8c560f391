//! String comparison settings for predicate evaluation and sorting.

use serde::{Deserialize, Serialize};

/// How string operands are compared.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum CaseSensitivity {
    /// Ordinal comparison of the exact text.
    #[default]
    Sensitive,
    /// Both sides are lower-cased before an ordinal comparison.
    Insensitive,
}

impl std::fmt::Display for CaseSensitivity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Sensitive => write!(f, "sensitive"),
            Self::Insensitive => write!(f, "insensitive"),
        }
    }
}

/// Comparison settings shared by the evaluator and the sort phase.
///
/// Numeric comparisons are unaffected; only the string fallback honours these
/// settings.
///
/// # Examples
///
/// ```
/// use engine::config::{CaseSensitivity, ComparisonConfig};
///
/// let config = ComparisonConfig::default();
/// assert_eq!(config.case, CaseSensitivity::Sensitive);
///
/// let config = ComparisonConfig::case_insensitive();
/// assert!(!config.is_case_sensitive());
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ComparisonConfig {
    /// Case handling for string comparisons.
    #[serde(default)]
    pub case: CaseSensitivity,
}

impl ComparisonConfig {
    /// Creates a configuration with the given case handling.
    #[must_use]
    pub const fn new(case: CaseSensitivity) -> Self {
        Self { case }
    }

    /// Shorthand for a case-insensitive configuration.
    #[must_use]
    pub const fn case_insensitive() -> Self {
        Self::new(CaseSensitivity::Insensitive)
    }

    /// Returns `true` when strings are compared exactly.
    #[must_use]
    pub const fn is_case_sensitive(&self) -> bool {
        matches!(self.case, CaseSensitivity::Sensitive)
    }
}
