//! Expression and predicate evaluation against a single row.

use super::ast::{ComparisonOp, Expression, LogicalOp, Predicate};
use crate::config::ComparisonConfig;
use crate::models::{Row, Value};
use std::borrow::Cow;
use std::cmp::Ordering;
use thiserror::Error;

/// Errors that can occur while evaluating an expression.
///
/// These only arise from ASTs built by hand; anything accepted by the parser
/// evaluates without error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum EvalError {
    /// `*` was evaluated as a value.
    #[error("Wildcard '*' does not produce a value")]
    WildcardNotAValue,

    /// `*` was used as an operand of a comparison.
    #[error("Wildcard '*' cannot be used in a comparison")]
    WildcardInPredicate,
}

/// Evaluates expressions and predicates with a fixed [`ComparisonConfig`].
///
/// # Example
///
/// ```
/// use engine::config::ComparisonConfig;
/// use engine::models::Row;
/// use engine::query::{parse_query, Evaluator};
///
/// let query = parse_query("SELECT * WHERE level = 'ERROR'").unwrap();
/// let predicate = query.where_clause.unwrap();
/// let row = Row::new().with_field("level", "error");
///
/// assert!(!Evaluator::default().test(&predicate, &row).unwrap());
/// assert!(Evaluator::new(ComparisonConfig::case_insensitive())
///     .test(&predicate, &row)
///     .unwrap());
/// ```
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Evaluator {
    config: ComparisonConfig,
}

impl Evaluator {
    /// Creates an evaluator with the given comparison settings.
    #[must_use]
    pub const fn new(config: ComparisonConfig) -> Self {
        Self { config }
    }

    /// The comparison settings in use.
    #[must_use]
    pub const fn config(&self) -> ComparisonConfig {
        self.config
    }

    /// Evaluates an expression to a value.
    ///
    /// # Errors
    ///
    /// Returns [`EvalError::WildcardNotAValue`] for `*`.
    pub fn evaluate(&self, expression: &Expression, row: &Row) -> Result<Value, EvalError> {
        match expression {
            Expression::Column(name) => Ok(row.get(name)),
            Expression::Literal(literal) => Ok(literal.to_value()),
            Expression::Wildcard => Err(EvalError::WildcardNotAValue),
        }
    }

    /// Tests a predicate against a row.
    ///
    /// `AND` and `OR` short-circuit from left to right.
    ///
    /// # Errors
    ///
    /// Returns [`EvalError::WildcardInPredicate`] if a comparison has `*` as an operand.
    pub fn test(&self, predicate: &Predicate, row: &Row) -> Result<bool, EvalError> {
        match predicate {
            Predicate::Comparison(comparison) => {
                let left = self.operand(&comparison.left, row)?;
                let right = self.operand(&comparison.right, row)?;
                Ok(self.compare(&left, comparison.operator, &right))
            }
            Predicate::Combined {
                left,
                operator,
                right,
            } => match operator {
                LogicalOp::And => Ok(self.test(left, row)? && self.test(right, row)?),
                LogicalOp::Or => Ok(self.test(left, row)? || self.test(right, row)?),
            },
            Predicate::Not(inner) => Ok(!self.test(inner, row)?),
        }
    }

    /// Applies a comparison operator to two values.
    ///
    /// A [`Value::Missing`] side makes `!=` true and every other operator false.
    /// Otherwise the values are compared as described in [`Evaluator::order`].
    #[must_use]
    pub fn compare(&self, left: &Value, operator: ComparisonOp, right: &Value) -> bool {
        if left.is_missing() || right.is_missing() {
            return operator == ComparisonOp::NotEq;
        }

        let ordering = self.order(left, right);
        match operator {
            ComparisonOp::Eq => ordering == Ordering::Equal,
            ComparisonOp::NotEq => ordering != Ordering::Equal,
            ComparisonOp::Lt => ordering == Ordering::Less,
            ComparisonOp::LtEq => ordering != Ordering::Greater,
            ComparisonOp::Gt => ordering == Ordering::Greater,
            ComparisonOp::GtEq => ordering != Ordering::Less,
        }
    }

    /// Ordering used by the comparison operators.
    ///
    /// [`Value::Missing`] comes before everything else and equal to itself. Two values
    /// that both read as finite numbers compare numerically; anything else compares
    /// as text, lower-cased first when the evaluator is case-insensitive.
    ///
    /// Mixing numeric and non-numeric text makes this ordering intransitive
    /// (`"9" < "10" < "1a" < "9"`), so ORDER BY uses [`Evaluator::sort_key`] instead.
    #[must_use]
    pub fn order(&self, left: &Value, right: &Value) -> Ordering {
        match (left, right) {
            (Value::Missing, Value::Missing) => Ordering::Equal,
            (Value::Missing, _) => Ordering::Less,
            (_, Value::Missing) => Ordering::Greater,
            _ => match (left.as_number(), right.as_number()) {
                (Some(l), Some(r)) => l.partial_cmp(&r).unwrap_or(Ordering::Equal),
                _ => self.text(left).cmp(&self.text(right)),
            },
        }
    }

    /// Builds the ORDER BY key for a value.
    ///
    /// Keys form a total order: [`SortKey::Missing`] first, then every value that
    /// reads as a finite number in numeric order, then all other values as text.
    #[must_use]
    pub fn sort_key(&self, value: &Value) -> SortKey {
        if value.is_missing() {
            return SortKey::Missing;
        }
        match value.as_number() {
            Some(number) => SortKey::Number(number),
            None => SortKey::Text(self.text(value).into_owned()),
        }
    }

    fn operand(&self, expression: &Expression, row: &Row) -> Result<Value, EvalError> {
        if expression.is_wildcard() {
            return Err(EvalError::WildcardInPredicate);
        }
        self.evaluate(expression, row)
    }

    fn text<'a>(&self, value: &'a Value) -> Cow<'a, str> {
        let text = match value {
            Value::String(s) => Cow::Borrowed(s.as_str()),
            other => Cow::Owned(other.to_string()),
        };

        if self.config.is_case_sensitive() {
            text
        } else {
            Cow::Owned(text.to_lowercase())
        }
    }
}

/// A precomputed ORDER BY key, see [`Evaluator::sort_key`].
#[derive(Debug, Clone)]
pub enum SortKey {
    /// The field is absent.
    Missing,
    /// The value reads as a finite number.
    Number(f64),
    /// Any other value, lower-cased when comparing case-insensitively.
    Text(String),
}

impl SortKey {
    fn rank(&self) -> u8 {
        match self {
            Self::Missing => 0,
            Self::Number(_) => 1,
            Self::Text(_) => 2,
        }
    }
}

impl Ord for SortKey {
    fn cmp(&self, other: &Self) -> Ordering {
        match (self, other) {
            (Self::Number(l), Self::Number(r)) => l.total_cmp(r),
            (Self::Text(l), Self::Text(r)) => l.cmp(r),
            _ => self.rank().cmp(&other.rank()),
        }
    }
}

impl PartialOrd for SortKey {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl PartialEq for SortKey {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for SortKey {}

/// Evaluates an expression with the default comparison settings.
///
/// # Errors
///
/// See [`Evaluator::evaluate`].
pub fn evaluate(expression: &Expression, row: &Row) -> Result<Value, EvalError> {
    Evaluator::default().evaluate(expression, row)
}

/// Tests a predicate with the default comparison settings.
///
/// # Errors
///
/// See [`Evaluator::test`].
pub fn test(predicate: &Predicate, row: &Row) -> Result<bool, EvalError> {
    Evaluator::default().test(predicate, row)
}
