//! Abstract Syntax Tree definitions for the query language.
//!
//! Every node implements `Display`, rendering back to query text that parses to an
//! equal tree.

use crate::models::value::{parse_number, Value};
use serde::{Deserialize, Serialize};
use std::fmt::Write as _;

/// Comparison operators for WHERE clauses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ComparisonOp {
    /// Equal (=)
    Eq,
    /// Not equal (!=, <>)
    NotEq,
    /// Less than (<)
    Lt,
    /// Less than or equal (<=)
    LtEq,
    /// Greater than (>)
    Gt,
    /// Greater than or equal (>=)
    GtEq,
}

impl ComparisonOp {
    /// Returns the operator that gives the same result with the operands swapped.
    ///
    /// ```
    /// use engine::query::ComparisonOp;
    ///
    /// assert_eq!(ComparisonOp::Lt.flip(), ComparisonOp::Gt);
    /// assert_eq!(ComparisonOp::Eq.flip(), ComparisonOp::Eq);
    /// ```
    #[must_use]
    pub const fn flip(self) -> Self {
        match self {
            Self::Eq => Self::Eq,
            Self::NotEq => Self::NotEq,
            Self::Lt => Self::Gt,
            Self::LtEq => Self::GtEq,
            Self::Gt => Self::Lt,
            Self::GtEq => Self::LtEq,
        }
    }
}

impl std::fmt::Display for ComparisonOp {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Eq => write!(f, "="),
            Self::NotEq => write!(f, "!="),
            Self::Lt => write!(f, "<"),
            Self::LtEq => write!(f, "<="),
            Self::Gt => write!(f, ">"),
            Self::GtEq => write!(f, ">="),
        }
    }
}

/// Logical operators for combining conditions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum LogicalOp {
    /// Logical AND
    And,
    /// Logical OR
    Or,
}

impl std::fmt::Display for LogicalOp {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::And => write!(f, "AND"),
            Self::Or => write!(f, "OR"),
        }
    }
}

/// A literal written in the query.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Literal {
    /// Quoted string (e.g., 'error', "api-service")
    String(String),
    /// Integer or decimal number. `text` is kept for rendering column names.
    Number {
        /// The lexeme as written.
        text: String,
        /// The parsed value.
        value: f64,
    },
}

impl Literal {
    /// Creates a string literal.
    #[must_use]
    pub fn string(value: impl Into<String>) -> Self {
        Self::String(value.into())
    }

    /// Creates a number literal from its lexeme.
    ///
    /// Returns `None` if the text is not a finite number.
    #[must_use]
    pub fn number(text: impl Into<String>) -> Option<Self> {
        let text = text.into();
        parse_number(&text).map(|value| Self::Number { text, value })
    }

    /// The runtime value of the literal.
    #[must_use]
    pub fn to_value(&self) -> Value {
        match self {
            Self::String(s) => Value::String(s.clone()),
            Self::Number { value, .. } => Value::Number(*value),
        }
    }
}

impl std::fmt::Display for Literal {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::String(s) => {
                f.write_char('\'')?;
                for c in s.chars() {
                    match c {
                        '\'' => f.write_str("\\'")?,
                        '\\' => f.write_str("\\\\")?,
                        '\n' => f.write_str("\\n")?,
                        '\t' => f.write_str("\\t")?,
                        '\r' => f.write_str("\\r")?,
                        c => f.write_char(c)?,
                    }
                }
                f.write_char('\'')
            }
            Self::Number { text, .. } => write!(f, "{text}"),
        }
    }
}

/// An operand in a select list, comparison, or ORDER BY key.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Expression {
    /// A column read from the row.
    Column(String),
    /// A constant.
    Literal(Literal),
    /// `*`, only meaningful as the sole select item.
    Wildcard,
}

impl Expression {
    /// Creates a column reference.
    #[must_use]
    pub fn column(name: impl Into<String>) -> Self {
        Self::Column(name.into())
    }

    /// Creates a string literal expression.
    #[must_use]
    pub fn string(value: impl Into<String>) -> Self {
        Self::Literal(Literal::string(value))
    }

    /// Returns `true` for the wildcard.
    #[must_use]
    pub fn is_wildcard(&self) -> bool {
        matches!(self, Self::Wildcard)
    }
}

impl std::fmt::Display for Expression {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Column(name) => write!(f, "{name}"),
            Self::Literal(literal) => write!(f, "{literal}"),
            Self::Wildcard => write!(f, "*"),
        }
    }
}

/// One entry of the select list.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SelectItem {
    /// The projected expression.
    pub expression: Expression,
    /// Optional output name given with `AS`.
    pub alias: Option<String>,
}

impl SelectItem {
    /// Creates an unaliased select item.
    #[must_use]
    pub fn new(expression: Expression) -> Self {
        Self {
            expression,
            alias: None,
        }
    }

    /// Sets the alias.
    #[must_use]
    pub fn with_alias(mut self, alias: impl Into<String>) -> Self {
        self.alias = Some(alias.into());
        self
    }

    /// The output column name: the alias, or the expression rendered as text.
    ///
    /// ```
    /// use engine::query::{Expression, SelectItem};
    ///
    /// assert_eq!(SelectItem::new(Expression::column("level")).output_name(), "level");
    /// assert_eq!(
    ///     SelectItem::new(Expression::column("level")).with_alias("lvl").output_name(),
    ///     "lvl"
    /// );
    /// ```
    #[must_use]
    pub fn output_name(&self) -> String {
        self.alias
            .clone()
            .unwrap_or_else(|| self.expression.to_string())
    }
}

impl std::fmt::Display for SelectItem {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.expression)?;
        if let Some(ref alias) = self.alias {
            write!(f, " AS {alias}")?;
        }
        Ok(())
    }
}

/// A single comparison (e.g., level = 'error').
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Comparison {
    /// Left-hand operand.
    pub left: Expression,
    /// The comparison operator.
    pub operator: ComparisonOp,
    /// Right-hand operand.
    pub right: Expression,
}

impl std::fmt::Display for Comparison {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} {} {}", self.left, self.operator, self.right)
    }
}

/// A WHERE clause expression.
///
/// Parentheses only steer how the tree is built; they leave no node behind.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Predicate {
    /// A single comparison.
    Comparison(Comparison),
    /// Two predicates combined with a logical operator.
    Combined {
        /// Left-hand side predicate.
        left: Box<Predicate>,
        /// The logical operator.
        operator: LogicalOp,
        /// Right-hand side predicate.
        right: Box<Predicate>,
    },
    /// Negation.
    Not(Box<Predicate>),
}

impl Predicate {
    /// Creates a comparison predicate.
    #[must_use]
    pub fn compare(left: Expression, operator: ComparisonOp, right: Expression) -> Self {
        Self::Comparison(Comparison {
            left,
            operator,
            right,
        })
    }

    /// Combines two predicates with AND.
    #[must_use]
    pub fn and(left: Predicate, right: Predicate) -> Self {
        Self::Combined {
            left: Box::new(left),
            operator: LogicalOp::And,
            right: Box::new(right),
        }
    }

    /// Combines two predicates with OR.
    #[must_use]
    pub fn or(left: Predicate, right: Predicate) -> Self {
        Self::Combined {
            left: Box::new(left),
            operator: LogicalOp::Or,
            right: Box::new(right),
        }
    }

    /// Negates a predicate.
    #[must_use]
    #[allow(clippy::should_implement_trait)]
    pub fn not(inner: Predicate) -> Self {
        Self::Not(Box::new(inner))
    }

    fn precedence(&self) -> u8 {
        match self {
            Self::Combined {
                operator: LogicalOp::Or,
                ..
            } => 1,
            Self::Combined {
                operator: LogicalOp::And,
                ..
            } => 2,
            Self::Not(_) | Self::Comparison(_) => 3,
        }
    }

    fn fmt_operand(&self, f: &mut std::fmt::Formatter<'_>, min_precedence: u8) -> std::fmt::Result {
        if self.precedence() < min_precedence {
            write!(f, "({self})")
        } else {
            write!(f, "{self}")
        }
    }
}

impl std::fmt::Display for Predicate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Comparison(c) => write!(f, "{c}"),
            Self::Combined {
                left,
                operator,
                right,
            } => {
                // Both operators fold left, so a right operand of equal precedence
                // needs parentheses to keep its shape.
                let precedence = self.precedence();
                left.fmt_operand(f, precedence)?;
                write!(f, " {operator} ")?;
                right.fmt_operand(f, precedence + 1)
            }
            Self::Not(inner) => {
                write!(f, "NOT ")?;
                inner.fmt_operand(f, 3)
            }
        }
    }
}

/// Sort order for ORDER BY keys.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum SortOrder {
    /// Ascending order.
    #[default]
    Asc,
    /// Descending order.
    Desc,
}

impl std::fmt::Display for SortOrder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Asc => write!(f, "ASC"),
            Self::Desc => write!(f, "DESC"),
        }
    }
}

/// One ORDER BY key.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderItem {
    /// The expression to sort by.
    pub expression: Expression,
    /// The sort order.
    pub order: SortOrder,
}

impl std::fmt::Display for OrderItem {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} {}", self.expression, self.order)
    }
}

/// A parsed SQL-like query.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Query {
    /// The select list. A wildcard, when present, is the only item.
    pub select: Vec<SelectItem>,
    /// Optional source name from `FROM`; the engine always reads the row source it is
    /// given.
    pub from: Option<String>,
    /// Optional WHERE clause.
    pub where_clause: Option<Predicate>,
    /// ORDER BY keys, most significant first.
    pub order_by: Vec<OrderItem>,
    /// Optional LIMIT clause.
    pub limit: Option<usize>,
    /// Optional OFFSET clause.
    pub offset: Option<usize>,
}

impl Query {
    /// Creates a query with the given select list and no other clauses.
    #[must_use]
    pub fn new(select: Vec<SelectItem>) -> Self {
        Self {
            select,
            from: None,
            where_clause: None,
            order_by: Vec::new(),
            limit: None,
            offset: None,
        }
    }

    /// Creates a `SELECT *` query.
    #[must_use]
    pub fn select_all() -> Self {
        Self::new(vec![SelectItem::new(Expression::Wildcard)])
    }

    /// Creates a query selecting the given columns.
    #[must_use]
    pub fn select_columns<I, S>(columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::new(
            columns
                .into_iter()
                .map(|c| SelectItem::new(Expression::column(c)))
                .collect(),
        )
    }

    /// Sets the FROM source name.
    #[must_use]
    pub fn with_from(mut self, source: impl Into<String>) -> Self {
        self.from = Some(source.into());
        self
    }

    /// Sets the WHERE clause.
    #[must_use]
    pub fn with_where(mut self, predicate: Predicate) -> Self {
        self.where_clause = Some(predicate);
        self
    }

    /// Appends an ORDER BY key.
    #[must_use]
    pub fn with_order_by(mut self, expression: Expression, order: SortOrder) -> Self {
        self.order_by.push(OrderItem { expression, order });
        self
    }

    /// Sets the LIMIT.
    #[must_use]
    pub fn with_limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    /// Sets the OFFSET.
    #[must_use]
    pub fn with_offset(mut self, offset: usize) -> Self {
        self.offset = Some(offset);
        self
    }

    /// Returns `true` for `SELECT *`.
    #[must_use]
    pub fn is_wildcard(&self) -> bool {
        self.select.iter().any(|item| item.expression.is_wildcard())
    }

    /// Names of every column referenced anywhere in the query, in order of first
    /// appearance.
    #[must_use]
    pub fn column_references(&self) -> Vec<&str> {
        let mut names = Vec::new();
        for item in &self.select {
            collect_column(&item.expression, &mut names);
        }
        if let Some(ref predicate) = self.where_clause {
            collect_predicate_columns(predicate, &mut names);
        }
        for item in &self.order_by {
            collect_column(&item.expression, &mut names);
        }
        names
    }
}

fn collect_column<'a>(expression: &'a Expression, names: &mut Vec<&'a str>) {
    if let Expression::Column(name) = expression {
        if !names.contains(&name.as_str()) {
            names.push(name);
        }
    }
}

fn collect_predicate_columns<'a>(predicate: &'a Predicate, names: &mut Vec<&'a str>) {
    match predicate {
        Predicate::Comparison(c) => {
            collect_column(&c.left, names);
            collect_column(&c.right, names);
        }
        Predicate::Combined { left, right, .. } => {
            collect_predicate_columns(left, names);
            collect_predicate_columns(right, names);
        }
        Predicate::Not(inner) => collect_predicate_columns(inner, names),
    }
}

impl std::fmt::Display for Query {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "SELECT ")?;
        for (i, item) in self.select.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{item}")?;
        }

        if let Some(ref source) = self.from {
            write!(f, " FROM {source}")?;
        }

        if let Some(ref where_clause) = self.where_clause {
            write!(f, " WHERE {where_clause}")?;
        }

        if !self.order_by.is_empty() {
            write!(f, " ORDER BY ")?;
            for (i, item) in self.order_by.iter().enumerate() {
                if i > 0 {
                    write!(f, ", ")?;
                }
                write!(f, "{item}")?;
            }
        }

        if let Some(limit) = self.limit {
            write!(f, " LIMIT {limit}")?;
        }

        if let Some(offset) = self.offset {
            write!(f, " OFFSET {offset}")?;
        }

        Ok(())
    }
}
