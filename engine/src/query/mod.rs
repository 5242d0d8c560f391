//! SQL-like query language over log rows.
//!
//! Query text flows through the [`Lexer`], the parser ([`parse_query`]) and the
//! [`Executor`], which filters, sorts, pages and projects the rows handed to it.
//!
//! # Supported Syntax
//!
//! ```sql
//! SELECT * WHERE level = 'error' AND service = 'api'
//! SELECT timestamp, message AS msg FROM logs WHERE NOT level = 'debug' LIMIT 100
//! SELECT * WHERE (level = 'error' OR level = 'fatal') ORDER BY timestamp DESC LIMIT 50 OFFSET 50
//! ```
//!
//! # Example
//!
//! ```
//! use engine::models::Row;
//! use engine::query::run_query;
//!
//! let rows = vec![
//!     Row::new().with_field("level", "info").with_field("message", "ok"),
//!     Row::new().with_field("level", "error").with_field("message", "boom"),
//! ];
//!
//! let result = run_query("SELECT message WHERE level = 'error'", ["level", "message"], rows)
//!     .unwrap();
//! assert_eq!(result.total_count(), 1);
//! ```

mod ast;
mod evaluator;
mod executor;
mod lexer;
mod parser;

use crate::models::Row;
use thiserror::Error;

pub use ast::*;
pub use evaluator::{evaluate, test, EvalError, Evaluator, SortKey};
pub use executor::{execute_query, Executor, OutputRow, ResultSet};
pub use lexer::{tokenize, Keyword, LexError, Lexer, Punctuation, Token, TokenKind};
pub use parser::{parse_query, parse_tokens, ParseError};

/// Any error produced while running query text.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum QueryError {
    /// The text could not be tokenized or parsed.
    #[error(transparent)]
    Parse(#[from] ParseError),

    /// The parsed query could not be evaluated.
    #[error(transparent)]
    Eval(#[from] EvalError),
}

impl From<LexError> for QueryError {
    fn from(err: LexError) -> Self {
        Self::Parse(err.into())
    }
}

/// Parses and executes a query in one call, with default comparison settings.
///
/// # Errors
///
/// Returns a `QueryError` if the text does not parse or the query cannot be evaluated.
pub fn run_query<I, C, S>(text: &str, columns: C, rows: I) -> Result<ResultSet, QueryError>
where
    I: IntoIterator<Item = Row>,
    C: IntoIterator<Item = S>,
    S: Into<String>,
{
    let query = parse_query(text)?;
    Ok(execute_query(query, columns, rows)?)
}
