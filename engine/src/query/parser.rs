//! Recursive-descent parser over lexer tokens.
//!
//! Parses queries like:
//! - `SELECT *`
//! - `SELECT level, message AS msg WHERE level = 'error'`
//! - `SELECT * WHERE (level = 'error' OR level = 'fatal') AND NOT service = 'api'`
//! - `SELECT * FROM logs ORDER BY service, timestamp DESC LIMIT 100 OFFSET 20`
//!
//! `OR` binds looser than `AND`, which binds looser than `NOT`. Both binary operators
//! fold to the left.

use super::ast::{
    Comparison, Expression, Literal, OrderItem, Predicate, Query, SelectItem, SortOrder,
};
use super::lexer::{tokenize, Keyword, LexError, Punctuation, Token, TokenKind};
use thiserror::Error;

/// Errors that can occur during query parsing.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseError {
    /// The query text could not be tokenized.
    #[error(transparent)]
    Lex(#[from] LexError),

    /// The query is empty.
    #[error("Empty query")]
    EmptyQuery,

    /// An unexpected token was encountered.
    #[error("Unexpected token at position {position}: expected {expected}, found {found}")]
    UnexpectedToken {
        /// Byte offset of the offending token.
        position: usize,
        /// What was expected.
        expected: String,
        /// What was found.
        found: String,
    },

    /// LIMIT or OFFSET is not followed by a non-negative integer.
    #[error("Invalid {clause} value at position {position}: expected a non-negative integer, found {found}")]
    InvalidPaging {
        /// `LIMIT` or `OFFSET`.
        clause: &'static str,
        /// Byte offset of the value.
        position: usize,
        /// What was found.
        found: String,
    },

    /// `*` appears next to other select items.
    #[error("Wildcard '*' at position {position} cannot be combined with other select items")]
    WildcardWithColumns {
        /// Byte offset of the offending token.
        position: usize,
    },

    /// `*` appears in a WHERE clause.
    #[error("Wildcard '*' at position {position} cannot be used in a WHERE clause")]
    WildcardInPredicate {
        /// Byte offset of the wildcard.
        position: usize,
    },

    /// `*` appears as an ORDER BY key.
    #[error("Wildcard '*' at position {position} cannot be used in ORDER BY")]
    WildcardInOrderBy {
        /// Byte offset of the wildcard.
        position: usize,
    },
}

impl ParseError {
    /// Byte offset in the query text where the error was detected, if any.
    #[must_use]
    pub fn position(&self) -> Option<usize> {
        match self {
            Self::Lex(e) => Some(e.position()),
            Self::EmptyQuery => None,
            Self::UnexpectedToken { position, .. }
            | Self::InvalidPaging { position, .. }
            | Self::WildcardWithColumns { position }
            | Self::WildcardInPredicate { position }
            | Self::WildcardInOrderBy { position } => Some(*position),
        }
    }
}

/// Parses a SQL-like query string into a Query AST.
///
/// # Errors
///
/// Returns a `ParseError` if:
/// - The query is empty
/// - The text contains an illegal character or an unterminated string
/// - The syntax is invalid
/// - There is unexpected trailing content
///
/// # Examples
///
/// ```
/// use engine::query::parse_query;
///
/// let query = parse_query("SELECT level WHERE level = 'error' LIMIT 10").unwrap();
/// assert_eq!(query.select.len(), 1);
/// assert_eq!(query.limit, Some(10));
/// ```
pub fn parse_query(input: &str) -> Result<Query, ParseError> {
    let tokens = tokenize(input)?;
    parse_tokens(tokens)
}

/// Parses an already tokenized query.
///
/// A trailing [`TokenKind::Eof`] is added if the sequence lacks one.
///
/// # Errors
///
/// Returns a `ParseError` if the tokens do not form a valid query.
pub fn parse_tokens(tokens: impl IntoIterator<Item = Token>) -> Result<Query, ParseError> {
    let mut parser = TokenParser::new(tokens.into_iter().collect());
    if parser.peek().is_eof() {
        return Err(ParseError::EmptyQuery);
    }

    let query = parser.query()?;
    parser.expect_end()?;
    Ok(query)
}

struct TokenParser {
    tokens: Vec<Token>,
    position: usize,
}

impl TokenParser {
    fn new(mut tokens: Vec<Token>) -> Self {
        if !tokens.last().is_some_and(Token::is_eof) {
            let end = tokens.last().map_or(0, |t| t.position + t.text.len());
            tokens.push(Token::new(TokenKind::Eof, "", end));
        }
        Self {
            tokens,
            position: 0,
        }
    }

    // ========================================================================
    // Token cursor
    // ========================================================================

    fn peek(&self) -> &Token {
        &self.tokens[self.position]
    }

    fn bump(&mut self) -> Token {
        let token = self.peek().clone();
        if self.position + 1 < self.tokens.len() {
            self.position += 1;
        }
        token
    }

    fn eat_keyword(&mut self, keyword: Keyword) -> bool {
        if self.peek().is_keyword(keyword) {
            self.bump();
            true
        } else {
            false
        }
    }

    fn expect_keyword(&mut self, keyword: Keyword) -> Result<(), ParseError> {
        if self.eat_keyword(keyword) {
            Ok(())
        } else {
            Err(self.unexpected(keyword.as_str()))
        }
    }

    fn eat_punctuation(&mut self, punctuation: Punctuation) -> bool {
        if self.peek().is_punctuation(punctuation) {
            self.bump();
            true
        } else {
            false
        }
    }

    fn expect_punctuation(&mut self, punctuation: Punctuation) -> Result<(), ParseError> {
        if self.eat_punctuation(punctuation) {
            Ok(())
        } else {
            Err(self.unexpected(format!("'{punctuation}'")))
        }
    }

    fn expect_identifier(&mut self, expected: &str) -> Result<String, ParseError> {
        if self.peek().kind == TokenKind::Identifier {
            Ok(self.bump().text)
        } else {
            Err(self.unexpected(expected))
        }
    }

    fn expect_end(&self) -> Result<(), ParseError> {
        if self.peek().is_eof() {
            Ok(())
        } else {
            Err(self.unexpected("end of query"))
        }
    }

    fn unexpected(&self, expected: impl Into<String>) -> ParseError {
        let token = self.peek();
        ParseError::UnexpectedToken {
            position: token.position,
            expected: expected.into(),
            found: token.to_string(),
        }
    }

    // ========================================================================
    // Main query parser
    // ========================================================================

    fn query(&mut self) -> Result<Query, ParseError> {
        self.expect_keyword(Keyword::Select)?;
        let select = self.select_list()?;

        let from = if self.eat_keyword(Keyword::From) {
            Some(self.expect_identifier("source name")?)
        } else {
            None
        };

        let where_clause = if self.eat_keyword(Keyword::Where) {
            Some(self.or_expression()?)
        } else {
            None
        };

        let order_by = if self.eat_keyword(Keyword::Order) {
            self.expect_keyword(Keyword::By)?;
            self.order_list()?
        } else {
            Vec::new()
        };

        let limit = if self.eat_keyword(Keyword::Limit) {
            Some(self.paging_value("LIMIT")?)
        } else {
            None
        };

        let offset = if self.eat_keyword(Keyword::Offset) {
            Some(self.paging_value("OFFSET")?)
        } else {
            None
        };

        Ok(Query {
            select,
            from,
            where_clause,
            order_by,
            limit,
            offset,
        })
    }

    // ========================================================================
    // SELECT list
    // ========================================================================

    fn select_list(&mut self) -> Result<Vec<SelectItem>, ParseError> {
        if self.eat_punctuation(Punctuation::Star) {
            if self.peek().is_punctuation(Punctuation::Comma) {
                return Err(ParseError::WildcardWithColumns {
                    position: self.peek().position,
                });
            }
            return Ok(vec![SelectItem::new(Expression::Wildcard)]);
        }

        let mut items = vec![self.select_item()?];
        while self.eat_punctuation(Punctuation::Comma) {
            items.push(self.select_item()?);
        }
        Ok(items)
    }

    fn select_item(&mut self) -> Result<SelectItem, ParseError> {
        if self.peek().is_punctuation(Punctuation::Star) {
            return Err(ParseError::WildcardWithColumns {
                position: self.peek().position,
            });
        }

        let expression = self.expression()?;
        let alias = if self.eat_keyword(Keyword::As) {
            Some(self.expect_identifier("alias")?)
        } else {
            None
        };

        Ok(SelectItem { expression, alias })
    }

    fn expression(&mut self) -> Result<Expression, ParseError> {
        let token = self.peek();
        let expression = match &token.kind {
            TokenKind::Identifier => Expression::Column(token.text.clone()),
            TokenKind::StringLiteral(s) => Expression::Literal(Literal::String(s.clone())),
            TokenKind::NumberLiteral => match Literal::number(token.text.clone()) {
                Some(literal) => Expression::Literal(literal),
                None => return Err(self.unexpected("column name or literal")),
            },
            _ => return Err(self.unexpected("column name or literal")),
        };
        self.bump();
        Ok(expression)
    }

    // ========================================================================
    // WHERE clause
    // ========================================================================

    fn or_expression(&mut self) -> Result<Predicate, ParseError> {
        let mut left = self.and_expression()?;
        while self.eat_keyword(Keyword::Or) {
            let right = self.and_expression()?;
            left = Predicate::or(left, right);
        }
        Ok(left)
    }

    fn and_expression(&mut self) -> Result<Predicate, ParseError> {
        let mut left = self.unary_expression()?;
        while self.eat_keyword(Keyword::And) {
            let right = self.unary_expression()?;
            left = Predicate::and(left, right);
        }
        Ok(left)
    }

    fn unary_expression(&mut self) -> Result<Predicate, ParseError> {
        if self.eat_keyword(Keyword::Not) {
            return Ok(Predicate::not(self.unary_expression()?));
        }

        if self.eat_punctuation(Punctuation::LeftParen) {
            let inner = self.or_expression()?;
            self.expect_punctuation(Punctuation::RightParen)?;
            return Ok(inner);
        }

        self.comparison().map(Predicate::Comparison)
    }

    fn comparison(&mut self) -> Result<Comparison, ParseError> {
        let left = self.operand()?;

        let operator = match self.peek().kind {
            TokenKind::Operator(op) => op,
            _ => return Err(self.unexpected("comparison operator")),
        };
        self.bump();

        let right = self.operand()?;

        Ok(Comparison {
            left,
            operator,
            right,
        })
    }

    fn operand(&mut self) -> Result<Expression, ParseError> {
        if self.peek().is_punctuation(Punctuation::Star) {
            return Err(ParseError::WildcardInPredicate {
                position: self.peek().position,
            });
        }
        self.expression()
    }

    // ========================================================================
    // ORDER BY clause
    // ========================================================================

    fn order_list(&mut self) -> Result<Vec<OrderItem>, ParseError> {
        let mut items = vec![self.order_item()?];
        while self.eat_punctuation(Punctuation::Comma) {
            items.push(self.order_item()?);
        }
        Ok(items)
    }

    fn order_item(&mut self) -> Result<OrderItem, ParseError> {
        if self.peek().is_punctuation(Punctuation::Star) {
            return Err(ParseError::WildcardInOrderBy {
                position: self.peek().position,
            });
        }

        let expression = self.expression()?;
        let order = if self.eat_keyword(Keyword::Asc) {
            SortOrder::Asc
        } else if self.eat_keyword(Keyword::Desc) {
            SortOrder::Desc
        } else {
            SortOrder::default()
        };

        Ok(OrderItem { expression, order })
    }

    // ========================================================================
    // LIMIT and OFFSET clauses
    // ========================================================================

    fn paging_value(&mut self, clause: &'static str) -> Result<usize, ParseError> {
        let token = self.bump();
        let value = match token.kind {
            TokenKind::NumberLiteral => token.text.parse::<usize>().ok(),
            _ => None,
        };

        value.ok_or_else(|| ParseError::InvalidPaging {
            clause,
            position: token.position,
            found: token.to_string(),
        })
    }
}

// ============================================================================
// Tests
// ============================================================================
