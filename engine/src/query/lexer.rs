//! Query lexer built on nom.
//!
//! Turns query text into a stream of [`Token`]s. The stream is produced lazily by
//! [`Lexer`], a single pass over the input that always ends with an
//! [`TokenKind::Eof`] token. Whitespace and `--` line comments are skipped.

use super::ast::ComparisonOp;
use nom::{
    branch::alt,
    bytes::complete::{is_not, tag, take_while, take_while1},
    character::complete::{anychar, char, digit1, multispace1},
    combinator::{map, opt, recognize, value},
    multi::{fold_many0, many0},
    sequence::{delimited, pair, preceded},
    IResult, Parser,
};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors that can occur while splitting query text into tokens.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LexError {
    /// A character that cannot start any token.
    #[error("Illegal character '{character}' at position {position}")]
    IllegalCharacter {
        /// Byte offset of the character.
        position: usize,
        /// The offending character.
        character: char,
    },

    /// A quoted string literal with no closing quote.
    #[error("Unterminated string literal starting at position {position}")]
    UnterminatedString {
        /// Byte offset of the opening quote.
        position: usize,
    },
}

impl LexError {
    /// Byte offset in the query text where the error was detected.
    #[must_use]
    pub fn position(&self) -> usize {
        match self {
            Self::IllegalCharacter { position, .. } | Self::UnterminatedString { position } => {
                *position
            }
        }
    }
}

/// Reserved words. Matched case-insensitively.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Keyword {
    /// SELECT
    Select,
    /// FROM
    From,
    /// AS
    As,
    /// WHERE
    Where,
    /// AND
    And,
    /// OR
    Or,
    /// NOT
    Not,
    /// ORDER
    Order,
    /// BY
    By,
    /// ASC
    Asc,
    /// DESC
    Desc,
    /// LIMIT
    Limit,
    /// OFFSET
    Offset,
}

impl Keyword {
    const ALL: [Keyword; 13] = [
        Self::Select,
        Self::From,
        Self::As,
        Self::Where,
        Self::And,
        Self::Or,
        Self::Not,
        Self::Order,
        Self::By,
        Self::Asc,
        Self::Desc,
        Self::Limit,
        Self::Offset,
    ];

    /// Looks up a keyword by its spelling, ignoring case.
    #[must_use]
    pub fn from_word(word: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|keyword| keyword.as_str().eq_ignore_ascii_case(word))
    }

    /// The canonical upper-case spelling.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Select => "SELECT",
            Self::From => "FROM",
            Self::As => "AS",
            Self::Where => "WHERE",
            Self::And => "AND",
            Self::Or => "OR",
            Self::Not => "NOT",
            Self::Order => "ORDER",
            Self::By => "BY",
            Self::Asc => "ASC",
            Self::Desc => "DESC",
            Self::Limit => "LIMIT",
            Self::Offset => "OFFSET",
        }
    }
}

impl std::fmt::Display for Keyword {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Punctuation characters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Punctuation {
    /// `(`
    LeftParen,
    /// `)`
    RightParen,
    /// `,`
    Comma,
    /// `*`
    Star,
}

impl std::fmt::Display for Punctuation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::LeftParen => write!(f, "("),
            Self::RightParen => write!(f, ")"),
            Self::Comma => write!(f, ","),
            Self::Star => write!(f, "*"),
        }
    }
}

/// The kind of a token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum TokenKind {
    /// A column name or alias.
    Identifier,
    /// A quoted string literal, carrying its decoded contents.
    StringLiteral(String),
    /// An integer or decimal literal; the lexeme is in [`Token::text`].
    NumberLiteral,
    /// A comparison operator.
    Operator(ComparisonOp),
    /// A reserved word.
    Keyword(Keyword),
    /// Parentheses, comma, or star.
    Punctuation(Punctuation),
    /// End of input.
    Eof,
}

/// A lexical token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Token {
    /// What kind of token this is.
    pub kind: TokenKind,
    /// The raw lexeme as written in the query.
    pub text: String,
    /// Byte offset of the lexeme in the query text.
    pub position: usize,
}

impl Token {
    /// Creates a token.
    #[must_use]
    pub fn new(kind: TokenKind, text: impl Into<String>, position: usize) -> Self {
        Self {
            kind,
            text: text.into(),
            position,
        }
    }

    /// Returns `true` if this token is the given keyword.
    #[must_use]
    pub fn is_keyword(&self, keyword: Keyword) -> bool {
        self.kind == TokenKind::Keyword(keyword)
    }

    /// Returns `true` if this token is the given punctuation.
    #[must_use]
    pub fn is_punctuation(&self, punctuation: Punctuation) -> bool {
        self.kind == TokenKind::Punctuation(punctuation)
    }

    /// Returns `true` for the end-of-input token.
    #[must_use]
    pub fn is_eof(&self) -> bool {
        self.kind == TokenKind::Eof
    }
}

impl std::fmt::Display for Token {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.is_eof() {
            write!(f, "end of input")
        } else {
            write!(f, "'{}'", self.text)
        }
    }
}

/// Lazy, single-pass tokenizer over a query string.
///
/// Yields `Ok` tokens up to and including [`TokenKind::Eof`], or stops after the first
/// `Err`.
///
/// # Example
///
/// ```
/// use engine::query::{Keyword, Lexer, TokenKind};
///
/// let kinds: Vec<_> = Lexer::new("select level")
///     .map(|t| t.unwrap().kind)
///     .collect();
///
/// assert_eq!(
///     kinds,
///     vec![TokenKind::Keyword(Keyword::Select), TokenKind::Identifier, TokenKind::Eof]
/// );
/// ```
#[derive(Debug, Clone)]
pub struct Lexer<'a> {
    source: &'a str,
    rest: &'a str,
    finished: bool,
}

impl<'a> Lexer<'a> {
    /// Creates a lexer over the query text.
    #[must_use]
    pub fn new(source: &'a str) -> Self {
        Self {
            source,
            rest: source,
            finished: false,
        }
    }

    fn offset(&self) -> usize {
        self.source.len() - self.rest.len()
    }

    fn next_token(&mut self) -> Result<Token, LexError> {
        self.rest = skip_trivia(self.rest);
        let position = self.offset();

        let Some(first) = self.rest.chars().next() else {
            return Ok(Token::new(TokenKind::Eof, "", position));
        };

        if first == '\'' || first == '"' {
            let (rest, decoded) = string_literal(self.rest, first)
                .map_err(|_| LexError::UnterminatedString { position })?;
            return Ok(self.consume(TokenKind::StringLiteral(decoded), rest, position));
        }

        match token(self.rest) {
            Ok((rest, kind)) => Ok(self.consume(kind, rest, position)),
            Err(_) => Err(LexError::IllegalCharacter {
                position,
                character: first,
            }),
        }
    }

    fn consume(&mut self, kind: TokenKind, rest: &'a str, position: usize) -> Token {
        let token = Token::new(kind, &self.rest[..self.rest.len() - rest.len()], position);
        self.rest = rest;
        token
    }
}

impl Iterator for Lexer<'_> {
    type Item = Result<Token, LexError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.finished {
            return None;
        }

        let result = self.next_token();
        if result.as_ref().map_or(true, Token::is_eof) {
            self.finished = true;
        }
        Some(result)
    }
}

/// Tokenizes a whole query string.
///
/// The returned tokens always end with [`TokenKind::Eof`].
///
/// # Errors
///
/// Returns a `LexError` on an illegal character or an unterminated string literal.
pub fn tokenize(input: &str) -> Result<Vec<Token>, LexError> {
    Lexer::new(input).collect()
}

// ============================================================================
// Trivia
// ============================================================================

fn skip_trivia(input: &str) -> &str {
    let trivia: IResult<&str, Vec<&str>> = many0(alt((
        multispace1,
        recognize(pair(tag("--"), take_while(|c: char| c != '\n'))),
    )))
    .parse(input);

    match trivia {
        Ok((rest, _)) => rest,
        Err(_) => input,
    }
}

// ============================================================================
// Tokens
// ============================================================================

fn token(input: &str) -> IResult<&str, TokenKind> {
    alt((number, operator, punctuation, word)).parse(input)
}

fn number(input: &str) -> IResult<&str, TokenKind> {
    value(
        TokenKind::NumberLiteral,
        recognize((opt(char('-')), digit1, opt(pair(char('.'), digit1)))),
    )
    .parse(input)
}

fn operator(input: &str) -> IResult<&str, TokenKind> {
    map(
        alt((
            value(ComparisonOp::NotEq, alt((tag("!="), tag("<>")))),
            value(ComparisonOp::LtEq, tag("<=")),
            value(ComparisonOp::GtEq, tag(">=")),
            value(ComparisonOp::Eq, char('=')),
            value(ComparisonOp::Lt, char('<')),
            value(ComparisonOp::Gt, char('>')),
        )),
        TokenKind::Operator,
    )
    .parse(input)
}

fn punctuation(input: &str) -> IResult<&str, TokenKind> {
    map(
        alt((
            value(Punctuation::LeftParen, char('(')),
            value(Punctuation::RightParen, char(')')),
            value(Punctuation::Comma, char(',')),
            value(Punctuation::Star, char('*')),
        )),
        TokenKind::Punctuation,
    )
    .parse(input)
}

fn word(input: &str) -> IResult<&str, TokenKind> {
    map(
        recognize(pair(
            take_while1(|c: char| c.is_ascii_alphabetic() || c == '_'),
            take_while(|c: char| c.is_ascii_alphanumeric() || c == '_'),
        )),
        |word: &str| Keyword::from_word(word).map_or(TokenKind::Identifier, TokenKind::Keyword),
    )
    .parse(input)
}

// ============================================================================
// String literals
// ============================================================================

#[derive(Debug, Clone)]
enum StringFragment<'a> {
    Literal(&'a str),
    Escaped(char),
}

/// Parses a literal quoted with `quote`. The quote is escaped by doubling it or with a
/// backslash; `\n`, `\t` and `\r` decode to control characters.
fn string_literal(input: &str, quote: char) -> IResult<&str, String> {
    let (stop, doubled) = if quote == '"' {
        ("\"\\", "\"\"")
    } else {
        ("'\\", "''")
    };

    let fragment = alt((
        map(is_not(stop), StringFragment::Literal),
        value(StringFragment::Escaped(quote), tag(doubled)),
        map(preceded(char('\\'), anychar), |c: char| {
            StringFragment::Escaped(unescape(c))
        }),
    ));

    let body = fold_many0(fragment, String::new, |mut text, fragment| {
        match fragment {
            StringFragment::Literal(s) => text.push_str(s),
            StringFragment::Escaped(c) => text.push(c),
        }
        text
    });

    delimited(char(quote), body, char(quote)).parse(input)
}

fn unescape(c: char) -> char {
    match c {
        'n' => '\n',
        't' => '\t',
        'r' => '\r',
        other => other,
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(input: &str) -> Vec<TokenKind> {
        tokenize(input)
            .unwrap()
            .into_iter()
            .map(|t| t.kind)
            .collect()
    }

    #[test]
    fn test_tokenize_simple_select() {
        let tokens = tokenize("SELECT level, message").unwrap();

        assert_eq!(tokens.len(), 5);
        assert!(tokens[0].is_keyword(Keyword::Select));
        assert_eq!(tokens[1].kind, TokenKind::Identifier);
        assert_eq!(tokens[1].text, "level");
        assert!(tokens[2].is_punctuation(Punctuation::Comma));
        assert_eq!(tokens[3].text, "message");
        assert!(tokens[4].is_eof());
    }

    #[test]
    fn test_keywords_case_insensitive() {
        assert_eq!(
            kinds("select Where oRdEr by"),
            vec![
                TokenKind::Keyword(Keyword::Select),
                TokenKind::Keyword(Keyword::Where),
                TokenKind::Keyword(Keyword::Order),
                TokenKind::Keyword(Keyword::By),
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn test_identifier_preserves_case() {
        let tokens = tokenize("ServiceName").unwrap();
        assert_eq!(tokens[0].kind, TokenKind::Identifier);
        assert_eq!(tokens[0].text, "ServiceName");
    }

    #[test]
    fn test_keyword_prefix_is_identifier() {
        let tokens = tokenize("selected order_id").unwrap();
        assert_eq!(tokens[0].kind, TokenKind::Identifier);
        assert_eq!(tokens[1].kind, TokenKind::Identifier);
        assert_eq!(tokens[1].text, "order_id");
    }

    #[test]
    fn test_operators() {
        let operators = vec![
            ("=", ComparisonOp::Eq),
            ("!=", ComparisonOp::NotEq),
            ("<>", ComparisonOp::NotEq),
            ("<", ComparisonOp::Lt),
            ("<=", ComparisonOp::LtEq),
            (">", ComparisonOp::Gt),
            (">=", ComparisonOp::GtEq),
        ];

        for (op_str, expected) in operators {
            let tokens = tokenize(op_str).unwrap();
            assert_eq!(
                tokens[0].kind,
                TokenKind::Operator(expected),
                "Failed for operator {op_str}"
            );
            assert_eq!(tokens[0].text, op_str);
        }
    }

    #[test]
    fn test_operators_without_spaces() {
        assert_eq!(
            kinds("a<=1"),
            vec![
                TokenKind::Identifier,
                TokenKind::Operator(ComparisonOp::LtEq),
                TokenKind::NumberLiteral,
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn test_numbers() {
        let tokens = tokenize("42 3.14 -7 -0.5").unwrap();
        let texts: Vec<_> = tokens
            .iter()
            .filter(|t| t.kind == TokenKind::NumberLiteral)
            .map(|t| t.text.as_str())
            .collect();
        assert_eq!(texts, vec!["42", "3.14", "-7", "-0.5"]);
    }

    #[test]
    fn test_single_quoted_string() {
        let tokens = tokenize("'error'").unwrap();
        assert_eq!(tokens[0].kind, TokenKind::StringLiteral("error".to_string()));
        assert_eq!(tokens[0].text, "'error'");
    }

    #[test]
    fn test_double_quoted_string() {
        let tokens = tokenize("\"api-gateway\"").unwrap();
        assert_eq!(
            tokens[0].kind,
            TokenKind::StringLiteral("api-gateway".to_string())
        );
    }

    #[test]
    fn test_empty_string() {
        assert_eq!(
            kinds("''"),
            vec![TokenKind::StringLiteral(String::new()), TokenKind::Eof]
        );
    }

    #[test]
    fn test_string_escapes() {
        assert_eq!(
            kinds(r"'it''s' 'it\'s' 'a\nb' 'back\\slash' 'q\x'"),
            vec![
                TokenKind::StringLiteral("it's".to_string()),
                TokenKind::StringLiteral("it's".to_string()),
                TokenKind::StringLiteral("a\nb".to_string()),
                TokenKind::StringLiteral("back\\slash".to_string()),
                TokenKind::StringLiteral("qx".to_string()),
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn test_other_quote_needs_no_escape() {
        assert_eq!(
            kinds(r#""it's" 'say "hi"'"#),
            vec![
                TokenKind::StringLiteral("it's".to_string()),
                TokenKind::StringLiteral("say \"hi\"".to_string()),
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn test_string_keeps_raw_newline() {
        assert_eq!(
            kinds("'line one\nline two'"),
            vec![
                TokenKind::StringLiteral("line one\nline two".to_string()),
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn test_punctuation() {
        assert_eq!(
            kinds("( ) , *"),
            vec![
                TokenKind::Punctuation(Punctuation::LeftParen),
                TokenKind::Punctuation(Punctuation::RightParen),
                TokenKind::Punctuation(Punctuation::Comma),
                TokenKind::Punctuation(Punctuation::Star),
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn test_positions() {
        let tokens = tokenize("SELECT  a").unwrap();
        assert_eq!(tokens[0].position, 0);
        assert_eq!(tokens[1].position, 8);
        assert_eq!(tokens[2].position, 9);
    }

    #[test]
    fn test_comments_skipped() {
        assert_eq!(
            kinds("SELECT a -- trailing comment\n  , b"),
            vec![
                TokenKind::Keyword(Keyword::Select),
                TokenKind::Identifier,
                TokenKind::Punctuation(Punctuation::Comma),
                TokenKind::Identifier,
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn test_comment_with_carriage_returns() {
        assert_eq!(
            kinds("SELECT a -- note\r"),
            vec![
                TokenKind::Keyword(Keyword::Select),
                TokenKind::Identifier,
                TokenKind::Eof,
            ]
        );
        assert_eq!(
            kinds("SELECT a -- note\r\n, b"),
            vec![
                TokenKind::Keyword(Keyword::Select),
                TokenKind::Identifier,
                TokenKind::Punctuation(Punctuation::Comma),
                TokenKind::Identifier,
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn test_identifiers_are_ascii() {
        assert_eq!(
            tokenize("SELECT é"),
            Err(LexError::IllegalCharacter {
                position: 7,
                character: 'é'
            })
        );
        assert_eq!(
            tokenize("naïve"),
            Err(LexError::IllegalCharacter {
                position: 2,
                character: 'ï'
            })
        );
    }

    #[test]
    fn test_empty_input_is_only_eof() {
        assert_eq!(kinds(""), vec![TokenKind::Eof]);
        assert_eq!(kinds("   \n\t"), vec![TokenKind::Eof]);
    }

    #[test]
    fn test_illegal_character() {
        let result = tokenize("SELECT a WHERE b = #");
        assert_eq!(
            result,
            Err(LexError::IllegalCharacter {
                position: 19,
                character: '#'
            })
        );
    }

    #[test]
    fn test_lone_minus_is_illegal() {
        let result = tokenize("a - 1");
        assert!(matches!(
            result,
            Err(LexError::IllegalCharacter { character: '-', .. })
        ));
    }

    #[test]
    fn test_unterminated_string() {
        let result = tokenize("SELECT a WHERE b = 'oops");
        assert_eq!(result, Err(LexError::UnterminatedString { position: 19 }));
        assert_eq!(result.unwrap_err().position(), 19);
    }

    #[test]
    fn test_lexer_stops_after_error() {
        let mut lexer = Lexer::new("a # b");
        assert!(lexer.next().unwrap().is_ok());
        assert!(lexer.next().unwrap().is_err());
        assert!(lexer.next().is_none());
    }

    #[test]
    fn test_lexer_ends_after_eof() {
        let mut lexer = Lexer::new("a");
        assert!(lexer.next().is_some());
        assert!(lexer.next().unwrap().unwrap().is_eof());
        assert!(lexer.next().is_none());
    }
}
