//! The boolean/slice query language.
//!
//! A query is an optional boolean expression over tags followed by an
//! optional time slice, e.g. `programming and not meetings [2016-10-01;]`.
//! Precedence: `not` binds the whole expression that follows it, `and`
//! binds tighter than `or`, parentheses override. Bare words adjacent to
//! each other merge into one search term; quoted strings are taken
//! verbatim. A term matches an item when it equals one of the item's tags
//! exactly.
//!
//! Grammar:
//!
//! ```text
//! query   := or_expr? slice?
//! slice   := '[' date? ';' date? ']'
//! or_expr := and_expr ('or' or_expr)?
//! and_expr := unary ('and' and_expr)?
//! unary   := 'not' or_expr | '(' or_expr ')' | term
//! ```
//!
//! Queries are interpreted over an expression tree, never evaluated as
//! code.

use std::fmt;

use chrono::NaiveDateTime;
use thiserror::Error;

use crate::date::{DATETIME_FORMAT, DateError, parse_flexible};
use crate::item::LogItem;
use crate::log::Log;

/// Errors raised while lexing or parsing a query string.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum QueryError {
    #[error("unterminated quoted string")]
    UnterminatedQuote,

    #[error("slice is missing its closing ']'")]
    UnterminatedSlice,

    #[error("slice needs ';' between its bounds")]
    MalformedSlice,

    #[error("unexpected end of query")]
    UnexpectedEnd,

    #[error("unexpected {0} in query")]
    UnexpectedToken(String),

    #[error(transparent)]
    Date(#[from] DateError),
}

/// A single lexed token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Token {
    /// A search term: adjacent bare words merged, or a quoted string.
    Term(String),
    And,
    Or,
    Not,
    OpenParen,
    CloseParen,
    /// `[start;stop]` with the raw, unresolved bound texts.
    Slice(Option<String>, Option<String>),
}

impl Token {
    fn describe(&self) -> String {
        match self {
            Self::Term(t) => format!("term {t:?}"),
            Self::And => "'and'".to_string(),
            Self::Or => "'or'".to_string(),
            Self::Not => "'not'".to_string(),
            Self::OpenParen => "'('".to_string(),
            Self::CloseParen => "')'".to_string(),
            Self::Slice(..) => "slice".to_string(),
        }
    }
}

/// Tokenizes a query string.
pub fn tokenize(text: &str) -> Result<Vec<Token>, QueryError> {
    let mut tokens = Vec::new();
    // Whether the previous token is a bare-word term the next bare word
    // should merge into.
    let mut merging = false;
    let chars: Vec<char> = text.chars().collect();
    let mut pos = 0;

    while pos < chars.len() {
        let c = chars[pos];
        match c {
            c if c.is_whitespace() => pos += 1,
            '(' => {
                tokens.push(Token::OpenParen);
                merging = false;
                pos += 1;
            }
            ')' => {
                tokens.push(Token::CloseParen);
                merging = false;
                pos += 1;
            }
            '[' => {
                let close = chars[pos..]
                    .iter()
                    .position(|&c| c == ']')
                    .ok_or(QueryError::UnterminatedSlice)?;
                let inner: String = chars[pos + 1..pos + close].iter().collect();
                let (start, stop) = inner.split_once(';').ok_or(QueryError::MalformedSlice)?;
                tokens.push(Token::Slice(optional(start), optional(stop)));
                merging = false;
                pos += close + 1;
            }
            '"' => {
                let close = chars[pos + 1..]
                    .iter()
                    .position(|&c| c == '"')
                    .ok_or(QueryError::UnterminatedQuote)?;
                let term: String = chars[pos + 1..=pos + close].iter().collect();
                tokens.push(Token::Term(term));
                merging = false;
                pos += close + 2;
            }
            _ => {
                let end = chars[pos..]
                    .iter()
                    .position(|&c| c.is_whitespace() || "()[\"".contains(c))
                    .map_or(chars.len(), |n| pos + n);
                let word: String = chars[pos..end].iter().collect();
                pos = end;
                match word.as_str() {
                    "and" => {
                        tokens.push(Token::And);
                        merging = false;
                    }
                    "or" => {
                        tokens.push(Token::Or);
                        merging = false;
                    }
                    "not" => {
                        tokens.push(Token::Not);
                        merging = false;
                    }
                    _ => {
                        if merging {
                            if let Some(Token::Term(prev)) = tokens.last_mut() {
                                prev.push(' ');
                                prev.push_str(&word);
                            }
                        } else {
                            tokens.push(Token::Term(word));
                            merging = true;
                        }
                    }
                }
            }
        }
    }
    Ok(tokens)
}

fn optional(text: &str) -> Option<String> {
    let text = text.trim();
    (!text.is_empty()).then(|| text.to_string())
}

/// A boolean expression over an item's tags.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Expr {
    /// Matches when the term equals one of the item's tags.
    Atom(String),
    And(Box<Expr>, Box<Expr>),
    Or(Box<Expr>, Box<Expr>),
    Not(Box<Expr>),
}

impl Expr {
    /// Whether the expression matches an item's tag path.
    #[must_use]
    pub fn matches(&self, item: &LogItem) -> bool {
        match self {
            Self::Atom(term) => item.tags().iter().any(|tag| tag == term),
            Self::And(left, right) => left.matches(item) && right.matches(item),
            Self::Or(left, right) => left.matches(item) || right.matches(item),
            Self::Not(inner) => !inner.matches(item),
        }
    }
}

impl fmt::Display for Expr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Atom(term) => write!(f, "{term}"),
            Self::And(left, right) => write!(f, "({left} and {right})"),
            Self::Or(left, right) => write!(f, "({left} or {right})"),
            Self::Not(inner) => write!(f, "(not {inner})"),
        }
    }
}

/// A parsed query: an optional boolean predicate plus a time window.
///
/// An empty query string parses to an always-true filter over the full
/// log range.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Query {
    expr: Option<Expr>,
    start: Option<NaiveDateTime>,
    stop: Option<NaiveDateTime>,
}

impl Query {
    #[must_use]
    pub fn expr(&self) -> Option<&Expr> {
        self.expr.as_ref()
    }

    #[must_use]
    pub const fn window(&self) -> (Option<NaiveDateTime>, Option<NaiveDateTime>) {
        (self.start, self.stop)
    }

    /// Whether an item satisfies the predicate and overlaps the window.
    #[must_use]
    pub fn matches(&self, item: &LogItem) -> bool {
        self.expr.as_ref().is_none_or(|e| e.matches(item)) && item.overlaps(self.start, self.stop)
    }

    /// Filters a log in two phases: narrow to items matching the boolean
    /// predicate, then clip the survivors to the time window. Clipping can
    /// truncate intervals at the window boundary, not just drop them. A
    /// query without a window skips the clipping phase entirely, so items
    /// pass through untouched.
    #[must_use]
    pub fn filter(&self, log: &Log) -> Log {
        let matched = log.filter_items(|item| self.expr.as_ref().is_none_or(|e| e.matches(item)));
        if self.start.is_none() && self.stop.is_none() {
            return matched;
        }
        matched.cut(self.start, self.stop)
    }
}

impl fmt::Display for Query {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let expr = self.expr.as_ref().map(ToString::to_string).unwrap_or_default();
        let bound = |b: Option<NaiveDateTime>| {
            b.map(|d| d.format(DATETIME_FORMAT).to_string()).unwrap_or_default()
        };
        write!(f, "({expr} [{};{}])", bound(self.start), bound(self.stop))
    }
}

/// Parses a query string, resolving relative date keywords against `now`.
///
/// Malformed query text is a hard error, never silently ignored.
pub fn parse(text: &str, now: NaiveDateTime) -> Result<Query, QueryError> {
    let tokens = tokenize(text)?;
    let mut parser = Parser { tokens, pos: 0 };

    let expr = match parser.peek() {
        Some(Token::Term(_) | Token::Not | Token::OpenParen) => Some(parser.or_expr()?),
        _ => None,
    };

    let (start, stop) = match parser.peek() {
        Some(Token::Slice(..)) => {
            let Some(Token::Slice(start, stop)) = parser.next() else {
                unreachable!()
            };
            (
                start.map(|s| parse_flexible(&s, now)).transpose()?,
                stop.map(|s| parse_flexible(&s, now)).transpose()?,
            )
        }
        _ => (None, None),
    };

    if let Some(extra) = parser.peek() {
        return Err(QueryError::UnexpectedToken(extra.describe()));
    }
    Ok(Query { expr, start, stop })
}

struct Parser {
    tokens: Vec<Token>,
    pos: usize,
}

impl Parser {
    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos)
    }

    fn next(&mut self) -> Option<Token> {
        let token = self.tokens.get(self.pos).cloned();
        if token.is_some() {
            self.pos += 1;
        }
        token
    }

    fn or_expr(&mut self) -> Result<Expr, QueryError> {
        let left = self.and_expr()?;
        if matches!(self.peek(), Some(Token::Or)) {
            self.pos += 1;
            let right = self.or_expr()?;
            return Ok(Expr::Or(Box::new(left), Box::new(right)));
        }
        Ok(left)
    }

    fn and_expr(&mut self) -> Result<Expr, QueryError> {
        let left = self.unary()?;
        if matches!(self.peek(), Some(Token::And)) {
            self.pos += 1;
            let right = self.and_expr()?;
            return Ok(Expr::And(Box::new(left), Box::new(right)));
        }
        Ok(left)
    }

    fn unary(&mut self) -> Result<Expr, QueryError> {
        match self.next() {
            Some(Token::Not) => Ok(Expr::Not(Box::new(self.or_expr()?))),
            Some(Token::OpenParen) => {
                let inner = self.or_expr()?;
                match self.next() {
                    Some(Token::CloseParen) => Ok(inner),
                    Some(other) => Err(QueryError::UnexpectedToken(other.describe())),
                    None => Err(QueryError::UnexpectedEnd),
                }
            }
            Some(Token::Term(term)) => Ok(Expr::Atom(term)),
            Some(other) => Err(QueryError::UnexpectedToken(other.describe())),
            None => Err(QueryError::UnexpectedEnd),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const NOW: &str = "2016-10-09 12:00";

    fn dt(s: &str) -> NaiveDateTime {
        NaiveDateTime::parse_from_str(s, DATETIME_FORMAT).unwrap()
    }

    fn now() -> NaiveDateTime {
        dt(NOW)
    }

    // ========== Lexer ==========

    #[test]
    fn lexer_merges_adjacent_bare_words() {
        assert_eq!(tokenize("a b c").unwrap(), vec![Token::Term("a b c".into())]);
    }

    #[test]
    fn lexer_reads_quoted_terms_verbatim() {
        assert_eq!(
            tokenize("\"a and b\" or c").unwrap(),
            vec![
                Token::Term("a and b".into()),
                Token::Or,
                Token::Term("c".into()),
            ]
        );
    }

    #[test]
    fn lexer_reads_operators() {
        assert_eq!(tokenize("and").unwrap(), vec![Token::And]);
        assert_eq!(
            tokenize("not (x)").unwrap(),
            vec![
                Token::Not,
                Token::OpenParen,
                Token::Term("x".into()),
                Token::CloseParen,
            ]
        );
    }

    #[test]
    fn lexer_reads_slices() {
        assert_eq!(
            tokenize("[today;tomorrow]").unwrap(),
            vec![Token::Slice(Some("today".into()), Some("tomorrow".into()))]
        );
        assert_eq!(
            tokenize("[today;]").unwrap(),
            vec![Token::Slice(Some("today".into()), None)]
        );
        assert_eq!(tokenize("[;]").unwrap(), vec![Token::Slice(None, None)]);
    }

    #[test]
    fn lexer_reads_mixed_query() {
        assert_eq!(
            tokenize("w and x or y [today;tomorrow]").unwrap(),
            vec![
                Token::Term("w".into()),
                Token::And,
                Token::Term("x".into()),
                Token::Or,
                Token::Term("y".into()),
                Token::Slice(Some("today".into()), Some("tomorrow".into())),
            ]
        );
    }

    #[test]
    fn lexer_rejects_unterminated_input() {
        assert_eq!(tokenize("[today;"), Err(QueryError::UnterminatedSlice));
        assert_eq!(tokenize("\"abc"), Err(QueryError::UnterminatedQuote));
        assert_eq!(tokenize("[today]"), Err(QueryError::MalformedSlice));
    }

    // ========== Parser ==========

    fn shows_as(text: &str, expected: &str) {
        assert_eq!(parse(text, now()).unwrap().to_string(), expected);
    }

    #[test]
    fn word_parses_to_atom_with_open_window() {
        shows_as("word", "(word [;])");
    }

    #[test]
    fn empty_query_is_always_true_over_full_range() {
        let q = parse("", now()).unwrap();
        assert_eq!(q.to_string(), "( [;])");
        assert_eq!(q.expr(), None);
        assert_eq!(q.window(), (None, None));
    }

    #[test]
    fn and_binds_tighter_than_or() {
        shows_as("foo and bar", "((foo and bar) [;])");
        shows_as("foo and bar or qux", "(((foo and bar) or qux) [;])");
    }

    #[test]
    fn parens_override_precedence() {
        shows_as("foo and (bar or qux)", "((foo and (bar or qux)) [;])");
    }

    #[test]
    fn not_binds_the_expression_that_follows() {
        shows_as("not x", "((not x) [;])");
        shows_as("not (x or w)", "((not (x or w)) [;])");
        shows_as("x and not y", "((x and (not y)) [;])");
        shows_as("w or not x and (r or u)", "((w or (not (x and (r or u)))) [;])");
    }

    #[test]
    fn slices_resolve_dates() {
        shows_as(
            "x [2016-10-10;2016-10-10]",
            "(x [2016-10-10 00:00;2016-10-10 00:00])",
        );
        shows_as("x [2016-10-10;]", "(x [2016-10-10 00:00;])");
        shows_as("x [;2016-10-10]", "(x [;2016-10-10 00:00])");
        shows_as("x [;]", "(x [;])");
        shows_as("[2016-10-10;2016-10-11]", "( [2016-10-10 00:00;2016-10-11 00:00])");
    }

    #[test]
    fn slice_keywords_resolve_against_now() {
        shows_as("[today;now]", "( [2016-10-09 00:00;2016-10-09 12:00])");
    }

    #[test]
    fn malformed_queries_are_hard_errors() {
        assert!(matches!(parse("and", now()), Err(QueryError::UnexpectedToken(_))));
        assert_eq!(parse("not", now()), Err(QueryError::UnexpectedEnd));
        assert_eq!(parse("(x or y", now()), Err(QueryError::UnexpectedEnd));
        assert!(matches!(parse("x) y", now()), Err(QueryError::UnexpectedToken(_))));
        assert!(matches!(
            parse("x [nonsense;]", now()),
            Err(QueryError::Date(_))
        ));
        assert!(matches!(
            parse("[;] trailing", now()),
            Err(QueryError::UnexpectedToken(_))
        ));
    }

    // ========== Evaluator ==========

    fn item(tags: &str) -> LogItem {
        LogItem::closed(dt("2016-10-11 10:00"), dt("2016-10-11 11:00"), tags.split('/')).unwrap()
    }

    #[test]
    fn atom_matches_exact_tag_only() {
        let q = parse("tag1", now()).unwrap();
        assert!(q.matches(&item("tag1/tag2")));
        assert!(!q.matches(&item("tag10/tag2")));
        assert!(!q.matches(&item("other")));
    }

    #[test]
    fn precedence_truth_table() {
        // `x and not y` over all four combinations of x/y presence.
        let q = parse("x and not y", now()).unwrap();
        assert!(!q.matches(&item("a")));
        assert!(!q.matches(&item("y")));
        assert!(q.matches(&item("x")));
        assert!(!q.matches(&item("x/y")));
    }

    #[test]
    fn window_test_uses_overlap() {
        let q = parse("[2016-10-11 10:30;2016-10-11 10:45]", now()).unwrap();
        assert!(q.matches(&item("a")));
        let q = parse("[2016-10-11 12:00;]", now()).unwrap();
        assert!(!q.matches(&item("a")));
    }

    #[test]
    fn windowless_filter_leaves_an_open_item_open() {
        let log = Log::from_text(
            "2016-10-09 10:00\nliving / hanging\n2016-10-09 11:00\na3m / no-rm",
            now(),
        )
        .unwrap();
        let q = parse("a3m", now()).unwrap();
        let filtered = q.filter(&log);
        assert_eq!(filtered.items().len(), 1);
        assert!(!filtered.items()[0].ended());
        assert_eq!(filtered.to_string(), "2016-10-09 11:00\na3m / no-rm");
    }
}
