//! `semcolor-grammar` - a line-oriented arithmetic comparison grammar for `semcolor-core`.
//!
//! Every line is read as `expression COMPARISON expression`, for example `2+2 EQUALS 4` or
//! `10 / 4 NOT_EQUALS 2.5`. The line gets one token spanning the comparison keyword:
//! [`TokenKind::Match`] when the comparison holds, [`TokenKind::Mismatch`] otherwise.
//! Lines that do not follow the grammar get no token.
//!
//! Text the lexer does not recognise (spaces, words, punctuation) is skipped, so
//! `total: 2+2 EQUALS 4` still colorizes.

use regex::Regex;
use semcolor_core::{LineTokenizer, Token, TokenKind};
use thiserror::Error;
use tracing::trace;

/// Lexical units: numbers, the four arithmetic operators and the two comparison keywords.
const SEGMENT_PATTERN: &str = r"[0-9]+(?:\.[0-9]+)*|\+|-|/|\*|NOT_EQUALS|EQUALS";

/// Why a line produced no token.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ParseFailure {
    #[error("line ended where a {expected} was expected")]
    UnexpectedEnd { expected: &'static str },
    #[error("expected a {expected}, found `{found}` at column {column}")]
    Unexpected {
        expected: &'static str,
        found: String,
        column: usize,
    },
    #[error("`{0}` is not a number")]
    InvalidNumber(String),
    #[error("division by zero")]
    DivisionByZero,
    #[error("arithmetic result is not a finite number")]
    NonFinite,
    #[error("trailing `{found}` at column {column}")]
    Trailing { found: String, column: usize },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Operator {
    Add,
    Subtract,
    Multiply,
    Divide,
}

impl Operator {
    fn binds_tight(self) -> bool {
        matches!(self, Self::Multiply | Self::Divide)
    }

    /// Overflow to infinity (and NaN from there) fails like division by zero: such a
    /// result cannot be compared.
    fn apply(self, lhs: f64, rhs: f64) -> Result<f64, ParseFailure> {
        let value = match self {
            Self::Add => lhs + rhs,
            Self::Subtract => lhs - rhs,
            Self::Multiply => lhs * rhs,
            Self::Divide if rhs == 0.0 => return Err(ParseFailure::DivisionByZero),
            Self::Divide => lhs / rhs,
        };
        if value.is_finite() {
            Ok(value)
        } else {
            Err(ParseFailure::NonFinite)
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Comparison {
    Equals,
    NotEquals,
}

impl Comparison {
    fn holds(self, lhs: f64, rhs: f64) -> bool {
        match self {
            Self::Equals => lhs == rhs,
            Self::NotEquals => lhs != rhs,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SegmentKind {
    Number,
    Operator(Operator),
    Comparison(Comparison),
}

#[derive(Debug, Clone, Copy)]
struct Segment<'a> {
    kind: SegmentKind,
    text: &'a str,
    /// Character column of the first char.
    column: usize,
    /// Length in characters.
    len: usize,
}

impl Segment<'_> {
    fn unexpected(&self, expected: &'static str) -> ParseFailure {
        ParseFailure::Unexpected {
            expected,
            found: self.text.to_string(),
            column: self.column,
        }
    }
}

/// Cursor over the segments of one line.
struct Parser<'s, 'a> {
    segments: &'s [Segment<'a>],
    pos: usize,
}

impl<'a> Parser<'_, 'a> {
    fn peek(&self) -> Option<Segment<'a>> {
        self.segments.get(self.pos).copied()
    }

    fn advance(&mut self, expected: &'static str) -> Result<Segment<'a>, ParseFailure> {
        let segment = self.peek().ok_or(ParseFailure::UnexpectedEnd { expected })?;
        self.pos += 1;
        Ok(segment)
    }

    fn number(&mut self) -> Result<f64, ParseFailure> {
        let segment = self.advance("number")?;
        if segment.kind != SegmentKind::Number {
            return Err(segment.unexpected("number"));
        }
        segment
            .text
            .parse::<f64>()
            .ok()
            .filter(|value| value.is_finite())
            .ok_or_else(|| ParseFailure::InvalidNumber(segment.text.to_string()))
    }

    fn operator(&mut self, tight: bool) -> Option<Operator> {
        match self.peek()?.kind {
            SegmentKind::Operator(op) if op.binds_tight() == tight => {
                self.pos += 1;
                Some(op)
            }
            _ => None,
        }
    }

    /// `term := number (('*' | '/') number)*`
    fn term(&mut self) -> Result<f64, ParseFailure> {
        let mut value = self.number()?;
        while let Some(op) = self.operator(true) {
            value = op.apply(value, self.number()?)?;
        }
        Ok(value)
    }

    /// `expression := term (('+' | '-') term)*`
    fn expression(&mut self) -> Result<f64, ParseFailure> {
        let mut value = self.term()?;
        while let Some(op) = self.operator(false) {
            value = op.apply(value, self.term()?)?;
        }
        Ok(value)
    }

    fn comparison(&mut self) -> Result<(Comparison, Segment<'a>), ParseFailure> {
        let segment = self.advance("comparison keyword")?;
        match segment.kind {
            SegmentKind::Comparison(comparison) => Ok((comparison, segment)),
            _ => Err(segment.unexpected("comparison keyword")),
        }
    }
}

/// The comparison grammar.
#[derive(Debug, Clone)]
pub struct ComparisonGrammar {
    segments: Regex,
}

impl ComparisonGrammar {
    pub fn new() -> Result<Self, regex::Error> {
        Ok(Self {
            segments: Regex::new(SEGMENT_PATTERN)?,
        })
    }

    fn lex<'a>(&self, text: &'a str) -> Vec<Segment<'a>> {
        let mut segments = Vec::new();
        // Matches are left to right, so the char column is counted incrementally.
        let mut column = 0;
        let mut scanned = 0;
        for m in self.segments.find_iter(text) {
            column += text[scanned..m.start()].chars().count();
            let len = m.as_str().chars().count();
            let kind = match m.as_str() {
                "+" => SegmentKind::Operator(Operator::Add),
                "-" => SegmentKind::Operator(Operator::Subtract),
                "*" => SegmentKind::Operator(Operator::Multiply),
                "/" => SegmentKind::Operator(Operator::Divide),
                "EQUALS" => SegmentKind::Comparison(Comparison::Equals),
                "NOT_EQUALS" => SegmentKind::Comparison(Comparison::NotEquals),
                _ => SegmentKind::Number,
            };
            segments.push(Segment {
                kind,
                text: m.as_str(),
                column,
                len,
            });
            column += len;
            scanned = m.end();
        }
        segments
    }

    /// Parse and evaluate one line.
    ///
    /// On success the token spans the comparison keyword (char columns).
    pub fn parse_line(&self, line: usize, text: &str) -> Result<Token, ParseFailure> {
        let segments = self.lex(text);
        let mut parser = Parser {
            segments: &segments,
            pos: 0,
        };

        let lhs = parser.expression()?;
        let (comparison, keyword) = parser.comparison()?;
        let rhs = parser.expression()?;
        if let Some(extra) = parser.peek() {
            return Err(ParseFailure::Trailing {
                found: extra.text.to_string(),
                column: extra.column,
            });
        }

        let kind = TokenKind::from_outcome(comparison.holds(lhs, rhs));
        Ok(Token::new(line, keyword.column, keyword.len, kind))
    }
}

impl LineTokenizer for ComparisonGrammar {
    fn tokenize_line(&self, line: usize, text: &str) -> Option<Token> {
        match self.parse_line(line, text) {
            Ok(token) => Some(token),
            Err(failure) => {
                trace!(line, %failure, "line does not parse");
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn grammar() -> ComparisonGrammar {
        ComparisonGrammar::new().unwrap()
    }

    #[test]
    fn test_equals_holds() {
        assert_eq!(
            grammar().tokenize_line(0, "2+2 EQUALS 4"),
            Some(Token::new(0, 4, 6, TokenKind::Match))
        );
    }

    #[test]
    fn test_equals_fails() {
        assert_eq!(
            grammar().tokenize_line(3, "2+2 EQUALS 5"),
            Some(Token::new(3, 4, 6, TokenKind::Mismatch))
        );
    }

    #[test]
    fn test_not_equals() {
        let g = grammar();
        assert_eq!(
            g.tokenize_line(0, "1 NOT_EQUALS 2").map(|t| (t.start, t.length, t.kind)),
            Some((2, 10, TokenKind::Match))
        );
        assert_eq!(
            g.tokenize_line(0, "2*3 NOT_EQUALS 6").map(|t| t.kind),
            Some(TokenKind::Mismatch)
        );
    }

    #[test]
    fn test_missing_comparison_has_no_token() {
        let g = grammar();
        assert_eq!(g.tokenize_line(0, "2+2"), None);
        assert_eq!(
            g.parse_line(0, "2+2"),
            Err(ParseFailure::UnexpectedEnd {
                expected: "comparison keyword"
            })
        );
        assert_eq!(g.tokenize_line(0, ""), None);
    }

    #[test]
    fn test_precedence() {
        let g = grammar();
        assert_eq!(
            g.tokenize_line(0, "2+3*4 EQUALS 14").map(|t| t.kind),
            Some(TokenKind::Match)
        );
        assert_eq!(
            g.tokenize_line(0, "10-4-3 EQUALS 3").map(|t| t.kind),
            Some(TokenKind::Match)
        );
        assert_eq!(
            g.tokenize_line(0, "8/4/2 EQUALS 1").map(|t| t.kind),
            Some(TokenKind::Match)
        );
    }

    #[test]
    fn test_malformed_lines() {
        let g = grammar();
        assert_eq!(
            g.parse_line(0, "4 / 0 EQUALS 1"),
            Err(ParseFailure::DivisionByZero)
        );
        assert_eq!(
            g.parse_line(0, "1.2.3 EQUALS 1"),
            Err(ParseFailure::InvalidNumber("1.2.3".to_string()))
        );
        assert_eq!(
            g.parse_line(0, "1 EQUALS 1 EQUALS 1"),
            Err(ParseFailure::Trailing {
                found: "EQUALS".to_string(),
                column: 11
            })
        );
        assert!(matches!(
            g.parse_line(0, "1 + EQUALS 1"),
            Err(ParseFailure::Unexpected {
                expected: "number",
                column: 4,
                ..
            })
        ));
        assert_eq!(g.tokenize_line(0, "EQUALS"), None);
    }

    #[test]
    fn test_non_finite_results_have_no_token() {
        let g = grammar();
        let big = format!("1{}", "0".repeat(200));

        let overflow = format!("{big}*{big} EQUALS 1");
        assert_eq!(g.parse_line(0, &overflow), Err(ParseFailure::NonFinite));

        let nan = format!("{big}*{big} - {big}*{big} NOT_EQUALS 0");
        assert_eq!(g.parse_line(0, &nan), Err(ParseFailure::NonFinite));
        assert_eq!(g.tokenize_line(0, &nan), None);

        // Large but finite values still compare.
        let finite = format!("{big} - {big} EQUALS 0");
        assert_eq!(g.tokenize_line(0, &finite).map(|t| t.kind), Some(TokenKind::Match));
    }

    #[test]
    fn test_unrecognised_text_is_skipped() {
        assert_eq!(
            grammar().tokenize_line(0, "sum: 1 + 1 EQUALS 2 ok"),
            Some(Token::new(0, 11, 6, TokenKind::Match))
        );
    }

    #[test]
    fn test_columns_are_chars() {
        assert_eq!(
            grammar().tokenize_line(1, "你好 2+2 EQUALS 4"),
            Some(Token::new(1, 7, 6, TokenKind::Match))
        );
    }
}
