use std::num::{ParseFloatError, ParseIntError};
use thiserror::Error;

pub mod cursor;
pub mod scanner;
pub mod token;

use scanner::Scanner;
use token::{Token, TokenKind};

#[derive(Debug, Error, PartialEq)]
pub enum ReadError {
    #[error("Unterminated string starting on line {}", .0)]
    UnterminatedString(u64),

    #[error("Invalid character '{}' on line {}", .0, .1)]
    InvalidCharacter(char, u64),

    #[error("Unexpected '{}' on line {}", .token, .line)]
    UnexpectedToken { token: String, line: u64 },

    #[error("Unexpected end of input")]
    UnexpectedEof,

    #[error("Invalid number: {}", .0)]
    InvalidNumber(String),

    #[error("Invalid integer")]
    ParseInt(#[from] ParseIntError),

    #[error("Invalid float")]
    ParseFloat(#[from] ParseFloatError),

    #[error("Invalid character literal: #\\{}", .0)]
    InvalidChar(String),
}

/// Token stream over one source text, with a single token of lookahead.
pub struct Reader<'a> {
    scanner: Scanner<'a>,
    peeked: Option<Token<'a>>,
}

impl<'a> Reader<'a> {
    pub fn new(source: &'a str) -> Self {
        Self {
            scanner: Scanner::new(source),
            peeked: None,
        }
    }

    pub fn peek(&mut self) -> Result<Token<'a>, ReadError> {
        match self.peeked {
            Some(token) => Ok(token),
            None => {
                let token = self.scanner.scan_token()?;
                self.peeked = Some(token);
                Ok(token)
            }
        }
    }

    pub fn next_token(&mut self) -> Result<Token<'a>, ReadError> {
        match self.peeked.take() {
            Some(token) => Ok(token),
            None => self.scanner.scan_token(),
        }
    }

    /// Whether only whitespace and comments remain.
    pub fn at_end(&mut self) -> Result<bool, ReadError> {
        Ok(self.peek()?.kind == TokenKind::EOF)
    }
}

/// Decodes the text of a string token, quotes included.
pub fn parse_string(data: &str) -> Result<String, ReadError> {
    let inner = data
        .strip_prefix('"')
        .and_then(|s| s.strip_suffix('"'))
        .ok_or(ReadError::UnexpectedEof)?;

    let mut out = String::with_capacity(inner.len());
    let mut chars = inner.chars();
    while let Some(ch) = chars.next() {
        if ch != '\\' {
            out.push(ch);
            continue;
        }
        match chars.next() {
            Some('n') => out.push('\n'),
            Some('t') => out.push('\t'),
            Some('r') => out.push('\r'),
            Some('0') => out.push('\0'),
            Some(other) => out.push(other),
            None => return Err(ReadError::UnexpectedEof),
        }
    }
    Ok(out)
}

/// Decodes the text of a character token such as `#\a` or `#\space`.
pub fn parse_char(data: &str) -> Result<char, ReadError> {
    let name = data.strip_prefix("#\\").unwrap_or(data);
    let mut chars = name.chars();
    match (chars.next(), chars.next()) {
        (Some(ch), None) => return Ok(ch),
        (None, _) => return Err(ReadError::InvalidChar(String::new())),
        _ => {}
    }
    match name {
        "space" => Ok(' '),
        "newline" => Ok('\n'),
        "tab" => Ok('\t'),
        _ => Err(ReadError::InvalidChar(name.to_owned())),
    }
}

/// Splits a rational token into its parts.
pub fn parse_rational(data: &str) -> Result<(i64, i64), ReadError> {
    let (numerator, denominator) = data
        .split_once('/')
        .ok_or_else(|| ReadError::InvalidNumber(data.to_owned()))?;
    Ok((numerator.parse()?, denominator.parse()?))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn peek_then_next_yield_the_same_token() {
        let mut reader = Reader::new("(a)");
        let peeked = reader.peek().unwrap();
        assert_eq!(reader.next_token().unwrap(), peeked);
        assert_eq!(reader.next_token().unwrap().data, "a");
        assert_eq!(reader.next_token().unwrap().kind, TokenKind::ParenRight);
        assert!(reader.at_end().unwrap());
    }

    #[test]
    fn comments_only_is_the_end() {
        let mut reader = Reader::new("  ; nothing here\n   ");
        assert!(reader.at_end().unwrap());
    }

    #[test]
    fn string_escapes() {
        assert_eq!(parse_string(r#""a\"b\n""#).unwrap(), "a\"b\n");
        assert_eq!(parse_string(r#""""#).unwrap(), "");
    }

    #[test]
    fn char_literals() {
        assert_eq!(parse_char("#\\a"), Ok('a'));
        assert_eq!(parse_char("#\\("), Ok('('));
        assert_eq!(parse_char("#\\space"), Ok(' '));
        assert_eq!(parse_char("#\\λ"), Ok('λ'));
        assert_eq!(
            parse_char("#\\bogus"),
            Err(ReadError::InvalidChar("bogus".into()))
        );
    }

    #[test]
    fn rationals() {
        assert_eq!(parse_rational("-3/4"), Ok((-3, 4)));
        assert!(parse_rational("3").is_err());
    }
}
