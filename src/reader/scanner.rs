use super::cursor::StrCursor;
use super::token::{Token, TokenKind};
use super::ReadError;
use radix_trie::Trie;

pub struct Scanner<'a> {
    source: &'a str,
    cursor: StrCursor<'a>,
    start: usize,
    keywords: Trie<&'static str, TokenKind>,
    line: u64,
}

const KEYWORDS: [(&str, TokenKind); 5] = [
    ("nil", TokenKind::Nil),
    ("#t", TokenKind::True),
    ("#f", TokenKind::False),
    ("#true", TokenKind::True),
    ("#false", TokenKind::False),
];

/// Characters that end an atom.
fn is_delimiter(ch: char) -> bool {
    ch.is_whitespace() || matches!(ch, '(' | ')' | '\'' | '"' | ';')
}

impl<'a> Scanner<'a> {
    pub fn new(source: &'a str) -> Self {
        let mut keywords = Trie::new();
        for keyword in KEYWORDS.iter() {
            keywords.insert(keyword.0, keyword.1);
        }

        Self {
            source,
            cursor: StrCursor::new(source),
            start: 0,
            keywords,
            line: 1,
        }
    }

    pub fn scan_token(&mut self) -> Result<Token<'a>, ReadError> {
        self.skip_whitespace();
        self.start = self.cursor.index;

        if let Some(ch) = self.cursor.advance() {
            let token = match ch {
                '(' => self.create_token(TokenKind::ParenLeft),
                ')' => self.create_token(TokenKind::ParenRight),
                '\'' => self.create_token(TokenKind::Quote),
                '"' => self.create_string_token()?,
                '#' if self.cursor.peek() == Some('\\') => self.create_char_token()?,
                '`' | ',' | '[' | ']' | '{' | '}' => {
                    return Err(ReadError::InvalidCharacter(ch, self.line))
                }
                _ => self.create_atom_token(),
            };
            Ok(token)
        } else {
            Ok(self.create_token(TokenKind::EOF))
        }
    }

    fn create_token(&self, kind: TokenKind) -> Token<'a> {
        let data = &self.source[self.start..self.cursor.index];
        Token::new(kind, data, self.line)
    }

    fn skip_whitespace(&mut self) {
        while let Some(ch) = self.cursor.peek() {
            match ch {
                '\n' => {
                    self.line += 1;
                    self.cursor.advance();
                }
                // Comment until the end of the line.
                ';' => self.cursor.advance_until(|ch| ch == '\n'),
                val if val.is_whitespace() => {
                    self.cursor.advance();
                }
                _ => return,
            }
        }
    }

    fn create_atom_token(&mut self) -> Token<'a> {
        self.cursor.advance_until(is_delimiter);

        let text = &self.source[self.start..self.cursor.index];
        let kind = if let Some(kind) = self.keywords.get(text) {
            *kind
        } else {
            classify_atom(text)
        };
        self.create_token(kind)
    }

    fn create_string_token(&mut self) -> Result<Token<'a>, ReadError> {
        let start_line = self.line;
        loop {
            match self.cursor.advance() {
                Some('"') => break,
                Some('\\') => {
                    // Skip whatever is escaped, including a quote.
                    if self.cursor.advance().is_none() {
                        return Err(ReadError::UnterminatedString(start_line));
                    }
                }
                Some('\n') => self.line += 1,
                Some(_) => {}
                None => return Err(ReadError::UnterminatedString(start_line)),
            }
        }

        Ok(self.create_token(TokenKind::String))
    }

    fn create_char_token(&mut self) -> Result<Token<'a>, ReadError> {
        self.cursor.advance(); // Consume the backslash.
        // The character itself may be a delimiter, e.g. `#\(` or `#\ `.
        if self.cursor.advance().is_none() {
            return Err(ReadError::InvalidChar(String::new()));
        }
        // Named characters such as `#\space`.
        self.cursor.advance_until(is_delimiter);
        Ok(self.create_token(TokenKind::Char))
    }
}

fn is_integer(text: &str) -> bool {
    let digits = text.strip_prefix(|c| c == '+' || c == '-').unwrap_or(text);
    !digits.is_empty() && digits.chars().all(|c| c.is_ascii_digit())
}

fn classify_atom(text: &str) -> TokenKind {
    if text == "." {
        return TokenKind::Dot;
    }
    if is_integer(text) {
        return TokenKind::Integer;
    }
    if let Some((numerator, denominator)) = text.split_once('/') {
        if is_integer(numerator)
            && !denominator.is_empty()
            && denominator.chars().all(|c| c.is_ascii_digit())
        {
            return TokenKind::Rational;
        }
    }
    let numeric_chars = text
        .chars()
        .all(|c| c.is_ascii_digit() || matches!(c, '+' | '-' | '.' | 'e' | 'E'));
    if numeric_chars && text.chars().any(|c| c.is_ascii_digit()) && text.parse::<f64>().is_ok() {
        return TokenKind::Float;
    }
    TokenKind::Symbol
}
