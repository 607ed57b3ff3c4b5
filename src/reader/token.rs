#[derive(Debug, Copy, Clone, PartialEq)]
pub struct Token<'a> {
    pub kind: TokenKind,
    pub line: u64,
    pub data: &'a str,
}

impl<'a> Token<'a> {
    pub fn new(kind: TokenKind, data: &'a str, line: u64) -> Self {
        Self { kind, data, line }
    }
}

#[derive(Debug, Copy, Clone, PartialEq)]
pub enum TokenKind {
    // Punctuation.
    ParenLeft,
    ParenRight,
    Dot,
    Quote,

    // Literals.
    Integer,
    Float,
    Rational,
    String,
    Char,
    Symbol,

    // Reserved atoms.
    True,
    False,
    Nil,

    EOF,
}
