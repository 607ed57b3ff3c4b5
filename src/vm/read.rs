use super::{Result, Runtime, RuntimeError};
use crate::memory::node::Constant;
use crate::memory::{Handle, Node};
use crate::reader::token::{Token, TokenKind};
use crate::reader::{self, ReadError, Reader};

/// A form still waiting for its elements.
enum Open {
    List {
        count: usize,
        dotted: bool,
        has_tail: bool,
    },
    Quote,
}

fn unexpected(token: &Token<'_>) -> RuntimeError {
    ReadError::UnexpectedToken {
        token: token.data.to_owned(),
        line: token.line,
    }
    .into()
}

impl Runtime {
    /// Builds the next datum of `reader` and pushes it.
    ///
    /// Fails with [`RuntimeError::EndOfInput`] when nothing but whitespace and
    /// comments is left. On any other failure the stack is left as it was.
    pub fn read(&mut self, reader: &mut Reader<'_>) -> Result<Handle> {
        self.enter("read")?;
        let depth = self.stack.depth();
        let outcome = self.read_datum(reader);
        if outcome.is_err() {
            self.stack.truncate(depth);
        }
        outcome
    }

    /// Parses exactly one datum from `text` and pushes it. Anything after
    /// the datum, even a token that fails to scan, is an error and leaves the
    /// stack as it was.
    pub fn new_constant(&mut self, text: &str) -> Result<Handle> {
        let mut reader = Reader::new(text);
        let datum = self.read(&mut reader)?;
        let error = match reader.at_end() {
            Ok(true) => return Ok(datum),
            Ok(false) => match reader.next_token() {
                Ok(token) => unexpected(&token),
                Err(err) => err.into(),
            },
            Err(err) => err.into(),
        };
        self.stack.pop("new_constant")?;
        Err(error)
    }

    /// Elements of unfinished lists wait on the operand stack, so a
    /// collection in the middle of a large datum keeps them.
    fn read_datum(&mut self, reader: &mut Reader<'_>) -> Result<Handle> {
        let mut open: Vec<Open> = Vec::new();

        loop {
            let token = reader.next_token()?;
            match token.kind {
                TokenKind::EOF if open.is_empty() => return Err(RuntimeError::EndOfInput),
                TokenKind::EOF => return Err(ReadError::UnexpectedEof.into()),
                TokenKind::ParenLeft => {
                    open.push(Open::List {
                        count: 0,
                        dotted: false,
                        has_tail: false,
                    });
                    continue;
                }
                TokenKind::Quote => {
                    open.push(Open::Quote);
                    continue;
                }
                TokenKind::Dot => {
                    match open.last_mut() {
                        Some(Open::List { count, dotted, .. }) if *count > 0 && !*dotted => {
                            *dotted = true;
                        }
                        _ => return Err(unexpected(&token)),
                    }
                    continue;
                }
                TokenKind::ParenRight => match open.pop() {
                    Some(Open::List {
                        count,
                        dotted,
                        has_tail,
                    }) => {
                        if dotted && !has_tail {
                            return Err(unexpected(&token));
                        }
                        if !dotted {
                            self.new_nil()?;
                        }
                        self.close_list(count)?;
                    }
                    _ => return Err(unexpected(&token)),
                },
                _ => {
                    self.read_atom(&token)?;
                }
            }

            // A datum is complete on top of the stack. Hand it to whatever
            // encloses it.
            loop {
                match open.last_mut() {
                    None => return self.stack.top("read"),
                    Some(Open::Quote) => {
                        open.pop();
                        self.wrap_quote()?;
                    }
                    Some(Open::List {
                        count,
                        dotted,
                        has_tail,
                    }) => {
                        if *has_tail {
                            return Err(unexpected(&token));
                        }
                        if *dotted {
                            *has_tail = true;
                        } else {
                            *count += 1;
                        }
                        break;
                    }
                }
            }
        }
    }

    /// The stack holds `count` elements, first one deepest, with the tail on
    /// top. Conses them up from the back.
    fn close_list(&mut self, count: usize) -> Result<Handle> {
        let mut list = self.stack.top("read")?;
        for _ in 0..count {
            self.swap()?;
            list = self.new_pair()?;
        }
        Ok(list)
    }

    /// Replaces the datum on top with `(quote datum)`.
    fn wrap_quote(&mut self) -> Result<Handle> {
        self.new_nil()?;
        self.swap()?;
        self.new_pair()?;
        self.new_symbol("quote")?;
        self.new_pair()
    }

    fn read_atom(&mut self, token: &Token<'_>) -> Result<Handle> {
        let data = token.data;
        match token.kind {
            TokenKind::Integer => {
                let value: i64 = data.parse().map_err(ReadError::from)?;
                self.new_integer(value)
            }
            TokenKind::Float => {
                let value: f64 = data.parse().map_err(ReadError::from)?;
                self.new_float(value)
            }
            TokenKind::Rational => {
                let (numerator, denominator) = reader::parse_rational(data)?;
                let constant = Constant::rational(numerator, denominator)
                    .ok_or_else(|| ReadError::InvalidNumber(data.to_owned()))?;
                Ok(self.allocate_and_push(Node::Constant(constant)))
            }
            TokenKind::String => {
                let text = reader::parse_string(data)?;
                Ok(self.allocate_and_push(Node::Constant(Constant::Str(text))))
            }
            TokenKind::Char => {
                let ch = reader::parse_char(data)?;
                Ok(self.allocate_and_push(Node::Constant(Constant::Char(ch))))
            }
            TokenKind::Symbol => self.new_symbol(data),
            TokenKind::True => self.new_bool(true),
            TokenKind::False => self.new_bool(false),
            TokenKind::Nil => self.new_nil(),
            _ => Err(unexpected(token)),
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::config::Config;
    use crate::memory::Handle;
    use crate::reader::{ReadError, Reader};
    use crate::vm::{Runtime, RuntimeError};

    fn runtime() -> Runtime {
        let mut rt = Runtime::new(Config::default());
        rt.start().unwrap();
        rt
    }

    fn round_trip(text: &str) -> String {
        let mut rt = runtime();
        let h = rt.new_constant(text).unwrap();
        rt.display(h)
    }

    #[test]
    fn atoms_round_trip() {
        assert_eq!(round_trip("1234"), "1234");
        assert_eq!(round_trip("-7"), "-7");
        assert_eq!(round_trip("1.234"), "1.234");
        assert_eq!(round_trip("nil"), "nil");
        assert_eq!(round_trip("#t"), "#t");
        assert_eq!(round_trip("#false"), "#f");
        assert_eq!(round_trip("foo-bar?"), "foo-bar?");
        assert_eq!(round_trip("\"a \\\"b\\\"\""), "\"a \\\"b\\\"\"");
        assert_eq!(round_trip("#\\space"), "#\\space");
        assert_eq!(round_trip("6/4"), "3/2");
    }

    #[test]
    fn typed_round_trips() {
        let mut rt = runtime();
        let i = rt.new_constant("1234").unwrap();
        assert_eq!(rt.get_integer(i), Ok(1234));
        let f = rt.new_constant("1.234").unwrap();
        assert_eq!(rt.get_float(f), Ok(1.234));
        let n = rt.new_constant("nil").unwrap();
        assert_eq!(n, Handle::NIL);
        let s = rt.new_symbol("nil").unwrap();
        assert_eq!(rt.get_symbol_text(s), Ok("nil"));
    }

    #[test]
    fn lists_round_trip() {
        assert_eq!(round_trip("()"), "nil");
        assert_eq!(round_trip("(1 2 3)"), "(1 2 3)");
        assert_eq!(round_trip("(a (b c) . d)"), "(a (b c) . d)");
        assert_eq!(round_trip("(1 . (2 . (3 . nil)))"), "(1 2 3)");
        assert_eq!(round_trip("'x"), "(quote x)");
        assert_eq!(round_trip("'(1 'b)"), "(quote (1 (quote b)))");
        assert_eq!(round_trip("( 1 ; one\n 2 )"), "(1 2)");
    }

    #[test]
    fn read_consumes_data_in_sequence() {
        let mut rt = runtime();
        let mut reader = Reader::new("1 (2) ; trailing comment\n");
        let first = rt.read(&mut reader).unwrap();
        let second = rt.read(&mut reader).unwrap();
        assert_eq!(rt.display(first), "1");
        assert_eq!(rt.display(second), "(2)");
        assert_eq!(rt.read(&mut reader), Err(RuntimeError::EndOfInput));
        assert_eq!(rt.depth(), 2);
    }

    #[test]
    fn malformed_input() {
        let mut rt = runtime();
        assert_eq!(
            rt.new_constant("(1 2"),
            Err(RuntimeError::Read(ReadError::UnexpectedEof))
        );
        assert!(matches!(
            rt.new_constant(")"),
            Err(RuntimeError::Read(ReadError::UnexpectedToken { .. }))
        ));
        assert!(matches!(
            rt.new_constant("(. 1)"),
            Err(RuntimeError::Read(ReadError::UnexpectedToken { .. }))
        ));
        assert!(matches!(
            rt.new_constant("(1 . 2 3)"),
            Err(RuntimeError::Read(ReadError::UnexpectedToken { .. }))
        ));
        assert!(matches!(
            rt.new_constant("1 2"),
            Err(RuntimeError::Read(ReadError::UnexpectedToken { .. }))
        ));
        assert!(matches!(
            rt.new_constant("1/0"),
            Err(RuntimeError::Read(ReadError::InvalidNumber(_)))
        ));
        assert!(matches!(
            rt.new_constant("99999999999999999999"),
            Err(RuntimeError::Read(ReadError::ParseInt(_)))
        ));
        assert_eq!(rt.new_constant("   "), Err(RuntimeError::EndOfInput));
        assert_eq!(rt.depth(), 0);
    }

    #[test]
    fn trailing_scan_error_drops_the_datum() {
        let mut rt = runtime();
        assert_eq!(
            rt.new_constant("1 \"unterminated"),
            Err(RuntimeError::Read(ReadError::UnterminatedString(1)))
        );
        assert_eq!(rt.depth(), 0);
        assert!(matches!(
            rt.new_constant("(a) `b"),
            Err(RuntimeError::Read(ReadError::InvalidCharacter('`', 1)))
        ));
        assert_eq!(rt.depth(), 0);
    }

    #[test]
    fn large_lists_survive_collection_while_reading() {
        let mut rt = Runtime::new(Config::small_heap(16));
        rt.start().unwrap();
        let text = format!("({})", (0..500).map(|i| i.to_string()).collect::<Vec<_>>().join(" "));
        rt.new_constant(&text).unwrap();
        rt.gc().unwrap();
        assert_eq!(rt.depth(), 1);
        assert_eq!(rt.list_to_stack(), Ok(500));
        let head = rt.pop().unwrap();
        assert_eq!(rt.get_integer(head), Ok(0));
        let last = rt.peek(498).unwrap();
        assert_eq!(rt.get_integer(last), Ok(499));
    }
}
