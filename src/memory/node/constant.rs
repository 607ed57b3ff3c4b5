use std::fmt;

/// Literal produced by the reader that the rest of the runtime treats as opaque.
#[derive(Debug, Clone, PartialEq)]
pub enum Constant {
    Str(String),
    Char(char),
    Rational { numerator: i64, denominator: i64 },
}

impl Constant {
    /// Builds a rational in lowest terms with a positive denominator.
    ///
    /// Returns `None` for a zero denominator.
    pub fn rational(numerator: i64, denominator: i64) -> Option<Self> {
        if denominator == 0 {
            return None;
        }
        let divisor = gcd(numerator.unsigned_abs(), denominator.unsigned_abs()) as i64;
        let sign = if denominator < 0 { -1 } else { 1 };
        Some(Constant::Rational {
            numerator: sign * numerator / divisor,
            denominator: sign * denominator / divisor,
        })
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Constant::Str(_) => "string",
            Constant::Char(_) => "char",
            Constant::Rational { .. } => "rational",
        }
    }
}

fn gcd(mut a: u64, mut b: u64) -> u64 {
    while b != 0 {
        let t = a % b;
        a = b;
        b = t;
    }
    a.max(1)
}

impl fmt::Display for Constant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Constant::Str(s) => write!(f, "{:?}", s),
            Constant::Char(' ') => write!(f, "#\\space"),
            Constant::Char('\n') => write!(f, "#\\newline"),
            Constant::Char('\t') => write!(f, "#\\tab"),
            Constant::Char(c) => write!(f, "#\\{}", c),
            Constant::Rational {
                numerator,
                denominator,
            } => write!(f, "{}/{}", numerator, denominator),
        }
    }
}
