use super::{Result, Runtime, RuntimeError};
use crate::memory::node::NativeFunction;
use crate::memory::{Handle, Node};

/// Name, function, arity and whether the closure is variadic.
const PRELUDE: [(&str, NativeFunction, usize, bool); 23] = [
    ("+", native_add, 0, true),
    ("-", native_sub, 1, true),
    ("*", native_mul, 0, true),
    ("/", native_div, 1, true),
    ("remainder", native_remainder, 2, false),
    ("quotient", native_quotient, 2, false),
    ("=", native_num_eq, 1, true),
    ("<", native_lt, 1, true),
    (">", native_gt, 1, true),
    ("<=", native_le, 1, true),
    (">=", native_ge, 1, true),
    ("car", native_car, 1, false),
    ("cdr", native_cdr, 1, false),
    ("cons", native_cons, 2, false),
    ("list", native_list, 0, true),
    ("eq?", native_equal, 2, false),
    ("equal?", native_equal, 2, false),
    ("atom?", native_is_atom, 1, false),
    ("number?", native_is_number, 1, false),
    ("symbol?", native_is_symbol, 1, false),
    ("null?", native_is_null, 1, false),
    ("pair?", native_is_pair, 1, false),
    ("not", native_not, 1, false),
];

/// Binds the built-in closures in the current frame.
pub(super) fn install(rt: &mut Runtime) -> Result<()> {
    for (name, function, arity, variadic) in PRELUDE.iter() {
        rt.define_native(name, *function, *arity, *variadic)?;
    }
    Ok(())
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum Number {
    Int(i64),
    Float(f64),
}

impl Number {
    fn as_float(self) -> f64 {
        match self {
            Number::Int(v) => v as f64,
            Number::Float(v) => v,
        }
    }
}

fn number(rt: &Runtime, op: &'static str, handle: Handle) -> Result<Number> {
    match rt.node(op, handle)? {
        Node::Integer(v) => Ok(Number::Int(*v)),
        Node::Float(v) => Ok(Number::Float(*v)),
        node => Err(RuntimeError::TypeMismatch {
            op,
            handle,
            expected: "number",
            found: node.kind(),
        }),
    }
}

fn push_number(rt: &mut Runtime, value: Number) -> Result<()> {
    match value {
        Number::Int(v) => rt.new_integer(v)?,
        Number::Float(v) => rt.new_float(v)?,
    };
    Ok(())
}

fn push_bool(rt: &mut Runtime, value: bool) -> Result<()> {
    rt.new_bool(value)?;
    Ok(())
}

/// All arguments of a variadic closure with `fixed` leading parameters.
fn numbers(rt: &Runtime, op: &'static str, fixed: usize) -> Result<Vec<Number>> {
    let mut values = Vec::new();
    for index in 0..fixed {
        values.push(number(rt, op, rt.argument(index)?)?);
    }
    let mut rest = rt.argument(fixed)?;
    while !rest.is_nil() {
        let (car, cdr) = rt.get_pair(rest)?;
        values.push(number(rt, op, car)?);
        rest = cdr;
    }
    Ok(values)
}

/// Folds with the integer operation while it does not overflow, then
/// continues in floating point.
fn fold(
    values: &[Number],
    init: Number,
    int_op: fn(i64, i64) -> Option<i64>,
    float_op: fn(f64, f64) -> f64,
) -> Number {
    values.iter().fold(init, |acc, value| match (acc, *value) {
        (Number::Int(a), Number::Int(b)) => match int_op(a, b) {
            Some(v) => Number::Int(v),
            None => Number::Float(float_op(a as f64, b as f64)),
        },
        (a, b) => Number::Float(float_op(a.as_float(), b.as_float())),
    })
}

fn native_add(rt: &mut Runtime) -> Result<()> {
    let values = numbers(rt, "+", 0)?;
    let sum = fold(&values, Number::Int(0), i64::checked_add, |a, b| a + b);
    push_number(rt, sum)
}

fn native_mul(rt: &mut Runtime) -> Result<()> {
    let values = numbers(rt, "*", 0)?;
    let product = fold(&values, Number::Int(1), i64::checked_mul, |a, b| a * b);
    push_number(rt, product)
}

fn native_sub(rt: &mut Runtime) -> Result<()> {
    let values = numbers(rt, "-", 1)?;
    let result = match values.split_first() {
        Some((first, [])) => fold(&[*first], Number::Int(0), i64::checked_sub, |a, b| a - b),
        Some((first, rest)) => fold(rest, *first, i64::checked_sub, |a, b| a - b),
        None => Number::Int(0),
    };
    push_number(rt, result)
}

fn divide(a: Number, b: Number) -> Result<Number> {
    match (a, b) {
        (_, Number::Int(0)) => Err(RuntimeError::DivisionByZero { op: "/" }),
        (Number::Int(a), Number::Int(b)) if a.checked_rem(b) == Some(0) => match a.checked_div(b) {
            Some(v) => Ok(Number::Int(v)),
            None => Ok(Number::Float(a as f64 / b as f64)),
        },
        (a, b) => Ok(Number::Float(a.as_float() / b.as_float())),
    }
}

fn native_div(rt: &mut Runtime) -> Result<()> {
    let values = numbers(rt, "/", 1)?;
    let result = match values.split_first() {
        Some((first, [])) => divide(Number::Int(1), *first)?,
        Some((first, rest)) => {
            let mut acc = *first;
            for value in rest {
                acc = divide(acc, *value)?;
            }
            acc
        }
        None => Number::Int(1),
    };
    push_number(rt, result)
}

fn integer_pair(rt: &Runtime, op: &'static str) -> Result<(i64, i64)> {
    let a = rt.get_integer(rt.argument(0)?)?;
    let b = rt.get_integer(rt.argument(1)?)?;
    if b == 0 {
        return Err(RuntimeError::DivisionByZero { op });
    }
    Ok((a, b))
}

fn native_remainder(rt: &mut Runtime) -> Result<()> {
    let (a, b) = integer_pair(rt, "remainder")?;
    rt.new_integer(a.wrapping_rem(b))?;
    Ok(())
}

fn native_quotient(rt: &mut Runtime) -> Result<()> {
    let (a, b) = integer_pair(rt, "quotient")?;
    match a.checked_div(b) {
        Some(quotient) => rt.new_integer(quotient)?,
        None => rt.new_float((a as f64 / b as f64).trunc())?,
    };
    Ok(())
}

/// Whether `holds` is true for every adjacent pair of arguments.
fn compare(rt: &mut Runtime, op: &'static str, holds: fn(f64, f64) -> bool) -> Result<()> {
    let values = numbers(rt, op, 1)?;
    let result = values.windows(2).all(|pair| match (pair[0], pair[1]) {
        (Number::Int(a), Number::Int(b)) => int_holds(holds, a, b),
        (a, b) => holds(a.as_float(), b.as_float()),
    });
    push_bool(rt, result)
}

/// Large integers lose precision as floats, so integers are compared exactly
/// and only the outcome is fed to `holds`.
fn int_holds(holds: fn(f64, f64) -> bool, a: i64, b: i64) -> bool {
    match a.cmp(&b) {
        std::cmp::Ordering::Less => holds(0.0, 1.0),
        std::cmp::Ordering::Equal => holds(0.0, 0.0),
        std::cmp::Ordering::Greater => holds(1.0, 0.0),
    }
}

fn native_num_eq(rt: &mut Runtime) -> Result<()> {
    compare(rt, "=", |a, b| a == b)
}

fn native_lt(rt: &mut Runtime) -> Result<()> {
    compare(rt, "<", |a, b| a < b)
}

fn native_gt(rt: &mut Runtime) -> Result<()> {
    compare(rt, ">", |a, b| a > b)
}

fn native_le(rt: &mut Runtime) -> Result<()> {
    compare(rt, "<=", |a, b| a <= b)
}

fn native_ge(rt: &mut Runtime) -> Result<()> {
    compare(rt, ">=", |a, b| a >= b)
}

fn native_car(rt: &mut Runtime) -> Result<()> {
    let (car, _) = rt.get_pair(rt.argument(0)?)?;
    rt.push(car)
}

fn native_cdr(rt: &mut Runtime) -> Result<()> {
    let (_, cdr) = rt.get_pair(rt.argument(0)?)?;
    rt.push(cdr)
}

fn native_cons(rt: &mut Runtime) -> Result<()> {
    let car = rt.argument(0)?;
    let cdr = rt.argument(1)?;
    rt.push(cdr)?;
    rt.push(car)?;
    rt.new_pair()?;
    Ok(())
}

fn native_list(rt: &mut Runtime) -> Result<()> {
    let items = rt.argument(0)?;
    rt.push(items)
}

fn native_equal(rt: &mut Runtime) -> Result<()> {
    let result = rt.equal(rt.argument(0)?, rt.argument(1)?)?;
    push_bool(rt, result)
}

fn native_is_atom(rt: &mut Runtime) -> Result<()> {
    let result = rt.kind_of(rt.argument(0)?)? != "pair";
    push_bool(rt, result)
}

fn native_is_pair(rt: &mut Runtime) -> Result<()> {
    let result = rt.kind_of(rt.argument(0)?)? == "pair";
    push_bool(rt, result)
}

fn native_is_number(rt: &mut Runtime) -> Result<()> {
    let kind = rt.kind_of(rt.argument(0)?)?;
    push_bool(rt, kind == "integer" || kind == "float" || kind == "rational")
}

fn native_is_symbol(rt: &mut Runtime) -> Result<()> {
    let result = rt.is_symbol(rt.argument(0)?)?;
    push_bool(rt, result)
}

fn native_is_null(rt: &mut Runtime) -> Result<()> {
    let result = rt.argument(0)?.is_nil();
    push_bool(rt, result)
}

fn native_not(rt: &mut Runtime) -> Result<()> {
    let result = !rt.is_truthy(rt.argument(0)?)?;
    push_bool(rt, result)
}

#[cfg(test)]
mod tests {
    use crate::config::Config;
    use crate::memory::Handle;
    use crate::vm::{Runtime, RuntimeError};

    fn runtime() -> Runtime {
        let mut rt = Runtime::new(Config::default());
        rt.start().unwrap();
        rt
    }

    /// Calls the prelude closure `name` with the data in `args`, first
    /// argument first.
    fn call(rt: &mut Runtime, name: &str, args: &[&str]) -> Result<Handle, RuntimeError> {
        for arg in args.iter().rev() {
            rt.new_constant(arg)?;
        }
        let closure = rt.get(name)?;
        rt.push(closure)?;
        rt.apply(args.len())
    }

    fn show(rt: &mut Runtime, name: &str, args: &[&str]) -> String {
        let result = call(rt, name, args).unwrap();
        rt.display(result)
    }

    #[test]
    fn arithmetic() {
        let mut rt = runtime();
        assert_eq!(show(&mut rt, "+", &[]), "0");
        assert_eq!(show(&mut rt, "+", &["1", "2", "3"]), "6");
        assert_eq!(show(&mut rt, "+", &["1", "2.5"]), "3.5");
        assert_eq!(show(&mut rt, "-", &["10", "1", "2"]), "7");
        assert_eq!(show(&mut rt, "-", &["4"]), "-4");
        assert_eq!(show(&mut rt, "*", &["2", "3", "4"]), "24");
        assert_eq!(show(&mut rt, "/", &["12", "4"]), "3");
        assert_eq!(show(&mut rt, "/", &["1", "2"]), "0.5");
        assert_eq!(show(&mut rt, "remainder", &["7", "3"]), "1");
        assert_eq!(show(&mut rt, "quotient", &["7", "3"]), "2");
    }

    #[test]
    fn quotient_overflow_becomes_float() {
        let mut rt = runtime();
        let result = call(&mut rt, "quotient", &["-9223372036854775808", "-1"]).unwrap();
        assert_eq!(rt.get_float(result), Ok(9_223_372_036_854_775_808.0));
        let result = call(&mut rt, "remainder", &["-9223372036854775808", "-1"]).unwrap();
        assert_eq!(rt.get_integer(result), Ok(0));
        let result = call(&mut rt, "quotient", &["-9223372036854775808", "2"]).unwrap();
        assert_eq!(rt.get_integer(result), Ok(i64::MIN / 2));
    }

    #[test]
    fn arithmetic_errors() {
        let mut rt = runtime();
        assert_eq!(
            call(&mut rt, "/", &["1", "0"]),
            Err(RuntimeError::DivisionByZero { op: "/" })
        );
        assert!(matches!(
            call(&mut rt, "+", &["1", "a"]),
            Err(RuntimeError::TypeMismatch { expected: "number", found: "symbol", .. })
        ));
        assert!(matches!(
            call(&mut rt, "-", &[]),
            Err(RuntimeError::ArityMismatch { .. })
        ));
        assert_eq!(rt.depth(), 0);
    }

    #[test]
    fn comparisons() {
        let mut rt = runtime();
        assert_eq!(show(&mut rt, "<", &["1", "2", "3"]), "#t");
        assert_eq!(show(&mut rt, "<", &["1", "3", "2"]), "#f");
        assert_eq!(show(&mut rt, "=", &["2", "2.0"]), "#t");
        assert_eq!(show(&mut rt, ">=", &["3", "3"]), "#t");
        assert_eq!(
            show(&mut rt, "<", &["9007199254740992", "9007199254740993"]),
            "#t"
        );
    }

    #[test]
    fn lists() {
        let mut rt = runtime();
        assert_eq!(show(&mut rt, "list", &["1", "2", "3"]), "(1 2 3)");
        assert_eq!(show(&mut rt, "list", &[]), "nil");
        assert_eq!(show(&mut rt, "cons", &["1", "(2)"]), "(1 2)");
        assert_eq!(show(&mut rt, "car", &["(a b)"]), "a");
        assert_eq!(show(&mut rt, "cdr", &["(a b)"]), "(b)");
        assert!(matches!(
            call(&mut rt, "car", &["5"]),
            Err(RuntimeError::TypeMismatch { expected: "pair", .. })
        ));
    }

    #[test]
    fn predicates() {
        let mut rt = runtime();
        assert_eq!(show(&mut rt, "eq?", &["(1 2)", "(1 2)"]), "#t");
        assert_eq!(show(&mut rt, "equal?", &["a", "b"]), "#f");
        assert_eq!(show(&mut rt, "atom?", &["a"]), "#t");
        assert_eq!(show(&mut rt, "atom?", &["(a)"]), "#f");
        assert_eq!(show(&mut rt, "pair?", &["(a)"]), "#t");
        assert_eq!(show(&mut rt, "number?", &["1.5"]), "#t");
        assert_eq!(show(&mut rt, "number?", &["3/4"]), "#t");
        assert_eq!(show(&mut rt, "symbol?", &["x"]), "#t");
        assert_eq!(show(&mut rt, "null?", &["nil"]), "#t");
        assert_eq!(show(&mut rt, "null?", &["()"]), "#t");
        assert_eq!(show(&mut rt, "not", &["#f"]), "#t");
        assert_eq!(show(&mut rt, "not", &["0"]), "#f");
    }

    #[test]
    fn prelude_can_be_disabled() {
        let mut config = Config::default();
        config.prelude = false;
        let mut rt = Runtime::new(config);
        rt.start().unwrap();
        assert!(rt.get("+").is_err());
    }
}
