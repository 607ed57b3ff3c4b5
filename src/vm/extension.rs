use super::{Result, Runtime, RuntimeError};
use crate::debug::{self, Tag};
use crate::memory::node::Entry;
use crate::memory::{Handle, Node};

/// Registration hook of an extension. It runs with the importing frame as
/// the current one and binds whatever the extension provides there.
pub type ExtensionInit = fn(&mut Runtime) -> Result<()>;

impl Runtime {
    /// Makes `init` importable under `name`. Registering a name again
    /// replaces the hook but does not reload an extension already imported.
    pub fn register_extension(&mut self, name: &str, init: ExtensionInit) -> Result<()> {
        self.check("register_extension")?;
        if self.config.trace_api {
            debug::log(Tag::Ext, format!("register {}", name));
        }
        self.extensions.insert(name.to_owned(), init);
        Ok(())
    }

    /// Runs the registration hook of `name` in the current frame, once.
    ///
    /// Importing a loaded extension again does nothing. A hook that fails
    /// leaves the extension unloaded, so it may be imported again.
    pub fn import(&mut self, name: &str) -> Result<()> {
        self.enter("import")?;
        if self.loaded.contains(name) {
            debug::log(Tag::Ext, format!("{} already loaded", name));
            return Ok(());
        }
        let init = *self
            .extensions
            .get(name)
            .ok_or_else(|| RuntimeError::UnknownExtension(name.to_owned()))?;

        let depth = self.stack.depth();
        let outcome = init(self);
        self.stack.truncate(depth);
        outcome?;

        self.loaded.insert(name.to_owned());
        if self.config.trace_api {
            debug::log(Tag::Ext, format!("loaded {}", name));
        }
        Ok(())
    }

    pub fn is_loaded(&self, name: &str) -> bool {
        self.loaded.contains(name)
    }

    /// Binds a native closure under `name` in the current frame.
    pub fn define_native(
        &mut self,
        name: &str,
        function: fn(&mut Runtime) -> Result<()>,
        arity: usize,
        variadic: bool,
    ) -> Result<()> {
        let closure = self.new_closure(name, Entry::Native(function), arity, variadic)?;
        self.define(name, closure)?;
        self.stack.pop("define_native")?;
        Ok(())
    }
}

/// Extensions every runtime can import without registering them first.
pub(super) fn register_builtin(rt: &mut Runtime) {
    rt.extensions.insert("math".to_owned(), init_math);
    rt.extensions.insert("debug".to_owned(), init_debug);
}

fn init_math(rt: &mut Runtime) -> Result<()> {
    let pi = rt.new_float(std::f64::consts::PI)?;
    rt.define("pi", pi)?;
    let e = rt.new_float(std::f64::consts::E)?;
    rt.define("e", e)?;
    let max = rt.new_integer(i64::MAX)?;
    rt.define("most-positive-integer", max)?;

    rt.define_native("abs", native_abs, 1, false)?;
    rt.define_native("sqrt", native_sqrt, 1, false)?;
    rt.define_native("floor", native_floor, 1, false)?;
    rt.define_native("exact->inexact", native_to_float, 1, false)?;
    Ok(())
}

fn init_debug(rt: &mut Runtime) -> Result<()> {
    rt.define_native("breakpoint", native_breakpoint, 0, false)?;
    rt.define_native("gc", native_gc, 0, false)?;
    Ok(())
}

/// Either kind of number, as a float.
fn float_argument(rt: &Runtime, op: &'static str, handle: Handle) -> Result<f64> {
    match rt.node(op, handle)? {
        Node::Integer(value) => Ok(*value as f64),
        Node::Float(value) => Ok(*value),
        node => Err(RuntimeError::TypeMismatch {
            op,
            handle,
            expected: "number",
            found: node.kind(),
        }),
    }
}

fn native_abs(rt: &mut Runtime) -> Result<()> {
    let x = rt.argument(0)?;
    let integer = match rt.node("abs", x)? {
        Node::Integer(value) => Some(*value),
        _ => None,
    };
    match integer {
        Some(value) => match value.checked_abs() {
            Some(abs) => rt.new_integer(abs)?,
            None => rt.new_float((value as f64).abs())?,
        },
        None => {
            let value = float_argument(rt, "abs", x)?.abs();
            rt.new_float(value)?
        }
    };
    Ok(())
}

fn native_sqrt(rt: &mut Runtime) -> Result<()> {
    let x = float_argument(rt, "sqrt", rt.argument(0)?)?;
    rt.new_float(x.sqrt())?;
    Ok(())
}

fn native_floor(rt: &mut Runtime) -> Result<()> {
    let x = rt.argument(0)?;
    if matches!(rt.node("floor", x)?, Node::Integer(_)) {
        return rt.push(x);
    }
    let value = float_argument(rt, "floor", x)?.floor();
    // Out of range or not a number stays a float.
    if value.is_finite() && value >= i64::MIN as f64 && value < i64::MAX as f64 {
        rt.new_integer(value as i64)?;
    } else {
        rt.new_float(value)?;
    }
    Ok(())
}

fn native_to_float(rt: &mut Runtime) -> Result<()> {
    let x = float_argument(rt, "exact->inexact", rt.argument(0)?)?;
    rt.new_float(x)?;
    Ok(())
}

fn native_breakpoint(rt: &mut Runtime) -> Result<()> {
    rt.breakpoint()
}

fn native_gc(rt: &mut Runtime) -> Result<()> {
    let collection = rt.gc()?;
    rt.new_integer(collection.freed() as i64)?;
    Ok(())
}
