use std::fmt;

use crate::memory::Handle;
use crate::vm::{Result, Runtime};

/// Type all native functions are expected to have.
///
/// A native function takes no explicit arguments. It reads its parameters from
/// the current environment (see [`Runtime::argument`]) and pushes its result
/// onto the operand stack.
pub type NativeFunction = fn(&mut Runtime) -> Result<()>;

/// Index into the runtime's table of compiled code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CodeId(pub(crate) usize);

impl CodeId {
    pub fn index(self) -> usize {
        self.0
    }
}

impl fmt::Display for CodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "code:{}", self.0)
    }
}

/// What runs when a closure is applied.
#[derive(Clone, Copy)]
pub enum Entry {
    /// A host function living outside the runtime.
    Native(NativeFunction),

    /// Code supplied by the compiled program, registered with
    /// [`Runtime::register_code`].
    Compiled(CodeId),
}

impl fmt::Debug for Entry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Entry::Native(_) => write!(f, "Native(<fn>)"),
            Entry::Compiled(id) => write!(f, "Compiled({})", id),
        }
    }
}

/// A callable value.
#[derive(Debug, Clone)]
pub struct Closure {
    /// Unique name of the closure. Parameters are bound under names derived
    /// from it, see [`param_name`].
    pub identity: String,

    /// The function body.
    pub entry: Entry,

    /// The environment the closure was created in.
    pub env: Handle,

    /// Minimum number of arguments.
    pub arity: usize,

    /// Whether arguments past `arity` are collected into a list.
    pub variadic: bool,
}

impl Closure {
    pub fn new(identity: String, entry: Entry, env: Handle, arity: usize, variadic: bool) -> Self {
        Self {
            identity,
            entry,
            env,
            arity,
            variadic,
        }
    }

    /// Whether `nargs` arguments are acceptable.
    pub fn accepts(&self, nargs: usize) -> bool {
        if self.variadic {
            nargs >= self.arity
        } else {
            nargs == self.arity
        }
    }
}

impl fmt::Display for Closure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.entry {
            Entry::Native(_) => write!(f, "<closure {}>", self.identity),
            Entry::Compiled(_) => write!(f, "<compiled {}>", self.identity),
        }
    }
}

/// Name the `index`-th parameter of closure `identity` is bound under.
///
/// Identities are unique, so two closures never share a parameter name even
/// when one calls the other recursively.
pub fn param_name(identity: &str, index: usize) -> String {
    format!("#{}_func_{}", index, identity)
}
