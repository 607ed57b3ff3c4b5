use std::collections::HashMap;
use std::fmt;

use crate::memory::Handle;

/// One scope level of the environment chain.
#[derive(Debug, Clone, Default)]
pub struct Frame {
    /// Name used in dumps and debugger output.
    pub name: String,

    /// Bindings made in this frame.
    pub bindings: HashMap<String, Handle>,

    /// Enclosing frame, `None` for the global frame.
    pub outer: Option<Handle>,
}

impl Frame {
    pub fn new(name: String, outer: Option<Handle>) -> Self {
        Self {
            name,
            bindings: HashMap::new(),
            outer,
        }
    }

    pub fn lookup(&self, name: &str) -> Option<Handle> {
        self.bindings.get(name).copied()
    }

    /// Inserts or overwrites a binding in this frame only.
    pub fn define(&mut self, name: &str, value: Handle) {
        self.bindings.insert(name.to_owned(), value);
    }

    /// Overwrites an existing binding. Returns `false` if this frame does not
    /// bind `name`.
    pub fn assign(&mut self, name: &str, value: Handle) -> bool {
        match self.bindings.get_mut(name) {
            Some(slot) => {
                *slot = value;
                true
            }
            None => false,
        }
    }
}

impl fmt::Display for Frame {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "<env {}>", self.name)
    }
}
