use std::fmt;

use super::Handle;
use crate::debug::{self, Tag, LOG_OBJECT};

mod closure;
mod constant;
mod environment;

pub use closure::{param_name, Closure, CodeId, Entry, NativeFunction};
pub use constant::Constant;
pub use environment::Frame;

/// A tagged value living in the store.
#[derive(Debug, Clone)]
pub enum Node {
    Nil,
    Bool(bool),
    Integer(i64),
    Float(f64),
    Symbol(String),
    Pair(Handle, Handle),
    Constant(Constant),
    Closure(Closure),
    Environment(Frame),
}

impl Drop for Node {
    fn drop(&mut self) {
        if LOG_OBJECT {
            debug::log(Tag::Object, format!("drop {:?}", self));
        }
    }
}

impl Node {
    /// Name of the tag, used in error messages.
    pub fn kind(&self) -> &'static str {
        match self {
            Node::Nil => "nil",
            Node::Bool(_) => "bool",
            Node::Integer(_) => "integer",
            Node::Float(_) => "float",
            Node::Symbol(_) => "symbol",
            Node::Pair(..) => "pair",
            Node::Constant(c) => c.kind(),
            Node::Closure(_) => "closure",
            Node::Environment(_) => "environment",
        }
    }

    /// Handles this node refers to. The collector follows these.
    pub fn references(&self) -> Vec<Handle> {
        match self {
            Node::Pair(car, cdr) => vec![*car, *cdr],
            Node::Closure(closure) => vec![closure.env],
            Node::Environment(frame) => {
                let mut refs: Vec<Handle> = frame.bindings.values().copied().collect();
                refs.extend(frame.outer);
                refs
            }
            _ => Vec::new(),
        }
    }

    pub fn as_pair(&self) -> Option<(Handle, Handle)> {
        match self {
            Node::Pair(car, cdr) => Some((*car, *cdr)),
            _ => None,
        }
    }

    pub fn as_closure(&self) -> Option<&Closure> {
        match self {
            Node::Closure(closure) => Some(closure),
            _ => None,
        }
    }

    pub fn as_frame(&self) -> Option<&Frame> {
        match self {
            Node::Environment(frame) => Some(frame),
            _ => None,
        }
    }

    pub fn as_frame_mut(&mut self) -> Option<&mut Frame> {
        match self {
            Node::Environment(frame) => Some(frame),
            _ => None,
        }
    }
}

/// Printed form of atoms. Pairs need the store to follow their fields, see
/// [`crate::printer`].
impl fmt::Display for Node {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Node::Nil => write!(f, "nil"),
            Node::Bool(true) => write!(f, "#t"),
            Node::Bool(false) => write!(f, "#f"),
            Node::Integer(v) => write!(f, "{}", v),
            Node::Float(v) => write!(f, "{:?}", v),
            Node::Symbol(name) => write!(f, "{}", name),
            Node::Pair(car, cdr) => write!(f, "<pair {} {}>", car, cdr),
            Node::Constant(c) => write!(f, "{}", c),
            Node::Closure(c) => write!(f, "{}", c),
            Node::Environment(frame) => write!(f, "{}", frame),
        }
    }
}
