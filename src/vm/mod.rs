use thiserror::Error;

use crate::memory::{node::CodeId, Handle};
use crate::reader::ReadError;

mod call;
mod call_frame;
pub mod debugger;
mod env;
mod extension;
mod prelude;
mod read;
mod roots;
mod runtime;
mod stack;

pub use call::CompiledCode;
pub use call_frame::CallFrame;
pub use extension::ExtensionInit;
pub use roots::RootRegistry;
pub use runtime::Runtime;
pub use stack::OperandStack;

pub type Result<T> = std::result::Result<T, RuntimeError>;

#[derive(Debug, Error, PartialEq)]
pub enum RuntimeError {
    #[error("{}: invalid handle {}", .op, .handle)]
    InvalidHandle { op: &'static str, handle: Handle },

    #[error("{}: expected {} but {} is {}", .op, .expected, .handle, .found)]
    TypeMismatch {
        op: &'static str,
        handle: Handle,
        expected: &'static str,
        found: &'static str,
    },

    #[error("Unbound variable '{}'", .0)]
    UnboundVariable(String),

    #[error("Unknown root '{}'", .0)]
    UnknownRoot(String),

    #[error("Root '{}' already exists", .0)]
    DuplicateRoot(String),

    #[error("{}: trying to access empty stack", .op)]
    EmptyStack { op: &'static str },

    #[error("{}: needs {} stack entries, found {}", .op, .needed, .found)]
    InsufficientStack {
        op: &'static str,
        needed: usize,
        found: usize,
    },

    #[error("{} is not callable, it is {}", .handle, .found)]
    NotCallable { handle: Handle, found: &'static str },

    #[error(
        "{}: expected {}{} arguments, got {}",
        .closure,
        if *.variadic { "at least " } else { "" },
        .expected,
        .found
    )]
    ArityMismatch {
        closure: String,
        expected: usize,
        variadic: bool,
        found: usize,
    },

    #[error("{}: runtime not started", .op)]
    NotStarted { op: &'static str },

    #[error("Call depth exceeded the limit of {}", .0)]
    CallDepthExceeded(usize),

    #[error("Unknown extension '{}'", .0)]
    UnknownExtension(String),

    #[error("Read error: {}", .0)]
    Read(#[from] ReadError),

    #[error("End of input")]
    EndOfInput,

    #[error("Unknown code {}", .0)]
    UnknownCode(CodeId),

    #[error("{}: division by zero", .op)]
    DivisionByZero { op: &'static str },
}

impl RuntimeError {
    /// Errors that point at a bug in the caller rather than in the program
    /// being run.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            RuntimeError::InvalidHandle { .. } | RuntimeError::NotStarted { .. }
        )
    }
}
