#![warn(rust_2018_idioms)]

//! Handle based runtime for a small Lisp.
//!
//! Compiled code sees values only as [`Handle`]s into a relocating store and
//! works through the [`Runtime`] API: an operand stack, a named root
//! registry, a chain of environment frames and a closure calling convention.

pub mod config;
pub mod debug;
pub mod memory;
pub mod printer;
pub mod reader;
pub mod vm;

pub use config::Config;
pub use memory::Handle;
pub use reader::{ReadError, Reader};
pub use vm::debugger::{ConsoleController, Controller, DebugMode, Event, Resume};
pub use vm::{Result, Runtime, RuntimeError};
