use colored::*;

/// Print every collection, with the number of nodes kept and freed.
pub const LOG_GC: bool = false;

/// Collect before every single allocation. Slow, but shakes out rooting bugs.
pub const STRESS_GC: bool = false;

/// Print every runtime API call as it happens.
pub const TRACE_API: bool = false;

/// Print node allocations.
pub const LOG_OBJECT: bool = false;

/// Tags used to prefix log lines, each printed in its own color.
#[derive(Debug, Copy, Clone, PartialEq)]
pub enum Tag {
    Gc,
    Api,
    Object,
    Debug,
    Ext,
    Error,
}

impl Tag {
    fn label(self) -> ColoredString {
        match self {
            Tag::Gc => "[GC]".cyan(),
            Tag::Api => "[API]".green(),
            Tag::Object => "[OBJECT]".purple(),
            Tag::Debug => "[DEBUG]".blue(),
            Tag::Ext => "[EXT]".purple(),
            Tag::Error => "[ERROR]".red(),
        }
    }
}

/// Writes a single tagged log line to stdout.
pub fn log(tag: Tag, message: impl AsRef<str>) {
    println!("{}\t{}", tag.label(), message.as_ref());
}

/// Writes a tagged error line to stderr.
pub fn log_error(message: impl AsRef<str>) {
    eprintln!("{}\t{}", Tag::Error.label(), message.as_ref().red());
}
