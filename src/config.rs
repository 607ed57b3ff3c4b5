use std::env;

use crate::debug::{LOG_GC, STRESS_GC, TRACE_API};
use crate::vm::debugger::DebugMode;

/// Number of nodes the storage area may hold before the first collection.
pub const DEFAULT_THRESHOLD: usize = 1024;

/// The threshold never drops below this after a collection.
pub const MIN_THRESHOLD: usize = 256;

/// Nested closure calls allowed before `apply` gives up.
pub const DEFAULT_MAX_CALL_DEPTH: usize = 1024;

/// Settings for a single [`Runtime`](crate::vm::Runtime).
#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    /// Node count that triggers the first automatic collection.
    pub initial_threshold: usize,

    /// Lower bound for the adapted threshold.
    pub min_threshold: usize,

    /// Collect before every allocation.
    pub stress_gc: bool,

    /// Log every collection.
    pub log_gc: bool,

    /// Log every API call.
    pub trace_api: bool,

    /// When the debugger is entered.
    pub debug_mode: DebugMode,

    /// Maximum depth of nested `apply` calls.
    pub max_call_depth: usize,

    /// Install the built-in native closures into the global frame on start.
    pub prelude: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            initial_threshold: DEFAULT_THRESHOLD,
            min_threshold: MIN_THRESHOLD,
            stress_gc: STRESS_GC,
            log_gc: LOG_GC,
            trace_api: TRACE_API,
            debug_mode: DebugMode::Off,
            max_call_depth: DEFAULT_MAX_CALL_DEPTH,
            prelude: true,
        }
    }
}

impl Config {
    /// Defaults, overridden by the `RELIC_*` environment variables.
    ///
    /// Boolean variables accept `1`/`true`/`on`; `RELIC_DEBUG` accepts the
    /// debug mode names (`off`, `normal`, `next`, `step`). Unparsable values
    /// are ignored.
    pub fn from_env() -> Self {
        let mut config = Self::default();
        if let Some(value) = env_flag("RELIC_STRESS_GC") {
            config.stress_gc = value;
        }
        if let Some(value) = env_flag("RELIC_LOG_GC") {
            config.log_gc = value;
        }
        if let Some(value) = env_flag("RELIC_TRACE_API") {
            config.trace_api = value;
        }
        if let Some(mode) = env::var("RELIC_DEBUG").ok().and_then(|s| s.parse().ok()) {
            config.debug_mode = mode;
        }
        if let Some(threshold) = env::var("RELIC_HEAP_THRESHOLD")
            .ok()
            .and_then(|s| s.parse::<usize>().ok())
        {
            config.initial_threshold = threshold.max(1);
        }
        config
    }

    /// Small heap that collects often. Handy in tests.
    pub fn small_heap(threshold: usize) -> Self {
        Self {
            initial_threshold: threshold,
            min_threshold: threshold,
            ..Self::default()
        }
    }
}

fn env_flag(name: &str) -> Option<bool> {
    let value = env::var(name).ok()?;
    match value.to_ascii_lowercase().as_str() {
        "1" | "true" | "on" | "yes" => Some(true),
        "0" | "false" | "off" | "no" => Some(false),
        _ => None,
    }
}
