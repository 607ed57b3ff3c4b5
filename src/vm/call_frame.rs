use crate::memory::Handle;

/// Bookkeeping for one active closure call.
///
/// Both handles are collector roots while the frame is on the call stack.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CallFrame {
    pub closure: Handle,

    /// Environment to return to once the call finishes.
    pub(super) caller_env: Handle,

    /// Stack depth below the arguments. Everything above is dropped when the
    /// call returns.
    pub(super) stack_base: usize,
}

impl CallFrame {
    pub(super) fn new(closure: Handle, caller_env: Handle, stack_base: usize) -> Self {
        Self {
            closure,
            caller_env,
            stack_base,
        }
    }

    pub fn caller_env(&self) -> Handle {
        self.caller_env
    }

    pub fn stack_base(&self) -> usize {
        self.stack_base
    }
}
