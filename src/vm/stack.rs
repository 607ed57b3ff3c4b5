use super::{Result, RuntimeError};
use crate::memory::Handle;

/// LIFO of handles shared by compiled code, native functions and the runtime.
///
/// Every entry is a collector root. The stack itself does not look handles
/// up, [`Runtime::push`](super::Runtime::push) validates them before they
/// get here.
#[derive(Debug, Default)]
pub struct OperandStack {
    entries: Vec<Handle>,
}

impl OperandStack {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, handle: Handle) {
        self.entries.push(handle);
    }

    pub fn pop(&mut self, op: &'static str) -> Result<Handle> {
        self.entries.pop().ok_or(RuntimeError::EmptyStack { op })
    }

    pub fn top(&self, op: &'static str) -> Result<Handle> {
        self.entries
            .last()
            .copied()
            .ok_or(RuntimeError::EmptyStack { op })
    }

    /// Exchanges the two topmost entries.
    pub fn swap(&mut self, op: &'static str) -> Result<()> {
        let len = self.entries.len();
        match len {
            0 => Err(RuntimeError::EmptyStack { op }),
            1 => Err(RuntimeError::InsufficientStack {
                op,
                needed: 2,
                found: 1,
            }),
            _ => {
                self.entries.swap(len - 1, len - 2);
                Ok(())
            }
        }
    }

    /// Entry `depth` places below the top, `0` being the top itself.
    pub fn peek(&self, depth: usize) -> Option<Handle> {
        let len = self.entries.len();
        if depth < len {
            Some(self.entries[len - 1 - depth])
        } else {
            None
        }
    }

    /// Fails unless at least `needed` entries are present.
    pub fn require(&self, op: &'static str, needed: usize) -> Result<()> {
        let found = self.entries.len();
        if found == 0 && needed > 0 {
            Err(RuntimeError::EmptyStack { op })
        } else if found < needed {
            Err(RuntimeError::InsufficientStack { op, needed, found })
        } else {
            Ok(())
        }
    }

    pub fn depth(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn truncate(&mut self, len: usize) {
        self.entries.truncate(len);
    }

    /// Bottom to top.
    pub fn iter(&self) -> impl Iterator<Item = Handle> + '_ {
        self.entries.iter().copied()
    }
}
