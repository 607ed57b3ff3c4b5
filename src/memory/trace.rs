use std::fmt;

use super::Handle;

/// A node in the storage area, together with its mark bit and the handle that
/// currently resolves to it.
#[derive(Debug)]
pub struct Traced<T> {
    marked: bool,
    pub(super) handle: Handle,
    pub(super) data: T,
}

impl<T> Traced<T> {
    /// Creates a new `Traced` with `marked` set to `false`.
    pub(super) fn new(handle: Handle, data: T) -> Self {
        Self {
            marked: false,
            handle,
            data,
        }
    }

    /// Sets the reachable mark to `true` or `false`.
    pub(super) fn set_mark(&mut self, value: bool) {
        self.marked = value;
    }

    /// Returns the marked status, i.e. if it has been marked as reachable
    /// or not.
    pub(super) fn marked(&self) -> bool {
        self.marked
    }
}

impl<T: fmt::Display> fmt::Display for Traced<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Traced [{} marked={}] {}", self.handle, self.marked, &self.data)
    }
}
