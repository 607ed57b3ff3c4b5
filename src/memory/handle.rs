use std::fmt;

/// Stable reference to a node in the value store.
///
/// A handle is a logical identity, not a storage location. The collector may
/// move the node it names around, the handle keeps resolving to it as long as
/// the node stays reachable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Handle(pub(crate) usize);

impl Handle {
    /// The canonical nil node. Allocated on start and never collected.
    pub const NIL: Handle = Handle(0);

    /// Wraps a raw handle value handed over by native code.
    pub fn from_raw(raw: usize) -> Self {
        Self(raw)
    }

    /// Returns the raw integer, for handing to native code.
    pub fn raw(self) -> usize {
        self.0
    }

    pub fn is_nil(self) -> bool {
        self == Self::NIL
    }
}

impl From<usize> for Handle {
    fn from(raw: usize) -> Self {
        Self(raw)
    }
}

impl fmt::Display for Handle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}
