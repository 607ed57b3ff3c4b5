use radix_trie::{Trie, TrieCommon};

use super::{Result, RuntimeError};
use crate::memory::Handle;

/// Named, long-lived references. Everything registered here survives
/// collections until it is removed.
pub struct RootRegistry {
    roots: Trie<String, Handle>,
}

impl Default for RootRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl RootRegistry {
    pub fn new() -> Self {
        Self { roots: Trie::new() }
    }

    pub fn add(&mut self, name: &str, handle: Handle) -> Result<()> {
        if self.roots.get(name).is_some() {
            return Err(RuntimeError::DuplicateRoot(name.to_owned()));
        }
        self.roots.insert(name.to_owned(), handle);
        Ok(())
    }

    pub fn set(&mut self, name: &str, handle: Handle) -> Result<()> {
        match self.roots.get_mut(name) {
            Some(slot) => {
                *slot = handle;
                Ok(())
            }
            None => Err(RuntimeError::UnknownRoot(name.to_owned())),
        }
    }

    pub fn get(&self, name: &str) -> Result<Handle> {
        self.roots
            .get(name)
            .copied()
            .ok_or_else(|| RuntimeError::UnknownRoot(name.to_owned()))
    }

    /// Removes a root, returning the handle it last held.
    pub fn remove(&mut self, name: &str) -> Result<Handle> {
        self.roots
            .remove(name)
            .ok_or_else(|| RuntimeError::UnknownRoot(name.to_owned()))
    }

    pub fn len(&self) -> usize {
        self.roots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.roots.is_empty()
    }

    /// Name/handle pairs.
    pub fn iter(&self) -> impl Iterator<Item = (&String, &Handle)> {
        self.roots.iter()
    }

    pub fn handles(&self) -> impl Iterator<Item = Handle> + '_ {
        self.roots.values().copied()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lifecycle() {
        let mut roots = RootRegistry::new();
        roots.add("x", Handle::from_raw(3)).unwrap();
        assert_eq!(
            roots.add("x", Handle::from_raw(4)),
            Err(RuntimeError::DuplicateRoot("x".into()))
        );
        roots.set("x", Handle::from_raw(5)).unwrap();
        assert_eq!(roots.get("x"), Ok(Handle::from_raw(5)));
        assert_eq!(roots.remove("x"), Ok(Handle::from_raw(5)));
        assert_eq!(roots.get("x"), Err(RuntimeError::UnknownRoot("x".into())));
        assert_eq!(
            roots.set("x", Handle::NIL),
            Err(RuntimeError::UnknownRoot("x".into()))
        );
        assert!(roots.is_empty());
    }

    #[test]
    fn prefixes_are_distinct_names() {
        let mut roots = RootRegistry::new();
        roots.add("win", Handle::from_raw(1)).unwrap();
        roots.add("window", Handle::from_raw(2)).unwrap();
        assert_eq!(roots.get("win"), Ok(Handle::from_raw(1)));
        assert_eq!(roots.len(), 2);
        let mut names: Vec<&String> = roots.iter().map(|(name, _)| name).collect();
        names.sort();
        assert_eq!(names, vec!["win", "window"]);
    }
}
