use std::collections::HashSet;
use std::fmt::Write;

use crate::memory::{Handle, Node, GC};

/// Lists nested deeper than this are cut off.
pub const MAX_DEPTH: usize = 64;

/// Pairs printed by one call before the rest is cut off.
pub const MAX_PAIRS: usize = 4096;

/// Printed form of `handle`.
///
/// Proper lists print as `(a b c)`, improper ones as `(a b . c)`. A pair that
/// is reached again while it is still being printed, and any list nested past
/// [`MAX_DEPTH`], prints as `...`, so cyclic structures are safe to show.
/// Shared substructure prints once per reference; past [`MAX_PAIRS`] pairs
/// the remainder prints as `...` too.
pub fn display(store: &GC, handle: Handle) -> String {
    let mut printer = Printer {
        store,
        active: HashSet::new(),
        budget: MAX_PAIRS,
        out: String::new(),
    };
    printer.value(handle, 0);
    printer.out
}

struct Printer<'a> {
    store: &'a GC,
    active: HashSet<Handle>,
    budget: usize,
    out: String,
}

impl<'a> Printer<'a> {
    fn value(&mut self, handle: Handle, depth: usize) {
        match self.store.get(handle) {
            Some(Node::Pair(..)) => self.list(handle, depth),
            Some(node) => {
                let _ = write!(self.out, "{}", node);
            }
            None => {
                let _ = write!(self.out, "<invalid {}>", handle);
            }
        }
    }

    fn list(&mut self, handle: Handle, depth: usize) {
        if depth >= MAX_DEPTH || self.budget == 0 || self.active.contains(&handle) {
            self.out.push_str("...");
            return;
        }

        self.out.push('(');
        let mut spine = Vec::new();
        let mut current = handle;
        loop {
            let (car, cdr) = match self.store.get(current).and_then(Node::as_pair) {
                Some(fields) => fields,
                None => break,
            };
            if self.budget == 0 {
                self.out.push_str(" ...");
                break;
            }
            self.budget -= 1;
            self.active.insert(current);
            spine.push(current);

            if spine.len() > 1 {
                self.out.push(' ');
            }
            self.value(car, depth + 1);

            match self.store.get(cdr) {
                Some(Node::Nil) => break,
                Some(Node::Pair(..)) if self.active.contains(&cdr) => {
                    self.out.push_str(" . ...");
                    break;
                }
                Some(Node::Pair(..)) => current = cdr,
                _ => {
                    self.out.push_str(" . ");
                    self.value(cdr, depth + 1);
                    break;
                }
            }
        }
        self.out.push(')');

        for pair in spine {
            self.active.remove(&pair);
        }
    }
}
