use super::node::Node;
use super::{Handle, Traced};
use crate::debug::{self, Tag, LOG_OBJECT};

const HEAP_GROW_FACTOR: usize = 2;

/// Result of a single collection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Collection {
    /// Nodes in the storage area before the collection.
    pub before: usize,
    /// Nodes that survived.
    pub after: usize,
}

impl Collection {
    pub fn freed(&self) -> usize {
        self.before - self.after
    }
}

/// Counters describing the store.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HeapStats {
    pub live: usize,
    pub next_gc: usize,
    pub collections: usize,
    pub allocations: usize,
}

/// The value store and its collector.
///
/// Nodes live in a compact storage area. A separate table maps every handle
/// to the node's current slot in that area, so the collector is free to slide
/// survivors together: it only rewrites the table, every handle held outside
/// (on the stack, in roots, in frames or in other nodes) stays valid.
///
/// Collection is mark and compact. Everything reachable from the roots handed
/// to [`GC::collect`] is marked through a work-list, so cyclic structures are
/// fine. Unmarked nodes are dropped and their handles go to a free list for
/// reuse.
pub struct GC {
    /// Handle -> slot in `cells`. `None` for free handles.
    table: Vec<Option<usize>>,

    /// Handles whose node has been reclaimed.
    free_handles: Vec<usize>,

    /// The storage area.
    cells: Vec<Traced<Node>>,

    /// When the storage area holds this many nodes the next allocation collects.
    next_gc: usize,

    /// `next_gc` never drops below this.
    min_threshold: usize,

    /// Collect before every allocation.
    stress: bool,

    /// Log every collection.
    log: bool,

    total_collections: usize,
    total_allocations: usize,
}

impl GC {
    /// Creates a store holding only the nil node at [`Handle::NIL`].
    pub fn new(threshold: usize, min_threshold: usize) -> Self {
        let mut gc = Self {
            table: Vec::new(),
            free_handles: Vec::new(),
            cells: Vec::new(),
            next_gc: threshold.max(1),
            min_threshold: min_threshold.max(1),
            stress: false,
            log: false,
            total_collections: 0,
            total_allocations: 0,
        };
        let nil = gc.alloc(Node::Nil);
        debug_assert_eq!(nil, Handle::NIL);
        gc
    }

    pub fn set_stress(&mut self, stress: bool) {
        self.stress = stress;
    }

    pub fn set_logging(&mut self, log: bool) {
        self.log = log;
    }

    /// Whether the next allocation should be preceded by a collection.
    pub fn should_collect(&self) -> bool {
        self.stress || self.cells.len() >= self.next_gc
    }

    /// Stores `node` and returns the handle naming it.
    ///
    /// Never collects, the caller decides when it is safe to do so.
    pub fn alloc(&mut self, node: Node) -> Handle {
        if LOG_OBJECT {
            debug::log(Tag::Object, format!("alloc {:?}", node));
        }
        self.total_allocations += 1;

        let slot = self.cells.len();
        let handle = match self.free_handles.pop() {
            Some(raw) => {
                self.table[raw] = Some(slot);
                Handle(raw)
            }
            None => {
                self.table.push(Some(slot));
                Handle(self.table.len() - 1)
            }
        };
        self.cells.push(Traced::new(handle, node));
        handle
    }

    fn slot(&self, handle: Handle) -> Option<usize> {
        self.table.get(handle.0).copied().flatten()
    }

    /// Whether `handle` currently names a node.
    pub fn contains(&self, handle: Handle) -> bool {
        self.slot(handle).is_some()
    }

    pub fn get(&self, handle: Handle) -> Option<&Node> {
        let slot = self.slot(handle)?;
        Some(&self.cells[slot].data)
    }

    pub fn get_mut(&mut self, handle: Handle) -> Option<&mut Node> {
        let slot = self.slot(handle)?;
        Some(&mut self.cells[slot].data)
    }

    /// Current storage slot of a handle. Only meaningful until the next
    /// collection.
    #[cfg(test)]
    pub(crate) fn location(&self, handle: Handle) -> Option<usize> {
        self.slot(handle)
    }

    pub fn live_count(&self) -> usize {
        self.cells.len()
    }

    pub fn stats(&self) -> HeapStats {
        HeapStats {
            live: self.cells.len(),
            next_gc: self.next_gc,
            collections: self.total_collections,
            allocations: self.total_allocations,
        }
    }

    /// Marks everything reachable from `roots` and compacts the survivors.
    ///
    /// The nil node is always kept. Roots that do not name a live node are
    /// ignored.
    pub fn collect(&mut self, roots: impl IntoIterator<Item = Handle>) -> Collection {
        let before = self.cells.len();
        if self.log {
            debug::log(Tag::Gc, "BEGIN");
        }

        self.mark(roots);
        self.compact();

        self.total_collections += 1;
        self.next_gc = (self.cells.len() * HEAP_GROW_FACTOR).max(self.min_threshold);

        let collection = Collection {
            before,
            after: self.cells.len(),
        };
        if self.log {
            debug::log(
                Tag::Gc,
                format!(
                    "Collected {} nodes (from {} to {}) next at {}",
                    collection.freed(),
                    before,
                    collection.after,
                    self.next_gc
                ),
            );
            debug::log(Tag::Gc, "END");
        }
        collection
    }

    fn mark(&mut self, roots: impl IntoIterator<Item = Handle>) {
        let mut gray_list: Vec<Handle> = roots.into_iter().collect();
        gray_list.push(Handle::NIL);

        while let Some(handle) = gray_list.pop() {
            let slot = match self.slot(handle) {
                Some(slot) => slot,
                None => continue,
            };
            let cell = &mut self.cells[slot];
            // Mark first so shared and cyclic nodes are only visited once.
            if cell.marked() {
                continue;
            }
            cell.set_mark(true);
            gray_list.extend(cell.data.references());
        }
    }

    /// Slides marked nodes to the front of a fresh area, in allocation order,
    /// and points their handles at the new slots.
    fn compact(&mut self) {
        let old = std::mem::take(&mut self.cells);
        let mut kept = Vec::with_capacity(old.len());
        for mut cell in old {
            let raw = cell.handle.0;
            if cell.marked() {
                cell.set_mark(false);
                self.table[raw] = Some(kept.len());
                kept.push(cell);
            } else {
                if self.log {
                    debug::log(Tag::Gc, format!("[Sweep] {}", cell));
                }
                self.table[raw] = None;
                self.free_handles.push(raw);
            }
        }
        self.cells = kept;
    }
}
