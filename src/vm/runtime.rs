use std::collections::{HashMap, HashSet};
use std::fmt;

use super::call::CompiledCode;
use super::debugger::{Controller, DebugMode, Event};
use super::extension::ExtensionInit;
use super::{CallFrame, OperandStack, Result, RootRegistry, RuntimeError};
use crate::config::Config;
use crate::debug::{self, Tag};
use crate::memory::node::Frame;
use crate::memory::{Collection, Handle, HeapStats, Node, GC};
use crate::printer;

/// Name of the outermost frame.
pub const GLOBAL_ENV_NAME: &str = "global";

/// The whole state of one running program.
///
/// Compiled code and native extensions talk to the runtime exclusively
/// through handles, the nodes themselves stay private to the value store.
pub struct Runtime {
    pub(super) config: Config,
    pub(super) gc: GC,
    pub(super) stack: OperandStack,
    pub(super) roots: RootRegistry,
    pub(super) current_env: Handle,
    pub(super) global_env: Handle,
    pub(super) call_frames: Vec<CallFrame>,
    pub(super) code: Vec<(String, CompiledCode)>,
    pub(super) extensions: HashMap<String, ExtensionInit>,
    pub(super) loaded: HashSet<String>,
    pub(super) debug_mode: DebugMode,
    pub(super) controller: Option<Box<dyn Controller>>,
    started: bool,
}

impl Runtime {
    pub fn new(config: Config) -> Self {
        let mut gc = GC::new(config.initial_threshold, config.min_threshold);
        gc.set_stress(config.stress_gc);
        gc.set_logging(config.log_gc);

        Self {
            debug_mode: config.debug_mode,
            config,
            gc,
            stack: OperandStack::new(),
            roots: RootRegistry::new(),
            current_env: Handle::NIL,
            global_env: Handle::NIL,
            call_frames: Vec::new(),
            code: Vec::new(),
            extensions: HashMap::new(),
            loaded: HashSet::new(),
            controller: None,
            started: false,
        }
    }

    /// Sets up the global frame and installs the built-in closures and
    /// extensions. Calling it again does nothing.
    pub fn start(&mut self) -> Result<()> {
        if self.started {
            return Ok(());
        }

        let global = self
            .gc
            .alloc(Node::Environment(Frame::new(GLOBAL_ENV_NAME.to_owned(), None)));
        self.global_env = global;
        self.current_env = global;
        self.started = true;

        if self.config.prelude {
            super::prelude::install(self)?;
        }
        super::extension::register_builtin(self);
        Ok(())
    }

    pub fn is_started(&self) -> bool {
        self.started
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Start check for read-only entry points.
    pub(super) fn check(&self, op: &'static str) -> Result<()> {
        if self.started {
            Ok(())
        } else {
            Err(RuntimeError::NotStarted { op })
        }
    }

    /// Start check, tracing and step-mode suspension for every mutating entry
    /// point.
    pub(super) fn enter(&mut self, op: &'static str) -> Result<()> {
        self.check(op)?;
        if self.config.trace_api {
            debug::log(Tag::Api, op);
        }
        if self.debug_mode >= DebugMode::Step {
            self.suspend(Event::ApiCall(op));
        }
        Ok(())
    }

    /// Everything the collector has to treat as live, besides the nodes
    /// pinned by the allocation in progress.
    fn root_set(&self) -> Vec<Handle> {
        let mut roots: Vec<Handle> = self.stack.iter().collect();
        roots.extend(self.roots.handles());
        roots.push(self.current_env);
        roots.push(self.global_env);
        for frame in self.call_frames.iter() {
            roots.push(frame.closure);
            roots.push(frame.caller_env);
        }
        roots
    }

    /// Stores `node`, collecting first if the store is due.
    ///
    /// The handles inside `node` are not reachable from anywhere yet, so they
    /// are pinned for the collection.
    pub(super) fn allocate(&mut self, node: Node) -> Handle {
        if self.gc.should_collect() {
            let mut roots = self.root_set();
            roots.extend(node.references());
            self.gc.collect(roots);
        }
        self.gc.alloc(node)
    }

    pub(super) fn allocate_and_push(&mut self, node: Node) -> Handle {
        let handle = self.allocate(node);
        self.stack.push(handle);
        handle
    }

    pub(super) fn node(&self, op: &'static str, handle: Handle) -> Result<&Node> {
        self.gc
            .get(handle)
            .ok_or(RuntimeError::InvalidHandle { op, handle })
    }

    pub(super) fn node_mut(&mut self, op: &'static str, handle: Handle) -> Result<&mut Node> {
        self.gc
            .get_mut(handle)
            .ok_or(RuntimeError::InvalidHandle { op, handle })
    }

    /// Fails unless `handle` names a live node.
    pub(super) fn validate(&self, op: &'static str, handle: Handle) -> Result<()> {
        if self.gc.contains(handle) {
            Ok(())
        } else {
            Err(RuntimeError::InvalidHandle { op, handle })
        }
    }

    fn mismatch(
        op: &'static str,
        handle: Handle,
        expected: &'static str,
        node: &Node,
    ) -> RuntimeError {
        RuntimeError::TypeMismatch {
            op,
            handle,
            expected,
            found: node.kind(),
        }
    }
}

// Construction. Every constructor pushes the new handle.
impl Runtime {
    pub fn new_nil(&mut self) -> Result<Handle> {
        self.enter("new_nil")?;
        self.stack.push(Handle::NIL);
        Ok(Handle::NIL)
    }

    pub fn new_bool(&mut self, value: bool) -> Result<Handle> {
        self.enter("new_bool")?;
        Ok(self.allocate_and_push(Node::Bool(value)))
    }

    pub fn new_integer(&mut self, value: i64) -> Result<Handle> {
        self.enter("new_integer")?;
        Ok(self.allocate_and_push(Node::Integer(value)))
    }

    pub fn new_float(&mut self, value: f64) -> Result<Handle> {
        self.enter("new_float")?;
        Ok(self.allocate_and_push(Node::Float(value)))
    }

    pub fn new_symbol(&mut self, name: &str) -> Result<Handle> {
        self.enter("new_symbol")?;
        Ok(self.allocate_and_push(Node::Symbol(name.to_owned())))
    }

    /// Pops the car, then the cdr, and pushes the pair made of them.
    pub fn new_pair(&mut self) -> Result<Handle> {
        self.enter("new_pair")?;
        self.stack.require("new_pair", 2)?;
        let car = self.stack.pop("new_pair")?;
        let cdr = self.stack.pop("new_pair")?;
        Ok(self.allocate_and_push(Node::Pair(car, cdr)))
    }

    /// Pops `len` entries and pushes a proper list of them, the first entry
    /// popped at its head.
    pub fn new_list(&mut self, len: usize) -> Result<Handle> {
        self.enter("new_list")?;
        self.stack.require("new_list", len)?;

        // The elements stay on the stack until the list is complete.
        let mut list = Handle::NIL;
        for depth in (0..len).rev() {
            let element = self.stack.peek(depth).unwrap_or(Handle::NIL);
            list = self.allocate(Node::Pair(element, list));
        }

        let base = self.stack.depth() - len;
        self.stack.truncate(base);
        self.stack.push(list);
        Ok(list)
    }
}

// Typed access.
impl Runtime {
    pub fn get_integer(&self, handle: Handle) -> Result<i64> {
        self.check("get_integer")?;
        match self.node("get_integer", handle)? {
            Node::Integer(value) => Ok(*value),
            node => Err(Self::mismatch("get_integer", handle, "integer", node)),
        }
    }

    pub fn get_float(&self, handle: Handle) -> Result<f64> {
        self.check("get_float")?;
        match self.node("get_float", handle)? {
            Node::Float(value) => Ok(*value),
            node => Err(Self::mismatch("get_float", handle, "float", node)),
        }
    }

    pub fn get_bool(&self, handle: Handle) -> Result<bool> {
        self.check("get_bool")?;
        match self.node("get_bool", handle)? {
            Node::Bool(value) => Ok(*value),
            node => Err(Self::mismatch("get_bool", handle, "bool", node)),
        }
    }

    pub fn get_symbol_text(&self, handle: Handle) -> Result<&str> {
        self.check("get_symbol_text")?;
        match self.node("get_symbol_text", handle)? {
            Node::Symbol(name) => Ok(name.as_str()),
            node => Err(Self::mismatch("get_symbol_text", handle, "symbol", node)),
        }
    }

    pub fn is_symbol(&self, handle: Handle) -> Result<bool> {
        self.check("is_symbol")?;
        Ok(matches!(self.node("is_symbol", handle)?, Node::Symbol(_)))
    }

    /// Returns `(car, cdr)`.
    pub fn get_pair(&self, handle: Handle) -> Result<(Handle, Handle)> {
        self.check("get_pair")?;
        let node = self.node("get_pair", handle)?;
        node.as_pair()
            .ok_or_else(|| Self::mismatch("get_pair", handle, "pair", node))
    }

    /// Everything except nil and `#f` counts as true.
    pub fn is_truthy(&self, handle: Handle) -> Result<bool> {
        self.check("is_truthy")?;
        Ok(!matches!(
            self.node("is_truthy", handle)?,
            Node::Nil | Node::Bool(false)
        ))
    }

    /// Tag name of the node, e.g. `"integer"` or `"pair"`.
    pub fn kind_of(&self, handle: Handle) -> Result<&'static str> {
        self.check("kind_of")?;
        Ok(self.node("kind_of", handle)?.kind())
    }

    /// Structural equality. Atoms compare by value, pairs by their fields,
    /// closures and frames by identity. Terminates on cyclic structures.
    pub fn equal(&self, a: Handle, b: Handle) -> Result<bool> {
        self.check("equal")?;
        let mut visited = HashSet::new();
        let mut work = vec![(a, b)];

        while let Some((a, b)) = work.pop() {
            if a == b || !visited.insert((a, b)) {
                continue;
            }
            let same = match (self.node("equal", a)?, self.node("equal", b)?) {
                (Node::Nil, Node::Nil) => true,
                (Node::Bool(x), Node::Bool(y)) => x == y,
                (Node::Integer(x), Node::Integer(y)) => x == y,
                (Node::Float(x), Node::Float(y)) => x == y,
                (Node::Symbol(x), Node::Symbol(y)) => x == y,
                (Node::Constant(x), Node::Constant(y)) => x == y,
                (Node::Pair(car_a, cdr_a), Node::Pair(car_b, cdr_b)) => {
                    work.push((*cdr_a, *cdr_b));
                    work.push((*car_a, *car_b));
                    true
                }
                _ => false,
            };
            if !same {
                return Ok(false);
            }
        }
        Ok(true)
    }
}

// Mutation.
impl Runtime {
    /// Points the car of `pair` at `value`. Returns `pair`.
    pub fn set_car(&mut self, pair: Handle, value: Handle) -> Result<Handle> {
        self.set_field("set_car", pair, value, true)
    }

    /// Points the cdr of `pair` at `value`. Returns `pair`.
    pub fn set_cdr(&mut self, pair: Handle, value: Handle) -> Result<Handle> {
        self.set_field("set_cdr", pair, value, false)
    }

    fn set_field(
        &mut self,
        op: &'static str,
        pair: Handle,
        value: Handle,
        car: bool,
    ) -> Result<Handle> {
        self.enter(op)?;
        self.validate(op, value)?;
        match self.node_mut(op, pair)? {
            Node::Pair(first, rest) => {
                if car {
                    *first = value;
                } else {
                    *rest = value;
                }
                Ok(pair)
            }
            node => Err(Self::mismatch(op, pair, "pair", node)),
        }
    }
}

// Operand stack.
impl Runtime {
    pub fn push(&mut self, handle: Handle) -> Result<()> {
        self.enter("push")?;
        self.validate("push", handle)?;
        self.stack.push(handle);
        Ok(())
    }

    pub fn pop(&mut self) -> Result<Handle> {
        self.enter("pop")?;
        self.stack.pop("pop")
    }

    pub fn top(&self) -> Result<Handle> {
        self.check("top")?;
        self.stack.top("top")
    }

    pub fn swap(&mut self) -> Result<()> {
        self.enter("swap")?;
        self.stack.swap("swap")
    }

    pub fn depth(&self) -> usize {
        self.stack.depth()
    }

    /// Entry `depth` places below the top of the stack.
    pub fn peek(&self, depth: usize) -> Option<Handle> {
        self.stack.peek(depth)
    }

    pub fn stack(&self) -> &OperandStack {
        &self.stack
    }
}

// Roots.
impl Runtime {
    pub fn add_root(&mut self, name: &str, handle: Handle) -> Result<()> {
        self.enter("add_root")?;
        self.validate("add_root", handle)?;
        self.roots.add(name, handle)
    }

    pub fn set_root(&mut self, name: &str, handle: Handle) -> Result<()> {
        self.enter("set_root")?;
        self.validate("set_root", handle)?;
        self.roots.set(name, handle)
    }

    pub fn get_root(&self, name: &str) -> Result<Handle> {
        self.check("get_root")?;
        self.roots.get(name)
    }

    /// Unregisters a root and returns the handle it held. The node stays
    /// alive only as long as something else refers to it.
    pub fn remove_root(&mut self, name: &str) -> Result<Handle> {
        self.enter("remove_root")?;
        self.roots.remove(name)
    }

    pub fn roots(&self) -> &RootRegistry {
        &self.roots
    }
}

// Collection.
impl Runtime {
    /// Forces a collection.
    pub fn gc(&mut self) -> Result<Collection> {
        self.enter("gc")?;
        let roots = self.root_set();
        Ok(self.gc.collect(roots))
    }

    pub fn heap_stats(&self) -> HeapStats {
        self.gc.stats()
    }

    /// Printed form of the value behind `handle`.
    pub fn display(&self, handle: Handle) -> String {
        printer::display(&self.gc, handle)
    }

    /// Storage slot a handle currently resolves to.
    #[cfg(test)]
    pub(crate) fn location(&self, handle: Handle) -> Option<usize> {
        self.gc.location(handle)
    }
}

/// Dump of the stack, the roots and the current frame, as shown by the
/// debugger and the REPL.
impl fmt::Display for Runtime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Stack ({}):", self.stack.depth())?;
        let entries: Vec<Handle> = self.stack.iter().collect();
        for (depth, handle) in entries.into_iter().rev().enumerate() {
            writeln!(f, "  [{}] {} = {}", depth, handle, self.display(handle))?;
        }

        writeln!(f, "Roots ({}):", self.roots.len())?;
        for (name, handle) in self.roots.iter() {
            writeln!(f, "  {} -> {} = {}", name, handle, self.display(*handle))?;
        }

        let mut env = Some(self.current_env);
        while let Some(handle) = env {
            let frame = match self.gc.get(handle).and_then(Node::as_frame) {
                Some(frame) => frame,
                None => break,
            };
            if handle == self.global_env {
                writeln!(f, "Env {} ({} bindings)", frame.name, frame.bindings.len())?;
                break;
            }
            writeln!(f, "Env {}:", frame.name)?;
            let mut names: Vec<&String> = frame.bindings.keys().collect();
            names.sort();
            for name in names {
                let value = frame.bindings[name];
                writeln!(f, "  {} = {}", name, self.display(value))?;
            }
            env = frame.outer;
        }

        let stats = self.gc.stats();
        write!(
            f,
            "Heap: {} live, next collection at {}, {} collections",
            stats.live, stats.next_gc, stats.collections
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    pub(crate) fn runtime() -> Runtime {
        let mut rt = Runtime::new(Config::default());
        rt.start().unwrap();
        rt
    }

    #[test]
    fn operations_before_start_fail() {
        let mut rt = Runtime::new(Config::default());
        assert!(!rt.is_started());
        assert_eq!(
            rt.new_integer(1),
            Err(RuntimeError::NotStarted { op: "new_integer" })
        );
        assert!(rt.get_integer(Handle::NIL).unwrap_err().is_fatal());
        rt.start().unwrap();
        rt.start().unwrap();
        assert!(rt.is_started());
        assert!(rt.new_integer(1).is_ok());
    }

    #[test]
    fn construction_round_trips() {
        let mut rt = runtime();
        let i = rt.new_integer(1234).unwrap();
        let f = rt.new_float(1.234).unwrap();
        let s = rt.new_symbol("nil").unwrap();
        let b = rt.new_bool(true).unwrap();
        assert_eq!(rt.depth(), 4);
        assert_eq!(rt.get_integer(i), Ok(1234));
        assert_eq!(rt.get_float(f), Ok(1.234));
        assert_eq!(rt.get_symbol_text(s), Ok("nil"));
        assert_eq!(rt.get_bool(b), Ok(true));
        assert!(rt.is_symbol(s).unwrap());
        assert!(!rt.is_symbol(i).unwrap());
    }

    #[test]
    fn accessors_check_tags() {
        let mut rt = runtime();
        let i = rt.new_integer(5).unwrap();
        assert_eq!(
            rt.get_float(i),
            Err(RuntimeError::TypeMismatch {
                op: "get_float",
                handle: i,
                expected: "float",
                found: "integer"
            })
        );
        assert!(matches!(
            rt.get_integer(Handle::from_raw(100_000)),
            Err(RuntimeError::InvalidHandle { .. })
        ));
    }

    #[test]
    fn new_pair_pops_car_first() {
        let mut rt = runtime();
        let cdr = rt.new_integer(2).unwrap();
        let car = rt.new_integer(1).unwrap();
        let pair = rt.new_pair().unwrap();
        assert_eq!(rt.get_pair(pair), Ok((car, cdr)));
        assert_eq!(rt.depth(), 1);
        assert_eq!(rt.display(pair), "(1 . 2)");
    }

    #[test]
    fn new_list_puts_first_popped_at_head() {
        let mut rt = runtime();
        rt.new_integer(3).unwrap();
        rt.new_integer(2).unwrap();
        rt.new_integer(1).unwrap();
        let list = rt.new_list(3).unwrap();
        assert_eq!(rt.display(list), "(1 2 3)");
        assert_eq!(rt.depth(), 1);

        let empty = rt.new_list(0).unwrap();
        assert_eq!(empty, Handle::NIL);
    }

    #[test]
    fn set_car_and_cdr_mutate_in_place() {
        let mut rt = runtime();
        rt.new_nil().unwrap();
        rt.new_integer(1).unwrap();
        let pair = rt.new_pair().unwrap();
        let two = rt.new_integer(2).unwrap();

        assert_eq!(rt.set_car(pair, two), Ok(pair));
        assert_eq!(rt.get_pair(pair), Ok((two, Handle::NIL)));

        rt.set_cdr(pair, pair).unwrap();
        assert_eq!(rt.get_pair(pair), Ok((two, pair)));

        assert!(matches!(
            rt.set_car(two, two),
            Err(RuntimeError::TypeMismatch { expected: "pair", .. })
        ));
        assert!(matches!(
            rt.set_car(pair, Handle::from_raw(100_000)),
            Err(RuntimeError::InvalidHandle { .. })
        ));
    }

    #[test]
    fn self_referential_pair_displays() {
        let mut rt = runtime();
        rt.new_nil().unwrap();
        rt.new_integer(1).unwrap();
        let pair = rt.new_pair().unwrap();
        rt.set_cdr(pair, pair).unwrap();
        rt.set_car(pair, pair).unwrap();
        let text = rt.display(pair);
        assert!(text.contains("..."));
    }

    #[test]
    fn handles_survive_collection() {
        let mut rt = runtime();
        for i in 0..50 {
            rt.new_integer(i).unwrap();
        }
        rt.stack.truncate(0);
        let kept = rt.new_integer(1234).unwrap();
        let before = rt.location(kept);

        rt.gc().unwrap();

        assert_ne!(rt.location(kept), before);
        assert_eq!(rt.get_integer(kept), Ok(1234));
    }

    #[test]
    fn ten_thousand_rooted_integers_survive() {
        let mut rt = Runtime::new(Config::small_heap(64));
        rt.start().unwrap();
        let mut handles = Vec::new();
        for i in 0..10_000 {
            let h = rt.new_integer(i).unwrap();
            rt.add_root(&format!("n{}", i), h).unwrap();
            rt.pop().unwrap();
            handles.push(h);
        }
        rt.gc().unwrap();
        for (i, h) in handles.into_iter().enumerate() {
            assert_eq!(rt.get_integer(h), Ok(i as i64));
        }
    }

    #[test]
    fn unrooted_nodes_are_reclaimed() {
        let mut rt = runtime();
        rt.gc().unwrap();
        let live_before = rt.heap_stats().live;
        let h = rt.new_integer(7).unwrap();
        rt.pop().unwrap();
        rt.gc().unwrap();
        assert_eq!(rt.heap_stats().live, live_before);
        assert!(rt.get_integer(h).is_err());
    }

    #[test]
    fn reachable_through_pairs_survives() {
        let mut rt = runtime();
        rt.new_nil().unwrap();
        let inner = rt.new_integer(9).unwrap();
        let pair = rt.new_pair().unwrap();
        rt.add_root("p", pair).unwrap();
        rt.pop().unwrap();
        rt.gc().unwrap();
        assert_eq!(rt.get_integer(inner), Ok(9));

        rt.remove_root("p").unwrap();
        rt.gc().unwrap();
        assert!(rt.get_integer(inner).is_err());
    }

    #[test]
    fn stress_mode_keeps_in_flight_values() {
        let mut config = Config::default();
        config.stress_gc = true;
        let mut rt = Runtime::new(config);
        rt.start().unwrap();
        for i in 0..20 {
            rt.new_integer(i).unwrap();
        }
        let list = rt.new_list(20).unwrap();
        assert_eq!(rt.list_to_stack(), Ok(20));
        assert_eq!(rt.get_integer(rt.top().unwrap()), Ok(19));
        assert!(rt.get_pair(list).is_ok());
    }

    #[test]
    fn root_lifecycle() {
        let mut rt = runtime();
        let a = rt.new_integer(1).unwrap();
        let b = rt.new_integer(2).unwrap();
        rt.add_root("r", a).unwrap();
        assert_eq!(rt.add_root("r", b), Err(RuntimeError::DuplicateRoot("r".into())));
        rt.set_root("r", b).unwrap();
        assert_eq!(rt.get_root("r"), Ok(b));
        assert_eq!(rt.remove_root("r"), Ok(b));
        assert_eq!(rt.get_root("r"), Err(RuntimeError::UnknownRoot("r".into())));
    }

    #[test]
    fn push_rejects_dead_handles() {
        let mut rt = runtime();
        assert!(matches!(
            rt.push(Handle::from_raw(100_000)),
            Err(RuntimeError::InvalidHandle { op: "push", .. })
        ));
        rt.push(Handle::NIL).unwrap();
        assert_eq!(rt.top(), Ok(Handle::NIL));
    }

    #[test]
    fn structural_equality() {
        let mut rt = runtime();
        let a = rt.new_constant("(1 (2 \"x\") . 3)").unwrap();
        let b = rt.new_constant("(1 (2 \"x\") . 3)").unwrap();
        let c = rt.new_constant("(1 (2 \"y\") . 3)").unwrap();
        assert!(rt.equal(a, b).unwrap());
        assert!(!rt.equal(a, c).unwrap());

        rt.set_cdr(a, a).unwrap();
        rt.set_cdr(b, b).unwrap();
        assert!(rt.equal(a, b).unwrap());
    }

    #[test]
    fn truthiness() {
        let mut rt = runtime();
        let f = rt.new_bool(false).unwrap();
        let zero = rt.new_integer(0).unwrap();
        assert!(!rt.is_truthy(Handle::NIL).unwrap());
        assert!(!rt.is_truthy(f).unwrap());
        assert!(rt.is_truthy(zero).unwrap());
    }

    #[test]
    fn dump_lists_stack_and_roots() {
        let mut rt = runtime();
        let h = rt.new_integer(42).unwrap();
        rt.add_root("answer", h).unwrap();
        let dump = rt.to_string();
        assert!(dump.contains("Stack (1)"));
        assert!(dump.contains("answer"));
        assert!(dump.contains("42"));
    }
}
