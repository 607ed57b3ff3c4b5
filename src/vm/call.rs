use std::collections::HashSet;
use std::rc::Rc;

use super::{CallFrame, Result, Runtime, RuntimeError};
use crate::debug::{self, Tag};
use crate::memory::node::{param_name, Closure, CodeId, Entry};
use crate::memory::{Handle, Node};

/// Body of a compiled closure.
pub type CompiledCode = Rc<dyn Fn(&mut Runtime) -> Result<()>>;

impl Runtime {
    /// Adds a compiled body to the code table. Closures refer to it through
    /// the returned id.
    pub fn register_code<F>(&mut self, name: &str, body: F) -> CodeId
    where
        F: Fn(&mut Runtime) -> Result<()> + 'static,
    {
        self.code.push((name.to_owned(), Rc::new(body)));
        CodeId(self.code.len() - 1)
    }

    /// Pushes a closure capturing the current frame.
    pub fn new_closure(
        &mut self,
        identity: &str,
        entry: Entry,
        arity: usize,
        variadic: bool,
    ) -> Result<Handle> {
        self.enter("new_closure")?;
        if let Entry::Compiled(id) = entry {
            if id.index() >= self.code.len() {
                return Err(RuntimeError::UnknownCode(id));
            }
        }
        let closure = Closure::new(identity.to_owned(), entry, self.current_env, arity, variadic);
        let handle = self.allocate(Node::Closure(closure));
        self.stack.push(handle);
        Ok(handle)
    }

    /// Calls the closure on top of the stack with the `nargs` entries below
    /// it as arguments, and replaces all of them with the result.
    ///
    /// The first argument popped is parameter 0. If the call fails, the
    /// arguments are dropped and the caller's frame is restored.
    pub fn apply(&mut self, nargs: usize) -> Result<Handle> {
        self.enter("apply")?;
        let callee = self.stack.pop("apply")?;
        let base = self.stack.depth().saturating_sub(nargs);
        let caller_env = self.current_env;

        let outcome = self.call(callee, nargs, base, caller_env);

        self.current_env = caller_env;
        self.finish(base, outcome)
    }

    fn call(
        &mut self,
        callee: Handle,
        nargs: usize,
        base: usize,
        caller_env: Handle,
    ) -> Result<Handle> {
        let closure = self.callable(callee)?;
        self.check_arguments("apply", &closure, nargs)?;

        let limit = self.config.max_call_depth;
        if self.call_frames.len() >= limit {
            return Err(RuntimeError::CallDepthExceeded(limit));
        }

        self.call_frames.push(CallFrame::new(callee, caller_env, base));
        let outcome = self.invoke(callee, &closure, nargs, base);
        self.call_frames.pop();
        outcome
    }

    /// Like [`Runtime::apply`], but takes over the active call instead of
    /// nesting a new one. The callee gets a frame of its own and its result
    /// is pushed. The caller's frame is restored once the enclosing `apply`
    /// returns, so this must be the last thing a body does.
    ///
    /// Outside of any call this is a plain `apply`.
    pub fn tail_apply(&mut self, nargs: usize) -> Result<Handle> {
        if self.call_frames.is_empty() {
            return self.apply(nargs);
        }

        self.enter("tail_apply")?;
        let callee = self.stack.pop("tail_apply")?;
        let base = self.stack.depth().saturating_sub(nargs);

        let outcome = self.callable(callee).and_then(|closure| {
            self.check_arguments("tail_apply", &closure, nargs)?;
            if let Some(frame) = self.call_frames.last_mut() {
                frame.closure = callee;
            }
            self.invoke(callee, &closure, nargs, base)
        });

        self.finish(base, outcome)
    }

    /// Drops whatever the call left above `base` and pushes its result.
    fn finish(&mut self, base: usize, outcome: Result<Handle>) -> Result<Handle> {
        self.stack.truncate(base);
        let result = outcome?;
        self.stack.push(result);
        Ok(result)
    }

    fn invoke(
        &mut self,
        callee: Handle,
        closure: &Closure,
        nargs: usize,
        base: usize,
    ) -> Result<Handle> {
        self.prepare_args(callee, nargs)?;

        match closure.entry {
            Entry::Native(function) => function(self)?,
            Entry::Compiled(id) => {
                let body = self
                    .code
                    .get(id.index())
                    .map(|(_, body)| Rc::clone(body))
                    .ok_or(RuntimeError::UnknownCode(id))?;
                body(self)?;
            }
        }

        if self.stack.depth() > base {
            self.stack.pop("apply")
        } else {
            Ok(Handle::NIL)
        }
    }

    /// Binds the top `nargs` stack entries as parameters of `closure`.
    ///
    /// A new frame enclosed by the closure's captured frame becomes the
    /// current one. The first `arity` entries popped are bound as parameters
    /// `0..arity`. A variadic closure gets the rest as a list in parameter
    /// `arity`, nil when there are none.
    pub fn prepare_args(&mut self, closure: Handle, nargs: usize) -> Result<Handle> {
        self.enter("prepare_args")?;
        let callee = self.callable(closure)?;
        self.check_arguments("prepare_args", &callee, nargs)?;

        let env = self.new_env(&callee.identity, Some(callee.env))?;
        self.move_to_env(env)?;

        for index in 0..callee.arity {
            let value = self.stack.pop("prepare_args")?;
            self.define(&param_name(&callee.identity, index), value)?;
        }
        if callee.variadic {
            let rest = self.new_list(nargs - callee.arity)?;
            self.define(&param_name(&callee.identity, callee.arity), rest)?;
            self.stack.pop("prepare_args")?;
        }

        Ok(env)
    }

    /// Pops a proper list and pushes its elements so that popping returns
    /// them head first. Returns the number of elements.
    pub fn list_to_stack(&mut self) -> Result<usize> {
        self.enter("list_to_stack")?;
        let list = self.stack.top("list_to_stack")?;

        let mut elements = Vec::new();
        let mut visited = HashSet::new();
        let mut current = list;
        loop {
            match self.node("list_to_stack", current)? {
                Node::Nil => break,
                Node::Pair(car, cdr) => {
                    if !visited.insert(current) {
                        return Err(RuntimeError::TypeMismatch {
                            op: "list_to_stack",
                            handle: list,
                            expected: "list",
                            found: "cyclic list",
                        });
                    }
                    elements.push(*car);
                    current = *cdr;
                }
                node => {
                    return Err(RuntimeError::TypeMismatch {
                        op: "list_to_stack",
                        handle: list,
                        expected: "list",
                        found: node.kind(),
                    })
                }
            }
        }

        self.stack.pop("list_to_stack")?;
        let count = elements.len();
        for element in elements.into_iter().rev() {
            self.stack.push(element);
        }
        Ok(count)
    }

    /// Parameter `index` of the innermost active closure.
    pub fn argument(&self, index: usize) -> Result<Handle> {
        self.check("argument")?;
        let frame = self
            .call_frames
            .last()
            .ok_or_else(|| RuntimeError::UnboundVariable(format!("#{}", index)))?;
        let closure = self.callable(frame.closure)?;
        self.get(&param_name(&closure.identity, index))
    }

    /// Active call frames, outermost first.
    pub fn call_frames(&self) -> &[CallFrame] {
        &self.call_frames
    }

    fn callable(&self, handle: Handle) -> Result<Closure> {
        let node = self.node("apply", handle)?;
        node.as_closure()
            .cloned()
            .ok_or_else(|| RuntimeError::NotCallable {
                handle,
                found: node.kind(),
            })
    }

    fn check_arguments(&self, op: &'static str, closure: &Closure, nargs: usize) -> Result<()> {
        if !closure.accepts(nargs) {
            if self.config.trace_api {
                debug::log(
                    Tag::Api,
                    format!("{} rejects {} arguments", closure, nargs),
                );
            }
            return Err(RuntimeError::ArityMismatch {
                closure: closure.identity.clone(),
                expected: closure.arity,
                variadic: closure.variadic,
                found: nargs,
            });
        }
        let found = self.stack.depth();
        if found < nargs {
            return Err(RuntimeError::InsufficientStack {
                op,
                needed: nargs,
                found,
            });
        }
        Ok(())
    }
}
