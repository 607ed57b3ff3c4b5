use super::{Result, Runtime, RuntimeError};
use crate::memory::node::Frame;
use crate::memory::{Handle, Node};

impl Runtime {
    /// Allocates a frame enclosed by `outer`, or a top-level frame when
    /// `outer` is `None`.
    ///
    /// The frame is returned, not pushed. Move to it or root it before the
    /// next allocation.
    pub fn new_env(&mut self, name: &str, outer: Option<Handle>) -> Result<Handle> {
        self.enter("new_env")?;
        if let Some(outer) = outer {
            self.frame("new_env", outer)?;
        }
        Ok(self.allocate(Node::Environment(Frame::new(name.to_owned(), outer))))
    }

    pub fn current_env(&self) -> Result<Handle> {
        self.check("current_env")?;
        Ok(self.current_env)
    }

    pub fn global_env(&self) -> Result<Handle> {
        self.check("global_env")?;
        Ok(self.global_env)
    }

    pub fn move_to_env(&mut self, env: Handle) -> Result<()> {
        self.enter("move_to_env")?;
        self.frame("move_to_env", env)?;
        self.current_env = env;
        Ok(())
    }

    /// Binds `name` in the current frame, shadowing any outer binding.
    pub fn define(&mut self, name: &str, value: Handle) -> Result<()> {
        self.enter("define")?;
        self.validate("define", value)?;
        let env = self.current_env;
        self.frame_mut("define", env)?.define(name, value);
        Ok(())
    }

    /// Rebinds `name` in the nearest frame that binds it.
    pub fn set(&mut self, name: &str, value: Handle) -> Result<()> {
        self.enter("set")?;
        self.validate("set", value)?;
        let env = self.resolve("set", name)?;
        self.frame_mut("set", env)?.assign(name, value);
        Ok(())
    }

    /// Looks `name` up, starting in the current frame and walking outwards.
    pub fn get(&self, name: &str) -> Result<Handle> {
        self.check("get")?;
        let env = self.resolve("get", name)?;
        self.frame("get", env)?
            .lookup(name)
            .ok_or_else(|| RuntimeError::UnboundVariable(name.to_owned()))
    }

    /// Nearest frame binding `name`.
    fn resolve(&self, op: &'static str, name: &str) -> Result<Handle> {
        let mut env = Some(self.current_env);
        while let Some(handle) = env {
            let frame = self.frame(op, handle)?;
            if frame.bindings.contains_key(name) {
                return Ok(handle);
            }
            env = frame.outer;
        }
        Err(RuntimeError::UnboundVariable(name.to_owned()))
    }

    pub(super) fn frame(&self, op: &'static str, env: Handle) -> Result<&Frame> {
        let node = self.node(op, env)?;
        node.as_frame().ok_or(RuntimeError::TypeMismatch {
            op,
            handle: env,
            expected: "environment",
            found: node.kind(),
        })
    }

    fn frame_mut(&mut self, op: &'static str, env: Handle) -> Result<&mut Frame> {
        let node = self.node_mut(op, env)?;
        let found = node.kind();
        node.as_frame_mut().ok_or(RuntimeError::TypeMismatch {
            op,
            handle: env,
            expected: "environment",
            found,
        })
    }
}

#[cfg(test)]
mod tests {
    use crate::config::Config;
    use crate::memory::Handle;
    use crate::vm::{Runtime, RuntimeError};

    fn runtime() -> Runtime {
        let mut rt = Runtime::new(Config::default());
        rt.start().unwrap();
        rt
    }

    #[test]
    fn start_points_at_global_frame() {
        let rt = runtime();
        assert_eq!(rt.current_env(), rt.global_env());
        assert_eq!(rt.kind_of(rt.global_env().unwrap()), Ok("environment"));
    }

    #[test]
    fn lexical_scoping() {
        let mut rt = runtime();
        let global = rt.current_env().unwrap();
        let one = rt.new_integer(1).unwrap();
        rt.define("x", one).unwrap();

        let child = rt.new_env("child", Some(global)).unwrap();
        rt.move_to_env(child).unwrap();
        assert_eq!(rt.get("x"), Ok(one));

        let two = rt.new_integer(2).unwrap();
        rt.define("x", two).unwrap();
        assert_eq!(rt.get("x"), Ok(two));

        rt.move_to_env(global).unwrap();
        assert_eq!(rt.get("x"), Ok(one));
    }

    #[test]
    fn set_updates_nearest_binding() {
        let mut rt = runtime();
        let global = rt.current_env().unwrap();
        let one = rt.new_integer(1).unwrap();
        rt.define("x", one).unwrap();

        let child = rt.new_env("child", Some(global)).unwrap();
        rt.move_to_env(child).unwrap();
        let three = rt.new_integer(3).unwrap();
        rt.set("x", three).unwrap();

        rt.move_to_env(global).unwrap();
        assert_eq!(rt.get("x"), Ok(three));
    }

    #[test]
    fn unbound_names() {
        let mut rt = runtime();
        assert_eq!(rt.get("nope"), Err(RuntimeError::UnboundVariable("nope".into())));
        assert_eq!(
            rt.set("nope", Handle::NIL),
            Err(RuntimeError::UnboundVariable("nope".into()))
        );
    }

    #[test]
    fn root_frames_do_not_see_globals() {
        let mut rt = runtime();
        let global = rt.current_env().unwrap();
        let x = rt.new_integer(1).unwrap();
        rt.define("x", x).unwrap();

        let island = rt.new_env("island", None).unwrap();
        rt.push(island).unwrap();
        rt.move_to_env(island).unwrap();
        assert_eq!(rt.get("x"), Err(RuntimeError::UnboundVariable("x".into())));

        let y = rt.new_integer(2).unwrap();
        rt.define("y", y).unwrap();
        assert_eq!(rt.get("y"), Ok(y));

        rt.move_to_env(global).unwrap();
        assert_eq!(rt.get("x"), Ok(x));
        assert_eq!(rt.get("y"), Err(RuntimeError::UnboundVariable("y".into())));
    }

    #[test]
    fn frames_must_be_environments() {
        let mut rt = runtime();
        let i = rt.new_integer(1).unwrap();
        assert!(matches!(
            rt.new_env("bad", Some(i)),
            Err(RuntimeError::TypeMismatch { expected: "environment", .. })
        ));
        assert!(matches!(
            rt.move_to_env(i),
            Err(RuntimeError::TypeMismatch { .. })
        ));
    }

    #[test]
    fn current_frame_survives_collection() {
        let mut rt = runtime();
        let global = rt.current_env().unwrap();
        let child = rt.new_env("child", Some(global)).unwrap();
        rt.move_to_env(child).unwrap();
        let v = rt.new_integer(5).unwrap();
        rt.define("v", v).unwrap();
        rt.pop().unwrap();

        rt.gc().unwrap();
        assert_eq!(rt.get_integer(rt.get("v").unwrap()), Ok(5));
    }
}
