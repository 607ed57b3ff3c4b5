use std::fmt;
use std::io::{self, BufRead, Write};
use std::str::FromStr;

use super::{Result, Runtime};
use crate::debug::{self, Tag};
use crate::memory::Handle;

/// How eagerly the runtime stops for the controller. Each mode also stops
/// wherever the modes before it do.
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub enum DebugMode {
    /// Never stop.
    Off,
    /// Stop at breakpoints.
    Normal,
    /// Also stop after every evaluated form.
    Next,
    /// Also stop at every runtime call.
    Step,
}

impl FromStr for DebugMode {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "off" => Ok(DebugMode::Off),
            "normal" | "on" => Ok(DebugMode::Normal),
            "next" => Ok(DebugMode::Next),
            "step" => Ok(DebugMode::Step),
            other => Err(format!("unknown debug mode '{}'", other)),
        }
    }
}

/// What to do once the controller hands control back.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Resume {
    Continue,
    Next,
    Step,
}

impl From<Resume> for DebugMode {
    fn from(resume: Resume) -> Self {
        match resume {
            Resume::Continue => DebugMode::Normal,
            Resume::Next => DebugMode::Next,
            Resume::Step => DebugMode::Step,
        }
    }
}

/// Why the runtime stopped.
#[derive(Debug, Clone, PartialEq)]
pub enum Event<'a> {
    Breakpoint,
    Evaluated {
        name: &'a str,
        optimized: bool,
        /// Top of the stack, unless the result was optimized away.
        result: Option<Handle>,
    },
    ApiCall(&'static str),
}

impl<'a> fmt::Display for Event<'a> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Event::Breakpoint => write!(f, "Hit a breakpoint"),
            Event::Evaluated { name, .. } => write!(f, "Evaluated {}", name),
            Event::ApiCall(op) => write!(f, "API called: {}", op),
        }
    }
}

/// Receives debug events. Installed with [`Runtime::set_controller`].
pub trait Controller {
    /// Called for every evaluated form, whatever the mode.
    fn observe(&mut self, _runtime: &Runtime, _event: &Event<'_>) {}

    /// Called when the runtime stops. Execution always resumes afterwards,
    /// the return value only picks the next mode.
    fn suspend(&mut self, runtime: &Runtime, event: &Event<'_>) -> Resume;
}

impl Runtime {
    pub fn set_controller(&mut self, controller: Box<dyn Controller>) {
        self.controller = Some(controller);
    }

    pub fn take_controller(&mut self) -> Option<Box<dyn Controller>> {
        self.controller.take()
    }

    pub fn debug_mode(&self) -> DebugMode {
        self.debug_mode
    }

    pub fn set_debug_mode(&mut self, mode: DebugMode) {
        self.debug_mode = mode;
    }

    /// Announces that the form `name` has been evaluated. Its result is on
    /// top of the stack unless `optimized` is set.
    pub fn evaluated(&mut self, name: &str, optimized: bool) -> Result<()> {
        self.check("evaluated")?;
        let result = if optimized { None } else { self.stack.peek(0) };
        let event = Event::Evaluated {
            name,
            optimized,
            result,
        };

        if let Some(mut controller) = self.controller.take() {
            controller.observe(self, &event);
            self.controller = Some(controller);
        }

        if self.debug_mode >= DebugMode::Next {
            let shown = match result {
                Some(handle) => self.display(handle),
                None => "[optimized]".to_owned(),
            };
            debug::log(Tag::Debug, format!("{}\n\t|-> {}", name, shown));
            self.suspend(event);
        }
        Ok(())
    }

    /// Stops for the controller unless debugging is off.
    pub fn breakpoint(&mut self) -> Result<()> {
        self.check("breakpoint")?;
        if self.debug_mode >= DebugMode::Normal {
            debug::log(Tag::Debug, "Hit a breakpoint");
            self.suspend(Event::Breakpoint);
        }
        Ok(())
    }

    /// Hands control to the controller. Without one, execution simply goes on
    /// in the current mode.
    pub(super) fn suspend(&mut self, event: Event<'_>) {
        let mut controller = match self.controller.take() {
            Some(controller) => controller,
            None => return,
        };
        let resume = controller.suspend(self, &event);
        self.controller = Some(controller);
        self.debug_mode = resume.into();
    }
}

const HELP: &str = "Available commands: (s)tep, (n)ext, (c)ontinue, (p)rint <var>, (r)untime, bt";

/// Line-oriented prompt, reading commands from `input` and answering on
/// `output`. End of input resumes.
pub struct ConsoleController<R, W> {
    input: R,
    output: W,
}

impl ConsoleController<io::BufReader<io::Stdin>, io::Stdout> {
    pub fn stdio() -> Self {
        Self::new(io::BufReader::new(io::stdin()), io::stdout())
    }
}

impl<R: BufRead, W: Write> ConsoleController<R, W> {
    pub fn new(input: R, output: W) -> Self {
        Self { input, output }
    }

    pub fn into_output(self) -> W {
        self.output
    }

    fn prompt(&mut self, runtime: &Runtime, event: &Event<'_>) -> io::Result<Resume> {
        writeln!(self.output, "{}", event)?;
        loop {
            write!(self.output, "dbg> ")?;
            self.output.flush()?;

            let mut line = String::new();
            if self.input.read_line(&mut line)? == 0 {
                return Ok(Resume::Continue);
            }

            match line.trim() {
                "s" | "step" => return Ok(Resume::Step),
                "n" | "next" => return Ok(Resume::Next),
                "c" | "continue" => return Ok(Resume::Continue),
                "r" | "runtime" => writeln!(self.output, "{}", runtime)?,
                "bt" => {
                    for (depth, frame) in runtime.call_frames().iter().rev().enumerate() {
                        writeln!(
                            self.output,
                            "  {}: {} base={} returns to {}",
                            depth,
                            runtime.display(frame.closure),
                            frame.stack_base(),
                            runtime.display(frame.caller_env())
                        )?;
                    }
                }
                input => {
                    let var = input
                        .strip_prefix("p ")
                        .or_else(|| input.strip_prefix("print "))
                        .map(str::trim);
                    match var {
                        Some(var) => match runtime.get(var) {
                            Ok(value) => {
                                writeln!(self.output, "{} = {}", var, runtime.display(value))?
                            }
                            Err(err) => writeln!(self.output, "{}", err)?,
                        },
                        None => writeln!(self.output, "{}", HELP)?,
                    }
                }
            }
        }
    }
}

impl<R: BufRead, W: Write> Controller for ConsoleController<R, W> {
    fn suspend(&mut self, runtime: &Runtime, event: &Event<'_>) -> Resume {
        match self.prompt(runtime, event) {
            Ok(resume) => resume,
            Err(err) => {
                debug::log_error(format!("debugger: {}", err));
                Resume::Continue
            }
        }
    }
}
