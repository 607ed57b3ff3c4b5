#![warn(rust_2018_idioms)]

use std::env;
use std::error::Error;
use std::fs;
use std::io::{self, Write};
use std::path::Path;

use relic_runtime::debug;
use relic_runtime::{Config, ConsoleController, DebugMode, Reader, Runtime, RuntimeError};

fn main() -> Result<(), Box<dyn Error>> {
    let config = Config::from_env();
    let mut rt = Runtime::new(config);
    rt.start()?;
    if rt.debug_mode() != DebugMode::Off {
        rt.set_controller(Box::new(ConsoleController::stdio()));
    }

    match env::args().nth(1) {
        Some(path) => run_file(&mut rt, Path::new(&path)),
        None => repl(&mut rt),
    }
}

fn repl(rt: &mut Runtime) -> Result<(), Box<dyn Error>> {
    let stdin = io::stdin();
    let mut line = String::new();
    loop {
        print!("> ");
        io::stdout().flush()?;

        line.clear();
        if stdin.read_line(&mut line)? == 0 {
            return Ok(());
        }

        match line.trim() {
            ":gc" => match rt.gc() {
                Ok(collection) => println!(
                    "collected {} nodes, {} remain",
                    collection.freed(),
                    collection.after
                ),
                Err(err) => debug::log_error(err.to_string()),
            },
            ":dump" => println!("{}", rt),
            input => {
                if let Some(name) = input.strip_prefix(":import ") {
                    if let Err(err) = rt.import(name.trim()) {
                        debug::log_error(err.to_string());
                    }
                    continue;
                }
                if let Err(err) = echo(rt, input) {
                    debug::log_error(err.to_string());
                    if err.is_fatal() {
                        return Err(err.into());
                    }
                }
            }
        }
    }
}

fn run_file(rt: &mut Runtime, path: &Path) -> Result<(), Box<dyn Error>> {
    let contents = fs::read_to_string(path)?;
    echo(rt, &contents)?;
    Ok(())
}

/// Reads every datum in `source` and prints it back.
fn echo(rt: &mut Runtime, source: &str) -> Result<(), RuntimeError> {
    let mut reader = Reader::new(source);
    loop {
        let datum = match rt.read(&mut reader) {
            Ok(datum) => datum,
            Err(RuntimeError::EndOfInput) => return Ok(()),
            Err(err) => return Err(err),
        };
        println!("{}", rt.display(datum));
        rt.evaluated("read", false)?;
        rt.pop()?;
    }
}
