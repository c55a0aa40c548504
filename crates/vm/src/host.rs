//! Host interface: program loading, output, and native functions.

use std::collections::HashMap;
use std::fs;
use std::io::{self, Write};

use krait_common::Value;

use crate::error::RuntimeError;

/// Signature for a registered native function.
pub type NativeFn = fn(&[Value]) -> Result<Value, RuntimeError>;

/// Everything the evaluator needs from its embedder.
///
/// EXFILE loads sibling programs through [`Host::load`], PRINTV writes
/// through [`Host::write_line`], and NFCALL dispatches through
/// [`Host::call_native`].
pub trait Host {
    /// Read the raw bytes of an encoded program by path.
    fn load(&self, path: &str) -> io::Result<Vec<u8>>;

    /// Write one line of program output.
    fn write_line(&mut self, line: &str) -> io::Result<()>;

    /// Invoke a registered native function.
    fn call_native(
        &mut self,
        module: &str,
        name: &str,
        args: &[Value],
    ) -> Result<Value, RuntimeError>;
}

fn native_key(module: &str, name: &str) -> String {
    format!("{module}::{name}")
}

fn dispatch(
    natives: &HashMap<String, NativeFn>,
    module: &str,
    name: &str,
    args: &[Value],
) -> Result<Value, RuntimeError> {
    match natives.get(&native_key(module, name)) {
        Some(f) => f(args),
        None => Err(RuntimeError::UnknownNative {
            module: module.to_string(),
            name: name.to_string(),
        }),
    }
}

/// Host backed by the filesystem and standard output.
#[derive(Default)]
pub struct StdHost {
    natives: HashMap<String, NativeFn>,
}

impl StdHost {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a native function reachable as `module::name`.
    pub fn register(&mut self, module: &str, name: &str, f: NativeFn) {
        self.natives.insert(native_key(module, name), f);
    }
}

impl Host for StdHost {
    fn load(&self, path: &str) -> io::Result<Vec<u8>> {
        fs::read(path)
    }

    fn write_line(&mut self, line: &str) -> io::Result<()> {
        let mut out = io::stdout().lock();
        out.write_all(line.as_bytes())?;
        out.write_all(b"\n")
    }

    fn call_native(
        &mut self,
        module: &str,
        name: &str,
        args: &[Value],
    ) -> Result<Value, RuntimeError> {
        dispatch(&self.natives, module, name, args)
    }
}

/// In-memory host: programs come from a map, output is captured.
///
/// Useful in tests and embedding experiments where touching the real
/// filesystem is unwanted.
#[derive(Default)]
pub struct MemoryHost {
    programs: HashMap<String, Vec<u8>>,
    natives: HashMap<String, NativeFn>,
    /// Lines printed by the program, in order.
    pub lines: Vec<String>,
}

impl MemoryHost {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make `path` loadable with the given encoded program.
    pub fn insert_program(&mut self, path: &str, bytes: Vec<u8>) {
        self.programs.insert(path.to_string(), bytes);
    }

    /// Register a native function reachable as `module::name`.
    pub fn register(&mut self, module: &str, name: &str, f: NativeFn) {
        self.natives.insert(native_key(module, name), f);
    }
}

impl Host for MemoryHost {
    fn load(&self, path: &str) -> io::Result<Vec<u8>> {
        self.programs.get(path).cloned().ok_or_else(|| {
            io::Error::new(io::ErrorKind::NotFound, format!("no program at '{path}'"))
        })
    }

    fn write_line(&mut self, line: &str) -> io::Result<()> {
        self.lines.push(line.to_string());
        Ok(())
    }

    fn call_native(
        &mut self,
        module: &str,
        name: &str,
        args: &[Value],
    ) -> Result<Value, RuntimeError> {
        dispatch(&self.natives, module, name, args)
    }
}
