//! NotC: a stack-based bytecode virtual machine.
//!
//! This is the library root that exports all modules.
//!
//! Chunks come from an external producer: the [`bytecode::assemble`] text
//! front end, a serialized `.json` chunk, or direct construction through the
//! [`bytecode::Chunk`] builder methods. The [`bytecode::VM`] executes them.

#![allow(clippy::result_large_err)]

pub mod bytecode;
pub mod config;
pub mod error;

use std::path::Path;

use bytecode::{Chunk, Value, VM};
use config::VmConfig;
use error::{CompileError, NotcError};

/// Name printed above disassembly of the built-in demo chunk.
pub const DEMO_NAME: &str = "test chunk";

/// Options for running a chunk.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct RunOptions {
    /// Trace every dispatch to stderr.
    pub trace: bool,
    /// Print the disassembly before running.
    pub disassemble: bool,
}

/// Assemble and run source text.
pub fn run_source(source: &str) -> Result<Value, NotcError> {
    run_source_with_options(source, RunOptions::default())
}

/// Assemble and run source text with explicit options.
pub fn run_source_with_options(source: &str, options: RunOptions) -> Result<Value, NotcError> {
    let chunk = bytecode::assemble(source)?;
    run_chunk(&chunk, "<source>", options)
}

/// Run a finished chunk on a fresh VM writing to stdout/stderr.
pub fn run_chunk(chunk: &Chunk, name: &str, options: RunOptions) -> Result<Value, NotcError> {
    if options.disassemble {
        bytecode::print_disassembly(chunk, name);
        println!("---");
    }

    let config = VmConfig::from_env();
    let config = config.with_trace(config.trace_execution || options.trace);
    let mut vm = VM::with_config(config);
    Ok(vm.interpret(chunk)?)
}

/// Load a chunk from a file.
///
/// `.json` files hold a serialized chunk and are verified before use; any
/// other file is treated as assembly text.
pub fn load_chunk(path: &Path) -> Result<Chunk, NotcError> {
    let source = std::fs::read_to_string(path)?;

    let is_json = path
        .extension()
        .map(|ext| ext.eq_ignore_ascii_case("json"))
        .unwrap_or(false);
    if is_json {
        let chunk: Chunk = serde_json::from_str(&source)
            .map_err(|e| CompileError::invalid_chunk(e.to_string()))?;
        chunk.verify()?;
        Ok(chunk)
    } else {
        Ok(bytecode::assemble(&source)?)
    }
}

/// Serialize a chunk to the pretty-printed JSON chunk format read by
/// [`load_chunk`].
pub fn chunk_to_json(chunk: &Chunk) -> Result<String, NotcError> {
    serde_json::to_string_pretty(chunk)
        .map_err(|e| NotcError::from(CompileError::invalid_chunk(e.to_string())))
}

/// Load and run a chunk file.
pub fn run_file(path: &Path, options: RunOptions) -> Result<Value, NotcError> {
    let chunk = load_chunk(path)?;
    run_chunk(&chunk, &path.display().to_string(), options)
}

/// The classic demo: `-((1.2 + 3.4) / 5.6)` on line 123.
pub fn demo_chunk() -> Result<Chunk, CompileError> {
    use bytecode::OpCode;

    let mut chunk = Chunk::new();
    chunk.write_constant(Value::Number(1.2), 123)?;
    chunk.write_constant(Value::Number(3.4), 123)?;
    chunk.write_op(OpCode::Add, 123);
    chunk.write_constant(Value::Number(5.6), 123)?;
    chunk.write_op(OpCode::Divide, 123);
    chunk.write_op(OpCode::Negate, 123);
    chunk.write_op(OpCode::Return, 123);
    Ok(chunk)
}
