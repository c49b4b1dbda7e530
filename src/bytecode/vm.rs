//! Stack-based virtual machine for executing bytecode.

use std::fmt::Write as _;
use std::io::{self, Write};

use crate::bytecode::chunk::Chunk;
use crate::bytecode::disassembler::disassemble_instruction;
use crate::bytecode::instruction::OpCode;
use crate::bytecode::value::{values_equal, Value};
use crate::config::VmConfig;
use crate::error::{NotcError, RuntimeError, EXIT_COMPILE, EXIT_RUNTIME};

/// Maximum stack size.
pub const STACK_MAX: usize = 256;

/// Result type for VM operations.
pub type VMResult<T> = Result<T, RuntimeError>;

/// Outcome of running a chunk, as reported to a host.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InterpretResult {
    Ok,
    CompileError,
    RuntimeError,
}

impl InterpretResult {
    pub fn from_result<T>(result: &Result<T, NotcError>) -> Self {
        match result {
            Ok(_) => InterpretResult::Ok,
            Err(NotcError::Compile(_)) => InterpretResult::CompileError,
            Err(NotcError::Runtime(_)) => InterpretResult::RuntimeError,
            // Unreadable sources are rejected before anything compiles.
            Err(NotcError::Io(_)) => InterpretResult::CompileError,
        }
    }

    /// Process exit code for this outcome.
    pub fn exit_code(self) -> i32 {
        match self {
            InterpretResult::Ok => 0,
            InterpretResult::CompileError => EXIT_COMPILE,
            InterpretResult::RuntimeError => EXIT_RUNTIME,
        }
    }
}

/// Fixed-capacity operand stack with a top cursor.
struct Stack {
    slots: [Value; STACK_MAX],
    top: usize,
}

impl Stack {
    fn new() -> Self {
        Self {
            slots: [Value::Null; STACK_MAX],
            top: 0,
        }
    }

    fn push(&mut self, value: Value) -> Option<()> {
        let slot = self.slots.get_mut(self.top)?;
        *slot = value;
        self.top += 1;
        Some(())
    }

    fn pop(&mut self) -> Option<Value> {
        self.top = self.top.checked_sub(1)?;
        Some(self.slots[self.top])
    }

    fn peek(&self, distance: usize) -> Option<&Value> {
        let index = self.top.checked_sub(1 + distance)?;
        self.slots.get(index)
    }

    fn reset(&mut self) {
        self.top = 0;
    }

    fn as_slice(&self) -> &[Value] {
        &self.slots[..self.top]
    }
}

/// The bytecode VM.
///
/// Results of `return` are written to the output sink; traces and runtime
/// error reports go to the diagnostic sink.
pub struct VM<O: Write = io::Stdout, D: Write = io::Stderr> {
    stack: Stack,
    /// Offset of the next byte to read in the executing chunk.
    ip: usize,
    config: VmConfig,
    output: O,
    diagnostics: D,
}

impl VM {
    /// Create a new VM writing to stdout and stderr.
    pub fn new() -> Self {
        Self::with_config(VmConfig::default())
    }

    pub fn with_config(config: VmConfig) -> Self {
        VM::with_sinks(config, io::stdout(), io::stderr())
    }
}

impl Default for VM {
    fn default() -> Self {
        Self::new()
    }
}

impl<O: Write, D: Write> VM<O, D> {
    /// Create a VM with explicit output and diagnostic sinks.
    pub fn with_sinks(config: VmConfig, output: O, diagnostics: D) -> Self {
        Self {
            stack: Stack::new(),
            ip: 0,
            config,
            output,
            diagnostics,
        }
    }

    pub fn config(&self) -> VmConfig {
        self.config
    }

    pub fn set_trace_execution(&mut self, trace_execution: bool) {
        self.config.trace_execution = trace_execution;
    }

    /// Current stack contents, bottom first.
    pub fn stack(&self) -> &[Value] {
        self.stack.as_slice()
    }

    pub fn output(&self) -> &O {
        &self.output
    }

    pub fn diagnostics(&self) -> &D {
        &self.diagnostics
    }

    pub fn into_sinks(self) -> (O, D) {
        (self.output, self.diagnostics)
    }

    /// Run a chunk until it returns or fails.
    ///
    /// On failure the error is reported to the diagnostic sink and the stack
    /// is emptied before the error is handed back.
    pub fn interpret(&mut self, chunk: &Chunk) -> VMResult<Value> {
        self.ip = 0;
        self.stack.reset();

        let result = self.execute(chunk);
        if let Err(err) = &result {
            // A failing diagnostic sink must not mask the runtime error.
            let _ = writeln!(self.diagnostics, "{}", err);
            self.stack.reset();
        }
        result
    }

    /// Main execution loop.
    fn execute(&mut self, chunk: &Chunk) -> VMResult<Value> {
        loop {
            if self.config.trace_execution {
                self.trace(chunk);
            }

            let byte = self.read_byte(chunk)?;
            let opcode = OpCode::from_u8(byte).ok_or_else(|| RuntimeError::InvalidOpcode {
                opcode: byte,
                line: self.current_line(chunk),
            })?;

            match opcode {
                OpCode::Constant => {
                    let index = self.read_byte(chunk)? as usize;
                    let value = self.read_constant(chunk, index)?;
                    self.push(chunk, value)?;
                }
                OpCode::ConstantLong => {
                    let index = self.read_u24(chunk)?;
                    let value = self.read_constant(chunk, index)?;
                    self.push(chunk, value)?;
                }

                OpCode::Null => self.push(chunk, Value::Null)?,
                OpCode::True => self.push(chunk, Value::Bool(true))?,
                OpCode::False => self.push(chunk, Value::Bool(false))?,

                OpCode::Equal => {
                    let b = self.pop(chunk)?;
                    let a = self.pop(chunk)?;
                    self.push(chunk, Value::Bool(values_equal(&a, &b)))?;
                }
                OpCode::Greater => self.binary_op(chunk, |a, b| Value::Bool(a > b))?,
                OpCode::Less => self.binary_op(chunk, |a, b| Value::Bool(a < b))?,

                OpCode::Add => self.binary_op(chunk, |a, b| Value::Number(a + b))?,
                OpCode::Subtract => self.binary_op(chunk, |a, b| Value::Number(a - b))?,
                OpCode::Multiply => self.binary_op(chunk, |a, b| Value::Number(a * b))?,
                // IEEE-754: x / 0 is ±inf or NaN, never an error.
                OpCode::Divide => self.binary_op(chunk, |a, b| Value::Number(a / b))?,

                OpCode::Not => {
                    let value = self.pop(chunk)?;
                    self.push(chunk, Value::Bool(value.is_falsey()))?;
                }
                OpCode::Negate => {
                    let n = match self.peek(chunk, 0)? {
                        Value::Number(n) => *n,
                        _ => {
                            return Err(RuntimeError::type_error(
                                "Operand must be a number.",
                                self.current_line(chunk),
                            ));
                        }
                    };
                    self.pop(chunk)?;
                    self.push(chunk, Value::Number(-n))?;
                }

                OpCode::Return => {
                    let result = self.pop(chunk)?;
                    writeln!(self.output, "{}", result)?;
                    return Ok(result);
                }
            }
        }
    }

    /// Pop two numbers (right operand first) and push `op(left, right)`.
    fn binary_op<F>(&mut self, chunk: &Chunk, op: F) -> VMResult<()>
    where
        F: FnOnce(f64, f64) -> Value,
    {
        let (a, b) = match (self.peek(chunk, 1)?, self.peek(chunk, 0)?) {
            (Value::Number(a), Value::Number(b)) => (*a, *b),
            _ => {
                return Err(RuntimeError::type_error(
                    "Operands must be numbers.",
                    self.current_line(chunk),
                ));
            }
        };
        self.pop(chunk)?;
        self.pop(chunk)?;
        self.push(chunk, op(a, b))
    }

    /// Write the stack and the next instruction to the diagnostic sink.
    /// Write failures are dropped so tracing never changes a run.
    fn trace(&mut self, chunk: &Chunk) {
        let mut line = String::from("          ");
        for value in self.stack.as_slice() {
            write!(line, "[ {} ]", value).unwrap();
        }
        line.push('\n');

        if self.ip < chunk.len() {
            disassemble_instruction(chunk, self.ip, &mut line);
        }
        let _ = self.diagnostics.write_all(line.as_bytes());
    }

    /// Line of the instruction being executed.
    fn current_line(&self, chunk: &Chunk) -> u32 {
        chunk.line_at(self.ip.saturating_sub(1))
    }

    fn read_byte(&mut self, chunk: &Chunk) -> VMResult<u8> {
        let byte = chunk
            .code
            .get(self.ip)
            .copied()
            .ok_or_else(|| RuntimeError::UnexpectedEnd {
                line: self.current_line(chunk),
            })?;
        self.ip += 1;
        Ok(byte)
    }

    fn read_u24(&mut self, chunk: &Chunk) -> VMResult<usize> {
        let lo = self.read_byte(chunk)? as usize;
        let mid = self.read_byte(chunk)? as usize;
        let hi = self.read_byte(chunk)? as usize;
        Ok(lo | (mid << 8) | (hi << 16))
    }

    fn read_constant(&self, chunk: &Chunk, index: usize) -> VMResult<Value> {
        chunk
            .constants
            .get(index)
            .copied()
            .ok_or_else(|| RuntimeError::InvalidConstant {
                index,
                line: self.current_line(chunk),
            })
    }

    fn push(&mut self, chunk: &Chunk, value: Value) -> VMResult<()> {
        self.stack.push(value).ok_or_else(|| RuntimeError::StackOverflow {
            line: self.current_line(chunk),
        })
    }

    fn pop(&mut self, chunk: &Chunk) -> VMResult<Value> {
        self.stack.pop().ok_or_else(|| RuntimeError::StackUnderflow {
            line: self.current_line(chunk),
        })
    }

    fn peek(&self, chunk: &Chunk, distance: usize) -> VMResult<&Value> {
        self.stack
            .peek(distance)
            .ok_or_else(|| RuntimeError::StackUnderflow {
                line: self.current_line(chunk),
            })
    }
}
