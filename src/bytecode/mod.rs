//! Bytecode module for the NotC VM.
//!
//! # Architecture
//!
//! - `buffer`: Doubling growth buffer backing chunks and constant pools
//! - `value`: Tagged runtime values and the truthiness policy
//! - `instruction`: OpCode definitions for the bytecode instruction set
//! - `chunk`: Bytecode chunks containing instructions, lines and constants
//! - `assembler`: Text front end that builds chunks
//! - `disassembler`: Debug output for bytecode inspection
//! - `vm`: Stack-based virtual machine for executing bytecode

pub mod assembler;
pub mod buffer;
pub mod chunk;
pub mod disassembler;
pub mod instruction;
pub mod value;
pub mod vm;

pub use assembler::assemble;
pub use buffer::{grow_capacity, Buffer};
pub use chunk::Chunk;
pub use disassembler::{disassemble_chunk, disassemble_instruction, print_disassembly};
pub use instruction::OpCode;
pub use value::{values_equal, Value, ValueType};
pub use vm::{InterpretResult, STACK_MAX, VM};
