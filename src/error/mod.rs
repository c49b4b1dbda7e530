//! Error types for assembling, loading and executing chunks.

use thiserror::Error;

use crate::bytecode::value::ValueType;

/// Exit code for a chunk source that could not be read.
pub const EXIT_IO: i32 = 74;
/// Exit code for a chunk that was rejected before execution.
pub const EXIT_COMPILE: i32 = 65;
/// Exit code for a chunk that failed while running.
pub const EXIT_RUNTIME: i32 = 70;

/// Errors from reading a value through the wrong accessor.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ValueError {
    #[error("Type mismatch: expected {expected}, found {found}")]
    TypeMismatch {
        expected: ValueType,
        found: ValueType,
    },
}

impl ValueError {
    pub fn type_mismatch(expected: ValueType, found: ValueType) -> Self {
        Self::TypeMismatch { expected, found }
    }
}

/// Errors that reject a chunk before it runs.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum CompileError {
    #[error("Unknown instruction '{mnemonic}' at line {line}")]
    UnknownMnemonic { mnemonic: String, line: u32 },

    #[error("'{mnemonic}' expects an operand at line {line}")]
    MissingOperand { mnemonic: String, line: u32 },

    #[error("'{mnemonic}' takes no operand, found '{operand}' at line {line}")]
    UnexpectedOperand {
        mnemonic: String,
        operand: String,
        line: u32,
    },

    #[error("Invalid literal '{literal}' at line {line}")]
    InvalidLiteral { literal: String, line: u32 },

    #[error("Too many constants in one chunk at line {line}")]
    TooManyConstants { line: u32 },

    #[error("Invalid chunk: {message}")]
    InvalidChunk { message: String },
}

impl CompileError {
    pub fn invalid_chunk(message: impl Into<String>) -> Self {
        Self::InvalidChunk {
            message: message.into(),
        }
    }

    pub fn line(&self) -> Option<u32> {
        match self {
            Self::UnknownMnemonic { line, .. } => Some(*line),
            Self::MissingOperand { line, .. } => Some(*line),
            Self::UnexpectedOperand { line, .. } => Some(*line),
            Self::InvalidLiteral { line, .. } => Some(*line),
            Self::TooManyConstants { line } => Some(*line),
            Self::InvalidChunk { .. } => None,
        }
    }
}

/// Runtime errors. Each one ends the current `interpret` call.
#[derive(Debug, Error)]
pub enum RuntimeError {
    #[error("{message}\n[line {line}] in script")]
    TypeError { message: String, line: u32 },

    #[error("Stack overflow.\n[line {line}] in script")]
    StackOverflow { line: u32 },

    #[error("Stack underflow.\n[line {line}] in script")]
    StackUnderflow { line: u32 },

    #[error("Invalid opcode {opcode}.\n[line {line}] in script")]
    InvalidOpcode { opcode: u8, line: u32 },

    #[error("Invalid constant index {index}.\n[line {line}] in script")]
    InvalidConstant { index: usize, line: u32 },

    #[error("Unexpected end of bytecode.\n[line {line}] in script")]
    UnexpectedEnd { line: u32 },

    #[error("Failed to write VM output: {0}")]
    Io(#[from] std::io::Error),
}

impl RuntimeError {
    pub fn type_error(message: impl Into<String>, line: u32) -> Self {
        Self::TypeError {
            message: message.into(),
            line,
        }
    }

    pub fn line(&self) -> Option<u32> {
        match self {
            Self::TypeError { line, .. } => Some(*line),
            Self::StackOverflow { line } => Some(*line),
            Self::StackUnderflow { line } => Some(*line),
            Self::InvalidOpcode { line, .. } => Some(*line),
            Self::InvalidConstant { line, .. } => Some(*line),
            Self::UnexpectedEnd { line } => Some(*line),
            Self::Io(_) => None,
        }
    }
}

/// A unified error type for loading and running chunks.
#[derive(Debug, Error)]
pub enum NotcError {
    #[error("Compile error: {0}")]
    Compile(#[from] CompileError),

    #[error("Runtime error: {0}")]
    Runtime(#[from] RuntimeError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl NotcError {
    /// Process exit code a hosting CLI reports for this error.
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::Compile(_) => EXIT_COMPILE,
            Self::Runtime(_) => EXIT_RUNTIME,
            Self::Io(_) => EXIT_IO,
        }
    }
}
