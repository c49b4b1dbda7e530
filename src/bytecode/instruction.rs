//! Bytecode instruction definitions for the NotC VM.

/// Opcodes for the bytecode virtual machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum OpCode {
    // ============ Constants & Literals ============
    /// Load a constant from the pool: CONSTANT <index:u8>
    Constant = 0,
    /// Load a constant from a large pool: CONSTANT_LONG <index:u24 little-endian>
    ConstantLong,
    /// Push null onto the stack
    Null,
    /// Push true onto the stack
    True,
    /// Push false onto the stack
    False,

    // ============ Comparison ============
    /// Equal: a == b (any two values)
    Equal,
    /// Greater than: a > b
    Greater,
    /// Less than: a < b
    Less,

    // ============ Arithmetic ============
    /// Add two numbers: a + b
    Add,
    /// Subtract two numbers: a - b
    Subtract,
    /// Multiply two numbers: a * b
    Multiply,
    /// Divide two numbers: a / b
    Divide,

    // ============ Unary ============
    /// Logical not: !a
    Not,
    /// Negate a number: -a
    Negate,

    // ============ Control Flow ============
    /// Pop the result and stop
    Return,
}

impl OpCode {
    /// Get the number of operand bytes for this opcode.
    pub fn operand_size(self) -> usize {
        match self {
            OpCode::Constant => 1,
            OpCode::ConstantLong => 3,
            _ => 0,
        }
    }

    /// Mnemonic used by the disassembler and accepted by the assembler.
    pub fn mnemonic(self) -> &'static str {
        match self {
            OpCode::Constant => "OP_CONSTANT",
            OpCode::ConstantLong => "OP_CONSTANT_LONG",
            OpCode::Null => "OP_NULL",
            OpCode::True => "OP_TRUE",
            OpCode::False => "OP_FALSE",
            OpCode::Equal => "OP_EQUAL",
            OpCode::Greater => "OP_GREATER",
            OpCode::Less => "OP_LESS",
            OpCode::Add => "OP_ADD",
            OpCode::Subtract => "OP_SUBTRACT",
            OpCode::Multiply => "OP_MULTIPLY",
            OpCode::Divide => "OP_DIVIDE",
            OpCode::Not => "OP_NOT",
            OpCode::Negate => "OP_NEGATE",
            OpCode::Return => "OP_RETURN",
        }
    }

    /// Convert from u8 to OpCode.
    pub fn from_u8(byte: u8) -> Option<OpCode> {
        let op = match byte {
            0 => OpCode::Constant,
            1 => OpCode::ConstantLong,
            2 => OpCode::Null,
            3 => OpCode::True,
            4 => OpCode::False,
            5 => OpCode::Equal,
            6 => OpCode::Greater,
            7 => OpCode::Less,
            8 => OpCode::Add,
            9 => OpCode::Subtract,
            10 => OpCode::Multiply,
            11 => OpCode::Divide,
            12 => OpCode::Not,
            13 => OpCode::Negate,
            14 => OpCode::Return,
            _ => return None,
        };
        Some(op)
    }
}

impl From<OpCode> for u8 {
    fn from(op: OpCode) -> u8 {
        op as u8
    }
}
