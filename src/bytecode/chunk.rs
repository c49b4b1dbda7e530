//! Bytecode chunk containing instructions, line info and constants.

use serde::{Deserialize, Serialize};

use crate::bytecode::buffer::Buffer;
use crate::bytecode::instruction::OpCode;
use crate::bytecode::value::Value;
use crate::error::CompileError;

/// Number of constants addressable by the 1-byte short form.
pub const SHORT_CONSTANT_LIMIT: usize = 256;

/// Number of constants addressable by the 3-byte long form.
pub const MAX_CONSTANTS: usize = 1 << 24;

/// A chunk of bytecode containing instructions and metadata.
///
/// `code` and `lines` are co-indexed: every byte of code records the source
/// line it was emitted for.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Chunk {
    /// Opcodes interleaved with their operand bytes.
    pub code: Buffer<u8>,
    /// Line information for debugging (offset -> line number).
    pub lines: Buffer<u32>,
    /// The constant pool. Append-only, so indices stay stable.
    pub constants: Buffer<Value>,
}

impl Chunk {
    pub fn new() -> Self {
        Self {
            code: Buffer::new(),
            lines: Buffer::new(),
            constants: Buffer::new(),
        }
    }

    /// Write an opcode to the chunk.
    pub fn write_op(&mut self, op: OpCode, line: u32) {
        self.write_byte(op.into(), line);
    }

    /// Write a raw byte to the chunk.
    pub fn write_byte(&mut self, byte: u8, line: u32) {
        self.code.push(byte);
        self.lines.push(line);
    }

    /// Add a constant to the pool and return its index.
    pub fn add_constant(&mut self, value: Value) -> usize {
        self.constants.push(value);
        self.constants.len() - 1
    }

    /// Add a constant and emit the instruction that loads it.
    ///
    /// Indices below 256 use `CONSTANT <u8>`, larger ones use
    /// `CONSTANT_LONG <u24>` in little-endian order.
    pub fn write_constant(&mut self, value: Value, line: u32) -> Result<usize, CompileError> {
        if self.constants.len() >= MAX_CONSTANTS {
            return Err(CompileError::TooManyConstants { line });
        }

        let index = self.add_constant(value);
        if index < SHORT_CONSTANT_LIMIT {
            self.write_op(OpCode::Constant, line);
            self.write_byte(index as u8, line);
        } else {
            self.write_op(OpCode::ConstantLong, line);
            self.write_byte((index & 0xff) as u8, line);
            self.write_byte(((index >> 8) & 0xff) as u8, line);
            self.write_byte(((index >> 16) & 0xff) as u8, line);
        }
        Ok(index)
    }

    /// Read a 24-bit little-endian value from the chunk at offset.
    pub fn read_u24(&self, offset: usize) -> usize {
        let lo = self.code[offset] as usize;
        let mid = self.code[offset + 1] as usize;
        let hi = self.code[offset + 2] as usize;
        lo | (mid << 8) | (hi << 16)
    }

    /// Get the line number at a given offset.
    pub fn line_at(&self, offset: usize) -> u32 {
        self.lines.get(offset).copied().unwrap_or(0)
    }

    /// Number of code bytes.
    pub fn len(&self) -> usize {
        self.code.len()
    }

    pub fn is_empty(&self) -> bool {
        self.code.is_empty()
    }

    /// Release the code, line and constant storage.
    pub fn clear(&mut self) {
        self.code.clear();
        self.lines.clear();
        self.constants.clear();
    }

    /// Check the structure of a chunk that did not come from the builder
    /// methods: co-indexed lines, known opcodes, complete operands and
    /// constant indices inside the pool.
    pub fn verify(&self) -> Result<(), CompileError> {
        if self.code.len() != self.lines.len() {
            return Err(CompileError::invalid_chunk(format!(
                "{} code bytes but {} line entries",
                self.code.len(),
                self.lines.len()
            )));
        }

        let mut offset = 0;
        while offset < self.code.len() {
            let byte = self.code[offset];
            let op = OpCode::from_u8(byte).ok_or_else(|| {
                CompileError::invalid_chunk(format!("unknown opcode {} at offset {}", byte, offset))
            })?;

            let next = offset + 1 + op.operand_size();
            if next > self.code.len() {
                return Err(CompileError::invalid_chunk(format!(
                    "truncated {} at offset {}",
                    op.mnemonic(),
                    offset
                )));
            }

            let index = match op {
                OpCode::Constant => Some(self.code[offset + 1] as usize),
                OpCode::ConstantLong => Some(self.read_u24(offset + 1)),
                _ => None,
            };
            if let Some(index) = index.filter(|i| *i >= self.constants.len()) {
                return Err(CompileError::invalid_chunk(format!(
                    "constant {} out of range at offset {} (pool has {})",
                    index,
                    offset,
                    self.constants.len()
                )));
            }

            offset = next;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_chunk_basics() {
        let mut chunk = Chunk::new();
        chunk.write_constant(Value::Number(1.5), 1).unwrap();
        chunk.write_op(OpCode::Return, 2);

        assert_eq!(chunk.len(), 3);
        assert_eq!(chunk.code[0], OpCode::Constant as u8);
        assert_eq!(chunk.code[1], 0);
        assert_eq!(chunk.code[2], OpCode::Return as u8);
        assert_eq!(chunk.lines.as_slice(), &[1, 1, 2]);
        assert_eq!(chunk.line_at(2), 2);
        assert_eq!(chunk.line_at(99), 0);
    }

    #[test]
    fn test_constant_pool_is_append_only() {
        let mut chunk = Chunk::new();
        let a = chunk.add_constant(Value::Number(42.0));
        let b = chunk.add_constant(Value::Number(42.0));
        let c = chunk.add_constant(Value::Null);

        assert_eq!((a, b, c), (0, 1, 2));
        assert_eq!(chunk.constants[1], Value::Number(42.0));
        // Adding a constant alone emits no code.
        assert!(chunk.is_empty());
    }

    #[test]
    fn test_short_form_up_to_index_255() {
        let mut chunk = Chunk::new();
        for i in 0..255 {
            chunk.add_constant(Value::Number(i as f64));
        }

        let index = chunk.write_constant(Value::Number(255.0), 7).unwrap();
        assert_eq!(index, 255);
        assert_eq!(chunk.code.as_slice(), &[OpCode::Constant as u8, 255]);
    }

    #[test]
    fn test_long_form_from_index_256() {
        let mut chunk = Chunk::new();
        for i in 0..256 {
            chunk.add_constant(Value::Number(i as f64));
        }

        let index = chunk.write_constant(Value::Number(256.0), 7).unwrap();
        assert_eq!(index, 256);
        assert_eq!(
            chunk.code.as_slice(),
            &[OpCode::ConstantLong as u8, 0x00, 0x01, 0x00]
        );
        assert_eq!(chunk.read_u24(1), 256);
        assert_eq!(chunk.lines.as_slice(), &[7, 7, 7, 7]);
    }

    #[test]
    fn test_write_constant_switches_form_at_boundary() {
        let mut chunk = Chunk::new();
        for i in 0..300 {
            chunk.write_constant(Value::Number(i as f64), 1).unwrap();
        }

        // 256 short loads (2 bytes) followed by 44 long loads (4 bytes).
        assert_eq!(chunk.len(), 256 * 2 + 44 * 4);
        assert_eq!(chunk.code[255 * 2], OpCode::Constant as u8);
        assert_eq!(chunk.code[255 * 2 + 1], 255);
        assert_eq!(chunk.code[256 * 2], OpCode::ConstantLong as u8);
        assert_eq!(chunk.read_u24(256 * 2 + 1), 256);
    }

    #[test]
    fn test_read_u24_little_endian() {
        let mut chunk = Chunk::new();
        for byte in [0x56, 0x34, 0x12] {
            chunk.write_byte(byte, 1);
        }
        assert_eq!(chunk.read_u24(0), 0x12_3456);
    }

    #[test]
    fn test_clear_releases_everything() {
        let mut chunk = Chunk::new();
        chunk.write_constant(Value::Bool(true), 1).unwrap();
        chunk.clear();

        assert!(chunk.is_empty());
        assert!(chunk.lines.is_empty());
        assert!(chunk.constants.is_empty());
        assert_eq!(chunk.code.capacity(), 0);
    }

    #[test]
    fn test_verify_accepts_builder_output() {
        let mut chunk = Chunk::new();
        for i in 0..260 {
            chunk.write_constant(Value::Number(i as f64), 1).unwrap();
        }
        chunk.write_op(OpCode::Return, 2);
        assert!(chunk.verify().is_ok());
    }

    #[test]
    fn test_verify_rejects_malformed_chunks() {
        let mut chunk = Chunk::new();
        chunk.write_byte(200, 1);
        assert!(chunk.verify().is_err());

        let mut chunk = Chunk::new();
        chunk.write_op(OpCode::ConstantLong, 1);
        chunk.write_byte(0, 1);
        assert!(chunk.verify().is_err());

        let mut chunk = Chunk::new();
        chunk.write_op(OpCode::Constant, 1);
        chunk.write_byte(0, 1);
        let err = chunk.verify().unwrap_err();
        assert!(err.to_string().contains("out of range"));

        let mut chunk = Chunk::new();
        chunk.write_op(OpCode::Return, 1);
        chunk.lines.push(1);
        assert!(chunk.verify().is_err());
    }

    #[test]
    fn test_chunk_json_shape() {
        let mut chunk = Chunk::new();
        chunk.write_constant(Value::Number(1.5), 3).unwrap();
        chunk.write_op(OpCode::Null, 3);
        chunk.write_op(OpCode::Return, 4);

        let json = serde_json::to_string(&chunk).unwrap();
        assert_eq!(
            json,
            r#"{"code":[0,0,2,14],"lines":[3,3,3,4],"constants":[{"Number":1.5}]}"#
        );

        let back: Chunk = serde_json::from_str(&json).unwrap();
        assert_eq!(back, chunk);
    }

    #[test]
    fn test_non_finite_constants_survive_json() {
        let mut chunk = Chunk::new();
        chunk.write_constant(Value::Number(f64::INFINITY), 1).unwrap();
        chunk.write_constant(Value::Number(f64::NEG_INFINITY), 1).unwrap();
        chunk.write_constant(Value::Number(f64::NAN), 1).unwrap();
        chunk.write_op(OpCode::Return, 2);

        let json = serde_json::to_string(&chunk).unwrap();
        assert!(json.contains(
            r#""constants":[{"Number":"inf"},{"Number":"-inf"},{"Number":"NaN"}]"#
        ));

        let back: Chunk = serde_json::from_str(&json).unwrap();
        assert!(back.verify().is_ok());
        assert_eq!(back.code, chunk.code);
        assert_eq!(back.constants[0], Value::Number(f64::INFINITY));
        assert_eq!(back.constants[1], Value::Number(f64::NEG_INFINITY));
        assert!(back.constants[2].as_number().unwrap().is_nan());

        let bad = r#"{"code":[0,0,14],"lines":[1,1,1],"constants":[{"Number":"lots"}]}"#;
        assert!(serde_json::from_str::<Chunk>(bad).is_err());
    }
}
