//! Bytecode disassembler for debugging.

use std::fmt::Write;

use colored::Colorize;

use crate::bytecode::chunk::Chunk;
use crate::bytecode::instruction::OpCode;

/// Disassemble a whole chunk under a `== name ==` header.
pub fn disassemble_chunk(chunk: &Chunk, name: &str) -> String {
    let mut output = String::new();
    writeln!(&mut output, "== {} ==", name).unwrap();

    let mut offset = 0;
    while offset < chunk.len() {
        offset = disassemble_instruction(chunk, offset, &mut output);
    }

    output
}

/// Disassemble a single instruction and return the offset of the next one.
///
/// Unknown opcodes are reported and skipped one byte at a time so a damaged
/// stream can still be inspected.
pub fn disassemble_instruction(chunk: &Chunk, offset: usize, output: &mut String) -> usize {
    // Print offset
    write!(output, "{:04} ", offset).unwrap();

    if offset >= chunk.len() {
        writeln!(output, "<end of code>").unwrap();
        return chunk.len();
    }

    // Print line number (or | if same as previous)
    let line = chunk.line_at(offset);
    if offset > 0 && line == chunk.line_at(offset - 1) {
        write!(output, "   | ").unwrap();
    } else {
        write!(output, "{:4} ", line).unwrap();
    }

    let byte = chunk.code[offset];
    let opcode = match OpCode::from_u8(byte) {
        Some(op) => op,
        None => {
            writeln!(output, "Unknown opcode {}", byte).unwrap();
            return offset + 1;
        }
    };

    let next = offset + 1 + opcode.operand_size();
    if next > chunk.len() {
        writeln!(output, "{} <truncated>", opcode.mnemonic()).unwrap();
        return chunk.len();
    }

    match opcode {
        OpCode::Constant => {
            let index = chunk.code[offset + 1] as usize;
            constant_instruction(opcode, chunk, index, output);
        }
        OpCode::ConstantLong => {
            let index = chunk.read_u24(offset + 1);
            constant_instruction(opcode, chunk, index, output);
        }
        OpCode::Null
        | OpCode::True
        | OpCode::False
        | OpCode::Equal
        | OpCode::Greater
        | OpCode::Less
        | OpCode::Add
        | OpCode::Subtract
        | OpCode::Multiply
        | OpCode::Divide
        | OpCode::Not
        | OpCode::Negate
        | OpCode::Return => {
            writeln!(output, "{}", opcode.mnemonic()).unwrap();
        }
    }

    next
}

fn constant_instruction(opcode: OpCode, chunk: &Chunk, index: usize, output: &mut String) {
    let rendered = match chunk.constants.get(index) {
        Some(value) => value.to_string(),
        None => "???".to_string(),
    };
    writeln!(output, "{:<16} {:4} '{}'", opcode.mnemonic(), index, rendered).unwrap();
}

/// Print disassembly to stdout with a highlighted header.
pub fn print_disassembly(chunk: &Chunk, name: &str) {
    println!("{}", format!("== {} ==", name).bold());

    let mut output = String::new();
    let mut offset = 0;
    while offset < chunk.len() {
        offset = disassemble_instruction(chunk, offset, &mut output);
    }
    print!("{}", output);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bytecode::value::Value;
    use pretty_assertions::assert_eq;

    fn test_chunk() -> Chunk {
        let mut chunk = Chunk::new();
        chunk.write_constant(Value::Number(1.2), 123).unwrap();
        chunk.write_constant(Value::Number(3.4), 123).unwrap();
        chunk.write_op(OpCode::Add, 123);
        chunk.write_constant(Value::Number(5.6), 123).unwrap();
        chunk.write_op(OpCode::Divide, 123);
        chunk.write_op(OpCode::Negate, 123);
        chunk.write_op(OpCode::Return, 124);
        chunk
    }

    #[test]
    fn test_disassemble_chunk_format() {
        let output = disassemble_chunk(&test_chunk(), "test chunk");
        let expected = "\
== test chunk ==
0000  123 OP_CONSTANT         0 '1.2'
0002    | OP_CONSTANT         1 '3.4'
0004    | OP_ADD
0005    | OP_CONSTANT         2 '5.6'
0007    | OP_DIVIDE
0008    | OP_NEGATE
0009  124 OP_RETURN
";
        assert_eq!(output, expected);
    }

    #[test]
    fn test_long_constant_line() {
        let mut chunk = Chunk::new();
        for i in 0..256 {
            chunk.add_constant(Value::Number(i as f64));
        }
        chunk.write_constant(Value::Bool(true), 9).unwrap();

        let mut output = String::new();
        let next = disassemble_instruction(&chunk, 0, &mut output);
        assert_eq!(next, 4);
        assert_eq!(output, "0000    9 OP_CONSTANT_LONG  256 'true'\n");
    }

    #[test]
    fn test_offsets_cover_code_exactly() {
        let mut chunk = Chunk::new();
        for i in 0..300 {
            chunk.write_constant(Value::Number(i as f64), (i / 10) as u32).unwrap();
            if i % 3 == 0 {
                chunk.write_op(OpCode::Not, (i / 10) as u32);
            }
        }
        chunk.write_op(OpCode::Return, 99);

        let mut output = String::new();
        let mut offset = 0;
        let mut instructions = 0;
        while offset < chunk.len() {
            let next = disassemble_instruction(&chunk, offset, &mut output);
            assert!(next > offset);
            offset = next;
            instructions += 1;
        }
        assert_eq!(offset, chunk.len());
        assert_eq!(instructions, 300 + 100 + 1);
        assert_eq!(output.lines().count(), instructions);
    }

    #[test]
    fn test_unknown_opcode_skips_one_byte() {
        let mut chunk = Chunk::new();
        chunk.write_byte(250, 1);
        chunk.write_op(OpCode::Return, 1);

        let mut output = String::new();
        assert_eq!(disassemble_instruction(&chunk, 0, &mut output), 1);
        assert_eq!(disassemble_instruction(&chunk, 1, &mut output), 2);
        assert_eq!(output, "0000    1 Unknown opcode 250\n0001    | OP_RETURN\n");
    }

    #[test]
    fn test_offset_past_end_is_reported() {
        let mut chunk = Chunk::new();
        chunk.write_op(OpCode::Return, 1);

        let mut output = String::new();
        assert_eq!(disassemble_instruction(&chunk, 1, &mut output), 1);
        assert_eq!(disassemble_instruction(&chunk, 40, &mut output), 1);
        assert_eq!(disassemble_instruction(&Chunk::new(), 0, &mut output), 0);
        assert_eq!(
            output,
            "0001 <end of code>\n0040 <end of code>\n0000 <end of code>\n"
        );
    }

    #[test]
    fn test_truncated_and_dangling_constants() {
        let mut chunk = Chunk::new();
        chunk.write_op(OpCode::Constant, 1);
        chunk.write_byte(5, 1);
        chunk.write_op(OpCode::ConstantLong, 2);
        chunk.write_byte(0, 2);

        let output = disassemble_chunk(&chunk, "broken");
        assert_eq!(
            output,
            "== broken ==\n\
             0000    1 OP_CONSTANT         5 '???'\n\
             0002    2 OP_CONSTANT_LONG <truncated>\n"
        );
    }
}
