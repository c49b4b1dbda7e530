//! Text assembler producing chunks.
//!
//! One instruction per line:
//!
//! ```text
//! ; comment
//! constant 1.2
//! const 3.4        ; `const` and `OP_CONSTANT` are aliases
//! add
//! .line 123        ; record line 123 for everything that follows
//! return
//! ```
//!
//! Without a `.line` directive each instruction records the line of the
//! assembly file it was written on.

use crate::bytecode::chunk::Chunk;
use crate::bytecode::instruction::OpCode;
use crate::bytecode::value::Value;
use crate::error::CompileError;

/// Assemble source text into a chunk.
pub fn assemble(source: &str) -> Result<Chunk, CompileError> {
    let mut chunk = Chunk::new();
    let mut fixed_line: Option<u32> = None;

    for (index, raw) in source.lines().enumerate() {
        let file_line = index as u32 + 1;
        let text = match raw.find(';') {
            Some(pos) => &raw[..pos],
            None => raw,
        };

        let mut words = text.split_whitespace();
        let Some(mnemonic) = words.next() else {
            continue;
        };
        let operand = words.next();
        if let Some(extra) = words.next() {
            return Err(CompileError::UnexpectedOperand {
                mnemonic: mnemonic.to_string(),
                operand: extra.to_string(),
                line: file_line,
            });
        }

        if mnemonic == ".line" {
            let operand = operand.ok_or_else(|| CompileError::MissingOperand {
                mnemonic: mnemonic.to_string(),
                line: file_line,
            })?;
            let line = operand
                .parse::<u32>()
                .map_err(|_| CompileError::InvalidLiteral {
                    literal: operand.to_string(),
                    line: file_line,
                })?;
            fixed_line = Some(line);
            continue;
        }

        let line = fixed_line.unwrap_or(file_line);
        let op = parse_mnemonic(mnemonic).ok_or_else(|| CompileError::UnknownMnemonic {
            mnemonic: mnemonic.to_string(),
            line: file_line,
        })?;

        match (op, operand) {
            (OpCode::Constant, Some(literal)) => {
                let value = parse_literal(literal).ok_or_else(|| CompileError::InvalidLiteral {
                    literal: literal.to_string(),
                    line: file_line,
                })?;
                chunk.write_constant(value, line)?;
            }
            (OpCode::Constant, None) => {
                return Err(CompileError::MissingOperand {
                    mnemonic: mnemonic.to_string(),
                    line: file_line,
                });
            }
            (_, Some(operand)) => {
                return Err(CompileError::UnexpectedOperand {
                    mnemonic: mnemonic.to_string(),
                    operand: operand.to_string(),
                    line: file_line,
                });
            }
            (op, None) => chunk.write_op(op, line),
        }
    }

    Ok(chunk)
}

/// Resolve a mnemonic, ignoring case and an optional `OP_` prefix.
///
/// Both constant forms map to `Constant`; the encoding is picked by
/// [`Chunk::write_constant`] from the pool size.
fn parse_mnemonic(word: &str) -> Option<OpCode> {
    let word = word.to_ascii_lowercase();
    let name = word.strip_prefix("op_").unwrap_or(&word);
    let op = match name {
        "constant" | "const" | "constant_long" => OpCode::Constant,
        "null" | "nil" => OpCode::Null,
        "true" => OpCode::True,
        "false" => OpCode::False,
        "equal" => OpCode::Equal,
        "greater" => OpCode::Greater,
        "less" => OpCode::Less,
        "add" => OpCode::Add,
        "subtract" => OpCode::Subtract,
        "multiply" => OpCode::Multiply,
        "divide" => OpCode::Divide,
        "not" => OpCode::Not,
        "negate" => OpCode::Negate,
        "return" => OpCode::Return,
        _ => return None,
    };
    Some(op)
}

fn parse_literal(literal: &str) -> Option<Value> {
    match literal {
        "true" => Some(Value::Bool(true)),
        "false" => Some(Value::Bool(false)),
        "null" | "nil" => Some(Value::Null),
        _ => literal.parse::<f64>().ok().map(Value::Number),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bytecode::disassembler::disassemble_chunk;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_assemble_records_file_lines() {
        let chunk = assemble("const 1\n\n; comment only\nnegate\nreturn ; done\n").unwrap();

        assert_eq!(
            chunk.code.as_slice(),
            &[
                OpCode::Constant as u8,
                0,
                OpCode::Negate as u8,
                OpCode::Return as u8
            ]
        );
        assert_eq!(chunk.lines.as_slice(), &[1, 1, 4, 5]);
        assert_eq!(chunk.constants.as_slice(), &[Value::Number(1.0)]);
    }

    #[test]
    fn test_line_directive_and_aliases() {
        let source = "\
.line 123
OP_CONSTANT 1.2
Constant 3.4
op_add
const 5.6
DIVIDE
negate
return
";
        let chunk = assemble(source).unwrap();
        let expected = "\
== test chunk ==
0000  123 OP_CONSTANT         0 '1.2'
0002    | OP_CONSTANT         1 '3.4'
0004    | OP_ADD
0005    | OP_CONSTANT         2 '5.6'
0007    | OP_DIVIDE
0008    | OP_NEGATE
0009    | OP_RETURN
";
        assert_eq!(disassemble_chunk(&chunk, "test chunk"), expected);
    }

    #[test]
    fn test_literals() {
        let chunk = assemble("const true\nconst false\nconst null\nconst -2.5e3\n").unwrap();
        assert_eq!(
            chunk.constants.as_slice(),
            &[
                Value::Bool(true),
                Value::Bool(false),
                Value::Null,
                Value::Number(-2500.0)
            ]
        );
    }

    #[test]
    fn test_many_constants_switch_to_long_form() {
        let source: String = (0..257).map(|i| format!("const {}\n", i)).collect();
        let chunk = assemble(&source).unwrap();

        assert_eq!(chunk.constants.len(), 257);
        assert_eq!(chunk.len(), 256 * 2 + 4);
        assert_eq!(chunk.code[512], OpCode::ConstantLong as u8);
    }

    #[test]
    fn test_errors_carry_file_line() {
        assert_eq!(
            assemble("add\njump 3\n").unwrap_err(),
            CompileError::UnknownMnemonic {
                mnemonic: "jump".to_string(),
                line: 2
            }
        );
        assert_eq!(
            assemble("add\njump 3\n").unwrap_err().to_string(),
            "Unknown instruction 'jump' at line 2"
        );
    }

    #[test]
    fn test_error_kinds() {
        assert!(matches!(
            assemble("push 1").unwrap_err(),
            CompileError::UnknownMnemonic { line: 1, .. }
        ));
        assert!(matches!(
            assemble("\nconst").unwrap_err(),
            CompileError::MissingOperand { line: 2, .. }
        ));
        assert!(matches!(
            assemble("const abc").unwrap_err(),
            CompileError::InvalidLiteral { line: 1, .. }
        ));
        assert!(matches!(
            assemble("add 1").unwrap_err(),
            CompileError::UnexpectedOperand { line: 1, .. }
        ));
        assert!(matches!(
            assemble("const 1 2").unwrap_err(),
            CompileError::UnexpectedOperand { line: 1, .. }
        ));
        assert!(matches!(
            assemble(".line x").unwrap_err(),
            CompileError::InvalidLiteral { line: 1, .. }
        ));
    }
}
