//! Simple assembler for LS-8 programs.
//!
//! Syntax:
//! ```text
//! ; Comment (`#` works too)
//! START:              ; Define a label
//!     LDI R0, 8       ; Load immediate
//!     LDI R1, SUB     ; Labels can be used as immediates
//!     CALL R1
//!     HLT
//! SUB: PRN R0
//!     RET
//!     DB 0x2A, 7      ; Raw data bytes
//! ```
//!
//! Numbers may be decimal, `0x` hex or `0b` binary.

use crate::cpu::opcode::Opcode;
use crate::cpu::registers::REGISTER_COUNT;
use crate::cpu::MEMORY_SIZE;
use std::collections::HashMap;
use thiserror::Error;

/// Assemble source code to machine code.
pub fn assemble(source: &str) -> Result<Vec<u8>, AssemblerError> {
    let mut asm = Assembler::new();
    asm.assemble(source)
}

/// An operand as written in the source.
#[derive(Debug, Clone, PartialEq, Eq)]
enum Operand {
    Register(u8),
    Value(i64),
    Label(String),
}

#[derive(Debug, Clone)]
enum Statement {
    Instruction(Opcode, Vec<Operand>),
    Data(Vec<Operand>),
}

/// The assembler state.
struct Assembler {
    /// Address of the next emitted byte.
    current_addr: usize,
    /// Symbol table (label -> address).
    symbols: HashMap<String, usize>,
    /// Parsed statements with their source line.
    statements: Vec<(usize, Statement)>,
}

impl Assembler {
    fn new() -> Self {
        Self {
            current_addr: 0,
            symbols: HashMap::new(),
            statements: Vec::new(),
        }
    }

    fn assemble(&mut self, source: &str) -> Result<Vec<u8>, AssemblerError> {
        // Pass 1: parse statements and collect labels
        for (line_num, line) in source.lines().enumerate() {
            self.process_line(line, line_num + 1)?;
        }

        if self.current_addr > MEMORY_SIZE {
            return Err(AssemblerError::ProgramTooLarge(self.current_addr));
        }

        // Pass 2: encode with every label known
        let mut output = Vec::with_capacity(self.current_addr);
        for (line_num, statement) in &self.statements {
            self.encode(statement, *line_num, &mut output)?;
        }

        Ok(output)
    }

    fn process_line(&mut self, line: &str, line_num: usize) -> Result<(), AssemblerError> {
        // Remove comments
        let line = match line.find([';', '#']) {
            Some(idx) => &line[..idx],
            None => line,
        };
        let mut line = line.trim();

        // Label definitions, possibly followed by an instruction
        while let Some(colon_idx) = line.find(':') {
            let label = line[..colon_idx].trim().to_uppercase();
            if !is_identifier(&label) {
                return Err(AssemblerError::SyntaxError {
                    line: line_num,
                    message: format!("invalid label '{}'", label),
                });
            }
            if self.symbols.insert(label.clone(), self.current_addr).is_some() {
                return Err(AssemblerError::SyntaxError {
                    line: line_num,
                    message: format!("label '{}' defined twice", label),
                });
            }
            line = line[colon_idx + 1..].trim();
        }

        if line.is_empty() {
            return Ok(());
        }

        let (mnemonic, rest) = match line.split_once(char::is_whitespace) {
            Some((m, r)) => (m, r.trim()),
            None => (line, ""),
        };
        let operands = self.parse_operands(rest, line_num)?;

        let statement = if mnemonic.eq_ignore_ascii_case("DB") {
            if operands.is_empty() {
                return Err(AssemblerError::SyntaxError {
                    line: line_num,
                    message: "DB requires at least one value".into(),
                });
            }
            Statement::Data(operands)
        } else {
            let op = Opcode::from_mnemonic(mnemonic).ok_or_else(|| AssemblerError::UnknownMnemonic {
                line: line_num,
                mnemonic: mnemonic.to_uppercase(),
            })?;
            if operands.len() != op.operand_count() as usize {
                return Err(AssemblerError::SyntaxError {
                    line: line_num,
                    message: format!(
                        "{} takes {} operand(s), found {}",
                        op,
                        op.operand_count(),
                        operands.len()
                    ),
                });
            }
            Statement::Instruction(op, operands)
        };

        self.current_addr += match &statement {
            Statement::Instruction(op, _) => op.len() as usize,
            Statement::Data(values) => values.len(),
        };
        self.statements.push((line_num, statement));

        Ok(())
    }

    fn parse_operands(&self, text: &str, line_num: usize) -> Result<Vec<Operand>, AssemblerError> {
        if text.is_empty() {
            return Ok(Vec::new());
        }

        text.split(',')
            .map(|part| parse_operand(part.trim(), line_num))
            .collect()
    }

    fn encode(&self, statement: &Statement, line_num: usize, output: &mut Vec<u8>) -> Result<(), AssemblerError> {
        match statement {
            Statement::Instruction(op, operands) => {
                output.push(op.byte());
                match (op, operands.as_slice()) {
                    (Opcode::Ldi, [reg, value]) => {
                        output.push(self.register(reg, line_num)?);
                        output.push(self.value(value, line_num)?);
                    }
                    (_, regs) => {
                        for reg in regs {
                            output.push(self.register(reg, line_num)?);
                        }
                    }
                }
            }
            Statement::Data(values) => {
                for value in values {
                    output.push(self.value(value, line_num)?);
                }
            }
        }
        Ok(())
    }

    fn register(&self, operand: &Operand, line_num: usize) -> Result<u8, AssemblerError> {
        match operand {
            Operand::Register(r) => Ok(*r),
            other => Err(AssemblerError::InvalidRegister {
                line: line_num,
                operand: describe(other),
            }),
        }
    }

    fn value(&self, operand: &Operand, line_num: usize) -> Result<u8, AssemblerError> {
        let value = match operand {
            Operand::Value(v) => *v,
            Operand::Label(label) => *self.symbols.get(label).ok_or_else(|| {
                AssemblerError::UndefinedLabel {
                    line: line_num,
                    label: label.clone(),
                }
            })? as i64,
            Operand::Register(r) => {
                return Err(AssemblerError::SyntaxError {
                    line: line_num,
                    message: format!("expected a value, found register R{}", r),
                })
            }
        };

        u8::try_from(value).map_err(|_| AssemblerError::ValueOutOfRange { line: line_num, value })
    }
}

fn parse_operand(text: &str, line_num: usize) -> Result<Operand, AssemblerError> {
    if text.is_empty() {
        return Err(AssemblerError::SyntaxError {
            line: line_num,
            message: "empty operand".into(),
        });
    }

    // Register: R0-R7
    if let Some(digits) = text.strip_prefix(['R', 'r']) {
        if !digits.is_empty() && digits.chars().all(|c| c.is_ascii_digit()) {
            return match digits.parse::<u8>() {
                Ok(r) if (r as usize) < REGISTER_COUNT => Ok(Operand::Register(r)),
                _ => Err(AssemblerError::InvalidRegister {
                    line: line_num,
                    operand: text.to_string(),
                }),
            };
        }
    }

    if let Some(value) = parse_number(text) {
        return value
            .map(Operand::Value)
            .map_err(|message| AssemblerError::SyntaxError { line: line_num, message });
    }

    if is_identifier(text) {
        return Ok(Operand::Label(text.to_uppercase()));
    }

    Err(AssemblerError::SyntaxError {
        line: line_num,
        message: format!("cannot parse operand '{}'", text),
    })
}

/// `None` if `text` does not look like a number at all.
fn parse_number(text: &str) -> Option<Result<i64, String>> {
    let (negative, body) = match text.strip_prefix('-') {
        Some(rest) => (true, rest),
        None => (false, text),
    };

    let parsed = if let Some(hex) = body.strip_prefix("0x").or_else(|| body.strip_prefix("0X")) {
        i64::from_str_radix(hex, 16).map_err(|_| format!("invalid hex literal '{}'", text))
    } else if let Some(bin) = body.strip_prefix("0b").or_else(|| body.strip_prefix("0B")) {
        i64::from_str_radix(bin, 2).map_err(|_| format!("invalid binary literal '{}'", text))
    } else if body.starts_with(|c: char| c.is_ascii_digit()) {
        body.parse::<i64>().map_err(|_| format!("invalid number '{}'", text))
    } else {
        return None;
    };

    Some(parsed.map(|v| if negative { -v } else { v }))
}

fn is_identifier(text: &str) -> bool {
    let mut chars = text.chars();
    matches!(chars.next(), Some(c) if c.is_ascii_alphabetic() || c == '_')
        && chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

fn describe(operand: &Operand) -> String {
    match operand {
        Operand::Register(r) => format!("R{}", r),
        Operand::Value(v) => v.to_string(),
        Operand::Label(l) => l.clone(),
    }
}

/// Errors that can occur during assembly.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AssemblerError {
    #[error("syntax error on line {line}: {message}")]
    SyntaxError { line: usize, message: String },

    #[error("unknown mnemonic on line {line}: {mnemonic}")]
    UnknownMnemonic { line: usize, mnemonic: String },

    #[error("undefined label on line {line}: {label}")]
    UndefinedLabel { line: usize, label: String },

    #[error("value out of range on line {line}: {value}")]
    ValueOutOfRange { line: usize, value: i64 },

    #[error("expected a register R0-R7 on line {line}, found {operand}")]
    InvalidRegister { line: usize, operand: String },

    #[error("program is {0} bytes, memory holds 256")]
    ProgramTooLarge(usize),
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::asm::program::parse_program;

    #[test]
    fn test_assemble_simple() {
        let source = r#"
            ; print 8 * 9
            LDI R0, 8
            LDI R1, 9
            MUL R0, R1
            PRN R0
            HLT
        "#;

        let result = assemble(source).unwrap();
        assert_eq!(result, vec![4, 0, 8, 4, 1, 9, 5, 0, 1, 6, 0, 0x1B]);
    }

    #[test]
    fn test_assemble_with_labels() {
        let source = r#"
        START:
            LDI R2, END
            JMP R2
            PRN R0
        END: HLT
        "#;

        let result = assemble(source).unwrap();
        assert_eq!(result, vec![4, 2, 7, 0x11, 2, 6, 0, 0x1B]);
    }

    #[test]
    fn test_assemble_data() {
        let result = assemble("DB 42, 0xff, 0b101\nlabel: db LABEL").unwrap();
        assert_eq!(result, vec![42, 255, 5, 3]);
    }

    #[test]
    fn test_matches_hand_encoded_demo() {
        let assembled = assemble(include_str!("../../demos/call.asm")).unwrap();
        let hand = parse_program(include_str!("../../demos/call.ls8")).unwrap();
        assert_eq!(assembled, hand.bytes);
    }

    #[test]
    fn test_errors() {
        assert_eq!(
            assemble("NOP"),
            Err(AssemblerError::UnknownMnemonic { line: 1, mnemonic: "NOP".into() })
        );
        assert_eq!(
            assemble("\nLDI R0, NOWHERE"),
            Err(AssemblerError::UndefinedLabel { line: 2, label: "NOWHERE".into() })
        );
        assert_eq!(
            assemble("LDI R0, 256"),
            Err(AssemblerError::ValueOutOfRange { line: 1, value: 256 })
        );
        assert_eq!(
            assemble("PUSH R8"),
            Err(AssemblerError::InvalidRegister { line: 1, operand: "R8".into() })
        );
        assert!(matches!(
            assemble("ADD R0"),
            Err(AssemblerError::SyntaxError { line: 1, .. })
        ));
        assert!(matches!(
            assemble("A: HLT\nA: HLT"),
            Err(AssemblerError::SyntaxError { line: 2, .. })
        ));
        assert!(matches!(
            assemble("MUL R0, 3"),
            Err(AssemblerError::InvalidRegister { line: 1, .. })
        ));
    }

    #[test]
    fn test_program_too_large() {
        let source = "DB 0, 0, 0, 0\n".repeat(65);
        assert_eq!(assemble(&source), Err(AssemblerError::ProgramTooLarge(260)));
    }
}
