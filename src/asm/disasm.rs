//! Disassembler for LS-8 programs.
//!
//! Converts machine code back to readable assembly.

use crate::cpu::opcode::Opcode;

/// One disassembled instruction or data byte.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Line {
    pub address: u8,
    /// Number of bytes this line covers.
    pub len: u8,
    pub text: String,
}

/// Disassemble the instruction starting at `addr`.
///
/// Bytes that are not an opcode, or an opcode whose operands run past the
/// end of `bytes`, come back as a one-byte `DB` line.
pub fn disassemble_at(bytes: &[u8], addr: u8) -> Line {
    let start = addr as usize;
    let byte = bytes.get(start).copied().unwrap_or(0);

    let decoded = Opcode::from_byte(byte).and_then(|op| {
        let end = start + op.len() as usize;
        bytes.get(start + 1..end).map(|operands| (op, operands))
    });

    match decoded {
        Some((op, operands)) => Line {
            address: addr,
            len: op.len(),
            text: format_instruction(op, operands),
        },
        None => Line {
            address: addr,
            len: 1,
            text: format!("DB 0x{:02X}", byte),
        },
    }
}

/// Disassemble a single instruction to text.
pub fn disassemble_instruction(bytes: &[u8]) -> String {
    disassemble_at(bytes, 0).text
}

/// Disassemble a whole program, one [`Line`] per instruction.
pub fn listing(bytes: &[u8]) -> Vec<Line> {
    let mut lines = Vec::new();
    let mut addr = 0usize;

    while addr < bytes.len() && addr < crate::cpu::MEMORY_SIZE {
        let line = disassemble_at(bytes, addr as u8);
        addr += line.len as usize;
        lines.push(line);
    }

    lines
}

/// Disassemble a program to a printable listing.
pub fn disassemble(bytes: &[u8]) -> String {
    let mut output = String::new();
    output.push_str("; LS-8 Disassembly\n");
    output.push_str("; ----------------\n\n");

    for line in listing(bytes) {
        let start = line.address as usize;
        let raw: Vec<String> = bytes[start..start + line.len as usize]
            .iter()
            .map(|b| format!("{:08b}", b))
            .collect();
        output.push_str(&format!("{:03}: {:<12} ; {}\n", line.address, line.text, raw.join(" ")));
    }

    output
}

/// Format an opcode and its operand bytes as assembly text.
fn format_instruction(op: Opcode, operands: &[u8]) -> String {
    match (op, operands) {
        (Opcode::Ldi, [reg, value]) => format!("LDI R{},{}", reg, value),
        (_, []) => op.mnemonic().to_string(),
        (_, [reg]) => format!("{} R{}", op, reg),
        (_, [a, b]) => format!("{} R{},R{}", op, a, b),
        _ => format!("{} ?", op),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_disassemble_hlt() {
        assert_eq!(disassemble_instruction(&[Opcode::Hlt.byte()]), "HLT");
    }

    #[test]
    fn test_disassemble_operands() {
        assert_eq!(disassemble_instruction(&[Opcode::Ldi.byte(), 0, 8]), "LDI R0,8");
        assert_eq!(disassemble_instruction(&[Opcode::Mul.byte(), 0, 1]), "MUL R0,R1");
        assert_eq!(disassemble_instruction(&[Opcode::Push.byte(), 3]), "PUSH R3");
    }

    #[test]
    fn test_unknown_and_truncated_bytes() {
        assert_eq!(disassemble_instruction(&[0xFF]), "DB 0xFF");
        assert_eq!(disassemble_instruction(&[Opcode::Ldi.byte(), 0]), "DB 0x04");
    }

    #[test]
    fn test_listing_addresses() {
        let program = [
            Opcode::Ldi.byte(), 0, 8,
            Opcode::Prn.byte(), 0,
            Opcode::Hlt.byte(),
        ];

        let lines = listing(&program);
        let addrs: Vec<u8> = lines.iter().map(|l| l.address).collect();
        assert_eq!(addrs, vec![0, 3, 5]);

        let text = disassemble(&program);
        assert!(text.contains("003: PRN R0"));
        assert!(text.contains("00011011"));
    }
}
