//! LS-8 opcodes.
//!
//! Every instruction is a single opcode byte followed by zero, one or two
//! operand bytes.

use serde::{Serialize, Deserialize};

/// An LS-8 opcode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum Opcode {
    /// Load immediate: `LDI reg, value`
    Ldi = 0b0000_0100,
    /// Multiply: `MUL regA, regB`
    Mul = 0b0000_0101,
    /// Print register as decimal: `PRN reg`
    Prn = 0b0000_0110,
    /// Push register onto the stack: `PUSH reg`
    Push = 0b0000_1010,
    /// Pop the stack into a register: `POP reg`
    Pop = 0b0000_1011,
    /// Add: `ADD regA, regB`
    Add = 0b0000_1100,
    /// Call the subroutine whose address is in a register: `CALL reg`
    Call = 0b0000_1111,
    /// Return from subroutine: `RET`
    Ret = 0b0001_0000,
    /// Jump to the address in a register: `JMP reg`
    Jmp = 0b0001_0001,
    /// Halt: `HLT`
    Hlt = 0b0001_1011,
}

impl Opcode {
    /// All opcodes, in numeric order.
    pub const ALL: [Opcode; 10] = [
        Opcode::Ldi,
        Opcode::Mul,
        Opcode::Prn,
        Opcode::Push,
        Opcode::Pop,
        Opcode::Add,
        Opcode::Call,
        Opcode::Ret,
        Opcode::Jmp,
        Opcode::Hlt,
    ];

    /// Decode an opcode byte.
    pub fn from_byte(byte: u8) -> Option<Self> {
        Self::ALL.into_iter().find(|op| op.byte() == byte)
    }

    /// Look up an opcode by mnemonic (case-insensitive).
    pub fn from_mnemonic(name: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|op| op.mnemonic().eq_ignore_ascii_case(name))
    }

    /// The encoded byte.
    pub const fn byte(self) -> u8 {
        self as u8
    }

    /// Assembly mnemonic.
    pub const fn mnemonic(self) -> &'static str {
        match self {
            Opcode::Ldi => "LDI",
            Opcode::Mul => "MUL",
            Opcode::Prn => "PRN",
            Opcode::Push => "PUSH",
            Opcode::Pop => "POP",
            Opcode::Add => "ADD",
            Opcode::Call => "CALL",
            Opcode::Ret => "RET",
            Opcode::Jmp => "JMP",
            Opcode::Hlt => "HLT",
        }
    }

    /// Number of operand bytes following the opcode.
    pub const fn operand_count(self) -> u8 {
        match self {
            Opcode::Ldi | Opcode::Mul | Opcode::Add => 2,
            Opcode::Prn | Opcode::Push | Opcode::Pop | Opcode::Call | Opcode::Jmp => 1,
            Opcode::Ret | Opcode::Hlt => 0,
        }
    }

    /// Total instruction length in bytes.
    pub const fn len(self) -> u8 {
        1 + self.operand_count()
    }

    /// True for instructions that set PC directly instead of stepping over
    /// their operands.
    pub const fn changes_pc(self) -> bool {
        matches!(self, Opcode::Call | Opcode::Ret | Opcode::Jmp | Opcode::Hlt)
    }
}

impl std::fmt::Display for Opcode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.mnemonic())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_known_encodings() {
        assert_eq!(Opcode::Hlt.byte(), 0b0001_1011);
        assert_eq!(Opcode::Ldi.byte(), 0b0000_0100);
        assert_eq!(Opcode::from_byte(0b0000_1111), Some(Opcode::Call));
        assert_eq!(Opcode::from_byte(0xFF), None);
        assert_eq!(Opcode::from_byte(0), None);
    }

    #[test]
    fn test_mnemonic_lookup() {
        for op in Opcode::ALL {
            assert_eq!(Opcode::from_mnemonic(op.mnemonic()), Some(op));
        }
        assert_eq!(Opcode::from_mnemonic("push"), Some(Opcode::Push));
        assert_eq!(Opcode::from_mnemonic("SUB"), None);
    }

    #[test]
    fn test_lengths() {
        assert_eq!(Opcode::Ldi.len(), 3);
        assert_eq!(Opcode::Prn.len(), 2);
        assert_eq!(Opcode::Ret.len(), 1);
        assert!(Opcode::Jmp.changes_pc());
        assert!(!Opcode::Add.changes_pc());
    }
}
