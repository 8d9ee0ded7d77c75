//! LS-8 CPU registers.
//!
//! The LS-8 has eight 8-bit general purpose registers, R0 through R7, and two
//! special purpose registers:
//! - PC: program counter, address of the next instruction byte
//! - IR: instruction register, the opcode fetched at the start of a cycle
//!
//! By convention some general registers have a fixed role:
//! - R5: interrupt mask (IM), reserved
//! - R6: interrupt status (IS), bit 0 is the timer interrupt flag
//! - R7: stack pointer (SP)

use serde::{Serialize, Deserialize};
use thiserror::Error;

/// Number of general purpose registers.
pub const REGISTER_COUNT: usize = 8;

/// Default stack pointer: the top of the stack region, below the
/// interrupt vector area at 0xF8..=0xFF.
pub const DEFAULT_SP: u8 = 0xF4;

/// Bit in IS raised by the interrupt timer.
pub const TIMER_INTERRUPT: u8 = 0b0000_0001;

/// A validated general purpose register index (0-7).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Reg(u8);

impl Reg {
    /// Interrupt mask.
    pub const IM: Reg = Reg(5);
    /// Interrupt status.
    pub const IS: Reg = Reg(6);
    /// Stack pointer.
    pub const SP: Reg = Reg(7);

    /// Validate a raw register operand.
    pub fn new(index: u8) -> Result<Self, RegisterError> {
        if (index as usize) < REGISTER_COUNT {
            Ok(Reg(index))
        } else {
            Err(RegisterError::OutOfRange(index))
        }
    }

    /// The register number.
    pub const fn index(self) -> u8 {
        self.0
    }
}

impl std::fmt::Display for Reg {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "R{}", self.0)
    }
}

/// The LS-8 register file.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Registers {
    /// R0-R7.
    pub general: [u8; REGISTER_COUNT],

    /// PC: program counter
    pub pc: u8,

    /// IR: most recently fetched opcode
    pub ir: u8,
}

impl Registers {
    /// Create a register file with every register zeroed and SP at
    /// [`DEFAULT_SP`].
    pub fn new() -> Self {
        Self::with_sp(DEFAULT_SP)
    }

    /// Create a register file with a specific initial stack pointer.
    pub fn with_sp(sp: u8) -> Self {
        let mut regs = Self {
            general: [0; REGISTER_COUNT],
            pc: 0,
            ir: 0,
        };
        regs.general[Reg::SP.index() as usize] = sp;
        regs
    }

    /// Reset all registers, leaving SP at `sp`.
    pub fn reset(&mut self, sp: u8) {
        *self = Self::with_sp(sp);
    }

    /// Read a general purpose register.
    #[inline]
    pub fn get(&self, reg: Reg) -> u8 {
        self.general[reg.index() as usize]
    }

    /// Write a general purpose register. Values are masked to 8 bits.
    #[inline]
    pub fn set(&mut self, reg: Reg, value: impl Into<u32>) {
        self.general[reg.index() as usize] = (value.into() & 0xFF) as u8;
    }

    /// Program counter.
    pub fn pc(&self) -> u8 {
        self.pc
    }

    /// Set the program counter to an absolute address.
    pub fn set_pc(&mut self, addr: u8) {
        self.pc = addr;
    }

    /// Advance the program counter by `n` bytes, wrapping at the end of
    /// memory. Returns the old value.
    pub fn advance_pc(&mut self, n: u8) -> u8 {
        let old = self.pc;
        self.pc = self.pc.wrapping_add(n);
        old
    }

    /// Stack pointer (alias for R7).
    pub fn sp(&self) -> u8 {
        self.get(Reg::SP)
    }

    /// Set the stack pointer.
    pub fn set_sp(&mut self, sp: u8) {
        self.set(Reg::SP, sp);
    }

    /// Raise the timer bit in IS. Nothing services it; the flag is only
    /// stored.
    pub fn raise_timer_interrupt(&mut self) {
        let is = self.get(Reg::IS);
        self.set(Reg::IS, is | TIMER_INTERRUPT);
    }

    /// True if the timer bit in IS is set.
    pub fn timer_interrupt_pending(&self) -> bool {
        self.get(Reg::IS) & TIMER_INTERRUPT != 0
    }
}

impl Default for Registers {
    fn default() -> Self {
        Self::new()
    }
}

/// Errors raised while validating register operands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum RegisterError {
    #[error("register index {0} out of range (0-7)")]
    OutOfRange(u8),
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_new_sets_stack_pointer() {
        let regs = Registers::new();
        assert_eq!(regs.sp(), DEFAULT_SP);
        assert_eq!(regs.pc(), 0);
        assert_eq!(regs.general[..7], [0; 7]);
    }

    #[test]
    fn test_reg_validation() {
        assert_eq!(Reg::new(7), Ok(Reg::SP));
        assert_eq!(Reg::new(8), Err(RegisterError::OutOfRange(8)));
        assert_eq!(Reg::new(3).unwrap().to_string(), "R3");
    }

    #[test]
    fn test_advance_pc_wraps() {
        let mut regs = Registers::new();
        regs.set_pc(254);

        let old = regs.advance_pc(3);
        assert_eq!(old, 254);
        assert_eq!(regs.pc(), 1);
    }

    #[test]
    fn test_timer_interrupt_flag() {
        let mut regs = Registers::new();
        regs.set(Reg::IS, 0b1000_0000u8);
        assert!(!regs.timer_interrupt_pending());

        regs.raise_timer_interrupt();
        assert!(regs.timer_interrupt_pending());
        assert_eq!(regs.get(Reg::IS), 0b1000_0001);
    }

    proptest! {
        #[test]
        fn set_then_get_masks_to_byte(index in 0u8..8, value in any::<u32>()) {
            let mut regs = Registers::new();
            let reg = Reg::new(index).unwrap();
            regs.set(reg, value);
            prop_assert_eq!(regs.get(reg) as u32, value % 256);
        }
    }
}
