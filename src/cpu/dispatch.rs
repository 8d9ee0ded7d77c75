//! Opcode dispatch table.
//!
//! A 256-entry table mapping every possible opcode byte to its handler.
//! Each CPU builds its own table once at construction; lookups are a
//! single array index with no allocation.

use crate::cpu::console::Console;
use crate::cpu::execute::{Cpu, CpuError};
use crate::cpu::opcode::Opcode;

/// An instruction handler. Handlers read their own operands and leave PC
/// at the next instruction to execute.
pub type Handler<C> = fn(&mut Cpu<C>) -> Result<(), CpuError>;

/// Byte-indexed handler table.
pub struct DispatchTable<C: Console> {
    handlers: [Option<(Opcode, Handler<C>)>; 256],
}

impl<C: Console> DispatchTable<C> {
    /// Build the table with a handler for every LS-8 opcode.
    pub fn new() -> Self {
        let mut handlers: [Option<(Opcode, Handler<C>)>; 256] = [None; 256];
        for op in Opcode::ALL {
            handlers[op.byte() as usize] = Some((op, Self::handler_for(op)));
        }
        Self { handlers }
    }

    fn handler_for(op: Opcode) -> Handler<C> {
        match op {
            Opcode::Hlt => Cpu::<C>::hlt,
            Opcode::Ldi => Cpu::<C>::ldi,
            Opcode::Mul => Cpu::<C>::mul,
            Opcode::Add => Cpu::<C>::add,
            Opcode::Prn => Cpu::<C>::prn,
            Opcode::Push => Cpu::<C>::push,
            Opcode::Pop => Cpu::<C>::pop,
            Opcode::Call => Cpu::<C>::call,
            Opcode::Ret => Cpu::<C>::ret,
            Opcode::Jmp => Cpu::<C>::jmp,
        }
    }

    /// Decoded opcode and handler for an opcode byte, if any.
    #[inline]
    pub fn lookup(&self, byte: u8) -> Option<(Opcode, Handler<C>)> {
        self.handlers[byte as usize]
    }

    /// Number of opcode bytes with a handler.
    pub fn len(&self) -> usize {
        self.handlers.iter().filter(|h| h.is_some()).count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl<C: Console> Default for DispatchTable<C> {
    fn default() -> Self {
        Self::new()
    }
}

impl<C: Console> Clone for DispatchTable<C> {
    fn clone(&self) -> Self {
        Self { handlers: self.handlers }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cpu::console::BufferConsole;

    #[test]
    fn test_table_covers_exactly_the_opcodes() {
        let table = DispatchTable::<BufferConsole>::new();
        assert_eq!(table.len(), Opcode::ALL.len());

        for byte in 0..=255u8 {
            assert_eq!(
                table.lookup(byte).is_some(),
                Opcode::from_byte(byte).is_some(),
                "byte {:08b}",
                byte
            );
        }
    }
}
