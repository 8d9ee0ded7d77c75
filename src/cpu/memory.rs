//! LS-8 memory subsystem.
//!
//! A flat array of 256 bytes. Addresses are single bytes, so every address
//! a program can form is in range; arithmetic on addresses wraps.

use serde::{Serialize, Deserialize};
use thiserror::Error;

/// The number of bytes of memory in the LS-8.
pub const MEMORY_SIZE: usize = 256;

/// LS-8 memory: 256 byte cells.
#[derive(Clone, Serialize, Deserialize)]
#[serde(try_from = "Vec<u8>", into = "Vec<u8>")]
pub struct Memory {
    cells: Vec<u8>,
}

impl Memory {
    /// Create a new memory with all cells zeroed.
    pub fn new() -> Self {
        Self {
            cells: vec![0; MEMORY_SIZE],
        }
    }

    /// Read a byte.
    #[inline]
    pub fn read(&self, addr: u8) -> u8 {
        self.cells[addr as usize]
    }

    /// Write a byte.
    #[inline]
    pub fn write(&mut self, addr: u8, value: u8) {
        self.cells[addr as usize] = value;
    }

    /// Clear all memory to zeros.
    pub fn clear(&mut self) {
        self.cells.fill(0);
    }

    /// Load a program into memory starting at the given address.
    pub fn load_program(&mut self, start_addr: u8, program: &[u8]) -> Result<(), MemoryError> {
        let start = start_addr as usize;
        if start + program.len() > MEMORY_SIZE {
            return Err(MemoryError::ProgramTooLarge {
                size: program.len(),
                available: MEMORY_SIZE - start,
            });
        }

        self.cells[start..start + program.len()].copy_from_slice(program);
        Ok(())
    }

    /// Dump memory contents (for debugging).
    pub fn dump(&self, start: usize, count: usize) -> Vec<(usize, u8)> {
        let end = (start + count).min(MEMORY_SIZE);
        (start.min(end)..end)
            .map(|i| (i, self.cells[i]))
            .collect()
    }

    /// The whole address space, lowest address first.
    pub fn as_slice(&self) -> &[u8] {
        &self.cells
    }
}

impl Default for Memory {
    fn default() -> Self {
        Self::new()
    }
}

impl TryFrom<Vec<u8>> for Memory {
    type Error = MemoryError;

    fn try_from(cells: Vec<u8>) -> Result<Self, Self::Error> {
        if cells.len() != MEMORY_SIZE {
            return Err(MemoryError::WrongSize(cells.len()));
        }
        Ok(Self { cells })
    }
}

impl From<Memory> for Vec<u8> {
    fn from(mem: Memory) -> Self {
        mem.cells
    }
}

impl std::fmt::Debug for Memory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let non_zero = self.cells.iter().filter(|&&b| b != 0).count();

        f.debug_struct("Memory")
            .field("non_zero_cells", &non_zero)
            .field("total_cells", &MEMORY_SIZE)
            .finish()
    }
}

/// Errors that can occur during memory operations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MemoryError {
    /// Program is too large to fit in memory.
    #[error("program size {size} exceeds available space {available}")]
    ProgramTooLarge { size: usize, available: usize },

    /// A memory image that is not exactly one address space long.
    #[error("memory image has {0} bytes, expected {MEMORY_SIZE}")]
    WrongSize(usize),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_memory_read_write() {
        let mut mem = Memory::new();
        mem.write(10, 42);
        assert_eq!(mem.read(10), 42);
        assert_eq!(mem.read(255), 0);
    }

    #[test]
    fn test_load_program() {
        let mut mem = Memory::new();
        mem.load_program(0, &[1, 2, 3]).unwrap();

        assert_eq!(mem.read(0), 1);
        assert_eq!(mem.read(1), 2);
        assert_eq!(mem.read(2), 3);
    }

    #[test]
    fn test_program_too_large() {
        let mut mem = Memory::new();
        let program = vec![0u8; MEMORY_SIZE + 1];

        assert_eq!(
            mem.load_program(0, &program),
            Err(MemoryError::ProgramTooLarge { size: 257, available: 256 })
        );
        assert!(mem.load_program(250, &[0; 6]).is_ok());
        assert!(mem.load_program(250, &[0; 7]).is_err());
    }

    #[test]
    fn test_dump_clamps_to_memory() {
        let mut mem = Memory::new();
        mem.write(254, 7);

        let dump = mem.dump(250, 20);
        assert_eq!(dump.len(), 6);
        assert_eq!(dump[4], (254, 7));
        assert!(mem.dump(300, 4).is_empty());
    }

    #[test]
    fn test_deserialize_checks_size() {
        let mut mem = Memory::new();
        mem.write(3, 7);
        let json = serde_json::to_string(&mem).unwrap();

        let back: Memory = serde_json::from_str(&json).unwrap();
        assert_eq!(back.read(3), 7);

        assert!(serde_json::from_str::<Memory>("[1, 2, 3]").is_err());
        assert_eq!(
            Memory::try_from(vec![0; 300]).err(),
            Some(MemoryError::WrongSize(300))
        );
    }
}
