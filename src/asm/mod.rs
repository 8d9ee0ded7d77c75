//! Assembler, disassembler and program files for the LS-8.
//!
//! This module provides:
//! - A two-pass assembler (text → machine code)
//! - A disassembler (machine code → readable text)
//! - The `.ls8` program format (one binary byte per line)

pub mod assembler;
pub mod disasm;
pub mod program;

pub use assembler::{assemble, AssemblerError};
pub use disasm::disassemble;
pub use program::{load_program, parse_program, save_program, ProgramError, ProgramFile};
