//! # LS-8 Emulator
//!
//! An emulator for the LS-8, a small 8-bit teaching CPU.
//!
//! The LS-8 has 256 bytes of memory, eight 8-bit registers (R7 doubles as
//! the stack pointer) and a ten-instruction set. Each CPU dispatches opcodes
//! through its own handler table, one instruction per clock tick.

pub mod asm;
pub mod config;
pub mod cpu;

#[cfg(feature = "tui")]
pub mod tui;

#[cfg(feature = "wasm")]
pub mod wasm;

// Re-export commonly used types
pub use asm::{assemble, disassemble, load_program, parse_program, save_program, AssemblerError, ProgramError, ProgramFile};
pub use config::{ConfigError, MachineConfig};
pub use cpu::{BufferConsole, Clock, Console, Cpu, CpuError, CpuState, Memory, Opcode, Reg, Registers, StdConsole};

#[cfg(feature = "tui")]
pub use tui::run_debugger;
