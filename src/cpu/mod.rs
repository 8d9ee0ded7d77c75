//! CPU emulation for the LS-8.
//!
//! This module implements the LS-8 architecture:
//! - 256 bytes of memory
//! - 8 general purpose registers (R7 is the stack pointer), plus PC and IR
//! - a 10-instruction set dispatched through a per-CPU opcode table

pub mod alu;
pub mod clock;
pub mod console;
pub mod dispatch;
pub mod execute;
pub mod memory;
pub mod opcode;
pub mod registers;

pub use alu::AluOp;
pub use clock::{Clock, RunSummary, StopReason};
pub use console::{BufferConsole, Console, StdConsole};
pub use execute::{Cpu, CpuError, CpuSnapshot, CpuState};
pub use memory::{Memory, MemoryError, MEMORY_SIZE};
pub use opcode::Opcode;
pub use registers::{Reg, Registers, DEFAULT_SP};
