//! TUI debugger for the LS-8 emulator.
//!
//! Provides an interactive terminal-based debugger with:
//! - Register view, including PC, IR, SP and the interrupt status flag
//! - Hex memory view with PC and SP highlighted
//! - Step/run/breakpoint controls
//! - Disassembly and program output panes

mod app;
mod ui;

pub use app::{DebuggerApp, run_debugger};
