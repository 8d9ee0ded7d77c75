//! Output and diagnostic sinks.
//!
//! PRN writes through [`Console::print`]; faults are reported through
//! [`Console::diagnostic`].

use std::io::Write;

/// Where the CPU sends program output and fault diagnostics.
pub trait Console {
    /// Emit one value printed by PRN.
    fn print(&mut self, value: u8);

    /// Report a fault that halted the CPU.
    fn diagnostic(&mut self, message: &str);
}

/// Writes output to stdout and diagnostics to stderr, one per line.
#[derive(Debug, Default, Clone, Copy)]
pub struct StdConsole;

impl Console for StdConsole {
    fn print(&mut self, value: u8) {
        let mut out = std::io::stdout().lock();
        // A closed stdout is not the emulated program's problem.
        let _ = writeln!(out, "{}", value);
        let _ = out.flush();
    }

    fn diagnostic(&mut self, message: &str) {
        eprintln!("{}", message);
    }
}

/// Records output and diagnostics in memory.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct BufferConsole {
    /// Values printed by PRN, oldest first.
    pub output: Vec<u8>,
    /// Diagnostic messages, oldest first.
    pub diagnostics: Vec<String>,
}

impl BufferConsole {
    pub fn new() -> Self {
        Self::default()
    }

    /// Output rendered the way [`StdConsole`] would print it.
    pub fn output_text(&self) -> String {
        self.output.iter().map(|v| format!("{}\n", v)).collect()
    }

    /// Forget everything recorded so far.
    pub fn clear(&mut self) {
        self.output.clear();
        self.diagnostics.clear();
    }
}

impl Console for BufferConsole {
    fn print(&mut self, value: u8) {
        self.output.push(value);
    }

    fn diagnostic(&mut self, message: &str) {
        self.diagnostics.push(message.to_string());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_buffer_console_records() {
        let mut console = BufferConsole::new();
        console.print(72);
        console.print(5);
        console.diagnostic("bad");

        assert_eq!(console.output, vec![72, 5]);
        assert_eq!(console.output_text(), "72\n5\n");
        assert_eq!(console.diagnostics, vec!["bad".to_string()]);

        console.clear();
        assert!(console.output.is_empty());
    }
}
