//! `.ls8` program files.
//!
//! A simple text format:
//! - One byte per line, written as up to 8 binary digits
//! - `#` starts a comment that runs to the end of the line
//! - Blank lines are ignored
//!
//! ```text
//! # print 8 * 9
//! 00000100 # LDI R0,8
//! 00000000
//! 00001000
//! ```

use crate::asm::disasm;
use crate::cpu::MEMORY_SIZE;
use std::io::Write;
use std::path::Path;
use thiserror::Error;

/// A loaded program.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProgramFile {
    /// Program bytes, to be loaded from address 0.
    pub bytes: Vec<u8>,
    /// Source line each byte came from (1-based).
    pub source_lines: Vec<usize>,
}

impl ProgramFile {
    /// Create a new empty program.
    pub fn new() -> Self {
        Self::default()
    }

    /// Wrap bytes that did not come from a file.
    pub fn from_bytes(bytes: Vec<u8>) -> Self {
        let source_lines = (1..=bytes.len()).collect();
        Self { bytes, source_lines }
    }

    /// Add a byte.
    pub fn push(&mut self, byte: u8, line: usize) {
        self.bytes.push(byte);
        self.source_lines.push(line);
    }

    /// Get the number of bytes.
    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    /// Check if empty.
    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }
}

/// Parse the text of a `.ls8` file.
pub fn parse_program(text: &str) -> Result<ProgramFile, ProgramError> {
    let mut program = ProgramFile::new();

    for (line_num, line) in text.lines().enumerate() {
        let line_num = line_num + 1;
        let code = match line.find('#') {
            Some(idx) => &line[..idx],
            None => line,
        }
        .trim();

        if code.is_empty() {
            continue;
        }

        if let Some(bad) = code.chars().find(|c| !matches!(c, '0' | '1')) {
            return Err(ProgramError::ParseError {
                line: line_num,
                message: format!("unexpected character '{}' in binary value", bad),
            });
        }

        if code.len() > 8 {
            return Err(ProgramError::ParseError {
                line: line_num,
                message: format!("'{}' does not fit in 8 bits", code),
            });
        }

        let byte = u8::from_str_radix(code, 2).map_err(|e| ProgramError::ParseError {
            line: line_num,
            message: e.to_string(),
        })?;
        program.push(byte, line_num);
    }

    if program.len() > MEMORY_SIZE {
        return Err(ProgramError::TooLarge(program.len()));
    }

    Ok(program)
}

/// Load a `.ls8` file from disk.
pub fn load_program<P: AsRef<Path>>(path: P) -> Result<ProgramFile, ProgramError> {
    let text = std::fs::read_to_string(path.as_ref())
        .map_err(|e| ProgramError::IoError(e.to_string()))?;
    let program = parse_program(&text)?;
    log::debug!("read {} bytes from {}", program.len(), path.as_ref().display());
    Ok(program)
}

/// Render bytes as `.ls8` text, annotating each instruction.
pub fn format_program(bytes: &[u8]) -> String {
    let mut out = String::new();
    out.push_str("# LS-8 program\n");
    out.push_str(&format!("# {} bytes\n\n", bytes.len()));

    for line in disasm::listing(bytes) {
        let start = line.address as usize;
        let end = start + line.len as usize;
        out.push_str(&format!("{:08b} # {:03}: {}\n", bytes[start], line.address, line.text));
        for byte in &bytes[start + 1..end] {
            out.push_str(&format!("{:08b}\n", byte));
        }
    }

    out
}

/// Save bytes to a `.ls8` file.
pub fn save_program<P: AsRef<Path>>(path: P, bytes: &[u8]) -> Result<(), ProgramError> {
    let mut file = std::fs::File::create(path.as_ref())
        .map_err(|e| ProgramError::IoError(e.to_string()))?;
    file.write_all(format_program(bytes).as_bytes())
        .map_err(|e| ProgramError::IoError(e.to_string()))?;
    Ok(())
}

/// Errors that can occur while reading or writing program files.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ProgramError {
    #[error("I/O error: {0}")]
    IoError(String),

    #[error("parse error on line {line}: {message}")]
    ParseError { line: usize, message: String },

    #[error("program is {0} bytes, memory holds 256")]
    TooLarge(usize),
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cpu::{BufferConsole, Cpu};

    fn run(source: &str) -> BufferConsole {
        let program = parse_program(source).unwrap();
        let mut cpu = Cpu::with_console(BufferConsole::new());
        for (addr, byte) in program.bytes.iter().enumerate() {
            cpu.poke(addr as u8, *byte);
        }
        cpu.run();
        cpu.into_console()
    }

    #[test]
    fn test_parse_strips_comments_and_blanks() {
        let program = parse_program("# header\n\n00000100 # LDI\n  00000001\n11\n").unwrap();
        assert_eq!(program.bytes, vec![4, 1, 3]);
        assert_eq!(program.source_lines, vec![3, 4, 5]);
    }

    #[test]
    fn test_parse_errors() {
        assert_eq!(
            parse_program("0101\n0102\n"),
            Err(ProgramError::ParseError {
                line: 2,
                message: "unexpected character '2' in binary value".into(),
            })
        );
        assert!(matches!(
            parse_program("100000000"),
            Err(ProgramError::ParseError { line: 1, .. })
        ));
        assert!(matches!(
            parse_program("00000100 LDI"),
            Err(ProgramError::ParseError { line: 1, .. })
        ));

        let too_big = "0\n".repeat(257);
        assert_eq!(parse_program(&too_big), Err(ProgramError::TooLarge(257)));
    }

    #[test]
    fn test_format_round_trips() {
        let bytes = vec![4, 0, 8, 6, 0, 0x1B, 0xFF];
        let text = format_program(&bytes);

        assert!(text.contains("00000100 # 000: LDI R0,8"));
        assert!(text.contains("11111111 # 006: DB 0xFF"));
        assert_eq!(parse_program(&text).unwrap().bytes, bytes);
    }

    #[test]
    fn test_save_and_load() {
        let path = std::env::temp_dir().join(format!("ls8-save-{}.ls8", std::process::id()));
        save_program(&path, &[4, 2, 7, 0x1B]).unwrap();

        let program = load_program(&path).unwrap();
        std::fs::remove_file(&path).unwrap();

        assert_eq!(program.bytes, vec![4, 2, 7, 0x1B]);
    }

    #[test]
    fn test_load_missing_file() {
        assert!(matches!(
            load_program("/nonexistent/program.ls8"),
            Err(ProgramError::IoError(_))
        ));
    }

    #[test]
    fn test_demo_mult() {
        assert_eq!(run(include_str!("../../demos/mult.ls8")).output, vec![72]);
    }

    #[test]
    fn test_demo_stack() {
        assert_eq!(run(include_str!("../../demos/stack.ls8")).output, vec![5]);
    }

    #[test]
    fn test_demo_call() {
        assert_eq!(run(include_str!("../../demos/call.ls8")).output, vec![20, 30, 36, 60]);
    }

    #[test]
    fn test_demo_invalid() {
        let console = run(include_str!("../../demos/invalid.ls8"));
        assert!(console.output.is_empty());
        assert_eq!(
            console.diagnostics,
            vec!["Invalid instruction at address 0: 11111111".to_string()]
        );
    }
}
