//! Debugger application state and logic.

use crate::asm::disasm::{disassemble_at, Line};
use crate::cpu::MEMORY_SIZE;
use crate::{BufferConsole, Cpu};
use std::collections::HashSet;

/// Bytes shown per row of the memory view.
pub const MEMORY_ROW: usize = 8;

/// Debugger application state.
pub struct DebuggerApp {
    /// The CPU being debugged.
    pub cpu: Cpu<BufferConsole>,
    /// Original program for reference.
    pub program: Vec<u8>,
    /// Breakpoints (by address).
    pub breakpoints: HashSet<u8>,
    /// Is the debugger running continuously?
    pub running: bool,
    /// Should we quit?
    pub should_quit: bool,
    /// Status message to display.
    pub status: String,
    /// Memory view scroll offset, in rows.
    pub mem_scroll: usize,
}

impl DebuggerApp {
    /// Create a new debugger with a loaded program.
    pub fn new(program: Vec<u8>) -> Self {
        let mut app = Self {
            cpu: Cpu::with_console(BufferConsole::new()),
            program,
            breakpoints: HashSet::new(),
            running: false,
            should_quit: false,
            status: "Ready. Press 's' to step, 'r' to run, 'q' to quit.".into(),
            mem_scroll: 0,
        };
        app.load();
        app
    }

    fn load(&mut self) {
        if let Err(e) = self.cpu.load_program(&self.program) {
            self.status = format!("Error: {}", e);
        }
    }

    /// Step one instruction.
    pub fn step(&mut self) {
        if !self.cpu.is_running() {
            self.status = self.halt_message();
            self.running = false;
            return;
        }

        let pc = self.cpu.regs.pc;
        let line = disassemble_at(self.cpu.mem.as_slice(), pc);
        match self.cpu.tick() {
            Some(_) => {
                self.status = format!("PC={:03}: {}", pc, line.text);
            }
            None => {
                self.status = self.halt_message();
                self.running = false;
            }
        }
    }

    fn halt_message(&self) -> String {
        match self.cpu.fault() {
            Some(fault) => format!("Error: {}", fault),
            None => format!("Halted after {} cycles", self.cpu.cycles),
        }
    }

    /// Run until halt, breakpoint, or error.
    pub fn run(&mut self) {
        self.running = true;
        self.status = "Running...".into();
    }

    /// Run one iteration of continuous execution.
    pub fn tick(&mut self) {
        if !self.running {
            return;
        }

        if !self.cpu.is_running() {
            self.running = false;
            self.status = self.halt_message();
            return;
        }

        self.step();

        let pc = self.cpu.regs.pc;
        if self.running && self.breakpoints.contains(&pc) {
            self.running = false;
            self.status = format!("Breakpoint at PC={:03}", pc);
        }
    }

    /// Toggle breakpoint at current PC.
    pub fn toggle_breakpoint(&mut self) {
        let pc = self.cpu.regs.pc;
        if self.breakpoints.remove(&pc) {
            self.status = format!("Removed breakpoint at PC={:03}", pc);
        } else {
            self.breakpoints.insert(pc);
            self.status = format!("Set breakpoint at PC={:03}", pc);
        }
    }

    /// Reset CPU to initial state and reload the program.
    pub fn reset(&mut self) {
        self.cpu.reset();
        self.cpu.console_mut().clear();
        self.load();
        self.running = false;
        self.status = "Reset. Ready.".into();
    }

    pub fn scroll_up(&mut self) {
        self.mem_scroll = self.mem_scroll.saturating_sub(1);
    }

    pub fn scroll_down(&mut self) {
        if self.mem_scroll + 1 < MEMORY_SIZE / MEMORY_ROW {
            self.mem_scroll += 1;
        }
    }

    /// Instructions starting at PC, each flagged if it is the current one.
    ///
    /// Decoding starts at PC because earlier instruction boundaries cannot be
    /// recovered from memory alone.
    pub fn get_disassembly(&self, lines: usize) -> Vec<(Line, bool)> {
        let pc = self.cpu.regs.pc;
        let memory = self.cpu.mem.as_slice();
        let mut addr = pc as usize;
        let mut out = Vec::with_capacity(lines);

        while out.len() < lines && addr < MEMORY_SIZE {
            let line = disassemble_at(memory, addr as u8);
            addr += line.len as usize;
            let is_current = line.address == pc;
            out.push((line, is_current));
        }

        out
    }
}

/// Run the debugger with a program.
pub fn run_debugger(program: Vec<u8>) -> std::io::Result<()> {
    use crossterm::{
        event::{self, Event, KeyCode, KeyEventKind},
        terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
        ExecutableCommand,
    };
    use ratatui::prelude::*;
    use std::io::stdout;
    use std::time::Duration;

    // Setup terminal
    enable_raw_mode()?;
    stdout().execute(EnterAlternateScreen)?;
    let mut terminal = Terminal::new(CrosstermBackend::new(stdout()))?;

    let mut app = DebuggerApp::new(program);

    loop {
        terminal.draw(|frame| {
            super::ui::draw(frame, &app);
        })?;

        if event::poll(Duration::from_millis(50))? {
            if let Event::Key(key) = event::read()? {
                if key.kind == KeyEventKind::Press {
                    match key.code {
                        KeyCode::Char('q') => app.should_quit = true,
                        KeyCode::Char('s') => {
                            app.running = false;
                            app.step();
                        }
                        KeyCode::Char('r') => app.run(),
                        KeyCode::Char('p') => {
                            app.running = false;
                            app.status = "Paused.".into();
                        }
                        KeyCode::Char('b') => app.toggle_breakpoint(),
                        KeyCode::Char('x') => app.reset(),
                        KeyCode::Up => app.scroll_up(),
                        KeyCode::Down => app.scroll_down(),
                        _ => {}
                    }
                }
            }
        }

        if app.running {
            app.tick();
        }

        if app.should_quit {
            break;
        }
    }

    // Restore terminal
    disable_raw_mode()?;
    stdout().execute(LeaveAlternateScreen)?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::assemble;

    fn app(source: &str) -> DebuggerApp {
        DebuggerApp::new(assemble(source).unwrap())
    }

    #[test]
    fn test_step_updates_status() {
        let mut app = app("LDI R0, 4\nPRN R0\nHLT");

        app.step();
        assert_eq!(app.status, "PC=000: LDI R0,4");

        app.step();
        assert_eq!(app.cpu.console().output, vec![4]);
    }

    #[test]
    fn test_breakpoint_pauses_run() {
        let mut app = app("LDI R0, 1\nLDI R1, 2\nHLT");
        app.cpu.regs.pc = 3;
        app.toggle_breakpoint();
        app.cpu.regs.pc = 0;

        app.run();
        while app.running {
            app.tick();
        }

        assert_eq!(app.cpu.regs.pc, 3);
        assert_eq!(app.status, "Breakpoint at PC=003");
    }

    #[test]
    fn test_fault_is_shown() {
        let mut app = DebuggerApp::new(vec![0xFF]);

        app.step();

        assert!(app.cpu.is_halted());
        assert_eq!(app.status, "Error: Invalid instruction at address 0: 11111111");
    }

    #[test]
    fn test_reset_clears_output() {
        let mut app = app("LDI R0, 4\nPRN R0\nHLT");
        app.run();
        while app.running {
            app.tick();
        }
        assert!(app.cpu.is_halted());

        app.reset();

        assert!(app.cpu.is_running());
        assert!(app.cpu.console().output.is_empty());
        assert_eq!(app.cpu.peek(0), 4);
    }

    #[test]
    fn test_disassembly_starts_at_pc() {
        let app = app("LDI R0, 4\nPRN R0\nHLT");

        let lines = app.get_disassembly(3);
        let text: Vec<&str> = lines.iter().map(|(l, _)| l.text.as_str()).collect();

        assert_eq!(text, vec!["LDI R0,4", "PRN R0", "HLT"]);
        assert!(lines[0].1);
        assert!(!lines[1].1);
    }
}
