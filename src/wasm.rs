//! WebAssembly bindings for the LS-8 emulator.
//!
//! This module provides JavaScript-friendly wrappers around the core emulator.

use wasm_bindgen::prelude::*;
use crate::asm::disasm::disassemble_at;
use crate::{assemble, parse_program, BufferConsole, Console, Cpu, Reg};

/// Initialize panic hook for better error messages in console.
#[wasm_bindgen(start)]
pub fn init() {
    console_error_panic_hook::set_once();
}

/// WebAssembly-friendly CPU wrapper.
#[wasm_bindgen]
pub struct WasmCpu {
    cpu: Cpu<BufferConsole>,
    program: Vec<u8>,
}

#[wasm_bindgen]
impl WasmCpu {
    /// Create a new CPU instance.
    #[wasm_bindgen(constructor)]
    pub fn new() -> Self {
        Self {
            cpu: Cpu::with_console(BufferConsole::new()),
            program: Vec::new(),
        }
    }

    /// Load a program from assembly source code. Returns its size in bytes.
    #[wasm_bindgen]
    pub fn load_asm(&mut self, source: &str) -> Result<usize, JsError> {
        let bytes = assemble(source)
            .map_err(|e| JsError::new(&e.to_string()))?;
        self.load(bytes)
    }

    /// Load a program from `.ls8` text. Returns its size in bytes.
    #[wasm_bindgen]
    pub fn load_ls8(&mut self, text: &str) -> Result<usize, JsError> {
        let program = parse_program(text)
            .map_err(|e| JsError::new(&e.to_string()))?;
        self.load(program.bytes)
    }

    /// Step one instruction. Returns the disassembled instruction, or the
    /// diagnostic if it faulted.
    #[wasm_bindgen]
    pub fn step(&mut self) -> Result<String, JsError> {
        if !self.cpu.is_running() {
            return Err(JsError::new("CPU is halted"));
        }

        let line = disassemble_at(self.cpu.mem.as_slice(), self.cpu.regs.pc);
        match self.cpu.tick() {
            Some(_) => Ok(line.text),
            None => Err(JsError::new(&self.diagnostics())),
        }
    }

    /// Run until halt or max cycles. Returns the total cycle count.
    #[wasm_bindgen]
    pub fn run(&mut self, max_cycles: u32) -> u64 {
        self.cpu.run_limited(max_cycles as u64);
        self.cpu.cycles
    }

    /// Reset CPU to initial state with the loaded program.
    #[wasm_bindgen]
    pub fn reset(&mut self) {
        self.cpu.reset();
        self.cpu.console_mut().clear();
        if let Err(e) = self.cpu.load_program(&self.program) {
            self.cpu.console_mut().diagnostic(&e.to_string());
        }
    }

    /// Check if CPU is running.
    #[wasm_bindgen]
    pub fn is_running(&self) -> bool {
        self.cpu.is_running()
    }

    /// Check if CPU is halted.
    #[wasm_bindgen]
    pub fn is_halted(&self) -> bool {
        self.cpu.is_halted()
    }

    /// Get cycle count.
    #[wasm_bindgen]
    pub fn cycles(&self) -> u64 {
        self.cpu.cycles
    }

    /// Get program counter.
    #[wasm_bindgen]
    pub fn pc(&self) -> u8 {
        self.cpu.regs.pc
    }

    /// Get stack pointer.
    #[wasm_bindgen]
    pub fn sp(&self) -> u8 {
        self.cpu.regs.sp()
    }

    /// Get a general purpose register (0-7).
    #[wasm_bindgen]
    pub fn register(&self, index: u8) -> Result<u8, JsError> {
        let reg = Reg::new(index).map_err(|e| JsError::new(&e.to_string()))?;
        Ok(self.cpu.regs.get(reg))
    }

    /// Get state as string.
    #[wasm_bindgen]
    pub fn state(&self) -> String {
        format!("{:?}", self.cpu.state)
    }

    /// Get memory byte at an address.
    #[wasm_bindgen]
    pub fn memory_at(&self, addr: u8) -> u8 {
        self.cpu.peek(addr)
    }

    /// Get all of memory.
    #[wasm_bindgen]
    pub fn memory_all(&self) -> Vec<u8> {
        self.cpu.mem.as_slice().to_vec()
    }

    /// Values printed by PRN so far.
    #[wasm_bindgen]
    pub fn output(&self) -> Vec<u8> {
        self.cpu.console().output.clone()
    }

    /// Fault diagnostics, newline separated.
    #[wasm_bindgen]
    pub fn diagnostics(&self) -> String {
        self.cpu.console().diagnostics.join("\n")
    }

    /// Get the register file as JSON.
    #[wasm_bindgen]
    pub fn registers_json(&self) -> Result<String, JsError> {
        serde_json::to_string(&self.cpu.regs)
            .map_err(|e| JsError::new(&e.to_string()))
    }
}

impl WasmCpu {
    fn load(&mut self, bytes: Vec<u8>) -> Result<usize, JsError> {
        let len = bytes.len();
        self.program = bytes;
        self.reset();
        if let Some(message) = self.cpu.console().diagnostics.last() {
            return Err(JsError::new(message));
        }
        Ok(len)
    }
}

impl Default for WasmCpu {
    fn default() -> Self {
        Self::new()
    }
}

/// Assemble source code and return the machine code.
#[wasm_bindgen]
pub fn wasm_assemble(source: &str) -> Result<Vec<u8>, JsError> {
    assemble(source).map_err(|e| JsError::new(&e.to_string()))
}

/// Disassemble the instruction at the start of `bytes`.
#[wasm_bindgen]
pub fn wasm_disassemble(bytes: &[u8]) -> String {
    crate::asm::disasm::disassemble_instruction(bytes)
}
