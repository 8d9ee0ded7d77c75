//! CPU execution engine for the LS-8.
//!
//! Implements the fetch-decode-execute cycle and all instruction handlers.

use crate::config::MachineConfig;
use crate::cpu::alu::AluOp;
use crate::cpu::console::{Console, StdConsole};
use crate::cpu::dispatch::DispatchTable;
use crate::cpu::memory::MemoryError;
use crate::cpu::opcode::Opcode;
use crate::cpu::registers::{Reg, DEFAULT_SP};
use crate::cpu::{Memory, Registers};
use serde::{Serialize, Deserialize};
use thiserror::Error;

/// CPU execution state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CpuState {
    /// CPU is fetching and executing instructions.
    Running,
    /// CPU has stopped, either on HLT or on a fault. Terminal until reset.
    Halted,
}

/// The LS-8 CPU.
pub struct Cpu<C: Console = StdConsole> {
    /// CPU registers.
    pub regs: Registers,
    /// Main memory.
    pub mem: Memory,
    /// Current execution state.
    pub state: CpuState,
    /// Instruction count.
    pub cycles: u64,
    console: C,
    table: DispatchTable<C>,
    initial_sp: u8,
    fault: Option<CpuError>,
    last_opcode: Option<Opcode>,
}

impl Cpu<StdConsole> {
    /// Create a CPU that prints to stdout and reports faults on stderr.
    pub fn new() -> Self {
        Self::with_console(StdConsole)
    }
}

impl Default for Cpu<StdConsole> {
    fn default() -> Self {
        Self::new()
    }
}

impl<C: Console> Cpu<C> {
    /// Create a CPU with zeroed memory, SP at its default and the given
    /// console.
    pub fn with_console(console: C) -> Self {
        Self::with_stack_pointer(DEFAULT_SP, console)
    }

    /// Create a CPU configured from a [`MachineConfig`].
    pub fn with_config(config: &MachineConfig, console: C) -> Self {
        Self::with_stack_pointer(config.initial_sp, console)
    }

    fn with_stack_pointer(initial_sp: u8, console: C) -> Self {
        Self {
            regs: Registers::with_sp(initial_sp),
            mem: Memory::new(),
            state: CpuState::Running,
            cycles: 0,
            console,
            table: DispatchTable::new(),
            initial_sp,
            fault: None,
            last_opcode: None,
        }
    }

    /// Reset registers, memory and state. The console is left alone.
    pub fn reset(&mut self) {
        self.regs.reset(self.initial_sp);
        self.mem.clear();
        self.state = CpuState::Running;
        self.cycles = 0;
        self.fault = None;
        self.last_opcode = None;
    }

    /// Store a byte in memory. Used by program loaders.
    pub fn poke(&mut self, addr: u8, value: u8) {
        self.mem.write(addr, value);
    }

    /// Read a byte from memory.
    pub fn peek(&self, addr: u8) -> u8 {
        self.mem.read(addr)
    }

    /// Load a program into memory at address 0.
    pub fn load_program(&mut self, program: &[u8]) -> Result<(), MemoryError> {
        self.mem.load_program(0, program)?;
        log::debug!("loaded {} program bytes", program.len());
        Ok(())
    }

    /// Execute a single instruction.
    ///
    /// Returns the opcode that was executed. On error nothing has been
    /// reported and registers, memory and state are unchanged, including IR;
    /// see [`Cpu::tick`] for the handled variant.
    pub fn step(&mut self) -> Result<Opcode, CpuError> {
        if self.state != CpuState::Running {
            return Err(CpuError::NotRunning(self.state));
        }

        // Fetch
        let pc = self.regs.pc;
        let byte = self.mem.read(pc);

        // Decode
        let (opcode, handler) = self.table.lookup(byte).ok_or(CpuError::InvalidInstruction {
            address: pc,
            opcode: byte,
        })?;

        // Execute. Handlers validate operands before writing anything.
        let previous_ir = std::mem::replace(&mut self.regs.ir, byte);
        if let Err(e) = handler(self) {
            self.regs.ir = previous_ir;
            return Err(e);
        }

        log::trace!("{:03}: {} -> pc={:03} sp={:#04x}", pc, opcode, self.regs.pc, self.regs.sp());

        self.cycles += 1;
        self.last_opcode = Some(opcode);

        Ok(opcode)
    }

    /// Advance the CPU one cycle.
    ///
    /// Faults are reported on the console and halt the CPU. Returns the
    /// executed opcode, or `None` if nothing ran.
    pub fn tick(&mut self) -> Option<Opcode> {
        if !self.is_running() {
            return None;
        }

        match self.step() {
            Ok(opcode) => Some(opcode),
            Err(e) => {
                self.raise_fault(e);
                None
            }
        }
    }

    /// Run until halt or fault.
    ///
    /// Returns the number of instructions executed.
    pub fn run(&mut self) -> u64 {
        let start_cycles = self.cycles;
        while self.tick().is_some() {}
        self.cycles - start_cycles
    }

    /// Run for at most `max_cycles` instructions.
    pub fn run_limited(&mut self, max_cycles: u64) -> u64 {
        let start_cycles = self.cycles;
        let limit = self.cycles.saturating_add(max_cycles);

        while self.cycles < limit && self.tick().is_some() {}

        self.cycles - start_cycles
    }

    /// Stop the execution cycle. Safe to call when already stopped.
    pub fn stop(&mut self) {
        if self.state == CpuState::Running {
            self.state = CpuState::Halted;
            log::debug!("cpu stopped after {} cycles", self.cycles);
        }
    }

    fn raise_fault(&mut self, error: CpuError) {
        let message = error.to_string();
        log::error!("{}", message);
        self.console.diagnostic(&message);
        self.fault = Some(error);
        self.stop();
    }

    /// Apply an ALU operation to two registers, storing the result in `a`.
    pub fn alu(&mut self, op: AluOp, a: Reg, b: Reg) {
        let result = op.apply(self.regs.get(a), self.regs.get(b));
        self.regs.set(a, result);
    }

    // ==================== Operand helpers ====================

    /// Operand byte `offset` bytes past the current instruction.
    fn operand(&self, offset: u8) -> u8 {
        self.mem.read(self.regs.pc.wrapping_add(offset))
    }

    fn register_operand(&self, offset: u8) -> Result<Reg, CpuError> {
        let index = self.operand(offset);
        Reg::new(index).map_err(|_| CpuError::InvalidRegister {
            address: self.regs.pc,
            index,
        })
    }

    fn decrement_sp(&mut self) -> u8 {
        let (sp, wrapped) = self.regs.sp().overflowing_sub(1);
        if wrapped {
            log::warn!("stack pointer wrapped below 0x00 at pc={:03}", self.regs.pc);
        }
        self.regs.set_sp(sp);
        sp
    }

    fn increment_sp(&mut self) {
        let (sp, wrapped) = self.regs.sp().overflowing_add(1);
        if wrapped {
            log::warn!("stack pointer wrapped past 0xFF at pc={:03}", self.regs.pc);
        }
        self.regs.set_sp(sp);
    }

    // ==================== Handlers ====================

    pub(crate) fn hlt(&mut self) -> Result<(), CpuError> {
        self.stop();
        Ok(())
    }

    pub(crate) fn ldi(&mut self) -> Result<(), CpuError> {
        let reg = self.register_operand(1)?;
        let value = self.operand(2);
        self.regs.set(reg, value);
        self.regs.advance_pc(3);
        Ok(())
    }

    pub(crate) fn mul(&mut self) -> Result<(), CpuError> {
        let a = self.register_operand(1)?;
        let b = self.register_operand(2)?;
        self.alu(AluOp::Mul, a, b);
        self.regs.advance_pc(3);
        Ok(())
    }

    pub(crate) fn add(&mut self) -> Result<(), CpuError> {
        let a = self.register_operand(1)?;
        let b = self.register_operand(2)?;
        self.alu(AluOp::Add, a, b);
        self.regs.advance_pc(3);
        Ok(())
    }

    pub(crate) fn prn(&mut self) -> Result<(), CpuError> {
        let reg = self.register_operand(1)?;
        self.console.print(self.regs.get(reg));
        self.regs.advance_pc(2);
        Ok(())
    }

    pub(crate) fn push(&mut self) -> Result<(), CpuError> {
        let reg = self.register_operand(1)?;
        let sp = self.decrement_sp();
        self.mem.write(sp, self.regs.get(reg));
        self.regs.advance_pc(2);
        Ok(())
    }

    pub(crate) fn pop(&mut self) -> Result<(), CpuError> {
        let reg = self.register_operand(1)?;
        let value = self.mem.read(self.regs.sp());
        self.regs.set(reg, value);
        self.increment_sp();
        self.regs.advance_pc(2);
        Ok(())
    }

    pub(crate) fn call(&mut self) -> Result<(), CpuError> {
        let reg = self.register_operand(1)?;
        let return_addr = self.regs.pc.wrapping_add(2);
        let sp = self.decrement_sp();
        self.mem.write(sp, return_addr);
        self.regs.set_pc(self.regs.get(reg));
        Ok(())
    }

    pub(crate) fn ret(&mut self) -> Result<(), CpuError> {
        let addr = self.mem.read(self.regs.sp());
        self.increment_sp();
        self.regs.set_pc(addr);
        Ok(())
    }

    pub(crate) fn jmp(&mut self) -> Result<(), CpuError> {
        let reg = self.register_operand(1)?;
        self.regs.set_pc(self.regs.get(reg));
        Ok(())
    }

    // ==================== Inspection ====================

    /// The opcode most recently executed.
    pub fn last_opcode(&self) -> Option<Opcode> {
        self.last_opcode
    }

    /// The fault that halted the CPU, if it did not stop on HLT.
    pub fn fault(&self) -> Option<&CpuError> {
        self.fault.as_ref()
    }

    /// Check if the CPU is halted.
    pub fn is_halted(&self) -> bool {
        self.state == CpuState::Halted
    }

    /// Check if the CPU is running.
    pub fn is_running(&self) -> bool {
        self.state == CpuState::Running
    }

    pub fn console(&self) -> &C {
        &self.console
    }

    pub fn console_mut(&mut self) -> &mut C {
        &mut self.console
    }

    /// Consume the CPU, returning its console.
    pub fn into_console(self) -> C {
        self.console
    }

    /// Capture registers, memory and state in a serializable form.
    pub fn snapshot(&self) -> CpuSnapshot {
        CpuSnapshot {
            regs: self.regs.clone(),
            memory: self.mem.as_slice().to_vec(),
            state: self.state,
            cycles: self.cycles,
            fault: self.fault.as_ref().map(|e| e.to_string()),
        }
    }
}

impl<C: Console> std::fmt::Debug for Cpu<C> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Cpu")
            .field("state", &self.state)
            .field("cycles", &self.cycles)
            .field("regs", &self.regs)
            .field("fault", &self.fault)
            .finish()
    }
}

/// A point-in-time copy of the machine.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CpuSnapshot {
    pub regs: Registers,
    pub memory: Vec<u8>,
    pub state: CpuState,
    pub cycles: u64,
    pub fault: Option<String>,
}

/// Errors that can occur during CPU execution.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CpuError {
    #[error("CPU not running: {0:?}")]
    NotRunning(CpuState),

    #[error("Invalid instruction at address {address}: {opcode:08b}")]
    InvalidInstruction { address: u8, opcode: u8 },

    #[error("Invalid register R{index} at address {address}")]
    InvalidRegister { address: u8, index: u8 },
}
