//! Clock driver.
//!
//! Ticks a [`Cpu`] at a fixed interval, one instruction per tick. A second,
//! independent timer raises the timer bit in IS on its own period; nothing
//! services that interrupt. A zero tick interval runs the CPU as a tight
//! loop.

use crate::config::MachineConfig;
use crate::cpu::console::Console;
use crate::cpu::execute::{Cpu, CpuError};
use crate::cpu::opcode::Opcode;
use std::time::{Duration, Instant};

/// Why a clocked run ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StopReason {
    /// The program executed HLT.
    Halted,
    /// The CPU hit a fault and halted.
    Fault(CpuError),
    /// The cycle limit was reached while the CPU was still running.
    CycleLimit,
    /// [`Clock::stop`] was called from the tick callback.
    Stopped,
}

/// Result of [`Clock::run`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunSummary {
    /// Instructions executed during this run.
    pub cycles: u64,
    pub reason: StopReason,
}

/// Periodic driver for the execution cycle and the interrupt timer.
#[derive(Debug, Clone)]
pub struct Clock {
    tick_interval: Duration,
    interrupt_interval: Option<Duration>,
    max_cycles: Option<u64>,
    running: bool,
}

impl Clock {
    /// A clock ticking every `tick_interval`, raising the timer interrupt
    /// flag every `interrupt_interval` (if any).
    pub fn new(tick_interval: Duration, interrupt_interval: Option<Duration>) -> Self {
        Self {
            tick_interval,
            interrupt_interval,
            max_cycles: None,
            running: false,
        }
    }

    /// A clock that ticks as fast as possible.
    pub fn tight() -> Self {
        Self::new(Duration::ZERO, None)
    }

    pub fn from_config(config: &MachineConfig) -> Self {
        let mut clock = Self::new(config.tick_interval(), config.interrupt_interval());
        clock.max_cycles = config.max_cycles;
        clock
    }

    /// Stop after `max_cycles` instructions.
    pub fn with_max_cycles(mut self, max_cycles: u64) -> Self {
        self.max_cycles = Some(max_cycles);
        self
    }

    /// Stop both timers. Safe to call when already stopped.
    pub fn stop(&mut self) {
        if self.running {
            self.running = false;
            log::debug!("clock stopped");
        }
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    /// Run the CPU until it halts or the cycle limit is reached.
    pub fn run<C: Console>(&mut self, cpu: &mut Cpu<C>) -> RunSummary {
        self.run_with(cpu, |_, _, _, _| {})
    }

    /// Like [`Clock::run`], calling `on_tick` after every executed
    /// instruction with the address it was fetched from.
    pub fn run_with<C, F>(&mut self, cpu: &mut Cpu<C>, mut on_tick: F) -> RunSummary
    where
        C: Console,
        F: FnMut(&mut Self, &Cpu<C>, u8, Opcode),
    {
        self.running = true;
        log::debug!(
            "clock started: tick={:?} interrupt={:?}",
            self.tick_interval,
            self.interrupt_interval
        );

        let start = Instant::now();
        let mut next_tick = start;
        let mut next_interrupt = self.interrupt_interval.map(|i| start + i);
        let mut cycles = 0u64;

        let reason = loop {
            if !self.running {
                break StopReason::Stopped;
            }
            if !cpu.is_running() {
                break match cpu.fault() {
                    Some(fault) => StopReason::Fault(fault.clone()),
                    None => StopReason::Halted,
                };
            }
            if self.max_cycles.is_some_and(|max| cycles >= max) {
                break StopReason::CycleLimit;
            }

            let now = Instant::now();

            if let (Some(due), Some(period)) = (next_interrupt, self.interrupt_interval) {
                if now >= due {
                    cpu.regs.raise_timer_interrupt();
                    next_interrupt = Some(due + period);
                }
            }

            if now < next_tick {
                let mut wake = next_tick;
                if let Some(due) = next_interrupt {
                    wake = wake.min(due);
                }
                std::thread::sleep(wake.saturating_duration_since(now));
                continue;
            }

            let pc = cpu.regs.pc;
            if let Some(opcode) = cpu.tick() {
                cycles += 1;
                on_tick(self, &*cpu, pc, opcode);
            }
            next_tick += self.tick_interval;
        };

        self.stop();
        RunSummary { cycles, reason }
    }
}

impl Default for Clock {
    fn default() -> Self {
        Self::from_config(&MachineConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cpu::console::BufferConsole;

    const LDI: u8 = Opcode::Ldi.byte();
    const JMP: u8 = Opcode::Jmp.byte();
    const PRN: u8 = Opcode::Prn.byte();
    const HLT: u8 = Opcode::Hlt.byte();

    fn cpu_with(program: &[u8]) -> Cpu<BufferConsole> {
        let mut cpu = Cpu::with_console(BufferConsole::new());
        cpu.load_program(program).unwrap();
        cpu
    }

    #[test]
    fn test_runs_to_halt() {
        let mut cpu = cpu_with(&[LDI, 0, 3, PRN, 0, HLT]);
        let mut clock = Clock::tight();

        let summary = clock.run(&mut cpu);

        assert_eq!(summary, RunSummary { cycles: 3, reason: StopReason::Halted });
        assert!(!clock.is_running());
        assert_eq!(cpu.console().output, vec![3]);
    }

    #[test]
    fn test_reports_fault() {
        let mut cpu = cpu_with(&[0xFF]);

        let summary = Clock::tight().run(&mut cpu);

        assert_eq!(summary.cycles, 0);
        assert_eq!(
            summary.reason,
            StopReason::Fault(CpuError::InvalidInstruction { address: 0, opcode: 0xFF })
        );
        assert_eq!(cpu.console().diagnostics.len(), 1);
    }

    #[test]
    fn test_cycle_limit() {
        let mut cpu = cpu_with(&[LDI, 0, 0, JMP, 0]);

        let summary = Clock::tight().with_max_cycles(25).run(&mut cpu);

        assert_eq!(summary, RunSummary { cycles: 25, reason: StopReason::CycleLimit });
        assert!(cpu.is_running());
    }

    #[test]
    fn test_periodic_ticks() {
        let mut cpu = cpu_with(&[LDI, 0, 1, LDI, 1, 2, HLT]);
        let mut clock = Clock::new(Duration::from_millis(2), None);

        let start = Instant::now();
        let summary = clock.run(&mut cpu);

        assert_eq!(summary.cycles, 3);
        // The first tick fires immediately, the next two wait an interval each.
        assert!(start.elapsed() >= Duration::from_millis(4));
    }

    #[test]
    fn test_interrupt_timer_sets_flag() {
        let mut cpu = cpu_with(&[LDI, 0, 0, JMP, 0]);
        let mut clock = Clock::new(Duration::from_millis(1), Some(Duration::from_millis(2)))
            .with_max_cycles(10);

        let summary = clock.run(&mut cpu);

        assert_eq!(summary.reason, StopReason::CycleLimit);
        assert!(cpu.regs.timer_interrupt_pending());
    }

    #[test]
    fn test_stop_from_callback() {
        let mut cpu = cpu_with(&[LDI, 0, 0, JMP, 0]);
        let mut clock = Clock::tight();

        let summary = clock.run_with(&mut cpu, |clock, _, _, _| clock.stop());

        assert_eq!(summary, RunSummary { cycles: 1, reason: StopReason::Stopped });
        clock.stop();
        assert!(!clock.is_running());
    }

    #[test]
    fn test_callback_sees_fetch_address() {
        let mut cpu = cpu_with(&[LDI, 0, 9, PRN, 0, HLT]);
        let mut seen = Vec::new();

        Clock::tight().run_with(&mut cpu, |_, _, pc, op| seen.push((pc, op)));

        assert_eq!(seen, vec![(0, Opcode::Ldi), (3, Opcode::Prn), (5, Opcode::Hlt)]);
    }
}
