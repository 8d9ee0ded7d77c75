//! LS-8 Emulator - CLI Entry Point
//!
//! Commands:
//! - `ls8-emu run <program>` - Run an `.ls8` or `.asm` file
//! - `ls8-emu debug <program>` - Interactive debugger
//! - `ls8-emu asm <source>` - Assemble to `.ls8`
//! - `ls8-emu disasm <program>` - Disassemble an `.ls8` file

use clap::{Parser, Subcommand};
use log::LevelFilter;
use simple_logger::SimpleLogger;

#[derive(Parser)]
#[command(name = "ls8-emu")]
#[command(version = "0.1.0")]
#[command(about = "An emulator for the LS-8, a small 8-bit teaching CPU")]
struct Cli {
    /// Increase log verbosity (-v debug, -vv trace)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a program until it halts
    Run {
        /// Path to the .ls8 or .asm file to execute
        program: String,
        /// Maximum number of instructions to run
        #[arg(short, long)]
        max_cycles: Option<u64>,
        /// Show trace output
        #[arg(short, long)]
        trace: bool,
        /// Run as fast as possible instead of on the periodic clock
        #[arg(long)]
        tight: bool,
        /// Machine configuration file (JSON)
        #[arg(short, long)]
        config: Option<String>,
        /// Print the final machine state as JSON
        #[arg(long)]
        dump: bool,
    },
    /// Interactive debugger
    Debug {
        /// Path to the .ls8 or .asm file to debug
        program: String,
    },
    /// Assemble source to .ls8
    Asm {
        /// Path to the source file
        source: String,
        /// Output .ls8 file
        #[arg(short, long)]
        output: Option<String>,
    },
    /// Disassemble an .ls8 file to readable text
    Disasm {
        /// Path to the .ls8 file
        program: String,
    },
}

fn main() {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    match cli.command {
        Some(Commands::Run { program, max_cycles, trace, tight, config, dump }) => {
            run_program(&program, max_cycles, trace, tight, config.as_deref(), dump);
        }
        Some(Commands::Debug { program }) => {
            debug_program(&program);
        }
        Some(Commands::Asm { source, output }) => {
            assemble_file(&source, output);
        }
        Some(Commands::Disasm { program }) => {
            disassemble_file(&program);
        }
        None => {
            println!("LS-8 Emulator v0.1.0");
            println!("An 8-bit teaching CPU emulator");
            println!();
            println!("Use --help for available commands");
            println!();
            run_demo();
        }
    }
}

fn init_logging(verbose: u8) {
    let level = match verbose {
        0 => LevelFilter::Warn,
        1 => LevelFilter::Debug,
        _ => LevelFilter::Trace,
    };

    if let Err(e) = SimpleLogger::new().with_level(level).init() {
        eprintln!("failed to initialise logging: {}", e);
    }
}

/// Read a program, assembling it first if it is `.asm` source.
fn read_program(path: &str) -> Vec<u8> {
    use ls8::{assemble, load_program};

    let bytes = if path.ends_with(".asm") {
        let source = match std::fs::read_to_string(path) {
            Ok(s) => s,
            Err(e) => {
                eprintln!("Failed to read file: {}", e);
                std::process::exit(1);
            }
        };

        match assemble(&source) {
            Ok(bytes) => {
                log::info!("assembled {} bytes", bytes.len());
                bytes
            }
            Err(e) => {
                eprintln!("Assembly error: {}", e);
                std::process::exit(1);
            }
        }
    } else {
        match load_program(path) {
            Ok(program) => program.bytes,
            Err(e) => {
                eprintln!("Failed to load program: {}", e);
                std::process::exit(1);
            }
        }
    };

    if bytes.is_empty() {
        eprintln!("No instructions to execute");
        std::process::exit(1);
    }

    bytes
}

fn run_program(path: &str, max_cycles: Option<u64>, trace: bool, tight: bool, config: Option<&str>, dump: bool) {
    use ls8::asm::disasm::disassemble_at;
    use ls8::cpu::{Clock, StopReason};
    use ls8::{Cpu, MachineConfig, StdConsole};

    let mut config = match config {
        Some(path) => match MachineConfig::load(path) {
            Ok(c) => c,
            Err(e) => {
                eprintln!("Failed to load config: {}", e);
                std::process::exit(1);
            }
        },
        None => MachineConfig::default(),
    };
    if max_cycles.is_some() {
        config.max_cycles = max_cycles;
    }
    if tight {
        config.tick_interval_ms = 0;
    }

    let bytes = read_program(path);

    let mut cpu = Cpu::with_config(&config, StdConsole);
    if let Err(e) = cpu.load_program(&bytes) {
        eprintln!("Failed to load program: {}", e);
        std::process::exit(1);
    }

    let mut clock = Clock::from_config(&config);
    let summary = clock.run_with(&mut cpu, |_, cpu, pc, _| {
        if trace {
            let line = disassemble_at(cpu.mem.as_slice(), pc);
            eprintln!(
                "{:03}: {:<12} PC={:03} SP={:#04x} {:?}",
                pc,
                line.text,
                cpu.regs.pc,
                cpu.regs.sp(),
                cpu.regs.general
            );
        }
    });

    log::info!("executed {} instructions: {:?}", summary.cycles, summary.reason);

    if dump {
        match serde_json::to_string_pretty(&cpu.snapshot()) {
            Ok(json) => println!("{}", json),
            Err(e) => eprintln!("Failed to serialize state: {}", e),
        }
    }

    match summary.reason {
        StopReason::Halted | StopReason::Stopped => {}
        StopReason::CycleLimit => {
            eprintln!("Reached max cycles limit ({}). Use --max-cycles to increase.", summary.cycles);
        }
        StopReason::Fault(_) => std::process::exit(1),
    }
}

#[cfg(feature = "tui")]
fn debug_program(path: &str) {
    use ls8::run_debugger;

    let bytes = read_program(path);

    if let Err(e) = run_debugger(bytes) {
        eprintln!("Debugger error: {}", e);
        std::process::exit(1);
    }
}

#[cfg(not(feature = "tui"))]
fn debug_program(_path: &str) {
    eprintln!("This build does not include the debugger (enable the `tui` feature)");
    std::process::exit(1);
}

fn assemble_file(source_path: &str, output: Option<String>) {
    use ls8::{assemble, save_program};

    let out_path = output.unwrap_or_else(|| source_path.replace(".asm", ".ls8"));

    println!("Assembling: {} -> {}", source_path, out_path);

    let source = match std::fs::read_to_string(source_path) {
        Ok(s) => s,
        Err(e) => {
            eprintln!("Failed to read file: {}", e);
            std::process::exit(1);
        }
    };

    let bytes = match assemble(&source) {
        Ok(bytes) => bytes,
        Err(e) => {
            eprintln!("Assembly error: {}", e);
            std::process::exit(1);
        }
    };

    println!("Assembled {} bytes", bytes.len());

    if let Err(e) = save_program(&out_path, &bytes) {
        eprintln!("Failed to save program: {}", e);
        std::process::exit(1);
    }

    println!("Saved to {}", out_path);
}

fn disassemble_file(path: &str) {
    use ls8::{disassemble, load_program};

    let program = match load_program(path) {
        Ok(p) => p,
        Err(e) => {
            eprintln!("Failed to load program: {}", e);
            std::process::exit(1);
        }
    };

    println!("{}", disassemble(&program.bytes));
}

fn run_demo() {
    use ls8::{assemble, BufferConsole, Cpu};

    println!("Demo: LDI R0,8; LDI R1,9; MUL R0,R1; PRN R0; HLT");

    let program = match assemble("LDI R0, 8\nLDI R1, 9\nMUL R0, R1\nPRN R0\nHLT") {
        Ok(bytes) => bytes,
        Err(e) => {
            eprintln!("Assembly error: {}", e);
            std::process::exit(1);
        }
    };

    let mut cpu = Cpu::with_console(BufferConsole::new());
    if let Err(e) = cpu.load_program(&program) {
        eprintln!("Failed to load program: {}", e);
        std::process::exit(1);
    }
    let cycles = cpu.run();

    print!("{}", cpu.console().output_text());
    println!("Executed {} instructions, state {:?}", cycles, cpu.state);
}
