//! NotC CLI: assemble, inspect and run bytecode chunks.

use std::env;
use std::fs;
use std::path::Path;
use std::process;

use colored::Colorize;

use notc::error::NotcError;
use notc::RunOptions;

const VERSION: &str = env!("CARGO_PKG_VERSION");

/// CLI command to execute.
enum Command {
    /// Run a chunk file
    Run { file: String },
    /// Print the disassembly of a chunk file
    Disasm { file: String },
    /// Assemble a text file to a JSON chunk
    Assemble { file: String, output: Option<String> },
    /// Run the built-in demo chunk
    Demo,
}

/// CLI options parsed from arguments.
struct Options {
    command: Command,
    run: RunOptions,
}

fn print_usage() {
    eprintln!("NotC {} - bytecode virtual machine", VERSION);
    eprintln!();
    eprintln!("Usage: notc [options] <file>");
    eprintln!("       notc run <file> [--trace] [--disassemble]");
    eprintln!("       notc disasm <file>");
    eprintln!("       notc assemble <file.nca> [-o out.json]");
    eprintln!("       notc demo [--trace] [--disassemble]");
    eprintln!();
    eprintln!("Commands:");
    eprintln!("  run <file>        Load and execute a chunk (.json or assembly text)");
    eprintln!("  disasm <file>     Print the disassembly of a chunk");
    eprintln!("  assemble <file>   Assemble text into a serialized JSON chunk");
    eprintln!("  demo              Run the built-in -((1.2 + 3.4) / 5.6) chunk");
    eprintln!();
    eprintln!("Options:");
    eprintln!("  --trace, -t       Trace stack and instruction before every dispatch");
    eprintln!("  --disassemble, -d Print the disassembly before running");
    eprintln!("  -o <path>         Output path for assemble (default: stdout)");
    eprintln!("  --version, -V     Show version");
    eprintln!("  --help, -h        Show this help message");
    eprintln!();
    eprintln!("Environment:");
    eprintln!("  NOTC_TRACE_EXECUTION=1  Same as --trace");
}

fn usage_error(message: &str) -> ! {
    eprintln!("{}", message);
    print_usage();
    process::exit(64);
}

fn parse_args() -> Options {
    let args: Vec<String> = env::args().skip(1).collect();
    let mut command: Option<Command> = None;
    let mut run = RunOptions::default();
    let mut output: Option<String> = None;

    let mut i = 0;
    while i < args.len() {
        let arg = &args[i];
        match arg.as_str() {
            "run" | "disasm" | "assemble" if command.is_none() => {
                i += 1;
                if i >= args.len() {
                    usage_error(&format!("{} command requires a file argument", arg));
                }
                let file = args[i].clone();
                command = Some(match arg.as_str() {
                    "run" => Command::Run { file },
                    "disasm" => Command::Disasm { file },
                    _ => Command::Assemble { file, output: None },
                });
            }
            "demo" if command.is_none() => {
                command = Some(Command::Demo);
            }
            "--trace" | "-t" => run.trace = true,
            "--disassemble" | "-d" => run.disassemble = true,
            "-o" | "--output" => {
                i += 1;
                if i >= args.len() {
                    usage_error("-o requires a path");
                }
                output = Some(args[i].clone());
            }
            "--help" | "-h" => {
                print_usage();
                process::exit(0);
            }
            "--version" | "-V" => {
                println!("notc {}", VERSION);
                process::exit(0);
            }
            _ if arg.starts_with('-') => {
                usage_error(&format!("Unknown option: {}", arg));
            }
            _ => {
                if command.is_some() {
                    usage_error("Only one chunk file can be specified");
                }
                command = Some(Command::Run { file: arg.clone() });
            }
        }
        i += 1;
    }

    let command = match command {
        Some(Command::Assemble { file, .. }) => Command::Assemble { file, output },
        Some(other) => {
            if output.is_some() {
                usage_error("-o is only valid with the assemble command");
            }
            other
        }
        None => usage_error("No chunk file given"),
    };

    Options { command, run }
}

fn main() {
    let options = parse_args();

    let result = match &options.command {
        Command::Run { file } => notc::run_file(Path::new(file), options.run).map(|_| ()),
        Command::Disasm { file } => run_disasm(file),
        Command::Assemble { file, output } => run_assemble(file, output.as_deref()),
        Command::Demo => run_demo(options.run),
    };

    if let Err(err) = result {
        report(&err);
        process::exit(err.exit_code());
    }
}

fn run_disasm(file: &str) -> Result<(), NotcError> {
    let chunk = notc::load_chunk(Path::new(file))?;
    notc::bytecode::print_disassembly(&chunk, file);
    Ok(())
}

fn run_assemble(file: &str, output: Option<&str>) -> Result<(), NotcError> {
    let chunk = notc::load_chunk(Path::new(file))?;
    let json = notc::chunk_to_json(&chunk)?;

    match output {
        Some(path) => fs::write(path, json + "\n")?,
        None => println!("{}", json),
    }
    Ok(())
}

fn run_demo(options: RunOptions) -> Result<(), NotcError> {
    let chunk = notc::demo_chunk()?;
    notc::run_chunk(&chunk, notc::DEMO_NAME, options)?;
    Ok(())
}

/// Print a failure to stderr. Runtime errors were already reported by the VM.
fn report(err: &NotcError) {
    match err {
        NotcError::Runtime(_) => {}
        other => eprintln!("{} {}", "error:".red().bold(), other),
    }
}
