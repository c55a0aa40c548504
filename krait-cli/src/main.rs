//! Krait CLI: assemble, run, and execute programs.
//!
//! Exit codes:
//! - 0: Success
//! - 1: Input, assembly, or decode error
//! - 2: Runtime error

mod commands;

use std::process;

fn main() {
    let args: Vec<String> = std::env::args().collect();

    if args.len() < 2 {
        print_usage();
        process::exit(1);
    }

    let result = match args[1].as_str() {
        "assemble" => commands::assemble(&args[2..]),
        "run" => commands::run(&args[2..]),
        "exec" => commands::exec(&args[2..]),
        "--help" | "-h" | "help" => {
            print_usage();
            process::exit(0);
        }
        other => {
            eprintln!("error: unknown command '{other}'");
            eprintln!();
            print_usage();
            process::exit(1);
        }
    };

    if let Err(code) = result {
        process::exit(code);
    }
}

fn print_usage() {
    eprintln!("Usage: krait <command> [args]");
    eprintln!();
    eprintln!("Commands:");
    eprintln!("  assemble <input.kra> [-o output.krab]   Assemble text to binary");
    eprintln!("  run <input.krab>                        Execute a binary program");
    eprintln!("  exec <input.kra>                        Assemble and execute in one step");
}
