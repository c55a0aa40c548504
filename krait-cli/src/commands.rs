//! CLI command implementations.

use std::fs;

use krait_common::{Program, Value};
use krait_vm::{Machine, RuntimeError, StdHost};

/// Assemble a .kra text file to a .krab binary.
pub fn assemble(args: &[String]) -> Result<(), i32> {
    if args.is_empty() {
        eprintln!("error: assemble requires an input file");
        eprintln!("Usage: krait assemble <input.kra> [-o output.krab]");
        return Err(1);
    }

    let input = &args[0];
    let output = if args.len() >= 3 && args[1] == "-o" {
        args[2].clone()
    } else {
        default_output(input)
    };

    let text = fs::read_to_string(input).map_err(|e| {
        eprintln!("error: cannot read '{input}': {e}");
        1
    })?;

    let parsed = krait_assembler::parse(&text).map_err(|e| {
        eprintln!("error: {e}");
        1
    })?;
    for warning in &parsed.warnings {
        eprintln!("warning: {warning}");
    }

    let bytes = parsed.program.encode();
    fs::write(&output, &bytes).map_err(|e| {
        eprintln!("error: cannot write '{output}': {e}");
        1
    })?;

    eprintln!(
        "assembled {} instructions ({} bytes) -> {output}",
        parsed.program.len(),
        bytes.len()
    );
    Ok(())
}

/// Decode and execute a .krab binary.
pub fn run(args: &[String]) -> Result<(), i32> {
    if args.is_empty() {
        eprintln!("error: run requires an input file");
        eprintln!("Usage: krait run <input.krab>");
        return Err(1);
    }

    let program = read_binary(&args[0])?;
    execute(&program)
}

/// Assemble a .kra text file and execute it without writing a binary.
pub fn exec(args: &[String]) -> Result<(), i32> {
    if args.is_empty() {
        eprintln!("error: exec requires an input file");
        eprintln!("Usage: krait exec <input.kra>");
        return Err(1);
    }

    let input = &args[0];
    let text = fs::read_to_string(input).map_err(|e| {
        eprintln!("error: cannot read '{input}': {e}");
        1
    })?;

    let parsed = krait_assembler::parse(&text).map_err(|e| {
        eprintln!("error: {e}");
        1
    })?;
    for warning in &parsed.warnings {
        eprintln!("warning: {warning}");
    }

    execute(&parsed.program)
}

// --- Helpers ---

fn default_output(input: &str) -> String {
    if input.ends_with(".kra") {
        format!("{input}b")
    } else {
        format!("{input}.krab")
    }
}

/// Read and decode a .krab binary file.
fn read_binary(path: &str) -> Result<Program, i32> {
    let bytes = fs::read(path).map_err(|e| {
        eprintln!("error: cannot read '{path}': {e}");
        1
    })?;

    Program::decode(&bytes).map_err(|e| {
        eprintln!("error: invalid binary: {e}");
        1
    })
}

/// Execute against the standard host and report the top-level result.
fn execute(program: &Program) -> Result<(), i32> {
    let mut host = StdHost::new();
    register_natives(&mut host);
    let mut machine = Machine::new(host);

    match machine.execute(program) {
        Ok(Some(value)) => {
            println!("= {value}");
            Ok(())
        }
        Ok(None) => Ok(()),
        Err(e) => {
            eprintln!("runtime error: {e}");
            Err(2)
        }
    }
}

/// The native table every CLI execution starts with.
fn register_natives(host: &mut StdHost) {
    host.register("math", "floor", native_floor);
    host.register("math", "sqrt", native_sqrt);
}

fn native_floor(args: &[Value]) -> Result<Value, RuntimeError> {
    Ok(Value::Float64(number_arg(args, "math::floor")?.floor()))
}

fn native_sqrt(args: &[Value]) -> Result<Value, RuntimeError> {
    Ok(Value::Float64(number_arg(args, "math::sqrt")?.sqrt()))
}

fn number_arg(args: &[Value], operator: &'static str) -> Result<f64, RuntimeError> {
    match args.first() {
        Some(Value::Int(i)) => Ok(*i as f64),
        Some(Value::Uint(u)) => Ok(*u as f64),
        Some(Value::Float32(f)) => Ok(f64::from(*f)),
        Some(Value::Float64(f)) => Ok(*f),
        Some(other) => Err(RuntimeError::NotNumeric {
            operator,
            got: other.type_tag().name(),
        }),
        None => Err(RuntimeError::MissingOperand { operator, index: 0 }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_output_swaps_the_extension() {
        assert_eq!(default_output("prog.kra"), "prog.krab");
        assert_eq!(default_output("prog.txt"), "prog.txt.krab");
    }

    #[test]
    fn floor_rounds_down() {
        assert_eq!(
            native_floor(&[Value::Float64(3.7)]),
            Ok(Value::Float64(3.0))
        );
        assert_eq!(native_floor(&[Value::Int(-2)]), Ok(Value::Float64(-2.0)));
    }

    #[test]
    fn sqrt_accepts_any_numeric_subtype() {
        assert_eq!(native_sqrt(&[Value::Int(9)]), Ok(Value::Float64(3.0)));
        assert_eq!(native_sqrt(&[Value::Uint(16)]), Ok(Value::Float64(4.0)));
    }

    #[test]
    fn natives_reject_non_numbers() {
        assert_eq!(
            native_sqrt(&[Value::Text("nine".into())]),
            Err(RuntimeError::NotNumeric {
                operator: "math::sqrt",
                got: "text"
            })
        );
        assert_eq!(
            native_floor(&[]),
            Err(RuntimeError::MissingOperand {
                operator: "math::floor",
                index: 0
            })
        );
    }
}
