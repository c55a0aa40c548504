//! Tree-walking evaluator for Krait programs.
//!
//! The machine executes decoded [`Program`]s directly, without a separate
//! compilation step:
//! - An [`machine::Environment`] holds scoped variables and function
//!   definitions shared by every frame
//! - A stack of call frames carries function arguments for GETARG
//! - A [`Host`] supplies the outside world: file loading for EXFILE,
//!   output for PRINTV, and native functions for NFCALL
//!
//! # Usage
//!
//! ```
//! use krait_common::{Expr, Instruction, Opcode, Operator, Operation, Program, Value};
//! use krait_vm::{Machine, MemoryHost};
//!
//! // PRINTV (ADDNUM 2 3)
//! let program = Program::new(vec![Instruction::new(
//!     Opcode::Print,
//!     vec![Expr::Operation(Operation::new(
//!         Operator::Add,
//!         vec![
//!             Expr::Literal(Value::Int(2)),
//!             Expr::Literal(Value::Int(3)),
//!         ],
//!     ))],
//! )]);
//!
//! let mut machine = Machine::new(MemoryHost::default());
//! machine.execute(&program).unwrap();
//! assert_eq!(machine.host().lines, vec!["5"]);
//! ```

pub mod error;
pub mod execute;
pub mod host;
pub mod machine;

pub use error::RuntimeError;
pub use host::{Host, MemoryHost, NativeFn, StdHost};
pub use machine::Machine;

use krait_common::{Program, Value};

/// Execute a program against the process's real stdout and filesystem.
///
/// Returns the program's top-level result: the value of the last RETURN
/// that took effect in the top-level frame, or `None` if no RETURN ran.
///
/// # Errors
///
/// Returns [`RuntimeError`] if evaluation fails (unknown variable,
/// division by zero, bad operand types, etc.). Decode errors from EXFILE
/// payloads are wrapped in [`RuntimeError::Decode`].
pub fn run(program: &Program) -> Result<Option<Value>, RuntimeError> {
    let mut machine = Machine::new(StdHost::default());
    machine.execute(program)
}
