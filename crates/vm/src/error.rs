//! Runtime errors for the Krait evaluator.
//!
//! Evaluation walks a tree rather than a flat instruction array, so errors
//! carry the names involved (variable, function, label, operator) instead
//! of byte offsets.

use krait_common::DecodeError;
use thiserror::Error;

/// Errors that occur during program evaluation.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RuntimeError {
    /// Variable lookup failed in the requested scope.
    #[error("unknown variable '{name}' in scope '{scope}'")]
    UnknownVariable { scope: String, name: String },

    /// Function lookup failed in the requested scope.
    #[error("unknown function '{name}' in scope '{scope}'")]
    UnknownFunction { scope: String, name: String },

    /// Label jump with no such label registered in the current frame.
    #[error("no label '{name}' in the current frame")]
    UnknownLabel { name: String },

    /// Native call for a name the host has not registered.
    #[error("no native function '{module}::{name}' registered")]
    UnknownNative { module: String, name: String },

    /// A required instruction argument was missing or absent.
    #[error("instruction {opcode} is missing argument {index}")]
    MissingArgument { opcode: &'static str, index: usize },

    /// A required operator operand was missing or absent.
    #[error("operator {operator} is missing operand {index}")]
    MissingOperand {
        operator: &'static str,
        index: usize,
    },

    /// An argument evaluated to a type the consumer cannot use.
    #[error("wrong type for {what}: expected {expected}, got {got}")]
    WrongType {
        what: &'static str,
        expected: &'static str,
        got: &'static str,
    },

    /// Arithmetic operator applied to a non-numeric operand.
    #[error("operator {operator} needs numeric operands, got {got}")]
    NotNumeric {
        operator: &'static str,
        got: &'static str,
    },

    /// Bitwise operator applied to a non-integer operand.
    #[error("operator {operator} needs integer operands, got {got}")]
    NotInteger {
        operator: &'static str,
        got: &'static str,
    },

    /// Division with a zero divisor.
    #[error("division by zero")]
    DivisionByZero,

    /// Positional jump to a negative target.
    #[error("jump target {target} is negative")]
    InvalidJumpTarget { target: i64 },

    /// Character index outside the text.
    #[error("index {index} out of range for text of {length} chars")]
    IndexOutOfRange { index: i64, length: usize },

    /// Argument fetch outside the supplied argument list.
    #[error("argument index {index} out of range ({count} supplied)")]
    ArgumentOutOfRange { index: i64, count: usize },

    /// Host input or output failure.
    #[error("i/o error: {0}")]
    Io(String),

    /// A nested program failed to decode.
    #[error(transparent)]
    Decode(#[from] DecodeError),
}
