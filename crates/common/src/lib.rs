//! Krait common types and program wire codec.
//!
//! This crate provides the foundational data structures shared by the
//! Krait assembler, evaluator, and CLI:
//!
//! - [`Opcode`] — the 14 statement heads an instruction can carry
//! - [`Operator`] — the 26 expression operators
//! - [`TypeTag`] — the 9 literal payload tags
//! - [`Value`] — fully evaluated runtime values
//! - [`Expr`], [`Operation`], [`Instruction`] — the program tree
//! - [`Program`] — an instruction sequence with its version-gated codec
//! - [`DecodeError`] — errors from decoding byte streams
//!
//! # Dependencies
//!
//! This crate uses `thiserror` (compile-time proc-macro, zero runtime cost)
//! and has no other dependencies.

mod codec;
pub mod error;
pub mod node;
pub mod opcode;
pub mod operator;
pub mod program;
pub mod type_tag;
pub mod value;

// Re-export commonly used types at the crate root.
pub use error::DecodeError;
pub use node::{Expr, FunctionId, Instruction, Operation};
pub use opcode::Opcode;
pub use operator::Operator;
pub use program::{Program, FORMAT_VERSION};
pub use type_tag::TypeTag;
pub use value::Value;

#[cfg(test)]
mod proptests {
    use super::*;
    use proptest::prelude::*;

    /// Strategy that generates a random valid Opcode.
    fn arb_opcode() -> impl Strategy<Value = Opcode> {
        prop::sample::select(&opcode::ALL_OPCODES[..])
    }

    /// Strategy that generates a random valid Operator.
    fn arb_operator() -> impl Strategy<Value = Operator> {
        prop::sample::select(&operator::ALL_OPERATORS[..])
    }

    /// Strategy that generates scalar values plus shallow arrays.
    fn arb_value() -> impl Strategy<Value = Value> {
        let scalar = prop_oneof![
            Just(Value::Null),
            any::<i64>().prop_map(Value::Int),
            any::<u64>().prop_map(Value::Uint),
            any::<f32>().prop_map(Value::Float32),
            any::<f64>().prop_map(Value::Float64),
            any::<String>().prop_map(Value::Text),
            any::<bool>().prop_map(Value::Bool),
        ];
        scalar.prop_recursive(2, 8, 4, |inner| {
            prop::collection::vec(inner, 0..4).prop_map(Value::Array)
        })
    }

    /// Strategy that generates expression trees a few levels deep.
    fn arb_expr() -> impl Strategy<Value = Expr> {
        let leaf = prop_oneof![Just(Expr::Absent), arb_value().prop_map(Expr::Literal)];
        leaf.prop_recursive(3, 16, 3, |inner| {
            (arb_operator(), prop::collection::vec(inner, 0..3))
                .prop_map(|(op, operands)| Expr::Operation(Operation::new(op, operands)))
        })
    }

    /// Strategy that generates a random valid Instruction.
    fn arb_instruction() -> impl Strategy<Value = Instruction> {
        (arb_opcode(), prop::collection::vec(arb_expr(), 0..4))
            .prop_map(|(op, args)| Instruction::new(op, args))
    }

    proptest! {
        /// For all valid programs, encode then decode produces the original.
        #[test]
        fn program_roundtrip(
            instrs in prop::collection::vec(arb_instruction(), 0..12)
        ) {
            let program = Program::new(instrs);
            let bytes = program.encode();
            let decoded = Program::decode(&bytes).unwrap();
            prop_assert_eq!(program, decoded);
        }

        /// Decoding a valid header followed by arbitrary bytes must never
        /// panic. When it succeeds, the decoder may have accepted a
        /// non-canonical encoding (wide integers, stale array counts), so
        /// the canonical re-encoding is required to be a fixed point.
        #[test]
        fn random_tail_never_panics(
            tail in prop::collection::vec(any::<u8>(), 0..96)
        ) {
            let mut bytes = Vec::new();
            bytes.extend_from_slice(&(FORMAT_VERSION.len() as u16).to_le_bytes());
            bytes.extend_from_slice(FORMAT_VERSION.as_bytes());
            bytes.extend_from_slice(&tail);
            if let Ok(program) = Program::decode(&bytes) {
                let canonical = program.encode();
                prop_assert_eq!(Program::decode(&canonical).unwrap(), program);
            }
        }
    }
}
