//! Runtime value representation for the Krait engine.
//!
//! Values are what literals decode to, what expressions evaluate to, and
//! what the Environment stores. They are immutable once produced.

use std::fmt;

use crate::node::Instruction;
use crate::type_tag::TypeTag;

/// A Krait runtime value.
#[derive(Debug, Clone)]
pub enum Value {
    /// The null value.
    Null,
    /// Signed 64-bit integer.
    Int(i64),
    /// Unsigned 64-bit integer.
    Uint(u64),
    /// IEEE 754 32-bit float.
    Float32(f32),
    /// IEEE 754 64-bit float.
    Float64(f64),
    /// UTF-8 text.
    Text(String),
    /// An instruction as a first-class value (code as data). Evaluating an
    /// instruction literal yields the instruction itself; it is not executed.
    Instruction(Box<Instruction>),
    /// Boolean value.
    Bool(bool),
    /// Ordered, heterogeneous sequence of values.
    Array(Vec<Value>),
}

// Equality is structural, and floats compare bitwise via to_bits(). That
// makes NaN == NaN when the bit patterns match and +0.0 != -0.0, but keeps
// Value well-behaved in Rust (implements Eq). Numeric subtypes never
// compare equal across variants: Int(1) != Float64(1.0).
impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::Null, Value::Null) => true,
            (Value::Int(a), Value::Int(b)) => a == b,
            (Value::Uint(a), Value::Uint(b)) => a == b,
            (Value::Float32(a), Value::Float32(b)) => a.to_bits() == b.to_bits(),
            (Value::Float64(a), Value::Float64(b)) => a.to_bits() == b.to_bits(),
            (Value::Text(a), Value::Text(b)) => a == b,
            (Value::Instruction(a), Value::Instruction(b)) => a == b,
            (Value::Bool(a), Value::Bool(b)) => a == b,
            (Value::Array(a), Value::Array(b)) => a == b,
            _ => false,
        }
    }
}

impl Eq for Value {}

impl Value {
    /// Returns the wire type tag for this value.
    pub fn type_tag(&self) -> TypeTag {
        match self {
            Value::Null => TypeTag::Null,
            Value::Int(_) => TypeTag::Int,
            Value::Uint(_) => TypeTag::Uint,
            Value::Float32(_) => TypeTag::Float32,
            Value::Float64(_) => TypeTag::Float64,
            Value::Text(_) => TypeTag::Text,
            Value::Instruction(_) => TypeTag::Instruction,
            Value::Bool(_) => TypeTag::Bool,
            Value::Array(_) => TypeTag::Array,
        }
    }

    /// Truthiness, as used by conditional jumps and the boolean operators.
    ///
    /// Null is false; numbers are true iff nonzero; text and arrays are
    /// true iff non-empty; instruction values are always true.
    pub fn truthy(&self) -> bool {
        match self {
            Value::Null => false,
            Value::Int(n) => *n != 0,
            Value::Uint(n) => *n != 0,
            Value::Float32(f) => *f != 0.0,
            Value::Float64(f) => *f != 0.0,
            Value::Text(s) => !s.is_empty(),
            Value::Instruction(_) => true,
            Value::Bool(b) => *b,
            Value::Array(a) => !a.is_empty(),
        }
    }
}

/// Stringification, as produced by VTOSTR, CONCAT, and PRINTV.
///
/// Arrays print colon-joined in brackets, matching the assembler's array
/// literal syntax, so `PRINTV` output can be pasted back into a source file.
impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => write!(f, "null"),
            Value::Int(n) => write!(f, "{n}"),
            Value::Uint(n) => write!(f, "{n}"),
            Value::Float32(x) => write!(f, "{x}"),
            Value::Float64(x) => write!(f, "{x}"),
            Value::Text(s) => write!(f, "{s}"),
            Value::Instruction(i) => write!(f, "[{} instruction]", i.opcode.mnemonic()),
            Value::Bool(b) => write!(f, "{b}"),
            Value::Array(items) => {
                write!(f, "[")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        write!(f, ":")?;
                    }
                    write!(f, "{item}")?;
                }
                write!(f, "]")
            }
        }
    }
}
