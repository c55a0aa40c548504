//! Literal type tags for the Krait wire format.
//!
//! Every literal payload starts with one of these bytes; the rest of the
//! payload is interpreted according to the tag (see the `codec` module).

use crate::error::DecodeError;

/// Identifies the type of an encoded literal value.
///
/// The `#[repr(u8)]` attribute pins each variant to its wire index.
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TypeTag {
    /// Null; empty payload.
    Null = 0x00,
    /// Signed integer, 1/2/4/8 bytes two's complement.
    Int = 0x01,
    /// Unsigned integer, 1/2/4/8 bytes.
    Uint = 0x02,
    /// IEEE 754 single, exactly 4 bytes.
    Float32 = 0x03,
    /// IEEE 754 double, exactly 8 bytes.
    Float64 = 0x04,
    /// UTF-8 text, the remainder of the payload.
    Text = 0x05,
    /// A complete nested instruction encoding (code as data).
    Instruction = 0x06,
    /// Boolean, exactly 1 byte, nonzero = true.
    Bool = 0x07,
    /// Array: u32 element count, then length-prefixed element expressions.
    Array = 0x08,
}

/// All valid type tags, in wire-index order.
pub const ALL_TYPE_TAGS: [TypeTag; 9] = [
    TypeTag::Null,
    TypeTag::Int,
    TypeTag::Uint,
    TypeTag::Float32,
    TypeTag::Float64,
    TypeTag::Text,
    TypeTag::Instruction,
    TypeTag::Bool,
    TypeTag::Array,
];

impl TryFrom<u8> for TypeTag {
    type Error = DecodeError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0x00 => Ok(TypeTag::Null),
            0x01 => Ok(TypeTag::Int),
            0x02 => Ok(TypeTag::Uint),
            0x03 => Ok(TypeTag::Float32),
            0x04 => Ok(TypeTag::Float64),
            0x05 => Ok(TypeTag::Text),
            0x06 => Ok(TypeTag::Instruction),
            0x07 => Ok(TypeTag::Bool),
            0x08 => Ok(TypeTag::Array),
            0x09..=0xFF => Err(DecodeError::UnknownTypeTag(value)),
        }
    }
}

impl TypeTag {
    /// Returns a short lowercase name, used in diagnostics.
    pub fn name(&self) -> &'static str {
        match self {
            TypeTag::Null => "null",
            TypeTag::Int => "int",
            TypeTag::Uint => "uint",
            TypeTag::Float32 => "float32",
            TypeTag::Float64 => "float64",
            TypeTag::Text => "text",
            TypeTag::Instruction => "instruction",
            TypeTag::Bool => "bool",
            TypeTag::Array => "array",
        }
    }
}
