//! Expression operator table for Krait.
//!
//! Operators are the expression level of the language. On the wire an
//! operation's discriminator byte is the operator index plus one (zero
//! marks a literal), so the table indices here are off by one from the
//! raw discriminator.

use crate::error::DecodeError;

/// Identifies what an operation computes.
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operator {
    // Environment access
    /// Read a variable: (name, scope?). Fails if absent.
    GetVar = 0x00,
    /// Stringify a value: (value).
    Stringify = 0x01,
    /// Read a positional argument of the nearest enclosing call: (index).
    GetArg = 0x02,

    // Evaluation
    /// Re-evaluate an expression a fixed number of times: (count, expr).
    /// The count is evaluated exactly once, up front.
    Repeat = 0x03,
    /// Call a user function: (name, scope?, args...).
    Call = 0x04,
    /// Call a host-registered native: (name, module, args...).
    NativeCall = 0x05,
    /// Seconds since the Unix epoch, plus an optional offset: (offset?).
    Chrono = 0x06,

    // Comparison and boolean logic
    /// True iff all operands are equal: (a, b, ...).
    Equals = 0x07,
    /// True iff at least two operands differ: (a, b, ...).
    Differ = 0x08,
    /// Left-fold boolean and over truthiness: (a, b, ...).
    LogAnd = 0x09,
    /// Left-fold boolean or: (a, b, ...).
    LogOr = 0x0A,
    /// Left-fold boolean xor: (a, b, ...).
    LogXor = 0x0B,
    /// Boolean negation: (a).
    LogNot = 0x0C,

    // Arithmetic
    /// Numeric sum: (a, ...).
    Add = 0x0D,
    /// Difference: (a, b).
    Sub = 0x0E,
    /// Product fold with seed 1: (a, ...).
    Mul = 0x0F,
    /// True division in Float64; fails on a zero divisor: (a, b).
    Div = 0x10,
    /// Exponentiation in Float64: (a, b).
    Pow = 0x11,
    /// b-th root in Float64, a^(1/b): (a, b).
    Root = 0x12,

    // Bitwise
    /// Bitwise and fold, no seed: (a, ...).
    BitAnd = 0x13,
    /// Bitwise or fold, no seed: (a, ...).
    BitOr = 0x14,
    /// Bitwise xor fold, no seed: (a, ...).
    BitXor = 0x15,
    /// Bitwise complement: (a).
    BitNot = 0x16,

    // Text
    /// Substring by half-open char range, clamped; negative indices count
    /// from the end: (text, start, end).
    Slice = 0x17,
    /// Concatenation fold with seed "", stringifying non-text: (a, ...).
    Concat = 0x18,
    /// Single char at an index as 1-char text; fails out of range: (text, index).
    CharAt = 0x19,
}

/// All valid operators, in wire-index order.
pub const ALL_OPERATORS: [Operator; 26] = [
    Operator::GetVar,
    Operator::Stringify,
    Operator::GetArg,
    Operator::Repeat,
    Operator::Call,
    Operator::NativeCall,
    Operator::Chrono,
    Operator::Equals,
    Operator::Differ,
    Operator::LogAnd,
    Operator::LogOr,
    Operator::LogXor,
    Operator::LogNot,
    Operator::Add,
    Operator::Sub,
    Operator::Mul,
    Operator::Div,
    Operator::Pow,
    Operator::Root,
    Operator::BitAnd,
    Operator::BitOr,
    Operator::BitXor,
    Operator::BitNot,
    Operator::Slice,
    Operator::Concat,
    Operator::CharAt,
];

impl TryFrom<u8> for Operator {
    type Error = DecodeError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0x00 => Ok(Operator::GetVar),
            0x01 => Ok(Operator::Stringify),
            0x02 => Ok(Operator::GetArg),
            0x03 => Ok(Operator::Repeat),
            0x04 => Ok(Operator::Call),
            0x05 => Ok(Operator::NativeCall),
            0x06 => Ok(Operator::Chrono),
            0x07 => Ok(Operator::Equals),
            0x08 => Ok(Operator::Differ),
            0x09 => Ok(Operator::LogAnd),
            0x0A => Ok(Operator::LogOr),
            0x0B => Ok(Operator::LogXor),
            0x0C => Ok(Operator::LogNot),
            0x0D => Ok(Operator::Add),
            0x0E => Ok(Operator::Sub),
            0x0F => Ok(Operator::Mul),
            0x10 => Ok(Operator::Div),
            0x11 => Ok(Operator::Pow),
            0x12 => Ok(Operator::Root),
            0x13 => Ok(Operator::BitAnd),
            0x14 => Ok(Operator::BitOr),
            0x15 => Ok(Operator::BitXor),
            0x16 => Ok(Operator::BitNot),
            0x17 => Ok(Operator::Slice),
            0x18 => Ok(Operator::Concat),
            0x19 => Ok(Operator::CharAt),
            0x1A..=0xFF => Err(DecodeError::UnknownOperator(value)),
        }
    }
}

impl Operator {
    /// Returns the assembly mnemonic. Mnemonics are fixed-width and
    /// case-sensitive.
    pub fn mnemonic(&self) -> &'static str {
        match self {
            Operator::GetVar => "GETVAR",
            Operator::Stringify => "VTOSTR",
            Operator::GetArg => "GETARG",
            Operator::Repeat => "REPEAT",
            Operator::Call => "FNCALL",
            Operator::NativeCall => "NFCALL",
            Operator::Chrono => "CHRONO",
            Operator::Equals => "EQUALS",
            Operator::Differ => "DIFFER",
            Operator::LogAnd => "LOGAND",
            Operator::LogOr => "LOGIOR",
            Operator::LogXor => "LOGXOR",
            Operator::LogNot => "LOGNOT",
            Operator::Add => "ADDNUM",
            Operator::Sub => "SUBNUM",
            Operator::Mul => "MULNUM",
            Operator::Div => "DIVNUM",
            Operator::Pow => "POWNUM",
            Operator::Root => "ROTNUM",
            Operator::BitAnd => "ANDNUM",
            Operator::BitOr => "IORNUM",
            Operator::BitXor => "XORNUM",
            Operator::BitNot => "NOTNUM",
            Operator::Slice => "SSLICE",
            Operator::Concat => "CONCAT",
            Operator::CharAt => "SPSCHR",
        }
    }
}
