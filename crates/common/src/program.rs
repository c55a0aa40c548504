//! Program representation for Krait instruction streams.
//!
//! A program is a sequence of instruction trees. Binary files (.krab)
//! start with a length-prefixed version string followed by the encoded
//! instructions; see the `codec` module for the full wire layout.

use crate::codec;
use crate::error::DecodeError;
use crate::node::Instruction;

/// The engine's format version. Every encoded program embeds this string,
/// and the decoder rejects any binary whose embedded version differs.
pub const FORMAT_VERSION: &str = "krait-0.1";

/// A Krait program: a sequence of top-level instructions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Program {
    /// The instruction sequence, executed from position 0.
    pub instructions: Vec<Instruction>,
}

impl Program {
    /// Create a new program from a vector of instructions.
    pub fn new(instructions: Vec<Instruction>) -> Self {
        Self { instructions }
    }

    /// Encode the program to bytes, version header included.
    pub fn encode(&self) -> Vec<u8> {
        codec::encode_program(self)
    }

    /// Decode a byte slice into a program.
    ///
    /// The embedded version string is checked against [`FORMAT_VERSION`]
    /// before any instruction is decoded.
    pub fn decode(bytes: &[u8]) -> Result<Self, DecodeError> {
        codec::decode_program(bytes)
    }

    /// Number of top-level instructions in the program.
    pub fn len(&self) -> usize {
        self.instructions.len()
    }

    /// Returns true if the program has no instructions.
    pub fn is_empty(&self) -> bool {
        self.instructions.is_empty()
    }
}
