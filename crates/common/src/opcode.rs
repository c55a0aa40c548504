//! Base opcode table for Krait instructions.
//!
//! Instructions are the statement level of the language; every line of
//! assembly and every top-level wire record carries one of these tags.

use crate::error::DecodeError;

/// Identifies what an instruction does.
///
/// The `#[repr(u8)]` attribute pins each variant to its wire index; the
/// decoder maps bytes back through [`TryFrom`].
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Opcode {
    // Variables
    /// Write a variable in the composed scope: (name, scope?, value).
    SetVar = 0x00,
    /// Write a variable in the global scope: (name, value).
    SetGlobal = 0x01,
    /// Remove a variable from the enclosing scope if present: (name).
    DelVar = 0x02,

    // Functions
    /// Define a function from instruction arguments: (name, scope?, instr...).
    MakeFunc = 0x03,
    /// Stage a return value for the current frame: (value).
    Return = 0x04,

    // Control flow
    /// Stop the current frame, keeping its result.
    Terminate = 0x05,
    /// Jump to an absolute position if the condition is truthy: (cond, target).
    JumpIf = 0x06,
    /// Jump to an absolute position if the condition is falsy: (cond, target).
    JumpIfNot = 0x07,
    /// Unconditional jump to an absolute position: (target).
    Jump = 0x08,
    /// Jump to a previously registered label: (name).
    JumpLabel = 0x09,
    /// Register a label at the next position, then jump past: (name, target).
    MarkLabel = 0x0A,

    // Host
    /// Load, decode, and execute an external program file: (path).
    ExecFile = 0x0B,
    /// Print space-joined stringified values and a newline: (values...).
    Print = 0x0C,
    /// Evaluate arguments for side effects only: (values...).
    NullEval = 0x0D,
}

/// All valid opcodes, in wire-index order. Useful for exhaustive testing
/// and for mnemonic lookup in the assembler.
pub const ALL_OPCODES: [Opcode; 14] = [
    Opcode::SetVar,
    Opcode::SetGlobal,
    Opcode::DelVar,
    Opcode::MakeFunc,
    Opcode::Return,
    Opcode::Terminate,
    Opcode::JumpIf,
    Opcode::JumpIfNot,
    Opcode::Jump,
    Opcode::JumpLabel,
    Opcode::MarkLabel,
    Opcode::ExecFile,
    Opcode::Print,
    Opcode::NullEval,
];

impl TryFrom<u8> for Opcode {
    type Error = DecodeError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0x00 => Ok(Opcode::SetVar),
            0x01 => Ok(Opcode::SetGlobal),
            0x02 => Ok(Opcode::DelVar),
            0x03 => Ok(Opcode::MakeFunc),
            0x04 => Ok(Opcode::Return),
            0x05 => Ok(Opcode::Terminate),
            0x06 => Ok(Opcode::JumpIf),
            0x07 => Ok(Opcode::JumpIfNot),
            0x08 => Ok(Opcode::Jump),
            0x09 => Ok(Opcode::JumpLabel),
            0x0A => Ok(Opcode::MarkLabel),
            0x0B => Ok(Opcode::ExecFile),
            0x0C => Ok(Opcode::Print),
            0x0D => Ok(Opcode::NullEval),
            0x0E..=0xFF => Err(DecodeError::UnknownOpcode(value)),
        }
    }
}

impl Opcode {
    /// Returns the assembly mnemonic. Mnemonics are fixed-width and
    /// case-sensitive.
    pub fn mnemonic(&self) -> &'static str {
        match self {
            Opcode::SetVar => "SETVAR",
            Opcode::SetGlobal => "GSTVAR",
            Opcode::DelVar => "DELVAR",
            Opcode::MakeFunc => "MKFUNC",
            Opcode::Return => "RETURN",
            Opcode::Terminate => "TERMIN",
            Opcode::JumpIf => "JUMPIF",
            Opcode::JumpIfNot => "JUMPIN",
            Opcode::Jump => "JUMPTO",
            Opcode::JumpLabel => "JUMPLB",
            Opcode::MarkLabel => "MLABEL",
            Opcode::ExecFile => "EXFILE",
            Opcode::Print => "PRINTV",
            Opcode::NullEval => "NULLEV",
        }
    }
}
