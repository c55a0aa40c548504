//! Decode errors for Krait binary programs.

use thiserror::Error;

/// Errors that occur while decoding a binary program.
///
/// Offsets (`at`) are absolute byte positions in the input buffer, so a
/// hex dump of the input lines up with the error.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DecodeError {
    /// The program was built by a different engine version. Raised before
    /// any instruction is decoded.
    #[error("version mismatch: program built for '{found}', engine is '{expected}'")]
    VersionMismatch { expected: String, found: String },

    /// A length prefix promised more bytes than the input holds.
    #[error("unexpected end of input at byte {at}")]
    UnexpectedEof { at: usize },

    /// A length-delimited body held bytes past the end of its content.
    #[error("trailing bytes at byte {at}")]
    TrailingBytes { at: usize },

    /// The instruction opcode index is outside the 14-entry table.
    #[error("unknown opcode index {0:#04x}")]
    UnknownOpcode(u8),

    /// The expression discriminator names an operator outside the 26-entry table.
    #[error("unknown operator index {0:#04x}")]
    UnknownOperator(u8),

    /// The literal type tag is outside the 9-entry table.
    #[error("unknown type tag {0:#04x}")]
    UnknownTypeTag(u8),

    /// An integer payload is not 1, 2, 4, or 8 bytes wide.
    #[error("invalid integer width {width} at byte {at}")]
    BadIntWidth { at: usize, width: usize },

    /// A text payload (or the version header) is not valid UTF-8.
    #[error("invalid utf-8 at byte {at}")]
    BadUtf8 { at: usize },

    /// An array element decoded to an operation; elements must be literals.
    #[error("array element at byte {at} is not a literal")]
    NonLiteralElement { at: usize },
}
