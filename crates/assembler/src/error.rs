use thiserror::Error;

/// Fatal assembly errors. Every variant names the 1-based source line it
/// was raised on; lines joined by a trailing backslash report the first
/// physical line of the group.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AsmError {
    #[error("line {line}: unknown operator '{token}'")]
    UnknownOperator { line: usize, token: String },

    /// Unknown mnemonics at the start of a line are warnings, but inside
    /// `{...}` the braces promise an instruction value and there is
    /// nothing to drop, so the mismatch is fatal.
    #[error("line {line}: unknown opcode '{token}' in instruction literal")]
    UnknownOpcode { line: usize, token: String },

    #[error("line {line}: unbalanced brackets")]
    Unbalanced { line: usize },

    #[error("line {line}: unterminated string")]
    UnterminatedString { line: usize },

    #[error("line {line}: malformed expression '{token}'")]
    Malformed { line: usize, token: String },

    #[error("line {line}: invalid number '{token}'")]
    InvalidNumber { line: usize, token: String },

    #[error("line {line}: array elements must be literals, got '{token}'")]
    NonLiteralElement { line: usize, token: String },

    #[error("line {line}: missing mnemonic in '{token}'")]
    MissingMnemonic { line: usize, token: String },
}

/// A line whose leading token is not a known opcode mnemonic. The line is
/// dropped from the assembled program; callers decide whether to surface
/// the warning.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyntaxWarning {
    pub line: usize,
    pub mnemonic: String,
}

impl std::fmt::Display for SyntaxWarning {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "line {}: unknown opcode '{}'", self.line, self.mnemonic)
    }
}
