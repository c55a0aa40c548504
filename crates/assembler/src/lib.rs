//! Line-oriented assembly for Krait programs.
//!
//! One instruction per line: a case-sensitive opcode mnemonic followed by
//! argument tokens separated by spaces or commas. Arguments are literals
//! (`5`, `3.5`, `"text"`, `TRUE`, `NULL`, `[1:2:3]`, `{RETURN 5}`),
//! operator forms (`(ADDNUM 2 3)`), call forms (`double(21)`,
//! `scope::helper(1)`), or bare names that read variables. `//` starts a
//! comment and a trailing backslash joins the next line.
//!
//! ```
//! let parsed = krait_assembler::parse(
//!     "SETVAR \"x\" NULL (ADDNUM 2 3)\nPRINTV x // show it\n",
//! )
//! .unwrap();
//! assert_eq!(parsed.program.len(), 2);
//! assert!(parsed.warnings.is_empty());
//! ```

mod error;
mod lexer;
mod parser;

pub use error::{AsmError, SyntaxWarning};

use krait_common::Program;

use parser::Line;

/// A parsed program plus warnings for any lines that were dropped.
#[derive(Debug, Clone, PartialEq)]
pub struct Parsed {
    pub program: Program,
    pub warnings: Vec<SyntaxWarning>,
}

/// Parses assembly text into a program tree. Lines whose leading token is
/// not a known opcode mnemonic are dropped and reported in
/// [`Parsed::warnings`]; everything else that is wrong with the text is a
/// hard [`AsmError`].
pub fn parse(source: &str) -> Result<Parsed, AsmError> {
    let mut instructions = Vec::new();
    let mut warnings = Vec::new();
    for (line, text) in lexer::logical_lines(source) {
        match parser::parse_line(&text, line)? {
            Some(Line::Instruction(instr)) => instructions.push(instr),
            Some(Line::Unknown(mnemonic)) => warnings.push(SyntaxWarning { line, mnemonic }),
            None => {}
        }
    }
    Ok(Parsed {
        program: Program::new(instructions),
        warnings,
    })
}

/// Parses and encodes in one step, version header included. Warnings are
/// not returned here; call [`parse`] when they matter.
pub fn compile(source: &str) -> Result<Vec<u8>, AsmError> {
    Ok(parse(source)?.program.encode())
}
