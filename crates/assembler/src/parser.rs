//! Token-to-tree parsing. The leading token of a line picks an opcode;
//! every following token maps to one argument expression by shape.

use krait_common::opcode::ALL_OPCODES;
use krait_common::operator::ALL_OPERATORS;
use krait_common::{Expr, Instruction, Opcode, Operation, Operator, Value};

use crate::error::AsmError;
use crate::lexer;

/// What a single logical line contributed.
pub(crate) enum Line {
    Instruction(Instruction),
    /// The leading token was not a known mnemonic; the line produces no
    /// instruction and is reported as a warning.
    Unknown(String),
}

pub(crate) fn parse_line(text: &str, line: usize) -> Result<Option<Line>, AsmError> {
    let tokens = lexer::split_tokens(text, line)?;
    let Some((head, rest)) = tokens.split_first() else {
        return Ok(None);
    };
    let Some(opcode) = lookup_opcode(head) else {
        return Ok(Some(Line::Unknown(head.clone())));
    };
    let args = parse_all(rest, line)?;
    Ok(Some(Line::Instruction(Instruction::new(opcode, args))))
}

fn lookup_opcode(mnemonic: &str) -> Option<Opcode> {
    ALL_OPCODES
        .iter()
        .find(|op| op.mnemonic() == mnemonic)
        .copied()
}

fn lookup_operator(mnemonic: &str) -> Option<Operator> {
    ALL_OPERATORS
        .iter()
        .find(|op| op.mnemonic() == mnemonic)
        .copied()
}

/// Maps one token to an expression. Shape decides: quotes make text,
/// parens make operations, braces make instruction values, square
/// brackets make arrays, keywords and numeric forms make scalar
/// literals, and any leftover name reads a variable.
pub(crate) fn parse_expr(token: &str, line: usize) -> Result<Expr, AsmError> {
    if token.starts_with('"') {
        return parse_string(token, line);
    }
    if token.starts_with('(') {
        return parse_operation(token, line);
    }
    if token.starts_with('{') {
        return parse_instruction_value(token, line);
    }
    if token.starts_with('[') {
        return parse_array(token, line);
    }
    if token.eq_ignore_ascii_case("null") || token.eq_ignore_ascii_case("none") {
        return Ok(Expr::Literal(Value::Null));
    }
    if token.eq_ignore_ascii_case("true") {
        return Ok(Expr::Literal(Value::Bool(true)));
    }
    if token.eq_ignore_ascii_case("false") {
        return Ok(Expr::Literal(Value::Bool(false)));
    }
    if looks_numeric(token) {
        return numeric_literal(token, line).map(Expr::Literal);
    }
    if let Some(open) = token.find('(') {
        return parse_call(token, open, line);
    }
    Ok(variable_ref(token))
}

fn parse_all(tokens: &[String], line: usize) -> Result<Vec<Expr>, AsmError> {
    tokens.iter().map(|t| parse_expr(t, line)).collect()
}

fn parse_string(token: &str, line: usize) -> Result<Expr, AsmError> {
    let body = strip_group(token, '"', '"', line)?;
    Ok(Expr::Literal(Value::Text(lexer::unescape(body))))
}

fn parse_operation(token: &str, line: usize) -> Result<Expr, AsmError> {
    let inner = strip_group(token, '(', ')', line)?;
    let tokens = lexer::split_tokens(inner, line)?;
    let Some((head, rest)) = tokens.split_first() else {
        return Err(AsmError::MissingMnemonic {
            line,
            token: token.to_string(),
        });
    };
    let operator = lookup_operator(head).ok_or_else(|| AsmError::UnknownOperator {
        line,
        token: head.clone(),
    })?;
    let operands = parse_all(rest, line)?;
    Ok(Expr::Operation(Operation::new(operator, operands)))
}

fn parse_instruction_value(token: &str, line: usize) -> Result<Expr, AsmError> {
    let inner = strip_group(token, '{', '}', line)?;
    let tokens = lexer::split_tokens(inner, line)?;
    let Some((head, rest)) = tokens.split_first() else {
        return Err(AsmError::MissingMnemonic {
            line,
            token: token.to_string(),
        });
    };
    let opcode = lookup_opcode(head).ok_or_else(|| AsmError::UnknownOpcode {
        line,
        token: head.clone(),
    })?;
    let args = parse_all(rest, line)?;
    Ok(Expr::Literal(Value::Instruction(Box::new(
        Instruction::new(opcode, args),
    ))))
}

fn parse_array(token: &str, line: usize) -> Result<Expr, AsmError> {
    let inner = strip_group(token, '[', ']', line)?;
    if inner.trim().is_empty() {
        return Ok(Expr::Literal(Value::Array(Vec::new())));
    }
    let mut elements = Vec::new();
    for part in lexer::split_colons(inner, line)? {
        let part = part.trim();
        if part.is_empty() {
            elements.push(Value::Null);
            continue;
        }
        match parse_expr(part, line)? {
            Expr::Literal(value) => elements.push(value),
            Expr::Absent => elements.push(Value::Null),
            Expr::Operation(_) => {
                return Err(AsmError::NonLiteralElement {
                    line,
                    token: part.to_string(),
                });
            }
        }
    }
    Ok(Expr::Literal(Value::Array(elements)))
}

/// `name(args...)` and `scope::name(args...)` call forms. The name and
/// scope ride as leading literal operands ahead of the parsed args.
fn parse_call(token: &str, open: usize, line: usize) -> Result<Expr, AsmError> {
    let inner = strip_group(&token[open..], '(', ')', line).map_err(|_| AsmError::Malformed {
        line,
        token: token.to_string(),
    })?;
    let target = &token[..open];
    let (scope, name) = match target.rsplit_once("::") {
        Some((scope, name)) => (Value::Text(scope.to_string()), name),
        None => (Value::Null, target),
    };
    let mut operands = vec![
        Expr::Literal(Value::Text(name.to_string())),
        Expr::Literal(scope),
    ];
    operands.extend(parse_all(&lexer::split_tokens(inner, line)?, line)?);
    Ok(Expr::Operation(Operation::new(Operator::Call, operands)))
}

fn variable_ref(name: &str) -> Expr {
    Expr::Operation(Operation::new(
        Operator::GetVar,
        vec![
            Expr::Literal(Value::Text(name.to_string())),
            Expr::Literal(Value::Null),
        ],
    ))
}

fn strip_group<'t>(
    token: &'t str,
    open: char,
    close: char,
    line: usize,
) -> Result<&'t str, AsmError> {
    token
        .strip_prefix(open)
        .and_then(|rest| rest.strip_suffix(close))
        .ok_or_else(|| AsmError::Malformed {
            line,
            token: token.to_string(),
        })
}

fn looks_numeric(token: &str) -> bool {
    let bytes = token.as_bytes();
    match bytes.first() {
        Some(b) if b.is_ascii_digit() => true,
        Some(b'-') => bytes.get(1).map_or(false, u8::is_ascii_digit),
        _ => false,
    }
}

/// Tokens that start with a digit must parse as a number; letting `12abc`
/// fall through to a variable reference would hide the typo.
fn numeric_literal(token: &str, line: usize) -> Result<Value, AsmError> {
    let invalid = || AsmError::InvalidNumber {
        line,
        token: token.to_string(),
    };
    let body = token.strip_prefix('-').unwrap_or(token);
    let bytes = body.as_bytes();

    let radix = if bytes.len() > 2 && bytes[0] == b'0' {
        match bytes[1] {
            b'x' | b'X' => Some(16),
            b'o' | b'O' => Some(8),
            b'b' | b'B' => Some(2),
            _ => None,
        }
    } else {
        None
    };
    if let Some(radix) = radix {
        let magnitude = i64::from_str_radix(&body[2..], radix).map_err(|_| invalid())?;
        let value = if token.starts_with('-') {
            -magnitude
        } else {
            magnitude
        };
        return Ok(Value::Int(value));
    }

    if let Some((int_part, frac_part)) = body.split_once('.') {
        let digits = |s: &str| !s.is_empty() && s.bytes().all(|b| b.is_ascii_digit());
        if !digits(int_part) || !digits(frac_part) {
            return Err(invalid());
        }
        return token.parse::<f64>().map(Value::Float64).map_err(|_| invalid());
    }
    if body.bytes().all(|b| b.is_ascii_digit()) {
        return token.parse::<i64>().map(Value::Int).map_err(|_| invalid());
    }
    Err(invalid())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn expr(token: &str) -> Expr {
        parse_expr(token, 1).unwrap()
    }

    fn expr_err(token: &str) -> AsmError {
        parse_expr(token, 1).unwrap_err()
    }

    fn lit(value: Value) -> Expr {
        Expr::Literal(value)
    }

    #[test]
    fn line_becomes_an_instruction() {
        let parsed = parse_line("SETVAR \"x\" NULL 5", 1).unwrap();
        let Some(Line::Instruction(instr)) = parsed else {
            panic!("expected an instruction");
        };
        assert_eq!(instr.opcode, Opcode::SetVar);
        assert_eq!(
            instr.args,
            vec![
                lit(Value::Text("x".into())),
                lit(Value::Null),
                lit(Value::Int(5))
            ]
        );
    }

    #[test]
    fn unknown_mnemonic_is_reported_not_fatal() {
        let parsed = parse_line("SETVRA \"x\" NULL 5", 3).unwrap();
        let Some(Line::Unknown(mnemonic)) = parsed else {
            panic!("expected an unknown-mnemonic report");
        };
        assert_eq!(mnemonic, "SETVRA");
    }

    #[test]
    fn mnemonics_are_case_sensitive() {
        let parsed = parse_line("setvar \"x\" NULL 5", 1).unwrap();
        assert!(matches!(parsed, Some(Line::Unknown(_))));
    }

    #[test]
    fn keywords_ignore_case() {
        assert_eq!(expr("NULL"), lit(Value::Null));
        assert_eq!(expr("none"), lit(Value::Null));
        assert_eq!(expr("True"), lit(Value::Bool(true)));
        assert_eq!(expr("FALSE"), lit(Value::Bool(false)));
    }

    #[test]
    fn numeric_forms() {
        assert_eq!(expr("42"), lit(Value::Int(42)));
        assert_eq!(expr("-7"), lit(Value::Int(-7)));
        assert_eq!(expr("3.5"), lit(Value::Float64(3.5)));
        assert_eq!(expr("-0.25"), lit(Value::Float64(-0.25)));
        assert_eq!(expr("0xFF"), lit(Value::Int(255)));
        assert_eq!(expr("0o17"), lit(Value::Int(15)));
        assert_eq!(expr("0b101"), lit(Value::Int(5)));
        assert_eq!(expr("-0x10"), lit(Value::Int(-16)));
    }

    #[test]
    fn broken_numbers_are_errors_not_names() {
        assert_eq!(
            expr_err("1.2.3"),
            AsmError::InvalidNumber {
                line: 1,
                token: "1.2.3".into()
            }
        );
        assert_eq!(
            expr_err("12abc"),
            AsmError::InvalidNumber {
                line: 1,
                token: "12abc".into()
            }
        );
        assert_eq!(
            expr_err("0x"),
            AsmError::InvalidNumber {
                line: 1,
                token: "0x".into()
            }
        );
    }

    #[test]
    fn strings_unescape() {
        assert_eq!(
            expr(r#""two\nlines""#),
            lit(Value::Text("two\nlines".into()))
        );
        assert_eq!(expr(r#""""#), lit(Value::Text(String::new())));
    }

    #[test]
    fn bare_names_read_variables() {
        let Expr::Operation(op) = expr("counter") else {
            panic!("expected an operation");
        };
        assert_eq!(op.operator, Operator::GetVar);
        assert_eq!(
            op.operands,
            vec![lit(Value::Text("counter".into())), lit(Value::Null)]
        );
    }

    #[test]
    fn call_without_scope_gets_null_scope() {
        let Expr::Operation(op) = expr("double(21)") else {
            panic!("expected an operation");
        };
        assert_eq!(op.operator, Operator::Call);
        assert_eq!(
            op.operands,
            vec![
                lit(Value::Text("double".into())),
                lit(Value::Null),
                lit(Value::Int(21))
            ]
        );
    }

    #[test]
    fn call_scope_splits_on_the_last_double_colon() {
        let Expr::Operation(op) = expr("a:b::helper(1, 2)") else {
            panic!("expected an operation");
        };
        assert_eq!(op.operator, Operator::Call);
        assert_eq!(op.operands[0], lit(Value::Text("helper".into())));
        assert_eq!(op.operands[1], lit(Value::Text("a:b".into())));
        assert_eq!(op.operands[2..], [lit(Value::Int(1)), lit(Value::Int(2))]);
    }

    #[test]
    fn operations_nest() {
        let Expr::Operation(op) = expr("(ADDNUM (MULNUM 2 3) 4)") else {
            panic!("expected an operation");
        };
        assert_eq!(op.operator, Operator::Add);
        assert_eq!(op.operands.len(), 2);
        let Expr::Operation(inner) = &op.operands[0] else {
            panic!("expected a nested operation");
        };
        assert_eq!(inner.operator, Operator::Mul);
        assert_eq!(op.operands[1], lit(Value::Int(4)));
    }

    #[test]
    fn unknown_operator_is_fatal() {
        assert_eq!(
            expr_err("(ADDNUN 1 2)"),
            AsmError::UnknownOperator {
                line: 1,
                token: "ADDNUN".into()
            }
        );
    }

    #[test]
    fn empty_operation_is_rejected() {
        assert_eq!(
            expr_err("()"),
            AsmError::MissingMnemonic {
                line: 1,
                token: "()".into()
            }
        );
    }

    #[test]
    fn braces_build_instruction_values() {
        let Expr::Literal(Value::Instruction(instr)) = expr("{RETURN (GETARG 0)}") else {
            panic!("expected an instruction literal");
        };
        assert_eq!(instr.opcode, Opcode::Return);
        assert_eq!(instr.args.len(), 1);
    }

    #[test]
    fn unknown_opcode_in_braces_is_fatal() {
        assert_eq!(
            expr_err("{RETRUN 5}"),
            AsmError::UnknownOpcode {
                line: 1,
                token: "RETRUN".into()
            }
        );
    }

    #[test]
    fn arrays_split_on_colons() {
        assert_eq!(
            expr(r#"[1:"a:b":TRUE]"#),
            lit(Value::Array(vec![
                Value::Int(1),
                Value::Text("a:b".into()),
                Value::Bool(true)
            ]))
        );
        assert_eq!(expr("[]"), lit(Value::Array(Vec::new())));
    }

    #[test]
    fn empty_array_slots_become_null() {
        assert_eq!(
            expr("[1::2]"),
            lit(Value::Array(vec![
                Value::Int(1),
                Value::Null,
                Value::Int(2)
            ]))
        );
    }

    #[test]
    fn arrays_nest() {
        assert_eq!(
            expr("[[1:2]:[3]]"),
            lit(Value::Array(vec![
                Value::Array(vec![Value::Int(1), Value::Int(2)]),
                Value::Array(vec![Value::Int(3)])
            ]))
        );
    }

    #[test]
    fn array_elements_must_be_literals() {
        assert_eq!(
            expr_err("[1:counter]"),
            AsmError::NonLiteralElement {
                line: 1,
                token: "counter".into()
            }
        );
        assert_eq!(
            expr_err("[(ADDNUM 1 2)]"),
            AsmError::NonLiteralElement {
                line: 1,
                token: "(ADDNUM 1 2)".into()
            }
        );
    }

    #[test]
    fn mismatched_bracket_kinds_are_malformed() {
        assert_eq!(
            expr_err("(ADDNUM 1 2]"),
            AsmError::Malformed {
                line: 1,
                token: "(ADDNUM 1 2]".into()
            }
        );
    }
}
