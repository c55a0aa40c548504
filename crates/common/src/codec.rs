//! Binary wire format for Krait programs.
//!
//! All integers are little-endian. The layout is length-prefixed at every
//! level, so each node is self-delimiting:
//!
//! ```text
//! program      = u16 version_len | version bytes (UTF-8) | instruction*
//! instruction  = u32 body_len | u8 opcode_index | expression*
//!                (expressions fill exactly body_len - 1 bytes)
//! expression   = u32 body_len | body
//!                body_len == 0          -> absent placeholder
//!                body[0] == 0           -> literal, payload follows
//!                body[0] == n (n > 0)   -> operation, operator index n - 1,
//!                                          operands fill the rest of body
//! literal      = u8 type_tag | payload
//! ```
//!
//! Literal payloads:
//!
//! - null: empty
//! - int / uint: 1, 2, 4, or 8 bytes; the encoder picks the narrowest
//!   width that holds the value, the decoder infers width from length and
//!   accepts wider-than-necessary encodings
//! - float32 / float64: exactly 4 / 8 bytes
//! - text: the remaining payload, UTF-8
//! - instruction: one complete nested instruction encoding
//! - bool: exactly 1 byte, nonzero = true
//! - array: u32 declared element count (written accurately, ignored on
//!   read; entries self-delimit), then per element u32 elem_len followed by
//!   a complete expression encoding of that many bytes. Elements must
//!   decode to literals.
//!
//! The decoder is strict: bytes missing from or left over in any
//! length-delimited body are errors. Scope and owner annotations on nodes
//! are runtime-only and never serialized, so decode(encode(tree)) yields a
//! tree with the same values and structure and fresh annotations.

use crate::error::DecodeError;
use crate::node::{Expr, Instruction, Operation};
use crate::opcode::Opcode;
use crate::operator::Operator;
use crate::program::{Program, FORMAT_VERSION};
use crate::type_tag::TypeTag;
use crate::value::Value;

// ---- Decoding ----

/// Bounds-checked cursor over the input. Sub-readers cover one
/// length-delimited body while keeping absolute offsets for errors.
struct Reader<'a> {
    buf: &'a [u8],
    pos: usize,
    base: usize,
}

impl<'a> Reader<'a> {
    fn new(buf: &'a [u8]) -> Self {
        Self { buf, pos: 0, base: 0 }
    }

    /// Absolute byte offset in the original input.
    fn at(&self) -> usize {
        self.base + self.pos
    }

    fn remaining(&self) -> usize {
        self.buf.len() - self.pos
    }

    fn is_empty(&self) -> bool {
        self.pos >= self.buf.len()
    }

    fn take(&mut self, n: usize) -> Result<&'a [u8], DecodeError> {
        if self.remaining() < n {
            return Err(DecodeError::UnexpectedEof { at: self.at() });
        }
        let slice = &self.buf[self.pos..self.pos + n];
        self.pos += n;
        Ok(slice)
    }

    /// Split off a sub-reader over the next `n` bytes.
    fn sub(&mut self, n: usize) -> Result<Reader<'a>, DecodeError> {
        let base = self.at();
        let slice = self.take(n)?;
        Ok(Reader {
            buf: slice,
            pos: 0,
            base,
        })
    }

    fn u8(&mut self) -> Result<u8, DecodeError> {
        Ok(self.take(1)?[0])
    }

    fn u16(&mut self) -> Result<u16, DecodeError> {
        let b = self.take(2)?;
        Ok(u16::from_le_bytes([b[0], b[1]]))
    }

    fn u32(&mut self) -> Result<u32, DecodeError> {
        let b = self.take(4)?;
        Ok(u32::from_le_bytes([b[0], b[1], b[2], b[3]]))
    }

    fn expect_end(&self) -> Result<(), DecodeError> {
        if self.is_empty() {
            Ok(())
        } else {
            Err(DecodeError::TrailingBytes { at: self.at() })
        }
    }
}

pub(crate) fn decode_program(bytes: &[u8]) -> Result<Program, DecodeError> {
    let mut r = Reader::new(bytes);

    let version_len = r.u16()? as usize;
    let version_at = r.at();
    let version = std::str::from_utf8(r.take(version_len)?).map_err(|e| DecodeError::BadUtf8 {
        at: version_at + e.valid_up_to(),
    })?;

    // The gate runs before any instruction is looked at.
    if version != FORMAT_VERSION {
        return Err(DecodeError::VersionMismatch {
            expected: FORMAT_VERSION.to_string(),
            found: version.to_string(),
        });
    }

    let mut instructions = Vec::new();
    while !r.is_empty() {
        instructions.push(decode_instruction(&mut r)?);
    }
    Ok(Program::new(instructions))
}

fn decode_instruction(r: &mut Reader) -> Result<Instruction, DecodeError> {
    let body_len = r.u32()? as usize;
    let mut body = r.sub(body_len)?;

    let opcode = Opcode::try_from(body.u8()?)?;
    let mut args = Vec::new();
    while !body.is_empty() {
        args.push(decode_expr(&mut body)?);
    }
    Ok(Instruction::new(opcode, args))
}

fn decode_expr(r: &mut Reader) -> Result<Expr, DecodeError> {
    let body_len = r.u32()? as usize;
    if body_len == 0 {
        return Ok(Expr::Absent);
    }
    let mut body = r.sub(body_len)?;

    let disc = body.u8()?;
    if disc == 0 {
        Ok(Expr::Literal(decode_literal(&mut body)?))
    } else {
        let operator = Operator::try_from(disc - 1)?;
        let mut operands = Vec::new();
        while !body.is_empty() {
            operands.push(decode_expr(&mut body)?);
        }
        Ok(Expr::Operation(Operation::new(operator, operands)))
    }
}

/// Decode one literal payload; `r` covers exactly the payload bytes.
fn decode_literal(r: &mut Reader) -> Result<Value, DecodeError> {
    let tag = TypeTag::try_from(r.u8()?)?;
    match tag {
        TypeTag::Null => {
            r.expect_end()?;
            Ok(Value::Null)
        }
        TypeTag::Int => {
            let at = r.at();
            let n = r.remaining();
            Ok(Value::Int(decode_signed(r.take(n)?, at)?))
        }
        TypeTag::Uint => {
            let at = r.at();
            let n = r.remaining();
            Ok(Value::Uint(decode_unsigned(r.take(n)?, at)?))
        }
        TypeTag::Float32 => {
            let b = r.take(4)?;
            r.expect_end()?;
            Ok(Value::Float32(f32::from_le_bytes([b[0], b[1], b[2], b[3]])))
        }
        TypeTag::Float64 => {
            let b = r.take(8)?;
            r.expect_end()?;
            Ok(Value::Float64(f64::from_le_bytes([
                b[0], b[1], b[2], b[3], b[4], b[5], b[6], b[7],
            ])))
        }
        TypeTag::Text => {
            let at = r.at();
            let n = r.remaining();
            let s = std::str::from_utf8(r.take(n)?)
                .map_err(|e| DecodeError::BadUtf8 {
                    at: at + e.valid_up_to(),
                })?
                .to_string();
            Ok(Value::Text(s))
        }
        TypeTag::Instruction => {
            let instr = decode_instruction(r)?;
            r.expect_end()?;
            Ok(Value::Instruction(Box::new(instr)))
        }
        TypeTag::Bool => {
            let b = r.u8()?;
            r.expect_end()?;
            Ok(Value::Bool(b != 0))
        }
        TypeTag::Array => {
            let _declared = r.u32()?;
            let mut items = Vec::new();
            while !r.is_empty() {
                let elem_len = r.u32()? as usize;
                let at = r.at();
                let mut elem = r.sub(elem_len)?;
                let expr = decode_expr(&mut elem)?;
                elem.expect_end()?;
                match expr {
                    Expr::Literal(value) => items.push(value),
                    Expr::Absent => items.push(Value::Null),
                    Expr::Operation(_) => {
                        return Err(DecodeError::NonLiteralElement { at });
                    }
                }
            }
            Ok(Value::Array(items))
        }
    }
}

fn decode_signed(bytes: &[u8], at: usize) -> Result<i64, DecodeError> {
    match *bytes {
        [a] => Ok(i8::from_le_bytes([a]) as i64),
        [a, b] => Ok(i16::from_le_bytes([a, b]) as i64),
        [a, b, c, d] => Ok(i32::from_le_bytes([a, b, c, d]) as i64),
        [a, b, c, d, e, f, g, h] => Ok(i64::from_le_bytes([a, b, c, d, e, f, g, h])),
        _ => Err(DecodeError::BadIntWidth {
            at,
            width: bytes.len(),
        }),
    }
}

fn decode_unsigned(bytes: &[u8], at: usize) -> Result<u64, DecodeError> {
    match *bytes {
        [a] => Ok(a as u64),
        [a, b] => Ok(u16::from_le_bytes([a, b]) as u64),
        [a, b, c, d] => Ok(u32::from_le_bytes([a, b, c, d]) as u64),
        [a, b, c, d, e, f, g, h] => Ok(u64::from_le_bytes([a, b, c, d, e, f, g, h])),
        _ => Err(DecodeError::BadIntWidth {
            at,
            width: bytes.len(),
        }),
    }
}

// ---- Encoding ----

pub(crate) fn encode_program(program: &Program) -> Vec<u8> {
    let version = FORMAT_VERSION.as_bytes();
    let mut bytes = Vec::new();
    bytes.extend_from_slice(&(version.len() as u16).to_le_bytes());
    bytes.extend_from_slice(version);
    for instr in &program.instructions {
        encode_instruction(instr, &mut bytes);
    }
    bytes
}

fn encode_instruction(instr: &Instruction, out: &mut Vec<u8>) {
    let mut body = vec![instr.opcode as u8];
    for arg in &instr.args {
        encode_expr(arg, &mut body);
    }
    out.extend_from_slice(&(body.len() as u32).to_le_bytes());
    out.extend_from_slice(&body);
}

fn encode_expr(expr: &Expr, out: &mut Vec<u8>) {
    match expr {
        Expr::Absent => out.extend_from_slice(&0u32.to_le_bytes()),
        Expr::Literal(value) => encode_literal_expr(value, out),
        Expr::Operation(op) => {
            let mut body = vec![op.operator as u8 + 1];
            for operand in &op.operands {
                encode_expr(operand, &mut body);
            }
            out.extend_from_slice(&(body.len() as u32).to_le_bytes());
            out.extend_from_slice(&body);
        }
    }
}

/// Write a value as a complete literal expression (header, zero
/// discriminator, tag, payload).
fn encode_literal_expr(value: &Value, out: &mut Vec<u8>) {
    let mut body = vec![0u8];
    encode_literal(value, &mut body);
    out.extend_from_slice(&(body.len() as u32).to_le_bytes());
    out.extend_from_slice(&body);
}

fn encode_literal(value: &Value, out: &mut Vec<u8>) {
    out.push(value.type_tag() as u8);
    match value {
        Value::Null => {}
        Value::Int(n) => encode_signed(*n, out),
        Value::Uint(n) => encode_unsigned(*n, out),
        Value::Float32(x) => out.extend_from_slice(&x.to_le_bytes()),
        Value::Float64(x) => out.extend_from_slice(&x.to_le_bytes()),
        Value::Text(s) => out.extend_from_slice(s.as_bytes()),
        Value::Instruction(instr) => encode_instruction(instr, out),
        Value::Bool(b) => out.push(*b as u8),
        Value::Array(items) => {
            out.extend_from_slice(&(items.len() as u32).to_le_bytes());
            for item in items {
                let mut elem = Vec::new();
                encode_literal_expr(item, &mut elem);
                out.extend_from_slice(&(elem.len() as u32).to_le_bytes());
                out.extend_from_slice(&elem);
            }
        }
    }
}

/// Narrowest two's-complement width of 1, 2, 4, or 8 bytes.
fn encode_signed(n: i64, out: &mut Vec<u8>) {
    if let Ok(v) = i8::try_from(n) {
        out.extend_from_slice(&v.to_le_bytes());
    } else if let Ok(v) = i16::try_from(n) {
        out.extend_from_slice(&v.to_le_bytes());
    } else if let Ok(v) = i32::try_from(n) {
        out.extend_from_slice(&v.to_le_bytes());
    } else {
        out.extend_from_slice(&n.to_le_bytes());
    }
}

fn encode_unsigned(n: u64, out: &mut Vec<u8>) {
    if let Ok(v) = u8::try_from(n) {
        out.extend_from_slice(&v.to_le_bytes());
    } else if let Ok(v) = u16::try_from(n) {
        out.extend_from_slice(&v.to_le_bytes());
    } else if let Ok(v) = u32::try_from(n) {
        out.extend_from_slice(&v.to_le_bytes());
    } else {
        out.extend_from_slice(&n.to_le_bytes());
    }
}
