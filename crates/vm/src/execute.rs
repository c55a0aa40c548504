//! The frame loop and opcode/operator dispatch.
//!
//! A frame is one instruction sequence run to completion: the program's
//! top level, a function body, or an included file. Each frame owns its
//! cursor, its label table, and its result slot, so jumps and labels
//! never leak across frames.

use std::collections::HashMap;
use std::rc::Rc;
use std::time::{SystemTime, UNIX_EPOCH};

use krait_common::{Expr, Instruction, Opcode, Operation, Operator, Program, Value};

use crate::error::RuntimeError;
use crate::host::Host;
use crate::machine::{compose_scope, Frame, Machine};

/// What the frame loop does after one instruction.
enum Outcome {
    /// Advance to the next instruction.
    Continue,
    /// Pop the pending return value into the frame result, then advance.
    SetResult,
    /// Stop this frame, yielding whatever result it holds.
    Terminate,
    /// Move the cursor to an absolute position.
    Jump(usize),
    /// Move the cursor to a label registered earlier in this frame.
    JumpLabel(String),
    /// Register the next position under a name, then move the cursor.
    Label(String, usize),
}

impl<H: Host> Machine<H> {
    /// Run a program's top-level frame to completion.
    pub fn execute(&mut self, program: &Program) -> Result<Option<Value>, RuntimeError> {
        self.run_frame(&program.instructions)
    }

    /// Decode a binary program, then run it. The version gate applies
    /// before anything executes.
    pub fn execute_bytes(&mut self, bytes: &[u8]) -> Result<Option<Value>, RuntimeError> {
        let program = Program::decode(bytes)?;
        self.execute(&program)
    }

    fn run_frame(&mut self, instructions: &[Instruction]) -> Result<Option<Value>, RuntimeError> {
        let mut labels: HashMap<String, usize> = HashMap::new();
        let mut result = None;
        let mut pos = 0;

        while let Some(instr) = instructions.get(pos) {
            match self.exec_instruction(instr)? {
                Outcome::Continue => pos += 1,
                Outcome::SetResult => {
                    result = self.env.take_return(self.current_slot());
                    pos += 1;
                }
                Outcome::Terminate => break,
                Outcome::Jump(target) => pos = target,
                Outcome::JumpLabel(name) => match labels.get(&name) {
                    Some(&target) => pos = target,
                    None => return Err(RuntimeError::UnknownLabel { name }),
                },
                Outcome::Label(name, target) => {
                    labels.insert(name, pos + 1);
                    pos = target;
                }
            }
        }
        Ok(result)
    }

    /// Evaluate every argument left to right, then dispatch on the opcode.
    fn exec_instruction(&mut self, instr: &Instruction) -> Result<Outcome, RuntimeError> {
        let enclosing = instr.scope.as_deref().unwrap_or("");
        let mut args = Vec::with_capacity(instr.args.len());
        for arg in &instr.args {
            args.push(self.eval_expr(arg, enclosing)?);
        }

        match instr.opcode {
            Opcode::SetVar => self.exec_set_var(args, enclosing),
            Opcode::SetGlobal => self.exec_set_global(args),
            Opcode::DelVar => self.exec_del_var(&args, enclosing),
            Opcode::MakeFunc => self.exec_make_func(args, enclosing),
            Opcode::Return => self.exec_return(args),
            Opcode::Terminate => Ok(Outcome::Terminate),
            Opcode::JumpIf => exec_conditional_jump(&args, "JUMPIF", true),
            Opcode::JumpIfNot => exec_conditional_jump(&args, "JUMPIN", false),
            Opcode::Jump => Ok(Outcome::Jump(jump_target(&args, "JUMPTO", 0)?)),
            Opcode::JumpLabel => {
                let name = text(required_arg(&args, "JUMPLB", 0)?, "label name")?;
                Ok(Outcome::JumpLabel(name.to_string()))
            }
            Opcode::MarkLabel => {
                let name = text(required_arg(&args, "MLABEL", 0)?, "label name")?.to_string();
                let target = jump_target(&args, "MLABEL", 1)?;
                Ok(Outcome::Label(name, target))
            }
            Opcode::ExecFile => self.exec_file(&args),
            Opcode::Print => self.exec_print(&args),
            Opcode::NullEval => Ok(Outcome::Continue),
        }
    }

    // ---- Instructions ----

    fn exec_set_var(&mut self, args: Vec<Value>, enclosing: &str) -> Result<Outcome, RuntimeError> {
        let name = text(required_arg(&args, "SETVAR", 0)?, "variable name")?.to_string();
        let explicit = match optional(&args, 1) {
            Some(value) => Some(text(value, "scope")?.to_string()),
            None => None,
        };
        let scope = compose_scope(enclosing, explicit.as_deref());
        let value = args.into_iter().nth(2).unwrap_or(Value::Null);
        self.env.set_var(&scope, &name, value);
        Ok(Outcome::Continue)
    }

    fn exec_set_global(&mut self, args: Vec<Value>) -> Result<Outcome, RuntimeError> {
        let name = text(required_arg(&args, "GSTVAR", 0)?, "variable name")?.to_string();
        let value = args.into_iter().nth(1).unwrap_or(Value::Null);
        self.env.set_var("", &name, value);
        Ok(Outcome::Continue)
    }

    fn exec_del_var(&mut self, args: &[Value], enclosing: &str) -> Result<Outcome, RuntimeError> {
        let name = text(required_arg(args, "DELVAR", 0)?, "variable name")?;
        self.env.del_var(enclosing, name);
        Ok(Outcome::Continue)
    }

    fn exec_make_func(
        &mut self,
        args: Vec<Value>,
        enclosing: &str,
    ) -> Result<Outcome, RuntimeError> {
        let name = text(required_arg(&args, "MKFUNC", 0)?, "function name")?.to_string();
        let explicit = match optional(&args, 1) {
            Some(value) => Some(text(value, "scope")?.to_string()),
            None => None,
        };
        let scope = compose_scope(enclosing, explicit.as_deref());

        let mut body = Vec::new();
        for value in args.into_iter().skip(2) {
            match value {
                Value::Instruction(instr) => body.push(*instr),
                other => {
                    return Err(RuntimeError::WrongType {
                        what: "function body",
                        expected: "instruction",
                        got: other.type_tag().name(),
                    })
                }
            }
        }
        self.env.define_function(&scope, &name, body);
        Ok(Outcome::Continue)
    }

    fn exec_return(&mut self, args: Vec<Value>) -> Result<Outcome, RuntimeError> {
        let value = args.into_iter().next().unwrap_or(Value::Null);
        self.env.set_return(self.current_slot(), value);
        Ok(Outcome::SetResult)
    }

    fn exec_file(&mut self, args: &[Value]) -> Result<Outcome, RuntimeError> {
        let path = text(required_arg(args, "EXFILE", 0)?, "program path")?;
        let bytes = self
            .host
            .load(path)
            .map_err(|e| RuntimeError::Io(e.to_string()))?;
        let program = Program::decode(&bytes)?;
        // Included programs run for their definitions and side effects;
        // their result is discarded.
        self.run_frame(&program.instructions)?;
        Ok(Outcome::Continue)
    }

    fn exec_print(&mut self, args: &[Value]) -> Result<Outcome, RuntimeError> {
        let line = args
            .iter()
            .map(|value| value.to_string())
            .collect::<Vec<_>>()
            .join(" ");
        self.host
            .write_line(&line)
            .map_err(|e| RuntimeError::Io(e.to_string()))?;
        Ok(Outcome::Continue)
    }

    // ---- Expressions ----

    fn eval_expr(&mut self, expr: &Expr, enclosing: &str) -> Result<Value, RuntimeError> {
        match expr {
            Expr::Absent => Ok(Value::Null),
            Expr::Literal(value) => Ok(value.clone()),
            Expr::Operation(op) => self.eval_operation(op, enclosing),
        }
    }

    fn eval_operation(&mut self, op: &Operation, enclosing: &str) -> Result<Value, RuntimeError> {
        // REPEAT controls evaluation of its own operands.
        if op.operator == Operator::Repeat {
            return self.eval_repeat(op, enclosing);
        }

        let mut operands = Vec::with_capacity(op.operands.len());
        for operand in &op.operands {
            operands.push(self.eval_expr(operand, enclosing)?);
        }
        let ops = &operands[..];

        match op.operator {
            // Variables and calls
            Operator::GetVar => self.eval_get_var(ops),
            Operator::GetArg => self.eval_get_arg(op, ops),
            Operator::Call => self.eval_call(ops),
            Operator::NativeCall => self.eval_native_call(ops),

            // General
            Operator::Stringify => Ok(Value::Text(ops.first().unwrap_or(&Value::Null).to_string())),
            Operator::Repeat => Ok(Value::Null), // handled before operand evaluation
            Operator::Chrono => eval_chrono(ops),

            // Comparison and logic
            Operator::Equals => Ok(Value::Bool(all_equal(ops))),
            Operator::Differ => Ok(Value::Bool(!all_equal(ops))),
            Operator::LogAnd => Ok(Value::Bool(ops.iter().all(Value::truthy))),
            Operator::LogOr => Ok(Value::Bool(ops.iter().any(Value::truthy))),
            Operator::LogXor => Ok(Value::Bool(
                ops.iter().fold(false, |acc, v| acc ^ v.truthy()),
            )),
            Operator::LogNot => Ok(Value::Bool(!ops.first().map(Value::truthy).unwrap_or(false))),

            // Arithmetic
            Operator::Add => fold_arith(
                "ADDNUM",
                ops,
                i64::wrapping_add,
                u64::wrapping_add,
                |a, b| a + b,
            ),
            Operator::Sub => fold_arith(
                "SUBNUM",
                ops,
                i64::wrapping_sub,
                u64::wrapping_sub,
                |a, b| a - b,
            ),
            Operator::Mul => {
                if ops.is_empty() {
                    Ok(Value::Int(1))
                } else {
                    fold_arith(
                        "MULNUM",
                        ops,
                        i64::wrapping_mul,
                        u64::wrapping_mul,
                        |a, b| a * b,
                    )
                }
            }
            Operator::Div => eval_div(ops),
            Operator::Pow => fold_float("POWNUM", ops, |a, b| a.powf(b)),
            Operator::Root => fold_float("ROTNUM", ops, |a, b| a.powf(1.0 / b)),

            // Bitwise
            Operator::BitAnd => fold_bits("ANDNUM", ops, |a, b| a & b, |a, b| a & b),
            Operator::BitOr => fold_bits("IORNUM", ops, |a, b| a | b, |a, b| a | b),
            Operator::BitXor => fold_bits("XORNUM", ops, |a, b| a ^ b, |a, b| a ^ b),
            Operator::BitNot => eval_bit_not(ops),

            // Text
            Operator::Slice => eval_slice(ops),
            Operator::Concat => Ok(Value::Text(
                ops.iter().map(|v| v.to_string()).collect::<String>(),
            )),
            Operator::CharAt => eval_char_at(ops),
        }
    }

    fn eval_get_var(&mut self, ops: &[Value]) -> Result<Value, RuntimeError> {
        let name = text(required_operand(ops, "GETVAR", 0)?, "variable name")?;
        let scope = match optional(ops, 1) {
            Some(value) => text(value, "scope")?,
            None => "",
        };
        match self.env.var(scope, name) {
            Some(value) => Ok(value.clone()),
            None => Err(RuntimeError::UnknownVariable {
                scope: scope.to_string(),
                name: name.to_string(),
            }),
        }
    }

    /// GETARG reads from the frame of the function that owns this node,
    /// innermost live frame first, so recursive calls see their own
    /// arguments.
    fn eval_get_arg(&mut self, op: &Operation, ops: &[Value]) -> Result<Value, RuntimeError> {
        let index = integer(required_operand(ops, "GETARG", 0)?, "argument index")?;
        let owner = match op.owner {
            Some(owner) => owner,
            None => return Ok(Value::Null),
        };
        let frame = match self.frames.iter().rev().find(|f| f.function == owner) {
            Some(frame) => frame,
            None => return Ok(Value::Null),
        };
        match usize::try_from(index).ok().and_then(|i| frame.args.get(i)) {
            Some(value) => Ok(value.clone()),
            None => Err(RuntimeError::ArgumentOutOfRange {
                index,
                count: frame.args.len(),
            }),
        }
    }

    fn eval_repeat(&mut self, op: &Operation, enclosing: &str) -> Result<Value, RuntimeError> {
        let count_expr = match op.operands.first() {
            Some(expr) => expr,
            None => {
                return Err(RuntimeError::MissingOperand {
                    operator: "REPEAT",
                    index: 0,
                })
            }
        };
        // The count is evaluated exactly once, before any iteration.
        let count = integer(&self.eval_expr(count_expr, enclosing)?, "repeat count")?;

        let mut result = Value::Null;
        for _ in 0..count {
            for operand in &op.operands[1..] {
                result = self.eval_expr(operand, enclosing)?;
            }
        }
        Ok(result)
    }

    fn eval_call(&mut self, ops: &[Value]) -> Result<Value, RuntimeError> {
        let name = text(required_operand(ops, "FNCALL", 0)?, "function name")?;
        let scope = match optional(ops, 1) {
            Some(value) => text(value, "scope")?,
            None => "",
        };
        let id = match self.env.lookup_function(scope, name) {
            Some(id) => id,
            None => {
                return Err(RuntimeError::UnknownFunction {
                    scope: scope.to_string(),
                    name: name.to_string(),
                })
            }
        };
        let body = Rc::clone(&self.env.function(id).body);
        let call_args = ops.get(2..).unwrap_or(&[]).to_vec();

        self.frames.push(Frame {
            function: id,
            args: call_args,
        });
        let outcome = self.run_frame(&body);
        self.frames.pop();
        Ok(outcome?.unwrap_or(Value::Null))
    }

    fn eval_native_call(&mut self, ops: &[Value]) -> Result<Value, RuntimeError> {
        let name = text(required_operand(ops, "NFCALL", 0)?, "function name")?;
        let module = text(required_operand(ops, "NFCALL", 1)?, "module name")?;
        let rest = ops.get(2..).unwrap_or(&[]);
        self.host.call_native(module, name, rest)
    }
}

// ---- Jumps ----

fn exec_conditional_jump(
    args: &[Value],
    opcode: &'static str,
    wanted: bool,
) -> Result<Outcome, RuntimeError> {
    let cond = args.first().map(Value::truthy).unwrap_or(false);
    if cond == wanted {
        Ok(Outcome::Jump(jump_target(args, opcode, 1)?))
    } else {
        Ok(Outcome::Continue)
    }
}

fn jump_target(args: &[Value], opcode: &'static str, index: usize) -> Result<usize, RuntimeError> {
    let target = integer(required_arg(args, opcode, index)?, "jump target")?;
    usize::try_from(target).map_err(|_| RuntimeError::InvalidJumpTarget { target })
}

// ---- Operator helpers ----

fn eval_chrono(ops: &[Value]) -> Result<Value, RuntimeError> {
    let now = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs_f64())
        .unwrap_or_default();
    let offset = match optional(ops, 0) {
        Some(value) => as_f64_value(value, "CHRONO")?,
        None => 0.0,
    };
    Ok(Value::Float64(now + offset))
}

fn all_equal(ops: &[Value]) -> bool {
    ops.windows(2).all(|pair| pair[0] == pair[1])
}

fn eval_bit_not(ops: &[Value]) -> Result<Value, RuntimeError> {
    match required_operand(ops, "NOTNUM", 0)? {
        Value::Int(n) => Ok(Value::Int(!n)),
        Value::Uint(n) => Ok(Value::Uint(!n)),
        other => Err(RuntimeError::NotInteger {
            operator: "NOTNUM",
            got: other.type_tag().name(),
        }),
    }
}

/// Character-based half-open slice. Negative indices count from the end
/// and the range is clamped to the text bounds.
fn eval_slice(ops: &[Value]) -> Result<Value, RuntimeError> {
    let s = text(required_operand(ops, "SSLICE", 0)?, "slice text")?;
    let start = integer(required_operand(ops, "SSLICE", 1)?, "slice start")?;
    let end = integer(required_operand(ops, "SSLICE", 2)?, "slice end")?;

    let chars: Vec<char> = s.chars().collect();
    let from = clamp_index(start, chars.len());
    let to = clamp_index(end, chars.len());
    if from >= to {
        return Ok(Value::Text(String::new()));
    }
    Ok(Value::Text(chars[from..to].iter().collect()))
}

fn eval_char_at(ops: &[Value]) -> Result<Value, RuntimeError> {
    let s = text(required_operand(ops, "SPSCHR", 0)?, "text")?;
    let index = integer(required_operand(ops, "SPSCHR", 1)?, "character index")?;

    let chars: Vec<char> = s.chars().collect();
    let resolved = if index < 0 {
        index + chars.len() as i64
    } else {
        index
    };
    match usize::try_from(resolved).ok().and_then(|i| chars.get(i)) {
        Some(ch) => Ok(Value::Text(ch.to_string())),
        None => Err(RuntimeError::IndexOutOfRange {
            index,
            length: chars.len(),
        }),
    }
}

/// Resolve a possibly-negative index against `len`, clamping into `0..=len`.
fn clamp_index(index: i64, len: usize) -> usize {
    let resolved = if index < 0 { index + len as i64 } else { index };
    resolved.clamp(0, len as i64) as usize
}

// ---- Numeric promotion ----

/// Operand classes for the arithmetic and bitwise folds.
enum Num {
    I(i64),
    U(u64),
    F(f64),
}

fn classify(operator: &'static str, ops: &[Value]) -> Result<Vec<Num>, RuntimeError> {
    ops.iter()
        .map(|value| match value {
            Value::Int(n) => Ok(Num::I(*n)),
            Value::Uint(n) => Ok(Num::U(*n)),
            Value::Float32(x) => Ok(Num::F(*x as f64)),
            Value::Float64(x) => Ok(Num::F(*x)),
            other => Err(RuntimeError::NotNumeric {
                operator,
                got: other.type_tag().name(),
            }),
        })
        .collect()
}

fn as_i64(num: &Num) -> i64 {
    match num {
        Num::I(n) => *n,
        Num::U(n) => *n as i64,
        Num::F(x) => *x as i64,
    }
}

fn as_u64(num: &Num) -> u64 {
    match num {
        Num::I(n) => *n as u64,
        Num::U(n) => *n,
        Num::F(x) => *x as u64,
    }
}

fn as_f64(num: &Num) -> f64 {
    match num {
        Num::I(n) => *n as f64,
        Num::U(n) => *n as f64,
        Num::F(x) => *x,
    }
}

/// Left-fold with numeric promotion: any float operand promotes the whole
/// fold to f64, an all-unsigned list stays unsigned, anything else folds
/// as signed. Integer folds wrap on overflow.
fn fold_arith(
    operator: &'static str,
    ops: &[Value],
    i_op: fn(i64, i64) -> i64,
    u_op: fn(u64, u64) -> u64,
    f_op: fn(f64, f64) -> f64,
) -> Result<Value, RuntimeError> {
    let nums = classify(operator, ops)?;
    let (first, rest) = match nums.split_first() {
        Some(split) => split,
        None => return Err(RuntimeError::MissingOperand { operator, index: 0 }),
    };

    if nums.iter().any(|n| matches!(n, Num::F(_))) {
        let mut acc = as_f64(first);
        for n in rest {
            acc = f_op(acc, as_f64(n));
        }
        Ok(Value::Float64(acc))
    } else if nums.iter().all(|n| matches!(n, Num::U(_))) {
        let mut acc = as_u64(first);
        for n in rest {
            acc = u_op(acc, as_u64(n));
        }
        Ok(Value::Uint(acc))
    } else {
        let mut acc = as_i64(first);
        for n in rest {
            acc = i_op(acc, as_i64(n));
        }
        Ok(Value::Int(acc))
    }
}

/// DIVNUM always folds in f64 and fails on any zero divisor.
fn eval_div(ops: &[Value]) -> Result<Value, RuntimeError> {
    let nums = classify("DIVNUM", ops)?;
    let (first, rest) = match nums.split_first() {
        Some(split) => split,
        None => {
            return Err(RuntimeError::MissingOperand {
                operator: "DIVNUM",
                index: 0,
            })
        }
    };

    let mut acc = as_f64(first);
    for n in rest {
        let divisor = as_f64(n);
        if divisor == 0.0 {
            return Err(RuntimeError::DivisionByZero);
        }
        acc /= divisor;
    }
    Ok(Value::Float64(acc))
}

/// POWNUM and ROTNUM always fold in f64.
fn fold_float(
    operator: &'static str,
    ops: &[Value],
    f_op: fn(f64, f64) -> f64,
) -> Result<Value, RuntimeError> {
    let nums = classify(operator, ops)?;
    let (first, rest) = match nums.split_first() {
        Some(split) => split,
        None => return Err(RuntimeError::MissingOperand { operator, index: 0 }),
    };

    let mut acc = as_f64(first);
    for n in rest {
        acc = f_op(acc, as_f64(n));
    }
    Ok(Value::Float64(acc))
}

/// Bitwise folds accept integers only; an all-unsigned operand list stays
/// unsigned.
fn fold_bits(
    operator: &'static str,
    ops: &[Value],
    i_op: fn(i64, i64) -> i64,
    u_op: fn(u64, u64) -> u64,
) -> Result<Value, RuntimeError> {
    if ops.is_empty() {
        return Err(RuntimeError::MissingOperand { operator, index: 0 });
    }
    let nums = classify(operator, ops)?;
    for (num, value) in nums.iter().zip(ops) {
        if matches!(num, Num::F(_)) {
            return Err(RuntimeError::NotInteger {
                operator,
                got: value.type_tag().name(),
            });
        }
    }

    if nums.iter().all(|n| matches!(n, Num::U(_))) {
        let mut acc = as_u64(&nums[0]);
        for n in &nums[1..] {
            acc = u_op(acc, as_u64(n));
        }
        Ok(Value::Uint(acc))
    } else {
        let mut acc = as_i64(&nums[0]);
        for n in &nums[1..] {
            acc = i_op(acc, as_i64(n));
        }
        Ok(Value::Int(acc))
    }
}

// ---- Argument accessors ----

/// A required instruction argument; absent or null counts as missing.
fn required_arg<'a>(
    args: &'a [Value],
    opcode: &'static str,
    index: usize,
) -> Result<&'a Value, RuntimeError> {
    match args.get(index) {
        None | Some(Value::Null) => Err(RuntimeError::MissingArgument { opcode, index }),
        Some(value) => Ok(value),
    }
}

/// A required operator operand; absent or null counts as missing.
fn required_operand<'a>(
    ops: &'a [Value],
    operator: &'static str,
    index: usize,
) -> Result<&'a Value, RuntimeError> {
    match ops.get(index) {
        None | Some(Value::Null) => Err(RuntimeError::MissingOperand { operator, index }),
        Some(value) => Ok(value),
    }
}

/// An optional slot: null stands for "not given".
fn optional(args: &[Value], index: usize) -> Option<&Value> {
    match args.get(index) {
        None | Some(Value::Null) => None,
        Some(value) => Some(value),
    }
}

fn text<'a>(value: &'a Value, what: &'static str) -> Result<&'a str, RuntimeError> {
    match value {
        Value::Text(s) => Ok(s),
        other => Err(RuntimeError::WrongType {
            what,
            expected: "text",
            got: other.type_tag().name(),
        }),
    }
}

fn integer(value: &Value, what: &'static str) -> Result<i64, RuntimeError> {
    match value {
        Value::Int(n) => Ok(*n),
        Value::Uint(n) => Ok(*n as i64),
        other => Err(RuntimeError::WrongType {
            what,
            expected: "integer",
            got: other.type_tag().name(),
        }),
    }
}

fn as_f64_value(value: &Value, operator: &'static str) -> Result<f64, RuntimeError> {
    match value {
        Value::Int(n) => Ok(*n as f64),
        Value::Uint(n) => Ok(*n as f64),
        Value::Float32(x) => Ok(*x as f64),
        Value::Float64(x) => Ok(*x),
        other => Err(RuntimeError::NotNumeric {
            operator,
            got: other.type_tag().name(),
        }),
    }
}
