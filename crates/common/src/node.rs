//! Program tree nodes: instructions, operations, and expressions.
//!
//! The same tree is produced by the binary decoder and the assembler, and
//! consumed by the encoder and the evaluator. Scope names and owning
//! function handles are runtime annotations: the decoder and assembler
//! leave them unset, `MKFUNC` fills them in at definition time, and the
//! encoder never serializes them.

use crate::opcode::Opcode;
use crate::operator::Operator;
use crate::value::Value;

/// Handle to a function in the Environment's arena.
///
/// Nodes reference their owning function by handle rather than by pointer,
/// so a function body can be dropped or redefined without dangling
/// back-references.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FunctionId(u32);

impl FunctionId {
    /// Wrap an arena index.
    pub fn new(index: u32) -> Self {
        Self(index)
    }

    /// The arena index this handle refers to.
    pub fn index(&self) -> usize {
        self.0 as usize
    }
}

/// An argument or operand expression.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Expr {
    /// An omitted optional argument. Encodes with a zero-length body and
    /// evaluates to null; distinct from `Literal(Value::Null)` on the wire.
    Absent,
    /// A constant value.
    Literal(Value),
    /// A computation over operand expressions.
    Operation(Operation),
}

impl Expr {
    fn claim(&mut self, owner: FunctionId) {
        if let Expr::Operation(op) = self {
            op.claim(owner);
        }
        // Literal values keep their contents unclaimed: a nested function
        // definition claims its own body only when its MKFUNC executes,
        // which is what lets the nearest enclosing definition win.
    }
}

/// An operator applied to operand expressions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Operation {
    /// What this operation computes.
    pub operator: Operator,
    /// Operand expressions, evaluated left to right.
    pub operands: Vec<Expr>,
    /// Lexical scope name, if one has been assigned.
    pub scope: Option<String>,
    /// The function whose body this node belongs to, once propagated.
    pub owner: Option<FunctionId>,
}

impl Operation {
    /// Create an operation with no scope or owner annotations.
    pub fn new(operator: Operator, operands: Vec<Expr>) -> Self {
        Self {
            operator,
            operands,
            scope: None,
            owner: None,
        }
    }

    fn claim(&mut self, owner: FunctionId) {
        if self.owner.is_some() {
            return;
        }
        self.owner = Some(owner);
        for operand in &mut self.operands {
            operand.claim(owner);
        }
    }
}

/// One executable statement.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Instruction {
    /// What this instruction does.
    pub opcode: Opcode,
    /// Argument expressions, evaluated left to right before dispatch.
    pub args: Vec<Expr>,
    /// Lexical scope name, if one has been assigned.
    pub scope: Option<String>,
    /// The function whose body this node belongs to, once propagated.
    pub owner: Option<FunctionId>,
}

impl Instruction {
    /// Create an instruction with no scope or owner annotations.
    pub fn new(opcode: Opcode, args: Vec<Expr>) -> Self {
        Self {
            opcode,
            args,
            scope: None,
            owner: None,
        }
    }

    /// Set this instruction's scope. `MKFUNC` rebinds every top-level body
    /// instruction to the function's composed scope.
    pub fn rebind_scope(&mut self, scope: &str) {
        self.scope = Some(scope.to_string());
    }

    /// Propagate an owning function over this node and its nested
    /// operations, pre-order, stopping at nodes that already carry a
    /// binding and never descending into literal values.
    pub fn claim(&mut self, owner: FunctionId) {
        if self.owner.is_some() {
            return;
        }
        self.owner = Some(owner);
        for arg in &mut self.args {
            arg.claim(owner);
        }
    }
}
