//! Evaluator state: scoped variables, the function arena, call frames.

use std::collections::HashMap;
use std::rc::Rc;

use krait_common::{FunctionId, Instruction, Value};

use crate::host::Host;

/// A function captured by MKFUNC. The body is immutable after definition;
/// sharing it behind `Rc` lets a frame run the body while the environment
/// stays borrowable.
pub struct Function {
    /// Scope the function was stored under ("" = global).
    pub scope: String,
    pub name: String,
    pub body: Rc<[Instruction]>,
}

/// One function invocation: the callee plus its own argument vector.
///
/// Arguments live on the frame rather than on the shared [`Function`], so
/// recursive calls each see their own values.
pub struct Frame {
    pub function: FunctionId,
    pub args: Vec<Value>,
}

/// Mutable program state shared by every frame of one engine instance.
#[derive(Default)]
pub struct Environment {
    /// scope -> variable name -> value. Scope "" holds globals.
    pub(crate) variables: HashMap<String, HashMap<String, Value>>,
    /// scope -> function name -> arena slot.
    pub(crate) functions: HashMap<String, HashMap<String, FunctionId>>,
    /// Function arena; a [`FunctionId`] indexes into this table.
    pub(crate) table: Vec<Function>,
    /// Pending RETURN values keyed by function, popped by the frame loop.
    pub(crate) return_slots: HashMap<FunctionId, Value>,
    /// Pending RETURN value of top-level code, which runs outside any
    /// function.
    pub(crate) top_return: Option<Value>,
}

impl Environment {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_var(&mut self, scope: &str, name: &str, value: Value) {
        self.variables
            .entry(scope.to_string())
            .or_default()
            .insert(name.to_string(), value);
    }

    pub fn var(&self, scope: &str, name: &str) -> Option<&Value> {
        self.variables.get(scope)?.get(name)
    }

    /// Remove a variable. No-op when the scope or name does not exist.
    pub fn del_var(&mut self, scope: &str, name: &str) {
        if let Some(map) = self.variables.get_mut(scope) {
            map.remove(name);
        }
    }

    /// Store a function body under `scope` / `name` and return its id.
    ///
    /// Every instruction in the body is rebound to the function's scope,
    /// then the whole tree is claimed by the new id. Nodes that already
    /// carry an owner keep it, so an inner definition is never overwritten
    /// by the outer one.
    pub fn define_function(
        &mut self,
        scope: &str,
        name: &str,
        mut body: Vec<Instruction>,
    ) -> FunctionId {
        let id = FunctionId::new(self.table.len() as u32);
        for instr in &mut body {
            instr.rebind_scope(scope);
            instr.claim(id);
        }
        self.table.push(Function {
            scope: scope.to_string(),
            name: name.to_string(),
            body: body.into(),
        });
        self.functions
            .entry(scope.to_string())
            .or_default()
            .insert(name.to_string(), id);
        id
    }

    pub fn lookup_function(&self, scope: &str, name: &str) -> Option<FunctionId> {
        self.functions.get(scope)?.get(name).copied()
    }

    /// Arena access. Ids only come from [`Environment::define_function`],
    /// and the arena never shrinks, so the slot is always present.
    pub fn function(&self, id: FunctionId) -> &Function {
        &self.table[id.index()]
    }

    /// Park a RETURN value. `None` is the top-level slot.
    pub fn set_return(&mut self, slot: Option<FunctionId>, value: Value) {
        match slot {
            Some(id) => {
                self.return_slots.insert(id, value);
            }
            None => self.top_return = Some(value),
        }
    }

    /// Pop a parked RETURN value, leaving the slot empty.
    pub fn take_return(&mut self, slot: Option<FunctionId>) -> Option<Value> {
        match slot {
            Some(id) => self.return_slots.remove(&id),
            None => self.top_return.take(),
        }
    }
}

/// Combine the enclosing scope with an explicit sub-scope.
///
/// No explicit sub-scope (or an empty one) keeps the enclosing scope;
/// otherwise the two are joined with the hierarchy separator.
pub(crate) fn compose_scope(enclosing: &str, explicit: Option<&str>) -> String {
    match explicit {
        None => enclosing.to_string(),
        Some(sub) if sub.is_empty() => enclosing.to_string(),
        Some(sub) if enclosing.is_empty() => sub.to_string(),
        Some(sub) => format!("{enclosing}:{sub}"),
    }
}

/// The Krait evaluator: an [`Environment`], the active call frames, and
/// the host collaborator for I/O and native calls.
pub struct Machine<H: Host> {
    pub(crate) env: Environment,
    pub(crate) frames: Vec<Frame>,
    pub(crate) host: H,
}

impl<H: Host> Machine<H> {
    /// Create an evaluator with an empty environment.
    pub fn new(host: H) -> Self {
        Self {
            env: Environment::new(),
            frames: Vec::new(),
            host,
        }
    }

    pub fn host(&self) -> &H {
        &self.host
    }

    pub fn host_mut(&mut self) -> &mut H {
        &mut self.host
    }

    pub fn env(&self) -> &Environment {
        &self.env
    }

    /// The return slot of the innermost active frame (`None` = top level).
    pub(crate) fn current_slot(&self) -> Option<FunctionId> {
        self.frames.last().map(|frame| frame.function)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use krait_common::Opcode;

    fn nop() -> Instruction {
        Instruction::new(Opcode::NullEval, vec![])
    }

    #[test]
    fn variables_are_scoped() {
        let mut env = Environment::new();
        env.set_var("", "x", Value::Int(1));
        env.set_var("a", "x", Value::Int(2));

        assert_eq!(env.var("", "x"), Some(&Value::Int(1)));
        assert_eq!(env.var("a", "x"), Some(&Value::Int(2)));
        assert_eq!(env.var("b", "x"), None);
    }

    #[test]
    fn del_var_is_a_noop_for_missing_names() {
        let mut env = Environment::new();
        env.set_var("", "x", Value::Int(1));
        env.del_var("", "y");
        env.del_var("nowhere", "x");
        assert_eq!(env.var("", "x"), Some(&Value::Int(1)));

        env.del_var("", "x");
        assert_eq!(env.var("", "x"), None);
    }

    #[test]
    fn redefinition_points_the_name_at_the_new_body() {
        let mut env = Environment::new();
        let first = env.define_function("", "f", vec![nop()]);
        let second = env.define_function("", "f", vec![nop(), nop()]);

        assert_ne!(first, second);
        assert_eq!(env.lookup_function("", "f"), Some(second));
        // The old body stays reachable through its id for frames mid-call.
        assert_eq!(env.function(first).body.len(), 1);
        assert_eq!(env.function(second).body.len(), 2);
    }

    #[test]
    fn define_function_rebinds_and_claims_the_body() {
        let mut env = Environment::new();
        let id = env.define_function("a:b", "f", vec![nop()]);

        let body = &env.function(id).body;
        assert_eq!(body[0].scope.as_deref(), Some("a:b"));
        assert_eq!(body[0].owner, Some(id));
    }

    #[test]
    fn return_slots_pop_once() {
        let mut env = Environment::new();
        let id = env.define_function("", "f", vec![]);

        env.set_return(Some(id), Value::Int(7));
        assert_eq!(env.take_return(Some(id)), Some(Value::Int(7)));
        assert_eq!(env.take_return(Some(id)), None);

        env.set_return(None, Value::Text("top".to_string()));
        assert_eq!(env.take_return(None), Some(Value::Text("top".to_string())));
        assert_eq!(env.take_return(None), None);
    }

    #[test]
    fn scope_composition() {
        assert_eq!(compose_scope("", None), "");
        assert_eq!(compose_scope("a", None), "a");
        assert_eq!(compose_scope("", Some("b")), "b");
        assert_eq!(compose_scope("a", Some("b")), "a:b");
        assert_eq!(compose_scope("a:b", Some("c")), "a:b:c");
        assert_eq!(compose_scope("a", Some("")), "a");
    }
}
