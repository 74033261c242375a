//! Program items, operands and op results.

use crate::errors::{type_mismatch, EvalError};
use crate::name::Name;
use crate::value::Value;

use super::ops::Op;

/// An op with the source line it was compiled from.
#[derive(Clone, Debug)]
pub struct Instr {
    pub op: Op,
    pub line: Option<u32>,
}

/// One entry of the program stack.
#[derive(Clone, Debug)]
pub enum Item {
    Op(Instr),
    Value(Value),
    Variable(Name),
    /// Halts the run when reached.
    Error(EvalError),
}

impl Item {
    /// An op with no line.
    pub fn op(op: Op) -> Self {
        Item::Op(Instr { op, line: None })
    }
}

/// A compiled instruction sequence, in execution order.
#[derive(Clone, Debug, Default)]
pub struct Program {
    items: Vec<Item>,
}

impl Program {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, item: Item) {
        self.items.push(item);
    }

    pub fn push_op(&mut self, op: Op, line: Option<u32>) {
        self.items.push(Item::Op(Instr { op, line }));
    }

    pub fn push_value(&mut self, value: impl Into<Value>) {
        self.items.push(Item::Value(value.into()));
    }

    pub fn push_variable(&mut self, name: impl Into<Name>) {
        self.items.push(Item::Variable(name.into()));
    }

    pub fn items(&self) -> &[Item] {
        &self.items
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

impl FromIterator<Item> for Program {
    fn from_iter<I: IntoIterator<Item = Item>>(iter: I) -> Self {
        Program {
            items: iter.into_iter().collect(),
        }
    }
}

impl Extend<Item> for Program {
    fn extend<I: IntoIterator<Item = Item>>(&mut self, iter: I) {
        self.items.extend(iter);
    }
}

/// An entry of the operand stack.
#[derive(Clone, Debug)]
pub enum Operand {
    Value(Value),
    Variable(Name),
}

impl Operand {
    pub fn into_value(self) -> Result<Value, EvalError> {
        match self {
            Operand::Value(value) => Ok(value),
            Operand::Variable(_) => Err(type_mismatch("value", "variable")),
        }
    }

    pub fn into_variable(self) -> Result<Name, EvalError> {
        match self {
            Operand::Variable(name) => Ok(name),
            Operand::Value(value) => Err(type_mismatch("variable", value.type_name())),
        }
    }
}

/// What an op hands back to the trampoline.
#[derive(Debug)]
pub enum Step {
    /// One value, available to the next op.
    Value(Value),
    /// Items to run next, in execution order.
    Push(Vec<Item>),
    /// Only the context stack changed.
    Effect,
}
