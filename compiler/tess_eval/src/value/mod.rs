//! Value model.
//!
//! Two closed unions over the same variants:
//!
//! - [`Value`] holds rooted handles. It lives on the operand stack, in scope
//!   frames, in the memo table and as a run's result, so anything a `Value`
//!   references survives collection.
//! - [`Slot`] holds unrooted [`Frozen`] handles. It is what nodes store; the
//!   referenced nodes are kept alive by graph reachability alone.
//!
//! A field-ref is a write capability, not data: it exists only as a `Value`
//! and has no `Slot` form.

mod clone;
mod display;
mod fields;
mod key;
mod nodes;

use std::rc::Rc;

use tess_graph::{Frozen, GraphError, GraphPool, NodeId, Pointers, Root};

use crate::errors::{cannot_clone_field_ref, type_mismatch, EvalError};
use crate::lambda::Lambda;
use crate::name::Name;
use crate::number::Number;

pub use clone::{clone_for_update, clone_value, Cloner};
pub use fields::{get_field, make_cluster};
pub(crate) use fields::tile_points;
pub use key::memo_key;
pub use nodes::{Cluster, Edge, Fields, Object, Patch, Tile, Vertex};

/// A deferred write target: field `field` of the object bound to `binding`.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct FieldRef {
    pub binding: Name,
    pub field: Name,
}

/// A rooted runtime value.
#[derive(Clone, Debug, PartialEq)]
pub enum Value {
    Nil,
    Number(Number),
    Str(Rc<str>),
    Bool(bool),
    Tile(Root<Tile>),
    Vertex(Root<Vertex>),
    Edge(Root<Edge>),
    Patch(Root<Patch>),
    Cluster(Root<Cluster>),
    Lambda(Root<Lambda>),
    FieldRef(FieldRef),
}

/// An unrooted value, as stored inside nodes.
#[derive(Clone, Debug, PartialEq)]
pub enum Slot {
    Nil,
    Number(Number),
    Str(Rc<str>),
    Bool(bool),
    Tile(Frozen<Tile>),
    Vertex(Frozen<Vertex>),
    Edge(Frozen<Edge>),
    Patch(Frozen<Patch>),
    Cluster(Frozen<Cluster>),
    Lambda(Frozen<Lambda>),
}

impl Value {
    /// Create a string value.
    pub fn string(s: &str) -> Self {
        Value::Str(Rc::from(s))
    }

    /// Type name for diagnostics.
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Nil => "nil",
            Value::Number(_) => "number",
            Value::Str(_) => "string",
            Value::Bool(_) => "bool",
            Value::Tile(_) => "tile",
            Value::Vertex(_) => "vertex",
            Value::Edge(_) => "edge",
            Value::Patch(_) => "patch",
            Value::Cluster(_) => "cluster",
            Value::Lambda(_) => "lambda",
            Value::FieldRef(_) => "field-ref",
        }
    }

    /// Allocation identity of a handle value.
    pub fn node_id(&self) -> Option<NodeId> {
        match self {
            Value::Tile(h) => Some(h.id()),
            Value::Vertex(h) => Some(h.id()),
            Value::Edge(h) => Some(h.id()),
            Value::Patch(h) => Some(h.id()),
            Value::Cluster(h) => Some(h.id()),
            Value::Lambda(h) => Some(h.id()),
            _ => None,
        }
    }

    /// Whether this is an object that can carry user fields.
    pub fn is_object(&self) -> bool {
        self.node_id().is_some()
    }

    /// Unrooted form, for storing inside a node.
    ///
    /// The caller must keep `self` alive until the slot is reachable from a
    /// rooted node.
    pub fn to_slot(&self) -> Result<Slot, EvalError> {
        Ok(match self {
            Value::Nil => Slot::Nil,
            Value::Number(n) => Slot::Number(*n),
            Value::Str(s) => Slot::Str(Rc::clone(s)),
            Value::Bool(b) => Slot::Bool(*b),
            Value::Tile(h) => Slot::Tile(h.handle()),
            Value::Vertex(h) => Slot::Vertex(h.handle()),
            Value::Edge(h) => Slot::Edge(h.handle()),
            Value::Patch(h) => Slot::Patch(h.handle()),
            Value::Cluster(h) => Slot::Cluster(h.handle()),
            Value::Lambda(h) => Slot::Lambda(h.handle()),
            Value::FieldRef(_) => return Err(cannot_clone_field_ref()),
        })
    }

    /// Root a stored slot.
    pub fn load(pool: &GraphPool, slot: &Slot) -> Result<Value, GraphError> {
        Ok(match slot {
            Slot::Nil => Value::Nil,
            Slot::Number(n) => Value::Number(*n),
            Slot::Str(s) => Value::Str(Rc::clone(s)),
            Slot::Bool(b) => Value::Bool(*b),
            Slot::Tile(h) => Value::Tile(pool.root(*h)?),
            Slot::Vertex(h) => Value::Vertex(pool.root(*h)?),
            Slot::Edge(h) => Value::Edge(pool.root(*h)?),
            Slot::Patch(h) => Value::Patch(pool.root(*h)?),
            Slot::Cluster(h) => Value::Cluster(pool.root(*h)?),
            Slot::Lambda(h) => Value::Lambda(pool.root(*h)?),
        })
    }

    // Operand coercions

    pub fn as_number(&self) -> Result<Number, EvalError> {
        match self {
            Value::Number(n) => Ok(*n),
            other => Err(type_mismatch("number", other.type_name())),
        }
    }

    pub fn as_bool(&self) -> Result<bool, EvalError> {
        match self {
            Value::Bool(b) => Ok(*b),
            other => Err(type_mismatch("bool", other.type_name())),
        }
    }

    pub fn as_cluster(&self) -> Result<&Root<Cluster>, EvalError> {
        match self {
            Value::Cluster(h) => Ok(h),
            other => Err(type_mismatch("cluster", other.type_name())),
        }
    }

    pub fn as_tile(&self) -> Result<&Root<Tile>, EvalError> {
        match self {
            Value::Tile(h) => Ok(h),
            other => Err(type_mismatch("tile", other.type_name())),
        }
    }
}

impl From<Number> for Value {
    fn from(n: Number) -> Self {
        Value::Number(n)
    }
}

impl From<f64> for Value {
    fn from(n: f64) -> Self {
        Value::Number(Number::new(n))
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<Root<Tile>> for Value {
    fn from(h: Root<Tile>) -> Self {
        Value::Tile(h)
    }
}

impl From<Root<Patch>> for Value {
    fn from(h: Root<Patch>) -> Self {
        Value::Patch(h)
    }
}

impl From<Root<Cluster>> for Value {
    fn from(h: Root<Cluster>) -> Self {
        Value::Cluster(h)
    }
}

impl From<Root<Lambda>> for Value {
    fn from(h: Root<Lambda>) -> Self {
        Value::Lambda(h)
    }
}

impl Slot {
    /// Report the internal pointer this slot holds, if any.
    pub fn push_pointer(&self, out: &mut Pointers) {
        let id = match self {
            Slot::Tile(h) => h.id(),
            Slot::Vertex(h) => h.id(),
            Slot::Edge(h) => h.id(),
            Slot::Patch(h) => h.id(),
            Slot::Cluster(h) => h.id(),
            Slot::Lambda(h) => h.id(),
            Slot::Nil | Slot::Number(_) | Slot::Str(_) | Slot::Bool(_) => return,
        };
        out.push(id);
    }

    pub fn type_name(&self) -> &'static str {
        match self {
            Slot::Nil => "nil",
            Slot::Number(_) => "number",
            Slot::Str(_) => "string",
            Slot::Bool(_) => "bool",
            Slot::Tile(_) => "tile",
            Slot::Vertex(_) => "vertex",
            Slot::Edge(_) => "edge",
            Slot::Patch(_) => "patch",
            Slot::Cluster(_) => "cluster",
            Slot::Lambda(_) => "lambda",
        }
    }
}

#[cfg(test)]
#[allow(
    clippy::unwrap_used,
    clippy::expect_used,
    reason = "tests use unwrap to panic on unexpected state"
)]
mod tests;
