//! Deep copy with identity preservation.
//!
//! One [`Cloner`] threads an identity map (`original id -> clone id`)
//! through a whole copy. A node's clone is registered before its children
//! are visited, so shared nodes are copied once and cycles close onto the
//! clone instead of recursing forever.
//!
//! Each node is copied in three steps: allocate a blank target, snapshot the
//! original and remap the snapshot's handles ([`Object::clone_with`]), then
//! write the snapshot into the target. Every clone stays pinned by the
//! `Cloner` until it is dropped, so a collection triggered by a later
//! allocation in the same copy cannot sweep a half-linked clone.

use rustc_hash::FxHashMap;
use tess_graph::{Frozen, Gc, GcHeap, NodeId, RootGuard};

use super::nodes::Object;
use super::{Slot, Value};
use crate::errors::{cannot_clone_field_ref, EvalError, EvalResult};
use crate::stack::ensure_sufficient_stack;

/// State of one deep copy.
pub struct Cloner<'h> {
    heap: &'h mut GcHeap,
    copies: FxHashMap<NodeId, NodeId>,
    pins: Vec<RootGuard>,
}

impl<'h> Cloner<'h> {
    pub fn new(heap: &'h mut GcHeap) -> Self {
        Cloner {
            heap,
            copies: FxHashMap::default(),
            pins: Vec::new(),
        }
    }

    /// Number of nodes copied so far.
    pub fn copied(&self) -> usize {
        self.copies.len()
    }

    /// Copy a value. Scalars are returned as is.
    pub fn clone_value(&mut self, value: &Value) -> EvalResult {
        let slot = match value {
            Value::Nil | Value::Number(_) | Value::Str(_) | Value::Bool(_) => {
                return Ok(value.clone())
            }
            Value::FieldRef(_) => return Err(cannot_clone_field_ref()),
            other => other.to_slot()?,
        };
        let copy = self.clone_slot(&slot)?;
        Ok(Value::load(&*self.heap, &copy)?)
    }

    /// Copy a stored slot.
    pub fn clone_slot(&mut self, slot: &Slot) -> Result<Slot, EvalError> {
        Ok(match slot {
            Slot::Nil | Slot::Number(_) | Slot::Str(_) | Slot::Bool(_) => slot.clone(),
            Slot::Tile(h) => Slot::Tile(self.clone_frozen(*h)?),
            Slot::Vertex(h) => Slot::Vertex(self.clone_frozen(*h)?),
            Slot::Edge(h) => Slot::Edge(self.clone_frozen(*h)?),
            Slot::Patch(h) => Slot::Patch(self.clone_frozen(*h)?),
            Slot::Cluster(h) => Slot::Cluster(self.clone_frozen(*h)?),
            Slot::Lambda(h) => Slot::Lambda(self.clone_frozen(*h)?),
        })
    }

    /// Copy a node, reusing the clone if this copy already made one.
    pub fn clone_frozen<T: Object>(
        &mut self,
        handle: Frozen<T>,
    ) -> Result<Frozen<T>, EvalError> {
        if let Some(&id) = self.copies.get(&handle.id()) {
            return Ok(self.heap.frozen::<T>(id)?);
        }
        let copy = self.clone_node(handle)?;
        let frozen = copy.view();
        self.pins.push(copy.into_guard());
        Ok(frozen)
    }

    /// Copy a node and keep the top copy open for mutation.
    pub fn clone_for_update<T: Object>(
        &mut self,
        handle: Frozen<T>,
    ) -> Result<Gc<T>, EvalError> {
        self.clone_node(handle)
    }

    fn clone_node<T: Object>(&mut self, handle: Frozen<T>) -> Result<Gc<T>, EvalError> {
        ensure_sufficient_stack(|| -> Result<Gc<T>, EvalError> {
            let target: Gc<T> = self.heap.allocate_blank()?;
            self.copies.insert(handle.id(), target.id());

            let mut snapshot = self.heap.get(handle)?.clone();
            snapshot.clone_with(self)?;
            self.heap.update(&target, |node| *node = snapshot)?;

            tracing::trace!(
                from = %handle.id(),
                to = %target.id(),
                kind = T::TYPE_NAME,
                "cloned node"
            );
            Ok(target)
        })
    }
}

/// Deep-copy a value.
pub fn clone_value(heap: &mut GcHeap, value: &Value) -> EvalResult {
    let mut cloner = Cloner::new(heap);
    let copy = cloner.clone_value(value)?;
    tracing::trace!(nodes = cloner.copied(), "deep copy finished");
    Ok(copy)
}

/// Deep-copy a published node for modification.
///
/// Every other node made by the copy is reachable from the returned one, so
/// the copy's pins can be released on return.
pub fn clone_for_update<T: Object>(
    heap: &mut GcHeap,
    handle: Frozen<T>,
) -> Result<Gc<T>, EvalError> {
    Cloner::new(heap).clone_for_update(handle)
}

#[cfg(test)]
#[allow(
    clippy::unwrap_used,
    clippy::expect_used,
    reason = "tests use unwrap to panic on unexpected state"
)]
