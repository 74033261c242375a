//! Handles into the graph pool.
//!
//! Three views over the same node address:
//!
//! - [`Gc<T>`]: the build-time mutable handle. Unique (not `Clone`) and
//!   rooted for as long as it exists, so a node under construction survives
//!   any collection triggered by allocating its children.
//! - [`Frozen<T>`]: a plain read-only address. `Copy`, never keeps anything
//!   alive. Nodes store these for their internal pointers.
//! - [`Root<T>`]: a read-only address plus a root pointer. Cloning bumps the
//!   root count, dropping releases it.
//!
//! Freezing (`Gc::freeze`) is a view change: the address is unchanged and the
//! root moves from the mutable handle into the returned `Root`. Nothing turns
//! a `Frozen` or `Root` back into a `Gc`; modifying a published node means
//! cloning it.

use std::cell::RefCell;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::marker::PhantomData;
use std::rc::Rc;

use rustc_hash::FxHashMap;

use crate::NodeId;

// Root table

/// Shared `(node -> root count)` map.
///
/// Shared between the pool (which reads it during collection) and every
/// outstanding [`RootGuard`] (which updates it on clone/drop). Single-threaded
/// by construction: the interpreter owns one pool per run.
#[derive(Clone, Default)]
pub(crate) struct RootTable(Rc<RefCell<FxHashMap<NodeId, usize>>>);

impl RootTable {
    /// Take a new root pointer to `id`.
    pub(crate) fn acquire(&self, id: NodeId) -> RootGuard {
        *self.0.borrow_mut().entry(id).or_insert(0) += 1;
        RootGuard {
            id,
            table: self.clone(),
        }
    }

    fn release(&self, id: NodeId) {
        let mut counts = self.0.borrow_mut();
        if let Some(count) = counts.get_mut(&id) {
            *count = count.saturating_sub(1);
            if *count == 0 {
                counts.remove(&id);
            }
        }
    }

    /// Current root count of `id` (zero when absent).
    pub(crate) fn count(&self, id: NodeId) -> usize {
        self.0.borrow().get(&id).copied().unwrap_or(0)
    }

    /// Every address with a positive root count.
    pub(crate) fn live(&self) -> Vec<NodeId> {
        self.0
            .borrow()
            .iter()
            .filter(|(_, &count)| count > 0)
            .map(|(&id, _)| id)
            .collect()
    }

    /// Number of distinct rooted addresses.
    pub(crate) fn len(&self) -> usize {
        self.0.borrow().len()
    }
}

// RootGuard

/// Untyped root pointer.
///
/// Keeps one node alive regardless of graph reachability. Used directly by
/// callers that pin a batch of heterogeneous nodes (e.g. every clone made by
/// one deep-clone pass).
pub struct RootGuard {
    id: NodeId,
    table: RootTable,
}

impl RootGuard {
    /// Address this guard keeps alive.
    #[inline]
    pub fn id(&self) -> NodeId {
        self.id
    }
}

impl Clone for RootGuard {
    fn clone(&self) -> Self {
        self.table.acquire(self.id)
    }
}

impl Drop for RootGuard {
    fn drop(&mut self) {
        self.table.release(self.id);
    }
}

impl fmt::Debug for RootGuard {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "RootGuard({})", self.id)
    }
}

// Frozen

/// Read-only node address. Does not keep the node alive.
pub struct Frozen<T> {
    id: NodeId,
    _marker: PhantomData<fn() -> T>,
}

impl<T> Frozen<T> {
    #[inline]
    pub(crate) fn new(id: NodeId) -> Self {
        Frozen {
            id,
            _marker: PhantomData,
        }
    }

    /// Allocation identity of the node.
    #[inline]
    pub fn id(self) -> NodeId {
        self.id
    }
}

impl<T> Clone for Frozen<T> {
    #[inline]
    fn clone(&self) -> Self {
        *self
    }
}

impl<T> Copy for Frozen<T> {}

impl<T> PartialEq for Frozen<T> {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl<T> Eq for Frozen<T> {}

impl<T> Hash for Frozen<T> {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

impl<T> fmt::Debug for Frozen<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Frozen({})", self.id)
    }
}

// Root

/// Read-only node address that keeps the node alive.
pub struct Root<T> {
    guard: RootGuard,
    _marker: PhantomData<fn() -> T>,
}

impl<T> Root<T> {
    #[inline]
    pub(crate) fn from_guard(guard: RootGuard) -> Self {
        Root {
            guard,
            _marker: PhantomData,
        }
    }

    /// Allocation identity of the node.
    #[inline]
    pub fn id(&self) -> NodeId {
        self.guard.id
    }

    /// The unrooted read-only address, for storing inside another node.
    #[inline]
    pub fn handle(&self) -> Frozen<T> {
        Frozen::new(self.guard.id)
    }

    /// Drop the type, keeping the root.
    #[inline]
    pub fn into_guard(self) -> RootGuard {
        self.guard
    }
}

impl<T> Clone for Root<T> {
    fn clone(&self) -> Self {
        Root::from_guard(self.guard.clone())
    }
}

impl<T> PartialEq for Root<T> {
    fn eq(&self, other: &Self) -> bool {
        self.guard.id == other.guard.id
    }
}

impl<T> Eq for Root<T> {}

impl<T> fmt::Debug for Root<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Root({})", self.guard.id)
    }
}

// Gc

/// Mutable build handle.
///
/// Only a `Gc<T>` can be passed to [`GraphPool::update`](crate::GraphPool::update).
/// Published values hold [`Root`]s instead.
pub struct Gc<T> {
    guard: RootGuard,
    _marker: PhantomData<fn() -> T>,
}

impl<T> Gc<T> {
    #[inline]
    pub(crate) fn from_guard(guard: RootGuard) -> Self {
        Gc {
            guard,
            _marker: PhantomData,
        }
    }

    /// Allocation identity of the node.
    #[inline]
    pub fn id(&self) -> NodeId {
        self.guard.id
    }

    /// Read-only address of the node being built.
    ///
    /// Lets a parent hand its own address to children (e.g. a vertex's
    /// back-pointer to its tile) while it is still being assembled.
    #[inline]
    pub fn view(&self) -> Frozen<T> {
        Frozen::new(self.guard.id)
    }

    /// Publish the node as read-only. Same address, no copy.
    #[inline]
    pub fn freeze(self) -> Root<T> {
        Root::from_guard(self.guard)
    }

    /// Give up mutable access, keeping only an untyped root.
    #[inline]
    pub fn into_guard(self) -> RootGuard {
        self.guard
    }
}

impl<T> fmt::Debug for Gc<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Gc({})", self.guard.id)
    }
}

#[cfg(test)]
#[allow(
    clippy::unwrap_used,
    clippy::expect_used,
    reason = "tests use unwrap to panic on unexpected state"
)]
mod tests;
