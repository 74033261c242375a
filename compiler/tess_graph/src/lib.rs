//! Tess Graph - cycle-aware graph memory for the Tessera interpreter.
//!
//! This crate provides:
//! - [`GraphPool`]: heterogeneous per-type node pools, an adjacency side table
//!   of internal pointers, and a root-count table. `collect()` keeps exactly
//!   the nodes reachable from the roots.
//! - [`GcHeap`]: the policy layer that decides *when* to collect (allocation
//!   cadence) and exposes the typed allocation entry points.
//! - Handles: [`Gc`] (mutable, under construction), [`Frozen`] (read-only
//!   address) and [`Root`] (read-only, keeps the node alive).
//!
//! # Design
//!
//! Nodes are addressed by integer [`NodeId`]s, never by pointer. Internal
//! pointers are edges in a side table and never keep a node alive on their
//! own; roots are counted in a separate map. This means cycles (a tile
//! pointing at its patch pointing back at the tile, a lambda capturing
//! itself) are reclaimed as soon as no root reaches them.
//!
//! Collection knows nothing about domain types: it walks addresses only.
//! The [`Node`] trait is consulted when a node is allocated or updated, to
//! keep the side table in sync, and never during collection.

mod handle;
mod heap;
mod pool;

use std::fmt;

use smallvec::SmallVec;

pub use handle::{Frozen, Gc, Root, RootGuard};
pub use heap::{GcConfig, GcHeap, GcStats};
pub use pool::{CollectStats, GraphPool};

/// Unique allocation identity.
///
/// Ids are handed out monotonically and never reused, so an id also serves
/// as a stable identity key (for clone identity maps and memo keys) even
/// after the node has been collected.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(u64);

impl NodeId {
    /// Raw numeric value.
    #[inline]
    pub fn raw(self) -> u64 {
        self.0
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Buffer for reporting internal pointers.
///
/// Inline capacity covers the common case (a vertex or edge has one or two
/// pointers) without touching the allocator.
pub type Pointers = SmallVec<[NodeId; 8]>;

/// A type that can live in the graph pool.
///
/// Implementors report every internal pointer they hold. The pool uses this
/// to register edges when the node is allocated and to diff edges when the
/// node is updated through [`GraphPool::update`]. Reporting the same target
/// twice records two internal pointers to it.
pub trait Node: 'static {
    /// Push the address of every node this node points at.
    fn internal_pointers(&self, out: &mut Pointers);
}

/// Pointer bookkeeping failure.
///
/// All of these indicate a bug in the caller or in the pool itself, not a
/// malformed script; callers should abort the current run.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum GraphError {
    /// A node is live but has no adjacency entry.
    CorruptAdjacency { node: NodeId },
    /// Access through a handle whose node was already collected.
    DanglingHandle { node: NodeId },
    /// Typed access to a node that lives in a different pool.
    TypeMismatch {
        node: NodeId,
        expected: &'static str,
    },
}

impl fmt::Display for GraphError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GraphError::CorruptAdjacency { node } => {
                write!(f, "corrupt graph: node {node} has no adjacency entry")
            }
            GraphError::DanglingHandle { node } => {
                write!(f, "dangling handle: node {node} was collected")
            }
            GraphError::TypeMismatch { node, expected } => {
                write!(f, "node {node} is not a {expected}")
            }
        }
    }
}

impl std::error::Error for GraphError {}
