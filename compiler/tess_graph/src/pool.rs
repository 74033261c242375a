//! Graph pool: typed node storage, internal-pointer edges, root counts.
//!
//! Nodes of each type live in their own pool, keyed by `TypeId`. A node never
//! moves between pools and its address (its [`NodeId`]) is stable for its
//! whole lifetime.
//!
//! Internal pointers are a multiset of `(owner, target)` edges in the
//! adjacency table. They are not reference counts: they only matter as edges
//! during the reachability walk. Root pointers are counted separately (see
//! [`RootTable`](crate::handle)).

use std::any::{Any, TypeId};
use std::fmt;

use rustc_hash::{FxHashMap, FxHashSet};

use crate::handle::{Frozen, Gc, Root, RootTable};
use crate::{GraphError, Node, NodeId, Pointers};

/// Outcome of one collection.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct CollectStats {
    /// Distinct rooted addresses the walk started from.
    pub roots: usize,
    /// Nodes that survived.
    pub retained: usize,
    /// Nodes removed from their pools.
    pub swept: usize,
    /// Distinct edges dropped along with their owners.
    pub edges_pruned: usize,
}

// Typed pools

/// Type-erased view of one node pool, so the collector can sweep every pool
/// without knowing what it stores.
trait ErasedPool {
    fn sweep(&mut self, retained: &FxHashSet<NodeId>) -> usize;
    fn len(&self) -> usize;
    fn type_name(&self) -> &'static str;
    fn as_any(&self) -> &dyn Any;
    fn as_any_mut(&mut self) -> &mut dyn Any;
}

struct TypedPool<T> {
    nodes: FxHashMap<NodeId, T>,
}

impl<T> TypedPool<T> {
    fn new() -> Self {
        TypedPool {
            nodes: FxHashMap::default(),
        }
    }
}

impl<T: Node> ErasedPool for TypedPool<T> {
    fn sweep(&mut self, retained: &FxHashSet<NodeId>) -> usize {
        let before = self.nodes.len();
        self.nodes.retain(|id, _| retained.contains(id));
        before - self.nodes.len()
    }

    fn len(&self) -> usize {
        self.nodes.len()
    }

    fn type_name(&self) -> &'static str {
        short_type_name::<T>()
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

/// Last path segment of a type name, for error messages.
fn short_type_name<T>() -> &'static str {
    let full = std::any::type_name::<T>();
    full.rsplit("::").next().unwrap_or(full)
}

// Adjacency helpers

type Adjacency = FxHashMap<NodeId, FxHashMap<NodeId, u32>>;

fn add_edge(adjacency: &mut Adjacency, owner: NodeId, target: NodeId) {
    if let Some(edges) = adjacency.get_mut(&owner) {
        *edges.entry(target).or_insert(0) += 1;
    }
}

fn remove_edge(adjacency: &mut Adjacency, owner: NodeId, target: NodeId) {
    let Some(edges) = adjacency.get_mut(&owner) else {
        return;
    };
    match edges.get_mut(&target) {
        Some(count) if *count > 1 => *count -= 1,
        Some(_) => {
            edges.remove(&target);
        }
        None => {}
    }
}

// GraphPool

/// Heterogeneous node storage with reachability-based collection.
pub struct GraphPool {
    pools: FxHashMap<TypeId, Box<dyn ErasedPool>>,
    /// Every live node has an entry, even with no outgoing edges.
    adjacency: Adjacency,
    roots: RootTable,
    next_id: u64,
}

impl GraphPool {
    /// Create an empty pool.
    pub fn new() -> Self {
        GraphPool {
            pools: FxHashMap::default(),
            adjacency: FxHashMap::default(),
            roots: RootTable::default(),
            next_id: 1,
        }
    }

    fn typed<T: Node>(&self) -> Option<&TypedPool<T>> {
        self.pools
            .get(&TypeId::of::<T>())
            .and_then(|pool| pool.as_any().downcast_ref::<TypedPool<T>>())
    }

    /// Diagnose a failed typed lookup.
    fn missing<T: Node>(&self, id: NodeId) -> GraphError {
        if self.adjacency.contains_key(&id) {
            GraphError::TypeMismatch {
                node: id,
                expected: short_type_name::<T>(),
            }
        } else {
            GraphError::DanglingHandle { node: id }
        }
    }

    fn contains_typed<T: Node>(&self, id: NodeId) -> bool {
        self.typed::<T>().is_some_and(|pool| pool.nodes.contains_key(&id))
    }

    // Allocation and access

    /// Allocate a node and return its (rooted) mutable handle.
    ///
    /// The node's initial internal pointers are registered immediately.
    pub fn allocate<T: Node>(&mut self, node: T) -> Gc<T> {
        let id = NodeId(self.next_id);
        self.next_id += 1;

        let mut pointers = Pointers::new();
        node.internal_pointers(&mut pointers);
        self.adjacency.insert(id, FxHashMap::default());
        for target in pointers {
            add_edge(&mut self.adjacency, id, target);
        }

        let pool = self
            .pools
            .entry(TypeId::of::<T>())
            .or_insert_with(|| Box::new(TypedPool::<T>::new()));
        match pool.as_any_mut().downcast_mut::<TypedPool<T>>() {
            Some(pool) => {
                pool.nodes.insert(id, node);
            }
            None => unreachable!("pools are keyed by their element TypeId"),
        }

        Gc::from_guard(self.roots.acquire(id))
    }

    /// Read a node.
    pub fn get<T: Node>(&self, handle: Frozen<T>) -> Result<&T, GraphError> {
        let id = handle.id();
        self.typed::<T>()
            .and_then(|pool| pool.nodes.get(&id))
            .ok_or_else(|| self.missing::<T>(id))
    }

    /// Mutate a node under construction.
    ///
    /// Internal pointers are diffed around `f`: pointers the node no longer
    /// reports are deregistered, new ones are registered.
    pub fn update<T: Node, R>(
        &mut self,
        handle: &Gc<T>,
        f: impl FnOnce(&mut T) -> R,
    ) -> Result<R, GraphError> {
        let id = handle.id();
        let node = self
            .pools
            .get_mut(&TypeId::of::<T>())
            .and_then(|pool| pool.as_any_mut().downcast_mut::<TypedPool<T>>())
            .and_then(|pool| pool.nodes.get_mut(&id));
        let Some(node) = node else {
            return Err(self.missing::<T>(id));
        };

        let mut before = Pointers::new();
        node.internal_pointers(&mut before);
        let result = f(node);
        let mut after = Pointers::new();
        node.internal_pointers(&mut after);

        if before != after {
            for target in before {
                remove_edge(&mut self.adjacency, id, target);
            }
            for target in after {
                add_edge(&mut self.adjacency, id, target);
            }
        }
        Ok(result)
    }

    /// Typed read-only address for a raw id.
    pub fn frozen<T: Node>(&self, id: NodeId) -> Result<Frozen<T>, GraphError> {
        if self.contains_typed::<T>(id) {
            Ok(Frozen::new(id))
        } else {
            Err(self.missing::<T>(id))
        }
    }

    /// Take a root pointer to a live node.
    pub fn root<T: Node>(&self, handle: Frozen<T>) -> Result<Root<T>, GraphError> {
        let id = handle.id();
        if self.contains_typed::<T>(id) {
            Ok(Root::from_guard(self.roots.acquire(id)))
        } else {
            Err(self.missing::<T>(id))
        }
    }

    // Internal pointers

    /// Register an internal pointer `owner -> target`.
    ///
    /// `owner == target` is a self pointer; it is an ordinary edge and never
    /// makes the node count twice.
    pub fn link(&mut self, owner: NodeId, target: NodeId) -> Result<(), GraphError> {
        for id in [owner, target] {
            if !self.adjacency.contains_key(&id) {
                return Err(GraphError::DanglingHandle { node: id });
            }
        }
        add_edge(&mut self.adjacency, owner, target);
        Ok(())
    }

    /// Distinct targets of `owner`'s internal pointers.
    pub fn edges_of(&self, owner: NodeId) -> Result<Vec<NodeId>, GraphError> {
        let edges = self
            .adjacency
            .get(&owner)
            .ok_or(GraphError::DanglingHandle { node: owner })?;
        let mut targets: Vec<NodeId> = edges.keys().copied().collect();
        targets.sort_unstable();
        Ok(targets)
    }

    // Introspection

    /// Current root count of a node.
    pub fn root_count(&self, id: NodeId) -> usize {
        self.roots.count(id)
    }

    /// Whether a node with this id is live.
    pub fn contains(&self, id: NodeId) -> bool {
        self.adjacency.contains_key(&id)
    }

    /// Total number of live nodes across all pools.
    pub fn len(&self) -> usize {
        self.adjacency.len()
    }

    /// Check if no nodes are live.
    pub fn is_empty(&self) -> bool {
        self.adjacency.is_empty()
    }

    // Collection

    /// Keep exactly the nodes reachable from the root set.
    ///
    /// Iterative worklist walk (chains of internal pointers can be much
    /// deeper than the host stack), then a sweep of every typed pool and of
    /// the adjacency entries owned by pruned nodes. O(nodes + edges).
    ///
    /// A reachable node without an adjacency entry aborts the collection
    /// before anything is swept.
    pub fn collect(&mut self) -> Result<CollectStats, GraphError> {
        let roots = self.roots.live();
        let mut retained: FxHashSet<NodeId> = FxHashSet::default();
        retained.reserve(self.adjacency.len());

        let mut worklist = roots.clone();
        while let Some(id) = worklist.pop() {
            if !retained.insert(id) {
                continue;
            }
            let edges = self
                .adjacency
                .get(&id)
                .ok_or(GraphError::CorruptAdjacency { node: id })?;
            worklist.extend(edges.keys().copied().filter(|t| !retained.contains(t)));
        }

        let mut swept = 0;
        for pool in self.pools.values_mut() {
            swept += pool.sweep(&retained);
        }

        let mut edges_pruned = 0;
        self.adjacency.retain(|id, edges| {
            let keep = retained.contains(id);
            if !keep {
                edges_pruned += edges.len();
            }
            keep
        });

        let stats = CollectStats {
            roots: roots.len(),
            retained: retained.len(),
            swept,
            edges_pruned,
        };
        tracing::debug!(
            roots = stats.roots,
            retained = stats.retained,
            swept = stats.swept,
            edges_pruned = stats.edges_pruned,
            "graph collection complete"
        );
        Ok(stats)
    }
}

impl Default for GraphPool {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for GraphPool {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut pools: Vec<(&'static str, usize)> = self
            .pools
            .values()
            .map(|pool| (pool.type_name(), pool.len()))
            .collect();
        pools.sort_unstable();
        f.debug_struct("GraphPool")
            .field("nodes", &self.adjacency.len())
            .field("rooted", &self.roots.len())
            .field("pools", &pools)
            .finish()
    }
}

#[cfg(test)]
#[allow(
    clippy::unwrap_used,
    clippy::expect_used,
    reason = "tests use unwrap to panic on unexpected state"
)]
