//! Property tests: after `collect()`, survivors are exactly the nodes
//! reachable from the root set.

#![allow(clippy::unwrap_used, clippy::expect_used, reason = "Tests can panic")]

use std::collections::{BTreeSet, HashMap};

use proptest::prelude::*;
use tess_graph::{GcConfig, GcHeap, GraphPool, Node, NodeId, Pointers, Root};

struct Vertex;

impl Node for Vertex {
    fn internal_pointers(&self, _out: &mut Pointers) {}
}

/// A random graph: `nodes` nodes, edges as index pairs, roots as indices.
fn graph_strategy() -> impl Strategy<Value = (usize, Vec<(usize, usize)>, Vec<usize>)> {
    (1usize..40).prop_flat_map(|nodes| {
        (
            Just(nodes),
            prop::collection::vec((0..nodes, 0..nodes), 0..120),
            prop::collection::vec(0..nodes, 0..6),
        )
    })
}

/// Reference reachability, independent of the pool.
fn reachable(nodes: usize, edges: &[(usize, usize)], roots: &[usize]) -> BTreeSet<usize> {
    let mut out: HashMap<usize, Vec<usize>> = HashMap::new();
    for &(from, to) in edges {
        out.entry(from).or_default().push(to);
    }
    let mut seen = BTreeSet::new();
    let mut stack: Vec<usize> = roots.to_vec();
    while let Some(n) = stack.pop() {
        if n < nodes && seen.insert(n) {
            stack.extend(out.get(&n).into_iter().flatten().copied());
        }
    }
    seen
}

proptest! {
    #[test]
    fn survivors_are_exactly_the_reachable_set((nodes, edges, roots) in graph_strategy()) {
        let mut pool = GraphPool::new();
        let ids: Vec<NodeId> = (0..nodes).map(|_| pool.allocate(Vertex).id()).collect();
        for &(from, to) in &edges {
            pool.link(ids[from], ids[to]).unwrap();
        }
        let held: Vec<Root<Vertex>> = roots
            .iter()
            .map(|&i| pool.root(pool.frozen::<Vertex>(ids[i]).unwrap()).unwrap())
            .collect();

        let stats = pool.collect().unwrap();

        let expected = reachable(nodes, &edges, &roots);
        let survivors: BTreeSet<usize> = (0..nodes).filter(|&i| pool.contains(ids[i])).collect();
        prop_assert_eq!(&survivors, &expected);
        prop_assert_eq!(stats.retained, expected.len());
        prop_assert_eq!(stats.swept, nodes - expected.len());
        drop(held);
    }

    #[test]
    fn second_collection_is_a_fixpoint((nodes, edges, roots) in graph_strategy()) {
        let mut heap = GcHeap::with_config(GcConfig::default());
        let ids: Vec<NodeId> = (0..nodes).map(|_| heap.allocate_mutable(Vertex).unwrap().id()).collect();
        for &(from, to) in &edges {
            heap.link(ids[from], ids[to]).unwrap();
        }
        let held: Vec<Root<Vertex>> = roots
            .iter()
            .map(|&i| heap.root(heap.frozen::<Vertex>(ids[i]).unwrap()).unwrap())
            .collect();

        let first = heap.collect().unwrap();
        let second = heap.collect().unwrap();
        prop_assert_eq!(second.swept, 0);
        prop_assert_eq!(second.retained, first.retained);
        drop(held);
    }
}
