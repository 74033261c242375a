use crate::{GraphPool, Node, Pointers};

struct Leaf;

impl Node for Leaf {
    fn internal_pointers(&self, _out: &mut Pointers) {}
}

#[test]
fn gc_handle_roots_node_while_building() {
    let mut pool = GraphPool::new();
    let gc = pool.allocate(Leaf);
    assert_eq!(pool.root_count(gc.id()), 1);
}

#[test]
fn freeze_keeps_address_and_root() {
    let mut pool = GraphPool::new();
    let gc = pool.allocate(Leaf);
    let id = gc.id();
    let view = gc.view();

    let root = gc.freeze();
    assert_eq!(root.id(), id);
    assert_eq!(root.handle(), view);
    assert_eq!(pool.root_count(id), 1);
}

#[test]
fn root_clone_and_drop_adjust_count() {
    let mut pool = GraphPool::new();
    let root = pool.allocate(Leaf).freeze();
    let id = root.id();

    let second = root.clone();
    assert_eq!(pool.root_count(id), 2);

    drop(second);
    assert_eq!(pool.root_count(id), 1);

    drop(root);
    assert_eq!(pool.root_count(id), 0);
}

#[test]
fn frozen_handles_compare_by_address() {
    let mut pool = GraphPool::new();
    let a = pool.allocate(Leaf).freeze();
    let b = pool.allocate(Leaf).freeze();

    let a_copy = a.handle();
    assert_eq!(a.handle(), a_copy);
    assert_ne!(a.handle(), b.handle());
}

#[test]
fn guard_outlives_type() {
    let mut pool = GraphPool::new();
    let gc = pool.allocate(Leaf);
    let id = gc.id();

    let guard = gc.into_guard();
    assert_eq!(guard.id(), id);
    assert_eq!(pool.root_count(id), 1);
    drop(guard);
    assert_eq!(pool.root_count(id), 0);
}
