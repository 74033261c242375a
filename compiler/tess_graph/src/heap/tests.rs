use super::*;
use crate::{NodeId, Pointers};

#[derive(Default)]
struct Blob {
    next: Option<NodeId>,
}

impl Node for Blob {
    fn internal_pointers(&self, out: &mut Pointers) {
        out.extend(self.next);
    }
}

#[test]
fn allocation_past_cadence_triggers_collection() {
    let mut heap = GcHeap::with_config(GcConfig::default().with_collect_every(3));
    let garbage: Vec<NodeId> = (0..4)
        .map(|_| heap.allocate_blank::<Blob>().unwrap().id())
        .collect();
    assert_eq!(heap.stats().collections, 0);
    assert_eq!(heap.len(), 4);

    let kept = heap.allocate_mutable(Blob::default()).unwrap();
    assert_eq!(heap.stats().collections, 1);
    for id in garbage {
        assert!(!heap.contains(id));
    }
    assert!(heap.contains(kept.id()));
}

#[test]
fn building_node_survives_collection_triggered_by_its_children() {
    let mut heap = GcHeap::with_config(GcConfig::default().with_collect_every(0));
    let parent = heap.allocate_blank::<Blob>().unwrap();
    let child = heap.allocate_blank::<Blob>().unwrap();
    let child_id = child.id();
    heap.update(&parent, |blob| blob.next = Some(child_id)).unwrap();
    drop(child);

    // Forces a collection: the parent is rooted by its Gc handle and keeps
    // the child reachable.
    let _ = heap.allocate_blank::<Blob>().unwrap();
    assert!(heap.contains(parent.id()));
    assert!(heap.contains(child_id));
}

#[test]
fn freeze_is_a_view_change() {
    let mut heap = GcHeap::new();
    let root = heap.allocate_and_freeze(Blob::default()).unwrap();
    assert_eq!(heap.stats().allocations, 1);
    assert_eq!(heap.len(), 1);
    assert!(heap.get(root.handle()).is_ok());
}

#[test]
fn explicit_collect_resets_cadence() {
    let mut heap = GcHeap::with_config(GcConfig::default().with_collect_every(2));
    let _ = heap.allocate_blank::<Blob>().unwrap();
    let _ = heap.allocate_blank::<Blob>().unwrap();
    let stats = heap.collect().unwrap();
    assert_eq!(stats.swept, 2);

    let _ = heap.allocate_blank::<Blob>().unwrap();
    let _ = heap.allocate_blank::<Blob>().unwrap();
    assert_eq!(heap.stats().collections, 1);
    assert_eq!(heap.stats().swept, 2);
}
