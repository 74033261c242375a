use super::*;
use crate::errors::EvalErrorKind;
use tess_graph::GcHeap;

fn cluster_of(heap: &mut GcHeap, items: Vec<Value>) -> Value {
    make_cluster(heap, items).unwrap()
}

// Slots

#[test]
fn scalars_round_trip_through_slots() {
    let pool = GraphPool::new();
    for value in [
        Value::Nil,
        Value::from(2.5),
        Value::from(true),
        Value::string("hi"),
    ] {
        let slot = value.to_slot().unwrap();
        assert_eq!(Value::load(&pool, &slot).unwrap(), value);
    }
}

#[test]
fn loading_a_handle_roots_it_again() {
    let mut heap = GcHeap::new();
    let cluster = cluster_of(&mut heap, vec![Value::from(1.0)]);
    let id = cluster.node_id().unwrap();
    let slot = cluster.to_slot().unwrap();

    let loaded = Value::load(&heap, &slot).unwrap();
    assert_eq!(heap.root_count(id), 2);
    assert_eq!(loaded, cluster);
}

#[test]
fn field_refs_have_no_slot() {
    let value = Value::FieldRef(FieldRef {
        binding: Name::new("t"),
        field: Name::new("color"),
    });
    let err = value.to_slot().unwrap_err();
    assert_eq!(err.kind, EvalErrorKind::CannotCloneFieldRef);
}

// Classification

#[test]
fn only_handles_are_objects() {
    let mut heap = GcHeap::new();
    let cluster = cluster_of(&mut heap, Vec::new());
    assert!(cluster.is_object());
    assert!(!Value::from(1.0).is_object());
    assert!(!Value::string("x").is_object());
    assert_eq!(Value::Nil.node_id(), None);
}

#[test]
fn type_names() {
    assert_eq!(Value::Nil.type_name(), "nil");
    assert_eq!(Value::from(false).type_name(), "bool");
    assert_eq!(Value::string("s").type_name(), "string");
    assert_eq!(Slot::Number(Number::ONE).type_name(), "number");
}

#[test]
fn coercions_report_the_actual_type() {
    let err = Value::string("s").as_number().unwrap_err();
    assert_eq!(
        err.kind,
        EvalErrorKind::TypeMismatch {
            expected: "number",
            got: "string"
        }
    );
    assert!(Value::from(1.0).as_bool().is_err());
    assert!(Value::Nil.as_cluster().is_err());
    assert!(Value::Nil.as_tile().is_err());
}

// Reachability

#[test]
fn nested_values_survive_collection_through_their_parent() {
    let mut heap = GcHeap::new();
    let inner = cluster_of(&mut heap, vec![Value::from(7.0)]);
    let inner_id = inner.node_id().unwrap();
    let outer = cluster_of(&mut heap, vec![inner]);

    heap.collect().unwrap();
    assert!(heap.contains(inner_id));

    drop(outer);
    heap.collect().unwrap();
    assert!(!heap.contains(inner_id));
}
