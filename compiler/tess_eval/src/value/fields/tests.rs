use super::*;
use crate::errors::EvalErrorKind;
use crate::geometry::regular_polygon;
use crate::primitives::{make_patch, make_tile};
use crate::value::Slot;
use tess_graph::Gc;

fn field(heap: &mut GcHeap, value: &Value, name: &str) -> Value {
    get_field(heap, value, &Name::new(name)).unwrap()
}

fn number(value: &Value) -> f64 {
    value.as_number().unwrap().to_f64()
}

fn square(heap: &mut GcHeap) -> Value {
    Value::Tile(make_tile(heap, &regular_polygon(4)).unwrap())
}

// Tiles

#[test]
fn tile_sides_and_vertices() {
    let mut heap = GcHeap::new();
    let tile = square(&mut heap);
    assert_eq!(number(&field(&mut heap, &tile, "sides")), 4.0);

    let vertices = field(&mut heap, &tile, "vertices");
    let size = field(&mut heap, &vertices, "size");
    assert_eq!(number(&size), 4.0);
}

#[test]
fn tile_centroid_is_a_point() {
    let mut heap = GcHeap::new();
    let tile = square(&mut heap);
    let center = field(&mut heap, &tile, "centroid");
    let x = field(&mut heap, &center, "0");
    let y = field(&mut heap, &center, "1");
    assert!((number(&x) - 0.5).abs() < 1e-9);
    assert!((number(&y) - 0.5).abs() < 1e-9);
}

#[test]
fn loose_tile_has_no_patch() {
    let mut heap = GcHeap::new();
    let tile = square(&mut heap);
    assert_eq!(field(&mut heap, &tile, "patch"), Value::Nil);
}

// Vertices and edges

#[test]
fn vertex_knows_its_tile() {
    let mut heap = GcHeap::new();
    let tile = square(&mut heap);
    let vertices = field(&mut heap, &tile, "vertices");
    let second = field(&mut heap, &vertices, "1");

    assert!((number(&field(&mut heap, &second, "x")) - 1.0).abs() < 1e-9);
    assert_eq!(number(&field(&mut heap, &second, "index")), 1.0);
    assert_eq!(field(&mut heap, &second, "tile"), tile);
}

#[test]
fn edge_endpoints_wrap_around() {
    let mut heap = GcHeap::new();
    let tile = square(&mut heap);
    let edges = field(&mut heap, &tile, "edges");
    let last = field(&mut heap, &edges, "3");

    let start = field(&mut heap, &last, "start");
    let end = field(&mut heap, &last, "end");
    assert_eq!(number(&field(&mut heap, &start, "index")), 3.0);
    assert_eq!(number(&field(&mut heap, &end, "index")), 0.0);
    assert!((number(&field(&mut heap, &last, "length")) - 1.0).abs() < 1e-9);
}

// Patches

#[test]
fn patch_tiles_point_back_at_the_patch() {
    let mut heap = GcHeap::new();
    let tile = make_tile(&mut heap, &regular_polygon(3)).unwrap();
    let patch = Value::Patch(make_patch(&mut heap, &[tile]).unwrap());

    let tiles = field(&mut heap, &patch, "tiles");
    let first = field(&mut heap, &tiles, "0");
    assert_eq!(field(&mut heap, &first, "patch"), patch);
    let locations = field(&mut heap, &patch, "locations");
    assert_eq!(number(&field(&mut heap, &locations, "size")), 3.0);
}

// User fields

#[test]
fn user_fields_shadow_builtins() {
    let mut heap = GcHeap::new();
    let tile: Gc<Tile> = heap.allocate_blank().unwrap();
    heap.update(&tile, |t| {
        t.fields.insert(Name::new("sides"), Slot::Number(Number::new(9.0)));
    })
    .unwrap();
    let tile = Value::Tile(tile.freeze());
    assert_eq!(number(&field(&mut heap, &tile, "sides")), 9.0);
}

#[test]
fn lambda_arity() {
    let mut heap = GcHeap::new();
    let lambda = heap
        .allocate_and_freeze(Lambda {
            params: vec![Name::new("a"), Name::new("b")],
            ..Lambda::default()
        })
        .unwrap();
    let lambda = Value::Lambda(lambda);
    assert_eq!(number(&field(&mut heap, &lambda, "arity")), 2.0);
}

// Errors

#[test]
fn unknown_fields_are_errors() {
    let mut heap = GcHeap::new();
    let tile = square(&mut heap);
    let err = get_field(&mut heap, &tile, &Name::new("colour")).unwrap_err();
    assert_eq!(
        err.kind,
        EvalErrorKind::UndefinedField {
            field: Name::new("colour"),
            type_name: "tile"
        }
    );

    let cluster = make_cluster(&mut heap, vec![Value::Nil]).unwrap();
    assert!(get_field(&mut heap, &cluster, &Name::new("5")).is_err());
    assert!(get_field(&mut heap, &Value::from(1.0), &Name::new("x")).is_err());
}
