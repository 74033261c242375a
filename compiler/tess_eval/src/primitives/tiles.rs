//! Tile and patch construction.

use rustc_hash::FxHashMap;
use tess_graph::{Gc, GcHeap, GraphPool, Root};
use tracing::trace;

use crate::errors::{invalid_geometry, type_mismatch, EvalError};
use crate::geometry::{location_key, Point};
use crate::value::{clone_for_update, tile_points, Edge, Patch, Slot, Tile, Value, Vertex};

/// Build a tile from its vertex positions, in order.
///
/// Every vertex and edge points back at the tile, so the three are allocated
/// together and the tile is frozen only once its children exist.
pub fn make_tile(heap: &mut GcHeap, points: &[Point]) -> Result<Root<Tile>, EvalError> {
    if points.len() < 3 {
        return Err(invalid_geometry(format!(
            "a tile needs at least 3 vertices, got {}",
            points.len()
        )));
    }
    if let Some(p) = points.iter().find(|p| !p.is_finite()) {
        return Err(invalid_geometry(format!(
            "vertex ({}, {}) is not finite",
            p.x, p.y
        )));
    }

    let tile: Gc<Tile> = heap.allocate_blank()?;
    let mut vertices = Vec::with_capacity(points.len());
    for (index, &position) in points.iter().enumerate() {
        vertices.push(heap.allocate_and_freeze(Vertex {
            tile: Some(tile.view()),
            position,
            index,
            ..Vertex::default()
        })?);
    }
    let mut edges = Vec::with_capacity(points.len());
    for index in 0..points.len() {
        edges.push(heap.allocate_and_freeze(Edge {
            tile: Some(tile.view()),
            index,
            ..Edge::default()
        })?);
    }

    heap.update(&tile, |t| {
        t.vertices = vertices.iter().map(Root::handle).collect();
        t.edges = edges.iter().map(Root::handle).collect();
    })?;
    trace!(tile = %tile.id(), sides = points.len(), "tile built");
    Ok(tile.freeze())
}

/// Compose tiles into a patch.
///
/// Each tile is copied and the copy's parent set to the new patch; the
/// inputs are left untouched. Vertices whose positions agree to within
/// [`LOCATION_EPSILON`](crate::geometry::LOCATION_EPSILON) share a location.
pub fn make_patch(heap: &mut GcHeap, tiles: &[Root<Tile>]) -> Result<Root<Patch>, EvalError> {
    let patch: Gc<Patch> = heap.allocate_blank()?;
    let mut placed = Vec::with_capacity(tiles.len());
    let mut table = LocationTable::default();
    let mut tile_locations = Vec::with_capacity(tiles.len());

    for tile in tiles {
        let copy = clone_for_update::<Tile>(heap, tile.handle())?;
        heap.update(&copy, |t| t.parent = Some(patch.view()))?;
        let points = placed_points(heap, &copy)?;
        tile_locations.push(points.into_iter().map(|p| table.intern(p)).collect());
        placed.push(copy.freeze());
    }

    let LocationTable { locations, .. } = table;
    trace!(
        patch = %patch.id(),
        tiles = placed.len(),
        locations = locations.len(),
        "patch built"
    );
    heap.update(&patch, |p| {
        p.tiles = placed.iter().map(Root::handle).collect();
        p.locations = locations;
        p.tile_locations = tile_locations;
    })?;
    Ok(patch.freeze())
}

fn placed_points(pool: &GraphPool, tile: &Gc<Tile>) -> Result<Vec<Point>, EvalError> {
    Ok(tile_points(pool, pool.get(tile.view())?)?)
}

#[derive(Default)]
struct LocationTable {
    locations: Vec<Point>,
    index: FxHashMap<(i64, i64), usize>,
}

impl LocationTable {
    /// Index of the location at `p`, adding it if new.
    fn intern(&mut self, p: Point) -> usize {
        let next = self.locations.len();
        let slot = *self.index.entry(location_key(p)).or_insert(next);
        if slot == next {
            self.locations.push(p);
        }
        slot
    }
}

/// Read a cluster of `[x, y]` clusters as points.
pub(super) fn points_of(heap: &GcHeap, value: &Value) -> Result<Vec<Point>, EvalError> {
    let outer = heap.get(value.as_cluster()?.handle())?;
    let mut points = Vec::with_capacity(outer.items.len());
    for slot in &outer.items {
        let pair = Value::load(heap, slot)?;
        let pair = heap.get(pair.as_cluster()?.handle())?;
        let [x, y] = pair.items.as_slice() else {
            return Err(invalid_geometry(format!(
                "a point needs 2 coordinates, got {}",
                pair.items.len()
            )));
        };
        points.push(Point::new(coordinate(heap, x)?, coordinate(heap, y)?));
    }
    Ok(points)
}

fn coordinate(heap: &GcHeap, slot: &Slot) -> Result<f64, EvalError> {
    match Value::load(heap, slot)? {
        Value::Number(n) => Ok(n.to_f64()),
        other => Err(type_mismatch("number", other.type_name())),
    }
}
