//! Field access on objects.
//!
//! User fields shadow built-in ones. Built-in fields are derived from the
//! node's structure on every read; some of them allocate (a tile's
//! `vertices` is a fresh cluster).

use tess_graph::{Frozen, GcHeap, GraphError, GraphPool, Root};

use super::nodes::{Cluster, Edge, Fields, Object, Patch, Tile, Vertex};
use super::Value;
use crate::errors::{undefined_field, EvalResult};
use crate::geometry::{centroid, distance, Point};
use crate::lambda::Lambda;
use crate::name::Name;
use crate::number::Number;

/// Allocate a frozen cluster holding `items`.
pub fn make_cluster(heap: &mut GcHeap, items: Vec<Value>) -> EvalResult {
    let slots = items
        .iter()
        .map(Value::to_slot)
        .collect::<Result<Vec<_>, _>>()?;
    let cluster = heap.allocate_and_freeze(Cluster {
        items: slots,
        fields: Fields::default(),
    })?;
    // `items` rooted the elements until the cluster's edges existed.
    drop(items);
    Ok(Value::Cluster(cluster))
}

/// Allocate an `[x, y]` cluster.
pub fn make_point(heap: &mut GcHeap, p: Point) -> EvalResult {
    make_cluster(heap, vec![Value::from(p.x), Value::from(p.y)])
}

/// Read field `name` of `value`.
pub fn get_field(heap: &mut GcHeap, value: &Value, name: &Name) -> EvalResult {
    if let Some(found) = user_field(heap, value, name)? {
        return Ok(found);
    }
    match value {
        Value::Tile(h) => tile_field(heap, h.handle(), name),
        Value::Vertex(h) => vertex_field(heap, h.handle(), name),
        Value::Edge(h) => edge_field(heap, h.handle(), name),
        Value::Patch(h) => patch_field(heap, h.handle(), name),
        Value::Cluster(h) => cluster_field(heap, h.handle(), name),
        Value::Lambda(h) => match name.as_str() {
            "arity" => Ok(Number::from(heap.get(h.handle())?.arity()).into()),
            _ => Err(undefined_field(name, Lambda::TYPE_NAME)),
        },
        other => Err(undefined_field(name, other.type_name())),
    }
}

fn user_field(pool: &GraphPool, value: &Value, name: &Name) -> Result<Option<Value>, GraphError> {
    fn lookup<T: Object>(
        pool: &GraphPool,
        h: &Root<T>,
        name: &Name,
    ) -> Result<Option<Value>, GraphError> {
        pool.get(h.handle())?
            .fields()
            .get(name)
            .map(|slot| Value::load(pool, slot))
            .transpose()
    }

    match value {
        Value::Tile(h) => lookup(pool, h, name),
        Value::Vertex(h) => lookup(pool, h, name),
        Value::Edge(h) => lookup(pool, h, name),
        Value::Patch(h) => lookup(pool, h, name),
        Value::Cluster(h) => lookup(pool, h, name),
        Value::Lambda(h) => lookup(pool, h, name),
        _ => Ok(None),
    }
}

fn root_all<T: Object>(
    pool: &GraphPool,
    handles: &[Frozen<T>],
    wrap: fn(Root<T>) -> Value,
) -> Result<Vec<Value>, GraphError> {
    handles
        .iter()
        .map(|h| pool.root(*h).map(wrap))
        .collect()
}

fn root_opt<T: Object>(
    pool: &GraphPool,
    handle: Option<Frozen<T>>,
    wrap: fn(Root<T>) -> Value,
) -> EvalResult {
    Ok(match handle {
        Some(h) => wrap(pool.root(h)?),
        None => Value::Nil,
    })
}

/// Positions of a tile's vertices, in order.
pub(crate) fn tile_points(pool: &GraphPool, tile: &Tile) -> Result<Vec<Point>, GraphError> {
    tile.vertices
        .iter()
        .map(|v| pool.get(*v).map(|vertex| vertex.position))
        .collect()
}

fn tile_field(heap: &mut GcHeap, h: Frozen<Tile>, name: &Name) -> EvalResult {
    let tile = heap.get(h)?;
    match name.as_str() {
        "vertices" => {
            let items = root_all(heap, &tile.vertices, Value::Vertex)?;
            make_cluster(heap, items)
        }
        "edges" => {
            let items = root_all(heap, &tile.edges, Value::Edge)?;
            make_cluster(heap, items)
        }
        "patch" => root_opt(heap, tile.parent, Value::Patch),
        "sides" => Ok(Number::from(tile.sides()).into()),
        "centroid" => {
            let center = centroid(&tile_points(heap, tile)?);
            make_point(heap, center)
        }
        _ => Err(undefined_field(name, Tile::TYPE_NAME)),
    }
}

fn vertex_field(heap: &mut GcHeap, h: Frozen<Vertex>, name: &Name) -> EvalResult {
    let vertex = heap.get(h)?;
    match name.as_str() {
        "x" => Ok(Value::from(vertex.position.x)),
        "y" => Ok(Value::from(vertex.position.y)),
        "tile" => root_opt(heap, vertex.tile, Value::Tile),
        "index" => Ok(Number::from(vertex.index).into()),
        _ => Err(undefined_field(name, Vertex::TYPE_NAME)),
    }
}

/// The two vertices an edge joins.
fn endpoints(pool: &GraphPool, edge: &Edge) -> Result<Option<[Frozen<Vertex>; 2]>, GraphError> {
    let Some(tile) = edge.tile else {
        return Ok(None);
    };
    let vertices = &pool.get(tile)?.vertices;
    if vertices.is_empty() {
        return Ok(None);
    }
    let n = vertices.len();
    Ok(Some([
        vertices[edge.index % n],
        vertices[(edge.index + 1) % n],
    ]))
}

fn edge_field(heap: &mut GcHeap, h: Frozen<Edge>, name: &Name) -> EvalResult {
    let edge = heap.get(h)?;
    match name.as_str() {
        "start" | "end" => {
            let pick = usize::from(name.as_str() == "end");
            let vertex = endpoints(heap, edge)?.map(|ends| ends[pick]);
            root_opt(heap, vertex, Value::Vertex)
        }
        "tile" => root_opt(heap, edge.tile, Value::Tile),
        "length" => match endpoints(heap, edge)? {
            Some([a, b]) => {
                let (a, b) = (heap.get(a)?.position, heap.get(b)?.position);
                Ok(Value::from(distance(a, b)))
            }
            None => Ok(Value::Nil),
        },
        _ => Err(undefined_field(name, Edge::TYPE_NAME)),
    }
}

fn patch_field(heap: &mut GcHeap, h: Frozen<Patch>, name: &Name) -> EvalResult {
    let patch = heap.get(h)?;
    match name.as_str() {
        "tiles" => {
            let items = root_all(heap, &patch.tiles, Value::Tile)?;
            make_cluster(heap, items)
        }
        "locations" => {
            let locations = patch.locations.clone();
            let mut points = Vec::with_capacity(locations.len());
            for p in locations {
                points.push(make_point(heap, p)?);
            }
            make_cluster(heap, points)
        }
        _ => Err(undefined_field(name, Patch::TYPE_NAME)),
    }
}

fn cluster_field(heap: &mut GcHeap, h: Frozen<Cluster>, name: &Name) -> EvalResult {
    let cluster = heap.get(h)?;
    if name.as_str() == "size" {
        return Ok(Number::from(cluster.items.len()).into());
    }
    let item = name
        .as_str()
        .parse::<usize>()
        .ok()
        .and_then(|i| cluster.items.get(i));
    match item {
        Some(slot) => Ok(Value::load(heap, slot)?),
        None => Err(undefined_field(name, Cluster::TYPE_NAME)),
    }
}

#[cfg(test)]
#[allow(
    clippy::unwrap_used,
    clippy::expect_used,
    reason = "tests use unwrap to panic on unexpected state"
)]
mod tests;
