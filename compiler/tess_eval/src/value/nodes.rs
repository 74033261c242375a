//! Heap node payloads.
//!
//! Every node carries a user field table plus its type-specific structure.
//! Handles stored inside a node are unrooted [`Frozen`] addresses; the node
//! reports them through [`Node::internal_pointers`] so the pool keeps its
//! edges current.

use rustc_hash::FxHashMap;
use tess_graph::{Frozen, Node, Pointers};

use super::clone::Cloner;
use super::Slot;
use crate::errors::EvalError;
use crate::geometry::Point;
use crate::lambda::Lambda;
use crate::name::Name;

/// User-assigned fields of an object.
pub type Fields = FxHashMap<Name, Slot>;

/// Behavior shared by every heap object type.
///
/// `Default` gives the blank node a clone is written into; `Clone` gives the
/// snapshot whose handles [`Object::clone_with`] remaps.
pub trait Object: Node + Clone + Default {
    /// Name used in diagnostics and display.
    const TYPE_NAME: &'static str;

    fn fields(&self) -> &Fields;

    fn fields_mut(&mut self) -> &mut Fields;

    /// Replace every handle in this snapshot by its clone.
    ///
    /// Scalar structure is already copied by `Clone`.
    fn clone_with(&mut self, cx: &mut Cloner<'_>) -> Result<(), EvalError>;
}

fn push_field_pointers(fields: &Fields, out: &mut Pointers) {
    for slot in fields.values() {
        slot.push_pointer(out);
    }
}

fn clone_fields(fields: &mut Fields, cx: &mut Cloner<'_>) -> Result<(), EvalError> {
    for slot in fields.values_mut() {
        *slot = cx.clone_slot(slot)?;
    }
    Ok(())
}

fn clone_all<T: Object>(
    handles: &mut [Frozen<T>],
    cx: &mut Cloner<'_>,
) -> Result<(), EvalError> {
    for handle in handles {
        *handle = cx.clone_frozen(*handle)?;
    }
    Ok(())
}

fn clone_opt<T: Object>(
    handle: &mut Option<Frozen<T>>,
    cx: &mut Cloner<'_>,
) -> Result<(), EvalError> {
    if let Some(h) = handle {
        *h = cx.clone_frozen(*h)?;
    }
    Ok(())
}

// Tile

/// A polygon: ordered vertices and edges, optionally placed in a patch.
#[derive(Clone, Debug, Default)]
pub struct Tile {
    pub vertices: Vec<Frozen<Vertex>>,
    pub edges: Vec<Frozen<Edge>>,
    pub parent: Option<Frozen<Patch>>,
    pub fields: Fields,
}

impl Tile {
    /// Number of sides.
    pub fn sides(&self) -> usize {
        self.vertices.len()
    }
}

impl Node for Tile {
    fn internal_pointers(&self, out: &mut Pointers) {
        out.extend(self.vertices.iter().map(|v| v.id()));
        out.extend(self.edges.iter().map(|e| e.id()));
        out.extend(self.parent.map(Frozen::id));
        push_field_pointers(&self.fields, out);
    }
}

impl Object for Tile {
    const TYPE_NAME: &'static str = "tile";

    fn fields(&self) -> &Fields {
        &self.fields
    }

    fn fields_mut(&mut self) -> &mut Fields {
        &mut self.fields
    }

    fn clone_with(&mut self, cx: &mut Cloner<'_>) -> Result<(), EvalError> {
        clone_all(&mut self.vertices, cx)?;
        clone_all(&mut self.edges, cx)?;
        clone_opt(&mut self.parent, cx)?;
        clone_fields(&mut self.fields, cx)
    }
}

// Vertex

/// A corner of a tile.
#[derive(Clone, Debug, Default)]
pub struct Vertex {
    pub tile: Option<Frozen<Tile>>,
    pub position: Point,
    pub index: usize,
    pub fields: Fields,
}

impl Node for Vertex {
    fn internal_pointers(&self, out: &mut Pointers) {
        out.extend(self.tile.map(Frozen::id));
        push_field_pointers(&self.fields, out);
    }
}

impl Object for Vertex {
    const TYPE_NAME: &'static str = "vertex";

    fn fields(&self) -> &Fields {
        &self.fields
    }

    fn fields_mut(&mut self) -> &mut Fields {
        &mut self.fields
    }

    fn clone_with(&mut self, cx: &mut Cloner<'_>) -> Result<(), EvalError> {
        clone_opt(&mut self.tile, cx)?;
        clone_fields(&mut self.fields, cx)
    }
}

// Edge

/// A side of a tile, from vertex `index` to vertex `index + 1` (mod sides).
#[derive(Clone, Debug, Default)]
pub struct Edge {
    pub tile: Option<Frozen<Tile>>,
    pub index: usize,
    pub fields: Fields,
}

impl Node for Edge {
    fn internal_pointers(&self, out: &mut Pointers) {
        out.extend(self.tile.map(Frozen::id));
        push_field_pointers(&self.fields, out);
    }
}

impl Object for Edge {
    const TYPE_NAME: &'static str = "edge";

    fn fields(&self) -> &Fields {
        &self.fields
    }

    fn fields_mut(&mut self) -> &mut Fields {
        &mut self.fields
    }

    fn clone_with(&mut self, cx: &mut Cloner<'_>) -> Result<(), EvalError> {
        clone_opt(&mut self.tile, cx)?;
        clone_fields(&mut self.fields, cx)
    }
}

// Patch

/// Tiles composed into one figure, sharing a vertex-location table.
///
/// `tile_locations[t][v]` is the index into `locations` of vertex `v` of
/// tile `t`. Vertices of different tiles at the same position share one
/// location.
#[derive(Clone, Debug, Default)]
pub struct Patch {
    pub tiles: Vec<Frozen<Tile>>,
    pub locations: Vec<Point>,
    pub tile_locations: Vec<Vec<usize>>,
    pub fields: Fields,
}

impl Node for Patch {
    fn internal_pointers(&self, out: &mut Pointers) {
        out.extend(self.tiles.iter().map(|t| t.id()));
        push_field_pointers(&self.fields, out);
    }
}

impl Object for Patch {
    const TYPE_NAME: &'static str = "patch";

    fn fields(&self) -> &Fields {
        &self.fields
    }

    fn fields_mut(&mut self) -> &mut Fields {
        &mut self.fields
    }

    fn clone_with(&mut self, cx: &mut Cloner<'_>) -> Result<(), EvalError> {
        clone_all(&mut self.tiles, cx)?;
        clone_fields(&mut self.fields, cx)
    }
}

// Cluster

/// Ordered collection of values.
#[derive(Clone, Debug, Default)]
pub struct Cluster {
    pub items: Vec<Slot>,
    pub fields: Fields,
}

impl Node for Cluster {
    fn internal_pointers(&self, out: &mut Pointers) {
        for item in &self.items {
            item.push_pointer(out);
        }
        push_field_pointers(&self.fields, out);
    }
}

impl Object for Cluster {
    const TYPE_NAME: &'static str = "cluster";

    fn fields(&self) -> &Fields {
        &self.fields
    }

    fn fields_mut(&mut self) -> &mut Fields {
        &mut self.fields
    }

    fn clone_with(&mut self, cx: &mut Cloner<'_>) -> Result<(), EvalError> {
        for item in &mut self.items {
            *item = cx.clone_slot(item)?;
        }
        clone_fields(&mut self.fields, cx)
    }
}

// Lambda

impl Node for Lambda {
    fn internal_pointers(&self, out: &mut Pointers) {
        for slot in self.closure.values() {
            slot.push_pointer(out);
        }
        push_field_pointers(&self.fields, out);
    }
}

impl Object for Lambda {
    const TYPE_NAME: &'static str = "lambda";

    fn fields(&self) -> &Fields {
        &self.fields
    }

    fn fields_mut(&mut self) -> &mut Fields {
        &mut self.fields
    }

    fn clone_with(&mut self, cx: &mut Cloner<'_>) -> Result<(), EvalError> {
        clone_fields(&mut self.closure, cx)?;
        clone_fields(&mut self.fields, cx)
    }
}
