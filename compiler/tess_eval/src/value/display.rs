//! Human-readable rendering of values.

use std::fmt::Write;

use rustc_hash::FxHashSet;
use tess_graph::{GraphPool, NodeId};

use super::{Slot, Value};
use crate::stack::ensure_sufficient_stack;

impl Value {
    /// Render this value. Clusters render as `[a, b]`, tiles as `tile(n)`
    /// and a cluster reached again inside itself as `...`.
    pub fn display(&self, pool: &GraphPool) -> String {
        let mut out = String::new();
        match self {
            Value::FieldRef(r) => {
                let _ = write!(out, "&{}.{}", r.binding, r.field);
            }
            other => match other.to_slot() {
                Ok(slot) => render(pool, &slot, &mut FxHashSet::default(), &mut out),
                Err(_) => out.push('?'),
            },
        }
        out
    }
}

fn render(pool: &GraphPool, slot: &Slot, open: &mut FxHashSet<NodeId>, out: &mut String) {
    match slot {
        Slot::Nil => out.push_str("nil"),
        Slot::Number(n) => {
            let _ = write!(out, "{n}");
        }
        Slot::Str(s) => out.push_str(s),
        Slot::Bool(b) => {
            let _ = write!(out, "{b}");
        }
        Slot::Tile(h) => match pool.get(*h) {
            Ok(tile) => {
                let _ = write!(out, "tile({})", tile.sides());
            }
            Err(_) => out.push_str("<collected>"),
        },
        Slot::Vertex(h) => match pool.get(*h) {
            Ok(vertex) => {
                let _ = write!(out, "vertex({}, {})", vertex.position.x, vertex.position.y);
            }
            Err(_) => out.push_str("<collected>"),
        },
        Slot::Edge(h) => match pool.get(*h) {
            Ok(edge) => {
                let _ = write!(out, "edge({})", edge.index);
            }
            Err(_) => out.push_str("<collected>"),
        },
        Slot::Patch(h) => match pool.get(*h) {
            Ok(patch) => {
                let _ = write!(out, "patch({})", patch.tiles.len());
            }
            Err(_) => out.push_str("<collected>"),
        },
        Slot::Lambda(h) => match pool.get(*h) {
            Ok(lambda) => {
                let _ = write!(out, "<lambda {}/{}>", lambda.label, lambda.arity());
            }
            Err(_) => out.push_str("<collected>"),
        },
        Slot::Cluster(h) => {
            let id = h.id();
            if !open.insert(id) {
                out.push_str("...");
                return;
            }
            match pool.get(*h) {
                Ok(cluster) => ensure_sufficient_stack(|| {
                    out.push('[');
                    for (i, item) in cluster.items.iter().enumerate() {
                        if i > 0 {
                            out.push_str(", ");
                        }
                        render(pool, item, open, out);
                    }
                    out.push(']');
                }),
                Err(_) => out.push_str("<collected>"),
            }
            open.remove(&id);
        }
    }
}

#[cfg(test)]
#[allow(
    clippy::unwrap_used,
    clippy::expect_used,
    reason = "tests use unwrap to panic on unexpected state"
)]
