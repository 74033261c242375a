//! Pure functions reachable from `Pure` ops.
//!
//! A primitive sees only its operand values and the heap (for allocating
//! results). Compilation resolves primitive names with [`lookup`].

mod tiles;

use std::fmt;
use std::rc::Rc;

use tess_graph::GcHeap;

use crate::errors::{
    division_by_zero, invalid_geometry, out_of_domain, type_mismatch, undefined_field, EvalResult,
};
use crate::geometry::regular_polygon;
use crate::name::Name;
use crate::number::Number;
use crate::value::{make_cluster, Value};

pub use tiles::{make_patch, make_tile};

type PrimitiveFn = dyn Fn(&mut GcHeap, &[Value]) -> EvalResult;

/// A named pure function of fixed arity.
#[derive(Clone)]
pub struct PureFn {
    name: Name,
    arity: usize,
    f: Rc<PrimitiveFn>,
}

impl PureFn {
    pub fn new(
        name: impl Into<Name>,
        arity: usize,
        f: impl Fn(&mut GcHeap, &[Value]) -> EvalResult + 'static,
    ) -> Self {
        PureFn {
            name: name.into(),
            arity,
            f: Rc::new(f),
        }
    }

    pub fn name(&self) -> &Name {
        &self.name
    }

    pub fn arity(&self) -> usize {
        self.arity
    }

    /// Apply to exactly `arity` values.
    pub fn call(&self, heap: &mut GcHeap, args: &[Value]) -> EvalResult {
        (self.f)(heap, args)
    }
}

impl fmt::Debug for PureFn {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "PureFn({}/{})", self.name, self.arity)
    }
}

// Builders

fn unary(name: &'static str, op: fn(Number) -> EvalResult) -> PureFn {
    PureFn::new(name, 1, move |_, args| op(args[0].as_number()?))
}

fn binary(name: &'static str, op: fn(Number, Number) -> EvalResult) -> PureFn {
    PureFn::new(name, 2, move |_, args| {
        op(args[0].as_number()?, args[1].as_number()?)
    })
}

fn compare(name: &'static str, holds: fn(std::cmp::Ordering) -> bool) -> PureFn {
    PureFn::new(name, 2, move |_, args| {
        let (a, b) = (args[0].as_number()?, args[1].as_number()?);
        // NaN compares false under every relation.
        Ok(Value::Bool(a.partial_cmp(&b).is_some_and(holds)))
    })
}

fn logic(name: &'static str, op: fn(bool, bool) -> bool) -> PureFn {
    PureFn::new(name, 2, move |_, args| {
        Ok(Value::Bool(op(args[0].as_bool()?, args[1].as_bool()?)))
    })
}

/// Cluster of the `arity` operands, in order.
pub fn cluster(arity: usize) -> PureFn {
    PureFn::new("cluster", arity, |heap, args| make_cluster(heap, args.to_vec()))
}

/// Resolve a primitive by name.
pub fn lookup(name: &str) -> Option<PureFn> {
    use std::cmp::Ordering;

    Some(match name {
        // Arithmetic
        "add" => binary("add", |a, b| Ok((a + b).into())),
        "sub" => binary("sub", |a, b| Ok((a - b).into())),
        "mul" => binary("mul", |a, b| Ok((a * b).into())),
        "div" => binary("div", |a, b| {
            if b.is_zero() {
                Err(division_by_zero())
            } else {
                Ok((a / b).into())
            }
        }),
        "pow" => binary("pow", |a, b| Ok(a.pow(b).into())),
        "neg" => unary("neg", |a| Ok((-a).into())),
        "sin" => unary("sin", |a| Ok(a.sin().into())),
        "cos" => unary("cos", |a| Ok(a.cos().into())),
        "sqrt" => unary("sqrt", |a| {
            if a.is_negative() {
                Err(out_of_domain("sqrt", a))
            } else {
                Ok(a.sqrt().into())
            }
        }),

        // Booleans
        "and" => logic("and", |a, b| a && b),
        "or" => logic("or", |a, b| a || b),
        "not" => PureFn::new("not", 1, |_, args| Ok(Value::Bool(!args[0].as_bool()?))),

        // Comparison
        "eq" => PureFn::new("eq", 2, |_, args| Ok(Value::Bool(args[0] == args[1]))),
        "ne" => PureFn::new("ne", 2, |_, args| Ok(Value::Bool(args[0] != args[1]))),
        "lt" => compare("lt", Ordering::is_lt),
        "le" => compare("le", Ordering::is_le),
        "gt" => compare("gt", Ordering::is_gt),
        "ge" => compare("ge", Ordering::is_ge),

        // Clusters
        "len" => PureFn::new("len", 1, |heap, args| {
            let cluster = args[0].as_cluster()?;
            Ok(Number::from(heap.get(cluster.handle())?.items.len()).into())
        }),
        "at" => PureFn::new("at", 2, |heap, args| {
            let cluster = args[0].as_cluster()?;
            let index = args[1].as_number()?;
            let items = &heap.get(cluster.handle())?.items;
            match index.as_index().and_then(|i| items.get(i)) {
                Some(slot) => Ok(Value::load(heap, slot)?),
                None => Err(undefined_field(&Name::new(&index.to_string()), "cluster")),
            }
        }),

        // Tiles
        "regular" => PureFn::new("regular", 1, |heap, args| {
            let sides = args[0].as_number()?;
            let sides = sides
                .as_index()
                .ok_or_else(|| invalid_geometry(format!("cannot make a {sides}-gon")))?;
            Ok(make_tile(heap, &regular_polygon(sides))?.into())
        }),
        "polygon" => PureFn::new("polygon", 1, |heap, args| {
            let points = tiles::points_of(heap, &args[0])?;
            Ok(make_tile(heap, &points)?.into())
        }),
        "patch" => PureFn::new("patch", 1, |heap, args| {
            let cluster = args[0].as_cluster()?;
            let slots = heap.get(cluster.handle())?.items.clone();
            let mut tiles = Vec::with_capacity(slots.len());
            for slot in &slots {
                match Value::load(heap, slot)? {
                    Value::Tile(tile) => tiles.push(tile),
                    other => return Err(type_mismatch("tile", other.type_name())),
                }
            }
            Ok(make_patch(heap, &tiles)?.into())
        }),

        _ => return None,
    })
}

#[cfg(test)]
#[allow(
    clippy::unwrap_used,
    clippy::expect_used,
    reason = "tests use unwrap to panic on unexpected state"
)]
