//! Tess Eval - stack-machine interpreter for the Tessera tiling language.
//!
//! This crate provides:
//! - [`Value`]: rooted runtime values over the [`tess_graph`] heap, with
//!   deep cloning, field access, display and memo keys.
//! - [`ContextStack`]: lexical frames, per-call evaluation contexts and the
//!   run-wide memo table.
//! - [`Machine`]: the trampolined stack machine and its op catalogue.
//! - [`Expr`]: the parsed expression tree and its compilation to a
//!   [`Program`].
//! - [`primitives`]: arithmetic, comparison, cluster and tile functions.
//!
//! # Architecture
//!
//! Objects (tiles, vertices, edges, patches, clusters, lambdas) live in the
//! graph heap and freely point at each other, cycles included. They are
//! immutable once published; a field write clones the object, writes the
//! clone and rebinds the name. Evaluation never recurses on the host stack:
//! conditionals, comprehensions and calls push the items to run next onto
//! the program stack.

mod errors;
mod expr;
mod geometry;
mod lambda;
mod machine;
mod name;
mod number;
pub mod primitives;
mod scope;
mod stack;
mod value;

use std::sync::Once;

pub use errors::{EvalError, EvalErrorKind, EvalResult};
pub use expr::{BinaryOp, Binding, Expr, UnaryOp};
pub use geometry::{centroid, distance, location_key, regular_polygon, Point, LOCATION_EPSILON};
pub use lambda::{Lambda, LambdaTemplate};
pub use machine::{Instr, Item, Machine, MachineBuilder, MachineConfig, Op, Operand, Program, Step};
pub use name::Name;
pub use number::Number;
pub use scope::{ContextStack, EvalContext, Frame, MemoTable};
pub use value::{
    clone_for_update, clone_value, get_field, make_cluster, memo_key, Cloner, Cluster, Edge,
    FieldRef, Fields, Object, Patch, Slot, Tile, Value, Vertex,
};

pub use tess_graph::{GcConfig, GcHeap, GcStats};

static TRACING_INIT: Once = Once::new();

/// Install a `tracing` subscriber filtered by `RUST_LOG`.
///
/// Does nothing when `RUST_LOG` is unset, and only the first call has any
/// effect.
pub fn init_tracing() {
    TRACING_INIT.call_once(|| {
        use tracing_subscriber::{fmt, prelude::*, EnvFilter};

        if std::env::var("RUST_LOG").is_ok() {
            let filter = EnvFilter::from_default_env();
            tracing_subscriber::registry()
                .with(fmt::layer().with_target(true).with_level(true))
                .with(filter)
                .init();
        }
    });
}
