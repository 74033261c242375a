//! Memoization keys.
//!
//! A call is keyed by the callee's identity and its arguments: scalars by
//! value, objects by node identity. Node ids are never reused and a
//! published object never changes (a field write rebinds a copy), so two
//! calls with equal keys see the same arguments. Lambda and field-ref
//! arguments yield no key and the call simply is not memoized.

use std::fmt::Write;

use tess_graph::Root;

use super::Value;
use crate::lambda::Lambda;

/// Key for calling `callee` with `args`, or `None` when an argument cannot
/// be keyed.
pub fn memo_key(callee: &Root<Lambda>, args: &[Value]) -> Option<String> {
    let mut out = String::new();
    write!(out, "lambda{}(", callee.id()).ok()?;
    for (i, arg) in args.iter().enumerate() {
        if i > 0 {
            out.push(',');
        }
        write_arg(&mut out, arg)?;
    }
    out.push(')');
    Some(out)
}

fn write_arg(out: &mut String, arg: &Value) -> Option<()> {
    match arg {
        Value::Nil => out.push_str("nil"),
        Value::Bool(b) => write!(out, "{b}").ok()?,
        Value::Number(n) => write!(out, "{n:?}").ok()?,
        Value::Str(s) => write!(out, "{s:?}").ok()?,
        Value::Lambda(_) | Value::FieldRef(_) => return None,
        object => {
            let id = object.node_id()?;
            write!(out, "{}{id}", object.type_name()).ok()?;
        }
    }
    Some(())
}

#[cfg(test)]
#[allow(
    clippy::unwrap_used,
    clippy::expect_used,
    reason = "tests use unwrap to panic on unexpected state"
)]
