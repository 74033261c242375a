use super::*;
use crate::errors::EvalErrorKind;

fn name(s: &str) -> Name {
    Name::new(s)
}

// Lookup

#[test]
fn inner_frames_shadow_outer_ones() {
    let mut stack = ContextStack::new();
    stack.define(name("x"), Value::from(1.0)).unwrap();
    stack.push_frame().unwrap();
    stack.define(name("x"), Value::from(2.0)).unwrap();
    assert_eq!(stack.lookup(&name("x")), Some(Value::from(2.0)));

    stack.pop_frame().unwrap();
    assert_eq!(stack.lookup(&name("x")), Some(Value::from(1.0)));
}

#[test]
fn lookup_stays_inside_the_current_context() {
    let mut stack = ContextStack::new();
    stack.define(name("global"), Value::from(1.0)).unwrap();
    stack.push_context(EvalContext::new());
    assert_eq!(stack.lookup(&name("global")), None);

    stack.pop_context().unwrap();
    assert!(stack.lookup(&name("global")).is_some());
}

#[test]
fn assign_rebinds_the_innermost_binding() {
    let mut stack = ContextStack::new();
    stack.define(name("x"), Value::from(1.0)).unwrap();
    stack.push_frame().unwrap();
    stack.assign(&name("x"), Value::from(5.0)).unwrap();
    stack.pop_frame().unwrap();
    assert_eq!(stack.lookup(&name("x")), Some(Value::from(5.0)));
}

#[test]
fn assign_to_unbound_name_fails() {
    let mut stack = ContextStack::new();
    let err = stack.assign(&name("nope"), Value::Nil).unwrap_err();
    assert_eq!(
        err.kind,
        EvalErrorKind::UndefinedVariable { name: name("nope") }
    );
}

// Underflow

#[test]
fn popping_past_empty_underflows() {
    let mut stack = ContextStack::new();
    stack.pop_frame().unwrap();
    let err = stack.pop_frame().unwrap_err();
    assert!(matches!(err.kind, EvalErrorKind::ScopeUnderflow { .. }));

    stack.pop_context().unwrap();
    assert!(stack.pop_context().is_err());
    assert!(stack.push_frame().is_err());
    assert!(stack.define(name("x"), Value::Nil).is_err());
}

// Checkpoints

#[test]
fn restore_discards_pushed_scopes() {
    let mut stack = ContextStack::new();
    let base = stack.checkpoint();
    stack.push_frame().unwrap();
    stack.push_context(EvalContext::new().labeled(name("f")));
    stack.push_frame().unwrap();
    assert_eq!(stack.backtrace(), vec![name("f")]);

    stack.restore(base);
    assert_eq!(stack.checkpoint(), base);
    assert!(stack.backtrace().is_empty());
}

#[test]
fn restore_replaces_popped_scopes() {
    let mut stack = ContextStack::new();
    let base = stack.checkpoint();
    stack.pop_context().unwrap();
    stack.restore(base);
    assert_eq!(stack.depth(), 1);
    assert_eq!(stack.checkpoint(), base);
}

// Memo table

#[test]
fn memo_counts_hits_and_misses() {
    let mut memo = MemoTable::default();
    assert!(memo.get("k").is_none());
    memo.insert("k".to_string(), Value::from(1.0));
    assert_eq!(memo.get("k"), Some(&Value::from(1.0)));
    assert_eq!((memo.hits(), memo.misses()), (1, 1));

    memo.clear();
    assert!(memo.is_empty());
    assert_eq!((memo.hits(), memo.misses()), (0, 0));
}
