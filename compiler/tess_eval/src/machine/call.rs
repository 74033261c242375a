//! Calls, call-by-need variables and memoization.

use std::rc::Rc;

use tess_graph::Root;

use super::item::{Item, Operand, Step};
use super::ops::Op;
use super::Machine;
use crate::errors::{
    arity_mismatch, malformed_program, not_callable, stack_overflow, undefined_variable,
    EvalError,
};
use crate::lambda::Lambda;
use crate::name::Name;
use crate::scope::{EvalContext, Frame};
use crate::value::{clone_value, memo_key, Slot, Value};

impl Machine {
    /// Resolve a variable, calling it if it holds a zero-parameter lambda.
    pub(super) fn get_variable(&mut self, name: Name) -> Result<Step, EvalError> {
        let value = self
            .contexts
            .lookup(&name)
            .ok_or_else(|| undefined_variable(&name))?;
        if let Value::Lambda(lambda) = &value {
            if self.heap.get(lambda.handle())?.arity() == 0 {
                return self.invoke(lambda.clone(), Vec::new());
            }
        }
        Ok(Step::Value(value))
    }

    /// `Call(n)`: the callee, then `n` arguments.
    pub(super) fn call(&mut self, args: Vec<Operand>) -> Result<Step, EvalError> {
        let mut values = args
            .into_iter()
            .map(Operand::into_value)
            .collect::<Result<Vec<_>, _>>()?;
        if values.is_empty() {
            return Err(malformed_program("call without a callee"));
        }
        match values.remove(0) {
            Value::Lambda(lambda) => self.invoke(lambda, values),
            other => Err(not_callable(other.type_name())),
        }
    }

    /// Answer from the memo table, or enter the body in a fresh context.
    fn invoke(&mut self, callee: Root<Lambda>, args: Vec<Value>) -> Result<Step, EvalError> {
        let lambda = self.heap.get(callee.handle())?;
        if lambda.arity() != args.len() {
            return Err(arity_mismatch(&lambda.label, lambda.arity(), args.len()));
        }
        let label = lambda.label.clone();
        let params = lambda.params.clone();
        let body = Rc::clone(&lambda.body);
        let closure: Vec<(Name, Slot)> = lambda
            .closure
            .iter()
            .map(|(name, slot)| (name.clone(), slot.clone()))
            .collect();

        let key = if self.config.memoize {
            memo_key(&callee, &args)
        } else {
            None
        };
        if let Some(key) = &key {
            if let Some(cached) = self.contexts.memo_mut().get(key) {
                let cached = cached.clone();
                tracing::trace!(key = %key, "memo hit");
                return Ok(Step::Value(clone_value(&mut self.heap, &cached)?));
            }
            tracing::trace!(key = %key, "memo miss");
        }

        // A hit never enters the body, so only misses count against the depth.
        if let Some(limit) = self.config.max_call_depth {
            if self.contexts.depth() > limit {
                return Err(stack_overflow(limit));
            }
        }

        let mut frame = Frame::new();
        for (name, slot) in &closure {
            frame.define(name.clone(), Value::load(&self.heap, slot)?);
        }
        for (i, (param, arg)) in params.into_iter().zip(args).enumerate() {
            frame.define(Name::positional(i + 1), arg.clone());
            frame.define(param, arg);
        }
        self.contexts
            .push_context(EvalContext::with_frame(frame).labeled(label));

        let mut items = Vec::with_capacity(body.len() + 2);
        items.extend(body.items().iter().cloned());
        items.push(Item::op(Op::PopContext));
        if let Some(key) = key {
            items.push(Item::op(Op::Memoize(key)));
        }
        Ok(Step::Push(items))
    }

    /// Store a call's result under its key and pass it on.
    pub(super) fn memoize(&mut self, key: String, value: Value) -> Result<Step, EvalError> {
        self.contexts.memo_mut().insert(key, value.clone());
        Ok(Step::Value(value))
    }
}
