//! Op catalogue and dispatch.
//!
//! Operands reach an op in push order: for `Assign(n)` the value comes
//! first, then the `n` target variables.

use std::rc::Rc;

use tess_graph::Root;

use super::item::{Operand, Program, Step};
use super::Machine;
use crate::errors::{
    destructure_mismatch, malformed_program, not_a_field_target, type_mismatch,
    undefined_variable, EvalError,
};
use crate::lambda::{Lambda, LambdaTemplate};
use crate::name::Name;
use crate::primitives::PureFn;
use crate::scope::EvalContext;
use crate::value::{clone_for_update, get_field, FieldRef, Object, Slot, Value};

/// An instruction.
#[derive(Clone, Debug)]
pub enum Op {
    /// Look up a `Variable` operand. A zero-parameter lambda is called.
    GetVariable,
    PushContext,
    PopContext,
    PushFrame,
    PopFrame,
    /// Bind a value to `n` targets, destructuring a cluster when `n > 1`.
    Assign(usize),
    Pure(PureFn),
    GetField(Name),
    /// Capability to write a field of the object bound to a `Variable`.
    GetFieldRef(Name),
    /// Write a value through `n` field-refs, destructuring like `Assign`.
    SetField(usize),
    If {
        then: Rc<Program>,
        otherwise: Rc<Program>,
    },
    /// One step of a comprehension over a cluster or a count.
    Iterate {
        var: Name,
        index: usize,
        body: Rc<Program>,
    },
    MakeLambda(Rc<LambdaTemplate>),
    SetDependencies,
    Call(usize),
    /// Record the result of a call under its memo key.
    Memoize(String),
}

impl Op {
    /// Number of operands the op pops.
    pub fn arity(&self) -> usize {
        match self {
            Op::PushContext
            | Op::PopContext
            | Op::PushFrame
            | Op::PopFrame
            | Op::SetDependencies => 0,
            Op::GetVariable
            | Op::GetField(_)
            | Op::GetFieldRef(_)
            | Op::If { .. }
            | Op::MakeLambda(_)
            | Op::Memoize(_) => 1,
            Op::Iterate { index, .. } => {
                if *index == 0 {
                    1
                } else {
                    2
                }
            }
            Op::Assign(n) | Op::SetField(n) | Op::Call(n) => n + 1,
            Op::Pure(f) => f.arity(),
        }
    }

    /// Name for diagnostics and traces.
    pub fn name(&self) -> &'static str {
        match self {
            Op::GetVariable => "get-variable",
            Op::PushContext => "push-context",
            Op::PopContext => "pop-context",
            Op::PushFrame => "push-frame",
            Op::PopFrame => "pop-frame",
            Op::Assign(_) => "assign",
            Op::Pure(_) => "pure",
            Op::GetField(_) => "get-field",
            Op::GetFieldRef(_) => "get-field-ref",
            Op::SetField(_) => "set-field",
            Op::If { .. } => "if",
            Op::Iterate { .. } => "iterate",
            Op::MakeLambda(_) => "make-lambda",
            Op::SetDependencies => "set-dependencies",
            Op::Call(_) => "call",
            Op::Memoize(_) => "memoize",
        }
    }
}

fn single(args: Vec<Operand>) -> Result<Operand, EvalError> {
    args.into_iter()
        .next()
        .ok_or_else(|| malformed_program("missing operand"))
}

impl Machine {
    pub(super) fn dispatch(&mut self, op: Op, args: Vec<Operand>) -> Result<Step, EvalError> {
        match op {
            Op::GetVariable => self.get_variable(single(args)?.into_variable()?),
            Op::PushContext => {
                self.contexts.push_context(EvalContext::new());
                Ok(Step::Effect)
            }
            Op::PopContext => {
                self.contexts.pop_context()?;
                Ok(Step::Effect)
            }
            Op::PushFrame => {
                self.contexts.push_frame()?;
                Ok(Step::Effect)
            }
            Op::PopFrame => {
                self.contexts.pop_frame()?;
                Ok(Step::Effect)
            }
            Op::Assign(n) => self.assign(n, args),
            Op::Pure(f) => {
                let values = args
                    .into_iter()
                    .map(Operand::into_value)
                    .collect::<Result<Vec<_>, _>>()?;
                Ok(Step::Value(f.call(&mut self.heap, &values)?))
            }
            Op::GetField(name) => {
                let object = single(args)?.into_value()?;
                Ok(Step::Value(get_field(&mut self.heap, &object, &name)?))
            }
            Op::GetFieldRef(field) => self.get_field_ref(single(args)?.into_variable()?, field),
            Op::SetField(n) => self.set_field(n, args),
            Op::If { then, otherwise } => {
                let condition = single(args)?.into_value()?.as_bool()?;
                let branch = if condition { then } else { otherwise };
                Ok(Step::Push(branch.items().to_vec()))
            }
            Op::Iterate { var, index, body } => self.iterate(var, index, body, args),
            Op::MakeLambda(template) => {
                self.make_lambda(single(args)?.into_variable()?, &template)
            }
            Op::SetDependencies => self.set_dependencies(),
            Op::Call(_) => self.call(args),
            Op::Memoize(key) => self.memoize(key, single(args)?.into_value()?),
        }
    }

    // Binding

    /// Split `value` across `n` targets.
    fn destructure(&self, value: Value, n: usize) -> Result<Vec<Value>, EvalError> {
        if n == 1 {
            return Ok(vec![value]);
        }
        let Value::Cluster(cluster) = &value else {
            return Err(destructure_mismatch(n, 1));
        };
        let items = &self.heap.get(cluster.handle())?.items;
        if items.len() != n {
            return Err(destructure_mismatch(n, items.len()));
        }
        Ok(items
            .iter()
            .map(|slot| Value::load(&self.heap, slot))
            .collect::<Result<Vec<_>, _>>()?)
    }

    fn assign(&mut self, n: usize, args: Vec<Operand>) -> Result<Step, EvalError> {
        let mut args = args.into_iter();
        let value = args
            .next()
            .ok_or_else(|| malformed_program("assign without a value"))?
            .into_value()?;
        let values = self.destructure(value, n)?;
        for (target, value) in args.zip(values) {
            self.contexts.define(target.into_variable()?, value)?;
        }
        Ok(Step::Effect)
    }

    // Fields

    fn get_field_ref(&mut self, binding: Name, field: Name) -> Result<Step, EvalError> {
        let target = self
            .contexts
            .lookup(&binding)
            .ok_or_else(|| undefined_variable(&binding))?;
        if !target.is_object() {
            return Err(not_a_field_target(target.type_name()));
        }
        Ok(Step::Value(Value::FieldRef(FieldRef { binding, field })))
    }

    fn set_field(&mut self, n: usize, args: Vec<Operand>) -> Result<Step, EvalError> {
        let mut args = args.into_iter();
        let value = args
            .next()
            .ok_or_else(|| malformed_program("set-field without a value"))?
            .into_value()?;
        let values = self.destructure(value, n)?;
        for (target, value) in args.zip(values) {
            match target.into_value()? {
                Value::FieldRef(field_ref) => self.write_field(&field_ref, &value)?,
                other => return Err(type_mismatch("field-ref", other.type_name())),
            }
        }
        Ok(Step::Effect)
    }

    /// Clone the bound object, write the field into the clone and rebind.
    fn write_field(&mut self, field_ref: &FieldRef, value: &Value) -> Result<(), EvalError> {
        let target = self
            .contexts
            .lookup(&field_ref.binding)
            .ok_or_else(|| undefined_variable(&field_ref.binding))?;
        let slot = value.to_slot()?;
        let field = &field_ref.field;
        let updated = match &target {
            Value::Tile(h) => Value::Tile(self.with_field(h, field, slot)?),
            Value::Vertex(h) => Value::Vertex(self.with_field(h, field, slot)?),
            Value::Edge(h) => Value::Edge(self.with_field(h, field, slot)?),
            Value::Patch(h) => Value::Patch(self.with_field(h, field, slot)?),
            Value::Cluster(h) => Value::Cluster(self.with_field(h, field, slot)?),
            Value::Lambda(h) => Value::Lambda(self.with_field(h, field, slot)?),
            other => return Err(not_a_field_target(other.type_name())),
        };
        self.contexts.assign(&field_ref.binding, updated)
    }

    fn with_field<T: Object>(
        &mut self,
        object: &Root<T>,
        field: &Name,
        slot: Slot,
    ) -> Result<Root<T>, EvalError> {
        let copy = clone_for_update(&mut self.heap, object.handle())?;
        self.heap.update(&copy, |node| {
            node.fields_mut().insert(field.clone(), slot);
        })?;
        Ok(copy.freeze())
    }

    // Lambdas

    fn make_lambda(&mut self, label: Name, template: &LambdaTemplate) -> Result<Step, EvalError> {
        let mut lambda = Lambda::from_template(label, template);
        // Keeps captured handles rooted until the lambda's edges exist.
        let mut captured = Vec::new();
        for name in &template.free {
            if let Some(value) = self.contexts.lookup(name) {
                lambda.closure.insert(name.clone(), value.to_slot()?);
                captured.push(value);
            }
        }
        let complete = lambda.is_complete();
        let handle = self.heap.allocate_mutable(lambda)?;
        drop(captured);

        let published = self.heap.root(handle.view())?;
        tracing::trace!(lambda = %handle.id(), complete, "made lambda");
        if !complete {
            self.contexts.park(handle)?;
        }
        Ok(Step::Value(Value::Lambda(published)))
    }

    /// Fill parked closures from the bindings now in scope.
    fn set_dependencies(&mut self) -> Result<Step, EvalError> {
        for handle in self.contexts.take_pending()? {
            let missing: Vec<Name> = self
                .heap
                .get(handle.view())?
                .unresolved()
                .cloned()
                .collect();
            let found: Vec<(Name, Value)> = missing
                .into_iter()
                .filter_map(|name| self.contexts.lookup(&name).map(|value| (name, value)))
                .collect();
            if found.is_empty() {
                continue;
            }
            let slots = found
                .iter()
                .map(|(name, value)| Ok((name.clone(), value.to_slot()?)))
                .collect::<Result<Vec<_>, EvalError>>()?;
            self.heap.update(&handle, |lambda| lambda.closure.extend(slots))?;
            tracing::trace!(lambda = %handle.id(), resolved = found.len(), "closure completed");
        }
        Ok(Step::Effect)
    }
}

