//! Comprehensions.
//!
//! `Iterate { index: 0 }` opens a blank output cluster on the builder
//! stack. Each later step receives the body's result for the previous
//! element, appends it, and either schedules the next element or freezes
//! and yields the finished cluster. The source is threaded through the
//! program stack as a value item, which keeps it rooted between steps.

use std::rc::Rc;

use super::item::{Item, Operand, Program, Step};
use super::ops::Op;
use super::Machine;
use crate::errors::{malformed_program, type_mismatch, EvalError};
use crate::name::Name;
use crate::number::Number;
use crate::value::{Cluster, Value};

impl Machine {
    pub(super) fn iterate(
        &mut self,
        var: Name,
        index: usize,
        body: Rc<Program>,
        args: Vec<Operand>,
    ) -> Result<Step, EvalError> {
        let mut args = args.into_iter();
        let mut next = || {
            args.next()
                .ok_or_else(|| malformed_program("iterate operand missing"))?
                .into_value()
        };

        if index == 0 {
            let source = next()?;
            let builder = self.heap.allocate_blank::<Cluster>()?;
            self.builders.push(builder);
            return self.schedule(var, 0, body, source);
        }

        let result = next()?;
        let source = next()?;
        let slot = result.to_slot()?;
        let builder = self
            .builders
            .last()
            .ok_or_else(|| malformed_program("iterate has no open cluster"))?;
        self.heap.update(builder, |cluster| cluster.items.push(slot))?;
        drop(result);
        self.schedule(var, index, body, source)
    }

    /// Bind element `index` and run the body, or finish.
    fn schedule(
        &mut self,
        var: Name,
        index: usize,
        body: Rc<Program>,
        source: Value,
    ) -> Result<Step, EvalError> {
        let element = match &source {
            Value::Cluster(h) => match self.heap.get(h.handle())?.items.get(index) {
                Some(slot) => Some(Value::load(&self.heap, slot)?),
                None => None,
            },
            Value::Number(n) => {
                let count = n
                    .as_index()
                    .ok_or_else(|| type_mismatch("count", "non-integral number"))?;
                (index < count).then(|| Value::from(Number::from(index)))
            }
            other => return Err(type_mismatch("cluster", other.type_name())),
        };

        let Some(element) = element else {
            let builder = self
                .builders
                .pop()
                .ok_or_else(|| malformed_program("iterate has no open cluster"))?;
            tracing::trace!(len = index, "comprehension complete");
            return Ok(Step::Value(Value::Cluster(builder.freeze())));
        };

        let mut items = Vec::with_capacity(body.len() + 8);
        items.push(Item::op(Op::PushFrame));
        items.push(Item::Value(element));
        items.push(Item::Variable(var.clone()));
        items.push(Item::op(Op::Assign(1)));
        items.extend(body.items().iter().cloned());
        items.push(Item::op(Op::PopFrame));
        items.push(Item::Value(source));
        items.push(Item::op(Op::Iterate {
            var,
            index: index + 1,
            body,
        }));
        Ok(Step::Push(items))
    }
}
