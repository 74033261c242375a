//! The stack machine.
//!
//! Two stacks drive execution: the program stack (items still to run, next
//! on top) and the operand stack (values and variable names waiting for an
//! op). The trampoline pops one program item at a time:
//!
//! - values and variables move to the operand stack;
//! - an error item halts the run;
//! - an op pops its operands and returns a [`Step`]: a value (pushed back
//!   onto the program stack so the next pop routes it to the operands),
//!   more items to run next, or nothing.
//!
//! Control flow never recurses on the host stack: `If`, `Iterate` and
//! `Call` return the items to run instead of running them.

mod call;
mod item;
mod iterate;
mod ops;

use tess_graph::{Gc, GcConfig, GcHeap};
use tracing::{debug, trace};

use crate::errors::{
    malformed_program, stack_underflow, step_budget_exceeded, unbalanced_scope, EvalError,
    EvalResult,
};
use crate::name::Name;
use crate::scope::{Checkpoint, ContextStack};
use crate::value::{Cluster, Value};

pub use item::{Instr, Item, Operand, Program, Step};
pub use ops::Op;

/// Limits and policy for one machine.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct MachineConfig {
    pub gc: GcConfig,
    /// Maximum number of nested calls. `None` is unlimited.
    pub max_call_depth: Option<usize>,
    /// Maximum number of ops one run may dispatch. `None` is unlimited.
    pub max_steps: Option<u64>,
    /// Whether calls are memoized.
    pub memoize: bool,
}

impl Default for MachineConfig {
    fn default() -> Self {
        MachineConfig {
            gc: GcConfig::default(),
            max_call_depth: None,
            max_steps: None,
            memoize: true,
        }
    }
}

/// Builder for [`Machine`].
#[derive(Debug, Default)]
pub struct MachineBuilder {
    config: MachineConfig,
}

impl MachineBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the collection cadence.
    #[must_use]
    pub fn gc(mut self, gc: GcConfig) -> Self {
        self.config.gc = gc;
        self
    }

    /// Collect once more than `n` allocations happened since the last
    /// collection.
    #[must_use]
    pub fn collect_every(mut self, n: usize) -> Self {
        self.config.gc = self.config.gc.with_collect_every(n);
        self
    }

    #[must_use]
    pub fn max_call_depth(mut self, depth: usize) -> Self {
        self.config.max_call_depth = Some(depth);
        self
    }

    #[must_use]
    pub fn max_steps(mut self, steps: u64) -> Self {
        self.config.max_steps = Some(steps);
        self
    }

    /// Enable or disable call memoization (enabled by default).
    #[must_use]
    pub fn memoize(mut self, enabled: bool) -> Self {
        self.config.memoize = enabled;
        self
    }

    pub fn build(self) -> Machine {
        Machine::with_config(self.config)
    }
}

/// Interpreter state for running compiled programs against one heap.
pub struct Machine {
    heap: GcHeap,
    contexts: ContextStack,
    program: Vec<Item>,
    operands: Vec<Operand>,
    /// Output clusters of the comprehensions in progress, innermost last.
    builders: Vec<Gc<Cluster>>,
    config: MachineConfig,
    steps: u64,
}

impl Machine {
    /// A machine with the default configuration.
    pub fn new() -> Self {
        Self::with_config(MachineConfig::default())
    }

    pub fn with_config(config: MachineConfig) -> Self {
        Machine {
            heap: GcHeap::with_config(config.gc),
            contexts: ContextStack::new(),
            program: Vec::new(),
            operands: Vec::new(),
            builders: Vec::new(),
            config,
            steps: 0,
        }
    }

    pub fn builder() -> MachineBuilder {
        MachineBuilder::new()
    }

    pub fn config(&self) -> &MachineConfig {
        &self.config
    }

    pub fn heap(&self) -> &GcHeap {
        &self.heap
    }

    pub fn heap_mut(&mut self) -> &mut GcHeap {
        &mut self.heap
    }

    pub fn contexts(&self) -> &ContextStack {
        &self.contexts
    }

    /// Ops dispatched by the last run.
    pub fn steps(&self) -> u64 {
        self.steps
    }

    /// Bind a name in the global frame, visible to every later run.
    pub fn define(&mut self, name: impl Into<Name>, value: Value) -> Result<(), EvalError> {
        self.contexts.define(name.into(), value)
    }

    /// Run a program to its single result.
    ///
    /// The memo table is cleared first and is shared by every call the run
    /// makes. On error the stacks and any contexts the run pushed are
    /// discarded, so the machine can run again.
    pub fn run(&mut self, program: &Program) -> EvalResult {
        let base = self.contexts.checkpoint();
        self.steps = 0;
        self.contexts.memo_mut().clear();
        debug!(items = program.len(), "run started");

        let result = self.execute(program, base);
        match &result {
            Ok(value) => debug!(
                steps = self.steps,
                memo_hits = self.contexts.memo().hits(),
                memo_misses = self.contexts.memo().misses(),
                heap_nodes = self.heap.len(),
                result = %value.display(&self.heap),
                "run finished"
            ),
            Err(err) => {
                debug!(steps = self.steps, error = %err, "run failed");
                self.reset(base);
            }
        }
        result
    }

    fn execute(&mut self, program: &Program, base: Checkpoint) -> EvalResult {
        self.push_items(program.items().to_vec());

        while let Some(item) = self.program.pop() {
            match item {
                Item::Value(value) => self.operands.push(Operand::Value(value)),
                Item::Variable(name) => self.operands.push(Operand::Variable(name)),
                Item::Error(err) => return Err(err.with_backtrace(self.contexts.backtrace())),
                Item::Op(Instr { op, line }) => {
                    self.tick().map_err(|err| err.at_line(line))?;
                    match self.step(op) {
                        Ok(Step::Value(value)) => self.program.push(Item::Value(value)),
                        Ok(Step::Push(items)) => self.push_items(items),
                        Ok(Step::Effect) => {}
                        Err(err) => {
                            return Err(err
                                .at_line(line)
                                .with_backtrace(self.contexts.backtrace()))
                        }
                    }
                }
            }
        }

        self.finish(base)
    }

    /// Pop an op's operands and dispatch it.
    fn step(&mut self, op: Op) -> Result<Step, EvalError> {
        let arity = op.arity();
        let available = self.operands.len();
        if available < arity {
            return Err(stack_underflow(op.name(), arity, available));
        }
        let args = self.operands.split_off(available - arity);
        trace!(op = op.name(), arity, "dispatch");
        self.dispatch(op, args)
    }

    fn tick(&mut self) -> Result<(), EvalError> {
        self.steps += 1;
        match self.config.max_steps {
            Some(limit) if self.steps > limit => Err(step_budget_exceeded(limit)),
            _ => Ok(()),
        }
    }

    /// Schedule `items` so they run next, first item first.
    fn push_items(&mut self, items: Vec<Item>) {
        self.program.extend(items.into_iter().rev());
    }

    /// Check the end state of a run that drained its program.
    fn finish(&mut self, base: Checkpoint) -> EvalResult {
        let end = self.contexts.checkpoint();
        if end.contexts != base.contexts {
            return Err(unbalanced_scope("context", base.contexts, end.contexts));
        }
        if end.frames != base.frames {
            return Err(unbalanced_scope("frame", base.frames, end.frames));
        }
        if !self.builders.is_empty() {
            return Err(malformed_program("comprehension left unfinished"));
        }
        match self.operands.len() {
            1 => match self.operands.pop() {
                Some(Operand::Value(value)) => Ok(value),
                Some(Operand::Variable(name)) => Err(malformed_program(format!(
                    "result is the unresolved variable `{name}`"
                ))),
                None => Err(malformed_program("no result")),
            },
            0 => Err(malformed_program("no result")),
            n => Err(malformed_program(format!("{n} operands left at end of run"))),
        }
    }

    /// Discard the state of a failed run.
    fn reset(&mut self, base: Checkpoint) {
        self.program.clear();
        self.operands.clear();
        self.builders.clear();
        self.contexts.restore(base);
    }
}

impl Default for Machine {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
#[allow(
    clippy::unwrap_used,
    clippy::expect_used,
    reason = "tests use unwrap to panic on unexpected state"
)]
