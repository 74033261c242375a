//! Lexical scoping: frames, evaluation contexts and the context stack.
//!
//! A [`Frame`] is one binding block. An [`EvalContext`] is the frame stack
//! of one active call; lookup scans it innermost first and never looks into
//! an enclosing call's context (closures carry what a body needs). The
//! [`ContextStack`] holds one context per active call plus the memo table
//! shared by the whole run.

use rustc_hash::FxHashMap;
use tess_graph::Gc;

use crate::errors::{scope_underflow, undefined_variable, EvalError};
use crate::lambda::Lambda;
use crate::name::Name;
use crate::value::Value;

/// One lexical binding table.
#[derive(Debug, Default)]
pub struct Frame {
    bindings: FxHashMap<Name, Value>,
    /// Lambdas made in this frame whose closures are still incomplete.
    pending: Vec<Gc<Lambda>>,
}

impl Frame {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn define(&mut self, name: Name, value: Value) {
        self.bindings.insert(name, value);
    }

    pub fn get(&self, name: &Name) -> Option<&Value> {
        self.bindings.get(name)
    }

    pub fn len(&self) -> usize {
        self.bindings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bindings.is_empty()
    }
}

/// The frames of one call.
#[derive(Debug)]
pub struct EvalContext {
    frames: Vec<Frame>,
    /// Label of the lambda this context was pushed for.
    label: Option<Name>,
}

impl EvalContext {
    /// A context with one empty frame.
    pub fn new() -> Self {
        Self::with_frame(Frame::new())
    }

    /// A context whose only frame is `frame`.
    pub fn with_frame(frame: Frame) -> Self {
        EvalContext {
            frames: vec![frame],
            label: None,
        }
    }

    /// Tag the context with the callee's label, for backtraces.
    #[must_use]
    pub fn labeled(mut self, label: Name) -> Self {
        self.label = Some(label);
        self
    }

    /// Innermost-first lookup.
    pub fn lookup(&self, name: &Name) -> Option<&Value> {
        self.frames.iter().rev().find_map(|frame| frame.get(name))
    }

    pub fn depth(&self) -> usize {
        self.frames.len()
    }
}

impl Default for EvalContext {
    fn default() -> Self {
        Self::new()
    }
}

/// Scope depths to return to after a failed run.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Checkpoint {
    pub contexts: usize,
    pub frames: usize,
}

/// Run-wide memoization table.
#[derive(Debug, Default)]
pub struct MemoTable {
    entries: FxHashMap<String, Value>,
    hits: u64,
    misses: u64,
}

impl MemoTable {
    /// Look a key up, counting the hit or miss.
    pub fn get(&mut self, key: &str) -> Option<&Value> {
        let found = self.entries.get(key);
        if found.is_some() {
            self.hits += 1;
        } else {
            self.misses += 1;
        }
        found
    }

    pub fn insert(&mut self, key: String, value: Value) {
        self.entries.insert(key, value);
    }

    pub fn hits(&self) -> u64 {
        self.hits
    }

    pub fn misses(&self) -> u64 {
        self.misses
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Drop every entry and reset the counters.
    pub fn clear(&mut self) {
        self.entries.clear();
        self.hits = 0;
        self.misses = 0;
    }
}

/// Stack of evaluation contexts, one per active call.
#[derive(Debug)]
pub struct ContextStack {
    contexts: Vec<EvalContext>,
    memo: MemoTable,
}

impl ContextStack {
    /// A stack holding the global context.
    pub fn new() -> Self {
        ContextStack {
            contexts: vec![EvalContext::new()],
            memo: MemoTable::default(),
        }
    }

    fn current_frame(&mut self) -> Result<&mut Frame, EvalError> {
        self.contexts
            .last_mut()
            .ok_or_else(|| scope_underflow("evaluation context"))?
            .frames
            .last_mut()
            .ok_or_else(|| scope_underflow("scope frame"))
    }

    // Contexts

    pub fn push_context(&mut self, context: EvalContext) {
        self.contexts.push(context);
    }

    pub fn pop_context(&mut self) -> Result<EvalContext, EvalError> {
        self.contexts
            .pop()
            .ok_or_else(|| scope_underflow("evaluation context"))
    }

    /// Number of active contexts.
    pub fn depth(&self) -> usize {
        self.contexts.len()
    }

    /// Current context and frame depths.
    pub fn checkpoint(&self) -> Checkpoint {
        Checkpoint {
            contexts: self.contexts.len(),
            frames: self.contexts.last().map_or(0, EvalContext::depth),
        }
    }

    /// Return to the depths of `checkpoint`, discarding scopes pushed since.
    ///
    /// Scopes popped since are replaced by empty ones.
    pub fn restore(&mut self, checkpoint: Checkpoint) {
        self.contexts.truncate(checkpoint.contexts);
        while self.contexts.len() < checkpoint.contexts {
            self.contexts.push(EvalContext::new());
        }
        if let Some(context) = self.contexts.last_mut() {
            context.frames.truncate(checkpoint.frames);
            while context.frames.len() < checkpoint.frames {
                context.frames.push(Frame::new());
            }
        }
    }

    /// Labels of the active calls, outermost first.
    pub fn backtrace(&self) -> Vec<Name> {
        self.contexts
            .iter()
            .filter_map(|context| context.label.clone())
            .collect()
    }

    // Frames

    pub fn push_frame(&mut self) -> Result<(), EvalError> {
        self.contexts
            .last_mut()
            .ok_or_else(|| scope_underflow("evaluation context"))?
            .frames
            .push(Frame::new());
        Ok(())
    }

    pub fn pop_frame(&mut self) -> Result<Frame, EvalError> {
        self.contexts
            .last_mut()
            .ok_or_else(|| scope_underflow("evaluation context"))?
            .frames
            .pop()
            .ok_or_else(|| scope_underflow("scope frame"))
    }

    // Bindings

    /// Bind in the innermost frame.
    pub fn define(&mut self, name: Name, value: Value) -> Result<(), EvalError> {
        self.current_frame()?.define(name, value);
        Ok(())
    }

    /// Innermost-first lookup in the current context.
    pub fn lookup(&self, name: &Name) -> Option<Value> {
        self.contexts.last()?.lookup(name).cloned()
    }

    /// Rebind an existing name in the innermost frame that binds it.
    pub fn assign(&mut self, name: &Name, value: Value) -> Result<(), EvalError> {
        let context = self
            .contexts
            .last_mut()
            .ok_or_else(|| scope_underflow("evaluation context"))?;
        for frame in context.frames.iter_mut().rev() {
            if let Some(slot) = frame.bindings.get_mut(name) {
                *slot = value;
                return Ok(());
            }
        }
        Err(undefined_variable(name))
    }

    // Pending closures

    /// Park a lambda whose closure is still incomplete in the innermost frame.
    pub fn park(&mut self, lambda: Gc<Lambda>) -> Result<(), EvalError> {
        self.current_frame()?.pending.push(lambda);
        Ok(())
    }

    /// Take the innermost frame's parked lambdas.
    pub fn take_pending(&mut self) -> Result<Vec<Gc<Lambda>>, EvalError> {
        Ok(std::mem::take(&mut self.current_frame()?.pending))
    }

    // Memoization

    pub fn memo(&self) -> &MemoTable {
        &self.memo
    }

    pub fn memo_mut(&mut self) -> &mut MemoTable {
        &mut self.memo
    }
}

impl Default for ContextStack {
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
mod tests;
