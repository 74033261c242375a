//! Evaluation errors.
//!
//! Every failure aborts the current run: the interpreter has no I/O and no
//! transient failures, so nothing is retried and no partial result is
//! returned.
//!
//! # Structured Error Categories
//!
//! `EvalErrorKind` carries structured data for each failure. The factory
//! functions at the bottom of this module are the public way to build
//! errors; they populate both `kind` and `message`.
//!
//! Kinds fall into two groups (see [`EvalErrorKind::is_internal`]):
//! - interpreter/invariant errors (operand underflow, scope imbalance,
//!   corrupt graph bookkeeping, operand type mismatches)
//! - domain errors a malformed script can trigger (unknown variable or
//!   field, arity mismatch, cloning a field-ref, bad geometry)

use std::fmt;

use tess_graph::GraphError;

use crate::name::Name;
use crate::value::Value;

/// Result of evaluation.
pub type EvalResult = Result<Value, EvalError>;

/// Typed error category.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum EvalErrorKind {
    // Interpreter invariants
    StackUnderflow {
        op: &'static str,
        needed: usize,
        found: usize,
    },
    ScopeUnderflow {
        what: &'static str,
    },
    UnbalancedScope {
        what: &'static str,
        expected: usize,
        found: usize,
    },
    MalformedProgram {
        detail: String,
    },
    TypeMismatch {
        expected: &'static str,
        got: &'static str,
    },
    Graph(GraphError),

    // Script errors
    UndefinedVariable {
        name: Name,
    },
    UndefinedField {
        field: Name,
        type_name: &'static str,
    },
    ArityMismatch {
        name: Name,
        expected: usize,
        got: usize,
    },
    NotCallable {
        type_name: &'static str,
    },
    NotAFieldTarget {
        type_name: &'static str,
    },
    CannotCloneFieldRef,
    DestructureMismatch {
        expected: usize,
        got: usize,
    },
    InvalidGeometry {
        message: String,
    },
    DivisionByZero,
    OutOfDomain {
        function: &'static str,
        input: String,
    },
    UnknownPrimitive {
        name: Name,
    },

    // Resource limits
    StackOverflow {
        depth: usize,
    },
    StepBudgetExceeded {
        limit: u64,
    },

    /// Catch-all for errors without a structured kind.
    Custom {
        message: String,
    },
}

impl EvalErrorKind {
    /// Whether this kind indicates an interpreter bug rather than a
    /// malformed script.
    pub fn is_internal(&self) -> bool {
        matches!(
            self,
            Self::StackUnderflow { .. }
                | Self::ScopeUnderflow { .. }
                | Self::UnbalancedScope { .. }
                | Self::MalformedProgram { .. }
                | Self::TypeMismatch { .. }
                | Self::Graph(_)
        )
    }
}

impl fmt::Display for EvalErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::StackUnderflow { op, needed, found } => write!(
                f,
                "operand stack underflow in `{op}`: needs {needed}, found {found}"
            ),
            Self::ScopeUnderflow { what } => write!(f, "cannot pop {what}: none active"),
            Self::UnbalancedScope {
                what,
                expected,
                found,
            } => write!(
                f,
                "unbalanced scopes at end of run: expected {expected} {what}(s), found {found}"
            ),
            Self::MalformedProgram { detail } => write!(f, "malformed program: {detail}"),
            Self::TypeMismatch { expected, got } => {
                write!(f, "type mismatch: expected {expected}, got {got}")
            }
            Self::Graph(err) => write!(f, "{err}"),

            Self::UndefinedVariable { name } => write!(f, "undefined variable: {name}"),
            Self::UndefinedField { field, type_name } => {
                write!(f, "no field `{field}` on {type_name}")
            }
            Self::ArityMismatch {
                name,
                expected,
                got,
            } => {
                let arg_word = if *expected == 1 {
                    "argument"
                } else {
                    "arguments"
                };
                write!(f, "{name} expects {expected} {arg_word}, got {got}")
            }
            Self::NotCallable { type_name } => write!(f, "{type_name} is not callable"),
            Self::NotAFieldTarget { type_name } => {
                write!(f, "cannot assign a field of {type_name}")
            }
            Self::CannotCloneFieldRef => write!(f, "a field reference cannot be copied"),
            Self::DestructureMismatch { expected, got } => write!(
                f,
                "cannot destructure {got} value(s) into {expected} target(s)"
            ),
            Self::InvalidGeometry { message } => write!(f, "invalid geometry: {message}"),
            Self::DivisionByZero => write!(f, "division by zero"),
            Self::OutOfDomain { function, input } => {
                write!(f, "{function} is undefined for {input}")
            }
            Self::UnknownPrimitive { name } => write!(f, "unknown primitive: {name}"),

            Self::StackOverflow { depth } => {
                write!(f, "maximum call depth exceeded (limit: {depth})")
            }
            Self::StepBudgetExceeded { limit } => {
                write!(f, "evaluation step budget exceeded (limit: {limit})")
            }

            Self::Custom { message } => write!(f, "{message}"),
        }
    }
}

/// Evaluation error.
#[derive(Clone, Debug)]
pub struct EvalError {
    /// Structured error category.
    pub kind: EvalErrorKind,
    /// Human-readable message; equals `kind.to_string()` for factory errors.
    pub message: String,
    /// Source line of the instruction that failed, when known.
    pub line: Option<u32>,
    /// Labels of the lambdas being evaluated when the error occurred,
    /// outermost first.
    pub backtrace: Vec<Name>,
}

impl EvalError {
    /// Create an error with just a message.
    pub fn new(message: impl Into<String>) -> Self {
        let message = message.into();
        Self::from_kind(EvalErrorKind::Custom { message })
    }

    /// Create an error from a structured kind.
    fn from_kind(kind: EvalErrorKind) -> Self {
        let message = kind.to_string();
        EvalError {
            kind,
            message,
            line: None,
            backtrace: Vec::new(),
        }
    }

    /// Attach a source line unless one is already known.
    #[must_use]
    pub fn at_line(mut self, line: Option<u32>) -> Self {
        if self.line.is_none() {
            self.line = line;
        }
        self
    }

    /// Attach the active call chain unless one is already recorded.
    #[must_use]
    pub fn with_backtrace(mut self, backtrace: Vec<Name>) -> Self {
        if self.backtrace.is_empty() {
            self.backtrace = backtrace;
        }
        self
    }
}

impl PartialEq for EvalError {
    fn eq(&self, other: &Self) -> bool {
        self.kind == other.kind && self.line == other.line
    }
}

impl fmt::Display for EvalError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(line) = self.line {
            write!(f, "line {line}: ")?;
        }
        f.write_str(&self.message)?;
        if !self.backtrace.is_empty() {
            write!(f, " (in ")?;
            for (i, frame) in self.backtrace.iter().enumerate() {
                if i > 0 {
                    write!(f, " -> ")?;
                }
                write!(f, "{frame}")?;
            }
            write!(f, ")")?;
        }
        Ok(())
    }
}

impl std::error::Error for EvalError {}

impl From<GraphError> for EvalError {
    fn from(err: GraphError) -> Self {
        EvalError::from_kind(EvalErrorKind::Graph(err))
    }
}

// Interpreter invariant errors

#[cold]
pub fn stack_underflow(op: &'static str, needed: usize, found: usize) -> EvalError {
    EvalError::from_kind(EvalErrorKind::StackUnderflow { op, needed, found })
}

#[cold]
pub fn scope_underflow(what: &'static str) -> EvalError {
    EvalError::from_kind(EvalErrorKind::ScopeUnderflow { what })
}

#[cold]
pub fn unbalanced_scope(what: &'static str, expected: usize, found: usize) -> EvalError {
    EvalError::from_kind(EvalErrorKind::UnbalancedScope {
        what,
        expected,
        found,
    })
}

#[cold]
pub fn malformed_program(detail: impl Into<String>) -> EvalError {
    EvalError::from_kind(EvalErrorKind::MalformedProgram {
        detail: detail.into(),
    })
}

#[cold]
pub fn type_mismatch(expected: &'static str, got: &'static str) -> EvalError {
    EvalError::from_kind(EvalErrorKind::TypeMismatch { expected, got })
}

// Script errors

#[cold]
pub fn undefined_variable(name: &Name) -> EvalError {
    EvalError::from_kind(EvalErrorKind::UndefinedVariable { name: name.clone() })
}

#[cold]
pub fn undefined_field(field: &Name, type_name: &'static str) -> EvalError {
    EvalError::from_kind(EvalErrorKind::UndefinedField {
        field: field.clone(),
        type_name,
    })
}

#[cold]
pub fn arity_mismatch(name: &Name, expected: usize, got: usize) -> EvalError {
    EvalError::from_kind(EvalErrorKind::ArityMismatch {
        name: name.clone(),
        expected,
        got,
    })
}

#[cold]
pub fn not_callable(type_name: &'static str) -> EvalError {
    EvalError::from_kind(EvalErrorKind::NotCallable { type_name })
}

#[cold]
pub fn not_a_field_target(type_name: &'static str) -> EvalError {
    EvalError::from_kind(EvalErrorKind::NotAFieldTarget { type_name })
}

#[cold]
pub fn cannot_clone_field_ref() -> EvalError {
    EvalError::from_kind(EvalErrorKind::CannotCloneFieldRef)
}

#[cold]
pub fn destructure_mismatch(expected: usize, got: usize) -> EvalError {
    EvalError::from_kind(EvalErrorKind::DestructureMismatch { expected, got })
}

#[cold]
pub fn invalid_geometry(message: impl Into<String>) -> EvalError {
    EvalError::from_kind(EvalErrorKind::InvalidGeometry {
        message: message.into(),
    })
}

#[cold]
pub fn division_by_zero() -> EvalError {
    EvalError::from_kind(EvalErrorKind::DivisionByZero)
}

#[cold]
pub fn out_of_domain(function: &'static str, input: impl fmt::Display) -> EvalError {
    EvalError::from_kind(EvalErrorKind::OutOfDomain {
        function,
        input: input.to_string(),
    })
}

#[cold]
pub fn unknown_primitive(name: &Name) -> EvalError {
    EvalError::from_kind(EvalErrorKind::UnknownPrimitive { name: name.clone() })
}

// Resource limits

#[cold]
pub fn stack_overflow(depth: usize) -> EvalError {
    EvalError::from_kind(EvalErrorKind::StackOverflow { depth })
}

#[cold]
pub fn step_budget_exceeded(limit: u64) -> EvalError {
    EvalError::from_kind(EvalErrorKind::StepBudgetExceeded { limit })
}

#[cfg(test)]
#[allow(
    clippy::unwrap_used,
    clippy::expect_used,
    reason = "tests use unwrap to panic on unexpected state"
)]
