//! Expression trees and their compilation to machine programs.
//!
//! The parser hands over an [`Expr`]; [`Expr::compile`] appends the
//! equivalent items to a [`Program`] and [`Expr::dependencies`] reports the
//! names an expression reads from its enclosing scope. Compilation never
//! fails: a problem it can already see (an unknown primitive, a primitive
//! called with the wrong number of arguments) becomes an `Error` item that
//! halts the run only if execution reaches it.

use std::rc::Rc;

use rustc_hash::FxHashSet;

use crate::errors::{arity_mismatch, unknown_primitive};
use crate::lambda::LambdaTemplate;
use crate::machine::{Item, Op, Program};
use crate::name::Name;
use crate::primitives;
use crate::stack::ensure_sufficient_stack;
use crate::value::Value;

/// Infix operators. Each maps to a two-argument primitive.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BinaryOp {
    Add,
    Sub,
    Mul,
    Div,
    Pow,
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
    And,
    Or,
}

impl BinaryOp {
    pub fn primitive(self) -> &'static str {
        match self {
            BinaryOp::Add => "add",
            BinaryOp::Sub => "sub",
            BinaryOp::Mul => "mul",
            BinaryOp::Div => "div",
            BinaryOp::Pow => "pow",
            BinaryOp::Eq => "eq",
            BinaryOp::Ne => "ne",
            BinaryOp::Lt => "lt",
            BinaryOp::Le => "le",
            BinaryOp::Gt => "gt",
            BinaryOp::Ge => "ge",
            BinaryOp::And => "and",
            BinaryOp::Or => "or",
        }
    }
}

/// Prefix operators. Each maps to a one-argument primitive.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum UnaryOp {
    Neg,
    Not,
}

impl UnaryOp {
    pub fn primitive(self) -> &'static str {
        match self {
            UnaryOp::Neg => "neg",
            UnaryOp::Not => "not",
        }
    }
}

/// One entry of a `let` block.
#[derive(Clone, Debug)]
pub enum Binding {
    /// `a = e` or `a, b = e` (destructuring a cluster).
    Bind { targets: Vec<Name>, value: Expr },
    /// `t.f = e` or `t.f, u.g = e`: clone-then-mutate writes.
    SetField {
        targets: Vec<(Name, Name)>,
        value: Expr,
    },
}

impl Binding {
    pub fn bind(target: &str, value: Expr) -> Self {
        Binding::Bind {
            targets: vec![Name::new(target)],
            value,
        }
    }

    pub fn set_field(binding: &str, field: &str, value: Expr) -> Self {
        Binding::SetField {
            targets: vec![(Name::new(binding), Name::new(field))],
            value,
        }
    }
}

/// A parsed expression.
#[derive(Clone, Debug)]
pub enum Expr {
    Number(f64),
    Str(String),
    Bool(bool),
    Nil,
    Var(Name),
    /// Literal list.
    Cluster(Vec<Expr>),
    Binary {
        op: BinaryOp,
        lhs: Box<Expr>,
        rhs: Box<Expr>,
    },
    Unary {
        op: UnaryOp,
        operand: Box<Expr>,
    },
    /// Direct call of a named primitive.
    Primitive { name: Name, args: Vec<Expr> },
    If {
        cond: Box<Expr>,
        then: Box<Expr>,
        otherwise: Box<Expr>,
    },
    Let {
        bindings: Vec<Binding>,
        body: Box<Expr>,
    },
    Lambda {
        label: Name,
        params: Vec<Name>,
        body: Box<Expr>,
    },
    Call { callee: Box<Expr>, args: Vec<Expr> },
    Field { object: Box<Expr>, name: Name },
    /// `[body for var in source]`
    Comprehension {
        var: Name,
        source: Box<Expr>,
        body: Box<Expr>,
    },
    /// Stamps `line` on the ops compiled from `expr`.
    Located { line: u32, expr: Box<Expr> },
}

// Construction helpers

impl Expr {
    pub fn var(name: &str) -> Self {
        Expr::Var(Name::new(name))
    }

    pub fn string(s: &str) -> Self {
        Expr::Str(s.to_string())
    }

    pub fn binary(op: BinaryOp, lhs: Expr, rhs: Expr) -> Self {
        Expr::Binary {
            op,
            lhs: Box::new(lhs),
            rhs: Box::new(rhs),
        }
    }

    pub fn primitive(name: &str, args: Vec<Expr>) -> Self {
        Expr::Primitive {
            name: Name::new(name),
            args,
        }
    }

    pub fn if_else(cond: Expr, then: Expr, otherwise: Expr) -> Self {
        Expr::If {
            cond: Box::new(cond),
            then: Box::new(then),
            otherwise: Box::new(otherwise),
        }
    }

    pub fn let_in(bindings: Vec<Binding>, body: Expr) -> Self {
        Expr::Let {
            bindings,
            body: Box::new(body),
        }
    }

    pub fn lambda(label: &str, params: &[&str], body: Expr) -> Self {
        Expr::Lambda {
            label: Name::new(label),
            params: params.iter().map(|p| Name::new(p)).collect(),
            body: Box::new(body),
        }
    }

    pub fn call(callee: Expr, args: Vec<Expr>) -> Self {
        Expr::Call {
            callee: Box::new(callee),
            args,
        }
    }

    pub fn field(object: Expr, name: &str) -> Self {
        Expr::Field {
            object: Box::new(object),
            name: Name::new(name),
        }
    }

    pub fn comprehension(var: &str, source: Expr, body: Expr) -> Self {
        Expr::Comprehension {
            var: Name::new(var),
            source: Box::new(source),
            body: Box::new(body),
        }
    }

    #[must_use]
    pub fn at_line(self, line: u32) -> Self {
        Expr::Located {
            line,
            expr: Box::new(self),
        }
    }
}

// Compilation

impl Expr {
    /// Append the items that evaluate this expression to `program`.
    ///
    /// Running the items leaves exactly one value on the operand stack.
    pub fn compile(&self, program: &mut Program) {
        self.emit(program, None);
    }

    /// Compile into a fresh program.
    pub fn to_program(&self) -> Program {
        let mut program = Program::new();
        self.compile(&mut program);
        program
    }

    fn emit(&self, program: &mut Program, line: Option<u32>) {
        ensure_sufficient_stack(|| self.emit_node(program, line));
    }

    fn emit_node(&self, program: &mut Program, line: Option<u32>) {
        match self {
            Expr::Number(n) => program.push_value(*n),
            Expr::Str(s) => program.push_value(Value::string(s)),
            Expr::Bool(b) => program.push_value(*b),
            Expr::Nil => program.push_value(Value::Nil),
            Expr::Var(name) => {
                program.push_variable(name.clone());
                program.push_op(Op::GetVariable, line);
            }
            Expr::Cluster(items) => {
                for item in items {
                    item.emit(program, line);
                }
                program.push_op(Op::Pure(primitives::cluster(items.len())), line);
            }
            Expr::Binary { op, lhs, rhs } => {
                lhs.emit(program, line);
                rhs.emit(program, line);
                emit_primitive(program, &Name::new(op.primitive()), 2, line);
            }
            Expr::Unary { op, operand } => {
                operand.emit(program, line);
                emit_primitive(program, &Name::new(op.primitive()), 1, line);
            }
            Expr::Primitive { name, args } => {
                for arg in args {
                    arg.emit(program, line);
                }
                emit_primitive(program, name, args.len(), line);
            }
            Expr::If {
                cond,
                then,
                otherwise,
            } => {
                cond.emit(program, line);
                program.push_op(
                    Op::If {
                        then: Rc::new(branch(then, line)),
                        otherwise: Rc::new(branch(otherwise, line)),
                    },
                    line,
                );
            }
            Expr::Let { bindings, body } => {
                program.push_op(Op::PushFrame, line);
                for binding in bindings {
                    emit_binding(binding, program, line);
                }
                program.push_op(Op::SetDependencies, line);
                body.emit(program, line);
                program.push_op(Op::PopFrame, line);
            }
            Expr::Lambda {
                label,
                params,
                body,
            } => {
                let template =
                    LambdaTemplate::new(params.clone(), branch(body, line), body.dependencies());
                program.push_variable(label.clone());
                program.push_op(Op::MakeLambda(Rc::new(template)), line);
            }
            Expr::Call { callee, args } => {
                // Looking up a zero-parameter lambda already calls it.
                if args.is_empty() && matches!(**callee, Expr::Var(_)) {
                    callee.emit(program, line);
                    return;
                }
                callee.emit(program, line);
                for arg in args {
                    arg.emit(program, line);
                }
                program.push_op(Op::Call(args.len()), line);
            }
            Expr::Field { object, name } => {
                object.emit(program, line);
                program.push_op(Op::GetField(name.clone()), line);
            }
            Expr::Comprehension { var, source, body } => {
                source.emit(program, line);
                program.push_op(
                    Op::Iterate {
                        var: var.clone(),
                        index: 0,
                        body: Rc::new(branch(body, line)),
                    },
                    line,
                );
            }
            Expr::Located { line, expr } => expr.emit(program, Some(*line)),
        }
    }
}

fn branch(expr: &Expr, line: Option<u32>) -> Program {
    let mut program = Program::new();
    expr.emit(&mut program, line);
    program
}

fn emit_binding(binding: &Binding, program: &mut Program, line: Option<u32>) {
    match binding {
        Binding::Bind { targets, value } => {
            value.emit(program, line);
            for target in targets {
                program.push_variable(target.clone());
            }
            program.push_op(Op::Assign(targets.len()), line);
        }
        Binding::SetField { targets, value } => {
            value.emit(program, line);
            for (binding, field) in targets {
                program.push_variable(binding.clone());
                program.push_op(Op::GetFieldRef(field.clone()), line);
            }
            program.push_op(Op::SetField(targets.len()), line);
        }
    }
}

fn emit_primitive(program: &mut Program, name: &Name, arity: usize, line: Option<u32>) {
    let item = match primitives::lookup(name.as_str()) {
        Some(f) if f.arity() == arity => {
            program.push_op(Op::Pure(f), line);
            return;
        }
        Some(f) => arity_mismatch(name, f.arity(), arity),
        None => unknown_primitive(name),
    };
    program.push(Item::Error(item.at_line(line)));
}

// Dependencies

impl Expr {
    /// Names this expression reads from its enclosing scope.
    pub fn dependencies(&self) -> FxHashSet<Name> {
        let mut out = FxHashSet::default();
        self.collect_dependencies(&mut out);
        out
    }

    fn collect_dependencies(&self, out: &mut FxHashSet<Name>) {
        ensure_sufficient_stack(|| self.collect_node_dependencies(out));
    }

    fn collect_node_dependencies(&self, out: &mut FxHashSet<Name>) {
        match self {
            Expr::Number(_) | Expr::Str(_) | Expr::Bool(_) | Expr::Nil => {}
            Expr::Var(name) => {
                out.insert(name.clone());
            }
            Expr::Cluster(items) | Expr::Primitive { args: items, .. } => {
                for item in items {
                    item.collect_dependencies(out);
                }
            }
            Expr::Binary { lhs, rhs, .. } => {
                lhs.collect_dependencies(out);
                rhs.collect_dependencies(out);
            }
            Expr::Unary { operand, .. } => operand.collect_dependencies(out),
            Expr::If {
                cond,
                then,
                otherwise,
            } => {
                cond.collect_dependencies(out);
                then.collect_dependencies(out);
                otherwise.collect_dependencies(out);
            }
            Expr::Let { bindings, body } => {
                let mut inner = body.dependencies();
                let mut bound = FxHashSet::default();
                for binding in bindings {
                    match binding {
                        Binding::Bind { targets, value } => {
                            bound.extend(targets.iter().cloned());
                            value.collect_dependencies(&mut inner);
                        }
                        Binding::SetField { targets, value } => {
                            inner.extend(targets.iter().map(|(b, _)| b.clone()));
                            value.collect_dependencies(&mut inner);
                        }
                    }
                }
                out.extend(inner.into_iter().filter(|name| !bound.contains(name)));
            }
            Expr::Lambda { params, body, .. } => {
                out.extend(
                    body.dependencies()
                        .into_iter()
                        .filter(|name| !name.is_positional() && !params.contains(name)),
                );
            }
            Expr::Call { callee, args } => {
                callee.collect_dependencies(out);
                for arg in args {
                    arg.collect_dependencies(out);
                }
            }
            Expr::Field { object, .. } => object.collect_dependencies(out),
            Expr::Comprehension { var, source, body } => {
                source.collect_dependencies(out);
                out.extend(body.dependencies().into_iter().filter(|name| name != var));
            }
            Expr::Located { expr, .. } => expr.collect_dependencies(out),
        }
    }
}

impl From<f64> for Expr {
    fn from(n: f64) -> Self {
        Expr::Number(n)
    }
}

impl From<bool> for Expr {
    fn from(b: bool) -> Self {
        Expr::Bool(b)
    }
}

#[cfg(test)]
#[allow(
    clippy::unwrap_used,
    clippy::expect_used,
    reason = "tests use unwrap to panic on unexpected state"
)]
