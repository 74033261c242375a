//! Lambdas and their closures.
//!
//! A [`LambdaTemplate`] is fixed at compile time: parameter names, the
//! compiled body and the free variables the body needs from its defining
//! scope. `MakeLambda` instantiates a template as a heap [`Lambda`] whose
//! closure holds whatever free variables were already bound. The rest are
//! filled in by `SetDependencies` once sibling bindings exist, which is how
//! a binding block gets self and mutual recursion. Closure entries are only
//! ever added, never removed.

use std::rc::Rc;

use rustc_hash::FxHashSet;

use crate::machine::Program;
use crate::name::Name;
use crate::value::Fields;

/// Compile-time description of a lambda.
#[derive(Clone, Debug)]
pub struct LambdaTemplate {
    pub params: Vec<Name>,
    pub body: Rc<Program>,
    /// Sorted, so closure capture order is deterministic.
    pub free: Vec<Name>,
}

impl LambdaTemplate {
    /// Build a template from the body's dependency set.
    ///
    /// The free set is the dependencies minus the parameters and minus the
    /// positional placeholders, which every call binds.
    pub fn new(params: Vec<Name>, body: Program, dependencies: FxHashSet<Name>) -> Self {
        let mut free: Vec<Name> = dependencies
            .into_iter()
            .filter(|name| !name.is_positional() && !params.contains(name))
            .collect();
        free.sort_unstable();
        LambdaTemplate {
            params,
            body: Rc::new(body),
            free,
        }
    }
}

/// A heap-resident callable.
#[derive(Clone, Debug, Default)]
pub struct Lambda {
    /// Name used in diagnostics and backtraces.
    pub label: Name,
    pub params: Vec<Name>,
    pub body: Rc<Program>,
    pub free: Vec<Name>,
    pub closure: Fields,
    pub fields: Fields,
}

impl Lambda {
    /// Instantiate a template with an empty closure.
    pub fn from_template(label: Name, template: &LambdaTemplate) -> Self {
        Lambda {
            label,
            params: template.params.clone(),
            body: Rc::clone(&template.body),
            free: template.free.clone(),
            closure: Fields::default(),
            fields: Fields::default(),
        }
    }

    pub fn arity(&self) -> usize {
        self.params.len()
    }

    /// Free variables not captured yet.
    pub fn unresolved(&self) -> impl Iterator<Item = &Name> {
        self.free
            .iter()
            .filter(|name| !self.closure.contains_key(*name))
    }

    pub fn is_complete(&self) -> bool {
        self.unresolved().next().is_none()
    }
}

#[cfg(test)]
#[allow(
    clippy::unwrap_used,
    clippy::expect_used,
    reason = "tests use unwrap to panic on unexpected state"
)]
mod tests;
