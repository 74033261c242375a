//! Variable and field names.

use std::borrow::Borrow;
use std::fmt;
use std::rc::Rc;

/// A variable, parameter or field name.
///
/// Cheap to clone (shared string). Compares and hashes by content, so names
/// produced by different compile passes agree.
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct Name(Rc<str>);

impl Name {
    /// Create a name.
    pub fn new(name: &str) -> Self {
        Name(Rc::from(name))
    }

    /// Synthetic placeholder `$index` for a positional call argument (1-based).
    pub fn positional(index: usize) -> Self {
        Name(Rc::from(format!("${index}")))
    }

    /// Whether this is a positional placeholder (`$1`, `$2`, ...).
    pub fn is_positional(&self) -> bool {
        self.0
            .strip_prefix('$')
            .is_some_and(|rest| !rest.is_empty() && rest.bytes().all(|b| b.is_ascii_digit()))
    }

    /// The name as a string slice.
    #[inline]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for Name {
    fn from(name: &str) -> Self {
        Name::new(name)
    }
}

impl Borrow<str> for Name {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Name {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl fmt::Debug for Name {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Name({})", self.0)
    }
}

#[cfg(test)]
#[allow(
    clippy::unwrap_used,
    clippy::expect_used,
    reason = "tests use unwrap to panic on unexpected state"
)]
