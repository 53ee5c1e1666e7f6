//! Variable namespace.

use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

/// A logical slot in a pattern.
///
/// - `Named` variables come from the query text (`$x`) and compare by name.
/// - `Generated` variables are system slots (implicit types, attribute
///   values, role-player edges) and compare by their counter value.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Variable {
    Named(Arc<str>),
    Generated(u64),
}

impl Variable {
    pub fn named(name: impl AsRef<str>) -> Self {
        Variable::Named(Arc::from(name.as_ref()))
    }

    pub fn is_user_defined(&self) -> bool {
        matches!(self, Variable::Named(_))
    }

    pub fn name(&self) -> Option<&str> {
        match self {
            Variable::Named(name) => Some(name),
            Variable::Generated(_) => None,
        }
    }
}

impl fmt::Display for Variable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Variable::Named(name) => write!(f, "${name}"),
            Variable::Generated(id) => write!(f, "$_{id}"),
        }
    }
}

/// Allocator for generated variables.
///
/// One `VarGen` is owned by each compilation context; there is no global
/// counter, so two independent contexts may hand out the same ids.
#[derive(Debug, Default, Clone)]
pub struct VarGen {
    next: u64,
}

impl VarGen {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start allocating at `next` (used when a context resumes a pass).
    pub fn starting_at(next: u64) -> Self {
        Self { next }
    }

    pub fn fresh(&mut self) -> Variable {
        let id = self.next;
        self.next += 1;
        Variable::Generated(id)
    }

    pub fn allocated(&self) -> u64 {
        self.next
    }
}

/// Shape-level view of a variable used by statement equality.
///
/// Two generated variables are interchangeable here: statements that differ
/// only in their anonymous slots describe the same thing, even when they were
/// built by two different `VarGen`s.
#[derive(Debug, Clone, Copy)]
pub(crate) struct VarShape<'a>(pub(crate) &'a Variable);

impl PartialEq for VarShape<'_> {
    fn eq(&self, other: &Self) -> bool {
        match (self.0, other.0) {
            (Variable::Named(a), Variable::Named(b)) => a == b,
            (Variable::Generated(_), Variable::Generated(_)) => true,
            _ => false,
        }
    }
}

impl Eq for VarShape<'_> {}

impl Hash for VarShape<'_> {
    fn hash<H: Hasher>(&self, state: &mut H) {
        match self.0 {
            Variable::Named(name) => {
                0u8.hash(state);
                name.hash(state);
            }
            Variable::Generated(_) => 1u8.hash(state),
        }
    }
}
