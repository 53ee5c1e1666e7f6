//! Quarry pattern algebra.
//!
//! This crate defines the already-parsed query object model consumed by the
//! compiler and the reasoner:
//!
//! - **Variables**: user-defined (`$x`) or generated from an explicit
//!   [`VarGen`] owned by the compiling context.
//! - **Properties**: a closed set of facts about one variable (`isa`, `has`,
//!   relation role players, value predicates, ...).
//! - **Statements**: properties predicated on one principal variable, with a
//!   polarity.
//! - **Patterns**: conjunction / disjunction / negation trees over statements.
//!
//! The main transformation is [`Pattern::disjunctive_normal_form`], which
//! pushes negation down to single-unit statements (De Morgan at both the
//! pattern and the property level) and flattens the tree into an OR of ANDs.
//!
//! Non-goals: the textual grammar of the query language. Patterns are built
//! programmatically (see the builder methods on [`Statement`]).

pub mod concept;
pub mod error;
pub mod normalize;
pub mod pattern;
pub mod property;
pub mod statement;
pub mod typestate;
pub mod value;
pub mod variable;

pub use concept::{ConceptId, Label};
pub use error::PatternError;
pub use normalize::{validate_conjunction, Dnf, NormalizeLimits};
pub use pattern::{Conjunction, Disjunction, Pattern};
pub use property::{Property, PropertyKind, RolePlayer, TypeRef};
pub use statement::{Polarity, Statement};
pub use typestate::{NormalizedPattern, ValidatedPattern};
pub use value::{Comparator, Operand, Value, ValuePredicate, ValueType};
pub use variable::{VarGen, Variable};
