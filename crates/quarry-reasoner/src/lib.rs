//! Quarry reasoning core.
//!
//! The rule-resolution machinery sees a query as a set of [`Atomic`]s, one per
//! atomable property of each statement. This crate provides:
//!
//! - the atom model ([`Atomic`], [`AtomKind`]) and its owning
//!   [`ReasonerQuery`];
//! - two equivalence relations over atoms ([`AtomicEquivalence::Alpha`] and
//!   [`AtomicEquivalence::Structural`]), computed from canonical
//!   [`EquivalenceKey`]s so that equal keys always mean equal hashes;
//! - variable substitutions ([`Unifier`], [`MultiUnifier`]) and atom
//!   unification ([`Atomic::unify`]).
//!
//! Everything here is an immutable value: atoms and unifiers can be shared
//! freely across compilation passes.

pub mod atom;
pub mod equivalence;
pub mod query;
pub mod unifier;
pub mod unify;

pub use atom::{AtomKind, Atomic, IdConstant, QueryId, QueryIdGen};
pub use equivalence::{AtomFamilies, AtomicEquivalence, EquivalenceKey, EquivalenceWrapper};
pub use query::ReasonerQuery;
pub use unifier::{Answer, MultiUnifier, Unifier};
pub use unify::UnifierType;
