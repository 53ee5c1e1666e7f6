//! Typestate wrappers for normalization invariants.
//!
//! Small newtypes that record in the type system how far a pattern has been
//! processed, so compiler entry points can demand exactly what they need:
//!
//! - [`NormalizedPattern`]: a DNF whose negations are single-unit statements.
//! - [`ValidatedPattern`]: a normalized pattern whose every disjunct is
//!   executable (no bare or unbound negation).

use crate::error::PatternError;
use crate::normalize::{validate_conjunction, Dnf};
use crate::pattern::Conjunction;
use crate::statement::Statement;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NormalizedPattern(Dnf);

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidatedPattern(Dnf);

impl NormalizedPattern {
    pub(crate) fn new_unchecked(dnf: Dnf) -> Self {
        Self(dnf)
    }

    /// Construct a `NormalizedPattern` by checking the normal-form invariant.
    pub fn new_checked(dnf: Dnf) -> Result<Self, PatternError> {
        for conjunction in &dnf {
            for statement in conjunction.negative() {
                if statement.units().len() > 1 {
                    return Err(PatternError::NotNormalized {
                        reason: format!("negative statement `{statement}` has more than one unit"),
                    });
                }
            }
        }
        Ok(Self(dnf))
    }

    pub fn as_dnf(&self) -> &Dnf {
        &self.0
    }

    pub fn into_dnf(self) -> Dnf {
        self.0
    }

    pub fn validate(self) -> Result<ValidatedPattern, PatternError> {
        if self.0.is_empty() {
            return Err(PatternError::IllFormed {
                reason: "pattern has no disjuncts".to_string(),
                pattern: String::new(),
            });
        }
        for conjunction in &self.0 {
            validate_conjunction(conjunction)?;
        }
        Ok(ValidatedPattern(self.0))
    }
}

impl ValidatedPattern {
    pub fn as_dnf(&self) -> &Dnf {
        &self.0
    }

    pub fn into_dnf(self) -> Dnf {
        self.0
    }

    pub fn conjunctions(&self) -> &[Conjunction<Statement>] {
        self.0.patterns()
    }
}
