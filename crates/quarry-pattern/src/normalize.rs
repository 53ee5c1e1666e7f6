//! Disjunctive normal form.
//!
//! Negation is pushed down the tree with De Morgan's laws until it reaches a
//! statement, where it becomes the statement's polarity:
//!
//! - `not { not P }` is `P`;
//! - `not { A; B; }` is `not A or not B`;
//! - `not { A or B }` is `not A; not B;`;
//! - `not { $x p1, p2; }` is `not { $x p1; } or not { $x p2; }` (property-level
//!   De Morgan, see [`Statement::units`]).
//!
//! Conjunctions are expanded as cartesian products of their children's
//! disjuncts, enumerated lexicographically in child order, so the output order
//! is a pure function of the input tree.

use crate::error::PatternError;
use crate::pattern::{Conjunction, Disjunction, Pattern};
use crate::statement::{Polarity, Statement};
use crate::typestate::{NormalizedPattern, ValidatedPattern};
use crate::variable::Variable;

pub type Dnf = Disjunction<Conjunction<Statement>>;

/// Guards against normalization blow-up (products of wide disjunctions).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NormalizeLimits {
    pub max_disjuncts: usize,
}

impl Default for NormalizeLimits {
    fn default() -> Self {
        Self { max_disjuncts: 1024 }
    }
}

impl Pattern {
    /// Flatten into an OR of ANDs whose only negations are negative
    /// single-unit statements.
    pub fn disjunctive_normal_form(&self) -> Dnf {
        expand(self, false)
            .into_iter()
            .map(Conjunction::new)
            .collect()
    }

    /// Upper bound on the number of disjuncts [`Self::disjunctive_normal_form`]
    /// produces, computed without expanding.
    pub fn disjunct_bound(&self) -> usize {
        count(self, false)
    }

    pub fn normalize(&self, limits: NormalizeLimits) -> Result<NormalizedPattern, PatternError> {
        let bound = self.disjunct_bound();
        if bound > limits.max_disjuncts {
            return Err(PatternError::TooManyDisjuncts {
                count: bound,
                limit: limits.max_disjuncts,
            });
        }
        let dnf = self.disjunctive_normal_form();
        tracing::debug!(disjuncts = dnf.len(), bound, "normalized pattern");
        Ok(NormalizedPattern::new_unchecked(dnf))
    }

    /// Normalize and check every disjunct is executable as a query.
    pub fn validate_query(&self, limits: NormalizeLimits) -> Result<ValidatedPattern, PatternError> {
        self.normalize(limits)?.validate()
    }
}

fn expand(pattern: &Pattern, negated: bool) -> Vec<Vec<Statement>> {
    match pattern {
        Pattern::Statement(statement) => expand_statement(statement, negated),
        Pattern::Negation(inner) => expand(inner, !negated),
        Pattern::Conjunction(children) if !negated => product(children, false),
        Pattern::Conjunction(children) => concat(children, true),
        Pattern::Disjunction(children) if !negated => concat(children, false),
        Pattern::Disjunction(children) => product(children, true),
    }
}

fn expand_statement(statement: &Statement, negated: bool) -> Vec<Vec<Statement>> {
    let effectively_negative = negated != statement.is_negative();
    if !effectively_negative {
        return vec![vec![statement.with_polarity(Polarity::Positive)]];
    }
    statement
        .with_polarity(Polarity::Negative)
        .units()
        .into_iter()
        .map(|unit| vec![unit])
        .collect()
}

fn concat(children: &[Pattern], negated: bool) -> Vec<Vec<Statement>> {
    children
        .iter()
        .flat_map(|child| expand(child, negated))
        .collect()
}

fn product(children: &[Pattern], negated: bool) -> Vec<Vec<Statement>> {
    let mut acc: Vec<Vec<Statement>> = vec![Vec::new()];
    for child in children {
        let disjuncts = expand(child, negated);
        let mut next = Vec::with_capacity(acc.len().saturating_mul(disjuncts.len()));
        for prefix in &acc {
            for disjunct in &disjuncts {
                let mut conj = prefix.clone();
                conj.extend(disjunct.iter().cloned());
                next.push(conj);
            }
        }
        acc = next;
    }
    acc
}

fn count(pattern: &Pattern, negated: bool) -> usize {
    match pattern {
        Pattern::Statement(statement) => {
            if negated != statement.is_negative() {
                statement.units().len()
            } else {
                1
            }
        }
        Pattern::Negation(inner) => count(inner, !negated),
        Pattern::Conjunction(children) if !negated => children
            .iter()
            .fold(1usize, |acc, c| acc.saturating_mul(count(c, false))),
        Pattern::Conjunction(children) => children
            .iter()
            .fold(0usize, |acc, c| acc.saturating_add(count(c, true))),
        Pattern::Disjunction(children) if !negated => children
            .iter()
            .fold(0usize, |acc, c| acc.saturating_add(count(c, false))),
        Pattern::Disjunction(children) => children
            .iter()
            .fold(1usize, |acc, c| acc.saturating_mul(count(c, true))),
    }
}

/// A conjunct is executable when it has at least one positive statement and
/// every negative statement shares a user-defined variable with the positive
/// part (the positive part is what binds the negation's variables).
pub fn validate_conjunction(conjunction: &Conjunction<Statement>) -> Result<(), PatternError> {
    let bound: Vec<Variable> = conjunction
        .positive()
        .flat_map(|s| s.user_variables())
        .collect();
    if conjunction.positive().next().is_none() {
        let reason = if conjunction.is_empty() {
            "empty conjunction"
        } else {
            "negation requires at least one positive conjunct to bound its variables"
        };
        return Err(PatternError::ill_formed(reason, conjunction));
    }
    for negative in conjunction.negative() {
        let shares = negative.user_variables().iter().any(|v| bound.contains(v));
        if !shares {
            return Err(PatternError::ill_formed(
                format!("variables of `{negative}` are not bound outside the negation"),
                conjunction,
            ));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::variable::VarGen;

    fn x() -> Variable {
        Variable::named("x")
    }

    #[test]
    fn test_positive_statement_is_its_own_dnf() {
        let mut gen = VarGen::new();
        let s = Statement::new(x()).isa_label(&mut gen, "person").has(&mut gen, "name", "a");
        let dnf = Pattern::from(s.clone()).disjunctive_normal_form();
        assert_eq!(dnf.len(), 1);
        assert_eq!(dnf.patterns()[0].patterns(), &[s]);
    }

    #[test]
    fn test_negative_polarity_statement_splits_like_a_negation() {
        let mut gen = VarGen::new();
        let s = Statement::new(x()).isa_label(&mut gen, "person").has(&mut gen, "name", "a");
        let via_polarity = Pattern::from(s.negated()).disjunctive_normal_form();
        let via_negation = Pattern::not(s).disjunctive_normal_form();
        assert_eq!(via_polarity, via_negation);
        assert_eq!(via_polarity.len(), 2);
    }

    #[test]
    fn test_bound_matches_expansion_before_dedup() {
        let mut gen = VarGen::new();
        let a = Statement::new(x()).isa_label(&mut gen, "a");
        let b = Statement::new(x()).isa_label(&mut gen, "b");
        let c = Statement::new(x()).isa_label(&mut gen, "c");
        let p = Pattern::and([
            Pattern::or([a.clone().into(), b.clone().into()]),
            Pattern::or([b.into(), c.into()]),
        ]);
        assert_eq!(p.disjunct_bound(), 4);
        assert_eq!(p.disjunctive_normal_form().len(), 4);
    }

    #[test]
    fn test_limits_reject_blow_up() {
        let mut gen = VarGen::new();
        let wide: Vec<Pattern> = (0..4)
            .map(|i| Statement::new(x()).isa_label(&mut gen, format!("t{i}")).into())
            .collect();
        let p = Pattern::and((0..6).map(|_| Pattern::or(wide.clone())));
        let err = p
            .normalize(NormalizeLimits { max_disjuncts: 100 })
            .unwrap_err();
        assert_eq!(err, PatternError::TooManyDisjuncts { count: 4096, limit: 100 });
    }

    #[test]
    fn test_empty_conjunction_is_not_a_query() {
        let err = Pattern::and([]).validate_query(NormalizeLimits::default()).unwrap_err();
        assert!(matches!(err, PatternError::IllFormed { .. }));
    }
}
