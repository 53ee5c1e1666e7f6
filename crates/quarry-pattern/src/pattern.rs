//! Pattern trees and the flat conjunction/disjunction containers produced by
//! normalization.

use crate::statement::Statement;
use std::fmt;
use std::hash::{Hash, Hasher};

const HASH_SEEDS: [u64; 4] = [
    0x9e37_79b9_7f4a_7c15,
    0xbf58_476d_1ce4_e5b9,
    0x94d0_49bb_1331_11eb,
    0x2545_f491_4f6c_dd1d,
];

/// Deterministic 64-bit hash of a value: ahash with fixed seeds, stable
/// across runs and processes.
pub(crate) fn hash_one<T: Hash + ?Sized>(value: &T) -> u64 {
    let [k0, k1, k2, k3] = HASH_SEEDS;
    ahash::RandomState::with_seeds(k0, k1, k2, k3).hash_one(value)
}

/// A query pattern as delivered by the parser.
///
/// The tree is never mutated; normalization builds new values.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Pattern {
    Statement(Statement),
    Conjunction(Vec<Pattern>),
    Disjunction(Vec<Pattern>),
    Negation(Box<Pattern>),
}

impl Pattern {
    pub fn and(patterns: impl IntoIterator<Item = Pattern>) -> Self {
        Pattern::Conjunction(patterns.into_iter().collect())
    }

    pub fn or(patterns: impl IntoIterator<Item = Pattern>) -> Self {
        Pattern::Disjunction(patterns.into_iter().collect())
    }

    pub fn not(pattern: impl Into<Pattern>) -> Self {
        Pattern::Negation(Box::new(pattern.into()))
    }

    /// Every statement in the tree (outer statements only), in traversal order.
    pub fn statements(&self) -> Vec<&Statement> {
        let mut out = Vec::new();
        self.collect_statements(&mut out);
        out
    }

    fn collect_statements<'a>(&'a self, out: &mut Vec<&'a Statement>) {
        match self {
            Pattern::Statement(statement) => out.push(statement),
            Pattern::Conjunction(children) | Pattern::Disjunction(children) => {
                for child in children {
                    child.collect_statements(out);
                }
            }
            Pattern::Negation(inner) => inner.collect_statements(out),
        }
    }
}

impl From<Statement> for Pattern {
    fn from(value: Statement) -> Self {
        Pattern::Statement(value)
    }
}

impl fmt::Display for Pattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Pattern::Statement(statement) => statement.fmt(f),
            Pattern::Conjunction(children) => {
                f.write_str("{ ")?;
                for child in children {
                    write!(f, "{child} ")?;
                }
                f.write_str("};")
            }
            Pattern::Disjunction(children) => {
                let parts: Vec<String> = children.iter().map(|c| format!("{{ {c} }}")).collect();
                write!(f, "{};", parts.join(" or "))
            }
            Pattern::Negation(inner) => write!(f, "not {{ {inner} }};"),
        }
    }
}

/// AND of `T`s with set semantics: duplicates collapse on construction (first
/// occurrence wins) and equality/hashing ignore order. Iteration order is the
/// construction order, so downstream compilation stays deterministic.
#[derive(Debug, Clone)]
pub struct Conjunction<T> {
    patterns: Vec<T>,
}

/// OR of `T`s with the same set semantics as [`Conjunction`].
#[derive(Debug, Clone)]
pub struct Disjunction<T> {
    patterns: Vec<T>,
}

macro_rules! set_container {
    ($name:ident) => {
        impl<T: PartialEq> $name<T> {
            pub fn new(items: impl IntoIterator<Item = T>) -> Self {
                let mut patterns: Vec<T> = Vec::new();
                for item in items {
                    if !patterns.contains(&item) {
                        patterns.push(item);
                    }
                }
                Self { patterns }
            }
        }

        impl<T> $name<T> {
            pub fn patterns(&self) -> &[T] {
                &self.patterns
            }

            pub fn into_patterns(self) -> Vec<T> {
                self.patterns
            }

            pub fn len(&self) -> usize {
                self.patterns.len()
            }

            pub fn is_empty(&self) -> bool {
                self.patterns.is_empty()
            }

            pub fn iter(&self) -> std::slice::Iter<'_, T> {
                self.patterns.iter()
            }
        }

        impl<T> Default for $name<T> {
            fn default() -> Self {
                Self {
                    patterns: Vec::new(),
                }
            }
        }

        impl<T: PartialEq> PartialEq for $name<T> {
            fn eq(&self, other: &Self) -> bool {
                self.patterns.len() == other.patterns.len()
                    && self.patterns.iter().all(|p| other.patterns.contains(p))
            }
        }

        impl<T: Eq> Eq for $name<T> {}

        impl<T: Hash> Hash for $name<T> {
            fn hash<H: Hasher>(&self, state: &mut H) {
                let mut hashes: Vec<u64> = self.patterns.iter().map(|p| hash_one(p)).collect();
                hashes.sort_unstable();
                hashes.hash(state);
            }
        }

        impl<'a, T> IntoIterator for &'a $name<T> {
            type Item = &'a T;
            type IntoIter = std::slice::Iter<'a, T>;

            fn into_iter(self) -> Self::IntoIter {
                self.patterns.iter()
            }
        }

        impl<T: PartialEq> FromIterator<T> for $name<T> {
            fn from_iter<I: IntoIterator<Item = T>>(iter: I) -> Self {
                Self::new(iter)
            }
        }
    };
}

set_container!(Conjunction);
set_container!(Disjunction);

impl Conjunction<Statement> {
    pub fn positive(&self) -> impl Iterator<Item = &Statement> {
        self.patterns.iter().filter(|s| !s.is_negative())
    }

    pub fn negative(&self) -> impl Iterator<Item = &Statement> {
        self.patterns.iter().filter(|s| s.is_negative())
    }
}

impl fmt::Display for Conjunction<Statement> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("{")?;
        for statement in &self.patterns {
            write!(f, " {statement}")?;
        }
        f.write_str(" }")
    }
}

impl fmt::Display for Disjunction<Conjunction<Statement>> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let parts: Vec<String> = self.patterns.iter().map(|c| c.to_string()).collect();
        f.write_str(&parts.join(" or "))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::variable::{VarGen, Variable};

    #[test]
    fn test_containers_are_sets() {
        let a = Conjunction::new([1, 2, 2, 3]);
        assert_eq!(a.patterns(), &[1, 2, 3]);
        assert_eq!(a, Conjunction::new([3, 1, 2]));
        assert_eq!(hash_one(&a), hash_one(&Conjunction::new([3, 2, 1])));
        assert_ne!(a, Conjunction::new([1, 2]));
    }

    #[test]
    fn test_statements_are_collected_in_traversal_order() {
        let mut gen = VarGen::new();
        let a = Statement::new(Variable::named("a")).isa_label(&mut gen, "t");
        let b = Statement::new(Variable::named("b")).isa_label(&mut gen, "t");
        let c = Statement::new(Variable::named("c")).isa_label(&mut gen, "t");
        let p = Pattern::and([
            a.clone().into(),
            Pattern::not(Pattern::or([b.clone().into(), c.clone().into()])),
        ]);
        let vars: Vec<_> = p.statements().iter().map(|s| s.var().clone()).collect();
        assert_eq!(vars, vec![a.var().clone(), b.var().clone(), c.var().clone()]);
    }
}
