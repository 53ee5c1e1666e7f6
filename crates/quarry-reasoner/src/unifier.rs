//! Variable substitutions.
//!
//! A [`Unifier`] is an immutable many-to-many mapping from child variables to
//! parent variables, stored as a sorted multimap so equality and hashing are
//! by mapping set. The empty unifier is the identity; "no unifier exists" is
//! the separate [`Unifier::NonExistent`] value.

use quarry_pattern::{ConceptId, Variable};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

/// A substitution answer: variable → stored concept.
pub type Answer = BTreeMap<Variable, ConceptId>;

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Unifier {
    /// Unification failed; absorbing under [`Unifier::merge`].
    NonExistent,
    /// Child variable → parent variables. Never holds an empty value set.
    Mapping(BTreeMap<Variable, BTreeSet<Variable>>),
}

impl Default for Unifier {
    fn default() -> Self {
        Unifier::trivial()
    }
}

impl Unifier {
    pub fn trivial() -> Self {
        Unifier::Mapping(BTreeMap::new())
    }

    pub fn non_existent() -> Self {
        Unifier::NonExistent
    }

    pub fn from_pairs(pairs: impl IntoIterator<Item = (Variable, Variable)>) -> Self {
        let mut map: BTreeMap<Variable, BTreeSet<Variable>> = BTreeMap::new();
        for (from, to) in pairs {
            map.entry(from).or_default().insert(to);
        }
        Unifier::Mapping(map)
    }

    pub fn is_non_existent(&self) -> bool {
        matches!(self, Unifier::NonExistent)
    }

    /// The identity: exists and maps nothing.
    pub fn is_empty(&self) -> bool {
        match self {
            Unifier::NonExistent => false,
            Unifier::Mapping(map) => map.is_empty(),
        }
    }

    /// Number of `(from, to)` pairs.
    pub fn len(&self) -> usize {
        match self {
            Unifier::NonExistent => 0,
            Unifier::Mapping(map) => map.values().map(BTreeSet::len).sum(),
        }
    }

    pub fn mappings(&self) -> impl Iterator<Item = (&Variable, &Variable)> {
        self.map()
            .into_iter()
            .flat_map(|map| map.iter())
            .flat_map(|(from, targets)| targets.iter().map(move |to| (from, to)))
    }

    pub fn keys(&self) -> impl Iterator<Item = &Variable> {
        self.map().into_iter().flat_map(|map| map.keys())
    }

    /// All target variables, without duplicates.
    pub fn values(&self) -> BTreeSet<&Variable> {
        self.mappings().map(|(_, to)| to).collect()
    }

    pub fn get(&self, var: &Variable) -> Option<&BTreeSet<Variable>> {
        self.map().and_then(|map| map.get(var))
    }

    pub fn contains_key(&self, var: &Variable) -> bool {
        self.get(var).is_some()
    }

    /// Union of both mapping sets. Non-existent on either side wins.
    pub fn merge(&self, other: &Unifier) -> Unifier {
        match (self, other) {
            (Unifier::Mapping(a), Unifier::Mapping(b)) => {
                let mut merged = a.clone();
                for (from, targets) in b {
                    merged
                        .entry(from.clone())
                        .or_default()
                        .extend(targets.iter().cloned());
                }
                Unifier::Mapping(merged)
            }
            _ => Unifier::NonExistent,
        }
    }

    /// Swap every pair.
    pub fn inverse(&self) -> Unifier {
        match self {
            Unifier::NonExistent => Unifier::NonExistent,
            Unifier::Mapping(_) => {
                Unifier::from_pairs(self.mappings().map(|(from, to)| (to.clone(), from.clone())))
            }
        }
    }

    /// True when every pair of `other` is a pair of `self`.
    pub fn contains_all(&self, other: &Unifier) -> bool {
        match (self, other) {
            (Unifier::NonExistent, Unifier::NonExistent) => true,
            (Unifier::Mapping(map), Unifier::Mapping(_)) => other
                .mappings()
                .all(|(from, to)| map.get(from).is_some_and(|targets| targets.contains(to))),
            _ => false,
        }
    }

    /// Translate `var`; unmapped variables map to themselves.
    pub fn apply(&self, var: &Variable) -> Vec<Variable> {
        match self {
            Unifier::NonExistent => Vec::new(),
            Unifier::Mapping(map) => match map.get(var) {
                Some(targets) => targets.iter().cloned().collect(),
                None => vec![var.clone()],
            },
        }
    }

    /// Rewrite a child answer into the parent's variable space.
    ///
    /// `None` when two child variables land on the same parent variable with
    /// different concepts, or when the unifier does not exist.
    pub fn translate_answer(&self, answer: &Answer) -> Option<Answer> {
        if self.is_non_existent() {
            return None;
        }
        let mut translated = Answer::new();
        for (var, concept) in answer {
            for to in self.apply(var) {
                match translated.insert(to, *concept) {
                    Some(previous) if previous != *concept => return None,
                    _ => {}
                }
            }
        }
        Some(translated)
    }

    /// One-to-one in both directions.
    pub fn is_bijective(&self) -> bool {
        match self {
            Unifier::NonExistent => false,
            Unifier::Mapping(map) => {
                map.values().all(|targets| targets.len() == 1) && self.values().len() == map.len()
            }
        }
    }

    fn map(&self) -> Option<&BTreeMap<Variable, BTreeSet<Variable>>> {
        match self {
            Unifier::NonExistent => None,
            Unifier::Mapping(map) => Some(map),
        }
    }
}

impl FromIterator<(Variable, Variable)> for Unifier {
    fn from_iter<I: IntoIterator<Item = (Variable, Variable)>>(iter: I) -> Self {
        Unifier::from_pairs(iter)
    }
}

impl fmt::Display for Unifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Unifier::NonExistent => f.write_str("{ non-existent }"),
            Unifier::Mapping(_) => {
                let parts: Vec<String> = self.mappings().map(|(a, b)| format!("{a} -> {b}")).collect();
                write!(f, "{{{}}}", parts.join(", "))
            }
        }
    }
}

/// A set of alternative unifiers.
///
/// Relations with repeated or untyped roles can pair up in several ways; each
/// valid pairing is one member. The empty set means unification failed.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct MultiUnifier {
    unifiers: BTreeSet<Unifier>,
}

impl MultiUnifier {
    pub fn trivial() -> Self {
        Self::single(Unifier::trivial())
    }

    pub fn non_existent() -> Self {
        Self::default()
    }

    pub fn single(unifier: Unifier) -> Self {
        std::iter::once(unifier).collect()
    }

    pub fn is_non_existent(&self) -> bool {
        self.unifiers.is_empty()
    }

    pub fn len(&self) -> usize {
        self.unifiers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.unifiers.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Unifier> {
        self.unifiers.iter()
    }

    /// The only member, when there is exactly one.
    pub fn unique(&self) -> Option<&Unifier> {
        if self.unifiers.len() == 1 {
            self.unifiers.iter().next()
        } else {
            None
        }
    }

    pub fn inverse(&self) -> MultiUnifier {
        self.unifiers.iter().map(Unifier::inverse).collect()
    }

    /// True when some member contains all pairs of `unifier`.
    pub fn contains_specialisation_of(&self, unifier: &Unifier) -> bool {
        self.unifiers.iter().any(|u| u.contains_all(unifier))
    }
}

impl FromIterator<Unifier> for MultiUnifier {
    fn from_iter<I: IntoIterator<Item = Unifier>>(iter: I) -> Self {
        Self {
            unifiers: iter.into_iter().filter(|u| !u.is_non_existent()).collect(),
        }
    }
}

impl IntoIterator for MultiUnifier {
    type Item = Unifier;
    type IntoIter = std::collections::btree_set::IntoIter<Unifier>;

    fn into_iter(self) -> Self::IntoIter {
        self.unifiers.into_iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn v(name: &str) -> Variable {
        Variable::named(name)
    }

    #[test]
    fn test_trivial_is_identity() {
        let u = Unifier::trivial();
        assert!(u.is_empty());
        assert_eq!(u.apply(&v("x")), vec![v("x")]);
        assert_eq!(u.inverse(), u);
    }

    #[test]
    fn test_non_existent_absorbs_merge() {
        let u = Unifier::from_pairs([(v("x"), v("y"))]);
        assert!(u.merge(&Unifier::non_existent()).is_non_existent());
        assert!(Unifier::non_existent().merge(&u).is_non_existent());
        assert!(Unifier::non_existent().inverse().is_non_existent());
        assert!(!Unifier::non_existent().is_empty());
    }

    #[test]
    fn test_multimap_accessors() {
        let u = Unifier::from_pairs([(v("x"), v("a")), (v("x"), v("b")), (v("y"), v("a"))]);
        assert_eq!(u.len(), 3);
        assert_eq!(u.keys().cloned().collect::<Vec<_>>(), vec![v("x"), v("y")]);
        assert_eq!(u.values().len(), 2);
        assert!(u.contains_key(&v("x")));
        assert!(!u.contains_key(&v("a")));
        assert_eq!(u.get(&v("x")).map(BTreeSet::len), Some(2));
        assert!(!u.is_bijective());

        let inverse = u.inverse();
        assert_eq!(inverse.get(&v("a")).map(BTreeSet::len), Some(2));
        assert_eq!(inverse.inverse(), u);
    }

    #[test]
    fn test_translate_answer_follows_every_target() {
        let u = Unifier::from_pairs([(v("x"), v("a")), (v("x"), v("b"))]);
        let answer: Answer = [(v("x"), ConceptId::new(7)), (v("z"), ConceptId::new(9))].into();
        let translated = u.translate_answer(&answer).unwrap();
        assert_eq!(translated.get(&v("a")), Some(&ConceptId::new(7)));
        assert_eq!(translated.get(&v("b")), Some(&ConceptId::new(7)));
        assert_eq!(translated.get(&v("z")), Some(&ConceptId::new(9)));
        assert!(!translated.contains_key(&v("x")));
    }

    #[test]
    fn test_translate_answer_rejects_conflicting_bindings() {
        let u = Unifier::from_pairs([(v("x"), v("a")), (v("y"), v("a"))]);
        let conflicting: Answer = [(v("x"), ConceptId::new(1)), (v("y"), ConceptId::new(2))].into();
        assert_eq!(u.translate_answer(&conflicting), None);

        let agreeing: Answer = [(v("x"), ConceptId::new(1)), (v("y"), ConceptId::new(1))].into();
        let translated = u.translate_answer(&agreeing).unwrap();
        assert_eq!(translated, Answer::from([(v("a"), ConceptId::new(1))]));
    }

    #[test]
    fn test_non_existent_unifier_translates_nothing() {
        let answer: Answer = [(v("x"), ConceptId::new(1))].into();
        assert_eq!(Unifier::non_existent().translate_answer(&answer), None);
        assert_eq!(Unifier::trivial().translate_answer(&answer), Some(answer));
    }

    #[test]
    fn test_multi_unifier_drops_non_existent_members() {
        let multi: MultiUnifier = [Unifier::non_existent(), Unifier::trivial()].into_iter().collect();
        assert_eq!(multi.len(), 1);
        assert!(multi.unique().is_some_and(Unifier::is_empty));
        assert!(MultiUnifier::non_existent().is_non_existent());
    }

    #[test]
    fn test_display_lists_pairs() {
        let u = Unifier::from_pairs([(v("x"), v("y"))]);
        assert_eq!(u.to_string(), "{$x -> $y}");
    }
}
