//! The query that owns a set of atoms.

use crate::atom::{Atomic, QueryId};
use crate::equivalence::AtomicEquivalence;
use quarry_pattern::{Conjunction, Statement, Variable};
use std::collections::BTreeMap;
use std::fmt;

/// A conjunctive query as the reasoner sees it: the source conjunction plus
/// the atoms derived from it, all parented to this query's id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReasonerQuery {
    id: QueryId,
    conjunction: Conjunction<Statement>,
    atoms: Vec<Atomic>,
}

impl ReasonerQuery {
    /// Build a query, re-parenting every atom onto `id`.
    pub fn new(id: QueryId, conjunction: Conjunction<Statement>, atoms: impl IntoIterator<Item = Atomic>) -> Self {
        let atoms = atoms
            .into_iter()
            .map(|atom| if atom.parent() == id { atom } else { atom.copy(id) })
            .collect();
        Self {
            id,
            conjunction,
            atoms,
        }
    }

    pub fn id(&self) -> QueryId {
        self.id
    }

    pub fn conjunction(&self) -> &Conjunction<Statement> {
        &self.conjunction
    }

    pub fn atoms(&self) -> &[Atomic] {
        &self.atoms
    }

    /// Same atoms and conjunction under a new id.
    pub fn copy_with_id(&self, id: QueryId) -> ReasonerQuery {
        ReasonerQuery::new(id, self.conjunction.clone(), self.atoms.iter().cloned())
    }

    /// Every variable any atom mentions, in first-mention order.
    pub fn variables(&self) -> Vec<Variable> {
        let mut out: Vec<Variable> = Vec::new();
        for var in self.atoms.iter().flat_map(Atomic::variables) {
            if !out.contains(&var) {
                out.push(var);
            }
        }
        out
    }

    pub fn user_variables(&self) -> Vec<Variable> {
        self.variables()
            .into_iter()
            .filter(Variable::is_user_defined)
            .collect()
    }

    /// Atoms that bind variables (everything except predicates).
    pub fn selectable_atoms(&self) -> impl Iterator<Item = &Atomic> {
        self.atoms.iter().filter(|atom| !atom.is_predicate())
    }

    /// True when the atoms of both queries can be paired one-to-one by alpha
    /// equivalence under a single renaming of the query's variables.
    pub fn is_alpha_equivalent(&self, other: &ReasonerQuery) -> bool {
        self.is_equivalent(other, AtomicEquivalence::Alpha)
    }

    pub fn is_structurally_equivalent(&self, other: &ReasonerQuery) -> bool {
        self.is_equivalent(other, AtomicEquivalence::Structural)
    }

    /// Order-insensitive hash consistent with [`Self::is_alpha_equivalent`].
    pub fn alpha_equivalence_hash(&self) -> u64 {
        self.equivalence_hash(AtomicEquivalence::Alpha)
    }

    pub fn structural_equivalence_hash(&self) -> u64 {
        self.equivalence_hash(AtomicEquivalence::Structural)
    }

    fn is_equivalent(&self, other: &ReasonerQuery, equivalence: AtomicEquivalence) -> bool {
        if self.atoms.len() != other.atoms.len() {
            return false;
        }
        let mut used = vec![false; other.atoms.len()];
        match_atoms(&self.atoms, &other.atoms, equivalence, &mut used, &Renaming::default())
    }

    fn equivalence_hash(&self, equivalence: AtomicEquivalence) -> u64 {
        let mut hashes: Vec<u64> = self.atoms.iter().map(|atom| equivalence.hash(atom)).collect();
        hashes.sort_unstable();
        hashes
            .into_iter()
            .fold(17u64, |acc, h| acc.wrapping_mul(31).wrapping_add(h))
    }
}

/// A partial variable bijection between two queries.
#[derive(Debug, Clone, Default)]
struct Renaming {
    forward: BTreeMap<Variable, Variable>,
    backward: BTreeMap<Variable, Variable>,
}

impl Renaming {
    /// The renaming extended by `pairs`, or `None` when a pair contradicts it.
    fn extend(&self, pairs: &[(Variable, Variable)]) -> Option<Renaming> {
        let mut next = self.clone();
        for (from, to) in pairs {
            match (next.forward.get(from), next.backward.get(to)) {
                (None, None) => {
                    next.forward.insert(from.clone(), to.clone());
                    next.backward.insert(to.clone(), from.clone());
                }
                (Some(mapped), Some(_)) if mapped == to => {}
                _ => return None,
            }
        }
        Some(next)
    }
}

/// Pair the first of `atoms` with an unused atom of `targets`, keeping one
/// renaming consistent across every pairing made so far.
fn match_atoms(
    atoms: &[Atomic],
    targets: &[Atomic],
    equivalence: AtomicEquivalence,
    used: &mut [bool],
    renaming: &Renaming,
) -> bool {
    let Some((atom, rest)) = atoms.split_first() else {
        return true;
    };
    for idx in 0..targets.len() {
        if used[idx] {
            continue;
        }
        for pairs in equivalence.variable_pairings(atom, &targets[idx]) {
            let Some(next) = renaming.extend(&pairs) else {
                continue;
            };
            used[idx] = true;
            if match_atoms(rest, targets, equivalence, used, &next) {
                return true;
            }
            used[idx] = false;
        }
    }
    false
}

impl fmt::Display for ReasonerQuery {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {{", self.id)?;
        for atom in &self.atoms {
            write!(f, " {atom};")?;
        }
        f.write_str(" }")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::atom::{AtomKind, QueryIdGen};
    use quarry_pattern::{Label, TypeRef, ValuePredicate, VarGen};

    fn isa_atom(gen: &mut VarGen, var: &str, label: &str) -> Atomic {
        let var = Variable::named(var);
        let type_var = gen.fresh();
        Atomic::new(
            var.clone(),
            Statement::new(var).isa(TypeRef::labelled(type_var.clone(), label)),
            QueryId::new(99),
            AtomKind::Isa {
                type_var,
                type_label: Some(Label::new(label)),
                explicit: false,
            },
        )
    }

    fn has_atom(owner: &str, attribute: &str, predicate: Option<ValuePredicate>) -> Atomic {
        let owner = Variable::named(owner);
        Atomic::new(
            owner.clone(),
            Statement::new(owner),
            QueryId::new(99),
            AtomKind::Resource {
                attribute_type: Label::new("name"),
                attribute: Variable::named(attribute),
                predicate,
            },
        )
    }

    fn query(id: u64, atoms: impl IntoIterator<Item = Atomic>) -> ReasonerQuery {
        ReasonerQuery::new(QueryId::new(id), Conjunction::default(), atoms)
    }

    #[test]
    fn test_atoms_are_reparented() {
        let mut ids = QueryIdGen::new();
        let mut gen = VarGen::new();
        let id = ids.fresh();
        let query = ReasonerQuery::new(id, Conjunction::default(), [isa_atom(&mut gen, "x", "person")]);
        assert!(query.atoms().iter().all(|a| a.parent() == id));

        let copy = query.copy_with_id(ids.fresh());
        assert_ne!(copy.id(), query.id());
        assert!(copy.is_alpha_equivalent(&query));
        assert_eq!(copy.alpha_equivalence_hash(), query.alpha_equivalence_hash());
    }

    #[test]
    fn test_query_equivalence_matches_atoms_as_multisets() {
        let mut gen = VarGen::new();
        let a = ReasonerQuery::new(
            QueryId::new(0),
            Conjunction::default(),
            [isa_atom(&mut gen, "x", "person"), isa_atom(&mut gen, "y", "company")],
        );
        let b = ReasonerQuery::new(
            QueryId::new(1),
            Conjunction::default(),
            [isa_atom(&mut gen, "q", "company"), isa_atom(&mut gen, "p", "person")],
        );
        let c = ReasonerQuery::new(
            QueryId::new(2),
            Conjunction::default(),
            [isa_atom(&mut gen, "q", "company"), isa_atom(&mut gen, "p", "company")],
        );
        assert!(a.is_alpha_equivalent(&b));
        assert!(!a.is_alpha_equivalent(&c));
        assert_eq!(a.user_variables(), vec![Variable::named("x"), Variable::named("y")]);
    }

    #[test]
    fn test_query_equivalence_respects_shared_variables() {
        let mut gen = VarGen::new();
        let shared = query(0, [isa_atom(&mut gen, "x", "person"), has_atom("x", "n", None)]);
        let disjoint = query(1, [isa_atom(&mut gen, "x", "person"), has_atom("y", "n", None)]);
        let renamed = query(2, [has_atom("p", "m", None), isa_atom(&mut gen, "p", "person")]);

        assert!(!shared.is_alpha_equivalent(&disjoint));
        assert!(!disjoint.is_alpha_equivalent(&shared));
        assert!(!shared.is_structurally_equivalent(&disjoint));
        assert!(shared.is_alpha_equivalent(&renamed));
        assert!(renamed.is_alpha_equivalent(&shared));
        assert_eq!(shared.alpha_equivalence_hash(), renamed.alpha_equivalence_hash());
    }

    #[test]
    fn test_query_renaming_must_be_injective() {
        let mut gen = VarGen::new();
        let two_owners = query(0, [has_atom("x", "n", None), has_atom("y", "m", None)]);
        let one_owner = query(1, [has_atom("z", "n", None), has_atom("z", "m", None)]);
        let swapped = query(2, [has_atom("b", "k", None), has_atom("a", "j", None)]);
        assert!(!two_owners.is_alpha_equivalent(&one_owner));
        assert!(!one_owner.is_alpha_equivalent(&two_owners));
        assert!(two_owners.is_alpha_equivalent(&swapped));

        let typed = query(3, [isa_atom(&mut gen, "x", "person"), isa_atom(&mut gen, "x", "person")]);
        let split = query(4, [isa_atom(&mut gen, "x", "person"), isa_atom(&mut gen, "y", "person")]);
        assert!(!typed.is_alpha_equivalent(&split));
    }

    #[test]
    fn test_structural_query_equivalence_ignores_values_but_not_sharing() {
        let bob = query(0, [has_atom("x", "n", Some(ValuePredicate::equals("Bob"))), has_atom("x", "m", None)]);
        let alice = query(1, [has_atom("y", "k", None), has_atom("y", "j", Some(ValuePredicate::equals("Alice")))]);
        let split = query(2, [has_atom("y", "k", None), has_atom("z", "j", Some(ValuePredicate::equals("Alice")))]);
        assert!(!bob.is_alpha_equivalent(&alice));
        assert!(bob.is_structurally_equivalent(&alice));
        assert_eq!(bob.structural_equivalence_hash(), alice.structural_equivalence_hash());
        assert!(!bob.is_structurally_equivalent(&split));
    }
}
