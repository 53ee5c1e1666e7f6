//! Alpha and structural equivalence of atoms.
//!
//! Both relations are decided by comparing canonical keys:
//!
//! - the **alpha key** keeps schema labels and literal constants, and replaces
//!   every variable by the position of its first occurrence, so only the
//!   sharing pattern of variables matters;
//! - the **structural key** is the alpha key with literal constants (values
//!   and concept ids) erased.
//!
//! Because the structural key is a function of the alpha key, alpha
//! equivalence implies structural equivalence, and equivalent atoms hash
//! identically under either relation.

use crate::atom::{AtomKind, Atomic, IdConstant};
use crate::unify::{role_pairings, UnifierType};
use ahash::AHashMap;
use quarry_pattern::{Comparator, ConceptId, Label, Operand, ValuePredicate, ValueType, Value, Variable};
use std::hash::{Hash, Hasher};

const KEY_SEEDS: [u64; 4] = [
    0x243f_6a88_85a3_08d3,
    0x1319_8a2e_0370_7344,
    0xa409_3822_299f_31d0,
    0x082e_fa98_ec4e_6c89,
];

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
enum KeyPart {
    Var(u32),
    Label(Label),
    Flag(bool),
    ValueType(ValueType),
    Comparator(Comparator),
    Value(Value),
    Id(ConceptId),
    /// Relation signature: one sorted role multiset per distinct player.
    Roles(Vec<Vec<Option<Label>>>),
    Absent,
    Erased,
}

/// Canonical, variable-name-free description of an atom.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct EquivalenceKey {
    kind: &'static str,
    parts: Vec<KeyPart>,
}

impl EquivalenceKey {
    pub fn kind(&self) -> &'static str {
        self.kind
    }

    fn erase_constants(&self) -> EquivalenceKey {
        let parts = self
            .parts
            .iter()
            .map(|part| match part {
                KeyPart::Value(_) | KeyPart::Id(_) => KeyPart::Erased,
                other => other.clone(),
            })
            .collect();
        EquivalenceKey {
            kind: self.kind,
            parts,
        }
    }

    fn stable_hash(&self) -> u64 {
        let [k0, k1, k2, k3] = KEY_SEEDS;
        ahash::RandomState::with_seeds(k0, k1, k2, k3).hash_one(self)
    }
}

/// Numbers variables by first occurrence.
struct Canon {
    seen: Vec<Variable>,
}

impl Canon {
    fn new(designated: &Variable) -> Self {
        Self {
            seen: vec![designated.clone()],
        }
    }

    fn var(&mut self, var: &Variable) -> KeyPart {
        let idx = match self.seen.iter().position(|v| v == var) {
            Some(idx) => idx,
            None => {
                self.seen.push(var.clone());
                self.seen.len() - 1
            }
        };
        KeyPart::Var(idx as u32)
    }

    fn type_ref(&mut self, var: &Variable, label: Option<&Label>) -> KeyPart {
        match label {
            Some(label) => KeyPart::Label(label.clone()),
            None => self.var(var),
        }
    }

    fn predicate(&mut self, predicate: &ValuePredicate, parts: &mut Vec<KeyPart>) {
        parts.push(KeyPart::Comparator(predicate.comparator));
        parts.push(match &predicate.operand {
            Operand::Value(value) => KeyPart::Value(value.clone()),
            Operand::Variable(var) => self.var(var),
        });
    }
}

fn atom_key(atom: &Atomic, with_predicate: bool) -> EquivalenceKey {
    canonicalise(atom, with_predicate).0
}

/// The key plus the variables it numbers, indexed by their `KeyPart::Var`.
fn canonicalise(atom: &Atomic, with_predicate: bool) -> (EquivalenceKey, Vec<Variable>) {
    let mut canon = Canon::new(atom.var());
    let mut parts = vec![KeyPart::Var(0)];
    match atom.kind() {
        AtomKind::Isa {
            type_var,
            type_label,
            explicit,
        } => {
            parts.push(canon.type_ref(type_var, type_label.as_ref()));
            parts.push(KeyPart::Flag(*explicit));
        }
        AtomKind::Sub {
            super_var,
            super_label,
            explicit,
        } => {
            parts.push(canon.type_ref(super_var, super_label.as_ref()));
            parts.push(KeyPart::Flag(*explicit));
        }
        AtomKind::DataType(value_type) => parts.push(KeyPart::ValueType(*value_type)),
        AtomKind::Resource {
            attribute_type,
            attribute,
            predicate,
        } => {
            parts.push(KeyPart::Label(attribute_type.clone()));
            parts.push(canon.var(attribute));
            match predicate {
                Some(predicate) if with_predicate => canon.predicate(predicate, &mut parts),
                _ => parts.push(KeyPart::Absent),
            }
        }
        AtomKind::Relation {
            type_var,
            type_label,
            role_players,
        } => {
            parts.push(match (type_label, type_var) {
                (Some(label), _) => KeyPart::Label(label.clone()),
                (None, Some(var)) => canon.var(var),
                (None, None) => KeyPart::Absent,
            });
            let mut players: Vec<&Variable> = Vec::new();
            for rp in role_players {
                if !players.contains(&&rp.player) {
                    players.push(&rp.player);
                }
            }
            let mut signature: Vec<Vec<Option<Label>>> = players
                .iter()
                .map(|player| {
                    let mut roles: Vec<Option<Label>> = role_players
                        .iter()
                        .filter(|rp| &rp.player == *player)
                        .map(|rp| rp.role.clone())
                        .collect();
                    roles.sort();
                    roles
                })
                .collect();
            signature.sort();
            parts.push(KeyPart::Roles(signature));
        }
        AtomKind::ValuePredicate(predicate) => canon.predicate(predicate, &mut parts),
        AtomKind::IdPredicate(IdConstant::Id(id)) => parts.push(KeyPart::Id(*id)),
        AtomKind::IdPredicate(IdConstant::Label(label)) => parts.push(KeyPart::Label(label.clone())),
        AtomKind::NeqPredicate(other) => parts.push(canon.var(other)),
    }
    let key = EquivalenceKey {
        kind: atom.kind().name(),
        parts,
    };
    (key, canon.seen)
}

impl Atomic {
    pub fn alpha_key(&self) -> EquivalenceKey {
        atom_key(self, true)
    }

    pub fn structural_key(&self) -> EquivalenceKey {
        self.alpha_key().erase_constants()
    }

    pub fn is_alpha_equivalent(&self, other: &Atomic) -> bool {
        self.alpha_key() == other.alpha_key()
    }

    pub fn is_structurally_equivalent(&self, other: &Atomic) -> bool {
        self.structural_key() == other.structural_key()
    }

    pub fn alpha_equivalence_hash(&self) -> u64 {
        self.alpha_key().stable_hash()
    }

    pub fn structural_equivalence_hash(&self) -> u64 {
        self.structural_key().stable_hash()
    }

    /// True when `self` is at least as general as `other`: every answer to
    /// `other` is also an answer to `self`.
    ///
    /// Decided exactly for resources, where a resource without a value
    /// predicate subsumes the same resource with one. Every other kind falls
    /// back to alpha equivalence.
    pub fn subsumes(&self, other: &Atomic) -> bool {
        if !self.kind().same_kind(other.kind()) {
            return false;
        }
        if self.is_alpha_equivalent(other) {
            return true;
        }
        match (self.kind(), other.kind()) {
            (AtomKind::Resource { predicate: None, .. }, AtomKind::Resource { predicate: Some(_), .. }) => {
                self.alpha_key() == atom_key(other, false)
            }
            _ => false,
        }
    }
}

/// Which equivalence relation to compare atoms under.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AtomicEquivalence {
    Alpha,
    Structural,
}

impl AtomicEquivalence {
    pub fn key(self, atom: &Atomic) -> EquivalenceKey {
        match self {
            AtomicEquivalence::Alpha => atom.alpha_key(),
            AtomicEquivalence::Structural => atom.structural_key(),
        }
    }

    pub fn equivalent(self, a: &Atomic, b: &Atomic) -> bool {
        self.key(a) == self.key(b)
    }

    pub fn hash(self, atom: &Atomic) -> u64 {
        self.key(atom).stable_hash()
    }

    pub fn wrap(self, atom: Atomic) -> EquivalenceWrapper {
        EquivalenceWrapper::new(self, atom)
    }

    /// Every variable correspondence `a -> b` under which the two atoms are
    /// equivalent; empty when they are not.
    ///
    /// Relation players are absent from the key, so each role-preserving
    /// pairing of players yields its own correspondence.
    pub(crate) fn variable_pairings(self, a: &Atomic, b: &Atomic) -> Vec<Vec<(Variable, Variable)>> {
        let (key_a, vars_a) = canonicalise(a, true);
        let (key_b, vars_b) = canonicalise(b, true);
        let equal = match self {
            AtomicEquivalence::Alpha => key_a == key_b,
            AtomicEquivalence::Structural => key_a.erase_constants() == key_b.erase_constants(),
        };
        if !equal {
            return Vec::new();
        }
        let base: Vec<(Variable, Variable)> = vars_a.into_iter().zip(vars_b).collect();
        match (a.kind(), b.kind()) {
            (
                AtomKind::Relation {
                    role_players: players_a,
                    ..
                },
                AtomKind::Relation {
                    role_players: players_b,
                    ..
                },
            ) => role_pairings(players_a, players_b, UnifierType::Exact)
                .into_iter()
                .map(|pairs| base.iter().cloned().chain(pairs).collect())
                .collect(),
            _ => vec![base],
        }
    }
}

/// An atom whose `Eq`/`Hash` follow an [`AtomicEquivalence`], for use as a
/// hash-map key.
#[derive(Debug, Clone)]
pub struct EquivalenceWrapper {
    equivalence: AtomicEquivalence,
    key: EquivalenceKey,
    atom: Atomic,
}

impl EquivalenceWrapper {
    pub fn new(equivalence: AtomicEquivalence, atom: Atomic) -> Self {
        Self {
            equivalence,
            key: equivalence.key(&atom),
            atom,
        }
    }

    pub fn equivalence(&self) -> AtomicEquivalence {
        self.equivalence
    }

    pub fn atom(&self) -> &Atomic {
        &self.atom
    }

    pub fn into_atom(self) -> Atomic {
        self.atom
    }
}

impl PartialEq for EquivalenceWrapper {
    fn eq(&self, other: &Self) -> bool {
        self.equivalence == other.equivalence && self.key == other.key
    }
}

impl Eq for EquivalenceWrapper {}

impl Hash for EquivalenceWrapper {
    fn hash<H: Hasher>(&self, state: &mut H) {
        Hash::hash(&self.equivalence, state);
        self.key.hash(state);
    }
}

/// Atoms grouped by equivalence class, in first-seen order.
///
/// Rule indexes key their caches on the family representative, so every
/// atom of a family can reuse the same rule lookups.
#[derive(Debug, Clone)]
pub struct AtomFamilies {
    equivalence: AtomicEquivalence,
    index: AHashMap<EquivalenceWrapper, usize>,
    families: Vec<Vec<Atomic>>,
}

impl AtomFamilies {
    pub fn new(equivalence: AtomicEquivalence) -> Self {
        Self {
            equivalence,
            index: AHashMap::new(),
            families: Vec::new(),
        }
    }

    /// Add an atom; returns `true` when it opened a new family.
    pub fn insert(&mut self, atom: Atomic) -> bool {
        let wrapper = self.equivalence.wrap(atom.clone());
        match self.index.get(&wrapper) {
            Some(&idx) => {
                self.families[idx].push(atom);
                false
            }
            None => {
                self.index.insert(wrapper, self.families.len());
                self.families.push(vec![atom]);
                true
            }
        }
    }

    /// Members of the family `atom` belongs to (empty when unseen).
    pub fn family(&self, atom: &Atomic) -> &[Atomic] {
        let wrapper = self.equivalence.wrap(atom.clone());
        self.index
            .get(&wrapper)
            .map(|&idx| self.families[idx].as_slice())
            .unwrap_or(&[])
    }

    pub fn representatives(&self) -> impl Iterator<Item = &Atomic> {
        self.families.iter().filter_map(|family| family.first())
    }

    pub fn len(&self) -> usize {
        self.families.len()
    }

    pub fn is_empty(&self) -> bool {
        self.families.is_empty()
    }
}

impl Extend<Atomic> for AtomFamilies {
    fn extend<T: IntoIterator<Item = Atomic>>(&mut self, iter: T) {
        for atom in iter {
            self.insert(atom);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::atom::QueryId;
    use quarry_pattern::{RolePlayer, Statement};

    fn resource(owner: &str, attr: &str, predicate: Option<ValuePredicate>) -> Atomic {
        let owner = Variable::named(owner);
        let attr = Variable::named(attr);
        Atomic::new(
            owner.clone(),
            Statement::new(owner),
            QueryId::new(0),
            AtomKind::Resource {
                attribute_type: Label::new("name"),
                attribute: attr,
                predicate,
            },
        )
    }

    fn relation(rel: &str, players: &[(&str, &str)]) -> Atomic {
        let rel = Variable::named(rel);
        let role_players: Vec<RolePlayer> = players
            .iter()
            .map(|(role, player)| RolePlayer::of(*role, Variable::named(player)))
            .collect();
        Atomic::new(
            rel.clone(),
            Statement::new(rel).rel(role_players.clone()),
            QueryId::new(0),
            AtomKind::Relation {
                type_var: None,
                type_label: Some(Label::new("marriage")),
                role_players,
            },
        )
    }

    #[test]
    fn test_renaming_variables_preserves_alpha_equivalence() {
        let a = resource("x", "n", Some(ValuePredicate::equals("Bob")));
        let b = resource("y", "m", Some(ValuePredicate::equals("Bob")));
        assert!(a.is_alpha_equivalent(&b));
        assert_eq!(a.alpha_equivalence_hash(), b.alpha_equivalence_hash());
    }

    #[test]
    fn test_constants_separate_alpha_but_not_structural() {
        let a = resource("x", "n", Some(ValuePredicate::equals("Bob")));
        let b = resource("x", "n", Some(ValuePredicate::equals("Alice")));
        assert!(!a.is_alpha_equivalent(&b));
        assert!(a.is_structurally_equivalent(&b));
        assert_eq!(a.structural_equivalence_hash(), b.structural_equivalence_hash());
    }

    #[test]
    fn test_relation_signature_ignores_player_order_but_not_sharing() {
        let a = relation("r", &[("husband", "x"), ("wife", "y")]);
        let b = relation("s", &[("wife", "q"), ("husband", "p")]);
        let shared = relation("r", &[("husband", "x"), ("wife", "x")]);
        assert!(a.is_alpha_equivalent(&b));
        assert!(!a.is_alpha_equivalent(&shared));
        assert!(!a.is_structurally_equivalent(&shared));
    }

    #[test]
    fn test_plain_resource_subsumes_predicate_resource() {
        let specific = resource("x", "n", Some(ValuePredicate::equals("Bob")));
        let general = resource("x", "n", None);
        assert!(general.subsumes(&specific));
        assert!(!specific.subsumes(&general));
        assert!(general.subsumes(&general));
        assert!(specific.subsumes(&specific));
    }

    #[test]
    fn test_subsumption_needs_matching_owner_and_attribute() {
        let specific = resource("x", "n", Some(ValuePredicate::equals("Bob")));
        let renamed = resource("y", "m", None);
        assert!(renamed.subsumes(&specific));

        let other_type = Atomic::new(
            Variable::named("x"),
            Statement::new(Variable::named("x")),
            QueryId::new(0),
            AtomKind::Resource {
                attribute_type: Label::new("age"),
                attribute: Variable::named("n"),
                predicate: None,
            },
        );
        assert!(!other_type.subsumes(&specific));
    }

    #[test]
    fn test_wrapped_atoms_hash_by_equivalence_class() {
        let state = ahash::RandomState::with_seeds(1, 2, 3, 4);
        let a = AtomicEquivalence::Alpha.wrap(resource("x", "n", Some(ValuePredicate::equals("Bob"))));
        let b = AtomicEquivalence::Alpha.wrap(resource("y", "m", Some(ValuePredicate::equals("Bob"))));
        let structural = AtomicEquivalence::Structural.wrap(resource("x", "n", Some(ValuePredicate::equals("Bob"))));
        assert_eq!(a, b);
        assert_eq!(state.hash_one(&a), state.hash_one(&b));
        assert_ne!(a, structural);
    }

    #[test]
    fn test_different_kinds_are_never_equivalent() {
        let a = resource("x", "n", None);
        let b = relation("x", &[("husband", "n")]);
        assert!(!a.is_structurally_equivalent(&b));
        assert!(!a.subsumes(&b));
    }

    #[test]
    fn test_families_group_structurally_equivalent_atoms() {
        let mut families = AtomFamilies::new(AtomicEquivalence::Structural);
        assert!(families.insert(resource("x", "n", Some(ValuePredicate::equals("Bob")))));
        assert!(!families.insert(resource("y", "m", Some(ValuePredicate::equals("Alice")))));
        assert!(families.insert(relation("r", &[("husband", "x"), ("wife", "y")])));
        assert_eq!(families.len(), 2);
        assert_eq!(families.family(&resource("z", "k", Some(ValuePredicate::equals("Eve")))).len(), 2);
        assert!(families.family(&resource("z", "k", None)).is_empty());
    }
}
