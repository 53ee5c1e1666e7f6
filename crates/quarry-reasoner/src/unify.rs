//! Atom unification.

use crate::atom::{AtomKind, Atomic};
use crate::unifier::{MultiUnifier, Unifier};
use quarry_pattern::{Label, RolePlayer, ValuePredicate, Variable};

/// How strict unification is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum UnifierType {
    /// Child and parent must be alpha-equivalent; every unifier is a
    /// bijection.
    Exact,
    /// Child is a rule head: its constants and labels only need to be
    /// compatible with the parent's (absent on one side or equal).
    Rule,
}

impl Atomic {
    /// Unifiers mapping `self`'s (child) variables onto `parent`'s.
    ///
    /// Returns [`MultiUnifier::non_existent`] when the kinds differ or the
    /// constants clash.
    pub fn unify(&self, parent: &Atomic, unifier_type: UnifierType) -> MultiUnifier {
        if !self.kind().same_kind(parent.kind()) {
            return MultiUnifier::non_existent();
        }
        if unifier_type == UnifierType::Exact && !self.is_alpha_equivalent(parent) {
            return MultiUnifier::non_existent();
        }
        if !compatible(self.kind(), parent.kind()) {
            return MultiUnifier::non_existent();
        }

        let mut base = vec![(self.var().clone(), parent.var().clone())];
        let candidates = match (self.kind(), parent.kind()) {
            (
                AtomKind::Relation {
                    type_var: child_type,
                    role_players: child_players,
                    ..
                },
                AtomKind::Relation {
                    type_var: parent_type,
                    role_players: parent_players,
                    ..
                },
            ) => {
                if let (Some(c), Some(p)) = (child_type, parent_type) {
                    base.push((c.clone(), p.clone()));
                }
                role_pairings(child_players, parent_players, unifier_type)
                    .into_iter()
                    .map(|pairs| base.iter().cloned().chain(pairs).collect::<Unifier>())
                    .collect::<Vec<_>>()
            }
            (child, parent) => {
                base.extend(payload_pairs(child, parent));
                vec![base.into_iter().collect::<Unifier>()]
            }
        };

        let unifiers: MultiUnifier = candidates
            .into_iter()
            .filter(|u| unifier_type == UnifierType::Rule || u.is_bijective())
            .collect();
        tracing::trace!(
            child = %self,
            parent = %parent,
            ?unifier_type,
            unifiers = unifiers.len(),
            "unified atoms"
        );
        unifiers
    }
}

fn labels_compatible(child: Option<&Label>, parent: Option<&Label>) -> bool {
    match (child, parent) {
        (Some(a), Some(b)) => a == b,
        _ => true,
    }
}

fn predicates_compatible(child: Option<&ValuePredicate>, parent: Option<&ValuePredicate>) -> bool {
    match (child, parent) {
        (Some(a), Some(b)) if a.operand.value().is_some() && b.operand.value().is_some() => a == b,
        _ => true,
    }
}

fn compatible(child: &AtomKind, parent: &AtomKind) -> bool {
    match (child, parent) {
        (
            AtomKind::Isa { type_label: a, .. },
            AtomKind::Isa { type_label: b, .. },
        ) => labels_compatible(a.as_ref(), b.as_ref()),
        (
            AtomKind::Sub { super_label: a, .. },
            AtomKind::Sub { super_label: b, .. },
        ) => labels_compatible(a.as_ref(), b.as_ref()),
        (AtomKind::DataType(a), AtomKind::DataType(b)) => a == b,
        (
            AtomKind::Resource {
                attribute_type: ta,
                predicate: pa,
                ..
            },
            AtomKind::Resource {
                attribute_type: tb,
                predicate: pb,
                ..
            },
        ) => ta == tb && predicates_compatible(pa.as_ref(), pb.as_ref()),
        (
            AtomKind::Relation { type_label: a, .. },
            AtomKind::Relation { type_label: b, .. },
        ) => labels_compatible(a.as_ref(), b.as_ref()),
        (AtomKind::ValuePredicate(a), AtomKind::ValuePredicate(b)) => {
            predicates_compatible(Some(a), Some(b))
        }
        (AtomKind::IdPredicate(a), AtomKind::IdPredicate(b)) => a == b,
        (AtomKind::NeqPredicate(_), AtomKind::NeqPredicate(_)) => true,
        _ => false,
    }
}

fn operand_pair(child: Option<&ValuePredicate>, parent: Option<&ValuePredicate>) -> Option<(Variable, Variable)> {
    let c = child?.operand.variable()?;
    let p = parent?.operand.variable()?;
    Some((c.clone(), p.clone()))
}

/// Positional variable pairs for non-relation payloads.
fn payload_pairs(child: &AtomKind, parent: &AtomKind) -> Vec<(Variable, Variable)> {
    match (child, parent) {
        (AtomKind::Isa { type_var: c, .. }, AtomKind::Isa { type_var: p, .. }) => {
            vec![(c.clone(), p.clone())]
        }
        (AtomKind::Sub { super_var: c, .. }, AtomKind::Sub { super_var: p, .. }) => {
            vec![(c.clone(), p.clone())]
        }
        (
            AtomKind::Resource {
                attribute: c,
                predicate: cp,
                ..
            },
            AtomKind::Resource {
                attribute: p,
                predicate: pp,
                ..
            },
        ) => std::iter::once((c.clone(), p.clone()))
            .chain(operand_pair(cp.as_ref(), pp.as_ref()))
            .collect(),
        (AtomKind::ValuePredicate(c), AtomKind::ValuePredicate(p)) => {
            operand_pair(Some(c), Some(p)).into_iter().collect()
        }
        (AtomKind::NeqPredicate(c), AtomKind::NeqPredicate(p)) => vec![(c.clone(), p.clone())],
        _ => Vec::new(),
    }
}

fn roles_compatible(child: &RolePlayer, parent: &RolePlayer, unifier_type: UnifierType) -> bool {
    match unifier_type {
        UnifierType::Exact => child.role == parent.role,
        UnifierType::Rule => labels_compatible(child.role.as_ref(), parent.role.as_ref()),
    }
}

/// Every way of matching each parent role player to a distinct, compatible
/// child role player.
pub(crate) fn role_pairings(
    child: &[RolePlayer],
    parent: &[RolePlayer],
    unifier_type: UnifierType,
) -> Vec<Vec<(Variable, Variable)>> {
    if parent.len() > child.len() || (unifier_type == UnifierType::Exact && parent.len() != child.len()) {
        return Vec::new();
    }
    let mut out = Vec::new();
    let mut used = vec![false; child.len()];
    let mut current = Vec::with_capacity(parent.len());
    assign(child, parent, unifier_type, &mut used, &mut current, &mut out);
    out
}

fn assign(
    child: &[RolePlayer],
    parent: &[RolePlayer],
    unifier_type: UnifierType,
    used: &mut [bool],
    current: &mut Vec<(Variable, Variable)>,
    out: &mut Vec<Vec<(Variable, Variable)>>,
) {
    let Some(next) = parent.get(current.len()) else {
        out.push(current.clone());
        return;
    };
    for (idx, candidate) in child.iter().enumerate() {
        if used[idx] || !roles_compatible(candidate, next, unifier_type) {
            continue;
        }
        used[idx] = true;
        current.push((candidate.player.clone(), next.player.clone()));
        assign(child, parent, unifier_type, used, current, out);
        current.pop();
        used[idx] = false;
    }
}
