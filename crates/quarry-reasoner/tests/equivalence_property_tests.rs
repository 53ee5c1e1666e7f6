//! Equivalence consistency over randomly generated atoms.
//!
//! - alpha equivalence implies structural equivalence;
//! - equivalent atoms hash identically under the same relation;
//! - renaming variables never changes either key;
//! - dropping a resource's value predicate only generalises it.

use proptest::prelude::*;
use quarry_pattern::{Comparator, ConceptId, Label, RolePlayer, Statement, ValuePredicate, ValueType, Variable};
use quarry_reasoner::{AtomKind, AtomicEquivalence, Atomic, IdConstant, QueryId, UnifierType};

fn var_strategy() -> impl Strategy<Value = Variable> {
    prop::sample::select(vec!["x", "y", "z"]).prop_map(Variable::named)
}

fn label_strategy() -> impl Strategy<Value = Label> {
    prop::sample::select(vec!["person", "name", "marriage"]).prop_map(Label::new)
}

fn predicate_strategy() -> impl Strategy<Value = ValuePredicate> {
    prop_oneof![
        prop::sample::select(vec!["Bob", "Alice"]).prop_map(ValuePredicate::equals),
        (0i64..3).prop_map(|n| ValuePredicate::compare(Comparator::Gt, n)),
        var_strategy().prop_map(|v| ValuePredicate::compare_var(Comparator::Neq, v)),
    ]
}

fn kind_strategy() -> impl Strategy<Value = AtomKind> {
    prop_oneof![
        (var_strategy(), prop::option::of(label_strategy()), any::<bool>()).prop_map(
            |(type_var, type_label, explicit)| AtomKind::Isa {
                type_var,
                type_label,
                explicit,
            }
        ),
        prop::sample::select(vec![ValueType::String, ValueType::Long]).prop_map(AtomKind::DataType),
        (label_strategy(), var_strategy(), prop::option::of(predicate_strategy())).prop_map(
            |(attribute_type, attribute, predicate)| AtomKind::Resource {
                attribute_type,
                attribute,
                predicate,
            }
        ),
        (
            prop::option::of(label_strategy()),
            prop::collection::vec((prop::option::of(label_strategy()), var_strategy()), 1..4)
        )
            .prop_map(|(type_label, players)| AtomKind::Relation {
                type_var: None,
                type_label,
                role_players: players
                    .into_iter()
                    .map(|(role, player)| RolePlayer::new(role, player))
                    .collect(),
            }),
        predicate_strategy().prop_map(AtomKind::ValuePredicate),
        (0u64..3).prop_map(|id| AtomKind::IdPredicate(IdConstant::Id(ConceptId::new(id)))),
        var_strategy().prop_map(AtomKind::NeqPredicate),
    ]
}

fn atom_strategy() -> impl Strategy<Value = Atomic> {
    (var_strategy(), kind_strategy()).prop_map(|(var, kind)| {
        Atomic::new(var.clone(), Statement::new(var), QueryId::new(0), kind)
    })
}

/// Rename `x`/`y`/`z` to `a`/`b`/`c` everywhere in the atom.
fn rename(atom: &Atomic) -> Atomic {
    let r = |v: &Variable| match v.name() {
        Some("x") => Variable::named("a"),
        Some("y") => Variable::named("b"),
        Some("z") => Variable::named("c"),
        _ => v.clone(),
    };
    let rename_predicate = |p: &ValuePredicate| match p.operand.variable() {
        Some(var) => ValuePredicate::compare_var(p.comparator, r(var)),
        None => p.clone(),
    };
    let kind = match atom.kind() {
        AtomKind::Isa {
            type_var,
            type_label,
            explicit,
        } => AtomKind::Isa {
            type_var: r(type_var),
            type_label: type_label.clone(),
            explicit: *explicit,
        },
        AtomKind::Resource {
            attribute_type,
            attribute,
            predicate,
        } => AtomKind::Resource {
            attribute_type: attribute_type.clone(),
            attribute: r(attribute),
            predicate: predicate.as_ref().map(rename_predicate),
        },
        AtomKind::Relation {
            type_var,
            type_label,
            role_players,
        } => AtomKind::Relation {
            type_var: type_var.as_ref().map(r),
            type_label: type_label.clone(),
            role_players: role_players
                .iter()
                .map(|rp| RolePlayer::new(rp.role.clone(), r(&rp.player)))
                .collect(),
        },
        AtomKind::ValuePredicate(p) => AtomKind::ValuePredicate(rename_predicate(p)),
        AtomKind::NeqPredicate(other) => AtomKind::NeqPredicate(r(other)),
        other => other.clone(),
    };
    let var = r(atom.var());
    Atomic::new(var.clone(), Statement::new(var), atom.parent(), kind)
}

proptest! {
    #[test]
    fn test_alpha_implies_structural(a in atom_strategy(), b in atom_strategy()) {
        if a.is_alpha_equivalent(&b) {
            prop_assert!(a.is_structurally_equivalent(&b));
            prop_assert_eq!(a.alpha_equivalence_hash(), b.alpha_equivalence_hash());
        }
        if a.is_structurally_equivalent(&b) {
            prop_assert_eq!(a.structural_equivalence_hash(), b.structural_equivalence_hash());
        }
    }

    #[test]
    fn test_equivalence_is_reflexive_and_symmetric(a in atom_strategy(), b in atom_strategy()) {
        for equivalence in [AtomicEquivalence::Alpha, AtomicEquivalence::Structural] {
            prop_assert!(equivalence.equivalent(&a, &a));
            prop_assert_eq!(equivalence.equivalent(&a, &b), equivalence.equivalent(&b, &a));
        }
    }

    #[test]
    fn test_renaming_preserves_equivalence(a in atom_strategy()) {
        let renamed = rename(&a);
        prop_assert!(a.is_alpha_equivalent(&renamed));
        prop_assert!(a.subsumes(&renamed));
    }

    #[test]
    fn test_plain_resource_subsumes_its_restrictions(a in atom_strategy()) {
        let AtomKind::Resource { attribute_type, attribute, predicate: Some(_) } = a.kind() else {
            return Ok(());
        };
        let plain = Atomic::new(
            a.var().clone(),
            Statement::new(a.var().clone()),
            a.parent(),
            AtomKind::Resource {
                attribute_type: attribute_type.clone(),
                attribute: attribute.clone(),
                predicate: None,
            },
        );
        prop_assert!(plain.subsumes(&a));
        prop_assert!(rename(&plain).subsumes(&a));
        prop_assert!(!a.subsumes(&plain));
    }

    #[test]
    fn test_alpha_equivalent_atoms_unify_exactly(a in atom_strategy()) {
        let renamed = rename(&a);
        let unifiers = a.unify(&renamed, UnifierType::Exact);
        prop_assert!(!unifiers.is_non_existent());
        for unifier in unifiers.iter() {
            prop_assert!(unifier.is_bijective());
            prop_assert_eq!(unifier.apply(a.var()), vec![renamed.var().clone()]);
        }
    }

    #[test]
    fn test_copy_preserves_equivalence(a in atom_strategy(), parent in 0u64..10) {
        let copied = a.copy(QueryId::new(parent));
        prop_assert!(a.is_alpha_equivalent(&copied));
        prop_assert_eq!(copied.parent(), QueryId::new(parent));
    }
}
