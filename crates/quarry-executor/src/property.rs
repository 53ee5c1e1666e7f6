//! Property executor: the match / insert / atomize capabilities of each
//! property kind.
//!
//! | property | fragments | writers | atom |
//! |---|---|---|---|
//! | isa | isa + sub closure (explicit: isa only) | `{type} → {var}` | `Isa` (none inside a relation) |
//! | sub | sub (explicit: one hop) | `{super} → {var}` | `Sub` |
//! | label | label | `{} → {var}` | `IdPredicate` |
//! | id | id | `{} → {var}` | `IdPredicate` |
//! | datatype | datatype | `{} → {var}` | `DataType` |
//! | has | has, both directions | `{var, attribute} → {}` | `Resource` |
//! | relation | one role-player edge per player | `{var, players} → {}` | `Relation` |
//! | value | value | `== constant` only: `{} → {var}` | `ValuePredicate` |
//! | neq | neq, both directions | none | `NeqPredicate` |

use crate::fragment::{EquivalentFragmentSet, Fragment};
use crate::writer::{WriteAction, Writer};
use quarry_pattern::{Property, PropertyKind, Statement, VarGen, Variable};
use quarry_reasoner::{AtomKind, Atomic, IdConstant, QueryId};

pub trait PropertyExecutor {
    /// Fragment sets matching this property on `var`. Generated variables
    /// (direct types, role-player edges) come from `gen`.
    fn match_fragments(&self, var: &Variable, gen: &mut VarGen) -> Vec<EquivalentFragmentSet>;

    /// Writers inserting this property on `var`; empty when the property
    /// cannot be written.
    fn insert_writers(&self, var: &Variable) -> Vec<Writer>;

    /// The reasoning atom for this property of `statement`, or `None` when a
    /// sibling property subsumes it.
    fn atomic(&self, parent: QueryId, statement: &Statement) -> Option<Atomic>;

    /// Whether [`Self::atomic`] yields an atom for this property of
    /// `statement`.
    fn mappable(&self, statement: &Statement) -> bool;
}

impl PropertyExecutor for Property {
    fn match_fragments(&self, var: &Variable, gen: &mut VarGen) -> Vec<EquivalentFragmentSet> {
        let kind = self.kind();
        match self {
            Property::Isa { type_ref, explicit } => {
                if *explicit {
                    return vec![isa_set(var, &type_ref.var)];
                }
                let direct = gen.fresh();
                vec![
                    isa_set(var, &direct),
                    sub_set(PropertyKind::Isa, &direct, &type_ref.var, false),
                ]
            }
            Property::Sub {
                super_type,
                explicit,
            } => vec![sub_set(kind, var, &super_type.var, *explicit)],
            Property::Label(label) => vec![EquivalentFragmentSet::single(
                kind,
                Fragment::Label {
                    var: var.clone(),
                    label: label.clone(),
                },
            )],
            Property::Id(id) => vec![EquivalentFragmentSet::single(
                kind,
                Fragment::Id {
                    var: var.clone(),
                    id: *id,
                },
            )],
            Property::DataType(value_type) => vec![EquivalentFragmentSet::single(
                kind,
                Fragment::DataType {
                    var: var.clone(),
                    value_type: *value_type,
                },
            )],
            Property::Has { attribute, .. } => vec![EquivalentFragmentSet::new(
                kind,
                [
                    Fragment::OutHas {
                        owner: var.clone(),
                        attribute: attribute.var().clone(),
                    },
                    Fragment::InHas {
                        attribute: attribute.var().clone(),
                        owner: var.clone(),
                    },
                ],
            )],
            Property::Relation { role_players } => role_players
                .iter()
                .map(|rp| {
                    let edge = gen.fresh();
                    EquivalentFragmentSet::new(
                        kind,
                        [
                            Fragment::OutRolePlayer {
                                relation: var.clone(),
                                edge: edge.clone(),
                                role: rp.role.clone(),
                                player: rp.player.clone(),
                            },
                            Fragment::InRolePlayer {
                                player: rp.player.clone(),
                                edge,
                                role: rp.role.clone(),
                                relation: var.clone(),
                            },
                        ],
                    )
                })
                .collect(),
            Property::Value(predicate) => vec![EquivalentFragmentSet::single(
                kind,
                Fragment::Value {
                    var: var.clone(),
                    predicate: predicate.clone(),
                },
            )],
            Property::Neq(other) => vec![EquivalentFragmentSet::new(
                kind,
                [
                    Fragment::Neq {
                        var: var.clone(),
                        other: other.clone(),
                    },
                    Fragment::Neq {
                        var: other.clone(),
                        other: var.clone(),
                    },
                ],
            )],
        }
    }

    fn insert_writers(&self, var: &Variable) -> Vec<Writer> {
        let kind = self.kind();
        let writer = match self {
            Property::Isa { type_ref, .. } => Writer::producing(
                var.clone(),
                kind,
                [type_ref.var.clone()],
                WriteAction::Isa {
                    type_var: type_ref.var.clone(),
                },
            ),
            Property::Sub { super_type, .. } => Writer::producing(
                var.clone(),
                kind,
                [super_type.var.clone()],
                WriteAction::Sub {
                    super_var: super_type.var.clone(),
                },
            ),
            Property::Label(label) => {
                Writer::producing(var.clone(), kind, [], WriteAction::Label(label.clone()))
            }
            Property::Id(id) => Writer::producing(var.clone(), kind, [], WriteAction::Id(*id)),
            Property::DataType(value_type) => {
                Writer::producing(var.clone(), kind, [], WriteAction::DataType(*value_type))
            }
            Property::Has { attribute, .. } => Writer::linking(
                var.clone(),
                kind,
                [var.clone(), attribute.var().clone()],
                WriteAction::Has {
                    attribute: attribute.var().clone(),
                },
            ),
            Property::Relation { role_players } => Writer::linking(
                var.clone(),
                kind,
                std::iter::once(var.clone()).chain(role_players.iter().map(|rp| rp.player.clone())),
                WriteAction::RolePlayers {
                    role_players: role_players.clone(),
                },
            ),
            Property::Value(predicate) => match predicate.equality_value() {
                Some(value) if predicate.is_insertable() => {
                    Writer::producing(var.clone(), kind, [], WriteAction::Value(value.clone()))
                }
                _ => return Vec::new(),
            },
            Property::Neq(_) => return Vec::new(),
        };
        vec![writer]
    }

    fn atomic(&self, parent: QueryId, statement: &Statement) -> Option<Atomic> {
        if !self.mappable(statement) {
            return None;
        }
        let var = statement.var().clone();
        let mut pattern = Statement::new(var.clone()).with_property(self.clone());
        let kind = match self {
            Property::Isa { type_ref, explicit } => AtomKind::Isa {
                type_var: type_ref.var.clone(),
                type_label: type_ref.label.clone(),
                explicit: *explicit,
            },
            Property::Sub {
                super_type,
                explicit,
            } => AtomKind::Sub {
                super_var: super_type.var.clone(),
                super_label: super_type.label.clone(),
                explicit: *explicit,
            },
            Property::Label(label) => AtomKind::IdPredicate(IdConstant::Label(label.clone())),
            Property::Id(id) => AtomKind::IdPredicate(IdConstant::Id(*id)),
            Property::DataType(value_type) => AtomKind::DataType(*value_type),
            Property::Has {
                attribute_type,
                attribute,
            } => AtomKind::Resource {
                attribute_type: attribute_type.clone(),
                attribute: attribute.var().clone(),
                predicate: attribute.value_predicate().cloned(),
            },
            Property::Relation { role_players } => {
                let isa = statement.property(PropertyKind::Isa);
                if let Some(isa) = isa {
                    pattern = pattern.with_property(isa.clone());
                }
                let isa = match isa {
                    Some(Property::Isa { type_ref, .. }) => Some(type_ref),
                    _ => None,
                };
                AtomKind::Relation {
                    type_var: isa.map(|t| t.var.clone()),
                    type_label: isa.and_then(|t| t.label.clone()),
                    role_players: role_players.clone(),
                }
            }
            Property::Value(predicate) => AtomKind::ValuePredicate(predicate.clone()),
            Property::Neq(other) => AtomKind::NeqPredicate(other.clone()),
        };
        Some(Atomic::new(var, pattern, parent, kind))
    }

    fn mappable(&self, statement: &Statement) -> bool {
        match self {
            Property::Isa { .. } => !statement.has_kind(PropertyKind::Relation),
            _ => true,
        }
    }
}

fn isa_set(instance: &Variable, type_var: &Variable) -> EquivalentFragmentSet {
    EquivalentFragmentSet::new(
        PropertyKind::Isa,
        [
            Fragment::OutIsa {
                instance: instance.clone(),
                type_var: type_var.clone(),
            },
            Fragment::InIsa {
                type_var: type_var.clone(),
                instance: instance.clone(),
            },
        ],
    )
}

fn sub_set(property: PropertyKind, sub: &Variable, super_type: &Variable, one_hop: bool) -> EquivalentFragmentSet {
    EquivalentFragmentSet::new(
        property,
        [
            Fragment::OutSub {
                sub: sub.clone(),
                super_type: super_type.clone(),
                one_hop,
            },
            Fragment::InSub {
                super_type: super_type.clone(),
                sub: sub.clone(),
                one_hop,
            },
        ],
    )
}

/// Fragment sets for a statement and every implicit statement it carries.
pub fn statement_fragments(statement: &Statement, gen: &mut VarGen) -> Vec<EquivalentFragmentSet> {
    std::iter::once(statement.clone())
        .chain(statement.inner_statements())
        .flat_map(|s| {
            s.properties()
                .iter()
                .flat_map(|p| p.match_fragments(s.var(), gen))
                .collect::<Vec<_>>()
        })
        .collect()
}

/// Writers for a statement and every implicit statement it carries.
pub fn statement_writers(statement: &Statement) -> Vec<Writer> {
    std::iter::once(statement.clone())
        .chain(statement.inner_statements())
        .flat_map(|s| {
            s.properties()
                .iter()
                .flat_map(|p| p.insert_writers(s.var()))
                .collect::<Vec<_>>()
        })
        .collect()
}

/// Atoms for a statement and every implicit statement it carries.
pub fn statement_atoms(statement: &Statement, parent: QueryId) -> Vec<Atomic> {
    std::iter::once(statement.clone())
        .chain(statement.inner_statements())
        .flat_map(|s| {
            s.properties()
                .iter()
                .filter_map(|p| p.atomic(parent, &s))
                .collect::<Vec<_>>()
        })
        .collect()
}
