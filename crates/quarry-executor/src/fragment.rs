//! Traversal fragments.
//!
//! A fragment is one directed step a traversal engine can take between
//! variables (or a filter on a single variable). Each property compiles to one
//! or more [`EquivalentFragmentSet`]s; the fragments inside a set are
//! alternative directions for the same constraint, so the engine only needs
//! to execute one of them.

use quarry_pattern::{ConceptId, Label, PropertyKind, ValuePredicate, ValueType, Variable};
use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Fragment {
    /// instance → its direct type
    OutIsa { instance: Variable, type_var: Variable },
    /// type → its direct instances
    InIsa { type_var: Variable, instance: Variable },
    /// type → supertype (transitively, unless `one_hop`)
    OutSub {
        sub: Variable,
        super_type: Variable,
        one_hop: bool,
    },
    /// supertype → subtypes
    InSub {
        super_type: Variable,
        sub: Variable,
        one_hop: bool,
    },
    Label { var: Variable, label: Label },
    Id { var: Variable, id: ConceptId },
    Value { var: Variable, predicate: ValuePredicate },
    DataType { var: Variable, value_type: ValueType },
    OutHas { owner: Variable, attribute: Variable },
    InHas { attribute: Variable, owner: Variable },
    /// relation → player through the role-player edge `edge`
    OutRolePlayer {
        relation: Variable,
        edge: Variable,
        role: Option<Label>,
        player: Variable,
    },
    /// player → relation through the role-player edge `edge`
    InRolePlayer {
        player: Variable,
        edge: Variable,
        role: Option<Label>,
        relation: Variable,
    },
    Neq { var: Variable, other: Variable },
}

impl Fragment {
    /// The variable the fragment starts from.
    pub fn start(&self) -> &Variable {
        match self {
            Fragment::OutIsa { instance, .. } => instance,
            Fragment::InIsa { type_var, .. } => type_var,
            Fragment::OutSub { sub, .. } => sub,
            Fragment::InSub { super_type, .. } => super_type,
            Fragment::Label { var, .. }
            | Fragment::Id { var, .. }
            | Fragment::Value { var, .. }
            | Fragment::DataType { var, .. }
            | Fragment::Neq { var, .. } => var,
            Fragment::OutHas { owner, .. } => owner,
            Fragment::InHas { attribute, .. } => attribute,
            Fragment::OutRolePlayer { relation, .. } => relation,
            Fragment::InRolePlayer { player, .. } => player,
        }
    }

    /// The variable the fragment reaches, for edge fragments.
    pub fn end(&self) -> Option<&Variable> {
        match self {
            Fragment::OutIsa { type_var, .. } => Some(type_var),
            Fragment::InIsa { instance, .. } => Some(instance),
            Fragment::OutSub { super_type, .. } => Some(super_type),
            Fragment::InSub { sub, .. } => Some(sub),
            Fragment::OutHas { attribute, .. } => Some(attribute),
            Fragment::InHas { owner, .. } => Some(owner),
            Fragment::OutRolePlayer { player, .. } => Some(player),
            Fragment::InRolePlayer { relation, .. } => Some(relation),
            Fragment::Label { .. }
            | Fragment::Id { .. }
            | Fragment::Value { .. }
            | Fragment::DataType { .. }
            | Fragment::Neq { .. } => None,
        }
    }

    pub fn variables(&self) -> Vec<Variable> {
        let mut out = vec![self.start().clone()];
        match self {
            Fragment::OutRolePlayer { edge, .. } | Fragment::InRolePlayer { edge, .. } => {
                out.push(edge.clone())
            }
            Fragment::Value { predicate, .. } => out.extend(predicate.operand.variable().cloned()),
            Fragment::Neq { other, .. } => out.push(other.clone()),
            _ => {}
        }
        out.extend(self.end().cloned());
        out
    }

    /// Static cost class: lower runs earlier.
    ///
    /// Id lookups pin a single concept; labels and value equalities hit an
    /// index; datatype and other filters scan a type; edges expand.
    pub fn cost(&self) -> u32 {
        match self {
            Fragment::Id { .. } => 1,
            Fragment::Label { .. } => 2,
            Fragment::Value { predicate, .. } if predicate.equality_value().is_some() => 2,
            Fragment::DataType { .. } => 3,
            Fragment::Value { .. } | Fragment::Neq { .. } => 4,
            Fragment::OutIsa { .. }
            | Fragment::InIsa { .. }
            | Fragment::OutHas { .. }
            | Fragment::InHas { .. }
            | Fragment::OutRolePlayer { .. }
            | Fragment::InRolePlayer { .. } => 10,
            Fragment::OutSub { one_hop, .. } | Fragment::InSub { one_hop, .. } => {
                if *one_hop {
                    10
                } else {
                    12
                }
            }
        }
    }
}

fn role_suffix(role: &Option<Label>) -> String {
    role.as_ref().map(|r| format!(" [{r}]")).unwrap_or_default()
}

impl fmt::Display for Fragment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Fragment::OutIsa { instance, type_var } => write!(f, "{instance}-[isa]->{type_var}"),
            Fragment::InIsa { type_var, instance } => write!(f, "{type_var}<-[isa]-{instance}"),
            Fragment::OutSub {
                sub,
                super_type,
                one_hop,
            } => {
                let star = if *one_hop { "" } else { "*" };
                write!(f, "{sub}-[sub{star}]->{super_type}")
            }
            Fragment::InSub {
                super_type,
                sub,
                one_hop,
            } => {
                let star = if *one_hop { "" } else { "*" };
                write!(f, "{super_type}<-[sub{star}]-{sub}")
            }
            Fragment::Label { var, label } => write!(f, "{var}[label:{label}]"),
            Fragment::Id { var, id } => write!(f, "{var}[id:{id}]"),
            Fragment::Value { var, predicate } => write!(f, "{var}[value:{predicate}]"),
            Fragment::DataType { var, value_type } => write!(f, "{var}[datatype:{value_type}]"),
            Fragment::OutHas { owner, attribute } => write!(f, "{owner}-[has]->{attribute}"),
            Fragment::InHas { attribute, owner } => write!(f, "{attribute}<-[has]-{owner}"),
            Fragment::OutRolePlayer {
                relation,
                edge,
                role,
                player,
            } => write!(f, "{relation}-[{edge}{}]->{player}", role_suffix(role)),
            Fragment::InRolePlayer {
                player,
                edge,
                role,
                relation,
            } => write!(f, "{player}<-[{edge}{}]-{relation}", role_suffix(role)),
            Fragment::Neq { var, other } => write!(f, "{var}[neq:{other}]"),
        }
    }
}

/// The alternative fragments realizing one property's match semantics.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct EquivalentFragmentSet {
    property: PropertyKind,
    fragments: Vec<Fragment>,
}

impl EquivalentFragmentSet {
    pub fn new(property: PropertyKind, fragments: impl IntoIterator<Item = Fragment>) -> Self {
        Self {
            property,
            fragments: fragments.into_iter().collect(),
        }
    }

    pub fn single(property: PropertyKind, fragment: Fragment) -> Self {
        Self::new(property, [fragment])
    }

    pub fn property(&self) -> PropertyKind {
        self.property
    }

    pub fn fragments(&self) -> &[Fragment] {
        &self.fragments
    }

    /// Cheapest alternative.
    pub fn cost(&self) -> u32 {
        self.fragments.iter().map(Fragment::cost).min().unwrap_or(u32::MAX)
    }

    pub fn variables(&self) -> Vec<Variable> {
        let mut out: Vec<Variable> = Vec::new();
        for var in self.fragments.iter().flat_map(Fragment::variables) {
            if !out.contains(&var) {
                out.push(var);
            }
        }
        out
    }
}

impl fmt::Display for EquivalentFragmentSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let parts: Vec<String> = self.fragments.iter().map(|fr| fr.to_string()).collect();
        write!(f, "{:?} {{ {} }}", self.property, parts.join(" | "))
    }
}
