//! Property model: the closed set of facts a statement can assert about its
//! principal variable.
//!
//! Capabilities (match / insert / atomize) are implemented by the executor
//! crate as exhaustive matches over [`Property`]; this module only carries the
//! data and the shape-aware equality used by normalization.

use crate::concept::{ConceptId, Label};
use crate::statement::Statement;
use crate::value::{ValuePredicate, ValueType};
use crate::variable::{VarShape, Variable};
use std::fmt;
use std::hash::{Hash, Hasher};

/// A reference to a type: the variable standing for it, plus the label when
/// the query named the type directly (`isa person`).
#[derive(Debug, Clone)]
pub struct TypeRef {
    pub var: Variable,
    pub label: Option<Label>,
}

impl TypeRef {
    pub fn labelled(var: Variable, label: impl Into<Label>) -> Self {
        Self {
            var,
            label: Some(label.into()),
        }
    }

    pub fn var(var: Variable) -> Self {
        Self { var, label: None }
    }

    /// The implicit statement `$type label <label>`, when the label is known.
    pub fn label_statement(&self) -> Option<Statement> {
        self.label
            .as_ref()
            .map(|label| Statement::new(self.var.clone()).label(label.clone()))
    }
}

impl PartialEq for TypeRef {
    fn eq(&self, other: &Self) -> bool {
        VarShape(&self.var) == VarShape(&other.var) && self.label == other.label
    }
}

impl Eq for TypeRef {}

impl Hash for TypeRef {
    fn hash<H: Hasher>(&self, state: &mut H) {
        VarShape(&self.var).hash(state);
        self.label.hash(state);
    }
}

impl fmt::Display for TypeRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.label {
            Some(label) => label.fmt(f),
            None => self.var.fmt(f),
        }
    }
}

/// One `role: $player` entry of a relation.
#[derive(Debug, Clone)]
pub struct RolePlayer {
    pub role: Option<Label>,
    pub player: Variable,
}

impl RolePlayer {
    pub fn new(role: Option<Label>, player: Variable) -> Self {
        Self { role, player }
    }

    pub fn of(role: impl Into<Label>, player: Variable) -> Self {
        Self::new(Some(role.into()), player)
    }

    pub fn untyped(player: Variable) -> Self {
        Self::new(None, player)
    }
}

impl PartialEq for RolePlayer {
    fn eq(&self, other: &Self) -> bool {
        self.role == other.role && VarShape(&self.player) == VarShape(&other.player)
    }
}

impl Eq for RolePlayer {}

impl Hash for RolePlayer {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.role.hash(state);
        VarShape(&self.player).hash(state);
    }
}

impl fmt::Display for RolePlayer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.role {
            Some(role) => write!(f, "{role}: {}", self.player),
            None => self.player.fmt(f),
        }
    }
}

/// Discriminant of [`Property`], for capability tables and logs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum PropertyKind {
    Isa,
    Sub,
    Label,
    Id,
    DataType,
    Has,
    Relation,
    Value,
    Neq,
}

impl PropertyKind {
    /// Kinds that may appear at most once per statement.
    pub fn is_unique(self) -> bool {
        matches!(
            self,
            PropertyKind::Isa
                | PropertyKind::Sub
                | PropertyKind::Label
                | PropertyKind::Id
                | PropertyKind::DataType
        )
    }
}

#[derive(Debug, Clone)]
pub enum Property {
    /// `isa T` (or `isa! T` when `explicit`: no subtype closure).
    Isa { type_ref: TypeRef, explicit: bool },
    /// `sub T` (or `sub! T`: direct supertype only).
    Sub { super_type: TypeRef, explicit: bool },
    Label(Label),
    Id(ConceptId),
    DataType(ValueType),
    /// `has <attribute_type> $a`, where `attribute` is the attribute's own
    /// statement (`$a isa <attribute_type>` plus an optional value predicate).
    Has {
        attribute_type: Label,
        attribute: Box<Statement>,
    },
    Relation { role_players: Vec<RolePlayer> },
    Value(ValuePredicate),
    Neq(Variable),
}

impl Property {
    pub fn kind(&self) -> PropertyKind {
        match self {
            Property::Isa { .. } => PropertyKind::Isa,
            Property::Sub { .. } => PropertyKind::Sub,
            Property::Label(_) => PropertyKind::Label,
            Property::Id(_) => PropertyKind::Id,
            Property::DataType(_) => PropertyKind::DataType,
            Property::Has { .. } => PropertyKind::Has,
            Property::Relation { .. } => PropertyKind::Relation,
            Property::Value(_) => PropertyKind::Value,
            Property::Neq(_) => PropertyKind::Neq,
        }
    }

    /// Variables mentioned by this property (not including the statement's own
    /// principal variable), in a deterministic order.
    pub fn variables(&self) -> Vec<Variable> {
        match self {
            Property::Isa { type_ref, .. } => vec![type_ref.var.clone()],
            Property::Sub { super_type, .. } => vec![super_type.var.clone()],
            Property::Label(_) | Property::Id(_) | Property::DataType(_) => Vec::new(),
            Property::Has { attribute, .. } => attribute.variables(),
            Property::Relation { role_players } => {
                role_players.iter().map(|rp| rp.player.clone()).collect()
            }
            Property::Value(predicate) => predicate.operand.variable().cloned().into_iter().collect(),
            Property::Neq(other) => vec![other.clone()],
        }
    }

    /// Implicit statements this property carries (type labels, attribute
    /// statements). Compilation must cover these as well as the owner.
    pub fn inner_statements(&self) -> Vec<Statement> {
        match self {
            Property::Isa { type_ref, .. } => type_ref.label_statement().into_iter().collect(),
            Property::Sub { super_type, .. } => super_type.label_statement().into_iter().collect(),
            Property::Has { attribute, .. } => vec![(**attribute).clone()],
            Property::Label(_)
            | Property::Id(_)
            | Property::DataType(_)
            | Property::Relation { .. }
            | Property::Value(_)
            | Property::Neq(_) => Vec::new(),
        }
    }
}

impl PartialEq for Property {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (
                Property::Isa {
                    type_ref: a,
                    explicit: ea,
                },
                Property::Isa {
                    type_ref: b,
                    explicit: eb,
                },
            ) => a == b && ea == eb,
            (
                Property::Sub {
                    super_type: a,
                    explicit: ea,
                },
                Property::Sub {
                    super_type: b,
                    explicit: eb,
                },
            ) => a == b && ea == eb,
            (Property::Label(a), Property::Label(b)) => a == b,
            (Property::Id(a), Property::Id(b)) => a == b,
            (Property::DataType(a), Property::DataType(b)) => a == b,
            (
                Property::Has {
                    attribute_type: ta,
                    attribute: a,
                },
                Property::Has {
                    attribute_type: tb,
                    attribute: b,
                },
            ) => ta == tb && a == b,
            (Property::Relation { role_players: a }, Property::Relation { role_players: b }) => {
                same_multiset(a, b)
            }
            (Property::Value(a), Property::Value(b)) => {
                a.comparator == b.comparator && a.operand.shape_eq(&b.operand)
            }
            (Property::Neq(a), Property::Neq(b)) => VarShape(a) == VarShape(b),
            _ => false,
        }
    }
}

impl Eq for Property {}

impl Hash for Property {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.kind().hash(state);
        match self {
            Property::Isa { type_ref, explicit } => {
                type_ref.hash(state);
                explicit.hash(state);
            }
            Property::Sub {
                super_type,
                explicit,
            } => {
                super_type.hash(state);
                explicit.hash(state);
            }
            Property::Label(label) => label.hash(state),
            Property::Id(id) => id.hash(state),
            Property::DataType(value_type) => value_type.hash(state),
            Property::Has {
                attribute_type,
                attribute,
            } => {
                attribute_type.hash(state);
                attribute.hash(state);
            }
            Property::Relation { role_players } => {
                // Order-insensitive, to agree with multiset equality.
                let mut hashes: Vec<u64> = role_players.iter().map(crate::pattern::hash_one).collect();
                hashes.sort_unstable();
                hashes.hash(state);
            }
            Property::Value(predicate) => {
                predicate.comparator.hash(state);
                predicate.operand.shape_hash(state);
            }
            Property::Neq(other) => VarShape(other).hash(state),
        }
    }
}

fn same_multiset<T: PartialEq>(a: &[T], b: &[T]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    let mut used = vec![false; b.len()];
    a.iter().all(|x| {
        match b
            .iter()
            .enumerate()
            .position(|(idx, y)| !used[idx] && x == y)
        {
            Some(idx) => {
                used[idx] = true;
                true
            }
            None => false,
        }
    })
}

impl fmt::Display for Property {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Property::Isa { type_ref, explicit } => {
                let keyword = if *explicit { "isa!" } else { "isa" };
                write!(f, "{keyword} {type_ref}")
            }
            Property::Sub {
                super_type,
                explicit,
            } => {
                let keyword = if *explicit { "sub!" } else { "sub" };
                write!(f, "{keyword} {super_type}")
            }
            Property::Label(label) => write!(f, "type {label}"),
            Property::Id(id) => write!(f, "id {id}"),
            Property::DataType(value_type) => write!(f, "datatype {value_type}"),
            Property::Has {
                attribute_type,
                attribute,
            } => match attribute.value_predicate() {
                Some(predicate) if !attribute.var().is_user_defined() => match predicate.equality_value() {
                    Some(value) => write!(f, "has {attribute_type} {value}"),
                    None => write!(f, "has {attribute_type} {predicate}"),
                },
                _ => write!(f, "has {attribute_type} {}", attribute.var()),
            },
            Property::Relation { role_players } => {
                let parts: Vec<String> = role_players.iter().map(|rp| rp.to_string()).collect();
                write!(f, "({})", parts.join(", "))
            }
            Property::Value(predicate) => predicate.fmt(f),
            Property::Neq(other) => write!(f, "!= {other}"),
        }
    }
}
