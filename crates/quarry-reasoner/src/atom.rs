//! Reasoning atoms.

use quarry_pattern::{ConceptId, Label, RolePlayer, Statement, ValuePredicate, ValueType, Variable};
use std::fmt;

/// Identity of the query an atom belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[repr(transparent)]
pub struct QueryId(u64);

impl QueryId {
    pub const fn new(raw: u64) -> Self {
        Self(raw)
    }

    pub const fn raw(self) -> u64 {
        self.0
    }
}

impl fmt::Display for QueryId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "q{}", self.0)
    }
}

/// Allocator for query ids, owned by a compilation context.
#[derive(Debug, Default, Clone)]
pub struct QueryIdGen {
    next: u64,
}

impl QueryIdGen {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fresh(&mut self) -> QueryId {
        let id = QueryId(self.next);
        self.next += 1;
        id
    }
}

/// The constant an id predicate pins its variable to.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum IdConstant {
    Id(ConceptId),
    Label(Label),
}

impl fmt::Display for IdConstant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IdConstant::Id(id) => write!(f, "id {id}"),
            IdConstant::Label(label) => write!(f, "type {label}"),
        }
    }
}

/// Kind-specific payload of an atom.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum AtomKind {
    Isa {
        type_var: Variable,
        type_label: Option<Label>,
        explicit: bool,
    },
    Sub {
        super_var: Variable,
        super_label: Option<Label>,
        explicit: bool,
    },
    DataType(ValueType),
    /// `$owner has <attribute_type> $attribute`, with the attribute's value
    /// predicate folded in when the query gave one.
    Resource {
        attribute_type: Label,
        attribute: Variable,
        predicate: Option<ValuePredicate>,
    },
    /// A relation with its role players. The statement's `isa` is absorbed
    /// here instead of producing a separate `Isa` atom.
    Relation {
        type_var: Option<Variable>,
        type_label: Option<Label>,
        role_players: Vec<RolePlayer>,
    },
    ValuePredicate(ValuePredicate),
    IdPredicate(IdConstant),
    NeqPredicate(Variable),
}

impl AtomKind {
    pub fn name(&self) -> &'static str {
        match self {
            AtomKind::Isa { .. } => "isa",
            AtomKind::Sub { .. } => "sub",
            AtomKind::DataType(_) => "datatype",
            AtomKind::Resource { .. } => "resource",
            AtomKind::Relation { .. } => "relation",
            AtomKind::ValuePredicate(_) => "value",
            AtomKind::IdPredicate(_) => "id",
            AtomKind::NeqPredicate(_) => "neq",
        }
    }

    pub(crate) fn same_kind(&self, other: &AtomKind) -> bool {
        std::mem::discriminant(self) == std::mem::discriminant(other)
    }
}

/// One property's content, as the reasoner sees it.
///
/// Atoms are values: [`Atomic::copy`] re-parents without touching the
/// original, and equality is plain structural equality (use
/// [`crate::AtomicEquivalence`] for variable-insensitive comparisons).
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Atomic {
    var: Variable,
    pattern: Statement,
    parent: QueryId,
    kind: AtomKind,
}

impl Atomic {
    pub fn new(var: Variable, pattern: Statement, parent: QueryId, kind: AtomKind) -> Self {
        Self {
            var,
            pattern,
            parent,
            kind,
        }
    }

    pub fn var(&self) -> &Variable {
        &self.var
    }

    /// The statement this atom was derived from.
    pub fn pattern(&self) -> &Statement {
        &self.pattern
    }

    pub fn parent(&self) -> QueryId {
        self.parent
    }

    pub fn kind(&self) -> &AtomKind {
        &self.kind
    }

    pub fn copy(&self, parent: QueryId) -> Atomic {
        Atomic {
            parent,
            ..self.clone()
        }
    }

    /// Variables in canonical position order: the designated variable first,
    /// then the payload's variables in the order the payload lists them.
    pub fn variables(&self) -> Vec<Variable> {
        let mut out = vec![self.var.clone()];
        let mut push = |var: &Variable| {
            if !out.contains(var) {
                out.push(var.clone());
            }
        };
        match &self.kind {
            AtomKind::Isa { type_var, .. } => push(type_var),
            AtomKind::Sub { super_var, .. } => push(super_var),
            AtomKind::DataType(_) | AtomKind::IdPredicate(_) => {}
            AtomKind::Resource {
                attribute,
                predicate,
                ..
            } => {
                push(attribute);
                if let Some(var) = predicate.as_ref().and_then(|p| p.operand.variable()) {
                    push(var);
                }
            }
            AtomKind::Relation {
                type_var,
                role_players,
                ..
            } => {
                if let Some(type_var) = type_var {
                    push(type_var);
                }
                for rp in role_players {
                    push(&rp.player);
                }
            }
            AtomKind::ValuePredicate(predicate) => {
                if let Some(var) = predicate.operand.variable() {
                    push(var);
                }
            }
            AtomKind::NeqPredicate(other) => push(other),
        }
        out
    }

    /// True for atoms that only constrain an already-bound variable.
    pub fn is_predicate(&self) -> bool {
        matches!(
            self.kind,
            AtomKind::ValuePredicate(_) | AtomKind::IdPredicate(_) | AtomKind::NeqPredicate(_)
        )
    }
}

impl fmt::Display for Atomic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.kind {
            AtomKind::Isa {
                type_var,
                type_label,
                explicit,
            } => {
                let keyword = if *explicit { "isa!" } else { "isa" };
                match type_label {
                    Some(label) => write!(f, "{} {keyword} {label}", self.var),
                    None => write!(f, "{} {keyword} {type_var}", self.var),
                }
            }
            AtomKind::Sub {
                super_var,
                super_label,
                explicit,
            } => {
                let keyword = if *explicit { "sub!" } else { "sub" };
                match super_label {
                    Some(label) => write!(f, "{} {keyword} {label}", self.var),
                    None => write!(f, "{} {keyword} {super_var}", self.var),
                }
            }
            AtomKind::DataType(value_type) => write!(f, "{} datatype {value_type}", self.var),
            AtomKind::Resource {
                attribute_type,
                attribute,
                predicate,
            } => {
                write!(f, "{} has {attribute_type} {attribute}", self.var)?;
                if let Some(predicate) = predicate {
                    write!(f, " ({predicate})")?;
                }
                Ok(())
            }
            AtomKind::Relation {
                type_label,
                role_players,
                ..
            } => {
                let parts: Vec<String> = role_players.iter().map(|rp| rp.to_string()).collect();
                write!(f, "{} ({})", self.var, parts.join(", "))?;
                if let Some(label) = type_label {
                    write!(f, " isa {label}")?;
                }
                Ok(())
            }
            AtomKind::ValuePredicate(predicate) => write!(f, "{} {predicate}", self.var),
            AtomKind::IdPredicate(constant) => write!(f, "{} {constant}", self.var),
            AtomKind::NeqPredicate(other) => write!(f, "{} != {other}", self.var),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use quarry_pattern::VarGen;

    #[test]
    fn test_copy_only_changes_parent() {
        let x = Variable::named("x");
        let atom = Atomic::new(
            x.clone(),
            Statement::new(x).data_type(ValueType::Long),
            QueryId::new(1),
            AtomKind::DataType(ValueType::Long),
        );
        let copied = atom.copy(QueryId::new(2));
        assert_eq!(copied.parent(), QueryId::new(2));
        assert_eq!(copied.kind(), atom.kind());
        assert_eq!(atom.parent(), QueryId::new(1));
    }

    #[test]
    fn test_relation_variables_follow_role_player_order() {
        let mut gen = VarGen::new();
        let rel = gen.fresh();
        let x = Variable::named("x");
        let y = Variable::named("y");
        let players = vec![RolePlayer::of("employee", x.clone()), RolePlayer::of("employer", y.clone())];
        let atom = Atomic::new(
            rel.clone(),
            Statement::new(rel.clone()).rel(players.clone()),
            QueryId::new(0),
            AtomKind::Relation {
                type_var: None,
                type_label: Some(Label::new("employment")),
                role_players: players,
            },
        );
        assert_eq!(atom.variables(), vec![rel, x, y]);
        assert_eq!(atom.to_string(), "$_0 (employee: $x, employer: $y) isa employment");
    }
}
