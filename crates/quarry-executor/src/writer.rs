//! Insert-time work units.

use crate::error::WriteError;
use crate::store::GraphStore;
use quarry_pattern::{ConceptId, Label, PropertyKind, RolePlayer, Value, ValueType, Variable};
use std::collections::BTreeSet;
use std::fmt;

/// What a writer does once its requirements are bound.
#[derive(Debug, Clone, PartialEq)]
pub enum WriteAction {
    /// The produced concept is an instance of the concept bound to `type_var`.
    Isa { type_var: Variable },
    /// The produced type is a subtype of the concept bound to `super_var`.
    Sub { super_var: Variable },
    Label(Label),
    Id(ConceptId),
    DataType(ValueType),
    Value(Value),
    /// Attach the attribute bound to `attribute` to the writer's variable.
    Has { attribute: Variable },
    /// Attach each player to the relation bound to the writer's variable.
    RolePlayers { role_players: Vec<RolePlayer> },
}

/// One property's contribution to an insert.
#[derive(Debug, Clone, PartialEq)]
pub struct Writer {
    pub var: Variable,
    pub property: PropertyKind,
    pub required: BTreeSet<Variable>,
    pub produced: BTreeSet<Variable>,
    pub action: WriteAction,
}

impl Writer {
    /// A writer that contributes to the concept bound to `var`.
    pub fn producing(var: Variable, property: PropertyKind, required: impl IntoIterator<Item = Variable>, action: WriteAction) -> Self {
        Self {
            produced: BTreeSet::from([var.clone()]),
            var,
            property,
            required: required.into_iter().collect(),
            action,
        }
    }

    /// A writer that only links already-bound concepts.
    pub fn linking(var: Variable, property: PropertyKind, required: impl IntoIterator<Item = Variable>, action: WriteAction) -> Self {
        Self {
            var,
            property,
            required: required.into_iter().collect(),
            produced: BTreeSet::new(),
            action,
        }
    }
}

impl fmt::Display for Writer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let list = |vars: &BTreeSet<Variable>| {
            vars.iter().map(|v| v.to_string()).collect::<Vec<_>>().join(", ")
        };
        write!(
            f,
            "{:?}({}) [{}] -> [{}]",
            self.property,
            self.var,
            list(&self.required),
            list(&self.produced)
        )
    }
}

/// Accumulates the producing writers' contributions for one variable until
/// the concept is created.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ConceptBuilder {
    pub isa: Option<ConceptId>,
    pub super_type: Option<ConceptId>,
    pub label: Option<Label>,
    pub id: Option<ConceptId>,
    pub value_type: Option<ValueType>,
    pub value: Option<Value>,
}

impl ConceptBuilder {
    /// Create (or look up) the concept described so far.
    ///
    /// - an id refers to an existing concept;
    /// - a label with a supertype or datatype defines a type, a bare label
    ///   looks one up;
    /// - otherwise an `isa` creates an instance (an attribute when a value is
    ///   given).
    pub fn build<S: GraphStore + ?Sized>(&self, var: &Variable, store: &S) -> Result<ConceptId, WriteError> {
        if let Some(id) = self.id {
            return if store.contains(id)? {
                Ok(id)
            } else {
                Err(WriteError::UnknownConcept { id })
            };
        }
        if let Some(label) = &self.label {
            if self.super_type.is_some() || self.value_type.is_some() {
                return Ok(store.define_type(label, self.super_type, self.value_type)?);
            }
            return store
                .type_by_label(label)?
                .ok_or_else(|| WriteError::UnknownLabel { label: label.clone() });
        }
        if self.super_type.is_some() || self.value_type.is_some() {
            return Err(WriteError::MissingLabel { var: var.clone() });
        }
        let Some(type_id) = self.isa else {
            return Err(WriteError::MissingType { var: var.clone() });
        };
        match &self.value {
            Some(value) => Ok(store.put_attribute(type_id, value)?),
            None => Ok(store.insert_instance(type_id)?),
        }
    }
}
