//! Statements: properties predicated on one principal variable.

use crate::concept::{ConceptId, Label};
use crate::pattern::hash_one;
use crate::property::{Property, PropertyKind, RolePlayer, TypeRef};
use crate::value::{Value, ValuePredicate, ValueType};
use crate::variable::{VarGen, VarShape, Variable};
use std::fmt;
use std::hash::{Hash, Hasher};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Polarity {
    Positive,
    Negative,
}

/// An ordered set of properties about `var`, asserted (positive) or denied
/// (negative).
///
/// Equality treats the statement as a set of properties and compares the
/// principal variable by shape: a user-defined variable by name, any two
/// generated variables as interchangeable.
#[derive(Debug, Clone)]
pub struct Statement {
    var: Variable,
    polarity: Polarity,
    properties: Vec<Property>,
}

impl Statement {
    pub fn new(var: Variable) -> Self {
        Self {
            var,
            polarity: Polarity::Positive,
            properties: Vec::new(),
        }
    }

    pub fn with_property(mut self, property: Property) -> Self {
        self.properties.push(property);
        self
    }

    pub fn isa(self, type_ref: TypeRef) -> Self {
        self.with_property(Property::Isa {
            type_ref,
            explicit: false,
        })
    }

    pub fn isa_explicit(self, type_ref: TypeRef) -> Self {
        self.with_property(Property::Isa {
            type_ref,
            explicit: true,
        })
    }

    /// `isa <label>` with a fresh type variable.
    pub fn isa_label(self, gen: &mut VarGen, label: impl Into<Label>) -> Self {
        self.isa(TypeRef::labelled(gen.fresh(), label))
    }

    pub fn sub(self, super_type: TypeRef) -> Self {
        self.with_property(Property::Sub {
            super_type,
            explicit: false,
        })
    }

    pub fn sub_explicit(self, super_type: TypeRef) -> Self {
        self.with_property(Property::Sub {
            super_type,
            explicit: true,
        })
    }

    pub fn label(self, label: impl Into<Label>) -> Self {
        self.with_property(Property::Label(label.into()))
    }

    pub fn id(self, id: ConceptId) -> Self {
        self.with_property(Property::Id(id))
    }

    pub fn data_type(self, value_type: ValueType) -> Self {
        self.with_property(Property::DataType(value_type))
    }

    pub fn value(self, predicate: ValuePredicate) -> Self {
        self.with_property(Property::Value(predicate))
    }

    pub fn neq(self, other: Variable) -> Self {
        self.with_property(Property::Neq(other))
    }

    pub fn rel(self, role_players: impl IntoIterator<Item = RolePlayer>) -> Self {
        self.with_property(Property::Relation {
            role_players: role_players.into_iter().collect(),
        })
    }

    /// `has <attribute_type> <value>` through an anonymous attribute variable.
    pub fn has(self, gen: &mut VarGen, attribute_type: impl Into<Label>, value: impl Into<Value>) -> Self {
        self.has_predicate(gen, attribute_type, ValuePredicate::equals(value))
    }

    /// `has <attribute_type> <predicate>`, e.g. `has age > 30`.
    pub fn has_predicate(
        self,
        gen: &mut VarGen,
        attribute_type: impl Into<Label>,
        predicate: ValuePredicate,
    ) -> Self {
        let attribute_type = attribute_type.into();
        let attribute = Statement::new(gen.fresh())
            .isa_label(gen, attribute_type.clone())
            .value(predicate);
        self.has_statement(attribute_type, attribute)
    }

    /// `has <attribute_type> $a` for a named attribute variable.
    pub fn has_var(self, gen: &mut VarGen, attribute_type: impl Into<Label>, attribute: Variable) -> Self {
        let attribute_type = attribute_type.into();
        let attribute = Statement::new(attribute).isa_label(gen, attribute_type.clone());
        self.has_statement(attribute_type, attribute)
    }

    pub fn has_statement(self, attribute_type: Label, attribute: Statement) -> Self {
        self.with_property(Property::Has {
            attribute_type,
            attribute: Box::new(attribute),
        })
    }

    pub fn var(&self) -> &Variable {
        &self.var
    }

    pub fn polarity(&self) -> Polarity {
        self.polarity
    }

    pub fn is_negative(&self) -> bool {
        self.polarity == Polarity::Negative
    }

    pub fn properties(&self) -> &[Property] {
        &self.properties
    }

    pub fn has_kind(&self, kind: PropertyKind) -> bool {
        self.properties.iter().any(|p| p.kind() == kind)
    }

    pub fn property(&self, kind: PropertyKind) -> Option<&Property> {
        self.properties.iter().find(|p| p.kind() == kind)
    }

    pub fn value_predicate(&self) -> Option<&ValuePredicate> {
        self.properties.iter().find_map(|p| match p {
            Property::Value(predicate) => Some(predicate),
            _ => None,
        })
    }

    /// Same statement with flipped polarity.
    pub fn negated(&self) -> Statement {
        let polarity = match self.polarity {
            Polarity::Positive => Polarity::Negative,
            Polarity::Negative => Polarity::Positive,
        };
        Statement {
            polarity,
            ..self.clone()
        }
    }

    pub fn with_polarity(&self, polarity: Polarity) -> Statement {
        Statement {
            polarity,
            ..self.clone()
        }
    }

    /// Principal variable followed by every variable the properties mention,
    /// without duplicates, in first-mention order.
    pub fn variables(&self) -> Vec<Variable> {
        let mut out = vec![self.var.clone()];
        for property in &self.properties {
            for var in property.variables() {
                if !out.contains(&var) {
                    out.push(var);
                }
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

    /// All implicit statements carried by this statement's properties,
    /// recursively (attribute statements, type-label statements).
    pub fn inner_statements(&self) -> Vec<Statement> {
        let mut out = Vec::new();
        for property in &self.properties {
            for inner in property.inner_statements() {
                let nested = inner.inner_statements();
                out.push(inner);
                out.extend(nested);
            }
        }
        out
    }

    /// Decompose into independently negatable units, keeping polarity.
    ///
    /// Every property is its own unit, except that a relation property absorbs
    /// the statement's `isa`: `(a: $x, b: $y) isa marriage` is one unit.
    pub fn units(&self) -> Vec<Statement> {
        if self.properties.len() <= 1 {
            return vec![self.clone()];
        }
        let isa = if self.has_kind(PropertyKind::Relation) {
            self.property(PropertyKind::Isa).cloned()
        } else {
            None
        };
        let mut isa_pending = isa;
        let mut units = Vec::new();
        for property in &self.properties {
            match property {
                Property::Isa { .. } if self.has_kind(PropertyKind::Relation) => {}
                Property::Relation { .. } => {
                    let mut props = vec![property.clone()];
                    props.extend(isa_pending.take());
                    units.push(self.with_properties(props));
                }
                _ => units.push(self.with_properties(vec![property.clone()])),
            }
        }
        units
    }

    fn with_properties(&self, properties: Vec<Property>) -> Statement {
        Statement {
            var: self.var.clone(),
            polarity: self.polarity,
            properties,
        }
    }
}

impl PartialEq for Statement {
    fn eq(&self, other: &Self) -> bool {
        VarShape(&self.var) == VarShape(&other.var)
            && self.polarity == other.polarity
            && self.properties.len() == other.properties.len()
            && self.properties.iter().all(|p| other.properties.contains(p))
            && other.properties.iter().all(|p| self.properties.contains(p))
    }
}

impl Eq for Statement {}

impl Hash for Statement {
    fn hash<H: Hasher>(&self, state: &mut H) {
        VarShape(&self.var).hash(state);
        self.polarity.hash(state);
        let mut hashes: Vec<u64> = self.properties.iter().map(hash_one).collect();
        hashes.sort_unstable();
        hashes.dedup();
        hashes.hash(state);
    }
}

impl fmt::Display for Statement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_negative() {
            f.write_str("not { ")?;
        }
        write!(f, "{}", self.var)?;
        let mut first = true;
        for property in &self.properties {
            let sep = if first { " " } else { ", " };
            write!(f, "{sep}{property}")?;
            first = false;
        }
        f.write_str(";")?;
        if self.is_negative() {
            f.write_str(" };")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_units_split_every_property_but_keep_relation_isa_together() {
        let mut gen = VarGen::new();
        let x = Variable::named("x");
        let y = Variable::named("y");
        let rel = Statement::new(gen.fresh())
            .rel([RolePlayer::of("someRole", x.clone()), RolePlayer::of("otherRole", y)])
            .isa_label(&mut gen, "binary")
            .has(&mut gen, "name", "r");
        let units = rel.units();
        assert_eq!(units.len(), 2);
        assert!(units[0].has_kind(PropertyKind::Relation));
        assert!(units[0].has_kind(PropertyKind::Isa));
        assert!(units[1].has_kind(PropertyKind::Has));

        let plain = Statement::new(x)
            .isa_label(&mut gen, "type")
            .has(&mut gen, "resource-string", "value");
        assert_eq!(plain.units().len(), 2);
    }

    #[test]
    fn test_statements_from_different_generators_are_equal() {
        let mut g1 = VarGen::new();
        let mut g2 = VarGen::starting_at(100);
        let x = Variable::named("x");
        let a = Statement::new(x.clone()).isa_label(&mut g1, "person").has(&mut g1, "name", "Bob");
        let b = Statement::new(x).has(&mut g2, "name", "Bob").isa_label(&mut g2, "person");
        assert_eq!(a, b);
        assert_eq!(hash_one(&a), hash_one(&b));
        assert_ne!(a, a.negated());
    }

    #[test]
    fn test_inner_statements_reach_attribute_types() {
        let mut gen = VarGen::new();
        let s = Statement::new(Variable::named("x")).has(&mut gen, "name", "Bob");
        let inner = s.inner_statements();
        // attribute statement + its type-label statement
        assert_eq!(inner.len(), 2);
        assert!(inner[1].has_kind(PropertyKind::Label));
    }

    #[test]
    fn test_display_is_compact() {
        let mut gen = VarGen::new();
        let s = Statement::new(Variable::named("x"))
            .isa_label(&mut gen, "person")
            .has(&mut gen, "name", "Bob");
        assert_eq!(s.to_string(), "$x isa person, has name \"Bob\";");
        assert_eq!(s.negated().to_string(), "not { $x isa person, has name \"Bob\"; };");
    }
}
