//! Attribute values, datatypes, and value predicates.

use crate::variable::{VarShape, Variable};
use std::fmt;
use std::hash::{Hash, Hasher};

/// Datatype of an attribute type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ValueType {
    String,
    Long,
    Double,
    Boolean,
    DateTime,
}

impl fmt::Display for ValueType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ValueType::String => "string",
            ValueType::Long => "long",
            ValueType::Double => "double",
            ValueType::Boolean => "boolean",
            ValueType::DateTime => "datetime",
        };
        f.write_str(name)
    }
}

/// A concrete attribute value.
///
/// `Double` compares and hashes by bit pattern so values can live in hashed
/// collections; `DateTime` is epoch milliseconds.
#[derive(Debug, Clone)]
pub enum Value {
    String(String),
    Long(i64),
    Double(f64),
    Boolean(bool),
    DateTime(i64),
}

impl Value {
    pub fn value_type(&self) -> ValueType {
        match self {
            Value::String(_) => ValueType::String,
            Value::Long(_) => ValueType::Long,
            Value::Double(_) => ValueType::Double,
            Value::Boolean(_) => ValueType::Boolean,
            Value::DateTime(_) => ValueType::DateTime,
        }
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::String(a), Value::String(b)) => a == b,
            (Value::Long(a), Value::Long(b)) => a == b,
            (Value::Double(a), Value::Double(b)) => a.to_bits() == b.to_bits(),
            (Value::Boolean(a), Value::Boolean(b)) => a == b,
            (Value::DateTime(a), Value::DateTime(b)) => a == b,
            _ => false,
        }
    }
}

impl Eq for Value {}

impl Hash for Value {
    fn hash<H: Hasher>(&self, state: &mut H) {
        std::mem::discriminant(self).hash(state);
        match self {
            Value::String(v) => v.hash(state),
            Value::Long(v) | Value::DateTime(v) => v.hash(state),
            Value::Double(v) => v.to_bits().hash(state),
            Value::Boolean(v) => v.hash(state),
        }
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Value::String(value.to_string())
    }
}

impl From<String> for Value {
    fn from(value: String) -> Self {
        Value::String(value)
    }
}

impl From<i64> for Value {
    fn from(value: i64) -> Self {
        Value::Long(value)
    }
}

impl From<f64> for Value {
    fn from(value: f64) -> Self {
        Value::Double(value)
    }
}

impl From<bool> for Value {
    fn from(value: bool) -> Self {
        Value::Boolean(value)
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::String(v) => write!(f, "{v:?}"),
            Value::Long(v) => write!(f, "{v}"),
            Value::Double(v) => write!(f, "{v}"),
            Value::Boolean(v) => write!(f, "{v}"),
            Value::DateTime(v) => write!(f, "@{v}"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Comparator {
    Eq,
    Neq,
    Gt,
    Gte,
    Lt,
    Lte,
    Contains,
    Like,
}

impl Comparator {
    pub fn symbol(self) -> &'static str {
        match self {
            Comparator::Eq => "==",
            Comparator::Neq => "!==",
            Comparator::Gt => ">",
            Comparator::Gte => ">=",
            Comparator::Lt => "<",
            Comparator::Lte => "<=",
            Comparator::Contains => "contains",
            Comparator::Like => "like",
        }
    }
}

/// Right-hand side of a value predicate.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Operand {
    Value(Value),
    Variable(Variable),
}

impl Operand {
    pub fn variable(&self) -> Option<&Variable> {
        match self {
            Operand::Variable(var) => Some(var),
            Operand::Value(_) => None,
        }
    }

    pub fn value(&self) -> Option<&Value> {
        match self {
            Operand::Value(value) => Some(value),
            Operand::Variable(_) => None,
        }
    }

    pub(crate) fn shape_eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Operand::Value(a), Operand::Value(b)) => a == b,
            (Operand::Variable(a), Operand::Variable(b)) => VarShape(a) == VarShape(b),
            _ => false,
        }
    }

    pub(crate) fn shape_hash<H: Hasher>(&self, state: &mut H) {
        match self {
            Operand::Value(value) => {
                0u8.hash(state);
                value.hash(state);
            }
            Operand::Variable(var) => {
                1u8.hash(state);
                VarShape(var).hash(state);
            }
        }
    }
}

impl fmt::Display for Operand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Operand::Value(value) => value.fmt(f),
            Operand::Variable(var) => var.fmt(f),
        }
    }
}

/// `comparator operand`, e.g. `== "Bob"` or `> $y`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ValuePredicate {
    pub comparator: Comparator,
    pub operand: Operand,
}

impl ValuePredicate {
    pub fn new(comparator: Comparator, operand: Operand) -> Self {
        Self {
            comparator,
            operand,
        }
    }

    pub fn equals(value: impl Into<Value>) -> Self {
        Self::new(Comparator::Eq, Operand::Value(value.into()))
    }

    pub fn compare(comparator: Comparator, value: impl Into<Value>) -> Self {
        Self::new(comparator, Operand::Value(value.into()))
    }

    pub fn compare_var(comparator: Comparator, var: Variable) -> Self {
        Self::new(comparator, Operand::Variable(var))
    }

    /// Only `== constant` can be written: it fixes the attribute's value.
    pub fn is_insertable(&self) -> bool {
        self.comparator == Comparator::Eq && matches!(self.operand, Operand::Value(_))
    }

    /// The constant this predicate pins the variable to, if any.
    pub fn equality_value(&self) -> Option<&Value> {
        if self.comparator == Comparator::Eq {
            self.operand.value()
        } else {
            None
        }
    }
}

impl fmt::Display for ValuePredicate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.comparator.symbol(), self.operand)
    }
}
