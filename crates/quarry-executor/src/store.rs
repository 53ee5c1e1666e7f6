//! Storage collaborator.
//!
//! [`GraphStore`] is the narrow interface the write executor needs from the
//! graph storage engine. [`MemoryStore`] is the in-crate reference
//! implementation: labels are interned once and referenced by a compact id,
//! instances are indexed per type with roaring bitmaps, and ownership /
//! role-player edges keep forward and backward indexes.

use anyhow::{anyhow, bail, Result};
use dashmap::DashMap;
use parking_lot::RwLock;
use quarry_pattern::{ConceptId, Label, Value, ValueType};
use roaring::RoaringBitmap;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU32, Ordering};

/// What the write executor needs from storage.
pub trait GraphStore {
    /// The schema type carrying `label`, if any.
    fn type_by_label(&self, label: &Label) -> Result<Option<ConceptId>>;

    fn contains(&self, id: ConceptId) -> Result<bool>;

    /// Define (or return the existing) type `label`.
    fn define_type(
        &self,
        label: &Label,
        super_type: Option<ConceptId>,
        value_type: Option<ValueType>,
    ) -> Result<ConceptId>;

    /// Create a new entity or relation instance of `type_id`.
    fn insert_instance(&self, type_id: ConceptId) -> Result<ConceptId>;

    /// Attributes are unique per (type, value): return the existing one or
    /// create it.
    fn put_attribute(&self, type_id: ConceptId, value: &Value) -> Result<ConceptId>;

    fn add_has(&self, owner: ConceptId, attribute: ConceptId) -> Result<()>;

    fn add_role_player(&self, relation: ConceptId, role: Option<&Label>, player: ConceptId) -> Result<()>;
}

// ============================================================================
// Label Interning
// ============================================================================

/// Interned label id
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(transparent)]
pub struct LabelId(u32);

impl LabelId {
    pub const fn raw(self) -> u32 {
        self.0
    }
}

/// Label interner: maps labels to compact ids
#[derive(Debug, Default)]
pub struct LabelInterner {
    label_to_id: DashMap<Label, LabelId>,
    id_to_label: DashMap<LabelId, Label>,
    next_id: AtomicU32,
}

impl LabelInterner {
    pub fn new() -> Self {
        Self::default()
    }

    /// Intern a label, returning its id
    pub fn intern(&self, label: &Label) -> LabelId {
        *self
            .label_to_id
            .entry(label.clone())
            .or_insert_with(|| {
                let id = LabelId(self.next_id.fetch_add(1, Ordering::SeqCst));
                self.id_to_label.insert(id, label.clone());
                id
            })
    }

    /// Look up an existing id without inserting.
    pub fn id_of(&self, label: &Label) -> Option<LabelId> {
        self.label_to_id.get(label).map(|id| *id)
    }

    pub fn lookup(&self, id: LabelId) -> Option<Label> {
        self.id_to_label.get(&id).map(|label| label.clone())
    }

    pub fn len(&self) -> usize {
        self.next_id.load(Ordering::SeqCst) as usize
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

// ============================================================================
// Concept Storage
// ============================================================================

#[derive(Debug, Clone)]
enum ConceptRecord {
    Type {
        label: LabelId,
        super_type: Option<u32>,
        value_type: Option<ValueType>,
    },
    Instance {
        type_id: u32,
        value: Option<Value>,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct RoleEdge {
    relation: u32,
    role: Option<LabelId>,
    player: u32,
}

#[derive(Debug, Default)]
struct Graph {
    /// concept id -> record
    concepts: Vec<ConceptRecord>,
    /// Type label index
    types_by_label: HashMap<LabelId, u32>,
    /// Instance index: type id -> bitmap of instance ids
    instances_by_type: HashMap<u32, RoaringBitmap>,
    /// Attribute uniqueness index: (type id, value) -> attribute id
    attributes: HashMap<(u32, Value), u32>,
    /// Forward ownership index: owner -> attributes
    has_forward: HashMap<u32, RoaringBitmap>,
    /// Backward ownership index: attribute -> owners
    has_backward: HashMap<u32, RoaringBitmap>,
    role_edges: Vec<RoleEdge>,
    /// relation -> role edge ids
    roles_forward: HashMap<u32, Vec<u32>>,
    /// player -> role edge ids
    roles_backward: HashMap<u32, Vec<u32>>,
}

impl Graph {
    fn push(&mut self, record: ConceptRecord) -> u32 {
        let id = self.concepts.len() as u32;
        self.concepts.push(record);
        id
    }

    fn record(&self, id: u32) -> Option<&ConceptRecord> {
        self.concepts.get(id as usize)
    }

    fn type_record(&self, id: u32) -> Result<(LabelId, Option<ValueType>)> {
        match self.record(id) {
            Some(ConceptRecord::Type {
                label, value_type, ..
            }) => Ok((*label, *value_type)),
            Some(ConceptRecord::Instance { .. }) => bail!("concept V{id} is not a type"),
            None => bail!("unknown concept V{id}"),
        }
    }

    fn instance(&self, id: u32) -> Result<()> {
        match self.record(id) {
            Some(ConceptRecord::Instance { .. }) => Ok(()),
            Some(ConceptRecord::Type { .. }) => bail!("concept V{id} is not an instance"),
            None => bail!("unknown concept V{id}"),
        }
    }

    fn add_instance(&mut self, type_id: u32, value: Option<Value>) -> u32 {
        let id = self.push(ConceptRecord::Instance { type_id, value });
        self.instances_by_type
            .entry(type_id)
            .or_insert_with(RoaringBitmap::new)
            .insert(id);
        id
    }
}

fn raw(id: ConceptId) -> Result<u32> {
    u32::try_from(id.raw()).map_err(|_| anyhow!("concept id {id} out of range"))
}

fn concept(id: u32) -> ConceptId {
    ConceptId::new(u64::from(id))
}

/// In-memory graph store.
///
/// Reads and writes go through one `RwLock`, so a store can be shared by
/// reference across threads.
#[derive(Debug, Default)]
pub struct MemoryStore {
    interner: LabelInterner,
    graph: RwLock<Graph>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of concepts (types and instances).
    pub fn len(&self) -> usize {
        self.graph.read().concepts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn label_of(&self, id: ConceptId) -> Option<Label> {
        let graph = self.graph.read();
        match graph.record(raw(id).ok()?)? {
            ConceptRecord::Type { label, .. } => self.interner.lookup(*label),
            ConceptRecord::Instance { .. } => None,
        }
    }

    pub fn super_type_of(&self, id: ConceptId) -> Option<ConceptId> {
        let graph = self.graph.read();
        match graph.record(raw(id).ok()?)? {
            ConceptRecord::Type { super_type, .. } => super_type.map(concept),
            ConceptRecord::Instance { .. } => None,
        }
    }

    pub fn value_type_of(&self, id: ConceptId) -> Option<ValueType> {
        let graph = self.graph.read();
        match graph.record(raw(id).ok()?)? {
            ConceptRecord::Type { value_type, .. } => *value_type,
            ConceptRecord::Instance { .. } => None,
        }
    }

    pub fn type_of(&self, id: ConceptId) -> Option<ConceptId> {
        let graph = self.graph.read();
        match graph.record(raw(id).ok()?)? {
            ConceptRecord::Instance { type_id, .. } => Some(concept(*type_id)),
            ConceptRecord::Type { .. } => None,
        }
    }

    pub fn value_of(&self, id: ConceptId) -> Option<Value> {
        let graph = self.graph.read();
        match graph.record(raw(id).ok()?)? {
            ConceptRecord::Instance { value, .. } => value.clone(),
            ConceptRecord::Type { .. } => None,
        }
    }

    /// Direct instances of a type.
    pub fn instances_of(&self, type_id: ConceptId) -> RoaringBitmap {
        let Ok(type_id) = raw(type_id) else {
            return RoaringBitmap::new();
        };
        self.graph
            .read()
            .instances_by_type
            .get(&type_id)
            .cloned()
            .unwrap_or_default()
    }

    pub fn attributes_of(&self, owner: ConceptId) -> RoaringBitmap {
        let Ok(owner) = raw(owner) else {
            return RoaringBitmap::new();
        };
        self.graph.read().has_forward.get(&owner).cloned().unwrap_or_default()
    }

    pub fn owners_of(&self, attribute: ConceptId) -> RoaringBitmap {
        let Ok(attribute) = raw(attribute) else {
            return RoaringBitmap::new();
        };
        self.graph
            .read()
            .has_backward
            .get(&attribute)
            .cloned()
            .unwrap_or_default()
    }

    /// `(role, player)` pairs of a relation, in insertion order.
    pub fn role_players_of(&self, relation: ConceptId) -> Vec<(Option<Label>, ConceptId)> {
        let Ok(relation) = raw(relation) else {
            return Vec::new();
        };
        let graph = self.graph.read();
        graph
            .roles_forward
            .get(&relation)
            .map(|ids| {
                ids.iter()
                    .filter_map(|&id| graph.role_edges.get(id as usize))
                    .map(|edge| {
                        let role = edge.role.and_then(|r| self.interner.lookup(r));
                        (role, concept(edge.player))
                    })
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Relations a concept plays a role in.
    pub fn relations_of(&self, player: ConceptId) -> RoaringBitmap {
        let Ok(player) = raw(player) else {
            return RoaringBitmap::new();
        };
        let graph = self.graph.read();
        graph
            .roles_backward
            .get(&player)
            .map(|ids| {
                ids.iter()
                    .filter_map(|&id| graph.role_edges.get(id as usize))
                    .map(|edge| edge.relation)
                    .collect()
            })
            .unwrap_or_default()
    }
}

impl GraphStore for MemoryStore {
    fn type_by_label(&self, label: &Label) -> Result<Option<ConceptId>> {
        let Some(label_id) = self.interner.id_of(label) else {
            return Ok(None);
        };
        Ok(self
            .graph
            .read()
            .types_by_label
            .get(&label_id)
            .map(|&id| concept(id)))
    }

    fn contains(&self, id: ConceptId) -> Result<bool> {
        let id = raw(id)?;
        Ok(self.graph.read().record(id).is_some())
    }

    fn define_type(
        &self,
        label: &Label,
        super_type: Option<ConceptId>,
        value_type: Option<ValueType>,
    ) -> Result<ConceptId> {
        let label_id = self.interner.intern(label);
        let super_raw = super_type.map(raw).transpose()?;
        let mut graph = self.graph.write();
        if let Some(super_raw) = super_raw {
            graph.type_record(super_raw)?;
        }
        if let Some(&existing) = graph.types_by_label.get(&label_id) {
            if let Some(ConceptRecord::Type {
                super_type: current,
                value_type: current_value_type,
                ..
            }) = graph.concepts.get_mut(existing as usize)
            {
                if super_raw.is_some() && *current != super_raw {
                    bail!("type `{label}` is already defined with a different supertype");
                }
                if value_type.is_some() && current_value_type.is_some() && *current_value_type != value_type {
                    bail!("type `{label}` is already defined with a different datatype");
                }
                *current = current.or(super_raw);
                *current_value_type = current_value_type.or(value_type);
            }
            return Ok(concept(existing));
        }
        let inherited = match super_raw {
            Some(s) => graph.type_record(s)?.1,
            None => None,
        };
        let id = graph.push(ConceptRecord::Type {
            label: label_id,
            super_type: super_raw,
            value_type: value_type.or(inherited),
        });
        graph.types_by_label.insert(label_id, id);
        tracing::trace!(%label, id, "defined type");
        Ok(concept(id))
    }

    fn insert_instance(&self, type_id: ConceptId) -> Result<ConceptId> {
        let type_raw = raw(type_id)?;
        let mut graph = self.graph.write();
        let (_, value_type) = graph.type_record(type_raw)?;
        if value_type.is_some() {
            bail!("attribute type {type_id} needs a value");
        }
        Ok(concept(graph.add_instance(type_raw, None)))
    }

    fn put_attribute(&self, type_id: ConceptId, value: &Value) -> Result<ConceptId> {
        let type_raw = raw(type_id)?;
        let mut graph = self.graph.write();
        let (label, value_type) = graph.type_record(type_raw)?;
        if let Some(expected) = value_type {
            if expected != value.value_type() {
                let label = self.interner.lookup(label).map(|l| l.to_string()).unwrap_or_default();
                bail!("attribute type `{label}` holds {expected} values, got {}", value.value_type());
            }
        }
        if let Some(&existing) = graph.attributes.get(&(type_raw, value.clone())) {
            return Ok(concept(existing));
        }
        let id = graph.add_instance(type_raw, Some(value.clone()));
        graph.attributes.insert((type_raw, value.clone()), id);
        Ok(concept(id))
    }

    fn add_has(&self, owner: ConceptId, attribute: ConceptId) -> Result<()> {
        let (owner, attribute) = (raw(owner)?, raw(attribute)?);
        let mut graph = self.graph.write();
        graph.instance(owner)?;
        graph.instance(attribute)?;
        graph.has_forward.entry(owner).or_default().insert(attribute);
        graph.has_backward.entry(attribute).or_default().insert(owner);
        Ok(())
    }

    fn add_role_player(&self, relation: ConceptId, role: Option<&Label>, player: ConceptId) -> Result<()> {
        let (relation, player) = (raw(relation)?, raw(player)?);
        let role = role.map(|r| self.interner.intern(r));
        let mut graph = self.graph.write();
        graph.instance(relation)?;
        graph.instance(player)?;
        let edge = RoleEdge { relation, role, player };
        if graph.role_edges.contains(&edge) {
            return Ok(());
        }
        let id = graph.role_edges.len() as u32;
        graph.role_edges.push(edge);
        graph.roles_forward.entry(relation).or_default().push(id);
        graph.roles_backward.entry(player).or_default().push(id);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_interning_is_stable() {
        let interner = LabelInterner::new();
        let a = interner.intern(&Label::new("person"));
        let b = interner.intern(&Label::new("person"));
        assert_eq!(a, b);
        assert_eq!(interner.lookup(a), Some(Label::new("person")));
        assert_eq!(interner.len(), 1);
        assert_eq!(interner.id_of(&Label::new("company")), None);
    }

    #[test]
    fn test_attributes_are_deduplicated_by_value() {
        let store = MemoryStore::new();
        let name = store
            .define_type(&Label::new("name"), None, Some(ValueType::String))
            .unwrap();
        let a = store.put_attribute(name, &Value::from("Bob")).unwrap();
        let b = store.put_attribute(name, &Value::from("Bob")).unwrap();
        assert_eq!(a, b);
        assert!(store.put_attribute(name, &Value::from(3i64)).is_err());
        assert_eq!(store.instances_of(name).len(), 1);
    }

    #[test]
    fn test_subtypes_inherit_datatype() {
        let store = MemoryStore::new();
        let name = store
            .define_type(&Label::new("name"), None, Some(ValueType::String))
            .unwrap();
        let nickname = store.define_type(&Label::new("nickname"), Some(name), None).unwrap();
        assert_eq!(store.value_type_of(nickname), Some(ValueType::String));
        assert_eq!(store.super_type_of(nickname), Some(name));
        assert!(store.insert_instance(nickname).is_err());
    }

    #[test]
    fn test_role_players_keep_both_indexes() {
        let store = MemoryStore::new();
        let person = store.define_type(&Label::new("person"), None, None).unwrap();
        let marriage = store.define_type(&Label::new("marriage"), None, None).unwrap();
        let alice = store.insert_instance(person).unwrap();
        let bob = store.insert_instance(person).unwrap();
        let rel = store.insert_instance(marriage).unwrap();
        store.add_role_player(rel, Some(&Label::new("wife")), alice).unwrap();
        store.add_role_player(rel, Some(&Label::new("husband")), bob).unwrap();
        store.add_role_player(rel, Some(&Label::new("husband")), bob).unwrap();
        assert_eq!(
            store.role_players_of(rel),
            vec![(Some(Label::new("wife")), alice), (Some(Label::new("husband")), bob)]
        );
        assert!(store.relations_of(bob).contains(raw(rel).unwrap()));
        assert!(store.add_role_player(rel, None, person).is_err());
    }
}
