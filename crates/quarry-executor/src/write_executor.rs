//! Insert scheduling and execution.
//!
//! Every writer declares the variables it needs bound (`required`) and the
//! variables it helps create (`produced`). [`InsertPlan::new`] turns that into
//! a dependency graph (a writer depends on every producer of each variable it
//! requires) and orders it with Kahn's algorithm. Ready writers are taken
//! lowest index first, so the order is a pure function of the writer list.
//!
//! Planning happens before anything touches the store: a cycle is reported
//! as [`WriteError::DependencyCycle`] and nothing is written.

use crate::error::WriteError;
use crate::store::GraphStore;
use crate::writer::{ConceptBuilder, WriteAction, Writer};
use quarry_pattern::{ConceptId, Variable};
use quarry_reasoner::Answer;
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

/// Writers plus the order they run in.
#[derive(Debug, Clone, PartialEq)]
pub struct InsertPlan {
    writers: Vec<Writer>,
    order: Vec<usize>,
    bound: BTreeSet<Variable>,
}

impl InsertPlan {
    /// Schedule `writers`.
    ///
    /// `statement_vars` are the principal variables of the insert's
    /// statements; each must be bound already or produced by some writer.
    /// `bound` are the variables the caller binds before execution.
    pub fn new(
        writers: Vec<Writer>,
        statement_vars: impl IntoIterator<Item = Variable>,
        bound: &BTreeSet<Variable>,
    ) -> Result<Self, WriteError> {
        let mut producers: BTreeMap<&Variable, Vec<usize>> = BTreeMap::new();
        for (idx, writer) in writers.iter().enumerate() {
            for var in &writer.produced {
                producers.entry(var).or_default().push(idx);
            }
        }

        for var in statement_vars {
            if !bound.contains(&var) && !producers.contains_key(&var) {
                return Err(WriteError::NothingToInsert { var });
            }
        }
        for writer in &writers {
            for var in &writer.required {
                if !bound.contains(var) && !producers.contains_key(var) {
                    return Err(WriteError::UnboundRequirement { var: var.clone() });
                }
            }
        }

        // dependants[p] = writers waiting on p
        let mut dependants: Vec<BTreeSet<usize>> = vec![BTreeSet::new(); writers.len()];
        let mut in_degree: Vec<usize> = vec![0; writers.len()];
        for (idx, writer) in writers.iter().enumerate() {
            let deps: BTreeSet<usize> = writer
                .required
                .iter()
                .filter(|var| !bound.contains(*var))
                .filter_map(|var| producers.get(var))
                .flatten()
                .copied()
                .collect();
            in_degree[idx] = deps.len();
            for dep in deps {
                dependants[dep].insert(idx);
            }
        }

        let mut ready: BTreeSet<usize> = (0..writers.len()).filter(|idx| in_degree[*idx] == 0).collect();
        let mut order = Vec::with_capacity(writers.len());
        while let Some(idx) = ready.pop_first() {
            order.push(idx);
            for &next in &dependants[idx] {
                in_degree[next] -= 1;
                if in_degree[next] == 0 {
                    ready.insert(next);
                }
            }
        }

        if order.len() < writers.len() {
            let scheduled: BTreeSet<usize> = order.iter().copied().collect();
            let variables: BTreeSet<Variable> = writers
                .iter()
                .enumerate()
                .filter(|(idx, _)| !scheduled.contains(idx))
                .flat_map(|(_, writer)| writer.produced.iter().cloned())
                .collect();
            tracing::debug!(
                writers = writers.len(),
                scheduled = order.len(),
                "writer dependency cycle"
            );
            return Err(WriteError::DependencyCycle {
                variables: variables.into_iter().collect(),
            });
        }

        tracing::debug!(writers = writers.len(), bound = bound.len(), "scheduled insert writers");
        Ok(Self {
            writers,
            order,
            bound: bound.clone(),
        })
    }

    pub fn writers(&self) -> &[Writer] {
        &self.writers
    }

    /// Indexes into [`Self::writers`], in execution order.
    pub fn order(&self) -> &[usize] {
        &self.order
    }

    pub fn ordered(&self) -> impl Iterator<Item = &Writer> {
        self.order.iter().map(move |idx| &self.writers[*idx])
    }

    /// Variables the plan was scheduled against as already bound.
    pub fn bound(&self) -> &BTreeSet<Variable> {
        &self.bound
    }

    pub fn len(&self) -> usize {
        self.writers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.writers.is_empty()
    }
}

impl fmt::Display for InsertPlan {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (step, writer) in self.ordered().enumerate() {
            writeln!(f, "{step}: {writer}")?;
        }
        Ok(())
    }
}

/// Runs an [`InsertPlan`] against a store.
pub struct WriteExecutor<'s, S: GraphStore + ?Sized> {
    store: &'s S,
}

impl<'s, S: GraphStore + ?Sized> WriteExecutor<'s, S> {
    pub fn new(store: &'s S) -> Self {
        Self { store }
    }

    /// Execute each writer once, in plan order.
    ///
    /// `bound` maps the plan's externally bound variables to their concepts.
    /// Writers whose produced variables are all bound are skipped: the
    /// concept already exists. Returns every variable's concept.
    pub fn execute(&self, plan: &InsertPlan, bound: &Answer) -> Result<Answer, WriteError> {
        for var in plan.bound() {
            if !bound.contains_key(var) {
                return Err(WriteError::UnboundRequirement { var: var.clone() });
            }
        }

        let mut run = Execution {
            store: self.store,
            concepts: bound.clone(),
            builders: BTreeMap::new(),
        };
        for writer in plan.ordered() {
            if !writer.produced.is_empty() && writer.produced.iter().all(|v| bound.contains_key(v)) {
                tracing::trace!(writer = %writer, "skipping writer for bound variable");
                continue;
            }
            tracing::trace!(writer = %writer, "running writer");
            run.apply(writer)?;
        }
        run.finish()
    }
}

struct Execution<'s, S: GraphStore + ?Sized> {
    store: &'s S,
    concepts: Answer,
    builders: BTreeMap<Variable, ConceptBuilder>,
}

impl<S: GraphStore + ?Sized> Execution<'_, S> {
    /// The concept bound to `var`, creating it from its builder on first use.
    fn concept(&mut self, var: &Variable) -> Result<ConceptId, WriteError> {
        if let Some(id) = self.concepts.get(var) {
            return Ok(*id);
        }
        let builder = self
            .builders
            .get(var)
            .ok_or_else(|| WriteError::UnboundRequirement { var: var.clone() })?;
        let id = builder.build(var, self.store)?;
        tracing::trace!(var = %var, concept = %id, "created concept");
        self.concepts.insert(var.clone(), id);
        Ok(id)
    }

    fn apply(&mut self, writer: &Writer) -> Result<(), WriteError> {
        match &writer.action {
            WriteAction::Isa { type_var } => {
                let type_id = self.concept(type_var)?;
                self.builder(&writer.var).isa = Some(type_id);
            }
            WriteAction::Sub { super_var } => {
                let super_id = self.concept(super_var)?;
                self.builder(&writer.var).super_type = Some(super_id);
            }
            WriteAction::Label(label) => self.builder(&writer.var).label = Some(label.clone()),
            WriteAction::Id(id) => self.builder(&writer.var).id = Some(*id),
            WriteAction::DataType(value_type) => self.builder(&writer.var).value_type = Some(*value_type),
            WriteAction::Value(value) => self.builder(&writer.var).value = Some(value.clone()),
            WriteAction::Has { attribute } => {
                let owner = self.concept(&writer.var)?;
                let attribute = self.concept(attribute)?;
                self.store.add_has(owner, attribute)?;
            }
            WriteAction::RolePlayers { role_players } => {
                let relation = self.concept(&writer.var)?;
                for rp in role_players {
                    let player = self.concept(&rp.player)?;
                    self.store.add_role_player(relation, rp.role.as_ref(), player)?;
                }
            }
        }
        Ok(())
    }

    fn builder(&mut self, var: &Variable) -> &mut ConceptBuilder {
        self.builders.entry(var.clone()).or_default()
    }

    /// Create every concept no dependant asked for yet.
    fn finish(mut self) -> Result<Answer, WriteError> {
        let pending: Vec<Variable> = self
            .builders
            .keys()
            .filter(|var| !self.concepts.contains_key(*var))
            .cloned()
            .collect();
        for var in pending {
            self.concept(&var)?;
        }
        Ok(self.concepts)
    }
}
