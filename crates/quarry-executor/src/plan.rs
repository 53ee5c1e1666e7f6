//! Fragment compiler: one traversal plan per conjunction.

use crate::config::CompilerConfig;
use crate::fragment::EquivalentFragmentSet;
use quarry_pattern::Variable;
use std::collections::BTreeSet;
use std::fmt;

/// Deduplicated fragment sets in execution order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TraversalPlan {
    sets: Vec<EquivalentFragmentSet>,
}

impl TraversalPlan {
    /// Drop duplicate sets (first occurrence kept), then order them.
    ///
    /// Ordering is greedy: among the sets connected to the variables visited
    /// so far (any set, when none is connected), take the cheapest, breaking
    /// ties by emission order.
    pub fn compile(sets: impl IntoIterator<Item = EquivalentFragmentSet>, config: &CompilerConfig) -> Self {
        let mut unique: Vec<EquivalentFragmentSet> = Vec::new();
        let mut emitted = 0usize;
        for set in sets {
            emitted += 1;
            if !unique.contains(&set) {
                unique.push(set);
            }
        }
        let sets = if config.order_fragments {
            order_greedily(unique)
        } else {
            unique
        };
        tracing::debug!(emitted, planned = sets.len(), "compiled traversal plan");
        Self { sets }
    }

    pub fn sets(&self) -> &[EquivalentFragmentSet] {
        &self.sets
    }

    pub fn len(&self) -> usize {
        self.sets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sets.is_empty()
    }

    pub fn variables(&self) -> BTreeSet<Variable> {
        self.sets.iter().flat_map(EquivalentFragmentSet::variables).collect()
    }
}

fn order_greedily(sets: Vec<EquivalentFragmentSet>) -> Vec<EquivalentFragmentSet> {
    let mut remaining: Vec<(usize, EquivalentFragmentSet)> = sets.into_iter().enumerate().collect();
    let mut visited: BTreeSet<Variable> = BTreeSet::new();
    let mut ordered = Vec::with_capacity(remaining.len());

    while !remaining.is_empty() {
        let connected = |set: &EquivalentFragmentSet| set.variables().iter().any(|v| visited.contains(v));
        let any_connected = remaining.iter().any(|(_, set)| connected(set));
        let pick = remaining
            .iter()
            .enumerate()
            .filter(|(_, (_, set))| !any_connected || connected(set))
            .min_by_key(|(_, (emitted, set))| (set.cost(), *emitted))
            .map(|(pos, _)| pos);
        let Some(pos) = pick else {
            break;
        };
        let (_, set) = remaining.remove(pos);
        visited.extend(set.variables());
        ordered.push(set);
    }
    ordered
}

impl fmt::Display for TraversalPlan {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (idx, set) in self.sets.iter().enumerate() {
            writeln!(f, "{idx}: {set}")?;
        }
        Ok(())
    }
}
