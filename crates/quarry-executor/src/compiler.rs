//! Top-level query compiler.

use crate::config::CompilerConfig;
use crate::error::CompileError;
use crate::plan::TraversalPlan;
use crate::property::{statement_atoms, statement_fragments, statement_writers};
use crate::write_executor::InsertPlan;
use quarry_pattern::{Conjunction, Pattern, Statement, VarGen, Variable};
use quarry_reasoner::{QueryIdGen, ReasonerQuery};
use std::collections::BTreeSet;

/// Per-compiler allocation state: generated variables and query ids.
#[derive(Debug, Default, Clone)]
pub struct CompileContext {
    pub vars: VarGen,
    pub queries: QueryIdGen,
}

impl CompileContext {
    pub fn new() -> Self {
        Self::default()
    }

    /// Move the variable allocator past every generated variable already in
    /// `pattern`, so fresh fragment variables cannot collide with them.
    fn reserve(&mut self, pattern: &Pattern) {
        let max = pattern
            .statements()
            .into_iter()
            .flat_map(|s| std::iter::once(s.clone()).chain(s.inner_statements()))
            .flat_map(|s| s.variables())
            .filter_map(|v| match v {
                Variable::Generated(id) => Some(id),
                Variable::Named(_) => None,
            })
            .max();
        if let Some(max) = max {
            if self.vars.allocated() <= max {
                self.vars = VarGen::starting_at(max + 1);
            }
        }
    }
}

/// One disjunct of a match query, compiled.
#[derive(Debug, Clone, PartialEq)]
pub struct CompiledConjunction {
    pub conjunction: Conjunction<Statement>,
    /// Traversal for the positive statements.
    pub plan: TraversalPlan,
    /// One traversal per negative statement (of its positive form); an answer
    /// of `plan` survives when none of these match it.
    pub negations: Vec<TraversalPlan>,
    pub query: ReasonerQuery,
}

#[derive(Debug, Default)]
pub struct QueryCompiler {
    config: CompilerConfig,
    context: CompileContext,
}

impl QueryCompiler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_config(config: CompilerConfig) -> Self {
        Self {
            config,
            context: CompileContext::new(),
        }
    }

    pub fn config(&self) -> &CompilerConfig {
        &self.config
    }

    /// Normalize and validate `pattern`, then plan each disjunct.
    pub fn compile_match(&mut self, pattern: &Pattern) -> Result<Vec<CompiledConjunction>, CompileError> {
        self.context.reserve(pattern);
        let validated = pattern.validate_query(self.config.normalize_limits())?;

        let mut compiled = Vec::with_capacity(validated.conjunctions().len());
        for conjunction in validated.conjunctions() {
            let positive: Vec<_> = conjunction
                .positive()
                .flat_map(|s| statement_fragments(s, &mut self.context.vars))
                .collect();
            let plan = TraversalPlan::compile(positive, &self.config);

            let negative: Vec<Statement> = conjunction.negative().cloned().collect();
            let negations = negative
                .iter()
                .map(|s| {
                    let sets = statement_fragments(&s.negated(), &mut self.context.vars);
                    TraversalPlan::compile(sets, &self.config)
                })
                .collect();

            let query = self.reasoner_query(conjunction);
            tracing::debug!(
                query = %query.id(),
                fragments = plan.len(),
                negations = negative.len(),
                atoms = query.atoms().len(),
                "compiled conjunction"
            );
            compiled.push(CompiledConjunction {
                conjunction: conjunction.clone(),
                plan,
                negations,
                query,
            });
        }
        Ok(compiled)
    }

    /// Collect the writers of an insert pattern and schedule them.
    ///
    /// Inserts are plain conjunctions: negation, disjunction and negative
    /// statements are rejected.
    pub fn compile_insert(&mut self, pattern: &Pattern, bound: &BTreeSet<Variable>) -> Result<InsertPlan, CompileError> {
        check_insertable(pattern)?;
        let statements = pattern.statements();
        if let Some(negative) = statements.iter().find(|s| s.is_negative()) {
            return Err(CompileError::UnsupportedInInsert {
                reason: format!("negative statement `{negative}`"),
            });
        }

        let writers = statements.iter().flat_map(|s| statement_writers(s)).collect();
        let statement_vars: Vec<Variable> = statements
            .iter()
            .flat_map(|s| std::iter::once((*s).clone()).chain(s.inner_statements()))
            .map(|s| s.var().clone())
            .collect();
        Ok(InsertPlan::new(writers, statement_vars, bound)?)
    }

    /// The reasoner's view of a conjunction: one atom per mappable property
    /// of each positive statement.
    pub fn reasoner_query(&mut self, conjunction: &Conjunction<Statement>) -> ReasonerQuery {
        let id = self.context.queries.fresh();
        let atoms: Vec<_> = conjunction
            .positive()
            .flat_map(|s| statement_atoms(s, id))
            .collect();
        ReasonerQuery::new(id, conjunction.clone(), atoms)
    }
}

fn check_insertable(pattern: &Pattern) -> Result<(), CompileError> {
    match pattern {
        Pattern::Statement(_) => Ok(()),
        Pattern::Conjunction(children) => children.iter().try_for_each(check_insertable),
        Pattern::Disjunction(_) => Err(CompileError::UnsupportedInInsert {
            reason: format!("disjunction `{pattern}`"),
        }),
        Pattern::Negation(_) => Err(CompileError::UnsupportedInInsert {
            reason: format!("negation `{pattern}`"),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use quarry_pattern::TypeRef;

    #[test]
    fn test_reserve_moves_past_generated_variables() {
        let mut context = CompileContext::new();
        let pattern = Pattern::from(Statement::new(Variable::named("x")).isa(TypeRef::labelled(Variable::Generated(41), "person")));
        context.reserve(&pattern);
        assert_eq!(context.vars.fresh(), Variable::Generated(42));
    }

    #[test]
    fn test_reserve_never_moves_backwards() {
        let mut context = CompileContext {
            vars: VarGen::starting_at(100),
            ..CompileContext::default()
        };
        let pattern = Pattern::from(Statement::new(Variable::Generated(3)).label("person"));
        context.reserve(&pattern);
        assert_eq!(context.vars.allocated(), 100);
    }

    #[test]
    fn test_disjunction_is_rejected_in_insert() {
        let x = Variable::named("x");
        let pattern = Pattern::or([
            Statement::new(x.clone()).label("a").into(),
            Statement::new(x).label("b").into(),
        ]);
        let err = QueryCompiler::new().compile_insert(&pattern, &BTreeSet::new()).unwrap_err();
        assert!(matches!(err, CompileError::UnsupportedInInsert { .. }));
    }

    #[test]
    fn test_query_ids_are_fresh_per_conjunction() {
        let mut compiler = QueryCompiler::new();
        let x = Variable::named("x");
        let conjunction = Conjunction::new([Statement::new(x).label("person")]);
        let first = compiler.reasoner_query(&conjunction);
        let second = compiler.reasoner_query(&conjunction);
        assert_ne!(first.id(), second.id());
        assert!(first.is_alpha_equivalent(&second));
    }
}
