use quarry_pattern::{ConceptId, Label, PatternError, Variable};
use thiserror::Error;

/// Failures while planning or running an insert.
#[derive(Debug, Error)]
pub enum WriteError {
    /// Writers depend on each other in a loop; `variables` are the ones
    /// produced by the writers left unscheduled. Raised before any write.
    #[error("writer dependency cycle over {}", display_vars(.variables))]
    DependencyCycle { variables: Vec<Variable> },

    #[error("variable {var} is required by a writer but nothing binds or produces it")]
    UnboundRequirement { var: Variable },

    #[error("nothing to insert for {var}: none of its properties can be written")]
    NothingToInsert { var: Variable },

    #[error("cannot create {var} without a type")]
    MissingType { var: Variable },

    #[error("cannot define type {var} without a label")]
    MissingLabel { var: Variable },

    #[error("no type labelled `{label}`")]
    UnknownLabel { label: Label },

    #[error("no concept with id {id}")]
    UnknownConcept { id: ConceptId },

    #[error("storage error: {0}")]
    Store(#[from] anyhow::Error),
}

/// Failures of the top-level query compiler.
#[derive(Debug, Error)]
pub enum CompileError {
    #[error(transparent)]
    Pattern(#[from] PatternError),

    #[error(transparent)]
    Write(#[from] WriteError),

    #[error("unsupported in insert: {reason}")]
    UnsupportedInInsert { reason: String },
}

fn display_vars(vars: &[Variable]) -> String {
    let parts: Vec<String> = vars.iter().map(|v| v.to_string()).collect();
    parts.join(", ")
}
