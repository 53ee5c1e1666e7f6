use thiserror::Error;

/// Rejections raised while normalizing or validating a query pattern.
///
/// All of these are fatal for the query: the caller should surface them and
/// not retry.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PatternError {
    #[error("ill-formed pattern: {reason} (in `{pattern}`)")]
    IllFormed { reason: String, pattern: String },
    #[error("pattern normalizes to {count} disjuncts, above the limit of {limit}")]
    TooManyDisjuncts { count: usize, limit: usize },
    #[error("pattern is not in disjunctive normal form: {reason}")]
    NotNormalized { reason: String },
}

impl PatternError {
    pub(crate) fn ill_formed(reason: impl Into<String>, pattern: impl ToString) -> Self {
        PatternError::IllFormed {
            reason: reason.into(),
            pattern: pattern.to_string(),
        }
    }
}
