use boolfilter_dsl::{QueryParseError, RangeParseError};
use boolfilter_qmc::MinimizeError;
use thiserror::Error;

/// Failure of the value-lookup collaborator. Never reaches a filter caller:
/// the predicate cache logs it and serves an empty bitmap instead.
#[derive(Debug, Error)]
pub enum LookupError {
    #[error("no orderable index on `{entity_type}.{property}` for range lookup")]
    MissingRangeIndex {
        entity_type: String,
        property: String,
    },
    #[error(transparent)]
    InvalidValue(#[from] RangeParseError),
    #[error("lookup backend failed: {0}")]
    Backend(String),
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum EvaluateError {
    #[error("path references predicate id {id} missing from the registry")]
    UnknownPredicate { id: usize },
}

#[derive(Debug, Error)]
pub enum FilterError {
    #[error(transparent)]
    Query(#[from] QueryParseError),
    #[error("query uses {count} distinct predicates, more than the configured maximum of {max}")]
    TooManyPredicates { count: usize, max: usize },
    #[error(transparent)]
    Minimize(#[from] MinimizeError),
    #[error(transparent)]
    Evaluate(#[from] EvaluateError),
}
