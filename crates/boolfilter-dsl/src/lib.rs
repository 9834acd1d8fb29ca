//! Boolfilter query model
//!
//! This crate owns everything about a filter query *before* any boolean
//! minimization or bitmap work happens:
//!
//! - `query`: the tagged query tree and its strict JSON wire parser
//! - `pattern`: how a predicate value is looked up (range / wildcard / exact)
//! - `normalize`: predicate registry + flattening to a formula string

pub mod normalize;
pub mod pattern;
pub mod query;
pub mod value;

pub use normalize::{normalize, Formula, Registry};
pub use pattern::{RangeParseError, ValueMatch, ValueRange};
pub use query::{
    parse_query, Atom, AtomicPredicate, FilterRequest, QueryNode, QueryParseError, DEFAULT_LIMIT,
};
pub use value::Value;
