//! Query tree and the JSON wire format it is parsed from.
//!
//! Wire grammar:
//!
//! ```text
//! request   := { "entity_type": str, "query": query, "limit"?: int, "offset"?: int }
//! query     := { "not"?: bool, "and": [ and_entry, ... ] }
//! and_entry := predicate | { "or": [ query | predicate, ... ] }
//! predicate := { "property": str, "values": [ literal, ... ], "not"?: bool }
//! ```
//!
//! Unknown keys, missing required keys, non-scalar literals and empty lists
//! are rejected: a malformed query is a caller bug, never something to guess
//! around.

use serde::de::DeserializeOwned;
use serde::Deserialize;
use thiserror::Error;

use crate::value::Value;

pub const DEFAULT_LIMIT: u64 = 50;

// ============================================================================
// Query tree
// ============================================================================

/// Registry identity of a predicate: negation is contextual and not part of it.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Atom {
    pub property: String,
    pub values: Vec<Value>,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct AtomicPredicate {
    pub property: String,
    /// Any-of: the predicate holds when the property equals (or matches) any value.
    pub values: Vec<Value>,
    pub negate: bool,
}

impl AtomicPredicate {
    pub fn new(property: impl Into<String>, values: Vec<Value>) -> Self {
        Self {
            property: property.into(),
            values,
            negate: false,
        }
    }

    pub fn negated(mut self) -> Self {
        self.negate = !self.negate;
        self
    }

    pub fn atom(&self) -> Atom {
        Atom {
            property: self.property.clone(),
            values: self.values.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum QueryNode {
    Leaf(AtomicPredicate),
    And {
        children: Vec<QueryNode>,
        negate: bool,
    },
    Or(Vec<QueryNode>),
}

impl QueryNode {
    pub fn leaf(predicate: AtomicPredicate) -> Self {
        QueryNode::Leaf(predicate)
    }

    pub fn and(children: Vec<QueryNode>) -> Self {
        QueryNode::And {
            children,
            negate: false,
        }
    }

    pub fn not_and(children: Vec<QueryNode>) -> Self {
        QueryNode::And {
            children,
            negate: true,
        }
    }

    pub fn or(children: Vec<QueryNode>) -> Self {
        QueryNode::Or(children)
    }
}

/// A parsed filter call: which entity type, which tree, which page.
#[derive(Debug, Clone, PartialEq)]
pub struct FilterRequest {
    pub entity_type: String,
    pub query: QueryNode,
    pub limit: u64,
    pub offset: u64,
}

impl FilterRequest {
    pub fn from_json(json: &serde_json::Value) -> Result<Self, QueryParseError> {
        let wire = WireRequest::deserialize(json)?;
        Ok(Self {
            entity_type: wire.entity_type,
            query: wire.query.into_node("query")?,
            limit: wire.limit,
            offset: wire.offset,
        })
    }

    pub fn from_json_str(text: &str) -> Result<Self, QueryParseError> {
        let json: serde_json::Value = serde_json::from_str(text)?;
        Self::from_json(&json)
    }
}

/// Parse a bare `{ "not"?, "and": [...] }` query object.
pub fn parse_query(json: &serde_json::Value) -> Result<QueryNode, QueryParseError> {
    WireQuery::deserialize(json)?.into_node("query")
}

// ============================================================================
// Wire format
// ============================================================================

#[derive(Debug, Error)]
pub enum QueryParseError {
    #[error("malformed query: {0}")]
    Shape(#[from] serde_json::Error),
    #[error("malformed entry at {path}: {source}")]
    Entry {
        path: String,
        source: serde_json::Error,
    },
    #[error("empty `{list}` list at {path}")]
    EmptyList { list: &'static str, path: String },
}

fn default_limit() -> u64 {
    DEFAULT_LIMIT
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct WireRequest {
    entity_type: String,
    query: WireQuery,
    #[serde(default = "default_limit")]
    limit: u64,
    #[serde(default)]
    offset: u64,
}

/// `and` and `or` entries stay raw until their kind is known from their keys,
/// so a malformed entry reports where it sits instead of failing every
/// alternative at once.
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct WireQuery {
    #[serde(default)]
    not: bool,
    and: Vec<serde_json::Value>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct WireOr {
    or: Vec<serde_json::Value>,
}

fn has_key(entry: &serde_json::Value, key: &str) -> bool {
    entry.as_object().is_some_and(|o| o.contains_key(key))
}

fn parse_entry<T: DeserializeOwned>(
    entry: serde_json::Value,
    path: &str,
) -> Result<T, QueryParseError> {
    T::deserialize(entry).map_err(|source| QueryParseError::Entry {
        path: path.to_string(),
        source,
    })
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct WirePredicate {
    property: String,
    values: Vec<Value>,
    #[serde(default)]
    not: bool,
}

impl WireQuery {
    fn into_node(self, path: &str) -> Result<QueryNode, QueryParseError> {
        if self.and.is_empty() {
            return Err(QueryParseError::EmptyList {
                list: "and",
                path: path.to_string(),
            });
        }
        let mut children = Vec::with_capacity(self.and.len());
        for (i, entry) in self.and.into_iter().enumerate() {
            let entry_path = format!("{path}.and[{i}]");
            let child = if has_key(&entry, "or") {
                let or: WireOr = parse_entry(entry, &entry_path)?;
                if or.or.is_empty() {
                    return Err(QueryParseError::EmptyList {
                        list: "or",
                        path: entry_path,
                    });
                }
                let mut alternatives = Vec::with_capacity(or.or.len());
                for (j, alt) in or.or.into_iter().enumerate() {
                    let alt_path = format!("{entry_path}.or[{j}]");
                    alternatives.push(if has_key(&alt, "and") {
                        parse_entry::<WireQuery>(alt, &alt_path)?.into_node(&alt_path)?
                    } else {
                        parse_entry::<WirePredicate>(alt, &alt_path)?.into_node(&alt_path)?
                    });
                }
                QueryNode::Or(alternatives)
            } else {
                parse_entry::<WirePredicate>(entry, &entry_path)?.into_node(&entry_path)?
            };
            children.push(child);
        }
        Ok(QueryNode::And {
            children,
            negate: self.not,
        })
    }
}

impl WirePredicate {
    fn into_node(self, path: &str) -> Result<QueryNode, QueryParseError> {
        if self.values.is_empty() {
            return Err(QueryParseError::EmptyList {
                list: "values",
                path: path.to_string(),
            });
        }
        Ok(QueryNode::Leaf(AtomicPredicate {
            property: self.property,
            values: self.values,
            negate: self.not,
        }))
    }
}
