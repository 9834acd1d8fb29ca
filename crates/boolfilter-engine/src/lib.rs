//! Boolfilter evaluation engine
//!
//! Runs a parsed filter query against a record backend:
//!
//! 1. `boolfilter_dsl::normalize` turns the query tree into a formula over
//!    dense predicate ids.
//! 2. `boolfilter_qmc::minimize` reduces it to a minimal set of conjunctive
//!    paths.
//! 3. [`evaluate`] resolves each predicate to a record bitmap through the
//!    [`PredicateCache`] and combines them with set algebra.
//!
//! ```no_run
//! use std::sync::Arc;
//! use boolfilter_engine::{BooleanFilter, EngineConfig, MemoryStore};
//!
//! let store = MemoryStore::new();
//! let filter = BooleanFilter::from_lookup(Arc::new(store), EngineConfig::default());
//! let page = filter.filter_json(&serde_json::json!({
//!     "entity_type": "Order",
//!     "query": { "and": [ { "property": "color", "values": ["Blue"] } ] }
//! }))?;
//! println!("{} matches", page.total);
//! # Ok::<(), boolfilter_engine::FilterError>(())
//! ```

pub mod cache;
pub mod config;
pub mod error;
pub mod evaluate;
pub mod filter;
pub mod lookup;
pub mod memory;

pub use cache::{CacheKey, CacheStats, PredicateCache};
pub use config::{CacheConfig, EngineConfig};
pub use error::{EvaluateError, FilterError, LookupError};
pub use evaluate::{evaluate, BitmapSource, Evaluation};
pub use filter::{BooleanFilter, FilterPage};
pub use lookup::ValueLookup;
pub use memory::MemoryStore;
