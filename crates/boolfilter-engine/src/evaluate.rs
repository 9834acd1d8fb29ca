//! Set-algebra evaluation of a minimal cover.
//!
//! Each path is `⋂ must_have − ⋃ must_not`; the result is the union over all
//! paths. Must-have bitmaps are intersected smallest first so the working set
//! shrinks as early as possible.

use std::collections::HashMap;
use std::sync::Arc;

use boolfilter_dsl::{Registry, Value};
use boolfilter_qmc::PathExpression;
use roaring::RoaringTreemap;
use tracing::trace;

use crate::cache::PredicateCache;
use crate::error::EvaluateError;

/// Where predicate bitmaps come from. Returned bitmaps are shared and never
/// mutated by the evaluator.
pub trait BitmapSource {
    fn resolve(&self, entity_type: &str, property: &str, value: &Value) -> Arc<RoaringTreemap>;
    fn universe(&self, entity_type: &str) -> Arc<RoaringTreemap>;
}

impl BitmapSource for PredicateCache {
    fn resolve(&self, entity_type: &str, property: &str, value: &Value) -> Arc<RoaringTreemap> {
        PredicateCache::resolve(self, entity_type, property, value)
    }

    fn universe(&self, entity_type: &str) -> Arc<RoaringTreemap> {
        PredicateCache::universe(self, entity_type)
    }
}

/// Matching record ids of one query, ascending.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Evaluation {
    bitmap: RoaringTreemap,
}

impl Evaluation {
    pub fn count(&self) -> u64 {
        self.bitmap.len()
    }

    pub fn ids(&self) -> Vec<u64> {
        self.bitmap.iter().collect()
    }

    /// Ids at positions `offset .. offset + limit`.
    pub fn page(&self, offset: u64, limit: u64) -> Vec<u64> {
        let skip = usize::try_from(offset).unwrap_or(usize::MAX);
        let take = usize::try_from(limit).unwrap_or(usize::MAX);
        self.bitmap.iter().skip(skip).take(take).collect()
    }

    pub fn bitmap(&self) -> &RoaringTreemap {
        &self.bitmap
    }

    pub fn into_bitmap(self) -> RoaringTreemap {
        self.bitmap
    }
}

pub fn evaluate<S: BitmapSource + ?Sized>(
    source: &S,
    registry: &Registry,
    paths: &[PathExpression],
    entity_type: &str,
) -> Result<Evaluation, EvaluateError> {
    for literal in paths.iter().flat_map(|p| p.literals()) {
        if registry.atom(literal.var).is_none() {
            return Err(EvaluateError::UnknownPredicate { id: literal.var });
        }
    }

    let mut atoms = AtomBitmaps {
        source,
        registry,
        entity_type,
        resolved: HashMap::new(),
    };
    let mut combined = RoaringTreemap::new();

    for path in paths {
        let matched = atoms.path(path)?;
        trace!(path = %path, records = matched.len(), "evaluated path");
        combined |= &matched;
    }

    Ok(Evaluation { bitmap: combined })
}

/// Per-query memo of atom id → OR of its value bitmaps.
struct AtomBitmaps<'a, S: ?Sized> {
    source: &'a S,
    registry: &'a Registry,
    entity_type: &'a str,
    resolved: HashMap<usize, Arc<RoaringTreemap>>,
}

impl<S: BitmapSource + ?Sized> AtomBitmaps<'_, S> {
    fn get(&mut self, id: usize) -> Result<Arc<RoaringTreemap>, EvaluateError> {
        if let Some(bitmap) = self.resolved.get(&id) {
            return Ok(Arc::clone(bitmap));
        }
        let atom = self
            .registry
            .atom(id)
            .ok_or(EvaluateError::UnknownPredicate { id })?;

        let bitmap = match atom.values.as_slice() {
            [single] => self.source.resolve(self.entity_type, &atom.property, single),
            values => {
                let mut any = RoaringTreemap::new();
                for value in values {
                    any |= self.source.resolve(self.entity_type, &atom.property, value).as_ref();
                }
                Arc::new(any)
            }
        };
        self.resolved.insert(id, Arc::clone(&bitmap));
        Ok(bitmap)
    }

    fn path(&mut self, path: &PathExpression) -> Result<RoaringTreemap, EvaluateError> {
        let mut must_have = path
            .must_have()
            .map(|id| self.get(id))
            .collect::<Result<Vec<_>, _>>()?;
        must_have.sort_by_key(|b| b.len());

        let mut working = match must_have.split_first() {
            Some((smallest, rest)) => {
                let mut working = RoaringTreemap::clone(smallest);
                for bitmap in rest {
                    if working.is_empty() {
                        break;
                    }
                    working &= bitmap.as_ref();
                }
                working
            }
            None => RoaringTreemap::clone(&self.source.universe(self.entity_type)),
        };

        for id in path.must_not() {
            if working.is_empty() {
                break;
            }
            working -= self.get(id)?.as_ref();
        }
        Ok(working)
    }
}
