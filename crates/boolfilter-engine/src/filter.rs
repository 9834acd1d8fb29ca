//! Query pipeline: normalize → minimize → evaluate → page.

use std::sync::Arc;

use boolfilter_dsl::{normalize, FilterRequest, QueryNode};
use boolfilter_qmc::minimize;
use serde::Serialize;
use tracing::debug;

use crate::cache::PredicateCache;
use crate::config::EngineConfig;
use crate::error::FilterError;
use crate::evaluate::{evaluate, Evaluation};
use crate::lookup::ValueLookup;

/// One page of matching ids plus the total match count.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct FilterPage {
    pub ids: Vec<u64>,
    pub total: u64,
}

/// Boolean filter over one record backend. `Send + Sync`; share it via `Arc`.
#[derive(Debug)]
pub struct BooleanFilter {
    cache: Arc<PredicateCache>,
    config: EngineConfig,
}

impl BooleanFilter {
    pub fn new(cache: Arc<PredicateCache>, config: EngineConfig) -> Self {
        Self { cache, config }
    }

    /// Build the predicate cache from `config.cache` over `lookup`.
    pub fn from_lookup(lookup: Arc<dyn ValueLookup>, config: EngineConfig) -> Self {
        let cache = Arc::new(PredicateCache::new(lookup, &config.cache));
        Self::new(cache, config)
    }

    pub fn cache(&self) -> &Arc<PredicateCache> {
        &self.cache
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Every record of `entity_type` matching `query`.
    pub fn evaluate(&self, entity_type: &str, query: &QueryNode) -> Result<Evaluation, FilterError> {
        let (formula, registry) = normalize(query);
        if registry.len() > self.config.max_predicates {
            return Err(FilterError::TooManyPredicates {
                count: registry.len(),
                max: self.config.max_predicates,
            });
        }

        let paths = minimize(formula.as_str(), registry.len())?;
        debug!(
            entity_type,
            formula = %formula,
            predicates = registry.len(),
            paths = paths.len(),
            "minimized query"
        );

        Ok(evaluate(self.cache.as_ref(), &registry, &paths, entity_type)?)
    }

    pub fn filter(
        &self,
        entity_type: &str,
        query: &QueryNode,
        offset: u64,
        limit: u64,
    ) -> Result<FilterPage, FilterError> {
        let evaluation = self.evaluate(entity_type, query)?;
        Ok(FilterPage {
            ids: evaluation.page(offset, limit),
            total: evaluation.count(),
        })
    }

    pub fn run(&self, request: &FilterRequest) -> Result<FilterPage, FilterError> {
        self.filter(
            &request.entity_type,
            &request.query,
            request.offset,
            request.limit,
        )
    }

    /// Parse a wire request and run it.
    pub fn filter_json(&self, json: &serde_json::Value) -> Result<FilterPage, FilterError> {
        self.run(&FilterRequest::from_json(json)?)
    }
}
