//! Boundary to whatever owns the records.

use boolfilter_dsl::ValueMatch;
use roaring::RoaringTreemap;

use crate::error::LookupError;

/// Translates a single predicate value into the set of matching record ids.
///
/// Implementations must support exact, prefix, suffix and contains matches
/// for any property, and range matches for properties with an orderable
/// index (`LookupError::MissingRangeIndex` otherwise). Calls may block; the
/// predicate cache guarantees at most one concurrent call per key.
pub trait ValueLookup: Send + Sync {
    fn lookup(
        &self,
        entity_type: &str,
        property: &str,
        matcher: &ValueMatch,
    ) -> Result<RoaringTreemap, LookupError>;

    /// Every record of `entity_type`; the starting set for purely negative terms.
    fn all_records(&self, entity_type: &str) -> Result<RoaringTreemap, LookupError>;
}
