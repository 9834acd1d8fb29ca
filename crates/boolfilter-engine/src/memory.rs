//! In-memory record store implementing [`ValueLookup`].
//!
//! Columnar layout per entity type:
//! - `records`: bitmap of every record id
//! - `columns`: property → value → bitmap, for exact and wildcard lookups
//! - `range_indexes`: property → ordered number/date keys → bitmap, only for
//!   properties registered with [`MemoryStore::create_range_index`]
//!
//! Built once, then read concurrently; lookups take `&self`.

use std::cmp::Ordering;
use std::collections::{BTreeMap, HashMap};
use std::ops::Bound;

use boolfilter_dsl::{Value, ValueMatch, ValueRange};
use chrono::NaiveDate;
use roaring::RoaringTreemap;

use crate::error::LookupError;
use crate::lookup::ValueLookup;

#[derive(Debug, Default)]
pub struct MemoryStore {
    tables: HashMap<String, EntityTable>,
}

#[derive(Debug, Default)]
struct EntityTable {
    records: RoaringTreemap,
    columns: HashMap<String, HashMap<Value, RoaringTreemap>>,
    range_indexes: HashMap<String, RangeIndex>,
}

#[derive(Debug, Default)]
struct RangeIndex {
    numbers: BTreeMap<NumberKey, RoaringTreemap>,
    dates: BTreeMap<NaiveDate, RoaringTreemap>,
}

/// `f64` ordered by `total_cmp` so it can key a `BTreeMap`.
#[derive(Debug, Clone, Copy)]
struct NumberKey(f64);

impl PartialEq for NumberKey {
    fn eq(&self, other: &Self) -> bool {
        self.0.total_cmp(&other.0) == Ordering::Equal
    }
}

impl Eq for NumberKey {}

impl PartialOrd for NumberKey {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for NumberKey {
    fn cmp(&self, other: &Self) -> Ordering {
        self.0.total_cmp(&other.0)
    }
}

impl RangeIndex {
    fn add(&mut self, value: &Value, id: u64) {
        if let Some(n) = value.as_f64() {
            self.numbers.entry(NumberKey(n)).or_default().insert(id);
        } else if let Some(d) = value.as_date() {
            self.dates.entry(d).or_default().insert(id);
        }
    }

    fn query(&self, range: &ValueRange) -> RoaringTreemap {
        let mut out = RoaringTreemap::new();
        let unbounded = range.lower.is_none() && range.upper.is_none();

        if unbounded || range.is_date_range() {
            let lower = bound(range.lower.as_ref().and_then(Value::as_date), range.include_lower);
            let upper = bound(range.upper.as_ref().and_then(Value::as_date), range.include_upper);
            if !is_empty_range(&lower, &upper) {
                for ids in self.dates.range((lower, upper)).map(|(_, ids)| ids) {
                    out |= ids;
                }
            }
        }
        if unbounded || !range.is_date_range() {
            let lower = bound(
                range.lower.as_ref().and_then(Value::as_f64).map(NumberKey),
                range.include_lower,
            );
            let upper = bound(
                range.upper.as_ref().and_then(Value::as_f64).map(NumberKey),
                range.include_upper,
            );
            if !is_empty_range(&lower, &upper) {
                for ids in self.numbers.range((lower, upper)).map(|(_, ids)| ids) {
                    out |= ids;
                }
            }
        }
        out
    }
}

fn bound<T>(value: Option<T>, inclusive: bool) -> Bound<T> {
    match value {
        None => Bound::Unbounded,
        Some(v) if inclusive => Bound::Included(v),
        Some(v) => Bound::Excluded(v),
    }
}

/// `BTreeMap::range` panics on inverted or empty-exclusive bounds.
fn is_empty_range<T: Ord>(lower: &Bound<T>, upper: &Bound<T>) -> bool {
    let (lo, lo_inclusive) = match lower {
        Bound::Unbounded => return false,
        Bound::Included(v) => (v, true),
        Bound::Excluded(v) => (v, false),
    };
    let (hi, hi_inclusive) = match upper {
        Bound::Unbounded => return false,
        Bound::Included(v) => (v, true),
        Bound::Excluded(v) => (v, false),
    };
    match lo.cmp(hi) {
        Ordering::Greater => true,
        Ordering::Equal => !(lo_inclusive && hi_inclusive),
        Ordering::Less => false,
    }
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add (or extend) record `id` of `entity_type` with the given properties.
    pub fn insert<K, I>(&mut self, entity_type: &str, id: u64, properties: I)
    where
        K: Into<String>,
        I: IntoIterator<Item = (K, Value)>,
    {
        let table = self.tables.entry(entity_type.to_string()).or_default();
        table.records.insert(id);
        for (property, value) in properties {
            let property = property.into();
            if let Some(index) = table.range_indexes.get_mut(&property) {
                index.add(&value, id);
            }
            table
                .columns
                .entry(property)
                .or_default()
                .entry(value)
                .or_default()
                .insert(id);
        }
    }

    /// Build an orderable index on `entity_type.property`, enabling range
    /// lookups. Records inserted afterwards are indexed as they arrive.
    pub fn create_range_index(&mut self, entity_type: &str, property: &str) {
        let table = self.tables.entry(entity_type.to_string()).or_default();
        let mut index = RangeIndex::default();
        if let Some(column) = table.columns.get(property) {
            for (value, ids) in column {
                for id in ids {
                    index.add(value, id);
                }
            }
        }
        table.range_indexes.insert(property.to_string(), index);
    }

    pub fn len(&self, entity_type: &str) -> u64 {
        self.tables.get(entity_type).map_or(0, |t| t.records.len())
    }

    pub fn is_empty(&self) -> bool {
        self.tables.values().all(|t| t.records.is_empty())
    }
}

impl ValueLookup for MemoryStore {
    fn lookup(
        &self,
        entity_type: &str,
        property: &str,
        matcher: &ValueMatch,
    ) -> Result<RoaringTreemap, LookupError> {
        let Some(table) = self.tables.get(entity_type) else {
            return Ok(RoaringTreemap::new());
        };

        if let ValueMatch::Range(range) = matcher {
            let index = table.range_indexes.get(property).ok_or_else(|| {
                LookupError::MissingRangeIndex {
                    entity_type: entity_type.to_string(),
                    property: property.to_string(),
                }
            })?;
            return Ok(index.query(range));
        }

        let Some(column) = table.columns.get(property) else {
            return Ok(RoaringTreemap::new());
        };

        let mut out = RoaringTreemap::new();
        match matcher {
            ValueMatch::Exact(value) => {
                for candidate in numeric_twins(value) {
                    if let Some(ids) = column.get(&candidate) {
                        out |= ids;
                    }
                }
            }
            _ => {
                for (value, ids) in column {
                    if matcher.matches(value) {
                        out |= ids;
                    }
                }
            }
        }
        Ok(out)
    }

    fn all_records(&self, entity_type: &str) -> Result<RoaringTreemap, LookupError> {
        Ok(self
            .tables
            .get(entity_type)
            .map(|t| t.records.clone())
            .unwrap_or_default())
    }
}

/// `7` and `7.0` are the same number to an equality lookup.
fn numeric_twins(value: &Value) -> Vec<Value> {
    match value {
        Value::Int(i) => vec![Value::Int(*i), Value::Float(*i as f64)],
        Value::Float(f) if f.fract() == 0.0 && f.abs() < i64::MAX as f64 => {
            vec![Value::Float(*f), Value::Int(*f as i64)]
        }
        other => vec![other.clone()],
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store() -> MemoryStore {
        let mut store = MemoryStore::new();
        for id in 0..10u64 {
            store.insert(
                "Item",
                id,
                [
                    ("name", Value::from(format!("item-{id}"))),
                    ("rank", Value::Int(id as i64)),
                    ("weight", Value::Float(id as f64 + 0.5)),
                ],
            );
        }
        store.create_range_index("Item", "rank");
        store.insert("Item", 10, [("rank", Value::Int(10))]);
        store
    }

    fn ids(bitmap: RoaringTreemap) -> Vec<u64> {
        bitmap.iter().collect()
    }

    #[test]
    fn exact_and_wildcards() {
        let s = store();
        let exact = s
            .lookup("Item", "name", &ValueMatch::Exact(Value::from("item-3")))
            .unwrap();
        assert_eq!(ids(exact), vec![3]);

        let suffix = s
            .lookup("Item", "name", &ValueMatch::Suffix("-1".into()))
            .unwrap();
        assert_eq!(ids(suffix), vec![1]);

        let all = s
            .lookup("Item", "name", &ValueMatch::Prefix("item".into()))
            .unwrap();
        assert_eq!(all.len(), 10);
    }

    #[test]
    fn exact_numbers_ignore_representation() {
        let s = store();
        let hit = s
            .lookup("Item", "rank", &ValueMatch::Exact(Value::Float(4.0)))
            .unwrap();
        assert_eq!(ids(hit), vec![4]);
    }

    #[test]
    fn ranges_use_the_index_including_later_inserts() {
        let s = store();
        let ValueMatch::Range(range) =
            ValueMatch::classify(&Value::from("(7,]")).unwrap()
        else {
            panic!("expected range");
        };
        let hit = s.lookup("Item", "rank", &ValueMatch::Range(range)).unwrap();
        assert_eq!(ids(hit), vec![8, 9, 10]);
    }

    #[test]
    fn degenerate_ranges_are_empty_not_panics() {
        let s = store();
        for text in ["(5,5)", "[5,5)", "[6,5]"] {
            let matcher = ValueMatch::classify(&Value::from(text)).unwrap();
            assert!(s.lookup("Item", "rank", &matcher).unwrap().is_empty(), "{text}");
        }
        let matcher = ValueMatch::classify(&Value::from("[5,5]")).unwrap();
        assert_eq!(ids(s.lookup("Item", "rank", &matcher).unwrap()), vec![5]);
    }

    #[test]
    fn range_without_index_is_an_error() {
        let s = store();
        let matcher = ValueMatch::classify(&Value::from("[1,2]")).unwrap();
        assert!(matches!(
            s.lookup("Item", "weight", &matcher),
            Err(LookupError::MissingRangeIndex { .. })
        ));
    }

    #[test]
    fn unknown_entity_type_is_empty() {
        let s = store();
        assert!(s.all_records("Nope").unwrap().is_empty());
        assert_eq!(s.all_records("Item").unwrap().len(), 11);
    }
}
