//! Integration tests for the complete boolfilter pipeline
//!
//! These tests run wire JSON / query trees through every crate:
//! - DSL parsing → normalization → minimization
//! - Predicate cache → in-memory store → bitmap evaluation → paging
//!
//! Run with: cargo test --test integration_tests

use std::sync::Arc;

use anyhow::Result;
use boolfilter_dsl::{normalize, AtomicPredicate, FilterRequest, QueryNode, Value};
use boolfilter_engine::{BooleanFilter, EngineConfig, FilterError, FilterPage, MemoryStore};
use chrono::{Duration, NaiveDate};
use serde_json::json;

// ============================================================================
// Synthetic `Order` dataset (records 1..=1000, cyclic property values)
// ============================================================================

const STATUSES: [&str; 7] = [
    "Unfulfilled",
    "Scheduled",
    "Shipped",
    "Shipped",
    "Shipped",
    "Shipped",
    "Returned",
];
const WAREHOUSES: [&str; 5] = [
    "Warehouse 1",
    "Warehouse 2",
    "Warehouse 3",
    "Warehouse 3",
    "Warehouse 3",
];
const COLORS: [&str; 9] = [
    "Blue", "Green", "Green", "Green", "Green", "Red", "Red", "Red", "Yellow",
];
const SIZES: [&str; 8] = [
    "Small",
    "Medium",
    "Medium",
    "Medium",
    "Large",
    "Large",
    "Large",
    "Extra Large",
];
const SEASONS: [&str; 6] = [
    "Summer 2019",
    "Fall 2019",
    "Winter 2019",
    "Spring 2020",
    "Summer 2020",
    "Fall 2020",
];
const CITIES: [&str; 18] = [
    "Chicago",
    "Aurora",
    "Rockford",
    "Joliet",
    "Naperville",
    "Springfield",
    "Peoria",
    "Elgin",
    "Waukegan",
    "Champaign",
    "Bloomington",
    "Decatur",
    "Evanston",
    "Wheaton",
    "Belleville",
    "Urbana",
    "Quincy",
    "Rock Island",
];

fn pick<'a>(values: &[&'a str], r: u64) -> Value {
    Value::from(values[(r % values.len() as u64) as usize])
}

fn order_store() -> MemoryStore {
    let mut store = MemoryStore::new();
    store.create_range_index("Order", "postal");
    store.create_range_index("Order", "amount");
    store.create_range_index("Order", "ordered_date");

    let base = NaiveDate::from_ymd_opt(2025, 1, 1).expect("valid date");
    for r in 1..=1000u64 {
        let ordered = base - Duration::days(((r * 13) % 365 + 1) as i64);
        store.insert(
            "Order",
            r,
            [
                ("status", pick(&STATUSES, r)),
                ("warehouse", pick(&WAREHOUSES, r)),
                ("online", Value::Bool(r % 2 == 0)),
                ("color", pick(&COLORS, r)),
                ("size", pick(&SIZES, r)),
                ("season", pick(&SEASONS, r)),
                ("city", pick(&CITIES, r)),
                ("postal", Value::Int(60400 + (r % CITIES.len() as u64) as i64)),
                ("amount", Value::Float(20.0 + ((r * 37) % 10_000) as f64 / 100.0)),
                ("ordered_date", Value::Date(ordered)),
            ],
        );
    }
    store
}

fn order_filter() -> BooleanFilter {
    let _ = tracing_subscriber::fmt().with_test_writer().try_init();
    BooleanFilter::from_lookup(Arc::new(order_store()), EngineConfig::default())
}

fn predicate(property: &str, value: impl Into<Value>) -> AtomicPredicate {
    AtomicPredicate::new(property, vec![value.into()])
}

fn single(property: &str, value: impl Into<Value>) -> QueryNode {
    QueryNode::and(vec![QueryNode::leaf(predicate(property, value))])
}

// ============================================================================
// Reference scenarios
// ============================================================================

#[test]
fn test_equality_filter_counts_and_pages() -> Result<()> {
    let filter = order_filter();
    let page = filter.filter("Order", &single("color", "Blue"), 0, 50)?;

    assert_eq!(page.total, 111);
    assert_eq!(page.ids.len(), 50);
    assert_eq!(page.ids[0], 9);
    assert_eq!(page.ids[49], 450);
    assert!(page.ids.windows(2).all(|w| w[0] < w[1]));
    Ok(())
}

#[test]
fn test_conjunction_with_negation() -> Result<()> {
    let filter = order_filter();
    let query = QueryNode::and(vec![
        QueryNode::leaf(predicate("status", "Unfulfilled")),
        QueryNode::leaf(predicate("warehouse", "Warehouse 3")),
        QueryNode::leaf(predicate("season", "Fall*")),
        QueryNode::leaf(predicate("online", true).negated()),
    ]);

    let page = filter.filter("Order", &query, 0, 50)?;
    assert_eq!(page.total, 29);
    Ok(())
}

#[test]
fn test_mixed_inclusive_exclusive_range() -> Result<()> {
    let filter = order_filter();
    let page = filter.filter("Order", &single("postal", "(60400, 60403]"), 0, 50)?;
    assert_eq!(page.total, 168);
    Ok(())
}

#[test]
fn test_open_ended_range() -> Result<()> {
    let filter = order_filter();
    let page = filter.filter("Order", &single("amount", "(19.99,]"), 0, 50)?;
    assert_eq!(page.total, 1000);

    let capped = filter.filter("Order", &single("amount", "(,25]"), 0, 50)?;
    assert_eq!(capped.total, 54);
    Ok(())
}

// ============================================================================
// Further shapes
// ============================================================================

#[test]
fn test_date_range() -> Result<()> {
    let filter = order_filter();
    let page = filter.filter("Order", &single("ordered_date", "[2024-06-01,2024-06-30]"), 0, 10)?;
    assert_eq!(page.total, 82);
    Ok(())
}

#[test]
fn test_or_with_nested_and() -> Result<()> {
    let filter = order_filter();
    // status == Returned OR (color == Blue AND online == true)
    let query = QueryNode::and(vec![QueryNode::or(vec![
        QueryNode::leaf(predicate("status", "Returned")),
        QueryNode::and(vec![
            QueryNode::leaf(predicate("color", "Blue")),
            QueryNode::leaf(predicate("online", true)),
        ]),
    ])]);

    let page = filter.filter("Order", &query, 0, 5)?;
    assert_eq!(page.total, 190);
    assert_eq!(page.ids, vec![6, 13, 18, 20, 27]);
    Ok(())
}

#[test]
fn test_any_of_values_minus_negated_predicate() -> Result<()> {
    let filter = order_filter();
    let query = QueryNode::and(vec![
        QueryNode::leaf(AtomicPredicate::new(
            "color",
            vec![Value::from("Red"), Value::from("Yellow")],
        )),
        QueryNode::leaf(predicate("size", "Large").negated()),
    ]);
    assert_eq!(filter.filter("Order", &query, 0, 0)?.total, 279);
    Ok(())
}

#[test]
fn test_negated_group_uses_all_records() -> Result<()> {
    let filter = order_filter();
    let query = QueryNode::not_and(vec![
        QueryNode::leaf(predicate("size", "Small")),
        QueryNode::leaf(predicate("season", "Summer*")),
    ]);
    assert_eq!(filter.filter("Order", &query, 0, 0)?.total, 917);
    Ok(())
}

#[test]
fn test_suffix_pattern() -> Result<()> {
    let filter = order_filter();
    assert_eq!(filter.filter("Order", &single("season", "*2020"), 0, 0)?.total, 500);
    Ok(())
}

#[test]
fn test_redundant_query_minimizes_to_one_path() -> Result<()> {
    // (Blue AND online) OR (Blue AND NOT online) == Blue
    let query = QueryNode::and(vec![QueryNode::or(vec![
        QueryNode::and(vec![
            QueryNode::leaf(predicate("color", "Blue")),
            QueryNode::leaf(predicate("online", true)),
        ]),
        QueryNode::and(vec![
            QueryNode::leaf(predicate("color", "Blue")),
            QueryNode::leaf(predicate("online", true).negated()),
        ]),
    ])]);

    let (formula, registry) = normalize(&query);
    assert_eq!(registry.len(), 2);
    let cover = boolfilter_qmc::minimize(formula.as_str(), registry.len())?;
    assert_eq!(cover.len(), 1);
    assert_eq!(cover[0].to_string(), "0");

    let filter = order_filter();
    assert_eq!(filter.filter("Order", &query, 0, 0)?.total, 111);
    Ok(())
}

// ============================================================================
// Wire format
// ============================================================================

#[test]
fn test_json_request_round_trip() -> Result<()> {
    let filter = order_filter();
    let request = json!({
        "entity_type": "Order",
        "query": {
            "not": false,
            "and": [
                {"property": "warehouse", "values": ["Warehouse 1"], "not": false},
                {"property": "online", "values": [true], "not": true}
            ]
        },
        "limit": 3,
        "offset": 5
    });

    let page = filter.filter_json(&request)?;
    assert_eq!(
        page,
        FilterPage {
            ids: vec![55, 65, 75],
            total: 100
        }
    );
    assert_eq!(
        serde_json::to_value(&page)?,
        json!({"ids": [55, 65, 75], "total": 100})
    );
    Ok(())
}

#[test]
fn test_json_request_defaults() -> Result<()> {
    let request = FilterRequest::from_json_str(
        r#"{"entity_type": "Order", "query": {"and": [{"property": "color", "values": ["Blue"]}]}}"#,
    )?;
    assert_eq!((request.limit, request.offset), (50, 0));

    let page = order_filter().run(&request)?;
    assert_eq!(page.ids.len(), 50);
    assert_eq!(page.total, 111);
    Ok(())
}

#[test]
fn test_malformed_requests_are_rejected() {
    let filter = order_filter();
    let bad = [
        json!({"entity_type": "Order", "query": {"and": []}}),
        json!({"entity_type": "Order", "query": {"and": [{"property": "color", "values": []}]}}),
        json!({"entity_type": "Order", "query": {"and": [{"property": "color", "values": ["Blue"], "typo": 1}]}}),
        json!({"query": {"and": [{"property": "color", "values": ["Blue"]}]}}),
    ];
    for request in bad {
        assert!(
            matches!(filter.filter_json(&request), Err(FilterError::Query(_))),
            "accepted {request}"
        );
    }
}

#[test]
fn test_unknown_values_and_types_are_empty() -> Result<()> {
    let filter = order_filter();
    assert_eq!(filter.filter("Order", &single("color", "Purple"), 0, 10)?.total, 0);
    assert_eq!(filter.filter("Invoice", &single("color", "Blue"), 0, 10)?.total, 0);
    // No orderable index on `city`.
    assert_eq!(filter.filter("Order", &single("city", "[1,5]"), 0, 10)?.total, 0);
    // Bracketed text that is not a range is an ordinary value.
    assert_eq!(filter.filter("Order", &single("city", "[Aurora,Elgin]"), 0, 10)?.total, 0);
    Ok(())
}

#[test]
fn test_cache_is_shared_across_queries() -> Result<()> {
    let filter = order_filter();
    filter.filter("Order", &single("color", "Blue"), 0, 10)?;
    filter.filter("Order", &single("color", "Blue"), 10, 10)?;
    let query = QueryNode::and(vec![
        QueryNode::leaf(predicate("color", "Blue")),
        QueryNode::leaf(predicate("size", "Small")),
    ]);
    filter.filter("Order", &query, 0, 10)?;

    assert_eq!(filter.cache().stats().loads, 2);
    assert_eq!(filter.cache().entry_count(), 2);
    Ok(())
}
