//! Value-shape classification for predicate values.
//!
//! A predicate value is looked up one of three ways, decided purely from its
//! shape:
//!
//! - **range**: `[lo,hi]`, `(lo,hi)`, `[lo,hi)`, `(lo,]`, ... where a square
//!   bracket is inclusive, a parenthesis exclusive, and either bound may be
//!   omitted. Bounds are numbers or ISO dates (`YYYY-MM-DD`).
//! - **string pattern**: `*text*` (contains), `*text` (suffix), `text*` (prefix).
//! - **exact** equality for everything else, including non-string values.

use std::cmp::Ordering;
use std::sync::OnceLock;

use chrono::NaiveDate;
use regex::Regex;
use thiserror::Error;

use crate::value::Value;

const WILDCARD: char = '*';

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum RangeParseError {
    #[error("invalid {side} bound `{bound}` in range `{text}`")]
    InvalidBound {
        side: &'static str,
        bound: String,
        text: String,
    },
    #[error("range `{text}` mixes number and date bounds")]
    MixedBounds { text: String },
}

#[derive(Debug, Clone, PartialEq)]
pub struct ValueRange {
    pub lower: Option<Value>,
    pub upper: Option<Value>,
    pub include_lower: bool,
    pub include_upper: bool,
}

impl ValueRange {
    /// Whether `candidate` lies inside the range. Values of a different kind
    /// than the bounds (e.g. strings against numeric bounds) never match.
    pub fn contains(&self, candidate: &Value) -> bool {
        if !self.same_kind(candidate) {
            return false;
        }
        if let Some(lower) = &self.lower {
            match compare(candidate, lower) {
                Some(Ordering::Greater) => {}
                Some(Ordering::Equal) if self.include_lower => {}
                _ => return false,
            }
        }
        if let Some(upper) = &self.upper {
            match compare(candidate, upper) {
                Some(Ordering::Less) => {}
                Some(Ordering::Equal) if self.include_upper => {}
                _ => return false,
            }
        }
        true
    }

    /// True when the bounds are dates (an unbounded range counts as numeric).
    pub fn is_date_range(&self) -> bool {
        self.lower
            .iter()
            .chain(self.upper.iter())
            .any(|b| matches!(b, Value::Date(_)))
    }

    fn same_kind(&self, candidate: &Value) -> bool {
        if self.is_date_range() {
            candidate.as_date().is_some()
        } else {
            candidate.as_f64().is_some()
        }
    }
}

/// Compare two values of the same family (numbers with numbers, dates with dates).
pub fn compare(a: &Value, b: &Value) -> Option<Ordering> {
    match (a, b) {
        (Value::Date(x), Value::Date(y)) => Some(x.cmp(y)),
        _ => a.as_f64()?.partial_cmp(&b.as_f64()?),
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum ValueMatch {
    Exact(Value),
    Prefix(String),
    Suffix(String),
    Contains(String),
    Range(ValueRange),
}

impl ValueMatch {
    pub fn classify(value: &Value) -> Result<Self, RangeParseError> {
        let Value::Str(text) = value else {
            return Ok(ValueMatch::Exact(value.clone()));
        };

        if let Some(caps) = range_shape().captures(text) {
            return parse_range(text, &caps).map(ValueMatch::Range);
        }

        let starts = text.starts_with(WILDCARD);
        let ends = text.ends_with(WILDCARD);
        Ok(match (starts, ends) {
            (true, true) => {
                let inner = text.trim_start_matches(WILDCARD);
                ValueMatch::Contains(inner.strip_suffix(WILDCARD).unwrap_or(inner).to_string())
            }
            (true, false) => ValueMatch::Suffix(text[1..].to_string()),
            (false, true) => ValueMatch::Prefix(text[..text.len() - 1].to_string()),
            (false, false) => ValueMatch::Exact(value.clone()),
        })
    }

    /// Reference semantics of the match, usable by scanning lookups.
    pub fn matches(&self, candidate: &Value) -> bool {
        match self {
            ValueMatch::Exact(v) => v == candidate,
            ValueMatch::Prefix(p) => candidate.as_str().is_some_and(|s| s.starts_with(p.as_str())),
            ValueMatch::Suffix(p) => candidate.as_str().is_some_and(|s| s.ends_with(p.as_str())),
            ValueMatch::Contains(p) => candidate.as_str().is_some_and(|s| s.contains(p.as_str())),
            ValueMatch::Range(r) => r.contains(candidate),
        }
    }
}

/// Brackets around two optional bounds, each a number or an ISO date.
/// Anything else in brackets is an ordinary value.
fn range_shape() -> &'static Regex {
    static SHAPE: OnceLock<Regex> = OnceLock::new();
    SHAPE.get_or_init(|| {
        let bound = r"([0-9]{4}-[0-9]{2}-[0-9]{2}|-?[0-9]*\.?[0-9]+)?";
        Regex::new(&format!(r"^\s*([\[(])\s*{bound}\s*,\s*{bound}\s*([\])])\s*$"))
            .expect("range shape pattern is valid")
    })
}

fn number_shape() -> &'static Regex {
    static NUMBER: OnceLock<Regex> = OnceLock::new();
    NUMBER.get_or_init(|| Regex::new(r"^-?[0-9]*\.?[0-9]+$").expect("number pattern is valid"))
}

fn parse_range(text: &str, caps: &regex::Captures<'_>) -> Result<ValueRange, RangeParseError> {
    let bound = |i: usize| caps.get(i).map_or("", |m| m.as_str());
    let lower = parse_bound(text, "lower", bound(2))?;
    let upper = parse_bound(text, "upper", bound(3))?;

    if let (Some(lo), Some(hi)) = (&lower, &upper) {
        if matches!(lo, Value::Date(_)) != matches!(hi, Value::Date(_)) {
            return Err(RangeParseError::MixedBounds {
                text: text.to_string(),
            });
        }
    }

    Ok(ValueRange {
        lower,
        upper,
        include_lower: &caps[1] == "[",
        include_upper: &caps[4] == "]",
    })
}

fn parse_bound(
    text: &str,
    side: &'static str,
    bound: &str,
) -> Result<Option<Value>, RangeParseError> {
    if bound.is_empty() {
        return Ok(None);
    }
    let invalid = || RangeParseError::InvalidBound {
        side,
        bound: bound.to_string(),
        text: text.to_string(),
    };
    if number_shape().is_match(bound) {
        if !bound.contains('.') {
            if let Ok(i) = bound.parse::<i64>() {
                return Ok(Some(Value::Int(i)));
            }
        }
        return bound
            .parse::<f64>()
            .map(|f| Some(Value::Float(f)))
            .map_err(|_| invalid());
    }
    NaiveDate::parse_from_str(bound, "%Y-%m-%d")
        .map(|d| Some(Value::Date(d)))
        .map_err(|_| invalid())
}
