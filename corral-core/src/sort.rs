//! Client-side sorting with a fixed tie-break policy.
//!
//! Used when the backend returns a whole collection without pagination
//! metadata and the rows have to be ordered locally.
//!
//! - strings compare case-insensitively
//! - a missing field sorts as the empty string, or as `0` against a number
//! - rows with equal keys keep the order the server returned them in

use std::borrow::Cow;
use std::cmp::Ordering;

use serde_json::Value;

use crate::key::{SortDirection, SortSpec};

/// A comparable projection of one field of a row.
#[derive(Debug, Clone, PartialEq)]
pub enum SortValue<'a> {
    /// Text, compared case-insensitively.
    Text(Cow<'a, str>),
    /// Numeric value.
    Number(f64),
    /// Field absent or null.
    Missing,
}

impl<'a> From<&'a str> for SortValue<'a> {
    fn from(value: &'a str) -> Self {
        SortValue::Text(Cow::Borrowed(value))
    }
}

impl<'a> From<Option<&'a str>> for SortValue<'a> {
    fn from(value: Option<&'a str>) -> Self {
        value.map_or(SortValue::Missing, SortValue::from)
    }
}

impl From<f64> for SortValue<'_> {
    fn from(value: f64) -> Self {
        SortValue::Number(value)
    }
}

impl From<Option<f64>> for SortValue<'_> {
    fn from(value: Option<f64>) -> Self {
        value.map_or(SortValue::Missing, SortValue::Number)
    }
}

/// Rows that can be ordered by named fields.
pub trait Sortable {
    /// Projects `field` of this row. Unknown fields are [`SortValue::Missing`].
    fn sort_value(&self, field: &str) -> SortValue<'_>;
}

impl Sortable for Value {
    /// Looks up `field` as a dotted path (`"user.firstName"`).
    fn sort_value(&self, field: &str) -> SortValue<'_> {
        let mut current = self;
        for segment in field.split('.') {
            match current.get(segment) {
                Some(next) => current = next,
                None => return SortValue::Missing,
            }
        }
        match current {
            Value::String(s) => SortValue::Text(Cow::Borrowed(s)),
            Value::Number(n) => n.as_f64().map_or(SortValue::Missing, SortValue::Number),
            Value::Bool(b) => SortValue::Text(Cow::Owned(b.to_string())),
            Value::Null | Value::Array(_) | Value::Object(_) => SortValue::Missing,
        }
    }
}

fn compare_text(a: &str, b: &str) -> Ordering {
    a.chars()
        .flat_map(char::to_lowercase)
        .cmp(b.chars().flat_map(char::to_lowercase))
}

fn compare_numbers(a: f64, b: f64) -> Ordering {
    a.partial_cmp(&b).unwrap_or(Ordering::Equal)
}

/// Compares two projections under the tie-break policy.
///
/// Numbers order before text when a column mixes both.
pub fn compare_values(a: &SortValue<'_>, b: &SortValue<'_>) -> Ordering {
    use SortValue::*;
    match (a, b) {
        (Text(a), Text(b)) => compare_text(a, b),
        (Number(a), Number(b)) => compare_numbers(*a, *b),
        (Missing, Missing) => Ordering::Equal,
        (Missing, Text(b)) => compare_text("", b),
        (Text(a), Missing) => compare_text(a, ""),
        (Missing, Number(b)) => compare_numbers(0.0, *b),
        (Number(a), Missing) => compare_numbers(*a, 0.0),
        (Number(_), Text(_)) => Ordering::Less,
        (Text(_), Number(_)) => Ordering::Greater,
    }
}

/// Sorts `items` in place. The sort is stable, so equal keys keep their order.
pub fn sort_items<T: Sortable>(items: &mut [T], sort: &SortSpec) {
    let field = sort.field.as_str();
    items.sort_by(|a, b| {
        let ordering = compare_values(&a.sort_value(field), &b.sort_value(field));
        match sort.direction {
            SortDirection::Asc => ordering,
            SortDirection::Desc => ordering.reverse(),
        }
    });
}
