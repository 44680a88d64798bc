//! In-process evaluation of filters against JSON rows
//!
//! Follows SQL three-valued logic closely enough for row selection: a
//! comparison involving a missing or null column never matches, and only
//! `IS NULL` / `IS NOT NULL` look at nulls.

use crate::query_builder::builder::QueryBuilder;
use crate::query_builder::filter::{LogicalOperator, QueryCondition, QueryFilter, QueryOperator};
use chrono::DateTime;
use serde_json::Value;
use std::cmp::Ordering;

impl QueryFilter {
    /// Whether a row, in its serialized form, satisfies this filter
    pub fn matches(&self, row: &Value) -> bool {
        match self {
            QueryFilter::Condition(condition) => condition.matches(row),
            QueryFilter::Group {
                operator: LogicalOperator::And,
                filters,
            } => filters.iter().all(|f| f.matches(row)),
            QueryFilter::Group {
                operator: LogicalOperator::Or,
                filters,
            } => filters.iter().any(|f| f.matches(row)),
        }
    }
}

impl QueryCondition {
    fn matches(&self, row: &Value) -> bool {
        let column = row.get(&self.field).filter(|v| !v.is_null());

        match self.operator {
            QueryOperator::IsNull => column.is_none(),
            QueryOperator::IsNotNull => column.is_some(),
            QueryOperator::Eq if self.value.is_none() => column.is_none(),
            QueryOperator::Ne if self.value.is_none() => column.is_some(),
            _ => {
                let (Some(actual), Some(expected)) = (column, self.value.as_ref()) else {
                    return false;
                };
                match self.operator {
                    QueryOperator::Eq => compare_values(actual, expected) == Some(Ordering::Equal),
                    QueryOperator::Ne => {
                        matches!(compare_values(actual, expected), Some(o) if o != Ordering::Equal)
                    }
                    QueryOperator::Gt => compare_values(actual, expected) == Some(Ordering::Greater),
                    QueryOperator::Gte => matches!(
                        compare_values(actual, expected),
                        Some(Ordering::Greater | Ordering::Equal)
                    ),
                    QueryOperator::Lt => compare_values(actual, expected) == Some(Ordering::Less),
                    QueryOperator::Lte => matches!(
                        compare_values(actual, expected),
                        Some(Ordering::Less | Ordering::Equal)
                    ),
                    QueryOperator::Like => like(actual, expected, false),
                    QueryOperator::ILike => like(actual, expected, true),
                    QueryOperator::In => in_list(actual, expected),
                    QueryOperator::NotIn => !in_list(actual, expected),
                    QueryOperator::IsNull | QueryOperator::IsNotNull => false,
                }
            }
        }
    }
}

impl QueryBuilder {
    /// Whether a row passes every condition of the query
    pub fn matches(&self, row: &Value) -> bool {
        self.conditions.iter().all(|f| f.matches(row))
    }

    /// Order two rows by the query's sort keys; nulls sort last
    pub fn compare_rows(&self, left: &Value, right: &Value) -> Ordering {
        for (field, order) in &self.order_by {
            let l = left.get(field).filter(|v| !v.is_null());
            let r = right.get(field).filter(|v| !v.is_null());
            let ordering = match (l, r) {
                (None, None) => Ordering::Equal,
                (None, Some(_)) => Ordering::Greater,
                (Some(_), None) => Ordering::Less,
                (Some(l), Some(r)) => order.apply(compare_values(l, r).unwrap_or(Ordering::Equal)),
            };
            if ordering != Ordering::Equal {
                return ordering;
            }
        }
        Ordering::Equal
    }
}

/// Compare two non-null scalars of the same kind
pub(crate) fn compare_values(left: &Value, right: &Value) -> Option<Ordering> {
    match (left, right) {
        (Value::Number(l), Value::Number(r)) => match (l.as_i64(), r.as_i64()) {
            (Some(l), Some(r)) => Some(l.cmp(&r)),
            _ => l.as_f64()?.partial_cmp(&r.as_f64()?),
        },
        // Serialized timestamps vary in fractional digits, so compare instants
        (Value::String(l), Value::String(r)) => {
            match (DateTime::parse_from_rfc3339(l), DateTime::parse_from_rfc3339(r)) {
                (Ok(l), Ok(r)) => Some(l.cmp(&r)),
                _ => Some(l.cmp(r)),
            }
        }
        (Value::Bool(l), Value::Bool(r)) => Some(l.cmp(r)),
        (l, r) if l == r => Some(Ordering::Equal),
        _ => None,
    }
}

fn in_list(actual: &Value, list: &Value) -> bool {
    match list {
        Value::Array(items) => items
            .iter()
            .any(|item| compare_values(actual, item) == Some(Ordering::Equal)),
        _ => false,
    }
}

fn like(actual: &Value, pattern: &Value, case_insensitive: bool) -> bool {
    let (Value::String(text), Value::String(pattern)) = (actual, pattern) else {
        return false;
    };
    if case_insensitive {
        like_match(&text.to_lowercase(), &pattern.to_lowercase())
    } else {
        like_match(text, pattern)
    }
}

// `%` matches any run of characters, `_` exactly one
fn like_match(text: &str, pattern: &str) -> bool {
    let text: Vec<char> = text.chars().collect();
    let pattern: Vec<char> = pattern.chars().collect();

    let (mut t, mut p) = (0, 0);
    let mut backtrack: Option<(usize, usize)> = None;

    while t < text.len() {
        match pattern.get(p) {
            Some('%') => {
                backtrack = Some((p, t));
                p += 1;
            }
            Some('_') => {
                t += 1;
                p += 1;
            }
            Some(c) if *c == text[t] => {
                t += 1;
                p += 1;
            }
            _ => match backtrack {
                Some((star, matched)) => {
                    p = star + 1;
                    t = matched + 1;
                    backtrack = Some((star, matched + 1));
                }
                None => return false,
            },
        }
    }

    pattern[p..].iter().all(|c| *c == '%')
}
