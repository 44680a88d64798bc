//! Filter conditions
//!
//! Field names are column names. Backends interpolate them into SQL, so
//! [`QueryFilter::columns`] exposes every name a filter references for
//! validation before a statement is built.

use serde_json::Value;

/// Comparison applied by a [`QueryCondition`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueryOperator {
    Eq,
    Ne,
    Gt,
    Gte,
    Lt,
    Lte,
    Like,
    /// Case-insensitive `LIKE`
    ILike,
    In,
    NotIn,
    IsNull,
    IsNotNull,
}

impl QueryOperator {
    /// SQL spelling of the binary operators; `None` for list and null tests
    pub fn binary_sql(self) -> Option<&'static str> {
        match self {
            QueryOperator::Eq => Some("="),
            QueryOperator::Ne => Some("!="),
            QueryOperator::Gt => Some(">"),
            QueryOperator::Gte => Some(">="),
            QueryOperator::Lt => Some("<"),
            QueryOperator::Lte => Some("<="),
            QueryOperator::Like => Some("LIKE"),
            QueryOperator::ILike => Some("ILIKE"),
            QueryOperator::In
            | QueryOperator::NotIn
            | QueryOperator::IsNull
            | QueryOperator::IsNotNull => None,
        }
    }
}

/// One column compared against an optional value
#[derive(Debug, Clone, PartialEq)]
pub struct QueryCondition {
    pub field: String,
    pub operator: QueryOperator,
    /// `None` for the null tests; with `Eq`/`Ne` it means `IS [NOT] NULL`
    pub value: Option<Value>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogicalOperator {
    And,
    Or,
}

/// A condition or a nested AND/OR group of filters
#[derive(Debug, Clone, PartialEq)]
pub enum QueryFilter {
    Condition(QueryCondition),
    Group {
        operator: LogicalOperator,
        filters: Vec<QueryFilter>,
    },
}

impl QueryFilter {
    pub fn condition(field: &str, operator: QueryOperator, value: Option<Value>) -> Self {
        Self::Condition(QueryCondition {
            field: field.to_string(),
            operator,
            value,
        })
    }

    /// All of `filters`; an empty group matches every row
    pub fn and(filters: Vec<QueryFilter>) -> Self {
        Self::Group {
            operator: LogicalOperator::And,
            filters,
        }
    }

    /// Any of `filters`; an empty group matches no row
    pub fn or(filters: Vec<QueryFilter>) -> Self {
        Self::Group {
            operator: LogicalOperator::Or,
            filters,
        }
    }

    pub fn eq(field: &str, value: impl Into<Value>) -> Self {
        Self::condition(field, QueryOperator::Eq, Some(value.into()))
    }

    pub fn ne(field: &str, value: impl Into<Value>) -> Self {
        Self::condition(field, QueryOperator::Ne, Some(value.into()))
    }

    pub fn gt(field: &str, value: impl Into<Value>) -> Self {
        Self::condition(field, QueryOperator::Gt, Some(value.into()))
    }

    pub fn gte(field: &str, value: impl Into<Value>) -> Self {
        Self::condition(field, QueryOperator::Gte, Some(value.into()))
    }

    pub fn lt(field: &str, value: impl Into<Value>) -> Self {
        Self::condition(field, QueryOperator::Lt, Some(value.into()))
    }

    pub fn lte(field: &str, value: impl Into<Value>) -> Self {
        Self::condition(field, QueryOperator::Lte, Some(value.into()))
    }

    /// `%` matches any run of characters, `_` exactly one
    pub fn like(field: &str, pattern: &str) -> Self {
        Self::condition(field, QueryOperator::Like, Some(pattern.into()))
    }

    pub fn ilike(field: &str, pattern: &str) -> Self {
        Self::condition(field, QueryOperator::ILike, Some(pattern.into()))
    }

    pub fn in_values<V: Into<Value>>(field: &str, values: impl IntoIterator<Item = V>) -> Self {
        Self::condition(field, QueryOperator::In, Some(list(values)))
    }

    pub fn not_in_values<V: Into<Value>>(
        field: &str,
        values: impl IntoIterator<Item = V>,
    ) -> Self {
        Self::condition(field, QueryOperator::NotIn, Some(list(values)))
    }

    pub fn is_null(field: &str) -> Self {
        Self::condition(field, QueryOperator::IsNull, None)
    }

    pub fn is_not_null(field: &str) -> Self {
        Self::condition(field, QueryOperator::IsNotNull, None)
    }

    /// Every column name referenced by this filter, nested groups included
    pub fn columns(&self) -> Vec<&str> {
        match self {
            QueryFilter::Condition(condition) => vec![condition.field.as_str()],
            QueryFilter::Group { filters, .. } => {
                filters.iter().flat_map(QueryFilter::columns).collect()
            }
        }
    }
}

fn list<V: Into<Value>>(values: impl IntoIterator<Item = V>) -> Value {
    Value::Array(values.into_iter().map(Into::into).collect())
}
