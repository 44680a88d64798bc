//! Query builder
//!
//! A [`QueryBuilder`] is a conjunction of filters plus an ordering. It carries
//! no table name; the backend supplies that from its mapping.

use crate::query_builder::filter::QueryFilter;
use crate::query_builder::ordering::SortOrder;
use crate::query_builder::sql_generation::{PlaceholderRenderer, SqlGenerator};
use crate::validation::{ValidatedFieldName, ValidationError};
use serde_json::Value;

/// Filters (combined with AND) and ordering for one query
#[derive(Debug, Clone, Default)]
pub struct QueryBuilder {
    pub(crate) conditions: Vec<QueryFilter>,
    pub(crate) order_by: Vec<(String, SortOrder)>,
}

impl QueryBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a filter condition
    pub fn filter(mut self, filter: QueryFilter) -> Self {
        self.conditions.push(filter);
        self
    }

    /// Add multiple filters (combined with AND)
    pub fn filters(mut self, filters: Vec<QueryFilter>) -> Self {
        self.conditions.extend(filters);
        self
    }

    /// Add ordering
    pub fn order_by(mut self, field: &str, order: SortOrder) -> Self {
        self.order_by.push((field.to_string(), order));
        self
    }

    /// Copy of this query with an extra restriction, if any
    pub fn restricted_by(&self, predicate: Option<QueryFilter>) -> Self {
        let mut query = self.clone();
        if let Some(predicate) = predicate {
            query.conditions.push(predicate);
        }
        query
    }

    pub fn conditions(&self) -> &[QueryFilter] {
        &self.conditions
    }

    pub fn ordering(&self) -> &[(String, SortOrder)] {
        &self.order_by
    }

    /// Every column the query filters or sorts on
    pub fn columns(&self) -> Vec<&str> {
        self.conditions
            .iter()
            .flat_map(QueryFilter::columns)
            .chain(self.order_by.iter().map(|(field, _)| field.as_str()))
            .collect()
    }

    /// Reject column names that are not plain identifiers
    ///
    /// Column names are interpolated into SQL text, values never are.
    pub fn validate(&self) -> Result<(), ValidationError> {
        for column in self.columns() {
            ValidatedFieldName::new(column)?;
        }
        Ok(())
    }

    /// Build WHERE clause
    pub fn build_where_clause(&self) -> (String, Vec<Value>) {
        SqlGenerator::build_where_clause(&self.conditions)
    }

    /// Build WHERE clause with backend-rendered placeholders
    pub fn build_where_clause_with(&self, render: PlaceholderRenderer<'_>) -> (String, Vec<Value>) {
        SqlGenerator::build_where_clause_with(&self.conditions, render)
    }

    /// Build ORDER BY clause
    pub fn build_order_clause(&self) -> String {
        SqlGenerator::build_order_clause(&self.order_by)
    }

    /// Build complete query parts (WHERE, ORDER BY, Values)
    pub fn build(&self) -> (String, String, Vec<Value>) {
        let (where_clause, values) = self.build_where_clause();
        let order_clause = self.build_order_clause();

        (where_clause, order_clause, values)
    }
}
