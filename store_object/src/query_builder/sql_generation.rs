//! SQL rendering of filters and orderings
//!
//! Values never appear in the generated text. Each one becomes a numbered
//! placeholder (`$1`, `$2`, ...) and is returned alongside for binding.
//! Backends that need more than a bare placeholder, such as a cast to the
//! compared column's type, render it themselves through
//! [`SqlGenerator::build_where_clause_with`].

use crate::query_builder::filter::{LogicalOperator, QueryCondition, QueryFilter, QueryOperator};
use crate::query_builder::ordering::SortOrder;
use serde_json::Value;

/// Renders the SQL for the value compared against `column` at position `index`
pub type PlaceholderRenderer<'a> = &'a dyn Fn(&str, usize) -> String;

pub struct SqlGenerator;

impl SqlGenerator {
    /// Build WHERE clause from conditions
    pub fn build_where_clause(conditions: &[QueryFilter]) -> (String, Vec<Value>) {
        Self::build_where_clause_with(conditions, &|_, index| format!("${}", index))
    }

    /// Build WHERE clause, rendering every value through `render`
    pub fn build_where_clause_with(
        conditions: &[QueryFilter],
        render: PlaceholderRenderer<'_>,
    ) -> (String, Vec<Value>) {
        if conditions.is_empty() {
            return (String::new(), Vec::new());
        }

        let mut values = Vec::new();
        let conditions_sql = conditions
            .iter()
            .map(|condition| Self::build_condition_sql(condition, &mut values, render))
            .collect::<Vec<_>>()
            .join(" AND ");

        (format!("WHERE {}", conditions_sql), values)
    }

    fn build_condition_sql(
        filter: &QueryFilter,
        values: &mut Vec<Value>,
        render: PlaceholderRenderer<'_>,
    ) -> String {
        match filter {
            QueryFilter::Condition(condition) => {
                Self::build_single_condition_sql(condition, values, render)
            }
            // An empty group is the identity of its operator
            QueryFilter::Group { operator, filters } if filters.is_empty() => match operator {
                LogicalOperator::And => "1=1".to_string(),
                LogicalOperator::Or => "1=0".to_string(),
            },
            QueryFilter::Group { operator, filters } => {
                let operator_str = match operator {
                    LogicalOperator::And => " AND ",
                    LogicalOperator::Or => " OR ",
                };

                let group_conditions = filters
                    .iter()
                    .map(|f| Self::build_condition_sql(f, values, render))
                    .collect::<Vec<_>>()
                    .join(operator_str);

                format!("({})", group_conditions)
            }
        }
    }

    fn build_single_condition_sql(
        condition: &QueryCondition,
        values: &mut Vec<Value>,
        render: PlaceholderRenderer<'_>,
    ) -> String {
        let field = condition.field.as_str();
        let mut placeholder = |value: &Value| {
            values.push(value.clone());
            render(field, values.len())
        };

        match condition.operator {
            QueryOperator::Eq if condition.value.is_none() => format!("{} IS NULL", field),
            QueryOperator::Ne if condition.value.is_none() => format!("{} IS NOT NULL", field),
            QueryOperator::IsNull => format!("{} IS NULL", field),
            QueryOperator::IsNotNull => format!("{} IS NOT NULL", field),
            QueryOperator::In | QueryOperator::NotIn => {
                let negated = condition.operator == QueryOperator::NotIn;
                match &condition.value {
                    Some(Value::Array(items)) if !items.is_empty() => {
                        let placeholders: Vec<String> = items.iter().map(&mut placeholder).collect();
                        let keyword = if negated { "NOT IN" } else { "IN" };
                        format!("{} {} ({})", field, keyword, placeholders.join(", "))
                    }
                    // Empty IN matches nothing, empty NOT IN matches everything
                    _ if negated => "1=1".to_string(),
                    _ => "1=0".to_string(),
                }
            }
            operator => match (operator.binary_sql(), &condition.value) {
                (Some(sql_op), Some(value)) => {
                    format!("{} {} {}", field, sql_op, placeholder(value))
                }
                _ => "1=0".to_string(),
            },
        }
    }

    /// Build ORDER BY clause
    pub fn build_order_clause(order_by: &[(String, SortOrder)]) -> String {
        if order_by.is_empty() {
            return String::new();
        }

        let order_items: Vec<String> = order_by
            .iter()
            .map(|(field, order)| format!("{} {}", field, order.to_sql()))
            .collect();

        format!("ORDER BY {}", order_items.join(", "))
    }
}
