//! Query builder tests

use crate::query_builder::sql_generation::SqlGenerator;
use crate::query_builder::{QueryBuilder, QueryFilter, QueryOperator, SortOrder};
use serde_json::json;

// ========================================
// SQL Generation
// ========================================

#[test]
fn test_sql_generation_empty_conditions() {
    let (where_clause, values) = SqlGenerator::build_where_clause(&[]);
    assert_eq!(where_clause, "");
    assert!(values.is_empty());
}

#[test]
fn test_sql_generation_empty_arrays() {
    let filter = QueryFilter::in_values("status", Vec::<i64>::new());
    let (where_clause, values) = SqlGenerator::build_where_clause(&[filter]);
    assert_eq!(where_clause, "WHERE 1=0");
    assert!(values.is_empty());

    let filter = QueryFilter::not_in_values("type", Vec::<i64>::new());
    let (where_clause, values) = SqlGenerator::build_where_clause(&[filter]);
    assert_eq!(where_clause, "WHERE 1=1");
    assert!(values.is_empty());
}

#[test]
fn test_sql_generation_null_conditions() {
    let (where_clause, values) =
        SqlGenerator::build_where_clause(&[QueryFilter::is_null("deleted_at")]);
    assert_eq!(where_clause, "WHERE deleted_at IS NULL");
    assert!(values.is_empty());

    let (where_clause, values) =
        SqlGenerator::build_where_clause(&[QueryFilter::is_not_null("deleted_at")]);
    assert_eq!(where_clause, "WHERE deleted_at IS NOT NULL");
    assert!(values.is_empty());

    // Eq/Ne without a value fall back to null checks
    let filter = QueryFilter::condition("removed_at", QueryOperator::Eq, None);
    let (where_clause, _) = SqlGenerator::build_where_clause(&[filter]);
    assert_eq!(where_clause, "WHERE removed_at IS NULL");
}

#[test]
fn test_sql_generation_renders_placeholders_per_column() {
    let filters = [
        QueryFilter::eq("ref", "6f1c1f2e-3a5b-4c1d-9e7f-0a1b2c3d4e5f"),
        QueryFilter::in_values("id", [1, 2]),
    ];
    let (where_clause, values) =
        SqlGenerator::build_where_clause_with(&filters, &|column, index| {
            format!("${index}::{column}_type")
        });

    assert_eq!(
        where_clause,
        "WHERE ref = $1::ref_type AND id IN ($2::id_type, $3::id_type)"
    );
    assert_eq!(values.len(), 3);
    assert_eq!(values[0], json!("6f1c1f2e-3a5b-4c1d-9e7f-0a1b2c3d4e5f"));
}

#[test]
fn test_sql_generation_invalid_operator_value_combinations() {
    let filter = QueryFilter::condition("amount", QueryOperator::Gt, None);
    let (where_clause, values) = SqlGenerator::build_where_clause(&[filter]);
    assert!(where_clause.contains("1=0"));
    assert!(values.is_empty());

    let filter = QueryFilter::condition("status", QueryOperator::In, Some(json!("not_an_array")));
    let (where_clause, values) = SqlGenerator::build_where_clause(&[filter]);
    assert!(where_clause.contains("1=0"));
    assert!(values.is_empty());
}

#[test]
fn test_sql_generation_complex_nested_groups() {
    let complex_filter = QueryFilter::and(vec![
        QueryFilter::or(vec![
            QueryFilter::eq("status", json!("active")),
            QueryFilter::eq("status", json!("pending")),
        ]),
        QueryFilter::and(vec![
            QueryFilter::gt("amount", json!(100)),
            QueryFilter::lt("amount", json!(1000)),
        ]),
    ]);

    let (where_clause, values) = SqlGenerator::build_where_clause(&[complex_filter]);

    assert_eq!(
        where_clause,
        "WHERE ((status = $1 OR status = $2) AND (amount > $3 AND amount < $4))"
    );
    assert_eq!(values, vec![json!("active"), json!("pending"), json!(100), json!(1000)]);
}

#[test]
fn test_sql_generation_empty_groups() {
    let (where_clause, _) = SqlGenerator::build_where_clause(&[QueryFilter::and(vec![])]);
    assert_eq!(where_clause, "WHERE 1=1");

    let (where_clause, _) = SqlGenerator::build_where_clause(&[QueryFilter::or(vec![])]);
    assert_eq!(where_clause, "WHERE 1=0");
}

#[test]
fn test_sql_generation_parameter_numbering() {
    let filters = vec![
        QueryFilter::eq("name", json!("test1")),
        QueryFilter::in_values("id", vec![json!(1), json!(2)]),
        QueryFilter::gt("age", 25),
    ];

    let (where_clause, values) = SqlGenerator::build_where_clause(&filters);

    assert_eq!(where_clause, "WHERE name = $1 AND id IN ($2, $3) AND age > $4");
    assert_eq!(values.len(), 4);
}

#[test]
fn test_sql_generation_keeps_injection_in_values() {
    let filter = QueryFilter::eq("name", json!("'; DROP TABLE users; --"));
    let (where_clause, values) = SqlGenerator::build_where_clause(&[filter]);

    assert_eq!(where_clause, "WHERE name = $1");
    assert_eq!(values, vec![json!("'; DROP TABLE users; --")]);
}

// ========================================
// QueryBuilder
// ========================================

#[test]
fn test_query_builder_empty_state() {
    let (where_clause, order_clause, values) = QueryBuilder::new().build();

    assert_eq!(where_clause, "");
    assert_eq!(order_clause, "");
    assert!(values.is_empty());
}

#[test]
fn test_query_builder_many_filters() {
    let mut builder = QueryBuilder::new();
    for i in 0..100 {
        builder = builder.filter(QueryFilter::eq(&format!("field_{}", i), json!(i)));
    }

    let (where_clause, _, values) = builder.build();

    assert!(where_clause.starts_with("WHERE"));
    assert_eq!(where_clause.matches("AND").count(), 99);
    assert_eq!(values.len(), 100);
}

#[test]
fn test_query_builder_method_chaining_order() {
    let builder1 = QueryBuilder::new()
        .filter(QueryFilter::eq("name", json!("test")))
        .order_by("created_at", SortOrder::Desc);

    let builder2 = QueryBuilder::new()
        .order_by("created_at", SortOrder::Desc)
        .filter(QueryFilter::eq("name", json!("test")));

    assert_eq!(builder1.build(), builder2.build());
}

#[test]
fn test_restricted_by_leaves_original_untouched() {
    let base = QueryBuilder::new().filter(QueryFilter::eq("name", json!("a")));

    let restricted = base.restricted_by(Some(QueryFilter::is_null("deleted_at")));
    assert_eq!(restricted.conditions().len(), 2);
    assert_eq!(base.conditions().len(), 1);

    let (where_clause, _) = restricted.build_where_clause();
    assert_eq!(where_clause, "WHERE name = $1 AND deleted_at IS NULL");

    let unrestricted = base.restricted_by(None);
    assert_eq!(unrestricted.conditions(), base.conditions());
}

// ========================================
// Ordering
// ========================================

#[test]
fn test_sort_order_sql_conversion() {
    assert_eq!(SortOrder::Asc.to_sql(), "ASC");
    assert_eq!(SortOrder::Desc.to_sql(), "DESC");
}

#[test]
fn test_order_clause_generation() {
    assert_eq!(SqlGenerator::build_order_clause(&[]), "");

    let orders = vec![("name".to_string(), SortOrder::Asc)];
    assert_eq!(SqlGenerator::build_order_clause(&orders), "ORDER BY name ASC");

    let orders = vec![
        ("priority".to_string(), SortOrder::Desc),
        ("created_at".to_string(), SortOrder::Asc),
    ];
    assert_eq!(
        SqlGenerator::build_order_clause(&orders),
        "ORDER BY priority DESC, created_at ASC"
    );
}

// ========================================
// In-process matching
// ========================================

#[test]
fn test_matching_null_semantics() {
    let trashed = json!({"id": 1, "deleted_at": "2024-05-01T10:00:00Z"});
    let active = json!({"id": 2, "deleted_at": null});
    let missing = json!({"id": 3});

    let not_deleted = QueryFilter::is_null("deleted_at");
    assert!(!not_deleted.matches(&trashed));
    assert!(not_deleted.matches(&active));
    assert!(not_deleted.matches(&missing));

    // Comparisons against null never match, in either direction
    let after = QueryFilter::gt("deleted_at", json!("2024-01-01T00:00:00Z"));
    assert!(after.matches(&trashed));
    assert!(!after.matches(&active));
    assert!(!QueryFilter::ne("deleted_at", json!("x")).matches(&active));
}

#[test]
fn test_matching_groups_and_lists() {
    let row = json!({"id": 7, "name": "Alice", "status": "active"});

    let filter = QueryFilter::and(vec![
        QueryFilter::or(vec![
            QueryFilter::eq("status", json!("pending")),
            QueryFilter::eq("status", json!("active")),
        ]),
        QueryFilter::in_values("id", [5, 7]),
        QueryFilter::ilike("name", "al%"),
    ]);
    assert!(filter.matches(&row));

    assert!(!QueryFilter::like("name", "al%").matches(&row));
    assert!(!QueryFilter::in_values("id", Vec::<i64>::new()).matches(&row));
    assert!(QueryFilter::not_in_values("id", Vec::<i64>::new()).matches(&row));
    assert!(QueryFilter::and(vec![]).matches(&row));
    assert!(!QueryFilter::or(vec![]).matches(&row));
}

#[test]
fn test_compare_rows_orders_nulls_last() {
    let query = QueryBuilder::new()
        .order_by("rank", SortOrder::Desc)
        .order_by("name", SortOrder::Asc);

    let mut rows = vec![
        json!({"name": "c", "rank": null}),
        json!({"name": "b", "rank": 1}),
        json!({"name": "a", "rank": 1}),
        json!({"name": "d", "rank": 5}),
    ];
    rows.sort_by(|l, r| query.compare_rows(l, r));

    let names: Vec<&str> = rows.iter().map(|r| r["name"].as_str().unwrap()).collect();
    assert_eq!(names, vec!["d", "a", "b", "c"]);
}

// ========================================
// Column validation
// ========================================

#[test]
fn test_columns_cover_nested_groups_and_ordering() {
    let query = QueryBuilder::new()
        .filter(QueryFilter::or(vec![
            QueryFilter::eq("status", "open"),
            QueryFilter::and(vec![QueryFilter::is_null("deleted_at")]),
        ]))
        .order_by("rank", SortOrder::Asc);

    assert_eq!(query.columns(), vec!["status", "deleted_at", "rank"]);
    assert!(query.validate().is_ok());
}

#[test]
fn test_validate_rejects_injected_column() {
    let query = QueryBuilder::new().filter(QueryFilter::eq("name = name OR 1", 1));
    assert!(query.validate().is_err());

    let query = QueryBuilder::new().order_by("select", SortOrder::Desc);
    assert!(query.validate().is_err());
}
