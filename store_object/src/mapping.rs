//! Column name binding
//!
//! Resolves, once per record type, the physical names a backend needs: the
//! table, the primary key and the soft-delete marker column. The marker
//! column comes from the entity's own `#[soft_delete(column = "...")]` when
//! present and from `soft-delete.column-name` otherwise.
//!
//! Rows travel as the record's serialized JSON. When the marker field
//! serializes under a different name than its column, [`EntityMapping::to_row`]
//! and [`EntityMapping::from_row`] move the value between the two keys.

use crate::errors::StoreError;
use crate::query_builder::QueryFilter;
use crate::session::Session;
use crate::toggle::SOFT_DELETE_FILTER;
use crate::traits::TableMetadata;
use crate::validation::{ValidatedFieldName, ValidatedTableName};
use config::SoftDeleteConfig;
use serde_json::Value;

#[derive(Debug, Clone, PartialEq, Eq)]
struct Marker {
    field: String,
    column: ValidatedFieldName,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntityMapping {
    table: ValidatedTableName,
    primary_key: ValidatedFieldName,
    columns: Vec<String>,
    marker: Option<Marker>,
}

impl EntityMapping {
    pub fn resolve<T: TableMetadata>(config: &SoftDeleteConfig) -> Result<Self, StoreError> {
        let marker = if T::supports_soft_delete() {
            let column = T::soft_delete_column().unwrap_or(config.column_name.as_str());
            Some(Marker {
                field: T::soft_delete_field().unwrap_or(column).to_string(),
                column: ValidatedFieldName::new(column)?,
            })
        } else {
            None
        };

        let columns = T::columns()
            .into_iter()
            .map(|name| match &marker {
                Some(marker) if marker.field == name => marker.column.as_str().to_string(),
                _ => name.to_string(),
            })
            .collect();

        let mapping = Self {
            table: ValidatedTableName::new(T::table_name())?,
            primary_key: ValidatedFieldName::new(T::primary_key_field())?,
            columns,
            marker,
        };
        tracing::debug!(
            table = mapping.table(),
            marker_column = mapping.marker_column().unwrap_or("-"),
            "resolved entity mapping"
        );
        Ok(mapping)
    }

    pub fn table(&self) -> &str {
        self.table.as_str()
    }

    pub fn primary_key(&self) -> &str {
        self.primary_key.as_str()
    }

    /// Physical column names, in declaration order
    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    /// `None` for record types without soft deletion
    pub fn marker_column(&self) -> Option<&str> {
        self.marker.as_ref().map(|marker| marker.column.as_str())
    }

    /// The restriction the session's soft-delete filter currently imposes
    pub fn active_predicate(&self, session: &Session) -> Option<QueryFilter> {
        match self.marker_column() {
            Some(column) if session.is_row_filter_enabled(SOFT_DELETE_FILTER) => {
                Some(QueryFilter::is_null(column))
            }
            _ => None,
        }
    }

    /// Serialized record to row, keyed by column names
    pub fn to_row(&self, record: Value) -> Value {
        match &self.marker {
            Some(marker) => rekey(record, &marker.field, marker.column.as_str()),
            None => record,
        }
    }

    /// Row to the record's serialized form
    pub fn from_row(&self, row: Value) -> Value {
        match &self.marker {
            Some(marker) => rekey(row, marker.column.as_str(), &marker.field),
            None => row,
        }
    }
}

fn rekey(mut value: Value, from: &str, to: &str) -> Value {
    if from != to {
        if let Some(object) = value.as_object_mut() {
            if let Some(moved) = object.remove(from) {
                object.insert(to.to_string(), moved);
            }
        }
    }
    value
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::query_builder::QueryBuilder;
    use serde::{Deserialize, Serialize};
    use serde_json::json;

    #[derive(Debug, Clone, Serialize, Deserialize)]
    struct Invoice {
        id: i64,
    }

    impl TableMetadata for Invoice {
        type Id = i64;

        fn table_name() -> &'static str {
            "invoices"
        }

        fn primary_key_field() -> &'static str {
            "id"
        }

        fn columns() -> Vec<&'static str> {
            vec!["id", "deleted_at"]
        }

        fn extract_id(&self) -> i64 {
            self.id
        }

        fn supports_soft_delete() -> bool {
            true
        }

        fn soft_delete_field() -> Option<&'static str> {
            Some("deleted_at")
        }

        fn soft_delete_column() -> Option<&'static str> {
            Some("removed_at")
        }
    }

    #[derive(Debug, Clone, Serialize, Deserialize)]
    struct Note {
        id: i64,
    }

    impl TableMetadata for Note {
        type Id = i64;

        fn table_name() -> &'static str {
            "notes"
        }

        fn primary_key_field() -> &'static str {
            "id"
        }

        fn columns() -> Vec<&'static str> {
            vec!["id", "deleted_at"]
        }

        fn extract_id(&self) -> i64 {
            self.id
        }

        fn supports_soft_delete() -> bool {
            true
        }

        fn soft_delete_field() -> Option<&'static str> {
            Some("deleted_at")
        }
    }

    #[derive(Debug, Clone, Serialize, Deserialize)]
    struct AuditLine {
        id: i64,
    }

    impl TableMetadata for AuditLine {
        type Id = i64;

        fn table_name() -> &'static str {
            "audit_lines"
        }

        fn primary_key_field() -> &'static str {
            "id"
        }

        fn columns() -> Vec<&'static str> {
            vec!["id"]
        }

        fn extract_id(&self) -> i64 {
            self.id
        }
    }

    #[test]
    fn test_entity_override_beats_global_config() {
        let mapping =
            EntityMapping::resolve::<Invoice>(&SoftDeleteConfig::new("archived_at")).unwrap();
        assert_eq!(mapping.marker_column(), Some("removed_at"));
        assert_eq!(mapping.table(), "invoices");
        assert_eq!(mapping.primary_key(), "id");
        assert_eq!(mapping.columns(), ["id", "removed_at"]);
    }

    #[test]
    fn test_global_config_applies_without_override() {
        let mapping = EntityMapping::resolve::<Note>(&SoftDeleteConfig::default()).unwrap();
        assert_eq!(mapping.marker_column(), Some("deleted_at"));

        let mapping =
            EntityMapping::resolve::<Note>(&SoftDeleteConfig::new("archived_at")).unwrap();
        assert_eq!(mapping.marker_column(), Some("archived_at"));
        assert_eq!(mapping.columns(), ["id", "archived_at"]);
    }

    #[test]
    fn test_rows_move_marker_between_field_and_column() {
        let mapping = EntityMapping::resolve::<Invoice>(&SoftDeleteConfig::default()).unwrap();

        let row = mapping.to_row(json!({"id": 1, "deleted_at": "2024-05-01T10:00:00Z"}));
        assert_eq!(row, json!({"id": 1, "removed_at": "2024-05-01T10:00:00Z"}));

        let record = mapping.from_row(row);
        assert_eq!(record, json!({"id": 1, "deleted_at": "2024-05-01T10:00:00Z"}));

        // Same name on both sides leaves the value alone
        let mapping = EntityMapping::resolve::<Note>(&SoftDeleteConfig::default()).unwrap();
        let row = json!({"id": 1, "deleted_at": null});
        assert_eq!(mapping.to_row(row.clone()), row);
    }

    #[test]
    fn test_plain_entity_has_no_marker() {
        let mapping = EntityMapping::resolve::<AuditLine>(&SoftDeleteConfig::default()).unwrap();
        assert_eq!(mapping.marker_column(), None);
        assert!(mapping.active_predicate(&Session::new()).is_none());
    }

    #[test]
    fn test_invalid_global_column_is_rejected() {
        let err = EntityMapping::resolve::<Note>(&SoftDeleteConfig::new("gone at")).unwrap_err();
        assert!(matches!(err, StoreError::Validation(_)));
    }

    #[test]
    fn test_active_predicate_follows_session_filter() {
        let mapping = EntityMapping::resolve::<Note>(&SoftDeleteConfig::default()).unwrap();
        let session = Session::new();

        let predicate = mapping.active_predicate(&session).unwrap();
        let (where_clause, values) = QueryBuilder::new().filter(predicate).build_where_clause();
        assert_eq!(where_clause, "WHERE deleted_at IS NULL");
        assert!(values.is_empty());

        let _guard = session.toggle().suspend().unwrap();
        assert!(mapping.active_predicate(&session).is_none());
    }
}
