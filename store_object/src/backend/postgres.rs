//! PostgreSQL storage backend
//!
//! Rows are exchanged as JSONB: reads select `to_jsonb(t)` and writes go
//! through `jsonb_populate_record`, so a record only needs `serde` support
//! and its serialized field names must match the table's columns.
//!
//! Filter values are bound as JSONB as well and converted to the compared
//! column's declared type by `jsonb_populate_record`, so a string that merely
//! looks like a uuid or a timestamp still compares against a `TEXT` column.
//!
//! Statements run immediately against the pool. There is no identity cache,
//! so `merge` and `remove` are write-through and `flush` has nothing to do.

use crate::errors::StoreError;
use crate::mapping::EntityMapping;
use crate::query_builder::QueryBuilder;
use crate::session::Session;
use crate::traits::{StorageBackend, TableMetadata};
use async_trait::async_trait;
use serde_json::Value;
use sqlx::types::Json;
use sqlx::PgPool;
use std::fmt;
use std::marker::PhantomData;

/// Storage backend for one record type on a Postgres pool
pub struct PgBackend<T> {
    pool: PgPool,
    mapping: EntityMapping,
    _record: PhantomData<fn() -> T>,
}

impl<T> fmt::Debug for PgBackend<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PgBackend")
            .field("mapping", &self.mapping)
            .finish_non_exhaustive()
    }
}

impl<T: TableMetadata> PgBackend<T> {
    pub fn new(pool: PgPool, mapping: EntityMapping) -> Self {
        Self {
            pool,
            mapping,
            _record: PhantomData,
        }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    fn select_sql(&self, where_clause: &str, order_clause: &str) -> String {
        let mut sql = format!("SELECT to_jsonb(t) FROM {} t", self.mapping.table());
        for clause in [where_clause, order_clause] {
            if !clause.is_empty() {
                sql.push(' ');
                sql.push_str(clause);
            }
        }
        sql
    }

    /// Parameter `index` as a value of `column`'s declared type
    fn typed_placeholder(&self, column: &str, index: usize) -> String {
        format!(
            "(jsonb_populate_record(NULL::{}, jsonb_build_object('{column}', ${index}::jsonb))).{column}",
            self.mapping.table()
        )
    }

    fn where_clause(&self, query: &QueryBuilder) -> (String, Vec<Value>) {
        query.build_where_clause_with(&|column, index| self.typed_placeholder(column, index))
    }

    fn by_id_sql(&self) -> String {
        let primary_key = self.mapping.primary_key();
        format!(
            "SELECT to_jsonb(t) FROM {} t WHERE {primary_key} = {}",
            self.mapping.table(),
            self.typed_placeholder(primary_key, 1)
        )
    }

    fn delete_sql(&self) -> String {
        let primary_key = self.mapping.primary_key();
        format!(
            "DELETE FROM {} WHERE {primary_key} = {}",
            self.mapping.table(),
            self.typed_placeholder(primary_key, 1)
        )
    }

    fn upsert_sql(&self) -> String {
        let table = self.mapping.table();
        let primary_key = self.mapping.primary_key();

        let mut assignments: Vec<String> = self
            .mapping
            .columns()
            .iter()
            .filter(|column| column.as_str() != primary_key)
            .map(|column| format!("{column} = EXCLUDED.{column}"))
            .collect();
        if assignments.is_empty() {
            assignments.push(format!("{primary_key} = EXCLUDED.{primary_key}"));
        }

        format!(
            "INSERT INTO {table} AS t SELECT * FROM jsonb_populate_record(NULL::{table}, $1) \
             ON CONFLICT ({primary_key}) DO UPDATE SET {} RETURNING to_jsonb(t)",
            assignments.join(", ")
        )
    }

    fn decode(&self, row: Value) -> Result<T, StoreError> {
        Ok(serde_json::from_value(self.mapping.from_row(row))?)
    }
}

#[async_trait]
impl<T: TableMetadata> StorageBackend<T> for PgBackend<T> {
    fn mapping(&self) -> &EntityMapping {
        &self.mapping
    }

    async fn execute_query(
        &self,
        session: &Session,
        query: &QueryBuilder,
    ) -> Result<Vec<T>, StoreError> {
        query.validate()?;
        let query = query.restricted_by(self.mapping.active_predicate(session));
        let (where_clause, params) = self.where_clause(&query);
        let sql = self.select_sql(&where_clause, &query.build_order_clause());
        crate::debug_log!(session = %session.id(), sql = %sql, "executing query");

        let mut sqlx_query = sqlx::query_scalar::<_, Value>(&sql);
        for param in params {
            sqlx_query = sqlx_query.bind(Json(param));
        }

        let rows = sqlx_query
            .fetch_all(&self.pool)
            .await
            .map_err(|e| StoreError::database_operation(T::table_name(), "execute_query", e))?;

        rows.into_iter().map(|row| self.decode(row)).collect()
    }

    async fn execute_count(
        &self,
        session: &Session,
        query: &QueryBuilder,
    ) -> Result<i64, StoreError> {
        query.validate()?;
        let query = query.restricted_by(self.mapping.active_predicate(session));
        let (where_clause, params) = self.where_clause(&query);
        let mut sql = format!("SELECT COUNT(*) FROM {} t", self.mapping.table());
        if !where_clause.is_empty() {
            sql.push(' ');
            sql.push_str(&where_clause);
        }
        crate::debug_log!(session = %session.id(), sql = %sql, "executing count");

        let mut sqlx_query = sqlx::query_scalar::<_, i64>(&sql);
        for param in params {
            sqlx_query = sqlx_query.bind(Json(param));
        }

        sqlx_query
            .fetch_one(&self.pool)
            .await
            .map_err(|e| StoreError::database_operation(T::table_name(), "execute_count", e))
    }

    async fn load_by_id(&self, _session: &Session, id: &T::Id) -> Result<Option<T>, StoreError> {
        let sql = self.by_id_sql();
        crate::trace_log!(sql = %sql, "loading by id");

        let row = sqlx::query_scalar::<_, Value>(&sql)
            .bind(Json(serde_json::to_value(id)?))
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| StoreError::database_operation(T::table_name(), "load_by_id", e))?;

        row.map(|row| self.decode(row)).transpose()
    }

    async fn contains(&self, _session: &Session, _record: &T) -> Result<bool, StoreError> {
        // Without an identity cache every record can be addressed directly
        Ok(true)
    }

    async fn merge(&self, session: &Session, record: &T) -> Result<T, StoreError> {
        let sql = self.upsert_sql();
        crate::debug_log!(session = %session.id(), sql = %sql, "merging record");

        let row = sqlx::query_scalar::<_, Value>(&sql)
            .bind(Json(self.mapping.to_row(serde_json::to_value(record)?)))
            .fetch_one(&self.pool)
            .await
            .map_err(|e| StoreError::database_operation(T::table_name(), "merge", e))?;

        self.decode(row)
    }

    async fn remove(&self, session: &Session, record: &T) -> Result<(), StoreError> {
        let sql = self.delete_sql();
        crate::debug_log!(session = %session.id(), sql = %sql, "removing record");

        sqlx::query(&sql)
            .bind(Json(serde_json::to_value(record.extract_id())?))
            .execute(&self.pool)
            .await
            .map_err(|e| StoreError::database_operation(T::table_name(), "remove", e))?;
        Ok(())
    }

    async fn flush(&self, session: &Session) -> Result<(), StoreError> {
        tracing::trace!(session = %session.id(), table = T::table_name(), "nothing to flush");
        Ok(())
    }
}
