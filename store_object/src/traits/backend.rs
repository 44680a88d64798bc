//! Trait definitions
//!
//! The storage engine seen by repositories.

use super::table_metadata::TableMetadata;
use crate::mapping::EntityMapping;
use crate::query_builder::QueryBuilder;
use crate::session::Session;
use crate::StoreError;
use async_trait::async_trait;

/// Storage engine for one record type
///
/// Query execution (`execute_query`, `execute_count`) honours the session's
/// soft-delete row filter. `load_by_id` is the by-key fast path and never
/// does; callers that need filtered single-record lookups must go through a
/// query.
#[async_trait]
pub trait StorageBackend<T: TableMetadata>: Send + Sync {
    /// Resolved table, key and marker column names
    fn mapping(&self) -> &EntityMapping;

    /// Run a query, restricted by the session's enabled row filters
    async fn execute_query(&self, session: &Session, query: &QueryBuilder)
        -> Result<Vec<T>, StoreError>;

    /// Count rows matching a query, restricted by the session's enabled row filters
    async fn execute_count(&self, session: &Session, query: &QueryBuilder)
        -> Result<i64, StoreError>;

    /// Fetch by primary key, bypassing row filters
    async fn load_by_id(&self, session: &Session, id: &T::Id) -> Result<Option<T>, StoreError>;

    /// Whether the record is attached to the session
    async fn contains(&self, session: &Session, record: &T) -> Result<bool, StoreError>;

    /// Attach the record's state to the session as an insert or update
    async fn merge(&self, session: &Session, record: &T) -> Result<T, StoreError>;

    /// Schedule removal of an attached record
    async fn remove(&self, session: &Session, record: &T) -> Result<(), StoreError>;

    /// Write pending changes through to storage
    async fn flush(&self, session: &Session) -> Result<(), StoreError>;
}
