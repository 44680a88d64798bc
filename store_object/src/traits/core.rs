//! Trait definitions
//!
//! This module defines the standard repository surface.

use super::table_metadata::TableMetadata;
use crate::query_builder::QueryBuilder;
use crate::session::Session;
use crate::StoreError;
use async_trait::async_trait;

/// Standard CRUD operations for a record type
///
/// Every operation runs inside the caller's [`Session`]. Lookups model absence
/// as `None` or an empty list, never as an error.
#[async_trait]
pub trait Repository<T: TableMetadata>: Send + Sync {
    /// Insert or update a record and flush
    async fn save(&self, session: &Session, record: T) -> Result<T, StoreError>;

    /// Insert or update several records with a single flush
    async fn save_all(&self, session: &Session, records: Vec<T>) -> Result<Vec<T>, StoreError>;

    /// List all records of this type
    async fn find_all(&self, session: &Session) -> Result<Vec<T>, StoreError>;

    /// List the records with the given ids
    async fn find_all_by_id(&self, session: &Session, ids: &[T::Id])
        -> Result<Vec<T>, StoreError>;

    /// Get a record by its ID
    async fn find_by_id(&self, session: &Session, id: &T::Id) -> Result<Option<T>, StoreError>;

    async fn exists_by_id(&self, session: &Session, id: &T::Id) -> Result<bool, StoreError>;

    /// Count total records of this type
    async fn count(&self, session: &Session) -> Result<i64, StoreError>;

    /// Find records matching query conditions, in the query's order
    async fn find_by(&self, session: &Session, query: QueryBuilder) -> Result<Vec<T>, StoreError>;

    /// Count records matching query conditions
    async fn count_by(&self, session: &Session, query: QueryBuilder) -> Result<i64, StoreError>;

    async fn exists_by(&self, session: &Session, query: QueryBuilder) -> Result<bool, StoreError>;

    async fn delete(&self, session: &Session, record: &mut T) -> Result<(), StoreError>;

    async fn delete_by_id(&self, session: &Session, id: &T::Id) -> Result<(), StoreError>;

    async fn delete_all_of(&self, session: &Session, records: &mut [T]) -> Result<(), StoreError>;

    /// Delete every record this repository can see
    async fn delete_all(&self, session: &Session) -> Result<(), StoreError>;
}
