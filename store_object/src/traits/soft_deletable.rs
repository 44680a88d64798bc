//! Trait definitions
//!
//! The deletion-marker contract and the repository surface built on it.

use super::core::Repository;
use super::table_metadata::TableMetadata;
use crate::session::Session;
use crate::StoreError;
use async_trait::async_trait;
use chrono::{DateTime, Utc};

/// A record carrying a nullable deletion marker
///
/// `None` means the record is active, `Some` means it is trashed.
pub trait SoftDeletable {
    fn deleted_at(&self) -> Option<DateTime<Utc>>;

    fn set_deleted_at(&mut self, deleted_at: Option<DateTime<Utc>>);

    /// Returns `true` if this record has been soft-deleted
    fn is_deleted(&self) -> bool {
        self.deleted_at().is_some()
    }
}

/// Repository with soft-delete, restore, force-delete and trashed scopes
///
/// The standard [`Repository`] operations of an implementor hide trashed
/// records and turn deletes into soft deletes.
#[async_trait]
pub trait SoftDeleteRepository<T>: Repository<T>
where
    T: TableMetadata + SoftDeletable,
{
    /// Set the marker to now, persist and flush
    async fn soft_delete(&self, session: &Session, record: &mut T) -> Result<(), StoreError>;

    /// Soft-delete the record with the given id, trashed or not; absent ids are ignored
    async fn soft_delete_by_id(&self, session: &Session, id: &T::Id) -> Result<(), StoreError>;

    /// Clear the marker, persist and flush
    async fn restore(&self, session: &Session, record: &mut T) -> Result<(), StoreError>;

    /// Restore the record with the given id; absent ids are ignored
    async fn restore_by_id(&self, session: &Session, id: &T::Id) -> Result<(), StoreError>;

    /// Permanently remove the record
    async fn force_delete(&self, session: &Session, record: &T) -> Result<(), StoreError>;

    /// Permanently remove the record with the given id; absent ids are ignored
    async fn force_delete_by_id(&self, session: &Session, id: &T::Id) -> Result<(), StoreError>;

    /// All records, active and trashed
    async fn find_all_with_trashed(&self, session: &Session) -> Result<Vec<T>, StoreError>;

    /// Look a record up by id whether or not it is trashed
    async fn find_by_id_with_trashed(
        &self,
        session: &Session,
        id: &T::Id,
    ) -> Result<Option<T>, StoreError>;

    /// Only trashed records
    async fn find_all_trashed(&self, session: &Session) -> Result<Vec<T>, StoreError>;

    /// Count of all records, active and trashed
    async fn count_with_trashed(&self, session: &Session) -> Result<i64, StoreError>;

    /// Count of trashed records
    async fn count_trashed(&self, session: &Session) -> Result<i64, StoreError>;
}
