//! Soft-delete repository decorator
//!
//! [`SoftDeleteStore`] wraps a [`GenericStore`] and owns the soft-delete
//! filter of the sessions it is called with. Standard reads run with the
//! filter enforced, deletes only set the marker, and the `*_with_trashed`,
//! `*_trashed`, restore and force-delete operations suspend the filter for
//! exactly their own duration.
//!
//! Every public operation leaves the filter in the state it had right after
//! the entry hook, whichever way the operation ends. Internal steps call the
//! wrapped store's unhooked helpers so the hook can never re-enable the filter
//! inside a suspension.

use super::core::GenericStore;
use crate::errors::StoreError;
use crate::id_type::HasUniversalId;
use crate::query_builder::{QueryBuilder, QueryFilter};
use crate::session::Session;
use crate::traits::{
    FromBackend, Repository, SoftDeletable, SoftDeleteRepository, StorageBackend, TableMetadata,
};
use async_trait::async_trait;
use chrono::Utc;
use std::sync::Arc;

pub struct SoftDeleteStore<T, B> {
    inner: GenericStore<T, B>,
}

impl<T, B> Clone for SoftDeleteStore<T, B> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
        }
    }
}

impl<T: TableMetadata, B> std::fmt::Debug for SoftDeleteStore<T, B> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SoftDeleteStore")
            .field("table", &T::table_name())
            .finish_non_exhaustive()
    }
}

impl<T, B> SoftDeleteStore<T, B>
where
    T: TableMetadata + SoftDeletable,
    B: StorageBackend<T>,
{
    pub fn new(backend: Arc<B>) -> Self {
        Self::wrap(GenericStore::new(backend))
    }

    pub fn wrap(inner: GenericStore<T, B>) -> Self {
        Self { inner }
    }

    pub fn backend(&self) -> &Arc<B> {
        self.inner.backend()
    }

    fn marker_column(&self, operation: &'static str) -> Result<&str, StoreError> {
        self.inner
            .backend
            .mapping()
            .marker_column()
            .ok_or_else(|| {
                StoreError::backend(T::table_name(), operation, "no soft delete column is mapped")
            })
    }

    fn trashed_query(&self, operation: &'static str) -> Result<QueryBuilder, StoreError> {
        Ok(QueryBuilder::new().filter(QueryFilter::is_not_null(self.marker_column(operation)?)))
    }

    async fn find_visible(&self, session: &Session, id: &T::Id) -> Result<Option<T>, StoreError> {
        let _guard = session.toggle().enforce()?;
        let query = GenericStore::<T, B>::by_id_query(id)?;
        Ok(self.inner.query(session, &query).await?.into_iter().next())
    }

    async fn mark(&self, session: &Session, record: &mut T) -> Result<(), StoreError> {
        record.set_deleted_at(Some(Utc::now()));
        *record = self.inner.persist(session, record).await?;
        tracing::debug!(
            table = T::table_name(),
            id = %record.extract_id().universal_id(),
            "record soft deleted"
        );
        Ok(())
    }

    async fn mark_by_id(&self, session: &Session, id: &T::Id) -> Result<(), StoreError> {
        let _guard = session.toggle().suspend()?;
        if let Some(mut record) = self.inner.load(session, id).await? {
            self.mark(session, &mut record).await?;
        }
        Ok(())
    }

    async fn unmark(&self, session: &Session, record: &mut T) -> Result<(), StoreError> {
        record.set_deleted_at(None);
        *record = self.inner.persist(session, record).await?;
        tracing::debug!(
            table = T::table_name(),
            id = %record.extract_id().universal_id(),
            "record restored"
        );
        Ok(())
    }

    async fn load_with_trashed(
        &self,
        session: &Session,
        id: &T::Id,
    ) -> Result<Option<T>, StoreError> {
        let _guard = session.toggle().suspend()?;
        self.inner.load(session, id).await
    }

    async fn purge(&self, session: &Session, record: &T) -> Result<(), StoreError> {
        self.inner.detach_and_remove(session, record).await?;
        self.inner.flush(session).await?;
        tracing::debug!(
            table = T::table_name(),
            id = %record.extract_id().universal_id(),
            "record permanently deleted"
        );
        Ok(())
    }
}

impl<T, B> FromBackend<T, B> for SoftDeleteStore<T, B>
where
    T: TableMetadata + SoftDeletable,
    B: StorageBackend<T>,
{
    fn from_backend(backend: Arc<B>) -> Self {
        Self::new(backend)
    }
}

#[async_trait]
impl<T, B> Repository<T> for SoftDeleteStore<T, B>
where
    T: TableMetadata + SoftDeletable,
    B: StorageBackend<T> + 'static,
{
    async fn save(&self, session: &Session, record: T) -> Result<T, StoreError> {
        session.toggle().reassert();
        self.inner.persist(session, &record).await
    }

    async fn save_all(&self, session: &Session, records: Vec<T>) -> Result<Vec<T>, StoreError> {
        session.toggle().reassert();
        self.inner.persist_all(session, &records).await
    }

    async fn find_all(&self, session: &Session) -> Result<Vec<T>, StoreError> {
        session.toggle().reassert();
        let _guard = session.toggle().enforce()?;
        self.inner.query(session, &QueryBuilder::new()).await
    }

    async fn find_all_by_id(
        &self,
        session: &Session,
        ids: &[T::Id],
    ) -> Result<Vec<T>, StoreError> {
        session.toggle().reassert();
        let _guard = session.toggle().enforce()?;
        let query = GenericStore::<T, B>::by_ids_query(ids)?;
        self.inner.query(session, &query).await
    }

    /// Runs as a query so trashed records cached in the session stay hidden
    async fn find_by_id(&self, session: &Session, id: &T::Id) -> Result<Option<T>, StoreError> {
        session.toggle().reassert();
        self.find_visible(session, id).await
    }

    async fn exists_by_id(&self, session: &Session, id: &T::Id) -> Result<bool, StoreError> {
        session.toggle().reassert();
        Ok(self.find_visible(session, id).await?.is_some())
    }

    async fn count(&self, session: &Session) -> Result<i64, StoreError> {
        session.toggle().reassert();
        let _guard = session.toggle().enforce()?;
        self.inner.count_matching(session, &QueryBuilder::new()).await
    }

    async fn find_by(&self, session: &Session, query: QueryBuilder) -> Result<Vec<T>, StoreError> {
        session.toggle().reassert();
        let _guard = session.toggle().enforce()?;
        self.inner.query(session, &query).await
    }

    async fn count_by(&self, session: &Session, query: QueryBuilder) -> Result<i64, StoreError> {
        session.toggle().reassert();
        let _guard = session.toggle().enforce()?;
        self.inner.count_matching(session, &query).await
    }

    async fn exists_by(&self, session: &Session, query: QueryBuilder) -> Result<bool, StoreError> {
        session.toggle().reassert();
        let _guard = session.toggle().enforce()?;
        Ok(self.inner.count_matching(session, &query).await? > 0)
    }

    async fn delete(&self, session: &Session, record: &mut T) -> Result<(), StoreError> {
        session.toggle().reassert();
        self.mark(session, record).await
    }

    async fn delete_by_id(&self, session: &Session, id: &T::Id) -> Result<(), StoreError> {
        session.toggle().reassert();
        self.mark_by_id(session, id).await
    }

    async fn delete_all_of(&self, session: &Session, records: &mut [T]) -> Result<(), StoreError> {
        session.toggle().reassert();
        for record in records.iter_mut() {
            self.mark(session, record).await?;
        }
        Ok(())
    }

    async fn delete_all(&self, session: &Session) -> Result<(), StoreError> {
        session.toggle().reassert();
        let visible = {
            let _guard = session.toggle().enforce()?;
            self.inner.query(session, &QueryBuilder::new()).await?
        };
        for mut record in visible {
            self.mark(session, &mut record).await?;
        }
        Ok(())
    }
}

#[async_trait]
impl<T, B> SoftDeleteRepository<T> for SoftDeleteStore<T, B>
where
    T: TableMetadata + SoftDeletable,
    B: StorageBackend<T> + 'static,
{
    async fn soft_delete(&self, session: &Session, record: &mut T) -> Result<(), StoreError> {
        session.toggle().reassert();
        self.mark(session, record).await
    }

    async fn soft_delete_by_id(&self, session: &Session, id: &T::Id) -> Result<(), StoreError> {
        session.toggle().reassert();
        self.mark_by_id(session, id).await
    }

    async fn restore(&self, session: &Session, record: &mut T) -> Result<(), StoreError> {
        session.toggle().reassert();
        self.unmark(session, record).await
    }

    async fn restore_by_id(&self, session: &Session, id: &T::Id) -> Result<(), StoreError> {
        session.toggle().reassert();
        match self.load_with_trashed(session, id).await? {
            Some(mut record) => self.unmark(session, &mut record).await,
            None => Ok(()),
        }
    }

    async fn force_delete(&self, session: &Session, record: &T) -> Result<(), StoreError> {
        session.toggle().reassert();
        let _guard = session.toggle().suspend()?;
        self.purge(session, record).await
    }

    async fn force_delete_by_id(&self, session: &Session, id: &T::Id) -> Result<(), StoreError> {
        session.toggle().reassert();
        let _guard = session.toggle().suspend()?;
        match self.inner.load(session, id).await? {
            Some(record) => self.purge(session, &record).await,
            None => Ok(()),
        }
    }

    async fn find_all_with_trashed(&self, session: &Session) -> Result<Vec<T>, StoreError> {
        session.toggle().reassert();
        let _guard = session.toggle().suspend()?;
        self.inner.query(session, &QueryBuilder::new()).await
    }

    async fn find_by_id_with_trashed(
        &self,
        session: &Session,
        id: &T::Id,
    ) -> Result<Option<T>, StoreError> {
        session.toggle().reassert();
        self.load_with_trashed(session, id).await
    }

    async fn find_all_trashed(&self, session: &Session) -> Result<Vec<T>, StoreError> {
        session.toggle().reassert();
        let query = self.trashed_query("find_all_trashed")?;
        let _guard = session.toggle().suspend()?;
        self.inner.query(session, &query).await
    }

    async fn count_with_trashed(&self, session: &Session) -> Result<i64, StoreError> {
        session.toggle().reassert();
        let _guard = session.toggle().suspend()?;
        self.inner.count_matching(session, &QueryBuilder::new()).await
    }

    async fn count_trashed(&self, session: &Session) -> Result<i64, StoreError> {
        session.toggle().reassert();
        let query = self.trashed_query("count_trashed")?;
        let _guard = session.toggle().suspend()?;
        self.inner.count_matching(session, &query).await
    }
}
