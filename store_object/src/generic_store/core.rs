use crate::errors::StoreError;
use crate::query_builder::{QueryBuilder, QueryFilter};
use crate::session::Session;
use crate::traits::{FromBackend, Repository, StorageBackend, TableMetadata};
use async_trait::async_trait;
use std::marker::PhantomData;
use std::sync::Arc;

/// Plain CRUD repository over a storage backend
///
/// Reads see whatever the backend returns for the session, and deletes remove
/// rows physically.
pub struct GenericStore<T, B> {
    pub(crate) backend: Arc<B>,
    _record: PhantomData<fn() -> T>,
}

impl<T, B> Clone for GenericStore<T, B> {
    fn clone(&self) -> Self {
        Self {
            backend: Arc::clone(&self.backend),
            _record: PhantomData,
        }
    }
}

impl<T: TableMetadata, B> std::fmt::Debug for GenericStore<T, B> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GenericStore")
            .field("table", &T::table_name())
            .finish_non_exhaustive()
    }
}

impl<T, B> GenericStore<T, B>
where
    T: TableMetadata,
    B: StorageBackend<T>,
{
    pub fn new(backend: Arc<B>) -> Self {
        Self {
            backend,
            _record: PhantomData,
        }
    }

    pub fn backend(&self) -> &Arc<B> {
        &self.backend
    }

    // The helpers below skip the repository entry hook. They are the building
    // blocks for stores that manage the soft-delete filter themselves.

    pub(crate) fn by_id_query(id: &T::Id) -> Result<QueryBuilder, StoreError> {
        Ok(QueryBuilder::new().filter(QueryFilter::eq(
            T::primary_key_field(),
            serde_json::to_value(id)?,
        )))
    }

    pub(crate) fn by_ids_query(ids: &[T::Id]) -> Result<QueryBuilder, StoreError> {
        let values = ids
            .iter()
            .map(serde_json::to_value)
            .collect::<Result<Vec<_>, _>>()?;
        Ok(QueryBuilder::new().filter(QueryFilter::in_values(T::primary_key_field(), values)))
    }

    pub(crate) async fn query(
        &self,
        session: &Session,
        query: &QueryBuilder,
    ) -> Result<Vec<T>, StoreError> {
        self.backend.execute_query(session, query).await
    }

    pub(crate) async fn count_matching(
        &self,
        session: &Session,
        query: &QueryBuilder,
    ) -> Result<i64, StoreError> {
        self.backend.execute_count(session, query).await
    }

    /// By-key fast path; not subject to row filters
    pub(crate) async fn load(&self, session: &Session, id: &T::Id) -> Result<Option<T>, StoreError> {
        self.backend.load_by_id(session, id).await
    }

    pub(crate) async fn persist(&self, session: &Session, record: &T) -> Result<T, StoreError> {
        let saved = self.backend.merge(session, record).await?;
        self.backend.flush(session).await?;
        Ok(saved)
    }

    /// Merge every record, then flush once
    pub(crate) async fn persist_all(
        &self,
        session: &Session,
        records: &[T],
    ) -> Result<Vec<T>, StoreError> {
        let mut saved = Vec::with_capacity(records.len());
        for record in records {
            saved.push(self.backend.merge(session, record).await?);
        }
        self.backend.flush(session).await?;
        Ok(saved)
    }

    /// Schedule removal, attaching the record to the session first if needed
    pub(crate) async fn detach_and_remove(
        &self,
        session: &Session,
        record: &T,
    ) -> Result<(), StoreError> {
        if self.backend.contains(session, record).await? {
            self.backend.remove(session, record).await
        } else {
            let attached = self.backend.merge(session, record).await?;
            self.backend.remove(session, &attached).await
        }
    }

    pub(crate) async fn flush(&self, session: &Session) -> Result<(), StoreError> {
        self.backend.flush(session).await
    }
}

impl<T, B> FromBackend<T, B> for GenericStore<T, B>
where
    T: TableMetadata,
    B: StorageBackend<T>,
{
    fn from_backend(backend: Arc<B>) -> Self {
        Self::new(backend)
    }
}

#[async_trait]
impl<T, B> Repository<T> for GenericStore<T, B>
where
    T: TableMetadata,
    B: StorageBackend<T> + 'static,
{
    async fn save(&self, session: &Session, record: T) -> Result<T, StoreError> {
        session.toggle().reassert();
        self.persist(session, &record).await
    }

    async fn save_all(&self, session: &Session, records: Vec<T>) -> Result<Vec<T>, StoreError> {
        session.toggle().reassert();
        self.persist_all(session, &records).await
    }

    async fn find_all(&self, session: &Session) -> Result<Vec<T>, StoreError> {
        session.toggle().reassert();
        self.query(session, &QueryBuilder::new()).await
    }

    async fn find_all_by_id(
        &self,
        session: &Session,
        ids: &[T::Id],
    ) -> Result<Vec<T>, StoreError> {
        session.toggle().reassert();
        self.query(session, &Self::by_ids_query(ids)?).await
    }

    async fn find_by_id(&self, session: &Session, id: &T::Id) -> Result<Option<T>, StoreError> {
        session.toggle().reassert();
        self.load(session, id).await
    }

    async fn exists_by_id(&self, session: &Session, id: &T::Id) -> Result<bool, StoreError> {
        session.toggle().reassert();
        Ok(self.load(session, id).await?.is_some())
    }

    async fn count(&self, session: &Session) -> Result<i64, StoreError> {
        session.toggle().reassert();
        self.count_matching(session, &QueryBuilder::new()).await
    }

    async fn find_by(&self, session: &Session, query: QueryBuilder) -> Result<Vec<T>, StoreError> {
        session.toggle().reassert();
        self.query(session, &query).await
    }

    async fn count_by(&self, session: &Session, query: QueryBuilder) -> Result<i64, StoreError> {
        session.toggle().reassert();
        self.count_matching(session, &query).await
    }

    async fn exists_by(&self, session: &Session, query: QueryBuilder) -> Result<bool, StoreError> {
        session.toggle().reassert();
        Ok(self.count_matching(session, &query).await? > 0)
    }

    async fn delete(&self, session: &Session, record: &mut T) -> Result<(), StoreError> {
        session.toggle().reassert();
        self.detach_and_remove(session, record).await?;
        self.flush(session).await
    }

    async fn delete_by_id(&self, session: &Session, id: &T::Id) -> Result<(), StoreError> {
        session.toggle().reassert();
        if let Some(record) = self.load(session, id).await? {
            self.detach_and_remove(session, &record).await?;
            self.flush(session).await?;
        }
        Ok(())
    }

    async fn delete_all_of(&self, session: &Session, records: &mut [T]) -> Result<(), StoreError> {
        session.toggle().reassert();
        for record in records.iter() {
            self.detach_and_remove(session, record).await?;
        }
        self.flush(session).await
    }

    async fn delete_all(&self, session: &Session) -> Result<(), StoreError> {
        session.toggle().reassert();
        for record in self.query(session, &QueryBuilder::new()).await? {
            self.detach_and_remove(session, &record).await?;
        }
        self.flush(session).await
    }
}
