//! In-process storage backend
//!
//! Keeps committed rows in insertion order and gives every [`Session`] its
//! own unit-of-work state:
//!
//! * an identity cache, filled by lookups and merges, which `load_by_id`
//!   consults before the committed rows,
//! * a queue of pending writes that only reaches the committed rows on
//!   `flush`.
//!
//! That state lives as long as the session does. Entries of dropped sessions,
//! unflushed writes included, are swept the next time the backend takes its
//! session lock.
//!
//! Queries always read committed rows and evaluate filters against the
//! serialized form of each record.

use crate::errors::StoreError;
use crate::id_type::{HasUniversalId, UniversalId};
use crate::mapping::EntityMapping;
use crate::query_builder::QueryBuilder;
use crate::session::Session;
use crate::traits::{StorageBackend, TableMetadata};
use async_trait::async_trait;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard, RwLock, Weak};
use uuid::Uuid;

enum PendingWrite<T> {
    Upsert(T),
    Remove(UniversalId),
}

struct SessionCache<T> {
    owner: Weak<()>,
    identity: HashMap<UniversalId, T>,
    pending: Vec<PendingWrite<T>>,
}

impl<T> SessionCache<T> {
    fn new(session: &Session) -> Self {
        Self {
            owner: session.liveness(),
            identity: HashMap::new(),
            pending: Vec::new(),
        }
    }
}

pub struct MemoryBackend<T: TableMetadata> {
    mapping: EntityMapping,
    rows: RwLock<Vec<(UniversalId, T)>>,
    sessions: Mutex<HashMap<Uuid, SessionCache<T>>>,
}

impl<T: TableMetadata> std::fmt::Debug for MemoryBackend<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MemoryBackend")
            .field("mapping", &self.mapping)
            .finish_non_exhaustive()
    }
}

impl<T: TableMetadata> MemoryBackend<T> {
    pub fn new(mapping: EntityMapping) -> Self {
        Self {
            mapping,
            rows: RwLock::new(Vec::new()),
            sessions: Mutex::new(HashMap::new()),
        }
    }

    /// Snapshot of the committed rows, ignoring any session state
    pub fn stored_rows(&self) -> Result<Vec<T>, StoreError> {
        let rows = self.rows.read().map_err(|_| Self::poisoned("stored_rows"))?;
        Ok(rows.iter().map(|(_, record)| record.clone()).collect())
    }

    /// Drop the session's identity cache and any unflushed writes
    pub fn detach_all(&self, session: &Session) -> Result<(), StoreError> {
        self.sessions_lock("detach_all")?.remove(&session.id());
        Ok(())
    }

    fn poisoned(operation: &'static str) -> StoreError {
        StoreError::Internal(format!(
            "{} lock poisoned during {}",
            T::table_name(),
            operation
        ))
    }

    /// Number of sessions holding cached state, after sweeping dropped ones
    pub fn attached_sessions(&self) -> Result<usize, StoreError> {
        Ok(self.sessions_lock("attached_sessions")?.len())
    }

    fn sessions_lock(
        &self,
        operation: &'static str,
    ) -> Result<MutexGuard<'_, HashMap<Uuid, SessionCache<T>>>, StoreError> {
        let mut sessions = self.sessions.lock().map_err(|_| Self::poisoned(operation))?;
        sessions.retain(|_, cache| cache.owner.strong_count() > 0);
        Ok(sessions)
    }

    /// Committed rows passing the query and the session's row filters, sorted
    fn select(
        &self,
        session: &Session,
        query: &QueryBuilder,
    ) -> Result<Vec<(UniversalId, T)>, StoreError> {
        query.validate()?;
        let query = query.restricted_by(self.mapping.active_predicate(session));
        let rows = self.rows.read().map_err(|_| Self::poisoned("select"))?;

        let mut selected: Vec<(UniversalId, T, Value)> = Vec::new();
        for (id, record) in rows.iter() {
            let row = self.mapping.to_row(serde_json::to_value(record)?);
            if query.matches(&row) {
                selected.push((id.clone(), record.clone(), row));
            }
        }
        selected.sort_by(|(_, _, left), (_, _, right)| query.compare_rows(left, right));

        Ok(selected
            .into_iter()
            .map(|(id, record, _)| (id, record))
            .collect())
    }
}

#[async_trait]
impl<T: TableMetadata> StorageBackend<T> for MemoryBackend<T> {
    fn mapping(&self) -> &EntityMapping {
        &self.mapping
    }

    async fn execute_query(
        &self,
        session: &Session,
        query: &QueryBuilder,
    ) -> Result<Vec<T>, StoreError> {
        let selected = self.select(session, query)?;

        // Records already attached to the session win over committed state
        let mut sessions = self.sessions_lock("execute_query")?;
        let cache = sessions
            .entry(session.id())
            .or_insert_with(|| SessionCache::new(session));
        Ok(selected
            .into_iter()
            .map(|(id, record)| cache.identity.entry(id).or_insert(record).clone())
            .collect())
    }

    async fn execute_count(
        &self,
        session: &Session,
        query: &QueryBuilder,
    ) -> Result<i64, StoreError> {
        Ok(self.select(session, query)?.len() as i64)
    }

    async fn load_by_id(&self, session: &Session, id: &T::Id) -> Result<Option<T>, StoreError> {
        let key = id.universal_id();

        if let Some(cached) = self
            .sessions_lock("load_by_id")?
            .get(&session.id())
            .and_then(|cache| cache.identity.get(&key))
        {
            return Ok(Some(cached.clone()));
        }

        let committed = {
            let rows = self.rows.read().map_err(|_| Self::poisoned("load_by_id"))?;
            rows.iter()
                .find(|(row_id, _)| *row_id == key)
                .map(|(_, record)| record.clone())
        };

        let Some(record) = committed else {
            return Ok(None);
        };
        let mut sessions = self.sessions_lock("load_by_id")?;
        let cache = sessions
            .entry(session.id())
            .or_insert_with(|| SessionCache::new(session));
        Ok(Some(cache.identity.entry(key).or_insert(record).clone()))
    }

    async fn contains(&self, session: &Session, record: &T) -> Result<bool, StoreError> {
        let key = record.extract_id().universal_id();
        Ok(self
            .sessions_lock("contains")?
            .get(&session.id())
            .is_some_and(|cache| cache.identity.contains_key(&key)))
    }

    async fn merge(&self, session: &Session, record: &T) -> Result<T, StoreError> {
        let key = record.extract_id().universal_id();
        let mut sessions = self.sessions_lock("merge")?;
        let cache = sessions
            .entry(session.id())
            .or_insert_with(|| SessionCache::new(session));

        cache.identity.insert(key, record.clone());
        cache.pending.push(PendingWrite::Upsert(record.clone()));
        Ok(record.clone())
    }

    async fn remove(&self, session: &Session, record: &T) -> Result<(), StoreError> {
        let key = record.extract_id().universal_id();
        let mut sessions = self.sessions_lock("remove")?;
        let cache = sessions
            .entry(session.id())
            .or_insert_with(|| SessionCache::new(session));

        if cache.identity.remove(&key).is_none() {
            return Err(StoreError::Detached {
                table: T::table_name(),
                id: key.to_string(),
            });
        }
        cache.pending.push(PendingWrite::Remove(key));
        Ok(())
    }

    async fn flush(&self, session: &Session) -> Result<(), StoreError> {
        let pending = match self.sessions_lock("flush")?.get_mut(&session.id()) {
            Some(cache) => std::mem::take(&mut cache.pending),
            None => return Ok(()),
        };
        if pending.is_empty() {
            return Ok(());
        }

        crate::trace_log!(session = %session.id(), table = T::table_name(), writes = pending.len(), "flushing");
        let mut rows = self.rows.write().map_err(|_| Self::poisoned("flush"))?;
        for write in pending {
            match write {
                PendingWrite::Upsert(record) => {
                    let key = record.extract_id().universal_id();
                    match rows.iter_mut().find(|(row_id, _)| *row_id == key) {
                        Some((_, existing)) => *existing = record,
                        None => rows.push((key, record)),
                    }
                }
                PendingWrite::Remove(key) => rows.retain(|(row_id, _)| *row_id != key),
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::query_builder::{QueryFilter, SortOrder};
    use config::SoftDeleteConfig;
    use serde::{Deserialize, Serialize};
    use serde_json::json;

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    struct Memo {
        id: i64,
        body: String,
        deleted_at: Option<chrono::DateTime<chrono::Utc>>,
    }

    impl TableMetadata for Memo {
        type Id = i64;

        fn table_name() -> &'static str {
            "memos"
        }

        fn primary_key_field() -> &'static str {
            "id"
        }

        fn columns() -> Vec<&'static str> {
            vec!["id", "body", "deleted_at"]
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

    fn memo(id: i64, body: &str) -> Memo {
        Memo {
            id,
            body: body.to_string(),
            deleted_at: None,
        }
    }

    fn backend() -> MemoryBackend<Memo> {
        MemoryBackend::new(EntityMapping::resolve::<Memo>(&SoftDeleteConfig::default()).unwrap())
    }

    async fn seed(backend: &MemoryBackend<Memo>, records: Vec<Memo>) {
        let session = Session::new();
        for record in &records {
            backend.merge(&session, record).await.unwrap();
        }
        backend.flush(&session).await.unwrap();
    }

    #[tokio::test]
    async fn test_writes_wait_for_flush() {
        let backend = backend();
        let session = Session::new();

        backend.merge(&session, &memo(1, "a")).await.unwrap();
        assert!(backend.stored_rows().unwrap().is_empty());
        assert!(backend.contains(&session, &memo(1, "a")).await.unwrap());

        backend.flush(&session).await.unwrap();
        assert_eq!(backend.stored_rows().unwrap(), vec![memo(1, "a")]);
    }

    #[tokio::test]
    async fn test_query_applies_session_filter() {
        let backend = backend();
        let mut trashed = memo(2, "b");
        trashed.deleted_at = Some(chrono::Utc::now());
        seed(&backend, vec![memo(1, "a"), trashed]).await;

        let session = Session::new();
        let all = QueryBuilder::new();

        assert_eq!(backend.execute_count(&session, &all).await.unwrap(), 1);
        session.toggle().disable().unwrap();
        assert_eq!(backend.execute_count(&session, &all).await.unwrap(), 2);

        // Sessions without the filter definition see everything
        let bare = Session::without_filters();
        assert_eq!(backend.execute_query(&bare, &all).await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_load_by_id_ignores_filter() {
        let backend = backend();
        let mut trashed = memo(2, "b");
        trashed.deleted_at = Some(chrono::Utc::now());
        seed(&backend, vec![trashed.clone()]).await;

        let session = Session::new();
        assert!(session.toggle().is_enabled());
        assert_eq!(backend.load_by_id(&session, &2).await.unwrap(), Some(trashed));
        assert!(backend.load_by_id(&session, &3).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_identity_cache_serves_fast_path() {
        let backend = backend();
        seed(&backend, vec![memo(1, "committed")]).await;

        let session = Session::new();
        let mut edited = backend.load_by_id(&session, &1).await.unwrap().unwrap();
        edited.body = "unflushed".to_string();
        backend.merge(&session, &edited).await.unwrap();

        let cached = backend.load_by_id(&session, &1).await.unwrap().unwrap();
        assert_eq!(cached.body, "unflushed");

        // Queries read committed rows but hand back the attached instance
        let queried = backend
            .execute_query(&session, &QueryBuilder::new())
            .await
            .unwrap();
        assert_eq!(queried[0].body, "unflushed");

        let other = Session::new();
        let fresh = backend.load_by_id(&other, &1).await.unwrap().unwrap();
        assert_eq!(fresh.body, "committed");

        backend.detach_all(&session).unwrap();
        assert!(!backend.contains(&session, &edited).await.unwrap());
    }

    #[tokio::test]
    async fn test_dropped_sessions_release_their_state() {
        let backend = backend();
        seed(&backend, vec![memo(1, "a")]).await;

        for _ in 0..100 {
            let session = Session::new();
            backend
                .execute_query(&session, &QueryBuilder::new())
                .await
                .unwrap();
            backend.merge(&session, &memo(2, "never flushed")).await.unwrap();
        }

        let live = Session::new();
        backend.load_by_id(&live, &1).await.unwrap();
        assert_eq!(backend.attached_sessions().unwrap(), 1);

        drop(live);
        assert_eq!(backend.attached_sessions().unwrap(), 0);
        // Unflushed writes of a dropped session are discarded
        assert_eq!(backend.stored_rows().unwrap(), vec![memo(1, "a")]);
    }

    #[tokio::test]
    async fn test_remove_requires_attached_record() {
        let backend = backend();
        seed(&backend, vec![memo(1, "a")]).await;

        let session = Session::new();
        let err = backend.remove(&session, &memo(1, "a")).await.unwrap_err();
        assert!(matches!(err, StoreError::Detached { table: "memos", .. }));

        let attached = backend.load_by_id(&session, &1).await.unwrap().unwrap();
        backend.remove(&session, &attached).await.unwrap();
        assert_eq!(backend.stored_rows().unwrap().len(), 1);

        backend.flush(&session).await.unwrap();
        assert!(backend.stored_rows().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_query_filters_and_ordering() {
        let backend = backend();
        seed(&backend, vec![memo(1, "beta"), memo(2, "alpha"), memo(3, "gamma")]).await;

        let session = Session::new();
        let query = QueryBuilder::new()
            .filter(QueryFilter::in_values("id", vec![json!(1), json!(2)]))
            .order_by("body", SortOrder::Asc);

        let found = backend.execute_query(&session, &query).await.unwrap();
        let bodies: Vec<&str> = found.iter().map(|m| m.body.as_str()).collect();
        assert_eq!(bodies, vec!["alpha", "beta"]);
    }

    #[tokio::test]
    async fn test_query_rejects_unsafe_column_names() {
        let backend = backend();
        let session = Session::new();
        let query = QueryBuilder::new().order_by("body; DROP TABLE memos", SortOrder::Asc);

        let err = backend.execute_query(&session, &query).await.unwrap_err();
        assert!(matches!(err, StoreError::Validation(_)));
    }

    #[tokio::test]
    async fn test_flush_keeps_insertion_order_on_update() {
        let backend = backend();
        seed(&backend, vec![memo(1, "a"), memo(2, "b")]).await;
        seed(&backend, vec![memo(1, "a2")]).await;

        let ids: Vec<i64> = backend.stored_rows().unwrap().iter().map(|m| m.id).collect();
        assert_eq!(ids, vec![1, 2]);
        assert_eq!(backend.stored_rows().unwrap()[0].body, "a2");
    }
}
