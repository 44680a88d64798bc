//! Unit-of-work context
//!
//! A [`Session`] is handed to every repository call. It owns the row-filter
//! registry that backends consult when they execute queries, so filter state
//! never leaks between two units of work.
//!
//! A session is meant to be driven by one logical caller chain at a time.
//! It is `Send + Sync` so it can be held across `.await` points, but two tasks
//! interleaving operations on the same session can observe each other's
//! filter suspensions.

use crate::errors::StoreError;
use crate::toggle::{PredicateToggle, SOFT_DELETE_FILTER};
use std::collections::HashMap;
use std::sync::{Arc, RwLock, Weak};
use uuid::Uuid;

pub struct Session {
    id: Uuid,
    // filter name -> enabled
    filters: RwLock<HashMap<String, bool>>,
    // backends hold a weak handle and drop their per-session state once it dies
    alive: Arc<()>,
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("id", &self.id)
            .field("soft_delete_filter", &self.is_row_filter_enabled(SOFT_DELETE_FILTER))
            .finish()
    }
}

impl Session {
    /// Start a session with the soft-delete filter defined and enabled
    pub fn new() -> Self {
        let session = Self::without_filters();
        session.define_row_filter(SOFT_DELETE_FILTER, true);
        session
    }

    /// Start a session with no row filters defined
    pub fn without_filters() -> Self {
        Self {
            id: Uuid::new_v4(),
            filters: RwLock::new(HashMap::new()),
            alive: Arc::new(()),
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    /// Handle that stops upgrading once this session is dropped
    pub fn liveness(&self) -> Weak<()> {
        Arc::downgrade(&self.alive)
    }

    /// Register a row filter, replacing any previous state for the name
    pub fn define_row_filter(&self, name: &str, enabled: bool) {
        let mut filters = self.filters.write().unwrap_or_else(|e| e.into_inner());
        filters.insert(name.to_string(), enabled);
    }

    pub fn enable_row_filter(&self, name: &str) -> Result<(), StoreError> {
        self.set_row_filter(name, true)
    }

    pub fn disable_row_filter(&self, name: &str) -> Result<(), StoreError> {
        self.set_row_filter(name, false)
    }

    /// Undefined filters report as disabled
    pub fn is_row_filter_enabled(&self, name: &str) -> bool {
        let filters = self.filters.read().unwrap_or_else(|e| e.into_inner());
        filters.get(name).copied().unwrap_or(false)
    }

    /// The soft-delete switch of this session
    pub fn toggle(&self) -> PredicateToggle<'_> {
        PredicateToggle::new(self)
    }

    fn set_row_filter(&self, name: &str, enabled: bool) -> Result<(), StoreError> {
        let mut filters = self.filters.write().unwrap_or_else(|e| e.into_inner());
        let state = filters
            .get_mut(name)
            .ok_or_else(|| StoreError::FilterNotDefined(name.to_string()))?;
        if *state != enabled {
            *state = enabled;
            tracing::trace!(session = %self.id, filter = name, enabled, "row filter toggled");
        }
        Ok(())
    }
}

impl Default for Session {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_session_enables_soft_delete_filter() {
        let session = Session::new();
        assert!(session.is_row_filter_enabled(SOFT_DELETE_FILTER));
    }

    #[test]
    fn test_enable_and_disable_are_idempotent() {
        let session = Session::new();

        session.disable_row_filter(SOFT_DELETE_FILTER).unwrap();
        session.disable_row_filter(SOFT_DELETE_FILTER).unwrap();
        assert!(!session.is_row_filter_enabled(SOFT_DELETE_FILTER));

        session.enable_row_filter(SOFT_DELETE_FILTER).unwrap();
        session.enable_row_filter(SOFT_DELETE_FILTER).unwrap();
        assert!(session.is_row_filter_enabled(SOFT_DELETE_FILTER));
    }

    #[test]
    fn test_undefined_filter_fails_to_toggle() {
        let session = Session::without_filters();

        let err = session.enable_row_filter(SOFT_DELETE_FILTER).unwrap_err();
        assert!(err.is_filter_state());
        assert!(session.disable_row_filter("tenant").is_err());
        assert!(!session.is_row_filter_enabled(SOFT_DELETE_FILTER));
    }

    #[test]
    fn test_sessions_do_not_share_filter_state() {
        let first = Session::new();
        let second = Session::new();

        first.disable_row_filter(SOFT_DELETE_FILTER).unwrap();

        assert!(!first.is_row_filter_enabled(SOFT_DELETE_FILTER));
        assert!(second.is_row_filter_enabled(SOFT_DELETE_FILTER));
        assert_ne!(first.id(), second.id());
    }

    #[test]
    fn test_liveness_ends_with_session() {
        let session = Session::new();
        let handle = session.liveness();
        assert_eq!(handle.strong_count(), 1);

        drop(session);
        assert_eq!(handle.strong_count(), 0);
    }
}
