//! Soft-delete predicate toggle
//!
//! While the `soft_delete` row filter of a [`Session`] is enabled, backends
//! append `<marker> IS NULL` to every query they run for soft-deletable
//! records. Privileged operations switch it off through [`FilterGuard`], which
//! puts the previous state back when dropped. That covers plain returns, `?`
//! propagation, panics and futures cancelled mid-operation.

use crate::errors::StoreError;
use crate::session::Session;

/// Name of the row filter shared by every soft-deletable record type
pub const SOFT_DELETE_FILTER: &str = "soft_delete";

/// The soft-delete switch of one session
#[derive(Debug, Clone, Copy)]
pub struct PredicateToggle<'s> {
    session: &'s Session,
}

impl<'s> PredicateToggle<'s> {
    pub(crate) fn new(session: &'s Session) -> Self {
        Self { session }
    }

    /// Install the restriction; a no-op if already enabled
    pub fn enable(&self) -> Result<(), StoreError> {
        self.session.enable_row_filter(SOFT_DELETE_FILTER)
    }

    /// Lift the restriction; a no-op if already disabled
    pub fn disable(&self) -> Result<(), StoreError> {
        self.session.disable_row_filter(SOFT_DELETE_FILTER)
    }

    pub fn is_enabled(&self) -> bool {
        self.session.is_row_filter_enabled(SOFT_DELETE_FILTER)
    }

    /// Disable the filter until the returned guard is dropped
    pub fn suspend(self) -> Result<FilterGuard<'s>, StoreError> {
        self.scoped(false)
    }

    /// Enable the filter until the returned guard is dropped
    pub fn enforce(self) -> Result<FilterGuard<'s>, StoreError> {
        self.scoped(true)
    }

    /// Best-effort enable used at repository entry points
    ///
    /// Failures are logged and dropped: a session without the filter simply
    /// runs unfiltered queries.
    pub fn reassert(&self) {
        if let Err(e) = self.enable() {
            tracing::trace!(
                session = %self.session.id(),
                error = %e,
                "soft delete filter not applicable to session"
            );
        }
    }

    fn scoped(self, enabled: bool) -> Result<FilterGuard<'s>, StoreError> {
        let previous = self.is_enabled();
        if enabled {
            self.enable()?;
        } else {
            self.disable()?;
        }
        Ok(FilterGuard {
            toggle: self,
            previous,
        })
    }
}

/// Restores the soft-delete filter to its previous state on drop
#[must_use = "the filter is restored as soon as the guard is dropped"]
#[derive(Debug)]
pub struct FilterGuard<'s> {
    toggle: PredicateToggle<'s>,
    previous: bool,
}

impl Drop for FilterGuard<'_> {
    fn drop(&mut self) {
        let restored = if self.previous {
            self.toggle.enable()
        } else {
            self.toggle.disable()
        };
        // Filter definitions are never removed, so a guard that was created
        // successfully can always restore.
        if let Err(e) = restored {
            tracing::error!(
                session = %self.toggle.session.id(),
                error = %e,
                "failed to restore soft delete filter"
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn privileged(session: &Session, fail: bool) -> Result<bool, StoreError> {
        let _guard = session.toggle().suspend()?;
        let seen = session.toggle().is_enabled();
        if fail {
            return Err(StoreError::Internal("boom".to_string()));
        }
        Ok(seen)
    }

    #[test]
    fn test_suspend_restores_on_drop() {
        let session = Session::new();
        {
            let _guard = session.toggle().suspend().unwrap();
            assert!(!session.toggle().is_enabled());
        }
        assert!(session.toggle().is_enabled());
    }

    #[test]
    fn test_suspend_restores_on_error_path() {
        let session = Session::new();

        assert!(!privileged(&session, false).unwrap());
        assert!(session.toggle().is_enabled());

        assert!(privileged(&session, true).is_err());
        assert!(session.toggle().is_enabled());
    }

    #[test]
    fn test_suspend_restores_on_panic() {
        let session = Session::new();
        let result = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
            let _guard = session.toggle().suspend().unwrap();
            panic!("backend exploded");
        }));
        assert!(result.is_err());
        assert!(session.toggle().is_enabled());
    }

    #[test]
    fn test_guard_restores_previous_state_not_default() {
        let session = Session::new();
        session.toggle().disable().unwrap();
        {
            let _guard = session.toggle().enforce().unwrap();
            assert!(session.toggle().is_enabled());
        }
        assert!(!session.toggle().is_enabled());
    }

    #[test]
    fn test_nested_guards_unwind_in_order() {
        let session = Session::new();
        {
            let _outer = session.toggle().suspend().unwrap();
            {
                let _inner = session.toggle().enforce().unwrap();
                assert!(session.toggle().is_enabled());
            }
            assert!(!session.toggle().is_enabled());
        }
        assert!(session.toggle().is_enabled());
    }

    #[test]
    fn test_guard_fails_without_filter_definition() {
        let session = Session::without_filters();
        let err = session.toggle().suspend().unwrap_err();
        assert!(err.is_filter_state());
        assert!(session.toggle().enforce().is_err());
    }

    #[test]
    fn test_reassert_swallows_missing_filter() {
        let session = Session::without_filters();
        session.toggle().reassert();
        assert!(!session.toggle().is_enabled());

        let session = Session::new();
        session.toggle().disable().unwrap();
        session.toggle().reassert();
        assert!(session.toggle().is_enabled());
    }
}
