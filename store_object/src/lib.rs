//! Store Object - core persistence layer for softhaus
//!
//! Record metadata, the unit-of-work [`Session`] with its soft-delete filter,
//! storage backends, and the repositories built on top of them.

/// Conditional debug logging macros
/// These macros only compile in code when the `debug-logging` feature is enabled
#[cfg(feature = "debug-logging")]
#[macro_export]
macro_rules! debug_log {
    ($($arg:tt)*) => {
        tracing::debug!($($arg)*)
    };
}

#[cfg(not(feature = "debug-logging"))]
#[macro_export]
macro_rules! debug_log {
    ($($arg:tt)*) => {};
}

#[cfg(feature = "debug-logging")]
#[macro_export]
macro_rules! trace_log {
    ($($arg:tt)*) => {
        tracing::trace!($($arg)*)
    };
}

#[cfg(not(feature = "debug-logging"))]
#[macro_export]
macro_rules! trace_log {
    ($($arg:tt)*) => {};
}

pub mod backend;
pub mod errors;
pub mod generic_store;
pub mod id_type;
pub mod mapping;
pub mod prelude;
pub mod query_builder;
pub mod session;
pub mod toggle;
pub mod traits;
pub mod validation;

pub use backend::{MemoryBackend, PgBackend};
pub use errors::StoreError;
pub use generic_store::{GenericStore, RepositoryFactory, SoftDeleteStore};
pub use id_type::{HasUniversalId, UniversalId};
pub use mapping::EntityMapping;
pub use query_builder::{QueryBuilder, QueryFilter, QueryOperator, SortOrder};
pub use session::Session;
pub use toggle::{FilterGuard, PredicateToggle, SOFT_DELETE_FILTER};
pub use traits::*;
pub use validation::{ValidatedFieldName, ValidatedTableName, ValidationError};

// Used by code generated in table_derive
pub use async_trait;
pub use chrono;
pub use serde;
pub use serde_json;

use sqlx::PgPool;

pub type DbPool = PgPool;
