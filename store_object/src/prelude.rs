//! Convenience re-exports for common store-object usage

// Core traits
pub use crate::traits::{
    Entity, FromBackend, Repository, SoftDeletable, SoftDeleteRepository, StorageBackend,
    TableMetadata,
};

// Error types
pub use crate::errors::StoreError;

// Stores and their construction
pub use crate::generic_store::{GenericStore, RepositoryFactory, SoftDeleteStore};

// Backends
pub use crate::backend::{MemoryBackend, PgBackend};
pub use crate::mapping::EntityMapping;

// Unit of work
pub use crate::session::Session;
pub use crate::toggle::{FilterGuard, PredicateToggle, SOFT_DELETE_FILTER};

pub use crate::id_type::{HasUniversalId, UniversalId};

// Validation
pub use crate::validation::{ValidatedFieldName, ValidatedTableName, ValidationError};

// Query building
pub use crate::query_builder::{QueryBuilder, QueryFilter, SortOrder};

// Common external dependencies that are frequently used
pub use async_trait::async_trait;
pub use chrono::{DateTime, Utc};
pub use serde::{Deserialize, Serialize};
pub use sqlx::PgPool;
pub use uuid::Uuid;
