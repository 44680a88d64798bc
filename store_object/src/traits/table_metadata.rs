//! Trait definitions
//!
//! Entity metadata and the repository selection tag.

use crate::id_type::HasUniversalId;
use crate::traits::backend::StorageBackend;
use crate::traits::core::Repository;
use serde::{de::DeserializeOwned, Serialize};
use std::fmt::Debug;
use std::sync::Arc;

/// Metadata about a persisted record type
///
/// This trait should be derived using the `#[model]` attribute macro, which
/// automatically includes all necessary derives.
///
/// Recommended usage:
/// ```ignore
/// use table_derive::model;
///
/// #[model]
/// #[table(name = "posts")]
/// pub struct Post {
///     #[primary_key]
///     pub id: Uuid,
///
///     pub title: String,
///
///     #[soft_delete]
///     pub deleted_at: Option<DateTime<Utc>>,
/// }
/// ```
///
/// The serialized field names of the record are its column names. Backends
/// read and write rows through that serialized form.
pub trait TableMetadata:
    Clone + Send + Sync + Debug + Serialize + DeserializeOwned + 'static
{
    /// The type used for the primary key
    type Id: Clone + Send + Sync + Debug + Serialize + HasUniversalId + 'static;

    /// The table name in the database
    fn table_name() -> &'static str;

    /// Get the primary key column name
    fn primary_key_field() -> &'static str;

    /// All column names, in declaration order
    fn columns() -> Vec<&'static str>;

    /// Extract ID from model instance
    fn extract_id(&self) -> Self::Id;

    /// Whether this entity supports soft deletion
    fn supports_soft_delete() -> bool {
        false
    }

    /// Serialized name of the marker field
    fn soft_delete_field() -> Option<&'static str> {
        None
    }

    /// Entity-level marker column, overriding the global configuration
    fn soft_delete_column() -> Option<&'static str> {
        None
    }
}

/// Construct a repository on top of a storage backend
pub trait FromBackend<T, B>: Sized {
    fn from_backend(backend: Arc<B>) -> Self;
}

/// Compile-time repository selection
///
/// The `TableMetadata` derive implements this with `SoftDeleteStore` for
/// records carrying a `#[soft_delete]` field and `GenericStore` for all others.
pub trait Entity: TableMetadata + Sized {
    type Repository<B>: Repository<Self> + FromBackend<Self, B> + Send + Sync + 'static
    where
        B: StorageBackend<Self> + 'static;
}
