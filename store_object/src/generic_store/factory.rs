use crate::traits::{Entity, FromBackend, StorageBackend};
use std::sync::Arc;

/// Builds the repository a record type declares through [`Entity`]
///
/// The choice between the plain store and the soft-delete decorator is made
/// by the type system, once, when the repository is created.
pub struct RepositoryFactory;

impl RepositoryFactory {
    pub fn create<T, B>(backend: Arc<B>) -> T::Repository<B>
    where
        T: Entity,
        B: StorageBackend<T> + 'static,
    {
        tracing::debug!(
            table = T::table_name(),
            soft_delete = T::supports_soft_delete(),
            repository = std::any::type_name::<T::Repository<B>>(),
            "creating repository"
        );
        <T::Repository<B> as FromBackend<T, B>>::from_backend(backend)
    }
}
