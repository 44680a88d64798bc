//! Core SoftHaus functionality
//!
//! This module contains the main SoftHaus struct: the connection pool, the
//! loaded configuration and one repository per registered record type.

use sqlx::PgPool;
use std::any::{Any, TypeId};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use store_object::{Entity, EntityMapping, PgBackend, RepositoryFactory, Session};

use crate::errors::SoftHausError;
use config::{AppConfig, ConfigError};

struct Registration {
    table: &'static str,
    repository: Box<dyn Any + Send + Sync>,
}

/// Main SoftHaus coordinator that owns the pool and the repository registry
pub struct SoftHaus {
    pool: PgPool,
    config: AppConfig,
    repositories: HashMap<TypeId, Registration>,
}

impl SoftHaus {
    /// Connect using the `[database]` section of the configuration
    pub async fn new(config: AppConfig) -> Result<Self, SoftHausError> {
        let database = config.database.as_ref().ok_or_else(|| {
            ConfigError::Invalid("a [database] section is required to connect".to_string())
        })?;

        let mut pool_options = sqlx::postgres::PgPoolOptions::new()
            .max_connections(database.max_connections)
            .min_connections(database.min_connections)
            .acquire_timeout(Duration::from_secs(database.connection_timeout_seconds))
            .idle_timeout(Duration::from_secs(database.idle_timeout_seconds));

        // Set max lifetime if specified
        if database.max_lifetime_seconds > 0 {
            pool_options =
                pool_options.max_lifetime(Duration::from_secs(database.max_lifetime_seconds));
        }

        let pool = pool_options.connect(&database.connection_string()).await?;

        Ok(Self::from_pool(pool, config))
    }

    /// Wrap an existing pool
    pub fn from_pool(pool: PgPool, config: AppConfig) -> Self {
        Self {
            pool,
            config,
            repositories: HashMap::new(),
        }
    }

    /// Get database pool reference
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    /// Build and store the repository for `T`
    ///
    /// The mapping is resolved against the configured soft-delete column, and
    /// the repository type is the one `T` declares through [`Entity`].
    pub fn register<T: Entity>(&mut self) -> Result<(), SoftHausError> {
        let key = TypeId::of::<T>();
        if self.repositories.contains_key(&key) {
            return Err(SoftHausError::StoreAlreadyRegistered(
                T::table_name().to_string(),
            ));
        }

        let mapping = EntityMapping::resolve::<T>(&self.config.soft_delete)?;
        let backend = Arc::new(PgBackend::<T>::new(self.pool.clone(), mapping));
        let repository = RepositoryFactory::create::<T, PgBackend<T>>(backend);

        self.repositories.insert(
            key,
            Registration {
                table: T::table_name(),
                repository: Box::new(repository),
            },
        );
        crate::debug_log!(
            table = T::table_name(),
            soft_delete = T::supports_soft_delete(),
            "registered repository"
        );
        Ok(())
    }

    /// Get the registered repository for `T`
    pub fn repository<T: Entity>(&self) -> Result<&T::Repository<PgBackend<T>>, SoftHausError> {
        self.repositories
            .get(&TypeId::of::<T>())
            .and_then(|registration| {
                registration
                    .repository
                    .downcast_ref::<T::Repository<PgBackend<T>>>()
            })
            .ok_or_else(|| SoftHausError::StoreNotFound(T::table_name().to_string()))
    }

    /// Remove the repository for `T`
    pub fn unregister<T: Entity>(&mut self) -> Result<(), SoftHausError> {
        self.repositories
            .remove(&TypeId::of::<T>())
            .map(|_| ())
            .ok_or_else(|| SoftHausError::StoreNotFound(T::table_name().to_string()))
    }

    /// List the tables of all registered record types
    pub fn registered_tables(&self) -> Vec<&'static str> {
        let mut tables: Vec<_> = self
            .repositories
            .values()
            .map(|registration| registration.table)
            .collect();
        tables.sort_unstable();
        tables
    }

    /// Start a unit of work with the soft-delete filter defined and enabled
    pub fn begin_session(&self) -> Session {
        Session::new()
    }

    /// Check database connection health
    pub async fn health_check(&self) -> Result<(), SoftHausError> {
        sqlx::query("SELECT 1").fetch_one(&self.pool).await?;
        Ok(())
    }
}
