//! Error types for the SoftHaus crate
//!
//! This module contains all error types that can be returned by SoftHaus operations.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum SoftHausError {
    #[error("Database connection error: {0}")]
    DatabaseConnection(#[from] sqlx::Error),

    #[error(transparent)]
    Store(#[from] store_object::StoreError),

    #[error("Configuration error: {0}")]
    Config(#[from] config::ConfigError),

    #[error("Repository not found: {0}")]
    StoreNotFound(String),

    #[error("Repository already registered: {0}")]
    StoreAlreadyRegistered(String),
}
