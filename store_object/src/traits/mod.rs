//! Traits for database operations
//!
//! This module contains all the traits that define the interface for record
//! storage and repositories in the softhaus library.

pub mod backend;
pub mod core;
pub mod soft_deletable;
pub mod table_metadata;

// Re-export all public items for convenience
pub use backend::StorageBackend;
pub use core::Repository;
pub use soft_deletable::{SoftDeletable, SoftDeleteRepository};
pub use table_metadata::{Entity, FromBackend, TableMetadata};
