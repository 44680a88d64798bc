//! Convenience re-exports for common SoftHaus usage
//!
//! This prelude module re-exports the most commonly used items from the SoftHaus crates,
//! making it easier to import everything you need with a single use statement.
//!
//! # Example
//!
//! ```rust
//! use softhaus::prelude::*;
//!
//! // Now you have access to all the common SoftHaus types and traits
//! ```

// Core SoftHaus components
pub use crate::core::SoftHaus;
pub use crate::errors::SoftHausError;

// Re-export centralized config
pub use config::{AppConfig, ConfigError, DatabaseConfig, SoftDeleteConfig};

// Re-export commonly used store-object types for convenience
pub use store_object::prelude::*;

// Re-export store_object module for macro-generated code
pub use store_object;

// Re-export table derive for model creation
pub use table_derive::{TableMetadata, model};

// Common external dependencies
pub use anyhow;
pub use async_trait;
pub use sqlx;
pub use tokio;
