//! # SoftHaus
//!
//! Soft deletion for PostgreSQL-backed repositories. Records carrying a
//! `#[soft_delete]` marker get a repository that hides trashed rows from its
//! standard reads, turns deletes into soft deletes, and adds restore,
//! force-delete and trashed scopes.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use softhaus::prelude::*;
//!
//! #[model]
//! #[table(name = "posts")]
//! pub struct Post {
//!     #[primary_key]
//!     pub id: Uuid,
//!
//!     pub title: String,
//!
//!     #[soft_delete]
//!     pub deleted_at: Option<DateTime<Utc>>,
//! }
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = AppConfig::load()?;
//!     let mut softhaus = SoftHaus::new(config).await?;
//!     softhaus.register::<Post>()?;
//!
//!     let posts = softhaus.repository::<Post>()?;
//!     let session = softhaus.begin_session();
//!
//!     let mut post = posts
//!         .save(
//!             &session,
//!             Post {
//!                 id: Uuid::new_v4(),
//!                 title: "Hello".to_string(),
//!                 deleted_at: None,
//!             },
//!         )
//!         .await?;
//!
//!     posts.delete(&session, &mut post).await?;
//!     assert_eq!(posts.count(&session).await?, 0);
//!     assert_eq!(posts.count_trashed(&session).await?, 1);
//!
//!     posts.restore(&session, &mut post).await?;
//!     Ok(())
//! }
//! ```

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

pub mod core;
pub mod errors;
pub mod prelude;

// Re-export the main public types for convenience
pub use core::SoftHaus;
pub use errors::SoftHausError;

// Re-export centralized config
pub use config::{AppConfig, ConfigError, DatabaseConfig, SoftDeleteConfig};

// Re-export internal crates used by macros and public API
// These MUST be public for the generated macro code to work correctly
pub use store_object;
pub use table_derive;

// Re-export external dependencies used in public API
pub use sqlx;
pub use async_trait;
