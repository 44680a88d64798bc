//! Storage backends
//!
//! `PgBackend` runs against PostgreSQL through sqlx. `MemoryBackend` keeps
//! rows in process and models a unit of work with an identity cache and
//! write-behind.

pub mod memory;
pub mod postgres;

pub use memory::MemoryBackend;
pub use postgres::PgBackend;
