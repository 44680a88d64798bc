//! Query builder utilities
//!
//! Filters and orderings used by repositories and backends. PostgreSQL turns
//! them into SQL through [`sql_generation::SqlGenerator`]; the memory backend
//! evaluates them directly against the JSON form of a row.

pub mod builder;
pub mod filter;
pub mod matching;
pub mod ordering;
pub mod sql_generation;

#[cfg(test)]
mod tests;

pub use builder::QueryBuilder;
pub use filter::{QueryFilter, QueryOperator};
pub use ordering::SortOrder;
