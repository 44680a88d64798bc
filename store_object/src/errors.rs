//! Error types for store operations

use crate::validation::ValidationError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Database error on {table} during {operation}: {source}")]
    Database {
        table: &'static str,
        operation: &'static str,
        #[source]
        source: sqlx::Error,
    },

    #[error("Backend error on {table} during {operation}: {message}")]
    Backend {
        table: &'static str,
        operation: &'static str,
        message: String,
    },

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Row filter '{0}' is not defined for this session")]
    FilterNotDefined(String),

    #[error("Cannot remove detached {table} record {id}; merge it first")]
    Detached { table: &'static str, id: String },

    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl StoreError {
    pub fn database_operation(
        table: &'static str,
        operation: &'static str,
        source: sqlx::Error,
    ) -> Self {
        Self::Database {
            table,
            operation,
            source,
        }
    }

    pub fn backend(table: &'static str, operation: &'static str, message: impl Into<String>) -> Self {
        Self::Backend {
            table,
            operation,
            message: message.into(),
        }
    }

    /// True for failures to toggle a session row filter
    pub fn is_filter_state(&self) -> bool {
        matches!(self, Self::FilterNotDefined(_))
    }
}
