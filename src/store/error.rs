//! Store Errors
//!
//! Error types for repository operations.

/// Errors that can occur in the store
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// Optimistic concurrency conflict
    #[error("Concurrency conflict for {collection}/{key}: expected version {expected}, found {actual}")]
    ConcurrencyConflict {
        collection: &'static str,
        key: String,
        expected: i64,
        actual: i64,
    },

    /// Record not found
    #[error("Record not found: {collection}/{key}")]
    NotFound { collection: &'static str, key: String },

    /// Database error
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl StoreError {
    /// Check if this error is a concurrency conflict
    pub fn is_concurrency_conflict(&self) -> bool {
        matches!(self, StoreError::ConcurrencyConflict { .. })
    }

    /// Check if this error is retryable
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            StoreError::ConcurrencyConflict { .. } | StoreError::Database(_)
        )
    }
}
