//! Error types for reverie-memory

use thiserror::Error;

/// Errors that can occur in the memory layer
#[derive(Debug, Error)]
pub enum MemoryError {
    /// Empty or malformed content, rejected before any mutation
    #[error("Invalid content: {0}")]
    InvalidContent(String),

    /// Memory node not found
    #[error("Memory not found: {0}")]
    NotFound(String),

    /// Node cap reached and eviction could not free space
    #[error("Capacity exceeded: {0}")]
    CapacityExceeded(String),

    /// Embedding vector length did not match the graph's dimensionality
    #[error("Embedding dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },

    /// Embedding provider failure
    #[error("Embedding error: {0}")]
    Embedding(String),

    /// Snapshot (de)serialization error
    #[error("Snapshot error: {0}")]
    Snapshot(#[from] bincode::Error),

    /// JSON serialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// UUID parsing error
    #[error("UUID error: {0}")]
    Uuid(#[from] uuid::Error),

    /// Generic error
    #[error("{0}")]
    Other(String),
}

impl MemoryError {
    /// Create an invalid-content error
    pub fn invalid_content(msg: impl Into<String>) -> Self {
        Self::InvalidContent(msg.into())
    }

    /// Create a not-found error
    pub fn not_found(id: impl Into<String>) -> Self {
        Self::NotFound(id.into())
    }

    /// Create a capacity-exceeded error
    pub fn capacity(msg: impl Into<String>) -> Self {
        Self::CapacityExceeded(msg.into())
    }

    /// Create an embedding error
    pub fn embedding(msg: impl Into<String>) -> Self {
        Self::Embedding(msg.into())
    }

    /// Create a generic error
    pub fn other(msg: impl Into<String>) -> Self {
        Self::Other(msg.into())
    }
}

/// Result type for memory operations
pub type Result<T> = std::result::Result<T, MemoryError>;
