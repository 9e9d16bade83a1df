//! Error types for the conversation engine.

use reverie_memory::MemoryError;
use thiserror::Error;

/// Errors that can occur while processing conversations.
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("Conversation not found: {0}")]
    ConversationNotFound(String),

    #[error("Invalid message: {0}")]
    InvalidMessage(String),

    #[error("Memory error: {0}")]
    Memory(#[from] MemoryError),

    #[error("Response generation failed: {0}")]
    Response(String),
}

impl EngineError {
    pub fn conversation_not_found(id: impl Into<String>) -> Self {
        Self::ConversationNotFound(id.into())
    }

    pub fn invalid_message(msg: impl Into<String>) -> Self {
        Self::InvalidMessage(msg.into())
    }

    pub fn response(msg: impl Into<String>) -> Self {
        Self::Response(msg.into())
    }
}

/// Result type alias for engine operations.
pub type EngineResult<T> = Result<T, EngineError>;
