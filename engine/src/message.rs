//! Normalized message model
//!
//! Every inbound platform payload is normalized into [`Message`] before it
//! reaches the orchestrator. Wire formats and channel adapters live outside
//! this crate.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Who produced a message
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Sender {
    User,
    Assistant,
    System,
}

/// A single normalized conversation message
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message {
    /// Caller-supplied unique id; used as memory provenance
    pub id: String,
    pub conversation_id: String,
    pub content: String,
    pub sender: Sender,
    pub timestamp: DateTime<Utc>,
    /// Origin channel, e.g. "chat", "email", "voice"
    #[serde(default)]
    pub channel: Option<String>,
    /// Free-form platform metadata, opaque to the engine
    #[serde(default)]
    pub metadata: serde_json::Value,
}

impl Message {
    /// Create a user message with a generated id and current timestamp
    pub fn user(conversation_id: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            conversation_id: conversation_id.into(),
            content: content.into(),
            sender: Sender::User,
            timestamp: Utc::now(),
            channel: None,
            metadata: serde_json::Value::Null,
        }
    }

    /// Create an assistant message with a generated id and current timestamp
    pub fn assistant(conversation_id: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            sender: Sender::Assistant,
            ..Self::user(conversation_id, content)
        }
    }

    pub fn with_channel(mut self, channel: impl Into<String>) -> Self {
        self.channel = Some(channel.into());
        self
    }

    pub fn with_metadata(mut self, metadata: serde_json::Value) -> Self {
        self.metadata = metadata;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_user_message_defaults() {
        let msg = Message::user("conv-1", "hello there");
        assert_eq!(msg.conversation_id, "conv-1");
        assert_eq!(msg.sender, Sender::User);
        assert!(msg.channel.is_none());
        assert!(msg.metadata.is_null());
        assert!(!msg.id.is_empty());
    }

    #[test]
    fn test_builder_helpers() {
        let msg = Message::assistant("conv-1", "done")
            .with_channel("chat")
            .with_metadata(json!({"latency_ms": 40}));
        assert_eq!(msg.sender, Sender::Assistant);
        assert_eq!(msg.channel.as_deref(), Some("chat"));
        assert_eq!(msg.metadata["latency_ms"], 40);
    }

    #[test]
    fn test_serde_roundtrip() {
        let msg = Message::user("conv-9", "check flights").with_channel("chat");
        let json = serde_json::to_string(&msg).unwrap();
        let back: Message = serde_json::from_str(&json).unwrap();
        assert_eq!(back.id, msg.id);
        assert_eq!(back.content, msg.content);
        assert_eq!(back.sender, Sender::User);
    }
}
