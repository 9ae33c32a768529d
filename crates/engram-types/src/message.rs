//! Conversation message types.

use chrono::{DateTime, Utc};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Role of a conversation message author.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum MessageRole {
    /// Message written by the human operator.
    User,
    /// Message produced by the assistant.
    Assistant,
    /// System-level instruction or injection.
    System,
    /// Tool result routed back into the conversation.
    Tool,
}

impl MessageRole {
    /// String form used in logs and summaries.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::User => "user",
            Self::Assistant => "assistant",
            Self::System => "system",
            Self::Tool => "tool",
        }
    }
}

impl std::fmt::Display for MessageRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One immutable message in a conversation buffer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct Message {
    /// Unique message id, minted on construction.
    pub id: String,
    /// Author role.
    pub role: MessageRole,
    /// Text content. Non-text payloads are coerced to their string form
    /// before a message is built.
    pub content: String,
    /// Wall-clock creation instant.
    pub timestamp: DateTime<Utc>,
    /// Caller-supplied metadata; opaque to the engine.
    #[serde(default)]
    pub metadata: Map<String, Value>,
}

impl Message {
    /// Build a message stamped with the current instant and a fresh id.
    #[must_use]
    pub fn new(role: MessageRole, content: impl Into<String>) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            role,
            content: content.into(),
            timestamp: Utc::now(),
            metadata: Map::new(),
        }
    }

    /// Replace the creation instant (used by replay and tests).
    #[must_use]
    pub fn with_timestamp(mut self, timestamp: DateTime<Utc>) -> Self {
        self.timestamp = timestamp;
        self
    }

    /// Attach caller metadata.
    #[must_use]
    pub fn with_metadata(mut self, metadata: Map<String, Value>) -> Self {
        self.metadata = metadata;
        self
    }
}
