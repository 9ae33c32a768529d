//! Promotion candidates queued in short-term memory.

use chrono::{DateTime, Utc};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::memory::MemoryType;

/// A candidate record awaiting promotion to long-term memory.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct PendingItem {
    /// Unique candidate id; minted when the caller omits one.
    pub id: String,
    /// Declared memory type; inferred at promotion time when absent.
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub memory_type: Option<MemoryType>,
    /// Structured payload to persist on promotion.
    pub data: Map<String, Value>,
    /// Caller-assessed importance, clamped to [0, 1].
    pub importance: f64,
    /// Enqueue instant; drives age-based promotion.
    pub timestamp: DateTime<Utc>,
    /// Whether the payload has been externally verified.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub verified: Option<bool>,
    /// Origin label carried into the persisted record.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
}

impl PendingItem {
    /// Build a candidate with a fresh id, the current instant, and
    /// importance 0.5.
    #[must_use]
    pub fn new(data: Map<String, Value>) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            memory_type: None,
            data,
            importance: 0.5,
            timestamp: Utc::now(),
            verified: None,
            source: None,
        }
    }

    /// Set the declared memory type.
    #[must_use]
    pub fn with_type(mut self, memory_type: MemoryType) -> Self {
        self.memory_type = Some(memory_type);
        self
    }

    /// Set importance, clamped to [0, 1].
    #[must_use]
    pub fn with_importance(mut self, importance: f64) -> Self {
        self.importance = importance.clamp(0.0, 1.0);
        self
    }

    /// Replace the enqueue instant (used by replay and tests).
    #[must_use]
    pub fn with_timestamp(mut self, timestamp: DateTime<Utc>) -> Self {
        self.timestamp = timestamp;
        self
    }

    /// Mark the payload as verified or not.
    #[must_use]
    pub fn with_verified(mut self, verified: bool) -> Self {
        self.verified = Some(verified);
        self
    }

    /// Set the origin label.
    #[must_use]
    pub fn with_source(mut self, source: impl Into<String>) -> Self {
        self.source = Some(source.into());
        self
    }

    /// Age of this candidate in whole seconds at `now`, floored at zero.
    #[must_use]
    pub fn age_seconds(&self, now: DateTime<Utc>) -> i64 {
        (now - self.timestamp).num_seconds().max(0)
    }
}
