//! Short-term memory facade aggregating the session-scoped components.

use chrono::{DateTime, Utc};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use engram_types::{Message, PendingItem, SessionId};

use crate::access_log::AccessLog;
use crate::buffer::ConversationBuffer;
use crate::context::WorkingContext;
use crate::error::StmError;
use crate::pending::PendingQueue;

fn default_max_messages() -> usize {
    100
}

fn default_max_tokens() -> usize {
    4000
}

fn default_max_context_items() -> usize {
    50
}

fn default_max_pending() -> usize {
    20
}

/// Capacity configuration for one short-term memory.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StmConfig {
    /// Conversation buffer message cap.
    #[serde(default = "default_max_messages")]
    pub max_messages: usize,
    /// Conversation buffer token budget.
    #[serde(default = "default_max_tokens")]
    pub max_tokens: usize,
    /// Working context entry cap.
    #[serde(default = "default_max_context_items")]
    pub max_context_items: usize,
    /// Pending queue capacity.
    #[serde(default = "default_max_pending")]
    pub max_pending: usize,
}

impl Default for StmConfig {
    fn default() -> Self {
        Self {
            max_messages: default_max_messages(),
            max_tokens: default_max_tokens(),
            max_context_items: default_max_context_items(),
            max_pending: default_max_pending(),
        }
    }
}

/// Read-only structured snapshot of one short-term memory.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct StmSummary {
    /// Owning session id.
    pub session_id: String,
    /// Creation instant of this memory.
    pub created_at: DateTime<Utc>,
    /// Messages currently in the conversation window.
    pub message_count: usize,
    /// Estimated tokens currently held by the window.
    pub token_count: usize,
    /// Configured token capacity.
    pub max_tokens: usize,
    /// Configured message cap.
    pub max_messages: usize,
    /// Working context entries currently stored.
    pub context_item_count: usize,
    /// Configured working context capacity.
    pub max_context_items: usize,
    /// Promotion candidates currently queued.
    pub pending_count: usize,
    /// Configured pending queue capacity.
    pub max_pending: usize,
    /// Retained access instants (capped).
    pub access_count: usize,
    /// Most recent access instant.
    pub last_access: Option<DateTime<Utc>>,
    /// Whether all three components are empty.
    pub is_empty: bool,
}

/// Ephemeral per-session memory: conversation window, working context, and
/// pending promotion queue, plus an access log of mutation instants.
///
/// Values of this type are exclusively owned by one session server; there is
/// no interior locking here.
#[derive(Debug)]
pub struct ShortTermMemory {
    session_id: SessionId,
    buffer: ConversationBuffer,
    context: WorkingContext,
    pending: PendingQueue,
    created_at: DateTime<Utc>,
    access_log: AccessLog,
}

impl ShortTermMemory {
    /// Create an empty memory for `session_id`.
    #[must_use]
    pub fn new(session_id: SessionId, config: &StmConfig) -> Self {
        Self {
            session_id,
            buffer: ConversationBuffer::new(config.max_messages, config.max_tokens),
            context: WorkingContext::new(config.max_context_items),
            pending: PendingQueue::new(config.max_pending),
            created_at: Utc::now(),
            access_log: AccessLog::new(),
        }
    }

    /// Owning session id.
    #[must_use]
    pub fn session_id(&self) -> &SessionId {
        &self.session_id
    }

    /// Creation instant.
    #[must_use]
    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    /// Record one access instant. Mutating delegates call this themselves;
    /// compound operations (such as a promotion drain) call it once.
    pub fn record_access(&mut self) {
        self.access_log.record(Utc::now());
    }

    // -- conversation buffer ------------------------------------------------

    /// Append a message; returns evicted messages, oldest first.
    pub fn add_message(&mut self, message: Message) -> Vec<Message> {
        self.record_access();
        self.buffer.add(message)
    }

    /// Last `n` messages in order; `None` returns all.
    #[must_use]
    pub fn recent_messages(&self, n: Option<usize>) -> Vec<&Message> {
        self.buffer.recent(n)
    }

    /// Messages currently held.
    #[must_use]
    pub fn message_count(&self) -> usize {
        self.buffer.len()
    }

    /// Estimated tokens currently held.
    #[must_use]
    pub fn token_count(&self) -> usize {
        self.buffer.token_count()
    }

    // -- working context ----------------------------------------------------

    /// Insert or overwrite one context key.
    ///
    /// # Errors
    ///
    /// Returns [`StmError::CapacityExceeded`] for a new key at capacity.
    pub fn put_context(&mut self, key: impl Into<String>, value: Value) -> Result<(), StmError> {
        self.record_access();
        self.context.put(key, value)
    }

    /// Insert a batch of context keys atomically.
    ///
    /// # Errors
    ///
    /// Returns [`StmError::CapacityExceeded`] when the merged size would
    /// exceed capacity; no partial update is observable.
    pub fn put_context_many(&mut self, values: Map<String, Value>) -> Result<(), StmError> {
        self.record_access();
        self.context.put_many(values)
    }

    /// Look up one context key.
    ///
    /// # Errors
    ///
    /// Returns [`StmError::KeyNotFound`] when the key is absent.
    pub fn get_context(&self, key: &str) -> Result<&Value, StmError> {
        self.context.get(key)
    }

    /// Look up one context key with a default.
    #[must_use]
    pub fn get_context_or(&self, key: &str, default: Value) -> Value {
        self.context.get_or(key, default)
    }

    /// Remove one context key. Idempotent.
    pub fn delete_context(&mut self, key: &str) -> bool {
        self.record_access();
        self.context.delete(key)
    }

    /// Present context keys, unordered.
    #[must_use]
    pub fn context_keys(&self) -> Vec<String> {
        self.context.keys().map(str::to_string).collect()
    }

    /// Working context entries currently stored.
    #[must_use]
    pub fn context_len(&self) -> usize {
        self.context.len()
    }

    // -- pending queue ------------------------------------------------------

    /// Queue a promotion candidate.
    ///
    /// # Errors
    ///
    /// Returns [`StmError::QueueFull`] at capacity; no side effects.
    pub fn enqueue_pending(&mut self, item: PendingItem) -> Result<(), StmError> {
        self.record_access();
        self.pending.enqueue(item)
    }

    /// Remove the queue head (promotion drain path; does not record an
    /// access by itself).
    pub fn dequeue_pending(&mut self) -> Option<PendingItem> {
        self.pending.dequeue()
    }

    /// Re-queue a candidate at the tail (implicit-mode skip or retry).
    ///
    /// # Errors
    ///
    /// Returns [`StmError::QueueFull`] at capacity.
    pub fn requeue_pending(&mut self, item: PendingItem) -> Result<(), StmError> {
        self.pending.enqueue(item)
    }

    /// Non-destructive view of the queue head.
    #[must_use]
    pub fn peek_pending(&self) -> Option<&PendingItem> {
        self.pending.peek()
    }

    /// Promotion candidates currently queued.
    #[must_use]
    pub fn pending_count(&self) -> usize {
        self.pending.len()
    }

    /// Queued candidates in arrival order.
    pub fn pending_iter(&self) -> impl Iterator<Item = &PendingItem> {
        self.pending.iter()
    }

    // -- snapshots ----------------------------------------------------------

    /// Whether buffer, context, and queue are all empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.buffer.is_empty() && self.context.is_empty() && self.pending.is_empty()
    }

    /// Structured snapshot of counts, capacities, and access statistics.
    #[must_use]
    pub fn summary(&self) -> StmSummary {
        StmSummary {
            session_id: self.session_id.to_string(),
            created_at: self.created_at,
            message_count: self.buffer.len(),
            token_count: self.buffer.token_count(),
            max_tokens: self.buffer.max_tokens(),
            max_messages: self.buffer.max_messages(),
            context_item_count: self.context.len(),
            max_context_items: self.context.max_items(),
            pending_count: self.pending.len(),
            max_pending: self.pending.max_size(),
            access_count: self.access_log.len(),
            last_access: self.access_log.last(),
            is_empty: self.is_empty(),
        }
    }
}
