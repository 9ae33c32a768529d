//! Session-addressed memory service: the produced interface of the engine.

use serde_json::{Map, Value};

use engram_graph::{Binding, LtmAdapter, MemoryPattern, TripleStore};
use engram_stm::StmSummary;
use engram_types::{Message, MessageRole, NamedGraph, PendingItem, SessionId};

use crate::config::{MemoryConfig, PromotionCriteria};
use crate::error::EngineError;
use crate::observability::MemoryEvent;
use crate::promotion::{PromotionMode, PromotionReport};
use crate::registry::SessionRegistry;
use crate::server::AddMessageOutcome;

/// Coerce an opaque payload to message text. String payloads pass through;
/// anything else is stored in its JSON string form.
fn coerce_text(content: Value) -> String {
    match content {
        Value::String(text) => text,
        other => other.to_string(),
    }
}

/// Facade over the registry and the shared long-term memory adapter.
///
/// Host runtimes hold one service per deployment and address every call by
/// session id; servers are started lazily on first use. The transport in
/// front of this type (in-process calls, signals, RPC) is a host concern.
pub struct MemoryService<S: TripleStore> {
    registry: SessionRegistry<S>,
    adapter: LtmAdapter<S>,
    config: MemoryConfig,
}

impl<S: TripleStore + 'static> MemoryService<S> {
    /// Build a service over `store` and initialize the configured standard
    /// graphs.
    ///
    /// # Errors
    ///
    /// Returns an adapter error when graph initialization fails.
    pub async fn new(store: S, config: MemoryConfig) -> Result<Self, EngineError> {
        Self::with_adapter(LtmAdapter::new(store), config).await
    }

    /// Build a service over an existing shared adapter.
    ///
    /// # Errors
    ///
    /// Returns an adapter error when graph initialization fails.
    pub async fn with_adapter(
        adapter: LtmAdapter<S>,
        config: MemoryConfig,
    ) -> Result<Self, EngineError> {
        adapter.ensure_graphs(&config.standard_graphs).await?;
        tracing::info!(
            event = MemoryEvent::GraphsEnsured.as_str(),
            graphs = config.standard_graphs.len(),
            "standard named graphs ensured"
        );
        Ok(Self {
            registry: SessionRegistry::new(adapter.clone(), config.clone()),
            adapter,
            config,
        })
    }

    fn parse_session(session: &str) -> Result<SessionId, EngineError> {
        Ok(SessionId::parse(session)?)
    }

    /// Append a message to a session's conversation buffer. Non-text
    /// payloads are coerced to their string form before estimation.
    ///
    /// # Errors
    ///
    /// Fails on an invalid session id, a stopped server, or a timeout.
    pub async fn add_message(
        &self,
        session: &str,
        role: MessageRole,
        content: Value,
        metadata: Option<Map<String, Value>>,
    ) -> Result<AddMessageOutcome, EngineError> {
        let session_id = Self::parse_session(session)?;
        let handle = self.registry.get_or_start(&session_id).await?;
        handle
            .add_message(role, coerce_text(content), metadata.unwrap_or_default())
            .await
    }

    /// Append a plain text message.
    ///
    /// # Errors
    ///
    /// Same failure modes as [`MemoryService::add_message`].
    pub async fn add_text_message(
        &self,
        session: &str,
        role: MessageRole,
        content: &str,
    ) -> Result<AddMessageOutcome, EngineError> {
        self.add_message(session, role, Value::String(content.to_string()), None)
            .await
    }

    /// Last `limit` messages of a session in order; `None` returns all.
    /// Reads go through the owning server, so they are linearizable with
    /// writes.
    ///
    /// # Errors
    ///
    /// Fails on an invalid session id, a stopped server, or a timeout.
    pub async fn recent_messages(
        &self,
        session: &str,
        limit: Option<usize>,
    ) -> Result<Vec<Message>, EngineError> {
        let session_id = Self::parse_session(session)?;
        let handle = self.registry.get_or_start(&session_id).await?;
        handle.recent_messages(limit).await
    }

    /// Write one working context key.
    ///
    /// # Errors
    ///
    /// Surfaces `CapacityExceeded` unchanged; state is untouched on failure.
    pub async fn put_context(
        &self,
        session: &str,
        key: &str,
        value: Value,
    ) -> Result<(), EngineError> {
        let session_id = Self::parse_session(session)?;
        let handle = self.registry.get_or_start(&session_id).await?;
        handle.put_context(key.to_string(), value).await
    }

    /// Write a batch of context keys atomically.
    ///
    /// # Errors
    ///
    /// Surfaces `CapacityExceeded` unchanged; no partial update happens.
    pub async fn put_context_many(
        &self,
        session: &str,
        values: Map<String, Value>,
    ) -> Result<(), EngineError> {
        let session_id = Self::parse_session(session)?;
        let handle = self.registry.get_or_start(&session_id).await?;
        handle.put_context_many(values).await
    }

    /// Read one context key.
    ///
    /// # Errors
    ///
    /// Surfaces `KeyNotFound` for an absent key.
    pub async fn get_context(&self, session: &str, key: &str) -> Result<Value, EngineError> {
        let session_id = Self::parse_session(session)?;
        let handle = self.registry.get_or_start(&session_id).await?;
        handle.get_context(key.to_string(), None).await
    }

    /// Read one context key, falling back to `default` when absent.
    ///
    /// # Errors
    ///
    /// Fails on an invalid session id, a stopped server, or a timeout.
    pub async fn get_context_or(
        &self,
        session: &str,
        key: &str,
        default: Value,
    ) -> Result<Value, EngineError> {
        let session_id = Self::parse_session(session)?;
        let handle = self.registry.get_or_start(&session_id).await?;
        handle.get_context(key.to_string(), Some(default)).await
    }

    /// Delete one context key. Idempotent; returns prior presence.
    ///
    /// # Errors
    ///
    /// Fails on an invalid session id, a stopped server, or a timeout.
    pub async fn delete_context(&self, session: &str, key: &str) -> Result<bool, EngineError> {
        let session_id = Self::parse_session(session)?;
        let handle = self.registry.get_or_start(&session_id).await?;
        handle.delete_context(key.to_string()).await
    }

    /// Present context keys of a session, unordered.
    ///
    /// # Errors
    ///
    /// Fails on an invalid session id, a stopped server, or a timeout.
    pub async fn context_keys(&self, session: &str) -> Result<Vec<String>, EngineError> {
        let session_id = Self::parse_session(session)?;
        let handle = self.registry.get_or_start(&session_id).await?;
        handle.context_keys().await
    }

    /// Queue a promotion candidate; a missing id is minted. Returns the id.
    ///
    /// # Errors
    ///
    /// Surfaces `QueueFull` unchanged; no side effects on failure.
    pub async fn enqueue_memory(
        &self,
        session: &str,
        item: PendingItem,
    ) -> Result<String, EngineError> {
        let session_id = Self::parse_session(session)?;
        let handle = self.registry.get_or_start(&session_id).await?;
        handle.enqueue_memory(item).await
    }

    /// Run one promotion pass with the configured criteria.
    ///
    /// # Errors
    ///
    /// Fails on an invalid session id, a stopped server, or a timeout;
    /// per-item failures land in the returned report.
    pub async fn promote(
        &self,
        session: &str,
        mode: PromotionMode,
    ) -> Result<PromotionReport, EngineError> {
        self.promote_with(session, mode, None).await
    }

    /// Run one promotion pass with explicit criteria.
    ///
    /// # Errors
    ///
    /// Same failure modes as [`MemoryService::promote`].
    pub async fn promote_with(
        &self,
        session: &str,
        mode: PromotionMode,
        criteria: Option<PromotionCriteria>,
    ) -> Result<PromotionReport, EngineError> {
        let session_id = Self::parse_session(session)?;
        let handle = self.registry.get_or_start(&session_id).await?;
        handle.promote(mode, criteria).await
    }

    /// Query long-term memory directly through the shared adapter. Visible
    /// to every session: a persist that returned success is readable here.
    ///
    /// # Errors
    ///
    /// Returns adapter/store failures unchanged.
    pub async fn query_memory(&self, pattern: &MemoryPattern) -> Result<Vec<Binding>, EngineError> {
        let rows = self.adapter.query(pattern).await?;
        tracing::debug!(
            event = MemoryEvent::QueryExecuted.as_str(),
            graph = %pattern.graph(),
            rows = rows.len(),
            "long-term memory query executed"
        );
        Ok(rows)
    }

    /// Structured snapshot of one session's short-term memory.
    ///
    /// # Errors
    ///
    /// Fails on an invalid session id, a stopped server, or a timeout.
    pub async fn summary(&self, session: &str) -> Result<StmSummary, EngineError> {
        let session_id = Self::parse_session(session)?;
        let handle = self.registry.get_or_start(&session_id).await?;
        handle.summary().await
    }

    /// Stop one session's server, discarding its ephemeral memory.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::SessionNotFound`] when no server owns the id.
    pub async fn stop_session(&self, session: &str, reason: &str) -> Result<(), EngineError> {
        let session_id = Self::parse_session(session)?;
        self.registry.stop(&session_id, reason).await
    }

    /// Whether a live server currently owns the session.
    ///
    /// # Errors
    ///
    /// Fails only on an invalid session id.
    pub async fn has_session(&self, session: &str) -> Result<bool, EngineError> {
        let session_id = Self::parse_session(session)?;
        Ok(self.registry.lookup(&session_id).await.is_ok())
    }

    /// Ids of currently registered sessions.
    pub async fn active_sessions(&self) -> Vec<SessionId> {
        self.registry.active_sessions().await
    }

    /// Shared long-term memory adapter.
    #[must_use]
    pub fn adapter(&self) -> &LtmAdapter<S> {
        &self.adapter
    }

    /// Standard graphs this service initialized at startup.
    #[must_use]
    pub fn standard_graphs(&self) -> &[NamedGraph] {
        &self.config.standard_graphs
    }

    /// Engine configuration in effect.
    #[must_use]
    pub fn config(&self) -> &MemoryConfig {
        &self.config
    }
}
