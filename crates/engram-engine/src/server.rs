//! Per-session memory server: one task, one mailbox, one STM value.
//!
//! Every session's short-term memory is exclusively owned by a single tokio
//! task that drains a bounded mailbox of request variants, so all mutations
//! for one session are serialized and linearizable. Lifecycle: construction
//! (initializing) → mailbox loop (idle/processing) → stop signal or idle
//! timeout (stopping) → deregistration (terminal).

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tokio::sync::{RwLock, mpsc, oneshot};

use engram_graph::{LtmAdapter, TripleStore};
use engram_stm::{ShortTermMemory, StmSummary};
use engram_types::{Message, MessageRole, PendingItem, SessionId};

use crate::config::{MemoryConfig, PromotionCriteria};
use crate::error::EngineError;
use crate::observability::MemoryEvent;
use crate::promotion::{PromotionMode, PromotionReport, run_promotion};

type Reply<T> = oneshot::Sender<Result<T, EngineError>>;

/// Result of appending one message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AddMessageOutcome {
    /// Messages held after the append.
    pub count: usize,
    /// Estimated tokens held after the append.
    pub tokens: usize,
    /// Ids of evicted messages, oldest first.
    pub evicted_ids: Vec<String>,
}

/// Mailbox protocol of one session server.
pub(crate) enum StmRequest {
    AddMessage {
        role: MessageRole,
        content: String,
        metadata: Map<String, Value>,
        reply: Reply<AddMessageOutcome>,
    },
    RecentMessages {
        limit: Option<usize>,
        reply: Reply<Vec<Message>>,
    },
    PutContext {
        key: String,
        value: Value,
        reply: Reply<()>,
    },
    PutContextMany {
        values: Map<String, Value>,
        reply: Reply<()>,
    },
    GetContext {
        key: String,
        default: Option<Value>,
        reply: Reply<Value>,
    },
    DeleteContext {
        key: String,
        reply: Reply<bool>,
    },
    ContextKeys {
        reply: Reply<Vec<String>>,
    },
    EnqueueMemory {
        item: PendingItem,
        reply: Reply<String>,
    },
    Promote {
        mode: PromotionMode,
        criteria: Option<PromotionCriteria>,
        reply: Reply<PromotionReport>,
    },
    Summary {
        reply: Reply<StmSummary>,
    },
    IsEmpty {
        reply: Reply<bool>,
    },
    Stop {
        reply: oneshot::Sender<()>,
    },
}

/// Cloneable client handle to one session server. Requests queue FIFO on the
/// bounded mailbox; every call carries the configured per-request timeout.
#[derive(Clone, Debug)]
pub struct SessionHandle {
    session_id: SessionId,
    tx: mpsc::Sender<StmRequest>,
    request_timeout: Duration,
}

impl SessionHandle {
    /// Session this handle addresses.
    #[must_use]
    pub fn session_id(&self) -> &SessionId {
        &self.session_id
    }

    /// Whether the owning server has terminated.
    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }

    async fn call<T>(
        &self,
        build: impl FnOnce(Reply<T>) -> StmRequest,
    ) -> Result<T, EngineError> {
        let (reply_tx, reply_rx) = oneshot::channel();
        let request = build(reply_tx);
        let stopped = || EngineError::SessionStopped(self.session_id.to_string());

        let exchange = async {
            self.tx.send(request).await.map_err(|_| stopped())?;
            reply_rx.await.map_err(|_| stopped())?
        };
        match tokio::time::timeout(self.request_timeout, exchange).await {
            Ok(result) => result,
            Err(_) => Err(EngineError::Timeout {
                timeout_ms: u64::try_from(self.request_timeout.as_millis()).unwrap_or(u64::MAX),
            }),
        }
    }

    /// Append a message to the session's conversation buffer.
    ///
    /// # Errors
    ///
    /// Fails when the server has stopped or the request times out.
    pub async fn add_message(
        &self,
        role: MessageRole,
        content: String,
        metadata: Map<String, Value>,
    ) -> Result<AddMessageOutcome, EngineError> {
        self.call(|reply| StmRequest::AddMessage {
            role,
            content,
            metadata,
            reply,
        })
        .await
    }

    /// Last `limit` messages in order; `None` returns all.
    ///
    /// # Errors
    ///
    /// Fails when the server has stopped or the request times out.
    pub async fn recent_messages(
        &self,
        limit: Option<usize>,
    ) -> Result<Vec<Message>, EngineError> {
        self.call(|reply| StmRequest::RecentMessages { limit, reply })
            .await
    }

    /// Write one working context key.
    ///
    /// # Errors
    ///
    /// Surfaces `CapacityExceeded` unchanged; fails when the server has
    /// stopped or the request times out.
    pub async fn put_context(&self, key: String, value: Value) -> Result<(), EngineError> {
        self.call(|reply| StmRequest::PutContext { key, value, reply })
            .await
    }

    /// Write a batch of context keys atomically.
    ///
    /// # Errors
    ///
    /// Surfaces `CapacityExceeded` unchanged; no partial update happens.
    pub async fn put_context_many(&self, values: Map<String, Value>) -> Result<(), EngineError> {
        self.call(|reply| StmRequest::PutContextMany { values, reply })
            .await
    }

    /// Read one context key, optionally with a default for the missing case.
    ///
    /// # Errors
    ///
    /// Surfaces `KeyNotFound` when the key is absent and no default was
    /// given.
    pub async fn get_context(
        &self,
        key: String,
        default: Option<Value>,
    ) -> Result<Value, EngineError> {
        self.call(|reply| StmRequest::GetContext {
            key,
            default,
            reply,
        })
        .await
    }

    /// Delete one context key. Idempotent; returns prior presence.
    ///
    /// # Errors
    ///
    /// Fails when the server has stopped or the request times out.
    pub async fn delete_context(&self, key: String) -> Result<bool, EngineError> {
        self.call(|reply| StmRequest::DeleteContext { key, reply })
            .await
    }

    /// Present context keys, unordered.
    ///
    /// # Errors
    ///
    /// Fails when the server has stopped or the request times out.
    pub async fn context_keys(&self) -> Result<Vec<String>, EngineError> {
        self.call(|reply| StmRequest::ContextKeys { reply }).await
    }

    /// Queue a promotion candidate; returns its (possibly minted) id.
    ///
    /// # Errors
    ///
    /// Surfaces `QueueFull` unchanged.
    pub async fn enqueue_memory(&self, item: PendingItem) -> Result<String, EngineError> {
        self.call(|reply| StmRequest::EnqueueMemory { item, reply })
            .await
    }

    /// Run one promotion pass with the server's default criteria or an
    /// explicit override.
    ///
    /// # Errors
    ///
    /// Fails when the server has stopped or the request times out; per-item
    /// promotion failures land in the report instead.
    pub async fn promote(
        &self,
        mode: PromotionMode,
        criteria: Option<PromotionCriteria>,
    ) -> Result<PromotionReport, EngineError> {
        self.call(|reply| StmRequest::Promote {
            mode,
            criteria,
            reply,
        })
        .await
    }

    /// Structured snapshot of the session's short-term memory.
    ///
    /// # Errors
    ///
    /// Fails when the server has stopped or the request times out.
    pub async fn summary(&self) -> Result<StmSummary, EngineError> {
        self.call(|reply| StmRequest::Summary { reply }).await
    }

    /// Whether buffer, context, and pending queue are all empty.
    ///
    /// # Errors
    ///
    /// Fails when the server has stopped or the request times out.
    pub async fn is_empty(&self) -> Result<bool, EngineError> {
        self.call(|reply| StmRequest::IsEmpty { reply }).await
    }

    /// Ask the server to stop. Idempotent: a server that is already gone
    /// counts as stopped.
    pub async fn stop(&self) {
        let (reply_tx, reply_rx) = oneshot::channel();
        if self.tx.send(StmRequest::Stop { reply: reply_tx }).await.is_ok() {
            let _ = reply_rx.await;
        }
    }
}

/// The owning task state for one session.
pub(crate) struct SessionServer<S: TripleStore> {
    stm: ShortTermMemory,
    adapter: LtmAdapter<S>,
    criteria: PromotionCriteria,
    idle_timeout: Duration,
    sessions: Arc<RwLock<HashMap<SessionId, SessionHandle>>>,
}

impl<S: TripleStore + 'static> SessionServer<S> {
    /// Spawn the server task for `session_id` and return its handle.
    pub(crate) fn spawn(
        session_id: SessionId,
        config: &MemoryConfig,
        adapter: LtmAdapter<S>,
        sessions: Arc<RwLock<HashMap<SessionId, SessionHandle>>>,
    ) -> SessionHandle {
        let (tx, rx) = mpsc::channel(config.mailbox_capacity.max(1));
        let handle = SessionHandle {
            session_id: session_id.clone(),
            tx,
            request_timeout: Duration::from_millis(config.request_timeout_ms.max(1)),
        };
        let server = Self {
            stm: ShortTermMemory::new(session_id, &config.stm()),
            adapter,
            criteria: config.promotion.clone(),
            idle_timeout: Duration::from_secs(config.idle_timeout_secs.max(1)),
            sessions,
        };
        tokio::spawn(server.run(rx));
        handle
    }

    async fn run(mut self, mut rx: mpsc::Receiver<StmRequest>) {
        tracing::info!(
            event = MemoryEvent::SessionStarted.as_str(),
            session_id = %self.stm.session_id(),
            "session memory server started"
        );

        loop {
            let idle = tokio::time::sleep(self.idle_timeout);
            tokio::pin!(idle);
            tokio::select! {
                request = rx.recv() => match request {
                    Some(StmRequest::Stop { reply }) => {
                        let _ = reply.send(());
                        break;
                    }
                    Some(request) => self.handle(request).await,
                    None => break,
                },
                () = &mut idle => {
                    tracing::info!(
                        event = MemoryEvent::SessionIdleTimeout.as_str(),
                        session_id = %self.stm.session_id(),
                        idle_secs = self.idle_timeout.as_secs(),
                        "session memory server idle timeout"
                    );
                    break;
                }
            }
        }

        rx.close();
        let session_id = self.stm.session_id().clone();
        self.sessions.write().await.remove(&session_id);
        tracing::info!(
            event = MemoryEvent::SessionStopped.as_str(),
            session_id = %session_id,
            "session memory server stopped"
        );
    }

    async fn handle(&mut self, request: StmRequest) {
        match request {
            StmRequest::AddMessage {
                role,
                content,
                metadata,
                reply,
            } => {
                let message = Message::new(role, content).with_metadata(metadata);
                let evicted = self.stm.add_message(message);
                let outcome = AddMessageOutcome {
                    count: self.stm.message_count(),
                    tokens: self.stm.token_count(),
                    evicted_ids: evicted.into_iter().map(|m| m.id).collect(),
                };
                tracing::debug!(
                    event = MemoryEvent::MessageAdded.as_str(),
                    session_id = %self.stm.session_id(),
                    count = outcome.count,
                    tokens = outcome.tokens,
                    evicted = outcome.evicted_ids.len(),
                    "message appended"
                );
                let _ = reply.send(Ok(outcome));
            }
            StmRequest::RecentMessages { limit, reply } => {
                let messages = self
                    .stm
                    .recent_messages(limit)
                    .into_iter()
                    .cloned()
                    .collect();
                let _ = reply.send(Ok(messages));
            }
            StmRequest::PutContext { key, value, reply } => {
                let result = self.stm.put_context(&key, value).map_err(EngineError::from);
                if result.is_ok() {
                    tracing::debug!(
                        event = MemoryEvent::ContextPut.as_str(),
                        session_id = %self.stm.session_id(),
                        key = %key,
                        "context key written"
                    );
                }
                let _ = reply.send(result);
            }
            StmRequest::PutContextMany { values, reply } => {
                let result = self.stm.put_context_many(values).map_err(EngineError::from);
                let _ = reply.send(result);
            }
            StmRequest::GetContext {
                key,
                default,
                reply,
            } => {
                let result = match default {
                    Some(default) => Ok(self.stm.get_context_or(&key, default)),
                    None => self
                        .stm
                        .get_context(&key)
                        .cloned()
                        .map_err(EngineError::from),
                };
                let _ = reply.send(result);
            }
            StmRequest::DeleteContext { key, reply } => {
                let removed = self.stm.delete_context(&key);
                tracing::debug!(
                    event = MemoryEvent::ContextDeleted.as_str(),
                    session_id = %self.stm.session_id(),
                    key = %key,
                    removed,
                    "context key deleted"
                );
                let _ = reply.send(Ok(removed));
            }
            StmRequest::ContextKeys { reply } => {
                let _ = reply.send(Ok(self.stm.context_keys()));
            }
            StmRequest::EnqueueMemory { mut item, reply } => {
                if item.id.trim().is_empty() {
                    item.id = uuid::Uuid::new_v4().to_string();
                }
                let id = item.id.clone();
                let result = self
                    .stm
                    .enqueue_pending(item)
                    .map(|()| id.clone())
                    .map_err(EngineError::from);
                if result.is_ok() {
                    tracing::debug!(
                        event = MemoryEvent::PendingEnqueued.as_str(),
                        session_id = %self.stm.session_id(),
                        candidate_id = %id,
                        pending = self.stm.pending_count(),
                        "promotion candidate enqueued"
                    );
                }
                let _ = reply.send(result);
            }
            StmRequest::Promote {
                mode,
                criteria,
                reply,
            } => {
                let criteria = criteria.unwrap_or_else(|| self.criteria.clone());
                let report =
                    run_promotion(&mut self.stm, &self.adapter, &criteria, mode, Utc::now()).await;
                let _ = reply.send(Ok(report));
            }
            StmRequest::Summary { reply } => {
                let _ = reply.send(Ok(self.stm.summary()));
            }
            StmRequest::IsEmpty { reply } => {
                let _ = reply.send(Ok(self.stm.is_empty()));
            }
            StmRequest::Stop { reply } => {
                // Handled in the run loop; kept for exhaustiveness.
                let _ = reply.send(());
            }
        }
    }
}
