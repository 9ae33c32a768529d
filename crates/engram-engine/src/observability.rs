//! Observability event ids emitted through `tracing`.

/// Structured event identifiers for the memory engine. Every `tracing` call
/// in this crate carries one of these as its `event` field so downstream
/// pipelines can filter on stable ids.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MemoryEvent {
    /// A session memory server started.
    SessionStarted,
    /// A session memory server stopped and deregistered.
    SessionStopped,
    /// A session server shut down after its idle timeout.
    SessionIdleTimeout,
    /// An explicit stop was requested for a session.
    SessionStopRequested,
    /// A message was appended to a session's conversation buffer.
    MessageAdded,
    /// A working context key was written.
    ContextPut,
    /// A working context key was deleted.
    ContextDeleted,
    /// A promotion candidate was enqueued.
    PendingEnqueued,
    /// One promotion call finished.
    PromotionCompleted,
    /// A single candidate failed during promotion.
    PromotionItemFailed,
    /// The standard named graphs were initialized.
    GraphsEnsured,
    /// A long-term memory query was executed.
    QueryExecuted,
}

impl MemoryEvent {
    /// Every event id, for registry-style assertions.
    pub const ALL: [Self; 12] = [
        Self::SessionStarted,
        Self::SessionStopped,
        Self::SessionIdleTimeout,
        Self::SessionStopRequested,
        Self::MessageAdded,
        Self::ContextPut,
        Self::ContextDeleted,
        Self::PendingEnqueued,
        Self::PromotionCompleted,
        Self::PromotionItemFailed,
        Self::GraphsEnsured,
        Self::QueryExecuted,
    ];

    /// Stable dotted id of this event.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::SessionStarted => "memory.session.started",
            Self::SessionStopped => "memory.session.stopped",
            Self::SessionIdleTimeout => "memory.session.idle_timeout",
            Self::SessionStopRequested => "memory.session.stop_requested",
            Self::MessageAdded => "memory.stm.message_added",
            Self::ContextPut => "memory.stm.context_put",
            Self::ContextDeleted => "memory.stm.context_deleted",
            Self::PendingEnqueued => "memory.stm.pending_enqueued",
            Self::PromotionCompleted => "memory.promotion.completed",
            Self::PromotionItemFailed => "memory.promotion.item_failed",
            Self::GraphsEnsured => "memory.ltm.graphs_ensured",
            Self::QueryExecuted => "memory.ltm.query_executed",
        }
    }
}
