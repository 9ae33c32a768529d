//! Engine error taxonomy.

use thiserror::Error;

use engram_graph::AdapterError;
use engram_stm::StmError;
use engram_types::SessionIdError;

/// Errors surfaced by the session-addressed memory API.
///
/// Sub-component errors pass through unchanged; none of these are fatal to
/// the owning session server except where documented.
#[derive(Debug, Error)]
pub enum EngineError {
    /// The caller-supplied session id failed validation.
    #[error(transparent)]
    InvalidSessionId(#[from] SessionIdError),
    /// No running server owns this session.
    #[error("session not found: {0}")]
    SessionNotFound(String),
    /// The owning server is stopping or already terminated; retry via
    /// `get_or_start`.
    #[error("session is stopping or stopped: {0}")]
    SessionStopped(String),
    /// The request timed out before a reply arrived. The server applies
    /// mutations atomically per request, so no partial state is left behind.
    #[error("request timed out after {timeout_ms} ms")]
    Timeout {
        /// Configured per-request timeout.
        timeout_ms: u64,
    },
    /// Structured short-term memory error (capacity, queue-full, not-found).
    #[error(transparent)]
    Stm(#[from] StmError),
    /// Long-term memory adapter failure.
    #[error(transparent)]
    Adapter(#[from] AdapterError),
}

impl EngineError {
    /// Whether this error left all state unchanged.
    #[must_use]
    pub fn is_clean_rejection(&self) -> bool {
        matches!(
            self,
            Self::InvalidSessionId(_) | Self::SessionNotFound(_) | Self::Stm(_)
        )
    }
}
