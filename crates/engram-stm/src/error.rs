//! Short-term memory errors.

use thiserror::Error;

/// Structured errors surfaced by STM sub-components. All of these leave the
/// state unchanged from before the failing call.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StmError {
    /// Working context is full and the key was new.
    #[error("working context capacity exceeded (max_items={max_items})")]
    CapacityExceeded {
        /// Configured context capacity.
        max_items: usize,
    },
    /// Pending memory queue is full.
    #[error("pending memory queue is full (max_size={max_size})")]
    QueueFull {
        /// Configured queue capacity.
        max_size: usize,
    },
    /// Requested context key is absent.
    #[error("context key not found: {key}")]
    KeyNotFound {
        /// The missing key.
        key: String,
    },
}
