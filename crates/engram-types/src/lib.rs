//! engram-types - Common type definitions for the engram memory engine.
//!
//! This crate provides the shared data model used across the engram crates:
//! session identity, conversation messages, pending promotion candidates,
//! long-term memory records, and the named graphs that partition long-term
//! storage by concern.

mod graph;
mod memory;
mod message;
mod pending;
mod session;

pub use graph::{GRAPH_NAMESPACE, NamedGraph};
pub use memory::{MemoryRecord, MemoryType};
pub use message::{Message, MessageRole};
pub use pending::PendingItem;
pub use session::{MAX_SESSION_ID_LEN, SessionId, SessionIdError};
