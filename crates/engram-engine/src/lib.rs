//! engram-engine - Two-tier session memory engine.
//!
//! Binds the short-term structures of `engram-stm` and the long-term graph
//! adapter of `engram-graph` into a session-addressed service:
//!
//! ```text
//! caller ──▶ MemoryService ──▶ SessionRegistry ──▶ SessionHandle (mpsc)
//!                                                      │
//!                                        one task per session, owning
//!                                        its ShortTermMemory exclusively
//!                                                      │
//!                               promotion pass ──▶ LtmAdapter (shared)
//! ```
//!
//! Within a session every operation is serialized and linearizable; across
//! sessions only the adapter is shared. Short-term memory is ephemeral by
//! design: a restarted session begins empty.
//!
//! # Example
//!
//! ```rust,ignore
//! use engram_engine::{MemoryConfig, MemoryService, PromotionMode};
//! use engram_graph::MemoryTripleStore;
//! use engram_types::MessageRole;
//!
//! let service = MemoryService::new(MemoryTripleStore::new(), MemoryConfig::default()).await?;
//! service.add_text_message("session-1", MessageRole::User, "hello").await?;
//! let report = service.promote("session-1", PromotionMode::Implicit).await?;
//! ```

mod config;
mod error;
mod observability;
mod promotion;
mod registry;
mod server;
mod service;

pub use config::{MemoryConfig, PromotionCriteria};
pub use error::EngineError;
pub use observability::MemoryEvent;
pub use promotion::{
    FailedItem, HIGH_IMPORTANCE_THRESHOLD, PromotedItem, PromotionMode, PromotionReport,
    SkippedItem, infer_memory_type, run_promotion, target_graph,
};
pub use registry::SessionRegistry;
pub use server::{AddMessageOutcome, SessionHandle};
pub use service::MemoryService;
