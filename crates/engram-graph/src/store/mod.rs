//! Triple store capability and its backends.

use async_trait::async_trait;
use thiserror::Error;

use engram_types::NamedGraph;

use crate::triple::{Binding, Triple, TriplePattern};

pub mod memory;
pub mod sparql;

/// Errors raised by triple store backends.
#[derive(Debug, Error)]
pub enum GraphStoreError {
    /// The named graph is unknown to the backend.
    #[error("named graph not found: {0}")]
    GraphNotFound(String),
    /// Backend-specific failure (I/O, protocol, serialization).
    #[error(transparent)]
    Backend(#[from] anyhow::Error),
}

/// Storage capability backing the long-term memory adapter.
///
/// Implementations must provide read-your-writes consistency across callers:
/// an `insert` that has returned is visible to every subsequent `query`.
/// Writes within one graph are serializable; locking discipline is the
/// backend's own concern.
#[async_trait]
pub trait TripleStore: Send + Sync {
    /// Backend identifier for logs and metrics.
    fn backend_name(&self) -> &'static str;

    /// Create the graph if absent. Idempotent.
    async fn ensure_graph(&self, graph: &NamedGraph) -> Result<(), GraphStoreError>;

    /// Insert statements into a graph.
    async fn insert(&self, graph: &NamedGraph, triples: Vec<Triple>) -> Result<(), GraphStoreError>;

    /// Remove every statement with the given subject from a graph.
    /// Returns the number of removed statements.
    async fn remove_subject(
        &self,
        graph: &NamedGraph,
        subject: &str,
    ) -> Result<usize, GraphStoreError>;

    /// Match a parameterized pattern; returns one binding row per match.
    async fn query(&self, pattern: &TriplePattern) -> Result<Vec<Binding>, GraphStoreError>;

    /// Remove all statements in a graph. The graph itself remains.
    async fn clear(&self, graph: &NamedGraph) -> Result<(), GraphStoreError>;

    /// Number of statements currently in a graph.
    async fn graph_len(&self, graph: &NamedGraph) -> Result<usize, GraphStoreError>;
}
