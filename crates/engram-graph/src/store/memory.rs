//! In-process triple store backed by a concurrent graph table.

use std::collections::HashMap;

use async_trait::async_trait;
use dashmap::DashMap;

use engram_types::NamedGraph;

use crate::store::{GraphStoreError, TripleStore};
use crate::triple::{Binding, Triple, TriplePattern};

/// Per-graph statement storage, indexed by subject for cheap id-level
/// replacement.
#[derive(Debug, Default)]
struct GraphData {
    by_subject: HashMap<String, Vec<Triple>>,
}

impl GraphData {
    fn len(&self) -> usize {
        self.by_subject.values().map(Vec::len).sum()
    }
}

/// In-memory triple store. Graph-level entries live in a concurrent map, so
/// writes to one graph serialize against each other while distinct graphs
/// proceed in parallel. Queries over an absent graph return no rows.
#[derive(Debug, Default)]
pub struct MemoryTripleStore {
    graphs: DashMap<String, GraphData>,
}

impl MemoryTripleStore {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of known graphs.
    #[must_use]
    pub fn graph_count(&self) -> usize {
        self.graphs.len()
    }
}

#[async_trait]
impl TripleStore for MemoryTripleStore {
    fn backend_name(&self) -> &'static str {
        "memory"
    }

    async fn ensure_graph(&self, graph: &NamedGraph) -> Result<(), GraphStoreError> {
        self.graphs.entry(graph.iri()).or_default();
        log::debug!("ensured graph {graph}");
        Ok(())
    }

    async fn insert(&self, graph: &NamedGraph, triples: Vec<Triple>) -> Result<(), GraphStoreError> {
        let mut data = self.graphs.entry(graph.iri()).or_default();
        let count = triples.len();
        for triple in triples {
            data.by_subject
                .entry(triple.subject.clone())
                .or_default()
                .push(triple);
        }
        log::debug!("inserted {count} triple(s) into {graph}");
        Ok(())
    }

    async fn remove_subject(
        &self,
        graph: &NamedGraph,
        subject: &str,
    ) -> Result<usize, GraphStoreError> {
        let Some(mut data) = self.graphs.get_mut(&graph.iri()) else {
            return Ok(0);
        };
        let removed = data
            .by_subject
            .remove(subject)
            .map_or(0, |triples| triples.len());
        Ok(removed)
    }

    async fn query(&self, pattern: &TriplePattern) -> Result<Vec<Binding>, GraphStoreError> {
        let Some(data) = self.graphs.get(&pattern.graph.iri()) else {
            return Ok(Vec::new());
        };

        let rows = match &pattern.subject {
            Some(subject) => data.by_subject.get(subject).map_or_else(Vec::new, |triples| {
                triples
                    .iter()
                    .filter(|t| pattern.matches(t))
                    .map(|t| pattern.bind(t))
                    .collect()
            }),
            None => data
                .by_subject
                .values()
                .flatten()
                .filter(|t| pattern.matches(t))
                .map(|t| pattern.bind(t))
                .collect(),
        };
        Ok(rows)
    }

    async fn clear(&self, graph: &NamedGraph) -> Result<(), GraphStoreError> {
        self.graphs.entry(graph.iri()).or_default().by_subject.clear();
        log::info!("cleared graph {graph}");
        Ok(())
    }

    async fn graph_len(&self, graph: &NamedGraph) -> Result<usize, GraphStoreError> {
        Ok(self.graphs.get(&graph.iri()).map_or(0, |data| data.len()))
    }
}
