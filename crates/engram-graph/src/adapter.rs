//! Long-term memory adapter: memory records in, triples out.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use thiserror::Error;

use engram_types::{MemoryRecord, MemoryType, NamedGraph};

use crate::store::{GraphStoreError, TripleStore};
use crate::triple::{Binding, Term, Triple, TriplePattern, ontology};

/// Errors surfaced by the adapter.
#[derive(Debug, Error)]
pub enum AdapterError {
    /// Triple store failure.
    #[error(transparent)]
    Store(#[from] GraphStoreError),
    /// A record could not be serialized into triples.
    #[error("failed to encode memory record {id}: {reason}")]
    Encode {
        /// Offending record id.
        id: String,
        /// Serialization failure detail.
        reason: String,
    },
    /// Stored triples could not be read back as a record.
    #[error("failed to decode memory record {id}: {reason}")]
    Decode {
        /// Offending record id.
        id: String,
        /// Decoding failure detail.
        reason: String,
    },
}

/// Receipt for one persisted record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PersistReceipt {
    /// Minted subject IRI the record was stored under.
    pub subject: String,
    /// Whether an existing copy of the id was replaced.
    pub updated: bool,
}

/// Parameterized memory-level graph pattern, lowered onto a
/// [`TriplePattern`] at query time.
#[derive(Debug, Clone, PartialEq)]
pub struct MemoryPattern {
    graph: NamedGraph,
    subject: Option<String>,
    predicate: Option<String>,
    object: Option<Term>,
}

impl MemoryPattern {
    /// Match everything in one graph.
    #[must_use]
    pub fn for_graph(graph: NamedGraph) -> Self {
        Self {
            graph,
            subject: None,
            predicate: None,
            object: None,
        }
    }

    /// Restrict to the subject minted for a memory id.
    #[must_use]
    pub fn with_memory_id(mut self, memory_id: &str) -> Self {
        self.subject = Some(ontology::subject_iri(memory_id));
        self
    }

    /// Restrict to an explicit subject IRI.
    #[must_use]
    pub fn with_subject_iri(mut self, subject: impl Into<String>) -> Self {
        self.subject = Some(subject.into());
        self
    }

    /// Restrict to one predicate IRI.
    #[must_use]
    pub fn with_predicate(mut self, predicate: impl Into<String>) -> Self {
        self.predicate = Some(predicate.into());
        self
    }

    /// Restrict to one object term.
    #[must_use]
    pub fn with_object(mut self, object: Term) -> Self {
        self.object = Some(object);
        self
    }

    /// Restrict to records of one memory type (`rdf:type` edge).
    #[must_use]
    pub fn with_type(mut self, memory_type: MemoryType) -> Self {
        self.predicate = Some(ontology::RDF_TYPE.to_string());
        self.object = Some(Term::iri(ontology::class_iri(
            memory_type.ontology_class(),
        )));
        self
    }

    /// Target graph of this pattern.
    #[must_use]
    pub fn graph(&self) -> &NamedGraph {
        &self.graph
    }

    fn to_triple_pattern(&self) -> TriplePattern {
        TriplePattern {
            graph: self.graph.clone(),
            subject: self.subject.clone(),
            predicate: self.predicate.clone(),
            object: self.object.clone(),
        }
    }
}

/// Adapter translating [`MemoryRecord`] values to triples in named graphs.
///
/// The adapter is the single shared write path into long-term memory; it is
/// cheap to clone and safe to share across session servers. Persisting is
/// idempotent per record id: re-persisting replaces the stored copy and
/// stamps `updatedAt`, so a graph never holds two copies of one id and a
/// record is never silently overwritten without a fresh update instant.
pub struct LtmAdapter<S: TripleStore> {
    store: Arc<S>,
}

impl<S: TripleStore> Clone for LtmAdapter<S> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
        }
    }
}

impl<S: TripleStore> LtmAdapter<S> {
    /// Wrap a store.
    #[must_use]
    pub fn new(store: S) -> Self {
        Self {
            store: Arc::new(store),
        }
    }

    /// Wrap an already-shared store handle.
    #[must_use]
    pub fn from_shared(store: Arc<S>) -> Self {
        Self { store }
    }

    /// Backing store reference.
    #[must_use]
    pub fn store(&self) -> &S {
        &self.store
    }

    /// Initialize the given named graphs. Idempotent; called at startup.
    ///
    /// # Errors
    ///
    /// Returns the first backend failure.
    pub async fn ensure_graphs(&self, graphs: &[NamedGraph]) -> Result<(), AdapterError> {
        for graph in graphs {
            self.store.ensure_graph(graph).await?;
        }
        log::info!(
            "ensured {} named graph(s) on {} backend",
            graphs.len(),
            self.store.backend_name()
        );
        Ok(())
    }

    /// Persist one record into its graph.
    ///
    /// # Errors
    ///
    /// Returns [`AdapterError::Encode`] when the content map cannot be
    /// serialized, or a store error from the backend.
    pub async fn persist(&self, record: &MemoryRecord) -> Result<PersistReceipt, AdapterError> {
        let subject = ontology::subject_iri(&record.id);
        let replaced = self
            .store
            .remove_subject(&record.graph, &subject)
            .await?;
        let updated_at = if replaced > 0 {
            Some(Utc::now())
        } else {
            record.updated_at
        };
        let triples = record_to_triples(record, updated_at)?;
        self.store.insert(&record.graph, triples).await?;
        log::debug!(
            "persisted memory {} into {} (updated={})",
            record.id,
            record.graph,
            replaced > 0
        );
        Ok(PersistReceipt {
            subject,
            updated: replaced > 0,
        })
    }

    /// Read one record back by id, or `None` when absent.
    ///
    /// # Errors
    ///
    /// Returns [`AdapterError::Decode`] when the stored triples do not form
    /// a complete record, or a store error from the backend.
    pub async fn find_by_id(
        &self,
        graph: &NamedGraph,
        memory_id: &str,
    ) -> Result<Option<MemoryRecord>, AdapterError> {
        let pattern = TriplePattern::graph(graph.clone()).subject(ontology::subject_iri(memory_id));
        let rows = self.store.query(&pattern).await?;
        if rows.is_empty() {
            return Ok(None);
        }
        record_from_rows(memory_id, graph, &rows).map(Some)
    }

    /// Run a parameterized pattern query.
    ///
    /// # Errors
    ///
    /// Returns a store error from the backend.
    pub async fn query(&self, pattern: &MemoryPattern) -> Result<Vec<Binding>, AdapterError> {
        Ok(self.store.query(&pattern.to_triple_pattern()).await?)
    }

    /// Remove every statement in a graph. Test isolation helper.
    ///
    /// # Errors
    ///
    /// Returns a store error from the backend.
    pub async fn clear(&self, graph: &NamedGraph) -> Result<(), AdapterError> {
        Ok(self.store.clear(graph).await?)
    }

    /// Number of memory records in a graph (one `rdf:type` edge each).
    ///
    /// # Errors
    ///
    /// Returns a store error from the backend.
    pub async fn count_memories(&self, graph: &NamedGraph) -> Result<usize, AdapterError> {
        let pattern =
            TriplePattern::graph(graph.clone()).predicate(ontology::RDF_TYPE.to_string());
        Ok(self.store.query(&pattern).await?.len())
    }

    /// Number of statements in a graph.
    ///
    /// # Errors
    ///
    /// Returns a store error from the backend.
    pub async fn graph_len(&self, graph: &NamedGraph) -> Result<usize, AdapterError> {
        Ok(self.store.graph_len(graph).await?)
    }
}

/// Lower one record to its triple set.
fn record_to_triples(
    record: &MemoryRecord,
    updated_at: Option<DateTime<Utc>>,
) -> Result<Vec<Triple>, AdapterError> {
    let subject = ontology::subject_iri(&record.id);
    let content = serde_json::to_string(&record.content).map_err(|err| AdapterError::Encode {
        id: record.id.clone(),
        reason: err.to_string(),
    })?;

    let mut triples = vec![
        Triple::new(
            subject.clone(),
            ontology::RDF_TYPE,
            Term::iri(ontology::class_iri(record.memory_type.ontology_class())),
        ),
        Triple::new(subject.clone(), ontology::CONTENT, Term::string(content)),
        Triple::new(
            subject.clone(),
            ontology::TIMESTAMP,
            Term::date_time(record.created_at),
        ),
        Triple::new(
            subject.clone(),
            ontology::CONFIDENCE,
            Term::float(record.confidence),
        ),
        Triple::new(
            subject.clone(),
            ontology::IMPORTANCE,
            Term::float(record.importance),
        ),
        Triple::new(
            subject.clone(),
            ontology::SOURCE,
            Term::string(record.source.clone()),
        ),
        Triple::new(
            subject.clone(),
            ontology::VERIFIED,
            Term::boolean(record.verified),
        ),
    ];
    if let Some(updated_at) = updated_at {
        triples.push(Triple::new(
            subject,
            ontology::UPDATED_AT,
            Term::date_time(updated_at),
        ));
    }
    Ok(triples)
}

/// Rebuild a record from the `(p, o)` rows of one subject.
fn record_from_rows(
    memory_id: &str,
    graph: &NamedGraph,
    rows: &[Binding],
) -> Result<MemoryRecord, AdapterError> {
    let decode_err = |reason: &str| AdapterError::Decode {
        id: memory_id.to_string(),
        reason: reason.to_string(),
    };

    let mut memory_type = None;
    let mut content = None;
    let mut created_at = None;
    let mut confidence = None;
    let mut importance = None;
    let mut source = None;
    let mut verified = None;
    let mut updated_at = None;

    for row in rows {
        let Some(predicate) = row.get("p").and_then(Term::as_iri) else {
            continue;
        };
        let Some(object) = row.get("o") else {
            continue;
        };
        match predicate {
            ontology::RDF_TYPE => {
                memory_type = object
                    .as_iri()
                    .and_then(|iri| iri.strip_prefix(ontology::ONTOLOGY_NS))
                    .and_then(MemoryType::from_ontology_class);
            }
            ontology::CONTENT => {
                let lexical = object.as_lexical().unwrap_or_default();
                content = Some(
                    serde_json::from_str(lexical)
                        .map_err(|err| decode_err(&format!("content: {err}")))?,
                );
            }
            ontology::TIMESTAMP => created_at = object.as_date_time(),
            ontology::CONFIDENCE => confidence = object.as_f64(),
            ontology::IMPORTANCE => importance = object.as_f64(),
            ontology::SOURCE => source = object.as_lexical().map(str::to_string),
            ontology::VERIFIED => verified = object.as_bool(),
            ontology::UPDATED_AT => updated_at = object.as_date_time(),
            _ => {}
        }
    }

    Ok(MemoryRecord {
        id: memory_id.to_string(),
        memory_type: memory_type.ok_or_else(|| decode_err("missing rdf:type"))?,
        content: content.ok_or_else(|| decode_err("missing content"))?,
        importance: importance.ok_or_else(|| decode_err("missing importance"))?,
        confidence: confidence.ok_or_else(|| decode_err("missing confidence"))?,
        source: source.ok_or_else(|| decode_err("missing source"))?,
        verified: verified.ok_or_else(|| decode_err("missing verified"))?,
        created_at: created_at.ok_or_else(|| decode_err("missing timestamp"))?,
        updated_at,
        graph: graph.clone(),
    })
}
