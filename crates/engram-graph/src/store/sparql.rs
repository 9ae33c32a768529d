//! Remote SPARQL 1.1 endpoint backend.
//!
//! Generates protocol-conformant update/query text and parses the standard
//! JSON results format. No SPARQL parsing happens here.

use std::collections::HashMap;

use anyhow::{Context, anyhow};
use async_trait::async_trait;
use serde::Deserialize;

use engram_types::NamedGraph;

use crate::store::{GraphStoreError, TripleStore};
use crate::triple::{Binding, Literal, Term, Triple, TriplePattern, ontology};

/// Triple store backed by a remote SPARQL endpoint (query + update URLs).
pub struct SparqlHttpStore {
    client: reqwest::Client,
    query_url: String,
    update_url: String,
}

impl SparqlHttpStore {
    /// Create a store for explicit query and update endpoint URLs.
    #[must_use]
    pub fn new(query_url: impl Into<String>, update_url: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            query_url: query_url.into(),
            update_url: update_url.into(),
        }
    }

    /// Create a store for a dataset base URL using the conventional
    /// `/query` and `/update` service paths.
    #[must_use]
    pub fn for_endpoint(base_url: &str) -> Self {
        let base = base_url.trim_end_matches('/');
        Self::new(format!("{base}/query"), format!("{base}/update"))
    }

    async fn run_update(&self, update: String) -> Result<(), GraphStoreError> {
        let response = self
            .client
            .post(&self.update_url)
            .form(&[("update", update.as_str())])
            .send()
            .await
            .context("sparql update request failed")?;
        let status = response.status();
        if !status.is_success() {
            return Err(anyhow!("sparql update rejected with status {status}").into());
        }
        Ok(())
    }

    async fn run_select(&self, query: String) -> Result<Vec<Binding>, GraphStoreError> {
        let response = self
            .client
            .post(&self.query_url)
            .header(reqwest::header::ACCEPT, "application/sparql-results+json")
            .form(&[("query", query.as_str())])
            .send()
            .await
            .context("sparql query request failed")?;
        let status = response.status();
        if !status.is_success() {
            return Err(anyhow!("sparql query rejected with status {status}").into());
        }
        let results: SparqlResults = response
            .json()
            .await
            .context("failed to decode sparql json results")?;
        Ok(rows_from_results(results))
    }

    async fn count_with(&self, query: String) -> Result<usize, GraphStoreError> {
        let rows = self.run_select(query).await?;
        let count = rows
            .first()
            .and_then(|row| row.get("n"))
            .and_then(Term::as_lexical)
            .and_then(|v| v.parse::<usize>().ok())
            .unwrap_or(0);
        Ok(count)
    }
}

#[async_trait]
impl TripleStore for SparqlHttpStore {
    fn backend_name(&self) -> &'static str {
        "sparql"
    }

    async fn ensure_graph(&self, graph: &NamedGraph) -> Result<(), GraphStoreError> {
        self.run_update(format!("CREATE SILENT GRAPH <{}>", graph.iri()))
            .await?;
        log::debug!("ensured remote graph {graph}");
        Ok(())
    }

    async fn insert(&self, graph: &NamedGraph, triples: Vec<Triple>) -> Result<(), GraphStoreError> {
        if triples.is_empty() {
            return Ok(());
        }
        self.run_update(insert_data(&graph.iri(), &triples)).await
    }

    async fn remove_subject(
        &self,
        graph: &NamedGraph,
        subject: &str,
    ) -> Result<usize, GraphStoreError> {
        let graph_iri = graph.iri();
        let existing = self
            .count_with(format!(
                "SELECT (COUNT(*) AS ?n) WHERE {{ GRAPH <{graph_iri}> {{ <{subject}> ?p ?o }} }}"
            ))
            .await?;
        if existing > 0 {
            self.run_update(format!(
                "DELETE WHERE {{ GRAPH <{graph_iri}> {{ <{subject}> ?p ?o }} }}"
            ))
            .await?;
        }
        Ok(existing)
    }

    async fn query(&self, pattern: &TriplePattern) -> Result<Vec<Binding>, GraphStoreError> {
        self.run_select(select_query(pattern)).await
    }

    async fn clear(&self, graph: &NamedGraph) -> Result<(), GraphStoreError> {
        self.run_update(format!("CLEAR SILENT GRAPH <{}>", graph.iri()))
            .await?;
        log::info!("cleared remote graph {graph}");
        Ok(())
    }

    async fn graph_len(&self, graph: &NamedGraph) -> Result<usize, GraphStoreError> {
        self.count_with(format!(
            "SELECT (COUNT(*) AS ?n) WHERE {{ GRAPH <{}> {{ ?s ?p ?o }} }}",
            graph.iri()
        ))
        .await
    }
}

// ── SPARQL text generation ───────────────────────────────────────────────────

fn escape_literal(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for ch in value.chars() {
        match ch {
            '\\' => out.push_str("\\\\"),
            '"' => out.push_str("\\\""),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            _ => out.push(ch),
        }
    }
    out
}

fn format_term(term: &Term) -> String {
    match term {
        Term::Iri(iri) => format!("<{iri}>"),
        Term::Literal(Literal { lexical, datatype }) => {
            let escaped = escape_literal(lexical);
            if datatype == ontology::XSD_STRING {
                format!("\"{escaped}\"")
            } else {
                format!("\"{escaped}\"^^<{datatype}>")
            }
        }
    }
}

fn insert_data(graph_iri: &str, triples: &[Triple]) -> String {
    let mut body = String::new();
    for triple in triples {
        body.push_str(&format!(
            "    <{}> <{}> {} .\n",
            triple.subject,
            triple.predicate,
            format_term(&triple.object)
        ));
    }
    format!("INSERT DATA {{ GRAPH <{graph_iri}> {{\n{body}}} }}")
}

fn select_query(pattern: &TriplePattern) -> String {
    let subject = pattern
        .subject
        .as_ref()
        .map_or_else(|| "?s".to_string(), |iri| format!("<{iri}>"));
    let predicate = pattern
        .predicate
        .as_ref()
        .map_or_else(|| "?p".to_string(), |iri| format!("<{iri}>"));
    let object = pattern
        .object
        .as_ref()
        .map_or_else(|| "?o".to_string(), format_term);

    let mut vars = Vec::new();
    if pattern.subject.is_none() {
        vars.push("?s");
    }
    if pattern.predicate.is_none() {
        vars.push("?p");
    }
    if pattern.object.is_none() {
        vars.push("?o");
    }
    let projection = if vars.is_empty() {
        "*".to_string()
    } else {
        vars.join(" ")
    };

    format!(
        "SELECT {projection} WHERE {{ GRAPH <{}> {{ {subject} {predicate} {object} }} }}",
        pattern.graph.iri()
    )
}

// ── SPARQL JSON results parsing ──────────────────────────────────────────────

#[derive(Debug, Deserialize)]
struct SparqlResults {
    results: SparqlResultRows,
}

#[derive(Debug, Deserialize)]
struct SparqlResultRows {
    bindings: Vec<HashMap<String, SparqlTerm>>,
}

#[derive(Debug, Deserialize)]
struct SparqlTerm {
    #[serde(rename = "type")]
    kind: String,
    value: String,
    #[serde(default)]
    datatype: Option<String>,
}

fn rows_from_results(results: SparqlResults) -> Vec<Binding> {
    results
        .results
        .bindings
        .into_iter()
        .map(|row| {
            row.into_iter()
                .map(|(var, term)| (var, term_from_sparql(term)))
                .collect()
        })
        .collect()
}

fn term_from_sparql(term: SparqlTerm) -> Term {
    match term.kind.as_str() {
        "uri" => Term::Iri(term.value),
        "bnode" => Term::Iri(format!("_:{}", term.value)),
        _ => Term::Literal(Literal {
            lexical: term.value,
            datatype: term
                .datatype
                .unwrap_or_else(|| ontology::XSD_STRING.to_string()),
        }),
    }
}
