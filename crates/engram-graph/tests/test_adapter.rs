//! Integration tests for the long-term memory adapter and triple mapping.

use chrono::Utc;
use engram_graph::{LtmAdapter, MemoryPattern, MemoryTripleStore, Term, ontology};
use engram_types::{MemoryRecord, MemoryType, NamedGraph};
use serde_json::{Map, json};

fn record(id: &str, memory_type: MemoryType, graph: NamedGraph) -> MemoryRecord {
    let mut content = Map::new();
    content.insert("statement".to_string(), json!("tokio powers the runtime"));
    MemoryRecord {
        id: id.to_string(),
        memory_type,
        content,
        importance: 0.9,
        confidence: 0.86,
        source: "stm_promotion".to_string(),
        verified: false,
        created_at: Utc::now(),
        updated_at: None,
        graph,
    }
}

#[tokio::test]
async fn persist_writes_the_full_triple_mapping() {
    let adapter = LtmAdapter::new(MemoryTripleStore::new());
    let graph = NamedGraph::LongTermContext;
    adapter.ensure_graphs(&[graph.clone()]).await.unwrap();

    let receipt = adapter
        .persist(&record("mem-1", MemoryType::Fact, graph.clone()))
        .await
        .unwrap();
    assert_eq!(receipt.subject, ontology::subject_iri("mem-1"));
    assert!(!receipt.updated);

    // One triple per mapped property, no updatedAt on first write.
    assert_eq!(adapter.graph_len(&graph).await.unwrap(), 7);

    let type_rows = adapter
        .query(
            &MemoryPattern::for_graph(graph.clone())
                .with_memory_id("mem-1")
                .with_predicate(ontology::RDF_TYPE),
        )
        .await
        .unwrap();
    assert_eq!(type_rows.len(), 1);
    assert_eq!(
        type_rows[0]["o"],
        Term::iri(ontology::class_iri("Fact"))
    );
}

#[tokio::test]
async fn persist_same_id_keeps_exactly_one_record() {
    let adapter = LtmAdapter::new(MemoryTripleStore::new());
    let graph = NamedGraph::SystemKnowledge;

    let mut first = record("mem-dup", MemoryType::Convention, graph.clone());
    adapter.persist(&first).await.unwrap();

    first
        .content
        .insert("revision".to_string(), json!(2));
    let receipt = adapter.persist(&first).await.unwrap();
    assert!(receipt.updated);

    assert_eq!(adapter.count_memories(&graph).await.unwrap(), 1);

    let stored = adapter
        .find_by_id(&graph, "mem-dup")
        .await
        .unwrap()
        .unwrap();
    assert_eq!(stored.content["revision"], json!(2));
    // Explicit update stamps a fresh update instant.
    assert!(stored.updated_at.is_some());
}

#[tokio::test]
async fn find_by_id_round_trips_the_record() {
    let adapter = LtmAdapter::new(MemoryTripleStore::new());
    let graph = NamedGraph::ElixirCodebase;
    let original = record("mem-rt", MemoryType::FileContext, graph.clone());
    adapter.persist(&original).await.unwrap();

    let stored = adapter
        .find_by_id(&graph, "mem-rt")
        .await
        .unwrap()
        .unwrap();
    assert_eq!(stored.memory_type, MemoryType::FileContext);
    assert_eq!(stored.content, original.content);
    assert_eq!(stored.source, original.source);
    assert_eq!(stored.verified, original.verified);
    assert!((stored.confidence - original.confidence).abs() < 1e-9);
    assert!((stored.importance - original.importance).abs() < 1e-9);

    assert!(
        adapter
            .find_by_id(&graph, "missing-id")
            .await
            .unwrap()
            .is_none()
    );
}

#[tokio::test]
async fn clear_then_query_returns_zero_rows() {
    let adapter = LtmAdapter::new(MemoryTripleStore::new());
    let graph = NamedGraph::ConversationHistory;
    adapter
        .persist(&record("mem-c", MemoryType::Conversation, graph.clone()))
        .await
        .unwrap();

    adapter.clear(&graph).await.unwrap();
    let rows = adapter
        .query(&MemoryPattern::for_graph(graph))
        .await
        .unwrap();
    assert!(rows.is_empty());
}

#[tokio::test]
async fn type_pattern_selects_matching_records_only() {
    let adapter = LtmAdapter::new(MemoryTripleStore::new());
    let graph = NamedGraph::LongTermContext;
    adapter
        .persist(&record("mem-f", MemoryType::Fact, graph.clone()))
        .await
        .unwrap();
    adapter
        .persist(&record("mem-d", MemoryType::Decision, graph.clone()))
        .await
        .unwrap();

    let decisions = adapter
        .query(&MemoryPattern::for_graph(graph).with_type(MemoryType::Decision))
        .await
        .unwrap();
    assert_eq!(decisions.len(), 1);
    assert_eq!(
        decisions[0]["s"],
        Term::iri(ontology::subject_iri("mem-d"))
    );
}
