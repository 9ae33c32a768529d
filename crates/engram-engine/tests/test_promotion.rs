//! Integration tests for the promotion pipeline: batching, policy checks,
//! type inference, and adapter failure handling.

use std::sync::atomic::{AtomicBool, Ordering};

use anyhow::anyhow;
use async_trait::async_trait;
use chrono::{Duration, Utc};
use engram_engine::{PromotionCriteria, PromotionMode, run_promotion};
use engram_graph::{
    Binding, GraphStoreError, LtmAdapter, MemoryTripleStore, Triple, TriplePattern, TripleStore,
};
use engram_stm::{ShortTermMemory, StmConfig};
use engram_types::{MemoryType, NamedGraph, PendingItem, SessionId};
use serde_json::{Map, json};

/// Store wrapper whose writes can be switched to fail, for exercising the
/// per-item failure paths.
struct FlakyStore {
    inner: MemoryTripleStore,
    fail_writes: AtomicBool,
}

impl FlakyStore {
    fn new() -> Self {
        Self {
            inner: MemoryTripleStore::new(),
            fail_writes: AtomicBool::new(false),
        }
    }

    fn fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }
}

#[async_trait]
impl TripleStore for FlakyStore {
    fn backend_name(&self) -> &'static str {
        "flaky"
    }

    async fn ensure_graph(&self, graph: &NamedGraph) -> Result<(), GraphStoreError> {
        self.inner.ensure_graph(graph).await
    }

    async fn insert(&self, graph: &NamedGraph, triples: Vec<Triple>) -> Result<(), GraphStoreError> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(GraphStoreError::Backend(anyhow!("injected write failure")));
        }
        self.inner.insert(graph, triples).await
    }

    async fn remove_subject(
        &self,
        graph: &NamedGraph,
        subject: &str,
    ) -> Result<usize, GraphStoreError> {
        self.inner.remove_subject(graph, subject).await
    }

    async fn query(&self, pattern: &TriplePattern) -> Result<Vec<Binding>, GraphStoreError> {
        self.inner.query(pattern).await
    }

    async fn clear(&self, graph: &NamedGraph) -> Result<(), GraphStoreError> {
        self.inner.clear(graph).await
    }

    async fn graph_len(&self, graph: &NamedGraph) -> Result<usize, GraphStoreError> {
        self.inner.graph_len(graph).await
    }
}

fn stm(max_pending: usize) -> ShortTermMemory {
    let config = StmConfig {
        max_pending,
        ..StmConfig::default()
    };
    ShortTermMemory::new(SessionId::parse("promo-session").unwrap(), &config)
}

fn candidate(id: &str, importance: f64) -> PendingItem {
    let mut data = Map::new();
    data.insert("note".to_string(), json!(format!("candidate {id}")));
    let mut item = PendingItem::new(data).with_importance(importance);
    item.id = id.to_string();
    item
}

/// Criteria where only the importance threshold can qualify a candidate.
fn importance_only_criteria() -> PromotionCriteria {
    PromotionCriteria {
        min_importance: 0.5,
        max_age_seconds: i64::MAX,
        batch_size: 10,
        ..PromotionCriteria::default()
    }
}

#[tokio::test]
async fn implicit_mode_promotes_qualified_and_requeues_the_rest() {
    let mut stm = stm(10);
    let adapter = LtmAdapter::new(MemoryTripleStore::new());
    for (id, importance) in [
        ("i1", 0.9),
        ("i2", 0.3),
        ("i3", 0.7),
        ("i4", 0.2),
        ("i5", 0.8),
    ] {
        stm.enqueue_pending(candidate(id, importance)).unwrap();
    }

    let report = run_promotion(
        &mut stm,
        &adapter,
        &importance_only_criteria(),
        PromotionMode::Implicit,
        Utc::now(),
    )
    .await;

    let promoted: Vec<&str> = report.promoted.iter().map(|p| p.id.as_str()).collect();
    assert_eq!(promoted, vec!["i1", "i3", "i5"]);
    assert_eq!(report.skipped.len(), 2);
    assert!(report.failed.is_empty());

    // Skipped candidates stay queued in their original relative order.
    assert_eq!(stm.pending_count(), 2);
    let remaining: Vec<&str> = stm.pending_iter().map(|i| i.id.as_str()).collect();
    assert_eq!(remaining, vec!["i2", "i4"]);
}

#[tokio::test]
async fn explicit_mode_drains_without_requeueing() {
    let mut stm = stm(10);
    let adapter = LtmAdapter::new(MemoryTripleStore::new());
    for (id, importance) in [
        ("e1", 0.9),
        ("e2", 0.3),
        ("e3", 0.7),
        ("e4", 0.2),
        ("e5", 0.8),
    ] {
        stm.enqueue_pending(candidate(id, importance)).unwrap();
    }

    let report = run_promotion(
        &mut stm,
        &adapter,
        &importance_only_criteria(),
        PromotionMode::Explicit,
        Utc::now(),
    )
    .await;

    assert_eq!(report.promoted.len(), 3);
    assert_eq!(report.skipped.len(), 2);
    assert!(report.failed.is_empty());
    assert_eq!(stm.pending_count(), 0);
}

#[tokio::test]
async fn missing_type_is_inferred_from_data_keys() {
    let mut stm = stm(10);
    let adapter = LtmAdapter::new(MemoryTripleStore::new());

    let mut data = Map::new();
    data.insert("file_path".to_string(), json!("/a.ex"));
    let mut item = PendingItem::new(data).with_importance(0.9);
    item.id = "typed-by-keys".to_string();
    stm.enqueue_pending(item).unwrap();

    let report = run_promotion(
        &mut stm,
        &adapter,
        &importance_only_criteria(),
        PromotionMode::Explicit,
        Utc::now(),
    )
    .await;

    assert_eq!(report.promoted.len(), 1);
    assert_eq!(report.promoted[0].memory_type, MemoryType::FileContext);
    assert_eq!(report.promoted[0].graph, NamedGraph::ElixirCodebase);

    let stored = adapter
        .find_by_id(&NamedGraph::ElixirCodebase, "typed-by-keys")
        .await
        .unwrap()
        .unwrap();
    assert_eq!(stored.memory_type, MemoryType::FileContext);
}

#[tokio::test]
async fn adapter_failure_in_implicit_mode_requeues_for_retry() {
    let mut stm = stm(10);
    let store = FlakyStore::new();
    store.fail_writes(true);
    let adapter = LtmAdapter::new(store);

    stm.enqueue_pending(candidate("retry-me", 0.9)).unwrap();

    let report = run_promotion(
        &mut stm,
        &adapter,
        &importance_only_criteria(),
        PromotionMode::Implicit,
        Utc::now(),
    )
    .await;

    assert!(report.promoted.is_empty());
    assert_eq!(report.failed.len(), 1);
    assert_eq!(report.failed[0].id, "retry-me");
    assert_eq!(stm.pending_count(), 1);

    // The retry pass succeeds once the backend recovers.
    adapter.store().fail_writes(false);
    let retry = run_promotion(
        &mut stm,
        &adapter,
        &importance_only_criteria(),
        PromotionMode::Implicit,
        Utc::now(),
    )
    .await;
    assert_eq!(retry.promoted.len(), 1);
    assert_eq!(stm.pending_count(), 0);
}

#[tokio::test]
async fn adapter_failure_in_explicit_mode_is_recorded_only() {
    let mut stm = stm(10);
    let store = FlakyStore::new();
    store.fail_writes(true);
    let adapter = LtmAdapter::new(store);

    stm.enqueue_pending(candidate("gone", 0.9)).unwrap();

    let report = run_promotion(
        &mut stm,
        &adapter,
        &importance_only_criteria(),
        PromotionMode::Explicit,
        Utc::now(),
    )
    .await;

    assert_eq!(report.failed.len(), 1);
    assert_eq!(stm.pending_count(), 0);
}

#[tokio::test]
async fn implicit_skips_do_not_consume_batch_slots() {
    let mut stm = stm(10);
    let adapter = LtmAdapter::new(MemoryTripleStore::new());
    for (id, importance) in [
        ("low1", 0.1),
        ("low2", 0.2),
        ("hi1", 0.9),
        ("hi2", 0.9),
        ("hi3", 0.9),
    ] {
        stm.enqueue_pending(candidate(id, importance)).unwrap();
    }
    let criteria = PromotionCriteria {
        batch_size: 2,
        ..importance_only_criteria()
    };

    let report = run_promotion(
        &mut stm,
        &adapter,
        &criteria,
        PromotionMode::Implicit,
        Utc::now(),
    )
    .await;

    // Two promoted fill the batch; the two low-importance skips did not.
    assert_eq!(report.promoted.len(), 2);
    assert_eq!(report.skipped.len(), 2);
    let remaining: Vec<&str> = stm.pending_iter().map(|i| i.id.as_str()).collect();
    assert_eq!(remaining, vec!["hi3", "low1", "low2"]);
}

#[tokio::test]
async fn explicit_batch_budget_counts_every_processed_item() {
    let mut stm = stm(10);
    let adapter = LtmAdapter::new(MemoryTripleStore::new());
    for id in ["b1", "b2", "b3"] {
        stm.enqueue_pending(candidate(id, 0.9)).unwrap();
    }
    let criteria = PromotionCriteria {
        batch_size: 2,
        ..importance_only_criteria()
    };

    let report = run_promotion(
        &mut stm,
        &adapter,
        &criteria,
        PromotionMode::Explicit,
        Utc::now(),
    )
    .await;

    assert_eq!(report.promoted.len(), 2);
    assert_eq!(stm.pending_count(), 1);
    assert_eq!(stm.peek_pending().unwrap().id, "b3");
}

#[tokio::test]
async fn implicit_pass_terminates_after_one_full_queue_cycle() {
    let mut stm = stm(10);
    let adapter = LtmAdapter::new(MemoryTripleStore::new());
    for id in ["c1", "c2", "c3"] {
        stm.enqueue_pending(candidate(id, 0.1)).unwrap();
    }

    let report = run_promotion(
        &mut stm,
        &adapter,
        &importance_only_criteria(),
        PromotionMode::Implicit,
        Utc::now(),
    )
    .await;

    // Every candidate evaluated exactly once despite the re-enqueued tail.
    assert_eq!(report.skipped.len(), 3);
    assert!(report.promoted.is_empty());
    let remaining: Vec<&str> = stm.pending_iter().map(|i| i.id.as_str()).collect();
    assert_eq!(remaining, vec!["c1", "c2", "c3"]);
}

#[tokio::test]
async fn duplicate_ids_do_not_truncate_the_pass() {
    let mut stm = stm(10);
    let adapter = LtmAdapter::new(MemoryTripleStore::new());

    // Two distinct candidates sharing an id, enqueued directly through the
    // STM API, must not end the pass early or strand the unique tail.
    stm.enqueue_pending(candidate("dup", 0.9)).unwrap();
    stm.enqueue_pending(candidate("dup", 0.9)).unwrap();
    stm.enqueue_pending(candidate("unique", 0.9)).unwrap();

    let report = run_promotion(
        &mut stm,
        &adapter,
        &importance_only_criteria(),
        PromotionMode::Explicit,
        Utc::now(),
    )
    .await;

    assert_eq!(report.promoted.len(), 3);
    assert!(report.failed.is_empty());
    assert_eq!(stm.pending_count(), 0);

    // Same-id persists collapse to one stored record per graph.
    assert_eq!(
        adapter
            .count_memories(&NamedGraph::LongTermContext)
            .await
            .unwrap(),
        2
    );
}

#[tokio::test]
async fn stale_low_importance_candidates_promote_by_age() {
    let mut stm = stm(10);
    let adapter = LtmAdapter::new(MemoryTripleStore::new());
    let now = Utc::now();

    let stale = candidate("stale", 0.2).with_timestamp(now - Duration::seconds(400));
    let fresh = candidate("fresh", 0.2);
    stm.enqueue_pending(stale).unwrap();
    stm.enqueue_pending(fresh).unwrap();

    let criteria = PromotionCriteria {
        min_importance: 0.5,
        max_age_seconds: 300,
        batch_size: 10,
        ..PromotionCriteria::default()
    };
    let report = run_promotion(&mut stm, &adapter, &criteria, PromotionMode::Explicit, now).await;

    assert_eq!(report.promoted.len(), 1);
    assert_eq!(report.promoted[0].id, "stale");
    assert_eq!(report.skipped.len(), 1);
}

#[tokio::test]
async fn high_importance_promotes_regardless_of_age_with_matching_reason() {
    let mut stm = stm(10);
    let adapter = LtmAdapter::new(MemoryTripleStore::new());
    stm.enqueue_pending(candidate("vip", 0.85)).unwrap();

    // Threshold above 0.85 so only the high-importance override applies.
    let criteria = PromotionCriteria {
        min_importance: 0.95,
        max_age_seconds: i64::MAX,
        batch_size: 10,
        ..PromotionCriteria::default()
    };
    let report = run_promotion(
        &mut stm,
        &adapter,
        &criteria,
        PromotionMode::Explicit,
        Utc::now(),
    )
    .await;

    assert_eq!(report.promoted.len(), 1);
    assert_eq!(report.promoted[0].reason, "high_importance");
}

#[tokio::test]
async fn reason_labels_reflect_specific_types() {
    let mut stm = stm(10);
    let adapter = LtmAdapter::new(MemoryTripleStore::new());

    let decision = candidate("dec", 0.6).with_type(MemoryType::Decision);
    let convention = candidate("conv", 0.6).with_type(MemoryType::Convention);
    let fact = candidate("fact", 0.6).with_type(MemoryType::Fact);
    for item in [decision, convention, fact] {
        stm.enqueue_pending(item).unwrap();
    }

    let report = run_promotion(
        &mut stm,
        &adapter,
        &importance_only_criteria(),
        PromotionMode::Explicit,
        Utc::now(),
    )
    .await;

    let reasons: Vec<(&str, &str)> = report
        .promoted
        .iter()
        .map(|p| (p.id.as_str(), p.reason.as_str()))
        .collect();
    assert_eq!(
        reasons,
        vec![
            ("dec", "decision"),
            ("conv", "user_preference"),
            ("fact", "meets_criteria"),
        ]
    );
}

#[tokio::test]
async fn promoted_confidence_matches_the_weighted_formula() {
    let mut stm = stm(10);
    let adapter = LtmAdapter::new(MemoryTripleStore::new());

    // One data key (quality 0.5), declared type, zero age, infinite window:
    // 0.4*0.9 + 0.3*0.5 + 0.2*1.0 + 0.1*0 = 0.71
    let item = candidate("scored", 0.9).with_type(MemoryType::Fact);
    stm.enqueue_pending(item).unwrap();

    let report = run_promotion(
        &mut stm,
        &adapter,
        &importance_only_criteria(),
        PromotionMode::Explicit,
        Utc::now(),
    )
    .await;
    assert!((report.promoted[0].confidence - 0.71).abs() < 1e-9);
}
