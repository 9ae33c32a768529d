//! End-to-end tests of the session-addressed service: server lifecycle,
//! error pass-through, cross-session visibility.

use engram_engine::{
    EngineError, MemoryConfig, MemoryService, PromotionMode, SessionRegistry,
};
use engram_graph::{LtmAdapter, MemoryPattern, MemoryTripleStore, ontology};
use engram_stm::StmError;
use engram_types::{MemoryType, MessageRole, NamedGraph, PendingItem, SessionId};
use serde_json::{Map, json};

async fn service_with(config: MemoryConfig) -> MemoryService<MemoryTripleStore> {
    MemoryService::new(MemoryTripleStore::new(), config)
        .await
        .unwrap()
}

fn promotable(id: &str, importance: f64) -> PendingItem {
    let mut data = Map::new();
    data.insert("statement".to_string(), json!("observed behavior"));
    let mut item = PendingItem::new(data).with_importance(importance);
    item.id = id.to_string();
    item
}

#[tokio::test]
async fn token_eviction_flows_through_the_server() {
    let config = MemoryConfig {
        max_tokens: 40,
        ..MemoryConfig::default()
    };
    let service = service_with(config).await;
    let content = "x".repeat(80);

    let first = service
        .add_text_message("evict-session", MessageRole::User, &content)
        .await
        .unwrap();
    assert!(first.evicted_ids.is_empty());

    let second = service
        .add_text_message("evict-session", MessageRole::User, &content)
        .await
        .unwrap();
    assert_eq!(second.evicted_ids.len(), 1);

    let third = service
        .add_text_message("evict-session", MessageRole::User, &content)
        .await
        .unwrap();
    assert_eq!(third.evicted_ids.len(), 1);
    assert_eq!(third.count, 1);
    assert_eq!(third.tokens, 21);

    let messages = service
        .recent_messages("evict-session", None)
        .await
        .unwrap();
    assert_eq!(messages.len(), 1);
}

#[tokio::test]
async fn non_text_content_is_coerced_to_its_string_form() {
    let service = service_with(MemoryConfig::default()).await;
    service
        .add_message(
            "coerce-session",
            MessageRole::Tool,
            json!({ "status": "ok", "rows": 3 }),
            None,
        )
        .await
        .unwrap();

    let messages = service
        .recent_messages("coerce-session", None)
        .await
        .unwrap();
    // Default serde_json map ordering is alphabetical by key.
    assert_eq!(messages[0].content, r#"{"rows":3,"status":"ok"}"#);
}

#[tokio::test]
async fn context_errors_surface_unchanged_through_the_stack() {
    let config = MemoryConfig {
        max_context_items: 2,
        ..MemoryConfig::default()
    };
    let service = service_with(config).await;
    let session = "ctx-session";

    service.put_context(session, "a", json!(1)).await.unwrap();
    service.put_context(session, "b", json!(2)).await.unwrap();
    service.put_context(session, "a", json!(3)).await.unwrap();

    let err = service
        .put_context(session, "c", json!(4))
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        EngineError::Stm(StmError::CapacityExceeded { max_items: 2 })
    ));
    assert!(err.is_clean_rejection());

    assert_eq!(service.get_context(session, "a").await.unwrap(), json!(3));
    assert_eq!(service.get_context(session, "b").await.unwrap(), json!(2));

    let missing = service.get_context(session, "c").await.unwrap_err();
    assert!(matches!(
        missing,
        EngineError::Stm(StmError::KeyNotFound { .. })
    ));
    assert_eq!(
        service
            .get_context_or(session, "c", json!("fallback"))
            .await
            .unwrap(),
        json!("fallback")
    );

    let mut keys = service.context_keys(session).await.unwrap();
    keys.sort_unstable();
    assert_eq!(keys, vec!["a", "b"]);
}

#[tokio::test]
async fn enqueue_at_capacity_fails_and_mints_ids_when_absent() {
    let config = MemoryConfig {
        max_pending: 1,
        ..MemoryConfig::default()
    };
    let service = service_with(config).await;

    let mut anonymous = promotable("", 0.9);
    anonymous.id = String::new();
    let minted = service
        .enqueue_memory("queue-session", anonymous)
        .await
        .unwrap();
    assert!(!minted.is_empty());

    let err = service
        .enqueue_memory("queue-session", promotable("too-many", 0.9))
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        EngineError::Stm(StmError::QueueFull { max_size: 1 })
    ));
}

#[tokio::test]
async fn invalid_session_ids_are_rejected_before_any_server_starts() {
    let service = service_with(MemoryConfig::default()).await;
    let err = service
        .add_text_message("bad session!", MessageRole::User, "hi")
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::InvalidSessionId(_)));
    assert!(service.active_sessions().await.is_empty());
}

#[tokio::test]
async fn promotion_results_are_visible_across_sessions() {
    let service = service_with(MemoryConfig::default()).await;

    service
        .enqueue_memory("writer-session", promotable("shared-fact", 0.9))
        .await
        .unwrap();
    let report = service
        .promote("writer-session", PromotionMode::Implicit)
        .await
        .unwrap();
    assert_eq!(report.promoted.len(), 1);

    // Read-your-writes through the shared adapter, independent of session.
    let rows = service
        .query_memory(
            &MemoryPattern::for_graph(NamedGraph::LongTermContext)
                .with_memory_id("shared-fact")
                .with_predicate(ontology::RDF_TYPE),
        )
        .await
        .unwrap();
    assert_eq!(rows.len(), 1);

    let stored = service
        .adapter()
        .find_by_id(&NamedGraph::LongTermContext, "shared-fact")
        .await
        .unwrap()
        .unwrap();
    assert_eq!(stored.memory_type, MemoryType::Fact);

    let summary = service.summary("writer-session").await.unwrap();
    assert_eq!(summary.pending_count, 0);
}

#[tokio::test]
async fn stopped_sessions_vanish_and_restart_empty() {
    let service = service_with(MemoryConfig::default()).await;
    let session = "stop-session";

    service
        .put_context(session, "k", json!("v"))
        .await
        .unwrap();
    assert!(service.has_session(session).await.unwrap());

    service.stop_session(session, "test teardown").await.unwrap();
    assert!(!service.has_session(session).await.unwrap());

    let err = service
        .stop_session(session, "already gone")
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::SessionNotFound(_)));

    // Persistence of STM is explicitly not provided: the restarted session
    // begins with empty state.
    let missing = service.get_context(session, "k").await.unwrap_err();
    assert!(matches!(
        missing,
        EngineError::Stm(StmError::KeyNotFound { .. })
    ));
}

#[tokio::test]
async fn concurrent_get_or_start_yields_a_single_server() {
    let adapter = LtmAdapter::new(MemoryTripleStore::new());
    let registry = SessionRegistry::new(adapter, MemoryConfig::default());
    let session_id = SessionId::parse("race-session").unwrap();

    let (a, b, c, d) = tokio::join!(
        registry.get_or_start(&session_id),
        registry.get_or_start(&session_id),
        registry.get_or_start(&session_id),
        registry.get_or_start(&session_id),
    );
    for handle in [a.unwrap(), b.unwrap(), c.unwrap(), d.unwrap()] {
        assert_eq!(handle.session_id(), &session_id);
        assert!(!handle.is_closed());
    }
    assert_eq!(registry.active_sessions().await.len(), 1);
}

#[tokio::test]
async fn stale_handles_report_session_stopped() {
    let adapter = LtmAdapter::new(MemoryTripleStore::new());
    let registry = SessionRegistry::new(adapter, MemoryConfig::default());
    let session_id = SessionId::parse("stale-session").unwrap();

    let handle = registry.get_or_start(&session_id).await.unwrap();
    registry.stop(&session_id, "test").await.unwrap();

    let err = handle.summary().await.unwrap_err();
    assert!(matches!(err, EngineError::SessionStopped(_)));
    assert!(matches!(
        registry.lookup(&session_id).await.unwrap_err(),
        EngineError::SessionNotFound(_)
    ));
}

#[tokio::test]
async fn idle_sessions_shut_down_and_deregister() {
    let config = MemoryConfig {
        idle_timeout_secs: 1,
        ..MemoryConfig::default()
    };
    let service = service_with(config).await;
    service
        .add_text_message("idle-session", MessageRole::User, "hello")
        .await
        .unwrap();
    assert!(service.has_session("idle-session").await.unwrap());

    // Give the server time to hit its idle deadline and deregister.
    for _ in 0..20 {
        tokio::time::sleep(std::time::Duration::from_millis(150)).await;
        if !service.has_session("idle-session").await.unwrap() {
            break;
        }
    }
    assert!(!service.has_session("idle-session").await.unwrap());
}

#[tokio::test]
async fn sessions_are_isolated_from_each_other() {
    let service = service_with(MemoryConfig::default()).await;
    service
        .put_context("iso-a", "key", json!("from-a"))
        .await
        .unwrap();

    let err = service.get_context("iso-b", "key").await.unwrap_err();
    assert!(matches!(
        err,
        EngineError::Stm(StmError::KeyNotFound { .. })
    ));
    assert_eq!(service.active_sessions().await.len(), 2);
}
