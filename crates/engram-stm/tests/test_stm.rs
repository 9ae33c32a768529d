//! Integration tests for the short-term memory facade.

use engram_stm::{ShortTermMemory, StmConfig};
use engram_types::{Message, MessageRole, PendingItem, SessionId};
use serde_json::{Map, json};

fn stm() -> ShortTermMemory {
    let session_id = SessionId::parse("test-session").unwrap();
    ShortTermMemory::new(session_id, &StmConfig::default())
}

fn pending(label: &str) -> PendingItem {
    let mut data = Map::new();
    data.insert("label".to_string(), json!(label));
    PendingItem::new(data)
}

#[test]
fn fresh_stm_is_empty() {
    let stm = stm();
    assert!(stm.is_empty());
    let summary = stm.summary();
    assert!(summary.is_empty);
    assert_eq!(summary.message_count, 0);
    assert_eq!(summary.access_count, 0);
}

#[test]
fn mutations_record_accesses() {
    let mut stm = stm();
    stm.add_message(Message::new(MessageRole::User, "hello"));
    stm.put_context("k", json!(1)).unwrap();
    stm.enqueue_pending(pending("x")).unwrap();
    stm.delete_context("k");

    let summary = stm.summary();
    assert_eq!(summary.access_count, 4);
    assert!(summary.last_access.is_some());
}

#[test]
fn summary_reflects_counts_and_capacities() {
    let config = StmConfig {
        max_messages: 5,
        max_tokens: 128,
        max_context_items: 3,
        max_pending: 2,
    };
    let mut stm = ShortTermMemory::new(SessionId::parse("s1").unwrap(), &config);
    stm.add_message(Message::new(MessageRole::User, "hi there"));
    stm.put_context("goal", json!("refactor")).unwrap();
    stm.enqueue_pending(pending("candidate")).unwrap();

    let summary = stm.summary();
    assert_eq!(summary.session_id, "s1");
    assert_eq!(summary.message_count, 1);
    assert_eq!(summary.max_messages, 5);
    assert_eq!(summary.max_tokens, 128);
    assert_eq!(summary.context_item_count, 1);
    assert_eq!(summary.max_context_items, 3);
    assert_eq!(summary.pending_count, 1);
    assert_eq!(summary.max_pending, 2);
    assert!(!summary.is_empty);
    assert!(summary.token_count > 0);
}

#[test]
fn is_empty_requires_all_three_components_empty() {
    let mut stm = stm();
    stm.put_context("only", json!(true)).unwrap();
    assert!(!stm.is_empty());
    stm.delete_context("only");
    assert!(stm.is_empty());
}

#[test]
fn component_errors_leave_state_unchanged() {
    let config = StmConfig {
        max_messages: 5,
        max_tokens: 128,
        max_context_items: 1,
        max_pending: 1,
    };
    let mut stm = ShortTermMemory::new(SessionId::parse("s2").unwrap(), &config);
    stm.put_context("a", json!(1)).unwrap();
    stm.enqueue_pending(pending("a")).unwrap();

    assert!(stm.put_context("b", json!(2)).is_err());
    assert!(stm.enqueue_pending(pending("b")).is_err());

    assert_eq!(stm.context_len(), 1);
    assert_eq!(stm.pending_count(), 1);
}
