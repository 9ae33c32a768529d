//! Promotion pipeline: drain pending candidates, score them, transfer the
//! qualified ones to long-term memory.
//!
//! The engine holds no state of its own; one call is a pure drain over the
//! session's queue plus awaited adapter writes. Per-item failures never abort
//! a batch.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use engram_graph::{LtmAdapter, TripleStore};
use engram_stm::ShortTermMemory;
use engram_types::{MemoryRecord, MemoryType, NamedGraph, PendingItem};

use crate::config::PromotionCriteria;
use crate::observability::MemoryEvent;

/// Importance at or above which a candidate promotes regardless of age.
pub const HIGH_IMPORTANCE_THRESHOLD: f64 = 0.8;

/// Drain behavior of one promotion call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PromotionMode {
    /// Promote only qualified candidates; the rest return to the queue tail
    /// for a future pass. Skipped candidates do not consume batch slots.
    Implicit,
    /// Process every drained candidate exactly once; nothing is re-enqueued.
    Explicit,
}

/// One successfully promoted candidate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PromotedItem {
    /// Candidate id, now also the long-term record id.
    pub id: String,
    /// Resolved memory type (declared or inferred).
    #[serde(rename = "type")]
    pub memory_type: MemoryType,
    /// Graph the record was written to.
    pub graph: NamedGraph,
    /// Promotion-time confidence score.
    pub confidence: f64,
    /// Informational label for why the candidate promoted.
    pub reason: String,
}

/// One candidate held back by policy.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SkippedItem {
    /// Candidate id.
    pub id: String,
    /// Importance at evaluation time.
    pub importance: f64,
    /// Why the candidate was held back.
    pub reason: String,
}

/// One candidate that failed validation or persistence.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FailedItem {
    /// Candidate id (possibly empty when validation failed on the id).
    pub id: String,
    /// Failure detail.
    pub reason: String,
}

/// Accumulated outcome of one promotion call.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PromotionReport {
    /// Candidates persisted to long-term memory.
    pub promoted: Vec<PromotedItem>,
    /// Candidates held back by policy.
    pub skipped: Vec<SkippedItem>,
    /// Candidates that failed validation or persistence.
    pub failed: Vec<FailedItem>,
}

impl PromotionReport {
    /// Whether the call touched no candidates at all.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.promoted.is_empty() && self.skipped.is_empty() && self.failed.is_empty()
    }
}

/// Infer a memory type from the candidate's data keys.
#[must_use]
pub fn infer_memory_type(data: &Map<String, Value>) -> MemoryType {
    const FILE_KEYS: [&str; 6] = ["file_path", "file", "path", "code", "module", "function"];
    const ANALYSIS_KEYS: [&str; 5] = ["analysis", "conclusion", "reasoning", "summary", "finding"];
    const CONVERSATION_KEYS: [&str; 6] =
        ["message", "utterance", "role", "content", "user", "assistant"];

    if FILE_KEYS.iter().any(|key| data.contains_key(*key)) {
        MemoryType::FileContext
    } else if ANALYSIS_KEYS.iter().any(|key| data.contains_key(*key)) {
        MemoryType::Analysis
    } else if CONVERSATION_KEYS.iter().any(|key| data.contains_key(*key)) {
        MemoryType::Conversation
    } else {
        MemoryType::Fact
    }
}

/// Named graph a promoted record lands in, by memory type.
#[must_use]
pub fn target_graph(memory_type: MemoryType) -> NamedGraph {
    match memory_type {
        MemoryType::Conversation => NamedGraph::ConversationHistory,
        MemoryType::FileContext => NamedGraph::ElixirCodebase,
        MemoryType::Convention | MemoryType::LessonLearned | MemoryType::Error => {
            NamedGraph::SystemKnowledge
        }
        _ => NamedGraph::LongTermContext,
    }
}

/// Structural quality of a candidate's data payload, in [0, 1].
///
/// Empty data scores 0; three or more keys score 1.0, fewer score 0.5; a
/// nested map anywhere adds 0.2, capped at 1.0.
fn data_quality(data: &Map<String, Value>) -> f64 {
    if data.is_empty() {
        return 0.0;
    }
    let base: f64 = if data.len() >= 3 { 1.0 } else { 0.5 };
    if data.values().any(Value::is_object) {
        (base + 0.2).min(1.0)
    } else {
        base
    }
}

#[allow(clippy::cast_precision_loss)]
fn compute_confidence(
    item: &PendingItem,
    type_provided: bool,
    age_seconds: i64,
    criteria: &PromotionCriteria,
) -> f64 {
    let quality = data_quality(&item.data);
    let specificity = if type_provided { 1.0 } else { 0.5 };
    let recency = if criteria.max_age_seconds <= 0 {
        1.0
    } else {
        (age_seconds as f64 / criteria.max_age_seconds as f64).clamp(0.0, 1.0)
    };
    let raw = 0.4 * item.importance + 0.3 * quality + 0.2 * specificity + 0.1 * recency;
    round3(raw.clamp(0.0, 1.0))
}

fn round3(value: f64) -> f64 {
    (value * 1000.0).round() / 1000.0
}

fn promotion_reason(importance: f64, memory_type: MemoryType) -> &'static str {
    if importance >= HIGH_IMPORTANCE_THRESHOLD {
        "high_importance"
    } else {
        match memory_type {
            MemoryType::Decision => "decision",
            MemoryType::Convention => "user_preference",
            _ => "meets_criteria",
        }
    }
}

/// Run one promotion pass over a session's pending queue.
///
/// Drains up to `batch_size` candidates from one pass over the queue as it
/// stood at entry. Bounding the pass by that starting length keeps the call
/// from cycling into its own re-enqueued tail, and holds even when distinct
/// candidates share an id.
pub async fn run_promotion<S: TripleStore>(
    stm: &mut ShortTermMemory,
    adapter: &LtmAdapter<S>,
    criteria: &PromotionCriteria,
    mode: PromotionMode,
    now: DateTime<Utc>,
) -> PromotionReport {
    stm.record_access();
    let mut report = PromotionReport::default();
    let mut drainable = stm.pending_count();
    let mut slots_used = 0usize;

    while slots_used < criteria.batch_size && drainable > 0 {
        let Some(item) = stm.dequeue_pending() else {
            break;
        };
        drainable -= 1;

        if item.id.trim().is_empty() {
            report.failed.push(FailedItem {
                id: item.id.clone(),
                reason: "candidate has no id".to_string(),
            });
            slots_used += 1;
            continue;
        }

        let age_seconds = item.age_seconds(now);
        let high_importance = item.importance >= HIGH_IMPORTANCE_THRESHOLD;
        let qualifies = item.importance >= criteria.min_importance
            || high_importance
            || age_seconds >= criteria.max_age_seconds;

        if !qualifies {
            report.skipped.push(SkippedItem {
                id: item.id.clone(),
                importance: item.importance,
                reason: format!(
                    "importance {:.3} below threshold {:.3}",
                    item.importance, criteria.min_importance
                ),
            });
            match mode {
                PromotionMode::Implicit => {
                    // Back to the tail for a future pass; no batch slot spent.
                    if let Err(err) = stm.requeue_pending(item) {
                        tracing::warn!(
                            event = MemoryEvent::PromotionItemFailed.as_str(),
                            error = %err,
                            "skipped candidate could not be re-enqueued"
                        );
                    }
                }
                PromotionMode::Explicit => {
                    slots_used += 1;
                }
            }
            continue;
        }

        let type_provided = item.memory_type.is_some();
        let memory_type = item
            .memory_type
            .or_else(|| criteria.infer_types.then(|| infer_memory_type(&item.data)))
            .unwrap_or(MemoryType::Fact);
        let confidence = compute_confidence(&item, type_provided, age_seconds, criteria);
        let reason = promotion_reason(item.importance, memory_type);
        let graph = target_graph(memory_type);
        let record = MemoryRecord::from_pending(&item, memory_type, confidence, graph.clone());

        match adapter.persist(&record).await {
            Ok(_) => {
                report.promoted.push(PromotedItem {
                    id: item.id.clone(),
                    memory_type,
                    graph,
                    confidence,
                    reason: reason.to_string(),
                });
            }
            Err(err) => {
                tracing::warn!(
                    event = MemoryEvent::PromotionItemFailed.as_str(),
                    session_id = %stm.session_id(),
                    candidate_id = %item.id,
                    error = %err,
                    "candidate failed to persist"
                );
                report.failed.push(FailedItem {
                    id: item.id.clone(),
                    reason: err.to_string(),
                });
                if mode == PromotionMode::Implicit {
                    // Retry on a later pass; the slot is still spent.
                    if let Err(requeue_err) = stm.requeue_pending(item) {
                        tracing::warn!(
                            event = MemoryEvent::PromotionItemFailed.as_str(),
                            error = %requeue_err,
                            "failed candidate could not be re-enqueued"
                        );
                    }
                }
            }
        }
        slots_used += 1;
    }

    tracing::debug!(
        event = MemoryEvent::PromotionCompleted.as_str(),
        session_id = %stm.session_id(),
        promoted = report.promoted.len(),
        skipped = report.skipped.len(),
        failed = report.failed.len(),
        pending_remaining = stm.pending_count(),
        "promotion pass finished"
    );
    report
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn data_with(keys: &[&str]) -> Map<String, Value> {
        keys.iter()
            .map(|key| ((*key).to_string(), json!("v")))
            .collect()
    }

    #[test]
    fn inference_prefers_file_then_analysis_then_conversation() {
        assert_eq!(
            infer_memory_type(&data_with(&["file_path"])),
            MemoryType::FileContext
        );
        // File keys win even when analysis keys are present too.
        assert_eq!(
            infer_memory_type(&data_with(&["summary", "module"])),
            MemoryType::FileContext
        );
        assert_eq!(
            infer_memory_type(&data_with(&["conclusion"])),
            MemoryType::Analysis
        );
        assert_eq!(
            infer_memory_type(&data_with(&["role", "something"])),
            MemoryType::Conversation
        );
        assert_eq!(infer_memory_type(&data_with(&["other"])), MemoryType::Fact);
    }

    #[test]
    fn data_quality_scores_shape_and_nesting() {
        assert!((data_quality(&Map::new()) - 0.0).abs() < f64::EPSILON);
        assert!((data_quality(&data_with(&["a"])) - 0.5).abs() < f64::EPSILON);
        assert!((data_quality(&data_with(&["a", "b", "c"])) - 1.0).abs() < f64::EPSILON);

        let mut nested = data_with(&["a"]);
        nested.insert("inner".to_string(), json!({ "k": 1 }));
        assert!((data_quality(&nested) - 0.7).abs() < 1e-9);

        let mut nested_rich = data_with(&["a", "b", "c"]);
        nested_rich.insert("inner".to_string(), json!({ "k": 1 }));
        // Nested bonus is capped at 1.0.
        assert!((data_quality(&nested_rich) - 1.0).abs() < f64::EPSILON);
    }

    #[test]
    fn confidence_is_weighted_clamped_and_rounded() {
        let item = PendingItem::new(data_with(&["a", "b", "c"])).with_importance(0.9);
        let criteria = PromotionCriteria::default();
        // 0.4*0.9 + 0.3*1.0 + 0.2*1.0 + 0.1*0 = 0.86
        let confidence = compute_confidence(&item, true, 0, &criteria);
        assert!((confidence - 0.86).abs() < 1e-9);

        // Full recency bonus once age reaches the max-age window.
        let aged = compute_confidence(&item, true, criteria.max_age_seconds, &criteria);
        assert!((aged - 0.96).abs() < 1e-9);

        // Inferred type halves the specificity contribution.
        let inferred = compute_confidence(&item, false, 0, &criteria);
        assert!((inferred - 0.76).abs() < 1e-9);
    }

    #[test]
    fn reason_labels_follow_importance_and_type() {
        assert_eq!(promotion_reason(0.85, MemoryType::Fact), "high_importance");
        assert_eq!(promotion_reason(0.6, MemoryType::Decision), "decision");
        assert_eq!(
            promotion_reason(0.6, MemoryType::Convention),
            "user_preference"
        );
        assert_eq!(promotion_reason(0.6, MemoryType::Fact), "meets_criteria");
    }
}
