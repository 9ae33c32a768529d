//! Long-term memory records and the closed memory type set.

use chrono::{DateTime, Utc};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::graph::NamedGraph;
use crate::pending::PendingItem;

/// Closed set of semantic memory kinds recognized by the engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum MemoryType {
    /// Verified, standalone statement of truth.
    Fact,
    /// Belief held without verification.
    Assumption,
    /// Candidate explanation under test.
    Hypothesis,
    /// New understanding gained during work.
    Discovery,
    /// Identified hazard or fragile area.
    Risk,
    /// Open question flagged for later resolution.
    Unknown,
    /// Recorded choice with rationale.
    Decision,
    /// Unit of planned or executed work.
    Task,
    /// Project or user convention to honor.
    Convention,
    /// Observed failure worth remembering.
    Error,
    /// Conclusion distilled from an outcome.
    LessonLearned,
    /// Promoted conversational exchange.
    Conversation,
    /// Reasoning artifact (summary, finding, conclusion).
    Analysis,
    /// Knowledge tied to a concrete file or code location.
    FileContext,
}

impl MemoryType {
    /// Snake-case string form used in logs and serialized payloads.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Fact => "fact",
            Self::Assumption => "assumption",
            Self::Hypothesis => "hypothesis",
            Self::Discovery => "discovery",
            Self::Risk => "risk",
            Self::Unknown => "unknown",
            Self::Decision => "decision",
            Self::Task => "task",
            Self::Convention => "convention",
            Self::Error => "error",
            Self::LessonLearned => "lesson_learned",
            Self::Conversation => "conversation",
            Self::Analysis => "analysis",
            Self::FileContext => "file_context",
        }
    }

    /// Ontology class local name for the triple mapping.
    #[must_use]
    pub const fn ontology_class(self) -> &'static str {
        match self {
            Self::Fact => "Fact",
            Self::Assumption => "Assumption",
            Self::Hypothesis => "Hypothesis",
            Self::Discovery => "Discovery",
            Self::Risk => "Risk",
            Self::Unknown => "Unknown",
            Self::Decision => "Decision",
            Self::Task => "Task",
            Self::Convention => "Convention",
            Self::Error => "Error",
            Self::LessonLearned => "LessonLearned",
            Self::Conversation => "Conversation",
            Self::Analysis => "Analysis",
            Self::FileContext => "FileContext",
        }
    }

    /// Resolve an ontology class local name back to a memory type.
    #[must_use]
    pub fn from_ontology_class(local: &str) -> Option<Self> {
        let all = [
            Self::Fact,
            Self::Assumption,
            Self::Hypothesis,
            Self::Discovery,
            Self::Risk,
            Self::Unknown,
            Self::Decision,
            Self::Task,
            Self::Convention,
            Self::Error,
            Self::LessonLearned,
            Self::Conversation,
            Self::Analysis,
            Self::FileContext,
        ];
        all.into_iter().find(|t| t.ontology_class() == local)
    }
}

impl std::fmt::Display for MemoryType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One durable record in long-term memory.
///
/// Records are written as triples into the named graph carried by
/// `graph`; re-persisting the same id is an explicit update and stamps
/// `updated_at`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct MemoryRecord {
    /// Unique record id; one copy per id exists in a graph.
    pub id: String,
    /// Semantic kind of this record.
    #[serde(rename = "type")]
    pub memory_type: MemoryType,
    /// Structured content payload.
    pub content: Map<String, Value>,
    /// Caller-assessed importance in [0, 1].
    pub importance: f64,
    /// Promotion-time confidence in [0, 1].
    pub confidence: f64,
    /// Origin label (write path, agent, or subsystem).
    pub source: String,
    /// Whether the content has been externally verified.
    pub verified: bool,
    /// Creation instant.
    pub created_at: DateTime<Utc>,
    /// Set on explicit update of an existing id.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
    /// Named graph this record lives in.
    #[schemars(with = "String")]
    pub graph: NamedGraph,
}

impl MemoryRecord {
    /// Build a record from a promotion candidate.
    #[must_use]
    pub fn from_pending(
        item: &PendingItem,
        memory_type: MemoryType,
        confidence: f64,
        graph: NamedGraph,
    ) -> Self {
        Self {
            id: item.id.clone(),
            memory_type,
            content: item.data.clone(),
            importance: item.importance,
            confidence,
            source: item
                .source
                .clone()
                .unwrap_or_else(|| "stm_promotion".to_string()),
            verified: item.verified.unwrap_or(false),
            created_at: item.timestamp,
            updated_at: None,
            graph,
        }
    }
}
