//! Engine configuration: capacities, lifecycle knobs, promotion policy.

use serde::{Deserialize, Serialize};

use engram_stm::StmConfig;
use engram_types::NamedGraph;

fn default_max_messages() -> usize {
    100
}

fn default_max_tokens() -> usize {
    4000
}

fn default_max_context_items() -> usize {
    50
}

fn default_max_pending() -> usize {
    20
}

fn default_idle_timeout_secs() -> u64 {
    1800
}

fn default_mailbox_capacity() -> usize {
    64
}

fn default_request_timeout_ms() -> u64 {
    5000
}

fn default_min_importance() -> f64 {
    0.5
}

fn default_max_age_seconds() -> i64 {
    300
}

fn default_min_confidence() -> f64 {
    0.3
}

fn default_infer_types() -> bool {
    true
}

fn default_batch_size() -> usize {
    10
}

/// Promotion policy options.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PromotionCriteria {
    /// Importance threshold below which candidates are skipped.
    #[serde(default = "default_min_importance")]
    pub min_importance: f64,
    /// Candidates at least this old promote even below the importance
    /// threshold.
    #[serde(default = "default_max_age_seconds")]
    pub max_age_seconds: i64,
    /// Confidence cutoff. Reserved: carried for policy compatibility, no
    /// code path rejects on it today.
    #[serde(default = "default_min_confidence")]
    pub min_confidence: f64,
    /// Infer a missing memory type from the candidate's data keys.
    #[serde(default = "default_infer_types")]
    pub infer_types: bool,
    /// Maximum candidates processed per promotion call.
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,
}

impl Default for PromotionCriteria {
    fn default() -> Self {
        Self {
            min_importance: default_min_importance(),
            max_age_seconds: default_max_age_seconds(),
            min_confidence: default_min_confidence(),
            infer_types: default_infer_types(),
            batch_size: default_batch_size(),
        }
    }
}

/// Top-level engine configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MemoryConfig {
    /// Conversation buffer message cap per session.
    #[serde(default = "default_max_messages")]
    pub max_messages: usize,
    /// Conversation buffer token budget per session.
    #[serde(default = "default_max_tokens")]
    pub max_tokens: usize,
    /// Working context entry cap per session.
    #[serde(default = "default_max_context_items")]
    pub max_context_items: usize,
    /// Pending queue capacity per session.
    #[serde(default = "default_max_pending")]
    pub max_pending: usize,
    /// Named graphs initialized at startup.
    #[serde(default = "NamedGraph::standard")]
    pub standard_graphs: Vec<NamedGraph>,
    /// Seconds of inactivity after which a session server shuts down.
    #[serde(default = "default_idle_timeout_secs")]
    pub idle_timeout_secs: u64,
    /// Bounded mailbox depth of one session server.
    #[serde(default = "default_mailbox_capacity")]
    pub mailbox_capacity: usize,
    /// Per-request timeout applied by handles.
    #[serde(default = "default_request_timeout_ms")]
    pub request_timeout_ms: u64,
    /// Promotion policy.
    #[serde(default)]
    pub promotion: PromotionCriteria,
}

impl Default for MemoryConfig {
    fn default() -> Self {
        Self {
            max_messages: default_max_messages(),
            max_tokens: default_max_tokens(),
            max_context_items: default_max_context_items(),
            max_pending: default_max_pending(),
            standard_graphs: NamedGraph::standard(),
            idle_timeout_secs: default_idle_timeout_secs(),
            mailbox_capacity: default_mailbox_capacity(),
            request_timeout_ms: default_request_timeout_ms(),
            promotion: PromotionCriteria::default(),
        }
    }
}

impl MemoryConfig {
    /// Capacity view handed to each new short-term memory.
    #[must_use]
    pub fn stm(&self) -> StmConfig {
        StmConfig {
            max_messages: self.max_messages,
            max_tokens: self.max_tokens,
            max_context_items: self.max_context_items,
            max_pending: self.max_pending,
        }
    }
}
