//! Named graphs partitioning long-term memory by concern.

use serde::{Deserialize, Serialize};

/// IRI prefix under which every named graph lives.
pub const GRAPH_NAMESPACE: &str = "https://ns.engram.dev/graphs/";

/// An IRI-identified subset of the triple store.
///
/// The four standard graphs are created at startup; additional graphs can be
/// configured by name and resolve to [`NamedGraph::Custom`].
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum NamedGraph {
    /// Durable distilled context promoted from sessions.
    LongTermContext,
    /// Knowledge about the codebase under work (files, modules, functions).
    ElixirCodebase,
    /// Promoted conversation records.
    ConversationHistory,
    /// Conventions, lessons, and recurring error knowledge.
    SystemKnowledge,
    /// Configuration-defined graph addressed by name.
    Custom(String),
}

impl NamedGraph {
    /// The default graph set initialized at startup.
    #[must_use]
    pub fn standard() -> Vec<Self> {
        vec![
            Self::LongTermContext,
            Self::ElixirCodebase,
            Self::ConversationHistory,
            Self::SystemKnowledge,
        ]
    }

    /// Snake-case name used in configuration and logs.
    #[must_use]
    pub fn name(&self) -> &str {
        match self {
            Self::LongTermContext => "long_term_context",
            Self::ElixirCodebase => "elixir_codebase",
            Self::ConversationHistory => "conversation_history",
            Self::SystemKnowledge => "system_knowledge",
            Self::Custom(name) => name.as_str(),
        }
    }

    /// Stable IRI of this graph.
    #[must_use]
    pub fn iri(&self) -> String {
        format!("{GRAPH_NAMESPACE}{}", self.name())
    }
}

impl std::fmt::Display for NamedGraph {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

impl From<String> for NamedGraph {
    fn from(value: String) -> Self {
        match value.as_str() {
            "long_term_context" => Self::LongTermContext,
            "elixir_codebase" => Self::ElixirCodebase,
            "conversation_history" => Self::ConversationHistory,
            "system_knowledge" => Self::SystemKnowledge,
            _ => Self::Custom(value),
        }
    }
}

impl From<NamedGraph> for String {
    fn from(value: NamedGraph) -> Self {
        value.name().to_string()
    }
}
