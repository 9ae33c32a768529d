//! Triple terms, statements, and graph patterns.

use std::collections::BTreeMap;

use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};

use engram_types::NamedGraph;

/// Ontology vocabulary used by the memory triple mapping.
pub mod ontology {
    /// Namespace of the engram ontology terms.
    pub const ONTOLOGY_NS: &str = "https://ns.engram.dev/ontology#";
    /// Namespace under which memory subject IRIs are minted.
    pub const MEMORY_NS: &str = "https://ns.engram.dev/memory/";

    /// `rdf:type`.
    pub const RDF_TYPE: &str = "http://www.w3.org/1999/02/22-rdf-syntax-ns#type";

    /// Serialized content payload of a memory.
    pub const CONTENT: &str = "https://ns.engram.dev/ontology#content";
    /// Creation instant of a memory.
    pub const TIMESTAMP: &str = "https://ns.engram.dev/ontology#timestamp";
    /// Promotion-time confidence score.
    pub const CONFIDENCE: &str = "https://ns.engram.dev/ontology#confidence";
    /// Caller-assessed importance score.
    pub const IMPORTANCE: &str = "https://ns.engram.dev/ontology#importance";
    /// Origin label of a memory.
    pub const SOURCE: &str = "https://ns.engram.dev/ontology#source";
    /// Verification flag of a memory.
    pub const VERIFIED: &str = "https://ns.engram.dev/ontology#verified";
    /// Instant of the latest explicit update.
    pub const UPDATED_AT: &str = "https://ns.engram.dev/ontology#updatedAt";

    /// XSD datatypes used for typed literals.
    pub const XSD_STRING: &str = "http://www.w3.org/2001/XMLSchema#string";
    /// `xsd:dateTime`.
    pub const XSD_DATETIME: &str = "http://www.w3.org/2001/XMLSchema#dateTime";
    /// `xsd:float`.
    pub const XSD_FLOAT: &str = "http://www.w3.org/2001/XMLSchema#float";
    /// `xsd:boolean`.
    pub const XSD_BOOLEAN: &str = "http://www.w3.org/2001/XMLSchema#boolean";
    /// `xsd:integer`.
    pub const XSD_INTEGER: &str = "http://www.w3.org/2001/XMLSchema#integer";

    /// IRI of an ontology class by local name.
    #[must_use]
    pub fn class_iri(local: &str) -> String {
        format!("{ONTOLOGY_NS}{local}")
    }

    /// Minted subject IRI for a memory id.
    #[must_use]
    pub fn subject_iri(memory_id: &str) -> String {
        format!("{MEMORY_NS}{memory_id}")
    }
}

/// A typed literal: lexical form plus XSD datatype IRI.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Literal {
    /// Lexical form of the value.
    pub lexical: String,
    /// Datatype IRI.
    pub datatype: String,
}

/// One RDF term: an IRI or a typed literal.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Term {
    /// IRI reference.
    Iri(String),
    /// Typed literal.
    Literal(Literal),
}

impl Term {
    /// IRI term.
    #[must_use]
    pub fn iri(value: impl Into<String>) -> Self {
        Self::Iri(value.into())
    }

    /// `xsd:string` literal.
    #[must_use]
    pub fn string(value: impl Into<String>) -> Self {
        Self::Literal(Literal {
            lexical: value.into(),
            datatype: ontology::XSD_STRING.to_string(),
        })
    }

    /// `xsd:float` literal.
    #[must_use]
    pub fn float(value: f64) -> Self {
        Self::Literal(Literal {
            lexical: format!("{value}"),
            datatype: ontology::XSD_FLOAT.to_string(),
        })
    }

    /// `xsd:boolean` literal.
    #[must_use]
    pub fn boolean(value: bool) -> Self {
        Self::Literal(Literal {
            lexical: value.to_string(),
            datatype: ontology::XSD_BOOLEAN.to_string(),
        })
    }

    /// `xsd:integer` literal.
    #[must_use]
    pub fn integer(value: i64) -> Self {
        Self::Literal(Literal {
            lexical: value.to_string(),
            datatype: ontology::XSD_INTEGER.to_string(),
        })
    }

    /// `xsd:dateTime` literal in RFC 3339 form.
    #[must_use]
    pub fn date_time(value: DateTime<Utc>) -> Self {
        Self::Literal(Literal {
            lexical: value.to_rfc3339_opts(SecondsFormat::Micros, true),
            datatype: ontology::XSD_DATETIME.to_string(),
        })
    }

    /// IRI value, when this term is an IRI.
    #[must_use]
    pub fn as_iri(&self) -> Option<&str> {
        match self {
            Self::Iri(value) => Some(value),
            Self::Literal(_) => None,
        }
    }

    /// Lexical form, when this term is a literal.
    #[must_use]
    pub fn as_lexical(&self) -> Option<&str> {
        match self {
            Self::Iri(_) => None,
            Self::Literal(literal) => Some(&literal.lexical),
        }
    }

    /// Parse a float literal.
    #[must_use]
    pub fn as_f64(&self) -> Option<f64> {
        self.as_lexical().and_then(|v| v.parse().ok())
    }

    /// Parse a boolean literal.
    #[must_use]
    pub fn as_bool(&self) -> Option<bool> {
        self.as_lexical().and_then(|v| v.parse().ok())
    }

    /// Parse a dateTime literal.
    #[must_use]
    pub fn as_date_time(&self) -> Option<DateTime<Utc>> {
        self.as_lexical()
            .and_then(|v| DateTime::parse_from_rfc3339(v).ok())
            .map(|dt| dt.with_timezone(&Utc))
    }
}

/// One statement: subject and predicate IRIs plus an object term.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Triple {
    /// Subject IRI.
    pub subject: String,
    /// Predicate IRI.
    pub predicate: String,
    /// Object term.
    pub object: Term,
}

impl Triple {
    /// Build one statement.
    #[must_use]
    pub fn new(subject: impl Into<String>, predicate: impl Into<String>, object: Term) -> Self {
        Self {
            subject: subject.into(),
            predicate: predicate.into(),
            object,
        }
    }
}

/// One row of variable bindings returned by a pattern query. Only pattern
/// positions left unbound appear as keys (`s`, `p`, `o`).
pub type Binding = BTreeMap<String, Term>;

/// Parameterized graph pattern: `None` positions are variables.
#[derive(Debug, Clone, PartialEq)]
pub struct TriplePattern {
    /// Graph to match within.
    pub graph: NamedGraph,
    /// Bound subject IRI, or a variable when `None`.
    pub subject: Option<String>,
    /// Bound predicate IRI, or a variable when `None`.
    pub predicate: Option<String>,
    /// Bound object term, or a variable when `None`.
    pub object: Option<Term>,
}

impl TriplePattern {
    /// Match-everything pattern over one graph.
    #[must_use]
    pub fn graph(graph: NamedGraph) -> Self {
        Self {
            graph,
            subject: None,
            predicate: None,
            object: None,
        }
    }

    /// Bind the subject position.
    #[must_use]
    pub fn subject(mut self, subject: impl Into<String>) -> Self {
        self.subject = Some(subject.into());
        self
    }

    /// Bind the predicate position.
    #[must_use]
    pub fn predicate(mut self, predicate: impl Into<String>) -> Self {
        self.predicate = Some(predicate.into());
        self
    }

    /// Bind the object position.
    #[must_use]
    pub fn object(mut self, object: Term) -> Self {
        self.object = Some(object);
        self
    }

    /// Whether a triple satisfies the bound positions.
    #[must_use]
    pub fn matches(&self, triple: &Triple) -> bool {
        if let Some(subject) = &self.subject
            && subject != &triple.subject
        {
            return false;
        }
        if let Some(predicate) = &self.predicate
            && predicate != &triple.predicate
        {
            return false;
        }
        if let Some(object) = &self.object
            && object != &triple.object
        {
            return false;
        }
        true
    }

    /// Build the binding row for one matching triple.
    #[must_use]
    pub fn bind(&self, triple: &Triple) -> Binding {
        let mut row = Binding::new();
        if self.subject.is_none() {
            row.insert("s".to_string(), Term::iri(triple.subject.clone()));
        }
        if self.predicate.is_none() {
            row.insert("p".to_string(), Term::iri(triple.predicate.clone()));
        }
        if self.object.is_none() {
            row.insert("o".to_string(), triple.object.clone());
        }
        row
    }
}
