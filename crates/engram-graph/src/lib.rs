//! engram-graph - Long-term semantic memory over named-graph triple stores.
//!
//! Translates [`engram_types::MemoryRecord`] values into RDF-style triples
//! and persists them in named graphs through an abstract store capability:
//!
//! ```text
//! MemoryRecord ──▶ LtmAdapter ──▶ TripleStore (capability)
//!                                   ├── MemoryTripleStore  (in-process)
//!                                   └── SparqlHttpStore    (remote endpoint)
//! ```
//!
//! The adapter guarantees at-most-one record per id in a graph and
//! read-your-writes visibility across sessions; SPARQL query *parsing* is
//! out of scope, only generation against the standard protocol.

mod adapter;
mod store;
mod triple;

pub use adapter::{AdapterError, LtmAdapter, MemoryPattern, PersistReceipt};
pub use store::memory::MemoryTripleStore;
pub use store::sparql::SparqlHttpStore;
pub use store::{GraphStoreError, TripleStore};
pub use triple::{Binding, Literal, Term, Triple, TriplePattern, ontology};
