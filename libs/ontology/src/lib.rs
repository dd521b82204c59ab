//! Sequence ontology term graph
//!
//! Loads an OBO-format ontology once and answers ancestry queries over its
//! `is_a` relationships: parents, children, transitive ancestors and
//! descendants, reflexive `is_a` tests, undirected path lengths, and
//! reduction of a term set to its most specific members.
//!
//! The graph is immutable after loading and safe to share across threads
//! behind an `Arc`.

mod error;
mod graph;
mod obo;

pub use error::{Error, Result};
pub use graph::{Ontology, Term, TermId};
