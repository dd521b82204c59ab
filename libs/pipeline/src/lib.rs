//! Record evaluation pipeline
//!
//! Wires the expression engine, annotation decoder, and ontology into
//! record-at-a-time drivers: filtering (drop records, and annotation
//! entries, a predicate rejects), tagging (mark matches in FILTER),
//! projection (rows of evaluated columns), and sort-key extraction with a
//! missing-last total order.
//!
//! The pipeline owns no I/O: the embedding application parses records into
//! [`VariantRecord`]s, supplies [`HeaderMeta`], and writes whatever the
//! drivers hand back. Everything shared across records is behind `Arc`, so
//! one `Environment` per worker thread is the whole sharding story.

mod aux;
mod env;
mod error;
mod filter;
mod header;
mod record;
mod sort;
mod table;
mod tag;

#[cfg(test)]
mod testutil;

pub use aux::load_aux_sets;
pub use env::{Config, Environment, Scope};
pub use error::{Error, Result};
pub use filter::{Keep, RecordFilter};
pub use header::{HeaderMeta, Number};
pub use record::VariantRecord;
pub use sort::{KeyPart, SortKey, Sorter};
pub use table::Projection;
pub use tag::Tagger;
