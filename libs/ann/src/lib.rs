//! Typed decoding of transcript-annotation INFO fields
//!
//! Annotation callers pack per-transcript entries into a single INFO value:
//! entries are comma-separated, sub-fields pipe-separated, and the sub-field
//! order is declared in the header line's `Description` text. This crate
//! extracts that declaration, detects which producer wrote it, and decodes
//! raw entries into typed values field by field.
//!
//! Decoding never hard-fails on record data: a sub-field that does not parse
//! under its registered type degrades to a missing value with a logged
//! diagnostic.

mod error;
mod registry;
mod schema;
mod types;

pub use error::{Error, Result};
pub use registry::field_kind;
pub use schema::{split_entries, AnnSchema, Producer};
pub use types::{AnnValue, FieldKind, PosRange};
