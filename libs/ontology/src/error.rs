//! Error types for ontology loading

use thiserror::Error;

/// Result type alias
pub type Result<T> = std::result::Result<T, Error>;

/// Ontology loading errors
///
/// Loading is all-or-nothing: a malformed source file is fatal because every
/// later ancestry query depends on the complete graph. Queries themselves
/// never fail; unknown terms yield `None` or empty results.
#[derive(Error, Debug)]
pub enum Error {
    #[error("failed to read ontology source: {0}")]
    Io(#[from] std::io::Error),

    #[error("malformed ontology stanza at line {line}: {message}")]
    Parse { line: usize, message: String },
}
