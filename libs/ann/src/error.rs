//! Error types for annotation schema handling

use thiserror::Error;

/// Result type alias
pub type Result<T> = std::result::Result<T, Error>;

/// Annotation schema errors
///
/// Only header-level problems surface here. Malformed record data is never
/// an error; it decodes to missing values with a logged diagnostic.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum Error {
    #[error("header declares no annotation field list for {key:?}: {description:?}")]
    NoFieldList { key: String, description: String },
}
