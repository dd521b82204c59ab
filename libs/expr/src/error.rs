//! Error types for the expression engine

use thiserror::Error;

/// Result type alias
pub type Result<T> = std::result::Result<T, Error>;

/// Expression errors
///
/// Everything except [`Error::Eval`] is raised at compile time, before the
/// first record is seen. `Eval` errors are per-record: the caller logs them
/// with the record coordinate and treats the result as a failed predicate.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum Error {
    #[error("syntax error at offset {offset}: {message}")]
    Parse { message: String, offset: usize },

    #[error("unknown identifier `{name}`")]
    UnknownIdentifier { name: String, offset: usize },

    #[error("unknown function `{name}`")]
    UnknownFunction { name: String, offset: usize },

    #[error("`{namespace}` has no member `{name}`")]
    UnknownNamespaceMember {
        namespace: String,
        name: String,
        offset: usize,
    },

    #[error("`{name}` expects {expected} argument(s), got {got}")]
    Arity {
        name: String,
        expected: String,
        got: usize,
        offset: usize,
    },

    #[error("{message}")]
    Analyze { message: String, offset: usize },

    #[error("evaluation error: {0}")]
    Eval(String),

    /// The record itself violates an input precondition (for example a
    /// multi-allelic record where exactly one ALT allele is required).
    /// Unlike [`Error::Eval`], callers must not recover from this.
    #[error("invalid record: {0}")]
    InvalidRecord(String),
}

impl Error {
    /// Character offset the error points at, when it has one.
    pub fn offset(&self) -> Option<usize> {
        match self {
            Error::Parse { offset, .. }
            | Error::UnknownIdentifier { offset, .. }
            | Error::UnknownFunction { offset, .. }
            | Error::UnknownNamespaceMember { offset, .. }
            | Error::Arity { offset, .. }
            | Error::Analyze { offset, .. } => Some(*offset),
            Error::Eval(_) | Error::InvalidRecord(_) => None,
        }
    }

    /// Render the error with the offending source line and a caret under
    /// the error position.
    pub fn render(&self, source: &str) -> String {
        match self.offset() {
            Some(offset) => {
                let padding: String = source
                    .chars()
                    .take(offset)
                    .map(|c| if c == '\t' { '\t' } else { ' ' })
                    .collect();
                format!("{source}\n{padding}^\n{self}")
            }
            None => self.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn renders_a_caret_at_the_error_offset() {
        let err = Error::UnknownIdentifier {
            name: "FOO".into(),
            offset: 8,
        };
        let rendered = err.render("QUAL >= FOO");
        assert_eq!(rendered, "QUAL >= FOO\n        ^\nunknown identifier `FOO`");
    }
}
