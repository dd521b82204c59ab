//! Error types for the record pipeline

use thiserror::Error;

/// Result type alias
pub type Result<T> = std::result::Result<T, Error>;

/// Pipeline errors
///
/// Configuration and load errors (`Expr` carrying a compile-time error,
/// `NoAnnotationField`, `TagCollision`, `Aux`) are fatal before the first
/// record. Per-record expression failures never surface here: the filter,
/// tag, projection, and sort drivers recover from them internally, except
/// for `MoreThanOneAltAllele`, which means the input was not normalized and
/// aborts the run.
#[derive(Error, Debug)]
pub enum Error {
    #[error(transparent)]
    Expr(#[from] varex_expr::Error),

    #[error(transparent)]
    Ann(#[from] varex_ann::Error),

    #[error(
        "record {index} ({chrom}:{pos}) has {count} ALT alleles; \
         split multi-allelic records before filtering"
    )]
    MoreThanOneAltAllele {
        chrom: String,
        pos: i64,
        index: usize,
        count: usize,
    },

    #[error("annotation key {key:?} is not declared in the header")]
    NoAnnotationField { key: String },

    #[error("tag {name:?} collides with a FILTER id declared in the header")]
    TagCollision { name: String },

    #[error("failed to load auxiliary set {name:?} from {path}: {source}")]
    Aux {
        name: String,
        path: String,
        #[source]
        source: std::io::Error,
    },
}
