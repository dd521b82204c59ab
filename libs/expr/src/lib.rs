//! Filter expression engine
//!
//! A sandboxed, Python-flavored expression language evaluated per variant
//! record. The pipeline is:
//!
//! ```text
//! Expression String
//!      |
//!   Lexer -> Tokens
//!      |
//!   Parser -> AST
//!      |
//! Static Analysis -> compiled Expr (all names resolved)
//!      |
//! Evaluation -> Value (per record, via a SymbolSource)
//! ```
//!
//! Missing data is a first-class value: `NA` propagates through operators,
//! is falsy, and iterates as empty, so a filter like `QUAL >= 30` simply
//! drops records with no quality instead of raising.

pub mod analyzer;
pub mod ast;
mod builtins;
pub mod engine;
pub mod error;
pub mod eval;
pub mod functions;
pub mod lexer;
pub mod ops;
pub mod parser;
pub mod token;
pub mod value;

// Re-export main types
pub use analyzer::{Analysis, SymbolSpec};
pub use ast::AstNode;
pub use engine::Expr;
pub use error::{Error, Result};
pub use eval::{EvalContext, SymbolSource};
pub use value::{DynObject, Value};
