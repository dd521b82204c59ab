//! Compiled expressions
//!
//! Orchestrates the compilation pipeline: Lex → Parse → Analyze. A compiled
//! [`Expr`] is immutable and can be evaluated against any number of records.

use std::collections::HashSet;

use tracing::debug;

use crate::analyzer::{self, Analysis, SymbolSpec};
use crate::ast::AstNode;
use crate::error::Result;
use crate::eval::{self, EvalContext};
use crate::parser::Parser;
use crate::value::Value;

/// A compiled, analyzed expression.
///
/// Compilation resolves every free identifier against the [`SymbolSpec`], so
/// a typo like `QAL >= 30` fails here with a caret-annotated message rather
/// than on some record mid-stream.
#[derive(Debug, Clone)]
pub struct Expr {
    source: String,
    ast: AstNode,
    analysis: Analysis,
}

impl Expr {
    pub fn compile(source: &str, spec: &SymbolSpec) -> Result<Expr> {
        let ast = Parser::new(source).parse()?;
        let analysis = analyzer::analyze(&ast, spec)?;
        debug!(source, referenced = ?analysis.referenced, "compiled expression");
        Ok(Expr {
            source: source.to_owned(),
            ast,
            analysis,
        })
    }

    /// Evaluate against one record. Errors here are per-record conditions
    /// (bad index, malformed field, arity violations surfaced lazily by the
    /// symbol source), never unresolved names.
    pub fn eval(&self, ctx: &EvalContext<'_>) -> Result<Value> {
        eval::eval_with(ctx, &self.ast)
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn ast(&self) -> &AstNode {
        &self.ast
    }

    /// Record symbols the expression references. The record layer uses this
    /// to skip decoding fields no expression looks at.
    pub fn referenced(&self) -> &HashSet<String> {
        &self.analysis.referenced
    }

    pub fn uses(&self, symbol: &str) -> bool {
        self.analysis.referenced.contains(symbol)
    }

    /// Rebuild this expression with a rewritten AST, keeping the analysis.
    /// Used for per-sample expansion, where the substituted sample name is a
    /// string literal and cannot introduce new symbols.
    pub fn with_ast(&self, ast: AstNode) -> Expr {
        Expr {
            source: ast.to_string(),
            ast,
            analysis: self.analysis.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;

    fn spec(symbols: &[&str]) -> SymbolSpec {
        SymbolSpec {
            symbols: symbols.iter().map(|s| s.to_string()).collect(),
            projection: false,
        }
    }

    struct NoSymbols;

    impl eval::SymbolSource for NoSymbols {
        fn lookup(&self, _name: &str) -> Result<Option<Value>> {
            Ok(None)
        }
    }

    #[test]
    fn compile_records_referenced_symbols() {
        let expr = Expr::compile("QUAL >= 30 and CHROM == '1'", &spec(&["QUAL", "CHROM", "POS"]))
            .unwrap();
        assert!(expr.uses("QUAL"));
        assert!(expr.uses("CHROM"));
        assert!(!expr.uses("POS"));
    }

    #[test]
    fn compile_rejects_unknown_identifier() {
        let err = Expr::compile("QAL >= 30", &spec(&["QUAL"])).unwrap_err();
        assert!(matches!(err, Error::UnknownIdentifier { ref name, .. } if name == "QAL"));
    }

    #[test]
    fn pure_expression_evaluates_without_symbols() {
        let expr = Expr::compile("1 + 2 * 3", &spec(&[])).unwrap();
        let ctx = EvalContext {
            source: &NoSymbols,
            ontology: None,
        };
        assert_eq!(expr.eval(&ctx).unwrap(), Value::Int(7));
    }
}
