//! Static analysis
//!
//! Runs once at compile time, between parsing and the first evaluation.
//! Resolves every free identifier against the caller-provided symbol set,
//! the namespace tables, and the function registry; anything unresolved is
//! a compile-time error with a source offset. This is the sandbox boundary:
//! an expression that survives analysis can only ever reach record symbols
//! and registered functions.

use std::collections::HashSet;

use crate::ast::AstNode;
use crate::error::{Error, Result};
use crate::functions::{self, FunctionMeta};

/// Compile-time symbol environment for an expression.
#[derive(Debug, Clone)]
pub struct SymbolSpec {
    /// Record symbols resolvable at evaluation time (CHROM, POS, INFO, the
    /// annotation alias, ...).
    pub symbols: HashSet<String>,
    /// Whether `for_each_sample` is legal (projection context only).
    pub projection: bool,
}

/// What analysis learned about an expression.
#[derive(Debug, Clone, Default)]
pub struct Analysis {
    /// Record symbols the expression actually references.
    pub referenced: HashSet<String>,
}

pub fn analyze(ast: &AstNode, spec: &SymbolSpec) -> Result<Analysis> {
    let mut analyzer = Analyzer {
        spec,
        bound: Vec::new(),
        analysis: Analysis::default(),
    };
    analyzer.walk(ast)?;
    Ok(analyzer.analysis)
}

struct Analyzer<'a> {
    spec: &'a SymbolSpec,
    bound: Vec<String>,
    analysis: Analysis,
}

impl Analyzer<'_> {
    fn walk(&mut self, node: &AstNode) -> Result<()> {
        match node {
            AstNode::Int(_)
            | AstNode::Float(_)
            | AstNode::Str(_)
            | AstNode::Bool(_)
            | AstNode::None
            | AstNode::Na => Ok(()),

            AstNode::Identifier { name, offset } => self.resolve_identifier(name, *offset),

            AstNode::Attribute { object, name, offset } => {
                if let AstNode::Identifier { name: base, .. } = object.as_ref() {
                    if let Some(members) = self.namespace(base) {
                        return if members.iter().any(|m| m.0 == name.as_str()) {
                            Ok(())
                        } else {
                            Err(Error::UnknownNamespaceMember {
                                namespace: base.clone(),
                                name: name.clone(),
                                offset: *offset,
                            })
                        };
                    }
                }
                self.walk(object)
            }

            AstNode::Index { object, index } => {
                self.walk(object)?;
                self.walk(index)
            }

            AstNode::Call { callee, args, offset } => self.walk_call(callee, args, *offset),

            AstNode::Unary { operand, .. } | AstNode::Not { operand } => self.walk(operand),

            AstNode::Binary { left, right, .. } | AstNode::BoolOp { left, right, .. } => {
                self.walk(left)?;
                self.walk(right)
            }

            AstNode::Ternary {
                condition,
                then,
                otherwise,
            } => {
                self.walk(condition)?;
                self.walk(then)?;
                self.walk(otherwise)
            }

            AstNode::List(items) | AstNode::Tuple(items) | AstNode::Set(items) => {
                items.iter().try_for_each(|item| self.walk(item))
            }

            AstNode::Dict(pairs) => pairs.iter().try_for_each(|(key, value)| {
                self.walk(key)?;
                self.walk(value)
            }),

            AstNode::Comprehension {
                element,
                var,
                iterable,
                condition,
            } => {
                self.walk(iterable)?;
                self.bound.push(var.clone());
                self.walk(element)?;
                if let Some(condition) = condition {
                    self.walk(condition)?;
                }
                self.bound.pop();
                Ok(())
            }

            AstNode::Lambda { param, body } => {
                self.bound.push(param.clone());
                self.walk(body)?;
                self.bound.pop();
                Ok(())
            }
        }
    }

    fn namespace(&self, name: &str) -> Option<&'static [functions::NamespaceMember]> {
        // a bound or record name shadows the namespace
        if self.is_bound(name) || self.spec.symbols.contains(name) {
            return None;
        }
        functions::namespace(name)
    }

    fn is_bound(&self, name: &str) -> bool {
        self.bound.iter().any(|b| b == name)
    }

    fn resolve_identifier(&mut self, name: &str, offset: usize) -> Result<()> {
        if self.is_bound(name) {
            return Ok(());
        }
        if self.spec.symbols.contains(name) {
            self.analysis.referenced.insert(name.to_owned());
            return Ok(());
        }
        if functions::namespace(name).is_some() {
            return Err(Error::Analyze {
                message: format!("`{name}` is a namespace; use a member like `{name}.x`"),
                offset,
            });
        }
        // registered functions may be used as values, e.g. map(float, xs)
        if functions::function(name).is_some() {
            return Ok(());
        }
        Err(Error::UnknownIdentifier {
            name: name.to_owned(),
            offset,
        })
    }

    fn walk_call(&mut self, callee: &AstNode, args: &[AstNode], offset: usize) -> Result<()> {
        // namespace member call: validated against the member table
        if let AstNode::Attribute {
            object,
            name,
            offset: member_offset,
        } = callee
        {
            if let AstNode::Identifier { name: base, .. } = object.as_ref() {
                if let Some(members) = self.namespace(base) {
                    let Some(member) = members.iter().find(|m| m.0 == name.as_str()) else {
                        return Err(Error::UnknownNamespaceMember {
                            namespace: base.clone(),
                            name: name.clone(),
                            offset: *member_offset,
                        });
                    };
                    if functions::is_namespace_constant(member) {
                        return Err(Error::Analyze {
                            message: format!("`{base}.{name}` is not callable"),
                            offset: *member_offset,
                        });
                    }
                    check_arity(&format!("{base}.{name}"), member.1, member.2, args.len(), offset)?;
                    return args.iter().try_for_each(|arg| self.walk(arg));
                }
            }
        }

        // registry function call
        if let AstNode::Identifier { name, offset: name_offset } = callee {
            if !self.is_bound(name) && !self.spec.symbols.contains(name) {
                let Some(meta) = functions::function(name) else {
                    if functions::namespace(name).is_some() {
                        return Err(Error::Analyze {
                            message: format!("`{name}` is a namespace, not a function"),
                            offset: *name_offset,
                        });
                    }
                    return Err(Error::UnknownFunction {
                        name: name.clone(),
                        offset: *name_offset,
                    });
                };
                self.check_function_call(meta, args, offset)?;
                return args.iter().try_for_each(|arg| self.walk(arg));
            }
        }

        // anything else (lambda values, method calls) is resolved at
        // evaluation time against fixed dispatch tables
        self.walk(callee)?;
        args.iter().try_for_each(|arg| self.walk(arg))
    }

    fn check_function_call(
        &mut self,
        meta: &FunctionMeta,
        args: &[AstNode],
        offset: usize,
    ) -> Result<()> {
        check_arity(meta.name, meta.min_args, meta.max_args, args.len(), offset)?;

        if meta.id == functions::FN_FOR_EACH_SAMPLE {
            if !self.spec.projection {
                return Err(Error::Analyze {
                    message: "`for_each_sample` is only valid in projections".into(),
                    offset,
                });
            }
            if !matches!(args.first(), Some(AstNode::Lambda { .. })) {
                return Err(Error::Analyze {
                    message: "`for_each_sample` takes a lambda, e.g. for_each_sample(lambda s: ...)"
                        .into(),
                    offset,
                });
            }
        }

        // genotype predicates read the call set lazily; record that they
        // touch FORMAT and the sample list
        if matches!(
            meta.id,
            functions::FN_IS_HET
                | functions::FN_IS_HOM
                | functions::FN_ANY_REF
                | functions::FN_ANY_VAR
        ) {
            for name in ["FORMAT", "SAMPLES"] {
                if self.spec.symbols.contains(name) {
                    self.analysis.referenced.insert(name.to_owned());
                }
            }
        }

        Ok(())
    }
}

fn check_arity(
    name: &str,
    min: usize,
    max: Option<usize>,
    got: usize,
    offset: usize,
) -> Result<()> {
    let ok = got >= min && max.map_or(true, |max| got <= max);
    if ok {
        return Ok(());
    }
    let expected = match max {
        Some(max) if max == min => format!("exactly {min}"),
        Some(max) => format!("between {min} and {max}"),
        None => format!("at least {min}"),
    };
    Err(Error::Arity {
        name: name.to_owned(),
        expected,
        got,
        offset,
    })
}
