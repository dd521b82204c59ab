//! Expression evaluation
//!
//! A tree walk over the analyzed AST. Evaluation is purely functional: the
//! record is read through a [`SymbolSource`] and never mutated. Known-safe
//! missing-data situations (NA operands, attribute or index access on NA)
//! yield NA; everything else unanswerable is a per-record [`Error::Eval`].

use std::collections::HashSet;
use std::sync::{Mutex, OnceLock};

use tracing::warn;
use varex_ontology::Ontology;

use crate::ast::{AstNode, BoolOpKind};
use crate::builtins;
use crate::error::{Error, Result};
use crate::functions;
use crate::ops;
use crate::value::{LambdaFn, Value};

/// Record symbol resolution, implemented by the record layer.
///
/// `lookup` returns `None` for names outside the record symbol set; the
/// analyzer guarantees expressions only reach names that resolve here or in
/// the function registry.
pub trait SymbolSource {
    fn lookup(&self, name: &str) -> Result<Option<Value>>;
}

/// Shared evaluation context: the record symbols and the optional ontology
/// backing term methods.
pub struct EvalContext<'a> {
    pub source: &'a dyn SymbolSource,
    pub ontology: Option<&'a Ontology>,
}

/// Warn once per attribute name when something is accessed on missing data.
pub(crate) fn warn_missing_access(what: &str, name: &str) {
    static SEEN: OnceLock<Mutex<HashSet<String>>> = OnceLock::new();
    let seen = SEEN.get_or_init(|| Mutex::new(HashSet::new()));
    if let Ok(mut seen) = seen.lock() {
        if seen.insert(name.to_owned()) {
            warn!(name, "{what} on missing value yields NA");
        }
    }
}

pub(crate) struct Evaluator<'a> {
    pub(crate) ctx: &'a EvalContext<'a>,
    locals: Vec<(String, Value)>,
}

impl<'a> Evaluator<'a> {
    pub(crate) fn new(ctx: &'a EvalContext<'a>) -> Self {
        Self {
            ctx,
            locals: Vec::new(),
        }
    }

    pub(crate) fn eval(&mut self, node: &AstNode) -> Result<Value> {
        match node {
            AstNode::Int(v) => Ok(Value::Int(*v)),
            AstNode::Float(v) => Ok(Value::Float(*v)),
            AstNode::Str(v) => Ok(Value::str(v.as_str())),
            AstNode::Bool(v) => Ok(Value::Bool(*v)),
            AstNode::None => Ok(Value::Absent),
            AstNode::Na => Ok(Value::Na),

            AstNode::Identifier { name, .. } => self.resolve(name),

            AstNode::Attribute { object, name, .. } => {
                if let Some(value) = self.namespace_constant(object, name)? {
                    return Ok(value);
                }
                let object = self.eval(object)?;
                self.attribute(&object, name)
            }

            AstNode::Index { object, index } => {
                let object = self.eval(object)?;
                let index = self.eval(index)?;
                self.index(&object, &index)
            }

            AstNode::Call { callee, args, .. } => self.call(callee, args),

            AstNode::Unary { op, operand } => {
                let operand = self.eval(operand)?;
                ops::unary(*op, &operand)
            }

            AstNode::Binary { left, op, right } => {
                let left = self.eval(left)?;
                let right = self.eval(right)?;
                ops::binary(*op, &left, &right)
            }

            // `and`/`or` short-circuit and return an operand, so falsy NA
            // flows through rather than collapsing to a bool
            AstNode::BoolOp { op, left, right } => {
                let left = self.eval(left)?;
                match op {
                    BoolOpKind::And if !left.is_truthy() => Ok(left),
                    BoolOpKind::Or if left.is_truthy() => Ok(left),
                    _ => self.eval(right),
                }
            }

            AstNode::Not { operand } => {
                let operand = self.eval(operand)?;
                Ok(Value::Bool(!operand.is_truthy()))
            }

            AstNode::Ternary {
                condition,
                then,
                otherwise,
            } => {
                if self.eval(condition)?.is_truthy() {
                    self.eval(then)
                } else {
                    self.eval(otherwise)
                }
            }

            AstNode::List(items) => Ok(Value::List(self.eval_all(items)?)),
            AstNode::Tuple(items) => Ok(Value::Tuple(self.eval_all(items)?)),
            AstNode::Set(items) => Ok(builtins::make_set(self.eval_all(items)?)),
            AstNode::Dict(pairs) => {
                let mut out = Vec::with_capacity(pairs.len());
                for (key, value) in pairs {
                    out.push((self.eval(key)?, self.eval(value)?));
                }
                Ok(Value::Dict(out))
            }

            AstNode::Comprehension {
                element,
                var,
                iterable,
                condition,
            } => {
                let iterable = self.eval(iterable)?;
                let mut out = Vec::new();
                for item in builtins::iter_values(&iterable)? {
                    self.locals.push((var.clone(), item));
                    let keep = match condition {
                        Some(condition) => self.eval(condition)?.is_truthy(),
                        None => true,
                    };
                    if keep {
                        out.push(self.eval(element)?);
                    }
                    self.locals.pop();
                }
                Ok(Value::List(out))
            }

            AstNode::Lambda { param, body } => Ok(Value::Lambda(
                LambdaFn {
                    param: param.clone(),
                    body: (**body).clone(),
                }
                .into(),
            )),
        }
    }

    fn eval_all(&mut self, items: &[AstNode]) -> Result<Vec<Value>> {
        items.iter().map(|item| self.eval(item)).collect()
    }

    fn resolve(&mut self, name: &str) -> Result<Value> {
        if let Some((_, value)) = self.locals.iter().rev().find(|(n, _)| n == name) {
            return Ok(value.clone());
        }
        if let Some(value) = self.ctx.source.lookup(name)? {
            return Ok(value);
        }
        if let Some(meta) = functions::function(name) {
            return Ok(Value::Builtin(meta.id));
        }
        // unreachable for analyzed expressions
        Err(Error::Eval(format!("unresolved identifier `{name}`")))
    }

    /// `math.pi` and friends; `None` when the attribute base is not an
    /// unshadowed namespace identifier.
    fn namespace_constant(&mut self, object: &AstNode, name: &str) -> Result<Option<Value>> {
        let AstNode::Identifier { name: base, .. } = object else {
            return Ok(None);
        };
        if self.is_shadowed(base) || functions::namespace(base).is_none() {
            return Ok(None);
        }
        builtins::namespace_constant(base, name).map(Some)
    }

    fn is_shadowed(&self, name: &str) -> bool {
        self.locals.iter().any(|(n, _)| n == name)
            || matches!(self.ctx.source.lookup(name), Ok(Some(_)))
    }

    fn attribute(&mut self, object: &Value, name: &str) -> Result<Value> {
        let missing = |v: Option<i64>| v.map_or(Value::Na, Value::Int);
        match object {
            Value::Na | Value::Absent => {
                warn_missing_access("attribute access", name);
                Ok(Value::Na)
            }
            Value::PosRange(range) => match name {
                "start" => Ok(missing(range.start)),
                "end" => Ok(missing(range.end)),
                "length" => Ok(missing(range.length)),
                _ => Err(no_attribute(object, name)),
            },
            Value::NumberTotal { number, total } => match name {
                "number" => Ok(Value::Int(*number)),
                "total" => Ok(Value::Int(*total)),
                _ => Err(no_attribute(object, name)),
            },
            Value::RangeTotal { start, end, total } => match name {
                "start" => Ok(Value::Int(*start)),
                "end" => Ok(Value::Int(*end)),
                "total" => Ok(Value::Int(*total)),
                _ => Err(no_attribute(object, name)),
            },
            _ => Err(no_attribute(object, name)),
        }
    }

    fn index(&mut self, object: &Value, index: &Value) -> Result<Value> {
        match object {
            Value::Na | Value::Absent => {
                warn_missing_access("index access", &index.to_display_string());
                Ok(Value::Na)
            }
            Value::Object(dyn_object) => dyn_object.index(index),
            Value::List(items) | Value::Tuple(items) | Value::Set(items) => {
                sequence_index(items, index).cloned()
            }
            Value::Str(s) => {
                let chars: Vec<Value> = s.chars().map(|c| Value::str(c.to_string())).collect();
                sequence_index(&chars, index).cloned()
            }
            Value::Dict(pairs) => {
                if index.is_missing() {
                    return Ok(Value::Na);
                }
                pairs
                    .iter()
                    .find(|(key, _)| key == index)
                    .map(|(_, value)| value.clone())
                    .ok_or_else(|| {
                        Error::Eval(format!("key not found: {}", index.to_display_string()))
                    })
            }
            Value::Terms(terms) => {
                let items: Vec<Value> = terms.iter().cloned().map(Value::Term).collect();
                sequence_index(&items, index).cloned()
            }
            Value::Scores(scores) => match index {
                Value::Str(name) => scores
                    .iter()
                    .find(|(n, _)| n == name)
                    .map(|(_, score)| Value::Float(*score))
                    .ok_or_else(|| Error::Eval(format!("no prediction named {name:?}"))),
                _ => Err(Error::Eval("prediction scores are keyed by name".into())),
            },
            Value::Pairs(pairs) => match index {
                Value::Str(key) => pairs
                    .iter()
                    .find(|(k, _)| k == key)
                    .map(|(_, value)| Value::str(value.clone()))
                    .ok_or_else(|| Error::Eval(format!("no entry named {key:?}"))),
                Value::Int(_) => {
                    let items: Vec<Value> = pairs
                        .iter()
                        .map(|(k, v)| {
                            Value::Tuple(vec![Value::Str(k.clone()), Value::Str(v.clone())])
                        })
                        .collect();
                    sequence_index(&items, index).cloned()
                }
                _ => Err(Error::Eval("pairs are indexed by key or position".into())),
            },
            other => Err(Error::Eval(format!(
                "{} is not indexable",
                other.type_name()
            ))),
        }
    }

    fn call(&mut self, callee: &AstNode, args: &[AstNode]) -> Result<Value> {
        // namespace member call (math.log, re.search, statistics.mean)
        if let AstNode::Attribute { object, name, .. } = callee {
            if let AstNode::Identifier { name: base, .. } = object.as_ref() {
                if !self.is_shadowed(base) && functions::namespace(base).is_some() {
                    let args = self.eval_all(args)?;
                    return builtins::namespace_call(base, name, &args);
                }
            }
            // method call on a value
            let object = self.eval(object)?;
            return builtins::method_call(self, &object, name, args);
        }

        // registry function call by name
        if let AstNode::Identifier { name, .. } = callee {
            let local = self
                .locals
                .iter()
                .rev()
                .any(|(n, _)| n == name);
            if !local && !matches!(self.ctx.source.lookup(name), Ok(Some(_))) {
                if let Some(meta) = functions::function(name) {
                    return builtins::call_builtin(self, meta.id, args);
                }
            }
        }

        // first-class callables: lambdas and functions used as values
        let callee = self.eval(callee)?;
        let args = self.eval_all(args)?;
        self.call_value(&callee, &args)
    }

    /// Invoke a callable value with already-evaluated arguments.
    pub(crate) fn call_value(&mut self, callee: &Value, args: &[Value]) -> Result<Value> {
        match callee {
            Value::Lambda(lambda) => {
                let [arg] = args else {
                    return Err(Error::Eval(format!(
                        "lambda takes exactly 1 argument, got {}",
                        args.len()
                    )));
                };
                self.locals.push((lambda.param.clone(), arg.clone()));
                let result = self.eval(&lambda.body);
                self.locals.pop();
                result
            }
            Value::Builtin(id) => builtins::call_builtin_values(self, *id, args),
            other => Err(Error::Eval(format!(
                "{} is not callable",
                other.type_name()
            ))),
        }
    }
}

fn no_attribute(object: &Value, name: &str) -> Error {
    Error::Eval(format!("{} has no attribute `{name}`", object.type_name()))
}

fn sequence_index<'v>(items: &'v [Value], index: &Value) -> Result<&'v Value> {
    let Value::Int(i) = index else {
        return Err(Error::Eval(format!(
            "sequence indices must be integers, got {}",
            index.type_name()
        )));
    };
    let len = items.len() as i64;
    let resolved = if *i < 0 { i + len } else { *i };
    if resolved < 0 || resolved >= len {
        return Err(Error::Eval(format!("index {i} out of range (length {len})")));
    }
    Ok(&items[resolved as usize])
}

/// Convenience used by the engine and tests.
pub(crate) fn eval_with(ctx: &EvalContext<'_>, ast: &AstNode) -> Result<Value> {
    Evaluator::new(ctx).eval(ast)
}

/// Ontology handle or NA-with-warning when none is loaded.
pub(crate) fn ontology_or_na<'a>(ctx: &EvalContext<'a>) -> Option<&'a Ontology> {
    if ctx.ontology.is_none() {
        warn_missing_access("ontology query", "no ontology loaded");
    }
    ctx.ontology
}
