//! Runtime values
//!
//! A closed tagged union over everything an expression can produce: record
//! scalars, containers, typed annotation composites, ontology terms, and
//! callables. Missing data is a first-class value, not an error.

use std::fmt;
use std::sync::Arc;

use varex_ann::{AnnValue, PosRange};
use varex_ontology::Term;

use crate::ast::AstNode;
use crate::error::Result;

/// An opaque host-provided container, indexed lazily.
///
/// The record layer implements this for INFO and FORMAT maps so that field
/// typing (and its arity errors) only happens for fields an expression
/// actually touches.
pub trait DynObject: fmt::Debug + Send + Sync {
    fn type_name(&self) -> &'static str;
    /// Look up a key. Key errors are evaluation errors, not panics.
    fn index(&self, key: &Value) -> Result<Value>;
    /// Membership test for `key in object`.
    fn contains(&self, key: &Value) -> Result<bool>;
}

/// A user lambda: one parameter, one body expression.
#[derive(Debug)]
pub struct LambdaFn {
    pub param: String,
    pub body: AstNode,
}

/// A runtime value
#[derive(Debug, Clone, Default)]
pub enum Value {
    /// Field declared in the header but unset on this record; also the
    /// value of the `None` literal. Behaves like [`Value::Na`] everywhere
    /// except under identity tests.
    Absent,
    /// Missing data: empty sub-field, failed decode, unknown term.
    #[default]
    Na,
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(Arc<str>),
    List(Vec<Value>),
    Tuple(Vec<Value>),
    /// Order-preserving, deduplicated.
    Set(Vec<Value>),
    /// Association list; short and linear-scanned.
    Dict(Vec<(Value, Value)>),
    Lambda(Arc<LambdaFn>),
    /// A registry function used as a value, e.g. `map(float, xs)`.
    Builtin(u16),
    Object(Arc<dyn DynObject>),
    Term(Term),
    Terms(Vec<Term>),
    PosRange(PosRange),
    NumberTotal {
        number: i64,
        total: i64,
    },
    RangeTotal {
        start: i64,
        end: i64,
        total: i64,
    },
    /// Predictions with scores, e.g. SIFT `tolerated(0.15)`.
    Scores(Vec<(Arc<str>, f64)>),
    /// `key:value` pairs, e.g. protein domains.
    Pairs(Vec<(Arc<str>, Arc<str>)>),
    /// Sort-direction marker produced by `asc()` / `desc()`; only the sort
    /// driver interprets it.
    Ordered {
        inner: Box<Value>,
        descending: bool,
    },
}

impl Value {
    pub fn str(s: impl Into<Arc<str>>) -> Self {
        Value::Str(s.into())
    }

    /// Both missing-data variants. They differ only under identity tests.
    pub fn is_missing(&self) -> bool {
        matches!(self, Value::Na | Value::Absent)
    }

    /// Python-style truthiness; missing data is falsy.
    pub fn is_truthy(&self) -> bool {
        match self {
            Value::Na | Value::Absent => false,
            Value::Bool(v) => *v,
            Value::Int(v) => *v != 0,
            Value::Float(v) => *v != 0.0,
            Value::Str(s) => !s.is_empty(),
            Value::List(items) | Value::Tuple(items) | Value::Set(items) => !items.is_empty(),
            Value::Dict(pairs) => !pairs.is_empty(),
            Value::Terms(terms) => !terms.is_empty(),
            Value::Scores(scores) => !scores.is_empty(),
            Value::Pairs(pairs) => !pairs.is_empty(),
            Value::Ordered { inner, .. } => inner.is_truthy(),
            _ => true,
        }
    }

    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Absent => "absent",
            Value::Na => "NA",
            Value::Bool(_) => "bool",
            Value::Int(_) => "int",
            Value::Float(_) => "float",
            Value::Str(_) => "str",
            Value::List(_) => "list",
            Value::Tuple(_) => "tuple",
            Value::Set(_) => "set",
            Value::Dict(_) => "dict",
            Value::Lambda(_) => "lambda",
            Value::Builtin(_) => "function",
            Value::Object(obj) => obj.type_name(),
            Value::Term(_) => "term",
            Value::Terms(_) => "terms",
            Value::PosRange(_) => "posrange",
            Value::NumberTotal { .. } => "numbertotal",
            Value::RangeTotal { .. } => "rangetotal",
            Value::Scores(_) => "scores",
            Value::Pairs(_) => "pairs",
            Value::Ordered { .. } => "ordered",
        }
    }

    /// Numeric view for arithmetic and comparisons.
    pub fn as_number(&self) -> Option<f64> {
        match self {
            Value::Int(v) => Some(*v as f64),
            Value::Float(v) => Some(*v),
            Value::Bool(v) => Some(*v as i64 as f64),
            _ => None,
        }
    }

    /// Convert to JSON for structured emission. Missing data maps to null.
    pub fn to_json(&self) -> serde_json::Value {
        use serde_json::json;
        match self {
            Value::Absent | Value::Na => serde_json::Value::Null,
            Value::Bool(v) => json!(v),
            Value::Int(v) => json!(v),
            Value::Float(v) => json!(v),
            Value::Str(v) => json!(v.as_ref()),
            Value::List(items) | Value::Tuple(items) | Value::Set(items) => {
                serde_json::Value::Array(items.iter().map(Value::to_json).collect())
            }
            Value::Dict(pairs) => serde_json::Value::Object(
                pairs
                    .iter()
                    .map(|(k, v)| (k.to_display_string(), v.to_json()))
                    .collect(),
            ),
            Value::Term(term) => json!(term.name()),
            Value::Terms(terms) => {
                serde_json::Value::Array(terms.iter().map(|t| json!(t.name())).collect())
            }
            Value::PosRange(range) => json!({
                "start": range.start,
                "end": range.end,
                "length": range.length,
            }),
            Value::NumberTotal { number, total } => json!({ "number": number, "total": total }),
            Value::RangeTotal { start, end, total } => {
                json!({ "start": start, "end": end, "total": total })
            }
            Value::Scores(scores) => serde_json::Value::Object(
                scores
                    .iter()
                    .map(|(name, score)| (name.to_string(), json!(score)))
                    .collect(),
            ),
            Value::Pairs(pairs) => serde_json::Value::Array(
                pairs
                    .iter()
                    .map(|(k, v)| json!([k.as_ref(), v.as_ref()]))
                    .collect(),
            ),
            Value::Ordered { inner, .. } => inner.to_json(),
            Value::Lambda(_) | Value::Builtin(_) | Value::Object(_) => serde_json::Value::Null,
        }
    }

    /// Plain-text rendering for projection output.
    pub fn to_display_string(&self) -> String {
        match self {
            Value::Absent | Value::Na => String::new(),
            Value::Str(v) => v.to_string(),
            Value::Bool(true) => "True".into(),
            Value::Bool(false) => "False".into(),
            Value::Int(v) => v.to_string(),
            Value::Float(v) => v.to_string(),
            Value::Term(term) => term.name().to_owned(),
            other => other.to_json().to_string(),
        }
    }
}

impl PartialEq for Value {
    /// Structural equality with cross-numeric comparison (`1 == 1.0`).
    /// Missing data never equals anything, itself included; the identity
    /// operators handle NA tests instead.
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::Na | Value::Absent, _) | (_, Value::Na | Value::Absent) => false,
            (Value::Bool(a), Value::Bool(b)) => a == b,
            (Value::Str(a), Value::Str(b)) => a == b,
            (Value::Term(a), Value::Term(b)) => a == b,
            // a term compares equal to its name
            (Value::Term(a), Value::Str(b)) | (Value::Str(b), Value::Term(a)) => {
                a.name() == b.as_ref()
            }
            (Value::Terms(a), Value::Terms(b)) => a == b,
            (Value::List(a), Value::List(b))
            | (Value::Tuple(a), Value::Tuple(b))
            | (Value::Set(a), Value::Set(b)) => a == b,
            (Value::Dict(a), Value::Dict(b)) => a == b,
            (Value::PosRange(a), Value::PosRange(b)) => a == b,
            (
                Value::NumberTotal { number: a, total: at },
                Value::NumberTotal { number: b, total: bt },
            ) => a == b && at == bt,
            (
                Value::RangeTotal { start: a, end: ae, total: at },
                Value::RangeTotal { start: b, end: be, total: bt },
            ) => a == b && ae == be && at == bt,
            (Value::Scores(a), Value::Scores(b)) => a == b,
            (Value::Pairs(a), Value::Pairs(b)) => a == b,
            (Value::Object(a), Value::Object(b)) => Arc::ptr_eq(a, b),
            (Value::Lambda(a), Value::Lambda(b)) => Arc::ptr_eq(a, b),
            (Value::Builtin(a), Value::Builtin(b)) => a == b,
            (Value::Ordered { inner: a, .. }, Value::Ordered { inner: b, .. }) => a == b,
            _ => match (self.as_number(), other.as_number()) {
                (Some(a), Some(b)) => a == b,
                _ => false,
            },
        }
    }
}

impl From<AnnValue> for Value {
    fn from(value: AnnValue) -> Self {
        match value {
            AnnValue::Na => Value::Na,
            AnnValue::Bool(v) => Value::Bool(v),
            AnnValue::Int(v) => Value::Int(v),
            AnnValue::Float(v) => Value::Float(v as f64),
            AnnValue::Str(v) => Value::str(v),
            AnnValue::List(items) => Value::List(items.into_iter().map(Value::str).collect()),
            AnnValue::Pairs(pairs) => Value::Pairs(
                pairs
                    .into_iter()
                    .map(|(k, v)| (Arc::from(k), Arc::from(v)))
                    .collect(),
            ),
            AnnValue::Scores(scores) => Value::Scores(
                scores
                    .into_iter()
                    .map(|(name, score)| (Arc::from(name), score as f64))
                    .collect(),
            ),
            AnnValue::Terms(names) => Value::Terms(names.into_iter().map(Term::new).collect()),
            AnnValue::PosRange(range) => Value::PosRange(range),
            AnnValue::NumberTotal { number, total } => Value::NumberTotal { number, total },
            AnnValue::RangeTotal { start, end, total } => Value::RangeTotal { start, end, total },
        }
    }
}
