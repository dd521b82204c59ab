//! Registry function implementations
//!
//! Evaluation side of the closed function registry: aggregates, iterator
//! helpers, constructors, missing-data helpers, genotype predicates, the
//! `math` / `statistics` / `re` namespaces, and the method dispatch tables
//! for strings, dicts, and ontology terms.

use std::collections::HashMap;
use std::sync::{Mutex, OnceLock};

use regex::Regex;
use varex_ontology::Term;

use crate::ast::AstNode;
use crate::error::{Error, Result};
use crate::eval::{ontology_or_na, warn_missing_access, Evaluator};
use crate::functions::*;
use crate::ops;
use crate::value::Value;

/// Build a set value: order-preserving, deduplicated.
pub(crate) fn make_set(items: Vec<Value>) -> Value {
    let mut out: Vec<Value> = Vec::with_capacity(items.len());
    for item in items {
        let duplicate = out
            .iter()
            .any(|existing| *existing == item || (existing.is_missing() && item.is_missing()));
        if !duplicate {
            out.push(item);
        }
    }
    Value::Set(out)
}

/// The elements of an iterable value. Missing data iterates as empty, so
/// `any(... for x in NA)` is simply false.
pub(crate) fn iter_values(value: &Value) -> Result<Vec<Value>> {
    match value {
        Value::Na | Value::Absent => Ok(Vec::new()),
        Value::List(items) | Value::Tuple(items) | Value::Set(items) => Ok(items.clone()),
        Value::Str(s) => Ok(s.chars().map(|c| Value::str(c.to_string())).collect()),
        Value::Dict(pairs) => Ok(pairs.iter().map(|(key, _)| key.clone()).collect()),
        Value::Terms(terms) => Ok(terms.iter().cloned().map(Value::Term).collect()),
        Value::Scores(scores) => Ok(scores.iter().map(|(n, _)| Value::Str(n.clone())).collect()),
        Value::Pairs(pairs) => Ok(pairs
            .iter()
            .map(|(k, v)| Value::Tuple(vec![Value::Str(k.clone()), Value::Str(v.clone())]))
            .collect()),
        other => Err(Error::Eval(format!(
            "{} is not iterable",
            other.type_name()
        ))),
    }
}

pub(crate) fn call_builtin(
    evaluator: &mut Evaluator<'_>,
    id: u16,
    args: &[AstNode],
) -> Result<Value> {
    let values: Vec<Value> = args
        .iter()
        .map(|arg| evaluator.eval(arg))
        .collect::<Result<_>>()?;
    call_builtin_values(evaluator, id, &values)
}

pub(crate) fn call_builtin_values(
    evaluator: &mut Evaluator<'_>,
    id: u16,
    args: &[Value],
) -> Result<Value> {
    match id {
        FN_ABS => abs(&args[0]),
        FN_ALL => Ok(Value::Bool(
            iter_values(&args[0])?.iter().all(Value::is_truthy),
        )),
        FN_ANY => Ok(Value::Bool(
            iter_values(&args[0])?.iter().any(Value::is_truthy),
        )),
        FN_LEN => len(&args[0]),
        FN_MAX => extremum(args, true),
        FN_MIN => extremum(args, false),
        FN_ROUND => round(args),
        FN_SUM => sum(args),
        FN_SORTED => sorted(evaluator, args),
        FN_ENUMERATE => enumerate(args),
        FN_FILTER => {
            let mut out = Vec::new();
            for item in iter_values(&args[1])? {
                if evaluator.call_value(&args[0], &[item.clone()])?.is_truthy() {
                    out.push(item);
                }
            }
            Ok(Value::List(out))
        }
        FN_MAP => map(evaluator, args),
        FN_RANGE => range(args),
        FN_REVERSED => {
            let mut items = iter_values(&args[0])?;
            items.reverse();
            Ok(Value::List(items))
        }
        FN_ZIP => zip(args),
        FN_BOOL => Ok(match &args[0] {
            Value::Na | Value::Absent => Value::Na,
            other => Value::Bool(other.is_truthy()),
        }),
        FN_DICT => dict(args),
        FN_FLOAT => to_float(&args[0]),
        FN_INT => to_int(&args[0]),
        FN_LIST => Ok(Value::List(match args {
            [] => Vec::new(),
            [value] => iter_values(value)?,
            _ => unreachable!(),
        })),
        FN_SET => Ok(make_set(match args {
            [] => Vec::new(),
            [value] => iter_values(value)?,
            _ => unreachable!(),
        })),
        FN_STR => Ok(Value::str(args[0].to_display_string())),
        FN_TUPLE => Ok(Value::Tuple(match args {
            [] => Vec::new(),
            [value] => iter_values(value)?,
            _ => unreachable!(),
        })),
        FN_CHR => match &args[0] {
            Value::Int(code) => u32::try_from(*code)
                .ok()
                .and_then(char::from_u32)
                .map(|c| Value::str(c.to_string()))
                .ok_or_else(|| Error::Eval(format!("chr() out of range: {code}"))),
            Value::Na | Value::Absent => Ok(Value::Na),
            other => Err(Error::Eval(format!("chr() expects an int, got {}", other.type_name()))),
        },
        FN_ORD => match &args[0] {
            Value::Str(s) if s.chars().count() == 1 => {
                Ok(Value::Int(s.chars().next().map(|c| c as i64).unwrap_or(0)))
            }
            Value::Na | Value::Absent => Ok(Value::Na),
            _ => Err(Error::Eval("ord() expects a single-character string".into())),
        },
        FN_WITHOUT_NA => Ok(Value::List(
            iter_values(&args[0])?
                .into_iter()
                .filter(|item| !is_na_like(item))
                .collect(),
        )),
        FN_REPLACE_NA => Ok(Value::List(
            iter_values(&args[0])?
                .into_iter()
                .map(|item| {
                    if is_na_like(&item) {
                        args[1].clone()
                    } else {
                        item
                    }
                })
                .collect(),
        )),
        FN_IS_NA => Ok(Value::Bool(is_na_like(&args[0]))),
        FN_IS_HET | FN_IS_HOM | FN_ANY_REF | FN_ANY_VAR => {
            genotype_predicate(evaluator, id, &args[0])
        }
        FN_ASC => Ok(Value::Ordered {
            inner: Box::new(args[0].clone()),
            descending: false,
        }),
        FN_DESC => Ok(Value::Ordered {
            inner: Box::new(args[0].clone()),
            descending: true,
        }),
        FN_FOR_EACH_SAMPLE => Err(Error::Eval(
            "`for_each_sample` must be expanded before evaluation".into(),
        )),
        _ => Err(Error::Eval(format!("unknown function id {id}"))),
    }
}

/// NA in the wide sense used by the missing-data helpers: NA, unset field,
/// or NaN.
fn is_na_like(value: &Value) -> bool {
    match value {
        Value::Na | Value::Absent => true,
        Value::Float(v) => v.is_nan(),
        _ => false,
    }
}

fn abs(value: &Value) -> Result<Value> {
    match value {
        Value::Na | Value::Absent => Ok(Value::Na),
        Value::Int(v) => Ok(Value::Int(v.abs())),
        Value::Float(v) => Ok(Value::Float(v.abs())),
        Value::Bool(v) => Ok(Value::Int(*v as i64)),
        other => Err(Error::Eval(format!("abs() expects a number, got {}", other.type_name()))),
    }
}

fn len(value: &Value) -> Result<Value> {
    let length = match value {
        // NA behaves like the empty string
        Value::Na | Value::Absent => 0,
        Value::Str(s) => s.chars().count(),
        Value::List(items) | Value::Tuple(items) | Value::Set(items) => items.len(),
        Value::Dict(pairs) => pairs.len(),
        Value::Terms(terms) => terms.len(),
        Value::Scores(scores) => scores.len(),
        Value::Pairs(pairs) => pairs.len(),
        other => {
            return Err(Error::Eval(format!("{} has no length", other.type_name())));
        }
    };
    Ok(Value::Int(length as i64))
}

/// max()/min(): over a single iterable argument or over the arguments
/// themselves. Any missing element makes the result NA.
fn extremum(args: &[Value], want_max: bool) -> Result<Value> {
    let items = if args.len() == 1 {
        iter_values(&args[0])?
    } else {
        args.to_vec()
    };
    if items.is_empty() {
        return Err(Error::Eval(if want_max {
            "max() of an empty sequence".into()
        } else {
            "min() of an empty sequence".into()
        }));
    }
    if items.iter().any(is_na_like) {
        return Ok(Value::Na);
    }
    let mut best = items[0].clone();
    for item in &items[1..] {
        let replace = match ops::binary(
            if want_max { crate::ast::BinaryOp::Gt } else { crate::ast::BinaryOp::Lt },
            item,
            &best,
        )? {
            Value::Bool(replace) => replace,
            _ => false,
        };
        if replace {
            best = item.clone();
        }
    }
    Ok(best)
}

fn round(args: &[Value]) -> Result<Value> {
    let digits = match args.get(1) {
        None => 0,
        Some(Value::Int(d)) => *d,
        Some(other) => {
            return Err(Error::Eval(format!(
                "round() digits must be an int, got {}",
                other.type_name()
            )))
        }
    };
    match &args[0] {
        Value::Na | Value::Absent => Ok(Value::Na),
        Value::Int(v) => Ok(Value::Int(*v)),
        Value::Float(v) => {
            let scale = 10f64.powi(digits as i32);
            let rounded = (v * scale).round() / scale;
            if args.len() == 1 {
                Ok(Value::Int(rounded as i64))
            } else {
                Ok(Value::Float(rounded))
            }
        }
        other => Err(Error::Eval(format!("round() expects a number, got {}", other.type_name()))),
    }
}

fn sum(args: &[Value]) -> Result<Value> {
    let mut acc = match args.get(1) {
        Some(start) => start.clone(),
        None => Value::Int(0),
    };
    for item in iter_values(&args[0])? {
        acc = ops::binary(crate::ast::BinaryOp::Add, &acc, &item)?;
    }
    Ok(acc)
}

fn sorted(evaluator: &mut Evaluator<'_>, args: &[Value]) -> Result<Value> {
    let items = iter_values(&args[0])?;
    let mut keyed: Vec<(Value, Value)> = match args.get(1) {
        None => items.iter().map(|item| (item.clone(), item.clone())).collect(),
        Some(key_fn) => {
            let mut keyed = Vec::with_capacity(items.len());
            for item in &items {
                let key = evaluator.call_value(key_fn, &[item.clone()])?;
                keyed.push((key, item.clone()));
            }
            keyed
        }
    };
    keyed.sort_by(|(a, _), (b, _)| ops::cmp_total(a, b));
    Ok(Value::List(keyed.into_iter().map(|(_, item)| item).collect()))
}

fn enumerate(args: &[Value]) -> Result<Value> {
    let start = match args.get(1) {
        None => 0,
        Some(Value::Int(start)) => *start,
        Some(other) => {
            return Err(Error::Eval(format!(
                "enumerate() start must be an int, got {}",
                other.type_name()
            )))
        }
    };
    Ok(Value::List(
        iter_values(&args[0])?
            .into_iter()
            .enumerate()
            .map(|(i, item)| Value::Tuple(vec![Value::Int(start + i as i64), item]))
            .collect(),
    ))
}

fn map(evaluator: &mut Evaluator<'_>, args: &[Value]) -> Result<Value> {
    let iterables: Vec<Vec<Value>> = args[1..]
        .iter()
        .map(iter_values)
        .collect::<Result<_>>()?;
    let shortest = iterables.iter().map(Vec::len).min().unwrap_or(0);
    let mut out = Vec::with_capacity(shortest);
    for i in 0..shortest {
        let row: Vec<Value> = iterables.iter().map(|it| it[i].clone()).collect();
        out.push(evaluator.call_value(&args[0], &row)?);
    }
    Ok(Value::List(out))
}

fn range(args: &[Value]) -> Result<Value> {
    let int = |value: &Value| match value {
        Value::Int(v) => Ok(*v),
        other => Err(Error::Eval(format!(
            "range() expects ints, got {}",
            other.type_name()
        ))),
    };
    let (start, stop, step) = match args {
        [stop] => (0, int(stop)?, 1),
        [start, stop] => (int(start)?, int(stop)?, 1),
        [start, stop, step] => (int(start)?, int(stop)?, int(step)?),
        _ => unreachable!(),
    };
    if step == 0 {
        return Err(Error::Eval("range() step must not be zero".into()));
    }
    let mut out = Vec::new();
    let mut current = start;
    while (step > 0 && current < stop) || (step < 0 && current > stop) {
        out.push(Value::Int(current));
        current += step;
    }
    Ok(Value::List(out))
}

fn zip(args: &[Value]) -> Result<Value> {
    let iterables: Vec<Vec<Value>> = args.iter().map(iter_values).collect::<Result<_>>()?;
    let shortest = iterables.iter().map(Vec::len).min().unwrap_or(0);
    let mut out = Vec::with_capacity(shortest);
    for i in 0..shortest {
        out.push(Value::Tuple(
            iterables.iter().map(|it| it[i].clone()).collect(),
        ));
    }
    Ok(Value::List(out))
}

fn dict(args: &[Value]) -> Result<Value> {
    match args {
        [] => Ok(Value::Dict(Vec::new())),
        [Value::Dict(pairs)] => Ok(Value::Dict(pairs.clone())),
        [value] => {
            let mut out = Vec::new();
            for item in iter_values(value)? {
                match item {
                    Value::Tuple(kv) | Value::List(kv) if kv.len() == 2 => {
                        out.push((kv[0].clone(), kv[1].clone()));
                    }
                    _ => {
                        return Err(Error::Eval(
                            "dict() expects an iterable of key/value pairs".into(),
                        ))
                    }
                }
            }
            Ok(Value::Dict(out))
        }
        _ => unreachable!(),
    }
}

/// float(): narrowed through f32, matching the 32-bit floats of the record
/// format and of float literals.
fn to_float(value: &Value) -> Result<Value> {
    match value {
        Value::Na | Value::Absent => Ok(Value::Na),
        Value::Int(v) => Ok(Value::Float(*v as f32 as f64)),
        Value::Float(v) => Ok(Value::Float(*v)),
        Value::Bool(v) => Ok(Value::Float(*v as i64 as f64)),
        Value::Str(s) => s
            .trim()
            .parse::<f32>()
            .map(|v| Value::Float(v as f64))
            .map_err(|_| Error::Eval(format!("could not convert {s:?} to float"))),
        other => Err(Error::Eval(format!(
            "float() argument must be a string or number, got {}",
            other.type_name()
        ))),
    }
}

fn to_int(value: &Value) -> Result<Value> {
    match value {
        Value::Na | Value::Absent => Ok(Value::Na),
        Value::Int(v) => Ok(Value::Int(*v)),
        Value::Float(v) => Ok(Value::Int(v.trunc() as i64)),
        Value::Bool(v) => Ok(Value::Int(*v as i64)),
        Value::Str(s) => s
            .trim()
            .parse::<i64>()
            .map(Value::Int)
            .map_err(|_| Error::Eval(format!("could not convert {s:?} to int"))),
        other => Err(Error::Eval(format!(
            "int() argument must be a string or number, got {}",
            other.type_name()
        ))),
    }
}

// ---------------------------------------------------------------------------
// Genotype predicates

fn genotype_predicate(
    evaluator: &mut Evaluator<'_>,
    id: u16,
    sample: &Value,
) -> Result<Value> {
    let Some(alleles) = sample_alleles(evaluator, sample)? else {
        return Ok(Value::Na);
    };
    if alleles.iter().any(Option::is_none) {
        return Ok(Value::Na);
    }
    let known: Vec<i64> = alleles.into_iter().flatten().collect();
    let result = match id {
        FN_IS_HET => known.iter().any(|a| Some(*a) != known.first().copied()),
        FN_IS_HOM => !known.is_empty() && known.iter().all(|a| *a == known[0]),
        FN_ANY_REF => known.iter().any(|a| *a == 0),
        FN_ANY_VAR => known.iter().any(|a| *a > 0),
        _ => unreachable!(),
    };
    Ok(Value::Bool(result))
}

/// Resolve a sample (by name or index) to its genotype allele list.
/// `None` means the genotype is not available for this record.
fn sample_alleles(
    evaluator: &mut Evaluator<'_>,
    sample: &Value,
) -> Result<Option<Vec<Option<i64>>>> {
    let sample_name = match sample {
        Value::Str(name) => Value::Str(name.clone()),
        Value::Int(index) => {
            let Some(samples) = evaluator.ctx.source.lookup("SAMPLES")? else {
                return Err(Error::Eval("no sample list available".into()));
            };
            let items = iter_values(&samples)?;
            let Some(name) = items.get(*index as usize) else {
                return Err(Error::Eval(format!("sample index {index} out of range")));
            };
            name.clone()
        }
        other => {
            return Err(Error::Eval(format!(
                "sample must be a name or index, got {}",
                other.type_name()
            )))
        }
    };

    let Some(format) = evaluator.ctx.source.lookup("FORMAT")? else {
        return Err(Error::Eval("no FORMAT fields available".into()));
    };
    let per_sample = match &format {
        Value::Object(object) => object.index(&Value::str("GT"))?,
        other => {
            return Err(Error::Eval(format!(
                "FORMAT is not indexable: {}",
                other.type_name()
            )))
        }
    };
    let genotype = match &per_sample {
        Value::Na | Value::Absent => return Ok(None),
        Value::Object(object) => object.index(&sample_name)?,
        Value::Dict(pairs) => pairs
            .iter()
            .find(|(key, _)| *key == sample_name)
            .map(|(_, value)| value.clone())
            .ok_or_else(|| {
                Error::Eval(format!("unknown sample {}", sample_name.to_display_string()))
            })?,
        other => {
            return Err(Error::Eval(format!(
                "GT is not per-sample: {}",
                other.type_name()
            )))
        }
    };

    match &genotype {
        Value::Na | Value::Absent => Ok(None),
        Value::Str(gt) => {
            let alleles = gt
                .split(['/', '|'])
                .map(|allele| {
                    if allele == "." {
                        Ok(None)
                    } else {
                        allele
                            .parse::<i64>()
                            .map(Some)
                            .map_err(|_| Error::Eval(format!("malformed genotype {gt:?}")))
                    }
                })
                .collect::<Result<Vec<_>>>()?;
            Ok(Some(alleles))
        }
        other => Err(Error::Eval(format!(
            "genotype must be a string, got {}",
            other.type_name()
        ))),
    }
}

// ---------------------------------------------------------------------------
// Namespaces

pub(crate) fn namespace_constant(namespace: &str, name: &str) -> Result<Value> {
    let value = match (namespace, name) {
        ("math", "pi") => std::f64::consts::PI,
        ("math", "e") => std::f64::consts::E,
        ("math", "tau") => std::f64::consts::TAU,
        ("math", "inf") => f64::INFINITY,
        ("math", "nan") => f64::NAN,
        _ => {
            return Err(Error::Eval(format!(
                "`{namespace}.{name}` is not a constant"
            )))
        }
    };
    Ok(Value::Float(value))
}

pub(crate) fn namespace_call(namespace: &str, name: &str, args: &[Value]) -> Result<Value> {
    match namespace {
        "math" => math_call(name, args),
        "statistics" => statistics_call(name, args),
        "re" => re_call(name, args),
        _ => Err(Error::Eval(format!("unknown namespace `{namespace}`"))),
    }
}

fn math_call(name: &str, args: &[Value]) -> Result<Value> {
    if args.iter().any(Value::is_missing) {
        return Ok(Value::Na);
    }
    let number = |value: &Value| {
        value.as_number().ok_or_else(|| {
            Error::Eval(format!("math.{name}() expects a number, got {}", value.type_name()))
        })
    };
    let x = number(&args[0])?;
    let result = match name {
        "sqrt" => {
            if x < 0.0 {
                return Err(Error::Eval("math.sqrt() of a negative number".into()));
            }
            x.sqrt()
        }
        "log" => {
            if x <= 0.0 {
                return Err(Error::Eval("math.log() of a non-positive number".into()));
            }
            match args.get(1) {
                Some(base) => x.log(number(base)?),
                None => x.ln(),
            }
        }
        "log2" => x.log2(),
        "log10" => x.log10(),
        "exp" => x.exp(),
        "floor" => return Ok(Value::Int(x.floor() as i64)),
        "ceil" => return Ok(Value::Int(x.ceil() as i64)),
        "pow" => x.powf(number(&args[1])?),
        "fabs" => x.abs(),
        "isnan" => return Ok(Value::Bool(x.is_nan())),
        "isinf" => return Ok(Value::Bool(x.is_infinite())),
        _ => return Err(Error::Eval(format!("unknown function math.{name}"))),
    };
    Ok(Value::Float(result))
}

fn statistics_call(name: &str, args: &[Value]) -> Result<Value> {
    let items = iter_values(&args[0])?;
    if items.iter().any(is_na_like) {
        return Ok(Value::Na);
    }
    let numbers: Vec<f64> = items
        .iter()
        .map(|item| {
            item.as_number().ok_or_else(|| {
                Error::Eval(format!(
                    "statistics.{name}() expects numbers, got {}",
                    item.type_name()
                ))
            })
        })
        .collect::<Result<_>>()?;
    if numbers.is_empty() {
        return Err(Error::Eval(format!("statistics.{name}() of an empty sequence")));
    }

    let mean = numbers.iter().sum::<f64>() / numbers.len() as f64;
    let result = match name {
        "mean" => mean,
        "median" => {
            let mut sorted = numbers.clone();
            sorted.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));
            let mid = sorted.len() / 2;
            if sorted.len() % 2 == 0 {
                (sorted[mid - 1] + sorted[mid]) / 2.0
            } else {
                sorted[mid]
            }
        }
        "variance" | "stdev" => {
            if numbers.len() < 2 {
                return Err(Error::Eval(format!(
                    "statistics.{name}() requires at least two values"
                )));
            }
            let variance = numbers.iter().map(|v| (v - mean).powi(2)).sum::<f64>()
                / (numbers.len() - 1) as f64;
            if name == "stdev" {
                variance.sqrt()
            } else {
                variance
            }
        }
        _ => return Err(Error::Eval(format!("unknown function statistics.{name}"))),
    };
    Ok(Value::Float(result))
}

/// Compiled-pattern cache for the `re` namespace: the same few patterns are
/// applied to every record.
fn compile_pattern(pattern: &str) -> Result<Regex> {
    static CACHE: OnceLock<Mutex<HashMap<String, Regex>>> = OnceLock::new();
    let cache = CACHE.get_or_init(|| Mutex::new(HashMap::new()));
    if let Ok(cache) = cache.lock() {
        if let Some(regex) = cache.get(pattern) {
            return Ok(regex.clone());
        }
    }
    let regex = Regex::new(pattern)
        .map_err(|err| Error::Eval(format!("invalid regular expression: {err}")))?;
    if let Ok(mut cache) = cache.lock() {
        cache.insert(pattern.to_owned(), regex.clone());
    }
    Ok(regex)
}

fn re_call(name: &str, args: &[Value]) -> Result<Value> {
    let Value::Str(pattern) = &args[0] else {
        return Err(Error::Eval(format!(
            "re.{name}() pattern must be a string, got {}",
            args[0].type_name()
        )));
    };
    // missing subjects are treated as the empty string
    let subject: std::sync::Arc<str> = match &args[1] {
        Value::Str(s) => s.clone(),
        Value::Na | Value::Absent => "".into(),
        Value::Term(term) => term.name().into(),
        other => {
            return Err(Error::Eval(format!(
                "re.{name}() subject must be a string, got {}",
                other.type_name()
            )))
        }
    };
    match name {
        "search" => Ok(Value::Bool(compile_pattern(pattern)?.is_match(&subject))),
        // anchored variants compile an anchored copy so alternations still
        // backtrack to a start-anchored (or whole-string) match
        "match" => Ok(Value::Bool(
            compile_pattern(&format!("^(?:{pattern})"))?.is_match(&subject),
        )),
        "fullmatch" => Ok(Value::Bool(
            compile_pattern(&format!("^(?:{pattern})$"))?.is_match(&subject),
        )),
        "findall" => {
            let regex = compile_pattern(pattern)?;
            let groups = regex.captures_len() - 1;
            let mut out = Vec::new();
            for captures in regex.captures_iter(&subject) {
                let item = match groups {
                    0 => Value::str(&captures[0]),
                    1 => captures
                        .get(1)
                        .map(|m| Value::str(m.as_str()))
                        .unwrap_or(Value::str("")),
                    _ => Value::Tuple(
                        (1..=groups)
                            .map(|g| {
                                captures
                                    .get(g)
                                    .map(|m| Value::str(m.as_str()))
                                    .unwrap_or(Value::str(""))
                            })
                            .collect(),
                    ),
                };
                out.push(item);
            }
            Ok(Value::List(out))
        }
        "sub" => {
            let regex = compile_pattern(pattern)?;
            let Value::Str(replacement) = &args[1] else {
                return Err(Error::Eval("re.sub() replacement must be a string".into()));
            };
            // signature: sub(pattern, repl, subject[, count])
            let subject: std::sync::Arc<str> = match &args[2] {
                Value::Str(s) => s.clone(),
                Value::Na | Value::Absent => "".into(),
                other => {
                    return Err(Error::Eval(format!(
                        "re.sub() subject must be a string, got {}",
                        other.type_name()
                    )))
                }
            };
            let count = match args.get(3) {
                None => 0,
                Some(Value::Int(count)) => *count as usize,
                Some(other) => {
                    return Err(Error::Eval(format!(
                        "re.sub() count must be an int, got {}",
                        other.type_name()
                    )))
                }
            };
            let result = if count == 0 {
                regex.replace_all(&subject, replacement.as_ref())
            } else {
                regex.replacen(&subject, count, replacement.as_ref())
            };
            Ok(Value::str(result.into_owned()))
        }
        "split" => {
            let regex = compile_pattern(pattern)?;
            let limit = match args.get(2) {
                None => 0,
                Some(Value::Int(limit)) => *limit as usize + 1,
                Some(other) => {
                    return Err(Error::Eval(format!(
                        "re.split() maxsplit must be an int, got {}",
                        other.type_name()
                    )))
                }
            };
            let parts: Vec<Value> = if limit == 0 {
                regex.split(&subject).map(Value::str).collect()
            } else {
                regex.splitn(&subject, limit).map(Value::str).collect()
            };
            Ok(Value::List(parts))
        }
        _ => Err(Error::Eval(format!("unknown function re.{name}"))),
    }
}

// ---------------------------------------------------------------------------
// Method dispatch

pub(crate) fn method_call(
    evaluator: &mut Evaluator<'_>,
    object: &Value,
    name: &str,
    args: &[AstNode],
) -> Result<Value> {
    let args: Vec<Value> = args
        .iter()
        .map(|arg| evaluator.eval(arg))
        .collect::<Result<_>>()?;

    match object {
        Value::Na | Value::Absent => {
            warn_missing_access("method call", name);
            Ok(Value::Na)
        }
        Value::Str(s) => str_method(s, name, &args),
        Value::Dict(pairs) => dict_method(pairs, name, &args),
        Value::Term(term) => term_method(evaluator, term, name, &args),
        Value::Terms(terms) => terms_method(evaluator, terms, name, &args),
        Value::List(items) => {
            // lists of terms support the same queries as decoded term lists
            let terms: Option<Vec<Term>> = items
                .iter()
                .map(|item| match item {
                    Value::Term(term) => Some(term.clone()),
                    Value::Str(name) => Some(Term::new(name.as_ref())),
                    _ => None,
                })
                .collect();
            match terms {
                Some(terms) => terms_method(evaluator, &terms, name, &args),
                None => Err(no_method(object, name)),
            }
        }
        _ => Err(no_method(object, name)),
    }
}

fn no_method(object: &Value, name: &str) -> Error {
    Error::Eval(format!("{} has no method `{name}`", object.type_name()))
}

fn str_method(s: &str, name: &str, args: &[Value]) -> Result<Value> {
    let arg_str = |index: usize| -> Result<&str> {
        match args.get(index) {
            Some(Value::Str(s)) => Ok(s.as_ref()),
            Some(other) => Err(Error::Eval(format!(
                "str.{name}() expects a string, got {}",
                other.type_name()
            ))),
            None => Err(Error::Eval(format!("str.{name}() missing an argument"))),
        }
    };
    match name {
        "startswith" => Ok(Value::Bool(s.starts_with(arg_str(0)?))),
        "endswith" => Ok(Value::Bool(s.ends_with(arg_str(0)?))),
        "lower" => Ok(Value::str(s.to_lowercase())),
        "upper" => Ok(Value::str(s.to_uppercase())),
        "strip" => Ok(Value::str(s.trim())),
        "replace" => Ok(Value::str(s.replace(arg_str(0)?, arg_str(1)?))),
        "split" => {
            let parts: Vec<Value> = match args.first() {
                None => s.split_whitespace().map(Value::str).collect(),
                Some(_) => s.split(arg_str(0)?).map(Value::str).collect(),
            };
            Ok(Value::List(parts))
        }
        _ => Err(Error::Eval(format!("str has no method `{name}`"))),
    }
}

fn dict_method(pairs: &[(Value, Value)], name: &str, args: &[Value]) -> Result<Value> {
    match name {
        "get" => {
            let Some(key) = args.first() else {
                return Err(Error::Eval("dict.get() missing the key".into()));
            };
            let fallback = args.get(1).cloned().unwrap_or(Value::Na);
            Ok(pairs
                .iter()
                .find(|(k, _)| k == key)
                .map(|(_, v)| v.clone())
                .unwrap_or(fallback))
        }
        "keys" => Ok(Value::List(pairs.iter().map(|(k, _)| k.clone()).collect())),
        "values" => Ok(Value::List(pairs.iter().map(|(_, v)| v.clone()).collect())),
        "items" => Ok(Value::List(
            pairs
                .iter()
                .map(|(k, v)| Value::Tuple(vec![k.clone(), v.clone()]))
                .collect(),
        )),
        _ => Err(Error::Eval(format!("dict has no method `{name}`"))),
    }
}

fn term_method(
    evaluator: &mut Evaluator<'_>,
    term: &Term,
    name: &str,
    args: &[Value],
) -> Result<Value> {
    let Some(ontology) = ontology_or_na(evaluator.ctx) else {
        return Ok(Value::Na);
    };
    let other_name = |value: &Value| -> Result<Option<String>> {
        match value {
            Value::Term(t) => Ok(Some(t.name().to_owned())),
            Value::Str(s) => Ok(Some(s.to_string())),
            Value::Na | Value::Absent => Ok(None),
            other => Err(Error::Eval(format!(
                "expected a term, got {}",
                other.type_name()
            ))),
        }
    };

    match name {
        "parents" => Ok(Value::Terms(ontology.parents(term.name()))),
        "children" => Ok(Value::Terms(ontology.children(term.name()))),
        "ancestors" => Ok(Value::Terms(ontology.ancestors(term.name()))),
        "descendants" => Ok(Value::Terms(ontology.descendants(term.name()))),
        "is_a" => {
            let Some(target) = args.first().map(other_name).transpose()?.flatten() else {
                return Ok(Value::Na);
            };
            Ok(ontology
                .is_a(term.name(), &target)
                .map_or(Value::Na, Value::Bool))
        }
        "path_length" => {
            let Some(target) = args.first().map(other_name).transpose()?.flatten() else {
                return Ok(Value::Na);
            };
            Ok(ontology
                .path_length(term.name(), &target)
                .map_or(Value::Na, |d| Value::Int(d as i64)))
        }
        _ => Err(Error::Eval(format!("term has no method `{name}`"))),
    }
}

fn terms_method(
    evaluator: &mut Evaluator<'_>,
    terms: &[Term],
    name: &str,
    args: &[Value],
) -> Result<Value> {
    let Some(ontology) = ontology_or_na(evaluator.ctx) else {
        return Ok(Value::Na);
    };
    match name {
        "any_is_a" => {
            let target = match args.first() {
                Some(Value::Term(t)) => t.name().to_owned(),
                Some(Value::Str(s)) => s.to_string(),
                Some(Value::Na | Value::Absent) | None => return Ok(Value::Na),
                Some(other) => {
                    return Err(Error::Eval(format!(
                        "expected a term, got {}",
                        other.type_name()
                    )))
                }
            };
            let mut saw_unknown = false;
            for term in terms {
                match ontology.is_a(term.name(), &target) {
                    Some(true) => return Ok(Value::Bool(true)),
                    Some(false) => {}
                    None => saw_unknown = true,
                }
            }
            if saw_unknown {
                Ok(Value::Na)
            } else {
                Ok(Value::Bool(false))
            }
        }
        "most_specific_terms" => Ok(Value::Terms(ontology.most_specific_terms(terms))),
        _ => Err(Error::Eval(format!("terms has no method `{name}`"))),
    }
}
