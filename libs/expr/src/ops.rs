//! Operator semantics
//!
//! Every binary operator is a total function over values: missing data
//! propagates through arithmetic and comparisons instead of erroring, so
//! `QUAL >= 30` on a record without QUAL is simply not-true. Only genuinely
//! unanswerable operations (cross-type ordering, division by zero) surface
//! as per-record evaluation errors.

use std::cmp::Ordering;

use crate::ast::{BinaryOp, UnaryOp};
use crate::error::{Error, Result};
use crate::value::Value;

/// Apply a binary operator. Boolean `and`/`or` short-circuit in the
/// evaluator and never reach this function.
pub fn binary(op: BinaryOp, left: &Value, right: &Value) -> Result<Value> {
    // identity tests are exempt from NA propagation: they are how
    // expressions distinguish NA from everything else
    match op {
        BinaryOp::Is => return Ok(Value::Bool(is_identical(left, right))),
        BinaryOp::IsNot => return Ok(Value::Bool(!is_identical(left, right))),
        BinaryOp::In => return membership(left, right),
        BinaryOp::NotIn => {
            return Ok(match membership(left, right)? {
                Value::Bool(found) => Value::Bool(!found),
                _ => Value::Na,
            })
        }
        _ => {}
    }

    if left.is_missing() || right.is_missing() {
        return Ok(Value::Na);
    }

    match op {
        BinaryOp::Eq => Ok(Value::Bool(left == right)),
        BinaryOp::Ne => Ok(Value::Bool(left != right)),
        BinaryOp::Lt => ordering(left, right).map(|o| Value::Bool(o == Ordering::Less)),
        BinaryOp::Le => ordering(left, right).map(|o| Value::Bool(o != Ordering::Greater)),
        BinaryOp::Gt => ordering(left, right).map(|o| Value::Bool(o == Ordering::Greater)),
        BinaryOp::Ge => ordering(left, right).map(|o| Value::Bool(o != Ordering::Less)),
        BinaryOp::Add => add(left, right),
        BinaryOp::Sub => numeric(op, left, right),
        BinaryOp::Mul => numeric(op, left, right),
        BinaryOp::Div => numeric(op, left, right),
        BinaryOp::FloorDiv => numeric(op, left, right),
        BinaryOp::Mod => numeric(op, left, right),
        BinaryOp::Pow => numeric(op, left, right),
        BinaryOp::Is | BinaryOp::IsNot | BinaryOp::In | BinaryOp::NotIn => unreachable!(),
    }
}

/// Apply a unary operator.
pub fn unary(op: UnaryOp, operand: &Value) -> Result<Value> {
    if operand.is_missing() {
        return Ok(Value::Na);
    }
    match (op, operand) {
        (UnaryOp::Plus, Value::Int(v)) => Ok(Value::Int(*v)),
        (UnaryOp::Plus, Value::Float(v)) => Ok(Value::Float(*v)),
        (UnaryOp::Minus, Value::Int(v)) => Ok(Value::Int(-v)),
        (UnaryOp::Minus, Value::Float(v)) => Ok(Value::Float(-v)),
        (_, Value::Bool(v)) => {
            let v = *v as i64;
            Ok(Value::Int(if op == UnaryOp::Minus { -v } else { v }))
        }
        _ => Err(Error::Eval(format!(
            "cannot apply unary `{}` to {}",
            if op == UnaryOp::Minus { "-" } else { "+" },
            operand.type_name()
        ))),
    }
}

/// Identity: how `is` / `is not` see values. Only the singleton-like values
/// have meaningful identity; everything else is never identical.
fn is_identical(left: &Value, right: &Value) -> bool {
    match (left, right) {
        (Value::Na, Value::Na) => true,
        (Value::Absent, Value::Absent) => true,
        (Value::Bool(a), Value::Bool(b)) => a == b,
        _ => false,
    }
}

/// `element in container`. A missing container propagates; a missing
/// element is only found by identity (so `NA in xs` is true exactly when
/// `xs` holds a missing value).
fn membership(element: &Value, container: &Value) -> Result<Value> {
    let found = match container {
        Value::Na | Value::Absent => return Ok(Value::Na),
        Value::List(items) | Value::Tuple(items) | Value::Set(items) => items
            .iter()
            .any(|item| is_identical(element, item) || item == element),
        Value::Dict(pairs) => pairs.iter().any(|(key, _)| key == element),
        Value::Str(haystack) => match element {
            Value::Str(needle) => haystack.contains(needle.as_ref()),
            Value::Na | Value::Absent => return Ok(Value::Na),
            other => {
                return Err(Error::Eval(format!(
                    "cannot search for {} in a string",
                    other.type_name()
                )))
            }
        },
        Value::Terms(terms) => match element {
            Value::Term(term) => terms.contains(term),
            Value::Str(name) => terms.iter().any(|t| t.name() == name.as_ref()),
            _ => false,
        },
        Value::Scores(scores) => match element {
            Value::Str(name) => scores.iter().any(|(n, _)| n == name),
            _ => false,
        },
        Value::Pairs(pairs) => match element {
            Value::Str(key) => pairs.iter().any(|(k, _)| k == key),
            _ => false,
        },
        Value::Object(object) => object.contains(element)?,
        other => {
            return Err(Error::Eval(format!(
                "{} is not a container",
                other.type_name()
            )))
        }
    };
    Ok(Value::Bool(found))
}

fn add(left: &Value, right: &Value) -> Result<Value> {
    match (left, right) {
        (Value::Int(a), Value::Int(b)) => Ok(Value::Int(a + b)),
        (Value::Str(a), Value::Str(b)) => Ok(Value::str(format!("{a}{b}"))),
        (Value::List(a), Value::List(b)) => {
            Ok(Value::List(a.iter().chain(b).cloned().collect()))
        }
        (Value::Tuple(a), Value::Tuple(b)) => {
            Ok(Value::Tuple(a.iter().chain(b).cloned().collect()))
        }
        _ => numeric(BinaryOp::Add, left, right),
    }
}

fn numeric(op: BinaryOp, left: &Value, right: &Value) -> Result<Value> {
    // integer arithmetic stays integral where the operation allows it
    if let (Value::Int(a), Value::Int(b)) = (left, right) {
        return int_arith(op, *a, *b);
    }

    let (Some(a), Some(b)) = (left.as_number(), right.as_number()) else {
        return Err(Error::Eval(format!(
            "unsupported operand types: {} and {}",
            left.type_name(),
            right.type_name()
        )));
    };

    let result = match op {
        BinaryOp::Add => a + b,
        BinaryOp::Sub => a - b,
        BinaryOp::Mul => a * b,
        BinaryOp::Div => {
            if b == 0.0 {
                return Err(Error::Eval("division by zero".into()));
            }
            a / b
        }
        BinaryOp::FloorDiv => {
            if b == 0.0 {
                return Err(Error::Eval("division by zero".into()));
            }
            (a / b).floor()
        }
        BinaryOp::Mod => {
            if b == 0.0 {
                return Err(Error::Eval("modulo by zero".into()));
            }
            a - (a / b).floor() * b
        }
        BinaryOp::Pow => a.powf(b),
        _ => unreachable!(),
    };
    Ok(Value::Float(result))
}

fn int_arith(op: BinaryOp, a: i64, b: i64) -> Result<Value> {
    match op {
        BinaryOp::Add => Ok(Value::Int(a.wrapping_add(b))),
        BinaryOp::Sub => Ok(Value::Int(a.wrapping_sub(b))),
        BinaryOp::Mul => Ok(Value::Int(a.wrapping_mul(b))),
        // true division always yields a float
        BinaryOp::Div => {
            if b == 0 {
                return Err(Error::Eval("division by zero".into()));
            }
            Ok(Value::Float(a as f64 / b as f64))
        }
        BinaryOp::FloorDiv => {
            if b == 0 {
                return Err(Error::Eval("division by zero".into()));
            }
            let quotient = a / b;
            let floored = if a % b != 0 && (a < 0) != (b < 0) {
                quotient - 1
            } else {
                quotient
            };
            Ok(Value::Int(floored))
        }
        // remainder takes the divisor's sign
        BinaryOp::Mod => {
            if b == 0 {
                return Err(Error::Eval("modulo by zero".into()));
            }
            let remainder = a % b;
            let adjusted = if remainder != 0 && (remainder < 0) != (b < 0) {
                remainder + b
            } else {
                remainder
            };
            Ok(Value::Int(adjusted))
        }
        BinaryOp::Pow => match u32::try_from(b) {
            Ok(exponent) => match a.checked_pow(exponent) {
                Some(result) => Ok(Value::Int(result)),
                None => Ok(Value::Float((a as f64).powf(b as f64))),
            },
            Err(_) => Ok(Value::Float((a as f64).powf(b as f64))),
        },
        _ => unreachable!(),
    }
}

/// Ordering between two non-missing values of comparable types; an error
/// otherwise.
fn ordering(left: &Value, right: &Value) -> Result<Ordering> {
    if let (Some(a), Some(b)) = (left.as_number(), right.as_number()) {
        return a.partial_cmp(&b).ok_or_else(|| {
            Error::Eval("cannot order NaN".into())
        });
    }
    match (left, right) {
        (Value::Str(a), Value::Str(b)) => Ok(a.cmp(b)),
        (Value::List(a), Value::List(b)) | (Value::Tuple(a), Value::Tuple(b)) => {
            for (x, y) in a.iter().zip(b) {
                match ordering(x, y)? {
                    Ordering::Equal => continue,
                    other => return Ok(other),
                }
            }
            Ok(a.len().cmp(&b.len()))
        }
        _ => Err(Error::Eval(format!(
            "cannot order {} against {}",
            left.type_name(),
            right.type_name()
        ))),
    }
}

/// Total order over all values, used wherever a deterministic sort is
/// needed: missing data and NaN after everything, then by type rank, then
/// within-type.
pub fn cmp_total(left: &Value, right: &Value) -> Ordering {
    fn rank(value: &Value) -> u8 {
        match value {
            Value::Bool(_) | Value::Int(_) => 0,
            Value::Float(v) if !v.is_nan() => 0,
            Value::Str(_) | Value::Term(_) => 1,
            Value::List(_) | Value::Tuple(_) | Value::Set(_) | Value::Terms(_) => 2,
            Value::Ordered { inner, .. } => rank(inner),
            // missing data, NaN, and everything unorderable sort last
            _ => u8::MAX,
        }
    }

    let (left_rank, right_rank) = (rank(left), rank(right));
    if left_rank != right_rank {
        return left_rank.cmp(&right_rank);
    }
    if left_rank == u8::MAX {
        return Ordering::Equal;
    }

    match (left, right) {
        (Value::Ordered { inner, .. }, other) => cmp_total(inner, other),
        (other, Value::Ordered { inner, .. }) => cmp_total(other, inner),
        (Value::Str(a), Value::Str(b)) => a.cmp(b),
        (Value::Term(a), Value::Term(b)) => a.cmp(b),
        (Value::Term(a), Value::Str(b)) => a.name().cmp(b.as_ref()),
        (Value::Str(a), Value::Term(b)) => a.as_ref().cmp(b.name()),
        (a, b) if a.as_number().is_some() && b.as_number().is_some() => {
            // both non-NaN by rank
            a.as_number()
                .partial_cmp(&b.as_number())
                .unwrap_or(Ordering::Equal)
        }
        (a, b) => {
            let (a_items, b_items) = (sequence_items(a), sequence_items(b));
            for (x, y) in a_items.iter().zip(&b_items) {
                match cmp_total(x, y) {
                    Ordering::Equal => continue,
                    other => return other,
                }
            }
            a_items.len().cmp(&b_items.len())
        }
    }
}

fn sequence_items(value: &Value) -> Vec<Value> {
    match value {
        Value::List(items) | Value::Tuple(items) | Value::Set(items) => items.clone(),
        Value::Terms(terms) => terms.iter().cloned().map(Value::Term).collect(),
        other => vec![other.clone()],
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use quickcheck::quickcheck;

    const ARITH_OPS: [BinaryOp; 7] = [
        BinaryOp::Add,
        BinaryOp::Sub,
        BinaryOp::Mul,
        BinaryOp::Div,
        BinaryOp::FloorDiv,
        BinaryOp::Mod,
        BinaryOp::Pow,
    ];
    const CMP_OPS: [BinaryOp; 6] = [
        BinaryOp::Lt,
        BinaryOp::Le,
        BinaryOp::Gt,
        BinaryOp::Ge,
        BinaryOp::Eq,
        BinaryOp::Ne,
    ];

    // `Value`'s equality never holds for NA, so NA results are asserted
    // with pattern matches rather than assert_eq

    quickcheck! {
        fn na_propagates_through_every_operator(v: i64, op_index: usize) -> bool {
            let op = [ARITH_OPS.as_slice(), CMP_OPS.as_slice()].concat()
                [op_index % (ARITH_OPS.len() + CMP_OPS.len())];
            matches!(binary(op, &Value::Na, &Value::Int(v)), Ok(Value::Na))
                && matches!(binary(op, &Value::Int(v), &Value::Na), Ok(Value::Na))
        }
    }

    #[test]
    fn absent_behaves_like_na_under_operators() {
        for op in ARITH_OPS.iter().chain(&CMP_OPS) {
            assert!(matches!(
                binary(*op, &Value::Absent, &Value::Int(1)),
                Ok(Value::Na)
            ));
        }
    }

    #[test]
    fn identity_distinguishes_na_from_absent() {
        assert_eq!(binary(BinaryOp::Is, &Value::Na, &Value::Na), Ok(Value::Bool(true)));
        assert_eq!(binary(BinaryOp::Is, &Value::Absent, &Value::Na), Ok(Value::Bool(false)));
        assert_eq!(
            binary(BinaryOp::IsNot, &Value::Int(3), &Value::Na),
            Ok(Value::Bool(true))
        );
    }

    #[test]
    fn equality_with_na_is_na_not_false() {
        assert!(matches!(
            binary(BinaryOp::Eq, &Value::Na, &Value::Na),
            Ok(Value::Na)
        ));
    }

    #[test]
    fn python_integer_semantics() {
        assert_eq!(binary(BinaryOp::Div, &Value::Int(7), &Value::Int(2)), Ok(Value::Float(3.5)));
        assert_eq!(
            binary(BinaryOp::FloorDiv, &Value::Int(-7), &Value::Int(2)),
            Ok(Value::Int(-4))
        );
        assert_eq!(
            binary(BinaryOp::FloorDiv, &Value::Int(-7), &Value::Int(-2)),
            Ok(Value::Int(3))
        );
        assert_eq!(binary(BinaryOp::Mod, &Value::Int(-7), &Value::Int(2)), Ok(Value::Int(1)));
        assert_eq!(binary(BinaryOp::Mod, &Value::Int(7), &Value::Int(-2)), Ok(Value::Int(-1)));
        assert_eq!(binary(BinaryOp::Pow, &Value::Int(2), &Value::Int(10)), Ok(Value::Int(1024)));
    }

    #[test]
    fn division_by_zero_is_an_error() {
        assert!(binary(BinaryOp::Div, &Value::Int(1), &Value::Int(0)).is_err());
        assert!(binary(BinaryOp::Mod, &Value::Float(1.0), &Value::Float(0.0)).is_err());
    }

    #[test]
    fn cross_type_ordering_is_an_error_but_equality_is_not() {
        assert!(binary(BinaryOp::Lt, &Value::Int(1), &Value::str("a")).is_err());
        assert_eq!(
            binary(BinaryOp::Eq, &Value::Int(1), &Value::str("a")),
            Ok(Value::Bool(false))
        );
        assert_eq!(
            binary(BinaryOp::Eq, &Value::Int(1), &Value::Float(1.0)),
            Ok(Value::Bool(true))
        );
    }

    #[test]
    fn membership_semantics() {
        let list = Value::List(vec![Value::Int(1), Value::Na]);
        assert_eq!(binary(BinaryOp::In, &Value::Int(1), &list), Ok(Value::Bool(true)));
        assert_eq!(binary(BinaryOp::In, &Value::Na, &list), Ok(Value::Bool(true)));
        assert_eq!(binary(BinaryOp::NotIn, &Value::Int(2), &list), Ok(Value::Bool(true)));
        assert!(matches!(
            binary(BinaryOp::In, &Value::Int(1), &Value::Na),
            Ok(Value::Na)
        ));
        assert_eq!(
            binary(BinaryOp::In, &Value::str("path"), &Value::str("pathogenic")),
            Ok(Value::Bool(true))
        );
    }

    #[test]
    fn total_order_puts_missing_last() {
        let mut values = vec![Value::Na, Value::Int(2), Value::Float(f64::NAN), Value::Int(1)];
        values.sort_by(cmp_total);
        assert_eq!(values[0], Value::Int(1));
        assert_eq!(values[1], Value::Int(2));
        assert!(values[2].is_missing() || matches!(values[2], Value::Float(v) if v.is_nan()));
    }
}
