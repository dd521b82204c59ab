//! Header metadata and arity coercion
//!
//! INFO and FORMAT values are stored raw on the record; their declared
//! `Number` arity decides the shape an expression sees. Coercion runs
//! lazily, on first access to a key, so a record with a malformed field the
//! expression never touches sails through untouched.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use varex_expr::{Error as ExprError, Value};

use crate::error::Error;

/// Declared arity of an INFO or FORMAT key.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Number {
    /// `Number=0`, a presence flag.
    Flag,
    /// `Number=1`, a scalar.
    One,
    /// `Number=A`, one value per ALT allele.
    Alt,
    /// `Number=R`, one value per allele including REF.
    Ref,
    /// `Number=G`, one value per genotype.
    Genotype,
    /// `Number=.`, unbounded.
    Dot,
    /// A fixed count greater than one.
    Fixed(u32),
}

impl Number {
    /// Parse a header `Number=` declaration. Anything unrecognized is
    /// treated as unbounded.
    pub fn parse(raw: &str) -> Number {
        match raw {
            "0" => Number::Flag,
            "1" => Number::One,
            "A" => Number::Alt,
            "R" => Number::Ref,
            "G" => Number::Genotype,
            "." => Number::Dot,
            other => match other.parse::<u32>() {
                Ok(n) => Number::Fixed(n),
                Err(_) => Number::Dot,
            },
        }
    }
}

/// Everything the pipeline needs from the input header, assembled by the
/// embedding reader before the first expression compiles.
#[derive(Debug, Clone, Default)]
pub struct HeaderMeta {
    info: HashMap<String, Number>,
    format: HashMap<String, Number>,
    /// INFO `Description` texts, for the annotation schema.
    descriptions: HashMap<String, String>,
    filters: HashSet<String>,
    samples: Arc<[String]>,
}

impl HeaderMeta {
    pub fn new(samples: Vec<String>) -> HeaderMeta {
        HeaderMeta {
            samples: samples.into(),
            ..HeaderMeta::default()
        }
    }

    pub fn declare_info(&mut self, key: &str, number: Number, description: &str) {
        self.info.insert(key.to_owned(), number);
        self.descriptions
            .insert(key.to_owned(), description.to_owned());
    }

    pub fn declare_format(&mut self, key: &str, number: Number) {
        // the genotype string is never list-shaped, whatever the header says
        let number = if key == "GT" { Number::Dot } else { number };
        self.format.insert(key.to_owned(), number);
    }

    pub fn declare_filter(&mut self, id: &str) {
        self.filters.insert(id.to_owned());
    }

    /// Apply configured `overwrite_number` overrides. `FORMAT/GT` stays
    /// unbounded regardless.
    pub fn apply_overrides(
        &mut self,
        info: &HashMap<String, Number>,
        format: &HashMap<String, Number>,
    ) {
        for (key, number) in info {
            self.info.insert(key.clone(), *number);
        }
        for (key, number) in format {
            if key != "GT" {
                self.format.insert(key.clone(), *number);
            }
        }
    }

    pub fn info_number(&self, key: &str) -> Option<Number> {
        self.info.get(key).copied()
    }

    pub fn format_number(&self, key: &str) -> Option<Number> {
        self.format.get(key).copied()
    }

    pub fn info_description(&self, key: &str) -> Option<&str> {
        self.descriptions.get(key).map(String::as_str)
    }

    pub fn has_filter(&self, id: &str) -> bool {
        self.filters.contains(id)
    }

    pub fn samples(&self) -> &Arc<[String]> {
        &self.samples
    }
}

/// Shape a raw value according to its declared arity.
///
/// Returns expression-level errors because coercion happens inside symbol
/// lookups: `Eval` for per-record trouble, `InvalidRecord` when the value
/// implies an unnormalized multi-allelic record.
pub(crate) fn coerce(key: &str, number: Number, raw: &Value, index: usize) -> varex_expr::Result<Value> {
    let items = |raw: &Value| -> Vec<Value> {
        match raw {
            Value::List(items) | Value::Tuple(items) => items
                .iter()
                .map(|item| match item {
                    Value::Absent => Value::Na,
                    other => other.clone(),
                })
                .collect(),
            other => vec![other.clone()],
        }
    };
    match number {
        Number::Flag => Ok(Value::Bool(raw.is_truthy())),
        Number::One => {
            let mut items = items(raw);
            if items.len() > 1 {
                return Err(ExprError::Eval(format!(
                    "{key} declared Number=1 but record {index} carries {} values",
                    items.len()
                )));
            }
            Ok(items.pop().unwrap_or(Value::Na))
        }
        Number::Alt => {
            let mut items = items(raw);
            if items.len() > 1 {
                return Err(ExprError::InvalidRecord(format!(
                    "{key} declared Number=A carries {} values",
                    items.len()
                )));
            }
            Ok(items.pop().unwrap_or(Value::Na))
        }
        Number::Ref => {
            let mut items = items(raw);
            items.resize(2, Value::Na);
            items.truncate(2);
            Ok(Value::Tuple(items))
        }
        Number::Genotype | Number::Dot | Number::Fixed(_) => match raw {
            Value::List(_) | Value::Tuple(_) => Ok(Value::Tuple(items(raw))),
            other => Ok(other.clone()),
        },
    }
}

/// Map an expression-level record violation back to the pipeline error the
/// caller reports.
pub(crate) fn classify(err: ExprError, record: &crate::record::VariantRecord) -> Error {
    match err {
        ExprError::InvalidRecord(_) => Error::MoreThanOneAltAllele {
            chrom: record.chrom.clone(),
            pos: record.pos,
            index: record.index,
            count: record.alt.len(),
        },
        other => Error::Expr(other),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_number_declarations() {
        assert_eq!(Number::parse("0"), Number::Flag);
        assert_eq!(Number::parse("1"), Number::One);
        assert_eq!(Number::parse("A"), Number::Alt);
        assert_eq!(Number::parse("R"), Number::Ref);
        assert_eq!(Number::parse("."), Number::Dot);
        assert_eq!(Number::parse("3"), Number::Fixed(3));
        assert_eq!(Number::parse("bogus"), Number::Dot);
    }

    #[test]
    fn gt_arity_is_pinned() {
        let mut header = HeaderMeta::new(vec!["s1".into()]);
        header.declare_format("GT", Number::One);
        assert_eq!(header.format_number("GT"), Some(Number::Dot));

        header.apply_overrides(
            &HashMap::new(),
            &HashMap::from([("GT".to_owned(), Number::One)]),
        );
        assert_eq!(header.format_number("GT"), Some(Number::Dot));
    }

    #[test]
    fn scalar_arity_rejects_extra_values() {
        let raw = Value::List(vec![Value::Int(1), Value::Int(2)]);
        assert!(matches!(
            coerce("DP", Number::One, &raw, 0),
            Err(ExprError::Eval(_))
        ));
        assert_eq!(
            coerce("DP", Number::One, &Value::List(vec![Value::Int(7)]), 0).unwrap(),
            Value::Int(7)
        );
    }

    #[test]
    fn alt_arity_means_exactly_one() {
        let raw = Value::List(vec![Value::Float(0.5), Value::Float(0.1)]);
        assert!(matches!(
            coerce("AF", Number::Alt, &raw, 0),
            Err(ExprError::InvalidRecord(_))
        ));
        assert_eq!(
            coerce("AF", Number::Alt, &Value::List(vec![Value::Float(0.5)]), 0).unwrap(),
            Value::Float(0.5)
        );
    }

    #[test]
    fn ref_arity_pads_with_na() {
        let raw = Value::List(vec![Value::Int(10)]);
        let coerced = coerce("AD", Number::Ref, &raw, 0).unwrap();
        assert!(
            matches!(&coerced, Value::Tuple(items) if items.len() == 2
                && items[0] == Value::Int(10)
                && matches!(items[1], Value::Na))
        );
    }

    #[test]
    fn unbounded_arity_fills_holes_with_na() {
        let raw = Value::List(vec![Value::Int(1), Value::Absent, Value::Int(3)]);
        let coerced = coerce("X", Number::Dot, &raw, 0).unwrap();
        assert!(
            matches!(&coerced, Value::Tuple(items) if matches!(items[1], Value::Na))
        );
    }
}
