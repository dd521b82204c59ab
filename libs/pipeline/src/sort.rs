//! Sort keys
//!
//! A key expression evaluates to a value (usually a tuple) that is
//! flattened into a [`SortKey`]: per-part direction from `asc()`/`desc()`
//! markers, missing values ordered after everything else regardless of
//! direction. `SortKey`'s `Ord` is the complete comparison policy; the
//! external sorter only has to call it.

use std::cmp::Ordering;
use std::sync::Arc;

use smallvec::SmallVec;
use tracing::warn;

use varex_expr::{ops, Value};

use crate::env::Environment;
use crate::error::Result;
use crate::header::classify;
use crate::record::VariantRecord;

#[derive(Debug, Clone)]
pub struct KeyPart {
    pub value: Value,
    pub descending: bool,
}

/// A flattened, totally ordered sort key.
#[derive(Debug, Clone, Default)]
pub struct SortKey(SmallVec<[KeyPart; 4]>);

impl SortKey {
    /// Flatten an evaluated key expression. Tuples and lists contribute one
    /// part per element; an `asc()`/`desc()` wrapper sets the direction of
    /// everything beneath it until overridden by a nested wrapper.
    pub fn from_value(value: Value) -> SortKey {
        let mut parts = SmallVec::new();
        flatten(value, false, &mut parts);
        SortKey(parts)
    }

    /// The key every failed or missing evaluation gets: a single NA part,
    /// ordering the record after all keyed records.
    pub fn missing() -> SortKey {
        SortKey::from_value(Value::Na)
    }

    pub fn parts(&self) -> &[KeyPart] {
        &self.0
    }
}

fn flatten(value: Value, descending: bool, out: &mut SmallVec<[KeyPart; 4]>) {
    match value {
        Value::Ordered { inner, descending } => flatten(*inner, descending, out),
        Value::Tuple(items) | Value::List(items) => {
            for item in items {
                flatten(item, descending, out);
            }
        }
        value => out.push(KeyPart { value, descending }),
    }
}

fn missing_last(value: &Value) -> bool {
    match value {
        Value::Na | Value::Absent => true,
        Value::Float(v) => v.is_nan(),
        _ => false,
    }
}

fn part_cmp(a: &KeyPart, b: &KeyPart) -> Ordering {
    match (missing_last(&a.value), missing_last(&b.value)) {
        (true, true) => Ordering::Equal,
        (true, false) => Ordering::Greater,
        (false, true) => Ordering::Less,
        (false, false) => {
            let ordering = ops::cmp_total(&a.value, &b.value);
            if a.descending {
                ordering.reverse()
            } else {
                ordering
            }
        }
    }
}

impl PartialEq for SortKey {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for SortKey {}

impl PartialOrd for SortKey {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for SortKey {
    fn cmp(&self, other: &Self) -> Ordering {
        for (a, b) in self.0.iter().zip(other.0.iter()) {
            match part_cmp(a, b) {
                Ordering::Equal => {}
                unequal => return unequal,
            }
        }
        self.0.len().cmp(&other.0.len())
    }
}

pub struct Sorter {
    env: Environment,
    preserve_annotation_order: bool,
}

impl Sorter {
    pub fn new(env: Environment, preserve_annotation_order: bool) -> Sorter {
        Sorter {
            env,
            preserve_annotation_order,
        }
    }

    pub fn env(&self) -> &Environment {
        &self.env
    }

    /// The record's sort key, plus the copy to write.
    ///
    /// When the key expression reads annotations, each entry gets its own
    /// key; the record sorts by the minimum (for descending parts that is
    /// the entry ranking the record highest), and the copy has its entries
    /// reordered by their keys unless `preserve_annotation_order` is set.
    pub fn key(&self, record: &Arc<VariantRecord>) -> Result<(SortKey, VariantRecord)> {
        if !self.env.uses_annotation() {
            let key = self.entry_key(record, None)?;
            return Ok((key, record.as_ref().clone()));
        }

        let raw = record.annotation_entries(self.env.ann_key());
        let entries = self.env.decoded_entries(record);
        let mut keyed: Vec<(SortKey, Option<String>)> = Vec::with_capacity(entries.len());
        for (position, entry) in entries.into_iter().enumerate() {
            let key = self.entry_key(record, Some(entry))?;
            keyed.push((key, raw.get(position).cloned()));
        }
        keyed.sort_by(|(a, _), (b, _)| a.cmp(b));

        let record_key = keyed
            .first()
            .map(|(key, _)| key.clone())
            .unwrap_or_else(SortKey::missing);
        let copy = if self.preserve_annotation_order {
            record.as_ref().clone()
        } else {
            let reordered: Vec<String> =
                keyed.into_iter().filter_map(|(_, raw)| raw).collect();
            record.with_annotation_entries(self.env.ann_key(), &reordered)
        };
        Ok((record_key, copy))
    }

    fn entry_key(
        &self,
        record: &Arc<VariantRecord>,
        entry: Option<Arc<[Value]>>,
    ) -> Result<SortKey> {
        match self.env.eval_for(record, entry) {
            Ok(value) => Ok(SortKey::from_value(value)),
            Err(err @ varex_expr::Error::InvalidRecord(_)) => Err(classify(err, record)),
            Err(err) => {
                warn!(
                    coordinate = record.coordinate(),
                    index = record.index,
                    error = %err,
                    "key expression failed; sorting record last"
                );
                Ok(SortKey::missing())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::env::Config;
    use crate::testutil::{test_header, test_record};
    use std::collections::HashMap;

    fn key(values: Vec<Value>) -> SortKey {
        SortKey::from_value(Value::Tuple(values))
    }

    #[test]
    fn na_sorts_after_every_value() {
        let mut keys = vec![
            key(vec![Value::Int(2), Value::Na]),
            key(vec![Value::Int(1), Value::Int(5)]),
            key(vec![Value::Int(2), Value::Int(3)]),
        ];
        keys.sort();
        assert_eq!(keys[0].parts()[0].value, Value::Int(1));
        assert_eq!(keys[1].parts()[1].value, Value::Int(3));
        assert!(matches!(keys[2].parts()[1].value, Value::Na));
    }

    #[test]
    fn descending_reverses_values_but_not_na() {
        let desc = |v: Value| Value::Ordered {
            inner: Box::new(v),
            descending: true,
        };
        let mut keys = vec![
            SortKey::from_value(desc(Value::Int(1))),
            SortKey::from_value(desc(Value::Na)),
            SortKey::from_value(desc(Value::Int(5))),
        ];
        keys.sort();
        assert_eq!(keys[0].parts()[0].value, Value::Int(5));
        assert_eq!(keys[1].parts()[0].value, Value::Int(1));
        assert!(matches!(keys[2].parts()[0].value, Value::Na));
    }

    #[test]
    fn wrapping_a_tuple_marks_every_part() {
        let wrapped = Value::Ordered {
            inner: Box::new(Value::Tuple(vec![Value::Int(1), Value::Int(2)])),
            descending: true,
        };
        let sort_key = SortKey::from_value(wrapped);
        assert!(sort_key.parts().iter().all(|part| part.descending));
    }

    #[test]
    fn nan_counts_as_missing() {
        let mut keys = vec![
            key(vec![Value::Float(f64::NAN)]),
            key(vec![Value::Float(1.0)]),
        ];
        keys.sort();
        assert_eq!(keys[0].parts()[0].value, Value::Float(1.0));
    }

    fn sorter(source: &str, preserve: bool) -> Sorter {
        let env = Environment::new(
            source,
            &Config::default(),
            &test_header(),
            None,
            HashMap::new(),
        )
        .unwrap();
        Sorter::new(env, preserve)
    }

    #[test]
    fn plain_key_expression() {
        let record = Arc::new(test_record());
        let (sort_key, _) = sorter("(CHROM, POS)", false).key(&record).unwrap();
        assert_eq!(sort_key.parts().len(), 2);
        assert_eq!(sort_key.parts()[1].value, Value::Int(100));
    }

    #[test]
    fn annotation_key_takes_the_minimum_and_reorders_entries() {
        let record = Arc::new(test_record());
        let (sort_key, copy) = sorter("desc(ANN['IMPACT'])", false).key(&record).unwrap();
        // descending: the maximal IMPACT string ranks first
        assert_eq!(sort_key.parts()[0].value, Value::str("LOW"));
        let entries = copy.annotation_entries("ANN");
        assert!(entries[0].contains("TP53"));
        assert!(entries[1].contains("BRCA1"));
    }

    #[test]
    fn preserve_flag_keeps_entry_order() {
        let record = Arc::new(test_record());
        let (_, copy) = sorter("desc(ANN['IMPACT'])", true).key(&record).unwrap();
        let entries = copy.annotation_entries("ANN");
        assert!(entries[0].contains("BRCA1"));
    }

    #[test]
    fn failing_key_sorts_last() {
        let record = Arc::new(test_record());
        let (sort_key, _) = sorter("INFO['NOPE']", false).key(&record).unwrap();
        assert!(matches!(sort_key.parts()[0].value, Value::Na));
    }
}
