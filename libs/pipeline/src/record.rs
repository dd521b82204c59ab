//! Record model
//!
//! The pipeline does not parse VCF itself; the embedding reader builds one
//! [`VariantRecord`] per input line and hands it in. Records are immutable
//! during evaluation; drivers that change a record (entry filtering, tags,
//! annotation reordering) return an updated copy for the external writer.

use std::collections::HashMap;
use std::sync::Arc;

use varex_ann::split_entries;
use varex_expr::Value;

#[derive(Debug, Clone)]
pub struct VariantRecord {
    pub chrom: String,
    /// 1-based position.
    pub pos: i64,
    pub end: Option<i64>,
    pub id: Option<String>,
    pub ref_allele: String,
    pub alt: Vec<String>,
    pub qual: Option<f32>,
    pub filter: Vec<String>,
    /// Raw INFO values as read: scalars as-is, multi-valued keys as lists
    /// with `Absent` holes, flags as `Bool(true)`. Arity coercion happens
    /// lazily on access.
    pub info: HashMap<String, Value>,
    /// Raw FORMAT values, one vector per key, aligned with `samples`.
    pub format: HashMap<String, Vec<Value>>,
    pub samples: Arc<[String]>,
    /// 0-based position of the record in the input.
    pub index: usize,
}

impl VariantRecord {
    /// `CHROM:POS` for log lines.
    pub fn coordinate(&self) -> String {
        format!("{}:{}", self.chrom, self.pos)
    }

    /// The raw annotation entries under `key`, in input order.
    pub fn annotation_entries(&self, key: &str) -> Vec<String> {
        match self.info.get(key) {
            Some(Value::Str(raw)) => split_entries(raw).map(str::to_owned).collect(),
            _ => Vec::new(),
        }
    }

    /// Copy with the annotation INFO value replaced by `entries`.
    /// An empty list removes the key.
    pub fn with_annotation_entries(&self, key: &str, entries: &[String]) -> VariantRecord {
        let mut copy = self.clone();
        if entries.is_empty() {
            copy.info.remove(key);
        } else {
            copy.info
                .insert(key.to_owned(), Value::str(entries.join(",")));
        }
        copy
    }

    /// Copy with `tags` appended to FILTER. A pure `PASS` filter is
    /// replaced rather than extended.
    pub fn with_tags(&self, tags: &[String]) -> VariantRecord {
        let mut copy = self.clone();
        if !tags.is_empty() {
            copy.filter.retain(|f| f != "PASS" && f != ".");
            copy.filter.extend(tags.iter().cloned());
        }
        copy
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record() -> VariantRecord {
        VariantRecord {
            chrom: "1".into(),
            pos: 100,
            end: None,
            id: None,
            ref_allele: "A".into(),
            alt: vec!["T".into()],
            qual: Some(50.0),
            filter: vec!["PASS".into()],
            info: HashMap::from([("ANN".to_owned(), Value::str("a|b,c|d"))]),
            format: HashMap::new(),
            samples: Arc::from(vec![]),
            index: 0,
        }
    }

    #[test]
    fn splits_annotation_entries() {
        assert_eq!(record().annotation_entries("ANN"), vec!["a|b", "c|d"]);
        assert!(record().annotation_entries("CSQ").is_empty());
    }

    #[test]
    fn rewriting_entries_replaces_or_removes_the_key() {
        let rec = record();
        let kept = rec.with_annotation_entries("ANN", &["c|d".to_owned()]);
        assert_eq!(kept.annotation_entries("ANN"), vec!["c|d"]);
        let emptied = rec.with_annotation_entries("ANN", &[]);
        assert!(!emptied.info.contains_key("ANN"));
    }

    #[test]
    fn tagging_displaces_pass() {
        let tagged = record().with_tags(&["low_qual".to_owned()]);
        assert_eq!(tagged.filter, vec!["low_qual"]);
        let untouched = record().with_tags(&[]);
        assert_eq!(untouched.filter, vec!["PASS"]);
    }
}
