//! Record tagging
//!
//! Instead of dropping records, tagging writes every record and marks the
//! ones matching a predicate by adding a tag to FILTER. Each tag carries
//! its own expression; annotation entries are never filtered in tag mode.

use std::sync::Arc;

use tracing::warn;

use crate::env::Environment;
use crate::error::{Error, Result};
use crate::header::classify;
use crate::record::VariantRecord;

pub struct Tagger {
    tags: Vec<(String, Environment)>,
}

impl Tagger {
    /// Tag names must not collide with FILTER ids already declared in the
    /// header; the first environment's header is authoritative.
    pub fn new(tags: Vec<(String, Environment)>) -> Result<Tagger> {
        for (name, env) in &tags {
            if env.header().has_filter(name) {
                return Err(Error::TagCollision { name: name.clone() });
            }
        }
        Ok(Tagger { tags })
    }

    pub fn tag_names(&self) -> impl Iterator<Item = &str> {
        self.tags.iter().map(|(name, _)| name.as_str())
    }

    /// The tags whose predicate holds for this record: a plain predicate
    /// must be true for the record, an annotation-reading one for at least
    /// one entry.
    pub fn matching_tags(&self, record: &Arc<VariantRecord>) -> Result<Vec<String>> {
        let mut matched = Vec::new();
        for (name, env) in &self.tags {
            if Tagger::applies(env, record)? {
                matched.push(name.clone());
            }
        }
        Ok(matched)
    }

    /// Copy of the record with the matching tags added to FILTER.
    pub fn tag(&self, record: &Arc<VariantRecord>) -> Result<VariantRecord> {
        Ok(record.with_tags(&self.matching_tags(record)?))
    }

    fn applies(env: &Environment, record: &Arc<VariantRecord>) -> Result<bool> {
        let entries = if env.uses_annotation() {
            env.decoded_entries(record).into_iter().map(Some).collect()
        } else {
            vec![None]
        };
        for entry in entries {
            match env.eval_for(record, entry) {
                Ok(value) if value.is_truthy() => return Ok(true),
                Ok(_) => {}
                Err(err @ varex_expr::Error::InvalidRecord(_)) => {
                    return Err(classify(err, record))
                }
                Err(err) => {
                    warn!(
                        coordinate = record.coordinate(),
                        index = record.index,
                        error = %err,
                        "expression failed; tag not applied"
                    );
                }
            }
        }
        Ok(false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::env::Config;
    use crate::testutil::{test_header, test_record};
    use std::collections::HashMap;

    fn env(source: &str) -> Environment {
        Environment::new(
            source,
            &Config::default(),
            &test_header(),
            None,
            HashMap::new(),
        )
        .unwrap()
    }

    #[test]
    fn tags_matching_records_and_keeps_entries() {
        let tagger = Tagger::new(vec![
            ("low_qual".to_owned(), env("QUAL < 60")),
            ("high_impact".to_owned(), env("ANN['IMPACT'] == 'HIGH'")),
            ("deep".to_owned(), env("INFO['DP'] > 100")),
        ])
        .unwrap();

        let record = Arc::new(test_record());
        let tagged = tagger.tag(&record).unwrap();
        assert_eq!(tagged.filter, vec!["low_qual", "high_impact"]);
        // entries are untouched in tag mode
        assert_eq!(tagged.annotation_entries("ANN").len(), 2);
    }

    #[test]
    fn tag_name_colliding_with_declared_filter_is_fatal() {
        let result = Tagger::new(vec![("q10".to_owned(), env("QUAL < 10"))]);
        assert!(matches!(result, Err(Error::TagCollision { ref name }) if name == "q10"));
    }
}
