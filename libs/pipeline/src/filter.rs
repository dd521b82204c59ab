//! Record filtering
//!
//! One predicate expression decides, per record, whether the record is
//! written. When the predicate reads the annotation alias it runs once per
//! decoded entry, and only entries satisfying it survive on the kept
//! record; unmatched-entry retention (`keep_unmatched`) keeps the full
//! entry list whenever at least one entry passes.

use std::sync::Arc;

use tracing::warn;

use crate::env::Environment;
use crate::error::Result;
use crate::header::classify;
use crate::record::VariantRecord;

/// Filter verdict for one record.
#[derive(Debug)]
pub enum Keep {
    /// Write this (possibly entry-filtered) copy.
    Yes(VariantRecord),
    No,
}

impl Keep {
    pub fn is_kept(&self) -> bool {
        matches!(self, Keep::Yes(_))
    }
}

pub struct RecordFilter {
    env: Environment,
    keep_unmatched: bool,
}

impl RecordFilter {
    pub fn new(env: Environment, keep_unmatched: bool) -> RecordFilter {
        RecordFilter {
            env,
            keep_unmatched,
        }
    }

    pub fn env(&self) -> &Environment {
        &self.env
    }

    /// Apply the predicate to one record.
    ///
    /// Per-record evaluation errors are logged with the record coordinate
    /// and count as a failed predicate; only an unnormalized multi-allelic
    /// record aborts.
    pub fn filter(&self, record: &Arc<VariantRecord>) -> Result<Keep> {
        if !self.env.uses_annotation() {
            return Ok(if self.predicate(record, None)? {
                Keep::Yes(record.as_ref().clone())
            } else {
                Keep::No
            });
        }

        let raw = record.annotation_entries(self.env.ann_key());
        let entries = self.env.decoded_entries(record);
        let mut retained: Vec<String> = Vec::new();
        let mut any_matched = false;
        for (position, entry) in entries.into_iter().enumerate() {
            if self.predicate(record, Some(entry))? {
                any_matched = true;
                // the synthetic all-NA entry has no raw counterpart
                if let Some(raw_entry) = raw.get(position) {
                    retained.push(raw_entry.clone());
                }
            }
        }
        if !any_matched {
            return Ok(Keep::No);
        }
        let kept = if self.keep_unmatched {
            record.as_ref().clone()
        } else {
            record.with_annotation_entries(self.env.ann_key(), &retained)
        };
        Ok(Keep::Yes(kept))
    }

    fn predicate(
        &self,
        record: &Arc<VariantRecord>,
        entry: Option<Arc<[varex_expr::Value]>>,
    ) -> Result<bool> {
        match self.env.eval_for(record, entry) {
            Ok(value) => Ok(value.is_truthy()),
            Err(err @ varex_expr::Error::InvalidRecord(_)) => {
                Err(classify(err, record))
            }
            Err(err) => {
                warn!(
                    coordinate = record.coordinate(),
                    index = record.index,
                    error = %err,
                    "expression failed; treating predicate as false"
                );
                Ok(false)
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

    fn filter(source: &str, keep_unmatched: bool) -> RecordFilter {
        let env = Environment::new(
            source,
            &Config::default(),
            &test_header(),
            None,
            HashMap::new(),
        )
        .unwrap();
        RecordFilter::new(env, keep_unmatched)
    }

    #[test]
    fn plain_predicate_keeps_or_drops_whole_records() {
        let record = Arc::new(test_record());
        assert!(filter("QUAL >= 30", false).filter(&record).unwrap().is_kept());
        assert!(!filter("QUAL >= 60", false).filter(&record).unwrap().is_kept());
    }

    #[test]
    fn unset_qual_is_false_not_an_error() {
        let mut record = test_record();
        record.qual = None;
        let record = Arc::new(record);
        assert!(!filter("QUAL >= 30", false).filter(&record).unwrap().is_kept());
    }

    #[test]
    fn entry_filter_retains_matching_entries_only() {
        let record = Arc::new(test_record());
        let keep = filter("ANN['IMPACT'] == 'HIGH'", false)
            .filter(&record)
            .unwrap();
        let Keep::Yes(kept) = keep else {
            panic!("record should be kept");
        };
        let entries = kept.annotation_entries("ANN");
        assert_eq!(entries.len(), 1);
        assert!(entries[0].contains("BRCA1"));
    }

    #[test]
    fn keep_unmatched_preserves_all_entries() {
        let record = Arc::new(test_record());
        let keep = filter("ANN['IMPACT'] == 'HIGH'", true)
            .filter(&record)
            .unwrap();
        let Keep::Yes(kept) = keep else {
            panic!("record should be kept");
        };
        assert_eq!(kept.annotation_entries("ANN").len(), 2);
    }

    #[test]
    fn no_entry_matching_drops_the_record() {
        let record = Arc::new(test_record());
        let keep = filter("ANN['IMPACT'] == 'MODIFIER'", false)
            .filter(&record)
            .unwrap();
        assert!(!keep.is_kept());
    }

    #[test]
    fn unannotated_record_gets_one_all_na_entry() {
        let mut record = test_record();
        record.info.remove("ANN");
        let record = Arc::new(record);
        // NA == 'HIGH' is NA, falsy: record dropped
        assert!(!filter("ANN['IMPACT'] == 'HIGH'", false)
            .filter(&record)
            .unwrap()
            .is_kept());
        // is_na(...) is true for the synthetic entry: record kept
        assert!(filter("is_na(ANN['IMPACT'])", false)
            .filter(&record)
            .unwrap()
            .is_kept());
    }

    #[test]
    fn evaluation_error_drops_the_record_instead_of_aborting() {
        let record = Arc::new(test_record());
        // unknown INFO key is a per-record error, recovered as false
        assert!(!filter("INFO['NOPE'] == 1", false)
            .filter(&record)
            .unwrap()
            .is_kept());
    }

    #[test]
    fn multiallelic_record_aborts() {
        let mut record = test_record();
        record.alt.push("G".into());
        let record = Arc::new(record);
        assert!(filter("ALT == 'T'", false).filter(&record).is_err());
    }
}
