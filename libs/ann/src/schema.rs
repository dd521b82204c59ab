//! Annotation schema: producer detection and entry decoding
//!
//! The sub-field order is declared in the header, never hardcoded: the
//! schema zips raw entry tokens against the declared field-name list by
//! position, so annotation tools that emit a custom field selection or
//! order are handled transparently.

use std::collections::HashMap;

use tracing::warn;

use crate::error::{Error, Result};
use crate::registry::field_kind;
use crate::types::{AnnValue, FieldKind};

/// The tool that produced the annotation field, detected from the declared
/// field names. A closed set: anything else is decoded untyped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Producer {
    SnpEff,
    Vep,
    Unknown,
}

/// Split a raw annotation INFO value into its per-transcript entries.
pub fn split_entries(raw: &str) -> impl Iterator<Item = &str> {
    raw.split(',')
}

/// A detected annotation schema: the producer, the declared field order,
/// and the decode strategy per field.
#[derive(Debug, Clone)]
pub struct AnnSchema {
    producer: Producer,
    fields: Vec<String>,
    kinds: Vec<FieldKind>,
    index: HashMap<String, usize>,
}

impl AnnSchema {
    /// Build a schema from the annotation key's header `Description` text.
    ///
    /// SnpEff quotes the field list in single quotes; VEP appends it after
    /// the last colon (`... Format: Allele|Consequence|...`). Both forms
    /// separate field names with `|`.
    pub fn from_header(key: &str, description: &str) -> Result<Self> {
        let list = if let Some(quoted) = description.split('\'').nth(1) {
            quoted
        } else if let Some((_, tail)) = description.rsplit_once(':') {
            tail
        } else {
            return Err(Error::NoFieldList {
                key: key.to_owned(),
                description: description.to_owned(),
            });
        };

        let fields: Vec<String> = list
            .split('|')
            .map(|name| name.trim().to_owned())
            .filter(|name| !name.is_empty())
            .collect();
        if fields.is_empty() {
            return Err(Error::NoFieldList {
                key: key.to_owned(),
                description: description.to_owned(),
            });
        }

        let producer = detect_producer(&fields);
        if producer == Producer::Unknown {
            warn!(
                key,
                "unrecognized annotation producer, decoding all fields as strings"
            );
        }

        let kinds = fields
            .iter()
            .map(|name| match producer {
                Producer::Unknown => FieldKind::Str,
                _ => field_kind(name).unwrap_or_else(|| {
                    warn!(field = name.as_str(), "unregistered annotation field, decoding as string");
                    FieldKind::Str
                }),
            })
            .collect();
        let index = fields
            .iter()
            .enumerate()
            .map(|(i, name)| (name.clone(), i))
            .collect();

        Ok(Self {
            producer,
            fields,
            kinds,
            index,
        })
    }

    pub fn producer(&self) -> Producer {
        self.producer
    }

    /// Declared field names, in header order.
    pub fn fields(&self) -> &[String] {
        &self.fields
    }

    /// Position of a field name in the declared order.
    pub fn index_of(&self, name: &str) -> Option<usize> {
        self.index.get(name).copied()
    }

    /// Decode one raw entry into typed values aligned with [`fields`].
    ///
    /// Tokens are zipped against the declared field list: empty tokens and
    /// tokens that fail their field's decoder become [`AnnValue::Na`] (the
    /// latter with a diagnostic); missing trailing tokens are padded with
    /// `Na`; surplus tokens are dropped with a diagnostic.
    ///
    /// [`fields`]: Self::fields
    pub fn decode_entry(&self, raw: &str) -> Vec<AnnValue> {
        let mut tokens = raw.split('|');
        let mut values = Vec::with_capacity(self.fields.len());
        for (name, kind) in self.fields.iter().zip(&self.kinds) {
            let value = match tokens.next().map(str::trim) {
                None | Some("") => AnnValue::Na,
                Some(token) => kind.decode(token).unwrap_or_else(|| {
                    warn!(
                        field = name.as_str(),
                        token, "annotation sub-field did not decode, using missing value"
                    );
                    AnnValue::Na
                }),
            };
            values.push(value);
        }
        let surplus = tokens.count();
        if surplus > 0 {
            warn!(
                surplus,
                declared = self.fields.len(),
                "annotation entry has more sub-fields than the header declares"
            );
        }
        values
    }
}

fn detect_producer(fields: &[String]) -> Producer {
    if fields.iter().any(|f| f == "Annotation_Impact") {
        Producer::SnpEff
    } else if fields.iter().any(|f| f == "Consequence") {
        Producer::Vep
    } else {
        Producer::Unknown
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::PosRange;

    const SNPEFF_DESC: &str = "Functional annotations: 'Allele | Annotation | Annotation_Impact | \
Gene_Name | Gene_ID | Feature_Type | Feature_ID | Transcript_BioType | Rank | HGVS.c | HGVS.p | \
cDNA.pos / cDNA.length | CDS.pos / CDS.length | AA.pos / AA.length | Distance | ERRORS / WARNINGS / INFO'";

    const VEP_DESC: &str =
        "Consequence annotations from Ensembl VEP. Format: Allele|Consequence|IMPACT|SYMBOL|Gene";

    #[test]
    fn detects_snpeff_from_quoted_description() {
        let schema = AnnSchema::from_header("ANN", SNPEFF_DESC).unwrap();
        assert_eq!(schema.producer(), Producer::SnpEff);
        assert_eq!(schema.fields().len(), 16);
        assert_eq!(schema.fields()[11], "cDNA.pos / cDNA.length");
    }

    #[test]
    fn detects_vep_from_format_suffix() {
        let schema = AnnSchema::from_header("CSQ", VEP_DESC).unwrap();
        assert_eq!(schema.producer(), Producer::Vep);
        assert_eq!(schema.fields(), ["Allele", "Consequence", "IMPACT", "SYMBOL", "Gene"]);
    }

    #[test]
    fn unknown_field_list_is_an_error() {
        assert!(AnnSchema::from_header("ANN", "no list here").is_err());
    }

    #[test]
    fn decodes_by_declared_order() {
        let schema = AnnSchema::from_header("CSQ", VEP_DESC).unwrap();
        let values = schema.decode_entry("A|missense_variant&splice_region_variant|MODERATE|BRCA2|ENSG00000139618");
        assert_eq!(values[0], AnnValue::Str("A".into()));
        assert_eq!(
            values[1],
            AnnValue::Terms(vec!["missense_variant".into(), "splice_region_variant".into()])
        );
        assert_eq!(values[3], AnnValue::Str("BRCA2".into()));
    }

    #[test]
    fn empty_and_missing_tokens_are_na() {
        let schema = AnnSchema::from_header("CSQ", VEP_DESC).unwrap();
        let values = schema.decode_entry("A||MODERATE");
        assert_eq!(values[1], AnnValue::Na);
        assert_eq!(values[3], AnnValue::Na);
        assert_eq!(values[4], AnnValue::Na);

        // a fully empty entry decodes to all-missing
        assert!(schema.decode_entry("").iter().all(|v| *v == AnnValue::Na));
    }

    #[test]
    fn malformed_sub_fields_degrade_to_na() {
        let schema = AnnSchema::from_header("ANN", SNPEFF_DESC).unwrap();
        let mut entry = vec![""; 16];
        entry[8] = "not-a-rank";
        entry[11] = "1091/1949";
        let values = schema.decode_entry(&entry.join("|"));
        assert_eq!(values[8], AnnValue::Na);
        assert_eq!(
            values[11],
            AnnValue::PosRange(PosRange { start: Some(1091), end: Some(3040), length: Some(1949) })
        );
    }

    #[test]
    fn splits_entries_on_commas() {
        let entries: Vec<&str> = split_entries("A|x,C|y").collect();
        assert_eq!(entries, ["A|x", "C|y"]);
    }
}
