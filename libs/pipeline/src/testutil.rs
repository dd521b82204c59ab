//! Shared fixtures for the crate's unit tests.

use std::collections::HashMap;
use std::sync::Arc;

use varex_expr::Value;

use crate::header::{HeaderMeta, Number};
use crate::record::VariantRecord;

pub const ANN_DESCRIPTION: &str =
    "Consequence annotations from Ensembl VEP. Format: Allele|Consequence|IMPACT|SYMBOL|Gene";

/// A two-sample header declaring the keys the tests touch.
pub fn test_header() -> HeaderMeta {
    let mut header = HeaderMeta::new(vec!["sample1".into(), "sample2".into()]);
    header.declare_info("ANN", Number::Dot, ANN_DESCRIPTION);
    header.declare_info("DP", Number::One, "Total depth");
    header.declare_info("AF", Number::Alt, "Allele frequency");
    header.declare_info("DB", Number::Flag, "dbSNP membership");
    header.declare_format("GT", Number::Dot);
    header.declare_format("DP", Number::One);
    header.declare_filter("q10");
    header
}

/// One biallelic record with two annotation entries (one HIGH on BRCA1,
/// one LOW on TP53) and per-sample depth/genotype.
pub fn test_record() -> VariantRecord {
    VariantRecord {
        chrom: "1".into(),
        pos: 100,
        end: None,
        id: None,
        ref_allele: "A".into(),
        alt: vec!["T".into()],
        qual: Some(50.0),
        filter: vec!["PASS".into()],
        info: HashMap::from([(
            "ANN".to_owned(),
            Value::str(
                "T|missense_variant|HIGH|BRCA1|ENSG0001,\
                 T|synonymous_variant|LOW|TP53|ENSG0002",
            ),
        )]),
        format: HashMap::from([
            (
                "GT".to_owned(),
                vec![Value::str("0/1"), Value::str("1/1")],
            ),
            ("DP".to_owned(), vec![Value::Int(20), Value::Int(30)]),
        ]),
        samples: Arc::from(vec!["sample1".to_owned(), "sample2".to_owned()]),
        index: 0,
    }
}
