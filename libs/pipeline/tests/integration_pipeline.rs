//! End-to-end pipeline tests: a VEP-annotated input with an ontology
//! loaded, run through filtering, tagging, projection, and sort keys.

use std::collections::HashMap;
use std::sync::Arc;

use varex_expr::Value;
use varex_ontology::Ontology;
use varex_pipeline::{
    Config, Environment, HeaderMeta, Keep, Number, Projection, RecordFilter, Sorter, Tagger,
    VariantRecord,
};

const CSQ_DESCRIPTION: &str =
    "Consequence annotations from Ensembl VEP. Format: Allele|Consequence|IMPACT|SYMBOL|gnomADe_AF";

const MINI_SO: &str = "\
format-version: 1.2

[Term]
id: SO:0001060
name: sequence_variant

[Term]
id: SO:0001576
name: transcript_variant
is_a: SO:0001060 ! sequence_variant

[Term]
id: SO:0001583
name: missense_variant
is_a: SO:0001576 ! transcript_variant

[Term]
id: SO:0001819
name: synonymous_variant
is_a: SO:0001576 ! transcript_variant
";

fn config() -> Config {
    Config {
        ann_key: "CSQ".to_owned(),
        ..Config::default()
    }
}

fn header() -> HeaderMeta {
    let mut header = HeaderMeta::new(vec!["proband".into(), "mother".into()]);
    header.declare_info("CSQ", Number::Dot, CSQ_DESCRIPTION);
    header.declare_info("DP", Number::One, "Total depth");
    header.declare_format("GT", Number::Dot);
    header
}

fn ontology() -> Arc<Ontology> {
    Arc::new(Ontology::from_obo_reader(MINI_SO.as_bytes()).unwrap())
}

fn record(index: usize, pos: i64, qual: Option<f32>, csq: &str) -> Arc<VariantRecord> {
    let mut info = HashMap::new();
    if !csq.is_empty() {
        info.insert("CSQ".to_owned(), Value::str(csq));
    }
    Arc::new(VariantRecord {
        chrom: "7".into(),
        pos,
        end: None,
        id: None,
        ref_allele: "C".into(),
        alt: vec!["G".into()],
        qual,
        filter: vec!["PASS".into()],
        info,
        format: HashMap::from([(
            "GT".to_owned(),
            vec![Value::str("0/1"), Value::str("0/0")],
        )]),
        samples: Arc::from(vec!["proband".to_owned(), "mother".to_owned()]),
        index,
    })
}

fn env(source: &str) -> Environment {
    Environment::new(source, &config(), &header(), Some(ontology()), HashMap::new()).unwrap()
}

#[test]
fn ontology_backed_entry_filter() {
    // one entry inside the loaded graph, one outside it
    let rec = record(
        0,
        100,
        Some(60.0),
        "G|missense_variant|HIGH|CFTR|0.001,G|upstream_gene_variant|MODIFIER|ASZ1|0.2",
    );
    let filter = RecordFilter::new(
        env("CSQ['Consequence'].any_is_a('transcript_variant')"),
        false,
    );
    let Keep::Yes(kept) = filter.filter(&rec).unwrap() else {
        panic!("record should be kept");
    };
    let entries = kept.annotation_entries("CSQ");
    assert_eq!(entries.len(), 1);
    assert!(entries[0].contains("CFTR"));
}

#[test]
fn combined_record_and_entry_predicate() {
    let rec = record(0, 100, Some(60.0), "G|synonymous_variant|LOW|CFTR|0.001");
    let keep = RecordFilter::new(
        env("QUAL >= 30 and CSQ['gnomADe_AF'] < 0.01 and is_het('proband')"),
        false,
    )
    .filter(&rec)
    .unwrap();
    assert!(keep.is_kept());

    let common = record(1, 200, Some(60.0), "G|synonymous_variant|LOW|CFTR|0.2");
    let keep = RecordFilter::new(
        env("QUAL >= 30 and CSQ['gnomADe_AF'] < 0.01 and is_het('proband')"),
        false,
    )
    .filter(&common)
    .unwrap();
    assert!(!keep.is_kept());
}

#[test]
fn tagging_marks_without_dropping() {
    let tagger = Tagger::new(vec![
        ("rare".to_owned(), env("CSQ['gnomADe_AF'] < 0.01")),
        ("low_qual".to_owned(), env("QUAL < 30")),
    ])
    .unwrap();

    let rec = record(0, 100, Some(60.0), "G|missense_variant|HIGH|CFTR|0.001");
    let tagged = tagger.tag(&rec).unwrap();
    assert_eq!(tagged.filter, vec!["rare"]);
    assert_eq!(tagged.annotation_entries("CSQ").len(), 1);
}

#[test]
fn projection_rows_per_entry_with_sample_broadcast() {
    let projection = Projection::new(
        "CHROM, POS, CSQ['SYMBOL'], for_each_sample(lambda s: FORMAT['GT'][s])",
        &config(),
        &header(),
        Some(ontology()),
        HashMap::new(),
    )
    .unwrap();
    assert_eq!(
        projection.header(),
        [
            "CHROM",
            "POS",
            "CSQ['SYMBOL']",
            "FORMAT['GT']['proband']",
            "FORMAT['GT']['mother']",
        ]
    );

    let rec = record(
        0,
        100,
        Some(60.0),
        "G|missense_variant|HIGH|CFTR|0.001,G|upstream_gene_variant|MODIFIER|ASZ1|0.2",
    );
    let rows = projection.project(&rec).unwrap();
    assert_eq!(rows.len(), 2);
    assert_eq!(rows[0][2], Value::str("CFTR"));
    assert_eq!(rows[1][2], Value::str("ASZ1"));
    assert_eq!(rows[0][3], Value::str("0/1"));
    assert_eq!(rows[0][4], Value::str("0/0"));
}

#[test]
fn records_sort_with_missing_keys_last() {
    let sorter = Sorter::new(env("QUAL"), false);
    let records = [
        record(0, 100, None, ""),
        record(1, 200, Some(10.0), ""),
        record(2, 300, Some(50.0), ""),
    ];
    let mut keyed: Vec<(varex_pipeline::SortKey, i64)> = records
        .iter()
        .map(|rec| {
            let (key, copy) = sorter.key(rec).unwrap();
            (key, copy.pos)
        })
        .collect();
    keyed.sort_by(|(a, _), (b, _)| a.cmp(b));
    let order: Vec<i64> = keyed.into_iter().map(|(_, pos)| pos).collect();
    assert_eq!(order, [200, 300, 100]);
}

#[test]
fn annotation_sort_reorders_entries() {
    let sorter = Sorter::new(env("asc(CSQ['gnomADe_AF'])"), false);
    let rec = record(
        0,
        100,
        Some(60.0),
        "G|missense_variant|HIGH|CFTR|0.2,G|synonymous_variant|LOW|CFTR2|0.001",
    );
    let (key, copy) = sorter.key(&rec).unwrap();
    assert_eq!(key.parts()[0].value, Value::Float(0.001));
    let entries = copy.annotation_entries("CSQ");
    assert!(entries[0].contains("CFTR2"));
}
