//! Decoded annotation values and per-field decode strategies

use std::sync::OnceLock;

use regex::Regex;

/// A position range inside a transcript feature.
///
/// SnpEff reports `pos/length` (the end is derived as `pos + length`),
/// VEP reports `start[-end]` with `?` for unknown components. Missing
/// components stay missing rather than defaulting.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PosRange {
    pub start: Option<i64>,
    pub end: Option<i64>,
    pub length: Option<i64>,
}

impl PosRange {
    /// SnpEff form: `pos/length`.
    fn from_snpeff(raw: &str) -> Option<Self> {
        let (pos, length) = raw.split_once('/')?;
        let pos: i64 = pos.trim().parse().ok()?;
        let length: i64 = length.trim().parse().ok()?;
        Some(Self {
            start: Some(pos),
            end: Some(pos + length),
            length: Some(length),
        })
    }

    /// VEP form: `start[-end]`, `?` for an unknown component.
    fn from_vep(raw: &str) -> Option<Self> {
        fn component(raw: &str) -> Option<Option<i64>> {
            if raw == "?" {
                return Some(None);
            }
            raw.parse().ok().map(Some)
        }
        let (start, end) = match raw.split_once('-') {
            Some((start, end)) => (component(start.trim())?, component(end.trim())?),
            // a single position is a one-base half-open range
            None => {
                let single = component(raw.trim())?;
                (single, single.map(|s| s + 1))
            }
        };
        let length = match (start, end) {
            (Some(s), Some(e)) => Some(e - s),
            _ => None,
        };
        Some(Self { start, end, length })
    }
}

/// A typed annotation sub-field value.
#[derive(Debug, Clone, PartialEq)]
pub enum AnnValue {
    /// Empty or undecodable sub-field.
    Na,
    Bool(bool),
    Int(i64),
    /// Annotation floats are 32-bit in the source format.
    Float(f32),
    Str(String),
    List(Vec<String>),
    /// `key:value` pairs, e.g. protein domain databases and accessions.
    Pairs(Vec<(String, String)>),
    /// Predictions with attached scores, e.g. `tolerated(0.15)`.
    Scores(Vec<(String, f32)>),
    /// Ontology term names.
    Terms(Vec<String>),
    PosRange(PosRange),
    NumberTotal { number: i64, total: i64 },
    RangeTotal { start: i64, end: i64, total: i64 },
}

/// Decode strategy for one annotation sub-field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    Str,
    Int,
    Float,
    /// Boolean flag encoded as a marker string (`YES`, `Y`).
    Flag { truthy: &'static str },
    /// Separator-delimited string list.
    List { sep: char },
    /// `key:value` pairs separated by `&`.
    Pairs,
    /// `prediction(score)` entries separated by `&`.
    Scores,
    /// `&`-separated ontology term names.
    Terms,
    /// SnpEff `pos/length`.
    PosRangeSnpEff,
    /// VEP `start[-end]` with `?` components.
    PosRangeVep,
    /// `number/total`, e.g. rank 3 of 9 exons.
    NumberTotal,
    /// `start[-end]/total`.
    RangeTotal,
}

fn score_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"^(.*)\((.*)\)$").unwrap())
}

impl FieldKind {
    /// Decode a non-empty sub-field token. `None` means the token does not
    /// match this kind; the caller degrades it to [`AnnValue::Na`] with a
    /// diagnostic.
    pub fn decode(self, raw: &str) -> Option<AnnValue> {
        match self {
            FieldKind::Str => Some(AnnValue::Str(raw.to_owned())),
            FieldKind::Int => raw.parse().ok().map(AnnValue::Int),
            FieldKind::Float => raw.parse().ok().map(AnnValue::Float),
            FieldKind::Flag { truthy } => Some(AnnValue::Bool(raw == truthy)),
            FieldKind::List { sep } => Some(AnnValue::List(
                raw.split(sep).map(|s| s.trim().to_owned()).collect(),
            )),
            FieldKind::Pairs => raw
                .split('&')
                .map(|pair| {
                    pair.split_once(':')
                        .map(|(k, v)| (k.trim().to_owned(), v.trim().to_owned()))
                })
                .collect::<Option<Vec<_>>>()
                .map(AnnValue::Pairs),
            FieldKind::Scores => raw
                .split('&')
                .map(|entry| {
                    let captures = score_pattern().captures(entry.trim())?;
                    let score: f32 = captures[2].parse().ok()?;
                    Some((captures[1].to_owned(), score))
                })
                .collect::<Option<Vec<_>>>()
                .map(AnnValue::Scores),
            FieldKind::Terms => Some(AnnValue::Terms(
                raw.split('&').map(|s| s.trim().to_owned()).collect(),
            )),
            FieldKind::PosRangeSnpEff => PosRange::from_snpeff(raw).map(AnnValue::PosRange),
            FieldKind::PosRangeVep => PosRange::from_vep(raw).map(AnnValue::PosRange),
            FieldKind::NumberTotal => {
                let (number, total) = raw.split_once('/')?;
                Some(AnnValue::NumberTotal {
                    number: number.trim().parse().ok()?,
                    total: total.trim().parse().ok()?,
                })
            }
            FieldKind::RangeTotal => {
                let (range, total) = raw.split_once('/')?;
                let total = total.trim().parse().ok()?;
                let (start, end) = match range.split_once('-') {
                    Some((start, end)) => {
                        (start.trim().parse().ok()?, end.trim().parse().ok()?)
                    }
                    None => {
                        let single = range.trim().parse().ok()?;
                        (single, single)
                    }
                };
                Some(AnnValue::RangeTotal { start, end, total })
            }
        }
    }
}
