//! Environment and per-record scope
//!
//! An [`Environment`] compiles one expression against the record symbol set
//! and owns everything shared across records: header metadata, annotation
//! schema, ontology, auxiliary sets. Per record it builds a [`Scope`], the
//! `SymbolSource` the expression reads through.
//!
//! INFO and FORMAT are surfaced as lazy objects: declared arity is applied
//! on access, so a malformed key the expression never touches costs
//! nothing, and a `Number=A` violation only fires when that key is read.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use varex_ann::AnnSchema;
use varex_expr::{
    DynObject, Error as ExprError, EvalContext, Expr, SymbolSource, SymbolSpec, Value,
};
use varex_ontology::Ontology;

use crate::error::{Error, Result};
use crate::header::{self, HeaderMeta, Number};
use crate::record::VariantRecord;

/// Record symbols every expression can address, before the annotation
/// alias is added.
const RECORD_SYMBOLS: &[&str] = &[
    "CHROM", "POS", "END", "ID", "REF", "ALT", "QUAL", "FILTER", "INFO", "FORMAT", "SAMPLES",
    "INDEX", "AUX",
];

/// Pipeline configuration shared by all drivers.
#[derive(Debug, Clone)]
pub struct Config {
    /// INFO key holding the annotation field, and the symbol expressions
    /// address it by. `ANN` for SnpEff output, typically `CSQ` for VEP.
    pub ann_key: String,
    /// Declared-arity overrides for INFO keys.
    pub overwrite_number_info: HashMap<String, Number>,
    /// Declared-arity overrides for FORMAT keys.
    pub overwrite_number_format: HashMap<String, Number>,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            ann_key: "ANN".to_owned(),
            overwrite_number_info: HashMap::new(),
            overwrite_number_format: HashMap::new(),
        }
    }
}

/// One compiled expression plus the shared state needed to evaluate it
/// against records.
pub struct Environment {
    expr: Expr,
    ann_key: Arc<str>,
    schema: Option<Arc<AnnSchema>>,
    header: Arc<HeaderMeta>,
    ontology: Option<Arc<Ontology>>,
    aux: Arc<HashMap<String, Arc<HashSet<String>>>>,
    uses_annotation: bool,
}

impl Environment {
    /// Compile `source` for record-at-a-time evaluation. Fatal on any
    /// compile-time expression error, and on an annotation reference when
    /// the header does not declare the configured key.
    pub fn new(
        source: &str,
        config: &Config,
        header: &HeaderMeta,
        ontology: Option<Arc<Ontology>>,
        aux: HashMap<String, Arc<HashSet<String>>>,
    ) -> Result<Environment> {
        Environment::compile(source, config, header, ontology, aux, false)
    }

    /// Like [`Environment::new`], but `for_each_sample` is legal.
    pub fn new_projection(
        source: &str,
        config: &Config,
        header: &HeaderMeta,
        ontology: Option<Arc<Ontology>>,
        aux: HashMap<String, Arc<HashSet<String>>>,
    ) -> Result<Environment> {
        Environment::compile(source, config, header, ontology, aux, true)
    }

    fn compile(
        source: &str,
        config: &Config,
        header: &HeaderMeta,
        ontology: Option<Arc<Ontology>>,
        aux: HashMap<String, Arc<HashSet<String>>>,
        projection: bool,
    ) -> Result<Environment> {
        let mut header = header.clone();
        header.apply_overrides(&config.overwrite_number_info, &config.overwrite_number_format);

        let mut symbols: HashSet<String> =
            RECORD_SYMBOLS.iter().map(|s| s.to_string()).collect();
        symbols.insert(config.ann_key.clone());
        let spec = SymbolSpec {
            symbols,
            projection,
        };
        let expr = Expr::compile(source, &spec)?;

        let uses_annotation = expr.uses(&config.ann_key);
        let schema = if uses_annotation {
            let description = header.info_description(&config.ann_key).ok_or_else(|| {
                Error::NoAnnotationField {
                    key: config.ann_key.clone(),
                }
            })?;
            Some(Arc::new(AnnSchema::from_header(
                &config.ann_key,
                description,
            )?))
        } else {
            None
        };

        Ok(Environment {
            expr,
            ann_key: config.ann_key.as_str().into(),
            schema,
            header: Arc::new(header),
            ontology,
            aux: Arc::new(aux),
            uses_annotation,
        })
    }

    pub fn expr(&self) -> &Expr {
        &self.expr
    }

    pub fn uses_annotation(&self) -> bool {
        self.uses_annotation
    }

    pub fn ann_key(&self) -> &str {
        &self.ann_key
    }

    pub fn header(&self) -> &HeaderMeta {
        &self.header
    }

    /// The record's decoded annotation entries; a single all-NA entry when
    /// the record carries none, so entry-wise predicates still run once.
    pub(crate) fn decoded_entries(&self, record: &VariantRecord) -> Vec<Arc<[Value]>> {
        let Some(schema) = &self.schema else {
            return Vec::new();
        };
        let raw = record.annotation_entries(&self.ann_key);
        if raw.is_empty() {
            let blank: Vec<Value> = vec![Value::Na; schema.fields().len()];
            return vec![blank.into()];
        }
        raw.iter()
            .map(|entry| {
                schema
                    .decode_entry(entry)
                    .into_iter()
                    .map(Value::from)
                    .collect()
            })
            .collect()
    }

    pub(crate) fn scope(
        &self,
        record: &Arc<VariantRecord>,
        entry: Option<Arc<[Value]>>,
    ) -> Scope {
        Scope {
            record: Arc::clone(record),
            header: Arc::clone(&self.header),
            ann_key: Arc::clone(&self.ann_key),
            schema: self.schema.clone(),
            entry,
            aux: Arc::clone(&self.aux),
        }
    }

    /// Evaluate this environment's expression for one record (and one
    /// annotation entry, when entry-wise).
    pub(crate) fn eval_for(
        &self,
        record: &Arc<VariantRecord>,
        entry: Option<Arc<[Value]>>,
    ) -> varex_expr::Result<Value> {
        self.eval_expr(&self.expr, record, entry)
    }

    /// Evaluate an expression derived from this environment's (same
    /// analysis, possibly a rewritten AST).
    pub(crate) fn eval_expr(
        &self,
        expr: &Expr,
        record: &Arc<VariantRecord>,
        entry: Option<Arc<[Value]>>,
    ) -> varex_expr::Result<Value> {
        let scope = self.scope(record, entry);
        let ctx = EvalContext {
            source: &scope,
            ontology: self.ontology.as_deref(),
        };
        expr.eval(&ctx)
    }
}

/// Per-record symbol table. Cheap to build: every field is an `Arc` clone.
pub struct Scope {
    record: Arc<VariantRecord>,
    header: Arc<HeaderMeta>,
    ann_key: Arc<str>,
    schema: Option<Arc<AnnSchema>>,
    entry: Option<Arc<[Value]>>,
    aux: Arc<HashMap<String, Arc<HashSet<String>>>>,
}

impl SymbolSource for Scope {
    fn lookup(&self, name: &str) -> varex_expr::Result<Option<Value>> {
        if name == self.ann_key.as_ref() {
            return Ok(Some(match (&self.schema, &self.entry) {
                (Some(schema), Some(entry)) => Value::Object(Arc::new(AnnEntry {
                    schema: Arc::clone(schema),
                    values: Arc::clone(entry),
                })),
                _ => Value::Na,
            }));
        }
        let record = &self.record;
        let value = match name {
            "CHROM" => Value::str(record.chrom.as_str()),
            "POS" => Value::Int(record.pos),
            "END" => record.end.map_or(Value::Na, Value::Int),
            "ID" => record
                .id
                .as_deref()
                .map_or(Value::Absent, Value::str),
            "REF" => Value::str(record.ref_allele.as_str()),
            "ALT" => match record.alt.as_slice() {
                [single] => Value::str(single.as_str()),
                alts => {
                    return Err(ExprError::InvalidRecord(format!(
                        "ALT carries {} alleles",
                        alts.len()
                    )))
                }
            },
            "QUAL" => record.qual.map_or(Value::Na, |q| Value::Float(q as f64)),
            "FILTER" => Value::List(
                record
                    .filter
                    .iter()
                    .map(|f| Value::str(f.as_str()))
                    .collect(),
            ),
            "INFO" => Value::Object(Arc::new(InfoObject {
                record: Arc::clone(record),
                header: Arc::clone(&self.header),
                ann_key: Arc::clone(&self.ann_key),
            })),
            "FORMAT" => Value::Object(Arc::new(FormatObject {
                record: Arc::clone(record),
                header: Arc::clone(&self.header),
            })),
            "SAMPLES" => Value::List(
                record
                    .samples
                    .iter()
                    .map(|s| Value::str(s.as_str()))
                    .collect(),
            ),
            "INDEX" => Value::Int(record.index as i64),
            "AUX" => Value::Object(Arc::new(AuxObject {
                sets: Arc::clone(&self.aux),
            })),
            _ => return Ok(None),
        };
        Ok(Some(value))
    }
}

fn string_key<'v>(object: &str, key: &'v Value) -> varex_expr::Result<&'v str> {
    match key {
        Value::Str(key) => Ok(key.as_ref()),
        other => Err(ExprError::Eval(format!(
            "{object} is keyed by name, got {}",
            other.type_name()
        ))),
    }
}

/// `INFO[...]`: declared keys only, arity applied on access.
#[derive(Debug)]
struct InfoObject {
    record: Arc<VariantRecord>,
    header: Arc<HeaderMeta>,
    ann_key: Arc<str>,
}

impl DynObject for InfoObject {
    fn type_name(&self) -> &'static str {
        "INFO"
    }

    fn index(&self, key: &Value) -> varex_expr::Result<Value> {
        let key = string_key("INFO", key)?;
        if key == self.ann_key.as_ref() {
            return Err(ExprError::Eval(format!(
                "INFO[{key:?}] is reserved; address annotations as `{key}`",
            )));
        }
        let Some(number) = self.header.info_number(key) else {
            return Err(ExprError::Eval(format!("unknown INFO key {key:?}")));
        };
        match self.record.info.get(key) {
            None => Ok(if number == Number::Flag {
                Value::Bool(false)
            } else {
                Value::Na
            }),
            Some(raw) => header::coerce(key, number, raw, self.record.index),
        }
    }

    fn contains(&self, key: &Value) -> varex_expr::Result<bool> {
        let key = string_key("INFO", key)?;
        Ok(key != self.ann_key.as_ref() && self.record.info.contains_key(key))
    }
}

/// `FORMAT[...]`: yields a per-sample view of one key.
#[derive(Debug)]
struct FormatObject {
    record: Arc<VariantRecord>,
    header: Arc<HeaderMeta>,
}

impl DynObject for FormatObject {
    fn type_name(&self) -> &'static str {
        "FORMAT"
    }

    fn index(&self, key: &Value) -> varex_expr::Result<Value> {
        let key = string_key("FORMAT", key)?;
        let Some(number) = self.header.format_number(key) else {
            return Err(ExprError::Eval(format!("unknown FORMAT key {key:?}")));
        };
        Ok(Value::Object(Arc::new(FormatField {
            record: Arc::clone(&self.record),
            key: key.to_owned(),
            number,
        })))
    }

    fn contains(&self, key: &Value) -> varex_expr::Result<bool> {
        let key = string_key("FORMAT", key)?;
        Ok(self.record.format.contains_key(key))
    }
}

/// One FORMAT key, indexed by sample name or position.
#[derive(Debug)]
struct FormatField {
    record: Arc<VariantRecord>,
    key: String,
    number: Number,
}

impl DynObject for FormatField {
    fn type_name(&self) -> &'static str {
        "FORMAT field"
    }

    fn index(&self, sample: &Value) -> varex_expr::Result<Value> {
        let position = match sample {
            Value::Str(name) => self
                .record
                .samples
                .iter()
                .position(|s| s == name.as_ref())
                .ok_or_else(|| ExprError::Eval(format!("unknown sample {name:?}")))?,
            Value::Int(index) => {
                let index = *index;
                let len = self.record.samples.len() as i64;
                let resolved = if index < 0 { index + len } else { index };
                if resolved < 0 || resolved >= len {
                    return Err(ExprError::Eval(format!(
                        "sample index {index} out of range ({len} samples)"
                    )));
                }
                resolved as usize
            }
            other => {
                return Err(ExprError::Eval(format!(
                    "samples are addressed by name or index, got {}",
                    other.type_name()
                )))
            }
        };
        match self.record.format.get(&self.key) {
            None => Ok(Value::Na),
            Some(values) => match values.get(position) {
                None | Some(Value::Absent) | Some(Value::Na) => Ok(Value::Na),
                Some(raw) => header::coerce(&self.key, self.number, raw, self.record.index),
            },
        }
    }

    fn contains(&self, sample: &Value) -> varex_expr::Result<bool> {
        match sample {
            Value::Str(name) => Ok(self
                .record
                .samples
                .iter()
                .any(|s| s == name.as_ref())),
            _ => Ok(false),
        }
    }
}

/// One decoded annotation entry, keyed by schema field name.
#[derive(Debug)]
struct AnnEntry {
    schema: Arc<AnnSchema>,
    values: Arc<[Value]>,
}

impl DynObject for AnnEntry {
    fn type_name(&self) -> &'static str {
        "annotation entry"
    }

    fn index(&self, key: &Value) -> varex_expr::Result<Value> {
        let key = string_key("annotation entry", key)?;
        match self.schema.index_of(key) {
            Some(position) => Ok(self.values.get(position).cloned().unwrap_or(Value::Na)),
            None => Err(ExprError::Eval(format!(
                "unknown annotation field {key:?}"
            ))),
        }
    }

    fn contains(&self, key: &Value) -> varex_expr::Result<bool> {
        Ok(string_key("annotation entry", key)
            .map(|key| self.schema.index_of(key).is_some())
            .unwrap_or(false))
    }
}

/// `AUX[...]`: named membership sets.
#[derive(Debug)]
struct AuxObject {
    sets: Arc<HashMap<String, Arc<HashSet<String>>>>,
}

impl DynObject for AuxObject {
    fn type_name(&self) -> &'static str {
        "AUX"
    }

    fn index(&self, key: &Value) -> varex_expr::Result<Value> {
        let key = string_key("AUX", key)?;
        match self.sets.get(key) {
            Some(set) => Ok(Value::Object(Arc::new(AuxSet {
                name: key.to_owned(),
                set: Arc::clone(set),
            }))),
            None => Err(ExprError::Eval(format!("unknown auxiliary set {key:?}"))),
        }
    }

    fn contains(&self, key: &Value) -> varex_expr::Result<bool> {
        Ok(string_key("AUX", key)
            .map(|key| self.sets.contains_key(key))
            .unwrap_or(false))
    }
}

#[derive(Debug)]
struct AuxSet {
    name: String,
    set: Arc<HashSet<String>>,
}

impl DynObject for AuxSet {
    fn type_name(&self) -> &'static str {
        "auxiliary set"
    }

    fn index(&self, _key: &Value) -> varex_expr::Result<Value> {
        Err(ExprError::Eval(format!(
            "auxiliary set {:?} supports membership tests only",
            self.name
        )))
    }

    fn contains(&self, key: &Value) -> varex_expr::Result<bool> {
        match key {
            Value::Str(key) => Ok(self.set.contains(key.as_ref())),
            Value::Term(term) => Ok(self.set.contains(term.name())),
            _ => Ok(false),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil::{test_header, test_record};

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

    fn eval(source: &str) -> varex_expr::Result<Value> {
        let environment = env(source);
        let record = Arc::new(test_record());
        let entry = environment
            .decoded_entries(&record)
            .into_iter()
            .next();
        environment.eval_for(&record, entry)
    }

    #[test]
    fn record_symbols_resolve() {
        assert_eq!(eval("CHROM").unwrap(), Value::str("1"));
        assert_eq!(eval("POS").unwrap(), Value::Int(100));
        assert_eq!(eval("REF").unwrap(), Value::str("A"));
        assert_eq!(eval("ALT").unwrap(), Value::str("T"));
    }

    #[test]
    fn declared_unset_info_is_na() {
        assert!(matches!(eval("INFO['DP']"), Ok(Value::Na)));
    }

    #[test]
    fn unset_flag_is_false() {
        assert_eq!(eval("INFO['DB']").unwrap(), Value::Bool(false));
    }

    #[test]
    fn undeclared_info_key_is_a_record_error() {
        assert!(matches!(eval("INFO['NOPE']"), Err(ExprError::Eval(_))));
    }

    #[test]
    fn annotation_alias_reads_decoded_fields() {
        assert_eq!(eval("ANN['SYMBOL']").unwrap(), Value::str("BRCA1"));
        assert_eq!(eval("ANN['IMPACT']").unwrap(), Value::str("HIGH"));
    }

    #[test]
    fn info_access_to_the_ann_key_is_refused() {
        assert!(matches!(
            eval("INFO['ANN'] and ANN['SYMBOL']"),
            Err(ExprError::Eval(_))
        ));
    }

    #[test]
    fn multiallelic_alt_access_is_invalid_record() {
        let environment = env("ALT == 'T'");
        let mut record = test_record();
        record.alt.push("G".into());
        let record = Arc::new(record);
        assert!(matches!(
            environment.eval_for(&record, None),
            Err(ExprError::InvalidRecord(_))
        ));
    }

    #[test]
    fn format_is_per_sample() {
        assert_eq!(eval("FORMAT['DP']['sample1']").unwrap(), Value::Int(20));
        assert_eq!(eval("FORMAT['DP'][1]").unwrap(), Value::Int(30));
        assert_eq!(eval("FORMAT['GT']['sample1']").unwrap(), Value::str("0/1"));
    }

    #[test]
    fn genotype_predicates_reach_through_format() {
        assert_eq!(eval("is_het('sample1')").unwrap(), Value::Bool(true));
        assert_eq!(eval("is_hom('sample2')").unwrap(), Value::Bool(true));
    }

    #[test]
    fn annotation_reference_without_header_declaration_is_fatal() {
        let header = HeaderMeta::new(vec![]);
        let result = Environment::new(
            "ANN['SYMBOL'] == 'X'",
            &Config::default(),
            &header,
            None,
            HashMap::new(),
        );
        assert!(matches!(result, Err(Error::NoAnnotationField { .. })));
    }
}
