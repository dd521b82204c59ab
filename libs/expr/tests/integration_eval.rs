//! End-to-end tests: compile an expression against a record symbol set and
//! evaluate it against a stub record.

use std::sync::Arc;

use varex_expr::{DynObject, Error, EvalContext, Expr, SymbolSource, SymbolSpec, Value};

/// A stub record: a flat name -> value map plus a FORMAT object backing the
/// genotype predicates.
struct StubRecord {
    symbols: Vec<(&'static str, Value)>,
}

impl StubRecord {
    fn new() -> Self {
        let gt: Arc<dyn DynObject> = Arc::new(MapObject {
            name: "GT",
            entries: vec![
                ("sample1", Value::str("0/1")),
                ("sample2", Value::str("1|1")),
                ("sample3", Value::str("./1")),
            ],
        });
        let format: Arc<dyn DynObject> = Arc::new(MapObject {
            name: "FORMAT",
            entries: vec![("GT", Value::Object(gt))],
        });
        Self {
            symbols: vec![
                ("CHROM", Value::str("1")),
                ("POS", Value::Int(12345)),
                ("QUAL", Value::Float(48.5)),
                ("FILTER", Value::List(vec![Value::str("PASS")])),
                ("DP", Value::Na),
                ("FORMAT", Value::Object(format)),
                (
                    "SAMPLES",
                    Value::List(vec![
                        Value::str("sample1"),
                        Value::str("sample2"),
                        Value::str("sample3"),
                    ]),
                ),
            ],
        }
    }

    fn spec(&self) -> SymbolSpec {
        SymbolSpec {
            symbols: self.symbols.iter().map(|(name, _)| name.to_string()).collect(),
            projection: false,
        }
    }
}

impl SymbolSource for StubRecord {
    fn lookup(&self, name: &str) -> varex_expr::Result<Option<Value>> {
        Ok(self
            .symbols
            .iter()
            .find(|(n, _)| *n == name)
            .map(|(_, value)| value.clone()))
    }
}

#[derive(Debug)]
struct MapObject {
    name: &'static str,
    entries: Vec<(&'static str, Value)>,
}

impl DynObject for MapObject {
    fn type_name(&self) -> &'static str {
        self.name
    }

    fn index(&self, key: &Value) -> varex_expr::Result<Value> {
        let Value::Str(key) = key else {
            return Err(Error::Eval(format!("{} is keyed by name", self.name)));
        };
        self.entries
            .iter()
            .find(|(name, _)| name == &key.as_ref())
            .map(|(_, value)| value.clone())
            .ok_or_else(|| Error::Eval(format!("unknown key {key:?} in {}", self.name)))
    }

    fn contains(&self, key: &Value) -> varex_expr::Result<bool> {
        match key {
            Value::Str(key) => Ok(self.entries.iter().any(|(name, _)| name == &key.as_ref())),
            _ => Ok(false),
        }
    }
}

fn eval(source: &str) -> varex_expr::Result<Value> {
    let record = StubRecord::new();
    let expr = Expr::compile(source, &record.spec())?;
    let ctx = EvalContext {
        source: &record,
        ontology: None,
    };
    expr.eval(&ctx)
}

fn eval_ok(source: &str) -> Value {
    eval(source).unwrap()
}

#[test]
fn filters_read_record_symbols() {
    assert_eq!(eval_ok("QUAL >= 30"), Value::Bool(true));
    assert_eq!(eval_ok("CHROM == '1' and POS < 20000"), Value::Bool(true));
    assert_eq!(eval_ok("'PASS' in FILTER"), Value::Bool(true));
}

#[test]
fn missing_symbol_comparison_is_na_not_an_error() {
    // DP is unset; the comparison must yield falsy NA, never raise
    assert!(matches!(eval("DP >= 30"), Ok(Value::Na)));
    assert_eq!(eval_ok("DP >= 30 or QUAL >= 30"), Value::Bool(true));
}

#[test]
fn undeclared_symbol_is_a_compile_error() {
    let record = StubRecord::new();
    let err = Expr::compile("FOO == 1", &record.spec()).unwrap_err();
    assert!(matches!(err, Error::UnknownIdentifier { ref name, .. } if name == "FOO"));
}

#[test]
fn na_iterates_as_empty() {
    assert_eq!(eval_ok("len(DP)"), Value::Int(0));
    assert_eq!(eval_ok("[x for x in DP]"), Value::List(vec![]));
    assert_eq!(eval_ok("any(x > 1 for x in DP)"), Value::Bool(false));
}

#[test]
fn na_stringifies_as_empty() {
    assert_eq!(eval_ok("str(DP)"), Value::str(""));
}

#[test]
fn chained_comparison() {
    assert_eq!(eval_ok("0 < POS < 20000"), Value::Bool(true));
    assert_eq!(eval_ok("0 < POS < 100"), Value::Bool(false));
}

#[test]
fn comprehensions_and_builtins() {
    assert_eq!(
        eval_ok("[x * 2 for x in [1, 2, 3] if x > 1]"),
        Value::List(vec![Value::Int(4), Value::Int(6)])
    );
    assert_eq!(eval_ok("sum(range(5))"), Value::Int(10));
    assert_eq!(eval_ok("max([1, 5, 3])"), Value::Int(5));
    assert_eq!(
        eval_ok("sorted([3, 1, 2])"),
        Value::List(vec![Value::Int(1), Value::Int(2), Value::Int(3)])
    );
}

#[test]
fn missing_element_makes_extrema_na() {
    assert!(matches!(eval("max([1, DP, 3])"), Ok(Value::Na)));
}

#[test]
fn na_helpers() {
    assert_eq!(
        eval_ok("without_na([1, DP, 3])"),
        Value::List(vec![Value::Int(1), Value::Int(3)])
    );
    assert_eq!(
        eval_ok("replace_na([1, DP], 0)"),
        Value::List(vec![Value::Int(1), Value::Int(0)])
    );
    assert_eq!(eval_ok("is_na(DP)"), Value::Bool(true));
    assert_eq!(eval_ok("is_na(QUAL)"), Value::Bool(false));
}

#[test]
fn lambdas_are_first_class() {
    assert_eq!(
        eval_ok("list(map(lambda x: x + 1, [1, 2]))"),
        Value::List(vec![Value::Int(2), Value::Int(3)])
    );
    assert_eq!(
        eval_ok("list(filter(lambda x: x % 2 == 0, range(6)))"),
        Value::List(vec![Value::Int(0), Value::Int(2), Value::Int(4)])
    );
}

#[test]
fn namespace_calls() {
    assert_eq!(eval_ok("math.floor(3.7)"), Value::Int(3));
    assert_eq!(eval_ok("statistics.mean([1, 2, 3])"), Value::Float(2.0));
    assert_eq!(eval_ok("re.search('^chr', 'chr1')"), Value::Bool(true));
    assert_eq!(eval_ok("re.fullmatch('a|ab', 'ab')"), Value::Bool(true));
    // NA subject behaves like the empty string
    assert_eq!(eval_ok("re.search('x', DP)"), Value::Bool(false));
}

#[test]
fn math_on_missing_is_na() {
    assert!(matches!(eval("math.sqrt(DP)"), Ok(Value::Na)));
}

#[test]
fn string_methods() {
    assert_eq!(eval_ok("CHROM.startswith('1')"), Value::Bool(true));
    assert_eq!(eval_ok("'A|B|C'.split('|')[1]"), Value::str("B"));
    assert_eq!(eval_ok("'  x '.strip()"), Value::str("x"));
}

#[test]
fn method_on_missing_is_na() {
    assert!(matches!(eval("DP.startswith('x')"), Ok(Value::Na)));
}

#[test]
fn genotype_predicates() {
    assert_eq!(eval_ok("is_het('sample1')"), Value::Bool(true));
    assert_eq!(eval_ok("is_het('sample2')"), Value::Bool(false));
    assert_eq!(eval_ok("is_hom('sample2')"), Value::Bool(true));
    assert_eq!(eval_ok("any_ref('sample1')"), Value::Bool(true));
    assert_eq!(eval_ok("any_ref('sample2')"), Value::Bool(false));
    assert_eq!(eval_ok("any_var('sample2')"), Value::Bool(true));
    // sample by index resolves through SAMPLES
    assert_eq!(eval_ok("is_het(0)"), Value::Bool(true));
}

#[test]
fn partially_unknown_genotype_is_na() {
    assert!(matches!(eval("is_het('sample3')"), Ok(Value::Na)));
    assert!(matches!(eval("any_var('sample3')"), Ok(Value::Na)));
}

#[test]
fn identity_distinguishes_absent_from_na() {
    assert_eq!(eval_ok("None is None"), Value::Bool(true));
    assert_eq!(eval_ok("NA is NA"), Value::Bool(true));
    assert_eq!(eval_ok("None is NA"), Value::Bool(false));
}

#[test]
fn sort_key_markers_wrap_their_value() {
    assert!(matches!(
        eval_ok("desc(QUAL)"),
        Value::Ordered { descending: true, .. }
    ));
    assert!(matches!(
        eval_ok("asc(POS)"),
        Value::Ordered { descending: false, .. }
    ));
}

#[test]
fn for_each_sample_requires_projection_context() {
    let record = StubRecord::new();
    let err = Expr::compile("for_each_sample(lambda s: is_het(s))", &record.spec()).unwrap_err();
    assert!(matches!(err, Error::Analyze { .. }));
}
