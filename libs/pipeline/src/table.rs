//! Projection (table output)
//!
//! Turns an expression like `CHROM, POS, ANN['SYMBOL']` into rows of
//! values, one per record (or per annotation entry when the expression
//! reads the alias). `for_each_sample(lambda s: body)` elements are
//! expanded structurally after compilation: one column per sample, each
//! the lambda body with the parameter replaced by the sample-name literal.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use tracing::warn;

use varex_expr::{AstNode, Expr, Value};
use varex_ontology::Ontology;

use crate::env::{Config, Environment};
use crate::error::Result;
use crate::header::{classify, HeaderMeta};
use crate::record::VariantRecord;

pub struct Projection {
    env: Environment,
    columns: Vec<Expr>,
    titles: Vec<String>,
}

impl Projection {
    /// Compile a projection. The source is wrapped in parentheses so a
    /// comma-separated expression parses as one tuple; a single expression
    /// yields a single column.
    pub fn new(
        source: &str,
        config: &Config,
        header: &HeaderMeta,
        ontology: Option<Arc<Ontology>>,
        aux: HashMap<String, Arc<HashSet<String>>>,
    ) -> Result<Projection> {
        let wrapped = format!("({source})");
        let env = Environment::new_projection(&wrapped, config, header, ontology, aux)?;

        let elements: Vec<AstNode> = match env.expr().ast() {
            AstNode::Tuple(items) => items.clone(),
            other => vec![other.clone()],
        };

        let samples = env.header().samples().clone();
        let mut columns = Vec::new();
        let mut titles = Vec::new();
        for element in elements {
            match broadcast_body(&element) {
                Some((param, body)) => {
                    for sample in samples.iter() {
                        let instance =
                            body.substitute(param, &AstNode::Str(sample.clone()));
                        titles.push(instance.to_string());
                        columns.push(env.expr().with_ast(instance));
                    }
                }
                None => {
                    titles.push(element.to_string());
                    columns.push(env.expr().with_ast(element));
                }
            }
        }

        Ok(Projection {
            env,
            columns,
            titles,
        })
    }

    /// Column titles, in output order.
    pub fn header(&self) -> &[String] {
        &self.titles
    }

    pub fn env(&self) -> &Environment {
        &self.env
    }

    /// The rows this record projects to: one, or one per annotation entry.
    /// A column that fails evaluates to NA for that row.
    pub fn project(&self, record: &Arc<VariantRecord>) -> Result<Vec<Vec<Value>>> {
        let entries = if self.env.uses_annotation() {
            self.env
                .decoded_entries(record)
                .into_iter()
                .map(Some)
                .collect()
        } else {
            vec![None]
        };
        let mut rows = Vec::with_capacity(entries.len());
        for entry in entries {
            let mut row = Vec::with_capacity(self.columns.len());
            for column in &self.columns {
                let value = match self.env.eval_expr(column, record, entry.clone()) {
                    Ok(value) => value,
                    Err(err @ varex_expr::Error::InvalidRecord(_)) => {
                        return Err(classify(err, record))
                    }
                    Err(err) => {
                        warn!(
                            coordinate = record.coordinate(),
                            index = record.index,
                            column = column.source(),
                            error = %err,
                            "column failed; writing NA"
                        );
                        Value::Na
                    }
                };
                row.push(value);
            }
            rows.push(row);
        }
        Ok(rows)
    }
}

/// `for_each_sample(lambda s: body)` → its parameter and body.
fn broadcast_body(element: &AstNode) -> Option<(&str, &AstNode)> {
    let AstNode::Call { callee, args, .. } = element else {
        return None;
    };
    let AstNode::Identifier { name, .. } = callee.as_ref() else {
        return None;
    };
    if name != "for_each_sample" {
        return None;
    }
    match args.as_slice() {
        [AstNode::Lambda { param, body }] => Some((param, body)),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil::{test_header, test_record};

    fn projection(source: &str) -> Projection {
        Projection::new(
            source,
            &Config::default(),
            &test_header(),
            None,
            HashMap::new(),
        )
        .unwrap()
    }

    #[test]
    fn one_row_per_record_without_annotations() {
        let p = projection("CHROM, POS, QUAL");
        assert_eq!(p.header(), ["CHROM", "POS", "QUAL"]);

        let rows = p.project(&Arc::new(test_record())).unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0][0], Value::str("1"));
        assert_eq!(rows[0][1], Value::Int(100));
    }

    #[test]
    fn one_row_per_annotation_entry() {
        let p = projection("POS, ANN['SYMBOL']");
        let rows = p.project(&Arc::new(test_record())).unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0][1], Value::str("BRCA1"));
        assert_eq!(rows[1][1], Value::str("TP53"));
    }

    #[test]
    fn for_each_sample_expands_to_one_column_per_sample() {
        let p = projection("POS, for_each_sample(lambda s: FORMAT['DP'][s])");
        assert_eq!(
            p.header(),
            ["POS", "FORMAT['DP']['sample1']", "FORMAT['DP']['sample2']"]
        );

        let rows = p.project(&Arc::new(test_record())).unwrap();
        assert_eq!(rows[0][1], Value::Int(20));
        assert_eq!(rows[0][2], Value::Int(30));
    }

    #[test]
    fn failing_column_degrades_to_na() {
        let p = projection("POS, INFO['NOPE']");
        let rows = p.project(&Arc::new(test_record())).unwrap();
        assert_eq!(rows[0][0], Value::Int(100));
        assert!(matches!(rows[0][1], Value::Na));
    }
}
