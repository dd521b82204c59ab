//! OBO flat-file loading
//!
//! Parses the `[Term]` stanzas of an OBO file (plain or gzip-compressed)
//! into the term and edge lists the graph is built from. Only the `id`,
//! `name`, `is_a`, and `is_obsolete` tags are interpreted; everything else
//! is skipped.

use std::fs::File;
use std::io::{BufRead, BufReader, Read};
use std::path::Path;
use std::sync::Arc;

use flate2::read::MultiGzDecoder;
use tracing::warn;

use crate::error::{Error, Result};
use crate::graph::Ontology;

impl Ontology {
    /// Load an ontology from an OBO file. A `.gz` suffix selects gzip
    /// decompression.
    pub fn from_obo_path(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let file = File::open(path)?;
        if path.extension().is_some_and(|ext| ext == "gz") {
            Self::from_obo_reader(MultiGzDecoder::new(file))
        } else {
            Self::from_obo_reader(file)
        }
    }

    /// Load an ontology from any OBO-format reader.
    pub fn from_obo_reader(reader: impl Read) -> Result<Self> {
        let mut terms: Vec<(Arc<str>, Arc<str>)> = Vec::new();
        // child id -> parent id, resolved to names once all stanzas are read
        let mut raw_edges: Vec<(Arc<str>, Arc<str>)> = Vec::new();

        let mut stanza = Stanza::default();
        let mut in_term = false;

        for (lineno, line) in BufReader::new(reader).lines().enumerate() {
            let line = line?;
            let line = line.trim();
            if line.is_empty() || line.starts_with('!') {
                continue;
            }
            if line.starts_with('[') {
                stanza.flush(&mut terms, &mut raw_edges);
                in_term = line == "[Term]";
                continue;
            }
            if !in_term {
                continue;
            }
            let Some((tag, value)) = line.split_once(':') else {
                return Err(Error::Parse {
                    line: lineno + 1,
                    message: format!("expected `tag: value`, got {line:?}"),
                });
            };
            let value = value.trim();
            match tag {
                "id" => stanza.id = Some(Arc::from(value)),
                "name" => stanza.name = Some(Arc::from(value)),
                "is_a" => {
                    // `is_a: SO:0000110 ! sequence_feature` - keep the accession
                    let parent = value.split_whitespace().next().unwrap_or("");
                    if parent.is_empty() {
                        return Err(Error::Parse {
                            line: lineno + 1,
                            message: "empty is_a target".into(),
                        });
                    }
                    stanza.is_a.push(Arc::from(parent));
                }
                "is_obsolete" => stanza.obsolete = value == "true",
                _ => {}
            }
        }
        stanza.flush(&mut terms, &mut raw_edges);

        // resolve id-based edges to name-based edges
        let by_id: std::collections::HashMap<&str, &Arc<str>> =
            terms.iter().map(|(id, name)| (id.as_ref(), name)).collect();
        let mut edges = Vec::with_capacity(raw_edges.len());
        for (child_id, parent_id) in &raw_edges {
            match (by_id.get(child_id.as_ref()), by_id.get(parent_id.as_ref())) {
                (Some(child), Some(parent)) => edges.push(((*child).clone(), (*parent).clone())),
                _ => warn!(
                    child = child_id.as_ref(),
                    parent = parent_id.as_ref(),
                    "is_a edge references an unknown term, skipping"
                ),
            }
        }

        Ok(Self::from_parts(terms, edges))
    }
}

#[derive(Default)]
struct Stanza {
    id: Option<Arc<str>>,
    name: Option<Arc<str>>,
    is_a: Vec<Arc<str>>,
    obsolete: bool,
}

impl Stanza {
    fn flush(&mut self, terms: &mut Vec<(Arc<str>, Arc<str>)>, edges: &mut Vec<(Arc<str>, Arc<str>)>) {
        let stanza = std::mem::take(self);
        if stanza.obsolete {
            return;
        }
        match (stanza.id, stanza.name) {
            (Some(id), Some(name)) => {
                for parent in stanza.is_a {
                    edges.push((id.clone(), parent));
                }
                terms.push((id, name));
            }
            (Some(id), None) => warn!(id = id.as_ref(), "term stanza without a name, skipping"),
            _ => {}
        }
    }
}
