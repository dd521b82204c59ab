//! Auxiliary sets
//!
//! Named membership sets loaded from line-oriented files, reachable in
//! expressions as `AUX["name"]` and queried with `in`. Typical use is a
//! gene panel: `ANN["SYMBOL"] in AUX["panel"]`.

use std::collections::{HashMap, HashSet};
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;
use std::sync::Arc;

use tracing::debug;

use crate::error::{Error, Result};

/// Load every configured set. Any unreadable file is fatal.
pub fn load_aux_sets(
    paths: &HashMap<String, String>,
) -> Result<HashMap<String, Arc<HashSet<String>>>> {
    let mut sets = HashMap::with_capacity(paths.len());
    for (name, path) in paths {
        let set = load_one(Path::new(path)).map_err(|source| Error::Aux {
            name: name.clone(),
            path: path.clone(),
            source,
        })?;
        debug!(name, path, entries = set.len(), "loaded auxiliary set");
        sets.insert(name.clone(), Arc::new(set));
    }
    Ok(sets)
}

fn load_one(path: &Path) -> std::io::Result<HashSet<String>> {
    let reader = BufReader::new(File::open(path)?);
    let mut set = HashSet::new();
    for line in reader.lines() {
        let line = line?;
        let entry = line.trim();
        if !entry.is_empty() {
            set.insert(entry.to_owned());
        }
    }
    Ok(set)
}
