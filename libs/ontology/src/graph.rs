//! Immutable term graph with ancestry queries
//!
//! Terms are addressed by display name (the form that appears in annotation
//! fields, e.g. `missense_variant`); accessions (`SO:0001583`) are available
//! through O(1) lookup tables built at load time.

use std::collections::{HashMap, HashSet, VecDeque};
use std::fmt;
use std::sync::Arc;

/// A term accession, e.g. `SO:0001583`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TermId(Arc<str>);

impl TermId {
    pub fn new(id: impl Into<Arc<str>>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TermId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A term display name, e.g. `missense_variant`.
///
/// Cheap to clone; equality and ordering are by name.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Term(Arc<str>);

impl Term {
    pub fn new(name: impl Into<Arc<str>>) -> Self {
        Self(name.into())
    }

    pub fn name(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Term {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// The loaded ontology graph.
///
/// Adjacency is keyed by term name. Edge lists are sorted at build time so
/// every traversal visits terms in a deterministic order.
#[derive(Debug)]
pub struct Ontology {
    name_to_id: HashMap<Arc<str>, TermId>,
    id_to_name: HashMap<Arc<str>, Term>,
    // child name -> parent names (is_a edges)
    parents: HashMap<Arc<str>, Vec<Arc<str>>>,
    // parent name -> child names (reverse edges)
    children: HashMap<Arc<str>, Vec<Arc<str>>>,
}

impl Ontology {
    pub(crate) fn from_parts(
        terms: Vec<(Arc<str>, Arc<str>)>,
        edges: Vec<(Arc<str>, Arc<str>)>,
    ) -> Self {
        let mut name_to_id = HashMap::with_capacity(terms.len());
        let mut id_to_name = HashMap::with_capacity(terms.len());
        for (id, name) in terms {
            name_to_id.insert(name.clone(), TermId(id.clone()));
            id_to_name.insert(id, Term(name));
        }

        let mut parents: HashMap<Arc<str>, Vec<Arc<str>>> = HashMap::new();
        let mut children: HashMap<Arc<str>, Vec<Arc<str>>> = HashMap::new();
        for (child, parent) in edges {
            parents.entry(child.clone()).or_default().push(parent.clone());
            children.entry(parent).or_default().push(child);
        }
        for list in parents.values_mut().chain(children.values_mut()) {
            list.sort();
            list.dedup();
        }

        Self {
            name_to_id,
            id_to_name,
            parents,
            children,
        }
    }

    /// Number of terms in the graph.
    pub fn len(&self) -> usize {
        self.name_to_id.len()
    }

    pub fn is_empty(&self) -> bool {
        self.name_to_id.is_empty()
    }

    /// Whether a term name is known to the graph.
    pub fn contains(&self, name: &str) -> bool {
        self.name_to_id.contains_key(name)
    }

    /// Accession for a term name.
    pub fn id_of(&self, name: &str) -> Option<&TermId> {
        self.name_to_id.get(name)
    }

    /// Term name for an accession.
    pub fn name_of(&self, id: &str) -> Option<&Term> {
        self.id_to_name.get(id)
    }

    /// Immediate `is_a` parents of a term. Empty for unknown or root terms.
    pub fn parents(&self, name: &str) -> Vec<Term> {
        self.parents
            .get(name)
            .map(|list| list.iter().cloned().map(Term).collect())
            .unwrap_or_default()
    }

    /// Immediate children of a term. Empty for unknown or leaf terms.
    pub fn children(&self, name: &str) -> Vec<Term> {
        self.children
            .get(name)
            .map(|list| list.iter().cloned().map(Term).collect())
            .unwrap_or_default()
    }

    /// All transitive ancestors of a term, excluding the term itself.
    ///
    /// Breadth-first over the `is_a` edges; order is deterministic for a
    /// given graph. Empty for unknown terms.
    pub fn ancestors(&self, name: &str) -> Vec<Term> {
        self.closure(name, &self.parents)
    }

    /// All transitive descendants of a term, excluding the term itself.
    pub fn descendants(&self, name: &str) -> Vec<Term> {
        self.closure(name, &self.children)
    }

    fn closure(&self, name: &str, adjacency: &HashMap<Arc<str>, Vec<Arc<str>>>) -> Vec<Term> {
        if !self.contains(name) {
            return Vec::new();
        }
        let mut seen: HashSet<&str> = HashSet::new();
        let mut out = Vec::new();
        let mut queue: VecDeque<&Arc<str>> = VecDeque::new();
        if let Some(next) = adjacency.get(name) {
            queue.extend(next.iter());
        }
        seen.insert(name);
        while let Some(current) = queue.pop_front() {
            if !seen.insert(current) {
                continue;
            }
            out.push(Term(current.clone()));
            if let Some(next) = adjacency.get(current.as_ref()) {
                queue.extend(next.iter());
            }
        }
        out
    }

    /// Reflexive `is_a` test: is `name` the same term as `ancestor`, or a
    /// transitive descendant of it? `None` when either term is unknown.
    pub fn is_a(&self, name: &str, ancestor: &str) -> Option<bool> {
        if !self.contains(name) || !self.contains(ancestor) {
            return None;
        }
        if name == ancestor {
            return Some(true);
        }
        Some(self.ancestors(name).iter().any(|t| t.name() == ancestor))
    }

    /// Shortest undirected path length between two terms (0 for a term and
    /// itself). `None` when either term is unknown or no path exists.
    pub fn path_length(&self, a: &str, b: &str) -> Option<usize> {
        if !self.contains(a) || !self.contains(b) {
            return None;
        }
        if a == b {
            return Some(0);
        }
        let mut seen: HashSet<&str> = HashSet::new();
        let mut queue: VecDeque<(&str, usize)> = VecDeque::new();
        seen.insert(a);
        queue.push_back((a, 0));
        while let Some((current, dist)) = queue.pop_front() {
            let neighbors = self
                .parents
                .get(current)
                .into_iter()
                .chain(self.children.get(current))
                .flatten();
            for next in neighbors {
                if next.as_ref() == b {
                    return Some(dist + 1);
                }
                if seen.insert(next) {
                    queue.push_back((next, dist + 1));
                }
            }
        }
        None
    }

    /// Reduce a term set to its most specific members: a term is dropped
    /// when it is a strict ancestor of another term in the set. Incomparable
    /// terms (and terms unknown to the graph) are all retained. Input order
    /// is preserved.
    pub fn most_specific_terms(&self, terms: &[Term]) -> Vec<Term> {
        terms
            .iter()
            .filter(|candidate| {
                !terms.iter().any(|other| {
                    other.name() != candidate.name()
                        && self.is_a(other.name(), candidate.name()) == Some(true)
                })
            })
            .cloned()
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn arc(s: &str) -> Arc<str> {
        Arc::from(s)
    }

    //   sequence_variant
    //        |
    //   coding_variant
    //      /      \
    //  missense  synonymous
    fn diamond() -> Ontology {
        Ontology::from_parts(
            vec![
                (arc("SO:1"), arc("sequence_variant")),
                (arc("SO:2"), arc("coding_variant")),
                (arc("SO:3"), arc("missense_variant")),
                (arc("SO:4"), arc("synonymous_variant")),
            ],
            vec![
                (arc("coding_variant"), arc("sequence_variant")),
                (arc("missense_variant"), arc("coding_variant")),
                (arc("synonymous_variant"), arc("coding_variant")),
            ],
        )
    }

    #[test]
    fn ancestors_are_transitive() {
        let onto = diamond();
        let names: Vec<String> = onto
            .ancestors("missense_variant")
            .iter()
            .map(|t| t.name().to_owned())
            .collect();
        assert_eq!(names, ["coding_variant", "sequence_variant"]);
    }

    #[test]
    fn is_a_is_reflexive() {
        let onto = diamond();
        assert_eq!(onto.is_a("missense_variant", "missense_variant"), Some(true));
    }

    #[test]
    fn is_a_is_antisymmetric_for_distinct_terms() {
        let onto = diamond();
        assert_eq!(onto.is_a("missense_variant", "sequence_variant"), Some(true));
        assert_eq!(onto.is_a("sequence_variant", "missense_variant"), Some(false));
    }

    #[test]
    fn unknown_terms_yield_none() {
        let onto = diamond();
        assert_eq!(onto.is_a("nope", "sequence_variant"), None);
        assert_eq!(onto.path_length("nope", "sequence_variant"), None);
        assert!(onto.ancestors("nope").is_empty());
    }

    #[test]
    fn path_length_is_undirected() {
        let onto = diamond();
        // siblings connect through their shared parent
        assert_eq!(onto.path_length("missense_variant", "synonymous_variant"), Some(2));
        assert_eq!(onto.path_length("synonymous_variant", "missense_variant"), Some(2));
        assert_eq!(onto.path_length("missense_variant", "missense_variant"), Some(0));
    }

    #[test]
    fn path_length_none_when_disconnected() {
        let onto = Ontology::from_parts(
            vec![(arc("SO:1"), arc("a")), (arc("SO:2"), arc("b"))],
            vec![],
        );
        assert_eq!(onto.path_length("a", "b"), None);
    }

    #[test]
    fn most_specific_drops_strict_ancestors() {
        let onto = diamond();
        let set = vec![Term::new("missense_variant"), Term::new("coding_variant")];
        let reduced = onto.most_specific_terms(&set);
        assert_eq!(reduced, vec![Term::new("missense_variant")]);
    }

    #[test]
    fn most_specific_keeps_incomparable_terms() {
        let onto = diamond();
        let set = vec![
            Term::new("missense_variant"),
            Term::new("synonymous_variant"),
        ];
        assert_eq!(onto.most_specific_terms(&set), set);
    }

    #[test]
    fn id_name_lookups() {
        let onto = diamond();
        assert_eq!(onto.id_of("missense_variant").map(TermId::as_str), Some("SO:3"));
        assert_eq!(onto.name_of("SO:3").map(Term::name), Some("missense_variant"));
        assert!(onto.id_of("nope").is_none());
    }
}
