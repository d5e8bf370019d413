//! Per-request triple graph with pattern indexing

use crate::namespace::{RDF_NS, SURVOL_NS, XSD_STRING};
use serde::{Deserialize, Serialize};
use smallvec::SmallVec;
use std::collections::{BTreeMap, HashMap, HashSet};
use std::fmt;

/// Object position of a triple.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum Term {
    Iri { value: String },
    Literal { lexical: String, datatype: String },
}

impl Term {
    pub fn iri(value: impl Into<String>) -> Self {
        Term::Iri { value: value.into() }
    }

    pub fn literal(lexical: impl Into<String>, datatype: impl Into<String>) -> Self {
        Term::Literal {
            lexical: lexical.into(),
            datatype: datatype.into(),
        }
    }

    pub fn string(lexical: impl Into<String>) -> Self {
        Self::literal(lexical, XSD_STRING)
    }

    pub fn as_iri(&self) -> Option<&str> {
        match self {
            Term::Iri { value } => Some(value),
            Term::Literal { .. } => None,
        }
    }

    /// IRI or lexical form.
    pub fn value(&self) -> &str {
        match self {
            Term::Iri { value } => value,
            Term::Literal { lexical, .. } => lexical,
        }
    }

    pub fn datatype(&self) -> Option<&str> {
        match self {
            Term::Iri { .. } => None,
            Term::Literal { datatype, .. } => Some(datatype),
        }
    }
}

impl fmt::Display for Term {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Term::Iri { value } => write!(f, "<{}>", value),
            Term::Literal { lexical, datatype } => write!(f, "{:?}^^<{}>", lexical, datatype),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Triple {
    pub subject: String,
    pub predicate: String,
    pub object: Term,
}

impl Triple {
    pub fn new(subject: impl Into<String>, predicate: impl Into<String>, object: Term) -> Self {
        Self {
            subject: subject.into(),
            predicate: predicate.into(),
            object,
        }
    }
}

impl fmt::Display for Triple {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "<{}> <{}> {} .", self.subject, self.predicate, self.object)
    }
}

/// Insertion-ordered set of triples, indexed by subject, predicate and object.
#[derive(Debug, Clone, Default)]
pub struct TripleGraph {
    triples: Vec<Triple>,
    seen: HashSet<Triple>,
    subject_index: HashMap<String, SmallVec<[usize; 8]>>,
    predicate_index: HashMap<String, SmallVec<[usize; 8]>>,
    object_index: HashMap<Term, SmallVec<[usize; 8]>>,
}

impl TripleGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a triple; returns false when it was already present.
    pub fn insert(&mut self, triple: Triple) -> bool {
        if self.seen.contains(&triple) {
            return false;
        }
        let index = self.triples.len();
        self.subject_index.entry(triple.subject.clone()).or_default().push(index);
        self.predicate_index.entry(triple.predicate.clone()).or_default().push(index);
        self.object_index.entry(triple.object.clone()).or_default().push(index);
        self.seen.insert(triple.clone());
        self.triples.push(triple);
        true
    }

    pub fn extend(&mut self, triples: impl IntoIterator<Item = Triple>) {
        for triple in triples {
            self.insert(triple);
        }
    }

    /// Fold another graph in, keeping this graph's triples first.
    pub fn merge(&mut self, other: &TripleGraph) {
        self.extend(other.triples.iter().cloned());
    }

    pub fn len(&self) -> usize {
        self.triples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.triples.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Triple> {
        self.triples.iter()
    }

    pub fn contains(&self, triple: &Triple) -> bool {
        self.seen.contains(triple)
    }

    /// Triples matching a pattern; `None` is a wildcard.
    pub fn find(&self, subject: Option<&str>, predicate: Option<&str>, object: Option<&Term>) -> Vec<&Triple> {
        let mut candidates: Option<SmallVec<[usize; 8]>> = None;

        let narrow = |current: Option<SmallVec<[usize; 8]>>, hits: &[usize]| -> SmallVec<[usize; 8]> {
            match current {
                None => hits.iter().copied().collect(),
                Some(prev) => intersect_sorted(&prev, hits),
            }
        };

        if let Some(s) = subject {
            let hits = self.subject_index.get(s).map(|v| v.as_slice()).unwrap_or(&[]);
            candidates = Some(narrow(candidates, hits));
        }
        if let Some(p) = predicate {
            let hits = self.predicate_index.get(p).map(|v| v.as_slice()).unwrap_or(&[]);
            candidates = Some(narrow(candidates, hits));
        }
        if let Some(o) = object {
            let hits = self.object_index.get(o).map(|v| v.as_slice()).unwrap_or(&[]);
            candidates = Some(narrow(candidates, hits));
        }

        match candidates {
            Some(indices) => indices.iter().filter_map(|&i| self.triples.get(i)).collect(),
            None => self.triples.iter().collect(),
        }
    }

    /// Objects of every `(subject, predicate, ?)` triple.
    pub fn objects(&self, subject: &str, predicate: &str) -> Vec<&Term> {
        self.find(Some(subject), Some(predicate), None)
            .into_iter()
            .map(|t| &t.object)
            .collect()
    }

    /// Distinct subjects in first-seen order.
    pub fn subjects(&self) -> Vec<&str> {
        let mut seen = HashSet::new();
        self.triples
            .iter()
            .filter(|t| seen.insert(t.subject.as_str()))
            .map(|t| t.subject.as_str())
            .collect()
    }

    /// Set equality, ignoring insertion order.
    pub fn same_triples(&self, other: &TripleGraph) -> bool {
        self.seen == other.seen
    }

    /// JSON-LD style export: one node per subject, predicates compacted
    /// against the `survol` and `rdf` prefixes.
    pub fn to_jsonld(&self) -> JsonLdDocument {
        let mut nodes: Vec<serde_json::Map<String, serde_json::Value>> = Vec::new();
        let mut positions: HashMap<&str, usize> = HashMap::new();

        for triple in &self.triples {
            let pos = *positions.entry(triple.subject.as_str()).or_insert_with(|| {
                let mut node = serde_json::Map::new();
                node.insert("@id".to_string(), serde_json::Value::String(triple.subject.clone()));
                nodes.push(node);
                nodes.len() - 1
            });

            let value = match &triple.object {
                Term::Iri { value } => serde_json::json!({ "@id": value }),
                Term::Literal { lexical, datatype } => {
                    serde_json::json!({ "@value": lexical, "@type": datatype })
                }
            };

            let key = compact_iri(&triple.predicate);
            let node = &mut nodes[pos];
            match node.get_mut(&key) {
                Some(serde_json::Value::Array(values)) => values.push(value),
                Some(existing) => {
                    let first = existing.take();
                    *existing = serde_json::Value::Array(vec![first, value]);
                }
                None => {
                    node.insert(key, value);
                }
            }
        }

        let mut context = BTreeMap::new();
        context.insert("survol".to_string(), SURVOL_NS.to_string());
        context.insert("rdf".to_string(), RDF_NS.to_string());

        JsonLdDocument {
            context,
            graph: nodes.into_iter().map(serde_json::Value::Object).collect(),
        }
    }
}

impl PartialEq for TripleGraph {
    fn eq(&self, other: &Self) -> bool {
        self.triples == other.triples
    }
}

impl FromIterator<Triple> for TripleGraph {
    fn from_iter<I: IntoIterator<Item = Triple>>(iter: I) -> Self {
        let mut graph = TripleGraph::new();
        graph.extend(iter);
        graph
    }
}

impl<'a> IntoIterator for &'a TripleGraph {
    type Item = &'a Triple;
    type IntoIter = std::slice::Iter<'a, Triple>;

    fn into_iter(self) -> Self::IntoIter {
        self.triples.iter()
    }
}

/// JSON-LD document with context
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JsonLdDocument {
    #[serde(rename = "@context")]
    pub context: BTreeMap<String, String>,
    #[serde(rename = "@graph")]
    pub graph: Vec<serde_json::Value>,
}

fn compact_iri(iri: &str) -> String {
    if iri == crate::namespace::RDF_TYPE {
        "@type".to_string()
    } else if let Some(local) = iri.strip_prefix(SURVOL_NS) {
        format!("survol:{}", local)
    } else if let Some(local) = iri.strip_prefix(RDF_NS) {
        format!("rdf:{}", local)
    } else {
        iri.to_string()
    }
}

fn intersect_sorted(a: &[usize], b: &[usize]) -> SmallVec<[usize; 8]> {
    let mut result = SmallVec::new();
    let (mut i, mut j) = (0, 0);
    while i < a.len() && j < b.len() {
        match a[i].cmp(&b[j]) {
            std::cmp::Ordering::Less => i += 1,
            std::cmp::Ordering::Greater => j += 1,
            std::cmp::Ordering::Equal => {
                result.push(a[i]);
                i += 1;
                j += 1;
            }
        }
    }
    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::namespace::{predicate_iri, RDF_TYPE, XSD_INTEGER};

    fn sample() -> TripleGraph {
        let s1 = "http://www.primhillcomputers.com/survol/entity.py?xid=CIM_Process.Handle=1";
        let s2 = "http://www.primhillcomputers.com/survol/entity.py?xid=CIM_Process.Handle=2";
        vec![
            Triple::new(s1, RDF_TYPE, Term::iri(format!("{}CIM_Process", SURVOL_NS))),
            Triple::new(s1, predicate_iri("Handle"), Term::literal("1", XSD_INTEGER)),
            Triple::new(s2, RDF_TYPE, Term::iri(format!("{}CIM_Process", SURVOL_NS))),
            Triple::new(s2, predicate_iri("Handle"), Term::literal("2", XSD_INTEGER)),
            Triple::new(s2, predicate_iri("parent"), Term::iri(s1)),
        ]
        .into_iter()
        .collect()
    }

    #[test]
    fn test_insert_deduplicates() {
        let mut graph = sample();
        let dup = graph.iter().next().cloned().unwrap();
        assert!(!graph.insert(dup));
        assert_eq!(graph.len(), 5);
    }

    #[test]
    fn test_find_patterns() {
        let graph = sample();
        assert_eq!(graph.find(None, Some(RDF_TYPE), None).len(), 2);
        assert_eq!(graph.find(None, None, None).len(), 5);

        let s1 = graph.subjects()[0].to_string();
        let children = graph.find(None, Some(&predicate_iri("parent")), Some(&Term::iri(&s1)));
        assert_eq!(children.len(), 1);
        assert_eq!(graph.objects(&s1, &predicate_iri("Handle")), vec![&Term::literal("1", XSD_INTEGER)]);
    }

    #[test]
    fn test_merge_and_set_equality() {
        let graph = sample();
        let mut reversed: TripleGraph = graph.iter().rev().cloned().collect();
        assert!(graph.same_triples(&reversed));
        assert_ne!(graph, reversed);

        let extra: TripleGraph =
            vec![Triple::new("http://x/s", predicate_iri("Name"), Term::string("x"))].into_iter().collect();
        reversed.merge(&extra);
        reversed.merge(&graph);
        assert_eq!(reversed.len(), 6);
        assert!(!graph.same_triples(&reversed));
    }

    #[test]
    fn test_jsonld_groups_by_subject() {
        let doc = sample().to_jsonld();
        assert_eq!(doc.graph.len(), 2);
        assert_eq!(doc.context["survol"], SURVOL_NS);
        assert_eq!(doc.graph[0]["survol:Handle"]["@value"], "1");
        assert_eq!(doc.graph[1]["survol:parent"]["@id"], doc.graph[0]["@id"]);
    }
}
