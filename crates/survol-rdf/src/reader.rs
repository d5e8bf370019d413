//! RDF/XML back into a triple graph

use sophia::api::source::TripleSource;
use sophia::api::term::SimpleTerm;
use survol_core::{Result, SurvolError, Term, Triple, TripleGraph};

const RDF_LANG_STRING: &str = "http://www.w3.org/1999/02/22-rdf-syntax-ns#langString";

/// Subject or predicate position; blank nodes keep their `_:` label.
fn node(term: &SimpleTerm<'_>) -> Option<String> {
    match term {
        SimpleTerm::Iri(iri) => Some(iri.as_str().to_string()),
        SimpleTerm::BlankNode(id) => Some(format!("_:{}", id.as_str())),
        _ => None,
    }
}

fn object(term: &SimpleTerm<'_>) -> Option<Term> {
    match term {
        SimpleTerm::LiteralDatatype(lexical, datatype) => Some(Term::literal(&**lexical, datatype.as_str())),
        SimpleTerm::LiteralLanguage(lexical, _) => Some(Term::literal(&**lexical, RDF_LANG_STRING)),
        other => node(other).map(Term::iri),
    }
}

/// Parse an RDF/XML document, keeping document order.
pub fn parse_rdf_xml(text: &str) -> Result<TripleGraph> {
    let triples: Vec<[SimpleTerm<'static>; 3]> = sophia::xml::parser::parse_str(text)
        .collect_triples()
        .map_err(|e| SurvolError::SerializationFailure(format!("Invalid RDF/XML: {}", e)))?;

    let mut graph = TripleGraph::new();
    for [s, p, o] in &triples {
        match (node(s), node(p), object(o)) {
            (Some(s), Some(p), Some(o)) => {
                graph.insert(Triple::new(s, p, o));
            }
            _ => {
                return Err(SurvolError::SerializationFailure(
                    "RDF/XML contains a term kind survol does not model".to_string(),
                ))
            }
        }
    }
    Ok(graph)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builder::build_graph;
    use crate::render::{render, Mode};
    use chrono::{TimeZone, Utc};
    use proptest::prelude::*;
    use survol_core::namespace::{predicate_iri, XSD_DOUBLE, XSD_INTEGER};
    use survol_core::{EntityInstance, PropertyValue, CIM_COMPUTER_SYSTEM, CIM_PROCESS};

    fn round_trip(graph: &TripleGraph) -> TripleGraph {
        let body = render(graph, Mode::Rdf).unwrap().body;
        parse_rdf_xml(std::str::from_utf8(&body).unwrap()).unwrap()
    }

    #[test]
    fn test_typed_literals_survive() {
        let mut host = EntityInstance::new(&CIM_COMPUTER_SYSTEM, vec!["box".into()]).unwrap();
        host.set("TotalPhysicalMemory", u64::MAX);
        host.set("BootTime", Utc.with_ymd_and_hms(2024, 1, 2, 3, 4, 5).unwrap());
        host.set("OSName", "Linux & <friends>");
        let graph = build_graph(vec![host]).unwrap();

        let parsed = round_trip(&graph);
        assert!(graph.same_triples(&parsed));
    }

    #[test]
    fn test_rejects_garbage() {
        assert!(parse_rdf_xml("<not-rdf").is_err());
    }

    #[test]
    fn test_empty_graph() {
        let parsed = round_trip(&TripleGraph::new());
        assert!(parsed.is_empty());
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(64))]

        #[test]
        fn prop_numeric_literals_round_trip(pid in any::<i64>(), size in any::<u64>(), ratio in any::<f64>().prop_filter("finite", |f| f.is_finite())) {
            let mut p = EntityInstance::new(&CIM_PROCESS, vec![PropertyValue::Integer(pid)]).unwrap();
            p.set("WorkingSetSize", size);
            let mut graph = build_graph(vec![p.clone()]).unwrap();
            graph.insert(Triple::new(p.subject_uri(), predicate_iri("Ratio"), Term::literal(PropertyValue::Float(ratio).lexical_form(), XSD_DOUBLE)));

            let parsed = round_trip(&graph);
            prop_assert!(graph.same_triples(&parsed));

            let subject = p.subject_uri();
            let handle = parsed.objects(&subject, &predicate_iri("Handle"));
            let expected = Term::literal(pid.to_string(), XSD_INTEGER);
            prop_assert_eq!(handle, vec![&expected]);

            let ratio_back = parsed.objects(&subject, &predicate_iri("Ratio"))[0].value().parse::<f64>().unwrap();
            prop_assert_eq!(ratio_back.to_bits(), ratio.to_bits());
        }
    }
}
