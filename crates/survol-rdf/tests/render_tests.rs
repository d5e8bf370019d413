//! Live enumerations through the builder, renderer and reader

use survol_core::namespace::{predicate_iri, RDF_TYPE, XSD_INTEGER};
use survol_core::{process_moniker, EntityInstance, Term, CIM_LOGICAL_DISK};
use survol_rdf::{build_graph, parse_rdf_xml, render, Mode};
use survol_sources::{enumerate_all, EnumerationContext, Registry};

fn live_graph(class: &str) -> survol_core::TripleGraph {
    let registry = Registry::builtin();
    let enumerator = registry.lookup(class).unwrap();
    let instances = enumerate_all(enumerator.as_ref(), &EnumerationContext::default()).unwrap();
    build_graph(instances).unwrap()
}

#[test]
fn test_process_rdf_parses_and_lists_self() {
    let graph = live_graph("CIM_Process");
    let rendered = render(&graph, Mode::Rdf).unwrap();
    let parsed = parse_rdf_xml(std::str::from_utf8(&rendered.body).unwrap()).unwrap();

    assert!(!parsed.is_empty());
    let me = process_moniker(std::process::id()).subject_uri();
    assert_eq!(
        parsed.objects(&me, &predicate_iri("Handle")),
        vec![&Term::literal(std::process::id().to_string(), XSD_INTEGER)]
    );
}

#[test]
fn test_every_builtin_class_renders() {
    let registry = Registry::builtin();
    for class in registry.classes() {
        let graph = live_graph(class.name);
        for mode in [Mode::Rdf, Mode::Html, Mode::Json] {
            let rendered = render(&graph, mode).unwrap();
            assert!(!rendered.body.is_empty(), "{} in {:?}", class.name, mode);
        }
    }
}

#[test]
fn test_class_assertions_match_instances() {
    let graph = live_graph("CIM_ComputerSystem");
    let typed = graph.find(None, Some(RDF_TYPE), None);
    assert_eq!(typed.len(), 1);
    assert_eq!(
        typed[0].object,
        Term::iri("http://www.primhillcomputers.com/survol#CIM_ComputerSystem")
    );
}

#[test]
fn test_disk_without_file_system_has_no_triple() {
    let mut disk = EntityInstance::new(&CIM_LOGICAL_DISK, vec!["tmpfs".into()]).unwrap();
    disk.set("Name", "/run");
    disk.omit("file_system");

    let graph = build_graph(vec![disk]).unwrap();
    let body = render(&graph, Mode::Rdf).unwrap().body;
    let parsed = parse_rdf_xml(std::str::from_utf8(&body).unwrap()).unwrap();
    assert!(parsed.find(None, Some(&predicate_iri("file_system")), None).is_empty());
    assert_eq!(parsed.len(), 3);
}

#[test]
fn test_identical_state_renders_identically() {
    let graph = live_graph("group");
    let a = render(&graph, Mode::Rdf).unwrap();
    let b = render(&live_graph("group"), Mode::Rdf).unwrap();
    assert_eq!(a, b);
}
