//! Entity instance to triples

use survol_core::namespace::{class_iri, predicate_iri, RDFS_CLASS, RDFS_COMMENT, RDF_TYPE};
use survol_core::{EntityClass, EntityInstance, PropertyValue, Result, SurvolError, Term, Triple, TripleGraph};

/// Characters XML 1.0 allows in text content.
fn is_xml_char(c: char) -> bool {
    matches!(c,
        '\u{9}' | '\u{A}' | '\u{D}'
        | '\u{20}'..='\u{D7FF}'
        | '\u{E000}'..='\u{FFFD}'
        | '\u{10000}'..='\u{10FFFF}')
}

/// Whether `name` can be the local part of an XML element name.
pub fn is_ncname(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '-' | '.'))
}

fn check_text(instance: &EntityInstance, property: &str, text: &str) -> Result<()> {
    match text.chars().find(|c| !is_xml_char(*c)) {
        Some(bad) => Err(SurvolError::SerializationFailure(format!(
            "{}.{} of {} contains U+{:04X}, which XML cannot carry",
            instance.class().name,
            property,
            instance.moniker(),
            bad as u32
        ))),
        None => Ok(()),
    }
}

/// Triples of one instance: the class assertion, then one triple per
/// present property in declared order.
pub fn instance_triples(instance: &EntityInstance) -> Result<Vec<Triple>> {
    let subject = instance.subject_uri();
    let mut triples = Vec::with_capacity(instance.class().properties.len() + 1);

    triples.push(Triple::new(
        subject.clone(),
        RDF_TYPE,
        Term::iri(class_iri(instance.class().name)),
    ));

    for (name, value) in instance.properties() {
        if !is_ncname(name) {
            return Err(SurvolError::SerializationFailure(format!(
                "Property name {:?} of {} is not a valid XML name",
                name,
                instance.class().name
            )));
        }

        let object = match value {
            PropertyValue::Reference(target) => Term::iri(target.subject_uri()),
            literal => {
                let lexical = literal.lexical_form();
                check_text(instance, name, &lexical)?;
                // Every non-reference value carries a datatype.
                let datatype = literal.datatype().unwrap_or(survol_core::namespace::XSD_STRING);
                Term::literal(lexical, datatype)
            }
        };
        triples.push(Triple::new(subject.clone(), predicate_iri(name), object));
    }

    Ok(triples)
}

/// Graph of a whole enumeration. Instances are ordered by subject IRI so
/// identical state always yields identical output.
pub fn build_graph(mut instances: Vec<EntityInstance>) -> Result<TripleGraph> {
    instances.sort_by_cached_key(|i| i.subject_uri());
    let mut graph = TripleGraph::new();
    for instance in &instances {
        graph.extend(instance_triples(instance)?);
    }
    Ok(graph)
}

/// Graph describing the served classes, one `rdfs:Class` each.
pub fn class_graph(classes: &[&EntityClass]) -> TripleGraph {
    let mut graph = TripleGraph::new();
    for class in classes {
        let subject = class_iri(class.name);
        graph.insert(Triple::new(subject.clone(), RDF_TYPE, Term::iri(RDFS_CLASS)));
        graph.insert(Triple::new(subject, RDFS_COMMENT, Term::string(class.description)));
    }
    graph
}
