//! Fixed IRIs used when turning entities into triples

/// Namespace of every survol predicate and class IRI.
pub const SURVOL_NS: &str = "http://www.primhillcomputers.com/survol#";

/// Prefix of every entity subject IRI; the moniker text follows it.
pub const ENTITY_BASE: &str = "http://www.primhillcomputers.com/survol/entity.py?xid=";

pub const RDF_NS: &str = "http://www.w3.org/1999/02/22-rdf-syntax-ns#";
pub const RDF_TYPE: &str = "http://www.w3.org/1999/02/22-rdf-syntax-ns#type";
pub const RDFS_CLASS: &str = "http://www.w3.org/2000/01/rdf-schema#Class";
pub const RDFS_COMMENT: &str = "http://www.w3.org/2000/01/rdf-schema#comment";

pub const XSD_STRING: &str = "http://www.w3.org/2001/XMLSchema#string";
pub const XSD_INTEGER: &str = "http://www.w3.org/2001/XMLSchema#integer";
pub const XSD_DOUBLE: &str = "http://www.w3.org/2001/XMLSchema#double";
pub const XSD_BOOLEAN: &str = "http://www.w3.org/2001/XMLSchema#boolean";
pub const XSD_DATE_TIME: &str = "http://www.w3.org/2001/XMLSchema#dateTime";

/// IRI of the predicate carrying property `name`.
pub fn predicate_iri(name: &str) -> String {
    format!("{}{}", SURVOL_NS, name)
}

/// IRI of the class named `name`, object of the class assertion.
pub fn class_iri(name: &str) -> String {
    format!("{}{}", SURVOL_NS, name)
}

/// Local name of a survol IRI, if it lives in the survol namespace.
pub fn local_name(iri: &str) -> Option<&str> {
    iri.strip_prefix(SURVOL_NS)
}
