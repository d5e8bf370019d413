//! Triple graph to response body

use crate::builder::class_graph;
use sophia::api::serializer::{Stringifier, TripleSerializer};
use sophia::api::term::SimpleTerm;
use sophia::api::MownStr;
use sophia::iri::IriRef;
use sophia::xml::serializer::RdfXmlSerializer;
use std::fmt::Write as _;
use survol_core::namespace::local_name;
use survol_core::{EntityClass, Result, SurvolError, Term, TripleGraph};
use tracing::debug;

pub const RDF_XML: &str = "application/rdf+xml";
pub const HTML: &str = "text/html; charset=utf-8";
pub const JSON: &str = "application/json";

/// Output format selected by the `mode` query argument.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Mode {
    Rdf,
    #[default]
    Html,
    Json,
}

impl Mode {
    pub fn parse(value: &str) -> Result<Self> {
        match value {
            "rdf" => Ok(Mode::Rdf),
            "html" => Ok(Mode::Html),
            "json" => Ok(Mode::Json),
            other => Err(SurvolError::BadRequest(format!("Unknown mode: {}", other))),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Mode::Rdf => "rdf",
            Mode::Html => "html",
            Mode::Json => "json",
        }
    }

    pub fn content_type(&self) -> &'static str {
        match self {
            Mode::Rdf => RDF_XML,
            Mode::Html => HTML,
            Mode::Json => JSON,
        }
    }
}

/// A complete response body; never partial.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Rendered {
    pub content_type: &'static str,
    pub body: Vec<u8>,
}

pub fn render(graph: &TripleGraph, mode: Mode) -> Result<Rendered> {
    render_titled(graph, mode, "Survol")
}

/// Render with a page title; only the HTML view shows it.
pub fn render_titled(graph: &TripleGraph, mode: Mode, title: &str) -> Result<Rendered> {
    let body = match mode {
        Mode::Rdf => to_rdf_xml(graph)?.into_bytes(),
        Mode::Html => to_html(graph, title).into_bytes(),
        Mode::Json => serde_json::to_vec_pretty(&graph.to_jsonld())
            .map_err(|e| SurvolError::SerializationFailure(e.to_string()))?,
    };
    debug!("Rendered {} triples as {} ({} bytes)", graph.len(), mode.as_str(), body.len());
    Ok(Rendered {
        content_type: mode.content_type(),
        body,
    })
}

/// Landing page: the list of enumeration scripts, or the served classes as
/// `rdfs:Class` resources for the machine-readable modes.
pub fn render_landing(classes: &[&EntityClass], mode: Mode) -> Result<Rendered> {
    if mode != Mode::Html {
        return render(&class_graph(classes), mode);
    }

    let mut page = page_header("Survol agent");
    page.push_str("<ul>\n");
    for class in classes {
        let _ = writeln!(
            page,
            "<li><a href=\"{path}\">{name}</a> {desc} (<a href=\"{path}?mode=rdf\">rdf</a>)</li>",
            path = escape_html(&class.script_path()),
            name = escape_html(class.name),
            desc = escape_html(class.description),
        );
    }
    page.push_str("</ul>\n</body>\n</html>\n");

    Ok(Rendered {
        content_type: HTML,
        body: page.into_bytes(),
    })
}

fn sophia_iri(value: &str) -> Result<SimpleTerm<'_>> {
    IriRef::new(MownStr::from(value))
        .map(SimpleTerm::Iri)
        .map_err(|e| SurvolError::SerializationFailure(format!("Invalid IRI {}: {}", value, e)))
}

fn sophia_term(term: &Term) -> Result<SimpleTerm<'_>> {
    match term {
        Term::Iri { value } => sophia_iri(value),
        Term::Literal { lexical, datatype } => {
            let datatype = IriRef::new(MownStr::from(datatype.as_str()))
                .map_err(|e| SurvolError::SerializationFailure(format!("Invalid datatype {}: {}", datatype, e)))?;
            Ok(SimpleTerm::LiteralDatatype(MownStr::from(lexical.as_str()), datatype))
        }
    }
}

/// RDF/XML carrying exactly the graph's triples, in graph order.
pub fn to_rdf_xml(graph: &TripleGraph) -> Result<String> {
    let triples = graph
        .iter()
        .map(|t| Ok([sophia_iri(&t.subject)?, sophia_iri(&t.predicate)?, sophia_term(&t.object)?]))
        .collect::<Result<Vec<[SimpleTerm<'_>; 3]>>>()?;

    let mut serializer = RdfXmlSerializer::new_stringifier();
    serializer
        .serialize_graph(&triples)
        .map_err(|e| SurvolError::SerializationFailure(e.to_string()))?;
    Ok(serializer.as_str().to_string())
}

fn escape_html(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            c => out.push(c),
        }
    }
    out
}

fn page_header(title: &str) -> String {
    format!(
        "<!DOCTYPE html>\n<html>\n<head><meta charset=\"utf-8\"><title>{0}</title></head>\n<body>\n<h1>{0}</h1>\n",
        escape_html(title)
    )
}

fn short_name(iri: &str) -> &str {
    local_name(iri)
        .or_else(|| iri.rsplit_once('#').map(|(_, local)| local))
        .unwrap_or(iri)
}

/// One table per subject, rows in graph order.
fn to_html(graph: &TripleGraph, title: &str) -> String {
    let mut page = page_header(title);

    for subject in graph.subjects() {
        let _ = writeln!(page, "<h2><a href=\"{0}\">{0}</a></h2>", escape_html(subject));
        page.push_str("<table>\n");
        for triple in graph.find(Some(subject), None, None) {
            let value = match &triple.object {
                Term::Iri { value } => format!("<a href=\"{0}\">{0}</a>", escape_html(value)),
                Term::Literal { lexical, .. } => escape_html(lexical),
            };
            let _ = writeln!(
                page,
                "<tr><th>{}</th><td>{}</td></tr>",
                escape_html(short_name(&triple.predicate)),
                value
            );
        }
        page.push_str("</table>\n");
    }

    page.push_str("</body>\n</html>\n");
    page
}
