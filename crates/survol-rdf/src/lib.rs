//! # Survol RDF
//!
//! Turns entity instances into triples and triple graphs into response
//! bodies: RDF/XML through sophia, an HTML table view and JSON-LD. The
//! reader parses RDF/XML back into a `TripleGraph`.

pub mod builder;
pub mod reader;
pub mod render;

pub use builder::{build_graph, class_graph, instance_triples};
pub use reader::parse_rdf_xml;
pub use render::{render, render_landing, Mode, Rendered};
