//! Transport-independent request handling
//!
//! Both transports call `handle_request`; the persistent one on a blocking
//! worker thread, the per-request one inside the CGI child.

use crate::router::{resolve, EnumerationRequest, Route};
use std::sync::Arc;
use survol_core::{Moniker, Result, SurvolError};
use survol_rdf::render::render_titled;
use survol_rdf::{build_graph, render_landing, Mode, Rendered};
use survol_sources::{enumerate_all, EnumerationContext, Registry, SourceSettings};
use tracing::{debug, error, info, warn};

/// Read-only state shared by every request.
#[derive(Debug, Clone)]
pub struct AgentState {
    pub registry: Registry,
    pub sources: Arc<SourceSettings>,
}

impl AgentState {
    pub fn new(sources: SourceSettings) -> Self {
        Self {
            registry: Registry::builtin(),
            sources: Arc::new(sources),
        }
    }

    fn context(&self) -> EnumerationContext {
        EnumerationContext::new(self.sources.clone())
    }
}

/// Status, content type and complete body of one response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AgentResponse {
    pub status: u16,
    pub content_type: String,
    pub body: Vec<u8>,
}

impl AgentResponse {
    pub fn ok(rendered: Rendered) -> Self {
        Self {
            status: 200,
            content_type: rendered.content_type.to_string(),
            body: rendered.body,
        }
    }

    /// Short plain-text error response.
    pub fn from_error(err: &SurvolError) -> Self {
        Self {
            status: err.status_code(),
            content_type: "text/plain; charset=utf-8".to_string(),
            body: format!("{}\n", err).into_bytes(),
        }
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

fn run_enumeration(state: &AgentState, request: EnumerationRequest) -> Result<Rendered> {
    let enumerator = state.registry.lookup(request.class.name)?;
    let ctx = state.context().with_params(request.params);
    let instances = enumerate_all(enumerator.as_ref(), &ctx)?;
    let graph = build_graph(instances)?;
    render_titled(&graph, request.mode, request.class.description)
}

fn run_lookup(state: &AgentState, moniker: &Moniker, mode: Mode) -> Result<Rendered> {
    let enumerator = state.registry.lookup(moniker.class())?;
    let instance = enumerator
        .lookup(&state.context(), moniker)?
        .ok_or_else(|| SurvolError::NotFound(moniker.to_string()))?;
    let graph = build_graph(vec![instance])?;
    render_titled(&graph, mode, &moniker.to_string())
}

fn run(state: &AgentState, path: &str, query: Option<&str>) -> Result<Rendered> {
    match resolve(&state.registry, path, query)? {
        Route::Landing { mode } => render_landing(&state.registry.classes(), mode),
        Route::Entity { moniker, mode } => run_lookup(state, &moniker, mode),
        Route::Enumerate(request) => run_enumeration(state, request),
    }
}

/// Route, enumerate, build and render one request. Never fails: errors
/// become their status code with a short text body.
pub fn handle_request(state: &AgentState, path: &str, query: Option<&str>) -> AgentResponse {
    debug!("Handling {} ?{}", path, query.unwrap_or(""));
    match run(state, path, query) {
        Ok(rendered) => {
            info!("{} -> 200 ({} bytes)", path, rendered.body.len());
            AgentResponse::ok(rendered)
        }
        Err(e) => {
            let response = AgentResponse::from_error(&e);
            if response.status >= 500 {
                error!("{} -> {}: {}", path, response.status, e);
            } else {
                warn!("{} -> {}: {}", path, response.status, e);
            }
            response
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn state() -> AgentState {
        AgentState::new(SourceSettings::default())
    }

    #[test]
    fn test_landing_page() {
        let response = handle_request(&state(), "/survol/entity.py", None);
        assert_eq!(response.status, 200);
        assert!(response.content_type.starts_with("text/html"));
        let html = String::from_utf8(response.body).unwrap();
        assert!(html.contains("enumerate_CIM_LogicalDisk.py"));
    }

    #[test]
    fn test_error_statuses() {
        let s = state();
        assert_eq!(handle_request(&s, "/nowhere", None).status, 404);
        assert_eq!(
            handle_request(&s, "/survol/sources_types/enumerate_NoSuchClass.py", Some("mode=rdf")).status,
            404
        );
        let bad = handle_request(&s, "/survol/sources_types/enumerate_CIM_Process.py", Some("mode=pdf"));
        assert_eq!(bad.status, 400);
        assert!(bad.content_type.starts_with("text/plain"));
    }

    #[test]
    fn test_enumeration_rdf() {
        let response = handle_request(
            &state(),
            "/survol/sources_types/enumerate_CIM_ComputerSystem.py",
            Some("mode=rdf"),
        );
        assert_eq!(response.status, 200);
        assert_eq!(response.content_type, "application/rdf+xml");
        let graph = survol_rdf::parse_rdf_xml(std::str::from_utf8(&response.body).unwrap()).unwrap();
        assert!(!graph.is_empty());
    }

    #[test]
    fn test_entity_lookup() {
        let s = state();
        let xid = survol_core::process_moniker(std::process::id()).to_string();
        let found = handle_request(&s, "/survol/entity.py", Some(&format!("xid={}&mode=json", xid)));
        assert_eq!(found.status, 200);

        let missing = handle_request(&s, "/survol/entity.py", Some("xid=CIM_Process.Handle=4294967295"));
        assert_eq!(missing.status, 404);

        let unknown = handle_request(&s, "/survol/entity.py", Some("xid=Nope.Id=1"));
        assert_eq!(unknown.status, 404);
    }
}
