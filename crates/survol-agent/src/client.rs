//! HTTP client for a remote agent

use crate::router::{enumerate_path, ENTITY_SCRIPT, SCRIPT_PREFIX};
use reqwest::{Client, StatusCode};
use survol_core::{Moniker, Result, SurvolError, TripleGraph};
use survol_rdf::parse_rdf_xml;
use tracing::debug;

/// Fetches RDF from another agent and parses it into a `TripleGraph`.
#[derive(Debug, Clone)]
pub struct AgentClient {
    base_url: String,
    client: Client,
}

impl AgentClient {
    /// `base_url` is scheme and authority, e.g. `http://127.0.0.1:8000`.
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            client: Client::new(),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// All instances of `class`, with extra enumeration parameters.
    pub async fn enumerate(&self, class: &str, params: &[(&str, &str)]) -> Result<TripleGraph> {
        let url = format!("{}{}", self.base_url, enumerate_path(class));
        let mut query: Vec<(&str, &str)> = params.iter().copied().filter(|(name, _)| *name != "mode").collect();
        query.push(("mode", "rdf"));

        let request = self.client.get(&url).query(&query);
        self.fetch(&url, request).await
    }

    /// One entity by moniker.
    pub async fn entity(&self, moniker: &Moniker) -> Result<TripleGraph> {
        let url = format!(
            "{}{}{}?xid={}&mode=rdf",
            self.base_url, SCRIPT_PREFIX, ENTITY_SCRIPT, moniker
        );
        let request = self.client.get(&url);
        self.fetch(&url, request).await
    }

    async fn fetch(&self, url: &str, request: reqwest::RequestBuilder) -> Result<TripleGraph> {
        debug!("GET {}", url);
        let response = request
            .send()
            .await
            .map_err(|e| SurvolError::Gateway(format!("Request to {} failed: {}", url, e)))?;
        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| SurvolError::Gateway(format!("Reading {} failed: {}", url, e)))?;

        match status {
            StatusCode::OK => parse_rdf_xml(&body),
            StatusCode::NOT_FOUND => Err(SurvolError::NotFound(body.trim().to_string())),
            StatusCode::BAD_REQUEST => Err(SurvolError::BadRequest(body.trim().to_string())),
            other => Err(SurvolError::Gateway(format!("{} returned {}: {}", url, other, body.trim()))),
        }
    }
}
