//! HTTP routes and handlers

use crate::cgi::CgiGateway;
use crate::config::Transport;
use crate::pipeline::{handle_request, AgentResponse, AgentState};
use axum::{
    extract::Extension,
    http::{header, StatusCode, Uri},
    response::{IntoResponse, Response},
    routing::get,
    Router,
};
use std::sync::Arc;
use survol_core::SurvolError;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::error;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub agent: Arc<AgentState>,
    pub transport: Transport,
    /// Present when `transport` is `PerRequest`.
    pub cgi: Option<CgiGateway>,
}

impl IntoResponse for AgentResponse {
    fn into_response(self) -> Response {
        let status = StatusCode::from_u16(self.status).unwrap_or(StatusCode::BAD_GATEWAY);
        (status, [(header::CONTENT_TYPE, self.content_type)], self.body).into_response()
    }
}

/// Every `/survol/...` script.
pub async fn handle_script(Extension(state): Extension<Arc<AppState>>, uri: Uri) -> AgentResponse {
    let path = uri.path().to_string();
    let query = uri.query().map(str::to_string);

    match (&state.transport, &state.cgi) {
        (Transport::PerRequest, Some(gateway)) => gateway
            .forward(&path, query.as_deref())
            .await
            .unwrap_or_else(|e| {
                error!("CGI request {} failed: {}", path, e);
                AgentResponse::from_error(&e)
            }),
        _ => {
            let agent = state.agent.clone();
            tokio::task::spawn_blocking(move || handle_request(&agent, &path, query.as_deref()))
                .await
                .unwrap_or_else(|e| {
                    AgentResponse::from_error(&SurvolError::Server(format!("request worker failed: {}", e)))
                })
        }
    }
}

pub async fn not_found(uri: Uri) -> AgentResponse {
    AgentResponse::from_error(&SurvolError::NotFound(uri.path().to_string()))
}

/// Create the agent router
pub fn create_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/survol/*script", get(handle_script))
        .fallback(not_found)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .layer(Extension(state))
}
