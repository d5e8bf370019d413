//! # Survol Agent
//!
//! Serves the entity sources as RDF/XML, HTML or JSON over two transports:
//! a persistent axum server and a per-request CGI child per request.
//!
//! ```no_run
//! use survol_agent::{start, AgentConfig};
//!
//! # async fn run() -> survol_core::Result<()> {
//! let config = AgentConfig { port: 0, foreground: false, ..AgentConfig::default() };
//! if let Some(handle) = start(config).await? {
//!     println!("{}", handle.base_url());
//!     handle.shutdown().await?;
//! }
//! # Ok(())
//! # }
//! ```

pub mod cgi;
pub mod client;
pub mod commands;
pub mod config;
pub mod pipeline;
pub mod router;
pub mod routes;
pub mod server;

pub use client::AgentClient;
pub use config::{AgentConfig, Transport};
pub use pipeline::{handle_request, AgentResponse, AgentState};
pub use routes::{create_router, AppState};
pub use server::{start, AgentHandle};
