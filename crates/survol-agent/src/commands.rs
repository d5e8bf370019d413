//! CLI command definitions and handlers

use crate::cgi::{run_cgi, write_cgi_response, CgiRequest};
use crate::config::{AgentConfig, Transport};
use crate::pipeline::{handle_request, AgentState};
use crate::router::enumerate_path;
use crate::server::{shutdown_signal, start};
use anyhow::Result;
use clap::{Parser, Subcommand};
use std::io::Write;
use std::path::PathBuf;
use survol_rdf::Mode;
use survol_sources::{Registry, SourceSettings};

/// Main CLI structure
#[derive(Parser, Debug)]
#[command(name = "survol-agent")]
#[command(about = "Serve live operating-system entities as RDF")]
#[command(version = env!("CARGO_PKG_VERSION"))]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

/// Available CLI commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Start the agent
    Serve {
        /// Request transport
        #[arg(short, long, value_enum, default_value = "wsgi")]
        transport: Transport,

        /// Host to bind to
        #[arg(long, env = "SURVOL_HOST", default_value = "127.0.0.1")]
        host: String,

        /// Port to bind to, 0 for any free port
        #[arg(short, long, env = "SURVOL_PORT", default_value = "8000")]
        port: u16,

        /// Directory the agent serves scripts from
        #[arg(long, env = "SURVOL_SCRIPTS_DIR", default_value = ".")]
        scripts_dir: PathBuf,

        /// Print the bound address and keep serving in a background task
        #[arg(long)]
        background: bool,

        /// Python interpreter whose packages are reported
        #[arg(long, env = "SURVOL_PYTHON", default_value = "python3")]
        python: PathBuf,

        /// Seconds a CGI child may run before the request fails with 502
        #[arg(long, env = "SURVOL_CGI_TIMEOUT", default_value = "60")]
        cgi_timeout: u64,
    },

    /// Answer one CGI request described by the environment
    Cgi {
        #[arg(long, env = "SURVOL_PYTHON", default_value = "python3")]
        python: PathBuf,
    },

    /// Enumerate one class locally and print the result
    Enumerate {
        /// Entity class name, e.g. CIM_Process
        class: String,

        /// Output mode: rdf, html or json
        #[arg(short, long, default_value = "rdf")]
        mode: String,

        /// Extra query string, e.g. "parent=1"
        #[arg(short, long)]
        query: Option<String>,

        #[arg(long, env = "SURVOL_PYTHON", default_value = "python3")]
        python: PathBuf,
    },

    /// List registered entity classes
    Classes,
}

/// Command execution result
#[derive(Debug)]
pub struct CommandResult {
    pub success: bool,
    pub message: String,
    pub data: Option<serde_json::Value>,
}

/// Execute CLI commands
#[derive(Debug, Default)]
pub struct CommandExecutor;

impl CommandExecutor {
    pub fn new() -> Self {
        Self
    }

    /// Execute a CLI command
    pub async fn execute(&mut self, command: Commands) -> Result<CommandResult> {
        match command {
            Commands::Serve {
                transport,
                host,
                port,
                scripts_dir,
                background,
                python,
                cgi_timeout,
            } => {
                let config = AgentConfig {
                    host,
                    port,
                    scripts_root: scripts_dir,
                    transport,
                    foreground: !background,
                    cgi_program: None,
                    cgi_timeout_secs: cgi_timeout,
                    sources: SourceSettings::with_python(python),
                };
                self.execute_serve(config).await
            }
            Commands::Cgi { python } => self.execute_cgi(python).await,
            Commands::Enumerate {
                class,
                mode,
                query,
                python,
            } => self.execute_enumerate(class, mode, query, python).await,
            Commands::Classes => self.execute_classes(),
        }
    }

    async fn execute_serve(&self, config: AgentConfig) -> Result<CommandResult> {
        let settings = serde_json::to_value(&config)?;
        let Some(handle) = start(config).await? else {
            return Ok(CommandResult {
                success: true,
                message: "Agent stopped".to_string(),
                data: Some(settings),
            });
        };

        println!("{}", handle.base_url());
        println!("Press Ctrl+C to stop");
        shutdown_signal().await;
        let addr = handle.local_addr();
        handle.shutdown().await?;

        Ok(CommandResult {
            success: true,
            message: "Agent stopped".to_string(),
            data: Some(serde_json::json!({ "address": addr.to_string(), "config": settings })),
        })
    }

    async fn execute_cgi(&self, python: PathBuf) -> Result<CommandResult> {
        let request = CgiRequest::from_env()?;
        let state = AgentState::new(SourceSettings::with_python(python));
        let response = tokio::task::spawn_blocking(move || run_cgi(&state, &request)).await?;

        let stdout = std::io::stdout();
        let mut out = stdout.lock();
        write_cgi_response(&response, &mut out)?;

        Ok(CommandResult {
            success: true,
            message: format!("CGI response {}", response.status),
            data: None,
        })
    }

    async fn execute_enumerate(
        &self,
        class: String,
        mode: String,
        query: Option<String>,
        python: PathBuf,
    ) -> Result<CommandResult> {
        let mode = Mode::parse(&mode)?;
        let query = match query.filter(|q| !q.is_empty()) {
            Some(q) => format!("{}&mode={}", q, mode.as_str()),
            None => format!("mode={}", mode.as_str()),
        };
        let state = AgentState::new(SourceSettings::with_python(python));
        let path = enumerate_path(&class);
        let response = tokio::task::spawn_blocking(move || handle_request(&state, &path, Some(&query))).await?;

        if response.is_success() {
            let mut out = std::io::stdout().lock();
            out.write_all(&response.body)?;
            out.flush()?;
        } else {
            eprint!("{}", String::from_utf8_lossy(&response.body));
        }

        Ok(CommandResult {
            success: response.is_success(),
            message: format!("{} returned {}", class, response.status),
            data: None,
        })
    }

    fn execute_classes(&self) -> Result<CommandResult> {
        let registry = Registry::builtin();
        let classes = registry.classes();
        for class in &classes {
            println!("{:<22} {}", class.name, class.description);
            println!("{:<22} keys: {}", "", class.keys.join(", "));
        }

        let data = classes
            .iter()
            .map(|class| serde_json::json!({ "name": class.name, "schema": class.schema() }))
            .collect::<Vec<_>>();
        Ok(CommandResult {
            success: true,
            message: format!("{} classes", classes.len()),
            data: Some(serde_json::Value::Array(data)),
        })
    }
}
