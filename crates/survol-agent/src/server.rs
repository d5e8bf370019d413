//! Agent startup, background handle and shutdown

use crate::cgi::CgiGateway;
use crate::config::{AgentConfig, Transport};
use crate::pipeline::AgentState;
use crate::routes::{create_router, AppState};
use std::net::SocketAddr;
use std::sync::Arc;
use survol_core::{Result, SurvolError};
use tokio::net::TcpListener;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tracing::{error, info};

/// A running background agent.
pub struct AgentHandle {
    local_addr: SocketAddr,
    shutdown: oneshot::Sender<()>,
    task: JoinHandle<std::io::Result<()>>,
}

impl AgentHandle {
    /// Address the listener is bound to.
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// Base URL, e.g. `http://127.0.0.1:8000`.
    pub fn base_url(&self) -> String {
        format!("http://{}", self.local_addr)
    }

    /// Stop accepting connections and wait for in-flight requests.
    pub async fn shutdown(self) -> Result<()> {
        let _ = self.shutdown.send(());
        match self.task.await {
            Ok(Ok(())) => Ok(()),
            Ok(Err(e)) => Err(SurvolError::Server(e.to_string())),
            Err(e) => Err(SurvolError::Server(format!("server task failed: {}", e))),
        }
    }
}

/// Bind the listener and build the router. Fails before anything is served.
async fn prepare(config: &AgentConfig) -> Result<(TcpListener, axum::Router, SocketAddr)> {
    if !config.scripts_root.is_dir() {
        return Err(SurvolError::TransportStartupFailure(format!(
            "Scripts directory {} does not exist",
            config.scripts_root.display()
        )));
    }

    let listener = TcpListener::bind((config.host.as_str(), config.port))
        .await
        .map_err(|e| {
            SurvolError::TransportStartupFailure(format!("Cannot bind {}:{}: {}", config.host, config.port, e))
        })?;
    let local_addr = listener
        .local_addr()
        .map_err(|e| SurvolError::TransportStartupFailure(e.to_string()))?;

    let cgi = match config.transport {
        Transport::PerRequest => Some(CgiGateway::new(config, local_addr)?),
        Transport::Persistent => None,
    };
    let state = AppState {
        agent: Arc::new(AgentState::new(config.sources.clone())),
        transport: config.transport,
        cgi,
    };

    Ok((listener, create_router(Arc::new(state)), local_addr))
}

/// Start an agent. The listener is bound before this returns.
///
/// In foreground mode this serves until SIGINT or SIGTERM and returns
/// `None`; otherwise it returns a handle to the background server.
pub async fn start(config: AgentConfig) -> Result<Option<AgentHandle>> {
    let (listener, app, local_addr) = prepare(&config).await?;
    info!(
        "Survol agent ({} transport) listening on {}, scripts in {}",
        config.transport.as_str(),
        local_addr,
        config.scripts_root.display()
    );

    if config.foreground {
        axum::serve(listener, app)
            .with_graceful_shutdown(shutdown_signal())
            .await
            .map_err(|e| {
                error!("Server error: {}", e);
                SurvolError::Server(e.to_string())
            })?;
        return Ok(None);
    }

    let (tx, rx) = oneshot::channel::<()>();
    let task = tokio::spawn(async move {
        axum::serve(listener, app)
            .with_graceful_shutdown(async {
                let _ = rx.await;
            })
            .await
    });

    Ok(Some(AgentHandle {
        local_addr,
        shutdown: tx,
        task,
    }))
}

/// Resolves on Ctrl+C or SIGTERM.
pub async fn shutdown_signal() {
    use tokio::signal;

    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!("Cannot listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                error!("Cannot listen for SIGTERM: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    info!("Shutdown signal received, starting graceful shutdown...");
}
