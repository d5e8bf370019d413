//! Survol agent entry point

use anyhow::Result;
use clap::Parser;
use survol_agent::commands::{Cli, CommandExecutor};
use tracing::error;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    // stdout carries CGI responses and command output, so logs go to stderr
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let mut executor = CommandExecutor::new();
    let result = match executor.execute(cli.command).await {
        Ok(result) => result,
        Err(e) => {
            error!("{:#}", e);
            std::process::exit(1);
        }
    };

    if result.success {
        std::process::exit(0);
    } else {
        error!("{}", result.message);
        std::process::exit(1);
    }
}
