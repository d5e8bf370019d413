//! Agent startup configuration

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use survol_sources::SourceSettings;

/// How requests reach the enumeration pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum)]
pub enum Transport {
    /// One child process per request, CGI/1.1 environment contract.
    #[value(name = "cgi")]
    #[serde(rename = "cgi")]
    PerRequest,
    /// One long-lived process handling requests concurrently.
    #[default]
    #[value(name = "wsgi")]
    #[serde(rename = "wsgi")]
    Persistent,
}

impl Transport {
    pub fn as_str(&self) -> &'static str {
        match self {
            Transport::PerRequest => "cgi",
            Transport::Persistent => "wsgi",
        }
    }
}

/// Agent configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AgentConfig {
    pub host: String,
    /// 0 picks a free port; the bound address is reported by the handle.
    pub port: u16,
    /// Working directory of CGI children; must exist.
    pub scripts_root: PathBuf,
    pub transport: Transport,
    /// Serve until SIGINT/SIGTERM instead of returning a handle.
    pub foreground: bool,
    /// Executable run per request by the CGI transport; defaults to the
    /// current executable.
    pub cgi_program: Option<PathBuf>,
    /// Seconds a CGI child may run before it is killed and answered with 502.
    pub cgi_timeout_secs: u64,
    pub sources: SourceSettings,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 8000,
            scripts_root: PathBuf::from("."),
            transport: Transport::default(),
            foreground: true,
            cgi_program: None,
            cgi_timeout_secs: 60,
            sources: SourceSettings::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_config_from_json() {
        let config: AgentConfig = serde_json::from_str(r#"{"port": 9000, "transport": "cgi"}"#).unwrap();
        assert_eq!(config.port, 9000);
        assert_eq!(config.transport, Transport::PerRequest);
        assert_eq!(config.host, "127.0.0.1");
        assert!(config.foreground);
    }
}
