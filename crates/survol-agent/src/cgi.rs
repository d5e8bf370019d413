//! Per-request transport: one child process per HTTP request
//!
//! The parent passes the request through CGI/1.1 meta-variables and reads
//! a CGI response (`Status:` and `Content-Type:` headers, blank line, body)
//! from the child's stdout.

use crate::config::AgentConfig;
use crate::pipeline::{handle_request, AgentResponse, AgentState};
use std::io::Write;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::process::Stdio;
use std::time::Duration;
use survol_core::{Result, SurvolError};
use tokio::process::Command;
use tracing::{debug, warn};

pub const GATEWAY_INTERFACE: &str = "CGI/1.1";

/// Request as seen by a CGI script.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct CgiRequest {
    pub method: String,
    pub script_name: String,
    pub path_info: String,
    pub query_string: String,
}

impl CgiRequest {
    /// Read the meta-variables through `var`, usually `std::env::var`.
    pub fn from_vars<F>(var: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let method = var("REQUEST_METHOD")
            .ok_or_else(|| SurvolError::BadRequest("REQUEST_METHOD is not set; not running under CGI".to_string()))?;
        Ok(Self {
            method,
            script_name: var("SCRIPT_NAME").unwrap_or_default(),
            path_info: var("PATH_INFO").unwrap_or_default(),
            query_string: var("QUERY_STRING").unwrap_or_default(),
        })
    }

    pub fn from_env() -> Result<Self> {
        Self::from_vars(|name| std::env::var(name).ok())
    }

    pub fn path(&self) -> String {
        format!("{}{}", self.script_name, self.path_info)
    }

    pub fn query(&self) -> Option<&str> {
        (!self.query_string.is_empty()).then_some(self.query_string.as_str())
    }
}

/// Child side: answer one request.
pub fn run_cgi(state: &AgentState, request: &CgiRequest) -> AgentResponse {
    if request.method != "GET" && request.method != "HEAD" {
        return AgentResponse {
            status: 405,
            content_type: "text/plain; charset=utf-8".to_string(),
            body: format!("Method {} not allowed\n", request.method).into_bytes(),
        };
    }
    handle_request(state, &request.path(), request.query())
}

fn reason_phrase(status: u16) -> &'static str {
    match status {
        200 => "OK",
        400 => "Bad Request",
        404 => "Not Found",
        405 => "Method Not Allowed",
        500 => "Internal Server Error",
        502 => "Bad Gateway",
        _ => "Unknown",
    }
}

pub fn write_cgi_response(response: &AgentResponse, out: &mut impl Write) -> std::io::Result<()> {
    write!(out, "Status: {} {}\r\n", response.status, reason_phrase(response.status))?;
    write!(out, "Content-Type: {}\r\n", response.content_type)?;
    write!(out, "Content-Length: {}\r\n\r\n", response.body.len())?;
    out.write_all(&response.body)?;
    out.flush()
}

/// Parse what a CGI child wrote to stdout.
pub fn parse_cgi_response(output: &[u8]) -> Result<AgentResponse> {
    let bad = |why: &str| SurvolError::Gateway(format!("Malformed CGI response: {}", why));

    let (head_len, sep_len) = find_header_end(output).ok_or_else(|| bad("no blank line after headers"))?;
    let head = std::str::from_utf8(&output[..head_len]).map_err(|_| bad("headers are not UTF-8"))?;

    let mut status = 200;
    let mut content_type = None;
    for line in head.lines().map(|l| l.trim_end_matches('\r')).filter(|l| !l.is_empty()) {
        let (name, value) = line.split_once(':').ok_or_else(|| bad("header line without ':'"))?;
        let value = value.trim();
        if name.eq_ignore_ascii_case("Status") {
            status = value
                .split_whitespace()
                .next()
                .and_then(|code| code.parse::<u16>().ok())
                .filter(|code| (100..600).contains(code))
                .ok_or_else(|| bad("invalid Status header"))?;
        } else if name.eq_ignore_ascii_case("Content-Type") {
            content_type = Some(value.to_string());
        }
    }

    Ok(AgentResponse {
        status,
        content_type: content_type.ok_or_else(|| bad("missing Content-Type"))?,
        body: output[head_len + sep_len..].to_vec(),
    })
}

fn find_header_end(output: &[u8]) -> Option<(usize, usize)> {
    let crlf = output.windows(4).position(|w| w == b"\r\n\r\n").map(|i| (i, 4));
    let lf = output.windows(2).position(|w| w == b"\n\n").map(|i| (i, 2));
    match (crlf, lf) {
        (Some(a), Some(b)) => Some(if a.0 <= b.0 { a } else { b }),
        (a, b) => a.or(b),
    }
}

/// Parent side: spawns the child for each request.
#[derive(Debug, Clone)]
pub struct CgiGateway {
    program: PathBuf,
    python: PathBuf,
    scripts_root: PathBuf,
    server_name: String,
    server_port: u16,
    timeout: Duration,
}

impl CgiGateway {
    pub fn new(config: &AgentConfig, local_addr: SocketAddr) -> Result<Self> {
        let program = match &config.cgi_program {
            Some(program) => program.clone(),
            None => std::env::current_exe().map_err(|e| {
                SurvolError::TransportStartupFailure(format!("Cannot locate the agent executable: {}", e))
            })?,
        };
        Ok(Self {
            program,
            python: config.sources.python_executable.clone(),
            scripts_root: config.scripts_root.clone(),
            server_name: config.host.clone(),
            server_port: local_addr.port(),
            timeout: Duration::from_secs(config.cgi_timeout_secs),
        })
    }

    /// Run one request in a fresh child. Dropping the returned future, or
    /// running past the timeout, kills the child.
    pub async fn forward(&self, path: &str, query: Option<&str>) -> Result<AgentResponse> {
        debug!("Spawning {} for {}", self.program.display(), path);
        let mut command = Command::new(&self.program);
        command
            .arg("cgi")
            .arg("--python")
            .arg(&self.python)
            .current_dir(&self.scripts_root)
            .env("GATEWAY_INTERFACE", GATEWAY_INTERFACE)
            .env("SERVER_PROTOCOL", "HTTP/1.1")
            .env("SERVER_NAME", &self.server_name)
            .env("SERVER_PORT", self.server_port.to_string())
            .env("REQUEST_METHOD", "GET")
            .env("SCRIPT_NAME", path)
            .env("PATH_INFO", "")
            .env("QUERY_STRING", query.unwrap_or(""))
            .env("DOCUMENT_ROOT", &self.scripts_root)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::inherit())
            .kill_on_drop(true);

        let output = match tokio::time::timeout(self.timeout, command.output()).await {
            Ok(Ok(output)) => output,
            Ok(Err(e)) => {
                return Err(SurvolError::Gateway(format!("Cannot start {}: {}", self.program.display(), e)));
            }
            Err(_) => {
                return Err(SurvolError::Gateway(format!(
                    "CGI child for {} timed out after {}s",
                    path,
                    self.timeout.as_secs_f64()
                )));
            }
        };

        match parse_cgi_response(&output.stdout) {
            Ok(response) => {
                if !output.status.success() {
                    warn!("CGI child for {} exited with {}", path, output.status);
                }
                Ok(response)
            }
            Err(e) => Err(SurvolError::Gateway(format!("{} (child exited with {})", e, output.status))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_response_round_trip() {
        let response = AgentResponse {
            status: 404,
            content_type: "text/plain; charset=utf-8".to_string(),
            body: b"Not found: /x\n\nwith blank line".to_vec(),
        };
        let mut out = Vec::new();
        write_cgi_response(&response, &mut out).unwrap();
        assert!(out.starts_with(b"Status: 404 Not Found\r\n"));
        assert_eq!(parse_cgi_response(&out).unwrap(), response);
    }

    #[test]
    fn test_parse_lf_only_and_default_status() {
        let parsed = parse_cgi_response(b"Content-type: application/rdf+xml\n\n<rdf/>").unwrap();
        assert_eq!(parsed.status, 200);
        assert_eq!(parsed.content_type, "application/rdf+xml");
        assert_eq!(parsed.body, b"<rdf/>");
    }

    #[test]
    fn test_parse_failures_are_gateway_errors() {
        for output in [
            &b""[..],
            b"Traceback (most recent call last):",
            b"Status: 200 OK\r\n\r\nbody",
            b"Status: abc\r\nContent-Type: text/plain\r\n\r\n",
        ] {
            assert!(matches!(parse_cgi_response(output), Err(SurvolError::Gateway(_))));
        }
    }

    #[test]
    fn test_request_from_vars() {
        let vars = |name: &str| match name {
            "REQUEST_METHOD" => Some("GET".to_string()),
            "SCRIPT_NAME" => Some("/survol/sources_types/enumerate_user.py".to_string()),
            "QUERY_STRING" => Some("mode=rdf".to_string()),
            _ => None,
        };
        let request = CgiRequest::from_vars(vars).unwrap();
        assert_eq!(request.path(), "/survol/sources_types/enumerate_user.py");
        assert_eq!(request.query(), Some("mode=rdf"));
        assert!(CgiRequest::from_vars(|_| None).is_err());
    }

    #[test]
    fn test_run_cgi_rejects_post() {
        let state = AgentState::new(Default::default());
        let request = CgiRequest {
            method: "POST".to_string(),
            script_name: "/survol/entity.py".to_string(),
            ..Default::default()
        };
        assert_eq!(run_cgi(&state, &request).status, 405);
    }
}
