//! Request-scoped enumeration context

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use survol_core::{ParamKind, Result, SurvolError};

/// Process-wide settings enumerators may consult. Fixed at agent startup.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct SourceSettings {
    /// Interpreter whose installed packages `python_package` reports.
    pub python_executable: PathBuf,
    /// How long the interpreter may take to report `sys.path` before it is
    /// killed and treated as unusable.
    pub python_timeout_ms: u64,
}

pub const DEFAULT_PYTHON_TIMEOUT_MS: u64 = 10_000;

impl SourceSettings {
    pub fn with_python(python_executable: impl Into<PathBuf>) -> Self {
        Self {
            python_executable: python_executable.into(),
            ..Self::default()
        }
    }

    pub fn python_timeout(&self) -> Duration {
        Duration::from_millis(self.python_timeout_ms)
    }
}

impl Default for SourceSettings {
    fn default() -> Self {
        Self {
            python_executable: PathBuf::from("python3"),
            python_timeout_ms: DEFAULT_PYTHON_TIMEOUT_MS,
        }
    }
}

/// A validated invocation parameter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParamValue {
    Integer(i64),
    String(String),
}

impl ParamValue {
    /// Check the raw query value against the declared kind.
    pub fn parse(name: &str, kind: ParamKind, raw: &str) -> Result<Self> {
        match kind {
            ParamKind::Integer => raw.trim().parse::<i64>().map(ParamValue::Integer).map_err(|_| {
                SurvolError::BadRequest(format!("Parameter {} expects an {}, got {:?}", name, kind, raw))
            }),
            ParamKind::String => Ok(ParamValue::String(raw.to_string())),
        }
    }

    pub fn as_integer(&self) -> Option<i64> {
        match self {
            ParamValue::Integer(v) => Some(*v),
            ParamValue::String(_) => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            ParamValue::String(v) => Some(v),
            ParamValue::Integer(_) => None,
        }
    }
}

/// What one enumeration call may see: the agent settings and the
/// request's typed parameters.
#[derive(Debug, Clone, Default)]
pub struct EnumerationContext {
    settings: Arc<SourceSettings>,
    params: BTreeMap<String, ParamValue>,
}

impl EnumerationContext {
    pub fn new(settings: Arc<SourceSettings>) -> Self {
        Self {
            settings,
            params: BTreeMap::new(),
        }
    }

    pub fn with_params(mut self, params: BTreeMap<String, ParamValue>) -> Self {
        self.params = params;
        self
    }

    pub fn with_param(mut self, name: impl Into<String>, value: ParamValue) -> Self {
        self.params.insert(name.into(), value);
        self
    }

    pub fn settings(&self) -> &SourceSettings {
        &self.settings
    }

    pub fn param(&self, name: &str) -> Option<&ParamValue> {
        self.params.get(name)
    }

    pub fn params(&self) -> &BTreeMap<String, ParamValue> {
        &self.params
    }
}
