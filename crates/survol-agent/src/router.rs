//! Request path and query string to a typed route
//!
//! Pure: the result depends only on the inputs and the registry.

use std::collections::BTreeMap;
use survol_core::moniker::percent_decode_bytes;
use survol_core::{EntityClass, Moniker, Result, SurvolError};
use survol_rdf::Mode;
use survol_sources::{ParamValue, Registry};
use tracing::debug;

pub const SCRIPT_PREFIX: &str = "/survol/";
pub const ENTITY_SCRIPT: &str = "entity.py";
const ENUMERATE_PREFIX: &str = "sources_types/enumerate_";

/// Request path of the enumeration script for `class`.
pub fn enumerate_path(class: &str) -> String {
    format!("{}{}{}.py", SCRIPT_PREFIX, ENUMERATE_PREFIX, class)
}

/// One enumeration of one class.
#[derive(Debug, Clone, PartialEq)]
pub struct EnumerationRequest {
    pub class: &'static EntityClass,
    pub mode: Mode,
    pub params: BTreeMap<String, ParamValue>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Route {
    /// Bare `entity.py`: the list of scripts.
    Landing { mode: Mode },
    /// `entity.py?xid=...`: a single instance.
    Entity { moniker: Moniker, mode: Mode },
    Enumerate(EnumerationRequest),
}

/// One `name=value` query argument, decoded, with the undecoded value kept.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueryArg<'a> {
    pub name: String,
    pub value: String,
    pub raw: &'a str,
}

fn decode_component(text: &str) -> Result<String> {
    let spaced = text.replace('+', " ");
    let bytes = percent_decode_bytes(&spaced)?;
    String::from_utf8(bytes)
        .map_err(|_| SurvolError::BadRequest(format!("Query component {:?} is not valid UTF-8", text)))
}

/// Split an `application/x-www-form-urlencoded` query string.
pub fn parse_query(query: &str) -> Result<Vec<QueryArg<'_>>> {
    query
        .split('&')
        .filter(|segment| !segment.is_empty())
        .map(|segment| {
            let (name, raw) = segment.split_once('=').unwrap_or((segment, ""));
            Ok(QueryArg {
                name: decode_component(name)?,
                value: decode_component(raw)?,
                raw,
            })
        })
        .collect()
}

fn single<'q>(args: &'q [QueryArg<'_>], name: &str) -> Result<Option<&'q QueryArg<'q>>> {
    let mut found = args.iter().filter(|a| a.name == name);
    let first = found.next();
    if found.next().is_some() {
        return Err(SurvolError::BadRequest(format!("Parameter {} given more than once", name)));
    }
    Ok(first)
}

fn mode_of(args: &[QueryArg<'_>]) -> Result<Mode> {
    match single(args, "mode")? {
        Some(arg) => Mode::parse(&arg.value),
        None => Ok(Mode::default()),
    }
}

/// Moniker text from `xid`. The value is tried as sent first, since
/// subject IRIs carry it that way, then fully decoded.
fn moniker_of(arg: &QueryArg<'_>) -> Result<Moniker> {
    Moniker::parse(arg.raw).or_else(|_| Moniker::parse(&arg.value))
}

fn is_class_name(name: &str) -> bool {
    !name.is_empty() && name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_')
}

pub fn resolve(registry: &Registry, path: &str, query: Option<&str>) -> Result<Route> {
    let script = path
        .strip_prefix(SCRIPT_PREFIX)
        .ok_or_else(|| SurvolError::NotFound(path.to_string()))?;
    let args = parse_query(query.unwrap_or(""))?;

    if script == ENTITY_SCRIPT {
        let mode = mode_of(&args)?;
        return match single(&args, "xid")? {
            Some(xid) => Ok(Route::Entity {
                moniker: moniker_of(xid)?,
                mode,
            }),
            None => Ok(Route::Landing { mode }),
        };
    }

    let class_name = script
        .strip_prefix(ENUMERATE_PREFIX)
        .and_then(|rest| rest.strip_suffix(".py"))
        .filter(|name| is_class_name(name))
        .ok_or_else(|| SurvolError::NotFound(path.to_string()))?;
    let class = registry.class(class_name)?;
    let mode = mode_of(&args)?;

    let mut params = BTreeMap::new();
    for arg in &args {
        if arg.name == "mode" {
            continue;
        }
        match class.parameter(&arg.name) {
            Some(def) => {
                single(&args, def.name)?;
                params.insert(def.name.to_string(), ParamValue::parse(def.name, def.kind, &arg.value)?);
            }
            None => debug!("Ignoring parameter {} for {}", arg.name, class.name),
        }
    }

    Ok(Route::Enumerate(EnumerationRequest { class, mode, params }))
}
