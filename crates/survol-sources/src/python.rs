//! `python_package`: distributions installed for the configured interpreter
//!
//! The interpreter is asked for its `sys.path`; every directory on it is
//! scanned for `*.dist-info` and `*.egg-info` metadata. Earlier path entries
//! shadow later ones, as they do for `import`.

use crate::context::EnumerationContext;
use crate::enumerator::{Enumerator, InstanceIter};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::io::Read;
use std::process::{Command, Output, Stdio};
use std::time::{Duration, Instant};
use survol_core::{EntityClass, EntityInstance, PropertyValue, Result, PYTHON_PACKAGE};
use tracing::{debug, warn};

pub struct PythonPackageEnumerator;

const SYS_PATH_SCRIPT: &str = "import json, sys; print(json.dumps(sys.path))";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PackageRecord {
    pub id: String,
    pub name: String,
    pub version: Option<String>,
    pub summary: Option<String>,
    pub location: PathBuf,
}

/// Normalized distribution key: lower case, `_` and `.` folded into `-`.
pub fn package_id(name: &str) -> String {
    name.trim()
        .chars()
        .map(|c| match c {
            '_' | '.' => '-',
            c => c.to_ascii_lowercase(),
        })
        .collect()
}

const POLL_INTERVAL: Duration = Duration::from_millis(20);

/// `sys.path` of `python`, or `None` when it cannot be run or does not
/// answer within `timeout`.
fn interpreter_path(python: &Path, timeout: Duration) -> Option<Vec<PathBuf>> {
    let mut child = match Command::new(python)
        .arg("-c")
        .arg(SYS_PATH_SCRIPT)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::null())
        .spawn()
    {
        Ok(child) => child,
        Err(e) => {
            warn!("Cannot run Python interpreter {}: {}", python.display(), e);
            return None;
        }
    };

    // Drained on its own thread so a chatty interpreter cannot fill the pipe.
    let mut pipe = child.stdout.take()?;
    let reader = std::thread::spawn(move || {
        let mut buf = Vec::new();
        let _ = pipe.read_to_end(&mut buf);
        buf
    });

    let deadline = Instant::now() + timeout;
    let status = loop {
        match child.try_wait() {
            Ok(Some(status)) => break status,
            Ok(None) if Instant::now() >= deadline => {
                warn!(
                    "Python interpreter {} did not answer within {:?}; killing it",
                    python.display(),
                    timeout
                );
                let _ = child.kill();
                let _ = child.wait();
                return None;
            }
            Ok(None) => std::thread::sleep(POLL_INTERVAL),
            Err(e) => {
                warn!("Waiting for Python interpreter {} failed: {}", python.display(), e);
                let _ = child.kill();
                return None;
            }
        }
    };
    let output = Output {
        status,
        stdout: reader.join().unwrap_or_default(),
        stderr: Vec::new(),
    };

    if !output.status.success() {
        warn!("Python interpreter {} exited with {}", python.display(), output.status);
        return None;
    }

    match serde_json::from_slice::<Vec<String>>(&output.stdout) {
        Ok(entries) => Some(
            entries
                .into_iter()
                .filter(|e| !e.is_empty())
                .map(PathBuf::from)
                .collect(),
        ),
        Err(e) => {
            warn!("Unexpected sys.path output from {}: {}", python.display(), e);
            None
        }
    }
}

/// Read `Name`, `Version` and `Summary` headers of a core metadata file.
fn parse_metadata(text: &str) -> BTreeMap<&'static str, String> {
    let mut fields = BTreeMap::new();
    for line in text.lines() {
        // Headers end at the first blank line; the long description follows.
        if line.trim().is_empty() {
            break;
        }
        if let Some((key, value)) = line.split_once(':') {
            let key = match key.trim() {
                "Name" => "Name",
                "Version" => "Version",
                "Summary" => "Summary",
                _ => continue,
            };
            let value = value.trim();
            if !value.is_empty() && value != "UNKNOWN" {
                fields.entry(key).or_insert_with(|| value.to_string());
            }
        }
    }
    fields
}

/// Metadata file inside a `.dist-info` or `.egg-info` entry.
fn metadata_file(entry: &Path, suffix: &str) -> PathBuf {
    if suffix == ".dist-info" {
        entry.join("METADATA")
    } else if entry.is_dir() {
        entry.join("PKG-INFO")
    } else {
        // Old-style single-file egg-info.
        entry.to_path_buf()
    }
}

fn read_record(entry: &Path, stem: &str, suffix: &str, location: &Path) -> Option<PackageRecord> {
    let fields = fs::read_to_string(metadata_file(entry, suffix))
        .map(|text| parse_metadata(&text))
        .unwrap_or_default();

    // Directory names read `<name>-<version>`; the name never contains '-'.
    let (dir_name, dir_version) = match stem.split_once('-') {
        Some((name, version)) => (name, Some(version.to_string())),
        None => (stem, None),
    };

    let name = fields.get("Name").cloned().unwrap_or_else(|| dir_name.to_string());
    if name.is_empty() {
        return None;
    }

    Some(PackageRecord {
        id: package_id(&name),
        name,
        version: fields.get("Version").cloned().or(dir_version),
        summary: fields.get("Summary").cloned(),
        location: location.to_path_buf(),
    })
}

/// Collect packages found in `dirs`, first directory winning on duplicates.
pub fn scan_site_dirs(dirs: &[PathBuf]) -> Vec<PackageRecord> {
    let mut packages: BTreeMap<String, PackageRecord> = BTreeMap::new();

    for dir in dirs {
        let entries = match fs::read_dir(dir) {
            Ok(entries) => entries,
            Err(e) => {
                debug!("Skipping {}: {}", dir.display(), e);
                continue;
            }
        };

        let mut names: Vec<PathBuf> = entries.filter_map(|e| e.ok().map(|e| e.path())).collect();
        names.sort();

        for path in names {
            let Some(file_name) = path.file_name().and_then(|n| n.to_str()) else {
                continue;
            };
            let Some((stem, suffix)) = [".dist-info", ".egg-info"]
                .iter()
                .find_map(|suffix| file_name.strip_suffix(suffix).map(|stem| (stem, *suffix)))
            else {
                continue;
            };

            if let Some(record) = read_record(&path, stem, suffix, dir) {
                packages.entry(record.id.clone()).or_insert(record);
            }
        }
    }

    packages.into_values().collect()
}

fn package_instance(record: PackageRecord) -> Result<EntityInstance> {
    let mut instance = EntityInstance::new(&PYTHON_PACKAGE, vec![PropertyValue::from(record.id)])?;
    instance.set("Name", record.name);
    instance.set_opt("Version", record.version);
    instance.set_opt("Summary", record.summary);
    instance.set("Location", record.location.display().to_string());
    Ok(instance)
}

impl Enumerator for PythonPackageEnumerator {
    fn class(&self) -> &'static EntityClass {
        &PYTHON_PACKAGE
    }

    fn enumerate(&self, ctx: &EnumerationContext) -> Result<InstanceIter<'_>> {
        let settings = ctx.settings();
        let records = match interpreter_path(&settings.python_executable, settings.python_timeout()) {
            Some(dirs) => scan_site_dirs(&dirs),
            None => {
                warn!("No usable Python interpreter; listing no packages");
                Vec::new()
            }
        };
        Ok(Box::new(records.into_iter().map(package_instance)))
    }
}
