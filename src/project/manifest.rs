// src/project/manifest.rs

//! Helpers around `package.json` and the installed dependency directory.

use std::collections::BTreeMap;
use std::path::Path;

use anyhow::{Context, Result};
use serde::Deserialize;
use serde_json::Value;
use tracing::{debug, info};

use crate::fs::FileSystem;

pub const MANIFEST_FILE: &str = "package.json";

pub const DEFAULT_DEPENDENCY_DIR: &str = "node_modules";

/// The parts of `package.json` the runner cares about.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PackageInfo {
    pub name: Option<String>,
    pub version: Option<String>,
    pub scripts: BTreeMap<String, String>,
}

#[derive(Debug, Deserialize)]
struct RawManifest {
    #[serde(default)]
    name: Option<Value>,
    #[serde(default)]
    version: Option<Value>,
    #[serde(default)]
    scripts: Option<Value>,
}

pub fn has_package_manifest(fs: &dyn FileSystem, project_dir: &Path) -> bool {
    fs.is_file(&project_dir.join(MANIFEST_FILE))
}

/// Parse `package.json` in `project_dir`.
///
/// Fields with an unexpected JSON type are ignored rather than rejected;
/// script entries whose command is not a string are skipped.
pub fn load_package_info(fs: &dyn FileSystem, project_dir: &Path) -> Result<PackageInfo> {
    let path = project_dir.join(MANIFEST_FILE);
    let contents = fs.read_to_string(&path)?;
    let raw: RawManifest = serde_json::from_str(&contents)
        .with_context(|| format!("parsing {}", path.display()))?;

    let scripts = match raw.scripts {
        Some(Value::Object(map)) => map
            .into_iter()
            .filter_map(|(name, cmd)| match cmd {
                Value::String(cmd) => Some((name, cmd)),
                _ => None,
            })
            .collect(),
        _ => BTreeMap::new(),
    };

    Ok(PackageInfo {
        name: as_string(raw.name),
        version: as_string(raw.version),
        scripts,
    })
}

fn as_string(value: Option<Value>) -> Option<String> {
    match value {
        Some(Value::String(s)) => Some(s),
        _ => None,
    }
}

/// Script table of `package.json`; empty when the manifest is missing or
/// malformed.
pub fn load_scripts(fs: &dyn FileSystem, project_dir: &Path) -> BTreeMap<String, String> {
    match load_package_info(fs, project_dir) {
        Ok(info) => info.scripts,
        Err(err) => {
            debug!(dir = %project_dir.display(), error = %err, "no scripts loaded");
            BTreeMap::new()
        }
    }
}

pub fn has_dependency_dir(fs: &dyn FileSystem, project_dir: &Path, dependency_dir: &str) -> bool {
    fs.is_dir(&project_dir.join(dependency_dir))
}

/// Delete the dependency directory if it exists.
///
/// Returns `Ok(false)` when there was nothing to remove.
pub fn remove_dependency_dir(
    fs: &dyn FileSystem,
    project_dir: &Path,
    dependency_dir: &str,
) -> Result<bool> {
    let path = project_dir.join(dependency_dir);
    if !fs.is_dir(&path) {
        return Ok(false);
    }
    info!(path = %path.display(), "removing dependency directory");
    fs.remove_dir_all(&path)?;
    Ok(true)
}
