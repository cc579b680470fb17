use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use tempfile::TempDir;

/// Builds a throwaway JavaScript project on disk.
///
/// ```ignore
/// let dir = ProjectDirBuilder::new()
///     .name("web")
///     .script("dev", "echo ready")
///     .lock_file("pnpm-lock.yaml")
///     .file("src/index.ts", "")
///     .build()?;
/// ```
#[derive(Debug, Default)]
pub struct ProjectDirBuilder {
    name: Option<String>,
    scripts: BTreeMap<String, String>,
    files: Vec<(String, String)>,
    dirs: Vec<String>,
    with_manifest: bool,
}

impl ProjectDirBuilder {
    pub fn new() -> Self {
        Self {
            with_manifest: true,
            ..Self::default()
        }
    }

    pub fn name(mut self, name: &str) -> Self {
        self.name = Some(name.to_string());
        self
    }

    pub fn script(mut self, name: &str, cmd: &str) -> Self {
        self.scripts.insert(name.to_string(), cmd.to_string());
        self
    }

    /// Add an empty lockfile, e.g. `"yarn.lock"`.
    pub fn lock_file(self, name: &str) -> Self {
        self.file(name, "")
    }

    /// Add a file at `rel` (parents are created).
    pub fn file(mut self, rel: &str, contents: &str) -> Self {
        self.files.push((rel.to_string(), contents.to_string()));
        self
    }

    pub fn dir(mut self, rel: &str) -> Self {
        self.dirs.push(rel.to_string());
        self
    }

    /// Leave out `package.json`.
    pub fn without_manifest(mut self) -> Self {
        self.with_manifest = false;
        self
    }

    pub fn build(self) -> Result<TempDir> {
        let dir = tempfile::tempdir().context("creating temp project dir")?;
        let root = dir.path();

        if self.with_manifest {
            let mut manifest = serde_json::Map::new();
            if let Some(name) = &self.name {
                manifest.insert("name".into(), name.clone().into());
            }
            let scripts: serde_json::Map<_, _> = self
                .scripts
                .into_iter()
                .map(|(k, v)| (k, serde_json::Value::String(v)))
                .collect();
            manifest.insert("scripts".into(), scripts.into());
            write(root, "package.json", &serde_json::to_string_pretty(&manifest)?)?;
        }

        for rel in &self.dirs {
            fs::create_dir_all(root.join(rel)).with_context(|| format!("creating {rel}"))?;
        }
        for (rel, contents) in &self.files {
            write(root, rel, contents)?;
        }

        Ok(dir)
    }
}

fn write(root: &Path, rel: &str, contents: &str) -> Result<()> {
    let path = root.join(rel);
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    fs::write(&path, contents).with_context(|| format!("writing {}", path.display()))
}
