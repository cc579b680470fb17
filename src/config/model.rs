// src/config/model.rs

use std::time::Duration;

use serde::Deserialize;

use crate::project::{PackageManager, DEFAULT_DEPENDENCY_DIR};
use crate::watch::{WatchSettings, DEFAULT_EXCLUDED_DIRS, DEFAULT_TRACKED_EXTENSIONS};

/// Configuration as read from `autorunner.toml`, before validation.
///
/// ```toml
/// [watch]
/// poll_interval_ms = 2000
/// extensions = [".js", ".ts", ".jsx", ".tsx", ".json"]
/// exclude_dirs = ["node_modules", ".git", "dist", "build"]
///
/// [project]
/// package_manager = "pnpm"
/// dependency_dir = "node_modules"
/// ```
///
/// Every section and key is optional.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RawConfigFile {
    #[serde(default)]
    pub watch: WatchSection,

    #[serde(default)]
    pub project: ProjectSection,
}

/// `[watch]` section.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct WatchSection {
    /// Delay between two scans of the project tree.
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,

    /// File-name suffixes that count as source files.
    #[serde(default = "default_extensions")]
    pub extensions: Vec<String>,

    /// Directory names the scan never enters.
    #[serde(default = "default_exclude_dirs")]
    pub exclude_dirs: Vec<String>,
}

fn default_poll_interval_ms() -> u64 {
    2000
}

fn default_extensions() -> Vec<String> {
    DEFAULT_TRACKED_EXTENSIONS.iter().map(|s| s.to_string()).collect()
}

fn default_exclude_dirs() -> Vec<String> {
    DEFAULT_EXCLUDED_DIRS.iter().map(|s| s.to_string()).collect()
}

impl Default for WatchSection {
    fn default() -> Self {
        Self {
            poll_interval_ms: default_poll_interval_ms(),
            extensions: default_extensions(),
            exclude_dirs: default_exclude_dirs(),
        }
    }
}

/// `[project]` section.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ProjectSection {
    /// Skip lockfile detection and always use this package manager.
    #[serde(default)]
    pub package_manager: Option<PackageManager>,

    /// Directory that `reinstall` deletes before installing.
    #[serde(default = "default_dependency_dir")]
    pub dependency_dir: String,
}

fn default_dependency_dir() -> String {
    DEFAULT_DEPENDENCY_DIR.to_string()
}

impl Default for ProjectSection {
    fn default() -> Self {
        Self {
            package_manager: None,
            dependency_dir: default_dependency_dir(),
        }
    }
}

/// Validated configuration.
///
/// Only constructed through `TryFrom<RawConfigFile>` (see `validate.rs`) or
/// [`ConfigFile::default`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfigFile {
    pub watch: WatchSection,
    pub project: ProjectSection,
}

impl Default for ConfigFile {
    fn default() -> Self {
        Self::new_unchecked(WatchSection::default(), ProjectSection::default())
    }
}

impl ConfigFile {
    /// Construct without validation. Used by `validate.rs` and by tests that
    /// need a config in a specific shape.
    pub fn new_unchecked(watch: WatchSection, project: ProjectSection) -> Self {
        Self { watch, project }
    }

    pub fn watch_settings(&self) -> WatchSettings {
        WatchSettings {
            poll_interval: Duration::from_millis(self.watch.poll_interval_ms),
            tracked_extensions: self.watch.extensions.clone(),
            excluded_dirs: self.watch.exclude_dirs.clone(),
        }
    }
}
