// src/project/package_manager.rs

use std::fmt;
use std::path::Path;
use std::str::FromStr;

use serde::Deserialize;
use tracing::debug;

use crate::fs::FileSystem;

/// JavaScript package manager used to install dependencies and run scripts.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PackageManager {
    #[default]
    Npm,
    Yarn,
    Pnpm,
    Bun,
}

/// Lockfiles checked in order; the first one present decides.
const LOCK_FILES: &[(&str, PackageManager)] = &[
    ("yarn.lock", PackageManager::Yarn),
    ("pnpm-lock.yaml", PackageManager::Pnpm),
    ("bun.lock", PackageManager::Bun),
    ("bun.lockb", PackageManager::Bun),
];

impl PackageManager {
    pub const ALL: [PackageManager; 4] = [
        PackageManager::Npm,
        PackageManager::Yarn,
        PackageManager::Pnpm,
        PackageManager::Bun,
    ];

    /// Pick the package manager from the lockfile in `project_dir`, falling
    /// back to npm.
    pub fn detect(fs: &dyn FileSystem, project_dir: &Path) -> Self {
        for (lock_file, manager) in LOCK_FILES {
            if fs.is_file(&project_dir.join(lock_file)) {
                debug!(lock_file, manager = %manager, "detected package manager");
                return *manager;
            }
        }
        PackageManager::default()
    }

    pub fn name(self) -> &'static str {
        match self {
            PackageManager::Npm => "npm",
            PackageManager::Yarn => "yarn",
            PackageManager::Pnpm => "pnpm",
            PackageManager::Bun => "bun",
        }
    }

    pub fn install_command(self) -> String {
        match self {
            PackageManager::Yarn => "yarn".to_string(),
            other => format!("{} install", other.name()),
        }
    }

    pub fn run_command(self, script: &str) -> String {
        match self {
            PackageManager::Yarn => format!("yarn {script}"),
            other => format!("{} run {script}", other.name()),
        }
    }
}

impl fmt::Display for PackageManager {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for PackageManager {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_ascii_lowercase();
        PackageManager::ALL
            .into_iter()
            .find(|pm| pm.name() == wanted)
            .ok_or_else(|| format!("unknown package manager '{s}' (expected npm, yarn, pnpm or bun)"))
    }
}
