// src/watch/scan.rs

//! Directory enumeration for the polling watcher.

use std::path::{Path, PathBuf};
use std::time::Duration;

use tracing::{debug, trace};

use crate::fs::FileSystem;

/// File suffixes the watcher reports on by default.
pub const DEFAULT_TRACKED_EXTENSIONS: &[&str] = &[".js", ".ts", ".jsx", ".tsx", ".json"];

/// Directory names that are never entered by default.
pub const DEFAULT_EXCLUDED_DIRS: &[&str] = &["node_modules", ".git", "dist", "build"];

pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(2000);

/// Immutable watcher configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WatchSettings {
    pub poll_interval: Duration,
    /// Suffixes matched against the file name, e.g. `".ts"`.
    pub tracked_extensions: Vec<String>,
    /// Directory names pruned from the walk (exact, case-sensitive).
    pub excluded_dirs: Vec<String>,
}

impl Default for WatchSettings {
    fn default() -> Self {
        Self {
            poll_interval: DEFAULT_POLL_INTERVAL,
            tracked_extensions: DEFAULT_TRACKED_EXTENSIONS
                .iter()
                .map(|s| s.to_string())
                .collect(),
            excluded_dirs: DEFAULT_EXCLUDED_DIRS.iter().map(|s| s.to_string()).collect(),
        }
    }
}

impl WatchSettings {
    pub fn is_tracked(&self, file_name: &str) -> bool {
        self.tracked_extensions
            .iter()
            .any(|ext| file_name.ends_with(ext.as_str()))
    }

    pub fn is_excluded_dir(&self, dir_name: &str) -> bool {
        self.excluded_dirs.iter().any(|name| name == dir_name)
    }
}

/// Collect every tracked file under `root`, depth first.
///
/// Within a directory, files come before subdirectories and both are in
/// name order. Excluded directories and symlinked directories are never
/// entered. Directories that cannot be read are skipped.
pub fn tracked_files(fs: &dyn FileSystem, root: &Path, settings: &WatchSettings) -> Vec<PathBuf> {
    let mut found = Vec::new();
    let mut pending = vec![root.to_path_buf()];

    while let Some(dir) = pending.pop() {
        let entries = match fs.read_dir(&dir) {
            Ok(entries) => entries,
            Err(err) => {
                debug!(dir = %dir.display(), error = %err, "skipping unreadable directory");
                continue;
            }
        };

        let mut subdirs = Vec::new();
        for entry in entries {
            let Some(name) = entry.file_name().map(|n| n.to_string_lossy()) else {
                continue;
            };

            if fs.is_dir(&entry) {
                if fs.is_symlink(&entry) {
                    trace!(dir = %entry.display(), "not following symlinked directory");
                } else if settings.is_excluded_dir(&name) {
                    trace!(dir = %entry.display(), "pruned excluded directory");
                } else {
                    subdirs.push(entry);
                }
            } else if settings.is_tracked(&name) {
                found.push(entry);
            }
        }

        // Reverse so the first subdirectory is popped next.
        pending.extend(subdirs.into_iter().rev());
    }

    found
}
