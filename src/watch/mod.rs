// src/watch/mod.rs

//! Polling file-change detection.
//!
//! - [`scan`] enumerates tracked files under a root, pruning excluded
//!   directories.
//! - [`watcher`] keeps the last-seen modification time per file and runs the
//!   poll loop on a background task.

pub mod scan;
pub mod watcher;

pub use scan::{
    tracked_files, WatchSettings, DEFAULT_EXCLUDED_DIRS, DEFAULT_POLL_INTERVAL,
    DEFAULT_TRACKED_EXTENSIONS,
};
pub use watcher::{FileChange, FileWatcher, PollOutcome, WatcherHandle};
