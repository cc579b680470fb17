// src/watch/watcher.rs

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::SystemTime;

use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tracing::{debug, info, trace, warn};

use crate::fs::{FileSystem, RealFileSystem};
use crate::watch::scan::{tracked_files, WatchSettings};

/// A tracked file whose modification time advanced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileChange {
    pub path: PathBuf,
    /// Base name of `path`, the part shown to users.
    pub file_name: String,
}

/// Result of a single poll cycle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PollOutcome {
    /// The tree was scanned; these files changed since the previous cycle.
    Scanned(Vec<FileChange>),
    /// The root directory no longer exists. The watcher should end.
    RootGone,
}

/// Polling change detector for one project tree.
///
/// The first time a file is seen its mtime is only recorded; a notification
/// is produced on a later cycle once the mtime is strictly greater than the
/// recorded one.
#[derive(Debug)]
pub struct FileWatcher {
    root: PathBuf,
    settings: WatchSettings,
    fs: Arc<dyn FileSystem>,
    last_seen: HashMap<PathBuf, SystemTime>,
}

impl FileWatcher {
    pub fn new(root: impl Into<PathBuf>, settings: WatchSettings) -> Self {
        Self::with_fs(root, settings, Arc::new(RealFileSystem))
    }

    pub fn with_fs(
        root: impl Into<PathBuf>,
        settings: WatchSettings,
        fs: Arc<dyn FileSystem>,
    ) -> Self {
        Self {
            root: root.into(),
            settings,
            fs,
            last_seen: HashMap::new(),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn settings(&self) -> &WatchSettings {
        &self.settings
    }

    /// Number of files with a recorded baseline.
    pub fn tracked_count(&self) -> usize {
        self.last_seen.len()
    }

    /// Run one scan of the tree.
    pub fn poll_once(&mut self) -> PollOutcome {
        if !self.fs.is_dir(&self.root) {
            return PollOutcome::RootGone;
        }

        let mut changes = Vec::new();
        for path in tracked_files(self.fs.as_ref(), &self.root, &self.settings) {
            let modified = match self.fs.modified(&path) {
                Ok(m) => m,
                Err(err) => {
                    trace!(path = %path.display(), error = %err, "skipping file that could not be stat'ed");
                    continue;
                }
            };

            if let Some(previous) = self.last_seen.insert(path.clone(), modified) {
                if modified > previous {
                    let file_name = path
                        .file_name()
                        .map(|n| n.to_string_lossy().into_owned())
                        .unwrap_or_default();
                    changes.push(FileChange { path, file_name });
                }
            }
        }

        PollOutcome::Scanned(changes)
    }

    /// Move the watcher onto a background Tokio task.
    ///
    /// Each cycle's scan runs on the blocking pool. The loop ends when the
    /// handle is stopped or dropped, when the root disappears, or when
    /// `changes` has no receiver left.
    pub fn spawn(self, changes: mpsc::UnboundedSender<FileChange>) -> WatcherHandle {
        let (stop_tx, stop_rx) = watch::channel(false);
        let root = self.root.clone();
        let task = tokio::spawn(poll_loop(self, changes, stop_rx));

        WatcherHandle {
            root,
            stop: stop_tx,
            task: Some(task),
        }
    }
}

async fn poll_loop(
    mut watcher: FileWatcher,
    changes: mpsc::UnboundedSender<FileChange>,
    mut stop_rx: watch::Receiver<bool>,
) {
    let interval = watcher.settings.poll_interval;
    info!(root = %watcher.root.display(), interval_ms = interval.as_millis() as u64, "file watcher started");

    'poll: loop {
        if *stop_rx.borrow() {
            break;
        }

        let scan = tokio::task::spawn_blocking(move || {
            let outcome = watcher.poll_once();
            (watcher, outcome)
        })
        .await;

        let outcome = match scan {
            Ok((w, outcome)) => {
                watcher = w;
                outcome
            }
            Err(err) => {
                warn!(error = %err, "watcher scan panicked; stopping watcher");
                return;
            }
        };

        // Stopped while scanning: the results are discarded.
        if *stop_rx.borrow() {
            break;
        }

        match outcome {
            PollOutcome::RootGone => {
                info!(root = %watcher.root.display(), "watch root is gone; stopping watcher");
                break;
            }
            PollOutcome::Scanned(found) => {
                for change in found {
                    debug!(path = %change.path.display(), "tracked file changed");
                    if changes.send(change).is_err() {
                        debug!("change receiver dropped; stopping watcher");
                        break 'poll;
                    }
                }
            }
        }

        tokio::select! {
            _ = tokio::time::sleep(interval) => {}
            _ = stop_signalled(&mut stop_rx) => break,
        }
    }

    info!(root = %watcher.root.display(), tracked = watcher.tracked_count(), "file watcher stopped");
}

async fn stop_signalled(rx: &mut watch::Receiver<bool>) {
    // A dropped sender also means stop.
    let _ = rx.wait_for(|stop| *stop).await;
}

/// Handle to a running [`FileWatcher`] loop.
///
/// Dropping the handle stops the watcher.
pub struct WatcherHandle {
    root: PathBuf,
    stop: watch::Sender<bool>,
    task: Option<JoinHandle<()>>,
}

impl std::fmt::Debug for WatcherHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WatcherHandle")
            .field("root", &self.root)
            .field("running", &self.is_running())
            .finish()
    }
}

impl WatcherHandle {
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Ask the loop to end. Takes effect at the latest after the current
    /// scan, whose changes are then not delivered; a sleeping loop wakes
    /// immediately.
    pub fn stop(&self) {
        self.stop.send_modify(|stop| *stop = true);
    }

    pub fn is_running(&self) -> bool {
        self.task.as_ref().is_some_and(|task| !task.is_finished())
    }

    /// Wait for the loop to exit. Does not stop it by itself.
    pub async fn join(mut self) {
        if let Some(task) = self.task.take() {
            let _ = task.await;
        }
    }

    /// Stop and wait for the loop to exit.
    pub async fn shutdown(self) {
        self.stop();
        self.join().await;
    }
}

impl Drop for WatcherHandle {
    fn drop(&mut self) {
        self.stop.send_modify(|stop| *stop = true);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fs::mock::{base_mtime, MockFileSystem};
    use std::time::Duration;

    fn watcher_on(fs: &MockFileSystem) -> FileWatcher {
        FileWatcher::with_fs("/proj", WatchSettings::default(), Arc::new(fs.clone()))
    }

    fn names(outcome: PollOutcome) -> Vec<String> {
        match outcome {
            PollOutcome::Scanned(changes) => changes.into_iter().map(|c| c.file_name).collect(),
            PollOutcome::RootGone => panic!("root unexpectedly gone"),
        }
    }

    #[test]
    fn first_observation_is_baseline_only() {
        let fs = MockFileSystem::new();
        fs.add_file("/proj/a.ts", "");
        let mut watcher = watcher_on(&fs);

        assert!(names(watcher.poll_once()).is_empty());
        assert_eq!(watcher.tracked_count(), 1);
    }

    #[test]
    fn advanced_mtime_fires_exactly_once() {
        let fs = MockFileSystem::new();
        fs.add_file("/proj/a.ts", "");
        let mut watcher = watcher_on(&fs);

        assert!(names(watcher.poll_once()).is_empty());
        fs.touch("/proj/a.ts", base_mtime() + Duration::from_secs(1));
        assert_eq!(names(watcher.poll_once()), vec!["a.ts"]);
        assert!(names(watcher.poll_once()).is_empty());
    }

    #[test]
    fn older_mtime_is_recorded_but_not_reported() {
        let fs = MockFileSystem::new();
        fs.add_file("/proj/a.ts", "");
        let mut watcher = watcher_on(&fs);
        watcher.poll_once();

        fs.touch("/proj/a.ts", base_mtime() - Duration::from_secs(10));
        assert!(names(watcher.poll_once()).is_empty());

        // The older value became the new baseline.
        fs.touch("/proj/a.ts", base_mtime() - Duration::from_secs(5));
        assert_eq!(names(watcher.poll_once()), vec!["a.ts"]);
    }

    #[test]
    fn file_created_after_start_is_baselined_first() {
        let fs = MockFileSystem::new();
        fs.add_file("/proj/a.ts", "");
        let mut watcher = watcher_on(&fs);
        watcher.poll_once();

        fs.add_file("/proj/new.tsx", "");
        assert!(names(watcher.poll_once()).is_empty());
        assert_eq!(watcher.tracked_count(), 2);
    }

    #[test]
    fn excluded_directories_never_report() {
        let fs = MockFileSystem::new();
        for dir in ["node_modules", ".git", "dist", "build"] {
            fs.add_file(format!("/proj/{dir}/x.js"), "");
        }
        let mut watcher = watcher_on(&fs);
        watcher.poll_once();

        for dir in ["node_modules", ".git", "dist", "build"] {
            fs.touch(format!("/proj/{dir}/x.js"), base_mtime() + Duration::from_secs(60));
        }
        assert!(names(watcher.poll_once()).is_empty());
        assert_eq!(watcher.tracked_count(), 0);
    }

    #[test]
    fn deleted_file_is_skipped_without_error() {
        let fs = MockFileSystem::new();
        fs.add_file("/proj/a.ts", "");
        fs.add_file("/proj/b.ts", "");
        let mut watcher = watcher_on(&fs);
        watcher.poll_once();

        fs.remove("/proj/a.ts");
        fs.touch("/proj/b.ts", base_mtime() + Duration::from_secs(1));
        assert_eq!(names(watcher.poll_once()), vec!["b.ts"]);
        // Baselines are never pruned.
        assert_eq!(watcher.tracked_count(), 2);
    }

    #[test]
    fn missing_root_reports_gone() {
        let fs = MockFileSystem::new();
        fs.add_file("/proj/a.ts", "");
        let mut watcher = watcher_on(&fs);
        watcher.poll_once();

        fs.remove("/proj");
        assert_eq!(watcher.poll_once(), PollOutcome::RootGone);
    }

    #[tokio::test]
    async fn spawned_loop_ends_when_root_disappears() {
        let fs = MockFileSystem::new();
        fs.add_file("/proj/a.ts", "");
        let settings = WatchSettings {
            poll_interval: Duration::from_millis(10),
            ..WatchSettings::default()
        };
        let watcher = FileWatcher::with_fs("/proj", settings, Arc::new(fs.clone()));
        let (tx, _rx) = mpsc::unbounded_channel();
        let handle = watcher.spawn(tx);

        fs.remove("/proj");
        tokio::time::timeout(Duration::from_secs(5), handle.join())
            .await
            .expect("watcher should exit once the root is gone");
    }

    #[tokio::test]
    async fn stop_wakes_a_sleeping_loop() {
        let fs = MockFileSystem::new();
        fs.add_file("/proj/a.ts", "");
        let settings = WatchSettings {
            poll_interval: Duration::from_secs(3600),
            ..WatchSettings::default()
        };
        let watcher = FileWatcher::with_fs("/proj", settings, Arc::new(fs.clone()));
        let (tx, _rx) = mpsc::unbounded_channel();
        let handle = watcher.spawn(tx);
        assert!(handle.is_running());

        tokio::time::timeout(Duration::from_secs(5), handle.shutdown())
            .await
            .expect("stop should not wait for the poll interval");
    }

    /// Raises the stop flag whenever the walk reads a directory, so the stop
    /// lands while a scan is in progress.
    #[derive(Debug)]
    struct StopWhileScanning {
        inner: MockFileSystem,
        stop: watch::Sender<bool>,
    }

    impl FileSystem for StopWhileScanning {
        fn read_to_string(&self, path: &Path) -> anyhow::Result<String> {
            self.inner.read_to_string(path)
        }
        fn exists(&self, path: &Path) -> bool {
            self.inner.exists(path)
        }
        fn is_file(&self, path: &Path) -> bool {
            self.inner.is_file(path)
        }
        fn is_dir(&self, path: &Path) -> bool {
            self.inner.is_dir(path)
        }
        fn is_symlink(&self, path: &Path) -> bool {
            self.inner.is_symlink(path)
        }
        fn modified(&self, path: &Path) -> anyhow::Result<SystemTime> {
            self.inner.modified(path)
        }
        fn read_dir(&self, path: &Path) -> anyhow::Result<Vec<PathBuf>> {
            self.stop.send_modify(|stop| *stop = true);
            self.inner.read_dir(path)
        }
        fn remove_dir_all(&self, path: &Path) -> anyhow::Result<()> {
            self.inner.remove_dir_all(path)
        }
    }

    #[tokio::test]
    async fn changes_found_by_a_stopped_scan_are_not_delivered() {
        let fs = MockFileSystem::new();
        fs.add_file("/proj/a.ts", "");
        let mut baseline = watcher_on(&fs);
        assert!(names(baseline.poll_once()).is_empty());
        fs.touch("/proj/a.ts", base_mtime() + Duration::from_secs(1));

        let (stop_tx, stop_rx) = watch::channel(false);
        let watcher = FileWatcher {
            fs: Arc::new(StopWhileScanning {
                inner: fs.clone(),
                stop: stop_tx,
            }),
            ..baseline
        };
        let (tx, mut rx) = mpsc::unbounded_channel();

        tokio::time::timeout(Duration::from_secs(5), poll_loop(watcher, tx, stop_rx))
            .await
            .expect("loop should end after the stopped scan");

        assert_eq!(rx.recv().await, None);
    }
}
