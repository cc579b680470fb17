// src/host/mod.rs

//! The owning context of one project "tab".
//!
//! A [`SessionHost`] holds at most one [`ProcessSession`] and one file
//! watcher. Everything either of them produces is forwarded into a single
//! [`HostEvent`] channel, which is what a front end consumes.

use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::config::ConfigFile;
use crate::errors::{AutorunnerError, Result};
use crate::exec::{ProcessSession, SessionEvent, SessionOutcome, StopHandle};
use crate::fs::{FileSystem, RealFileSystem};
use crate::project::{self, PackageManager, DEFAULT_DEPENDENCY_DIR};
use crate::watch::{FileChange, FileWatcher, WatchSettings, WatcherHandle};

/// Everything a front end is told about.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HostEvent {
    /// One sanitized line of output from the running command.
    Output(String),
    /// The running command ended. Exactly one per started command.
    Finished {
        command: String,
        outcome: SessionOutcome,
    },
    /// A tracked source file was modified.
    FileChanged(FileChange),
    /// Informational message from the host itself.
    Notice(String),
}

/// Host configuration, usually derived from a [`ConfigFile`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HostSettings {
    pub watch: WatchSettings,
    /// Start a file watcher whenever a project is loaded.
    pub watch_files: bool,
    /// Overrides lockfile detection when set.
    pub package_manager: Option<PackageManager>,
    pub dependency_dir: String,
}

impl Default for HostSettings {
    fn default() -> Self {
        Self {
            watch: WatchSettings::default(),
            watch_files: true,
            package_manager: None,
            dependency_dir: DEFAULT_DEPENDENCY_DIR.to_string(),
        }
    }
}

impl HostSettings {
    pub fn from_config(cfg: &ConfigFile, watch_files: bool) -> Self {
        Self {
            watch: cfg.watch_settings(),
            watch_files,
            package_manager: cfg.project.package_manager,
            dependency_dir: cfg.project.dependency_dir.clone(),
        }
    }
}

/// A loaded project.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Project {
    /// Absolute project directory.
    pub path: PathBuf,
    pub name: Option<String>,
    pub version: Option<String>,
    pub package_manager: PackageManager,
    pub scripts: BTreeMap<String, String>,
}

impl Project {
    /// Package name, or the directory name when the manifest has none.
    pub fn display_name(&self) -> String {
        match &self.name {
            Some(name) => name.clone(),
            None => self
                .path
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_else(|| self.path.display().to_string()),
        }
    }
}

pub struct SessionHost {
    settings: HostSettings,
    fs: Arc<dyn FileSystem>,
    events: mpsc::UnboundedSender<HostEvent>,
    project: Option<Project>,
    session: Option<ProcessSession>,
    watcher: Option<WatcherHandle>,
}

impl fmt::Debug for SessionHost {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SessionHost")
            .field("project", &self.project.as_ref().map(|p| &p.path))
            .field("session", &self.session.as_ref().map(|s| s.state()))
            .field("watcher", &self.watcher)
            .finish_non_exhaustive()
    }
}

impl SessionHost {
    /// Create a host reading the real filesystem, returning the receiving
    /// end of its event channel.
    pub fn new(settings: HostSettings) -> (Self, mpsc::UnboundedReceiver<HostEvent>) {
        Self::with_fs(settings, Arc::new(RealFileSystem))
    }

    pub fn with_fs(
        settings: HostSettings,
        fs: Arc<dyn FileSystem>,
    ) -> (Self, mpsc::UnboundedReceiver<HostEvent>) {
        let (events, rx) = mpsc::unbounded_channel();
        let host = Self {
            settings,
            fs,
            events,
            project: None,
            session: None,
            watcher: None,
        };
        (host, rx)
    }

    pub fn settings(&self) -> &HostSettings {
        &self.settings
    }

    pub fn project(&self) -> Option<&Project> {
        self.project.as_ref()
    }

    /// Root of the active file watcher, if one is running.
    pub fn watched_root(&self) -> Option<&Path> {
        self.watcher
            .as_ref()
            .filter(|w| w.is_running())
            .map(|w| w.root())
    }

    /// Open the project in `dir`, replacing any previously loaded one.
    ///
    /// The previous watcher is stopped and, if file watching is enabled, a
    /// new one is started on `dir`. A running session is left alone. Must be
    /// called from within a Tokio runtime.
    pub fn load_project(&mut self, dir: impl AsRef<Path>) -> Result<&Project> {
        let path = std::path::absolute(dir.as_ref())?;
        if !self.fs.is_dir(&path) || !project::has_package_manifest(self.fs.as_ref(), &path) {
            return Err(AutorunnerError::ManifestMissing(path));
        }

        let package_manager = self
            .settings
            .package_manager
            .unwrap_or_else(|| PackageManager::detect(self.fs.as_ref(), &path));

        let info = match project::load_package_info(self.fs.as_ref(), &path) {
            Ok(info) => info,
            Err(err) => {
                warn!(path = %path.display(), error = %err, "could not read package manifest");
                self.notify(format!("Could not read package.json: {err:#}"));
                Default::default()
            }
        };

        let loaded = Project {
            path,
            name: info.name,
            version: info.version,
            package_manager,
            scripts: info.scripts,
        };
        info!(
            path = %loaded.path.display(),
            package_manager = %loaded.package_manager,
            scripts = loaded.scripts.len(),
            "project loaded"
        );

        self.notify(format!(
            "Loaded {} ({} scripts, {})",
            loaded.display_name(),
            loaded.scripts.len(),
            loaded.package_manager
        ));
        let dep_dir = &self.settings.dependency_dir;
        if project::has_dependency_dir(self.fs.as_ref(), &loaded.path, dep_dir) {
            self.notify(format!("{dep_dir} found"));
        } else {
            self.notify(format!(
                "{dep_dir} not found; run install before running scripts"
            ));
        }

        self.replace_watcher(&loaded.path);
        Ok(self.project.insert(loaded))
    }

    fn replace_watcher(&mut self, root: &Path) {
        if let Some(old) = self.watcher.take() {
            debug!(root = %old.root().display(), "stopping previous watcher");
            old.stop();
        }
        if !self.settings.watch_files {
            return;
        }

        let (change_tx, mut change_rx) = mpsc::unbounded_channel::<FileChange>();
        let watcher = FileWatcher::with_fs(root, self.settings.watch.clone(), Arc::clone(&self.fs));
        self.watcher = Some(watcher.spawn(change_tx));

        let events = self.events.clone();
        tokio::spawn(async move {
            while let Some(change) = change_rx.recv().await {
                if events.send(HostEvent::FileChanged(change)).is_err() {
                    break;
                }
            }
        });
    }

    /// Run the package manager's install command.
    pub fn install(&mut self) -> Result<()> {
        let project = self.project.as_ref().ok_or(AutorunnerError::NoProject)?;
        self.ensure_idle()?;
        let command = project.package_manager.install_command();
        self.notify(format!("Installing: {command}"));
        self.run_command(&command)
    }

    /// Delete the dependency directory, then install.
    ///
    /// Removal is best effort: a failure is reported as a notice and the
    /// install still runs.
    pub fn reinstall(&mut self) -> Result<()> {
        let project = self.project.as_ref().ok_or(AutorunnerError::NoProject)?;
        self.ensure_idle()?;

        let dep_dir = &self.settings.dependency_dir;
        self.notify(format!("Removing {dep_dir}..."));
        match project::remove_dependency_dir(self.fs.as_ref(), &project.path, dep_dir) {
            Ok(true) => self.notify(format!("Removed {dep_dir}")),
            Ok(false) => debug!(dep_dir, "nothing to remove before reinstall"),
            Err(err) => {
                warn!(error = %err, "failed to remove dependency directory");
                self.notify(format!("Could not remove {dep_dir}: {err:#}"));
            }
        }

        self.install()
    }

    /// Run a script declared in `package.json`.
    pub fn run_script(&mut self, script: &str) -> Result<()> {
        let project = self.project.as_ref().ok_or(AutorunnerError::NoProject)?;
        if !project.scripts.contains_key(script) {
            return Err(AutorunnerError::UnknownScript(script.to_string()));
        }
        self.ensure_idle()?;
        let command = project.package_manager.run_command(script);
        self.notify(format!("Running: {command}"));
        self.run_command(&command)
    }

    /// Run an arbitrary shell command in the project directory.
    pub fn run_command(&mut self, command: &str) -> Result<()> {
        let project = self.project.as_ref().ok_or(AutorunnerError::NoProject)?;
        self.ensure_idle()?;

        let mut session = ProcessSession::new();
        let mut output = session.start(command, &project.path)?;

        let command = command.to_string();
        let events = self.events.clone();
        tokio::spawn(async move {
            while let Some(event) = output.recv().await {
                let event = match event {
                    SessionEvent::Output(line) => HostEvent::Output(line),
                    SessionEvent::Finished(outcome) => HostEvent::Finished {
                        command: command.clone(),
                        outcome,
                    },
                };
                if events.send(event).is_err() {
                    break;
                }
            }
        });

        self.session = Some(session);
        Ok(())
    }

    fn ensure_idle(&self) -> Result<()> {
        if self.is_running() {
            self.notify("A command is already running. Stop it first.".to_string());
            return Err(AutorunnerError::AlreadyRunning);
        }
        Ok(())
    }

    /// True while the current session is `Running` or `Stopping`.
    pub fn is_running(&self) -> bool {
        self.session.as_ref().is_some_and(ProcessSession::is_active)
    }

    /// Stop the running command, if any. Returns whether a stop was issued.
    pub fn stop(&self) -> bool {
        let stopped = self.session.as_ref().is_some_and(ProcessSession::stop);
        if stopped {
            self.notify("Process stopped.".to_string());
        }
        stopped
    }

    pub fn stop_handle(&self) -> Option<StopHandle> {
        self.session.as_ref().map(ProcessSession::stop_handle)
    }

    /// Wait for the current session, if any, to complete.
    pub async fn wait_idle(&self) {
        if let Some(session) = &self.session {
            session.wait_completed().await;
        }
    }

    /// Stop the running command and the watcher and wait for both to end.
    pub async fn close(&mut self) {
        self.stop();
        self.wait_idle().await;
        if let Some(watcher) = self.watcher.take() {
            watcher.shutdown().await;
        }
        info!("session host closed");
    }

    fn notify(&self, message: String) {
        let _ = self.events.send(HostEvent::Notice(message));
    }
}

impl Drop for SessionHost {
    fn drop(&mut self) {
        if let Some(session) = &self.session {
            session.stop();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fs::mock::MockFileSystem;

    fn mock_host(fs: &MockFileSystem) -> (SessionHost, mpsc::UnboundedReceiver<HostEvent>) {
        let settings = HostSettings {
            watch_files: false,
            ..HostSettings::default()
        };
        SessionHost::with_fs(settings, Arc::new(fs.clone()))
    }

    fn notices(rx: &mut mpsc::UnboundedReceiver<HostEvent>) -> Vec<String> {
        let mut out = Vec::new();
        while let Ok(event) = rx.try_recv() {
            if let HostEvent::Notice(msg) = event {
                out.push(msg);
            }
        }
        out
    }

    #[test]
    fn operations_without_project_are_rejected() {
        let fs = MockFileSystem::new();
        let (mut host, _rx) = mock_host(&fs);

        assert!(matches!(host.install(), Err(AutorunnerError::NoProject)));
        assert!(matches!(host.reinstall(), Err(AutorunnerError::NoProject)));
        assert!(matches!(host.run_script("dev"), Err(AutorunnerError::NoProject)));
        assert!(!host.stop());
        assert!(host.stop_handle().is_none());
    }

    #[test]
    fn load_requires_manifest() {
        let fs = MockFileSystem::new();
        fs.add_file("/app/index.js", "");
        let (mut host, _rx) = mock_host(&fs);

        let err = host.load_project("/app").unwrap_err();
        assert!(matches!(err, AutorunnerError::ManifestMissing(p) if p == Path::new("/app")));
        assert!(host.project().is_none());
    }

    #[test]
    fn load_detects_manager_and_scripts() {
        let fs = MockFileSystem::new();
        fs.add_file(
            "/app/package.json",
            r#"{ "name": "shop", "scripts": { "dev": "vite" } }"#,
        );
        fs.add_file("/app/pnpm-lock.yaml", "");
        let (mut host, mut rx) = mock_host(&fs);

        let project = host.load_project("/app").unwrap();
        assert_eq!(project.package_manager, PackageManager::Pnpm);
        assert_eq!(project.display_name(), "shop");
        assert_eq!(project.scripts.get("dev").map(String::as_str), Some("vite"));

        let notices = notices(&mut rx);
        assert!(notices.iter().any(|n| n.contains("node_modules not found")));
    }

    #[test]
    fn configured_manager_overrides_lockfile() {
        let fs = MockFileSystem::new();
        fs.add_file("/app/package.json", "{}");
        fs.add_file("/app/yarn.lock", "");
        let settings = HostSettings {
            watch_files: false,
            package_manager: Some(PackageManager::Bun),
            ..HostSettings::default()
        };
        let (mut host, _rx) = SessionHost::with_fs(settings, Arc::new(fs.clone()));

        let project = host.load_project("/app").unwrap();
        assert_eq!(project.package_manager, PackageManager::Bun);
        assert_eq!(project.display_name(), "app");
    }

    #[test]
    fn unknown_script_is_rejected_without_spawning() {
        let fs = MockFileSystem::new();
        fs.add_file("/app/package.json", r#"{ "scripts": { "dev": "vite" } }"#);
        let (mut host, _rx) = mock_host(&fs);
        host.load_project("/app").unwrap();

        let err = host.run_script("deploy").unwrap_err();
        assert!(matches!(err, AutorunnerError::UnknownScript(s) if s == "deploy"));
        assert!(!host.is_running());
    }
}
