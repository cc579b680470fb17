// src/exec/session.rs

//! A managed child process session.
//!
//! A [`ProcessSession`] runs exactly one shell command. Its combined
//! stdout/stderr is drained on a dedicated Tokio task, sanitized line by line
//! and delivered through a [`SessionOutput`] receiver, followed by exactly one
//! [`SessionEvent::Finished`]. The lifecycle state is published through a
//! `watch` channel, which is also how a stop request reaches the drain task:
//!
//! ```text
//! Idle --start--> Running --stop--> Stopping
//!                    \                  \
//!                     `----output closed-`--> Completed
//! ```
//!
//! Only the drain task touches the child handle, so termination happens at
//! most once and never after the child has been reaped.

use std::path::Path;
use std::process::Stdio;
use std::sync::Arc;
use std::time::Duration;

use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::process::{Child, ChildStdout, Command};
use tokio::sync::{mpsc, watch};
use tracing::{debug, info, warn};

use crate::errors::SpawnError;
use crate::exec::terminate::{isolate_process_group, request_terminate, terminate_tree};
use crate::sanitize::strip_ansi;

/// How long a child that closed its output is given to honour a terminate
/// request before it is killed outright.
const TERMINATE_GRACE: Duration = Duration::from_secs(3);

/// Lifecycle of a [`ProcessSession`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Idle,
    Running,
    Stopping,
    Completed,
}

/// How a session ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionOutcome {
    /// Exit code, if the process exited normally (not via a signal).
    pub exit_code: Option<i32>,
    /// True if the session ended because `stop` was called.
    pub stopped: bool,
}

impl SessionOutcome {
    pub fn success(&self) -> bool {
        !self.stopped && self.exit_code == Some(0)
    }
}

/// Events produced by a running session, in order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionEvent {
    /// One sanitized line of combined output, without its line terminator.
    Output(String),
    /// Terminal event. Nothing follows it; the channel closes afterwards.
    Finished(SessionOutcome),
}

/// Receiving side of a started session.
#[derive(Debug)]
pub struct SessionOutput {
    rx: mpsc::UnboundedReceiver<SessionEvent>,
}

impl SessionOutput {
    /// Next event, or `None` once `Finished` has been delivered.
    pub async fn recv(&mut self) -> Option<SessionEvent> {
        self.rx.recv().await
    }

    /// Collect every remaining event until the channel closes.
    pub async fn collect(mut self) -> Vec<SessionEvent> {
        let mut events = Vec::new();
        while let Some(event) = self.rx.recv().await {
            events.push(event);
        }
        events
    }
}

/// Cloneable handle that can stop a session from another task.
#[derive(Debug, Clone)]
pub struct StopHandle {
    state: Arc<watch::Sender<SessionState>>,
}

impl StopHandle {
    /// Request termination of the session's process tree.
    ///
    /// No-op unless the session is `Running`. Returns whether this call
    /// performed the `Running -> Stopping` transition; concurrent or repeated
    /// calls see `false`, so the tree is terminated at most once.
    pub fn stop(&self) -> bool {
        let requested = self.state.send_if_modified(|state| {
            if *state == SessionState::Running {
                *state = SessionState::Stopping;
                true
            } else {
                false
            }
        });

        if requested {
            info!("stop requested for running session");
        } else {
            debug!(state = ?self.state(), "stop ignored; session is not running");
        }
        requested
    }

    pub fn state(&self) -> SessionState {
        *self.state.borrow()
    }
}

/// Owns the lifecycle of at most one child process.
#[derive(Debug)]
pub struct ProcessSession {
    state: Arc<watch::Sender<SessionState>>,
    command: Option<String>,
    pid: Option<u32>,
}

impl Default for ProcessSession {
    fn default() -> Self {
        Self::new()
    }
}

impl ProcessSession {
    pub fn new() -> Self {
        let (state, _) = watch::channel(SessionState::Idle);
        Self {
            state: Arc::new(state),
            command: None,
            pid: None,
        }
    }

    pub fn state(&self) -> SessionState {
        *self.state.borrow()
    }

    /// True while the child may still be alive (`Running` or `Stopping`).
    pub fn is_active(&self) -> bool {
        matches!(self.state(), SessionState::Running | SessionState::Stopping)
    }

    /// Command line passed to `start`, once started.
    pub fn command(&self) -> Option<&str> {
        self.command.as_deref()
    }

    pub fn pid(&self) -> Option<u32> {
        self.pid
    }

    pub fn stop_handle(&self) -> StopHandle {
        StopHandle {
            state: Arc::clone(&self.state),
        }
    }

    /// See [`StopHandle::stop`].
    pub fn stop(&self) -> bool {
        self.stop_handle().stop()
    }

    /// Wait until the session reaches `Completed`.
    ///
    /// Returns immediately for a session that was never started.
    pub async fn wait_completed(&self) {
        if self.state() == SessionState::Idle {
            return;
        }
        let mut rx = self.state.subscribe();
        let _ = rx.wait_for(|s| *s == SessionState::Completed).await;
    }

    /// Spawn `command` through the platform shell in `working_dir`.
    ///
    /// Must be called from within a Tokio runtime. On error the session
    /// stays `Idle`.
    pub fn start(
        &mut self,
        command: &str,
        working_dir: &Path,
    ) -> Result<SessionOutput, SpawnError> {
        let current = self.state();
        if current != SessionState::Idle {
            return Err(SpawnError::NotIdle(current));
        }
        if !working_dir.is_dir() {
            return Err(SpawnError::MissingWorkingDirectory(working_dir.to_path_buf()));
        }

        info!(command, cwd = %working_dir.display(), "starting session process");

        let mut cmd = shell_command(command);
        cmd.current_dir(working_dir)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .kill_on_drop(true);
        isolate_process_group(&mut cmd);

        let mut child = cmd.spawn().map_err(|source| SpawnError::Spawn {
            command: command.to_string(),
            source,
        })?;

        let pid = child.id();
        let stdout = child.stdout.take();
        info!(command, pid = ?pid, "session process started");

        self.command = Some(command.to_string());
        self.pid = pid;
        self.state.send_modify(|s| *s = SessionState::Running);

        let (tx, rx) = mpsc::unbounded_channel();
        let state = Arc::clone(&self.state);
        tokio::spawn(async move {
            drain_session(child, stdout, pid, state, tx).await;
        });

        Ok(SessionOutput { rx })
    }
}

/// Build a shell invocation that merges stderr into stdout, so both streams
/// share one pipe and keep their relative order.
fn shell_command(command: &str) -> Command {
    if cfg!(windows) {
        let mut c = Command::new("cmd");
        c.arg("/C").arg(format!("({command}) 2>&1"));
        c
    } else {
        let mut c = Command::new("sh");
        c.arg("-c").arg(format!("exec 2>&1\n{command}"));
        c
    }
}

/// Resolves once the session has been moved to `Stopping`.
async fn stop_requested(rx: &mut watch::Receiver<SessionState>) {
    if rx.wait_for(|s| *s == SessionState::Stopping).await.is_err() {
        std::future::pending::<()>().await;
    }
}

async fn drain_session(
    mut child: Child,
    stdout: Option<ChildStdout>,
    pid: Option<u32>,
    state: Arc<watch::Sender<SessionState>>,
    tx: mpsc::UnboundedSender<SessionEvent>,
) {
    let mut state_rx = state.subscribe();
    let mut stopped = false;

    if let Some(stdout) = stdout {
        let mut reader = BufReader::new(stdout);
        let mut buf = Vec::new();
        let mut forwarding = true;

        loop {
            buf.clear();
            tokio::select! {
                biased;

                _ = stop_requested(&mut state_rx) => {
                    stopped = true;
                    kill_tree(&mut child, pid);
                    break;
                }

                read = reader.read_until(b'\n', &mut buf) => match read {
                    Ok(0) => break,
                    Ok(_) => {
                        if forwarding && tx.send(SessionEvent::Output(decode_line(&buf))).is_err() {
                            debug!(pid = ?pid, "session output receiver dropped; draining silently");
                            forwarding = false;
                        }
                    }
                    Err(err) => {
                        debug!(pid = ?pid, error = %err, "reading session output failed; treating as end of stream");
                        break;
                    }
                },
            }
        }
    }

    if !stopped {
        stopped = terminate_if_alive(&mut child, pid, &mut state_rx).await;
    }

    let exit_code = match child.wait().await {
        Ok(status) => status.code(),
        Err(err) => {
            warn!(pid = ?pid, error = %err, "failed to reap session process");
            None
        }
    };

    let outcome = SessionOutcome { exit_code, stopped };
    info!(pid = ?pid, exit_code = ?exit_code, stopped, "session completed");

    state.send_modify(|s| *s = SessionState::Completed);
    let _ = tx.send(SessionEvent::Finished(outcome));
}

/// Forceful tree kill; falls back to killing the immediate child.
fn kill_tree(child: &mut Child, pid: Option<u32>) {
    let Some(pid) = pid else {
        let _ = child.start_kill();
        return;
    };

    match terminate_tree(pid) {
        Ok(()) => debug!(pid, "process tree terminated"),
        Err(err) => {
            debug!(pid, error = %err, "process tree termination failed");
            if let Err(err) = child.start_kill() {
                debug!(pid, error = %err, "direct kill failed");
            }
        }
    }
}

/// Output ended on its own. If the child is still around, ask it to exit and
/// give it a short grace period before killing its tree.
///
/// A stop during the grace period kills the tree at once. Returns whether
/// that happened.
async fn terminate_if_alive(
    child: &mut Child,
    pid: Option<u32>,
    state_rx: &mut watch::Receiver<SessionState>,
) -> bool {
    match child.try_wait() {
        Ok(Some(_)) => return false,
        Ok(None) => {}
        Err(err) => {
            debug!(pid = ?pid, error = %err, "could not poll session process");
            return false;
        }
    }

    debug!(pid = ?pid, "output closed while process still alive; requesting termination");
    if let Err(err) = request_terminate(child) {
        debug!(pid = ?pid, error = %err, "terminate request failed");
    }

    tokio::select! {
        biased;

        _ = stop_requested(state_rx) => {
            debug!(pid = ?pid, "stop requested during terminate grace period");
            kill_tree(child, pid);
            true
        }
        _ = child.wait() => false,
        _ = tokio::time::sleep(TERMINATE_GRACE) => {
            warn!(pid = ?pid, "process ignored terminate request; killing");
            kill_tree(child, pid);
            false
        }
    }
}

/// Strip the line terminator, decode lossily and sanitize.
fn decode_line(buf: &[u8]) -> String {
    let line = buf.strip_suffix(b"\n").unwrap_or(buf);
    let line = line.strip_suffix(b"\r").unwrap_or(line);
    let text = String::from_utf8_lossy(line);
    strip_ansi(&text).into_owned()
}
