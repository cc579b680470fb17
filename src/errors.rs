// src/errors.rs

//! Crate-wide error types.
//!
//! Only two kinds of failure ever reach a caller: spawn-time failures of a
//! process session ([`SpawnError`]) and host-level precondition failures
//! (no project loaded, a script is already running, ...). Everything that
//! happens after a child process is up degrades gracefully and is at most
//! logged.

use std::path::PathBuf;

use thiserror::Error;

use crate::exec::SessionState;

#[derive(Error, Debug)]
pub enum AutorunnerError {
    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("TOML parsing error: {0}")]
    TomlError(#[from] toml::de::Error),

    #[error("no package manifest found in {0:?}")]
    ManifestMissing(PathBuf),

    #[error("no project loaded")]
    NoProject,

    #[error("a command is already running")]
    AlreadyRunning,

    #[error("unknown script: {0}")]
    UnknownScript(String),

    #[error(transparent)]
    Spawn(#[from] SpawnError),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

/// Failure to start a [`ProcessSession`](crate::exec::ProcessSession).
///
/// The session stays `Idle` whenever one of these is returned, so the caller
/// may retry with corrected input.
#[derive(Error, Debug)]
pub enum SpawnError {
    #[error("session cannot be started from state {0:?}")]
    NotIdle(SessionState),

    #[error("working directory does not exist: {0:?}")]
    MissingWorkingDirectory(PathBuf),

    #[error("failed to spawn `{command}`: {source}")]
    Spawn {
        command: String,
        #[source]
        source: std::io::Error,
    },
}

/// A failed attempt to terminate a process tree.
///
/// Never propagated past the session; it is logged and dropped.
#[derive(Error, Debug)]
pub enum TerminationError {
    #[error("process {pid} has no live process group")]
    AlreadyExited { pid: u32 },

    #[error("terminating process {pid}: {source}")]
    Os {
        pid: u32,
        #[source]
        source: std::io::Error,
    },
}

pub use anyhow::Error;
pub type Result<T> = std::result::Result<T, AutorunnerError>;
