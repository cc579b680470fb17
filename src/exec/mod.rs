// src/exec/mod.rs

//! Process execution layer.
//!
//! This module is responsible for actually running external commands, using
//! `tokio::process::Command`, and streaming their output back to whoever
//! started them.
//!
//! - [`session`] owns the single-shot [`ProcessSession`] lifecycle and its
//!   output drain task.
//! - [`terminate`] holds the per-platform process-group setup and
//!   process-tree termination.

pub mod session;
pub mod terminate;

pub use session::{
    ProcessSession, SessionEvent, SessionOutcome, SessionOutput, SessionState, StopHandle,
};
pub use terminate::terminate_tree;
