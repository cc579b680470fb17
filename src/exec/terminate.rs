// src/exec/terminate.rs

//! Platform process-tree termination.
//!
//! Children are spawned in their own process group (Unix) or console process
//! group (Windows) so that package-manager scripts and everything they fork
//! can be killed as one unit.

use tokio::process::{Child, Command};

use crate::errors::TerminationError;

/// Put the child into a fresh process group whose id equals its pid.
#[cfg(unix)]
pub fn isolate_process_group(cmd: &mut Command) {
    cmd.process_group(0);
}

#[cfg(windows)]
pub fn isolate_process_group(cmd: &mut Command) {
    const CREATE_NEW_PROCESS_GROUP: u32 = 0x0000_0200;
    cmd.creation_flags(CREATE_NEW_PROCESS_GROUP);
}

#[cfg(not(any(unix, windows)))]
pub fn isolate_process_group(_cmd: &mut Command) {}

/// Forcefully kill the process group led by `pid`.
#[cfg(unix)]
pub fn terminate_tree(pid: u32) -> Result<(), TerminationError> {
    use nix::errno::Errno;
    use nix::sys::signal::{killpg, Signal};
    use nix::unistd::Pid;

    let pgid = i32::try_from(pid).map_err(|_| TerminationError::Os {
        pid,
        source: std::io::Error::new(std::io::ErrorKind::InvalidInput, "pid out of range"),
    })?;

    match killpg(Pid::from_raw(pgid), Signal::SIGKILL) {
        Ok(()) => Ok(()),
        Err(Errno::ESRCH) => Err(TerminationError::AlreadyExited { pid }),
        Err(errno) => Err(TerminationError::Os {
            pid,
            source: errno.into(),
        }),
    }
}

/// Forcefully kill `pid` and all of its descendants.
#[cfg(windows)]
pub fn terminate_tree(pid: u32) -> Result<(), TerminationError> {
    use std::process::Stdio;

    let status = std::process::Command::new("taskkill")
        .args(["/F", "/T", "/PID", &pid.to_string()])
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .status()
        .map_err(|source| TerminationError::Os { pid, source })?;

    if status.success() {
        Ok(())
    } else {
        Err(TerminationError::AlreadyExited { pid })
    }
}

#[cfg(not(any(unix, windows)))]
pub fn terminate_tree(pid: u32) -> Result<(), TerminationError> {
    Err(TerminationError::Os {
        pid,
        source: std::io::Error::new(
            std::io::ErrorKind::Unsupported,
            "process tree termination is not supported on this platform",
        ),
    })
}

/// Ask the immediate child to exit (SIGTERM on Unix).
///
/// Returns `AlreadyExited` once the child has been reaped; the pid is never
/// signalled after that point.
#[cfg(unix)]
pub fn request_terminate(child: &mut Child) -> Result<(), TerminationError> {
    use nix::errno::Errno;
    use nix::sys::signal::{kill, Signal};
    use nix::unistd::Pid;

    let Some(pid) = child.id() else {
        return Err(TerminationError::AlreadyExited { pid: 0 });
    };
    let raw = i32::try_from(pid).map_err(|_| TerminationError::Os {
        pid,
        source: std::io::Error::new(std::io::ErrorKind::InvalidInput, "pid out of range"),
    })?;

    match kill(Pid::from_raw(raw), Signal::SIGTERM) {
        Ok(()) => Ok(()),
        Err(Errno::ESRCH) => Err(TerminationError::AlreadyExited { pid }),
        Err(errno) => Err(TerminationError::Os {
            pid,
            source: errno.into(),
        }),
    }
}

#[cfg(not(unix))]
pub fn request_terminate(child: &mut Child) -> Result<(), TerminationError> {
    let pid = child.id().unwrap_or(0);
    child
        .start_kill()
        .map_err(|source| TerminationError::Os { pid, source })
}
