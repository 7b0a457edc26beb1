//! Reaping worker processes.

use std::io;

use serde::Serialize;

use crate::error::DeviceError;
use crate::types::Pid;

/// How a reaped worker process ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "exit", content = "value", rename_all = "snake_case")]
pub enum ExitStatus {
    Code(i32),
    Signaled(i32),
}

impl ExitStatus {
    fn from_wait_status(status: libc::c_int) -> Self {
        if libc::WIFSIGNALED(status) {
            ExitStatus::Signaled(libc::WTERMSIG(status))
        } else {
            ExitStatus::Code(libc::WEXITSTATUS(status))
        }
    }

    /// A worker succeeded only if it exited on its own with code 0.
    pub fn success(&self) -> bool {
        *self == ExitStatus::Code(0)
    }
}

/// Block until the worker `pid` terminates and reap it.
///
/// Interrupted waits are retried, so a signal delivered to the orchestrator
/// never leaves a worker unaccounted for. Waiting on a pid that was already
/// reaped fails with `ECHILD`.
pub fn wait(pid: Pid) -> Result<ExitStatus, DeviceError> {
    let mut status: libc::c_int = 0;
    loop {
        if unsafe { libc::waitpid(pid.0, &mut status, 0) } > 0 {
            return Ok(ExitStatus::from_wait_status(status));
        }
        let err = io::Error::last_os_error();
        if err.kind() != io::ErrorKind::Interrupted {
            return Err(DeviceError::Wait(err));
        }
    }
}
