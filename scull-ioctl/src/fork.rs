//! Worker process creation.

use std::io;
use std::panic::{self, AssertUnwindSafe};

use crate::error::DeviceError;
use crate::types::Pid;

/// Exit code of a worker whose body panicked.
pub const EXIT_PANICKED: i32 = 101;

/// Fork a worker process that runs `work` and exits with its return value.
///
/// The child inherits every open descriptor of the parent, including an
/// acquired [`Session`](crate::Session). It leaves through `_exit`, so no
/// destructor runs in the child and the inherited session is never released
/// there. The parent gets the child's pid and must reap it with
/// [`wait`](crate::wait).
pub fn fork_worker<F>(work: F) -> Result<Pid, DeviceError>
where
    F: FnOnce() -> i32,
{
    let pid = unsafe { libc::fork() };

    if pid < 0 {
        return Err(DeviceError::Fork(io::Error::last_os_error()));
    }

    if pid == 0 {
        // === CHILD PROCESS ===
        // Never unwind back into the parent's stack frames.
        let code = panic::catch_unwind(AssertUnwindSafe(work)).unwrap_or(EXIT_PANICKED);
        unsafe { libc::_exit(code) };
    }

    Ok(Pid::new(pid))
}
