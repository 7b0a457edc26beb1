//! Snapshot of the task that issued a describe-caller request.

use std::fmt;

use serde::Serialize;

/// Kernel-side `struct task_info`, filled by the DESCRIBE_CALLER request.
#[repr(C)]
#[derive(Debug, Clone, Copy, Default)]
pub(crate) struct RawTaskInfo {
    pub state: libc::c_long,
    pub stack: libc::uintptr_t,
    pub cpu: libc::c_int,
    pub prio: libc::c_int,
    pub static_prio: libc::c_int,
    pub normal_prio: libc::c_int,
    pub rt_priority: libc::c_int,
    pub pid: libc::pid_t,
    pub tgid: libc::pid_t,
    pub nvcsw: libc::c_ulong,
    pub nivcsw: libc::c_ulong,
}

/// Scheduling and identity state of the calling execution context.
///
/// This describes whoever issued the request (a process or a thread), not
/// the device.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct TaskDescriptor {
    /// Scheduler state (0 = runnable).
    pub state: i64,
    /// Opaque identifier of the task's stack region.
    pub stack: usize,
    /// CPU the task last ran on.
    pub cpu: i32,
    pub prio: i32,
    pub static_prio: i32,
    pub normal_prio: i32,
    pub rt_priority: i32,
    /// Kernel task id (the thread id for threads).
    pub pid: i32,
    /// Thread group id (the process id).
    pub tgid: i32,
    /// Voluntary context switches.
    pub nvcsw: u64,
    /// Involuntary context switches.
    pub nivcsw: u64,
}

impl From<RawTaskInfo> for TaskDescriptor {
    fn from(raw: RawTaskInfo) -> Self {
        Self {
            state: raw.state as i64,
            stack: raw.stack,
            cpu: raw.cpu,
            prio: raw.prio,
            static_prio: raw.static_prio,
            normal_prio: raw.normal_prio,
            rt_priority: raw.rt_priority,
            pid: raw.pid,
            tgid: raw.tgid,
            nvcsw: raw.nvcsw as u64,
            nivcsw: raw.nivcsw as u64,
        }
    }
}

impl fmt::Display for TaskDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "state {}, stack {:#x}, cpu {}, prio {}, sprio {}, nprio {}, rtprio {}, pid {}, tgid {}, nv {}, niv {}",
            self.state,
            self.stack,
            self.cpu,
            self.prio,
            self.static_prio,
            self.normal_prio,
            self.rt_priority,
            self.pid,
            self.tgid,
            self.nvcsw,
            self.nivcsw,
        )
    }
}
