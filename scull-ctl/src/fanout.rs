//! Concurrent describe-caller fan-out.
//!
//! Two isolation models launch `n` workers, each issuing exactly one
//! describe-caller query:
//!
//! - process model: forked children inherit the open session, print their
//!   own descriptor and report back only through their exit status;
//! - thread model: scoped threads share `&Session` and hand their result
//!   back to the orchestrator.
//!
//! In both models the orchestrator accounts for every spawned worker before
//! returning, even when a worker fails or spawning stops early.

use std::fmt;
use std::fs::File;
use std::io::{self, Write};
use std::os::fd::{AsFd, BorrowedFd};
use std::thread;

use scull_ioctl::{DeviceError, ExitStatus, Pid, TaskDescriptor, fork_worker, wait};
use serde::Serialize;

use crate::output::Format;

/// Exit code of a process worker whose query was rejected.
pub const EXIT_REJECTED: i32 = 2;

/// Exit code of a process worker that could not print its descriptor.
pub const EXIT_OUTPUT: i32 = 3;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Model {
    Process,
    Thread,
}

impl fmt::Display for Model {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Model::Process => f.write_str("process"),
            Model::Thread => f.write_str("thread"),
        }
    }
}

/// What the orchestrator learned about one worker.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum WorkerStatus {
    /// Thread worker returned a descriptor.
    Described { task: TaskDescriptor },
    /// Process worker was reaped.
    Exited { pid: Pid, exit: ExitStatus },
    /// The device rejected the worker's query.
    Rejected { cause: String },
    /// Thread worker panicked.
    Panicked,
    /// Process worker could not be reaped.
    Lost { pid: Pid, cause: String },
}

impl WorkerStatus {
    pub fn is_success(&self) -> bool {
        match self {
            WorkerStatus::Described { .. } => true,
            WorkerStatus::Exited { exit, .. } => exit.success(),
            _ => false,
        }
    }
}

/// One worker, identified by its spawn ordinal.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct WorkerRecord {
    pub ordinal: usize,
    #[serde(flatten)]
    pub status: WorkerStatus,
}

impl fmt::Display for WorkerRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.status {
            WorkerStatus::Described { task } => write!(f, "{task}"),
            WorkerStatus::Exited { pid, exit } => match exit {
                ExitStatus::Code(code) => {
                    write!(f, "worker {}: pid {pid} exited with code {code}", self.ordinal)
                }
                ExitStatus::Signaled(sig) => {
                    write!(f, "worker {}: pid {pid} killed by signal {sig}", self.ordinal)
                }
            },
            WorkerStatus::Rejected { cause } => write!(f, "worker {}: {cause}", self.ordinal),
            WorkerStatus::Panicked => write!(f, "worker {}: panicked", self.ordinal),
            WorkerStatus::Lost { pid, cause } => {
                write!(f, "worker {}: pid {pid} lost: {cause}", self.ordinal)
            }
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum FanOutError {
    #[error("{model} fan-out spawned {spawned} of {requested} workers: {source}")]
    SpawnFailed {
        model: Model,
        spawned: usize,
        requested: usize,
        #[source]
        source: io::Error,
    },

    #[error("{model} fan-out: {failed} of {total} workers failed")]
    WorkersFailed {
        model: Model,
        failed: usize,
        total: usize,
    },
}

/// Everything a finished fan-out accounted for.
#[derive(Debug)]
pub struct FanOutReport {
    pub model: Model,
    pub requested: usize,
    /// One record per spawned worker, in ordinal order.
    pub workers: Vec<WorkerRecord>,
    /// Why spawning stopped before `requested` workers, if it did.
    pub spawn_error: Option<io::Error>,
}

impl FanOutReport {
    pub fn failed(&self) -> usize {
        self.workers.iter().filter(|w| !w.status.is_success()).count()
    }

    /// Turn the report into an aggregated verdict.
    ///
    /// A spawn failure takes precedence over worker failures.
    pub fn into_result(self) -> Result<Vec<WorkerRecord>, FanOutError> {
        if let Some(source) = self.spawn_error {
            return Err(FanOutError::SpawnFailed {
                model: self.model,
                spawned: self.workers.len(),
                requested: self.requested,
                source,
            });
        }

        let failed = self.workers.iter().filter(|w| !w.status.is_success()).count();
        if failed > 0 {
            return Err(FanOutError::WorkersFailed {
                model: self.model,
                failed,
                total: self.workers.len(),
            });
        }
        Ok(self.workers)
    }
}

/// Fork `count` workers, each running `query` once, and reap all of them.
///
/// A child prints its descriptor on stdout in `format` and exits 0, or
/// prints the error on stderr and exits with [`EXIT_REJECTED`]. The caller
/// flushes its own buffered output first, or every child inherits a copy.
pub fn fork_fan_out<F>(count: usize, format: Format, query: F) -> FanOutReport
where
    F: Fn(usize) -> Result<TaskDescriptor, DeviceError>,
{
    fork_workers(count, |ordinal| {
        fork_worker(|| run_child(ordinal, format, &query))
    })
}

/// Start up to `count` processes through `spawn`, then reap each one.
///
/// The first spawn error ends spawning; `count` is never used to size
/// anything up front.
fn fork_workers<S>(count: usize, mut spawn: S) -> FanOutReport
where
    S: FnMut(usize) -> Result<Pid, DeviceError>,
{
    let mut children: Vec<(usize, Pid)> = Vec::new();
    let mut spawn_error = None;

    for ordinal in 0..count {
        match spawn(ordinal) {
            Ok(pid) => {
                tracing::debug!(ordinal, pid = pid.as_raw(), "worker process forked");
                children.push((ordinal, pid));
            }
            Err(err) => {
                tracing::warn!(ordinal, error = %err, "stopped forking workers");
                spawn_error = Some(match err {
                    DeviceError::Fork(source) => source,
                    other => io::Error::other(other),
                });
                break;
            }
        }
    }

    let workers = children
        .into_iter()
        .map(|(ordinal, pid)| {
            let status = match wait(pid) {
                Ok(exit) => {
                    tracing::debug!(ordinal, pid = pid.as_raw(), ?exit, "worker process reaped");
                    WorkerStatus::Exited { pid, exit }
                }
                Err(err) => WorkerStatus::Lost {
                    pid,
                    cause: err.to_string(),
                },
            };
            WorkerRecord { ordinal, status }
        })
        .collect();

    FanOutReport {
        model: Model::Process,
        requested: count,
        workers,
        spawn_error,
    }
}

fn run_child<F>(ordinal: usize, format: Format, query: &F) -> i32
where
    F: Fn(usize) -> Result<TaskDescriptor, DeviceError>,
{
    // Another thread of the parent may have held the std stream locks at
    // fork time, so the child renders into a buffer and writes to a dup of
    // the raw descriptor instead.
    let mut line = Vec::new();
    match query(ordinal) {
        Ok(task) => {
            let record = WorkerRecord {
                ordinal,
                status: WorkerStatus::Described { task },
            };
            let written = format
                .write_line(&mut line, &record)
                .and_then(|_| write_fd(io::stdout().as_fd(), &line));
            match written {
                Ok(()) => 0,
                Err(_) => EXIT_OUTPUT,
            }
        }
        Err(err) => {
            let _ = writeln!(line, "worker {ordinal}: {err}");
            let _ = write_fd(io::stderr().as_fd(), &line);
            EXIT_REJECTED
        }
    }
}

fn write_fd(fd: BorrowedFd<'_>, bytes: &[u8]) -> io::Result<()> {
    File::from(fd.try_clone_to_owned()?).write_all(bytes)
}

/// Run `query` once on each of `count` scoped threads and collect every result.
pub fn thread_fan_out<F>(count: usize, query: F) -> FanOutReport
where
    F: Fn(usize) -> Result<TaskDescriptor, DeviceError> + Sync,
{
    spawn_threads(count, query, |ordinal| {
        Ok(thread::Builder::new().name(format!("scull-worker-{ordinal}")))
    })
}

/// Spawn up to `count` scoped threads from the builders `builder` hands out,
/// then join each one.
///
/// A builder or spawn error ends spawning; the threads already running are
/// still joined before the scope closes.
fn spawn_threads<F, B>(count: usize, query: F, mut builder: B) -> FanOutReport
where
    F: Fn(usize) -> Result<TaskDescriptor, DeviceError> + Sync,
    B: FnMut(usize) -> io::Result<thread::Builder>,
{
    let query = &query;

    thread::scope(|scope| {
        let mut handles = Vec::new();
        let mut spawn_error = None;

        for ordinal in 0..count {
            let spawned = builder(ordinal)
                .and_then(|b| b.spawn_scoped(scope, move || query(ordinal)));
            match spawned {
                Ok(handle) => handles.push((ordinal, handle)),
                Err(err) => {
                    tracing::warn!(ordinal, error = %err, "stopped spawning worker threads");
                    spawn_error = Some(err);
                    break;
                }
            }
        }

        let workers = handles
            .into_iter()
            .map(|(ordinal, handle)| {
                let status = match handle.join() {
                    Ok(Ok(task)) => WorkerStatus::Described { task },
                    Ok(Err(err)) => WorkerStatus::Rejected {
                        cause: err.to_string(),
                    },
                    Err(_) => WorkerStatus::Panicked,
                };
                tracing::debug!(ordinal, ok = status.is_success(), "worker thread joined");
                WorkerRecord { ordinal, status }
            })
            .collect();

        FanOutReport {
            model: Model::Thread,
            requested: count,
            workers,
            spawn_error,
        }
    })
}
