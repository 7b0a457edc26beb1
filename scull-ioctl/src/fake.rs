//! In-memory stand-in for the scull device.
//!
//! Mirrors the driver's quantum semantics so dispatch and fan-out logic can
//! be exercised without the kernel module loaded. Clones share state, so a
//! test can keep one clone as a probe while a [`Session`](crate::Session)
//! owns another.

use std::collections::HashSet;
use std::io;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use crate::channel::ControlChannel;
use crate::request::{Opcode, Reply, Request};
use crate::task::TaskDescriptor;

/// Quantum the driver starts with and returns to on reset.
pub const DEFAULT_QUANTUM: i32 = 4000;

/// Nice-0 static priority of a normal task.
const DEFAULT_PRIO: i32 = 120;

#[derive(Default)]
struct Shared {
    quantum: Mutex<i32>,
    rejected: Mutex<HashSet<Opcode>>,
    calls: AtomicUsize,
    closes: AtomicUsize,
}

/// A shared-state fake device.
#[derive(Clone)]
pub struct MemoryDevice {
    shared: Arc<Shared>,
}

impl MemoryDevice {
    /// A device holding [`DEFAULT_QUANTUM`].
    pub fn new() -> Self {
        Self::with_quantum(DEFAULT_QUANTUM)
    }

    /// A device holding `quantum`.
    pub fn with_quantum(quantum: i32) -> Self {
        let shared = Shared {
            quantum: Mutex::new(quantum),
            ..Shared::default()
        };
        Self {
            shared: Arc::new(shared),
        }
    }

    /// Make every later `op` request fail with `EINVAL`.
    pub fn reject(&self, op: Opcode) {
        lock(&self.shared.rejected).insert(op);
    }

    /// Undo [`MemoryDevice::reject`].
    pub fn accept(&self, op: Opcode) {
        lock(&self.shared.rejected).remove(&op);
    }

    /// Current quantum.
    pub fn quantum(&self) -> i32 {
        *lock(&self.shared.quantum)
    }

    /// Number of requests served, rejected ones included.
    pub fn calls(&self) -> usize {
        self.shared.calls.load(Ordering::SeqCst)
    }

    /// Number of times a channel sharing this state was closed.
    pub fn closes(&self) -> usize {
        self.shared.closes.load(Ordering::SeqCst)
    }
}

impl Default for MemoryDevice {
    fn default() -> Self {
        Self::new()
    }
}

impl ControlChannel for MemoryDevice {
    fn call(&self, request: Request) -> io::Result<Reply> {
        self.shared.calls.fetch_add(1, Ordering::SeqCst);

        if lock(&self.shared.rejected).contains(&request.opcode()) {
            return Err(io::Error::from_raw_os_error(libc::EINVAL));
        }

        let mut quantum = lock(&self.shared.quantum);
        let reply = match request {
            Request::Reset => {
                *quantum = DEFAULT_QUANTUM;
                Reply::Ack
            }
            Request::GetQuantum | Request::QueryQuantum => Reply::Quantum(*quantum),
            Request::TellQuantum(value) | Request::SetQuantum(value) => {
                *quantum = value;
                Reply::Ack
            }
            // Shift follows the driver: install the new value, hand back the old one.
            Request::ExchangeQuantum(value) | Request::ShiftQuantum(value) => {
                Reply::Quantum(std::mem::replace(&mut *quantum, value))
            }
            Request::DescribeCaller => Reply::Task(current_task()),
        };
        Ok(reply)
    }

    fn close(self) -> io::Result<()> {
        self.shared.closes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

fn lock<T>(mutex: &Mutex<T>) -> std::sync::MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Describe the calling thread from what userspace can observe.
fn current_task() -> TaskDescriptor {
    let marker = 0u8;
    let mut usage: libc::rusage = unsafe { std::mem::zeroed() };
    unsafe { libc::getrusage(libc::RUSAGE_THREAD, &mut usage) };

    let nice = unsafe { libc::getpriority(libc::PRIO_PROCESS, 0) };
    let prio = DEFAULT_PRIO + nice;

    TaskDescriptor {
        state: 0,
        stack: std::ptr::addr_of!(marker) as usize,
        cpu: unsafe { libc::sched_getcpu() },
        prio,
        static_prio: prio,
        normal_prio: prio,
        rt_priority: 0,
        pid: unsafe { libc::syscall(libc::SYS_gettid) } as i32,
        tgid: unsafe { libc::getpid() },
        nvcsw: usage.ru_nvcsw as u64,
        nivcsw: usage.ru_nivcsw as u64,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_shift_installs_value_and_returns_old() {
        let dev = MemoryDevice::with_quantum(7);
        assert_eq!(dev.call(Request::ShiftQuantum(3)).unwrap(), Reply::Quantum(7));
        assert_eq!(dev.quantum(), 3);
    }

    #[test]
    fn test_rejection_is_per_opcode() {
        let dev = MemoryDevice::new();
        dev.reject(Opcode::GetQuantum);

        let err = dev.call(Request::GetQuantum).unwrap_err();
        assert_eq!(err.raw_os_error(), Some(libc::EINVAL));
        assert!(dev.call(Request::QueryQuantum).is_ok());

        dev.accept(Opcode::GetQuantum);
        assert!(dev.call(Request::GetQuantum).is_ok());
        assert_eq!(dev.calls(), 3);
    }

    #[test]
    fn test_describe_reports_calling_thread() {
        let dev = MemoryDevice::new();
        let main = match dev.call(Request::DescribeCaller).unwrap() {
            Reply::Task(task) => task,
            other => panic!("unexpected reply {other:?}"),
        };
        let worker = std::thread::spawn(move || match dev.call(Request::DescribeCaller).unwrap() {
            Reply::Task(task) => task,
            other => panic!("unexpected reply {other:?}"),
        })
        .join()
        .unwrap();

        assert_eq!(main.tgid, std::process::id() as i32);
        assert_eq!(worker.tgid, main.tgid);
        assert_ne!(worker.pid, main.pid);
    }

    #[test]
    fn test_clones_share_close_counter() {
        let probe = MemoryDevice::new();
        probe.clone().close().unwrap();
        assert_eq!(probe.closes(), 1);
    }
}
