//! Device access for scullctl.
//!
//! This crate provides the low-level operations the scull control client
//! needs on Linux: opening the character device, encoding and issuing its
//! ioctl control requests, and forking/reaping worker processes that share
//! an open session.
//!
//! # Example
//!
//! ```no_run
//! use scull_ioctl::{fork_worker, wait, Session};
//!
//! let session = Session::acquire("/dev/scull").unwrap();
//! println!("quantum: {}", session.get_quantum().unwrap());
//!
//! // Ask the device about a child process sharing the session.
//! let pid = fork_worker(|| match session.describe_caller() {
//!     Ok(task) => {
//!         println!("{task}");
//!         0
//!     }
//!     Err(_) => 1,
//! })
//! .unwrap();
//! assert!(wait(pid).unwrap().success());
//!
//! session.release().unwrap();
//! ```

mod channel;
mod chardev;
mod error;
mod fork;
mod request;
mod session;
mod sys;
mod task;
mod types;
mod wait;

#[cfg(any(test, feature = "fake"))]
pub mod fake;

// Re-export public API
pub use channel::ControlChannel;
pub use chardev::{CharDevice, DEFAULT_DEVICE};
pub use error::DeviceError;
pub use fork::{fork_worker, EXIT_PANICKED};
pub use request::{Opcode, Reply, Request, SCULL_IOC_MAGIC};
pub use session::Session;
pub use task::TaskDescriptor;
pub use types::Pid;
pub use wait::{wait, ExitStatus};
