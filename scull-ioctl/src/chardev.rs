//! The ioctl-backed channel to a character device node.

use std::fs::OpenOptions;
use std::io;
use std::os::fd::{AsRawFd, IntoRawFd, OwnedFd};
use std::path::{Path, PathBuf};

use crate::channel::ControlChannel;
use crate::error::DeviceError;
use crate::request::{Reply, Request};
use crate::sys;
use crate::task::{RawTaskInfo, TaskDescriptor};

/// Default device node.
pub const DEFAULT_DEVICE: &str = "/dev/scull";

/// An open, read-only descriptor on the device node.
#[derive(Debug)]
pub struct CharDevice {
    fd: OwnedFd,
    path: PathBuf,
}

impl CharDevice {
    /// Open the device node read-only.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, DeviceError> {
        let path = path.as_ref().to_path_buf();
        let file = OpenOptions::new()
            .read(true)
            .open(&path)
            .map_err(|source| DeviceError::Open {
                path: path.clone(),
                source,
            })?;

        Ok(Self {
            fd: OwnedFd::from(file),
            path,
        })
    }

    /// Path the device was opened from.
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl ControlChannel for CharDevice {
    fn call(&self, request: Request) -> io::Result<Reply> {
        let fd = self.fd.as_raw_fd();
        let code = request.opcode().request();

        match request {
            Request::Reset => sys::ioctl_value(fd, code, 0).map(|_| Reply::Ack),
            Request::QueryQuantum => sys::ioctl_value(fd, code, 0).map(Reply::Quantum),
            Request::TellQuantum(value) => {
                sys::ioctl_value(fd, code, value as libc::c_long).map(|_| Reply::Ack)
            }
            Request::ShiftQuantum(value) => {
                sys::ioctl_value(fd, code, value as libc::c_long).map(Reply::Quantum)
            }
            Request::GetQuantum => {
                let mut quantum: libc::c_int = 0;
                sys::ioctl_ptr(fd, code, &mut quantum)?;
                Ok(Reply::Quantum(quantum))
            }
            Request::SetQuantum(value) => {
                let mut quantum: libc::c_int = value;
                sys::ioctl_ptr(fd, code, &mut quantum)?;
                Ok(Reply::Ack)
            }
            Request::ExchangeQuantum(value) => {
                // In/out: the driver writes the previous quantum back.
                let mut quantum: libc::c_int = value;
                sys::ioctl_ptr(fd, code, &mut quantum)?;
                Ok(Reply::Quantum(quantum))
            }
            Request::DescribeCaller => {
                let mut info = RawTaskInfo::default();
                sys::ioctl_ptr(fd, code, &mut info)?;
                Ok(Reply::Task(TaskDescriptor::from(info)))
            }
        }
    }

    fn close(self) -> io::Result<()> {
        let fd = self.fd.into_raw_fd();
        if unsafe { libc::close(fd) } != 0 {
            return Err(io::Error::last_os_error());
        }
        Ok(())
    }
}
