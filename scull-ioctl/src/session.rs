//! Scoped ownership of one open channel to the device.

use std::path::Path;

use crate::channel::ControlChannel;
use crate::chardev::CharDevice;
use crate::error::DeviceError;
use crate::request::{Opcode, Reply, Request};
use crate::task::TaskDescriptor;

/// One open channel to the device, owned by a single invocation.
///
/// Every typed operation borrows the session, so it can be shared across
/// scoped threads; [`Session::release`] consumes it, so nothing can be issued
/// once it has been released. A session dropped without being released
/// still closes its channel, once, and logs a warning.
pub struct Session<C: ControlChannel> {
    channel: Option<C>,
    label: String,
}

impl Session<CharDevice> {
    /// Open the device node at `path`.
    pub fn acquire(path: impl AsRef<Path>) -> Result<Self, DeviceError> {
        let channel = CharDevice::open(path)?;
        let label = channel.path().display().to_string();
        tracing::debug!(device = %label, "device session acquired");
        Ok(Self {
            channel: Some(channel),
            label,
        })
    }
}

impl<C: ControlChannel> Session<C> {
    /// Wrap an already-open channel.
    pub fn new(channel: C, label: impl Into<String>) -> Self {
        Self {
            channel: Some(channel),
            label: label.into(),
        }
    }

    /// Human-readable name of the device behind the session.
    pub fn label(&self) -> &str {
        &self.label
    }

    /// Close the underlying channel.
    pub fn release(mut self) -> Result<(), DeviceError> {
        tracing::debug!(device = %self.label, "releasing device session");
        match self.channel.take() {
            Some(channel) => channel.close().map_err(DeviceError::Close),
            None => Ok(()),
        }
    }

    fn call(&self, request: Request) -> Result<Reply, DeviceError> {
        let op = request.opcode();
        let channel = self.channel.as_ref().ok_or(DeviceError::Released { op })?;
        tracing::trace!(%op, "control request");
        channel
            .call(request)
            .map_err(|source| DeviceError::Rejected { op, source })
    }

    fn expect_ack(&self, request: Request) -> Result<(), DeviceError> {
        let op = request.opcode();
        match self.call(request)? {
            Reply::Ack => Ok(()),
            _ => Err(DeviceError::UnexpectedReply { op }),
        }
    }

    fn expect_quantum(&self, request: Request) -> Result<i32, DeviceError> {
        let op = request.opcode();
        match self.call(request)? {
            Reply::Quantum(value) => Ok(value),
            _ => Err(DeviceError::UnexpectedReply { op }),
        }
    }

    /// Reset the quantum to the device default.
    pub fn reset(&self) -> Result<(), DeviceError> {
        self.expect_ack(Request::Reset)
    }

    /// Read the quantum through an out pointer.
    pub fn get_quantum(&self) -> Result<i32, DeviceError> {
        self.expect_quantum(Request::GetQuantum)
    }

    /// Read the quantum through the ioctl return value.
    pub fn query_quantum(&self) -> Result<i32, DeviceError> {
        self.expect_quantum(Request::QueryQuantum)
    }

    /// Set the quantum, passing the value directly.
    pub fn tell_quantum(&self, value: i32) -> Result<(), DeviceError> {
        self.expect_ack(Request::TellQuantum(value))
    }

    /// Set the quantum, passing the value through a pointer.
    pub fn set_quantum(&self, value: i32) -> Result<(), DeviceError> {
        self.expect_ack(Request::SetQuantum(value))
    }

    /// Atomically replace the quantum; returns the previous value.
    pub fn exchange_quantum(&self, value: i32) -> Result<i32, DeviceError> {
        self.expect_quantum(Request::ExchangeQuantum(value))
    }

    /// Shift the quantum by `value`; returns the value before the shift.
    pub fn shift_quantum(&self, value: i32) -> Result<i32, DeviceError> {
        self.expect_quantum(Request::ShiftQuantum(value))
    }

    /// Describe the calling thread or process.
    pub fn describe_caller(&self) -> Result<TaskDescriptor, DeviceError> {
        match self.call(Request::DescribeCaller)? {
            Reply::Task(task) => Ok(task),
            _ => Err(DeviceError::UnexpectedReply {
                op: Opcode::DescribeCaller,
            }),
        }
    }
}

impl<C: ControlChannel> Drop for Session<C> {
    fn drop(&mut self) {
        let Some(channel) = self.channel.take() else {
            return;
        };
        tracing::warn!(device = %self.label, "device session dropped without release");
        if let Err(err) = channel.close() {
            tracing::warn!(device = %self.label, error = %err, "device close failed on drop");
        }
    }
}
