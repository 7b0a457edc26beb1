//! The request/response seam between a session and the device.

use std::io;

use crate::request::{Reply, Request};

/// A request/response channel to a scull-like device.
///
/// Implementations must be callable concurrently from several threads;
/// the device is expected to serialize its own state.
pub trait ControlChannel: Send + Sync {
    /// Issue one request and wait for the reply.
    fn call(&self, request: Request) -> io::Result<Reply>;

    /// Close the channel. Called exactly once by [`Session::release`].
    ///
    /// [`Session::release`]: crate::Session::release
    fn close(self) -> io::Result<()>
    where
        Self: Sized;
}
