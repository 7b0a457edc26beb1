//! Device error types.

use std::io;
use std::path::PathBuf;

use crate::request::Opcode;

/// Errors that can occur while talking to the device or managing workers.
#[derive(Debug, thiserror::Error)]
pub enum DeviceError {
    /// The character device could not be opened.
    #[error("cannot open {}: {source}", path.display())]
    Open {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// close() on the device failed.
    #[error("cannot close device: {0}")]
    Close(#[source] io::Error),

    /// The device refused a control request.
    #[error("{op} rejected by device: {source}")]
    Rejected {
        op: Opcode,
        #[source]
        source: io::Error,
    },

    /// The channel answered a request with a reply of the wrong kind.
    #[error("{op} returned an unexpected reply")]
    UnexpectedReply { op: Opcode },

    /// The session's channel was already closed.
    #[error("{op} issued on a released session")]
    Released { op: Opcode },

    /// fork() failed.
    #[error("fork failed: {0}")]
    Fork(#[source] io::Error),

    /// waitpid() failed.
    #[error("waitpid failed: {0}")]
    Wait(#[source] io::Error),
}

impl DeviceError {
    /// The opcode of a rejected or malformed request, if any.
    pub fn opcode(&self) -> Option<Opcode> {
        match self {
            DeviceError::Rejected { op, .. }
            | DeviceError::UnexpectedReply { op }
            | DeviceError::Released { op } => Some(*op),
            _ => None,
        }
    }
}
