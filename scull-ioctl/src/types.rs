//! Core types shared by the session and worker primitives.

use std::fmt;

use serde::Serialize;

/// Process ID of a forked worker.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct Pid(pub i32);

impl Pid {
    /// Create a new Pid.
    pub fn new(pid: i32) -> Self {
        Self(pid)
    }

    /// Get the raw pid value.
    pub fn as_raw(&self) -> i32 {
        self.0
    }
}

impl fmt::Display for Pid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
