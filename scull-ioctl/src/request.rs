//! Control requests and their ioctl encoding.
//!
//! Request numbers follow the Linux `_IOC` layout: 8 bits of command number,
//! 8 bits of type (the driver's magic), 14 bits of argument size and 2 bits
//! of direction.

use std::fmt;
use std::mem::size_of;

use serde::Serialize;

use crate::task::{RawTaskInfo, TaskDescriptor};

/// Magic number of the scull driver.
pub const SCULL_IOC_MAGIC: u8 = b'k';

const IOC_NRSHIFT: u32 = 0;
const IOC_TYPESHIFT: u32 = 8;
const IOC_SIZESHIFT: u32 = 16;
const IOC_DIRSHIFT: u32 = 30;

const IOC_NONE: u32 = 0;
const IOC_WRITE: u32 = 1;
const IOC_READ: u32 = 2;

const fn ioc(dir: u32, nr: u8, size: usize) -> libc::c_ulong {
    ((dir << IOC_DIRSHIFT)
        | ((SCULL_IOC_MAGIC as u32) << IOC_TYPESHIFT)
        | ((nr as u32) << IOC_NRSHIFT)
        | ((size as u32) << IOC_SIZESHIFT)) as libc::c_ulong
}

/// One entry of the device control interface.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Opcode {
    Reset,
    SetQuantum,
    TellQuantum,
    GetQuantum,
    QueryQuantum,
    ExchangeQuantum,
    ShiftQuantum,
    DescribeCaller,
}

impl Opcode {
    /// All opcodes, in request-number order.
    pub const ALL: [Opcode; 8] = [
        Opcode::Reset,
        Opcode::SetQuantum,
        Opcode::TellQuantum,
        Opcode::GetQuantum,
        Opcode::QueryQuantum,
        Opcode::ExchangeQuantum,
        Opcode::ShiftQuantum,
        Opcode::DescribeCaller,
    ];

    /// The encoded ioctl request number.
    pub const fn request(self) -> libc::c_ulong {
        let int = size_of::<libc::c_int>();
        match self {
            Opcode::Reset => ioc(IOC_NONE, 0, 0),
            Opcode::SetQuantum => ioc(IOC_WRITE, 1, int),
            Opcode::TellQuantum => ioc(IOC_NONE, 3, 0),
            Opcode::GetQuantum => ioc(IOC_READ, 5, int),
            Opcode::QueryQuantum => ioc(IOC_NONE, 7, 0),
            Opcode::ExchangeQuantum => ioc(IOC_READ | IOC_WRITE, 9, int),
            Opcode::ShiftQuantum => ioc(IOC_NONE, 11, 0),
            Opcode::DescribeCaller => ioc(IOC_READ, 13, size_of::<RawTaskInfo>()),
        }
    }

    /// Protocol name of the opcode.
    pub const fn name(self) -> &'static str {
        match self {
            Opcode::Reset => "RESET",
            Opcode::SetQuantum => "SET_QUANTUM",
            Opcode::TellQuantum => "TELL_QUANTUM",
            Opcode::GetQuantum => "GET_QUANTUM",
            Opcode::QueryQuantum => "QUERY_QUANTUM",
            Opcode::ExchangeQuantum => "EXCHANGE_QUANTUM",
            Opcode::ShiftQuantum => "SHIFT_QUANTUM",
            Opcode::DescribeCaller => "DESCRIBE_CALLER",
        }
    }
}

impl fmt::Display for Opcode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A control request together with its payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Request {
    Reset,
    GetQuantum,
    QueryQuantum,
    TellQuantum(i32),
    SetQuantum(i32),
    ExchangeQuantum(i32),
    ShiftQuantum(i32),
    DescribeCaller,
}

impl Request {
    pub fn opcode(&self) -> Opcode {
        match self {
            Request::Reset => Opcode::Reset,
            Request::GetQuantum => Opcode::GetQuantum,
            Request::QueryQuantum => Opcode::QueryQuantum,
            Request::TellQuantum(_) => Opcode::TellQuantum,
            Request::SetQuantum(_) => Opcode::SetQuantum,
            Request::ExchangeQuantum(_) => Opcode::ExchangeQuantum,
            Request::ShiftQuantum(_) => Opcode::ShiftQuantum,
            Request::DescribeCaller => Opcode::DescribeCaller,
        }
    }
}

/// The device's answer to a [`Request`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Reply {
    /// Request accepted, nothing returned.
    Ack,
    /// A quantum value (current or previous, depending on the request).
    Quantum(i32),
    /// Snapshot of the calling task.
    Task(TaskDescriptor),
}
