//! Single-verb control requests.

use std::fmt;

use scull_ioctl::{ControlChannel, DeviceError, Session};
use serde::Serialize;

use crate::command::Command;

/// Outcome of one successful control verb.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "result", rename_all = "snake_case")]
pub enum Report {
    Reset,
    Quantum { value: i32 },
    QuantumSet,
    Exchanged { old: i32 },
    Shifted { old: i32 },
}

impl fmt::Display for Report {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Report::Reset => f.write_str("Quantum reset"),
            Report::Quantum { value } => write!(f, "Quantum: {value}"),
            Report::QuantumSet => f.write_str("Quantum set"),
            Report::Exchanged { old } => write!(f, "Quantum exchanged, old quantum: {old}"),
            Report::Shifted { old } => write!(f, "Quantum shifted, old quantum: {old}"),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum DispatchError {
    #[error(transparent)]
    Device(#[from] DeviceError),

    #[error("{0} is a fan-out command, not a control verb")]
    NotAControlVerb(Command),
}

/// Run one control verb against the session.
///
/// Failures are returned as-is; nothing is retried.
pub fn execute<C: ControlChannel>(
    session: &Session<C>,
    command: Command,
) -> Result<Report, DispatchError> {
    let report = match command {
        Command::Reset => {
            session.reset()?;
            Report::Reset
        }
        Command::GetQuantum => Report::Quantum {
            value: session.get_quantum()?,
        },
        Command::QueryQuantum => Report::Quantum {
            value: session.query_quantum()?,
        },
        Command::TellQuantum(value) => {
            session.tell_quantum(value)?;
            Report::QuantumSet
        }
        Command::SetQuantum(value) => {
            session.set_quantum(value)?;
            Report::QuantumSet
        }
        Command::ExchangeQuantum(value) => Report::Exchanged {
            old: session.exchange_quantum(value)?,
        },
        Command::ShiftQuantum(value) => Report::Shifted {
            old: session.shift_quantum(value)?,
        },
        Command::ForkFanOut { .. } | Command::ThreadFanOut { .. } => {
            return Err(DispatchError::NotAControlVerb(command));
        }
    };

    tracing::info!(device = session.label(), %command, "control verb done");
    Ok(report)
}
