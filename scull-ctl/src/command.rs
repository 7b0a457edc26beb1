//! Typed commands built from parsed arguments.

use std::fmt;

use crate::args::Verb;

/// What one invocation asks for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Invocation {
    /// Print usage and exit without touching the device.
    Help,
    /// Open the device and run a command.
    Run(Command),
}

/// Exactly one control verb or fan-out per invocation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    Reset,
    GetQuantum,
    QueryQuantum,
    TellQuantum(i32),
    SetQuantum(i32),
    ExchangeQuantum(i32),
    ShiftQuantum(i32),
    ForkFanOut { count: usize },
    ThreadFanOut { count: usize },
}

impl Command {
    /// True for the multi-worker commands.
    pub fn is_fan_out(&self) -> bool {
        matches!(self, Command::ForkFanOut { .. } | Command::ThreadFanOut { .. })
    }
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Command::Reset => f.write_str("reset"),
            Command::GetQuantum => f.write_str("get quantum"),
            Command::QueryQuantum => f.write_str("query quantum"),
            Command::TellQuantum(v) => write!(f, "tell quantum {v}"),
            Command::SetQuantum(v) => write!(f, "set quantum {v}"),
            Command::ExchangeQuantum(v) => write!(f, "exchange quantum {v}"),
            Command::ShiftQuantum(v) => write!(f, "shift quantum {v}"),
            Command::ForkFanOut { count } => write!(f, "process fan-out x{count}"),
            Command::ThreadFanOut { count } => write!(f, "thread fan-out x{count}"),
        }
    }
}

/// Argument errors detected before the device is opened.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum CommandError {
    #[error("missing quantum")]
    MissingQuantum,

    #[error("quantum {0} does not fit in a 32-bit integer")]
    QuantumOutOfRange(i64),

    #[error("missing {0} number")]
    MissingCount(&'static str),

    #[error("invalid {kind} number {value}")]
    InvalidCount { kind: &'static str, value: i64 },
}

/// Combine the verb and its optional integer into an [`Invocation`].
///
/// Extra values on verbs that take none are ignored.
pub fn resolve(verb: Verb, value: Option<i64>) -> Result<Invocation, CommandError> {
    let command = match verb {
        Verb::Help => return Ok(Invocation::Help),
        Verb::Reset => Command::Reset,
        Verb::Get => Command::GetQuantum,
        Verb::Query => Command::QueryQuantum,
        Verb::Tell => Command::TellQuantum(quantum(value)?),
        Verb::Set => Command::SetQuantum(quantum(value)?),
        Verb::Exchange => Command::ExchangeQuantum(quantum(value)?),
        Verb::Shift => Command::ShiftQuantum(quantum(value)?),
        Verb::Processes => Command::ForkFanOut {
            count: count("process", value)?,
        },
        Verb::Threads => Command::ThreadFanOut {
            count: count("thread", value)?,
        },
    };
    Ok(Invocation::Run(command))
}

fn quantum(value: Option<i64>) -> Result<i32, CommandError> {
    let value = value.ok_or(CommandError::MissingQuantum)?;
    i32::try_from(value).map_err(|_| CommandError::QuantumOutOfRange(value))
}

fn count(kind: &'static str, value: Option<i64>) -> Result<usize, CommandError> {
    let value = value.ok_or(CommandError::MissingCount(kind))?;
    usize::try_from(value).map_err(|_| CommandError::InvalidCount { kind, value })
}

/// Usage text listing every verb.
pub fn usage(program: &str) -> String {
    format!(
        "Usage: {program} [--device PATH] [--json] [-v] <command>\n\
         Commands:\n\
         \x20 R          Reset quantum\n\
         \x20 S <int>    Set quantum\n\
         \x20 T <int>    Tell quantum\n\
         \x20 G          Get quantum\n\
         \x20 Q          Query quantum\n\
         \x20 X <int>    Exchange quantum\n\
         \x20 H <int>    Shift quantum\n\
         \x20 p <int>    Describe callers from <int> worker processes\n\
         \x20 t <int>    Describe callers from <int> worker threads\n\
         \x20 h          Print this message\n"
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plain_verbs() {
        assert_eq!(resolve(Verb::Reset, None), Ok(Invocation::Run(Command::Reset)));
        assert_eq!(resolve(Verb::Get, None), Ok(Invocation::Run(Command::GetQuantum)));
        assert_eq!(resolve(Verb::Query, Some(9)), Ok(Invocation::Run(Command::QueryQuantum)));
        assert_eq!(resolve(Verb::Help, None), Ok(Invocation::Help));
    }

    #[test]
    fn test_quantum_verbs_carry_value() {
        assert_eq!(resolve(Verb::Tell, Some(5)), Ok(Invocation::Run(Command::TellQuantum(5))));
        assert_eq!(resolve(Verb::Set, Some(-5)), Ok(Invocation::Run(Command::SetQuantum(-5))));
        assert_eq!(
            resolve(Verb::Exchange, Some(7)),
            Ok(Invocation::Run(Command::ExchangeQuantum(7)))
        );
        assert_eq!(resolve(Verb::Shift, Some(1)), Ok(Invocation::Run(Command::ShiftQuantum(1))));
    }

    #[test]
    fn test_missing_quantum() {
        for verb in [Verb::Tell, Verb::Set, Verb::Exchange, Verb::Shift] {
            assert_eq!(resolve(verb, None), Err(CommandError::MissingQuantum));
        }
    }

    #[test]
    fn test_quantum_out_of_range() {
        let too_big = i64::from(i32::MAX) + 1;
        assert_eq!(
            resolve(Verb::Set, Some(too_big)),
            Err(CommandError::QuantumOutOfRange(too_big))
        );
    }

    #[test]
    fn test_fan_out_counts() {
        assert_eq!(
            resolve(Verb::Processes, Some(0)),
            Ok(Invocation::Run(Command::ForkFanOut { count: 0 }))
        );
        assert_eq!(
            resolve(Verb::Threads, Some(12)),
            Ok(Invocation::Run(Command::ThreadFanOut { count: 12 }))
        );
    }

    #[test]
    fn test_negative_count_rejected() {
        assert_eq!(
            resolve(Verb::Processes, Some(-1)),
            Err(CommandError::InvalidCount {
                kind: "process",
                value: -1
            })
        );
        assert_eq!(
            resolve(Verb::Threads, Some(-3)).unwrap_err().to_string(),
            "invalid thread number -3"
        );
    }

    #[test]
    fn test_missing_count_rejected() {
        assert_eq!(
            resolve(Verb::Threads, None),
            Err(CommandError::MissingCount("thread"))
        );
        assert_eq!(
            resolve(Verb::Processes, None).unwrap_err().to_string(),
            "missing process number"
        );
    }

    #[test]
    fn test_is_fan_out() {
        assert!(Command::ForkFanOut { count: 1 }.is_fan_out());
        assert!(Command::ThreadFanOut { count: 1 }.is_fan_out());
        assert!(!Command::ShiftQuantum(1).is_fan_out());
    }

    #[test]
    fn test_usage_lists_every_verb() {
        let text = usage("scullctl");
        assert!(text.starts_with("Usage: scullctl"));
        for letter in ["R ", "S <int>", "T <int>", "G ", "Q ", "X <int>", "H <int>", "p <int>", "t <int>", "h "] {
            assert!(text.contains(&format!("  {letter}")), "usage is missing {letter}");
        }
    }
}
