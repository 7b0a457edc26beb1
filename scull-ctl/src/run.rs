//! Invocation orchestration: acquire, execute, release.

use std::io::{self, Write};

use anyhow::{Context, Result};
use scull_ioctl::{ControlChannel, Session};

use crate::args::Args;
use crate::command::{self, Command, Invocation};
use crate::dispatch;
use crate::fanout::{self, FanOutReport, WorkerStatus};
use crate::output::Format;

/// Exit code for argument errors caught after clap.
pub const EXIT_USAGE: i32 = 2;

/// Run one invocation.
///
/// Returns the exit code to use.
pub fn run(args: Args) -> Result<i32> {
    let format = Format::from_json_flag(args.json);

    let command = match command::resolve(args.verb, args.value) {
        Ok(Invocation::Help) => {
            print!("{}", command::usage("scullctl"));
            return Ok(0);
        }
        Ok(Invocation::Run(command)) => command,
        Err(err) => {
            eprintln!("scullctl: {err}");
            eprint!("{}", command::usage("scullctl"));
            return Ok(EXIT_USAGE);
        }
    };

    let session = Session::acquire(&args.device)
        .with_context(|| format!("failed to open device {}", args.device.display()))?;

    let mut stdout = io::stdout();
    execute(session, command, format, &mut stdout)?;
    Ok(0)
}

/// Run `command` on an acquired session and release it.
///
/// The session is released exactly once whether the command succeeds or
/// fails. A release failure after a successful command is an error too.
pub fn execute<C, W>(session: Session<C>, command: Command, format: Format, out: &mut W) -> Result<()>
where
    C: ControlChannel,
    W: Write,
{
    let device = session.label().to_string();
    tracing::info!(%device, %command, fan_out = command.is_fan_out(), "device opened");
    format.write_note(out, &format!("Device ({device}) opened"))?;

    let outcome = perform(&session, command, format, out);
    let released = session.release();

    match (outcome, released) {
        (Ok(()), Ok(())) => {
            format.write_note(out, &format!("Device ({device}) closed"))?;
            out.flush()?;
            Ok(())
        }
        (Ok(()), Err(err)) => Err(err).with_context(|| format!("failed to close device {device}")),
        (Err(err), released) => {
            if let Err(close_err) = released {
                tracing::error!(%device, error = %close_err, "device close failed after error");
            }
            Err(err)
        }
    }
}

fn perform<C, W>(session: &Session<C>, command: Command, format: Format, out: &mut W) -> Result<()>
where
    C: ControlChannel,
    W: Write,
{
    let report = match command {
        Command::ForkFanOut { count } => {
            out.flush()?;
            fanout::fork_fan_out(count, format, |_| session.describe_caller())
        }
        Command::ThreadFanOut { count } => {
            fanout::thread_fan_out(count, |_| session.describe_caller())
        }
        _ => {
            let report = dispatch::execute(session, command)
                .with_context(|| format!("{command} failed"))?;
            format.write_line(out, &report)?;
            return Ok(());
        }
    };

    write_fan_out(report, format, out)
}

/// Print what the orchestrator collected, then turn failures into an error.
///
/// Process workers print their own descriptors; only thread results are
/// printed here.
fn write_fan_out<W: Write>(report: FanOutReport, format: Format, out: &mut W) -> Result<()> {
    for record in &report.workers {
        match &record.status {
            WorkerStatus::Described { .. } => format.write_line(out, record)?,
            status if !status.is_success() => {
                tracing::warn!(ordinal = record.ordinal, "{record}");
            }
            _ => {}
        }
    }

    tracing::info!(
        model = %report.model,
        spawned = report.workers.len(),
        failed = report.failed(),
        "fan-out complete"
    );
    report.into_result()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use scull_ioctl::Opcode;
    use scull_ioctl::fake::{DEFAULT_QUANTUM, MemoryDevice};

    fn run_fake(probe: &MemoryDevice, command: Command, format: Format) -> (Result<()>, String) {
        let session = Session::new(probe.clone(), "memory");
        let mut out = Vec::new();
        let result = execute(session, command, format, &mut out);
        (result, String::from_utf8(out).unwrap())
    }

    #[test]
    fn test_control_verb_output() {
        let probe = MemoryDevice::with_quantum(10);
        let (result, out) = run_fake(&probe, Command::ExchangeQuantum(20), Format::Text);

        result.unwrap();
        assert_eq!(
            out,
            "Device (memory) opened\nQuantum exchanged, old quantum: 10\nDevice (memory) closed\n"
        );
        assert_eq!(probe.closes(), 1);
    }

    #[test]
    fn test_json_output_is_one_object() {
        let probe = MemoryDevice::new();
        let (result, out) = run_fake(&probe, Command::GetQuantum, Format::Json);

        result.unwrap();
        let value: serde_json::Value = serde_json::from_str(out.trim()).unwrap();
        assert_eq!(value["value"], DEFAULT_QUANTUM);
    }

    #[test]
    fn test_release_once_on_rejection() {
        let probe = MemoryDevice::new();
        probe.reject(Opcode::Reset);

        let (result, out) = run_fake(&probe, Command::Reset, Format::Text);

        let err = result.unwrap_err();
        assert!(format!("{err:#}").contains("RESET rejected"));
        assert!(!out.contains("closed"));
        assert_eq!(probe.closes(), 1);
    }

    #[test]
    fn test_thread_fan_out_prints_every_worker() {
        let probe = MemoryDevice::new();
        let (result, out) = run_fake(&probe, Command::ThreadFanOut { count: 3 }, Format::Text);

        result.unwrap();
        let lines: Vec<_> = out.lines().filter(|l| l.starts_with("state ")).collect();
        assert_eq!(lines.len(), 3);
        assert_eq!(probe.closes(), 1);
    }

    #[test]
    fn test_thread_fan_out_failure_releases_once() {
        let probe = MemoryDevice::new();
        probe.reject(Opcode::DescribeCaller);

        let (result, _) = run_fake(&probe, Command::ThreadFanOut { count: 4 }, Format::Text);

        let err = result.unwrap_err();
        assert!(err.to_string().contains("4 of 4 workers failed"));
        assert_eq!(probe.calls(), 4);
        assert_eq!(probe.closes(), 1);
    }

    #[test]
    fn test_process_fan_out_releases_once_in_parent() {
        let probe = MemoryDevice::new();
        let (result, out) = run_fake(&probe, Command::ForkFanOut { count: 3 }, Format::Text);

        result.unwrap();
        // Children print straight to the process stdout, not to `out`.
        assert!(!out.contains("state "));
        assert_eq!(probe.closes(), 1);
    }

    #[test]
    fn test_process_fan_out_failure_is_aggregated() {
        let probe = MemoryDevice::new();
        probe.reject(Opcode::DescribeCaller);

        let (result, _) = run_fake(&probe, Command::ForkFanOut { count: 2 }, Format::Text);

        let err = result.unwrap_err();
        assert!(err.to_string().contains("2 of 2 workers failed"));
        assert_eq!(probe.closes(), 1);
    }

    #[test]
    fn test_zero_worker_fan_out_succeeds() {
        let probe = MemoryDevice::new();
        let (result, _) = run_fake(&probe, Command::ForkFanOut { count: 0 }, Format::Text);
        result.unwrap();
        assert_eq!(probe.calls(), 0);
        assert_eq!(probe.closes(), 1);
    }
}
