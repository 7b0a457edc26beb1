//! CLI argument parsing.

use clap::{Parser, ValueEnum};
use scull_ioctl::DEFAULT_DEVICE;
use std::path::PathBuf;

/// scullctl - issue control requests and fan-out queries to the scull device.
#[derive(Parser, Debug)]
#[command(name = "scullctl", version)]
pub struct Args {
    /// Character device to open
    #[arg(long, env = "SCULL_DEVICE", value_name = "PATH", default_value = DEFAULT_DEVICE)]
    pub device: PathBuf,

    /// Print results as JSON lines
    #[arg(long)]
    pub json: bool,

    /// Enable debug logging (RUST_LOG takes precedence)
    #[arg(short, long)]
    pub verbose: bool,

    /// Command letter
    #[arg(value_enum, hide_possible_values = true)]
    pub verb: Verb,

    /// Quantum for T/S/X/H, worker count for p/t
    #[arg(allow_negative_numbers = true, value_name = "INT")]
    pub value: Option<i64>,
}

/// Single-letter commands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Verb {
    /// Reset quantum
    #[value(name = "R")]
    Reset,
    /// Get quantum
    #[value(name = "G")]
    Get,
    /// Query quantum
    #[value(name = "Q")]
    Query,
    /// Tell quantum
    #[value(name = "T")]
    Tell,
    /// Set quantum
    #[value(name = "S")]
    Set,
    /// Exchange quantum
    #[value(name = "X")]
    Exchange,
    /// Shift quantum
    #[value(name = "H")]
    Shift,
    /// Describe callers from worker processes
    #[value(name = "p")]
    Processes,
    /// Describe callers from worker threads
    #[value(name = "t")]
    Threads,
    /// Print usage
    #[value(name = "h")]
    Help,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse_args(args: &[&str]) -> Result<Args, clap::Error> {
        Args::try_parse_from(args)
    }

    #[test]
    fn test_verb_only() {
        let args = parse_args(&["scullctl", "G"]).unwrap();
        assert_eq!(args.verb, Verb::Get);
        assert_eq!(args.value, None);
        assert!(!args.json);
    }

    #[test]
    fn test_verb_with_value() {
        let args = parse_args(&["scullctl", "X", "250"]).unwrap();
        assert_eq!(args.verb, Verb::Exchange);
        assert_eq!(args.value, Some(250));
    }

    #[test]
    fn test_negative_value_is_not_a_flag() {
        let args = parse_args(&["scullctl", "S", "-12"]).unwrap();
        assert_eq!(args.verb, Verb::Set);
        assert_eq!(args.value, Some(-12));
    }

    #[test]
    fn test_letters_are_case_sensitive() {
        assert_eq!(parse_args(&["scullctl", "h"]).unwrap().verb, Verb::Help);
        assert_eq!(parse_args(&["scullctl", "H", "1"]).unwrap().verb, Verb::Shift);
        assert_eq!(parse_args(&["scullctl", "t", "3"]).unwrap().verb, Verb::Threads);
        assert_eq!(parse_args(&["scullctl", "T", "3"]).unwrap().verb, Verb::Tell);
        assert_eq!(parse_args(&["scullctl", "p", "2"]).unwrap().verb, Verb::Processes);
    }

    #[test]
    fn test_device_and_flags() {
        let args = parse_args(&["scullctl", "--device", "/dev/scull1", "--json", "-v", "Q"]).unwrap();
        assert_eq!(args.device, PathBuf::from("/dev/scull1"));
        assert!(args.json);
        assert!(args.verbose);
        assert_eq!(args.verb, Verb::Query);
    }

    #[test]
    fn test_unknown_verb_fails() {
        assert!(parse_args(&["scullctl", "Z"]).is_err());
        assert!(parse_args(&["scullctl", "g"]).is_err());
    }

    #[test]
    fn test_non_numeric_value_fails() {
        assert!(parse_args(&["scullctl", "S", "ten"]).is_err());
    }

    #[test]
    fn test_missing_verb_fails() {
        assert!(parse_args(&["scullctl"]).is_err());
    }
}
