//! Result rendering on stdout.

use std::fmt::Display;
use std::io::{self, Write};

use serde::Serialize;

/// How results are printed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Format {
    /// One human-readable line per result.
    Text,
    /// One JSON object per line.
    Json,
}

impl Format {
    pub fn from_json_flag(json: bool) -> Self {
        if json { Format::Json } else { Format::Text }
    }

    /// Write `item` as a single line.
    pub fn write_line<W, T>(self, out: &mut W, item: &T) -> io::Result<()>
    where
        W: Write + ?Sized,
        T: Display + Serialize,
    {
        match self {
            Format::Text => writeln!(out, "{item}"),
            Format::Json => {
                serde_json::to_writer(&mut *out, item)?;
                out.write_all(b"\n")
            }
        }
    }

    /// Write an informational line. Suppressed in JSON mode so stdout stays parseable.
    pub fn write_note<W: Write + ?Sized>(self, out: &mut W, note: &str) -> io::Result<()> {
        match self {
            Format::Text => writeln!(out, "{note}"),
            Format::Json => Ok(()),
        }
    }
}
