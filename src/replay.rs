//! Readers for whitespace-delimited sample files.
//!
//! Two line layouts are supported:
//!
//! ```text
//! # epoch_seconds value
//! 1262304000 12.5
//! 1262304000.5 12.7
//!
//! # terminal value [epoch_seconds]
//! east 0.12 1262304000
//! north -0.03
//! ```
//!
//! Blank lines and lines starting with `#` are skipped. A malformed line
//! yields a [`SigCondError::Parse`] carrying its 1-based line number; the
//! iterator keeps going afterwards so callers can report and continue.

use crate::error::{Result, SigCondError};
use chrono::{DateTime, SecondsFormat, Utc};
use std::fs::File;
use std::io::{BufRead, BufReader, Lines};
use std::path::Path;

/// A detector observation.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Sample {
    pub timestamp_ms: i64,
    pub value: f64,
}

/// A value destined for a named terminal.
#[derive(Debug, Clone, PartialEq)]
pub struct TerminalSample {
    pub terminal: String,
    pub value: f64,
    pub timestamp_ms: Option<i64>,
}

type LineParser<T> = fn(&str) -> std::result::Result<T, String>;

/// Iterator over the records of a sample file, yielding `(line number, record)`.
pub struct Records<R, T> {
    lines: Lines<R>,
    line_no: usize,
    parse: LineParser<T>,
}

impl<R: BufRead, T> Iterator for Records<R, T> {
    type Item = Result<(usize, T)>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let line = match self.lines.next()? {
                Ok(line) => line,
                Err(e) => return Some(Err(e.into())),
            };
            self.line_no += 1;

            let trimmed = line.trim();
            if trimmed.is_empty() || trimmed.starts_with('#') {
                continue;
            }

            return Some(
                (self.parse)(trimmed)
                    .map(|record| (self.line_no, record))
                    .map_err(|message| SigCondError::Parse {
                        line: self.line_no,
                        message,
                    }),
            );
        }
    }
}

/// `epoch_seconds value` records.
pub fn samples<R: BufRead>(reader: R) -> Records<R, Sample> {
    Records {
        lines: reader.lines(),
        line_no: 0,
        parse: parse_sample,
    }
}

/// `terminal value [epoch_seconds]` records.
pub fn terminal_samples<R: BufRead>(reader: R) -> Records<R, TerminalSample> {
    Records {
        lines: reader.lines(),
        line_no: 0,
        parse: parse_terminal_sample,
    }
}

/// Open a file for one of the record readers.
pub fn open(path: impl AsRef<Path>) -> Result<BufReader<File>> {
    let path = path.as_ref();
    let file = File::open(path).map_err(|e| {
        SigCondError::Io(std::io::Error::new(
            e.kind(),
            format!("failed to open {:?}: {}", path, e),
        ))
    })?;
    Ok(BufReader::new(file))
}

fn parse_sample(line: &str) -> std::result::Result<Sample, String> {
    let mut fields = line.split_whitespace();
    let (Some(time), Some(value), None) = (fields.next(), fields.next(), fields.next()) else {
        return Err(format!("expected 'epoch_seconds value', got '{line}'"));
    };
    Ok(Sample {
        timestamp_ms: parse_epoch_seconds(time)?,
        value: parse_value(value)?,
    })
}

fn parse_terminal_sample(line: &str) -> std::result::Result<TerminalSample, String> {
    let fields: Vec<&str> = line.split_whitespace().collect();
    let (terminal, value, time) = match fields.as_slice() {
        [terminal, value] => (terminal, value, None),
        [terminal, value, time] => (terminal, value, Some(time)),
        _ => {
            return Err(format!(
                "expected 'terminal value [epoch_seconds]', got '{line}'"
            ))
        }
    };
    Ok(TerminalSample {
        terminal: terminal.to_string(),
        value: parse_value(value)?,
        timestamp_ms: time.map(|t| parse_epoch_seconds(t)).transpose()?,
    })
}

fn parse_value(field: &str) -> std::result::Result<f64, String> {
    let value = field
        .parse::<f64>()
        .map_err(|e| format!("invalid value '{field}': {e}"))?;
    if !value.is_finite() {
        return Err(format!("non-finite value '{field}'"));
    }
    Ok(value)
}

fn parse_epoch_seconds(field: &str) -> std::result::Result<i64, String> {
    let secs = field
        .parse::<f64>()
        .map_err(|e| format!("invalid timestamp '{field}': {e}"))?;
    if !secs.is_finite() {
        return Err(format!("invalid timestamp '{field}'"));
    }
    Ok((secs * 1000.0).round() as i64)
}

/// Render epoch milliseconds as RFC 3339 (UTC), falling back to the raw number.
pub fn format_timestamp(timestamp_ms: i64) -> String {
    DateTime::<Utc>::from_timestamp_millis(timestamp_ms)
        .map(|t| t.to_rfc3339_opts(SecondsFormat::Millis, true))
        .unwrap_or_else(|| format!("{timestamp_ms}ms"))
}
