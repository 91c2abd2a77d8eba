//! Output formatting

use chrono::{DateTime, SecondsFormat};
use console::{style, StyledObject, Term};
use locator_genome::Trend;
use serde::Serialize;

use crate::error::CliResult;

/// Output format for command results
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OutputFormat {
    /// Human-readable text
    #[default]
    Text,
    /// JSON output
    Json,
}

/// Writes command results to stdout
#[derive(Debug)]
pub struct Printer {
    term: Term,
    format: OutputFormat,
    quiet: bool,
}

impl Printer {
    /// Create a printer on stdout
    #[must_use]
    pub fn new(format: OutputFormat, quiet: bool) -> Self {
        Self {
            term: Term::stdout(),
            format,
            quiet,
        }
    }

    /// Selected output format
    #[must_use]
    pub const fn format(&self) -> OutputFormat {
        self.format
    }

    /// Print rendered text, unless quiet
    pub fn text(&self, rendered: &str) -> CliResult<()> {
        if self.quiet {
            return Ok(());
        }
        self.term.write_str(rendered)?;
        self.term.flush()?;
        Ok(())
    }

    /// Print a value as pretty JSON; quiet does not apply
    pub fn json<T: Serialize + ?Sized>(&self, value: &T) -> CliResult<()> {
        let json = serde_json::to_string_pretty(value)?;
        self.term.write_line(&json)?;
        Ok(())
    }

    /// Print JSON or the text renderer's output depending on the format
    pub fn emit<T, F>(&self, value: &T, render: F) -> CliResult<()>
    where
        T: Serialize + ?Sized,
        F: FnOnce(&T) -> String,
    {
        match self.format {
            OutputFormat::Json => self.json(value),
            OutputFormat::Text => self.text(&render(value)),
        }
    }
}

/// Section header line
#[must_use]
pub fn header(title: &str) -> String {
    format!("{}\n", style(title).bold().underlined())
}

/// Indented `label: value` line
#[must_use]
pub fn field(label: &str, value: impl std::fmt::Display) -> String {
    format!("  {:<20} {value}\n", style(format!("{label}:")).dim())
}

/// Score colored by band
#[must_use]
pub fn score(value: f64) -> StyledObject<String> {
    let text = format!("{value:.3}");
    if value >= 0.7 {
        style(text).green()
    } else if value >= 0.4 {
        style(text).yellow()
    } else {
        style(text).red()
    }
}

/// Trend colored by direction
#[must_use]
pub fn trend(value: Trend) -> StyledObject<String> {
    let text = value.to_string();
    match value {
        Trend::Improving => style(text).green(),
        Trend::Stable => style(text).cyan(),
        Trend::Degrading => style(text).yellow(),
        Trend::Volatile => style(text).red(),
    }
}

/// Millisecond timestamp as RFC 3339 UTC
#[must_use]
pub fn timestamp(ms: u64) -> String {
    i64::try_from(ms)
        .ok()
        .and_then(DateTime::from_timestamp_millis)
        .map_or_else(
            || ms.to_string(),
            |dt| dt.to_rfc3339_opts(SecondsFormat::Secs, true),
        )
}
