//! Output formatting for the CLI subcommands.
//!
//! Every renderer returns a `String` so the commands stay testable; `main`
//! decides where it goes.

use std::fmt::Write as _;

use chrono::{DateTime, Utc};
use clap::ValueEnum;
use serde::Serialize;

use globalindex_lib::{OutputStream, Record, RunOutcome, RunResult};

use crate::terminal::{format_value, ColorPalette};

/// Output format selected with `--format`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// Human-readable table.
    #[default]
    Text,
    /// Pretty-printed JSON, the same shape the HTTP API returns.
    Json,
}

/// Render records as a table or as the API's JSON array.
pub fn render_records(
    records: &[Record],
    format: OutputFormat,
    palette: &ColorPalette,
) -> serde_json::Result<String> {
    match format {
        OutputFormat::Json => serde_json::to_string_pretty(records),
        OutputFormat::Text => Ok(records_table(records, palette)),
    }
}

fn records_table(records: &[Record], p: &ColorPalette) -> String {
    let mut out = String::new();
    let _ = writeln!(
        out,
        "{}{:<8} {:<24} {:>6} {:>22}{}",
        p.white_bold, "Country", "Indicator", "Year", "Value", p.reset
    );
    for record in records {
        let _ = writeln!(
            out,
            "{}{:<8}{} {:<24} {:>6} {:>22}",
            p.cyan,
            record.country_code,
            p.reset,
            record.indicator_code,
            record.year,
            format_value(record.value)
        );
    }
    let noun = if records.len() == 1 { "record" } else { "records" };
    let _ = write!(out, "{}{} {noun}{}", p.gray, records.len(), p.reset);
    out
}

/// Render a finished refresh run: captured output, then a status line.
pub fn render_run(
    result: &RunResult,
    format: OutputFormat,
    palette: &ColorPalette,
) -> serde_json::Result<String> {
    match format {
        OutputFormat::Json => serde_json::to_string_pretty(result),
        OutputFormat::Text => Ok(run_text(result, palette)),
    }
}

fn run_text(result: &RunResult, p: &ColorPalette) -> String {
    let mut out = String::new();
    for line in &result.output {
        match line.stream {
            OutputStream::Stdout => {
                let _ = writeln!(out, "{}", line.line);
            }
            OutputStream::Stderr => {
                let _ = writeln!(out, "{}{}{}", p.red, line.line, p.reset);
            }
        }
    }

    let elapsed = result.finished_at - result.started_at;
    let status = match &result.outcome {
        RunOutcome::Succeeded => format!("{}succeeded{}", p.green, p.reset),
        RunOutcome::Failed {
            exit_code: Some(code),
        } => format!("{}failed with exit code {code}{}", p.red, p.reset),
        RunOutcome::Failed { exit_code: None } => {
            format!("{}terminated by signal{}", p.red, p.reset)
        }
        RunOutcome::TimedOut => format!("{}timed out{}", p.red, p.reset),
        RunOutcome::SpawnFailed { message } => {
            format!("{}could not start: {message}{}", p.red, p.reset)
        }
    };
    let _ = write!(
        out,
        "Refresh {status} {}({} ms){}",
        p.gray,
        elapsed.num_milliseconds(),
        p.reset
    );
    out
}

#[derive(Serialize)]
struct ScheduleView<'a> {
    expression: &'a str,
    upcoming: &'a [DateTime<Utc>],
}

/// Render the next firings of a refresh schedule.
pub fn render_schedule(
    expression: &str,
    upcoming: &[DateTime<Utc>],
    format: OutputFormat,
) -> serde_json::Result<String> {
    match format {
        OutputFormat::Json => serde_json::to_string_pretty(&ScheduleView {
            expression,
            upcoming,
        }),
        OutputFormat::Text => {
            let mut out = format!("Schedule: {expression}");
            for at in upcoming {
                let _ = write!(out, "\n- {}", at.to_rfc3339());
            }
            Ok(out)
        }
    }
}
