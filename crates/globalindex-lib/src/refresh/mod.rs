//! Dataset refresh jobs.
//!
//! The dataset is rebuilt by an external, independently versioned routine.
//! [`RefreshRunner`] launches it, streams its output into the log line by
//! line and reports how it ended. [`spawn_refresh_scheduler`] fires the
//! runner at startup and on every [`RefreshSchedule`] occurrence.
//!
//! At most one run is in flight: a trigger that arrives while a run is
//! active is skipped, not queued.

use std::fmt;
use std::path::PathBuf;
use std::process::Stdio;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tokio::process::Command;
use tracing::{error, info, warn};

use crate::error::RefreshError;

mod schedule;
mod scheduler;

pub use schedule::{RefreshSchedule, DEFAULT_REFRESH_SCHEDULE};
pub use scheduler::spawn_refresh_scheduler;

/// Program invoked when no refresh command is configured.
pub const DEFAULT_REFRESH_PROGRAM: &str = "populate_db";

/// The external routine to run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RefreshCommand {
    pub program: String,
    pub args: Vec<String>,
    pub working_dir: Option<PathBuf>,
}

impl RefreshCommand {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            working_dir: None,
        }
    }

    pub fn with_args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args = args.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_working_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.working_dir = Some(dir.into());
        self
    }
}

impl Default for RefreshCommand {
    fn default() -> Self {
        Self::new(DEFAULT_REFRESH_PROGRAM)
    }
}

impl fmt::Display for RefreshCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.program)?;
        for arg in &self.args {
            write!(f, " {arg}")?;
        }
        Ok(())
    }
}

/// Why a run was started.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RefreshTrigger {
    Startup,
    Scheduled,
    Manual,
}

impl fmt::Display for RefreshTrigger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            RefreshTrigger::Startup => "startup",
            RefreshTrigger::Scheduled => "scheduled",
            RefreshTrigger::Manual => "manual",
        })
    }
}

/// Runner state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RefreshState {
    Idle,
    Running,
}

/// Which stream an output line came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputStream {
    Stdout,
    Stderr,
}

/// One captured output line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutputLine {
    pub stream: OutputStream,
    pub line: String,
}

/// How a run ended.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum RunOutcome {
    Succeeded,
    /// Non-zero exit. `exit_code` is `None` when the process was killed by a
    /// signal.
    Failed { exit_code: Option<i32> },
    TimedOut,
    SpawnFailed { message: String },
}

impl RunOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, RunOutcome::Succeeded)
    }

    /// Short label for logs and metrics.
    pub fn label(&self) -> &'static str {
        match self {
            RunOutcome::Succeeded => "succeeded",
            RunOutcome::Failed { .. } => "failed",
            RunOutcome::TimedOut => "timed_out",
            RunOutcome::SpawnFailed { .. } => "spawn_failed",
        }
    }
}

/// Full record of a finished run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunResult {
    pub trigger: RefreshTrigger,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub outcome: RunOutcome,
    pub output: Vec<OutputLine>,
}

impl RunResult {
    pub fn exit_code(&self) -> Option<i32> {
        match self.outcome {
            RunOutcome::Succeeded => Some(0),
            RunOutcome::Failed { exit_code } => exit_code,
            _ => None,
        }
    }

    pub fn summary(&self) -> RunSummary {
        RunSummary {
            trigger: self.trigger,
            started_at: self.started_at,
            finished_at: self.finished_at,
            outcome: self.outcome.clone(),
            output_lines: self.output.len(),
        }
    }
}

/// The part of a [`RunResult`] kept after the run, without the output.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunSummary {
    pub trigger: RefreshTrigger,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub outcome: RunOutcome,
    pub output_lines: usize,
}

/// Result of asking the runner to start.
#[derive(Debug)]
pub enum TriggerOutcome {
    Completed(RunResult),
    /// Another run was already in flight.
    Skipped,
}

/// Hook notified about every trigger the runner handles.
pub trait RefreshObserver: Send + Sync {
    fn run_finished(&self, result: &RunResult);

    fn trigger_skipped(&self, _trigger: RefreshTrigger) {}
}

/// Launches the refresh routine, one run at a time.
pub struct RefreshRunner {
    command: RefreshCommand,
    timeout: Option<Duration>,
    busy: AtomicBool,
    last_run: Mutex<Option<RunSummary>>,
    observer: Option<Arc<dyn RefreshObserver>>,
}

impl RefreshRunner {
    pub fn new(command: RefreshCommand, timeout: Option<Duration>) -> Self {
        Self {
            command,
            timeout,
            busy: AtomicBool::new(false),
            last_run: Mutex::new(None),
            observer: None,
        }
    }

    pub fn with_observer(mut self, observer: Arc<dyn RefreshObserver>) -> Self {
        self.observer = Some(observer);
        self
    }

    pub fn command(&self) -> &RefreshCommand {
        &self.command
    }

    pub fn state(&self) -> RefreshState {
        if self.busy.load(Ordering::Acquire) {
            RefreshState::Running
        } else {
            RefreshState::Idle
        }
    }

    /// Summary of the most recent completed run.
    pub fn last_run(&self) -> Option<RunSummary> {
        self.last_run.lock().ok().and_then(|guard| (*guard).clone())
    }

    /// Run the routine unless a run is already in flight.
    pub async fn trigger(&self, trigger: RefreshTrigger) -> TriggerOutcome {
        if self
            .busy
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            warn!(%trigger, command = %self.command, "refresh already running, skipping trigger");
            if let Some(observer) = &self.observer {
                observer.trigger_skipped(trigger);
            }
            return TriggerOutcome::Skipped;
        }
        let _busy = BusyGuard(&self.busy);

        info!(%trigger, command = %self.command, "refresh routine started");
        let started_at = Utc::now();
        let mut output = Vec::new();
        let outcome = match self.execute(&mut output).await {
            Ok(outcome) => outcome,
            Err(RefreshError::Timeout { after }) => {
                error!(timeout_secs = after.as_secs(), "refresh routine timed out and was killed");
                RunOutcome::TimedOut
            }
            Err(err @ RefreshError::Spawn { .. }) => {
                error!(error = %err, "refresh routine could not be started");
                RunOutcome::SpawnFailed {
                    message: err.to_string(),
                }
            }
            Err(err) => {
                error!(error = %err, "refresh routine failed while running");
                RunOutcome::Failed { exit_code: None }
            }
        };

        match &outcome {
            RunOutcome::Succeeded => info!(%trigger, "refresh routine finished successfully"),
            RunOutcome::Failed {
                exit_code: Some(code),
            } => error!(%trigger, exit_code = code, "refresh routine finished with non-zero exit code"),
            RunOutcome::Failed { exit_code: None } => {
                error!(%trigger, "refresh routine terminated without an exit code")
            }
            _ => {}
        }

        let result = RunResult {
            trigger,
            started_at,
            finished_at: Utc::now(),
            outcome,
            output,
        };
        if let Ok(mut guard) = self.last_run.lock() {
            *guard = Some(result.summary());
        }
        if let Some(observer) = &self.observer {
            observer.run_finished(&result);
        }
        TriggerOutcome::Completed(result)
    }

    async fn execute(&self, output: &mut Vec<OutputLine>) -> Result<RunOutcome, RefreshError> {
        let mut command = Command::new(&self.command.program);
        command
            .args(&self.command.args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        if let Some(dir) = &self.command.working_dir {
            command.current_dir(dir);
        }

        let mut child = command.spawn().map_err(|source| RefreshError::Spawn {
            program: self.command.program.clone(),
            source,
        })?;

        let stdout = child.stdout.take();
        let stderr = child.stderr.take();

        let run = async {
            let (stdout_lines, stderr_lines) = tokio::join!(
                pump_lines(stdout, OutputStream::Stdout),
                pump_lines(stderr, OutputStream::Stderr),
            );
            let status = child.wait().await?;
            Ok::<_, RefreshError>((status, stdout_lines, stderr_lines))
        };

        let (status, stdout_lines, stderr_lines) = match self.timeout {
            Some(after) => match tokio::time::timeout(after, run).await {
                Ok(result) => result?,
                // `child` is dropped on return; kill_on_drop terminates it.
                Err(_) => return Err(RefreshError::Timeout { after }),
            },
            None => run.await?,
        };

        output.extend(stdout_lines);
        output.extend(stderr_lines);

        if status.success() {
            Ok(RunOutcome::Succeeded)
        } else {
            Ok(RunOutcome::Failed {
                exit_code: status.code(),
            })
        }
    }
}

impl fmt::Debug for RefreshRunner {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RefreshRunner")
            .field("command", &self.command)
            .field("timeout", &self.timeout)
            .field("state", &self.state())
            .field("has_observer", &self.observer.is_some())
            .finish()
    }
}

/// Clears the busy flag on every exit path.
struct BusyGuard<'a>(&'a AtomicBool);

impl Drop for BusyGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

/// Log each line as it arrives and keep a copy.
///
/// Reads until EOF so the child never sees a closed pipe. Bytes that are not
/// valid UTF-8 are replaced rather than ending the capture.
async fn pump_lines<R>(reader: Option<R>, stream: OutputStream) -> Vec<OutputLine>
where
    R: AsyncRead + Unpin,
{
    let Some(reader) = reader else {
        return Vec::new();
    };

    let mut reader = BufReader::new(reader);
    let mut buf = Vec::new();
    let mut captured = Vec::new();
    loop {
        buf.clear();
        match reader.read_until(b'\n', &mut buf).await {
            Ok(0) => break,
            Ok(_) => {
                let line = decode_line(&buf);
                match stream {
                    OutputStream::Stdout => info!(stream = "stdout", "{line}"),
                    OutputStream::Stderr => warn!(stream = "stderr", "{line}"),
                }
                captured.push(OutputLine { stream, line });
            }
            Err(err) => {
                warn!(stream = ?stream, error = %err, "stopped reading refresh routine output");
                break;
            }
        }
    }
    captured
}

fn decode_line(raw: &[u8]) -> String {
    let raw = raw.strip_suffix(b"\n").unwrap_or(raw);
    let raw = raw.strip_suffix(b"\r").unwrap_or(raw);
    String::from_utf8_lossy(raw).into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_command_is_populate_db() {
        let command = RefreshCommand::default();
        assert_eq!(command.program, "populate_db");
        assert!(command.args.is_empty());
        assert_eq!(command.to_string(), "populate_db");
    }

    #[test]
    fn command_display_includes_args() {
        let command = RefreshCommand::new("python").with_args(["scripts/populate_db.py"]);
        assert_eq!(command.to_string(), "python scripts/populate_db.py");
    }

    #[test]
    fn new_runner_is_idle() {
        let runner = RefreshRunner::new(RefreshCommand::default(), None);
        assert_eq!(runner.state(), RefreshState::Idle);
        assert!(runner.last_run().is_none());
    }

    #[test]
    fn decode_line_strips_terminator_and_replaces_invalid_bytes() {
        assert_eq!(decode_line(b"loaded 217 countries\n"), "loaded 217 countries");
        assert_eq!(decode_line(b"crlf\r\n"), "crlf");
        assert_eq!(decode_line(b"no newline"), "no newline");
        assert_eq!(decode_line(b"C\xf4te d'Ivoire\n"), "C\u{FFFD}te d'Ivoire");
    }

    #[test]
    fn outcome_labels() {
        assert_eq!(RunOutcome::Succeeded.label(), "succeeded");
        assert_eq!(RunOutcome::Failed { exit_code: Some(1) }.label(), "failed");
        assert_eq!(RunOutcome::TimedOut.label(), "timed_out");
    }

    #[test]
    fn outcome_serializes_with_status_tag() {
        let json = serde_json::to_value(RunOutcome::Failed { exit_code: Some(2) }).unwrap();
        assert_eq!(json, serde_json::json!({"status": "failed", "exit_code": 2}));
    }

    #[tokio::test]
    async fn missing_program_reports_spawn_failure() {
        let runner = RefreshRunner::new(
            RefreshCommand::new("/nonexistent/globalindex-populate"),
            None,
        );
        match runner.trigger(RefreshTrigger::Manual).await {
            TriggerOutcome::Completed(result) => {
                assert!(matches!(result.outcome, RunOutcome::SpawnFailed { .. }));
                assert_eq!(result.exit_code(), None);
            }
            TriggerOutcome::Skipped => panic!("runner was idle"),
        }
        assert_eq!(runner.state(), RefreshState::Idle);
        assert!(runner.last_run().is_some());
    }

    #[derive(Default)]
    struct CountingObserver {
        finished: Mutex<Vec<&'static str>>,
    }

    impl RefreshObserver for CountingObserver {
        fn run_finished(&self, result: &RunResult) {
            self.finished.lock().unwrap().push(result.outcome.label());
        }
    }

    #[tokio::test]
    async fn observer_sees_finished_runs() {
        let observer = Arc::new(CountingObserver::default());
        let runner = RefreshRunner::new(
            RefreshCommand::new("/nonexistent/globalindex-populate"),
            None,
        )
        .with_observer(observer.clone());

        runner.trigger(RefreshTrigger::Startup).await;
        assert_eq!(*observer.finished.lock().unwrap(), vec!["spawn_failed"]);
    }
}
