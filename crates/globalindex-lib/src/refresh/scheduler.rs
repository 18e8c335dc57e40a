use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, error, info};

use super::{RefreshRunner, RefreshSchedule, RefreshTrigger, TriggerOutcome};

/// Longest single sleep while waiting for the next occurrence. Waking up
/// periodically keeps the wait honest across wall-clock adjustments.
const MAX_SLEEP: Duration = Duration::from_secs(60 * 60);

/// Start the refresh loop.
///
/// When `run_on_startup` is set a run is fired immediately. After that the
/// runner is triggered at every occurrence of `schedule`. Each firing runs
/// in its own task so a long run never delays the loop; the runner itself
/// skips triggers that overlap an active run.
///
/// The loop ends once `shutdown` flips to `true` or its sender is dropped.
/// Runs already in flight are left to finish.
pub fn spawn_refresh_scheduler(
    runner: Arc<RefreshRunner>,
    schedule: RefreshSchedule,
    run_on_startup: bool,
    mut shutdown: watch::Receiver<bool>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        if run_on_startup {
            fire(&runner, RefreshTrigger::Startup);
        }

        loop {
            let next = match schedule.next_after(Utc::now()) {
                Ok(next) => next,
                Err(err) => {
                    error!(error = %err, "refresh scheduler stopped");
                    return;
                }
            };
            info!(
                schedule = schedule.expression(),
                next_run = %next.to_rfc3339(),
                "next refresh scheduled"
            );

            loop {
                let remaining = (next - Utc::now()).to_std().unwrap_or(Duration::ZERO);
                if remaining.is_zero() {
                    break;
                }
                tokio::select! {
                    _ = tokio::time::sleep(remaining.min(MAX_SLEEP)) => {}
                    changed = shutdown.changed() => {
                        if changed.is_err() || *shutdown.borrow() {
                            debug!("refresh scheduler shutting down");
                            return;
                        }
                    }
                }
            }

            fire(&runner, RefreshTrigger::Scheduled);
        }
    })
}

fn fire(runner: &Arc<RefreshRunner>, trigger: RefreshTrigger) {
    let runner = Arc::clone(runner);
    tokio::spawn(async move {
        if let TriggerOutcome::Skipped = runner.trigger(trigger).await {
            debug!(%trigger, "refresh trigger skipped");
        }
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::refresh::{RefreshCommand, RefreshState, RunOutcome};

    #[tokio::test]
    async fn stops_on_shutdown_signal() {
        let runner = Arc::new(RefreshRunner::new(RefreshCommand::default(), None));
        let (tx, rx) = watch::channel(false);
        let handle = spawn_refresh_scheduler(runner, RefreshSchedule::default(), false, rx);

        tx.send(true).unwrap();
        tokio::time::timeout(Duration::from_secs(5), handle)
            .await
            .expect("scheduler did not stop")
            .unwrap();
    }

    #[tokio::test]
    async fn stops_when_sender_dropped() {
        let runner = Arc::new(RefreshRunner::new(RefreshCommand::default(), None));
        let (tx, rx) = watch::channel(false);
        let handle = spawn_refresh_scheduler(runner.clone(), RefreshSchedule::default(), false, rx);

        drop(tx);
        tokio::time::timeout(Duration::from_secs(5), handle)
            .await
            .expect("scheduler did not stop")
            .unwrap();
        assert_eq!(runner.state(), RefreshState::Idle);
        assert!(runner.last_run().is_none());
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn fires_once_on_startup() {
        let command = RefreshCommand::new("sh").with_args(["-c", "echo started"]);
        let runner = Arc::new(RefreshRunner::new(command, None));
        let (tx, rx) = watch::channel(false);
        let handle = spawn_refresh_scheduler(runner.clone(), RefreshSchedule::default(), true, rx);

        let summary = tokio::time::timeout(Duration::from_secs(5), async {
            loop {
                if let Some(summary) = runner.last_run() {
                    break summary;
                }
                tokio::time::sleep(Duration::from_millis(10)).await;
            }
        })
        .await
        .expect("startup run did not finish");

        assert_eq!(summary.trigger, RefreshTrigger::Startup);
        assert_eq!(summary.outcome, RunOutcome::Succeeded);
        assert_eq!(summary.output_lines, 1);

        tx.send(true).unwrap();
        tokio::time::timeout(Duration::from_secs(5), handle)
            .await
            .expect("scheduler did not stop")
            .unwrap();
    }
}
