//! `refresh` subcommand: run the population routine once, in the foreground.

use anyhow::{bail, Context, Result};

use globalindex_cli::output::{render_run, OutputFormat};
use globalindex_cli::terminal::ColorPalette;
use globalindex_lib::config::refresh_config_from_lookup;
use globalindex_lib::{RefreshRunner, RefreshTrigger, TriggerOutcome};

use super::env_lookup;

/// Handle the refresh subcommand.
///
/// Uses the same `REFRESH_*` settings as the service. Fails when the routine
/// does not succeed so the exit status can drive scripts.
pub async fn handle_refresh(format: OutputFormat) -> Result<()> {
    let config =
        refresh_config_from_lookup(env_lookup).context("invalid refresh configuration")?;
    let runner = RefreshRunner::new(config.command, config.timeout);

    let result = match runner.trigger(RefreshTrigger::Manual).await {
        TriggerOutcome::Completed(result) => result,
        // A fresh runner has nothing in flight.
        TriggerOutcome::Skipped => bail!("a refresh run is already in progress"),
    };

    println!(
        "{}",
        render_run(&result, format, &ColorPalette::detect())?
    );

    if !result.outcome.is_success() {
        bail!("refresh {}", result.outcome.label().replace('_', " "));
    }
    Ok(())
}
