//! `schedule` subcommand: preview when the refresh job will fire.

use anyhow::{Context, Result};
use chrono::Utc;

use globalindex_cli::output::{render_schedule, OutputFormat};
use globalindex_lib::config::refresh_config_from_lookup;
use globalindex_lib::RefreshSchedule;

use super::env_lookup;

/// Handle the schedule subcommand.
///
/// `expression` overrides `REFRESH_SCHEDULE`; without either the yearly
/// default applies.
pub fn handle_schedule(
    expression: Option<String>,
    count: usize,
    format: OutputFormat,
) -> Result<()> {
    let schedule = match expression {
        Some(expression) => RefreshSchedule::parse(&expression)?,
        None => {
            refresh_config_from_lookup(env_lookup)
                .context("invalid refresh configuration")?
                .schedule
        }
    };

    let upcoming = schedule.upcoming(Utc::now(), count)?;
    println!(
        "{}",
        render_schedule(schedule.expression(), &upcoming, format)?
    );
    Ok(())
}
