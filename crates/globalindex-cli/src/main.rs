use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

use globalindex_cli::output::OutputFormat;

mod commands;

#[derive(Parser, Debug)]
#[command(author, version, about = "Global Index dataset utilities")]
struct Cli {
    /// Output format.
    #[arg(long, value_enum, default_value_t = OutputFormat::Text, global = true)]
    format: OutputFormat,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Query records from the configured store.
    Records {
        /// Only records for this country code.
        #[arg(long)]
        country: Option<String>,
        /// Only records for this indicator code.
        #[arg(long)]
        indicator: Option<String>,
    },
    /// Run the population routine once and report how it ended.
    Refresh,
    /// Show the next firings of the refresh schedule.
    Schedule {
        /// Cron expression to preview instead of REFRESH_SCHEDULE.
        #[arg(long)]
        expression: Option<String>,
        /// Number of occurrences to list.
        #[arg(long, default_value_t = 3)]
        count: usize,
    },
    /// Check that the configured store is reachable.
    Check,
}

#[tokio::main]
async fn main() -> Result<()> {
    let _ = dotenvy::dotenv();
    init_tracing();
    let cli = Cli::parse();

    match cli.command {
        Command::Records { country, indicator } => {
            commands::records::handle_records(country, indicator, cli.format).await
        }
        Command::Refresh => commands::refresh::handle_refresh(cli.format).await,
        Command::Schedule { expression, count } => {
            commands::schedule::handle_schedule(expression, count, cli.format)
        }
        Command::Check => commands::check::handle_check().await,
    }
}

fn init_tracing() {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    let subscriber = FmtSubscriber::builder()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .finish();

    let _ = tracing::subscriber::set_global_default(subscriber);
}
