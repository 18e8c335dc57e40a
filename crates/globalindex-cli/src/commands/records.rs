//! `records` subcommand: query the configured store the way the HTTP routes do.

use anyhow::{bail, Context, Result};

use globalindex_cli::output::{render_records, OutputFormat};
use globalindex_cli::terminal::ColorPalette;
use globalindex_lib::config::store_config_from_lookup;
use globalindex_lib::{connect_store, resolve, QueryOutcome, RecordQuery};

use super::env_lookup;

/// Pick the query shape matching the given filters.
pub fn query_for(country: Option<String>, indicator: Option<String>) -> RecordQuery {
    match (country, indicator) {
        (None, None) => RecordQuery::All,
        (Some(country), None) => RecordQuery::ByCountry(country),
        (None, Some(indicator)) => RecordQuery::ByIndicator(indicator),
        (Some(country), Some(indicator)) => {
            RecordQuery::ByCountryAndIndicator { country, indicator }
        }
    }
}

/// Handle the records subcommand.
///
/// Empty filtered results fail with the same message the API returns in its
/// 404 body. An empty unfiltered listing prints an empty table.
pub async fn handle_records(
    country: Option<String>,
    indicator: Option<String>,
    format: OutputFormat,
) -> Result<()> {
    let config = store_config_from_lookup(env_lookup).context("invalid store configuration")?;
    let store = connect_store(&config)
        .await
        .with_context(|| format!("failed to connect to the {} store", config.backend()))?;

    let query = query_for(country, indicator);
    match resolve(store.as_ref(), &query, None).await {
        QueryOutcome::Found(records) => {
            println!(
                "{}",
                render_records(&records, format, &ColorPalette::detect())?
            );
            Ok(())
        }
        QueryOutcome::NotFound { message } => bail!(message),
        QueryOutcome::Failed { message, source } => {
            Err(anyhow::Error::new(source).context(message))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_query_for_each_shape() {
        assert_eq!(query_for(None, None), RecordQuery::All);
        assert_eq!(
            query_for(Some("US".into()), None),
            RecordQuery::ByCountry("US".into())
        );
        assert_eq!(
            query_for(None, Some("SP.POP.TOTL".into())),
            RecordQuery::ByIndicator("SP.POP.TOTL".into())
        );
        assert_eq!(
            query_for(Some("US".into()), Some("SP.POP.TOTL".into())),
            RecordQuery::ByCountryAndIndicator {
                country: "US".into(),
                indicator: "SP.POP.TOTL".into()
            }
        );
    }
}
