//! `check` subcommand: verify the configured store is reachable.

use anyhow::{Context, Result};

use globalindex_lib::config::store_config_from_lookup;
use globalindex_lib::connect_store;

use super::env_lookup;

/// Connect to the store and ping it once.
pub async fn handle_check() -> Result<()> {
    let config = store_config_from_lookup(env_lookup).context("invalid store configuration")?;
    let backend = config.backend();
    let store = connect_store(&config)
        .await
        .with_context(|| format!("failed to connect to the {backend} store"))?;
    store
        .ping()
        .await
        .with_context(|| format!("{backend} store did not answer"))?;

    println!("{backend} store is reachable");
    Ok(())
}
