//! Shared utilities for CLI commands.

use std::io::Write;

use anyhow::{Context, Result, anyhow};
use cap_api::Client;
use cap_core::EstimateConfig;
use cap_db::Database;

use crate::Config;

/// Opens the configured database, creating its directory if needed.
pub fn open_database(config: &Config) -> Result<Database> {
    if let Some(parent) = config.database_path.parent() {
        std::fs::create_dir_all(parent).context("failed to create database directory")?;
    }
    Database::open(&config.database_path)
        .with_context(|| format!("failed to open {}", config.database_path.display()))
}

/// Loads a stored estimate or fails with a readable message.
pub fn load_estimate(db: &Database, id: &str) -> Result<EstimateConfig> {
    db.fetch_estimate(id)?
        .ok_or_else(|| anyhow!("estimate not found: {id} (create it with `cap init {id}`)"))
}

/// Remote client from configuration, if a backend is configured.
pub fn remote_client(config: &Config) -> Result<Option<Client>> {
    let Some(url) = config
        .api_url
        .as_deref()
        .map(str::trim)
        .filter(|url| !url.is_empty())
    else {
        return Ok(None);
    };
    let client = Client::new(url, config.api_token.clone()).context("failed to create API client")?;
    Ok(Some(client))
}

/// Saves locally first, then pushes to the backend when one is configured.
///
/// Invalid drafts stay local until they validate again. A failed push is
/// logged and reported; the local copy is kept.
pub fn save_estimate<W: Write>(
    writer: &mut W,
    db: &mut Database,
    config: &Config,
    id: &str,
    estimate: &EstimateConfig,
) -> Result<()> {
    db.persist_estimate_config(id, estimate)?;

    let Some(client) = remote_client(config)? else {
        return Ok(());
    };
    if let Err(err) = estimate.validate() {
        tracing::debug!(id, error = %err, "estimate invalid, remote save skipped");
        writeln!(writer, "not pushed: {err}")?;
        return Ok(());
    }
    let runtime = tokio::runtime::Runtime::new().context("failed to initialize tokio runtime")?;
    if let Err(err) = runtime.block_on(client.persist_estimate_config(id, estimate)) {
        tracing::warn!(id, error = %err, "remote save failed, keeping local copy");
        writeln!(writer, "warning: remote save failed ({err}); local copy kept")?;
    }
    Ok(())
}

/// Formats a number with up to two decimals, dropping trailing zeros.
pub fn format_amount(value: f64) -> String {
    let rendered = format!("{value:.2}");
    let trimmed = rendered.trim_end_matches('0').trim_end_matches('.');
    if trimmed == "-0" {
        "0".to_string()
    } else {
        trimmed.to_string()
    }
}
