//! Remote backend commands: push, pull and compute.

use std::io::Write;

use anyhow::{Context, Result, anyhow};
use cap_api::Client;
use cap_core::FteRequest;

use crate::Config;
use crate::commands::util::{load_estimate, open_database, remote_client};

fn require_client(config: &Config) -> Result<Client> {
    remote_client(config)?
        .ok_or_else(|| anyhow!("no remote backend configured (set CAP_API_URL or api_url in config.toml)"))
}

fn runtime() -> Result<tokio::runtime::Runtime> {
    tokio::runtime::Runtime::new().context("failed to initialize tokio runtime")
}

/// Sends the local configuration to the backend.
pub fn push<W: Write>(writer: &mut W, id: &str, config: &Config) -> Result<()> {
    let client = require_client(config)?;
    let db = open_database(config)?;
    let estimate = load_estimate(&db, id)?;
    estimate
        .validate()
        .with_context(|| format!("estimate {id} is invalid, fix it before pushing"))?;

    runtime()?
        .block_on(client.persist_estimate_config(id, &estimate))
        .inspect_err(|err| tracing::warn!(id, error = %err, "push failed, local copy unchanged"))
        .with_context(|| format!("failed to push estimate {id}"))?;
    writeln!(writer, "Pushed estimate {id}")?;
    Ok(())
}

/// Replaces the local configuration with the backend's.
pub fn pull<W: Write>(writer: &mut W, id: &str, config: &Config) -> Result<()> {
    let client = require_client(config)?;
    let estimate = runtime()?
        .block_on(client.fetch_estimate(id))
        .with_context(|| format!("failed to pull estimate {id}"))?;

    let mut db = open_database(config)?;
    db.persist_estimate_config(id, &estimate)?;
    writeln!(writer, "Pulled estimate {id} ({})", estimate.elapsed_days)?;
    Ok(())
}

/// Requests an FTE computation for the local configuration and stores it.
pub fn compute<W: Write>(writer: &mut W, id: &str, config: &Config) -> Result<()> {
    let client = require_client(config)?;
    let mut db = open_database(config)?;
    let estimate = load_estimate(&db, id)?;
    estimate
        .validate()
        .with_context(|| format!("estimate {id} is invalid, fix it before computing"))?;

    let request = FteRequest::from_config(&estimate);
    let result = runtime()?
        .block_on(client.compute_fte(id, &request))
        .with_context(|| format!("failed to compute FTE for {id}"))?;
    db.store_fte_result(id, &result)?;

    let slots = result.intervals.as_ref().map_or(0, Vec::len);
    writeln!(writer, "Stored FTE result for {id} ({slots} slots)")?;
    Ok(())
}
