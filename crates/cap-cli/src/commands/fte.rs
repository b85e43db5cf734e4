//! FTE result commands.

use std::io::Write;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use cap_core::FteResult;
use clap::Subcommand;

use crate::Config;
use crate::commands::util::{load_estimate, open_database};

#[derive(Debug, Subcommand)]
pub enum FteAction {
    /// Store an externally computed FTE result for an estimate.
    Import {
        /// Estimate ID.
        id: String,
        /// JSON file with the result.
        file: PathBuf,
    },
    /// Print the stored FTE result as JSON.
    Show {
        /// Estimate ID.
        id: String,
    },
}

pub fn run<W: Write>(writer: &mut W, action: &FteAction, config: &Config) -> Result<()> {
    match action {
        FteAction::Import { id, file } => import(writer, id, file, config),
        FteAction::Show { id } => show(writer, id, config),
    }
}

fn import<W: Write>(writer: &mut W, id: &str, file: &Path, config: &Config) -> Result<()> {
    let raw = std::fs::read_to_string(file)
        .with_context(|| format!("failed to read {}", file.display()))?;
    let result: FteResult = serde_json::from_str(&raw)
        .with_context(|| format!("invalid FTE result in {}", file.display()))?;

    let mut db = open_database(config)?;
    load_estimate(&db, id)?;
    db.store_fte_result(id, &result)?;

    let slots = result.intervals.as_ref().map_or(0, Vec::len);
    writeln!(writer, "Stored FTE result for {id} ({slots} slots)")?;
    Ok(())
}

fn show<W: Write>(writer: &mut W, id: &str, config: &Config) -> Result<()> {
    let db = open_database(config)?;
    let Some(result) = db.fetch_fte_result(id)? else {
        bail!("no FTE result stored for {id}");
    };
    writeln!(writer, "{}", serde_json::to_string_pretty(&result)?)?;
    Ok(())
}
