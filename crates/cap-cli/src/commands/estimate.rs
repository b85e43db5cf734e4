//! Estimate lifecycle commands: init, import, export, list, show, validate, delete.

use std::io::Write;
use std::path::Path;

use anyhow::{Context, Result, bail};
use cap_core::interval::{PeriodLabel, PeriodUnit};
use cap_core::{DateSpan, Distribution, EstimateConfig, IntervalRange, PhaseKey, TotalDays};
use chrono::NaiveDate;
use clap::Args;
use serde::Serialize;

use crate::Config;
use crate::commands::util::{format_amount, load_estimate, open_database, save_estimate};

#[derive(Debug, Args)]
pub struct InitArgs {
    /// Estimate ID. A random one is generated when omitted.
    pub id: Option<String>,

    /// Total working days mapped onto the 10 slots (10, 20, 40, 60, 120 or 240).
    #[arg(long, default_value_t = 60)]
    pub days: u16,

    /// Overwrite an existing estimate.
    #[arg(long)]
    pub force: bool,
}

pub fn init<W: Write>(writer: &mut W, args: &InitArgs, config: &Config) -> Result<()> {
    let total = TotalDays::try_from(args.days)?;
    let id = args
        .id
        .clone()
        .unwrap_or_else(|| uuid::Uuid::new_v4().to_string());

    let mut db = open_database(config)?;
    if !args.force && db.fetch_estimate(&id)?.is_some() {
        bail!("estimate already exists: {id} (use --force to overwrite)");
    }

    let estimate = EstimateConfig::legacy_default().with_elapsed_days(total);
    save_estimate(writer, &mut db, config, &id, &estimate)?;
    writeln!(writer, "Created estimate {id} ({total})")?;
    Ok(())
}

/// Replaces an estimate's configuration with a validated JSON file.
pub fn import<W: Write>(writer: &mut W, id: &str, file: &Path, config: &Config) -> Result<()> {
    let raw = std::fs::read_to_string(file)
        .with_context(|| format!("failed to read {}", file.display()))?;
    let estimate: EstimateConfig = serde_json::from_str(&raw)
        .with_context(|| format!("invalid estimate configuration in {}", file.display()))?;
    estimate
        .validate()
        .with_context(|| format!("refusing to import {}", file.display()))?;

    let mut db = open_database(config)?;
    save_estimate(writer, &mut db, config, id, &estimate)?;
    writeln!(writer, "Imported estimate {id} from {}", file.display())?;
    Ok(())
}

pub fn export<W: Write>(writer: &mut W, id: &str, config: &Config) -> Result<()> {
    let db = open_database(config)?;
    let estimate = load_estimate(&db, id)?;
    writeln!(writer, "{}", serde_json::to_string_pretty(&estimate)?)?;
    Ok(())
}

pub fn list<W: Write>(writer: &mut W, config: &Config) -> Result<()> {
    let db = open_database(config)?;
    let estimates = db.list_estimates()?;
    if estimates.is_empty() {
        writeln!(writer, "No estimates stored.")?;
        return Ok(());
    }
    for estimate in estimates {
        let fte = if estimate.has_fte_result { "fte" } else { "-" };
        writeln!(writer, "{}  {}  {fte}", estimate.id, estimate.updated_at)?;
    }
    Ok(())
}

#[derive(Debug, Args)]
pub struct ShowArgs {
    /// Estimate ID.
    pub id: String,

    /// Project start date (YYYY-MM-DD) for calendar dates.
    #[arg(long)]
    pub start: Option<NaiveDate>,

    /// Output as JSON.
    #[arg(long)]
    pub json: bool,
}

#[derive(Debug, Serialize)]
struct ShowReport<'a> {
    id: &'a str,
    total_days: TotalDays,
    periods: Vec<PeriodLabel>,
    category_keys: Vec<String>,
    phases: Vec<PhaseReport>,
}

#[derive(Debug, Serialize)]
struct PhaseReport {
    phase: PhaseKey,
    slots: Option<IntervalRange>,
    working_days: f64,
    e2e_percentage: f64,
    distribution: Distribution,
    #[serde(skip_serializing_if = "Option::is_none")]
    dates: Option<DateSpan>,
}

pub fn show<W: Write>(writer: &mut W, args: &ShowArgs, config: &Config) -> Result<()> {
    let db = open_database(config)?;
    let estimate = load_estimate(&db, &args.id)?;
    let report = build_report(&args.id, &estimate, args.start, config);

    if args.json {
        writeln!(writer, "{}", serde_json::to_string_pretty(&report)?)?;
        return Ok(());
    }
    render_report(writer, &report)
}

fn build_report<'a>(
    id: &'a str,
    estimate: &EstimateConfig,
    start: Option<NaiveDate>,
    config: &Config,
) -> ShowReport<'a> {
    let calendar = config.calendar();
    let total = estimate.elapsed_days;
    let phases = estimate
        .phases
        .iter()
        .map(|(phase, phase_config)| PhaseReport {
            phase: *phase,
            slots: phase_config.interval,
            working_days: phase_config
                .interval
                .map_or(0.0, |range| range.duration_days(total)),
            e2e_percentage: phase_config.e2e_percentage,
            distribution: phase_config.distribution.clone(),
            dates: start.zip(phase_config.interval).map(|(start, range)| {
                range.to_dates(start, total, &calendar)
            }),
        })
        .collect();

    ShowReport {
        id,
        total_days: total,
        periods: total.period_labels(),
        category_keys: estimate.categories().keys().to_vec(),
        phases,
    }
}

fn render_report<W: Write>(writer: &mut W, report: &ShowReport<'_>) -> Result<()> {
    let unit = match report.total_days.period_unit() {
        PeriodUnit::Week => "weeks",
        PeriodUnit::Month => "months",
        PeriodUnit::Quarter => "quarters",
    };
    writeln!(
        writer,
        "Estimate {}: {} working days, {} {unit}",
        report.id,
        report.total_days.days(),
        report.total_days.period_count()
    )?;
    let labels: Vec<&str> = report
        .periods
        .iter()
        .map(|period| period.label.as_str())
        .collect();
    writeln!(writer, "Periods: {}", labels.join(" "))?;
    writeln!(writer)?;

    let widths: Vec<usize> = report
        .category_keys
        .iter()
        .map(|key| key.len().max(6))
        .collect();
    let mut header = format!("{:<14} {:<7} {:>5} {:>5}", "phase", "slots", "days", "e2e%");
    for (key, width) in report.category_keys.iter().zip(&widths) {
        header.push_str(&format!(" {key:>width$}"));
    }
    writeln!(writer, "{}", header.trim_end())?;

    for row in &report.phases {
        let slots = row
            .slots
            .map_or_else(|| "-".to_string(), |range| range.to_string());
        let mut line = format!(
            "{:<14} {:<7} {:>5} {:>5}",
            row.phase.as_str(),
            slots,
            format_amount(row.working_days),
            format_amount(row.e2e_percentage)
        );
        for (key, width) in report.category_keys.iter().zip(&widths) {
            let value = row.distribution.get(key).copied().unwrap_or(0.0);
            line.push_str(&format!(" {:>width$}", format_amount(value)));
        }
        if let Some(dates) = row.dates {
            line.push_str(&format!("  {}..{}", dates.first, dates.last));
        }
        writeln!(writer, "{}", line.trim_end())?;
    }
    Ok(())
}

pub fn validate<W: Write>(writer: &mut W, id: &str, config: &Config) -> Result<()> {
    let db = open_database(config)?;
    let estimate = load_estimate(&db, id)?;
    estimate
        .validate()
        .with_context(|| format!("estimate {id} is invalid"))?;
    writeln!(
        writer,
        "Estimate {id} is valid (end-to-end {}%)",
        format_amount(estimate.e2e_sum())
    )?;
    Ok(())
}

pub fn delete<W: Write>(writer: &mut W, id: &str, config: &Config) -> Result<()> {
    let mut db = open_database(config)?;
    if !db.delete_estimate(id)? {
        bail!("estimate not found: {id}");
    }
    writeln!(writer, "Deleted estimate {id}")?;
    Ok(())
}
