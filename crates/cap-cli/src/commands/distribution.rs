//! Distribution table edits: single cells and category add/remove.

use std::io::Write;

use anyhow::{Context, Result};
use cap_core::{DistributionTable, EstimateConfig, PhaseKey, RecordingObserver};
use clap::{Args, Subcommand};

use crate::Config;
use crate::commands::util::{format_amount, load_estimate, open_database, save_estimate};

#[derive(Debug, Args)]
pub struct SetCellArgs {
    /// Estimate ID.
    pub id: String,
    /// Phase row.
    pub phase: PhaseKey,
    /// Category column key.
    pub category: String,
    /// New percentage. Empty or unparseable input counts as 0.
    #[arg(allow_hyphen_values = true)]
    pub value: String,
}

#[derive(Debug, Subcommand)]
pub enum CategoryAction {
    /// Add a category column; the name is normalized into a key.
    Add {
        /// Estimate ID.
        id: String,
        /// Display name, e.g. "Data Migration".
        name: String,
    },
    /// Remove a category column from every row.
    Remove {
        /// Estimate ID.
        id: String,
        /// Category key or display name.
        key: String,
    },
}

pub fn set_cell<W: Write>(writer: &mut W, args: &SetCellArgs, config: &Config) -> Result<()> {
    let mut db = open_database(config)?;
    let mut estimate = load_estimate(&db, &args.id)?;
    let mut table = DistributionTable::from_config(&estimate);

    let mut observer = RecordingObserver::default();
    let value = table.set_cell(args.phase, &args.category, &args.value, &mut observer)?;
    if observer.is_empty() {
        writeln!(
            writer,
            "{} {} unchanged at {}",
            args.phase,
            args.category,
            format_amount(value)
        )?;
        return Ok(());
    }
    commit(writer, &mut db, config, &args.id, &mut estimate, &table)?;

    writeln!(
        writer,
        "{} {} = {}",
        args.phase,
        args.category,
        format_amount(value)
    )?;
    report_row_sums(writer, &table)
}

pub fn run_category<W: Write>(writer: &mut W, action: &CategoryAction, config: &Config) -> Result<()> {
    let id = match action {
        CategoryAction::Add { id, .. } | CategoryAction::Remove { id, .. } => id,
    };
    let mut db = open_database(config)?;
    let mut estimate = load_estimate(&db, id)?;
    let mut table = DistributionTable::from_config(&estimate);

    let message = match action {
        CategoryAction::Add { name, .. } => {
            let key = table
                .add_category(name, &mut ())
                .with_context(|| format!("cannot add category {name:?}"))?;
            format!("Added category {key}")
        }
        CategoryAction::Remove { key, .. } => {
            table
                .remove_category(key, &mut ())
                .with_context(|| format!("cannot remove category {key:?}"))?;
            format!("Removed category {key}")
        }
    };
    commit(writer, &mut db, config, id, &mut estimate, &table)?;

    writeln!(writer, "{message}")?;
    writeln!(writer, "Categories: {}", table.registry().keys().join(", "))?;
    report_row_sums(writer, &table)
}

fn commit<W: Write>(
    writer: &mut W,
    db: &mut cap_db::Database,
    config: &Config,
    id: &str,
    estimate: &mut EstimateConfig,
    table: &DistributionTable,
) -> Result<()> {
    table.write_into(estimate);
    save_estimate(writer, db, config, id, estimate)
}

/// Rows that no longer sum to 100 are listed but not rejected; the user
/// fixes them with further edits.
fn report_row_sums<W: Write>(writer: &mut W, table: &DistributionTable) -> Result<()> {
    if let Err(err) = table.validate() {
        writeln!(writer, "warning: {err}")?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn setup() -> (tempfile::TempDir, Config) {
        let temp = tempfile::tempdir().unwrap();
        let config = Config::with_database(temp.path().join("cap.db"));
        let mut db = open_database(&config).unwrap();
        db.persist_estimate_config("demo", &EstimateConfig::legacy_default())
            .unwrap();
        (temp, config)
    }

    fn stored(config: &Config) -> EstimateConfig {
        open_database(config)
            .unwrap()
            .fetch_estimate("demo")
            .unwrap()
            .unwrap()
    }

    #[test]
    fn set_cell_persists_and_warns_about_row_sum() {
        let (_temp, config) = setup();
        let args = SetCellArgs {
            id: "demo".to_string(),
            phase: PhaseKey::Uat,
            category: "governance".to_string(),
            value: "5".to_string(),
        };
        let mut output = Vec::new();
        set_cell(&mut output, &args, &config).unwrap();

        assert_eq!(
            String::from_utf8(output).unwrap(),
            "uat governance = 5\nwarning: distribution for uat sums to 95.00, expected 100\n"
        );
        let estimate = stored(&config);
        assert!((estimate.phases[&PhaseKey::Uat].distribution["governance"] - 5.0).abs() < f64::EPSILON);
    }

    #[test]
    fn set_cell_with_current_value_skips_save() {
        let (_temp, config) = setup();
        let before = open_database(&config).unwrap().list_estimates().unwrap();
        let args = SetCellArgs {
            id: "demo".to_string(),
            phase: PhaseKey::Uat,
            category: "functional".to_string(),
            value: "70".to_string(),
        };
        let mut output = Vec::new();
        set_cell(&mut output, &args, &config).unwrap();

        assert_eq!(String::from_utf8(output).unwrap(), "uat functional unchanged at 70\n");
        let after = open_database(&config).unwrap().list_estimates().unwrap();
        assert_eq!(before[0].updated_at, after[0].updated_at);
    }

    #[test]
    fn breaking_a_row_is_not_pushed() {
        let (_temp, config) = setup();
        let mut server = mockito::Server::new();
        let mock = server.mock("PUT", mockito::Matcher::Any).expect(0).create();
        let config = Config {
            api_url: Some(server.url()),
            ..config
        };
        let args = SetCellArgs {
            id: "demo".to_string(),
            phase: PhaseKey::Uat,
            category: "functional".to_string(),
            value: "10".to_string(),
        };
        let mut output = Vec::new();
        set_cell(&mut output, &args, &config).unwrap();

        assert_eq!(
            String::from_utf8(output).unwrap(),
            "not pushed: distribution for uat sums to 40.00, expected 100\n\
             uat functional = 10\n\
             warning: distribution for uat sums to 40.00, expected 100\n"
        );
        assert!((stored(&config).phases[&PhaseKey::Uat].distribution["functional"] - 10.0).abs() < f64::EPSILON);
        mock.assert();
    }

    #[test]
    fn set_cell_coerces_garbage_to_zero() {
        let (_temp, config) = setup();
        let args = SetCellArgs {
            id: "demo".to_string(),
            phase: PhaseKey::Pm,
            category: "governance".to_string(),
            value: "lots".to_string(),
        };
        set_cell(&mut Vec::new(), &args, &config).unwrap();
        assert!(stored(&config).phases[&PhaseKey::Pm].distribution["governance"].abs() < f64::EPSILON);
    }

    #[test]
    fn set_cell_rejects_unknown_category() {
        let (_temp, config) = setup();
        let args = SetCellArgs {
            id: "demo".to_string(),
            phase: PhaseKey::Pm,
            category: "ops".to_string(),
            value: "10".to_string(),
        };
        assert!(set_cell(&mut Vec::new(), &args, &config).is_err());
    }

    #[test]
    fn add_then_remove_category() {
        let (_temp, config) = setup();
        let mut output = Vec::new();
        run_category(
            &mut output,
            &CategoryAction::Add {
                id: "demo".to_string(),
                name: "Data Migration".to_string(),
            },
            &config,
        )
        .unwrap();
        let output = String::from_utf8(output).unwrap();
        assert!(output.starts_with(
            "Added category data_migration\nCategories: functional, technical, governance, data_migration\n"
        ));

        let estimate = stored(&config);
        assert!(estimate.phases[&PhaseKey::Uat].distribution["data_migration"].abs() < f64::EPSILON);
        assert!(estimate.validate().is_ok());

        run_category(
            &mut Vec::new(),
            &CategoryAction::Remove {
                id: "demo".to_string(),
                key: "Data Migration".to_string(),
            },
            &config,
        )
        .unwrap();
        let estimate = stored(&config);
        assert!(!estimate.phases[&PhaseKey::Uat].distribution.contains_key("data_migration"));
        assert_eq!(estimate.categories().len(), 3);
    }

    #[test]
    fn last_category_cannot_be_removed() {
        let (_temp, config) = setup();
        for key in ["technical", "governance"] {
            run_category(
                &mut Vec::new(),
                &CategoryAction::Remove {
                    id: "demo".to_string(),
                    key: key.to_string(),
                },
                &config,
            )
            .unwrap();
        }
        let err = run_category(
            &mut Vec::new(),
            &CategoryAction::Remove {
                id: "demo".to_string(),
                key: "functional".to_string(),
            },
            &config,
        )
        .unwrap_err();
        assert!(format!("{err:#}").contains("at least one category"));
        assert_eq!(stored(&config).categories().keys(), ["functional"]);
    }
}
