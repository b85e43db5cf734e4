//! Aggregate command: sums stored FTE results across estimates.

use std::io::Write;

use anyhow::Result;
use cap_core::{AggregatedResult, FteInput, aggregate_fte_results};
use clap::Args;

use crate::Config;
use crate::commands::util::{format_amount, load_estimate, open_database};

#[derive(Debug, Args)]
pub struct AggregateArgs {
    /// Estimate IDs to combine.
    #[arg(required = true)]
    pub ids: Vec<String>,

    /// Output as JSON.
    #[arg(long)]
    pub json: bool,
}

pub fn run<W: Write>(writer: &mut W, args: &AggregateArgs, config: &Config) -> Result<()> {
    let db = open_database(config)?;
    let mut inputs = Vec::with_capacity(args.ids.len());
    for id in &args.ids {
        load_estimate(&db, id)?;
        inputs.push(FteInput::new(id.clone(), db.fetch_fte_result(id)?));
    }

    let result = aggregate_fte_results(&inputs);
    if args.json {
        writeln!(writer, "{}", serde_json::to_string_pretty(&result)?)?;
        return Ok(());
    }
    match result {
        Some(result) => render(writer, &result),
        None => {
            writeln!(writer, "No FTE data for the selected estimates.")?;
            Ok(())
        }
    }
}

fn render<W: Write>(writer: &mut W, result: &AggregatedResult) -> Result<()> {
    writeln!(
        writer,
        "FTE per slot across {} estimates ({})",
        result.sources.len(),
        result.sources.join(", ")
    )?;

    let widths: Vec<usize> = result
        .category_keys
        .iter()
        .map(|key| key.len().max(6))
        .collect();
    let mut header = format!("{:<5}", "slot");
    for (key, width) in result.category_keys.iter().zip(&widths) {
        header.push_str(&format!(" {key:>width$}"));
    }
    header.push_str(&format!(" {:>6}", "total"));
    writeln!(writer, "{header}")?;

    for bucket in &result.intervals {
        let mut line = format!("{:<5}", bucket.interval);
        for (key, width) in result.category_keys.iter().zip(&widths) {
            line.push_str(&format!(" {:>width$}", format_amount(bucket.effort(key).fte)));
        }
        line.push_str(&format!(" {:>6}", format_amount(bucket.total.fte)));
        writeln!(writer, "{line}")?;
    }

    let totals = result.totals();
    let mut line = format!("{:<5}", "sum");
    let mut grand = 0.0;
    for (key, width) in result.category_keys.iter().zip(&widths) {
        let fte = totals.get(key).map_or(0.0, |total| total.fte);
        grand += fte;
        line.push_str(&format!(" {:>width$}", format_amount(fte)));
    }
    line.push_str(&format!(" {:>6}", format_amount(grand)));
    writeln!(writer, "{line}")?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    use cap_core::{CategoryEffort, EstimateConfig, FteBucket, FteResult};
    use insta::assert_snapshot;

    fn setup(results: &[(&str, Option<FteResult>)]) -> (tempfile::TempDir, Config) {
        let temp = tempfile::tempdir().unwrap();
        let config = Config::with_database(temp.path().join("cap.db"));
        let mut db = open_database(&config).unwrap();
        for (id, result) in results {
            db.persist_estimate_config(id, &EstimateConfig::legacy_default())
                .unwrap();
            if let Some(result) = result {
                db.store_fte_result(id, result).unwrap();
            }
        }
        (temp, config)
    }

    fn slot_one(key: &str, fte: f64) -> FteResult {
        FteResult::new(vec![FteBucket {
            interval: 1,
            categories: [(key.to_string(), CategoryEffort::new(fte * 8.0, fte))]
                .into_iter()
                .collect(),
            ..FteBucket::default()
        }])
    }

    fn aggregate(config: &Config, ids: &[&str], json: bool) -> String {
        let args = AggregateArgs {
            ids: ids.iter().map(ToString::to_string).collect(),
            json,
        };
        let mut output = Vec::new();
        run(&mut output, &args, config).unwrap();
        String::from_utf8(output).unwrap()
    }

    #[test]
    fn sums_two_estimates_per_slot() {
        let (_temp, config) = setup(&[
            ("a", Some(slot_one("functional", 2.0))),
            ("b", Some(slot_one("functional", 2.0))),
        ]);
        let output = aggregate(&config, &["b", "a"], false);
        assert_snapshot!(output, @r"
FTE per slot across 2 estimates (a, b)
slot  functional  total
1              4      4
2              0      0
3              0      0
4              0      0
5              0      0
6              0      0
7              0      0
8              0      0
9              0      0
10             0      0
sum            4      4
");
    }

    #[test]
    fn no_data_is_reported_not_an_error() {
        let (_temp, config) = setup(&[("a", None)]);
        assert_eq!(
            aggregate(&config, &["a"], false),
            "No FTE data for the selected estimates.\n"
        );
        assert_eq!(aggregate(&config, &["a"], true), "null\n");
    }

    #[test]
    fn json_lists_union_of_keys() {
        let (_temp, config) = setup(&[
            ("a", Some(slot_one("functional", 1.0))),
            ("b", Some(slot_one("ops", 0.5))),
        ]);
        let output = aggregate(&config, &["a", "b"], true);
        let value: serde_json::Value = serde_json::from_str(&output).unwrap();
        assert_eq!(value["category_keys"], serde_json::json!(["functional", "ops"]));
        assert_eq!(value["intervals"].as_array().unwrap().len(), 10);
        assert_eq!(value["intervals"][0]["total"]["fte"], 1.5);
    }

    #[test]
    fn unknown_estimate_is_an_error() {
        let (_temp, config) = setup(&[]);
        let args = AggregateArgs {
            ids: vec!["ghost".to_string()],
            json: false,
        };
        assert!(run(&mut Vec::new(), &args, &config).is_err());
    }
}
