//! Combines FTE results of several estimates into one capacity view.
//!
//! # Algorithm Summary
//!
//! 1. Drop inputs without a populated slot array; nothing left means "no data".
//! 2. Resolve the category keys as the union of every input's declared keys
//!    (legacy keys when nobody declares any).
//! 3. For each slot and key, sum every input's value, counting a missing key
//!    as zero. Contributions are summed in a canonical order so any
//!    permutation of the inputs yields bit-identical sums.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::category::{CategoryRegistry, LEGACY_CATEGORIES};
use crate::fte::{CategoryEffort, FteResult};
use crate::interval::SLOT_COUNT;

/// One estimate's contribution.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FteInput {
    pub id: String,
    #[serde(default)]
    pub fte_result: Option<FteResult>,
}

impl FteInput {
    pub fn new(id: impl Into<String>, fte_result: Option<FteResult>) -> Self {
        Self {
            id: id.into(),
            fte_result,
        }
    }
}

/// Combined effort for one slot.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct AggregatedBucket {
    pub interval: u8,
    pub categories: BTreeMap<String, CategoryEffort>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub functional: Option<CategoryEffort>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub technical: Option<CategoryEffort>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub governance: Option<CategoryEffort>,
    pub total: CategoryEffort,
}

impl AggregatedBucket {
    pub fn effort(&self, key: &str) -> CategoryEffort {
        self.categories.get(key).copied().unwrap_or_default()
    }
}

/// Sum of several FTE results on the shared 10-slot grid.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AggregatedResult {
    pub category_keys: Vec<String>,
    /// Exactly one bucket per slot, in slot order.
    pub intervals: Vec<AggregatedBucket>,
    /// Ids of the inputs that contributed, sorted.
    pub sources: Vec<String>,
}

impl AggregatedResult {
    pub fn bucket(&self, slot: u8) -> Option<&AggregatedBucket> {
        self.intervals.get(usize::from(slot).checked_sub(1)?)
    }

    /// Grand total per category across all slots.
    pub fn totals(&self) -> BTreeMap<String, CategoryEffort> {
        self.category_keys
            .iter()
            .map(|key| {
                let total = self
                    .intervals
                    .iter()
                    .fold(CategoryEffort::default(), |acc, bucket| acc + bucket.effort(key));
                (key.clone(), total)
            })
            .collect()
    }

    /// Registry view of the resolved keys for legends.
    pub fn registry(&self) -> CategoryRegistry {
        CategoryRegistry::from_keys(&self.category_keys)
    }
}

/// Resolves the category keys shared by a set of results.
pub fn resolve_category_keys<'a>(results: impl IntoIterator<Item = &'a FteResult>) -> Vec<String> {
    let declared: Vec<&str> = results
        .into_iter()
        .flat_map(FteResult::declared_keys)
        .collect();
    if declared.is_empty() {
        return LEGACY_CATEGORIES.iter().map(ToString::to_string).collect();
    }
    CategoryRegistry::canonical(declared).keys().to_vec()
}

/// Aggregates FTE results, or `None` when no input carries data.
pub fn aggregate_fte_results(inputs: &[FteInput]) -> Option<AggregatedResult> {
    let populated: Vec<(&str, &FteResult)> = inputs
        .iter()
        .filter_map(|input| {
            input
                .fte_result
                .as_ref()
                .filter(|result| result.is_populated())
                .map(|result| (input.id.as_str(), result))
        })
        .collect();
    if populated.is_empty() {
        tracing::debug!(inputs = inputs.len(), "no FTE data to aggregate");
        return None;
    }

    let category_keys = resolve_category_keys(populated.iter().map(|(_, result)| *result));

    // Per slot, per key: every input's contribution, summed later in a fixed order.
    let mut cells: Vec<BTreeMap<&str, (Vec<f64>, Vec<f64>)>> =
        vec![BTreeMap::new(); usize::from(SLOT_COUNT)];
    for (id, result) in &populated {
        for (position, bucket) in result.intervals.iter().flatten().enumerate() {
            let Some(slot) = bucket.slot(position) else {
                tracing::debug!(%id, interval = bucket.interval, "skipping off-grid bucket");
                continue;
            };
            let cell = &mut cells[usize::from(slot - 1)];
            for key in &category_keys {
                if let Some(effort) = bucket.effort(key) {
                    let (hours, fte) = cell.entry(key.as_str()).or_default();
                    hours.push(effort.hours);
                    fte.push(effort.fte);
                }
            }
        }
    }

    let intervals = cells
        .into_iter()
        .zip(1..=SLOT_COUNT)
        .map(|(cell, slot)| build_bucket(slot, &category_keys, cell))
        .collect();

    let mut sources: Vec<String> = populated.iter().map(|(id, _)| (*id).to_string()).collect();
    sources.sort();

    Some(AggregatedResult {
        category_keys,
        intervals,
        sources,
    })
}

fn build_bucket(
    slot: u8,
    keys: &[String],
    mut cell: BTreeMap<&str, (Vec<f64>, Vec<f64>)>,
) -> AggregatedBucket {
    let mut bucket = AggregatedBucket {
        interval: slot,
        ..AggregatedBucket::default()
    };
    for key in keys {
        let effort = cell
            .remove(key.as_str())
            .map(|(hours, fte)| CategoryEffort::new(ordered_sum(hours), ordered_sum(fte)))
            .unwrap_or_default();
        bucket.total += effort;
        bucket.categories.insert(key.clone(), effort);
        match key.as_str() {
            "functional" => bucket.functional = Some(effort),
            "technical" => bucket.technical = Some(effort),
            "governance" => bucket.governance = Some(effort),
            _ => {}
        }
    }
    bucket
}

/// Sums in ascending order so the result is independent of input order.
fn ordered_sum(mut values: Vec<f64>) -> f64 {
    values.sort_by(f64::total_cmp);
    values.into_iter().sum()
}
