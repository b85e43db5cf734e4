//! Estimate configuration as exchanged with the backend.
//!
//! ```json
//! {
//!   "elapsed_days": 60,
//!   "analysis": { "values": [1, 2], "e2e_percentage": 10, "distribution": { "functional": 60 } },
//!   "common": { "category_order": ["functional"], "category_colors": {} }
//! }
//! ```

use std::collections::BTreeMap;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::calendar::{DateSpan, WorkCalendar};
use crate::category::{CategoryRegistry, LEGACY_CATEGORIES};
use crate::distribution::{DistributionError, SUM_TOLERANCE};
use crate::interval::{IntervalRange, TotalDays};
use crate::phase::PhaseKey;

/// Category key -> percentage of a phase's effort.
pub type Distribution = BTreeMap<String, f64>;

/// Committed placement of every phase that has one.
pub type PhaseIntervals = BTreeMap<PhaseKey, IntervalRange>;

/// Distribution rows keyed by phase.
pub type PhaseDistributions = BTreeMap<PhaseKey, Distribution>;

/// Configuration validation errors.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum ConfigError {
    /// End-to-end percentages (contingency excluded) do not add up.
    #[error("end-to-end percentages must sum to 100, got {sum:.2}")]
    E2eSum { sum: f64 },

    #[error(transparent)]
    Distribution(#[from] DistributionError),
}

/// Per-phase settings.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PhaseConfig {
    #[serde(rename = "values", default, with = "slot_values")]
    pub interval: Option<IntervalRange>,
    #[serde(default)]
    pub e2e_percentage: f64,
    #[serde(default)]
    pub distribution: Distribution,
}

impl PhaseConfig {
    fn legacy(range: (u8, u8), e2e_percentage: f64, split: [f64; 3]) -> Self {
        let interval = IntervalRange::new(range.0, range.1).ok();
        let distribution = LEGACY_CATEGORIES
            .iter()
            .zip(split)
            .map(|(key, value)| ((*key).to_string(), value))
            .collect();
        Self {
            interval,
            e2e_percentage,
            distribution,
        }
    }
}

/// Chart presentation settings shared by every phase.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommonSettings {
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub category_order: Vec<String>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub category_colors: BTreeMap<String, String>,
}

/// A whole estimate configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EstimateConfig {
    #[serde(default)]
    pub elapsed_days: TotalDays,
    #[serde(flatten)]
    pub phases: BTreeMap<PhaseKey, PhaseConfig>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub common: Option<CommonSettings>,
}

impl Default for EstimateConfig {
    fn default() -> Self {
        Self::legacy_default()
    }
}

impl EstimateConfig {
    /// Every phase with the stock placement, effort split and the three
    /// legacy categories.
    pub fn legacy_default() -> Self {
        let phases = [
            (PhaseKey::Analysis, PhaseConfig::legacy((1, 2), 10.0, [60.0, 30.0, 10.0])),
            (PhaseKey::Development, PhaseConfig::legacy((2, 7), 40.0, [20.0, 70.0, 10.0])),
            (PhaseKey::InternalTest, PhaseConfig::legacy((5, 8), 15.0, [40.0, 50.0, 10.0])),
            (PhaseKey::Uat, PhaseConfig::legacy((8, 9), 10.0, [70.0, 20.0, 10.0])),
            (PhaseKey::Release, PhaseConfig::legacy((10, 10), 5.0, [10.0, 80.0, 10.0])),
            (PhaseKey::Documentation, PhaseConfig::legacy((6, 10), 5.0, [50.0, 40.0, 10.0])),
            (PhaseKey::Startup, PhaseConfig::legacy((1, 1), 5.0, [30.0, 30.0, 40.0])),
            (PhaseKey::Pm, PhaseConfig::legacy((1, 10), 10.0, [0.0, 0.0, 100.0])),
            (PhaseKey::Contingency, PhaseConfig::legacy((1, 10), 10.0, [40.0, 40.0, 20.0])),
        ];
        Self {
            elapsed_days: TotalDays::default(),
            phases: phases.into_iter().collect(),
            common: None,
        }
    }

    #[must_use]
    pub fn with_elapsed_days(mut self, elapsed_days: TotalDays) -> Self {
        self.elapsed_days = elapsed_days;
        self
    }

    /// Placement of every phase that has one.
    pub fn intervals(&self) -> PhaseIntervals {
        self.phases
            .iter()
            .filter_map(|(phase, config)| config.interval.map(|range| (*phase, range)))
            .collect()
    }

    /// Writes placements back. Phases absent from `intervals` lose theirs.
    pub fn set_intervals(&mut self, intervals: &PhaseIntervals) {
        for (phase, config) in &mut self.phases {
            config.interval = intervals.get(phase).copied();
        }
        for (phase, range) in intervals {
            self.phases.entry(*phase).or_default().interval = Some(*range);
        }
    }

    /// Bulk (re)initialization; the only way to give an empty phase a bar.
    pub fn initialize_intervals(&mut self, placements: &[(PhaseKey, Option<IntervalRange>)]) {
        for (phase, range) in placements {
            self.phases.entry(*phase).or_default().interval = *range;
        }
    }

    pub fn distributions(&self) -> PhaseDistributions {
        self.phases
            .iter()
            .map(|(phase, config)| (*phase, config.distribution.clone()))
            .collect()
    }

    pub fn set_distributions(&mut self, distributions: &PhaseDistributions) {
        for (phase, distribution) in distributions {
            self.phases.entry(*phase).or_default().distribution = distribution.clone();
        }
    }

    /// Extracts the category registry.
    ///
    /// An explicit `common.category_order` sets the order; keys only found in
    /// distributions are appended in canonical order. Without an explicit
    /// order the canonical order is used, and with no keys at all the legacy
    /// defaults.
    pub fn categories(&self) -> CategoryRegistry {
        let found = CategoryRegistry::canonical(
            self.phases
                .values()
                .flat_map(|config| config.distribution.keys()),
        );
        let colors = self
            .common
            .as_ref()
            .map(|common| common.category_colors.clone())
            .unwrap_or_default();

        let registry = match self.common.as_ref() {
            Some(common) if !common.category_order.is_empty() => CategoryRegistry::from_keys(
                common.category_order.iter().chain(found.keys().iter()),
            ),
            _ => found,
        };
        registry.with_colors(colors)
    }

    /// Stores the registry's order and colors in `common`.
    pub fn set_categories(&mut self, registry: &CategoryRegistry) {
        let common = self.common.get_or_insert_with(CommonSettings::default);
        common.category_order = registry.keys().to_vec();
        common.category_colors = registry.colors().clone();
    }

    pub fn e2e_sum(&self) -> f64 {
        self.phases
            .iter()
            .filter(|(phase, _)| phase.counts_toward_e2e())
            .map(|(_, config)| config.e2e_percentage)
            .sum()
    }

    /// Checks the end-to-end split, then every distribution row.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let sum = self.e2e_sum();
        if (sum - 100.0).abs() > SUM_TOLERANCE {
            return Err(ConfigError::E2eSum { sum });
        }
        crate::distribution::DistributionTable::from_config(self).validate()?;
        Ok(())
    }

    /// Calendar dates of every placed phase when the estimate starts on
    /// `start`.
    pub fn phase_dates(&self, start: NaiveDate, calendar: &WorkCalendar) -> Vec<(PhaseKey, DateSpan)> {
        self.intervals()
            .into_iter()
            .map(|(phase, range)| (phase, range.to_dates(start, self.elapsed_days, calendar)))
            .collect()
    }
}

/// `Option<IntervalRange>` stored as a flat slot list.
mod slot_values {
    use serde::{Deserialize, Deserializer, Serialize, Serializer};

    use crate::interval::IntervalRange;

    #[allow(clippy::ref_option)]
    pub fn serialize<S>(interval: &Option<IntervalRange>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        interval
            .map(IntervalRange::to_values)
            .unwrap_or_default()
            .serialize(serializer)
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Option<IntervalRange>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let values = Vec::<i64>::deserialize(deserializer)?;
        IntervalRange::from_values(&values).map_err(serde::de::Error::custom)
    }
}
