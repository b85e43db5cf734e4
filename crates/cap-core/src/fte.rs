//! FTE results produced by the external effort model.
//!
//! The engine never computes these values itself; it only shapes the
//! request and sums the responses.

use std::collections::BTreeMap;
use std::ops::{Add, AddAssign};

use serde::{Deserialize, Serialize};

use crate::category::is_legacy;
use crate::estimate::EstimateConfig;
use crate::interval::{SLOT_COUNT, TotalDays};
use crate::phase::PhaseKey;

/// Hours and full-time equivalents for one category in one slot.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct CategoryEffort {
    #[serde(default)]
    pub hours: f64,
    #[serde(default)]
    pub fte: f64,
}

impl CategoryEffort {
    pub const fn new(hours: f64, fte: f64) -> Self {
        Self { hours, fte }
    }
}

impl Add for CategoryEffort {
    type Output = Self;

    fn add(self, rhs: Self) -> Self {
        Self {
            hours: self.hours + rhs.hours,
            fte: self.fte + rhs.fte,
        }
    }
}

impl AddAssign for CategoryEffort {
    fn add_assign(&mut self, rhs: Self) {
        *self = *self + rhs;
    }
}

/// One slot of an FTE result.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FteBucket {
    /// Slot index on the 10-slot grid. Zero means "use the array position".
    #[serde(default)]
    pub interval: u8,
    #[serde(default)]
    pub categories: BTreeMap<String, CategoryEffort>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub functional: Option<CategoryEffort>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub technical: Option<CategoryEffort>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub governance: Option<CategoryEffort>,
}

impl FteBucket {
    /// Effort for a key, falling back to the legacy mirror fields.
    pub fn effort(&self, key: &str) -> Option<CategoryEffort> {
        if let Some(effort) = self.categories.get(key) {
            return Some(*effort);
        }
        match key {
            "functional" => self.functional,
            "technical" => self.technical,
            "governance" => self.governance,
            _ => None,
        }
    }

    /// Keys this bucket carries, legacy mirrors included.
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        let legacy = [
            ("functional", self.functional.is_some()),
            ("technical", self.technical.is_some()),
            ("governance", self.governance.is_some()),
        ];
        self.categories.keys().map(String::as_str).chain(
            legacy
                .into_iter()
                .filter(|(_, present)| *present)
                .map(|(key, _)| key),
        )
    }

    /// Slot this bucket belongs to, or `None` if it is off the grid.
    pub fn slot(&self, position: usize) -> Option<u8> {
        let slot = if self.interval == 0 {
            u8::try_from(position + 1).ok()?
        } else {
            self.interval
        };
        (1..=SLOT_COUNT).contains(&slot).then_some(slot)
    }
}

/// Output of the external FTE computation for one estimate.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FteResult {
    #[serde(default)]
    pub intervals: Option<Vec<FteBucket>>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub category_keys: Vec<String>,
}

impl FteResult {
    pub const fn new(intervals: Vec<FteBucket>) -> Self {
        Self {
            intervals: Some(intervals),
            category_keys: Vec::new(),
        }
    }

    /// True when the slot array exists and is non-empty.
    pub fn is_populated(&self) -> bool {
        self.intervals
            .as_ref()
            .is_some_and(|buckets| !buckets.is_empty())
    }

    /// Declared keys: the explicit list plus every key seen in a bucket.
    pub fn declared_keys(&self) -> impl Iterator<Item = &str> {
        self.category_keys.iter().map(String::as_str).chain(
            self.intervals
                .iter()
                .flatten()
                .flat_map(FteBucket::keys),
        )
    }

    /// True when no declared key is custom.
    pub fn is_legacy_only(&self) -> bool {
        self.declared_keys().all(is_legacy)
    }
}

/// Parameters sent to the external FTE computation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FteRequest {
    pub total_days: TotalDays,
    pub intervals_by_phase: BTreeMap<PhaseKey, Vec<i64>>,
}

impl FteRequest {
    pub fn from_config(config: &EstimateConfig) -> Self {
        let intervals_by_phase = config
            .phases
            .iter()
            .map(|(phase, phase_config)| {
                let values = phase_config
                    .interval
                    .map(crate::interval::IntervalRange::to_values)
                    .unwrap_or_default();
                (*phase, values)
            })
            .collect();
        Self {
            total_days: config.elapsed_days,
            intervals_by_phase,
        }
    }
}
