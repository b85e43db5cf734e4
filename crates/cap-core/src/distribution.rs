//! Percentage distribution of each phase's effort across categories.
//!
//! The table never normalizes: it stores what was typed (coerced to a
//! non-negative number) and reports the first row that does not sum to 100.

use thiserror::Error;

use crate::category::{CategoryRegistry, normalize_key};
use crate::estimate::{Distribution, EstimateConfig, PhaseDistributions};
use crate::observer::ConfigObserver;
use crate::phase::PhaseKey;

/// Allowed distance from 100 for a row (and for the end-to-end split).
pub const SUM_TOLERANCE: f64 = 0.01;

/// Distribution table errors.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum DistributionError {
    #[error("phase {phase} is not part of this configuration")]
    UnknownPhase { phase: PhaseKey },

    #[error("unknown category: {key}")]
    UnknownCategory { key: String },

    /// The name normalized to nothing.
    #[error("invalid category name: {name:?}")]
    InvalidCategoryName { name: String },

    #[error("category already exists: {key}")]
    CategoryExists { key: String },

    #[error("must keep at least one category")]
    LastCategory,

    #[error("distribution for {phase} sums to {sum:.2}, expected 100")]
    RowSum { phase: PhaseKey, sum: f64 },
}

/// Editable distribution rows plus the category registry they share.
///
/// Invariant: every row holds an entry for every registry key and nothing
/// else.
#[derive(Debug, Clone, PartialEq)]
pub struct DistributionTable {
    registry: CategoryRegistry,
    rows: PhaseDistributions,
}

impl DistributionTable {
    /// Builds a table, filling missing cells with 0.
    ///
    /// Keys present in rows but absent from the registry are appended to it
    /// so no typed value is silently dropped.
    pub fn new(registry: CategoryRegistry, rows: PhaseDistributions) -> Self {
        let mut registry = registry;
        for row in rows.values() {
            for key in row.keys() {
                registry.push(key.clone());
            }
        }

        let rows = rows
            .into_iter()
            .map(|(phase, row)| {
                let filled = registry
                    .keys()
                    .iter()
                    .map(|key| (key.clone(), row.get(key).copied().unwrap_or(0.0)))
                    .collect();
                (phase, filled)
            })
            .collect();
        Self { registry, rows }
    }

    pub fn from_config(config: &EstimateConfig) -> Self {
        Self::new(config.categories(), config.distributions())
    }

    /// Copies rows and category order back into the configuration.
    pub fn write_into(&self, config: &mut EstimateConfig) {
        config.set_distributions(&self.rows);
        config.set_categories(&self.registry);
    }

    pub const fn registry(&self) -> &CategoryRegistry {
        &self.registry
    }

    pub const fn rows(&self) -> &PhaseDistributions {
        &self.rows
    }

    pub fn row(&self, phase: PhaseKey) -> Option<&Distribution> {
        self.rows.get(&phase)
    }

    pub fn cell(&self, phase: PhaseKey, category: &str) -> Option<f64> {
        self.rows.get(&phase)?.get(category).copied()
    }

    /// Sum of a row in registry order.
    pub fn row_sum(&self, phase: PhaseKey) -> Option<f64> {
        let row = self.rows.get(&phase)?;
        Some(
            self.registry
                .keys()
                .iter()
                .map(|key| row.get(key).copied().unwrap_or(0.0))
                .sum(),
        )
    }

    /// Sets a cell from raw text. Unparseable or empty input becomes 0.
    pub fn set_cell<O: ConfigObserver + ?Sized>(
        &mut self,
        phase: PhaseKey,
        category: &str,
        raw: &str,
        observer: &mut O,
    ) -> Result<f64, DistributionError> {
        let value = raw.trim().parse::<f64>().unwrap_or(0.0);
        self.set_cell_value(phase, category, value, observer)
    }

    /// Sets a cell. Negative or non-finite values become 0; there is no
    /// upper clamp.
    pub fn set_cell_value<O: ConfigObserver + ?Sized>(
        &mut self,
        phase: PhaseKey,
        category: &str,
        value: f64,
        observer: &mut O,
    ) -> Result<f64, DistributionError> {
        if !self.registry.contains(category) {
            return Err(DistributionError::UnknownCategory {
                key: category.to_string(),
            });
        }
        let row = self
            .rows
            .get_mut(&phase)
            .ok_or(DistributionError::UnknownPhase { phase })?;

        let value = coerce(value);
        let previous = row.insert(category.to_string(), value);
        // Rewriting the same value is not an edit.
        if previous.is_none_or(|old| old.to_bits() != value.to_bits()) {
            observer.distribution_changed(&self.rows);
        }
        Ok(value)
    }

    /// Adds a category from a user-typed name and returns its machine key.
    pub fn add_category<O: ConfigObserver + ?Sized>(
        &mut self,
        name: &str,
        observer: &mut O,
    ) -> Result<String, DistributionError> {
        let key = normalize_key(name).ok_or_else(|| DistributionError::InvalidCategoryName {
            name: name.to_string(),
        })?;
        if !self.registry.push(key.clone()) {
            return Err(DistributionError::CategoryExists { key });
        }
        for row in self.rows.values_mut() {
            row.insert(key.clone(), 0.0);
        }

        tracing::debug!(%key, "category added");
        observer.category_keys_changed(self.registry.keys());
        observer.distribution_changed(&self.rows);
        Ok(key)
    }

    /// Removes a category from the registry and from every row.
    pub fn remove_category<O: ConfigObserver + ?Sized>(
        &mut self,
        key: &str,
        observer: &mut O,
    ) -> Result<(), DistributionError> {
        let key = if self.registry.contains(key) {
            key.to_string()
        } else {
            normalize_key(key)
                .filter(|normalized| self.registry.contains(normalized))
                .ok_or_else(|| DistributionError::UnknownCategory {
                    key: key.to_string(),
                })?
        };
        if self.registry.len() <= 1 {
            return Err(DistributionError::LastCategory);
        }

        self.registry.remove(&key);
        for row in self.rows.values_mut() {
            row.remove(&key);
        }

        tracing::debug!(%key, "category removed");
        observer.category_keys_changed(self.registry.keys());
        observer.distribution_changed(&self.rows);
        Ok(())
    }

    /// First row, in phase order, whose sum is not within tolerance of 100.
    pub fn validate(&self) -> Result<(), DistributionError> {
        for phase in self.rows.keys() {
            let sum = self.row_sum(*phase).unwrap_or(0.0);
            if (sum - 100.0).abs() > SUM_TOLERANCE {
                return Err(DistributionError::RowSum { phase: *phase, sum });
            }
        }
        Ok(())
    }
}

fn coerce(value: f64) -> f64 {
    if value.is_finite() && value > 0.0 {
        value
    } else {
        0.0
    }
}
