//! Discrete interval model.
//!
//! A phase occupies a contiguous range of slots on a fixed grid of
//! [`SLOT_COUNT`] equal-width relative slots. [`TotalDays`] gives that grid
//! its calendar meaning without ever reshaping the ranges themselves.

use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Number of slots on the relative timeline.
pub const SLOT_COUNT: u8 = 10;

/// Interval model errors.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum IntervalError {
    /// A slot outside `[1, SLOT_COUNT]`.
    #[error("slot {slot} is outside 1..={SLOT_COUNT}")]
    SlotOutOfRange { slot: i64 },

    /// Start after end.
    #[error("range start {start} is after end {end}")]
    Inverted { start: u8, end: u8 },

    /// A stored slot list with gaps or duplicates.
    #[error("slot list {values:?} is not a contiguous range")]
    NonContiguous { values: Vec<i64> },

    /// Elapsed days not in the supported set.
    #[error("unsupported total days: {0} (expected one of 10, 20, 40, 60, 120, 240)")]
    UnsupportedTotalDays(u16),
}

/// Contiguous slot range `[start, end]`, both inclusive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct IntervalRange {
    start: u8,
    end: u8,
}

impl IntervalRange {
    /// The range covering the whole grid.
    pub const FULL: Self = Self {
        start: 1,
        end: SLOT_COUNT,
    };

    /// Creates a range after validating both bounds.
    pub fn new(start: u8, end: u8) -> Result<Self, IntervalError> {
        if start < 1 || start > SLOT_COUNT {
            return Err(IntervalError::SlotOutOfRange { slot: i64::from(start) });
        }
        if end < 1 || end > SLOT_COUNT {
            return Err(IntervalError::SlotOutOfRange { slot: i64::from(end) });
        }
        if start > end {
            return Err(IntervalError::Inverted { start, end });
        }
        Ok(Self { start, end })
    }

    /// Creates a single-slot range, clamping the slot onto the grid.
    pub fn single(slot: i64) -> Self {
        let slot = clamp_slot(slot);
        Self {
            start: slot,
            end: slot,
        }
    }

    pub const fn start(self) -> u8 {
        self.start
    }

    pub const fn end(self) -> u8 {
        self.end
    }

    /// Number of occupied slots (always at least 1).
    pub const fn len(self) -> u8 {
        self.end - self.start + 1
    }

    pub const fn contains(self, slot: u8) -> bool {
        slot >= self.start && slot <= self.end
    }

    /// Iterates the occupied slots in ascending order.
    pub fn slots(self) -> impl Iterator<Item = u8> {
        self.start..=self.end
    }

    /// Moves the whole range by `delta` slots, keeping its length and
    /// staying on the grid.
    #[must_use]
    pub fn shifted(self, delta: i64) -> Self {
        let len = i64::from(self.len());
        let max_start = i64::from(SLOT_COUNT) - len + 1;
        let start = (i64::from(self.start) + delta).clamp(1, max_start);
        let end = start + len - 1;
        Self {
            start: clamp_slot(start),
            end: clamp_slot(end),
        }
    }

    /// Moves the left edge by `delta` slots without crossing the right edge.
    #[must_use]
    pub fn with_start_moved(self, delta: i64) -> Self {
        let start = (i64::from(self.start) + delta).clamp(1, i64::from(self.end));
        Self {
            start: clamp_slot(start),
            end: self.end,
        }
    }

    /// Moves the right edge by `delta` slots without crossing the left edge.
    #[must_use]
    pub fn with_end_moved(self, delta: i64) -> Self {
        let end = (i64::from(self.end) + delta).clamp(i64::from(self.start), i64::from(SLOT_COUNT));
        Self {
            start: self.start,
            end: clamp_slot(end),
        }
    }

    /// Parses a persisted slot list.
    ///
    /// An empty list means the phase has no placement. Order does not matter,
    /// but the slots must form one contiguous run without duplicates.
    pub fn from_values(values: &[i64]) -> Result<Option<Self>, IntervalError> {
        if values.is_empty() {
            return Ok(None);
        }
        if let Some(&slot) = values
            .iter()
            .find(|&&slot| slot < 1 || slot > i64::from(SLOT_COUNT))
        {
            return Err(IntervalError::SlotOutOfRange { slot });
        }

        let mut sorted = values.to_vec();
        sorted.sort_unstable();
        let contiguous = sorted.windows(2).all(|pair| pair[1] == pair[0] + 1);
        if !contiguous {
            return Err(IntervalError::NonContiguous {
                values: values.to_vec(),
            });
        }

        let start = clamp_slot(sorted[0]);
        let end = clamp_slot(sorted[sorted.len() - 1]);
        Ok(Some(Self { start, end }))
    }

    /// Flat slot list for persistence.
    pub fn to_values(self) -> Vec<i64> {
        self.slots().map(i64::from).collect()
    }

    /// Elapsed working days covered by this range.
    pub fn duration_days(self, total: TotalDays) -> f64 {
        f64::from(self.len()) * total.days_per_slot()
    }
}

impl fmt::Display for IntervalRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.start == self.end {
            write!(f, "[{}]", self.start)
        } else {
            write!(f, "[{}-{}]", self.start, self.end)
        }
    }
}

/// Clamps any integer onto the slot grid.
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
pub fn clamp_slot(slot: i64) -> u8 {
    slot.clamp(1, i64::from(SLOT_COUNT)) as u8
}

/// Calendar duration mapped onto the slot grid, in working days.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "u16", into = "u16")]
pub enum TotalDays {
    D10,
    D20,
    D40,
    #[default]
    D60,
    D120,
    D240,
}

impl TotalDays {
    pub const ALL: [Self; 6] = [
        Self::D10,
        Self::D20,
        Self::D40,
        Self::D60,
        Self::D120,
        Self::D240,
    ];

    pub const fn days(self) -> u16 {
        match self {
            Self::D10 => 10,
            Self::D20 => 20,
            Self::D40 => 40,
            Self::D60 => 60,
            Self::D120 => 120,
            Self::D240 => 240,
        }
    }

    pub fn days_per_slot(self) -> f64 {
        f64::from(self.days()) / f64::from(SLOT_COUNT)
    }

    /// Label unit for the period header.
    pub const fn period_unit(self) -> PeriodUnit {
        match self {
            Self::D10 | Self::D20 => PeriodUnit::Week,
            Self::D40 | Self::D60 | Self::D120 => PeriodUnit::Month,
            Self::D240 => PeriodUnit::Quarter,
        }
    }

    pub const fn period_count(self) -> u16 {
        self.days() / self.period_unit().working_days()
    }

    /// Period labels laid out in slot units across the whole grid.
    pub fn period_labels(self) -> Vec<PeriodLabel> {
        let count = self.period_count();
        let width = f64::from(SLOT_COUNT) / f64::from(count);
        let prefix = self.period_unit().prefix();
        (0..count)
            .map(|index| PeriodLabel {
                label: format!("{prefix}{}", index + 1),
                offset: f64::from(index) * width,
                width,
            })
            .collect()
    }
}

impl TryFrom<u16> for TotalDays {
    type Error = IntervalError;

    fn try_from(value: u16) -> Result<Self, Self::Error> {
        Self::ALL
            .into_iter()
            .find(|total| total.days() == value)
            .ok_or(IntervalError::UnsupportedTotalDays(value))
    }
}

impl From<TotalDays> for u16 {
    fn from(total: TotalDays) -> Self {
        total.days()
    }
}

impl fmt::Display for TotalDays {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} days", self.days())
    }
}

/// Granularity of the relative period header.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum PeriodUnit {
    Week,
    Month,
    Quarter,
}

impl PeriodUnit {
    /// Working days in one period.
    pub const fn working_days(self) -> u16 {
        match self {
            Self::Week => 5,
            Self::Month => 20,
            Self::Quarter => 60,
        }
    }

    const fn prefix(self) -> &'static str {
        match self {
            Self::Week => "W",
            Self::Month => "M",
            Self::Quarter => "Q",
        }
    }
}

/// One header label, positioned in slot units (`0.0..=10.0`).
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PeriodLabel {
    pub label: String,
    pub offset: f64,
    pub width: f64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_rejects_out_of_grid_and_inverted() {
        assert!(IntervalRange::new(0, 3).is_err());
        assert!(IntervalRange::new(2, 11).is_err());
        assert_eq!(
            IntervalRange::new(5, 4),
            Err(IntervalError::Inverted { start: 5, end: 4 })
        );
        assert!(IntervalRange::new(4, 4).is_ok());
    }

    #[test]
    fn from_values_accepts_unordered_contiguous_lists() {
        let range = IntervalRange::from_values(&[5, 3, 4]).unwrap().unwrap();
        assert_eq!((range.start(), range.end()), (3, 5));
        assert_eq!(range.to_values(), vec![3, 4, 5]);
    }

    #[test]
    fn from_values_empty_means_no_placement() {
        assert_eq!(IntervalRange::from_values(&[]).unwrap(), None);
    }

    #[test]
    fn from_values_rejects_gaps_duplicates_and_out_of_range() {
        assert!(matches!(
            IntervalRange::from_values(&[1, 2, 4]),
            Err(IntervalError::NonContiguous { .. })
        ));
        assert!(matches!(
            IntervalRange::from_values(&[2, 2, 3]),
            Err(IntervalError::NonContiguous { .. })
        ));
        assert_eq!(
            IntervalRange::from_values(&[10, 11]),
            Err(IntervalError::SlotOutOfRange { slot: 11 })
        );
    }

    #[test]
    fn shifted_keeps_length_and_clamps_at_both_ends() {
        let range = IntervalRange::new(3, 5).unwrap();
        assert_eq!(range.shifted(2), IntervalRange::new(5, 7).unwrap());
        assert_eq!(range.shifted(20), IntervalRange::new(8, 10).unwrap());
        assert_eq!(range.shifted(-20), IntervalRange::new(1, 3).unwrap());
        for delta in -12..=12 {
            assert_eq!(range.shifted(delta).len(), 3);
        }
    }

    #[test]
    fn edge_moves_never_cross() {
        let range = IntervalRange::new(4, 6).unwrap();
        for delta in -12..=12 {
            let left = range.with_start_moved(delta);
            assert!(left.start() <= left.end());
            assert_eq!(left.end(), 6);

            let right = range.with_end_moved(delta);
            assert!(right.end() >= right.start());
            assert_eq!(right.start(), 4);
        }
        assert_eq!(range.with_start_moved(5), IntervalRange::new(6, 6).unwrap());
        assert_eq!(range.with_end_moved(-5), IntervalRange::new(4, 4).unwrap());
    }

    #[test]
    fn total_days_parses_supported_values_only() {
        assert_eq!(TotalDays::try_from(120).unwrap(), TotalDays::D120);
        assert_eq!(
            TotalDays::try_from(30),
            Err(IntervalError::UnsupportedTotalDays(30))
        );
        let parsed: TotalDays = serde_json::from_str("40").unwrap();
        assert_eq!(parsed, TotalDays::D40);
        assert!(serde_json::from_str::<TotalDays>("45").is_err());
        assert_eq!(serde_json::to_string(&TotalDays::D240).unwrap(), "240");
    }

    #[test]
    fn period_labels_follow_granularity() {
        let labels: Vec<_> = TotalDays::D20
            .period_labels()
            .into_iter()
            .map(|period| period.label)
            .collect();
        assert_eq!(labels, vec!["W1", "W2", "W3", "W4"]);

        assert_eq!(TotalDays::D10.period_count(), 2);
        assert_eq!(TotalDays::D60.period_unit(), PeriodUnit::Month);
        assert_eq!(TotalDays::D120.period_count(), 6);
        assert_eq!(TotalDays::D240.period_unit(), PeriodUnit::Quarter);
        assert_eq!(TotalDays::D240.period_count(), 4);
    }

    #[test]
    fn period_labels_tile_the_grid() {
        for total in TotalDays::ALL {
            let labels = total.period_labels();
            let covered: f64 = labels.iter().map(|label| label.width).sum();
            assert!((covered - f64::from(SLOT_COUNT)).abs() < 1e-9, "{total}");
        }
    }

    #[test]
    fn duration_scales_with_total_days() {
        let range = IntervalRange::new(2, 4).unwrap();
        assert!((range.duration_days(TotalDays::D10) - 3.0).abs() < f64::EPSILON);
        assert!((range.duration_days(TotalDays::D240) - 72.0).abs() < f64::EPSILON);
    }
}
