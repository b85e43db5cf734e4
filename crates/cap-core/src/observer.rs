//! Change notifications for owners of an estimate configuration.

use crate::estimate::{PhaseDistributions, PhaseIntervals};

/// Receives committed edits so callers can batch persistence.
///
/// Every method defaults to a no-op; `()` ignores everything.
pub trait ConfigObserver {
    /// Fired once per committed drag or resize, never per pointer move.
    fn intervals_changed(&mut self, _intervals: &PhaseIntervals) {}

    /// Fired after every accepted distribution edit.
    fn distribution_changed(&mut self, _distribution: &PhaseDistributions) {}

    /// Fired after a category is added or removed.
    fn category_keys_changed(&mut self, _keys: &[String]) {}
}

impl ConfigObserver for () {}

/// Observer that keeps every notification, handy for tests and for
/// collecting the last state before a single persistence call.
#[derive(Debug, Default, Clone)]
pub struct RecordingObserver {
    pub intervals: Vec<PhaseIntervals>,
    pub distributions: Vec<PhaseDistributions>,
    pub category_keys: Vec<Vec<String>>,
}

impl RecordingObserver {
    pub fn is_empty(&self) -> bool {
        self.intervals.is_empty() && self.distributions.is_empty() && self.category_keys.is_empty()
    }
}

impl ConfigObserver for RecordingObserver {
    fn intervals_changed(&mut self, intervals: &PhaseIntervals) {
        self.intervals.push(intervals.clone());
    }

    fn distribution_changed(&mut self, distribution: &PhaseDistributions) {
        self.distributions.push(distribution.clone());
    }

    fn category_keys_changed(&mut self, keys: &[String]) {
        self.category_keys.push(keys.to_vec());
    }
}
