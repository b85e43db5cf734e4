//! Working-day calendar projection of slot ranges.

use std::collections::BTreeSet;

use chrono::{Datelike, Duration, NaiveDate, Weekday};

use crate::interval::{IntervalRange, SLOT_COUNT, TotalDays};

/// Weekends plus an optional holiday list are non-working.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WorkCalendar {
    holidays: BTreeSet<NaiveDate>,
}

impl WorkCalendar {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_holidays(holidays: impl IntoIterator<Item = NaiveDate>) -> Self {
        Self {
            holidays: holidays.into_iter().collect(),
        }
    }

    pub fn is_working_day(&self, date: NaiveDate) -> bool {
        !matches!(date.weekday(), Weekday::Sat | Weekday::Sun) && !self.holidays.contains(&date)
    }

    /// First working day on or after `date`.
    pub fn next_working_day(&self, date: NaiveDate) -> NaiveDate {
        let mut current = date;
        // A year of consecutive holidays is not a real calendar.
        for _ in 0..366 {
            if self.is_working_day(current) {
                return current;
            }
            current += Duration::days(1);
        }
        date
    }

    /// Advances `days` working days from the first working day on or after
    /// `date`. Zero returns that first working day.
    pub fn add_working_days(&self, date: NaiveDate, days: u32) -> NaiveDate {
        let mut current = self.next_working_day(date);
        for _ in 0..days {
            current = self.next_working_day(current + Duration::days(1));
        }
        current
    }
}

/// First and last calendar day a range occupies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
pub struct DateSpan {
    pub first: NaiveDate,
    pub last: NaiveDate,
}

impl DateSpan {
    /// Inclusive day count.
    pub fn calendar_days(self) -> i64 {
        (self.last - self.first).num_days() + 1
    }
}

impl IntervalRange {
    /// Projects the range onto real dates starting at `start`.
    ///
    /// Slot `s` begins at working-day offset `floor((s-1) * days / 10)`; the
    /// range ends on the working day before offset `ceil(end * days / 10)`.
    pub fn to_dates(self, start: NaiveDate, total: TotalDays, calendar: &WorkCalendar) -> DateSpan {
        let days = u32::from(total.days());
        let slots = u32::from(SLOT_COUNT);
        let first_offset = (u32::from(self.start()) - 1) * days / slots;
        let end_offset = (u32::from(self.end()) * days).div_ceil(slots);
        let last_offset = end_offset.saturating_sub(1).max(first_offset);

        DateSpan {
            first: calendar.add_working_days(start, first_offset),
            last: calendar.add_working_days(start, last_offset),
        }
    }
}
