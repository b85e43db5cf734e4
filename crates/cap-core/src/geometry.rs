//! Conversions between slots, pixels and dates.
//!
//! Every conversion here is total. Pointer gestures routinely produce
//! transient out-of-bounds positions, so inputs are clamped instead of
//! rejected.

use chrono::{Duration, NaiveDate};
use serde::{Deserialize, Serialize};

use crate::interval::{IntervalRange, SLOT_COUNT, clamp_slot};

/// Left pixel edge of `slot`.
pub fn slot_to_pixel(slot: u8, left_margin: f64, slot_width: f64) -> f64 {
    let slot = clamp_slot(i64::from(slot));
    left_margin + f64::from(slot - 1) * slot_width
}

/// Nearest slot to a pixel offset, clamped onto the grid.
#[allow(clippy::cast_possible_truncation)]
pub fn pixel_to_slot(pixel: f64, left_margin: f64, slot_width: f64) -> u8 {
    if !slot_width.is_finite() || slot_width <= 0.0 || !pixel.is_finite() {
        return 1;
    }
    let index = ((pixel - left_margin) / slot_width).round();
    let index = index.clamp(0.0, f64::from(SLOT_COUNT - 1)) as i64;
    clamp_slot(index + 1)
}

/// Horizontal extent of a rendered bar.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct PixelSpan {
    pub x: f64,
    pub width: f64,
}

impl PixelSpan {
    pub fn right(self) -> f64 {
        self.x + self.width
    }
}

/// Slot grid placed inside a drawing area.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SlotGeometry {
    pub left_margin: f64,
    pub slot_width: f64,
}

impl SlotGeometry {
    pub const fn new(left_margin: f64, slot_width: f64) -> Self {
        Self {
            left_margin,
            slot_width,
        }
    }

    /// Spreads the grid over a timeline of `total_width` pixels.
    pub fn fit(total_width: f64, left_margin: f64, right_margin: f64) -> Self {
        let usable = (total_width - left_margin - right_margin).max(0.0);
        let slot_width = if usable.is_finite() {
            usable / f64::from(SLOT_COUNT)
        } else {
            0.0
        };
        Self {
            left_margin,
            slot_width,
        }
    }

    pub fn slot_to_pixel(&self, slot: u8) -> f64 {
        slot_to_pixel(slot, self.left_margin, self.slot_width)
    }

    pub fn pixel_to_slot(&self, pixel: f64) -> u8 {
        pixel_to_slot(pixel, self.left_margin, self.slot_width)
    }

    /// Left edge of slot 1 and right edge of the last slot.
    pub fn grid_bounds(&self) -> (f64, f64) {
        let width = self.slot_width.max(0.0);
        (
            self.left_margin,
            self.left_margin + width * f64::from(SLOT_COUNT),
        )
    }

    pub fn span_of(&self, range: IntervalRange) -> PixelSpan {
        PixelSpan {
            x: self.slot_to_pixel(range.start()),
            width: f64::from(range.len()) * self.slot_width.max(0.0),
        }
    }

    /// Whole slots covered by a pointer delta, rounded to nearest.
    #[allow(clippy::cast_possible_truncation)]
    pub fn delta_slots(&self, delta_px: f64) -> i64 {
        if !self.slot_width.is_finite() || self.slot_width <= 0.0 || !delta_px.is_finite() {
            return 0;
        }
        let slots = (delta_px / self.slot_width).round();
        slots.clamp(-f64::from(SLOT_COUNT), f64::from(SLOT_COUNT)) as i64
    }

    /// Snaps a free-floating span back onto whole slots.
    pub fn snap_span(&self, span: PixelSpan) -> IntervalRange {
        let start = self.pixel_to_slot(span.x);
        let end_edge = span.right() - self.slot_width;
        let end = self.pixel_to_slot(end_edge).max(start);
        IntervalRange::new(start, end).unwrap_or_else(|_| IntervalRange::single(i64::from(start)))
    }
}

/// Lower and upper bound for a pixels-per-day scale.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ScaleBounds {
    pub min: f64,
    pub max: f64,
}

impl ScaleBounds {
    pub fn clamp(self, value: f64) -> f64 {
        let (low, high) = if self.min <= self.max {
            (self.min, self.max)
        } else {
            (self.max, self.min)
        };
        if value.is_finite() {
            value.clamp(low, high)
        } else {
            low
        }
    }
}

impl Default for ScaleBounds {
    fn default() -> Self {
        Self { min: 0.5, max: 40.0 }
    }
}

/// Affine date axis.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct DateScale {
    pub min_date: NaiveDate,
    pub pixels_per_day: f64,
    pub left_margin: f64,
}

impl DateScale {
    pub fn new(min_date: NaiveDate, pixels_per_day: f64, left_margin: f64, bounds: ScaleBounds) -> Self {
        Self {
            min_date,
            pixels_per_day: bounds.clamp(pixels_per_day),
            left_margin,
        }
    }

    #[allow(clippy::cast_precision_loss)]
    pub fn date_to_pixel(&self, date: NaiveDate) -> f64 {
        let days = (date - self.min_date).num_days();
        self.left_margin + days as f64 * self.pixels_per_day
    }

    /// Nearest whole day to a pixel offset.
    #[allow(clippy::cast_possible_truncation)]
    pub fn pixel_to_date(&self, pixel: f64) -> NaiveDate {
        if self.pixels_per_day <= 0.0 || !pixel.is_finite() {
            return self.min_date;
        }
        // chrono's representable range is far beyond this clamp.
        let days = ((pixel - self.left_margin) / self.pixels_per_day)
            .round()
            .clamp(-1_000_000.0, 1_000_000.0) as i64;
        self.min_date + Duration::days(days)
    }

    /// Same axis with every distance multiplied by `factor`.
    #[must_use]
    pub fn rescaled(self, factor: f64) -> Self {
        Self {
            pixels_per_day: self.pixels_per_day * factor,
            ..self
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn slot_pixel_round_trip() {
        for width in [1.0, 7.5, 48.0, 123.4] {
            for slot in 1..=SLOT_COUNT {
                let px = slot_to_pixel(slot, 160.0, width);
                assert_eq!(pixel_to_slot(px, 160.0, width), slot, "width {width}");
            }
        }
    }

    #[test]
    fn pixel_to_slot_clamps_out_of_range() {
        assert_eq!(pixel_to_slot(-500.0, 100.0, 50.0), 1);
        assert_eq!(pixel_to_slot(10_000.0, 100.0, 50.0), SLOT_COUNT);
        assert_eq!(pixel_to_slot(124.0, 100.0, 50.0), 1);
        assert_eq!(pixel_to_slot(126.0, 100.0, 50.0), 2);
    }

    #[test]
    fn degenerate_width_never_panics() {
        assert_eq!(pixel_to_slot(300.0, 100.0, 0.0), 1);
        assert_eq!(pixel_to_slot(f64::NAN, 100.0, 10.0), 1);
        let geometry = SlotGeometry::fit(50.0, 100.0, 20.0);
        assert!(geometry.slot_width.abs() < f64::EPSILON);
        assert_eq!(geometry.delta_slots(400.0), 0);
    }

    #[test]
    fn fit_divides_usable_width() {
        let geometry = SlotGeometry::fit(700.0, 150.0, 50.0);
        assert!((geometry.slot_width - 50.0).abs() < f64::EPSILON);
        assert_eq!(geometry.grid_bounds(), (150.0, 650.0));
    }

    #[test]
    fn span_snaps_back_to_range() {
        let geometry = SlotGeometry::new(100.0, 40.0);
        let range = IntervalRange::new(3, 6).unwrap();
        let span = geometry.span_of(range);
        assert!((span.x - 180.0).abs() < f64::EPSILON);
        assert!((span.width - 160.0).abs() < f64::EPSILON);
        assert_eq!(geometry.snap_span(span), range);

        let nudged = PixelSpan {
            x: span.x + 15.0,
            width: span.width,
        };
        assert_eq!(geometry.snap_span(nudged), range);
    }

    #[test]
    fn delta_slots_rounds_to_nearest() {
        let geometry = SlotGeometry::new(0.0, 40.0);
        assert_eq!(geometry.delta_slots(19.0), 0);
        assert_eq!(geometry.delta_slots(21.0), 1);
        assert_eq!(geometry.delta_slots(-61.0), -2);
    }

    #[test]
    fn date_scale_clamps_and_inverts() {
        let min = NaiveDate::from_ymd_opt(2026, 3, 1).unwrap();
        let scale = DateScale::new(min, 500.0, 120.0, ScaleBounds { min: 1.0, max: 20.0 });
        assert!((scale.pixels_per_day - 20.0).abs() < f64::EPSILON);

        let date = NaiveDate::from_ymd_opt(2026, 3, 11).unwrap();
        let px = scale.date_to_pixel(date);
        assert!((px - 320.0).abs() < f64::EPSILON);
        assert_eq!(scale.pixel_to_date(px + 4.0), date);

        let degenerate = DateScale::new(min, 0.0, 0.0, ScaleBounds { min: 0.0, max: 0.0 });
        assert_eq!(degenerate.pixel_to_date(999.0), min);
    }
}
