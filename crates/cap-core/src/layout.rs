//! Shared calendar layout for many projects' bars.
//!
//! # Algorithm Summary
//!
//! 1. Size the left label column from the longest label, within bounds.
//! 2. Pad the dated span on both ends so bars never touch the edge.
//! 3. Pick a header granularity from the padded span and cut segments.
//! 4. If the segments overflow the available width, rescale every offset,
//!    width and the pixels-per-day factor by one uniform factor.
//! 5. Stack project headers and rows top to bottom; append a legend region
//!    only when legend items were requested.

use chrono::{Datelike, Duration, Months, NaiveDate};
use serde::{Deserialize, Serialize};

use crate::calendar::WorkCalendar;
use crate::estimate::EstimateConfig;
use crate::geometry::{DateScale, ScaleBounds};

/// Padding bounds in days, applied on each side of the span.
const MIN_PADDING_DAYS: i64 = 3;
const MAX_PADDING_DAYS: i64 = 30;

/// Label unit for calendar header segments.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Granularity {
    Days,
    Weeks,
    Months,
    Quarters,
    Years,
}

impl Granularity {
    /// Picks the unit for a span of `days` calendar days.
    pub const fn for_span(days: i64) -> Self {
        match days {
            ..=14 => Self::Days,
            15..=90 => Self::Weeks,
            91..=730 => Self::Months,
            731..=1825 => Self::Quarters,
            _ => Self::Years,
        }
    }

    /// Start of the unit containing `date`.
    fn unit_start(self, date: NaiveDate) -> NaiveDate {
        let first_of = |month: u32| NaiveDate::from_ymd_opt(date.year(), month, 1).unwrap_or(date);
        match self {
            Self::Days => date,
            Self::Weeks => date - Duration::days(i64::from(date.weekday().num_days_from_monday())),
            Self::Months => first_of(date.month()),
            Self::Quarters => first_of((date.month0() / 3) * 3 + 1),
            Self::Years => first_of(1),
        }
    }

    fn next_unit(self, start: NaiveDate) -> Option<NaiveDate> {
        match self {
            Self::Days => start.checked_add_signed(Duration::days(1)),
            Self::Weeks => start.checked_add_signed(Duration::days(7)),
            Self::Months => start.checked_add_months(Months::new(1)),
            Self::Quarters => start.checked_add_months(Months::new(3)),
            Self::Years => start.checked_add_months(Months::new(12)),
        }
    }

    fn label(self, start: NaiveDate) -> String {
        match self {
            Self::Days => start.format("%b %d").to_string(),
            Self::Weeks => format!("W{:02} {}", start.iso_week().week(), start.iso_week().year()),
            Self::Months => start.format("%b %Y").to_string(),
            Self::Quarters => format!("Q{} {}", start.month0() / 3 + 1, start.year()),
            Self::Years => start.year().to_string(),
        }
    }
}

/// Sizes and bounds used by the layout.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LayoutOptions {
    pub container_width: f64,
    pub right_margin: f64,
    pub min_left_margin: f64,
    pub max_left_margin: f64,
    /// Estimated width of one label character.
    pub char_width: f64,
    pub label_padding: f64,
    /// Fraction of the span added on each side, before day bounds.
    pub padding_ratio: f64,
    pub scale: ScaleBounds,
    pub header_height: f64,
    pub project_row_height: f64,
    pub row_height: f64,
    pub bar_height: f64,
    pub legend_gap: f64,
    pub legend_row_height: f64,
    pub legend_item_width: f64,
}

impl Default for LayoutOptions {
    fn default() -> Self {
        Self {
            container_width: 1200.0,
            right_margin: 20.0,
            min_left_margin: 120.0,
            max_left_margin: 320.0,
            char_width: 7.0,
            label_padding: 24.0,
            padding_ratio: 0.05,
            scale: ScaleBounds::default(),
            header_height: 48.0,
            project_row_height: 28.0,
            row_height: 24.0,
            bar_height: 16.0,
            legend_gap: 16.0,
            legend_row_height: 20.0,
            legend_item_width: 140.0,
        }
    }
}

/// One dated bar to place.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LayoutRow {
    pub label: String,
    pub start: NaiveDate,
    /// Inclusive.
    pub end: NaiveDate,
    /// Legend key the bar is colored by.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub marker: Option<String>,
}

/// A project and its rows.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LayoutProject {
    pub label: String,
    #[serde(default)]
    pub show_header: bool,
    pub rows: Vec<LayoutRow>,
}

impl LayoutProject {
    /// One row per placed phase, marked by the phase key.
    pub fn from_estimate(
        label: impl Into<String>,
        config: &EstimateConfig,
        start: NaiveDate,
        calendar: &WorkCalendar,
    ) -> Self {
        let rows = config
            .phase_dates(start, calendar)
            .into_iter()
            .map(|(phase, span)| LayoutRow {
                label: phase.to_string(),
                start: span.first,
                end: span.last,
                marker: Some(phase.to_string()),
            })
            .collect();
        Self {
            label: label.into(),
            show_header: true,
            rows,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LegendItem {
    pub key: String,
    pub label: String,
    pub color: String,
}

/// Calendar header cell.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TimelineSegment {
    pub label: String,
    pub start: NaiveDate,
    /// Exclusive.
    pub end: NaiveDate,
    pub x: f64,
    pub width: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PlacedHeader {
    pub project: usize,
    pub label: String,
    pub y: f64,
    pub height: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PlacedBar {
    pub project: usize,
    pub label: String,
    pub x: f64,
    pub width: f64,
    pub y: f64,
    pub height: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub marker: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LegendRegion {
    pub y: f64,
    pub height: f64,
    pub columns: usize,
    pub items: Vec<LegendItem>,
}

/// Fully positioned timeline.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TimelineLayout {
    pub granularity: Granularity,
    pub left_margin: f64,
    /// Width available to the date axis.
    pub timeline_width: f64,
    /// Date axis; `None` when nothing is dated.
    pub scale: Option<DateScale>,
    pub segments: Vec<TimelineSegment>,
    pub headers: Vec<PlacedHeader>,
    pub bars: Vec<PlacedBar>,
    pub legend: Option<LegendRegion>,
    pub total_height: f64,
}

/// Lays out every project on one shared calendar axis.
pub fn layout_timeline(
    projects: &[LayoutProject],
    legend: &[LegendItem],
    options: &LayoutOptions,
) -> TimelineLayout {
    let left_margin = left_margin(projects, options);
    let timeline_width = (options.container_width - left_margin - options.right_margin).max(0.0);

    let axis = date_bounds(projects).map(|(first, last)| build_axis(first, last, left_margin, timeline_width, options));
    let (granularity, scale, segments) = match axis {
        Some(axis) => (axis.granularity, Some(axis.scale), axis.segments),
        None => (Granularity::Days, None, Vec::new()),
    };

    let mut headers = Vec::new();
    let mut bars = Vec::new();
    let mut y = options.header_height;
    for (index, project) in projects.iter().enumerate() {
        if project.show_header {
            headers.push(PlacedHeader {
                project: index,
                label: project.label.clone(),
                y,
                height: options.project_row_height,
            });
            y += options.project_row_height;
        }
        for row in &project.rows {
            if let Some(scale) = &scale {
                bars.push(place_bar(index, row, scale, y, options));
            }
            y += options.row_height;
        }
    }

    let legend = (!legend.is_empty()).then(|| legend_region(legend, y, options));
    let total_height = legend
        .as_ref()
        .map_or(y, |region| region.y + region.height);

    TimelineLayout {
        granularity,
        left_margin,
        timeline_width,
        scale,
        segments,
        headers,
        bars,
        legend,
        total_height,
    }
}

/// Label column width from the longest label actually shown.
#[allow(clippy::cast_precision_loss)]
fn left_margin(projects: &[LayoutProject], options: &LayoutOptions) -> f64 {
    let longest = projects
        .iter()
        .flat_map(|project| {
            let header = project.show_header.then_some(project.label.as_str());
            header
                .into_iter()
                .chain(project.rows.iter().map(|row| row.label.as_str()))
        })
        .map(|label| label.chars().count())
        .max()
        .unwrap_or(0);
    let estimated = longest as f64 * options.char_width + options.label_padding;
    let (low, high) = if options.min_left_margin <= options.max_left_margin {
        (options.min_left_margin, options.max_left_margin)
    } else {
        (options.max_left_margin, options.min_left_margin)
    };
    estimated.clamp(low, high)
}

fn date_bounds(projects: &[LayoutProject]) -> Option<(NaiveDate, NaiveDate)> {
    let mut dates = projects
        .iter()
        .flat_map(|project| &project.rows)
        .flat_map(|row| [row.start, row.end]);
    let first = dates.next()?;
    Some(dates.fold((first, first), |(low, high), date| (low.min(date), high.max(date))))
}

/// Padding on each side: a share of the span, bounded in days.
#[allow(clippy::cast_possible_truncation, clippy::cast_precision_loss)]
fn padding_days(span_days: i64, ratio: f64) -> i64 {
    let raw = (span_days as f64 * ratio).round();
    let raw = if raw.is_finite() { raw as i64 } else { 0 };
    raw.clamp(MIN_PADDING_DAYS, MAX_PADDING_DAYS)
}

struct Axis {
    granularity: Granularity,
    scale: DateScale,
    segments: Vec<TimelineSegment>,
}

#[allow(clippy::cast_precision_loss)]
fn build_axis(
    first: NaiveDate,
    last: NaiveDate,
    left_margin: f64,
    timeline_width: f64,
    options: &LayoutOptions,
) -> Axis {
    let span_days = (last - first).num_days() + 1;
    let pad = padding_days(span_days, options.padding_ratio);
    let axis_start = first - Duration::days(pad);
    let axis_end = last + Duration::days(pad + 1);
    let axis_days = (axis_end - axis_start).num_days();

    let granularity = Granularity::for_span(axis_days);
    let mut scale = DateScale::new(
        axis_start,
        timeline_width / axis_days as f64,
        left_margin,
        options.scale,
    );
    let mut segments = cut_segments(granularity, axis_start, axis_end, &scale);

    let total: f64 = segments.iter().map(|segment| segment.width).sum();
    if total > timeline_width && total > 0.0 {
        let factor = timeline_width / total;
        tracing::debug!(total, timeline_width, factor, "rescaling overflowing timeline");
        for segment in &mut segments {
            segment.x = left_margin + (segment.x - left_margin) * factor;
            segment.width *= factor;
        }
        scale = scale.rescaled(factor);
    }

    Axis {
        granularity,
        scale,
        segments,
    }
}

#[allow(clippy::cast_precision_loss)]
fn cut_segments(
    granularity: Granularity,
    axis_start: NaiveDate,
    axis_end: NaiveDate,
    scale: &DateScale,
) -> Vec<TimelineSegment> {
    let mut segments = Vec::new();
    let mut boundary = granularity.unit_start(axis_start);
    while boundary < axis_end {
        let Some(next) = granularity.next_unit(boundary).filter(|next| *next > boundary) else {
            break;
        };
        let start = boundary.max(axis_start);
        let end = next.min(axis_end);
        segments.push(TimelineSegment {
            label: granularity.label(boundary),
            start,
            end,
            x: scale.date_to_pixel(start),
            width: (end - start).num_days() as f64 * scale.pixels_per_day,
        });
        boundary = next;
    }
    segments
}

#[allow(clippy::cast_precision_loss)]
fn place_bar(project: usize, row: &LayoutRow, scale: &DateScale, y: f64, options: &LayoutOptions) -> PlacedBar {
    let (start, end) = if row.start <= row.end {
        (row.start, row.end)
    } else {
        (row.end, row.start)
    };
    let days = (end - start).num_days() + 1;
    PlacedBar {
        project,
        label: row.label.clone(),
        x: scale.date_to_pixel(start),
        width: days as f64 * scale.pixels_per_day,
        y: y + ((options.row_height - options.bar_height) / 2.0).max(0.0),
        height: options.bar_height.min(options.row_height),
        marker: row.marker.clone(),
    }
}

#[allow(
    clippy::cast_precision_loss,
    clippy::cast_possible_truncation,
    clippy::cast_sign_loss
)]
fn legend_region(items: &[LegendItem], y: f64, options: &LayoutOptions) -> LegendRegion {
    let columns = if options.legend_item_width > 0.0 {
        (options.container_width / options.legend_item_width).floor().max(1.0) as usize
    } else {
        1
    };
    let rows = items.len().div_ceil(columns);
    let top = y + options.legend_gap;
    LegendRegion {
        y: top,
        height: rows as f64 * options.legend_row_height,
        columns,
        items: items.to_vec(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn project(label: &str, show_header: bool, rows: &[(&str, NaiveDate, NaiveDate)]) -> LayoutProject {
        LayoutProject {
            label: label.to_string(),
            show_header,
            rows: rows
                .iter()
                .map(|(label, start, end)| LayoutRow {
                    label: (*label).to_string(),
                    start: *start,
                    end: *end,
                    marker: None,
                })
                .collect(),
        }
    }

    fn options() -> LayoutOptions {
        LayoutOptions {
            container_width: 1000.0,
            ..LayoutOptions::default()
        }
    }

    #[test]
    fn granularity_thresholds() {
        assert_eq!(Granularity::for_span(1), Granularity::Days);
        assert_eq!(Granularity::for_span(14), Granularity::Days);
        assert_eq!(Granularity::for_span(15), Granularity::Weeks);
        assert_eq!(Granularity::for_span(91), Granularity::Months);
        assert_eq!(Granularity::for_span(800), Granularity::Quarters);
        assert_eq!(Granularity::for_span(3000), Granularity::Years);
    }

    #[test]
    fn padding_is_bounded() {
        assert_eq!(padding_days(10, 0.05), 3);
        assert_eq!(padding_days(200, 0.05), 10);
        assert_eq!(padding_days(2000, 0.05), 30);
        assert_eq!(padding_days(100, f64::NAN), 3);
    }

    #[test]
    fn left_margin_tracks_longest_label_within_bounds() {
        let opts = options();
        let short = [project("A", true, &[("x", date(2026, 1, 1), date(2026, 1, 2))])];
        assert!((left_margin(&short, &opts) - 120.0).abs() < f64::EPSILON);

        let medium = [project("A", false, &[("twenty characters ok", date(2026, 1, 1), date(2026, 1, 2))])];
        assert!((left_margin(&medium, &opts) - (20.0 * 7.0 + 24.0)).abs() < f64::EPSILON);

        let long_label = "x".repeat(200);
        let long = [project(&long_label, true, &[])];
        assert!((left_margin(&long, &opts) - 320.0).abs() < f64::EPSILON);

        // Hidden project headers do not widen the column.
        let hidden = [project(&long_label, false, &[("x", date(2026, 1, 1), date(2026, 1, 2))])];
        assert!((left_margin(&hidden, &opts) - 120.0).abs() < f64::EPSILON);
    }

    #[test]
    fn short_span_places_bar_at_padded_offset() {
        let projects = [project("Build", false, &[("Build", date(2026, 1, 1), date(2026, 1, 10))])];
        let layout = layout_timeline(&projects, &[], &options());

        // 10 days + 3 days padding each side; 860px available caps at 40px/day.
        assert_eq!(layout.granularity, Granularity::Weeks);
        let scale = layout.scale.unwrap();
        assert_eq!(scale.min_date, date(2025, 12, 29));
        assert!((scale.pixels_per_day - 40.0).abs() < f64::EPSILON);

        let bar = &layout.bars[0];
        assert!((bar.x - 240.0).abs() < f64::EPSILON);
        assert!((bar.width - 400.0).abs() < f64::EPSILON);
        assert!((bar.y - (48.0 + 4.0)).abs() < f64::EPSILON);
    }

    #[test]
    fn segments_tile_the_padded_axis() {
        let projects = [project("P", false, &[("a", date(2026, 2, 3), date(2026, 5, 20))])];
        let layout = layout_timeline(&projects, &[], &options());
        assert_eq!(layout.granularity, Granularity::Months);

        let scale = layout.scale.unwrap();
        let first = layout.segments.first().unwrap();
        assert_eq!(first.start, scale.min_date);
        assert!((first.x - layout.left_margin).abs() < 1e-9);
        for pair in layout.segments.windows(2) {
            assert_eq!(pair[0].end, pair[1].start);
            assert!((pair[0].x + pair[0].width - pair[1].x).abs() < 1e-9);
        }
        assert_eq!(first.label, "Jan 2026");
    }

    #[test]
    fn overflow_is_rescaled_to_fit_and_stays_aligned() {
        let projects = [project("P", false, &[("long", date(2020, 1, 1), date(2025, 12, 31))])];
        let layout = layout_timeline(&projects, &[], &options());
        assert_eq!(layout.granularity, Granularity::Years);

        let total: f64 = layout.segments.iter().map(|segment| segment.width).sum();
        assert!((total - layout.timeline_width).abs() < 1e-6);
        let last = layout.segments.last().unwrap();
        assert!((last.x + last.width - (layout.left_margin + layout.timeline_width)).abs() < 1e-6);

        // The bar starts where the date axis says its first day is.
        let scale = layout.scale.unwrap();
        let bar = &layout.bars[0];
        assert!((bar.x - scale.date_to_pixel(date(2020, 1, 1))).abs() < 1e-9);
        assert!(scale.pixels_per_day < options().scale.min);

        let segment_2021 = layout
            .segments
            .iter()
            .find(|segment| segment.label == "2021")
            .unwrap();
        assert!((segment_2021.x - scale.date_to_pixel(date(2021, 1, 1))).abs() < 1e-6);
    }

    #[test]
    fn rows_stack_below_optional_headers() {
        let projects = [
            project(
                "Alpha",
                true,
                &[
                    ("analysis", date(2026, 1, 1), date(2026, 1, 5)),
                    ("development", date(2026, 1, 6), date(2026, 2, 5)),
                ],
            ),
            project("Beta", false, &[("uat", date(2026, 2, 1), date(2026, 2, 9))]),
        ];
        let opts = options();
        let layout = layout_timeline(&projects, &[], &opts);

        assert_eq!(layout.headers.len(), 1);
        assert!((layout.headers[0].y - 48.0).abs() < f64::EPSILON);
        let tops: Vec<f64> = layout.bars.iter().map(|bar| bar.y - 4.0).collect();
        assert_eq!(tops, vec![76.0, 100.0, 124.0]);
        assert_eq!(layout.bars[2].project, 1);
        assert!(layout.legend.is_none());
        assert!((layout.total_height - 148.0).abs() < f64::EPSILON);
    }

    #[test]
    fn legend_is_appended_only_when_requested() {
        let projects = [project("P", false, &[("a", date(2026, 1, 1), date(2026, 1, 5))])];
        let legend: Vec<LegendItem> = (0..9)
            .map(|i| LegendItem {
                key: format!("k{i}"),
                label: format!("K{i}"),
                color: "#000000".to_string(),
            })
            .collect();
        let layout = layout_timeline(&projects, &legend, &options());

        let region = layout.legend.unwrap();
        // 1000px / 140px per item = 7 columns, so 2 rows.
        assert_eq!(region.columns, 7);
        assert!((region.y - (48.0 + 24.0 + 16.0)).abs() < f64::EPSILON);
        assert!((region.height - 40.0).abs() < f64::EPSILON);
        assert!((layout.total_height - (region.y + 40.0)).abs() < f64::EPSILON);
    }

    #[test]
    fn nothing_dated_yields_empty_axis() {
        let layout = layout_timeline(&[project("Empty", true, &[])], &[], &options());
        assert!(layout.scale.is_none());
        assert!(layout.segments.is_empty());
        assert!(layout.bars.is_empty());
        assert_eq!(layout.headers.len(), 1);
    }

    #[test]
    fn estimate_rows_follow_phase_dates() {
        let config = EstimateConfig::legacy_default();
        let project = LayoutProject::from_estimate("Portal", &config, date(2026, 1, 5), &WorkCalendar::new());
        assert_eq!(project.rows.len(), 9);
        assert_eq!(project.rows[0].label, "analysis");
        assert_eq!(project.rows[0].start, date(2026, 1, 5));
        assert_eq!(project.rows[0].marker.as_deref(), Some("analysis"));
    }
}
