//! Core domain logic for capacity planning.
//!
//! This crate contains the fundamental types and logic for:
//! - Intervals: phase placement on a fixed 10-slot grid
//! - Editing: drag gestures that move or resize a phase bar
//! - Distributions: per-phase category splits that sum to 100
//! - Aggregation: combining FTE results of many estimates
//! - Layout: placing many projects on one shared calendar axis

pub mod aggregation;
pub mod calendar;
pub mod category;
pub mod distribution;
pub mod editor;
pub mod estimate;
pub mod fte;
pub mod geometry;
pub mod interval;
pub mod layout;
pub mod observer;
pub mod phase;

pub use aggregation::{
    AggregatedBucket, AggregatedResult, FteInput, aggregate_fte_results, resolve_category_keys,
};
pub use calendar::{DateSpan, WorkCalendar};
pub use category::{CategoryRegistry, DefaultLabels, LEGACY_CATEGORIES, LabelResolver};
pub use distribution::{DistributionError, DistributionTable, SUM_TOLERANCE};
pub use editor::{DragMode, DragPreview, DragSession, EditorError, IntervalEditor};
pub use estimate::{
    CommonSettings, ConfigError, Distribution, EstimateConfig, PhaseConfig, PhaseDistributions,
    PhaseIntervals,
};
pub use fte::{CategoryEffort, FteBucket, FteRequest, FteResult};
pub use geometry::{DateScale, PixelSpan, ScaleBounds, SlotGeometry};
pub use interval::{IntervalError, IntervalRange, SLOT_COUNT, TotalDays};
pub use layout::{
    Granularity, LayoutOptions, LayoutProject, LayoutRow, LegendItem, TimelineLayout,
    layout_timeline,
};
pub use observer::{ConfigObserver, RecordingObserver};
pub use phase::{PhaseKey, UnknownPhase};
