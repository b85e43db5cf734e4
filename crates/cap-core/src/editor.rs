//! Direct-manipulation editor for phase bars.
//!
//! The editor is a small state machine:
//!
//! ```text
//! Idle --pointer_down--> Dragging(move | resize-left | resize-right)
//! Dragging --pointer_move--> Dragging   (preview only, nothing committed)
//! Dragging --pointer_up--> Idle         (snap, write back, notify once)
//! Dragging --cancel--> Idle             (teardown, nothing committed)
//! ```
//!
//! The live session is kept apart from the committed [`PhaseIntervals`];
//! the rendering layer draws previews from [`DragPreview`] and the model is
//! only touched when the gesture completes.

use std::fmt;

use serde::Serialize;
use thiserror::Error;

use crate::estimate::PhaseIntervals;
use crate::geometry::{PixelSpan, SlotGeometry};
use crate::interval::IntervalRange;
use crate::observer::ConfigObserver;
use crate::phase::PhaseKey;

/// Editor errors.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum EditorError {
    /// A gesture is already in progress and must be released first.
    #[error("a drag session for {phase} is already active")]
    SessionActive { phase: PhaseKey },

    /// The phase has no interval, so there is no bar to grab.
    #[error("phase {phase} has no bar to drag")]
    NoBar { phase: PhaseKey },
}

/// What part of the bar the pointer grabbed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum DragMode {
    /// Bar body: the whole range moves.
    Move,
    /// Left handle: only the start moves.
    ResizeLeft,
    /// Right handle: only the end moves.
    ResizeRight,
}

impl fmt::Display for DragMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Move => "move",
            Self::ResizeLeft => "resize-left",
            Self::ResizeRight => "resize-right",
        };
        f.write_str(s)
    }
}

/// Snapshot taken on pointer-down.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct DragSession {
    pub phase: PhaseKey,
    pub mode: DragMode,
    pub initial: IntervalRange,
    pub initial_span: PixelSpan,
    pub origin_x: f64,
}

impl DragSession {
    /// Range the gesture would commit after `delta_slots` whole slots.
    pub fn candidate(&self, delta_slots: i64) -> IntervalRange {
        match self.mode {
            DragMode::Move => self.initial.shifted(delta_slots),
            DragMode::ResizeLeft => self.initial.with_start_moved(delta_slots),
            DragMode::ResizeRight => self.initial.with_end_moved(delta_slots),
        }
    }
}

/// Ephemeral visual feedback for an in-progress gesture.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct DragPreview {
    pub phase: PhaseKey,
    /// Free-floating span at sub-slot resolution, kept inside the grid.
    pub span: PixelSpan,
    /// Range a release at this position would commit.
    pub snapped: IntervalRange,
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum EditorState {
    Idle,
    Dragging(DragSession),
}

/// Owns the drag lifecycle for the bars of one estimate.
#[derive(Debug, Clone)]
pub struct IntervalEditor {
    geometry: SlotGeometry,
    state: EditorState,
}

impl IntervalEditor {
    pub const fn new(geometry: SlotGeometry) -> Self {
        Self {
            geometry,
            state: EditorState::Idle,
        }
    }

    pub const fn geometry(&self) -> SlotGeometry {
        self.geometry
    }

    /// Container resized. An active session keeps its pixel snapshot.
    pub fn set_geometry(&mut self, geometry: SlotGeometry) {
        self.geometry = geometry;
    }

    pub const fn is_dragging(&self) -> bool {
        matches!(self.state, EditorState::Dragging(_))
    }

    pub const fn session(&self) -> Option<&DragSession> {
        match &self.state {
            EditorState::Dragging(session) => Some(session),
            EditorState::Idle => None,
        }
    }

    /// Committed bar position for a phase; `None` when it has no interval.
    pub fn bar(&self, intervals: &PhaseIntervals, phase: PhaseKey) -> Option<PixelSpan> {
        intervals
            .get(&phase)
            .map(|range| self.geometry.span_of(*range))
    }

    /// Starts a gesture on a phase bar.
    pub fn pointer_down(
        &mut self,
        phase: PhaseKey,
        mode: DragMode,
        intervals: &PhaseIntervals,
        pointer_x: f64,
    ) -> Result<(), EditorError> {
        if let EditorState::Dragging(active) = &self.state {
            return Err(EditorError::SessionActive {
                phase: active.phase,
            });
        }
        let initial = *intervals.get(&phase).ok_or(EditorError::NoBar { phase })?;

        let session = DragSession {
            phase,
            mode,
            initial,
            initial_span: self.geometry.span_of(initial),
            origin_x: pointer_x,
        };
        tracing::debug!(%phase, %mode, range = %initial, "drag session started");
        self.state = EditorState::Dragging(session);
        Ok(())
    }

    /// Updates the preview. Returns `None` when no gesture is active.
    pub fn pointer_move(&self, pointer_x: f64) -> Option<DragPreview> {
        let session = self.session()?;
        let delta_px = finite_or_zero(pointer_x - session.origin_x);
        Some(DragPreview {
            phase: session.phase,
            span: self.preview_span(session, delta_px),
            snapped: session.candidate(self.geometry.delta_slots(delta_px)),
        })
    }

    /// Ends the gesture, committing the snapped range.
    ///
    /// Returns the committed range, or `None` when nothing changed (no
    /// session, zero net movement, or the phase vanished mid-gesture). The
    /// observer is notified only when a range is returned.
    pub fn pointer_up<O: ConfigObserver + ?Sized>(
        &mut self,
        pointer_x: f64,
        intervals: &mut PhaseIntervals,
        observer: &mut O,
    ) -> Option<IntervalRange> {
        let EditorState::Dragging(session) = std::mem::replace(&mut self.state, EditorState::Idle)
        else {
            return None;
        };

        let delta_px = finite_or_zero(pointer_x - session.origin_x);
        let candidate = session.candidate(self.geometry.delta_slots(delta_px));
        let committed = IntervalRange::new(candidate.start(), candidate.end()).ok()?;

        let Some(current) = intervals.get_mut(&session.phase) else {
            tracing::debug!(phase = %session.phase, "phase lost its interval during drag");
            return None;
        };
        if *current == committed {
            tracing::debug!(phase = %session.phase, "drag released without change");
            return None;
        }

        *current = committed;
        tracing::debug!(
            phase = %session.phase,
            from = %session.initial,
            to = %committed,
            "intervals committed"
        );
        observer.intervals_changed(intervals);
        Some(committed)
    }

    /// Abandons the active gesture without committing.
    pub fn cancel(&mut self) -> Option<DragSession> {
        match std::mem::replace(&mut self.state, EditorState::Idle) {
            EditorState::Dragging(session) => Some(session),
            EditorState::Idle => None,
        }
    }

    fn preview_span(&self, session: &DragSession, delta_px: f64) -> PixelSpan {
        let (low, high) = self.geometry.grid_bounds();
        let slot_width = self.geometry.slot_width.max(0.0);
        let initial = session.initial_span;

        match session.mode {
            DragMode::Move => PixelSpan {
                x: bounded(initial.x + delta_px, low, high - initial.width),
                width: initial.width,
            },
            DragMode::ResizeLeft => {
                let right = initial.right();
                let x = bounded(initial.x + delta_px, low, right - slot_width);
                PixelSpan {
                    x,
                    width: right - x,
                }
            }
            DragMode::ResizeRight => {
                let right = bounded(initial.right() + delta_px, initial.x + slot_width, high);
                PixelSpan {
                    x: initial.x,
                    width: right - initial.x,
                }
            }
        }
    }
}

/// Clamp that tolerates an empty interval by pinning to `low`.
fn bounded(value: f64, low: f64, high: f64) -> f64 {
    value.min(high).max(low)
}

fn finite_or_zero(value: f64) -> f64 {
    if value.is_finite() { value } else { 0.0 }
}
