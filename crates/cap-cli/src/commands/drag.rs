//! Drag command: replays a pointer gesture on a phase bar.

use std::io::Write;

use anyhow::{Context, Result};
use cap_core::{DragMode, IntervalEditor, PhaseKey, SlotGeometry};
use clap::{Args, ValueEnum};

use crate::Config;
use crate::commands::util::{load_estimate, open_database, save_estimate};

/// Part of the bar the gesture grabs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum DragModeArg {
    Move,
    ResizeLeft,
    ResizeRight,
}

impl From<DragModeArg> for DragMode {
    fn from(mode: DragModeArg) -> Self {
        match mode {
            DragModeArg::Move => Self::Move,
            DragModeArg::ResizeLeft => Self::ResizeLeft,
            DragModeArg::ResizeRight => Self::ResizeRight,
        }
    }
}

#[derive(Debug, Args)]
pub struct DragArgs {
    /// Estimate ID.
    pub id: String,

    /// Phase whose bar is dragged.
    #[arg(long)]
    pub phase: PhaseKey,

    /// Grab the bar body or one of its handles.
    #[arg(long, value_enum, default_value_t = DragModeArg::Move)]
    pub mode: DragModeArg,

    /// Pointer travel in slot widths; fractions snap to the nearest slot.
    #[arg(long, allow_negative_numbers = true)]
    pub slots: f64,

    /// Width of the drawing area in pixels.
    #[arg(long, default_value_t = 800.0)]
    pub width: f64,
}

pub fn run<W: Write>(writer: &mut W, args: &DragArgs, config: &Config) -> Result<()> {
    let mut db = open_database(config)?;
    let mut estimate = load_estimate(&db, &args.id)?;
    let mut intervals = estimate.intervals();

    let geometry = SlotGeometry::fit(
        args.width,
        config.layout.min_left_margin,
        config.layout.right_margin,
    );
    let mut editor = IntervalEditor::new(geometry);
    let mode = DragMode::from(args.mode);

    let bar = editor.bar(&intervals, args.phase);
    let grab_x = bar.map_or(geometry.left_margin, |span| match mode {
        DragMode::Move => span.x + span.width / 2.0,
        DragMode::ResizeLeft => span.x,
        DragMode::ResizeRight => span.right(),
    });
    editor
        .pointer_down(args.phase, mode, &intervals, grab_x)
        .with_context(|| format!("cannot drag {}", args.phase))?;

    let release_x = grab_x + args.slots * geometry.slot_width;
    if let Some(preview) = editor.pointer_move(release_x) {
        tracing::debug!(
            phase = %preview.phase,
            x = preview.span.x,
            width = preview.span.width,
            snapped = %preview.snapped,
            "drag preview"
        );
    }

    let initial = editor.session().map(|session| session.initial);
    let Some(committed) = editor.pointer_up(release_x, &mut intervals, &mut ()) else {
        let current = initial.map_or_else(|| "-".to_string(), |range| range.to_string());
        writeln!(writer, "No change: {} stays at {current}", args.phase)?;
        return Ok(());
    };

    estimate.set_intervals(&intervals);
    save_estimate(writer, &mut db, config, &args.id, &estimate)?;
    let from = initial.map_or_else(|| "-".to_string(), |range| range.to_string());
    writeln!(writer, "{} {}: {from} -> {committed}", mode, args.phase)?;
    Ok(())
}
