//! Layout command: places several estimates on one calendar axis.

use std::io::Write;

use anyhow::Result;
use cap_core::{
    CategoryRegistry, DefaultLabels, LabelResolver, LayoutProject, LegendItem, PhaseKey,
    TimelineLayout, layout_timeline,
};
use chrono::NaiveDate;
use clap::Args;

use crate::Config;
use crate::commands::util::{load_estimate, open_database};

#[derive(Debug, Args)]
pub struct LayoutArgs {
    /// Estimate IDs, one project each.
    #[arg(required = true)]
    pub ids: Vec<String>,

    /// Shared start date (YYYY-MM-DD).
    #[arg(long)]
    pub start: NaiveDate,

    /// Override the configured container width in pixels.
    #[arg(long)]
    pub width: Option<f64>,

    /// Append a phase legend below the rows.
    #[arg(long)]
    pub legend: bool,

    /// Output as JSON.
    #[arg(long)]
    pub json: bool,
}

pub fn run<W: Write>(writer: &mut W, args: &LayoutArgs, config: &Config) -> Result<()> {
    let db = open_database(config)?;
    let calendar = config.calendar();
    let mut projects = Vec::with_capacity(args.ids.len());
    for id in &args.ids {
        let estimate = load_estimate(&db, id)?;
        let mut project = LayoutProject::from_estimate(id.clone(), &estimate, args.start, &calendar);
        project.show_header = args.ids.len() > 1;
        projects.push(project);
    }

    let legend = if args.legend {
        phase_legend(&projects)
    } else {
        Vec::new()
    };
    let mut options = config.layout.clone();
    if let Some(width) = args.width {
        options.container_width = width;
    }
    let layout = layout_timeline(&projects, &legend, &options);
    tracing::debug!(
        bars = layout.bars.len(),
        segments = layout.segments.len(),
        "timeline laid out"
    );

    if args.json {
        writeln!(writer, "{}", serde_json::to_string_pretty(&layout)?)?;
        return Ok(());
    }
    render(writer, &layout)
}

/// One legend entry per phase that has a bar, in phase order.
fn phase_legend(projects: &[LayoutProject]) -> Vec<LegendItem> {
    let present: Vec<&str> = PhaseKey::ALL
        .iter()
        .map(|phase| phase.as_str())
        .filter(|key| {
            projects
                .iter()
                .flat_map(|project| &project.rows)
                .any(|row| row.marker.as_deref() == Some(*key))
        })
        .collect();
    let registry = CategoryRegistry::from_keys(&present);
    present
        .iter()
        .map(|key| LegendItem {
            key: (*key).to_string(),
            label: DefaultLabels.resolve_label(key),
            color: DefaultLabels.resolve_color(key, &registry),
        })
        .collect()
}

fn render<W: Write>(writer: &mut W, layout: &TimelineLayout) -> Result<()> {
    let Some(scale) = &layout.scale else {
        writeln!(writer, "Nothing to lay out.")?;
        return Ok(());
    };
    writeln!(
        writer,
        "Axis from {} at {:.2} px/day, {} segments by {:?}",
        scale.min_date,
        scale.pixels_per_day,
        layout.segments.len(),
        layout.granularity
    )?;
    let labels: Vec<&str> = layout
        .segments
        .iter()
        .map(|segment| segment.label.as_str())
        .collect();
    writeln!(writer, "Segments: {}", labels.join(" | "))?;

    for header in &layout.headers {
        writeln!(writer, "[{}] y={:.1}", header.label, header.y)?;
    }
    for bar in &layout.bars {
        writeln!(
            writer,
            "  {:<14} x={:>8.1} w={:>8.1} y={:>6.1}",
            bar.label, bar.x, bar.width, bar.y
        )?;
    }
    if let Some(legend) = &layout.legend {
        let items: Vec<String> = legend
            .items
            .iter()
            .map(|item| format!("{} {}", item.color, item.label))
            .collect();
        writeln!(writer, "Legend: {}", items.join(", "))?;
    }
    writeln!(writer, "Height: {:.1}", layout.total_height)?;
    Ok(())
}
