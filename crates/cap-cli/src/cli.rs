//! Command-line argument definitions.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

use crate::commands::aggregate::AggregateArgs;
use crate::commands::distribution::{CategoryAction, SetCellArgs};
use crate::commands::drag::DragArgs;
use crate::commands::estimate::{InitArgs, ShowArgs};
use crate::commands::fte::FteAction;
use crate::commands::layout::LayoutArgs;

/// Capacity planning for phased project estimates.
///
/// Places project phases on a 10-slot grid, splits each phase's effort
/// across categories and combines computed FTE results of many estimates.
#[derive(Debug, Parser)]
#[command(name = "cap", version, about, long_about = None)]
pub struct Cli {
    /// Enable verbose output.
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Path to config file.
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

/// Available subcommands.
#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Store a new estimate with the stock phase layout.
    Init(InitArgs),

    /// Replace an estimate's configuration with a JSON file.
    Import {
        /// Estimate ID.
        id: String,
        /// JSON file holding the configuration.
        file: PathBuf,
    },

    /// Print an estimate's configuration as JSON.
    Export {
        /// Estimate ID.
        id: String,
    },

    /// List stored estimates.
    List,

    /// Show phases, slot ranges, dates and periods of an estimate.
    Show(ShowArgs),

    /// Check end-to-end percentages and distribution rows.
    Validate {
        /// Estimate ID.
        id: String,
    },

    /// Delete an estimate and its FTE result.
    Delete {
        /// Estimate ID.
        id: String,
    },

    /// Move or resize a phase bar as a pointer gesture would.
    Drag(DragArgs),

    /// Set one distribution cell.
    SetCell(SetCellArgs),

    /// Add or remove effort categories.
    #[command(subcommand)]
    Category(CategoryAction),

    /// Manage computed FTE results.
    #[command(subcommand)]
    Fte(FteAction),

    /// Sum FTE results of several estimates per slot and category.
    Aggregate(AggregateArgs),

    /// Lay out several estimates on one calendar axis.
    Layout(LayoutArgs),

    /// Send the local configuration to the remote backend.
    Push {
        /// Estimate ID.
        id: String,
    },

    /// Replace the local configuration with the remote one.
    Pull {
        /// Estimate ID.
        id: String,
    },

    /// Ask the remote backend to compute FTE results and store them.
    Compute {
        /// Estimate ID.
        id: String,
    },
}
