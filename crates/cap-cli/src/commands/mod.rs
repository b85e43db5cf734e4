//! CLI subcommand implementations.

pub mod aggregate;
pub mod distribution;
pub mod drag;
pub mod estimate;
pub mod fte;
pub mod layout;
pub mod remote;
pub mod util;
