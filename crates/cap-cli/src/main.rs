use anyhow::{Context, Result};
use clap::Parser;
use tracing_subscriber::EnvFilter;

use cap_cli::commands::{aggregate, distribution, drag, estimate, fte, layout, remote};
use cap_cli::{Cli, Commands, Config};

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize tracing with verbose flag support
    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::from_default_env()
    };
    // Logs go to stderr so command output stays pipeable
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();

    let Some(command) = &cli.command else {
        // No subcommand, show help
        use clap::CommandFactory;
        Cli::command().print_help()?;
        println!();
        return Ok(());
    };

    let config = Config::load_from(cli.config.as_deref()).context("failed to load configuration")?;
    tracing::debug!(?config, "loaded configuration");

    let stdout = std::io::stdout();
    let mut out = stdout.lock();
    match command {
        Commands::Init(args) => estimate::init(&mut out, args, &config)?,
        Commands::Import { id, file } => estimate::import(&mut out, id, file, &config)?,
        Commands::Export { id } => estimate::export(&mut out, id, &config)?,
        Commands::List => estimate::list(&mut out, &config)?,
        Commands::Show(args) => estimate::show(&mut out, args, &config)?,
        Commands::Validate { id } => estimate::validate(&mut out, id, &config)?,
        Commands::Delete { id } => estimate::delete(&mut out, id, &config)?,
        Commands::Drag(args) => drag::run(&mut out, args, &config)?,
        Commands::SetCell(args) => distribution::set_cell(&mut out, args, &config)?,
        Commands::Category(action) => distribution::run_category(&mut out, action, &config)?,
        Commands::Fte(action) => fte::run(&mut out, action, &config)?,
        Commands::Aggregate(args) => aggregate::run(&mut out, args, &config)?,
        Commands::Layout(args) => layout::run(&mut out, args, &config)?,
        Commands::Push { id } => remote::push(&mut out, id, &config)?,
        Commands::Pull { id } => remote::pull(&mut out, id, &config)?,
        Commands::Compute { id } => remote::compute(&mut out, id, &config)?,
    }

    Ok(())
}
