//! Nirvania CLI entry point.
//!
//! Binary name: `nirv`
//!
//! Parses CLI arguments, initializes tracing, then dispatches to the command
//! handler. Commands that touch run history open the database themselves.

mod cli;
mod state;

use clap::Parser;

use cli::{Cli, Commands};
use nirvania_observe::tracing_setup::{init_tracing, shutdown_tracing, verbosity_filter};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    init_tracing(verbosity_filter(cli.verbose, cli.quiet), cli.otel)
        .map_err(|e| anyhow::anyhow!("failed to initialize tracing: {e}"))?;

    let result = match cli.command {
        Commands::Skill { action } => cli::skill::handle_skill_command(action, cli.json).await,
        Commands::Tools => cli::tools::list_tools(cli.json),
    };

    shutdown_tracing();
    result
}
