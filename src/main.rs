use clap::Parser;
use sparsync::config::{Cli, Command};
use sparsync::logging::init_logging;
use sparsync::{commands, Config};

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose, cli.log_format)?;

    // Convert CLI args to Config - this validates immediately
    let config = Config::try_from(&cli)?;
    tracing::debug!(?config, "configuration resolved");

    match cli.command {
        Command::Backup => commands::backup::run(&config)?,
        Command::Status { json } => commands::status::run(&config, json)?,
    }

    Ok(())
}
