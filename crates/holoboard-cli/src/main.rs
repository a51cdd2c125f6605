use anyhow::Result;
use clap::Parser;
use tracing_subscriber::EnvFilter;

mod cli;
mod clock;
mod commands;
mod console;
mod host;
mod shutdown;

use cli::{Cli, Command};

fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("holoboard=info".parse()?))
        .init();

    let cli = Cli::parse();
    let config = cli.config_path();

    if let Some(edit) = cli.command.edit() {
        println!("{}", commands::edit::run(&config, &edit)?);
        return Ok(());
    }

    match &cli.command {
        Command::Run { host, now } => commands::run::run(&config, host, *now),
        Command::Refresh { host } => commands::refresh::run(&config, host),
        Command::List { json } => commands::list::run(&config, *json),
        _ => Ok(()),
    }
}
