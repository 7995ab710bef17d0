mod cli;
mod commands;
mod observability;

use anyhow::Result;
use clap::Parser;
use cli::Cli;

fn main() -> Result<()> {
    observability::init_tracing();
    let cli = Cli::parse();
    commands::provision::cmd_provision(cli)
}
