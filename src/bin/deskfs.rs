//! Deskfs CLI Binary

use anyhow::Context;
use clap::Parser;
use deskfs::logging::init_logging;
use deskfs::tooling::cli::{Cli, CliContext};
use std::process;

fn run(cli: &Cli) -> anyhow::Result<String> {
    let config = cli.load_config().context("loading configuration")?;
    init_logging(Some(&config.logging)).context("initializing logging")?;

    let context = CliContext::new(config, cli.data_dir.clone(), &cli.user)
        .context("opening filesystem store")?;
    let output = context.execute(&cli.command)?;
    context.api().flush()?;
    Ok(output)
}

fn main() {
    let cli = Cli::parse();

    match run(&cli) {
        Ok(output) => {
            println!("{}", output);
        }
        Err(e) => {
            eprintln!("Error: {:#}", e);
            process::exit(1);
        }
    }
}
