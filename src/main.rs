mod aggregate;
mod auth;
mod calendar;
mod cli;
mod config;
mod coverage;
mod error;
mod notify;
mod output;
mod providers;
mod status;

use anyhow::Result;
use clap::Parser;
use cli::Cli;
use log::info;

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::init();

    output::print_banner();

    let cli = Cli::parse();
    info!("Starting buildwatch - CI Build Status Aggregator");
    cli.execute().await?;

    Ok(())
}
