mod atlas;
mod cli;
mod config;
mod dataset;
mod error;
mod normalize;
mod pipeline;
mod poll;
mod report;
mod ui;

use std::path::Path;

use anyhow::Result;
use clap::Parser;

use cli::{Cli, Command};
use config::ColdlineConfig;
use pipeline::Pipeline;
use ui::StageProgress;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let mut config = ColdlineConfig::load()?;
    if let Some(secs) = cli.interval {
        config.poll_interval_secs = secs;
    }
    if let Some(mins) = cli.timeout_mins {
        config.poll_timeout_mins = mins;
    }
    config.require_credentials()?;

    let pipeline = Pipeline::new(config, cli.verbose);

    match cli.command {
        Command::Run { data } => {
            let report = pipeline.run(Path::new(&data)).await?;
            StageProgress::print_report(&report);
        }
        Command::Load { cluster, data } => {
            pipeline.load_existing(&cluster, Path::new(&data)).await?;
        }
        Command::Report { cluster } => {
            pipeline.report_existing(&cluster).await?;
        }
    }

    Ok(())
}
