mod auth;
mod cli;
mod config;
mod deploy;
mod error;
mod gateway;
mod github;
mod linear;
mod model;
mod output;
mod pipeline;

use clap::Parser;
use cli::{Cli, RunFailure};
use error::ExitKind;
use log::{error, info};
use std::process::ExitCode;

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    match cli.execute().await {
        Ok(report) => {
            output::print_summary(&report);
            info!("Action completed successfully");
            ExitCode::SUCCESS
        }
        Err(failure) => {
            report_failure(&failure);
            ExitCode::from(failure.exit_status())
        }
    }
}

fn report_failure(failure: &RunFailure) {
    match failure {
        RunFailure::Pipeline(e) if e.exit() == ExitKind::Success => info!("{e}"),
        RunFailure::Pipeline(e) => {
            error!("{e}");
            for message in e.messages() {
                error!("{message}");
            }
            info!("Action aborted");
        }
        RunFailure::ConfigFile(e) => {
            error!("{e:#}");
            info!("Action aborted");
        }
        RunFailure::Defect(e) => {
            error!("Deployed pull request reporter died unexpectedly: {e}");
        }
    }
}
