mod cache;
mod cli;
mod config;
mod download;
mod fetch;
mod grid;
mod plan;
mod session;

use std::process::ExitCode;

use anyhow::{Error, Result};
use clap::Parser;
use cli::{command, Cli, Commands};
use env_logger::Env;
use fetch::Outcome;

#[tokio::main]
async fn main() -> Result<ExitCode, Error> {
    env_logger::Builder::from_env(Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();

    let code = match &cli.command {
        Commands::Fetch(target) => match command::fetch(target).await {
            Ok(Outcome::Completed) => ExitCode::SUCCESS,
            Ok(Outcome::RateLimited) => ExitCode::from(1),
            Ok(Outcome::Failed(e)) => {
                eprintln!("Error: {:#}", e);
                ExitCode::FAILURE
            }
            Err(e) => {
                eprintln!("Error: {:#}", e);
                ExitCode::FAILURE
            }
        },
        Commands::Status(target) => match command::status(target) {
            Ok(report) => {
                println!("{}", report);
                ExitCode::SUCCESS
            }
            Err(e) => {
                eprintln!("Error: {:#}", e);
                ExitCode::FAILURE
            }
        },
        Commands::Grid {} => match command::grid() {
            Ok(json) => {
                println!("{}", json);
                ExitCode::SUCCESS
            }
            Err(e) => {
                eprintln!("Error: {:#}", e);
                ExitCode::FAILURE
            }
        },
    };

    Ok(code)
}
