//! Command line interface.

pub mod command;

use std::{path::PathBuf, time::Duration};

use clap::{Args, Parser, Subcommand};
use indicatif::ProgressBar;

#[derive(Parser)]
#[command(version, about, long_about = None)]
/// Contains the commands
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Fetch missing weather data into the cache
    Fetch(Target),
    /// Show how much of each year is cached
    Status(Target),
    /// Print the grid cells as JSON
    Grid {},
}

#[derive(Args, Debug, Clone)]
pub struct Target {
    /// Cache file to read and update
    #[arg(long, value_name = "PATH")]
    pub cache: Option<PathBuf>,

    /// Year to fetch; repeat to give several (defaults to 2024, 2023, 2022)
    #[arg(long = "year", value_name = "YEAR")]
    pub years: Vec<i32>,
}

/// Creates a spinner.
pub fn create_spinner(message: String) -> ProgressBar {
    let bar = ProgressBar::new_spinner().with_message(message);
    bar.enable_steady_tick(Duration::from_millis(100));

    bar
}

// -- Tests -------------------------------------------------------------------
