//! Command line of the setup wizard.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

/// Interactive feature setup wizard.
#[derive(Debug, Parser)]
#[command(name = "setup-wizard", version, about)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// Path to the configuration file (defaults to ./wizard.toml).
    #[arg(long, short, global = true)]
    pub config: Option<PathBuf>,

    /// Enable debug logging.
    #[arg(long, short, global = true, default_value_t = false)]
    pub verbose: bool,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Run one wizard session.
    Run {
        /// Answer to feed instead of reading stdin. Repeat for each question.
        #[arg(long = "answer", short = 'a')]
        answers: Vec<String>,
    },

    /// Validate the configured features and print the step order.
    Graph,
}
