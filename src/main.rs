mod cli;
mod config;
mod error;
mod features;
mod orchestrator;
mod scheduler;
mod state_machine;
mod ui;

use anyhow::{Context, Result};
use clap::Parser;
use cli::{Cli, Command};
use config::WizardConfig;
use orchestrator::SessionOrchestrator;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::mpsc;
use tracing_subscriber::EnvFilter;
use ui::Terminal;

fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = WizardConfig::load(cli.config.as_deref())?;
    init_tracing(cli.verbose, &config.log_level);

    match cli.command {
        Command::Graph => print_graph(&config),
        Command::Run { answers } => {
            // One extra blocking thread is taken by the stdin reader.
            let runtime = tokio::runtime::Builder::new_multi_thread()
                .enable_all()
                .max_blocking_threads(config.max_blocking_threads.max(1) + 1)
                .build()
                .context("building tokio runtime")?;
            let result = runtime.block_on(run(config, answers));
            runtime.shutdown_background();
            result
        }
    }
}

fn init_tracing(verbose: bool, level: &str) {
    let filter = if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level))
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn print_graph(config: &WizardConfig) -> Result<()> {
    let graph = features::build_graph(&config.features, &config.output_dir)?;
    println!(
        "{} wizard steps (target version {}):",
        graph.len(),
        config.target_version
    );
    for (idx, feature) in config.features.iter().enumerate() {
        let preset = match feature.preset {
            Some(true) => " [preset: yes]",
            Some(false) => " [preset: no]",
            None => "",
        };
        println!("  {}. {}: {}{preset}", idx + 1, feature.name, feature.question);
    }
    Ok(())
}

async fn run(config: WizardConfig, answers: Vec<String>) -> Result<()> {
    let (tx, rx) = mpsc::unbounded_channel();
    let terminal = Terminal::new();

    if answers.is_empty() {
        tokio::spawn(async move {
            let mut lines = BufReader::new(tokio::io::stdin()).lines();
            while let Ok(Some(line)) = lines.next_line().await {
                if tx.send(line).is_err() {
                    break;
                }
            }
        });
    } else {
        for answer in answers {
            terminal.note(&format!("> {answer}"));
            tx.send(answer)?;
        }
        drop(tx);
    }

    let orchestrator = SessionOrchestrator::new(config, terminal);
    let event = orchestrator.run(rx).await?;
    tracing::debug!(session = %event.session_id, outcome = %event.outcome, "session closed");
    Ok(())
}
