// SPDX-FileCopyrightText: 2026 Cadence Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Cadence - a conversational status-update bot for project managers.
//!
//! This is the binary entry point. `serve` runs the HTTP trigger server
//! with the scheduled outreach, refresh, and sweep loops; the other
//! subcommands run a single cycle and print its summary.

use clap::{Parser, Subcommand};

mod context;
mod serve;
mod triggers;

/// Cadence - collects project status updates and escalates risk.
#[derive(Parser, Debug)]
#[command(name = "cadence", version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

/// Available subcommands.
#[derive(Subcommand, Debug)]
enum Commands {
    /// Run the trigger server with all scheduled loops.
    Serve,
    /// Run one cache refresh cycle and print its summary.
    Refresh,
    /// Run one reminder sweep and print its summary.
    Sweep,
    /// Run one outreach pass and print its summary.
    Outreach,
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let config = match cadence_config::load_and_validate() {
        Ok(config) => config,
        Err(errors) => {
            cadence_config::render_errors(&errors);
            std::process::exit(1);
        }
    };

    init_tracing(&config.bot.log_level);

    let result = match cli.command {
        Some(Commands::Serve) => serve::run_serve(config).await,
        Some(Commands::Refresh) => triggers::run_refresh(config).await,
        Some(Commands::Sweep) => triggers::run_sweep(config).await,
        Some(Commands::Outreach) => triggers::run_outreach(config).await,
        None => {
            println!("cadence: use --help for available commands");
            Ok(())
        }
    };

    if let Err(error) = result {
        tracing::error!(%error, "cadence exited with an error");
        eprintln!("error: {error}");
        std::process::exit(1);
    }
}

fn init_tracing(log_level: &str) {
    use tracing_subscriber::EnvFilter;

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("cadence={log_level},warn")));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_thread_names(false)
        .init();
}
