//! Threadloom CLI — the main entry point.
//!
//! Commands:
//! - `serve` — Load config, discover sessions, start the HTTP gateway
//! - `check` — Validate the app config and every session directory
//! - `init`  — Scaffold a sample session directory

use clap::{Parser, Subcommand};
use std::path::PathBuf;

mod commands;

#[derive(Parser)]
#[command(
    name = "threadloom",
    about = "Threadloom — branching multi-character conversations with an AI playwright",
    version
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Path to the app configuration file
    #[arg(short, long, global = true, default_value = "threadloom.toml")]
    config: PathBuf,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the HTTP gateway
    Serve {
        /// Override the configured port
        #[arg(short, long)]
        port: Option<u16>,
    },

    /// Validate the configuration and every session directory
    Check,

    /// Scaffold a sample session directory
    Init {
        /// Identifier of the new session
        session_id: String,
    },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    // Initialize tracing
    let filter = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(filter)),
        )
        .with_target(false)
        .init();

    match cli.command {
        Commands::Serve { port } => commands::serve::run(&cli.config, port).await?,
        Commands::Check => commands::check::run(&cli.config)?,
        Commands::Init { session_id } => commands::init::run(&cli.config, &session_id)?,
    }

    Ok(())
}
