//! # memvex
//!
//! Command-line interface for memvex.
//!
//! - `memvex init` — write a starter memvex.yaml
//! - `memvex status` — show enabled modules and active backends
//! - `memvex serve` — start the MCP server on stdio
//! - `memvex guard check/pending/approve/deny/history/show` — the human side
//!   of the approval queue
//! - `memvex memory add/list/recall/forget/clear` — inspect and edit shared
//!   memories

mod commands;

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

/// memvex — shared memory and action guard for AI agents.
#[derive(Parser)]
#[command(name = "memvex", version, about)]
struct Cli {
    /// Path to memvex.yaml (defaults to $MEMVEX_CONFIG, then ./memvex.yaml).
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Write a starter memvex.yaml.
    Init {
        /// Overwrite an existing config file.
        #[arg(long)]
        force: bool,
    },
    /// Show which modules are enabled and which backends are active.
    Status,
    /// Start the MCP server on stdio.
    Serve,
    /// Check actions and decide approval requests.
    Guard {
        #[command(subcommand)]
        command: commands::guard::GuardCommands,
    },
    /// Manage shared memories.
    Memory {
        #[command(subcommand)]
        command: commands::memory::MemoryCommands,
    },
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Logs go to stderr so they never mix with MCP traffic or command output.
    // The server logs its lifecycle; one-shot commands only surface warnings.
    let level = match cli.command {
        Commands::Serve => "info",
        _ => "warn",
    };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::from_default_env().add_directive(format!("memvex={}", level).parse()?),
        )
        .with_writer(std::io::stderr)
        .with_ansi(false)
        .init();

    let cwd = std::env::current_dir()?;
    let config_path = memvex_gateway::resolve_config_path(cli.config.as_deref(), &cwd);

    match &cli.command {
        Commands::Init { force } => commands::init::execute(&config_path, *force),
        Commands::Status => commands::status::execute(&config_path),
        Commands::Serve => commands::serve::execute(&config_path),
        Commands::Guard { command } => commands::guard::execute(command, &config_path),
        Commands::Memory { command } => commands::memory::execute(command, &config_path),
    }
}
