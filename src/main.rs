use anyhow::Result;
use clap::Parser;
use tracing::{error, info};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use notesync::{Config, SyncEngine};

#[derive(Parser)]
#[command(name = "notesync")]
#[command(about = "Automated commit-and-push for note vaults and personal repositories")]
#[command(version)]
struct Cli {
    /// Configuration file path
    #[arg(short, long, default_value = "config.json")]
    config: std::path::PathBuf,

    /// Print the git commands that would run without executing them
    #[arg(long)]
    dry_run: bool,

    /// Verbose logging
    #[arg(short, long)]
    verbose: bool,
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    if let Err(e) = init_logging(cli.verbose) {
        eprintln!("Failed to initialize logging: {:#}", e);
        std::process::exit(2);
    }

    // A bad or missing config aborts before any repository is touched
    let config = match Config::load(&cli.config) {
        Ok(config) => config,
        Err(e) => {
            error!("Invalid config: {:#}", e);
            std::process::exit(2);
        }
    };

    info!(
        "Starting notesync v{} with {} repositories",
        env!("CARGO_PKG_VERSION"),
        config.repos.len()
    );

    let engine = SyncEngine::new(config, cli.dry_run);
    let summary = engine.run().await;

    println!(
        "Done: {} synced, {} clean, {} skipped",
        summary.synced(),
        summary.clean(),
        summary.skipped()
    );

    std::process::exit(summary.exit_code());
}

/// Initialize logging based on verbosity level
fn init_logging(verbose: bool) -> Result<()> {
    let filter = if verbose {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("debug"))
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    };

    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(filter)
        .init();

    Ok(())
}
