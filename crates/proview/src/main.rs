//! ProView CLI - ingest image assets into thumbnail + metadata records.
//!
//! Every supported file (JPEG, PNG, GIF, layered PSD, TIFF, EPS) becomes one
//! JSON record with a bounded PNG thumbnail and format-specific metadata.
//! Unreadable or exotic files still get a labeled placeholder.
//!
//! # Usage
//!
//! ```bash
//! # Ingest a single file
//! proview open poster.psd
//!
//! # Ingest a directory, streaming JSONL as batches finish
//! proview open ./shoot/ --format jsonl --output records.jsonl
//!
//! # Re-encode an asset
//! proview convert poster.psd poster.jpg --quality 85 --rotate 90
//!
//! # View configuration
//! proview config show
//! ```

use clap::{Parser, Subcommand};

mod cli;
mod logging;

/// ProView - decode-and-describe pipeline for image assets.
#[derive(Parser, Debug)]
#[command(name = "proview")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// Enable verbose (debug) logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Output logs in JSON format
    #[arg(long, global = true)]
    json_logs: bool,

    #[command(subcommand)]
    command: Commands,
}

/// Available commands.
#[derive(Subcommand, Debug)]
enum Commands {
    /// Ingest a file or a directory into asset records
    Open(cli::open::OpenArgs),

    /// Re-encode an asset as JPEG, PNG, TIFF or WebP
    Convert(cli::convert::ConvertArgs),

    /// View and manage configuration
    Config(cli::config::ConfigArgs),
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Logging isn't initialized yet, so config warnings go through eprintln.
    let config = match proview_core::Config::load() {
        Ok(config) => config,
        Err(e) => {
            eprintln!(
                "Warning: Failed to load config: {e}\n  \
                 Using default configuration. Check your config file with `proview config path`."
            );
            proview_core::Config::default()
        }
    };
    logging::init_from_config(&config, cli.verbose, cli.json_logs);

    tracing::debug!("ProView v{}", proview_core::VERSION);

    match cli.command {
        Commands::Open(args) => cli::open::execute(args, config).await,
        Commands::Convert(args) => cli::convert::execute(args, config).await,
        Commands::Config(args) => cli::config::execute(args).await,
    }
}
