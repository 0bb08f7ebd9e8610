//! Thumbkit CLI - queue-driven thumbnailing worker.
//!
//! Consumes rendition jobs from a queue, renders them from images in object
//! storage and publishes the results next to a common key prefix.
//!
//! # Usage
//!
//! ```bash
//! # Run the worker until Ctrl-C
//! thumbkit run
//!
//! # Inspect a message body
//! thumbkit decode message.txt
//!
//! # Publish a job
//! thumbkit submit job.json --base64
//!
//! # View configuration
//! thumbkit config show
//! ```

use clap::{Parser, Subcommand};
use std::path::PathBuf;

mod cli;
mod logging;

/// Thumbkit - queue-driven thumbnailing worker.
#[derive(Parser, Debug)]
#[command(name = "thumbkit")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// Enable verbose (debug) logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Output logs in JSON format
    #[arg(long, global = true)]
    json_logs: bool,

    /// Config file (defaults to the platform config directory)
    #[arg(short, long, global = true, env = "THUMBKIT_CONFIG")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

/// Available commands.
#[derive(Subcommand, Debug)]
enum Commands {
    /// Poll the queue and process jobs until interrupted
    Run(cli::run::RunArgs),

    /// Decode a queue message body and print the job it describes
    Decode(cli::decode::DecodeArgs),

    /// Publish a job document to the queue
    Submit(cli::submit::SubmitArgs),

    /// View and manage configuration
    Config(cli::config::ConfigArgs),
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let config_path = cli.config.as_deref().map(cli::expand_path);

    // Logging isn't initialized yet, so use eprintln for config warnings.
    let config = match cli::load_config(config_path.as_deref()) {
        Ok(config) => config,
        Err(e) => {
            eprintln!(
                "Warning: Failed to load config: {e}\n  \
                 Using default configuration. Check your config file with `thumbkit config path`."
            );
            thumbkit_core::Config::default()
        }
    };
    logging::init_from_config(&config, cli.verbose, cli.json_logs);

    tracing::debug!("Thumbkit v{}", thumbkit_core::VERSION);

    match cli.command {
        Commands::Run(args) => cli::run::execute(args, config_path.as_deref()).await,
        Commands::Decode(args) => cli::decode::execute(args).await,
        Commands::Submit(args) => cli::submit::execute(args, config_path.as_deref()).await,
        Commands::Config(args) => cli::config::execute(args, config_path.as_deref()).await,
    }
}
