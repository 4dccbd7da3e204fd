//! Catwalk CLI - serve models from a memory-bounded cache
//!
//! Loads a YAML configuration, then reports cache status, runs predictions,
//! describes models, or keeps the cache running with its maintenance sweeper.

mod commands;

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use tracing::Level;
use tracing_subscriber::FmtSubscriber;

use commands::{info, predict, run, status};

/// Catwalk - model serving with a memory-bounded LRU cache
#[derive(Parser, Debug)]
#[command(name = "catwalk", author, version, about = "Catwalk - memory-bounded model serving")]
struct Args {
    /// Log level (trace, debug, info, warn, error)
    #[arg(short, long, default_value = "warn", global = true)]
    log_level: String,

    /// Path to the configuration file
    #[arg(short, long, default_value = "catwalk.yaml", global = true)]
    config: PathBuf,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Show cache limits and the state of every configured model
    Status {
        /// Load models flagged `preload` first
        #[arg(long)]
        preload: bool,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Run one prediction
    ///
    /// Loads the model if needed, evaluates the input and prints the output.
    Predict {
        /// Model id
        model: String,

        /// Input as a JSON document
        #[arg(short, long, default_value = "{}")]
        input: String,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Describe one configured model
    Info {
        /// Model id
        model: String,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Preload models and keep the cache running until interrupted
    Run {
        /// Seconds between status lines
        #[arg(long, default_value_t = 30)]
        status_interval: u64,

        /// Stop after this many seconds instead of waiting for Ctrl-C
        #[arg(long)]
        duration: Option<u64>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let level = match args.log_level.as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "error" => Level::ERROR,
        _ => Level::WARN,
    };

    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_writer(std::io::stderr)
        .with_target(false)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    match args.command {
        Command::Status { preload, json } => status::execute(&args.config, preload, json).await,
        Command::Predict { model, input, json } => {
            predict::execute(&args.config, &model, &input, json).await
        }
        Command::Info { model, json } => info::execute(&args.config, &model, json),
        Command::Run { status_interval, duration } => {
            run::execute(&args.config, status_interval, duration).await
        }
    }
}
