//! ragline CLI
//!
//! Main entry point for the ragline command-line tool.
//! Answers questions from a pre-built document index, once from the
//! terminal or as an HTTP service.

mod commands;
mod server;

use clap::{Parser, Subcommand};
use commands::{AskCommand, InspectCommand, SearchCommand, ServeCommand};
use ragline_core::config::{AppConfig, ConfigOverrides};
use ragline_core::{logging, AppResult};
use std::path::PathBuf;
use tracing::Instrument;

/// ragline - grounded answers from your documents
#[derive(Parser, Debug)]
#[command(name = "ragline")]
#[command(about = "Retrieval-augmented question answering over a document index", long_about = None)]
#[command(version)]
struct Cli {
    /// Path to config file (default: ./ragline.yaml when present)
    #[arg(short, long, global = true, env = "RAGLINE_CONFIG")]
    config: Option<PathBuf>,

    /// Path to the SQLite index
    #[arg(short, long, global = true)]
    index: Option<PathBuf>,

    /// LLM provider (gemini, ollama)
    #[arg(short, long, global = true)]
    provider: Option<String>,

    /// Model identifier
    #[arg(short, long, global = true)]
    model: Option<String>,

    /// Log level (error, warn, info, debug, trace)
    #[arg(long, global = true, env = "RUST_LOG")]
    log_level: Option<String>,

    /// Enable verbose output (sets log level to debug)
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Disable colored output (NO_COLOR is honored by the config loader)
    #[arg(long, global = true)]
    no_color: bool,

    /// Emit logs as JSON lines
    #[arg(long, global = true)]
    log_json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Answer a question
    Ask(AskCommand),

    /// Serve the HTTP API
    Serve(ServeCommand),

    /// Show the chunks retrieved for a query
    Search(SearchCommand),

    /// Show chunk counts per source
    Inspect(InspectCommand),
}

#[tokio::main]
async fn main() -> AppResult<()> {
    // Parse command-line arguments first (needed for logging config)
    let cli = Cli::parse();

    // Defaults, config file, then environment
    let config = AppConfig::load(cli.config.as_deref())?;

    // Apply CLI overrides
    let config = config.with_overrides(ConfigOverrides {
        index_path: cli.index,
        provider: cli.provider,
        model: cli.model,
        log_level: cli.log_level,
        verbose: cli.verbose,
        no_color: cli.no_color,
        log_json: cli.log_json,
    });

    // Initialize logging with final configuration
    logging::init_logging(config.log_level.as_deref(), config.no_color, config.log_json)?;

    config.validate()?;

    tracing::info!("ragline starting");
    tracing::debug!("Config file: {:?}", config.config_file);
    tracing::debug!("Index: {:?}", config.retrieval.index_path);
    tracing::debug!("Provider: {}", config.llm.provider);
    tracing::debug!("Model: {}", config.llm.model);

    // Emit command span
    let command_name = match &cli.command {
        Commands::Ask(_) => "ask",
        Commands::Serve(_) => "serve",
        Commands::Search(_) => "search",
        Commands::Inspect(_) => "inspect",
    };
    let span = tracing::info_span!("command", name = command_name);

    // Route to command handlers
    let result = async {
        match cli.command {
            Commands::Ask(cmd) => cmd.execute(&config).await,
            Commands::Serve(cmd) => cmd.execute(&config).await,
            Commands::Search(cmd) => cmd.execute(&config).await,
            Commands::Inspect(cmd) => cmd.execute(&config).await,
        }
    }
    .instrument(span)
    .await;

    // Log completion
    match &result {
        Ok(_) => tracing::info!("Command completed successfully"),
        Err(e) => tracing::error!("Command failed: {}", e),
    }

    result
}
