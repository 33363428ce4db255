//! Command-line surface: the clap parser plus one module per command.

mod add;
mod check;
mod helpers;
mod init;
mod inspect;
mod process;
mod rebuild;
mod search;

use std::path::PathBuf;

use clap::{Parser, Subcommand};

use crate::config::{load_settings_with_options, LoadOptions};

#[derive(Parser)]
#[command(name = "tmill")]
#[command(about = "Document text extraction and full-text search maintenance")]
#[command(version)]
pub struct Cli {
    /// Data directory (overrides config file)
    #[arg(long, global = true)]
    data_dir: Option<PathBuf>,

    /// Explicit config file, skipping discovery
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Resolve relative config paths against the working directory
    #[arg(long, global = true)]
    cwd: bool,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

/// Peek at argv for the verbose flag before clap runs, so logging can be
/// configured first.
pub fn is_verbose() -> bool {
    std::env::args().any(|arg| arg == "-v" || arg == "--verbose")
}

#[derive(Subcommand)]
enum Commands {
    /// Initialize the data directory, database, and index directories
    Init,

    /// Add files to the archive, extract their text, and index them
    Add {
        /// Files to ingest
        paths: Vec<PathBuf>,
        /// Document title (only valid with a single file; defaults to the filename)
        #[arg(short = 'T', long)]
        title: Option<String>,
    },

    /// Extract and index versions that are still pending
    Process {
        /// Number of extraction workers (default: 2)
        #[arg(short, long, default_value = "2")]
        workers: usize,
        /// Limit number of versions to process (0 = unlimited)
        #[arg(short, long, default_value = "0")]
        limit: usize,
    },

    /// Rebuild the search index and spell dictionary from the store
    Rebuild,

    /// Run the index consistency check (rebuilds when the index is empty)
    Check,

    /// Search indexed documents
    Search {
        /// Search query
        query: String,
        /// Maximum results to print
        #[arg(short, long, default_value = "20")]
        limit: usize,
    },

    /// Suggest similar words from the spell dictionary
    Suggest {
        /// Word to look up
        word: String,
        /// Limit number of suggestions
        #[arg(short, long, default_value = "5")]
        limit: usize,
    },

    /// List registered extractors and their content types
    Extractors,

    /// Show OCR engine order, configuration, and availability
    Engines,

    /// Show store and index counts
    Status,
}

/// Parse arguments, load settings, and dispatch to the command.
pub async fn run() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let options = LoadOptions {
        config_path: cli.config,
        use_cwd: cli.cwd,
        data_dir: cli.data_dir,
    };
    let (settings, _config) = load_settings_with_options(options).await;

    match cli.command {
        Commands::Init => init::cmd_init(&settings).await,
        Commands::Add { paths, title } => add::cmd_add(&settings, &paths, title.as_deref()).await,
        Commands::Process { workers, limit } => {
            process::cmd_process(&settings, workers, limit).await
        }
        Commands::Rebuild => rebuild::cmd_rebuild(&settings).await,
        Commands::Check => check::cmd_check(&settings).await,
        Commands::Search { query, limit } => search::cmd_search(&settings, &query, limit).await,
        Commands::Suggest { word, limit } => search::cmd_suggest(&settings, &word, limit).await,
        Commands::Extractors => inspect::cmd_extractors(&settings).await,
        Commands::Engines => inspect::cmd_engines(&settings).await,
        Commands::Status => inspect::cmd_status(&settings).await,
    }
}
