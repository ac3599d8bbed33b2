//! CLI commands implementation.
//!
//! This module contains the CLI parser and dispatches to command-specific modules.

mod documents;
mod ingest;
mod init;
mod orient;
mod search;

use std::path::PathBuf;

use clap::{Parser, Subcommand};

use crate::config::{load_settings_with_options, LoadOptions, Settings};
use crate::ocr::{OcrConfig, OrientationResolver, TesseractBackend, TokenFrequencyScorer};

#[derive(Parser)]
#[command(name = "scanarchive")]
#[command(about = "Scanned document archive: OCR ingestion and search")]
#[command(version)]
pub struct Cli {
    /// Archive data directory (overrides config file and SCANARCHIVE_DATA_DIR)
    #[arg(long, short = 't', global = true)]
    target: Option<PathBuf>,

    /// Config file path (overrides auto-discovery)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Resolve relative paths from current working directory instead of config file location
    #[arg(long, global = true)]
    cwd: bool,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

/// Check if verbose mode is enabled (for early logging setup).
pub fn is_verbose() -> bool {
    std::env::args().any(|arg| arg == "-v" || arg == "--verbose")
}

#[derive(Subcommand)]
enum Commands {
    /// Initialize the data directory, identifier counter and archive file
    Init {
        /// First identifier to hand out (only used when creating the counter)
        #[arg(long, default_value = "1")]
        start: u64,
    },

    /// Ingest staged batches into the archive
    Ingest {
        /// Staging directory (defaults to the configured one)
        #[arg(long)]
        staging: Option<PathBuf>,
        /// Show what would be ingested without changing anything
        #[arg(long)]
        dry_run: bool,
    },

    /// Search metadata and extracted text
    Search {
        /// Case-insensitive search term
        term: String,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// List archived documents
    List {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Show a document's metadata and extracted text
    Show {
        /// Document identifier
        id: u64,
    },

    /// Score all four rotations of an image without archiving it
    Orient {
        /// Image file
        image: PathBuf,
    },
}

/// Build the orientation resolver from settings.
pub(crate) fn resolver_from_settings(settings: &Settings) -> OrientationResolver {
    let backend = TesseractBackend::with_config(OcrConfig {
        language: settings.ocr_language.clone(),
    });
    OrientationResolver::new(Box::new(backend))
        .with_scorer(Box::new(TokenFrequencyScorer::new(&settings.score_token)))
}

pub async fn run() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let options = LoadOptions {
        config_path: cli.config,
        use_cwd: cli.cwd,
        data: cli.target,
    };
    let (settings, _config) = load_settings_with_options(options).await;
    tracing::debug!("using data directory {}", settings.data_dir.display());

    match cli.command {
        Commands::Init { start } => init::cmd_init(&settings, start).await,
        Commands::Ingest { staging, dry_run } => {
            ingest::cmd_ingest(&settings, staging, dry_run).await
        }
        Commands::Search { term, json } => search::cmd_search(&settings, &term, json).await,
        Commands::List { json } => documents::cmd_list(&settings, json).await,
        Commands::Show { id } => documents::cmd_show(&settings, id).await,
        Commands::Orient { image } => orient::cmd_orient(&settings, &image).await,
    }
}
