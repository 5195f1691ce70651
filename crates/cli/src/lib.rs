//! `advisor` command-line interface.

use anyhow::Result;
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

mod commands;
pub mod config;

use config::AdvisorConfig;

#[derive(Parser)]
#[command(name = "advisor")]
#[command(about = "Credit-card rewards advisor: grounded answers over a knowledge base", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Config file (defaults to ./advisor.toml when present)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Index snapshot path (overrides config and ADVISOR_INDEX_PATH)
    #[arg(long, global = true)]
    index: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Quiet mode: log only warnings/errors
    #[arg(long, global = true)]
    quiet: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Add knowledge-base facts and text documents to the index
    Ingest(IngestArgs),

    /// Answer a question from the index
    Ask(AskArgs),

    /// Show index statistics
    Stats(StatsArgs),

    /// Discard the snapshot and rebuild it from the knowledge base
    Rebuild(RebuildArgs),
}

#[derive(Args)]
struct IngestArgs {
    /// Text or PDF documents, or directories of them
    docs: Vec<PathBuf>,

    /// JSON Lines knowledge base (defaults to the configured one when no
    /// documents are given)
    #[arg(long)]
    kb: Option<PathBuf>,

    #[arg(long)]
    json: bool,
}

#[derive(Args)]
struct AskArgs {
    question: String,

    /// Number of chunks to retrieve
    #[arg(long, short = 'k')]
    k: Option<usize>,

    #[arg(long)]
    json: bool,
}

#[derive(Args)]
struct StatsArgs {
    #[arg(long)]
    json: bool,
}

#[derive(Args)]
struct RebuildArgs {
    #[arg(long)]
    kb: Option<PathBuf>,

    #[arg(long)]
    json: bool,
}

pub async fn main_entry() -> Result<()> {
    let mut cli = Cli::parse();

    // Keep stdout clean for JSON parsing
    let json_output = match &cli.command {
        Commands::Ingest(args) => args.json,
        Commands::Ask(args) => args.json,
        Commands::Stats(args) => args.json,
        Commands::Rebuild(args) => args.json,
    };
    if json_output {
        cli.quiet = true;
    }

    let mut builder =
        env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"));
    if cli.quiet {
        builder.filter_level(log::LevelFilter::Warn);
    } else if cli.verbose {
        builder.filter_level(log::LevelFilter::Debug);
    }
    builder.target(env_logger::Target::Stderr).init();

    let mut config = AdvisorConfig::load(cli.config.as_deref())?;
    if let Some(index) = cli.index {
        config.storage.index_path = index;
    }

    match cli.command {
        Commands::Ingest(args) => {
            commands::run_ingest(&config, args.kb, &args.docs, args.json).await?;
        }
        Commands::Ask(args) => {
            commands::run_ask(&config, &args.question, args.k, args.json).await?;
        }
        Commands::Stats(args) => commands::run_stats(&config, args.json).await?,
        Commands::Rebuild(args) => commands::run_rebuild(&config, args.kb, args.json).await?,
    }

    Ok(())
}
