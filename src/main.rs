//! # Advisory Harness CLI (`adv`)
//!
//! The `adv` binary drives the advisory pipeline: ingesting a directory
//! of PDF advisories into the vector store, searching the indexed
//! chunks, asking grounded questions, and inspecting the indicators a
//! piece of text contains.
//!
//! ## Usage
//!
//! ```bash
//! adv --config ./config/adv.toml <command>
//! ```
//!
//! ## Commands
//!
//! | Command | Description |
//! |---------|-------------|
//! | `adv ingest` | Ingest advisory PDFs from the configured directory |
//! | `adv search "<query>"` | Retrieve the filtered evidence for a query |
//! | `adv ask "<question>"` | Retrieve evidence and generate a briefing |
//! | `adv iocs "<text>"` | Extract indicators from an arbitrary string |

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

use advisory_harness::{answer, config, ingest, ioc, progress, search};

/// Advisory Harness CLI, a threat-advisory ingestion and retrieval
/// pipeline.
///
/// All commands accept a `--config` flag pointing to a TOML configuration
/// file with the vector store, embedding, chunking, and retrieval
/// settings.
#[derive(Parser)]
#[command(
    name = "adv",
    about = "Advisory Harness — ingest threat advisories, extract IOCs, and search them",
    version
)]
struct Cli {
    /// Path to configuration file (TOML).
    #[arg(long, global = true, default_value = "./config/adv.toml")]
    config: PathBuf,

    /// Progress output on stderr: auto, off, human, or json.
    #[arg(long, global = true, default_value = "auto")]
    progress: String,

    #[command(subcommand)]
    command: Commands,
}

/// Top-level CLI commands.
#[derive(Subcommand)]
enum Commands {
    /// Ingest advisory PDFs from the configured directory.
    ///
    /// Each file is text-extracted, hashed into its document id, scanned
    /// for indicators, chunked, embedded, and inserted into the vector
    /// store. Successfully ingested files are renamed with a
    /// `_processed` marker so re-runs skip them.
    Ingest {
        /// Show file and chunk counts without writing to the store.
        #[arg(long)]
        dry_run: bool,

        /// Maximum number of files to process.
        #[arg(long)]
        limit: Option<usize>,
    },

    /// Search indexed advisories and print the filtered evidence.
    Search {
        /// The search query string.
        query: String,
    },

    /// Search, then generate an analyst briefing over the evidence.
    ///
    /// Requires an `[answer]` section in the configuration.
    Ask {
        /// The question to answer.
        question: String,
    },

    /// Extract indicators of compromise from an arbitrary string.
    ///
    /// Runs the same extraction as ingestion (deobfuscation included)
    /// and prints the typed indicator set as JSON.
    Iocs {
        /// The text to scan.
        text: String,
    },
}

fn parse_progress_mode(s: &str) -> Result<progress::ProgressMode> {
    match s {
        "auto" => Ok(progress::ProgressMode::default_for_tty()),
        "off" => Ok(progress::ProgressMode::Off),
        "human" => Ok(progress::ProgressMode::Human),
        "json" => Ok(progress::ProgressMode::Json),
        other => anyhow::bail!(
            "Unknown progress mode: '{}'. Use auto, off, human, or json.",
            other
        ),
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let reporter = parse_progress_mode(&cli.progress)?.reporter();

    // `iocs` needs no configuration at all.
    if let Commands::Iocs { text } = &cli.command {
        let set = ioc::extract(text);
        println!("{}", serde_json::to_string_pretty(&set)?);
        return Ok(());
    }

    let cfg = config::load_config(&cli.config)?;

    match cli.command {
        Commands::Ingest { dry_run, limit } => {
            ingest::run_ingest(&cfg, dry_run, limit, reporter.as_ref()).await?;
        }
        Commands::Search { query } => {
            let evidence = search::run_search(&cfg, &query, reporter.as_ref()).await?;
            search::print_evidence(&evidence);
        }
        Commands::Ask { question } => {
            let answer_config = cfg
                .answer
                .clone()
                .ok_or_else(|| anyhow::anyhow!("[answer] section required for `adv ask`"))?;
            let evidence = search::run_search(&cfg, &question, reporter.as_ref()).await?;
            if evidence.is_empty() {
                println!("No intelligence found.");
                return Ok(());
            }
            let briefing = answer::generate_answer(&answer_config, &question, &evidence).await?;
            println!("{}", briefing);
        }
        Commands::Iocs { .. } => unreachable!(),
    }

    Ok(())
}
