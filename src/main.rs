//! # docchat CLI
//!
//! Ask questions about plain-text documents from the terminal.
//!
//! ## Usage
//!
//! ```bash
//! docchat --config ./config/docchat.toml <command>
//! ```
//!
//! ## Commands
//!
//! | Command | Description |
//! |---------|-------------|
//! | `docchat ask "<question>" --doc <path>` | Answer one question |
//! | `docchat chat --doc <path>` | Interactive conversation |
//! | `docchat analyze --doc <path>` | Offline summary and key terms |
//! | `docchat status [--load]` | Show model providers and state |
//!
//! ## Examples
//!
//! ```bash
//! # One question about a single document
//! docchat ask "What is the main finding?" --doc report.txt
//!
//! # Ask across every document of a project
//! docchat ask "Which plans mention budgets?" --doc a.txt --doc b.txt --project
//!
//! # Check that the configured models load
//! docchat status --load --config ./config/docchat.toml
//! ```

use clap::{Parser, Subcommand};
use std::path::PathBuf;

use docchat::{commands, config, logging};

/// docchat: grounded answers from your documents.
///
/// Without `--config`, both models are disabled and answers come from the
/// offline fallback. See `config/docchat.example.toml`.
#[derive(Parser)]
#[command(
    name = "docchat",
    about = "docchat: grounded question answering over documents",
    version,
    long_about = "docchat answers questions about plain-text documents using retrieval-augmented \
    generation: the text is chunked and embedded, the closest chunks are handed to a generation \
    model, and a deterministic offline responder answers when the models are unavailable."
)]
struct Cli {
    /// Path to configuration file (TOML). Defaults apply when omitted.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Answer a single question and exit.
    ///
    /// Prints the answer on stdout. Ungrounded answers are tagged on
    /// stderr with `[fallback]` or `[no context]`.
    Ask {
        /// The question.
        query: String,

        /// Document to ask about (plain text). Repeat for several.
        #[arg(long = "doc", required = true)]
        docs: Vec<PathBuf>,

        /// Treat the documents as one project instead of one document.
        #[arg(long)]
        project: bool,
    },

    /// Start an interactive conversation.
    ///
    /// `/history` prints the conversation so far, `/quit` exits.
    Chat {
        /// Document to chat about (plain text). Repeat for several.
        #[arg(long = "doc", required = true)]
        docs: Vec<PathBuf>,

        /// Treat the documents as one project instead of one document.
        #[arg(long)]
        project: bool,
    },

    /// Describe a document without any model.
    Analyze {
        /// Document to analyze (plain text).
        #[arg(long)]
        doc: PathBuf,

        /// Number of key terms to list.
        #[arg(long, default_value_t = 10)]
        terms: usize,
    },

    /// Show configured providers and model state.
    Status {
        /// Load both models now and report the outcome.
        #[arg(long)]
        load: bool,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let cfg = match &cli.config {
        Some(path) => config::load_config(path)?,
        None => config::Config::default(),
    };
    logging::init(&cfg.logging.level);

    match cli.command {
        Commands::Ask {
            query,
            docs,
            project,
        } => {
            commands::run_ask(&cfg, &query, &docs, project).await?;
        }
        Commands::Chat { docs, project } => {
            commands::run_chat(&cfg, &docs, project).await?;
        }
        Commands::Analyze { doc, terms } => {
            commands::run_analyze(&doc, terms)?;
        }
        Commands::Status { load } => {
            commands::run_status(&cfg, load).await?;
        }
    }

    Ok(())
}
