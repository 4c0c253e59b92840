//! # PMMSherpa CLI (`sherpa`)
//!
//! ## Usage
//!
//! ```bash
//! sherpa --config ./config/sherpa.toml <command>
//! ```
//!
//! ## Commands
//!
//! | Command | Description |
//! |---------|-------------|
//! | `sherpa search "<query>"` | Hybrid (or `--semantic`) retrieval |
//! | `sherpa context "<query>"` | Prompt-ready context block and sources |
//! | `sherpa expand "<query>"` | Show acronym expansion (no config needed) |
//! | `sherpa embed <text>...` | Embed texts with the configured model |
//! | `sherpa web-check "<message>"` | Web-search auto-enable decision (no config needed) |
//! | `sherpa serve` | Start the HTTP server |

use clap::{Parser, Subcommand};
use std::path::PathBuf;

use pmmsherpa::backend::create_retriever;
use pmmsherpa::search::SearchArgs;
use pmmsherpa::{config, logging, search, server};

/// PMMSherpa: retrieval over a product marketing knowledge base.
#[derive(Parser)]
#[command(name = "sherpa", version, about = "PMMSherpa retrieval CLI and HTTP server")]
struct Cli {
    /// Path to configuration file (TOML).
    #[arg(long, global = true, default_value = "./config/sherpa.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Retrieve chunks for a query.
    Search {
        query: String,

        /// Use the pure-vector `match_chunks` path instead of hybrid search.
        #[arg(long)]
        semantic: bool,

        /// Maximum number of chunks.
        #[arg(long)]
        top_k: Option<usize>,

        /// Semantic weight of the hybrid blend, in [0, 1].
        #[arg(long)]
        weight: Option<f64>,

        /// Minimum score, in [0, 1].
        #[arg(long)]
        threshold: Option<f64>,

        /// Print the raw `{ chunks, totalTokens }` JSON.
        #[arg(long)]
        json: bool,
    },

    /// Print the context block a chat turn would receive.
    Context { query: String },

    /// Print the expanded form of a query.
    Expand { query: String },

    /// Embed one or more texts.
    Embed {
        #[arg(required = true)]
        texts: Vec<String>,
    },

    /// Decide whether a message should auto-enable web search.
    WebCheck { message: String },

    /// Start the HTTP server on `[server].bind`.
    Serve,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Commands that don't require config
    match &cli.command {
        Commands::Expand { query } => return search::run_expand(query),
        Commands::WebCheck { message } => return search::run_web_check(message),
        _ => {}
    }

    let cfg = config::load_config(&cli.config)?;
    logging::init(&cfg.logging.filter);

    match cli.command {
        Commands::Search {
            query,
            semantic,
            top_k,
            weight,
            threshold,
            json,
        } => {
            let retriever = create_retriever(&cfg)?;
            let args = SearchArgs {
                semantic,
                top_k,
                weight,
                threshold,
                json,
            };
            search::run_search(&retriever, &query, &args).await?;
        }
        Commands::Context { query } => {
            let retriever = create_retriever(&cfg)?;
            search::run_context(&retriever, &query).await?;
        }
        Commands::Embed { texts } => {
            search::run_embed(&cfg, &texts).await?;
        }
        Commands::Serve => {
            server::run_server(&cfg).await?;
        }
        Commands::Expand { .. } | Commands::WebCheck { .. } => {
            // Handled above (before config loading)
            unreachable!()
        }
    }

    Ok(())
}
